//! Waiting for a task on the scheduler to finish.
//!
//! We poll the scheduler once per poll interval from the caller's own thread.
//! Between polls we block on a cancellation channel with a timeout, so a
//! `CancelHandle` on another thread can interrupt the wait at any point.

use std::{thread, time::Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::Level;

use crate::{prelude::*, rest_api::StatusClient};

/// How often to poll, and how long to keep at it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitOptions {
    /// Time between status checks.
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits until the task finishes.
    pub max_wait: Option<Duration>,
}

impl WaitOptions {
    /// Wait options based on our configuration.
    pub fn from_config(config: &Config) -> WaitOptions {
        WaitOptions {
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
        }
    }
}

/// Create a linked `CancelHandle` and `CancelToken`.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = channel::bounded(1);
    (CancelHandle(tx), CancelToken(rx))
}

/// Used to stop a running wait from another thread.
///
/// Cancellation takes effect between polls. A status request which is already
/// in flight finishes first, and is bounded by the remaining `max_wait` and the
/// client's own request timeout.
#[derive(Clone, Debug)]
pub struct CancelHandle(Sender<()>);

impl CancelHandle {
    /// Ask the waiter to stop. Calling this more than once has no further
    /// effect.
    pub fn cancel(&self) {
        // `Full` means we're already cancelled, and `Disconnected` means
        // nobody is waiting any more.
        let _ = self.0.try_send(());
    }
}

/// The waiter's end of a cancellation channel.
#[derive(Debug)]
pub struct CancelToken(Receiver<()>);

impl CancelToken {
    /// A token which is never cancelled.
    pub fn never() -> CancelToken {
        CancelToken(channel::never())
    }

    /// Sleep for `timeout`, or until cancelled. Returns `true` if we were
    /// cancelled.
    fn sleep(&self, timeout: Duration) -> bool {
        match self.0.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                // All handles are gone, so nobody can cancel us.
                thread::sleep(timeout);
                false
            }
        }
    }
}

/// Polls the scheduler until a task finishes.
pub struct SchedulerWaiter<'a, C: ?Sized> {
    client: &'a C,
    presenter: &'a dyn Presenter,
    options: WaitOptions,
    cancel: CancelToken,
}

impl<'a, C: StatusClient + ?Sized> SchedulerWaiter<'a, C> {
    /// Create a new waiter which can't be cancelled.
    pub fn new(
        client: &'a C,
        presenter: &'a dyn Presenter,
        options: WaitOptions,
    ) -> SchedulerWaiter<'a, C> {
        SchedulerWaiter {
            client,
            presenter,
            options,
            cancel: CancelToken::never(),
        }
    }

    /// Allow this waiter to be stopped using the `CancelHandle` paired with
    /// `token`.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Wait until the task described by `initial` finishes.
    ///
    /// A task that finishes with `TaskState::Failed` is still a successful
    /// outcome: we found out what happened to it. Failures are reserved for
    /// problems talking to the scheduler, for timeouts and for cancellation.
    /// Faults are never retried.
    #[tracing::instrument(skip(self, initial), fields(task = %initial.id), level = "debug")]
    pub fn wait_for_task_to_complete(
        &self,
        initial: &TaskStatus,
    ) -> Outcome<TaskStatus> {
        let started = Instant::now();
        let mut latest = initial.clone();
        loop {
            let polled = match self.remaining(started) {
                None => self.client.task_status(initial.id),
                Some(remaining) if remaining == Duration::from_secs(0) => {
                    return self.gave_up(initial, started);
                }
                Some(remaining) => self.client.task_status_within(initial.id, remaining),
            };
            match polled {
                Err(_) if self.remaining(started) == Some(Duration::from_secs(0)) => {
                    // The request was cut short by our own deadline.
                    return self.gave_up(initial, started);
                }
                Err(fault) => return self.outcome_from_fault(initial, &fault),
                Ok(status) if status.has_finished() => {
                    debug!("task {} finished: {}", status.id, status.state);
                    return Outcome::successful_with(status);
                }
                Ok(status) => {
                    let previous = latest.state;
                    match latest.advance_to(status.state) {
                        Err(err) => warn!("ignoring stale status: {}", err),
                        Ok(()) if latest.state != previous => {
                            self.presenter.show_message(&format!(
                                "Task {} is {}",
                                status.name, status.state
                            ));
                        }
                        Ok(()) => {}
                    }
                }
            }

            let pause = match self.remaining(started) {
                None => self.options.poll_interval,
                Some(remaining) if remaining == Duration::from_secs(0) => {
                    return self.gave_up(initial, started);
                }
                Some(remaining) => self.options.poll_interval.min(remaining),
            };
            trace!("sleeping {:?} before polling task {}", pause, initial.id);
            if self.cancel.sleep(pause) {
                return Outcome::failure(format!(
                    "stopped waiting for task {}: cancelled",
                    initial.name,
                ));
            }
        }
    }

    /// How much of `max_wait` is left, if there is a limit.
    fn remaining(&self, started: Instant) -> Option<Duration> {
        self.options
            .max_wait
            .map(|max_wait| max_wait.checked_sub(started.elapsed()).unwrap_or_default())
    }

    fn gave_up(&self, initial: &TaskStatus, started: Instant) -> Outcome<TaskStatus> {
        Outcome::failure(format!(
            "gave up waiting for task {} after {:?}",
            initial.name,
            started.elapsed(),
        ))
    }

    fn outcome_from_fault(
        &self,
        initial: &TaskStatus,
        fault: &Fault,
    ) -> Outcome<TaskStatus> {
        let message = format!("could not get status of task {}", initial.id);
        if fault.is_connectivity() {
            self.presenter.log_fault(Level::INFO, &message, fault);
        } else {
            self.presenter.log_fault(Level::ERROR, &message, fault);
        }
        Outcome::from_fault(fault)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use super::*;
    use crate::{errors::CONNECTION_FAILURE_DESCRIPTION, presenter::RecordingPresenter};

    /// Hands out a fixed series of responses, then repeats `Running`.
    struct ScriptedClient {
        task: TaskStatus,
        script: Mutex<VecDeque<result::Result<TaskState, Fault>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedClient {
        fn new(
            task: &TaskStatus,
            script: Vec<result::Result<TaskState, Fault>>,
        ) -> ScriptedClient {
            ScriptedClient {
                task: task.clone(),
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl StatusClient for ScriptedClient {
        fn task_status(&self, id: Uuid) -> result::Result<TaskStatus, Fault> {
            assert_eq!(id, self.task.id);
            *self.calls.lock().unwrap() += 1;
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(TaskState::Running));
            next.map(|state| TaskStatus {
                state,
                ..self.task.clone()
            })
        }
    }

    fn options(poll_interval: Duration) -> WaitOptions {
        WaitOptions {
            poll_interval,
            max_wait: None,
        }
    }

    #[test]
    fn connectivity_fault_on_first_poll_fails_quickly() {
        let task = TaskStatus::new("sample task");
        let client = ScriptedClient::new(
            &task,
            vec![Err(Fault::Connectivity("connection refused".to_owned()))],
        );
        let presenter = RecordingPresenter::new();
        let interval = Duration::from_millis(500);
        let waiter = SchedulerWaiter::new(&client, &presenter, options(interval));

        let started = Instant::now();
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert!(started.elapsed() < interval);
        assert!(!outcome.is_success());
        assert_eq!(outcome.failure_description(), CONNECTION_FAILURE_DESCRIPTION);
        assert!(outcome.failure_description().contains("server"));
        assert_eq!(client.calls(), 1);
        assert_eq!(presenter.fault_count(Level::INFO), 1);
        assert_eq!(presenter.fault_count(Level::ERROR), 0);
    }

    #[test]
    fn waits_through_pending_and_running_until_completed() {
        let task = TaskStatus::new("T1");
        let client = ScriptedClient::new(
            &task,
            vec![
                Ok(TaskState::Pending),
                Ok(TaskState::Running),
                Ok(TaskState::Completed),
            ],
        );
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_millis(500)),
        );

        let started = Instant::now();
        let outcome = waiter.wait_for_task_to_complete(&task);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(2000), "{:?}", elapsed);
        assert!(outcome.is_success());
        assert_eq!(outcome.payload().unwrap().state, TaskState::Completed);
        assert_eq!(client.calls(), 3);
        assert_eq!(presenter.messages(), vec!["Task T1 is running".to_owned()]);
    }

    #[test]
    fn failed_task_is_still_a_successful_wait() {
        let task = TaskStatus::new("chef run");
        let client = ScriptedClient::new(&task, vec![Ok(TaskState::Failed)]);
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_millis(10)),
        );
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert!(outcome.is_success());
        assert_eq!(outcome.payload().unwrap().state, TaskState::Failed);
    }

    #[test]
    fn other_faults_use_their_own_message() {
        let task = TaskStatus::new("chef run");
        let client = ScriptedClient::new(
            &task,
            vec![
                Ok(TaskState::Running),
                Err(Fault::Other(format_err!("task {} is not known to the server", task.id))),
            ],
        );
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_millis(10)),
        );
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert_eq!(
            outcome.failure_description(),
            format!("task {} is not known to the server", task.id),
        );
        assert_eq!(client.calls(), 2);
        assert_eq!(presenter.fault_count(Level::ERROR), 1);
    }

    #[test]
    fn stale_statuses_are_ignored() {
        let task = TaskStatus::new("chef run");
        let client = ScriptedClient::new(
            &task,
            vec![
                Ok(TaskState::Running),
                Ok(TaskState::Pending),
                Ok(TaskState::Completed),
            ],
        );
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_millis(10)),
        );
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert!(outcome.is_success());
        assert_eq!(presenter.messages(), vec!["Task chef run is running".to_owned()]);
    }

    #[test]
    fn gives_up_after_max_wait() {
        let task = TaskStatus::new("slow task");
        let client = ScriptedClient::new(&task, vec![]);
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            WaitOptions {
                poll_interval: Duration::from_millis(20),
                max_wait: Some(Duration::from_millis(100)),
            },
        );

        let started = Instant::now();
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(!outcome.is_success());
        assert!(outcome.failure_description().contains("gave up waiting"));
        assert!(client.calls() >= 2);
    }

    #[test]
    fn cancel_stops_the_wait_promptly() {
        let task = TaskStatus::new("slow task");
        let client = ScriptedClient::new(&task, vec![]);
        let presenter = RecordingPresenter::new();
        let (handle, token) = cancel_pair();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_secs(60)),
        )
        .with_cancel_token(token);

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
            handle.cancel();
        });
        let started = Instant::now();
        let outcome = waiter.wait_for_task_to_complete(&task);
        canceller.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!outcome.is_success());
        assert!(outcome.failure_description().contains("cancelled"));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn dropped_cancel_handle_does_not_cancel() {
        let task = TaskStatus::new("chef run");
        let client = ScriptedClient::new(
            &task,
            vec![Ok(TaskState::Running), Ok(TaskState::Completed)],
        );
        let presenter = RecordingPresenter::new();
        let (handle, token) = cancel_pair();
        drop(handle);
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            options(Duration::from_millis(10)),
        )
        .with_cancel_token(token);
        let outcome = waiter.wait_for_task_to_complete(&task);
        assert!(outcome.is_success());
        assert_eq!(client.calls(), 2);
    }

    /// Takes `delay` to answer, unless told to give up sooner.
    struct SlowClient {
        task: TaskStatus,
        delay: Duration,
    }

    impl StatusClient for SlowClient {
        fn task_status(&self, _id: Uuid) -> result::Result<TaskStatus, Fault> {
            thread::sleep(self.delay);
            Ok(self.task.clone())
        }

        fn task_status_within(
            &self,
            id: Uuid,
            timeout: Duration,
        ) -> result::Result<TaskStatus, Fault> {
            if timeout >= self.delay {
                return self.task_status(id);
            }
            thread::sleep(timeout);
            Err(Fault::Connectivity("operation timed out".to_owned()))
        }
    }

    #[test]
    fn slow_requests_do_not_overshoot_max_wait() {
        let task = TaskStatus::new("slow");
        let client = SlowClient {
            task: task.clone(),
            delay: Duration::from_millis(600),
        };
        let presenter = RecordingPresenter::new();
        let waiter = SchedulerWaiter::new(
            &client,
            &presenter,
            WaitOptions {
                poll_interval: Duration::from_millis(20),
                max_wait: Some(Duration::from_millis(100)),
            },
        );

        let started = Instant::now();
        let outcome = waiter.wait_for_task_to_complete(&task);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(100), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(400), "{:?}", elapsed);
        assert!(!outcome.is_success());
        assert!(
            outcome.failure_description().starts_with("gave up waiting for task slow after "),
            "{}",
            outcome.failure_description(),
        );
        // The message reports how long we really waited, not the limit.
        assert!(!outcome.failure_description().ends_with("after 100ms"));
        assert_eq!(presenter.fault_count(Level::INFO), 0);
    }
}
