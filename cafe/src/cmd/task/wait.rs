//! The `task wait` subcommand.

use cafe_common::{
    config::parse_duration,
    prelude::*,
    rest_api::{Client, StatusClient},
    waiter::{SchedulerWaiter, WaitOptions},
};
use structopt::StructOpt;

use crate::{cmd::ServerOpt, dispatch::Command};

const HELP: &str = "cafe task wait <task-id> [--poll-interval <duration>] [--timeout <duration>] - \
                    wait for a task to finish, and fail if the task failed";

/// Options for `task wait`.
#[derive(Debug, StructOpt)]
pub struct Opt {
    /// Show help for this command.
    #[structopt(short = "h", long = "help")]
    pub help: bool,

    /// The task to wait for.
    #[structopt(required_unless = "help")]
    pub task_id: Option<Uuid>,

    /// How often to check on the task (e.g. "500ms", "5s").
    #[structopt(long = "poll-interval", parse(try_from_str = parse_duration))]
    pub poll_interval: Option<Duration>,

    /// Give up after this long (e.g. "30m").
    #[structopt(long = "timeout", parse(try_from_str = parse_duration))]
    pub timeout: Option<Duration>,
}

impl Opt {
    /// Our config's wait options, overridden by anything on the command line.
    fn wait_options(&self, config: &Config) -> WaitOptions {
        let mut options = WaitOptions::from_config(config);
        if let Some(poll_interval) = self.poll_interval {
            options.poll_interval = poll_interval;
        }
        if self.timeout.is_some() {
            options.max_wait = self.timeout;
        }
        options
    }
}

/// The `task wait` subcommand.
pub struct WaitCommand<'a> {
    pub opt: &'a Opt,
    pub server: &'a ServerOpt,
}

impl Command for WaitCommand<'_> {
    fn help_requested(&self) -> bool {
        self.opt.help
    }

    fn help_text(&self) -> &'static str {
        HELP
    }

    fn description(&self) -> String {
        match self.opt.task_id {
            Some(id) => format!("Waiting for task {}", id),
            None => "Waiting for task".to_owned(),
        }
    }

    fn run_core(&self, presenter: &dyn Presenter) -> result::Result<Outcome, Fault> {
        let task_id = match self.opt.task_id {
            Some(task_id) => task_id,
            None => return Ok(Outcome::failure("a task ID is required")),
        };
        let config = self.server.load_config()?;
        let options = self.opt.wait_options(&config);
        if options.poll_interval == Duration::from_secs(0) {
            return Ok(Outcome::failure("--poll-interval must be greater than zero"));
        }

        let client = Client::new(&config)?;
        let initial = client.task_status(task_id)?;
        presenter.show_message(&format!(
            "Waiting for task {} ({}) on {} to complete",
            initial.name,
            initial.state,
            client.url(),
        ));
        let outcome = SchedulerWaiter::new(&client, presenter, options)
            .wait_for_task_to_complete(&initial);
        Ok(task_outcome(outcome, presenter))
    }
}

/// Turn the result of waiting into the result of the command. Unlike the
/// waiter, we treat a failed task as a failure.
fn task_outcome(outcome: Outcome<TaskStatus>, presenter: &dyn Presenter) -> Outcome {
    if !outcome.is_success() {
        return outcome.without_payload();
    }
    let status = match outcome.into_result() {
        Ok(Some(status)) => status,
        _ => return Outcome::successful(),
    };
    presenter.show_message(&status.to_string());
    match status.state {
        TaskState::Failed => match &status.failure_message {
            Some(msg) => Outcome::failure(format!(
                "task {} finished with status {}: {}",
                status.name, status.state, msg,
            )),
            None => Outcome::failure(format!(
                "task {} finished with status {}",
                status.name, status.state,
            )),
        },
        _ => Outcome::successful(),
    }
}

#[cfg(test)]
mod tests {
    use cafe_common::presenter::RecordingPresenter;

    use super::*;

    fn opt() -> Opt {
        Opt {
            help: false,
            task_id: Some(Uuid::new_v4()),
            poll_interval: None,
            timeout: None,
        }
    }

    #[test]
    fn failed_task_fails_the_command() {
        let mut status = TaskStatus::new("install chef");
        status.state = TaskState::Failed;
        status.failure_message = Some("download failed".to_owned());
        let presenter = RecordingPresenter::new();
        let outcome = task_outcome(Outcome::successful_with(status), &presenter);
        assert_eq!(
            outcome.failure_description(),
            "task install chef finished with status failed: download failed",
        );
        assert_eq!(presenter.messages().len(), 1);
    }

    #[test]
    fn completed_task_succeeds() {
        let mut status = TaskStatus::new("install chef");
        status.state = TaskState::Completed;
        let presenter = RecordingPresenter::new();
        let outcome = task_outcome(Outcome::successful_with(status), &presenter);
        assert!(outcome.is_success());
    }

    #[test]
    fn wait_failures_pass_through() {
        let presenter = RecordingPresenter::new();
        let outcome = task_outcome(Outcome::connection_failure(), &presenter);
        assert!(outcome.failure_description().contains("server"));
        assert!(presenter.messages().is_empty());
    }

    #[test]
    fn command_line_overrides_config() {
        let config = Config {
            poll_interval: Duration::from_secs(5),
            max_wait: Some(Duration::from_secs(60)),
            ..Config::default()
        };
        let mut opt = opt();
        assert_eq!(opt.wait_options(&config).poll_interval, Duration::from_secs(5));
        opt.poll_interval = Some(Duration::from_millis(500));
        opt.timeout = Some(Duration::from_secs(10));
        let options = opt.wait_options(&config);
        assert_eq!(options.poll_interval, Duration::from_millis(500));
        assert_eq!(options.max_wait, Some(Duration::from_secs(10)));
    }

    #[test]
    fn unreachable_server_is_reported_as_connectivity() {
        let opt = opt();
        let server = ServerOpt {
            config: None,
            server: Some("http://127.0.0.1:1/".parse().unwrap()),
        };
        let command = WaitCommand {
            opt: &opt,
            server: &server,
        };
        let presenter = RecordingPresenter::new();
        let fault = command.run_core(&presenter).unwrap_err();
        assert!(fault.is_connectivity(), "unexpected fault: {}", fault);
    }
}
