//! A client for the scheduler's REST API.

use reqwest::{blocking, StatusCode};
use url::Url;

use crate::prelude::*;

/// Something which can tell us the current status of a task.
pub trait StatusClient: Sync {
    /// Look up the current status of the task with `id`.
    fn task_status(&self, id: Uuid) -> result::Result<TaskStatus, Fault>;

    /// Like `task_status`, but give up after `timeout`. Clients which can
    /// bound a single request should override this; the default ignores
    /// `timeout`.
    fn task_status_within(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> result::Result<TaskStatus, Fault> {
        let _ = timeout;
        self.task_status(id)
    }
}

impl<C: StatusClient + ?Sized> StatusClient for &C {
    fn task_status(&self, id: Uuid) -> result::Result<TaskStatus, Fault> {
        (**self).task_status(id)
    }

    fn task_status_within(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> result::Result<TaskStatus, Fault> {
        (**self).task_status_within(id, timeout)
    }
}

/// A client for talking to the scheduler server.
#[derive(Debug)]
pub struct Client {
    /// The base URL of the server, always ending in `/`.
    url: Url,
    /// Our HTTP client.
    client: blocking::Client,
    /// The longest any single request may take.
    request_timeout: Duration,
}

impl Client {
    /// Create a new client using the settings in `config`.
    #[tracing::instrument(skip(config), level = "trace")]
    pub fn new(config: &Config) -> Result<Client> {
        let mut url = config.server_url.clone();
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        let client = blocking::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("cafe/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("could not build HTTP client")?;
        Ok(Client {
            url,
            client,
            request_timeout: config.request_timeout,
        })
    }

    /// The server we're talking to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Build a URL relative to our server.
    fn path_url(&self, path: &str) -> Result<Url> {
        self.url
            .join(path)
            .with_context(|| format!("could not build URL for {:?}", path))
    }

    /// Fetch a task's status, allowing the request at most `timeout`.
    fn fetch_task_status(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> result::Result<TaskStatus, Fault> {
        let url = self.path_url(&format!("api/scheduler/tasks/{}", id))?;
        let resp = self.client.get(url.clone()).timeout(timeout).send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(format_err!("task {} is not known to the server", id).into());
        }
        let resp = resp.error_for_status()?;
        let status = resp
            .json::<TaskStatus>()
            .with_context(|| format!("could not parse task status from {}", url))?;
        trace!("status of task {}: {}", id, status.state);
        Ok(status)
    }
}

impl StatusClient for Client {
    #[tracing::instrument(skip(self), level = "trace")]
    fn task_status(&self, id: Uuid) -> result::Result<TaskStatus, Fault> {
        self.fetch_task_status(id, self.request_timeout)
    }

    #[tracing::instrument(skip(self), level = "trace")]
    fn task_status_within(
        &self,
        id: Uuid,
        timeout: Duration,
    ) -> result::Result<TaskStatus, Fault> {
        self.fetch_task_status(id, timeout.min(self.request_timeout))
    }
}

/// Look up the status of several tasks in parallel. If more than one lookup
/// fails, the faults are returned as a `Fault::Aggregate`.
pub fn task_statuses<C>(
    client: &C,
    ids: &[Uuid],
) -> result::Result<Vec<TaskStatus>, Fault>
where
    C: StatusClient + ?Sized,
{
    let results = crossbeam::scope(|scope| {
        let handles = ids
            .iter()
            .map(|&id| scope.spawn(move |_| client.task_status(id)))
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    Err(format_err!("status lookup thread panicked").into())
                })
            })
            .collect::<Vec<_>>()
    })
    .map_err(|_| format_err!("status lookup scope panicked"))?;

    let mut statuses = vec![];
    let mut faults = vec![];
    for result in results {
        match result {
            Ok(status) => statuses.push(status),
            Err(fault) => faults.push(fault),
        }
    }
    if faults.is_empty() {
        Ok(statuses)
    } else {
        Err(Fault::aggregate(faults))
    }
}
