//! The `task status` subcommand.

use cafe_common::{
    prelude::*,
    rest_api::{task_statuses, Client},
};
use structopt::StructOpt;

use crate::{cmd::ServerOpt, dispatch::Command};

const HELP: &str = "cafe task status <task-id>... - show the current status of each task";

/// Options for `task status`.
#[derive(Debug, StructOpt)]
pub struct Opt {
    /// Show help for this command.
    #[structopt(short = "h", long = "help")]
    pub help: bool,

    /// The tasks to look up.
    #[structopt(required_unless = "help")]
    pub task_ids: Vec<Uuid>,
}

/// The `task status` subcommand.
pub struct StatusCommand<'a> {
    pub opt: &'a Opt,
    pub server: &'a ServerOpt,
}

impl Command for StatusCommand<'_> {
    fn help_requested(&self) -> bool {
        self.opt.help
    }

    fn help_text(&self) -> &'static str {
        HELP
    }

    fn description(&self) -> String {
        let ids = self
            .opt
            .task_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>();
        let noun = if ids.len() > 1 { "tasks" } else { "task" };
        format!("Checking status of {} {}", noun, ids.join(", "))
    }

    fn run_core(&self, presenter: &dyn Presenter) -> result::Result<Outcome, Fault> {
        if self.opt.task_ids.is_empty() {
            return Ok(Outcome::failure("at least one task ID is required"));
        }
        let config = self.server.load_config()?;
        let client = Client::new(&config)?;
        for status in task_statuses(&client, &self.opt.task_ids)? {
            presenter.show_message(&status.to_string());
        }
        Ok(Outcome::successful())
    }
}

#[cfg(test)]
fn server_opt() -> ServerOpt {
    ServerOpt {
        config: None,
        server: None,
    }
}

#[test]
fn description_uses_plural_for_several_tasks() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let server = server_opt();

    let one = Opt {
        help: false,
        task_ids: vec![a],
    };
    let command = StatusCommand {
        opt: &one,
        server: &server,
    };
    assert_eq!(command.description(), format!("Checking status of task {}", a));

    let two = Opt {
        help: false,
        task_ids: vec![a, b],
    };
    let command = StatusCommand {
        opt: &two,
        server: &server,
    };
    assert_eq!(
        command.description(),
        format!("Checking status of tasks {}, {}", a, b),
    );
}

#[test]
fn missing_ids_fail_without_contacting_the_server() {
    use cafe_common::presenter::RecordingPresenter;

    let opt = Opt {
        help: false,
        task_ids: vec![],
    };
    let server = server_opt();
    let command = StatusCommand {
        opt: &opt,
        server: &server,
    };
    let presenter = RecordingPresenter::new();
    let outcome = command.run_core(&presenter).unwrap();
    assert_eq!(
        outcome.failure_description(),
        "at least one task ID is required"
    );
    assert!(presenter.entries().is_empty());
}
