//! The `task` subcommand.

use cafe_common::prelude::*;
use structopt::{clap::AppSettings, StructOpt};

use super::ServerOpt;
use crate::dispatch::run_command;

mod status;
mod wait;

/// Task-related commands. Each one handles its own `--help` flag, so that
/// asking for help goes through the normal command dispatcher.
#[derive(Debug, StructOpt)]
pub enum Opt {
    /// Show the status of one or more tasks.
    #[structopt(name = "status", setting = AppSettings::DisableHelpFlags)]
    Status(status::Opt),

    /// Wait for a task to finish.
    #[structopt(name = "wait", setting = AppSettings::DisableHelpFlags)]
    Wait(wait::Opt),
}

/// Run the `task` subcommand.
pub fn run(opt: &Opt, server: &ServerOpt, presenter: &dyn Presenter) -> Outcome {
    match opt {
        Opt::Status(opt) => run_command(&status::StatusCommand { opt, server }, presenter),
        Opt::Wait(opt) => run_command(&wait::WaitCommand { opt, server }, presenter),
    }
}

#[test]
fn help_flag_does_not_need_a_task_id() {
    let opt = Opt::from_iter_safe(&["task", "wait", "--help"]).expect("parse error");
    match opt {
        Opt::Wait(wait) => {
            assert!(wait.help);
            assert_eq!(wait.task_id, None);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn task_id_is_required_without_help() {
    assert!(Opt::from_iter_safe(&["task", "wait"]).is_err());
    assert!(Opt::from_iter_safe(&["task", "status"]).is_err());
}

#[test]
fn parse_wait_options() {
    let id = Uuid::new_v4().to_string();
    let opt = Opt::from_iter_safe(&[
        "task",
        "wait",
        id.as_str(),
        "--poll-interval",
        "500ms",
        "--timeout",
        "2m",
    ])
    .expect("parse error");
    match opt {
        Opt::Wait(wait) => {
            assert!(!wait.help);
            assert_eq!(wait.task_id.map(|id| id.to_string()), Some(id));
            assert_eq!(wait.poll_interval, Some(Duration::from_millis(500)));
            assert_eq!(wait.timeout, Some(Duration::from_secs(120)));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn parse_status_with_several_ids() {
    let a = Uuid::new_v4().to_string();
    let b = Uuid::new_v4().to_string();
    let opt = Opt::from_iter_safe(&["task", "status", a.as_str(), b.as_str()]).expect("parse error");
    match opt {
        Opt::Status(status) => assert_eq!(status.task_ids.len(), 2),
        other => panic!("unexpected {:?}", other),
    }
}
