//! `cafe`: a command-line client for the cafe task scheduler.

use std::process;

use cafe_common::{
    prelude::*, presenter::ConsolePresenter, tracing_support::initialize_tracing,
};
use structopt::StructOpt;

mod cmd;
mod dispatch;

/// Command-line options, parsed using `structopt`.
#[derive(Debug, StructOpt)]
#[structopt(about = "A client for the cafe task scheduler.")]
struct Opt {
    #[structopt(flatten)]
    server: cmd::ServerOpt,

    #[structopt(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, StructOpt)]
enum Cmd {
    /// Task-related commands.
    #[structopt(name = "task")]
    Task {
        #[structopt(subcommand)]
        cmd: cmd::task::Opt,
    },
}

fn main() {
    initialize_tracing();
    let opt = Opt::from_args();
    debug!("Args: {:?}", opt);

    let presenter = ConsolePresenter;
    let outcome = match opt.cmd {
        Cmd::Task { ref cmd } => cmd::task::run(cmd, &opt.server, &presenter),
    };
    if !outcome.is_success() {
        process::exit(1);
    }
}
