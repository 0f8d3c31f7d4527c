//! Running a command and turning whatever happens into an `Outcome`.

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
};

use cafe_common::{prelude::*, tracing::Level};

/// A command the user can run.
pub trait Command {
    /// Did the user ask for help instead?
    fn help_requested(&self) -> bool;

    /// One-line help for this command.
    fn help_text(&self) -> &'static str;

    /// What this command is about to do, for the user.
    fn description(&self) -> String;

    /// Actually run the command.
    fn run_core(&self, presenter: &dyn Presenter) -> result::Result<Outcome, Fault>;
}

/// Run `command`, reporting progress to `presenter`.
///
/// Faults and panics never escape from here. Connectivity problems (including
/// aggregates that contain one) become a fixed "can't reach the server"
/// failure, and everything else is logged at error level and reported with
/// its own message.
pub fn run_command(command: &dyn Command, presenter: &dyn Presenter) -> Outcome {
    if command.help_requested() {
        presenter.show_message(&format!("Help: {}", command.help_text()));
        return Outcome::successful();
    }

    let description = command.description();
    presenter.new_line();
    presenter.show_message(&format!("{}:", description));
    presenter.new_line();

    let outcome = match catch_unwind(AssertUnwindSafe(|| command.run_core(presenter))) {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(fault)) => outcome_from_fault(&fault, presenter),
        Err(panic) => {
            let fault = Fault::Other(format_err!("{}", panic_message(&*panic)));
            outcome_from_fault(&fault, presenter)
        }
    };

    presenter.new_line();
    presenter.show_message(&format!(
        "Finished {} with result: {}",
        description, outcome
    ));
    outcome
}

/// Log `fault` and convert it to a failure.
fn outcome_from_fault(fault: &Fault, presenter: &dyn Presenter) -> Outcome {
    if fault.is_connectivity() {
        presenter.log_fault(
            Level::INFO,
            "could not connect to the server",
            fault,
        );
    } else {
        presenter.log_fault(
            Level::ERROR,
            "an unexpected error occurred while executing this command",
            fault,
        );
    }
    Outcome::from_fault(fault)
}

/// Extract a message from a panic payload, if it's one of the common types.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        // Created by `panic!("fixed string")`.
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        // Created by `panic!("format string: {}", "with arguments")`.
        msg
    } else {
        "an unknown panic occurred"
    }
}
