//! Where user-facing messages and fault reports go.
//!
//! Commands and the waiter are handed a `&dyn Presenter` instead of printing
//! directly, so the CLI can write to the console while tests record what
//! would have been shown.

use std::sync::Mutex;

use tracing::Level;

use crate::prelude::*;

/// A sink for human-readable messages and logged faults.
pub trait Presenter: Sync {
    /// Print a blank line.
    fn new_line(&self);

    /// Show a message to the user.
    fn show_message(&self, message: &str);

    /// Log `fault` at `level`, with full diagnostic detail.
    fn log_fault(&self, level: Level, message: &str, fault: &Fault);
}

/// Writes messages to standard output, and mirrors them to `tracing`.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn new_line(&self) {
        println!();
    }

    fn show_message(&self, message: &str) {
        println!("{}", message);
        debug!("presented: {}", message);
    }

    fn log_fault(&self, level: Level, message: &str, fault: &Fault) {
        match level {
            Level::ERROR => {
                error!("{}: {}", message, fault.display_causes_and_backtrace())
            }
            Level::WARN => {
                warn!("{}: {}", message, fault.display_causes_without_backtrace())
            }
            Level::INFO => {
                info!("{}: {}", message, fault.display_causes_without_backtrace())
            }
            Level::DEBUG => {
                debug!("{}: {}", message, fault.display_causes_without_backtrace())
            }
            _ => trace!("{}: {}", message, fault.display_causes_without_backtrace()),
        }
    }
}

/// Something a `RecordingPresenter` was asked to do.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Presented {
    /// A blank line.
    NewLine,
    /// A message shown to the user.
    Message(String),
    /// A logged fault, with its level, message and the fault's own text.
    Fault {
        /// Severity of the log entry.
        level: Level,
        /// What we were doing.
        message: String,
        /// `fault.to_string()`.
        fault: String,
    },
}

/// Keeps everything it's given in memory. Useful for tests.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    entries: Mutex<Vec<Presented>>,
}

impl RecordingPresenter {
    /// Create an empty recorder.
    pub fn new() -> RecordingPresenter {
        RecordingPresenter::default()
    }

    /// Everything recorded so far.
    pub fn entries(&self) -> Vec<Presented> {
        self.lock().clone()
    }

    /// Only the messages shown to the user.
    pub fn messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                Presented::Message(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    /// How many faults were logged at exactly `level`?
    pub fn fault_count(&self, level: Level) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, Presented::Fault { level: l, .. } if *l == level))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Presented>> {
        // A panicking test thread shouldn't hide what was recorded.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, entry: Presented) {
        self.lock().push(entry);
    }
}

impl Presenter for RecordingPresenter {
    fn new_line(&self) {
        self.push(Presented::NewLine);
    }

    fn show_message(&self, message: &str) {
        self.push(Presented::Message(message.to_owned()));
    }

    fn log_fault(&self, level: Level, message: &str, fault: &Fault) {
        self.push(Presented::Fault {
            level,
            message: message.to_owned(),
            fault: fault.to_string(),
        });
    }
}

#[test]
fn recording_presenter_counts_faults_by_level() {
    let presenter = RecordingPresenter::new();
    presenter.show_message("hello");
    presenter.new_line();
    let fault = Fault::Connectivity("refused".to_owned());
    presenter.log_fault(Level::INFO, "could not connect", &fault);
    presenter.log_fault(Level::ERROR, "oops", &Fault::Other(format_err!("bad")));
    assert_eq!(presenter.messages(), vec!["hello".to_owned()]);
    assert_eq!(presenter.fault_count(Level::ERROR), 1);
    assert_eq!(presenter.fault_count(Level::INFO), 1);
    assert_eq!(presenter.entries().len(), 4);
}
