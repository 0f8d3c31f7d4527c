//! Error-handling code.

use std::{error::Error as StdError, fmt};

use anyhow::Error;

/// What we tell the user when we can't reach the scheduler.
pub const CONNECTION_FAILURE_DESCRIPTION: &str =
    "A connection to the server could not be made. Make sure it's running.";

/// Something that went wrong while talking to the scheduler or running a
/// command.
///
/// The variants are what callers match on: connectivity problems get a fixed
/// "server unreachable" message, and everything else is reported with its own
/// message.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// We could not reach the server at all (refused connection, DNS
    /// failure, timeout).
    #[error("could not connect to the server: {0}")]
    Connectivity(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] Error),

    /// Several faults raised by concurrent operations.
    #[error("{} errors occurred: {}", .0.len(), join_messages(.0))]
    Aggregate(Vec<Fault>),
}

impl Fault {
    /// Bundle up the faults from several concurrent operations. A single
    /// fault is returned as is.
    pub fn aggregate(mut faults: Vec<Fault>) -> Fault {
        if faults.len() == 1 {
            faults.remove(0)
        } else {
            Fault::Aggregate(faults)
        }
    }

    /// Is this a connectivity problem, or does it contain one?
    pub fn is_connectivity(&self) -> bool {
        match self {
            Fault::Connectivity(_) => true,
            Fault::Other(_) => false,
            Fault::Aggregate(faults) => faults.iter().any(Fault::is_connectivity),
        }
    }
}

impl From<reqwest::Error> for Fault {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Fault::Connectivity(chain_to_string(&err))
        } else {
            Fault::Other(err.into())
        }
    }
}

/// Format an error and all of its sources on one line.
fn chain_to_string(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(next) = source {
        out.push_str(": ");
        out.push_str(&next.to_string());
        source = next.source();
    }
    out
}

fn join_messages(faults: &[Fault]) -> String {
    faults
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Support for displaying an error with a complete list of causes, and an
/// optional backtrace.
pub trait DisplayCausesAndBacktraceExt {
    /// Display the error and its causes, plus a backtrace (if available).
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_>;

    /// Display the error and its causes.
    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_>;
}

impl DisplayCausesAndBacktraceExt for Error {
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: Cause::Error(self),
            show_backtrace: true,
        }
    }

    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: Cause::Error(self),
            show_backtrace: false,
        }
    }
}

impl DisplayCausesAndBacktraceExt for Fault {
    fn display_causes_and_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: Cause::Fault(self),
            show_backtrace: true,
        }
    }

    fn display_causes_without_backtrace(&self) -> DisplayCauses<'_> {
        DisplayCauses {
            err: Cause::Fault(self),
            show_backtrace: false,
        }
    }
}

/// The thing we're displaying.
enum Cause<'a> {
    Error(&'a Error),
    Fault(&'a Fault),
}

/// Helper type used to display errors.
pub struct DisplayCauses<'a> {
    /// The error to display.
    err: Cause<'a>,

    /// Should we show the backtrace?
    show_backtrace: bool,
}

impl DisplayCauses<'_> {
    fn fmt_error(&self, f: &mut fmt::Formatter<'_>, err: &Error) -> fmt::Result {
        writeln!(f, "ERROR: {}", err)?;
        let mut source = err.source();
        while let Some(next) = source {
            writeln!(f, "  caused by: {}", next)?;
            source = next.source();
        }

        if self.show_backtrace {
            write!(f, "{}", err.backtrace())?;
        }
        Ok(())
    }

    fn fmt_fault(&self, f: &mut fmt::Formatter<'_>, fault: &Fault) -> fmt::Result {
        match fault {
            Fault::Connectivity(msg) => writeln!(f, "ERROR: could not connect: {}", msg),
            Fault::Other(err) => self.fmt_error(f, err),
            Fault::Aggregate(faults) => {
                writeln!(f, "ERROR: {} errors occurred", faults.len())?;
                for fault in faults {
                    self.fmt_fault(f, fault)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DisplayCauses<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.err {
            Cause::Error(err) => self.fmt_error(f, err),
            Cause::Fault(fault) => self.fmt_fault(f, fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::format_err;

    use super::*;

    #[test]
    fn aggregate_with_one_connectivity_fault_is_connectivity() {
        let fault = Fault::aggregate(vec![
            Fault::Other(format_err!("disk full")),
            Fault::Connectivity("connection refused".to_owned()),
            Fault::Other(format_err!("bad JSON")),
        ]);
        assert!(matches!(fault, Fault::Aggregate(_)));
        assert!(fault.is_connectivity());
    }

    #[test]
    fn nested_aggregates_are_searched() {
        let fault = Fault::Aggregate(vec![
            Fault::Other(format_err!("disk full")),
            Fault::Aggregate(vec![Fault::Connectivity("timed out".to_owned())]),
        ]);
        assert!(fault.is_connectivity());
    }

    #[test]
    fn aggregate_of_one_unwraps() {
        let fault = Fault::aggregate(vec![Fault::Other(format_err!("bad JSON"))]);
        assert!(!fault.is_connectivity());
        assert_eq!(fault.to_string(), "bad JSON");
    }

    #[test]
    fn aggregate_message_lists_every_fault() {
        let fault = Fault::aggregate(vec![
            Fault::Other(format_err!("disk full")),
            Fault::Other(format_err!("bad JSON")),
        ]);
        assert!(!fault.is_connectivity());
        assert_eq!(fault.to_string(), "2 errors occurred: disk full; bad JSON");
    }

    #[test]
    fn causes_are_displayed() {
        let err = format_err!("root").context("outer");
        let fault = Fault::from(err);
        let shown = fault.display_causes_without_backtrace().to_string();
        assert!(shown.starts_with("ERROR: outer\n"));
        assert!(shown.contains("caused by: root"));
    }
}
