//! The user-facing result of running a command.

use std::fmt;

use crate::errors::{Fault, CONNECTION_FAILURE_DESCRIPTION};

/// Used when someone tries to build a failure without saying what failed.
const UNKNOWN_FAILURE_DESCRIPTION: &str = "an unknown error occurred";

/// Either success (possibly with a payload), or failure with a non-empty
/// human-readable description.
///
/// This is deliberately separate from `Result`: an `Outcome` is what we show
/// the user, and a failed task on the server is still a successful
/// `Outcome<TaskStatus>` as long as we could find out about it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Outcome<T = ()> {
    inner: Inner<T>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
enum Inner<T> {
    Success(Option<T>),
    Failure(String),
}

impl<T> Outcome<T> {
    /// A success with no payload.
    pub fn successful() -> Outcome<T> {
        Outcome {
            inner: Inner::Success(None),
        }
    }

    /// A success carrying `payload`.
    pub fn successful_with(payload: T) -> Outcome<T> {
        Outcome {
            inner: Inner::Success(Some(payload)),
        }
    }

    /// A failure. An empty `description` is replaced with a generic one.
    pub fn failure<S: Into<String>>(description: S) -> Outcome<T> {
        let mut description = description.into();
        if description.trim().is_empty() {
            description = UNKNOWN_FAILURE_DESCRIPTION.to_owned();
        }
        Outcome {
            inner: Inner::Failure(description),
        }
    }

    /// The failure we report when the server can't be reached.
    pub fn connection_failure() -> Outcome<T> {
        Outcome::failure(CONNECTION_FAILURE_DESCRIPTION)
    }

    /// Convert a fault into a failure, using the fixed "server unreachable"
    /// message for anything involving a connectivity problem.
    pub fn from_fault(fault: &Fault) -> Outcome<T> {
        if fault.is_connectivity() {
            Outcome::connection_failure()
        } else {
            Outcome::failure(fault.to_string())
        }
    }

    /// Did this succeed?
    pub fn is_success(&self) -> bool {
        matches!(self.inner, Inner::Success(_))
    }

    /// What went wrong, or `""` on success.
    pub fn failure_description(&self) -> &str {
        match &self.inner {
            Inner::Success(_) => "",
            Inner::Failure(description) => description,
        }
    }

    /// The payload of a successful outcome, if any.
    pub fn payload(&self) -> Option<&T> {
        match &self.inner {
            Inner::Success(payload) => payload.as_ref(),
            Inner::Failure(_) => None,
        }
    }

    /// Split into the payload or the failure description.
    pub fn into_result(self) -> Result<Option<T>, String> {
        match self.inner {
            Inner::Success(payload) => Ok(payload),
            Inner::Failure(description) => Err(description),
        }
    }

    /// Drop the payload, keeping success or failure.
    pub fn without_payload(self) -> Outcome<()> {
        match self.inner {
            Inner::Success(_) => Outcome::successful(),
            Inner::Failure(description) => Outcome {
                inner: Inner::Failure(description),
            },
        }
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Success(_) => write!(f, "success"),
            Inner::Failure(description) => write!(f, "failure: {}", description),
        }
    }
}

#[test]
fn success_has_empty_description() {
    let outcome = Outcome::successful_with(3);
    assert!(outcome.is_success());
    assert_eq!(outcome.failure_description(), "");
    assert_eq!(outcome.payload(), Some(&3));
    assert_eq!(outcome.to_string(), "success");
}

#[test]
fn failure_always_has_description() {
    let outcome = Outcome::<()>::failure("task exploded");
    assert!(!outcome.is_success());
    assert_eq!(outcome.failure_description(), "task exploded");
    assert_eq!(outcome.to_string(), "failure: task exploded");

    let blank = Outcome::<()>::failure("  ");
    assert!(!blank.is_success());
    assert!(!blank.failure_description().is_empty());
}

#[test]
fn connectivity_faults_become_connection_failures() {
    let outcome = Outcome::<()>::from_fault(&Fault::Connectivity("refused".to_owned()));
    assert_eq!(outcome.failure_description(), CONNECTION_FAILURE_DESCRIPTION);
    let outcome =
        Outcome::<()>::from_fault(&Fault::Other(anyhow::format_err!("bad JSON")));
    assert_eq!(outcome.failure_description(), "bad JSON");
}

#[test]
fn without_payload_keeps_success_or_failure() {
    let done = Outcome::successful_with("chef run").without_payload();
    assert_eq!(done, Outcome::successful());

    let failed = Outcome::<&str>::failure("timed out").without_payload();
    assert_eq!(failed.failure_description(), "timed out");
}
