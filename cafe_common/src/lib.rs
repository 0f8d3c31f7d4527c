//! Code shared between the `cafe` command-line tool and anything else that
//! needs to talk to a `cafe` scheduler.

#![warn(missing_docs)]

pub use chrono;
pub use crossbeam;
pub use serde_json;
pub use tracing;
pub use url;
pub use uuid;

pub mod config;
pub mod errors;
pub mod models;
pub mod outcome;
pub mod presenter;
pub mod rest_api;
pub mod tracing_support;
pub mod waiter;

/// Common imports used by many modules.
pub mod prelude {
    pub use anyhow::{format_err, Context};
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use std::{
        fmt,
        path::{Path, PathBuf},
        result,
        time::Duration,
    };
    pub use tracing::{debug, error, info, trace, warn};
    pub use uuid::Uuid;

    pub use super::config::Config;
    pub use super::errors::{DisplayCausesAndBacktraceExt, Fault};
    pub use super::models::*;
    pub use super::outcome::Outcome;
    pub use super::presenter::Presenter;
    pub use super::{Error, Result};
}

/// Error type for this crate's functions.
pub type Error = anyhow::Error;

/// Result type for this crate's functions.
pub type Result<T, E = Error> = ::std::result::Result<T, E>;
