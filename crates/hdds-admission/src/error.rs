// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by every admission-engine operation.
//!
//! Policy outcomes (a sample rejected by destination order, a sample
//! suppressed by the time-based filter) are *not* errors: they only show up
//! in status counters. The variants below are reserved for caller mistakes
//! and resource exhaustion.
//!
//! # Example
//!
//! ```
//! use hdds_admission::{Error, QoS, History};
//!
//! let qos = QoS::default().history(History::KeepLast(0));
//! match qos.validate() {
//!     Err(Error::InvalidArgument(msg)) => println!("rejected: {}", msg),
//!     other => panic!("unexpected: {:?}", other),
//! }
//! ```

/// Errors returned by admission-engine operations.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// Malformed argument or inconsistent QoS combination.
    InvalidArgument(String),
    /// Operation targets a deleted (or never created) entity or instance.
    NotFound(String),
    /// Operation is not allowed in the current state (e.g. read of size zero).
    PreconditionNotMet(String),

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// History or instance index allocation failed (resource limits reached).
    OutOfResources(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// QoS profile document could not be parsed or resolved.
    Config(String),
    /// I/O error with underlying cause.
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            Error::OutOfResources(msg) => write!(f, "Out of resources: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

/// Convenient alias for results using the crate `Error` type.
pub type Result<T> = core::result::Result<T, Error>;
