//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias.
//! Only fatal conditions are errors: invalid configuration, geometry failures,
//! run-gate violations and cooperative cancellation. Sampling shortfalls and
//! per-point rejections are ordinary return values, see
//! [`crate::sampling::rejection::RegionOutcome`] and
//! [`crate::sampling::validate::RejectionReason`].
use thiserror::Error;

use crate::engine::WorkflowState;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("a sampling run is already in progress")]
    RunInProgress,

    #[error("'{action}' is not allowed in state {state:?}")]
    InvalidState {
        action: &'static str,
        state: WorkflowState,
    },

    #[error("sampling run was cancelled")]
    Cancelled,

    #[error("sampling worker failed: {0}")]
    Worker(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::InvalidConfig(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::InvalidConfig(value.to_owned())
    }
}
