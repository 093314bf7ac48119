//! Error taxonomy for the sensor store boundary.
//!
//! `NotFound` comes only from the store (the session never asks for an
//! unknown id). `Transport` and `Timeout` cover everything else that can go
//! wrong between the caller and the backing store.

use std::time::Duration;

/// Errors raised by a [`SensorStore`](crate::store::SensorStore)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The sensor id is not in the known set
    #[error("Sensor with ID {0} not found")]
    NotFound(String),

    /// The backing store could not be reached or answered with garbage
    #[error("Transport error: {0}")]
    Transport(String),

    /// The operation did not finish within the configured limit
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Transport(err.to_string())
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
