//! Error types for the ACO engine.
//!
//! Configuration problems are reported synchronously to the caller.
//! A selection failure is an internal fault and aborts the run.

use thiserror::Error;

/// Result type alias for engine operations.
pub type AcoResult<T> = Result<T, AcoError>;

#[derive(Debug, Error)]
pub enum AcoError {
    /// Invalid run parameters (non-positive counts or rates, inverted distance range).
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// No city interval matched the drawn probability while building a trail.
    #[error("Selection failed for ant {ant} at city {city}: probabilities {probabilities:?}")]
    Selection {
        ant: usize,
        city: usize,
        probabilities: Vec<f64>,
    },

    /// Lifecycle operation called in the wrong state.
    #[error("Cannot {operation} while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The worker did not acknowledge a stop request in time and was detached.
    #[error("Worker did not stop within {waited_ms} ms")]
    StopTimeout { waited_ms: u128 },

    #[error("Worker thread panicked")]
    WorkerPanicked,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AcoError {
    pub fn config(message: impl Into<String>) -> Self {
        AcoError::Configuration {
            message: message.into(),
        }
    }
}
