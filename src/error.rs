//! Error types for mockmail

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid folder name '{0}'")]
    InvalidName(String),

    #[error("Mock messages are read-only")]
    ReadOnly,

    #[error("{0} not supported")]
    Unsupported(&'static str),

    #[error("Simulated error: {0}")]
    SimulatedFailure(String),

    #[error("Message number ({index}) out of bounds ({len}) for '{folder}'")]
    Bounds {
        index: usize,
        len: usize,
        folder: String,
    },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Message parsing error: {0}")]
    Parse(String),

    #[error("Scenario step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
