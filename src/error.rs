//! Error types for Marga

use thiserror::Error;

use crate::flight::ActuatorError;
use crate::planning::PlanError;

/// Marga error type
#[derive(Error, Debug)]
pub enum MargaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Planning error: {0}")]
    Planning(#[from] PlanError),

    #[error("Actuator error: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Thread error: {0}")]
    Thread(String),
}

impl From<toml::de::Error> for MargaError {
    fn from(e: toml::de::Error) -> Self {
        MargaError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MargaError>;
