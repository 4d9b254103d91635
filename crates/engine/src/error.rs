//! The module contains the errors the engine can return.
//!
//! Only local-side problems are errors here: a failing remote never surfaces
//! as an [`EngineError`], it degrades to local durability instead (see
//! [`RemoteError`]).
//!
//! - [`Database`] thrown when the local record store fails.
//! - [`InvalidRecord`] thrown when a stored payload cannot be (de)serialized.
//! - [`InvalidAmount`] thrown when user input is not a valid amount.
//!
//!  [`Database`]: EngineError::Database
//!  [`InvalidRecord`]: EngineError::InvalidRecord
//!  [`InvalidAmount`]: EngineError::InvalidAmount
//!  [`RemoteError`]: crate::RemoteError
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Missing component: {0}")]
    MissingComponent(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl From<serde_json::Error> for EngineError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRecord(value.to_string())
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidRecord(a), Self::InvalidRecord(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::MissingComponent(a), Self::MissingComponent(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
