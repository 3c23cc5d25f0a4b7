//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`KeyNotFound`] thrown when a group, member, expense or category is not
//!   found.
//! - [`BeneficiaryNotFound`] thrown when an expense names a beneficiary with
//!   no balance row. Nothing is written in that case.
//! - [`Unauthorized`] thrown when a non-admin attempts an admin operation.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`BeneficiaryNotFound`]: EngineError::BeneficiaryNotFound
//!  [`Unauthorized`]: EngineError::Unauthorized
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Invalid rate: {0}")]
    InvalidRate(String),
    #[error("Beneficiary not found: {0}")]
    BeneficiaryNotFound(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Balance not settled: {0}")]
    NotSettled(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for failures of the storage layer, as opposed to domain
    /// rejections.
    #[must_use]
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidName(a), Self::InvalidName(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::InvalidRate(a), Self::InvalidRate(b)) => a == b,
            (Self::BeneficiaryNotFound(a), Self::BeneficiaryNotFound(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::NotSettled(a), Self::NotSettled(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
