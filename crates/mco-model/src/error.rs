//! Error types for model values.

use thiserror::Error;

/// Errors raised while building dates, codes and stay fields from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Date text is not a valid `YYYY-MM-DD` calendar date.
    #[error("invalid date: '{value}'")]
    InvalidDate { value: String },

    /// Diagnosis code does not follow the ICD-10 layout.
    #[error("invalid diagnosis code: '{code}'")]
    InvalidDiagnosisCode { code: String },

    /// Procedure code is not 4 letters followed by 3 digits.
    #[error("invalid procedure code: '{code}'")]
    InvalidProcedureCode { code: String },

    /// GHM or GHM root code is malformed.
    #[error("invalid GHM code: '{code}'")]
    InvalidGhmCode { code: String },

    /// Sex value is neither male nor female.
    #[error("invalid sex value: '{value}'")]
    InvalidSex { value: String },
}

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    /// Create an InvalidDate error.
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Create an InvalidDiagnosisCode error.
    pub fn invalid_diagnosis(code: impl Into<String>) -> Self {
        Self::InvalidDiagnosisCode { code: code.into() }
    }

    /// Create an InvalidProcedureCode error.
    pub fn invalid_procedure(code: impl Into<String>) -> Self {
        Self::InvalidProcedureCode { code: code.into() }
    }

    /// Create an InvalidGhmCode error.
    pub fn invalid_ghm(code: impl Into<String>) -> Self {
        Self::InvalidGhmCode { code: code.into() }
    }
}
