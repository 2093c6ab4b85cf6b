//! # Error Types
//!
//! Structured error types for calc_core. Front-ends map each variant to a
//! distinct outcome: an unknown calculator is not a bad input, and a missing
//! dependency is an environment problem rather than a client mistake.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult};
//!
//! fn validate_weight(weight_kg: f64) -> CalcResult<()> {
//!     if weight_kg <= 0.0 {
//!         return Err(CalcError::InvalidInput {
//!             field: "weight".to_string(),
//!             value: weight_kg.to_string(),
//!             reason: "weight (kg) must be in (0, 500]".to_string(),
//!         });
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculator operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// No calculator with this name exists in the namespace
    #[error("Calculator '{name}' not found")]
    NotFound { name: String },

    /// Declared dependencies could not be installed
    #[error("{}", dependency_message(.missing, .calculator.as_deref(), .detail.as_deref()))]
    Dependency {
        missing: Vec<String>,
        calculator: Option<String>,
        detail: Option<String>,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error in '{path}': {reason}")]
    Config { path: String, reason: String },
}

fn dependency_message(missing: &[String], calculator: Option<&str>, detail: Option<&str>) -> String {
    let calc = calculator
        .map(|c| format!(" for calculator '{}'", c))
        .unwrap_or_default();
    let mut msg = format!("Failed to install dependencies{}: {:?}", calc, missing);
    if let Some(detail) = detail {
        msg.push('\n');
        msg.push_str(detail);
    }
    msg
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(name: impl Into<String>) -> Self {
        CalcError::NotFound { name: name.into() }
    }

    /// Create a Dependency error
    pub fn dependency(missing: Vec<String>, calculator: Option<&str>, detail: Option<String>) -> Self {
        CalcError::Dependency {
            missing,
            calculator: calculator.map(str::to_string),
            detail,
        }
    }

    /// Create a Config error
    pub fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::Config {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    ///
    /// A dependency failure may clear once the environment is fixed or the
    /// package index is reachable again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::Dependency { .. })
    }

    /// True for errors caused by the caller's inputs
    pub fn is_validation(&self) -> bool {
        matches!(self, CalcError::InvalidInput { .. } | CalcError::MissingField { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::NotFound { .. } => "NOT_FOUND",
            CalcError::Dependency { .. } => "DEPENDENCY_ERROR",
            CalcError::Config { .. } => "CONFIG_ERROR",
        }
    }
}
