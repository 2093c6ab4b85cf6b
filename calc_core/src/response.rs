//! # Calculation Response
//!
//! The uniform output envelope produced by every calculator, plus the
//! metadata stamp (timestamp, version, calculator name) attached to it.
//!
//! ## JSON Example
//!
//! ```json
//! {
//!   "result": 22.86,
//!   "working": { "description": "Weight: 70.00 kg, Height: 1.75 m → BMI = 22.86" },
//!   "interpretation": "Normal",
//!   "reference": "WHO 2023 Guidelines",
//!   "metadata": {
//!     "timestamp": "2026-01-05T09:30:00.000000+00:00",
//!     "version": "0.1.0",
//!     "calculator_name": "bmi"
//!   }
//! }
//! ```

use chrono::{SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{DEFAULT_VERSION, VERSION_ENV};

static VERSION: OnceCell<String> = OnceCell::new();

/// Fix the version stamped into metadata for the rest of the process.
///
/// Returns `false` if a version was already in use.
pub fn set_version(version: impl Into<String>) -> bool {
    VERSION.set(version.into()).is_ok()
}

/// Version stamped into metadata.
///
/// Falls back to `CLINICAL_CALCULATORS_VERSION`, then the crate version.
pub fn version() -> &'static str {
    VERSION.get_or_init(|| {
        std::env::var(VERSION_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    })
}

/// Metadata attached to every response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// ISO8601 UTC timestamp of the calculation
    pub timestamp: String,
    /// Package version
    pub version: String,
    /// Calculator that produced the response
    pub calculator_name: String,
}

impl Metadata {
    /// Stamp metadata for `calculator_name` at the current instant.
    pub fn new(calculator_name: impl Into<String>) -> Self {
        Metadata {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            version: version().to_string(),
            calculator_name: calculator_name.into(),
        }
    }
}

/// Result of a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationResponse {
    /// The main result of the calculation
    pub result: Value,

    /// Intermediate calculation steps or details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working: Option<Map<String, Value>>,

    /// Interpretation of the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,

    /// Reference or source for the calculation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Timestamp, version and calculator name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl CalculationResponse {
    pub fn new(result: impl Into<Value>) -> Self {
        CalculationResponse {
            result: result.into(),
            working: None,
            interpretation: None,
            reference: None,
            metadata: None,
        }
    }

    /// Add one working step
    pub fn with_working(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.working
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_interpretation(mut self, interpretation: impl Into<String>) -> Self {
        self.interpretation = Some(interpretation.into());
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Stamp metadata for the named calculator
    pub fn stamped(mut self, calculator_name: impl Into<String>) -> Self {
        self.metadata = Some(Metadata::new(calculator_name));
        self
    }

    /// The result as a number, if it is one
    pub fn result_f64(&self) -> Option<f64> {
        self.result.as_f64()
    }
}
