//! # Calculators
//!
//! Every calculator follows the same pattern:
//!
//! - `*Input` - typed inputs read from a JSON object, with `validate()`
//! - `calculate(inputs) -> CalcResult<CalculationResponse>` - pure function
//! - `calc_core/calculators/<name>.md` - documentation block declaring the
//!   inputs (and dependencies, if any)
//!
//! The registry and front-ends only see the [`Calculator`] trait.
//!
//! ## Available Calculators
//!
//! - [`bmi`] - Body Mass Index with WHO classification
//! - [`dcct_ifcc`] - HbA1c conversion between DCCT (%) and IFCC (mmol/mol)

pub mod bmi;
pub mod dcct_ifcc;

use serde_json::Value;

use crate::errors::{CalcError, CalcResult};
use crate::response::CalculationResponse;

/// A loaded calculator.
pub trait Calculator: Send + Sync {
    /// Unique name, matching the documentation file stem
    fn name(&self) -> &'static str;

    /// Validate `inputs` and compute the response.
    ///
    /// # Errors
    ///
    /// `CalcError::InvalidInput` or `CalcError::MissingField` when inputs
    /// break the calculator's own rules.
    fn calculate(&self, inputs: &Value) -> CalcResult<CalculationResponse>;
}

/// Instantiates a calculator once its prerequisites are satisfied.
pub type CalculatorFactory = fn() -> Box<dyn Calculator>;

/// Calculators compiled into this crate.
pub fn builtin() -> Vec<(&'static str, CalculatorFactory)> {
    vec![
        (bmi::NAME, bmi::factory as CalculatorFactory),
        (dcct_ifcc::NAME, dcct_ifcc::factory as CalculatorFactory),
    ]
}

/// Round to 2 decimals.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a number the way it was entered: whole numbers keep one decimal.
pub(crate) fn display_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn field<'a>(inputs: &'a Value, name: &str) -> CalcResult<&'a Value> {
    let object = inputs.as_object().ok_or_else(|| {
        CalcError::invalid_input("params", inputs.to_string(), "params must be a JSON object")
    })?;
    match object.get(name) {
        None | Some(Value::Null) => Err(CalcError::missing_field(name)),
        Some(value) => Ok(value),
    }
}

/// Read a required numeric input. Numeric strings are accepted.
pub(crate) fn number(inputs: &Value, name: &str) -> CalcResult<f64> {
    let value = field(inputs, name)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| CalcError::invalid_input(name, value.to_string(), format!("{} must be a number", name)))
}

/// Read a required string input.
pub(crate) fn text<'a>(inputs: &'a Value, name: &str) -> CalcResult<&'a str> {
    let value = field(inputs, name)?;
    value
        .as_str()
        .ok_or_else(|| CalcError::invalid_input(name, value.to_string(), format!("{} must be a string", name)))
}
