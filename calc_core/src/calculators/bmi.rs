//! # BMI Calculator
//!
//! Body Mass Index from weight and height, classified with the WHO adult
//! cut-offs.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::calculators::bmi::{calculate, BmiInput, UnitSystem};
//!
//! let input = BmiInput { weight: 70.0, height: 1.75, unit_system: UnitSystem::Metric };
//! let resp = calculate(&input).unwrap();
//!
//! assert_eq!(resp.result_f64(), Some(22.86));
//! assert_eq!(resp.interpretation.as_deref(), Some("Normal"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{number, round2, text, Calculator};
use crate::errors::{CalcError, CalcResult};
use crate::response::CalculationResponse;

pub const NAME: &str = "bmi";

const REFERENCE: &str = "WHO 2023 Guidelines";
const KG_PER_LB: f64 = 0.45359237;
const M_PER_IN: f64 = 0.0254;

/// Unit system for weight and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// kg and m
    Metric,
    /// lb and in
    Imperial,
}

impl UnitSystem {
    fn parse(raw: &str) -> CalcResult<Self> {
        match raw {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            other => Err(CalcError::invalid_input(
                "unit_system",
                other,
                "unit_system must be one of: metric, imperial",
            )),
        }
    }
}

/// Input parameters.
///
/// ## JSON Example
///
/// ```json
/// { "weight": 70, "height": 1.75, "unit_system": "metric" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiInput {
    /// kg (metric) or lb (imperial)
    pub weight: f64,
    /// m (metric) or in (imperial)
    pub height: f64,
    pub unit_system: UnitSystem,
}

impl BmiInput {
    /// Read inputs from a JSON object. The unit system is read first so
    /// range checks can depend on it.
    pub fn from_params(params: &Value) -> CalcResult<Self> {
        let unit_system = UnitSystem::parse(text(params, "unit_system")?)?;
        Ok(BmiInput {
            weight: number(params, "weight")?,
            height: number(params, "height")?,
            unit_system,
        })
    }

    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        let (max_weight, max_height, weight_unit, height_unit, height_label) = match self.unit_system {
            UnitSystem::Metric => (500.0, 3.0, "kg", "m", "3.0"),
            UnitSystem::Imperial => (1100.0, 118.0, "lb", "in", "118"),
        };
        if !(self.weight > 0.0 && self.weight <= max_weight) {
            return Err(CalcError::invalid_input(
                "weight",
                self.weight.to_string(),
                format!("weight ({}) must be in (0, {}]", weight_unit, max_weight),
            ));
        }
        if !(self.height > 0.0 && self.height <= max_height) {
            return Err(CalcError::invalid_input(
                "height",
                self.height.to_string(),
                format!("height ({}) must be in (0, {}]", height_unit, height_label),
            ));
        }
        Ok(())
    }

    pub fn weight_kg(&self) -> f64 {
        match self.unit_system {
            UnitSystem::Metric => self.weight,
            UnitSystem::Imperial => self.weight * KG_PER_LB,
        }
    }

    pub fn height_m(&self) -> f64 {
        match self.unit_system {
            UnitSystem::Metric => self.height,
            UnitSystem::Imperial => self.height * M_PER_IN,
        }
    }
}

/// WHO classification of an adult BMI.
pub fn classify(bmi: f64) -> &'static str {
    if bmi < 18.5 {
        "Underweight"
    } else if bmi < 25.0 {
        "Normal"
    } else if bmi < 30.0 {
        "Overweight"
    } else {
        "Obese"
    }
}

/// Calculate BMI.
pub fn calculate(input: &BmiInput) -> CalcResult<CalculationResponse> {
    input.validate()?;

    let weight_kg = input.weight_kg();
    let height_m = input.height_m();
    let bmi = round2(weight_kg / height_m.powi(2));

    Ok(CalculationResponse::new(bmi)
        .with_working(
            "description",
            format!(
                "Weight: {:.2} kg, Height: {:.2} m → BMI = {:.2}",
                weight_kg, height_m, bmi
            ),
        )
        .with_interpretation(classify(bmi))
        .with_reference(REFERENCE)
        .stamped(NAME))
}

/// Registry entry point.
pub struct Bmi;

pub fn factory() -> Box<dyn Calculator> {
    Box::new(Bmi)
}

impl Calculator for Bmi {
    fn name(&self) -> &'static str {
        NAME
    }

    fn calculate(&self, inputs: &Value) -> CalcResult<CalculationResponse> {
        calculate(&BmiInput::from_params(inputs)?)
    }
}
