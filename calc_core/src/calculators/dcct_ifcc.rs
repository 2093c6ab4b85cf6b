//! # DCCT/IFCC Converter
//!
//! Converts HbA1c between the NGSP/DCCT percentage and the IFCC mmol/mol
//! scale using the master equation:
//!
//! - `IFCC = (DCCT - 2.15) × 10.929`
//! - `DCCT = (IFCC / 10.929) + 2.15`
//!
//! Results are rounded to 2 decimals and classified as Normal, Prediabetes
//! or Diabetes on the output scale.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{display_number, number, round2, text, Calculator};
use crate::errors::{CalcError, CalcResult};
use crate::response::CalculationResponse;

pub const NAME: &str = "dcct_ifcc";

const REFERENCE: &str = "NGSP/IFCC 2023 Guidelines";
const SLOPE: f64 = 10.929;
const OFFSET: f64 = 2.15;
const MAX_DCCT: f64 = 20.0;
const MAX_IFCC: f64 = 200.0;

/// Scale of the input value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HbA1cUnit {
    /// NGSP/DCCT percent
    Dcct,
    /// IFCC mmol/mol
    Ifcc,
}

impl HbA1cUnit {
    fn parse(raw: &str) -> CalcResult<Self> {
        match raw {
            "dcct" => Ok(HbA1cUnit::Dcct),
            "ifcc" => Ok(HbA1cUnit::Ifcc),
            other => Err(CalcError::invalid_input(
                "input_unit",
                other,
                "input_unit must be one of: dcct, ifcc",
            )),
        }
    }
}

/// Input parameters.
///
/// ## JSON Example
///
/// ```json
/// { "value": 7.0, "input_unit": "dcct" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcctIfccInput {
    pub value: f64,
    pub input_unit: HbA1cUnit,
}

impl DcctIfccInput {
    pub fn from_params(params: &Value) -> CalcResult<Self> {
        let input_unit = HbA1cUnit::parse(text(params, "input_unit")?)?;
        Ok(DcctIfccInput {
            value: number(params, "value")?,
            input_unit,
        })
    }

    /// Validate input parameters.
    pub fn validate(&self) -> CalcResult<()> {
        if self.value <= 0.0 {
            return Err(CalcError::invalid_input(
                "value",
                self.value.to_string(),
                "value must be > 0",
            ));
        }
        match self.input_unit {
            HbA1cUnit::Dcct if self.value > MAX_DCCT => Err(CalcError::invalid_input(
                "value",
                self.value.to_string(),
                "DCCT value must be ≤ 20%",
            )),
            HbA1cUnit::Ifcc if self.value > MAX_IFCC => Err(CalcError::invalid_input(
                "value",
                self.value.to_string(),
                "IFCC value must be ≤ 200 mmol/mol",
            )),
            _ => Ok(()),
        }
    }
}

/// Glycaemic category of a value on the given scale.
pub fn normal_range(value: f64, unit: HbA1cUnit) -> &'static str {
    match unit {
        HbA1cUnit::Dcct if value <= 6.0 => "Normal",
        HbA1cUnit::Dcct if value < 6.5 => "Prediabetes",
        HbA1cUnit::Ifcc if value < 42.0 => "Normal",
        HbA1cUnit::Ifcc if value < 48.0 => "Prediabetes",
        _ => "Diabetes",
    }
}

/// Convert between DCCT (%) and IFCC (mmol/mol).
pub fn calculate(input: &DcctIfccInput) -> CalcResult<CalculationResponse> {
    input.validate()?;

    let value = display_number(input.value);
    let (result, formula, calculation, interpretation) = match input.input_unit {
        HbA1cUnit::Dcct => {
            let result = round2((input.value - OFFSET) * SLOPE);
            (
                result,
                "IFCC = (DCCT - 2.15) × 10.929",
                format!("({} - 2.15) × 10.929 = {} mmol/mol", value, display_number(result)),
                format!(
                    "{}% DCCT = {} mmol/mol IFCC: {}",
                    value,
                    display_number(result),
                    normal_range(result, HbA1cUnit::Ifcc)
                ),
            )
        }
        HbA1cUnit::Ifcc => {
            let result = round2(input.value / SLOPE + OFFSET);
            (
                result,
                "DCCT = (IFCC / 10.929) + 2.15",
                format!("({} / 10.929) + 2.15 = {}%", value, display_number(result)),
                format!(
                    "{} mmol/mol IFCC = {}% DCCT: {}",
                    value,
                    display_number(result),
                    normal_range(result, HbA1cUnit::Dcct)
                ),
            )
        }
    };

    Ok(CalculationResponse::new(result)
        .with_working("formula", formula)
        .with_working("calculation", calculation)
        .with_interpretation(interpretation)
        .with_reference(REFERENCE)
        .stamped(NAME))
}

/// Registry entry point.
pub struct DcctIfcc;

pub fn factory() -> Box<dyn Calculator> {
    Box::new(DcctIfcc)
}

impl Calculator for DcctIfcc {
    fn name(&self) -> &'static str {
        NAME
    }

    fn calculate(&self, inputs: &Value) -> CalcResult<CalculationResponse> {
        calculate(&DcctIfccInput::from_params(inputs)?)
    }
}
