//! Request and response bodies for the JSON API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use calc_core::{CalculatorSpec, InputField};

/// GET /health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// POST /calculate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateRequest {
    pub calculator: Option<String>,
    #[serde(default)]
    pub params: Value,
}

/// GET /calculators/{name}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorDetail {
    pub name: String,
    pub title: String,
    pub doc_config: String,
    pub inputs: Vec<InputField>,
    pub dependencies: Vec<String>,
}

impl From<CalculatorSpec> for CalculatorDetail {
    fn from(spec: CalculatorSpec) -> Self {
        CalculatorDetail {
            title: spec.title(),
            inputs: spec.inputs(),
            dependencies: spec.dependencies(),
            name: spec.name,
            doc_config: spec.doc_config,
        }
    }
}
