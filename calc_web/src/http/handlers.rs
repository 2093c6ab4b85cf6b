//! HTTP handlers for the JSON API.

use std::collections::BTreeMap;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{Map, Value};

use calc_core::{CalcError, CalculationResponse};

use super::dto::{CalculateRequest, CalculatorDetail, HealthResponse};
use super::error::AppError;
use super::state::AppState;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /calculators
///
/// Name to title for every registered calculator.
pub async fn list_calculators(State(state): State<AppState>) -> Json<BTreeMap<String, String>> {
    Json(state.registry.available())
}

/// GET /calculators/{name}
///
/// Documentation and declared fields, without loading the calculator.
pub async fn get_calculator(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HandlerResult<CalculatorDetail> {
    let spec = state
        .registry
        .get_spec(&name)
        .ok_or_else(|| CalcError::not_found(&name))?;
    Ok(Json(spec.into()))
}

/// POST /calculate
///
/// Body: `{ "calculator": "<name>", "params": { ... } }`
pub async fn calculate(
    State(state): State<AppState>,
    body: Result<Json<CalculateRequest>, JsonRejection>,
) -> HandlerResult<CalculationResponse> {
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let name = request
        .calculator
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing 'calculator' field".to_string()))?;
    let params = match request.params {
        Value::Null => Value::Object(Map::new()),
        params => params,
    };

    tracing::debug!(calculator = %name, "calculate request");
    let response = state.calculate(name, params).await?;
    Ok(Json(response))
}
