//! Application state for the HTTP server.

use std::sync::Arc;

use serde_json::Value;

use calc_core::{CalcResult, CalculationResponse, Registry};

use super::error::AppError;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Load and run a calculator on the blocking pool. Loading may run the
    /// package installer, which must not stall the async workers.
    pub async fn calculate(&self, name: String, params: Value) -> Result<CalculationResponse, AppError> {
        let registry = Arc::clone(&self.registry);
        let outcome: CalcResult<CalculationResponse> =
            tokio::task::spawn_blocking(move || registry.calculate(&name, &params))
                .await
                .map_err(|e| AppError::Internal(format!("calculation task failed: {}", e)))?;
        Ok(outcome?)
    }
}
