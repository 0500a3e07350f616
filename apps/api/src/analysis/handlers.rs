use axum::{extract::State, Extension, Json};

use crate::auth::AuthedUser;
use crate::errors::AppError;
use crate::state::AppState;

use super::models::{AnalyzeRequest, AnalyzeResponse};
use super::orchestrator::{self, REQUEST_TIMEOUT};

/// POST /analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    match tokio::time::timeout(REQUEST_TIMEOUT, orchestrator::analyze(&state, &user, request))
        .await
    {
        Ok(result) => result.map(Json),
        Err(_) => Err(AppError::Internal(anyhow::anyhow!(
            "Request deadline exceeded"
        ))),
    }
}
