use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Sub-reason code attached to content acquisition failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchReason {
    Disallowed,
    TooLarge,
    Timeout,
    Upstream4xx,
    Upstream5xx,
}

impl FetchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchReason::Disallowed => "disallowed",
            FetchReason::TooLarge => "too_large",
            FetchReason::Timeout => "timeout",
            FetchReason::Upstream4xx => "upstream_4xx",
            FetchReason::Upstream5xx => "upstream_5xx",
        }
    }
}

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
/// Every response carries the envelope
/// `{ error, message, retry_after?, upgrade_url? }`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Insufficient credits (balance {balance})")]
    InsufficientCredits { balance: i64 },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable content: {0}")]
    Unprocessable(String),

    #[error("Rate limited on {endpoint}")]
    RateLimited {
        endpoint: &'static str,
        tier: String,
        limit: u32,
        retry_after_secs: u64,
        reset_at_epoch: i64,
    },

    #[error("Fetch failed ({}): {message}", reason.as_str())]
    Fetch {
        reason: FetchReason,
        message: String,
    },

    #[error("Too many concurrent analyses in flight")]
    Busy,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Authentication required".to_string(),
            ),
            AppError::InsufficientCredits { balance } => (
                StatusCode::PAYMENT_REQUIRED,
                "insufficient_credits",
                format!("Insufficient credits: balance is {balance}"),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            AppError::Unprocessable(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                msg.clone(),
            ),
            AppError::RateLimited { endpoint, tier, .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                format!("Rate limit exceeded for {endpoint} on tier {tier}"),
            ),
            AppError::Fetch { reason, message } => {
                tracing::warn!(reason = reason.as_str(), "Fetch failed: {message}");
                (StatusCode::BAD_GATEWAY, "fetch_failed", message.clone())
            }
            AppError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                "busy",
                "Too many concurrent analyses; retry shortly".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "persistence_unavailable",
                    "Persistence is temporarily unavailable".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": code,
            "message": message,
        });
        if let AppError::Fetch { reason, .. } = &self {
            body["reason"] = json!(reason.as_str());
        }
        if let AppError::RateLimited {
            retry_after_secs, ..
        } = &self
        {
            body["retry_after"] = json!(retry_after_secs);
        }
        if matches!(self, AppError::InsufficientCredits { .. }) {
            body["upgrade_url"] = json!("/subscribe");
        }

        let mut response = (status, Json(body)).into_response();

        if let AppError::RateLimited {
            limit,
            retry_after_secs,
            reset_at_epoch,
            ..
        } = &self
        {
            let headers = response.headers_mut();
            insert_header(headers, "X-RateLimit-Limit", &limit.to_string());
            insert_header(headers, "X-RateLimit-Remaining", "0");
            insert_header(headers, "X-RateLimit-Reset", &reset_at_epoch.to_string());
            insert_header(
                headers,
                header::RETRY_AFTER.as_str(),
                &retry_after_secs.to_string(),
            );
        }

        // 5xx responses carry a correlation id for the error sink.
        if status.is_server_error() {
            let request_id = uuid::Uuid::new_v4().to_string();
            tracing::error!(request_id = %request_id, status = %status, "Request failed");
            insert_header(response.headers_mut(), "X-Request-Id", &request_id);
        }

        response
    }
}

fn insert_header(headers: &mut axum::http::HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        axum::http::HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}
