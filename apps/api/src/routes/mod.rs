pub mod health;

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::auth;
use crate::billing;
use crate::query;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public surface: health, metrics, registration.
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/detailed", get(health::detailed_health_handler))
        .route("/metrics", get(health::metrics_handler))
        .route("/auth/register", post(auth::handle_register));

    // Everything else requires a bearer token.
    let protected = Router::new()
        .route("/analyze", post(analysis::handle_analyze))
        .route("/compare", post(query::handle_compare))
        .route("/benchmark", post(query::handle_benchmark))
        .route("/frameworks", get(query::handle_frameworks))
        .route("/company/:name/history", get(query::handle_company_history))
        .route("/analysis/:id/gaps", get(query::handle_analysis_gaps))
        .route("/export", post(query::handle_export))
        .route("/usage", get(query::handle_usage))
        .route("/subscribe", post(billing::handle_subscribe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), track_requests))
        .with_state(state)
}

/// Records `api_requests_total` and `api_request_duration_seconds` for every
/// request, labeled by route template.
async fn track_requests(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;

    state
        .metrics
        .api_requests_total
        .with_label_values(&[&endpoint, response.status().as_str()])
        .inc();
    state
        .metrics
        .api_request_duration_seconds
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tower::ServiceExt;

    use crate::acquire::Fetcher;
    use crate::auth::create_token;
    use crate::billing::OfflinePaymentProcessor;
    use crate::cache::{AnalysisCache, SingleFlight};
    use crate::config::Config;
    use crate::governor::Governor;
    use crate::scoring::KeywordSentimentProvider;
    use crate::store::models::Tier;
    use crate::store::PgStore;
    use crate::telemetry::ApiMetrics;

    fn mock_state() -> AppState {
        let config = Config {
            jwt_secret: "test-secret".to_string(),
            token_ttl_min: 60,
            db_uri: "postgres://localhost/unused".to_string(),
            db_pool_min: 1,
            db_pool_max: 1,
            cache_url: String::new(),
            free_tier_credits: 100,
            cors_origins: vec![],
            rate_limit_overrides: Default::default(),
            fetch_max_bytes: 1024,
            fetch_timeout_ms: 1000,
            cache_ttl_sec: 60,
            port: 0,
            rust_log: "info".to_string(),
        };
        // Lazy pool: no connection is made until a query runs, which these
        // tests never do.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.db_uri)
            .expect("lazy pool");

        AppState {
            store: PgStore::new(pool),
            cache: AnalysisCache::disabled(),
            single_flight: Arc::new(SingleFlight::new()),
            fetcher: Arc::new(Fetcher::new(1024, 1000).unwrap()),
            governor: Arc::new(Governor::new(Default::default())),
            sentiment: Arc::new(KeywordSentimentProvider),
            payments: Arc::new(OfflinePaymentProcessor),
            metrics: Arc::new(ApiMetrics::new().unwrap()),
            config: Arc::new(config),
            start_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(mock_state());
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_is_public() {
        let app = build_router(mock_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()[axum::http::header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = build_router(mock_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let app = build_router(mock_state());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/usage")
                    .header("authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_frameworks_with_valid_token() {
        let state = mock_state();
        let token = create_token(&state.config.jwt_secret, "uid-1", Tier::Free, 60).unwrap();
        let app = build_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/frameworks")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["frameworks"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_wrong_secret_token_rejected() {
        let state = mock_state();
        let token = create_token("another-secret", "uid-1", Tier::Free, 60).unwrap();
        let app = build_router(state);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/frameworks")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
