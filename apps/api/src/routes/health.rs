use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use sysinfo::{Disks, System};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /health/detailed
/// Service-by-service probes plus host resource usage.
pub async fn detailed_health_handler(State(state): State<AppState>) -> Json<Value> {
    let db_healthy = state.store.ping().await;
    let cache_healthy = state.cache.ping().await;

    // Cache outages degrade to local compute, so only the database gates
    // overall health.
    let status = if db_healthy { "ok" } else { "degraded" };

    let mut system = System::new();
    system.refresh_memory();
    system.refresh_cpu_usage();
    let memory_percent = if system.total_memory() > 0 {
        (system.used_memory() as f64 / system.total_memory() as f64 * 100.0 * 10.0).round() / 10.0
    } else {
        0.0
    };
    let cpu_percent = (f64::from(system.global_cpu_usage()) * 10.0).round() / 10.0;

    let disks = Disks::new_with_refreshed_list();
    let disk_percent = disks
        .iter()
        .filter(|d| d.total_space() > 0)
        .map(|d| {
            let used = d.total_space().saturating_sub(d.available_space());
            used as f64 / d.total_space() as f64 * 100.0
        })
        .fold(0.0_f64, f64::max);
    let disk_percent = (disk_percent * 10.0).round() / 10.0;

    Json(json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": (Utc::now() - state.start_time).num_seconds(),
        "services": {
            "postgres": if db_healthy { "healthy" } else { "unhealthy" },
            "cache": if cache_healthy { "healthy" } else { "unhealthy" },
        },
        "resources": {
            "memory_percent": memory_percent,
            "cpu_percent": cpu_percent,
            "disk_percent": disk_percent,
        },
    }))
}

/// GET /metrics — Prometheus text exposition.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.encode_text(),
    )
        .into_response()
}
