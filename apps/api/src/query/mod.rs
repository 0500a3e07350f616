//! Query & Export — read-side endpoints over the persistence store:
//! company history, gap listings, cross-company comparison, benchmarking,
//! and CSV/JSON export.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthedUser;
use crate::catalog::{catalog, Severity};
use crate::compliance::{self, FrameworkCoverage, GapItem};
use crate::errors::AppError;
use crate::governor::RateEndpoint;
use crate::scoring::round1;
use crate::state::AppState;
use crate::store::models::{ActivityEvent, AnalysisRow};

const MAX_COMPARE_COMPANIES: usize = 5;
const MAX_BENCHMARK_COMPANIES: usize = 10;
const EXPORT_PAGE_SIZE: i64 = 1000;

/// Trend threshold: a swing of at least ±2 points over the last three
/// analyses counts as movement.
const TREND_DELTA: f64 = 2.0;

// ────────────────────────────────────────────────────────────────────────────
// GET /frameworks
// ────────────────────────────────────────────────────────────────────────────

pub async fn handle_frameworks() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "frameworks": catalog().summary() }))
}

// ────────────────────────────────────────────────────────────────────────────
// GET /company/:name/history
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_days")]
    pub days: i64,
}

fn default_history_days() -> i64 {
    90
}

#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
    /// Framework → coverage percentage at that point.
    pub coverage: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub company: String,
    pub period_days: i64,
    pub history: Vec<HistoryPoint>,
    pub trend: &'static str,
}

pub async fn handle_company_history(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthedUser>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let days = query.days.clamp(1, 3650);
    let since = Utc::now() - Duration::days(days);
    let rows = state.store.company_history(&name, since).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(format!(
            "No historical data found for company '{name}'"
        )));
    }

    let history: Vec<HistoryPoint> = rows
        .iter()
        .map(|row| HistoryPoint {
            timestamp: row.created_at,
            environmental: row.environmental,
            social: row.social,
            governance: row.governance,
            overall: row.overall,
            coverage: coverage_map(row),
        })
        .collect();

    // History is oldest-first; trend reads the newest points.
    let newest_first: Vec<f64> = rows.iter().rev().map(|r| r.overall).collect();
    Ok(Json(HistoryResponse {
        company: name,
        period_days: days,
        trend: trend_tag(&newest_first),
        history,
    }))
}

fn coverage_map(row: &AnalysisRow) -> BTreeMap<String, f64> {
    parse_coverage(row)
        .into_iter()
        .map(|c| (c.framework.as_str().to_string(), c.coverage_percentage))
        .collect()
}

fn parse_coverage(row: &AnalysisRow) -> Vec<FrameworkCoverage> {
    row.result
        .get("framework_coverage")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

fn parse_gaps(row: &AnalysisRow) -> Vec<GapItem> {
    row.result
        .get("gap_analysis")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Trend over the last three points (newest first): Δ ≥ +2 improving,
/// Δ ≤ −2 declining, otherwise stable.
pub fn trend_tag(overall_newest_first: &[f64]) -> &'static str {
    let window = &overall_newest_first[..overall_newest_first.len().min(3)];
    if window.len() < 2 {
        return "stable";
    }
    let delta = window[0] - window[window.len() - 1];
    if delta >= TREND_DELTA {
        "improving"
    } else if delta <= -TREND_DELTA {
        "declining"
    } else {
        "stable"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GET /analysis/:id/gaps
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GapsResponse {
    pub analysis_id: Uuid,
    pub total_gaps: usize,
    pub gaps: Vec<GapItem>,
    pub critical_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
}

pub async fn handle_analysis_gaps(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<GapsResponse>, AppError> {
    // Owner mismatch and absence are the same 404.
    let row = state
        .store
        .get_analysis(&user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Analysis not found".to_string()))?;

    let mut gaps = parse_gaps(&row);
    compliance::sort_gaps(&mut gaps);

    let count = |severity: Severity| gaps.iter().filter(|g| g.severity == severity).count();
    Ok(Json(GapsResponse {
        analysis_id: id,
        total_gaps: gaps.len(),
        critical_count: count(Severity::Critical),
        high_count: count(Severity::High),
        medium_count: count(Severity::Medium),
        low_count: count(Severity::Low),
        gaps,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /compare
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub companies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CompanyScores {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
}

#[derive(Debug, Serialize)]
pub struct CompareEntry {
    pub scores: Option<CompanyScores>,
    pub trend: Option<&'static str>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub companies: BTreeMap<String, CompareEntry>,
    pub benchmark: Option<CompanyScores>,
}

pub async fn handle_compare(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(request): Json<CompareRequest>,
) -> Result<Json<CompareResponse>, AppError> {
    if request.companies.is_empty() {
        return Err(AppError::Validation(
            "At least one company must be provided".to_string(),
        ));
    }
    if request.companies.len() > MAX_COMPARE_COMPANIES {
        return Err(AppError::Validation(format!(
            "Maximum {MAX_COMPARE_COMPANIES} companies can be compared at once"
        )));
    }
    check_rate(&state, &user, RateEndpoint::Compare).await?;

    let mut companies = BTreeMap::new();
    let mut sector: Option<String> = None;
    for name in &request.companies {
        let entry = match state.store.latest_analysis_for_company(name).await? {
            Some(latest) => {
                sector = sector.or_else(|| latest.industry_sector.clone());
                let recent = state.store.recent_company_scores(name, 3).await?;
                let newest_first: Vec<f64> = recent.iter().map(|r| r.overall).collect();
                CompareEntry {
                    scores: Some(CompanyScores {
                        environmental: latest.environmental,
                        social: latest.social,
                        governance: latest.governance,
                        overall: latest.overall,
                    }),
                    trend: Some(trend_tag(&newest_first)),
                    last_updated: Some(latest.created_at),
                    message: None,
                }
            }
            None => CompareEntry {
                scores: None,
                trend: None,
                last_updated: None,
                message: Some("No analysis data available for this company".to_string()),
            },
        };
        companies.insert(name.clone(), entry);
    }

    let baseline = state.store.aggregate_benchmark(sector.as_deref()).await?;
    let benchmark = match (
        baseline.environmental,
        baseline.social,
        baseline.governance,
        baseline.overall,
    ) {
        (Some(e), Some(s), Some(g), Some(o)) => Some(CompanyScores {
            environmental: e,
            social: s,
            governance: g,
            overall: o,
        }),
        _ => None,
    };

    state
        .store
        .record_activity(
            &user.id,
            ActivityEvent::Compare,
            serde_json::json!({ "companies": request.companies.len() }),
        )
        .await;

    Ok(Json(CompareResponse {
        companies,
        benchmark,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /benchmark
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BenchmarkRequest {
    pub companies: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkCompliance {
    pub coverage: f64,
    pub mandatory_met: usize,
    pub mandatory_total: usize,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkEntry {
    pub scores: CompanyScores,
    pub trend: &'static str,
    pub framework_compliance: BTreeMap<String, BenchmarkCompliance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BenchmarkResponse {
    pub companies: BTreeMap<String, BenchmarkEntry>,
    pub average_scores: CompanyScores,
    pub best_performer: Option<String>,
    pub frameworks_analyzed: Vec<String>,
}

pub async fn handle_benchmark(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(request): Json<BenchmarkRequest>,
) -> Result<Json<BenchmarkResponse>, AppError> {
    if request.companies.is_empty() {
        return Err(AppError::Validation(
            "At least one company must be provided".to_string(),
        ));
    }
    if request.companies.len() > MAX_BENCHMARK_COMPANIES {
        return Err(AppError::Validation(format!(
            "Maximum {MAX_BENCHMARK_COMPANIES} companies allowed"
        )));
    }
    let frameworks = if request.frameworks.is_empty() {
        vec!["CSRD".to_string(), "TCFD".to_string()]
    } else {
        for name in &request.frameworks {
            if crate::catalog::Framework::parse(name).is_none() {
                return Err(AppError::Validation(format!("Invalid framework '{name}'")));
            }
        }
        request.frameworks.clone()
    };
    check_rate(&state, &user, RateEndpoint::Compare).await?;

    let mut companies = BTreeMap::new();
    let mut with_data: Vec<(String, f64)> = Vec::new();
    let mut sums = (0.0, 0.0, 0.0, 0.0);

    for name in &request.companies {
        let entry = match state.store.latest_analysis_for_company(name).await? {
            Some(latest) => {
                let coverage = parse_coverage(&latest);
                let mut compliance_map = BTreeMap::new();
                for fw in &frameworks {
                    let found = coverage.iter().find(|c| c.framework.as_str() == fw);
                    compliance_map.insert(
                        fw.clone(),
                        BenchmarkCompliance {
                            coverage: found.map(|c| c.coverage_percentage).unwrap_or(0.0),
                            mandatory_met: found.map(|c| c.mandatory_met).unwrap_or(0),
                            mandatory_total: found.map(|c| c.mandatory_total).unwrap_or(0),
                        },
                    );
                }

                let recent = state.store.recent_company_scores(name, 3).await?;
                let newest_first: Vec<f64> = recent.iter().map(|r| r.overall).collect();

                sums.0 += latest.environmental;
                sums.1 += latest.social;
                sums.2 += latest.governance;
                sums.3 += latest.overall;
                with_data.push((name.clone(), latest.overall));

                BenchmarkEntry {
                    scores: CompanyScores {
                        environmental: latest.environmental,
                        social: latest.social,
                        governance: latest.governance,
                        overall: latest.overall,
                    },
                    trend: trend_tag(&newest_first),
                    framework_compliance: compliance_map,
                    message: None,
                }
            }
            None => BenchmarkEntry {
                scores: CompanyScores {
                    environmental: 0.0,
                    social: 0.0,
                    governance: 0.0,
                    overall: 0.0,
                },
                trend: "stable",
                framework_compliance: BTreeMap::new(),
                message: Some("No framework analysis available".to_string()),
            },
        };
        companies.insert(name.clone(), entry);
    }

    let n = with_data.len().max(1) as f64;
    let average_scores = CompanyScores {
        environmental: round1(sums.0 / n),
        social: round1(sums.1 / n),
        governance: round1(sums.2 / n),
        overall: round1(sums.3 / n),
    };
    let best_performer = with_data
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(name, _)| name);

    state
        .store
        .record_activity(
            &user.id,
            ActivityEvent::Compare,
            serde_json::json!({ "benchmark": true, "companies": request.companies.len() }),
        )
        .await;

    Ok(Json(BenchmarkResponse {
        companies,
        average_scores,
        best_performer,
        frameworks_analyzed: frameworks,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /export
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

/// Fixed CSV column order; part of the export contract.
pub const CSV_COLUMNS: &str = "analysis_id,created_at,company_name,industry_sector,\
reporting_period,environmental,social,governance,overall,frameworks,coverage_avg";

pub async fn handle_export(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
    Json(request): Json<ExportRequest>,
) -> Result<Response, AppError> {
    if !matches!(request.format.as_str(), "json" | "csv") {
        return Err(AppError::Validation(format!(
            "Invalid format '{}': must be one of json, csv",
            request.format
        )));
    }
    check_rate(&state, &user, RateEndpoint::Export).await?;

    let rows = state
        .store
        .list_analyses_by_user(&user.id, 0, EXPORT_PAGE_SIZE)
        .await?;

    state
        .store
        .record_activity(
            &user.id,
            ActivityEvent::Export,
            serde_json::json!({ "format": request.format, "rows": rows.len() }),
        )
        .await;

    if request.format == "json" {
        return Ok(Json(serde_json::json!({ "data": rows })).into_response());
    }

    let csv = render_csv(&rows);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=esg_analyses.csv",
            ),
        ],
        csv,
    )
        .into_response())
}

fn render_csv(rows: &[AnalysisRow]) -> String {
    let mut out = String::from(CSV_COLUMNS);
    out.push('\n');
    for row in rows {
        let coverage = parse_coverage(row);
        let coverage_avg = if coverage.is_empty() {
            0.0
        } else {
            round1(
                coverage.iter().map(|c| c.coverage_percentage).sum::<f64>()
                    / coverage.len() as f64,
            )
        };
        let frameworks = coverage
            .iter()
            .map(|c| c.framework.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let fields = [
            row.id.to_string(),
            row.created_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            row.company_name.clone().unwrap_or_default(),
            row.industry_sector.clone().unwrap_or_default(),
            row.reporting_period.clone().unwrap_or_default(),
            row.environmental.to_string(),
            row.social.to_string(),
            row.governance.to_string(),
            row.overall.to_string(),
            frameworks,
            coverage_avg.to_string(),
        ];
        let line = fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GET /usage
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub current_usage: i64,
    pub limit: i64,
    pub percentage: f64,
    pub reset_at: DateTime<Utc>,
}

pub async fn handle_usage(
    State(state): State<AppState>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<UsageResponse>, AppError> {
    let current_usage = state.store.monthly_credits_used(&user.id).await?;
    let limit = user.tier.credit_allowance();
    let percentage = if limit > 0 {
        round1(current_usage as f64 / limit as f64 * 100.0)
    } else {
        0.0
    };
    Ok(Json(UsageResponse {
        current_usage,
        limit,
        percentage,
        reset_at: next_month_start(Utc::now()),
    }))
}

fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    chrono::NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(now)
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

async fn check_rate(
    state: &AppState,
    user: &AuthedUser,
    endpoint: RateEndpoint,
) -> Result<(), AppError> {
    match state.governor.check_rate(&user.id, endpoint, user.tier) {
        Ok(()) => Ok(()),
        Err(e) => {
            if matches!(e, AppError::RateLimited { .. }) {
                state
                    .metrics
                    .rate_limit_hits_total
                    .with_label_values(&[endpoint.as_str(), user.tier.as_str()])
                    .inc();
                state
                    .store
                    .record_activity(
                        &user.id,
                        ActivityEvent::RateLimitHit,
                        serde_json::json!({ "endpoint": endpoint.as_str() }),
                    )
                    .await;
            }
            Err(e)
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_tag_thresholds() {
        assert_eq!(trend_tag(&[72.0, 71.0, 70.0]), "improving");
        assert_eq!(trend_tag(&[68.0, 71.0, 70.0]), "declining");
        assert_eq!(trend_tag(&[71.0, 70.5, 70.0]), "stable");
        assert_eq!(trend_tag(&[70.0]), "stable");
        assert_eq!(trend_tag(&[]), "stable");
    }

    #[test]
    fn test_trend_uses_last_three_points_only() {
        // Older points beyond the window must not affect the tag.
        assert_eq!(trend_tag(&[72.0, 71.0, 70.0, 10.0, 99.0]), "improving");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_escape("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn test_csv_column_order_is_fixed() {
        assert!(CSV_COLUMNS.starts_with("analysis_id,created_at,company_name"));
        assert!(CSV_COLUMNS.ends_with("frameworks,coverage_avg"));
    }

    #[test]
    fn test_render_csv_shape() {
        let row = AnalysisRow {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            source: "direct_text".to_string(),
            company_name: Some("Acme, Inc.".to_string()),
            analysis_kind: "full".to_string(),
            industry_sector: Some("Technology".to_string()),
            reporting_period: Some("2024".to_string()),
            environmental: 70.0,
            social: 60.0,
            governance: 50.0,
            overall: 60.0,
            result: serde_json::json!({
                "framework_coverage": [
                    {"framework": "CSRD", "coverage_percentage": 40.0,
                     "requirements_found": 5, "requirements_total": 13,
                     "mandatory_met": 5, "mandatory_total": 13},
                    {"framework": "TCFD", "coverage_percentage": 60.0,
                     "requirements_found": 7, "requirements_total": 11,
                     "mandatory_met": 7, "mandatory_total": 11}
                ]
            }),
            created_at: Utc::now(),
        };
        let csv = render_csv(&[row]);
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_COLUMNS);
        let data = lines.next().unwrap();
        assert!(data.contains("\"Acme, Inc.\""));
        assert!(data.contains("CSRD;TCFD"));
        assert!(data.contains("50")); // coverage_avg = (40+60)/2
    }

    #[test]
    fn test_next_month_start_rolls_over_year() {
        let december = chrono::NaiveDate::from_ymd_opt(2025, 12, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
            .and_utc();
        let reset = next_month_start(december);
        assert_eq!(reset.year(), 2026);
        assert_eq!(reset.month(), 1);
        assert_eq!(reset.day(), 1);

        let june = chrono::NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(next_month_start(june).month(), 7);
    }

    #[test]
    fn test_parse_coverage_tolerates_malformed_result() {
        let row = AnalysisRow {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            source: "direct_text".to_string(),
            company_name: None,
            analysis_kind: "quick".to_string(),
            industry_sector: None,
            reporting_period: None,
            environmental: 0.0,
            social: 0.0,
            governance: 0.0,
            overall: 0.0,
            result: serde_json::json!({"framework_coverage": "not an array"}),
            created_at: Utc::now(),
        };
        assert!(parse_coverage(&row).is_empty());
        assert!(parse_gaps(&row).is_empty());
    }
}
