//! Analysis Orchestrator — the end-to-end pipeline behind `POST /analyze`:
//! validate → admit (rate + credits) → acquire content → cache/single-flight
//! → score/extract/comply → persist → account.
//!
//! Ordering guarantees upheld here: the credit debit happens before the
//! analysis it paid for is persisted; the activity record is appended after
//! the operation completes; the cache write follows persistence. If
//! persistence fails after the debit, a compensating refund is issued and
//! recorded.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::acquire::{canonicalize_url, extract::clean_text, fingerprint, validate_url};
use crate::auth::AuthedUser;
use crate::catalog::{catalog, Framework};
use crate::compliance::{self, ComplianceReport};
use crate::errors::AppError;
use crate::extract::{self, ExtractionOutcome};
use crate::governor::{analysis_cost, RateEndpoint, CACHE_HIT_COST};
use crate::scoring::{self, ScoreSet};
use crate::state::AppState;
use crate::store::models::{ActivityEvent, AnalysisRow};
use crate::store::CreditOutcome;

use super::models::{
    AnalysisSnapshot, AnalyzeRequest, AnalyzeResponse, Diagnostics, PeerComparison, ScoreSummary,
};

/// Whole-request deadline.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Source label recorded for inline-text analyses.
const DIRECT_TEXT_SOURCE: &str = "direct_text";

/// Maximum insight items on a response.
const MAX_INSIGHTS: usize = 8;

pub async fn analyze(
    state: &AppState,
    user: &AuthedUser,
    request: AnalyzeRequest,
) -> Result<AnalyzeResponse, AppError> {
    let frameworks = request.validate()?;

    // Backpressure: a small per-user bound on concurrent analyses.
    let _slot = state.governor.acquire_slot(&user.id)?;

    // Admission: rate limit first, then a balance precheck so obviously
    // unfunded requests never reach the pipeline.
    if let Err(e) = state
        .governor
        .check_rate(&user.id, RateEndpoint::Analyze, user.tier)
    {
        if matches!(e, AppError::RateLimited { .. }) {
            state
                .metrics
                .rate_limit_hits_total
                .with_label_values(&["analyze", user.tier.as_str()])
                .inc();
            state
                .store
                .record_activity(
                    &user.id,
                    ActivityEvent::RateLimitHit,
                    serde_json::json!({ "endpoint": "analyze" }),
                )
                .await;
        }
        return Err(e);
    }

    let cost = analysis_cost(request.quick_mode, request.url.is_some());
    let balance = state
        .store
        .get_user(&user.id)
        .await?
        .ok_or(AppError::Unauthorized)?
        .credits;
    if balance < cost {
        state
            .store
            .record_activity(
                &user.id,
                ActivityEvent::CreditDenied,
                serde_json::json!({ "required": cost, "balance": balance }),
            )
            .await;
        state
            .metrics
            .credit_debits_total
            .with_label_values(&["denied"])
            .inc();
        return Err(AppError::InsufficientCredits { balance });
    }

    // Source identity for the fingerprint. URLs are validated (and the SSRF
    // guard applied) before any credits move or cache keys are derived.
    let (source_token, is_text) = match (&request.url, &request.text) {
        (Some(url), _) => {
            let parsed = reqwest::Url::parse(url)
                .map_err(|_| AppError::Validation(format!("Invalid URL: {url}")))?;
            validate_url(&parsed)?;
            (canonicalize_url(&parsed), false)
        }
        (None, Some(text)) => (text.clone(), true),
        (None, None) => unreachable!("validated above"),
    };
    let fp = fingerprint(
        &source_token,
        is_text,
        request.quick_mode,
        &frameworks,
        request.industry_sector.as_deref(),
    );

    // The debit for a computed analysis happens inside the single-flight
    // computation (before persistence); this channel carries the resulting
    // balance out past the cache-oriented return type.
    let debit_result: Mutex<Option<i64>> = Mutex::new(None);

    let (snapshot, cache_hit) = state
        .single_flight
        .compute_or_load(&state.cache, &fp, || {
            compute_analysis(state, user, &request, &frameworks, &fp, cost, &debit_result)
        })
        .await?;

    state
        .metrics
        .cache_operations_total
        .with_label_values(&["get", if cache_hit { "hit" } else { "miss" }])
        .inc();

    // Cache hits debit the quick cost rather than the full cost; computed
    // analyses were debited inside the pipeline.
    let (credits_used, credits_remaining) = match debit_result.into_inner().ok().flatten() {
        Some(remaining) if !cache_hit => (cost, remaining),
        _ => {
            let outcome = state
                .store
                .update_user_credits(&user.id, -CACHE_HIT_COST)
                .await?;
            match outcome {
                CreditOutcome::Updated(remaining) => {
                    state
                        .metrics
                        .credit_debits_total
                        .with_label_values(&["ok"])
                        .inc();
                    (CACHE_HIT_COST, remaining)
                }
                CreditOutcome::Insufficient(balance) => {
                    state
                        .metrics
                        .credit_debits_total
                        .with_label_values(&["denied"])
                        .inc();
                    return Err(AppError::InsufficientCredits { balance });
                }
            }
        }
    };

    for fw in &frameworks {
        state
            .metrics
            .analysis_by_framework_total
            .with_label_values(&[fw.as_str(), user.tier.as_str()])
            .inc();
    }

    state
        .store
        .record_activity(
            &user.id,
            ActivityEvent::Analyze,
            serde_json::json!({
                "analysis_id": snapshot.analysis_id,
                "credits_used": credits_used,
                "cache_hit": cache_hit,
                "kind": request.kind(),
            }),
        )
        .await;

    Ok(AnalyzeResponse {
        snapshot,
        cache_hit,
        credits_used,
        credits_remaining,
    })
}

/// The cache-miss path: acquire content, debit, compute, persist, cache.
async fn compute_analysis(
    state: &AppState,
    user: &AuthedUser,
    request: &AnalyzeRequest,
    frameworks: &[Framework],
    fp: &str,
    cost: i64,
    debit_result: &Mutex<Option<i64>>,
) -> Result<AnalysisSnapshot, AppError> {
    // 1. Content. Fetch failures abort before any credits move.
    let (content, source, source_type) = match &request.url {
        Some(url) => {
            let acquired = state.fetcher.fetch(url).await?;
            (acquired.text, acquired.final_url, acquired.kind)
        }
        None => {
            let text = request.text.as_deref().unwrap_or_default();
            (
                clean_text(text),
                DIRECT_TEXT_SOURCE.to_string(),
                crate::acquire::ContentKind::Text,
            )
        }
    };

    // 2. Debit. Happens-before persistence of the analysis it pays for.
    let remaining = match state.store.update_user_credits(&user.id, -cost).await? {
        CreditOutcome::Updated(balance) => {
            state
                .metrics
                .credit_debits_total
                .with_label_values(&["ok"])
                .inc();
            balance
        }
        CreditOutcome::Insufficient(balance) => {
            state
                .metrics
                .credit_debits_total
                .with_label_values(&["denied"])
                .inc();
            state
                .store
                .record_activity(
                    &user.id,
                    ActivityEvent::CreditDenied,
                    serde_json::json!({ "required": cost, "balance": balance }),
                )
                .await;
            return Err(AppError::InsufficientCredits { balance });
        }
    };
    *debit_result.lock().unwrap_or_else(|e| e.into_inner()) = Some(remaining);

    // 3. Compute. Scoring, sentiment, and metric extraction are
    // independent; compliance consumes the extracted metrics.
    let normalized = scoring::normalize(&content);
    let run_extraction = !request.quick_mode && request.extract_metrics;
    let run_sentiment = !request.quick_mode;

    let (base_scores_and_keywords, sentiment, extraction) = tokio::join!(
        async { (scoring::score(&normalized), scoring::top_keywords(&normalized, 10)) },
        async {
            if run_sentiment {
                match state.sentiment.classify(&content).await {
                    Ok(s) => Some(s),
                    Err(e) => {
                        warn!(error = %e, "Sentiment provider failed; continuing unadjusted");
                        None
                    }
                }
            } else {
                None
            }
        },
        async {
            if run_extraction {
                extract::extract_metrics(&normalized, frameworks, catalog())
            } else {
                ExtractionOutcome::default()
            }
        },
    );
    let (base_scores, keywords) = base_scores_and_keywords;

    let scores = match &sentiment {
        Some(s) => scoring::apply_sentiment(base_scores, s),
        None => base_scores,
    };

    let mut report = compliance::run_compliance(
        &normalized,
        &extraction.metrics,
        frameworks,
        request.industry_sector.as_deref(),
        catalog(),
    );
    compliance::sort_gaps(&mut report.gaps);

    let insights = build_insights(&scores, &normalized, &report);
    let peers = match &request.company_name {
        Some(_) => peer_comparison(state, request.industry_sector.as_deref(), &scores).await,
        None => None,
    };

    if run_extraction {
        state
            .metrics
            .metrics_extracted_count
            .observe(extraction.metrics.len() as f64);
    }

    let snapshot = AnalysisSnapshot {
        analysis_id: Uuid::new_v4(),
        scores,
        keywords,
        insights,
        sentiment,
        analysis_type: request.kind().to_string(),
        confidence: if request.quick_mode { 0.7 } else { 0.75 },
        timestamp: Utc::now(),
        source,
        source_type,
        company: request.company_name.clone(),
        industry_sector: request.industry_sector.clone(),
        reporting_period: request.reporting_period.clone(),
        framework_coverage: report.coverage,
        extracted_metrics: extraction.metrics,
        gap_analysis: report.gaps,
        requirement_findings: report.findings,
        recommendations: report.recommendations,
        peers,
        diagnostics: Diagnostics {
            metric_candidates_dropped: extraction.dropped,
        },
    };

    // 4. Persist. A failure here refunds the debit and surfaces the error.
    let row = AnalysisRow {
        id: snapshot.analysis_id,
        user_id: user.id.clone(),
        source: snapshot.source.clone(),
        company_name: snapshot.company.clone(),
        analysis_kind: snapshot.analysis_type.clone(),
        industry_sector: snapshot.industry_sector.clone(),
        reporting_period: snapshot.reporting_period.clone(),
        environmental: snapshot.scores.environmental,
        social: snapshot.scores.social,
        governance: snapshot.scores.governance,
        overall: snapshot.scores.overall,
        result: serde_json::to_value(&snapshot)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("snapshot serialization: {e}")))?,
        created_at: snapshot.timestamp,
    };
    if let Err(persist_err) = state.store.insert_analysis(&row).await {
        warn!(analysis_id = %row.id, "Persistence failed after debit; refunding {cost} credits");
        if let Err(refund_err) = state.store.update_user_credits(&user.id, cost).await {
            warn!(error = %refund_err, "Credit refund failed");
        } else {
            state
                .store
                .record_activity(
                    &user.id,
                    ActivityEvent::CreditRefund,
                    serde_json::json!({ "credits": cost, "analysis_id": row.id }),
                )
                .await;
        }
        return Err(persist_err);
    }

    if let Some(company) = &snapshot.company {
        if let Err(e) = state
            .store
            .upsert_company(
                company,
                snapshot.industry_sector.as_deref(),
                snapshot.analysis_id,
            )
            .await
        {
            warn!(company, error = %e, "Company upsert failed");
        }
    }

    // 5. Cache after persistence; readers may see a brief stale window.
    state
        .cache
        .put(fp, &snapshot, Some(state.config.cache_ttl_sec))
        .await;
    state
        .metrics
        .cache_operations_total
        .with_label_values(&["put", "ok"])
        .inc();

    info!(
        analysis_id = %snapshot.analysis_id,
        user_id = %user.id,
        kind = %snapshot.analysis_type,
        overall = snapshot.scores.overall,
        "Analysis completed"
    );
    Ok(snapshot)
}

/// Rule-based narrative: score bands, notable text signals, and gap
/// call-outs. Capped at eight items.
pub fn build_insights(
    scores: &ScoreSet,
    normalized_text: &str,
    report: &ComplianceReport,
) -> Vec<String> {
    let mut insights = Vec::new();

    for (name, value) in [
        ("environmental", scores.environmental),
        ("social", scores.social),
        ("governance", scores.governance),
    ] {
        if value < 50.0 {
            insights.push(format!("Improve {name} disclosure and performance"));
        } else if value > 80.0 {
            insights.push(format!("Strong {name} performance detected"));
        }
    }

    if normalized_text.contains("net zero") || normalized_text.contains("net-zero") {
        insights.push("Net-zero commitment identified".to_string());
    }
    if normalized_text.contains("diversity") && normalized_text.contains("target") {
        insights.push("Diversity targets mentioned".to_string());
    }

    let critical = report
        .gaps
        .iter()
        .filter(|g| g.severity == crate::catalog::Severity::Critical)
        .count();
    if critical > 0 {
        insights.push(format!(
            "{critical} critical disclosure gaps require immediate attention"
        ));
    }
    for cov in &report.coverage {
        if cov.coverage_percentage >= 80.0 {
            insights.push(format!(
                "{} coverage is strong at {:.1}%",
                cov.framework, cov.coverage_percentage
            ));
        }
    }

    insights.truncate(MAX_INSIGHTS);
    insights
}

async fn peer_comparison(
    state: &AppState,
    sector: Option<&str>,
    scores: &ScoreSet,
) -> Option<PeerComparison> {
    let baseline = match state.store.aggregate_benchmark(sector).await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Benchmark aggregation failed; omitting peers");
            return None;
        }
    };
    let summary = ScoreSummary {
        environmental: baseline.environmental?,
        social: baseline.social?,
        governance: baseline.governance?,
        overall: baseline.overall?,
    };

    let mut relative = std::collections::BTreeMap::new();
    for (name, own, base) in [
        ("environmental", scores.environmental, summary.environmental),
        ("social", scores.social, summary.social),
        ("governance", scores.governance, summary.governance),
        ("overall", scores.overall, summary.overall),
    ] {
        relative.insert(
            name.to_string(),
            if own > base { "above" } else { "below" }.to_string(),
        );
    }

    Some(PeerComparison {
        industry_baseline: summary,
        relative_performance: relative,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Severity;
    use crate::compliance::{FrameworkCoverage, GapItem};

    fn scores(e: f64, s: f64, g: f64) -> ScoreSet {
        ScoreSet {
            environmental: e,
            social: s,
            governance: g,
            overall: scoring::round1((e + s + g) / 3.0),
        }
    }

    fn report_with(gaps: Vec<GapItem>, coverage: Vec<FrameworkCoverage>) -> ComplianceReport {
        ComplianceReport {
            findings: vec![],
            coverage,
            gaps,
            recommendations: vec![],
        }
    }

    #[test]
    fn test_insights_low_scores_prompt_improvement() {
        let insights = build_insights(
            &scores(20.0, 30.0, 40.0),
            "plain text",
            &report_with(vec![], vec![]),
        );
        assert!(insights
            .iter()
            .any(|i| i.contains("Improve environmental")));
        assert!(insights.iter().any(|i| i.contains("Improve governance")));
    }

    #[test]
    fn test_insights_detect_net_zero_and_diversity_targets() {
        let insights = build_insights(
            &scores(60.0, 60.0, 60.0),
            "our net zero plan and diversity target for 2030",
            &report_with(vec![], vec![]),
        );
        assert!(insights
            .iter()
            .any(|i| i.contains("Net-zero commitment")));
        assert!(insights.iter().any(|i| i.contains("Diversity targets")));
    }

    #[test]
    fn test_insights_count_critical_gaps() {
        let gap = GapItem {
            framework: Framework::Csrd,
            requirement_id: "CSRD-E1-1".into(),
            category: "Environmental".into(),
            description: "x".into(),
            severity: Severity::Critical,
        };
        let insights = build_insights(
            &scores(60.0, 60.0, 60.0),
            "text",
            &report_with(vec![gap.clone(), gap], vec![]),
        );
        assert!(insights
            .iter()
            .any(|i| i.contains("2 critical disclosure gaps")));
    }

    #[test]
    fn test_insights_capped_at_eight() {
        let gap = GapItem {
            framework: Framework::Csrd,
            requirement_id: "CSRD-E1-1".into(),
            category: "Environmental".into(),
            description: "x".into(),
            severity: Severity::Critical,
        };
        let coverage: Vec<FrameworkCoverage> = Framework::ALL
            .iter()
            .map(|fw| FrameworkCoverage {
                framework: *fw,
                coverage_percentage: 92.0,
                requirements_found: 9,
                requirements_total: 10,
                mandatory_met: 5,
                mandatory_total: 5,
            })
            .collect();
        let insights = build_insights(
            &scores(10.0, 10.0, 10.0),
            "net zero diversity target",
            &report_with(vec![gap], coverage),
        );
        assert_eq!(insights.len(), MAX_INSIGHTS);
    }

    #[test]
    fn test_request_timeout_matches_contract() {
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(60));
    }
}
