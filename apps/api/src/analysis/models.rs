//! Request and response models for the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::acquire::extract::MAX_TEXT_CHARS;
use crate::acquire::ContentKind;
use crate::catalog::Framework;
use crate::compliance::{FrameworkCoverage, GapItem, RequirementFinding};
use crate::errors::AppError;
use crate::extract::ExtractedMetric;
use crate::scoring::{ScoreSet, Sentiment};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub url: Option<String>,
    pub text: Option<String>,
    pub company_name: Option<String>,
    #[serde(default = "default_true")]
    pub quick_mode: bool,
    #[serde(default)]
    pub frameworks: Vec<String>,
    pub industry_sector: Option<String>,
    pub reporting_period: Option<String>,
    #[serde(default = "default_true")]
    pub extract_metrics: bool,
}

impl AnalyzeRequest {
    /// Validate the request shape and resolve the framework set (all four
    /// when unspecified).
    pub fn validate(&self) -> Result<Vec<Framework>, AppError> {
        let has_url = self.url.as_deref().is_some_and(|u| !u.trim().is_empty());
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_url && !has_text {
            return Err(AppError::Validation(
                "Either url or text must be provided".to_string(),
            ));
        }
        if has_url && has_text {
            return Err(AppError::Validation(
                "Provide url or text, not both".to_string(),
            ));
        }
        if let Some(text) = &self.text {
            if text.chars().count() > MAX_TEXT_CHARS {
                return Err(AppError::Validation(format!(
                    "Text content too long (max {MAX_TEXT_CHARS} characters)"
                )));
            }
        }

        if self.frameworks.is_empty() {
            return Ok(Framework::ALL.to_vec());
        }
        let mut resolved = Vec::with_capacity(self.frameworks.len());
        for name in &self.frameworks {
            let fw = Framework::parse(name).ok_or_else(|| {
                AppError::Validation(format!(
                    "Invalid framework '{name}': must be one of CSRD, GRI, SASB, TCFD"
                ))
            })?;
            if !resolved.contains(&fw) {
                resolved.push(fw);
            }
        }
        Ok(resolved)
    }

    pub fn kind(&self) -> &'static str {
        if self.quick_mode {
            "quick"
        } else {
            "full"
        }
    }
}

/// Sector (or global) baseline a company is compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerComparison {
    pub industry_baseline: ScoreSummary,
    /// Pillar → "above" | "below".
    pub relative_performance: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub environmental: f64,
    pub social: f64,
    pub governance: f64,
    pub overall: f64,
}

/// Per-analysis extraction diagnostics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub metric_candidates_dropped: u32,
}

/// The immutable analysis result graph: what gets persisted, cached, and
/// (plus per-request accounting) returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub analysis_id: Uuid,
    pub scores: ScoreSet,
    pub keywords: Vec<String>,
    pub insights: Vec<String>,
    pub sentiment: Option<Sentiment>,
    pub analysis_type: String,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub source_type: ContentKind,
    pub company: Option<String>,
    pub industry_sector: Option<String>,
    pub reporting_period: Option<String>,
    pub framework_coverage: Vec<FrameworkCoverage>,
    pub extracted_metrics: Vec<ExtractedMetric>,
    pub gap_analysis: Vec<GapItem>,
    pub requirement_findings: Vec<RequirementFinding>,
    pub recommendations: Vec<String>,
    pub peers: Option<PeerComparison>,
    pub diagnostics: Diagnostics,
}

/// Wire response: the snapshot plus per-request accounting.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub snapshot: AnalysisSnapshot,
    pub cache_hit: bool,
    pub credits_used: i64,
    pub credits_remaining: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> AnalyzeRequest {
        AnalyzeRequest {
            url: None,
            text: Some("some disclosure text".to_string()),
            company_name: None,
            quick_mode: true,
            frameworks: vec![],
            industry_sector: None,
            reporting_period: None,
            extract_metrics: true,
        }
    }

    #[test]
    fn test_requires_url_or_text() {
        let mut req = base_request();
        req.text = None;
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_rejects_both_url_and_text() {
        let mut req = base_request();
        req.url = Some("https://example.com".to_string());
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_empty_frameworks_default_to_all() {
        let frameworks = base_request().validate().unwrap();
        assert_eq!(frameworks, Framework::ALL.to_vec());
    }

    #[test]
    fn test_framework_parsing_and_dedup() {
        let mut req = base_request();
        req.frameworks = vec!["CSRD".into(), "csrd".into(), "TCFD".into()];
        let frameworks = req.validate().unwrap();
        assert_eq!(frameworks, vec![Framework::Csrd, Framework::Tcfd]);
    }

    #[test]
    fn test_invalid_framework_rejected() {
        let mut req = base_request();
        req.frameworks = vec!["ISSB".into()];
        let err = req.validate().unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("ISSB")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_text_length_cap() {
        let mut req = base_request();
        req.text = Some("x".repeat(MAX_TEXT_CHARS + 1));
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_request_defaults_from_json() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(req.quick_mode);
        assert!(req.extract_metrics);
        assert!(req.frameworks.is_empty());
        assert_eq!(req.kind(), "quick");
    }

    #[test]
    fn test_response_flattens_snapshot() {
        let snapshot = AnalysisSnapshot {
            analysis_id: Uuid::new_v4(),
            scores: ScoreSet {
                environmental: 10.0,
                social: 20.0,
                governance: 30.0,
                overall: 20.0,
            },
            keywords: vec![],
            insights: vec![],
            sentiment: None,
            analysis_type: "quick".to_string(),
            confidence: 0.7,
            timestamp: Utc::now(),
            source: "direct_text".to_string(),
            source_type: ContentKind::Text,
            company: None,
            industry_sector: None,
            reporting_period: None,
            framework_coverage: vec![],
            extracted_metrics: vec![],
            gap_analysis: vec![],
            requirement_findings: vec![],
            recommendations: vec![],
            peers: None,
            diagnostics: Diagnostics::default(),
        };
        let response = AnalyzeResponse {
            snapshot,
            cache_hit: true,
            credits_used: 1,
            credits_remaining: 99,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["cache_hit"], true);
        assert_eq!(value["analysis_type"], "quick");
        assert_eq!(value["credits_remaining"], 99);
        assert!(value.get("snapshot").is_none(), "snapshot must flatten");
    }
}
