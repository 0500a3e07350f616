//! Framework Compliance Engine — maps disclosure text and extracted metrics
//! to catalog requirements, producing per-framework coverage, a gap list
//! with severities, and actionable recommendations.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Framework, Requirement, Severity};
use crate::extract::{snippet_around, ExtractedMetric};
use crate::scoring::round1;

/// Minimum metric confidence for a metric match to count as "found".
const METRIC_MATCH_THRESHOLD: f64 = 0.5;

/// Hard cap on recommendation output.
const MAX_RECOMMENDATIONS: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Report model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchReason {
    Keyword,
    Metric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementFinding {
    pub requirement_id: String,
    pub framework: Framework,
    pub category: String,
    pub subcategory: String,
    pub description: String,
    pub found: bool,
    pub match_reason: MatchReason,
    pub evidence: String,
    pub confidence: f64,
    pub keywords_matched: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkCoverage {
    pub framework: Framework,
    pub coverage_percentage: f64,
    pub requirements_found: usize,
    pub requirements_total: usize,
    pub mandatory_met: usize,
    pub mandatory_total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapItem {
    pub framework: Framework,
    pub requirement_id: String,
    pub category: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub findings: Vec<RequirementFinding>,
    pub coverage: Vec<FrameworkCoverage>,
    pub gaps: Vec<GapItem>,
    pub recommendations: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Run compliance for the requested frameworks. `normalized_text` is the
/// lowercased/normalized disclosure text; `metrics` are the standardized
/// extraction results (empty in quick mode).
pub fn run_compliance(
    normalized_text: &str,
    metrics: &[ExtractedMetric],
    frameworks: &[Framework],
    industry_sector: Option<&str>,
    catalog: &Catalog,
) -> ComplianceReport {
    let mut report = ComplianceReport::default();

    for fw in frameworks {
        let requirements = catalog.requirements(*fw);
        let mut found_count = 0usize;
        let mut mandatory_met = 0usize;
        let mandatory_total = requirements.iter().filter(|r| r.mandatory).count();

        for req in requirements {
            match evaluate_requirement(req, normalized_text, metrics) {
                Some(finding) => {
                    found_count += 1;
                    if req.mandatory {
                        mandatory_met += 1;
                    }
                    report.findings.push(finding);
                }
                None => {
                    report.gaps.push(GapItem {
                        framework: *fw,
                        requirement_id: req.id.to_string(),
                        category: req.category.as_str().to_string(),
                        description: req.description.to_string(),
                        severity: gap_severity(req, normalized_text, industry_sector),
                    });
                }
            }
        }

        let total = requirements.len();
        report.coverage.push(FrameworkCoverage {
            framework: *fw,
            coverage_percentage: if total > 0 {
                round1(100.0 * found_count as f64 / total as f64)
            } else {
                0.0
            },
            requirements_found: found_count,
            requirements_total: total,
            mandatory_met,
            mandatory_total,
        });
    }

    report.recommendations = build_recommendations(&report.gaps, &report.coverage);
    report
}

/// Evaluate one requirement. Keyword and metric evidence are both
/// considered; when both apply the metric finding wins (higher confidence).
fn evaluate_requirement(
    req: &Requirement,
    normalized_text: &str,
    metrics: &[ExtractedMetric],
) -> Option<RequirementFinding> {
    let matched_keywords: Vec<String> = req
        .keywords
        .iter()
        .filter(|kw| normalized_text.contains(*kw))
        .map(|kw| (*kw).to_string())
        .collect();

    let best_metric = metrics
        .iter()
        .filter(|m| {
            m.confidence >= METRIC_MATCH_THRESHOLD
                && m.framework_mappings.iter().any(|id| id == req.id)
        })
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    if let Some(metric) = best_metric {
        return Some(RequirementFinding {
            requirement_id: req.id.to_string(),
            framework: req.framework,
            category: req.category.as_str().to_string(),
            subcategory: req.subcategory.to_string(),
            description: req.description.to_string(),
            found: true,
            match_reason: MatchReason::Metric,
            evidence: metric.snippet.clone(),
            confidence: metric.confidence,
            keywords_matched: matched_keywords,
        });
    }

    if matched_keywords.is_empty() {
        return None;
    }

    let first = &matched_keywords[0];
    let evidence = normalized_text
        .find(first.as_str())
        .map(|pos| snippet_around(normalized_text, pos, pos + first.len()))
        .unwrap_or_default();

    Some(RequirementFinding {
        requirement_id: req.id.to_string(),
        framework: req.framework,
        category: req.category.as_str().to_string(),
        subcategory: req.subcategory.to_string(),
        description: req.description.to_string(),
        found: true,
        match_reason: MatchReason::Keyword,
        evidence,
        confidence: (0.3 + 0.1 * matched_keywords.len() as f64).min(0.9),
        keywords_matched: matched_keywords,
    })
}

/// Severity policy for a requirement that was not found.
fn gap_severity(req: &Requirement, normalized_text: &str, industry: Option<&str>) -> Severity {
    // Partial semantic overlap: no full keyword phrase matched, but an
    // individual word of one did. Softens the gap to low.
    if has_partial_overlap(req, normalized_text) {
        return Severity::Low;
    }

    if req.mandatory {
        if req.is_critical_area() {
            return Severity::Critical;
        }
        return Severity::High;
    }

    if let Some(sector) = industry {
        if req.is_industry_critical(sector) {
            return Severity::High;
        }
    }
    Severity::Medium
}

fn has_partial_overlap(req: &Requirement, normalized_text: &str) -> bool {
    req.keywords.iter().any(|kw| {
        kw.split_whitespace()
            .any(|word| word.len() > 3 && normalized_text.contains(word))
    })
}

/// Sort gaps by (severity desc, framework, requirement id) — the contract
/// order for gap listings.
pub fn sort_gaps(gaps: &mut [GapItem]) {
    gaps.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.framework.as_str().cmp(b.framework.as_str()))
            .then_with(|| a.requirement_id.cmp(&b.requirement_id))
    });
}

/// One short directive per gap, templated from category and severity.
pub fn gap_directive(gap: &GapItem) -> String {
    match gap.severity {
        Severity::Critical => format!(
            "Critical gap in {}: disclose {} ({}) to meet regulatory requirements.",
            gap.category,
            gap.description.to_lowercase(),
            gap.requirement_id
        ),
        Severity::High => format!(
            "Prioritize {} disclosure: {} ({}).",
            gap.category,
            gap.description.to_lowercase(),
            gap.requirement_id
        ),
        Severity::Medium => format!(
            "Consider adding {} reporting for {} ({}).",
            gap.category.to_lowercase(),
            gap.description.to_lowercase(),
            gap.requirement_id
        ),
        Severity::Low => format!(
            "Expand existing {} coverage toward {} ({}).",
            gap.category.to_lowercase(),
            gap.description.to_lowercase(),
            gap.requirement_id
        ),
    }
}

fn build_recommendations(gaps: &[GapItem], coverage: &[FrameworkCoverage]) -> Vec<String> {
    let mut recommendations = Vec::new();

    for cov in coverage {
        if cov.coverage_percentage < 50.0 {
            recommendations.push(format!(
                "Improve {} disclosure: currently at {:.1}% coverage with {} mandatory requirements unmet.",
                cov.framework,
                cov.coverage_percentage,
                cov.mandatory_total.saturating_sub(cov.mandatory_met)
            ));
        }
    }

    let mut sorted: Vec<&GapItem> = gaps.iter().collect();
    sorted.sort_by(|a, b| b.severity.cmp(&a.severity));
    for gap in sorted
        .iter()
        .filter(|g| g.severity >= Severity::High)
        .take(5)
    {
        recommendations.push(gap_directive(gap));
    }

    for cov in coverage {
        if cov.coverage_percentage > 80.0 {
            recommendations.push(format!(
                "Strong {} compliance ({:.1}%); consider external verification or certification.",
                cov.framework, cov.coverage_percentage
            ));
        }
    }

    recommendations.truncate(MAX_RECOMMENDATIONS);
    recommendations
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
