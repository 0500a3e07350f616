//! Framework Catalog — static registry of disclosure requirements for the
//! four supported reporting frameworks (CSRD, GRI, SASB, TCFD).
//!
//! The catalog is loaded once at startup and is read-only afterwards. Every
//! other component references requirements by `(framework, id)`; nothing
//! outside this module owns requirement data.

mod data;

use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Core types
// ────────────────────────────────────────────────────────────────────────────

/// Supported ESG reporting frameworks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Framework {
    #[serde(rename = "CSRD")]
    Csrd,
    #[serde(rename = "GRI")]
    Gri,
    #[serde(rename = "SASB")]
    Sasb,
    #[serde(rename = "TCFD")]
    Tcfd,
}

impl Framework {
    pub const ALL: [Framework; 4] = [
        Framework::Csrd,
        Framework::Gri,
        Framework::Sasb,
        Framework::Tcfd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Csrd => "CSRD",
            Framework::Gri => "GRI",
            Framework::Sasb => "SASB",
            Framework::Tcfd => "TCFD",
        }
    }

    pub fn parse(s: &str) -> Option<Framework> {
        match s.to_ascii_uppercase().as_str() {
            "CSRD" => Some(Framework::Csrd),
            "GRI" => Some(Framework::Gri),
            "SASB" => Some(Framework::Sasb),
            "TCFD" => Some(Framework::Tcfd),
            _ => None,
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ESG pillar a requirement belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Environmental,
    Social,
    Governance,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Environmental => "Environmental",
            Category::Social => "Social",
            Category::Governance => "Governance",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gap severity, ordered from least to most severe so `Ord` sorts naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// A compiled metric-extraction pattern attached to a requirement.
///
/// Group 1 captures the numeric token; group 2 (when present) captures the
/// unit token. Patterns without a unit group carry a `unit_hint` instead.
#[derive(Debug, Clone)]
pub struct MetricPattern {
    /// Stable snake_case name the extracted metric is reported under.
    pub name: &'static str,
    pub regex: Regex,
    /// Canonical unit assumed when the pattern has no unit capture group.
    pub unit_hint: Option<&'static str>,
}

/// A single disclosure requirement within a framework.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub id: &'static str,
    pub framework: Framework,
    pub category: Category,
    pub subcategory: &'static str,
    pub description: &'static str,
    /// Lowercased match-any keyword phrases.
    pub keywords: &'static [&'static str],
    pub mandatory: bool,
    pub metric_patterns: Vec<MetricPattern>,
    /// Sectors for which a missing optional requirement escalates to high.
    pub critical_industries: &'static [&'static str],
}

impl Requirement {
    /// Whether this requirement sits in a critical disclosure area
    /// (CSRD climate change, TCFD metrics & targets).
    pub fn is_critical_area(&self) -> bool {
        matches!(
            (self.framework, self.subcategory),
            (Framework::Csrd, "Climate Change")
                | (
                    Framework::Tcfd,
                    "Climate Metrics" | "GHG Emissions" | "Climate Targets"
                )
        )
    }

    /// True when `sector` appears in this requirement's industry-critical list.
    pub fn is_industry_critical(&self, sector: &str) -> bool {
        let sector = sector.to_lowercase();
        self.critical_industries.iter().any(|s| *s == sector)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Catalog
// ────────────────────────────────────────────────────────────────────────────

/// Per-framework summary statistics, used by `GET /frameworks`.
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkSummary {
    pub name: String,
    pub total_requirements: usize,
    pub mandatory_requirements: usize,
    pub categories: Vec<String>,
}

/// The loaded, immutable catalog.
pub struct Catalog {
    by_framework: HashMap<Framework, Vec<Requirement>>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

/// Process-wide catalog handle. A corrupt catalog (bad pattern regex,
/// duplicate id) is fatal at startup.
pub fn catalog() -> &'static Catalog {
    CATALOG.get_or_init(|| Catalog::load().expect("framework catalog failed to load"))
}

impl Catalog {
    pub fn load() -> Result<Catalog> {
        let mut by_framework: HashMap<Framework, Vec<Requirement>> = HashMap::new();
        for def in data::requirement_defs() {
            let mut patterns = Vec::with_capacity(def.patterns.len());
            for &(name, raw, unit_hint) in def.patterns {
                let regex = Regex::new(&format!("(?i){raw}"))
                    .with_context(|| format!("invalid metric pattern for {}", def.id))?;
                patterns.push(MetricPattern {
                    name,
                    regex,
                    unit_hint,
                });
            }
            by_framework
                .entry(def.framework)
                .or_default()
                .push(Requirement {
                    id: def.id,
                    framework: def.framework,
                    category: def.category,
                    subcategory: def.subcategory,
                    description: def.description,
                    keywords: def.keywords,
                    mandatory: def.mandatory,
                    metric_patterns: patterns,
                    critical_industries: def.critical_industries,
                });
        }

        let mut seen = std::collections::HashSet::new();
        for reqs in by_framework.values() {
            for req in reqs {
                anyhow::ensure!(seen.insert(req.id), "duplicate requirement id {}", req.id);
            }
        }

        Ok(Catalog { by_framework })
    }

    pub fn frameworks(&self) -> impl Iterator<Item = Framework> + '_ {
        Framework::ALL.into_iter()
    }

    /// All requirements for a framework, in catalog order.
    pub fn requirements(&self, framework: Framework) -> &[Requirement] {
        self.by_framework
            .get(&framework)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, framework: Framework, id: &str) -> Option<&Requirement> {
        self.requirements(framework).iter().find(|r| r.id == id)
    }

    /// True when `id` exists in any framework.
    pub fn contains_id(&self, id: &str) -> bool {
        Framework::ALL.iter().any(|fw| self.get(*fw, id).is_some())
    }

    pub fn summary(&self) -> Vec<FrameworkSummary> {
        Framework::ALL
            .iter()
            .map(|fw| {
                let reqs = self.requirements(*fw);
                let mut categories: Vec<String> = reqs
                    .iter()
                    .map(|r| r.category.as_str().to_string())
                    .collect();
                categories.sort();
                categories.dedup();
                FrameworkSummary {
                    name: fw.as_str().to_string(),
                    total_requirements: reqs.len(),
                    mandatory_requirements: reqs.iter().filter(|r| r.mandatory).count(),
                    categories,
                }
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let cat = Catalog::load().unwrap();
        let total: usize = Framework::ALL
            .iter()
            .map(|fw| cat.requirements(*fw).len())
            .sum();
        assert_eq!(total, 46);
    }

    #[test]
    fn test_framework_counts_and_mandatory_flags() {
        let cat = Catalog::load().unwrap();

        let csrd = cat.requirements(Framework::Csrd);
        assert_eq!(csrd.len(), 14);
        assert!(csrd.iter().all(|r| r.mandatory));

        let gri = cat.requirements(Framework::Gri);
        assert_eq!(gri.len(), 12);
        assert_eq!(gri.iter().filter(|r| r.mandatory).count(), 2);

        let sasb = cat.requirements(Framework::Sasb);
        assert_eq!(sasb.len(), 9);
        assert!(sasb.iter().all(|r| !r.mandatory));

        let tcfd = cat.requirements(Framework::Tcfd);
        assert_eq!(tcfd.len(), 11);
        assert!(tcfd.iter().all(|r| r.mandatory));
    }

    #[test]
    fn test_every_requirement_has_three_keywords() {
        let cat = Catalog::load().unwrap();
        for fw in Framework::ALL {
            for req in cat.requirements(fw) {
                assert!(
                    req.keywords.len() >= 3,
                    "{} has only {} keywords",
                    req.id,
                    req.keywords.len()
                );
                for kw in req.keywords {
                    assert_eq!(*kw, kw.to_lowercase(), "{} keyword not lowercase", req.id);
                }
            }
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let cat = Catalog::load().unwrap();
        let req = cat.get(Framework::Csrd, "CSRD-E1-3").unwrap();
        assert_eq!(req.category, Category::Environmental);
        assert!(req.keywords.contains(&"scope 1"));
        assert!(cat.get(Framework::Gri, "CSRD-E1-3").is_none());
        assert!(cat.get(Framework::Tcfd, "no-such-id").is_none());
    }

    #[test]
    fn test_critical_area_detection() {
        let cat = Catalog::load().unwrap();
        assert!(cat.get(Framework::Csrd, "CSRD-E1-1").unwrap().is_critical_area());
        assert!(cat.get(Framework::Tcfd, "TCFD-MT-B").unwrap().is_critical_area());
        assert!(!cat.get(Framework::Csrd, "CSRD-G1-1").unwrap().is_critical_area());
        assert!(!cat.get(Framework::Tcfd, "TCFD-GOV-A").unwrap().is_critical_area());
    }

    #[test]
    fn test_industry_critical_lookup_is_case_insensitive() {
        let cat = Catalog::load().unwrap();
        let req = cat.get(Framework::Csrd, "CSRD-E1-3").unwrap();
        assert!(req.is_industry_critical("Energy"));
        assert!(req.is_industry_critical("utilities"));
        assert!(!req.is_industry_critical("retail"));
    }

    #[test]
    fn test_summary_shape() {
        let cat = Catalog::load().unwrap();
        let summary = cat.summary();
        assert_eq!(summary.len(), 4);
        let csrd = &summary[0];
        assert_eq!(csrd.name, "CSRD");
        assert_eq!(csrd.total_requirements, 14);
        assert_eq!(csrd.mandatory_requirements, 14);
        assert_eq!(
            csrd.categories,
            vec!["Environmental", "Governance", "Social"]
        );
    }

    #[test]
    fn test_summary_is_deterministic() {
        let cat = Catalog::load().unwrap();
        let a = serde_json::to_string(&cat.summary()).unwrap();
        let b = serde_json::to_string(&cat.summary()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_framework_parse_roundtrip() {
        for fw in Framework::ALL {
            assert_eq!(Framework::parse(fw.as_str()), Some(fw));
        }
        assert_eq!(Framework::parse("csrd"), Some(Framework::Csrd));
        assert_eq!(Framework::parse("ISSB"), None);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
