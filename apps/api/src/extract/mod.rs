//! Metric extraction — recovers quantitative metric candidates from
//! disclosure text using catalog requirement patterns plus a set of generic
//! numeric-with-unit patterns, then standardizes them to canonical units.

pub mod standardizer;
pub mod units;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Framework};

/// Characters of context captured either side of a match.
const SNIPPET_WINDOW: usize = 80;

/// A raw candidate tuple prior to standardization.
#[derive(Debug, Clone)]
pub struct RawCandidate {
    pub name: String,
    pub value_text: String,
    pub unit_text: String,
    /// Canonical unit implied by the pattern when the text carries none.
    pub unit_hint: Option<&'static str>,
    pub snippet: String,
    pub requirement_ids: Vec<String>,
}

/// A standardized metric as it appears in analysis responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMetric {
    pub name: String,
    pub raw_value: String,
    pub raw_unit: String,
    pub normalized_value: f64,
    pub normalized_unit: String,
    pub confidence: f64,
    pub snippet: String,
    pub framework_mappings: Vec<String>,
}

/// Extraction result plus the per-analysis diagnostics tally.
#[derive(Debug, Default)]
pub struct ExtractionOutcome {
    pub metrics: Vec<ExtractedMetric>,
    pub dropped: u32,
}

// ────────────────────────────────────────────────────────────────────────────
// Generic patterns
// ────────────────────────────────────────────────────────────────────────────

struct GenericPattern {
    name: &'static str,
    regex: Regex,
    unit_hint: Option<&'static str>,
}

const NUM: &str = r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)";

fn generic_patterns() -> &'static [GenericPattern] {
    static PATTERNS: OnceLock<Vec<GenericPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let defs: &[(&str, String, Option<&'static str>)] = &[
            (
                "emissions_reduction",
                format!(r"reduced[^.]{{0,60}}emissions?[^.]{{0,25}}by\s+{NUM}\s*(%|percent)"),
                None,
            ),
            (
                "emissions_reduction",
                format!(r"{NUM}\s*(%|percent)[^.]{{0,30}}emissions?\s+reduction"),
                None,
            ),
            (
                "board_diversity",
                format!(r"board diversity[^.]{{0,30}}?{NUM}\s*(%|percent)"),
                None,
            ),
            (
                "gender_diversity",
                format!(r"{NUM}\s*(%|percent)\s*women\b"),
                None,
            ),
            (
                "renewable_energy_share",
                format!(r"{NUM}\s*(%|percent)[^.]{{0,30}}renewable"),
                None,
            ),
            (
                "ghg_emissions",
                format!(r"{NUM}\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b[^.]{{0,20}}co2"),
                None,
            ),
            (
                "energy_consumption",
                format!(r"{NUM}\s*(kwh|mwh|gwh|twh|gj|tj)\b"),
                None,
            ),
            (
                "water_volume",
                format!(
                    r"{NUM}\s*(million m3|million m³|m3|m³|megaliters?|megalitres?|liters?|litres?|gallons?)\b[^.]{{0,25}}water"
                ),
                None,
            ),
            (
                "waste_mass",
                format!(r"{NUM}\s*(kg|tonnes|tons)\b[^.]{{0,20}}waste"),
                None,
            ),
            (
                "total_employees",
                format!(r"{NUM}\s*(employees|workers|staff)\b"),
                None,
            ),
            // Catch-all numeric-with-unit; only claims spans no named
            // pattern claimed first.
            (
                "quantity",
                format!(
                    r"{NUM}\s*(tco2e|ktco2e|mtco2e|mwh|gwh|kwh|twh|gj|tj|m3|m³|megaliters?|litres?|liters?|%|percent)"
                ),
                None,
            ),
        ];
        defs.iter()
            .map(|(name, raw, hint)| GenericPattern {
                name: *name,
                regex: Regex::new(&format!("(?i){raw}")).expect("generic metric pattern"),
                unit_hint: *hint,
            })
            .collect()
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Run pattern extraction over `text` for the requested frameworks and
/// standardize every candidate. Candidate failures are dropped and tallied,
/// never propagated.
pub fn extract_metrics(
    text: &str,
    frameworks: &[Framework],
    catalog: &Catalog,
) -> ExtractionOutcome {
    // Keyed by (value offset, name) so repeated scans are deterministic and
    // the same figure matched by several requirements merges into one
    // candidate with all mappings attached.
    let mut candidates: BTreeMap<(usize, String), RawCandidate> = BTreeMap::new();
    let mut claimed_offsets: Vec<usize> = Vec::new();

    for fw in frameworks {
        for req in catalog.requirements(*fw) {
            for pattern in &req.metric_patterns {
                collect_matches(
                    text,
                    pattern.name,
                    &pattern.regex,
                    pattern.unit_hint,
                    Some(req.id),
                    &mut candidates,
                    &mut claimed_offsets,
                );
            }
        }
    }

    for pattern in generic_patterns() {
        if pattern.name == "quantity" {
            collect_unclaimed_matches(text, pattern, &claimed_offsets, &mut candidates);
        } else {
            collect_matches(
                text,
                pattern.name,
                &pattern.regex,
                pattern.unit_hint,
                None,
                &mut candidates,
                &mut claimed_offsets,
            );
        }
    }

    let mut outcome = ExtractionOutcome::default();
    for candidate in candidates.values() {
        match standardizer::standardize(candidate) {
            Some(mut metric) => {
                cross_map(&mut metric, frameworks, catalog);
                outcome.metrics.push(metric);
            }
            None => outcome.dropped += 1,
        }
    }
    outcome
}

fn collect_matches(
    text: &str,
    name: &str,
    regex: &Regex,
    unit_hint: Option<&'static str>,
    requirement_id: Option<&str>,
    candidates: &mut BTreeMap<(usize, String), RawCandidate>,
    claimed_offsets: &mut Vec<usize>,
) {
    for caps in regex.captures_iter(text) {
        let Some(value) = caps.get(1) else { continue };
        let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
        let key = (value.start(), name.to_string());

        let entry = candidates.entry(key).or_insert_with(|| RawCandidate {
            name: name.to_string(),
            value_text: value.as_str().to_string(),
            unit_text: unit.to_string(),
            unit_hint,
            snippet: snippet_around(text, whole.0, whole.1),
            requirement_ids: Vec::new(),
        });
        if let Some(id) = requirement_id {
            if !entry.requirement_ids.iter().any(|r| r == id) {
                entry.requirement_ids.push(id.to_string());
            }
        }
        if !claimed_offsets.contains(&value.start()) {
            claimed_offsets.push(value.start());
        }
    }
}

fn collect_unclaimed_matches(
    text: &str,
    pattern: &GenericPattern,
    claimed_offsets: &[usize],
    candidates: &mut BTreeMap<(usize, String), RawCandidate>,
) {
    for caps in pattern.regex.captures_iter(text) {
        let Some(value) = caps.get(1) else { continue };
        if claimed_offsets.contains(&value.start()) {
            continue;
        }
        let unit = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or_default();
        candidates
            .entry((value.start(), pattern.name.to_string()))
            .or_insert_with(|| RawCandidate {
                name: pattern.name.to_string(),
                value_text: value.as_str().to_string(),
                unit_text: unit.to_string(),
                unit_hint: pattern.unit_hint,
                snippet: snippet_around(text, whole.0, whole.1),
                requirement_ids: Vec::new(),
            });
    }
}

/// Cross-match a standardized metric's snippet against every requested
/// requirement's patterns, attaching any requirement ids not already mapped.
fn cross_map(metric: &mut ExtractedMetric, frameworks: &[Framework], catalog: &Catalog) {
    for fw in frameworks {
        for req in catalog.requirements(*fw) {
            if metric.framework_mappings.iter().any(|id| id == req.id) {
                continue;
            }
            if req
                .metric_patterns
                .iter()
                .any(|p| p.regex.is_match(&metric.snippet))
            {
                metric.framework_mappings.push(req.id.to_string());
            }
        }
    }
}

/// 80 characters of context either side of `[start, end)`, trimmed to word
/// boundaries and valid UTF-8 char boundaries.
pub fn snippet_around(text: &str, start: usize, end: usize) -> String {
    let mut lo = start.saturating_sub(SNIPPET_WINDOW);
    while lo > 0 && !text.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + SNIPPET_WINDOW).min(text.len());
    while hi < text.len() && !text.is_char_boundary(hi) {
        hi += 1;
    }

    let mut slice = &text[lo..hi];
    // Trim leading/trailing partial words introduced by the window cut.
    if lo > 0 {
        if let Some(pos) = slice.find(char::is_whitespace) {
            slice = &slice[pos..];
        }
    }
    if hi < text.len() {
        if let Some(pos) = slice.rfind(char::is_whitespace) {
            slice = &slice[..pos];
        }
    }
    slice.trim().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn cat() -> Catalog {
        Catalog::load().unwrap()
    }

    const SAMPLE: &str =
        "We reduced carbon emissions by 35% and increased board diversity to 40% women.";

    #[test]
    fn test_sample_extracts_reduction_and_diversity() {
        let catalog = cat();
        let outcome = extract_metrics(
            SAMPLE,
            &[Framework::Csrd, Framework::Tcfd],
            &catalog,
        );

        let reduction = outcome
            .metrics
            .iter()
            .find(|m| m.name == "emissions_reduction")
            .expect("emissions_reduction extracted");
        assert_eq!(reduction.normalized_value, 35.0);
        assert_eq!(reduction.normalized_unit, "%");
        assert!(reduction.confidence >= 0.8);

        let diversity = outcome
            .metrics
            .iter()
            .find(|m| m.name == "board_diversity")
            .expect("board_diversity extracted");
        assert_eq!(diversity.normalized_value, 40.0);
        assert_eq!(diversity.normalized_unit, "%");
    }

    #[test]
    fn test_catalog_pattern_attaches_requirement_id() {
        let catalog = cat();
        let text = "Total GHG output was 50,000 tonnes of CO2 equivalent in 2024.";
        let outcome = extract_metrics(text, &[Framework::Csrd], &catalog);
        let ghg = outcome
            .metrics
            .iter()
            .find(|m| m.name == "ghg_emissions")
            .expect("ghg extracted");
        assert_eq!(ghg.normalized_value, 50_000.0);
        assert_eq!(ghg.normalized_unit, "tCO2e");
        assert!(ghg
            .framework_mappings
            .iter()
            .any(|id| id == "CSRD-E1-3"));
    }

    #[test]
    fn test_same_figure_merges_across_frameworks() {
        let catalog = cat();
        let text = "Total GHG output was 50,000 tonnes of CO2 equivalent in 2024.";
        let outcome = extract_metrics(text, &[Framework::Csrd, Framework::Tcfd], &catalog);
        let ghg: Vec<_> = outcome
            .metrics
            .iter()
            .filter(|m| m.name == "ghg_emissions")
            .collect();
        assert_eq!(ghg.len(), 1, "one merged candidate expected");
        assert!(ghg[0].framework_mappings.iter().any(|id| id == "CSRD-E1-3"));
        assert!(ghg[0].framework_mappings.iter().any(|id| id == "TCFD-MT-B"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let catalog = cat();
        let a = extract_metrics(SAMPLE, &[Framework::Csrd], &catalog);
        let b = extract_metrics(SAMPLE, &[Framework::Csrd], &catalog);
        let names_a: Vec<_> = a.metrics.iter().map(|m| &m.name).collect();
        let names_b: Vec<_> = b.metrics.iter().map(|m| &m.name).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn test_generic_quantity_does_not_duplicate_named_match() {
        let catalog = cat();
        let text = "Energy consumption reached 1,200 MWh across sites.";
        let outcome = extract_metrics(text, &[Framework::Gri], &catalog);
        let energy: Vec<_> = outcome
            .metrics
            .iter()
            .filter(|m| m.normalized_unit == "MWh")
            .collect();
        assert_eq!(energy.len(), 1);
        assert_eq!(energy[0].name, "energy_consumption");
        assert_eq!(energy[0].normalized_value, 1200.0);
    }

    #[test]
    fn test_snippet_window() {
        let text = format!("{} emissions were 500 tCO2e overall {}", "x".repeat(300), "y".repeat(300));
        let pos = text.find("500").unwrap();
        let snip = snippet_around(&text, pos, pos + 3);
        assert!(snip.contains("500"));
        assert!(snip.len() <= 2 * SNIPPET_WINDOW + 10);
    }

    #[test]
    fn test_framework_mappings_reference_catalog_ids() {
        let catalog = cat();
        let text = "Total GHG output was 50,000 tonnes of CO2; we reduced emissions by 12% \
                    and consumed 1,200 MWh while 45% women sit on the board.";
        let outcome = extract_metrics(text, &Framework::ALL, &catalog);
        assert!(!outcome.metrics.is_empty());
        for metric in &outcome.metrics {
            for id in &metric.framework_mappings {
                assert!(catalog.contains_id(id), "unknown requirement id {id}");
            }
        }
    }

    #[test]
    fn test_invalid_candidates_are_tallied_not_fatal() {
        let catalog = cat();
        // 1500% is outside the accepted percentage range → dropped.
        let text = "Output grew 1500% while water recycling hit 1500 % too; diversity 40% women.";
        let outcome = extract_metrics(text, &[Framework::Csrd], &catalog);
        assert!(outcome.metrics.iter().any(|m| m.name == "gender_diversity"));
        assert!(outcome.dropped >= 1);
    }
}
