//! Metric standardization: numeric parsing, unit conversion, validation,
//! and confidence assignment for raw extraction candidates.

use super::units::{resolve_unit, UnitClass, UnitMatch};
use super::{ExtractedMetric, RawCandidate};

/// Maximum characters kept in a metric's source snippet.
const SNIPPET_MAX: usize = 200;

/// Standardize one candidate. Returns `None` when the candidate must be
/// dropped (unparseable value, invalid range); the caller tallies drops.
pub fn standardize(candidate: &RawCandidate) -> Option<ExtractedMetric> {
    let (value, parse_confidence) = parse_value(&candidate.value_text)?;
    if !value.is_finite() {
        return None;
    }

    let (normalized_value, normalized_unit, class, mut confidence) =
        match resolve_unit(&candidate.unit_text) {
            Some(resolved) => {
                let unit_confidence = match resolved.matched {
                    UnitMatch::Exact => 1.0,
                    UnitMatch::Synonym => 0.8,
                };
                let (canonical, class) = contextual_class(&candidate.name, &resolved);
                (
                    value * resolved.factor,
                    canonical.to_string(),
                    class,
                    unit_confidence * parse_confidence,
                )
            }
            None if candidate.unit_text.trim().is_empty() => {
                // Unit absent from the text itself; the pattern's hint is
                // context inference.
                match candidate
                    .unit_hint
                    .and_then(|hint| resolve_unit(hint).map(|r| (hint, r)))
                {
                    Some((_, resolved)) => (
                        value * resolved.factor,
                        resolved.canonical.to_string(),
                        resolved.class,
                        0.6 * parse_confidence,
                    ),
                    None => (
                        value,
                        String::new(),
                        UnitClass::PassThrough,
                        0.3 * parse_confidence,
                    ),
                }
            }
            None => {
                // Unit present but unrecognized: keep the raw value.
                (
                    value,
                    candidate.unit_text.trim().to_lowercase(),
                    UnitClass::PassThrough,
                    0.3 * parse_confidence,
                )
            }
        };

    let mut normalized_value = normalized_value;
    match class {
        UnitClass::Emissions | UnitClass::Energy | UnitClass::Water | UnitClass::Waste => {
            if normalized_value < 0.0 {
                return None;
            }
        }
        UnitClass::Percentage => {
            if normalized_value < 0.0 || normalized_value > 1000.0 {
                return None;
            }
            if normalized_value > 100.0 {
                normalized_value = 100.0;
                confidence *= 0.5;
            }
        }
        UnitClass::Count => {
            if normalized_value < 0.0 {
                return None;
            }
            normalized_value = normalized_value.round();
        }
        UnitClass::Monetary | UnitClass::PassThrough => {}
    }

    Some(ExtractedMetric {
        name: candidate.name.clone(),
        raw_value: candidate.value_text.trim().to_string(),
        raw_unit: candidate.unit_text.trim().to_string(),
        normalized_value,
        normalized_unit,
        confidence: (confidence.min(1.0) * 100.0).round() / 100.0,
        snippet: truncate_snippet(&candidate.snippet),
        framework_mappings: candidate.requirement_ids.clone(),
    })
}

/// Mass units are ambiguous between emissions and waste; the metric name
/// carries the context that resolves them.
fn contextual_class(
    name: &str,
    resolved: &super::units::ResolvedUnit,
) -> (&'static str, UnitClass) {
    if resolved.class == UnitClass::Emissions
        && (name.contains("waste") || name.contains("pollutant") || name.contains("nox")
            || name.contains("sox"))
    {
        return ("tonnes", UnitClass::Waste);
    }
    (resolved.canonical, resolved.class)
}

// ────────────────────────────────────────────────────────────────────────────
// Numeric parsing
// ────────────────────────────────────────────────────────────────────────────

/// Parse a numeric token, tolerating `1,234.5`, `1.234,5`, `1 234,5`, and
/// scientific notation. Returns the value and a parse confidence.
///
/// The regex engine has no lookaround, so the thousand/decimal separator
/// decision is made here after capture: with multiple separators the last
/// one is the decimal point; a lone comma before a three-digit group is a
/// thousands separator.
pub fn parse_value(text: &str) -> Option<(f64, f64)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Approximate values ("~100") parse with slightly reduced confidence.
    let (body, confidence) = match trimmed.strip_prefix('~') {
        Some(rest) => (rest.trim(), 0.9),
        None => (trimmed, 1.0),
    };

    // Ranges ("100-150") resolve to their midpoint.
    if let Some((lo, hi)) = body.split_once('-') {
        if !lo.is_empty() && !hi.is_empty() {
            if let (Some((a, _)), Some((b, _))) = (parse_value(lo), parse_value(hi)) {
                return Some(((a + b) / 2.0, 0.8 * confidence));
            }
        }
        return None;
    }

    let normalized = normalize_separators(body)?;
    normalized
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| (v, confidence))
}

fn normalize_separators(body: &str) -> Option<String> {
    // Spaces only ever group thousands.
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || !compact.chars().next()?.is_ascii_digit() {
        return None;
    }

    // Scientific notation passes through once grouping commas are removed.
    if compact.contains(['e', 'E']) {
        return Some(compact.replace(',', ""));
    }

    let seps: Vec<(usize, char)> = compact
        .char_indices()
        .filter(|(_, c)| *c == ',' || *c == '.')
        .collect();

    match seps.len() {
        0 => Some(compact),
        1 => {
            let (pos, sep) = seps[0];
            let digits_after = compact.len() - pos - 1;
            if sep == ',' && digits_after == 3 {
                // "1,234" → thousands
                Some(compact.replace(',', ""))
            } else if sep == ',' {
                Some(compact.replace(',', "."))
            } else {
                Some(compact)
            }
        }
        _ => {
            // Last separator is the decimal point; all earlier ones group
            // thousands. Equal separators throughout ("1,234,567") are all
            // grouping.
            let (last_pos, last_sep) = *seps.last()?;
            let all_same = seps.iter().all(|(_, c)| *c == last_sep);
            let digits_after = compact.len() - last_pos - 1;
            if all_same && digits_after == 3 {
                let mut s = compact.clone();
                s.retain(|c| c != last_sep);
                return Some(s);
            }
            let mut out = String::with_capacity(compact.len());
            for (i, c) in compact.char_indices() {
                if c == ',' || c == '.' {
                    if i == last_pos {
                        out.push('.');
                    }
                    // earlier separators dropped
                } else {
                    out.push(c);
                }
            }
            Some(out)
        }
    }
}

fn truncate_snippet(snippet: &str) -> String {
    if snippet.chars().count() <= SNIPPET_MAX {
        return snippet.to_string();
    }
    let truncated: String = snippet.chars().take(SNIPPET_MAX).collect();
    // Trim back to the last word boundary.
    match truncated.rfind(char::is_whitespace) {
        Some(pos) => truncated[..pos].to_string(),
        None => truncated,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, value: &str, unit: &str) -> RawCandidate {
        RawCandidate {
            name: name.to_string(),
            value_text: value.to_string(),
            unit_text: unit.to_string(),
            unit_hint: None,
            snippet: format!("... {value} {unit} ..."),
            requirement_ids: vec![],
        }
    }

    #[test]
    fn test_parse_plain_and_grouped() {
        assert_eq!(parse_value("1234").unwrap().0, 1234.0);
        assert_eq!(parse_value("1,234").unwrap().0, 1234.0);
        assert_eq!(parse_value("1,234.5").unwrap().0, 1234.5);
        assert_eq!(parse_value("1.234,5").unwrap().0, 1234.5);
        assert_eq!(parse_value("1 234,5").unwrap().0, 1234.5);
        assert_eq!(parse_value("1,234,567").unwrap().0, 1_234_567.0);
    }

    #[test]
    fn test_parse_scientific() {
        assert_eq!(parse_value("1.2e3").unwrap().0, 1200.0);
        assert_eq!(parse_value("5E2").unwrap().0, 500.0);
    }

    #[test]
    fn test_parse_decimal_comma() {
        // Single comma not followed by a 3-digit group reads as decimal.
        assert_eq!(parse_value("1,23").unwrap().0, 1.23);
        assert_eq!(parse_value("35,5").unwrap().0, 35.5);
    }

    #[test]
    fn test_parse_range_and_approx() {
        let (v, c) = parse_value("100-150").unwrap();
        assert_eq!(v, 125.0);
        assert!((c - 0.8).abs() < 1e-9);

        let (v, c) = parse_value("~100").unwrap();
        assert_eq!(v, 100.0);
        assert!((c - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_value("").is_none());
        assert!(parse_value("abc").is_none());
        assert!(parse_value("..").is_none());
    }

    #[test]
    fn test_emissions_equivalence() {
        // 50000 tons CO2 ≡ 50 ktCO2e ≡ 50000 tCO2e
        let a = standardize(&candidate("ghg_emissions", "50000", "tons CO2")).unwrap();
        let b = standardize(&candidate("ghg_emissions", "50", "ktCO2e")).unwrap();
        let c = standardize(&candidate("ghg_emissions", "50000", "tCO2e")).unwrap();

        for m in [&a, &b, &c] {
            assert_eq!(m.normalized_unit, "tCO2e");
            assert_eq!(m.normalized_value, 50_000.0);
            assert!(m.confidence >= 0.8, "confidence {}", m.confidence);
        }
    }

    #[test]
    fn test_percentage_exact_unit() {
        let m = standardize(&candidate("emissions_reduction", "35", "%")).unwrap();
        assert_eq!(m.normalized_value, 35.0);
        assert_eq!(m.normalized_unit, "%");
        assert!(m.confidence >= 0.8);
    }

    #[test]
    fn test_percentage_clamp_over_100() {
        let m = standardize(&candidate("growth", "300", "%")).unwrap();
        assert_eq!(m.normalized_value, 100.0);
        assert!(m.confidence <= 0.5);
    }

    #[test]
    fn test_percentage_rejected_over_1000() {
        assert!(standardize(&candidate("growth", "1500", "%")).is_none());
    }

    #[test]
    fn test_unknown_unit_low_confidence() {
        let m = standardize(&candidate("thing", "42", "furlongs")).unwrap();
        assert_eq!(m.normalized_value, 42.0);
        assert_eq!(m.normalized_unit, "furlongs");
        assert!((m.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_unit_hint_inferred_confidence() {
        let c = RawCandidate {
            name: "suppliers_audited".to_string(),
            value_text: "37".to_string(),
            unit_text: String::new(),
            unit_hint: Some("count"),
            snippet: "37 suppliers audited".to_string(),
            requirement_ids: vec!["CSRD-S2-1".to_string()],
        };
        let m = standardize(&c).unwrap();
        assert_eq!(m.normalized_unit, "count");
        assert_eq!(m.normalized_value, 37.0);
        assert!((m.confidence - 0.6).abs() < 1e-9);
        assert_eq!(m.framework_mappings, vec!["CSRD-S2-1"]);
    }

    #[test]
    fn test_waste_context_reclassifies_mass() {
        let m = standardize(&candidate("waste_mass", "120", "tonnes")).unwrap();
        assert_eq!(m.normalized_unit, "tonnes");
        assert_eq!(m.normalized_value, 120.0);
    }

    #[test]
    fn test_energy_conversion() {
        let m = standardize(&candidate("energy_consumption", "2.5", "GWh")).unwrap();
        assert_eq!(m.normalized_unit, "MWh");
        assert_eq!(m.normalized_value, 2500.0);
    }

    #[test]
    fn test_monetary_magnitude_annotation() {
        let m = standardize(&candidate("community_investment", "1.2", "billion")).unwrap();
        assert_eq!(m.normalized_unit, "USD");
        assert_eq!(m.normalized_value, 1.2e9);
    }

    #[test]
    fn test_snippet_truncated_to_word_boundary() {
        let long = "word ".repeat(100);
        let c = RawCandidate {
            name: "x".to_string(),
            value_text: "1".to_string(),
            unit_text: "%".to_string(),
            unit_hint: None,
            snippet: long,
            requirement_ids: vec![],
        };
        let m = standardize(&c).unwrap();
        assert!(m.snippet.chars().count() <= 200);
        assert!(!m.snippet.ends_with(char::is_whitespace));
    }

    #[test]
    fn test_count_rounds_to_integer() {
        let m = standardize(&candidate("total_employees", "1,250", "employees")).unwrap();
        assert_eq!(m.normalized_unit, "count");
        assert_eq!(m.normalized_value, 1250.0);
    }
}
