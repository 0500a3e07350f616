//! Canonical unit tables and conversion factors.
//!
//! Base units: emissions tCO2e, energy MWh, water m³, percentages 0–100,
//! counts, monetary USD (annotated, never FX-converted).

/// Broad class a unit belongs to; drives validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    Emissions,
    Energy,
    Water,
    Waste,
    Percentage,
    Count,
    Monetary,
    /// Recognized but dimensionless for our purposes (years, hectares).
    PassThrough,
}

/// How confidently the raw unit string was recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitMatch {
    Exact,
    Synonym,
}

#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    pub canonical: &'static str,
    /// Multiplier taking the raw value to the canonical unit.
    pub factor: f64,
    pub class: UnitClass,
    pub matched: UnitMatch,
}

fn resolved(
    canonical: &'static str,
    factor: f64,
    class: UnitClass,
    matched: UnitMatch,
) -> ResolvedUnit {
    ResolvedUnit {
        canonical,
        factor,
        class,
        matched,
    }
}

/// Resolve a raw unit token to its canonical unit and conversion factor.
/// Returns `None` for unrecognized units.
pub fn resolve_unit(raw: &str) -> Option<ResolvedUnit> {
    use UnitClass::*;
    use UnitMatch::*;

    let unit = raw.trim().to_lowercase();
    let unit = unit.as_str();

    let r = match unit {
        // Emissions → tCO2e
        "tco2e" | "tco2" => resolved("tCO2e", 1.0, Emissions, Exact),
        "ktco2e" => resolved("tCO2e", 1e3, Emissions, Exact),
        "mtco2e" => resolved("tCO2e", 1e6, Emissions, Exact),
        "t" | "tonnes" | "tons" | "tonnes co2" | "tons co2" | "metric tons co2" => {
            resolved("tCO2e", 1.0, Emissions, Synonym)
        }
        "kg co2e" | "kg co2" | "kgco2e" => resolved("tCO2e", 1e-3, Emissions, Synonym),
        "lb co2" => resolved("tCO2e", 0.000_453_592, Emissions, Synonym),

        // Energy → MWh
        "mwh" => resolved("MWh", 1.0, Energy, Exact),
        "gwh" => resolved("MWh", 1e3, Energy, Exact),
        "twh" => resolved("MWh", 1e6, Energy, Exact),
        "kwh" => resolved("MWh", 1e-3, Energy, Exact),
        "gj" => resolved("MWh", 0.277778, Energy, Exact),
        "tj" => resolved("MWh", 277.778, Energy, Exact),
        "terajoules" => resolved("MWh", 277.778, Energy, Synonym),

        // Water → m³
        "m3" | "m³" => resolved("m³", 1.0, Water, Exact),
        "cubic meter" | "cubic meters" | "cubic metre" | "cubic metres" => {
            resolved("m³", 1.0, Water, Synonym)
        }
        "million m3" | "million m³" => resolved("m³", 1e6, Water, Synonym),
        "liter" | "liters" | "litre" | "litres" => resolved("m³", 1e-3, Water, Synonym),
        "megaliter" | "megaliters" | "megalitre" | "megalitres" => {
            resolved("m³", 1e3, Water, Synonym)
        }
        "gallon" | "gallons" => resolved("m³", 3.785e-3, Water, Synonym),

        // Waste → tonnes (mass that is not CO2 context is handled by the
        // caller passing a Waste class hint; raw tonnes default to emissions)
        "kg" => resolved("tonnes", 1e-3, Waste, Exact),
        "mg" => resolved("tonnes", 1e-9, Waste, Synonym),
        "g" => resolved("tonnes", 1e-6, Waste, Synonym),

        // Percentage
        "%" => resolved("%", 1.0, Percentage, Exact),
        "percent" | "percentage" | "pct" => resolved("%", 1.0, Percentage, Synonym),

        // Counts
        "count" => resolved("count", 1.0, Count, Exact),
        "employees" | "workers" | "staff" | "people" | "incidents" | "hours" => {
            resolved("count", 1.0, Count, Synonym)
        }

        // Monetary → USD annotation with magnitude multipliers; no FX.
        "usd" | "$" => resolved("USD", 1.0, Monetary, Exact),
        "eur" | "€" => resolved("EUR", 1.0, Monetary, Exact),
        "gbp" | "£" => resolved("GBP", 1.0, Monetary, Exact),
        "million" => resolved("USD", 1e6, Monetary, Synonym),
        "billion" => resolved("USD", 1e9, Monetary, Synonym),
        "trillion" => resolved("USD", 1e12, Monetary, Synonym),

        // Dimensionless pass-throughs
        "year" => resolved("year", 1.0, PassThrough, Exact),
        "ha" | "hectares" => resolved("ha", 1.0, PassThrough, Exact),

        _ => return None,
    };
    Some(r)
}
