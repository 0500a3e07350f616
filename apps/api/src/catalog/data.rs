//! Requirement data for the four supported frameworks.
//!
//! Metric patterns are compiled case-insensitively by the loader. Group 1
//! captures the numeric token, group 2 (when present) the unit token;
//! patterns without a unit group name their canonical unit via the hint.

use super::{Category, Framework};

/// (metric name, regex source, unit hint)
pub(super) type PatternDef = (&'static str, &'static str, Option<&'static str>);

pub(super) struct RequirementDef {
    pub id: &'static str,
    pub framework: Framework,
    pub category: Category,
    pub subcategory: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub mandatory: bool,
    pub patterns: &'static [PatternDef],
    pub critical_industries: &'static [&'static str],
}

const NO_PATTERNS: &[PatternDef] = &[];
const NO_INDUSTRIES: &[&str] = &[];
const FOSSIL_HEAVY: &[&str] = &["energy", "utilities", "oil & gas"];
const DATA_HEAVY: &[&str] = &["technology", "finance"];
const SUPPLY_HEAVY: &[&str] = &["manufacturing", "automotive"];

// Shared numeric token: plain, grouped (1,234 / 1.234,5 / 1 234,5) and
// scientific notation are all captured; the standardizer resolves separators.
// Inlined below as \d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?

pub(super) fn requirement_defs() -> Vec<RequirementDef> {
    let mut defs = Vec::with_capacity(46);
    defs.extend(csrd());
    defs.extend(gri());
    defs.extend(sasb());
    defs.extend(tcfd());
    defs
}

fn csrd() -> Vec<RequirementDef> {
    vec![
        RequirementDef {
            id: "CSRD-E1-1",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Climate Change",
            description: "Transition plan for climate change mitigation",
            keywords: &[
                "transition plan",
                "climate mitigation",
                "net zero",
                "carbon neutral",
                "decarbonization",
            ],
            mandatory: true,
            patterns: &[
                (
                    "emissions_reduction",
                    r"reduced[^.]{0,60}emissions?[^.]{0,25}by\s+(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)",
                    None,
                ),
                (
                    "net_zero_target_year",
                    r"net.zero[^.]{0,30}\b(20\d{2})\b",
                    Some("year"),
                ),
            ],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "CSRD-E1-2",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Climate Change",
            description: "Physical and transition risks from climate change",
            keywords: &[
                "physical risk",
                "transition risk",
                "climate risk",
                "scenario analysis",
            ],
            mandatory: true,
            patterns: &[(
                "climate_risk_exposure",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(billion|million)[^.]{0,30}risk exposure",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-E1-3",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Climate Change",
            description: "GHG emissions and energy consumption",
            keywords: &[
                "scope 1",
                "scope 2",
                "scope 3",
                "ghg emissions",
                "greenhouse gas",
                "energy consumption",
            ],
            mandatory: true,
            patterns: &[
                (
                    "ghg_emissions",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b[^.]{0,20}co2",
                    None,
                ),
                (
                    "energy_consumption",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(kwh|mwh|gwh|twh|gj|tj)\b",
                    None,
                ),
            ],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "CSRD-E2-1",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Pollution",
            description: "Air, water and soil pollution",
            keywords: &[
                "air pollution",
                "water pollution",
                "soil pollution",
                "emissions to air",
                "emissions to water",
            ],
            mandatory: true,
            patterns: &[(
                "pollutant_mass",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(mg|g|kg|tonnes)\b[^.]{0,20}pollutant",
                None,
            )],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "CSRD-E3-1",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Water and Marine Resources",
            description: "Water consumption and marine resources impact",
            keywords: &[
                "water consumption",
                "water withdrawal",
                "water discharge",
                "marine resources",
                "water stress",
            ],
            mandatory: true,
            patterns: &[(
                "water_volume",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(million m3|million m³|m3|m³|cubic meters?|megaliters?|megalitres?|liters?|litres?|gallons?)\b[^.]{0,25}water",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-E4-1",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Biodiversity and Ecosystems",
            description: "Biodiversity and ecosystems impact",
            keywords: &[
                "biodiversity",
                "ecosystem",
                "habitat",
                "species",
                "deforestation",
            ],
            mandatory: true,
            patterns: &[(
                "protected_land_area",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(hectares|ha)\b",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-E5-1",
            framework: Framework::Csrd,
            category: Category::Environmental,
            subcategory: "Circular Economy",
            description: "Resource use, circular economy, and waste",
            keywords: &[
                "circular economy",
                "waste",
                "recycling",
                "material flow",
                "resource efficiency",
            ],
            mandatory: true,
            patterns: &[
                (
                    "waste_mass",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(kg|tonnes|tons)\b[^.]{0,20}waste",
                    None,
                ),
                (
                    "recycling_rate",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,20}recycl",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-S1-1",
            framework: Framework::Csrd,
            category: Category::Social,
            subcategory: "Own Workforce",
            description: "Working conditions and equal treatment",
            keywords: &[
                "working conditions",
                "equal treatment",
                "non-discrimination",
                "diversity",
                "inclusion",
            ],
            mandatory: true,
            patterns: &[
                (
                    "women_in_management",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}women[^.]{0,20}management",
                    None,
                ),
                (
                    "workforce_diversity",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,20}diversity",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-S1-2",
            framework: Framework::Csrd,
            category: Category::Social,
            subcategory: "Own Workforce",
            description: "Social dialogue and collective bargaining",
            keywords: &[
                "collective bargaining",
                "trade union",
                "works council",
                "social dialogue",
            ],
            mandatory: true,
            patterns: &[(
                "collective_bargaining_coverage",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}collective",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-S2-1",
            framework: Framework::Csrd,
            category: Category::Social,
            subcategory: "Workers in Value Chain",
            description: "Due diligence on working conditions in the value chain",
            keywords: &[
                "value chain",
                "supply chain",
                "due diligence",
                "supplier assessment",
            ],
            mandatory: true,
            patterns: &[
                (
                    "suppliers_assessed",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}suppliers?[^.]{0,20}assessed",
                    None,
                ),
                (
                    "suppliers_audited",
                    r"(\d+(?:[.,\s]\d+)*)\s*suppliers?[^.]{0,20}audited",
                    Some("count"),
                ),
            ],
            critical_industries: SUPPLY_HEAVY,
        },
        RequirementDef {
            id: "CSRD-S3-1",
            framework: Framework::Csrd,
            category: Category::Social,
            subcategory: "Affected Communities",
            description: "Human rights and community impact",
            keywords: &[
                "human rights",
                "community",
                "indigenous rights",
                "land rights",
                "displacement",
            ],
            mandatory: true,
            patterns: &[
                (
                    "communities_engaged",
                    r"(\d+(?:[.,\s]\d+)*)\s*communities[^.]{0,20}engaged",
                    Some("count"),
                ),
                (
                    "community_investment",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(million|billion)[^.]{0,30}community investment",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-S4-1",
            framework: Framework::Csrd,
            category: Category::Social,
            subcategory: "Consumers and End-users",
            description: "Consumer and end-user safety and satisfaction",
            keywords: &[
                "consumer safety",
                "product safety",
                "data protection",
                "privacy",
                "customer satisfaction",
            ],
            mandatory: true,
            patterns: &[
                (
                    "safety_incidents",
                    r"(\d+(?:[.,\s]\d+)*)\s*safety[^.]{0,15}incidents",
                    Some("count"),
                ),
                (
                    "customer_satisfaction",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}customer satisfaction",
                    None,
                ),
            ],
            critical_industries: DATA_HEAVY,
        },
        RequirementDef {
            id: "CSRD-G1-1",
            framework: Framework::Csrd,
            category: Category::Governance,
            subcategory: "Business Conduct",
            description: "Anti-corruption and anti-bribery policies",
            keywords: &[
                "anti-corruption",
                "anti-bribery",
                "business ethics",
                "code of conduct",
                "whistleblowing",
            ],
            mandatory: true,
            patterns: &[
                (
                    "corruption_cases",
                    r"(\d+(?:[.,\s]\d+)*)\s*corruption[^.]{0,15}cases",
                    Some("count"),
                ),
                (
                    "ethics_training_rate",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,25}training[^.]{0,15}ethics",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "CSRD-G1-2",
            framework: Framework::Csrd,
            category: Category::Governance,
            subcategory: "Business Conduct",
            description: "Management of relationships with suppliers",
            keywords: &[
                "supplier relationship",
                "procurement",
                "vendor management",
                "supplier code",
            ],
            mandatory: true,
            patterns: &[
                (
                    "suppliers_total",
                    r"(\d+(?:[.,\s]\d+)*)\s*suppliers?[^.]{0,15}total",
                    Some("count"),
                ),
                (
                    "suppliers_compliant",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,25}suppliers?[^.]{0,20}compliant",
                    None,
                ),
            ],
            critical_industries: SUPPLY_HEAVY,
        },
    ]
}

fn gri() -> Vec<RequirementDef> {
    vec![
        RequirementDef {
            id: "GRI-2-1",
            framework: Framework::Gri,
            category: Category::Governance,
            subcategory: "Organizational Details",
            description: "Organizational details and reporting boundary",
            keywords: &[
                "organizational structure",
                "reporting boundary",
                "subsidiaries",
                "joint ventures",
            ],
            mandatory: true,
            patterns: &[
                (
                    "countries_of_operation",
                    r"(\d+(?:[.,\s]\d+)*)\s*countries[^.]{0,20}operations",
                    Some("count"),
                ),
                (
                    "total_employees",
                    r"(\d+(?:[.,\s]\d+)*)\s*(employees|workers|staff)\b",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-2-6",
            framework: Framework::Gri,
            category: Category::Governance,
            subcategory: "Strategy and Analysis",
            description: "Statement from senior decision-maker",
            keywords: &[
                "ceo statement",
                "leadership message",
                "senior management",
                "strategy statement",
            ],
            mandatory: true,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-302-1",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Energy",
            description: "Energy consumption within the organization",
            keywords: &[
                "energy consumption",
                "renewable energy",
                "electricity use",
                "fuel consumption",
            ],
            mandatory: false,
            patterns: &[
                (
                    "energy_consumption",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(kwh|mwh|gwh|twh|gj|tj)\b",
                    None,
                ),
                (
                    "renewable_energy_share",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}renewable",
                    None,
                ),
            ],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "GRI-303-3",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Water and Effluents",
            description: "Water withdrawal",
            keywords: &[
                "water withdrawal",
                "water consumption",
                "water sources",
                "freshwater",
            ],
            mandatory: false,
            patterns: &[(
                "water_withdrawal",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(million m3|million m³|m3|m³|megaliters?|megalitres?|liters?|litres?)\b[^.]{0,25}(?:water|withdrawal)",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-305-1",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Emissions",
            description: "Direct (Scope 1) GHG emissions",
            keywords: &["scope 1", "direct emissions", "ghg emissions", "co2 emissions"],
            mandatory: false,
            patterns: &[(
                "scope_1_emissions",
                r"scope\s*1[^.]{0,40}?(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b",
                None,
            )],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "GRI-305-2",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Emissions",
            description: "Energy indirect (Scope 2) GHG emissions",
            keywords: &[
                "scope 2",
                "indirect emissions",
                "energy emissions",
                "electricity emissions",
            ],
            mandatory: false,
            patterns: &[(
                "scope_2_emissions",
                r"scope\s*2[^.]{0,40}?(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b",
                None,
            )],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "GRI-305-3",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Emissions",
            description: "Other indirect (Scope 3) GHG emissions",
            keywords: &[
                "scope 3",
                "value chain emissions",
                "supply chain emissions",
                "other indirect",
            ],
            mandatory: false,
            patterns: &[(
                "scope_3_emissions",
                r"scope\s*3[^.]{0,40}?(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b",
                None,
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-306-3",
            framework: Framework::Gri,
            category: Category::Environmental,
            subcategory: "Waste",
            description: "Waste generated",
            keywords: &[
                "waste generated",
                "waste disposal",
                "hazardous waste",
                "landfill",
            ],
            mandatory: false,
            patterns: &[(
                "waste_generated",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(kg|tonnes|tons)\b[^.]{0,20}waste",
                None,
            )],
            critical_industries: SUPPLY_HEAVY,
        },
        RequirementDef {
            id: "GRI-401-1",
            framework: Framework::Gri,
            category: Category::Social,
            subcategory: "Employment",
            description: "New employee hires and employee turnover",
            keywords: &[
                "employee turnover",
                "new hires",
                "attrition",
                "retention",
            ],
            mandatory: false,
            patterns: &[
                (
                    "employee_turnover_rate",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,15}turnover",
                    None,
                ),
                (
                    "new_hires",
                    r"(\d+(?:[.,\s]\d+)*)\s*new hires",
                    Some("count"),
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-403-9",
            framework: Framework::Gri,
            category: Category::Social,
            subcategory: "Occupational Health and Safety",
            description: "Work-related injuries",
            keywords: &[
                "work injuries",
                "accident rate",
                "safety incidents",
                "occupational health",
            ],
            mandatory: false,
            patterns: &[
                (
                    "injury_rate",
                    r"injury rate[^.]{0,15}?(\d+(?:[.,\s]\d+)*(?:\.\d+)?)",
                    Some("count"),
                ),
                (
                    "safety_incidents",
                    r"(\d+(?:[.,\s]\d+)*)\s*safety[^.]{0,15}incidents",
                    Some("count"),
                ),
            ],
            critical_industries: SUPPLY_HEAVY,
        },
        RequirementDef {
            id: "GRI-405-1",
            framework: Framework::Gri,
            category: Category::Social,
            subcategory: "Diversity and Equal Opportunity",
            description: "Diversity of governance bodies and employees",
            keywords: &[
                "diversity",
                "gender diversity",
                "age diversity",
                "ethnic diversity",
                "board composition",
            ],
            mandatory: false,
            patterns: &[
                (
                    "women_on_board",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,25}women[^.]{0,15}board",
                    None,
                ),
                (
                    "women_in_management",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,30}women[^.]{0,20}management",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "GRI-205-3",
            framework: Framework::Gri,
            category: Category::Governance,
            subcategory: "Anti-corruption",
            description: "Confirmed incidents of corruption and actions taken",
            keywords: &[
                "corruption incidents",
                "anti-corruption",
                "bribery",
                "fraud",
                "ethics violations",
            ],
            mandatory: false,
            patterns: &[(
                "corruption_incidents",
                r"(\d+(?:[.,\s]\d+)*)\s*corruption[^.]{0,15}incidents",
                Some("count"),
            )],
            critical_industries: NO_INDUSTRIES,
        },
    ]
}

fn sasb() -> Vec<RequirementDef> {
    vec![
        RequirementDef {
            id: "SASB-TC-220a.1",
            framework: Framework::Sasb,
            category: Category::Social,
            subcategory: "Data Privacy",
            description: "Policies and practices relating to behavioral advertising and user privacy",
            keywords: &[
                "behavioral advertising",
                "data privacy",
                "user tracking",
                "advertising policies",
            ],
            mandatory: false,
            patterns: &[(
                "privacy_complaints",
                r"(\d+(?:[.,\s]\d+)*)\s*privacy[^.]{0,15}complaints",
                Some("count"),
            )],
            critical_industries: DATA_HEAVY,
        },
        RequirementDef {
            id: "SASB-TC-220a.2",
            framework: Framework::Sasb,
            category: Category::Social,
            subcategory: "Data Privacy",
            description: "Number of users whose information is used for secondary purposes",
            keywords: &["secondary use", "data sharing", "user data", "information use"],
            mandatory: false,
            patterns: &[(
                "data_shared_rate",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,15}data[^.]{0,12}shared",
                None,
            )],
            critical_industries: DATA_HEAVY,
        },
        RequirementDef {
            id: "SASB-TC-130a.1",
            framework: Framework::Sasb,
            category: Category::Environmental,
            subcategory: "Energy Management",
            description: "Total energy consumed and data center energy efficiency",
            keywords: &[
                "data center energy",
                "power usage effectiveness",
                "pue",
                "energy management",
            ],
            mandatory: false,
            patterns: &[(
                "data_center_energy",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(kwh|mwh|gwh)\b[^.]{0,25}data center",
                None,
            )],
            critical_industries: &["technology"],
        },
        RequirementDef {
            id: "SASB-EM-EP-110a.1",
            framework: Framework::Sasb,
            category: Category::Environmental,
            subcategory: "Air Quality",
            description: "Air emissions of criteria pollutants",
            keywords: &[
                "air emissions",
                "nox",
                "sox",
                "particulate matter",
                "criteria pollutants",
            ],
            mandatory: false,
            patterns: &[
                (
                    "nox_emissions",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tonnes|tons|t)\b[^.]{0,12}nox",
                    None,
                ),
                (
                    "sox_emissions",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tonnes|tons|t)\b[^.]{0,12}sox",
                    None,
                ),
            ],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "SASB-EM-EP-140a.1",
            framework: Framework::Sasb,
            category: Category::Environmental,
            subcategory: "Water Management",
            description: "Water withdrawn, recycled, and consumed in operations",
            keywords: &[
                "water management",
                "water recycled",
                "produced water",
                "water intensity",
            ],
            mandatory: false,
            patterns: &[(
                "water_recycled_rate",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,20}water[^.]{0,15}recycl",
                None,
            )],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "SASB-FN-CB-410a.1",
            framework: Framework::Sasb,
            category: Category::Social,
            subcategory: "Financial Inclusion",
            description: "Loans outstanding to underbanked populations",
            keywords: &[
                "financial inclusion",
                "underbanked",
                "microfinance",
                "community lending",
            ],
            mandatory: false,
            patterns: &[(
                "underbanked_loans",
                r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(million|billion)[^.]{0,25}loans[^.]{0,20}underbanked",
                None,
            )],
            critical_industries: &["finance"],
        },
        RequirementDef {
            id: "SASB-HC-BP-240a.1",
            framework: Framework::Sasb,
            category: Category::Social,
            subcategory: "Product Safety",
            description: "Products subject to safety alerts or recalls",
            keywords: &[
                "product safety",
                "fda alerts",
                "medical device safety",
                "drug safety",
            ],
            mandatory: false,
            patterns: &[
                (
                    "safety_alerts",
                    r"(\d+(?:[.,\s]\d+)*)\s*safety[^.]{0,12}alerts",
                    Some("count"),
                ),
                (
                    "product_recalls",
                    r"(\d+(?:[.,\s]\d+)*)\s*product[^.]{0,12}recalls",
                    Some("count"),
                ),
            ],
            critical_industries: &["healthcare"],
        },
        RequirementDef {
            id: "SASB-GEN-000.A",
            framework: Framework::Sasb,
            category: Category::Governance,
            subcategory: "Business Model",
            description: "Nature of business operations",
            keywords: &[
                "business model",
                "operations description",
                "industry description",
                "value creation",
            ],
            mandatory: false,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "SASB-GEN-000.B",
            framework: Framework::Sasb,
            category: Category::Governance,
            subcategory: "Business Environment",
            description: "How the organization identifies, assesses, and manages sustainability risks",
            keywords: &[
                "sustainability risk",
                "risk management",
                "materiality assessment",
                "risk governance",
            ],
            mandatory: false,
            patterns: &[
                (
                    "material_topics",
                    r"(\d+(?:[.,\s]\d+)*)\s*material[^.]{0,12}topics",
                    Some("count"),
                ),
                (
                    "risks_identified",
                    r"(\d+(?:[.,\s]\d+)*)\s*risks[^.]{0,12}identified",
                    Some("count"),
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
    ]
}

fn tcfd() -> Vec<RequirementDef> {
    vec![
        RequirementDef {
            id: "TCFD-GOV-A",
            framework: Framework::Tcfd,
            category: Category::Governance,
            subcategory: "Board Oversight",
            description: "Board's oversight of climate-related risks and opportunities",
            keywords: &[
                "board oversight",
                "climate governance",
                "board responsibility",
                "climate committee",
            ],
            mandatory: true,
            patterns: &[(
                "board_climate_meetings",
                r"(\d+(?:[.,\s]\d+)*)\s*board[^.]{0,15}meetings[^.]{0,15}climate",
                Some("count"),
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-GOV-B",
            framework: Framework::Tcfd,
            category: Category::Governance,
            subcategory: "Management Role",
            description: "Management's role in assessing and managing climate-related risks",
            keywords: &[
                "management role",
                "climate management",
                "executive responsibility",
                "climate officer",
            ],
            mandatory: true,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-STR-A",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "Climate Risks and Opportunities",
            description: "Climate-related risks and opportunities over short, medium, and long term",
            keywords: &[
                "climate risks",
                "climate opportunities",
                "physical risk",
                "transition risk",
                "time horizons",
            ],
            mandatory: true,
            patterns: &[(
                "climate_risks_identified",
                r"(\d+(?:[.,\s]\d+)*)\s*climate[^.]{0,12}risks",
                Some("count"),
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-STR-B",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "Business Impact",
            description: "Impact of climate risks and opportunities on business, strategy, and financial planning",
            keywords: &[
                "business impact",
                "strategic impact",
                "financial impact",
                "climate strategy",
            ],
            mandatory: true,
            patterns: &[
                (
                    "climate_financial_impact",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(million|billion)[^.]{0,25}climate[^.]{0,15}impact",
                    None,
                ),
                (
                    "climate_revenue_share",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,20}revenue[^.]{0,15}climate",
                    None,
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-STR-C",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "Climate Scenarios",
            description: "Resilience of strategy under different climate-related scenarios",
            keywords: &[
                "scenario analysis",
                "climate scenarios",
                "stress testing",
                "resilience",
                "2 degree",
                "1.5 degree",
            ],
            mandatory: true,
            patterns: &[(
                "scenarios_analyzed",
                r"(\d+(?:[.,\s]\d+)*)\s*scenarios[^.]{0,12}analy[sz]ed",
                Some("count"),
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-RM-A",
            framework: Framework::Tcfd,
            category: Category::Governance,
            subcategory: "Risk Identification",
            description: "Processes for identifying and assessing climate-related risks",
            keywords: &[
                "risk identification",
                "risk assessment",
                "climate risk process",
                "risk methodology",
            ],
            mandatory: true,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-RM-B",
            framework: Framework::Tcfd,
            category: Category::Governance,
            subcategory: "Risk Management",
            description: "Processes for managing climate-related risks",
            keywords: &[
                "risk management",
                "risk mitigation",
                "climate risk controls",
                "risk monitoring",
            ],
            mandatory: true,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-RM-C",
            framework: Framework::Tcfd,
            category: Category::Governance,
            subcategory: "Risk Integration",
            description: "Integration of climate-related risks into overall risk management",
            keywords: &[
                "risk integration",
                "enterprise risk",
                "integrated risk",
                "overall risk management",
            ],
            mandatory: true,
            patterns: NO_PATTERNS,
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-MT-A",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "Climate Metrics",
            description: "Metrics used to assess climate-related risks and opportunities",
            keywords: &[
                "climate metrics",
                "risk metrics",
                "opportunity metrics",
                "performance indicators",
            ],
            mandatory: true,
            patterns: &[(
                "climate_metrics_count",
                r"(\d+(?:[.,\s]\d+)*)\s*climate[^.]{0,12}metrics",
                Some("count"),
            )],
            critical_industries: NO_INDUSTRIES,
        },
        RequirementDef {
            id: "TCFD-MT-B",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "GHG Emissions",
            description: "Scope 1, 2, and if appropriate, Scope 3 GHG emissions and related risks",
            keywords: &[
                "scope 1",
                "scope 2",
                "scope 3",
                "ghg emissions",
                "carbon footprint",
                "emissions data",
            ],
            mandatory: true,
            patterns: &[
                (
                    "ghg_emissions",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons|t)\b[^.]{0,20}co2",
                    None,
                ),
                (
                    "ghg_emissions",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(tco2e|ktco2e|mtco2e|tonnes|tons)\b[^.]{0,15}emissions",
                    None,
                ),
            ],
            critical_industries: FOSSIL_HEAVY,
        },
        RequirementDef {
            id: "TCFD-MT-C",
            framework: Framework::Tcfd,
            category: Category::Environmental,
            subcategory: "Climate Targets",
            description: "Targets used to manage climate-related risks and opportunities",
            keywords: &[
                "climate targets",
                "emission targets",
                "net zero",
                "carbon neutral",
                "reduction targets",
            ],
            mandatory: true,
            patterns: &[
                (
                    "emissions_reduction_target",
                    r"(\d+(?:[.,\s]\d+)*(?:[eE][+-]?\d+)?)\s*(%|percent)[^.]{0,20}reduction target",
                    None,
                ),
                (
                    "net_zero_target_year",
                    r"net.zero[^.]{0,30}\b(20\d{2})\b",
                    Some("year"),
                ),
            ],
            critical_industries: NO_INDUSTRIES,
        },
    ]
}
