//! Pattern tables for revenue and R&D extraction
//!
//! All patterns are compiled case-insensitive. Money patterns capture
//! `(value, unit)`, percent patterns capture `(value)`, and name patterns
//! capture the driver or strategy name in group 1.

use super::{DriverType, StrategyType, Trend};

const MONEY: &str = r"\$?([\d,]+(?:\.\d+)?)\s*(billion|million)";

/// What a revenue pattern captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RevenueKind {
    /// `(value, unit)` reported as `total_revenue`
    Total,
    /// `(value)` percent reported as `revenue_growth_rate`
    Growth,
    /// `(segment, value, unit)` reported as `<segment>_revenue`
    Segment,
}

/// What an R&D pattern captures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RdKind {
    Expense,
    Percentage,
    Growth,
}

impl RdKind {
    pub(crate) fn metric_type(self) -> &'static str {
        match self {
            RdKind::Expense => "rd_expense",
            RdKind::Percentage => "rd_percentage",
            RdKind::Growth => "rd_growth",
        }
    }
}

pub(crate) fn revenue_patterns() -> Vec<(RevenueKind, String)> {
    let mut patterns = vec![
        (RevenueKind::Total, format!(r"total\s+revenue\s+(?:of\s+|was\s+)?{MONEY}")),
        (RevenueKind::Total, format!(r"net\s+sales\s+(?:of\s+|were\s+)?{MONEY}")),
        (RevenueKind::Total, format!(r"revenue\s+(?:of\s+|was\s+)?{MONEY}")),
        (RevenueKind::Total, format!(r"total\s+net\s+sales\s+(?:of\s+)?{MONEY}")),
    ];
    for growth in [
        r"revenue\s+(?:increased|grew|growth)\s+(?:by\s+)?([\d.]+)%",
        r"(?:increase|growth)\s+in\s+revenue\s+of\s+([\d.]+)%",
        r"revenue\s+growth\s+(?:of\s+|was\s+)?([\d.]+)%",
        r"([\d.]+)%\s+(?:increase|growth)\s+in\s+revenue",
    ] {
        patterns.push((RevenueKind::Growth, growth.to_string()));
    }
    patterns.extend([
        (RevenueKind::Segment, format!(r"([a-zA-Z\s]+)\s+revenue\s+(?:of\s+|was\s+)?{MONEY}")),
        (RevenueKind::Segment, format!(r"([a-zA-Z\s]+)\s+segment\s+revenue\s+(?:of\s+)?{MONEY}")),
        (RevenueKind::Segment, format!(r"revenue\s+from\s+([a-zA-Z\s]+)\s+(?:of\s+|was\s+)?{MONEY}")),
    ]);
    patterns
}

pub(crate) fn rd_patterns() -> Vec<(RdKind, String)> {
    let rd = r"(?:research\s+and\s+development|r&d)";
    vec![
        (
            RdKind::Expense,
            format!(r"research\s+and\s+development\s+(?:expenses?|costs?)\s+(?:of\s+|were\s+)?{MONEY}"),
        ),
        (RdKind::Expense, format!(r"r&d\s+(?:expenses?|costs?|spending)\s+(?:of\s+|was\s+)?{MONEY}")),
        (RdKind::Expense, format!(r"(?:spent|invested)\s+{MONEY}\s+(?:on\s+|in\s+)?{rd}")),
        (RdKind::Expense, format!(r"research\s+and\s+development\s+investments?\s+(?:of\s+)?{MONEY}")),
        (
            RdKind::Percentage,
            r"r&d\s+(?:as\s+a\s+percentage\s+of\s+revenue|intensity)\s+(?:of\s+|was\s+)?([\d.]+)%".to_string(),
        ),
        (
            RdKind::Percentage,
            r"research\s+and\s+development\s+(?:as\s+a\s+percentage\s+of\s+revenue|intensity)\s+(?:of\s+)?([\d.]+)%"
                .to_string(),
        ),
        (RdKind::Percentage, format!(r"([\d.]+)%\s+of\s+revenue\s+(?:on\s+|for\s+)?{rd}")),
        (
            RdKind::Percentage,
            format!(r"invested\s+([\d.]+)%\s+of\s+(?:net\s+)?(?:sales|revenue)\s+in\s+{rd}"),
        ),
        (RdKind::Growth, r"r&d\s+(?:expenses?|spending)\s+(?:increased|grew)\s+(?:by\s+)?([\d.]+)%".to_string()),
        (
            RdKind::Growth,
            r"research\s+and\s+development\s+(?:expenses?|spending)\s+(?:increased|grew)\s+(?:by\s+)?([\d.]+)%"
                .to_string(),
        ),
        (RdKind::Growth, r"(?:increase|growth)\s+in\s+r&d\s+(?:expenses?|spending)\s+of\s+([\d.]+)%".to_string()),
        (RdKind::Growth, format!(r"([\d.]+)%\s+(?:increase|growth)\s+in\s+{rd}")),
    ]
}

pub(crate) const DRIVER_PATTERNS: &[(DriverType, &str)] = &[
    (DriverType::Product, r"(?:driven\s+by|primarily\s+from|growth\s+in)\s+([a-zA-Z\s]+)\s+(?:sales|revenue|products)"),
    (DriverType::Product, r"([a-zA-Z\s]+)\s+(?:products|services)\s+(?:contributed|drove|generated)"),
    (DriverType::Product, r"strong\s+(?:performance|growth)\s+in\s+([a-zA-Z\s]+)"),
    (DriverType::Product, r"([a-zA-Z\s]+)\s+business\s+(?:grew|increased|expanded)"),
    (DriverType::Service, r"(?:services|subscription|cloud|software)\s+revenue\s+(?:from|of)\s+([a-zA-Z\s]+)"),
    (DriverType::Service, r"([a-zA-Z\s]+)\s+services\s+(?:contributed|generated|drove)"),
    (DriverType::Service, r"growth\s+in\s+([a-zA-Z\s]+)\s+services"),
    (DriverType::Service, r"([a-zA-Z\s]+)\s+subscription\s+(?:revenue|growth)"),
    (DriverType::Geographic, r"(?:revenue|sales)\s+in\s+([a-zA-Z\s]+)\s+(?:increased|grew|expanded)"),
    (DriverType::Geographic, r"([a-zA-Z\s]+)\s+(?:market|region)\s+(?:contributed|drove|generated)"),
    (DriverType::Geographic, r"strong\s+(?:performance|growth)\s+in\s+([a-zA-Z\s]+)"),
    (DriverType::Geographic, r"international\s+revenue\s+from\s+([a-zA-Z\s]+)"),
    (DriverType::Customer, r"([a-zA-Z\s]+)\s+customers\s+(?:contributed|drove|generated)"),
    (DriverType::Customer, r"growth\s+in\s+([a-zA-Z\s]+)\s+customer\s+base"),
    (DriverType::Customer, r"([a-zA-Z\s]+)\s+segment\s+customers"),
    (DriverType::Customer, r"enterprise\s+customers\s+in\s+([a-zA-Z\s]+)"),
];

pub(crate) const STRATEGY_PATTERNS: &[(StrategyType, &str)] = &[
    (
        StrategyType::TechnologyFocus,
        r"(?:focus|investment|emphasis)\s+on\s+([a-zA-Z\s]+)\s+(?:technology|technologies|innovation)",
    ),
    (
        StrategyType::TechnologyFocus,
        r"developing\s+(?:new\s+|advanced\s+)?([a-zA-Z\s]+)\s+(?:technologies|capabilities|solutions)",
    ),
    (StrategyType::TechnologyFocus, r"innovation\s+in\s+([a-zA-Z\s]+)"),
    (StrategyType::TechnologyFocus, r"technological\s+(?:leadership|advancement)\s+in\s+([a-zA-Z\s]+)"),
    (StrategyType::Acquisition, r"acquired\s+([a-zA-Z\s]+)\s+(?:to\s+enhance|for|to\s+expand)"),
    (StrategyType::Acquisition, r"acquisition\s+of\s+([a-zA-Z\s]+)\s+(?:strengthens|enhances|expands)"),
    (StrategyType::Acquisition, r"strategic\s+acquisition\s+of\s+([a-zA-Z\s]+)"),
    (StrategyType::Acquisition, r"purchased\s+([a-zA-Z\s]+)\s+to\s+(?:accelerate|enhance|expand)"),
    (StrategyType::Partnership, r"partnership\s+with\s+([a-zA-Z\s]+)\s+(?:to\s+develop|for|to\s+advance)"),
    (StrategyType::Partnership, r"collaboration\s+with\s+([a-zA-Z\s]+)\s+(?:on|in|for)"),
    (StrategyType::Partnership, r"strategic\s+alliance\s+with\s+([a-zA-Z\s]+)"),
    (StrategyType::Partnership, r"joint\s+(?:venture|development)\s+with\s+([a-zA-Z\s]+)"),
    (StrategyType::InternalDevelopment, r"internal\s+(?:development|research)\s+(?:of|in)\s+([a-zA-Z\s]+)"),
    (StrategyType::InternalDevelopment, r"in-house\s+(?:development|innovation)\s+(?:of|in)\s+([a-zA-Z\s]+)"),
    (
        StrategyType::InternalDevelopment,
        r"proprietary\s+([a-zA-Z\s]+)\s+(?:development|technology|platform)",
    ),
    (StrategyType::InternalDevelopment, r"internally\s+developed\s+([a-zA-Z\s]+)"),
];

/// Tone patterns counted over a lowercased driver context, in tie-break order
pub(crate) const TREND_PATTERNS: &[(Trend, &[&str])] = &[
    (
        Trend::Growing,
        &[
            r"increased|grew|growth|expansion|rising|uptick|improvement|strong|robust",
            r"accelerat|momentum|outperform|exceed|beat|surpass",
        ],
    ),
    (
        Trend::Declining,
        &[
            r"decreased|declined|drop|fell|weakness|softness|challenging|pressure",
            r"decelerat|slowdown|underperform|miss|below|contract",
        ],
    ),
    (
        Trend::Stable,
        &[r"stable|consistent|maintained|steady|flat|unchanged|similar", r"in\s+line\s+with|comparable|equivalent"],
    ),
];

/// Section types scanned for drivers and strategies
pub(crate) const NARRATIVE_SECTIONS: &[&str] = &["management_analysis", "business", "financial"];

/// Names too generic to be a driver or strategy
pub(crate) const GENERIC_NAMES: &[&str] = &["the", "our", "and", "or"];

pub(crate) const IMPORTANCE_INDICATORS: &[&str] = &[
    "primary",
    "main",
    "key",
    "major",
    "significant",
    "substantial",
    "largest",
    "biggest",
    "most important",
    "critical",
    "core",
];

pub(crate) const FINANCIAL_TERMS: &[&str] = &["revenue", "sales", "income", "growth", "profit"];

pub(crate) const HIGH_INVESTMENT: &[&str] = &[
    "significant",
    "substantial",
    "major",
    "large",
    "massive",
    "billion",
    "strategic",
    "critical",
    "key",
    "primary",
    "core",
    "extensive",
];

pub(crate) const MEDIUM_INVESTMENT: &[&str] = &[
    "moderate",
    "continued",
    "ongoing",
    "regular",
    "consistent",
    "million",
    "important",
    "focused",
    "targeted",
    "selective",
];

pub(crate) const LOW_INVESTMENT: &[&str] = &[
    "limited",
    "small",
    "minimal",
    "reduced",
    "cautious",
    "selective",
    "pilot",
    "experimental",
    "initial",
    "exploratory",
];

pub(crate) const TECH_AREAS: &[&str] = &[
    "artificial intelligence",
    "ai",
    "machine learning",
    "cloud computing",
    "cybersecurity",
    "blockchain",
    "quantum computing",
    "5g",
    "iot",
    "automation",
    "robotics",
    "data analytics",
    "software",
    "hardware",
    "semiconductors",
    "biotechnology",
    "renewable energy",
    "electric vehicles",
];

/// A strategy whose name contains one of these is itself a focus area
pub(crate) const TECH_NAME_HINTS: &[&str] = &["ai", "cloud", "software", "data", "tech"];
