//! Chunk classification tables
//!
//! Closed lookup tables mapping text patterns to content types, section
//! types and concept tags, plus headline-metric extraction and the per-chunk
//! content quality score.

use filingforge_common::models::FinancialMetrics;
use filingforge_common::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Kind of financial content a window discusses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    ManagementDiscussion,
    RiskFactors,
    FinancialStatements,
    ExecutiveCompensation,
    BusinessOverview,
    Governance,
}

impl ContentType {
    /// Detection order; also the order types are reported in
    pub const ALL: [ContentType; 6] = [
        ContentType::ManagementDiscussion,
        ContentType::RiskFactors,
        ContentType::FinancialStatements,
        ContentType::ExecutiveCompensation,
        ContentType::BusinessOverview,
        ContentType::Governance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ManagementDiscussion => "management_discussion",
            ContentType::RiskFactors => "risk_factors",
            ContentType::FinancialStatements => "financial_statements",
            ContentType::ExecutiveCompensation => "executive_compensation",
            ContentType::BusinessOverview => "business_overview",
            ContentType::Governance => "governance",
        }
    }

    fn patterns(&self) -> &'static [&'static str] {
        match self {
            ContentType::ManagementDiscussion => &[
                r"management['\s]*s\s+discussion\s+and\s+analysis",
                r"md&a",
                r"results\s+of\s+operations",
                r"financial\s+condition\s+and\s+results",
                r"liquidity\s+and\s+capital\s+resources",
                r"critical\s+accounting\s+policies",
            ],
            ContentType::RiskFactors => &[
                r"risk\s+factors",
                r"principal\s+risks",
                r"material\s+risks",
                r"factors\s+that\s+may\s+affect",
                r"forward[.\s-]*looking\s+statements",
                r"uncertainties\s+and\s+risks",
            ],
            ContentType::FinancialStatements => &[
                r"consolidated\s+statements",
                r"financial\s+statements",
                r"balance\s+sheet",
                r"income\s+statement",
                r"cash\s+flow\s+statement",
                r"statements\s+of\s+operations",
                r"statements\s+of\s+equity",
                r"notes\s+to\s+financial\s+statements",
            ],
            ContentType::ExecutiveCompensation => &[
                r"executive\s+compensation",
                r"compensation\s+discussion",
                r"summary\s+compensation\s+table",
                r"named\s+executive\s+officers",
                r"pay\s+ratio",
                r"compensation\s+committee",
                r"equity\s+compensation",
                r"stock\s+option\s+grants",
            ],
            ContentType::BusinessOverview => &[
                r"business\s+overview",
                r"our\s+business",
                r"company\s+overview",
                r"business\s+description",
                r"products\s+and\s+services",
                r"business\s+segments",
                r"competitive\s+strengths",
            ],
            ContentType::Governance => &[
                r"corporate\s+governance",
                r"board\s+of\s+directors",
                r"audit\s+committee",
                r"governance\s+principles",
                r"director\s+independence",
                r"board\s+committees",
            ],
        }
    }

    fn section(&self) -> SectionType {
        match self {
            ContentType::ExecutiveCompensation => SectionType::Compensation,
            ContentType::RiskFactors => SectionType::Risk,
            ContentType::ManagementDiscussion => SectionType::ManagementAnalysis,
            ContentType::FinancialStatements => SectionType::Financial,
            ContentType::Governance => SectionType::Governance,
            ContentType::BusinessOverview => SectionType::Business,
        }
    }
}

/// Order in which detected content types claim the section
const SECTION_PRIORITY: [ContentType; 6] = [
    ContentType::ExecutiveCompensation,
    ContentType::RiskFactors,
    ContentType::ManagementDiscussion,
    ContentType::FinancialStatements,
    ContentType::Governance,
    ContentType::BusinessOverview,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Compensation,
    Risk,
    ManagementAnalysis,
    Financial,
    Governance,
    Business,
    Events,
    General,
}

impl SectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Compensation => "compensation",
            SectionType::Risk => "risk",
            SectionType::ManagementAnalysis => "management_analysis",
            SectionType::Financial => "financial",
            SectionType::Governance => "governance",
            SectionType::Business => "business",
            SectionType::Events => "events",
            SectionType::General => "general",
        }
    }

    /// Section assumed when no content type was detected
    pub fn fallback_for(doc_type: &str) -> Self {
        match doc_type {
            "DEF 14A" => SectionType::Governance,
            "10-K" | "10-Q" => SectionType::Financial,
            "8-K" => SectionType::Events,
            _ => SectionType::General,
        }
    }
}

const CONCEPT_PATTERNS: &[(&str, &[&str])] = &[
    ("revenue_growth", &[r"revenue.*growth", r"sales.*growth", r"top.*line.*growth"]),
    ("profitability", &[r"profit.*margin", r"operating.*margin", r"net.*income"]),
    ("liquidity", &[r"cash.*flow", r"working.*capital", r"liquidity"]),
    ("debt", &[r"debt.*ratio", r"leverage", r"borrowing"]),
    ("market_share", &[r"market.*share", r"competitive.*position"]),
    ("innovation", &[r"research.*development", r"r&d", r"innovation"]),
    ("risk_management", &[r"risk.*management", r"hedging", r"insurance"]),
    ("acquisitions", &[r"acquisition", r"merger", r"m&a"]),
    ("dividends", &[r"dividend", r"share.*repurchase", r"buyback"]),
    ("guidance", &[r"guidance", r"outlook", r"forecast"]),
];

const FINANCIAL_KEYWORDS: &[&str] = &[
    "revenue", "income", "profit", "loss", "earnings", "cash flow", "assets", "liabilities", "equity",
    "debt", "investment", "growth", "margin", "ratio", "performance", "results", "operations",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "strategy", "market", "competition", "customer", "product", "service", "technology", "innovation",
    "acquisition", "merger", "expansion", "risk", "opportunity", "challenge", "outlook", "guidance",
];

const REVENUE_PATTERNS: &[&str] = &[
    r"(?i)revenue\s+(?:of\s+)?\$?[\d,]+(?:\.\d+)?\s*(?:million|billion)?",
    r"(?i)net\s+sales\s+(?:of\s+)?\$?[\d,]+(?:\.\d+)?\s*(?:million|billion)?",
    r"(?i)total\s+revenue\s+(?:increased|decreased)\s+(?:by\s+)?[\d.]+%",
    r"(?i)revenue\s+growth\s+(?:of\s+)?[\d.]+%",
];

const PROFIT_PATTERNS: &[&str] = &[
    r"(?i)net\s+income\s+(?:of\s+)?\$?[\d,]+(?:\.\d+)?\s*(?:million|billion)?",
    r"(?i)operating\s+income\s+(?:of\s+)?\$?[\d,]+(?:\.\d+)?\s*(?:million|billion)?",
    r"(?i)gross\s+profit\s+(?:margin\s+)?(?:of\s+)?[\d.]+%",
    r"(?i)operating\s+margin\s+(?:of\s+)?[\d.]+%",
];

/// Everything derived from one window's text
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub content_types: Vec<ContentType>,
    pub section_type: SectionType,
    pub concepts: Vec<String>,
    pub keywords: Vec<String>,
    pub financial_metrics: FinancialMetrics,
    pub content_quality_score: f32,
}

impl Classification {
    pub fn primary_content_type(&self) -> &'static str {
        self.content_types.first().map(ContentType::as_str).unwrap_or("general")
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::Internal {
        message: format!("invalid pattern {}: {}", pattern, e),
    })
}

fn compile_all(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

/// Compiled classification tables
pub struct ContentClassifier {
    content_types: Vec<(ContentType, Vec<Regex>)>,
    concepts: Vec<(&'static str, Vec<Regex>)>,
    revenue: Vec<Regex>,
    profit: Vec<Regex>,
}

impl ContentClassifier {
    pub fn new() -> Result<Self> {
        let content_types = ContentType::ALL
            .iter()
            .map(|ct| Ok((*ct, compile_all(ct.patterns())?)))
            .collect::<Result<Vec<_>>>()?;

        let concepts = CONCEPT_PATTERNS
            .iter()
            .map(|(name, patterns)| Ok((*name, compile_all(patterns)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            content_types,
            concepts,
            revenue: compile_all(REVENUE_PATTERNS)?,
            profit: compile_all(PROFIT_PATTERNS)?,
        })
    }

    pub fn classify(&self, text: &str, doc_type: &str) -> Classification {
        let lower = text.to_lowercase();
        let content_types = self.content_types(&lower);
        let financial_metrics = self.financial_metrics(text);
        let concepts = self.concepts(&lower);
        let content_quality_score = content_quality_score(text, doc_type, &content_types, &financial_metrics);

        Classification {
            section_type: section_type(&content_types, doc_type),
            keywords: keywords(&lower, &content_types, &concepts),
            content_types,
            concepts,
            financial_metrics,
            content_quality_score,
        }
    }

    pub fn content_types(&self, lower: &str) -> Vec<ContentType> {
        self.content_types
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(lower)))
            .map(|(ct, _)| *ct)
            .collect()
    }

    fn concepts(&self, lower: &str) -> Vec<String> {
        let mut concepts: Vec<String> = self
            .concepts
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|p| p.is_match(lower)))
            .map(|(name, _)| name.to_string())
            .collect();
        concepts.sort();
        concepts
    }

    pub fn financial_metrics(&self, text: &str) -> FinancialMetrics {
        let captures = |patterns: &[Regex]| -> Vec<String> {
            patterns
                .iter()
                .flat_map(|p| p.find_iter(text).map(|m| m.as_str().trim().to_string()))
                .collect()
        };

        FinancialMetrics {
            revenue: captures(&self.revenue),
            profitability: captures(&self.profit),
        }
    }
}

/// First detected type by priority, else the doc-type fallback
pub fn section_type(content_types: &[ContentType], doc_type: &str) -> SectionType {
    SECTION_PRIORITY
        .iter()
        .find(|ct| content_types.contains(ct))
        .map(ContentType::section)
        .unwrap_or_else(|| SectionType::fallback_for(doc_type))
}

/// Sorted, deduplicated vocabulary hits plus detected types and concepts
fn keywords(lower: &str, content_types: &[ContentType], concepts: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = content_types.iter().map(|ct| ct.as_str().to_string()).collect();
    keywords.extend(concepts.iter().cloned());
    keywords.extend(
        FINANCIAL_KEYWORDS
            .iter()
            .chain(BUSINESS_KEYWORDS)
            .filter(|k| lower.contains(**k))
            .map(|k| k.to_string()),
    );
    keywords.sort();
    keywords.dedup();
    keywords
}

/// Length tier + content types + metrics + doc-type bonuses, capped at 1.0
pub fn content_quality_score(
    text: &str,
    doc_type: &str,
    content_types: &[ContentType],
    metrics: &FinancialMetrics,
) -> f32 {
    let word_count = text.split_whitespace().count();
    let mut score = match word_count {
        n if n > 1000 => 0.4,
        n if n > 500 => 0.3,
        n if n > 200 => 0.2,
        n if n > 50 => 0.1,
        _ => 0.0,
    };

    score += content_types.len() as f32 * 0.15;
    score += (metrics.count() as f32 * 0.08).min(0.4);

    let has = |ct: ContentType| content_types.contains(&ct);
    match doc_type {
        "10-K" => {
            let found = [
                ContentType::BusinessOverview,
                ContentType::RiskFactors,
                ContentType::ManagementDiscussion,
            ]
            .into_iter()
            .filter(|ct| has(*ct))
            .count();
            score += found as f32 * 0.15;
        }
        "DEF 14A" => {
            if has(ContentType::ExecutiveCompensation) {
                score += 0.25;
            }
            if has(ContentType::Governance) {
                score += 0.25;
            }
        }
        "10-Q" => {
            if has(ContentType::ManagementDiscussion) {
                score += 0.2;
            }
            if has(ContentType::FinancialStatements) {
                score += 0.2;
            }
        }
        _ => {}
    }

    if content_types.len() >= 2 {
        score += 0.1;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ContentClassifier {
        ContentClassifier::new().unwrap()
    }

    #[test]
    fn test_content_types_in_table_order() {
        let types = classifier().content_types("risk factors and results of operations");
        assert_eq!(types, vec![ContentType::ManagementDiscussion, ContentType::RiskFactors]);
    }

    #[test]
    fn test_section_priority() {
        let types = [ContentType::BusinessOverview, ContentType::RiskFactors];
        assert_eq!(section_type(&types, "10-K"), SectionType::Risk);
        assert_eq!(
            section_type(&[ContentType::ExecutiveCompensation, ContentType::RiskFactors], "10-K"),
            SectionType::Compensation
        );
    }

    #[test]
    fn test_section_fallbacks() {
        assert_eq!(section_type(&[], "DEF 14A"), SectionType::Governance);
        assert_eq!(section_type(&[], "10-Q"), SectionType::Financial);
        assert_eq!(section_type(&[], "8-K"), SectionType::Events);
        assert_eq!(section_type(&[], "4"), SectionType::General);
    }

    #[test]
    fn test_management_discussion_apostrophe() {
        let types = classifier().content_types("management's discussion and analysis");
        assert_eq!(types, vec![ContentType::ManagementDiscussion]);
    }

    #[test]
    fn test_financial_metrics() {
        let metrics = classifier().financial_metrics(
            "Revenue of $383.3 billion and net income of $97.0 billion; operating margin of 29.8%",
        );
        assert_eq!(metrics.revenue, vec!["Revenue of $383.3 billion"]);
        assert_eq!(metrics.profitability, vec!["net income of $97.0 billion", "operating margin of 29.8%"]);
        assert_eq!(metrics.count(), 3);
    }

    #[test]
    fn test_concepts_and_keywords() {
        let c = classifier().classify(
            "Research and development spending supports innovation and our dividend outlook",
            "10-K",
        );
        assert_eq!(c.concepts, vec!["dividends", "guidance", "innovation"]);
        assert!(c.keywords.contains(&"innovation".to_string()));
        assert!(c.keywords.contains(&"outlook".to_string()));
        let mut sorted = c.keywords.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, c.keywords);
        assert_eq!(c.primary_content_type(), "general");
        assert_eq!(c.section_type, SectionType::Financial);
    }

    #[test]
    fn test_content_quality_score() {
        let metrics = FinancialMetrics::default();
        let types = [ContentType::ExecutiveCompensation, ContentType::Governance];
        let text = "word ".repeat(60);
        // 0.1 length + 0.3 types + 0.5 proxy bonus + 0.1 multi-type
        let score = content_quality_score(&text, "DEF 14A", &types, &metrics);
        assert!((score - 1.0).abs() < 1e-6);

        let score = content_quality_score("short", "8-K", &[], &metrics);
        assert_eq!(score, 0.0);
    }
}
