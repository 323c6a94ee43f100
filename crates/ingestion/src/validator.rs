//! Content validation
//!
//! Separates genuine filing text from navigation and viewer stubs before
//! anything is chunked. Validation never fails: every input gets a
//! [`Verdict`].

use filingforge_common::config::ValidationConfig;
use serde::Serialize;

/// Markers of XBRL viewer and EDGAR index pages
const STUB_INDICATORS: &[&str] = &[
    "xbrl viewer",
    "ixviewer",
    "loadviewer",
    "javascript",
    "iframe",
    "this page uses javascript",
    "edgar-logo",
    "filing detail",
    "edgar filing documents",
];

/// Section phrases expected in each filing type
fn expected_sections(doc_type: &str) -> &'static [&'static str] {
    match doc_type {
        "10-K" => &[
            "annual report",
            "business overview",
            "risk factors",
            "management discussion",
            "financial statements",
            "consolidated statements",
            "item 1",
            "item 2",
            "item 3",
            "part i",
            "part ii",
        ],
        "10-Q" => &[
            "quarterly report",
            "financial statements",
            "condensed consolidated",
            "management discussion",
            "item 1",
            "item 2",
            "part i",
            "part ii",
        ],
        "8-K" => &[
            "current report",
            "item 1",
            "item 2",
            "item 3",
            "item 4",
            "item 5",
            "item 7",
            "item 8",
            "item 9",
            "signature",
        ],
        "DEF 14A" => &[
            "proxy statement",
            "annual meeting",
            "executive compensation",
            "board of directors",
            "shareholder",
            "voting",
            "proposal",
        ],
        "3" => &["initial statement", "beneficial ownership", "securities owned"],
        "4" => &["statement of changes", "securities acquired", "securities disposed"],
        "5" => &["annual statement", "securities beneficially owned"],
        _ => &["sec filing", "securities", "company"],
    }
}

const FINANCIAL_TERMS: &[&str] = &[
    "revenue", "income", "profit", "loss", "earnings", "cash flow", "assets", "liabilities", "equity",
    "debt", "investment", "financial", "fiscal", "quarter", "annual", "million", "billion", "percent",
    "percentage", "growth", "decline", "increase", "decrease",
];

const KEY_FINANCIAL_TERMS: &[&str] = &["revenue", "income", "profit", "earnings", "cash flow"];

/// Outcome of validating one document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub is_valid: bool,
    pub reason: String,
    pub quality_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filing_content_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial_content_score: Option<f32>,
}

impl Verdict {
    fn reject(reason: impl Into<String>, quality_score: f32) -> Self {
        Self {
            is_valid: false,
            reason: reason.into(),
            quality_score,
            filing_content_score: None,
            financial_content_score: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentValidator {
    config: ValidationConfig,
}

impl ContentValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, text: &str, doc_type: &str) -> Verdict {
        let lower = text.to_lowercase();
        let word_count = text.split_whitespace().count();

        let stub_hits = STUB_INDICATORS.iter().filter(|i| lower.contains(**i)).count();
        if stub_hits >= self.config.stub_indicator_threshold && word_count < self.config.stub_max_words {
            return Verdict::reject("XBRL viewer page detected", 0.0);
        }

        if word_count < self.config.min_words {
            return Verdict::reject(format!("Content too short ({} words)", word_count), 0.1);
        }

        let filing_score = filing_content_score(&lower, doc_type);
        if filing_score < self.config.min_content_score {
            return Verdict::reject(format!("Low filing content score ({:.2})", filing_score), filing_score);
        }

        let financial_score = financial_content_score(&lower);

        Verdict {
            is_valid: true,
            reason: "Content validation passed".to_string(),
            quality_score: (filing_score + financial_score) / 2.0,
            filing_content_score: Some(filing_score),
            financial_content_score: Some(financial_score),
        }
    }
}

/// Fraction of the expected section phrases present in `lower`
pub fn filing_content_score(lower: &str, doc_type: &str) -> f32 {
    let expected = expected_sections(doc_type);
    let found = expected.iter().filter(|s| lower.contains(**s)).count();
    (found as f32 / expected.len() as f32).min(1.0)
}

/// Weighted financial-term density, normalized to [0, 1]
pub fn financial_content_score(lower: &str) -> f32 {
    let weighted: usize = FINANCIAL_TERMS
        .iter()
        .filter(|t| lower.contains(**t))
        .map(|t| if KEY_FINANCIAL_TERMS.contains(t) { 2 } else { 1 })
        .sum();
    let max_score = FINANCIAL_TERMS.len() as f32 * 1.5;
    (weighted as f32 / max_score).min(1.0)
}
