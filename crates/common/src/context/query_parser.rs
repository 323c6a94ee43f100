//! Query Parser - extracts financial entities from a natural-language query
//!
//! Provides:
//! - Company detection (tickers, informal names, full names)
//! - Time references (years, quarters, relative terms)
//! - Filing types and financial concepts
//! - Comparison intent and a coarse complexity grade

use crate::errors::{AppError, Result};
use crate::models::company::{COMPANIES, NAME_VARIANTS};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

const RELATIVE_TERMS: &[&str] = &[
    "recent",
    "latest",
    "current",
    "last year",
    "this year",
    "over time",
    "historical",
    "trend",
    "evolution",
];

const COMPARISON_KEYWORDS: &[&str] = &[
    "compare",
    "comparison",
    "versus",
    "vs",
    "against",
    "difference",
    "similar",
    "contrast",
    "between",
];

/// Pattern → filing types it implies
const FILING_PATTERNS: &[(&str, &[&str])] = &[
    (r"\b10-k\b", &["10-K"]),
    (r"\bannual report\b", &["10-K"]),
    (r"\b10-q\b", &["10-Q"]),
    (r"\bquarterly report\b", &["10-Q"]),
    (r"\b8-k\b", &["8-K"]),
    (r"\bcurrent report\b", &["8-K"]),
    (r"\bproxy\b", &["DEF 14A"]),
    (r"\bdef 14a\b", &["DEF 14A"]),
    (r"\binsider trading\b", &["3", "4", "5"]),
    (r"\bform [345]\b", &["3", "4", "5"]),
];

const FINANCIAL_CONCEPTS: &[(&str, &[&str])] = &[
    ("revenue", &["revenue", "sales", "income", "earnings"]),
    ("expenses", &["expenses", "costs", "spending"]),
    ("profit", &["profit", "net income", "earnings"]),
    ("cash_flow", &["cash flow", "operating cash", "free cash flow"]),
    ("debt", &["debt", "liabilities", "borrowing"]),
    ("assets", &["assets", "balance sheet"]),
    ("risk_factors", &["risk", "risks", "risk factors"]),
    ("competition", &["competition", "competitive", "competitors"]),
    ("r&d", &["r&d", "research", "development", "innovation"]),
    ("acquisitions", &["acquisition", "merger", "m&a"]),
    ("executive_compensation", &["compensation", "executive pay", "salary"]),
    ("working_capital", &["working capital", "current assets"]),
    ("climate", &["climate", "environmental", "sustainability"]),
    ("ai_automation", &["ai", "artificial intelligence", "automation", "technology"]),
];

/// Years, quarters and relative phrases found in a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeReferences {
    /// Distinct four-digit years, ascending
    pub years: Vec<String>,
    pub quarters: Vec<String>,
    pub relative_terms: Vec<String>,
}

impl TimeReferences {
    /// Whether the query anchors itself in time
    pub fn is_present(&self) -> bool {
        !self.years.is_empty() || !self.relative_terms.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonKind {
    /// "trend", "over time"
    Temporal,
    /// More than one company named
    CrossCompany,
    General,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonIntent {
    pub is_comparison: bool,
    pub kind: Option<ComparisonKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Everything the router needs to know about a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEntities {
    /// Tickers in order of first mention
    pub tickers: Vec<String>,
    pub time: TimeReferences,
    pub doc_types: Vec<String>,
    pub concepts: Vec<String>,
    pub comparison: ComparisonIntent,
}

impl QueryEntities {
    /// Weighted entity count, graded simple / moderate / complex
    pub fn complexity(&self) -> Complexity {
        let mut score = self.tickers.len() * 2;
        score += self.time.years.len();
        score += self.doc_types.len();
        if self.comparison.is_comparison {
            score += 3;
        }
        score += self.concepts.len();

        match score {
            0..=3 => Complexity::Simple,
            4..=7 => Complexity::Moderate,
            _ => Complexity::Complex,
        }
    }
}

/// Rule-based entity extractor
pub struct QueryParser {
    word: Regex,
    year: Regex,
    quarters: Vec<Regex>,
    /// (pattern, ticker) for informal and full company names
    names: Vec<(Regex, &'static str)>,
    filings: Vec<(Regex, &'static [&'static str])>,
    concepts: Vec<(Regex, &'static str)>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| AppError::Internal {
        message: format!("invalid pattern {}: {}", pattern, e),
    })
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `\b` only on sides that end in a word character, so "apple inc." still
/// matches before a space or at the end of the query
fn word_pattern(word: &str) -> String {
    let lead = if word.starts_with(is_word_char) { r"\b" } else { "" };
    let trail = if word.ends_with(is_word_char) { r"\b" } else { "" };
    format!("{}{}{}", lead, regex_lite::escape(word), trail)
}

fn word_alternation(words: &[&str]) -> String {
    let alternatives: Vec<String> = words.iter().map(|w| word_pattern(w)).collect();
    format!("(?:{})", alternatives.join("|"))
}

impl QueryParser {
    pub fn new() -> Result<Self> {
        let quarters = [
            r"(?i)\bq[1-4]\b",
            r"(?i)\b[1-4]q\b",
            r"(?i)\bfirst quarter\b",
            r"(?i)\bsecond quarter\b",
            r"(?i)\bthird quarter\b",
            r"(?i)\bfourth quarter\b",
        ]
        .into_iter()
        .map(compile)
        .collect::<Result<Vec<_>>>()?;

        let mut names = Vec::new();
        for (variant, ticker) in NAME_VARIANTS {
            names.push((compile(&word_alternation(&[*variant]))?, *ticker));
        }
        for company in COMPANIES {
            let full = company.name.to_lowercase();
            names.push((compile(&word_alternation(&[full.as_str()]))?, company.ticker));
        }

        let filings = FILING_PATTERNS
            .iter()
            .map(|(pattern, types)| Ok((compile(pattern)?, *types)))
            .collect::<Result<Vec<_>>>()?;

        let concepts = FINANCIAL_CONCEPTS
            .iter()
            .map(|(concept, keywords)| Ok((compile(&word_alternation(keywords))?, *concept)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            word: compile(r"[A-Za-z0-9]+")?,
            year: compile(r"\b(20[2-4][0-9])\b")?,
            quarters,
            names,
            filings,
            concepts,
        })
    }

    /// Extract all entities in one pass
    pub fn extract(&self, query: &str) -> QueryEntities {
        let lower = query.to_lowercase();
        let tickers = self.extract_tickers(query, &lower);
        let comparison = self.comparison_intent(&lower, tickers.len());

        QueryEntities {
            time: self.extract_time(query, &lower),
            doc_types: self.extract_doc_types(&lower),
            concepts: self.extract_concepts(&lower),
            comparison,
            tickers,
        }
    }

    /// Short tickers must appear in upper case ("GE", "BA", "CAT") so common
    /// words do not turn into companies; longer ones match case-insensitively.
    fn extract_tickers(&self, query: &str, lower: &str) -> Vec<String> {
        let mut found: Vec<(usize, &'static str)> = Vec::new();

        for word in self.word.find_iter(query) {
            let hit = COMPANIES.iter().find(|c| {
                if c.ticker.len() >= 4 {
                    c.ticker.eq_ignore_ascii_case(word.as_str())
                } else {
                    c.ticker == word.as_str()
                }
            });
            if let Some(company) = hit {
                found.push((word.start(), company.ticker));
            }
        }

        for (pattern, ticker) in &self.names {
            if let Some(m) = pattern.find(lower) {
                found.push((m.start(), *ticker));
            }
        }

        found.sort_by_key(|(position, _)| *position);
        let mut tickers: Vec<String> = Vec::new();
        for (_, ticker) in found {
            if !tickers.iter().any(|t| t == ticker) {
                tickers.push(ticker.to_string());
            }
        }
        tickers
    }

    fn extract_time(&self, query: &str, lower: &str) -> TimeReferences {
        let mut years: Vec<String> = self
            .year
            .captures_iter(query)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        years.sort();
        years.dedup();

        let quarters = self
            .quarters
            .iter()
            .flat_map(|pattern| pattern.find_iter(query).map(|m| m.as_str().to_string()))
            .collect();

        let relative_terms = RELATIVE_TERMS
            .iter()
            .filter(|term| lower.contains(**term))
            .map(|term| term.to_string())
            .collect();

        TimeReferences {
            years,
            quarters,
            relative_terms,
        }
    }

    fn extract_doc_types(&self, lower: &str) -> Vec<String> {
        let mut doc_types: Vec<String> = Vec::new();
        for (pattern, types) in &self.filings {
            if pattern.is_match(lower) {
                for doc_type in types.iter() {
                    if !doc_types.iter().any(|d| d == doc_type) {
                        doc_types.push(doc_type.to_string());
                    }
                }
            }
        }
        doc_types
    }

    fn extract_concepts(&self, lower: &str) -> Vec<String> {
        self.concepts
            .iter()
            .filter(|(pattern, _)| pattern.is_match(lower))
            .map(|(_, concept)| concept.to_string())
            .collect()
    }

    fn comparison_intent(&self, lower: &str, ticker_count: usize) -> ComparisonIntent {
        let is_comparison = lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| COMPARISON_KEYWORDS.contains(&word));

        if !is_comparison {
            return ComparisonIntent::default();
        }

        let kind = if lower.contains("trend") || lower.contains("over time") {
            ComparisonKind::Temporal
        } else if ticker_count > 1 {
            ComparisonKind::CrossCompany
        } else {
            ComparisonKind::General
        };

        ComparisonIntent {
            is_comparison,
            kind: Some(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> QueryParser {
        QueryParser::new().unwrap()
    }

    #[test]
    fn test_single_company_with_year() {
        let entities = parser().extract("Apple revenue 2023");
        assert_eq!(entities.tickers, vec!["AAPL"]);
        assert_eq!(entities.time.years, vec!["2023"]);
        assert!(entities.concepts.contains(&"revenue".to_string()));
        assert!(!entities.comparison.is_comparison);
    }

    #[test]
    fn test_tickers_in_mention_order() {
        let entities = parser().extract("Compare MSFT and Apple on cloud spending");
        assert_eq!(entities.tickers, vec!["MSFT", "AAPL"]);
        assert_eq!(entities.comparison.kind, Some(ComparisonKind::CrossCompany));
    }

    #[test]
    fn test_short_tickers_need_upper_case() {
        let entities = parser().extract("the cat sat on the ba");
        assert!(entities.tickers.is_empty());

        let entities = parser().extract("GE and BA backlog");
        assert_eq!(entities.tickers, vec!["GE", "BA"]);
    }

    #[test]
    fn test_full_company_name() {
        let entities = parser().extract("What did The Boeing Company say about supply chains?");
        assert_eq!(entities.tickers, vec!["BA"]);
    }

    #[test]
    fn test_names_ending_in_punctuation() {
        let pattern = compile(&word_alternation(&["apple inc."])).unwrap();
        assert!(pattern.is_match("apple inc. reported"));
        assert!(pattern.is_match("revenue at apple inc."));
        assert!(!pattern.is_match("pineapple inc. reported"));

        let entities = parser().extract("How did JPMorgan Chase & Co. fare in 2023?");
        assert_eq!(entities.tickers, vec!["JPM"]);
    }

    #[test]
    fn test_doc_types_and_quarters() {
        let entities = parser().extract("Tesla quarterly report Q3 and proxy statement");
        assert_eq!(entities.doc_types, vec!["10-Q", "DEF 14A"]);
        assert_eq!(entities.time.quarters, vec!["Q3"]);
    }

    #[test]
    fn test_insider_trading_forms() {
        let entities = parser().extract("insider trading by executives");
        assert_eq!(entities.doc_types, vec!["3", "4", "5"]);
    }

    #[test]
    fn test_temporal_comparison() {
        let entities = parser().extract("compare the trend in Microsoft margins over time");
        assert_eq!(entities.comparison.kind, Some(ComparisonKind::Temporal));
        assert_eq!(entities.time.relative_terms, vec!["over time", "trend"]);
    }

    #[test]
    fn test_concepts_match_whole_words() {
        // "said" must not trigger the "ai" concept
        let entities = parser().extract("management said costs rose");
        assert_eq!(entities.concepts, vec!["expenses"]);
    }

    #[test]
    fn test_complexity() {
        let p = parser();
        assert_eq!(p.extract("dividends").complexity(), Complexity::Simple);
        assert_eq!(p.extract("Apple revenue 2023").complexity(), Complexity::Moderate);
        assert_eq!(
            p.extract("compare Apple and Microsoft revenue and debt in 2022 and 2023 10-K").complexity(),
            Complexity::Complex
        );
    }
}
