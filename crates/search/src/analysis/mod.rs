//! Revenue and R&D analysis over retrieved passages
//!
//! Rule-based extraction of the figures and narratives filings use to talk
//! about revenue and research spending:
//! - Revenue metrics: totals, growth rates, segment revenue
//! - Revenue drivers: products, services, geographies, customer groups
//! - R&D metrics: expense, intensity, growth
//! - Innovation strategies: technology focus, acquisitions, partnerships,
//!   internal development
//!
//! [`FilingAnalyzer::analyze`] folds all four into an [`AnalysisReport`]
//! with per-company trends, cross-company rankings and headline insights.

mod patterns;
mod report;

pub use report::{AnalysisReport, AnalysisSummary, CompanyValue, Comparison, MetricTrend, RdAnalysis, RevenueAnalysis};

use chrono::Utc;
use filingforge_common::errors::{AppError, Result};
use filingforge_common::{Chunk, ChunkMetadata, SearchResult};
use patterns::{RdKind, RevenueKind};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Characters of context kept on each side of a driver match
const DRIVER_CONTEXT: usize = 100;

/// Characters of context kept on each side of a strategy match
const STRATEGY_CONTEXT: usize = 150;

/// Longest `source_context` reported before it is cut with `...`
const CONTEXT_PREVIEW: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Billion,
    Million,
    Percent,
}

impl Unit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "billion" => Some(Unit::Billion),
            "million" => Some(Unit::Million),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Billion => "billion",
            Unit::Million => "million",
            Unit::Percent => "percent",
        }
    }

    /// Money normalized to billions; percentages pass through
    pub fn normalize(self, value: f64) -> (f64, Unit) {
        match self {
            Unit::Million => (value / 1000.0, Unit::Billion),
            other => (value, other),
        }
    }
}

/// Direction a driver's context leans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Growing,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverType {
    Product,
    Service,
    Geographic,
    Customer,
}

impl DriverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverType::Product => "product",
            DriverType::Service => "service",
            DriverType::Geographic => "geographic",
            DriverType::Customer => "customer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyType {
    TechnologyFocus,
    Acquisition,
    Partnership,
    InternalDevelopment,
}

impl StrategyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyType::TechnologyFocus => "technology_focus",
            StrategyType::Acquisition => "acquisition",
            StrategyType::Partnership => "partnership",
            StrategyType::InternalDevelopment => "internal_development",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvestmentLevel {
    High,
    Medium,
    Low,
}

/// A figure lifted from one passage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    /// Ticker of the filing
    pub company: String,
    pub filing_type: String,
    pub filing_date: String,
    /// `total_revenue`, `revenue_growth_rate`, `<segment>_revenue`,
    /// `rd_expense`, `rd_percentage` or `rd_growth`
    pub metric_type: String,
    pub value: f64,
    pub unit: Unit,
    /// The matched text
    pub context: String,
    pub source_section: String,
}

impl FinancialMetric {
    /// Value used to order money figures of mixed units
    fn in_billions(&self) -> f64 {
        self.unit.normalize(self.value).0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueDriver {
    pub company: String,
    pub driver_type: DriverType,
    pub driver_name: String,
    pub description: String,
    /// 0.0 to 1.0
    pub importance: f32,
    pub trend: Trend,
    pub source_context: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InnovationStrategy {
    pub company: String,
    pub strategy_type: StrategyType,
    pub strategy_name: String,
    pub description: String,
    pub investment_level: InvestmentLevel,
    pub focus_areas: Vec<String>,
    pub source_context: String,
}

/// Text plus the metadata of the chunk it came from
#[derive(Debug, Clone, Copy)]
pub struct Passage<'a> {
    pub content: &'a str,
    pub metadata: &'a ChunkMetadata,
}

impl<'a> From<&'a SearchResult> for Passage<'a> {
    fn from(result: &'a SearchResult) -> Self {
        Self {
            content: &result.content,
            metadata: &result.metadata,
        }
    }
}

impl<'a> From<&'a Chunk> for Passage<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        Self {
            content: &chunk.content,
            metadata: &chunk.metadata,
        }
    }
}

impl Passage<'_> {
    fn metric(&self, metric_type: String, value: f64, unit: Unit, context: &str) -> FinancialMetric {
        FinancialMetric {
            company: self.metadata.ticker.clone(),
            filing_type: self.metadata.doc_type.clone(),
            filing_date: self.metadata.issue_date.clone(),
            metric_type,
            value,
            unit,
            context: context.to_string(),
            source_section: self.metadata.section_type.clone(),
        }
    }

    fn is_narrative(&self) -> bool {
        patterns::NARRATIVE_SECTIONS.contains(&self.metadata.section_type.as_str())
    }
}

pub struct FilingAnalyzer {
    revenue: Vec<(RevenueKind, Regex)>,
    rd: Vec<(RdKind, Regex)>,
    drivers: Vec<(DriverType, Regex)>,
    strategies: Vec<(StrategyType, Regex)>,
    trends: Vec<(Trend, Vec<Regex>)>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", pattern)).map_err(|e| AppError::Internal {
        message: format!("invalid pattern {}: {}", pattern, e),
    })
}

fn group<'t>(caps: &regex_lite::Captures<'t>, index: usize) -> Option<&'t str> {
    caps.get(index).map(|m| m.as_str())
}

/// Capture group `index` as a number, thousands separators dropped
fn number(caps: &regex_lite::Captures<'_>, index: usize) -> Option<f64> {
    group(caps, index)?.replace(',', "").parse().ok()
}

fn unit_of(caps: &regex_lite::Captures<'_>, index: usize) -> Option<Unit> {
    group(caps, index).and_then(Unit::parse)
}

fn is_generic(name: &str) -> bool {
    name.chars().count() < 3 || patterns::GENERIC_NAMES.contains(&name.to_lowercase().as_str())
}

/// `text[start..end]` widened by up to `radius` characters on each side
fn widen(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let to = text[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    &text[from..to]
}

fn preview(context: &str) -> String {
    match context.char_indices().nth(CONTEXT_PREVIEW) {
        Some((cut, _)) => format!("{}...", &context[..cut]),
        None => context.to_string(),
    }
}

fn count_present(haystack: &str, needles: &[&str]) -> usize {
    needles.iter().filter(|needle| haystack.contains(**needle)).count()
}

impl FilingAnalyzer {
    pub fn new() -> Result<Self> {
        let revenue = patterns::revenue_patterns()
            .into_iter()
            .map(|(kind, pattern)| Ok((kind, compile(&pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        let rd = patterns::rd_patterns()
            .into_iter()
            .map(|(kind, pattern)| Ok((kind, compile(&pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        let drivers = patterns::DRIVER_PATTERNS
            .iter()
            .map(|(kind, pattern)| Ok((*kind, compile(pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        let strategies = patterns::STRATEGY_PATTERNS
            .iter()
            .map(|(kind, pattern)| Ok((*kind, compile(pattern)?)))
            .collect::<Result<Vec<_>>>()?;
        let trends = patterns::TREND_PATTERNS
            .iter()
            .map(|(trend, group)| Ok((*trend, group.iter().map(|p| compile(p)).collect::<Result<Vec<_>>>()?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            revenue,
            rd,
            drivers,
            strategies,
            trends,
        })
    }

    /// Run every extractor and fold the results into one report
    pub fn analyze(&self, passages: &[Passage<'_>]) -> AnalysisReport {
        let revenue_metrics = self.revenue_metrics(passages);
        let drivers = self.revenue_drivers(passages);
        let rd_metrics = self.rd_metrics(passages);
        let strategies = self.innovation_strategies(passages);

        report::assemble(revenue_metrics, drivers, rd_metrics, strategies, Utc::now())
    }

    /// Totals, growth rates and segment revenue, in pattern order per passage
    pub fn revenue_metrics(&self, passages: &[Passage<'_>]) -> Vec<FinancialMetric> {
        let mut metrics = Vec::new();
        for passage in passages {
            for (kind, regex) in &self.revenue {
                for caps in regex.captures_iter(passage.content) {
                    let Some(context) = group(&caps, 0) else { continue };
                    let metric = match kind {
                        RevenueKind::Total => {
                            let (Some(value), Some(unit)) = (number(&caps, 1), unit_of(&caps, 2)) else {
                                continue;
                            };
                            passage.metric("total_revenue".into(), value, unit, context)
                        }
                        RevenueKind::Growth => {
                            let Some(value) = number(&caps, 1) else { continue };
                            passage.metric("revenue_growth_rate".into(), value, Unit::Percent, context)
                        }
                        RevenueKind::Segment => {
                            let (Some(segment), Some(value), Some(unit)) =
                                (group(&caps, 1), number(&caps, 2), unit_of(&caps, 3))
                            else {
                                continue;
                            };
                            let segment = segment.trim().to_lowercase();
                            passage.metric(format!("{}_revenue", segment), value, unit, context)
                        }
                    };
                    metrics.push(metric);
                }
            }
        }
        metrics
    }

    /// R&D expense, intensity and growth
    pub fn rd_metrics(&self, passages: &[Passage<'_>]) -> Vec<FinancialMetric> {
        let mut metrics = Vec::new();
        for passage in passages {
            for (kind, regex) in &self.rd {
                for caps in regex.captures_iter(passage.content) {
                    let (Some(context), Some(value)) = (group(&caps, 0), number(&caps, 1)) else { continue };
                    let unit = match kind {
                        RdKind::Expense => match unit_of(&caps, 2) {
                            Some(unit) => unit,
                            None => continue,
                        },
                        RdKind::Percentage | RdKind::Growth => Unit::Percent,
                    };
                    metrics.push(passage.metric(kind.metric_type().into(), value, unit, context));
                }
            }
        }
        metrics
    }

    /// Named revenue drivers from narrative sections
    pub fn revenue_drivers(&self, passages: &[Passage<'_>]) -> Vec<RevenueDriver> {
        let mut drivers = Vec::new();
        for passage in passages.iter().filter(|p| p.is_narrative()) {
            for (driver_type, regex) in &self.drivers {
                for caps in regex.captures_iter(passage.content) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
                    let name = name.as_str().trim();
                    if is_generic(name) {
                        continue;
                    }

                    let context = widen(passage.content, whole.start(), whole.end(), DRIVER_CONTEXT);
                    drivers.push(RevenueDriver {
                        company: passage.metadata.ticker.clone(),
                        driver_type: *driver_type,
                        driver_name: name.to_string(),
                        description: whole.as_str().to_string(),
                        importance: importance(context, name),
                        trend: self.trend(context),
                        source_context: preview(context),
                    });
                }
            }
        }
        drivers
    }

    /// Acquisitions, partnerships and technology bets from narrative sections
    pub fn innovation_strategies(&self, passages: &[Passage<'_>]) -> Vec<InnovationStrategy> {
        let mut strategies = Vec::new();
        for passage in passages.iter().filter(|p| p.is_narrative()) {
            for (strategy_type, regex) in &self.strategies {
                for caps in regex.captures_iter(passage.content) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else { continue };
                    let name = name.as_str().trim();
                    if is_generic(name) {
                        continue;
                    }

                    let context = widen(passage.content, whole.start(), whole.end(), STRATEGY_CONTEXT);
                    strategies.push(InnovationStrategy {
                        company: passage.metadata.ticker.clone(),
                        strategy_type: *strategy_type,
                        strategy_name: name.to_string(),
                        description: whole.as_str().to_string(),
                        investment_level: investment_level(context),
                        focus_areas: focus_areas(context, name),
                        source_context: preview(context),
                    });
                }
            }
        }
        strategies
    }

    /// Tone with the most indicator hits; ties go to growing, then declining
    fn trend(&self, context: &str) -> Trend {
        let context = context.to_lowercase();
        let mut best = (Trend::Stable, 0);
        for (trend, group) in &self.trends {
            let hits: usize = group.iter().map(|re| re.find_iter(&context).count()).sum();
            if hits > best.1 {
                best = (*trend, hits);
            }
        }
        best.0
    }
}

fn importance(context: &str, name: &str) -> f32 {
    let context = context.to_lowercase();
    let mentions = context.matches(name.to_lowercase().as_str()).count();

    let score = 0.5
        + 0.1 * count_present(&context, patterns::IMPORTANCE_INDICATORS) as f32
        + (0.05 * mentions as f32).min(0.2)
        + 0.05 * count_present(&context, patterns::FINANCIAL_TERMS) as f32;
    score.min(1.0)
}

fn investment_level(context: &str) -> InvestmentLevel {
    let context = context.to_lowercase();
    let high = count_present(&context, patterns::HIGH_INVESTMENT);
    let medium = count_present(&context, patterns::MEDIUM_INVESTMENT);
    let low = count_present(&context, patterns::LOW_INVESTMENT);

    if high > medium && high > low {
        InvestmentLevel::High
    } else if medium > low {
        InvestmentLevel::Medium
    } else {
        InvestmentLevel::Low
    }
}

/// Technology areas named in the context, plus the strategy itself when its
/// name is technology flavoured
fn focus_areas(context: &str, name: &str) -> Vec<String> {
    let context = context.to_lowercase();
    let mut areas: Vec<String> = patterns::TECH_AREAS
        .iter()
        .filter(|area| context.contains(**area))
        .map(|area| area.to_string())
        .collect();

    let name = name.to_lowercase();
    if patterns::TECH_NAME_HINTS.iter().any(|hint| name.contains(hint)) && !areas.contains(&name) {
        areas.push(name);
    }
    areas
}
