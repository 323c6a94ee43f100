//! Trends, cross-company comparison and headline insights

use super::{FinancialMetric, InnovationStrategy, InvestmentLevel, RevenueDriver, Trend, Unit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Drivers scoring above this count as high importance
const HIGH_IMPORTANCE: f32 = 0.7;

/// Companies listed in a single insight line
const INSIGHT_COMPANIES: usize = 3;

/// Change of one metric between a company's earliest and latest filing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricTrend {
    /// Percent change from the first to the last data point
    pub growth_rate: f64,
    pub trend_direction: Trend,
    pub data_points: usize,
    pub latest_value: f64,
    pub latest_unit: Unit,
    /// `<first date> to <last date>`
    pub time_period: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyValue {
    pub company: String,
    /// Money in billions; percentages unchanged
    pub value: f64,
    pub unit: Unit,
    pub original_value: f64,
    pub original_unit: Unit,
    pub filing_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub companies: Vec<String>,
    /// Metric type → latest value per company, largest first
    pub metrics_comparison: BTreeMap<String, Vec<CompanyValue>>,
    pub rankings: BTreeMap<String, Vec<String>>,
    pub insights: Vec<String>,
}

/// Company → metric type → trend
pub type Trends = BTreeMap<String, BTreeMap<String, MetricTrend>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueAnalysis {
    pub metrics: Vec<FinancialMetric>,
    pub drivers: Vec<RevenueDriver>,
    pub trends: Trends,
    pub comparison: Comparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdAnalysis {
    pub metrics: Vec<FinancialMetric>,
    pub strategies: Vec<InnovationStrategy>,
    pub trends: Trends,
    pub comparison: Comparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_companies_analyzed: usize,
    pub total_revenue_metrics: usize,
    pub total_revenue_drivers: usize,
    pub total_rd_metrics: usize,
    pub total_innovation_strategies: usize,
    pub analysis_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: AnalysisSummary,
    /// Companies with at least one revenue or R&D metric, sorted
    pub companies: Vec<String>,
    pub revenue_analysis: RevenueAnalysis,
    pub rd_analysis: RdAnalysis,
    pub key_insights: Vec<String>,
}

pub(super) fn assemble(
    revenue_metrics: Vec<FinancialMetric>,
    drivers: Vec<RevenueDriver>,
    rd_metrics: Vec<FinancialMetric>,
    strategies: Vec<InnovationStrategy>,
    now: DateTime<Utc>,
) -> AnalysisReport {
    let companies: Vec<String> = revenue_metrics
        .iter()
        .chain(&rd_metrics)
        .map(|m| m.company.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let revenue_trends = trends(&revenue_metrics);
    let rd_trends = trends(&rd_metrics);

    let mut revenue_comparison = compare(&revenue_metrics, &companies);
    revenue_comparison.insights = revenue_comparison_insights(&revenue_comparison);
    let mut rd_comparison = compare(&rd_metrics, &companies);
    rd_comparison.insights = rd_comparison_insights(&rd_comparison);

    let key_insights = key_insights(&revenue_metrics, &drivers, &revenue_trends, &rd_metrics, &strategies);

    AnalysisReport {
        summary: AnalysisSummary {
            total_companies_analyzed: companies.len(),
            total_revenue_metrics: revenue_metrics.len(),
            total_revenue_drivers: drivers.len(),
            total_rd_metrics: rd_metrics.len(),
            total_innovation_strategies: strategies.len(),
            analysis_timestamp: now,
        },
        companies,
        revenue_analysis: RevenueAnalysis {
            metrics: revenue_metrics,
            drivers,
            trends: revenue_trends,
            comparison: revenue_comparison,
        },
        rd_analysis: RdAnalysis {
            metrics: rd_metrics,
            strategies,
            trends: rd_trends,
            comparison: rd_comparison,
        },
        key_insights,
    }
}

/// Per company and metric type, the change between the earliest and latest
/// filing. Needs two data points and a positive first value.
pub(super) fn trends(metrics: &[FinancialMetric]) -> Trends {
    let mut grouped: BTreeMap<&str, BTreeMap<&str, Vec<&FinancialMetric>>> = BTreeMap::new();
    for metric in metrics {
        grouped
            .entry(metric.company.as_str())
            .or_default()
            .entry(metric.metric_type.as_str())
            .or_default()
            .push(metric);
    }

    grouped
        .into_iter()
        .map(|(company, by_type)| {
            let company_trends = by_type
                .into_iter()
                .filter_map(|(metric_type, mut series)| {
                    series.sort_by(|a, b| a.filing_date.cmp(&b.filing_date));
                    let (first, last) = (series.first()?, series.last()?);
                    if series.len() < 2 || first.value <= 0.0 {
                        return None;
                    }

                    let growth_rate = (last.value - first.value) / first.value * 100.0;
                    Some((
                        metric_type.to_string(),
                        MetricTrend {
                            growth_rate,
                            trend_direction: if growth_rate > 0.0 { Trend::Growing } else { Trend::Declining },
                            data_points: series.len(),
                            latest_value: last.value,
                            latest_unit: last.unit,
                            time_period: format!("{} to {}", first.filing_date, last.filing_date),
                        },
                    ))
                })
                .collect();
            (company.to_string(), company_trends)
        })
        .collect()
}

/// Rank the latest value of each metric type across companies. Metric types
/// reported by fewer than two companies are left out.
pub(super) fn compare(metrics: &[FinancialMetric], companies: &[String]) -> Comparison {
    let mut latest: BTreeMap<&str, BTreeMap<&str, &FinancialMetric>> = BTreeMap::new();
    for metric in metrics.iter().filter(|m| companies.contains(&m.company)) {
        let per_company = latest.entry(metric.metric_type.as_str()).or_default();
        let newer = per_company
            .get(metric.company.as_str())
            .map_or(true, |current| metric.filing_date > current.filing_date);
        if newer {
            per_company.insert(metric.company.as_str(), metric);
        }
    }

    let mut comparison = Comparison {
        companies: companies.to_vec(),
        ..Default::default()
    };
    for (metric_type, per_company) in latest {
        if per_company.len() < 2 {
            continue;
        }

        let mut values: Vec<CompanyValue> = per_company
            .into_iter()
            .map(|(company, metric)| {
                let (value, unit) = metric.unit.normalize(metric.value);
                CompanyValue {
                    company: company.to_string(),
                    value,
                    unit,
                    original_value: metric.value,
                    original_unit: metric.unit,
                    filing_date: metric.filing_date.clone(),
                }
            })
            .collect();
        values.sort_by(|a, b| b.value.total_cmp(&a.value));

        comparison
            .rankings
            .insert(metric_type.to_string(), values.iter().map(|v| v.company.clone()).collect());
        comparison.metrics_comparison.insert(metric_type.to_string(), values);
    }
    comparison
}

fn leader<'a>(comparison: &'a Comparison, metric_type: &str) -> Option<&'a str> {
    comparison
        .rankings
        .get(metric_type)
        .and_then(|ranking| ranking.first())
        .map(String::as_str)
}

fn revenue_comparison_insights(comparison: &Comparison) -> Vec<String> {
    let mut insights = Vec::new();
    if let Some(company) = leader(comparison, "total_revenue") {
        insights.push(format!("{} leads in total revenue among compared companies", company));
    }
    if let Some(company) = leader(comparison, "revenue_growth_rate") {
        insights.push(format!("{} shows the highest revenue growth rate", company));
    }

    let segments: Vec<&str> = comparison
        .metrics_comparison
        .keys()
        .map(String::as_str)
        .filter(|k| k.contains("revenue") && *k != "total_revenue" && *k != "revenue_growth_rate")
        .take(3)
        .collect();
    if !segments.is_empty() {
        insights.push(format!("Key revenue segments identified: {}", segments.join(", ")));
    }
    insights
}

fn rd_comparison_insights(comparison: &Comparison) -> Vec<String> {
    let mut insights = Vec::new();
    if let Some(company) = leader(comparison, "rd_expense") {
        insights.push(format!("{} leads in R&D spending among compared companies", company));
    }
    if let Some(company) = leader(comparison, "rd_percentage") {
        insights.push(format!("{} has the highest R&D intensity (% of revenue)", company));
    }
    if let Some(company) = leader(comparison, "rd_growth") {
        insights.push(format!("{} shows the highest R&D spending growth rate", company));
    }
    insights
}

/// Largest money figure of `metric_type`; the earliest wins a tie
fn largest<'a>(metrics: &'a [FinancialMetric], metric_type: &str) -> Option<&'a FinancialMetric> {
    metrics
        .iter()
        .filter(|m| m.metric_type == metric_type)
        .reduce(|best, m| if m.in_billions() > best.in_billions() { m } else { best })
}

/// Most frequent key; the smallest key wins a tie
fn most_common<K: Ord + Copy>(keys: impl Iterator<Item = K>) -> Option<K> {
    let mut counts: BTreeMap<K, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .reduce(|best, entry| if entry.1 > best.1 { entry } else { best })
        .map(|(key, _)| key)
}

fn key_insights(
    revenue_metrics: &[FinancialMetric],
    drivers: &[RevenueDriver],
    revenue_trends: &Trends,
    rd_metrics: &[FinancialMetric],
    strategies: &[InnovationStrategy],
) -> Vec<String> {
    let mut insights = Vec::new();

    if let Some(max) = largest(revenue_metrics, "total_revenue") {
        insights.push(format!(
            "Largest revenue reported: ${} {} by {}",
            max.value,
            max.unit.as_str(),
            max.company
        ));
    }
    if let Some(max) = largest(rd_metrics, "rd_expense") {
        insights.push(format!(
            "Highest R&D spending: ${} {} by {}",
            max.value,
            max.unit.as_str(),
            max.company
        ));
    }

    if let Some(driver_type) = most_common(drivers.iter().map(|d| d.driver_type)) {
        insights.push(format!("Most common revenue driver type: {}", driver_type.as_str()));
        let high = drivers.iter().filter(|d| d.importance > HIGH_IMPORTANCE).count();
        if high > 0 {
            insights.push(format!("High-importance revenue drivers identified: {}", high));
        }
    }

    if let Some(strategy_type) = most_common(strategies.iter().map(|s| s.strategy_type)) {
        insights.push(format!("Most common innovation strategy: {}", strategy_type.as_str()));
        let high = strategies
            .iter()
            .filter(|s| s.investment_level == InvestmentLevel::High)
            .count();
        if high > 0 {
            insights.push(format!("High-investment innovation strategies identified: {}", high));
        }
    }

    let growing: Vec<&str> = revenue_trends
        .iter()
        .filter(|(_, by_type)| by_type.values().any(|t| t.trend_direction == Trend::Growing))
        .map(|(company, _)| company.as_str())
        .take(INSIGHT_COMPANIES)
        .collect();
    if !growing.is_empty() {
        insights.push(format!("Companies showing revenue growth: {}", growing.join(", ")));
    }

    let revenue_companies: BTreeSet<&str> = revenue_metrics.iter().map(|m| m.company.as_str()).collect();
    let rd_companies: BTreeSet<&str> = rd_metrics.iter().map(|m| m.company.as_str()).collect();
    let both: Vec<&str> = revenue_companies
        .intersection(&rd_companies)
        .copied()
        .take(INSIGHT_COMPANIES)
        .collect();
    if !both.is_empty() {
        insights.push(format!("Companies with both revenue and R&D data: {}", both.join(", ")));
    }

    insights
}
