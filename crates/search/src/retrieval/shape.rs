//! Query shapes and their processing strategies

use filingforge_common::context::{ComparisonKind, QueryEntities};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    SingleEntity,
    MultiEntity,
    Temporal,
    Thematic,
    Generic,
}

impl QueryShape {
    /// Pure function of the entities, first matching rule wins:
    /// comparison or several tickers, then one ticker anchored in time,
    /// then one ticker, then concepts only.
    pub fn classify(entities: &QueryEntities) -> Self {
        let tickers = entities.tickers.len();

        if tickers > 1 || entities.comparison.is_comparison {
            if entities.comparison.kind == Some(ComparisonKind::Temporal) {
                QueryShape::Temporal
            } else {
                QueryShape::MultiEntity
            }
        } else if tickers == 1 && entities.time.is_present() {
            QueryShape::Temporal
        } else if tickers == 1 {
            QueryShape::SingleEntity
        } else if !entities.concepts.is_empty() {
            QueryShape::Thematic
        } else {
            QueryShape::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryShape::SingleEntity => "single_entity",
            QueryShape::MultiEntity => "multi_entity",
            QueryShape::Temporal => "temporal",
            QueryShape::Thematic => "thematic",
            QueryShape::Generic => "generic",
        }
    }

    /// How downstream synthesis should treat the retrieved context
    pub fn strategy(&self) -> ProcessingStrategy {
        let (approach, synthesis_method, context_window) = match self {
            QueryShape::SingleEntity => ("focused_analysis", "single_source", "company_specific"),
            QueryShape::MultiEntity => ("comparative_analysis", "cross_company", "multi_entity"),
            QueryShape::Temporal => ("time_series_analysis", "temporal_synthesis", "chronological"),
            QueryShape::Thematic => ("thematic_analysis", "concept_aggregation", "industry_wide"),
            QueryShape::Generic => ("broad_search", "relevance_ranking", "general"),
        };
        ProcessingStrategy {
            approach,
            synthesis_method,
            context_window,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessingStrategy {
    pub approach: &'static str,
    pub synthesis_method: &'static str,
    pub context_window: &'static str,
}
