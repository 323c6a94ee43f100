//! Retrieval engine: entity extraction, shape routing, policy execution

use super::dates::YearRange;
use super::shape::{ProcessingStrategy, QueryShape};
use filingforge_common::config::{PolicyConfig, RetrievalConfig};
use filingforge_common::context::{Complexity, QueryEntities, QueryParser};
use filingforge_common::store::FilterValue;
use filingforge_common::{metrics, Result, SearchRequest, SearchResult, Store};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

/// A routed query with everything that shaped its results
#[derive(Debug, Clone, Serialize)]
pub struct RoutedQuery {
    pub query: String,
    pub shape: QueryShape,
    pub complexity: Complexity,
    pub strategy: ProcessingStrategy,
    pub entities: QueryEntities,
    pub results: Vec<SearchResult>,
}

pub struct RetrievalEngine {
    store: Arc<Store>,
    parser: QueryParser,
    policies: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(store: Arc<Store>, policies: RetrievalConfig) -> Result<Self> {
        Ok(Self {
            store,
            parser: QueryParser::new()?,
            policies,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Extract entities, pick a shape and run its policy
    #[instrument(skip(self))]
    pub async fn route_query(&self, query: &str) -> Result<RoutedQuery> {
        let entities = self.parser.extract(query);
        let shape = QueryShape::classify(&entities);
        let results = self.retrieve(shape, query, &entities).await?;

        Ok(RoutedQuery {
            query: query.to_string(),
            shape,
            complexity: entities.complexity(),
            strategy: shape.strategy(),
            entities,
            results,
        })
    }

    /// Run the policy for the shape implied by `entities`
    pub async fn route_and_retrieve(&self, query: &str, entities: &QueryEntities) -> Result<Vec<SearchResult>> {
        self.retrieve(QueryShape::classify(entities), query, entities).await
    }

    async fn retrieve(&self, shape: QueryShape, query: &str, entities: &QueryEntities) -> Result<Vec<SearchResult>> {
        let start = Instant::now();

        let results = match shape {
            QueryShape::SingleEntity => self.single_entity(query, entities).await?,
            QueryShape::MultiEntity => self.multi_entity(query, entities).await?,
            QueryShape::Temporal => self.temporal(query, entities).await?,
            QueryShape::Thematic => self.boosted(query, &self.policies.thematic).await?,
            QueryShape::Generic => self.boosted(query, &self.policies.generic).await?,
        };

        metrics::record_search(start.elapsed().as_secs_f64(), shape.as_str(), results.len());
        debug!(
            shape = shape.as_str(),
            tickers = ?entities.tickers,
            results = results.len(),
            "Query routed"
        );
        Ok(results)
    }

    async fn single_entity(&self, query: &str, entities: &QueryEntities) -> Result<Vec<SearchResult>> {
        let policy = &self.policies.single_entity;
        let Some(ticker) = entities.tickers.first() else {
            return self.boosted(query, &self.policies.generic).await;
        };

        let request = with_doc_types(SearchRequest::new(query, policy.budget).with_filter("ticker", ticker.as_str()), entities);
        let range = entities.time.years.first().map(|y| YearRange::for_year(y));
        self.search_in_range(request, range.as_ref()).await
    }

    async fn multi_entity(&self, query: &str, entities: &QueryEntities) -> Result<Vec<SearchResult>> {
        if entities.tickers.is_empty() {
            return self.boosted(query, &self.policies.generic).await;
        }

        let policy = &self.policies.multi_entity;
        let per_entity = (policy.budget / entities.tickers.len()).max(policy.min_per_entity).max(1);

        let searches = entities.tickers.iter().map(|ticker| {
            let request =
                with_doc_types(SearchRequest::new(query, per_entity).with_filter("ticker", ticker.as_str()), entities);
            async move { self.store.search(&request).await }
        });

        let mut merged: Vec<SearchResult> = try_join_all(searches).await?.into_iter().flatten().collect();
        sort_by_score(&mut merged);
        merged.truncate(policy.budget);
        Ok(merged)
    }

    async fn temporal(&self, query: &str, entities: &QueryEntities) -> Result<Vec<SearchResult>> {
        let policy = &self.policies.temporal;
        let years = &entities.time.years;

        let base = |limit: usize| {
            let request = SearchRequest::new(query, limit);
            match entities.tickers.as_slice() {
                [] => request,
                [ticker] => request.with_filter("ticker", ticker.as_str()),
                tickers => request.with_filter("ticker", tickers.to_vec()),
            }
        };

        if years.is_empty() {
            return self.store.search(&base(policy.budget)).await;
        }

        // Every year gets a share of the budget; results stay in year order
        let per_year = (policy.budget / years.len()).max(policy.min_per_entity).max(1);
        let searches = years.iter().map(|year| {
            let range = YearRange::for_year(year);
            let request = base(per_year);
            async move { self.search_in_range(request, Some(&range)).await }
        });

        let mut results: Vec<SearchResult> = try_join_all(searches).await?.into_iter().flatten().collect();
        results.truncate(policy.budget);
        Ok(results)
    }

    async fn boosted(&self, query: &str, policy: &PolicyConfig) -> Result<Vec<SearchResult>> {
        let mut request = SearchRequest::new(query, policy.budget);
        request.keyword_boost = policy.keyword_boost;
        self.store.search(&request).await
    }

    /// Over-fetch twice the limit, then post-filter on issue date
    async fn search_in_range(&self, mut request: SearchRequest, range: Option<&YearRange>) -> Result<Vec<SearchResult>> {
        let Some(range) = range else {
            return self.store.search(&request).await;
        };

        let limit = request.limit;
        request.limit = limit.saturating_mul(2);
        let results = self.store.search(&request).await?;
        Ok(range.apply(results, limit))
    }
}

/// Restrict to the doc types named in the query, if any
fn with_doc_types(request: SearchRequest, entities: &QueryEntities) -> SearchRequest {
    match entities.doc_types.as_slice() {
        [] => request,
        types => request.with_filter("doc_type", FilterValue::from(types.to_vec())),
    }
}

/// Descending by combined score; stable so equal scores keep their order
fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
