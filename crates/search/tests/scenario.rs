//! End-to-end: chunk a filing, store it, reopen it and route queries over it

use filingforge_common::config::{AppConfig, ChunkingConfig, ValidationConfig};
use filingforge_common::store::Filters;
use filingforge_common::{create_embedding_provider, DocumentIdentifier, RawDocument, SearchRequest, Store};
use filingforge_ingestion::DocumentChunker;
use filingforge_search::retrieval::{QueryShape, RetrievalEngine};
use std::path::Path;
use std::sync::Arc;

const APPLE_10K: &str = "Apple Inc. Annual Report on Form 10-K. Part I. Item 1. Business overview: the \
    company designs smartphones, personal computers, tablets, wearables and accessories, and sells a \
    variety of related services worldwide through its retail and online stores and direct sales force. \
    Item 2. Properties. The company headquarters is located in Cupertino, California, and it owns \
    additional facilities. Apple reported total net sales revenue of $383.3 billion for fiscal 2023, \
    compared with $394.3 billion in fiscal 2022, a decrease of 3 percent. Research and development \
    expense increased to $29.9 billion as the company continued investing in new products, services \
    and technologies.";

const MSFT_10K: &str = "Microsoft Corporation Annual Report on Form 10-K. Part I. Item 1. Business \
    overview: Microsoft develops and supports software, services, devices and solutions. Intelligent \
    Cloud revenue increased as Azure and other cloud services grew. Item 2. Properties. Our corporate \
    headquarters is located in Redmond, Washington. Item 3. Legal proceedings are described in the \
    notes. Part II. Management discussion: operating income increased and gross margin percentage \
    improved driven by cloud growth. Total revenue was $211.9 billion for fiscal year 2023. Research \
    and development spending focused on artificial intelligence platforms, and our financial \
    statements present consolidated statements of income, cash flows and balance sheets for the year.";

fn config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.store.data_dir = dir.to_path_buf();
    config.embedding.provider = "fallback".into();
    config.chunking = ChunkingConfig {
        chunk_size: 30,
        chunk_overlap: 5,
        min_chunk_chars: 50,
    };
    config
}

fn chunker(config: &AppConfig) -> DocumentChunker {
    DocumentChunker::new(config.chunking.clone(), ValidationConfig::default()).unwrap()
}

fn apple() -> RawDocument {
    RawDocument::new(DocumentIdentifier::new("AAPL", "10-K", "2023-11-03"), APPLE_10K)
}

fn microsoft() -> RawDocument {
    RawDocument::new(DocumentIdentifier::new("MSFT", "10-K", "2023-07-27"), MSFT_10K)
}

async fn open_store(config: &AppConfig) -> Arc<Store> {
    let embedder = create_embedding_provider(&config.embedding).await.unwrap();
    Arc::new(Store::open(config, embedder).await.unwrap())
}

async fn populated(config: &AppConfig) -> Arc<Store> {
    let store = open_store(config).await;
    let chunker = chunker(config);
    let mut chunks = chunker.chunk(&apple());
    chunks.extend(chunker.chunk(&microsoft()));
    store.add(chunks).await.unwrap();
    store
}

#[test]
fn apple_passage_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let chunks = chunker(&config).chunk(&apple());

    assert!(chunks.len() >= 3);
    assert_eq!(chunks[0].chunk_id, "AAPL_10-K_2023-11-03_0000");
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_id, format!("AAPL_10-K_2023-11-03_{:04}", i));
        assert!(chunk.content.split_whitespace().count() <= 30);
    }

    let rnd: Vec<_> = chunks
        .iter()
        .filter(|c| c.content.to_lowercase().contains("research and development"))
        .collect();
    assert!(!rnd.is_empty());
    for chunk in rnd {
        let section = chunk.metadata.section_type.as_str();
        assert!(section == "financial" || section == "management_analysis", "got {section}");
        assert!(chunk.metadata.concepts.contains(&"innovation".to_string()));
    }
}

#[tokio::test]
async fn apple_revenue_2023_ranks_headline_chunk_first() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = populated(&config).await;
    let engine = RetrievalEngine::new(store, config.retrieval.clone()).unwrap();

    let routed = engine.route_query("Apple revenue 2023").await.unwrap();
    assert_eq!(routed.shape, QueryShape::Temporal);
    assert_eq!(routed.entities.tickers, vec!["AAPL"]);

    let top = routed.results.first().expect("at least one result");
    assert!(top.content.contains("$383.3 billion"));
    assert_eq!(top.metadata.ticker, "AAPL");
    assert_eq!(top.metadata.financial_metrics.revenue, vec!["revenue of $383.3 billion"]);
}

#[tokio::test]
async fn search_results_satisfy_filters_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = populated(&config).await;

    let request = SearchRequest::new("cloud revenue growth", 10)
        .with_filter("ticker", "MSFT")
        .with_filter("doc_type", vec!["10-K".to_string(), "10-Q".to_string()]);
    let results = store.search(&request).await.unwrap();

    assert!(!results.is_empty());
    for r in &results {
        assert_eq!(r.metadata.ticker, "MSFT");
        assert!((0.0..=1.0).contains(&r.similarity_score));
    }
    for pair in results.windows(2) {
        assert!(pair[0].similarity_score >= pair[1].similarity_score);
    }

    let mut filters = Filters::new();
    filters.insert("section_type".into(), "business".into());
    let by_metadata = store.search_by_metadata(&filters, 50).await;
    assert!(!by_metadata.is_empty());
    assert!(by_metadata.iter().all(|r| r.metadata.section_type == "business"));
}

#[tokio::test]
async fn reopen_restores_collection() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());

    let (stats, chunk, results) = {
        let store = populated(&config).await;
        let results = store.search(&SearchRequest::new("research and development", 5)).await.unwrap();
        (
            store.stats().await,
            store.get("AAPL_10-K_2023-11-03_0002").await,
            results,
        )
    };
    assert!(chunk.is_some());

    let reopened = open_store(&config).await;
    assert_eq!(reopened.stats().await, stats);
    assert_eq!(
        serde_json::to_vec(&reopened.get("AAPL_10-K_2023-11-03_0002").await).unwrap(),
        serde_json::to_vec(&chunk).unwrap()
    );

    let again = reopened.search(&SearchRequest::new("research and development", 5)).await.unwrap();
    let ids: Vec<_> = again.iter().map(|r| r.chunk_id.as_str()).collect();
    let expected: Vec<_> = results.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn reingesting_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = populated(&config).await;
    let before = store.len().await;

    let added = store.add(chunker(&config).chunk(&apple())).await.unwrap();
    assert_eq!(added, 0);
    assert_eq!(store.len().await, before);
}
