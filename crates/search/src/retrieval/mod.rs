//! Query-shape routing
//!
//! Every query is classified into one of five shapes from its extracted
//! entities; each shape has a retrieval policy that ends in
//! [`Store::search`](filingforge_common::Store::search):
//! - SingleEntity: ticker + doc-type filter, optional year window
//! - MultiEntity: one sub-search per ticker, merged and re-ranked
//! - Temporal: one sub-search per year, concatenated chronologically
//! - Thematic / Generic: unfiltered search with a keyword boost

mod dates;
mod engine;
mod shape;

pub use dates::YearRange;
pub use engine::{RetrievalEngine, RoutedQuery};
pub use shape::{ProcessingStrategy, QueryShape};
