//! Query understanding
//!
//! Rule-based extraction of the entities that drive retrieval routing.

mod query_parser;

pub use query_parser::{
    ComparisonIntent, ComparisonKind, Complexity, QueryEntities, QueryParser, TimeReferences,
};
