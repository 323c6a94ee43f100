//! Raw document handed over by the extraction collaborator

use serde::{Deserialize, Serialize};

/// Identity of a filing: who filed what, and when
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIdentifier {
    pub ticker: String,
    pub doc_type: String,
    /// ISO date (`YYYY-MM-DD`); compared lexicographically for date ranges
    pub issue_date: String,
}

impl DocumentIdentifier {
    pub fn new(
        ticker: impl Into<String>,
        doc_type: impl Into<String>,
        issue_date: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            doc_type: doc_type.into(),
            issue_date: issue_date.into(),
        }
    }

    /// Deterministic chunk id: `TICKER_DOCTYPE_DATE_NNNN`
    pub fn chunk_id(&self, chunk_index: usize) -> String {
        format!(
            "{}_{}_{}_{:04}",
            self.ticker, self.doc_type, self.issue_date, chunk_index
        )
    }

    /// Name of the first identifier field that is blank, if any
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.ticker.trim().is_empty() {
            Some("ticker")
        } else if self.doc_type.trim().is_empty() {
            Some("doc_type")
        } else if self.issue_date.trim().is_empty() {
            Some("issue_date")
        } else {
            None
        }
    }
}

/// Already-cleaned filing text. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub identifier: DocumentIdentifier,
    pub full_text: String,
}

impl RawDocument {
    pub fn new(identifier: DocumentIdentifier, full_text: impl Into<String>) -> Self {
        Self {
            identifier,
            full_text: full_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_format() {
        let id = DocumentIdentifier::new("AAPL", "10-K", "2023-11-03");
        assert_eq!(id.chunk_id(0), "AAPL_10-K_2023-11-03_0000");
        assert_eq!(id.chunk_id(12), "AAPL_10-K_2023-11-03_0012");
    }

    #[test]
    fn test_missing_field() {
        let id = DocumentIdentifier::new("MSFT", " ", "2024-01-30");
        assert_eq!(id.missing_field(), Some("doc_type"));
        assert_eq!(DocumentIdentifier::new("MSFT", "10-Q", "2024-01-30").missing_field(), None);
    }

    #[test]
    fn test_deserialize_from_json() {
        let doc: RawDocument = serde_json::from_str(
            r#"{"identifier":{"ticker":"JPM","doc_type":"8-K","issue_date":"2024-04-12"},"full_text":"text"}"#,
        )
        .unwrap();
        assert_eq!(doc.identifier.ticker, "JPM");
        assert_eq!(doc.full_text, "text");
    }
}
