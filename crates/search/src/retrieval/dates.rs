//! Issue-date windows
//!
//! Dates are ISO `YYYY-MM-DD` strings, so range checks are plain string
//! comparisons. The metadata index has no range lookups; windows are applied
//! as a post-filter over an over-fetched result list.

use filingforge_common::SearchResult;
use serde::Serialize;

/// Inclusive `[start, end]` window of issue dates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearRange {
    pub start: String,
    pub end: String,
}

impl YearRange {
    pub fn for_year(year: &str) -> Self {
        Self {
            start: format!("{}-01-01", year),
            end: format!("{}-12-31", year),
        }
    }

    pub fn contains(&self, issue_date: &str) -> bool {
        self.start.as_str() <= issue_date && issue_date <= self.end.as_str()
    }

    /// Keep results issued inside the window, at most `limit`
    pub fn apply(&self, results: Vec<SearchResult>, limit: usize) -> Vec<SearchResult> {
        results
            .into_iter()
            .filter(|r| self.contains(&r.metadata.issue_date))
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds_are_inclusive() {
        let range = YearRange::for_year("2023");
        assert!(range.contains("2023-01-01"));
        assert!(range.contains("2023-11-03"));
        assert!(range.contains("2023-12-31"));
        assert!(!range.contains("2022-12-31"));
        assert!(!range.contains("2024-01-01"));
    }
}
