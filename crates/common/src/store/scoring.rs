//! Lexical overlap scoring

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "what",
    "how", "when", "where", "why",
];

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Query keywords: lowercased word tokens longer than two characters, minus stopwords
pub fn query_tokens(query: &str) -> Vec<String> {
    let lower = query.to_lowercase();
    words(&lower)
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Fraction of query tokens found in `text`.
///
/// A whole-word hit counts 1.0, a substring-only hit 0.5. Capped at 1.0;
/// 0.0 when the query has no usable tokens.
pub fn lexical_score(tokens: &[String], text: &str) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }

    let lower = text.to_lowercase();
    let text_words: std::collections::HashSet<&str> = words(&lower).collect();

    let hits: f32 = tokens
        .iter()
        .map(|token| {
            if text_words.contains(token.as_str()) {
                1.0
            } else if lower.contains(token.as_str()) {
                0.5
            } else {
                0.0
            }
        })
        .sum();

    (hits / tokens.len() as f32).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_tokens_drop_stopwords_and_short_words() {
        assert_eq!(
            query_tokens("What is Apple's revenue in 2023?"),
            vec!["apple", "revenue", "2023"]
        );
    }

    #[test]
    fn test_whole_word_and_substring_hits() {
        let tokens = query_tokens("revenue growth");
        assert_eq!(lexical_score(&tokens, "Revenue growth was strong"), 1.0);
        // "growth" only inside "regrowth"
        assert_eq!(lexical_score(&tokens, "revenue regrowth"), 0.75);
        assert_eq!(lexical_score(&tokens, "dividends"), 0.0);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(lexical_score(&query_tokens("what is the"), "anything"), 0.0);
    }
}
