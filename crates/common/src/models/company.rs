//! Static company table covering the tracked filers

/// A tracked filer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Company {
    pub ticker: &'static str,
    pub name: &'static str,
    pub sector: &'static str,
}

pub const COMPANIES: &[Company] = &[
    // Technology
    Company { ticker: "AAPL", name: "Apple Inc.", sector: "Technology" },
    Company { ticker: "MSFT", name: "Microsoft Corporation", sector: "Technology" },
    Company { ticker: "GOOGL", name: "Alphabet Inc.", sector: "Technology" },
    // Finance
    Company { ticker: "JPM", name: "JPMorgan Chase & Co.", sector: "Finance" },
    Company { ticker: "BAC", name: "Bank of America Corporation", sector: "Finance" },
    Company { ticker: "WFC", name: "Wells Fargo & Company", sector: "Finance" },
    // Healthcare
    Company { ticker: "JNJ", name: "Johnson & Johnson", sector: "Healthcare" },
    Company { ticker: "PFE", name: "Pfizer Inc.", sector: "Healthcare" },
    // Energy
    Company { ticker: "XOM", name: "Exxon Mobil Corporation", sector: "Energy" },
    Company { ticker: "CVX", name: "Chevron Corporation", sector: "Energy" },
    // Retail
    Company { ticker: "AMZN", name: "Amazon.com Inc.", sector: "Retail" },
    Company { ticker: "WMT", name: "Walmart Inc.", sector: "Retail" },
    Company { ticker: "TSLA", name: "Tesla Inc.", sector: "Automotive" },
    // Manufacturing
    Company { ticker: "GE", name: "General Electric Company", sector: "Manufacturing" },
    Company { ticker: "CAT", name: "Caterpillar Inc.", sector: "Manufacturing" },
    Company { ticker: "BA", name: "The Boeing Company", sector: "Manufacturing" },
];

/// Informal names people use in questions
pub const NAME_VARIANTS: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("tesla", "TSLA"),
    ("jpmorgan", "JPM"),
    ("jp morgan", "JPM"),
    ("bank of america", "BAC"),
    ("wells fargo", "WFC"),
    ("johnson & johnson", "JNJ"),
    ("johnson and johnson", "JNJ"),
    ("pfizer", "PFE"),
    ("exxon", "XOM"),
    ("exxon mobil", "XOM"),
    ("chevron", "CVX"),
    ("walmart", "WMT"),
    ("general electric", "GE"),
    ("caterpillar", "CAT"),
    ("boeing", "BA"),
];

pub fn lookup(ticker: &str) -> Option<&'static Company> {
    COMPANIES.iter().find(|c| c.ticker.eq_ignore_ascii_case(ticker))
}

/// Display name for attribution, `"{ticker} Inc."` for unknown filers
pub fn company_name(ticker: &str) -> String {
    lookup(ticker)
        .map(|c| c.name.to_string())
        .unwrap_or_else(|| format!("{} Inc.", ticker))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_name() {
        assert_eq!(company_name("AAPL"), "Apple Inc.");
        assert_eq!(company_name("nvda"), "nvda Inc.");
        assert_eq!(lookup("msft").map(|c| c.sector), Some("Technology"));
    }
}
