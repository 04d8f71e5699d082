use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Claim-like filter: a sentence needs a percentage, a year,
/// a quarter/half/fiscal-year token, or a magnitude word to be considered
/// for clustering at all.
static CLAIMISH_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:\d{1,3}(?:\.\d+)?%|\d{4}|Q[1-4]\s*\d{4}|million|billion|trillion)\b").unwrap()
});

pub fn is_claimish(text: &str) -> bool {
    !text.is_empty() && CLAIMISH_RX.is_match(text)
}

static YEAR_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b20\d{2}\b").unwrap());
static QUARTER_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bq([1-4])\s*20\d{2}\b").unwrap());
static HALF_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bh([12])\s*20\d{2}\b").unwrap());
static FY_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfy\s*20\d{2}\b").unwrap());
static PERCENT_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\s*%").unwrap());
static NUMBER_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());
static NON_ALNUM_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9%\- ]+").unwrap());

/// Normalize a claim-like sentence for paraphrase comparison: collapse
/// quarter/half/fiscal-year/year tokens to generic placeholders so
/// "Q1 2024" and "the first quarter of 2024" land on the same normalized
/// form, collapse percentages and bare numbers similarly, then strip
/// remaining punctuation.
pub fn normalize_for_paraphrase(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let mut s = raw.to_lowercase();
    s = QUARTER_RX.replace_all(&s, " Q$1 YEAR ").to_string();
    s = HALF_RX.replace_all(&s, " H$1 YEAR ").to_string();
    s = FY_RX.replace_all(&s, " FY YEAR ").to_string();
    s = YEAR_RX.replace_all(&s, " YEAR ").to_string();
    s = PERCENT_RX.replace_all(&s, " PCT ").to_string();
    s = NUMBER_RX.replace_all(&s, " NUM ").to_string();
    s = NON_ALNUM_RX.replace_all(&s, " ").to_string();
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract numeric/year tokens verbatim (not normalized), used for the
/// numeric-token-agreement boost in clustering and pairwise numeric
/// comparison in contradiction detection.
pub fn numeric_tokens(text: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for m in Regex::new(r"\b(?:\d+(?:\.\d+)?%?|\d{4})\b").unwrap().find_iter(text) {
        out.insert(m.as_str().to_string());
    }
    out
}

pub const INCREASE_WORDS: &[&str] = &["increase", "increased", "up", "rise", "grew", "growth", "higher"];
pub const DECREASE_WORDS: &[&str] = &["decrease", "decreased", "down", "decline", "fell", "lower"];

/// Extract numeric values with unit multipliers applied (billion/million/
/// thousand), for contradiction detection's pairwise relative-disagreement
/// comparison.
pub fn extract_numeric_values(text: &str) -> Vec<f64> {
    static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)\b\d+(?:\.\d+)?(?:[%$€£¥]|\s*(?:billion|million|thousand|percent|%))?\b").unwrap()
    });

    let mut out = Vec::new();
    for m in NUMBER_PATTERN.find_iter(text) {
        let raw = m.as_str();
        let lower = raw.to_lowercase();
        let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        let Ok(mut value) = cleaned.parse::<f64>() else { continue };
        if lower.contains("billion") {
            value *= 1_000_000_000.0;
        } else if lower.contains("million") {
            value *= 1_000_000.0;
        } else if lower.contains("thousand") {
            value *= 1_000.0;
        }
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_filter_accepts_percent_and_rejects_prose() {
        assert!(is_claimish("Arrivals grew 14.5% in 2023"));
        assert!(!is_claimish("The weather was pleasant this week"));
    }

    #[test]
    fn normalizes_quarter_and_year_tokens_identically() {
        let a = normalize_for_paraphrase("Arrivals grew 14% in Q1 2024");
        let b = normalize_for_paraphrase("Arrivals grew 14 percent in the Q1 2024 period");
        assert!(a.contains("q1 year"));
        assert!(b.contains("q1 year"));
    }

    #[test]
    fn extracts_numeric_tokens() {
        let toks = numeric_tokens("arrivals rose 14% in 2023 compared to 2022");
        assert!(toks.contains("14%"));
        assert!(toks.contains("2023"));
    }

    #[test]
    fn extracts_numeric_values_with_multipliers() {
        let vals = extract_numeric_values("revenue reached 2.5 billion dollars");
        assert!(vals.iter().any(|v| (*v - 2_500_000_000.0).abs() < 1.0));
    }
}
