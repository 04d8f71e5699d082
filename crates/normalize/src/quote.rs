use once_cell::sync::Lazy;
use regex::Regex;

const MAX_QUOTE_LEN: usize = 280;

static SENTENCE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:[.!?])\s+(?=[A-Z0-9(])").unwrap());

static PERIOD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(20\d{2}|Q[1-4]\s*20\d{2}|H[12]\s*20\d{2}|FY\s*20\d{2})\b").unwrap()
});

static METRIC_HINTS: &[&str] = &[
    "arrival",
    "international tourist",
    "occupancy",
    "spend",
    "expenditure",
    "revenue",
    "gdp",
    "passenger",
    "traffic",
    "capacity",
    "visitation",
    "tourism",
    "visitor",
    "recovery",
    "growth",
    "decline",
    "increase",
    "decrease",
];

fn has_digit(s: &str) -> bool {
    s.chars().any(|c| c.is_ascii_digit())
}

fn score_sentence(s: &str) -> u8 {
    let lower = s.to_lowercase();
    let mut score = 0;
    if has_digit(s) {
        score += 1;
    }
    if PERIOD_PATTERN.is_match(&lower) {
        score += 1;
    }
    if METRIC_HINTS.iter().any(|h| lower.contains(h)) {
        score += 1;
    }
    score
}

/// Select up to `max_sentences` claim-like sentences from `text` (spec
/// §4.5 quote extraction): sentences carrying a number, a recognizable
/// period token, or a metric-domain keyword score higher; a sentence
/// needs score >= 2 to qualify, with a number-only fallback if nothing
/// clears that bar. Each returned quote is truncated to
/// [`MAX_QUOTE_LEN`] characters.
pub fn select_claim_sentences(text: &str, max_sentences: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let candidates: Vec<&str> = SENTENCE_SPLIT.split(trimmed).take(15).map(str::trim).filter(|s| !s.is_empty()).collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&str, u8)> = candidates.iter().map(|s| (*s, score_sentence(s))).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut best: Vec<&str> = scored.iter().filter(|(_, sc)| *sc >= 2).map(|(s, _)| *s).take(max_sentences).collect();

    if best.is_empty() {
        best = scored.iter().filter(|(s, _)| has_digit(s)).map(|(s, _)| *s).take(1).collect();
    }

    best.into_iter()
        .map(|s| s.chars().take(MAX_QUOTE_LEN).collect::<String>())
        .take(max_sentences)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_sentences_with_numbers_and_period_tokens() {
        let text = "Tourism recovered strongly in 2023. The weather was pleasant throughout the season. International arrivals grew by 14 percent in Q2 2023 compared to the prior year.";
        let quotes = select_claim_sentences(text, 2);
        assert!(!quotes.is_empty());
        assert!(quotes.iter().any(|q| q.contains("14 percent") || q.contains("2023")));
    }

    #[test]
    fn falls_back_to_any_numeric_sentence_when_no_strong_candidate() {
        let text = "Revenue was reported as 42 in the filing. Nothing else of note here at all today really.";
        let quotes = select_claim_sentences(text, 2);
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].contains("42"));
    }

    #[test]
    fn empty_text_yields_no_quotes() {
        assert!(select_claim_sentences("", 2).is_empty());
    }

    #[test]
    fn truncates_to_max_quote_length() {
        let long_sentence = format!("In 2023 the number was {}. ", "9".repeat(400));
        let quotes = select_claim_sentences(&long_sentence, 1);
        assert!(quotes[0].len() <= MAX_QUOTE_LEN);
    }
}
