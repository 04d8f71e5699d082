use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The closed intent set. Classification always resolves to
/// exactly one of these for a given topic; `Generic` is the fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Encyclopedia,
    News,
    Product,
    Local,
    Academic,
    Stats,
    Travel,
    Regulatory,
    Howto,
    Medical,
    Generic,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Encyclopedia => "encyclopedia",
            Intent::News => "news",
            Intent::Product => "product",
            Intent::Local => "local",
            Intent::Academic => "academic",
            Intent::Stats => "stats",
            Intent::Travel => "travel",
            Intent::Regulatory => "regulatory",
            Intent::Howto => "howto",
            Intent::Medical => "medical",
            Intent::Generic => "generic",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Self> {
        ALL_INTENTS.iter().copied().find(|i| i.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

pub const ALL_INTENTS: [Intent; 11] = [
    Intent::Encyclopedia,
    Intent::News,
    Intent::Product,
    Intent::Local,
    Intent::Academic,
    Intent::Stats,
    Intent::Travel,
    Intent::Regulatory,
    Intent::Howto,
    Intent::Medical,
    Intent::Generic,
];

/// One intent's keyword anchors (strong signal, weighted 1.5x) and
/// aliases (weaker signal, weighted 1x). Ported in shape from the
/// original research system's `topic_router.py::TOPIC_PACKS` anchor/alias
/// tables, remapped onto this spec's closed intent set.
struct IntentSignals {
    intent: Intent,
    anchors: &'static [&'static str],
    aliases: &'static [&'static str],
}

static SIGNALS: Lazy<Vec<IntentSignals>> = Lazy::new(|| {
    vec![
        IntentSignals {
            intent: Intent::Stats,
            anchors: &["gdp", "inflation", "unemployment", "statistics", "indicator", "index", "rate"],
            aliases: &["economy", "economic", "data", "figures", "percent", "growth"],
        },
        IntentSignals {
            intent: Intent::Academic,
            anchors: &["study", "research", "paper", "trial", "hypothesis", "theory", "peer-reviewed"],
            aliases: &["journal", "publication", "citation", "author", "findings"],
        },
        IntentSignals {
            intent: Intent::Medical,
            anchors: &["disease", "treatment", "clinical", "patient", "diagnosis", "drug", "vaccine"],
            aliases: &["health", "medicine", "symptom", "therapy", "aspirin", "trial"],
        },
        IntentSignals {
            intent: Intent::Travel,
            anchors: &["tourism", "tourist", "arrivals", "destination", "unwto", "visit"],
            aliases: &["travel", "trip", "vacation", "itinerary", "hotel"],
        },
        IntentSignals {
            intent: Intent::Regulatory,
            anchors: &["regulation", "compliance", "cve", "vulnerability", "sec filing", "statute"],
            aliases: &["law", "policy", "legal", "exploit", "disclosure"],
        },
        IntentSignals {
            intent: Intent::News,
            anchors: &["breaking", "today", "announced", "reported", "press release"],
            aliases: &["news", "latest", "update", "headline"],
        },
        IntentSignals {
            intent: Intent::Product,
            anchors: &["review", "vs", "price", "specs", "release date"],
            aliases: &["product", "buy", "model", "version"],
        },
        IntentSignals {
            intent: Intent::Local,
            anchors: &["near me", "restaurant", "address", "opening hours"],
            aliases: &["location", "map", "directions", "neighborhood"],
        },
        IntentSignals {
            intent: Intent::Howto,
            anchors: &["how to", "tutorial", "step by step", "guide"],
            aliases: &["howto", "instructions", "setup", "configure"],
        },
        IntentSignals {
            intent: Intent::Encyclopedia,
            anchors: &["history of", "biography", "definition", "what is"],
            aliases: &["overview", "background", "origin"],
        },
    ]
});

/// Complementary-intent pairs (spec §4.3: "a small explicit compatibility
/// table"). When both intents in a pair score above the confidence
/// threshold, the union expands the provider set even though only the
/// higher-scoring intent supplies the gate thresholds.
static COMPATIBLE_PAIRS: Lazy<Vec<(Intent, Intent)>> = Lazy::new(|| {
    vec![
        (Intent::Regulatory, Intent::Medical),
        (Intent::Stats, Intent::Travel),
        (Intent::Academic, Intent::Medical),
        (Intent::Academic, Intent::Stats),
    ]
});

const CONFIDENCE_THRESHOLD: f64 = 0.55;

fn normalize_tokens(topic: &str) -> Vec<String> {
    topic
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn score_intent(topic_lower: &str, tokens: &[String], signals: &IntentSignals) -> f64 {
    let mut score = 0.0;
    let mut hits = 0usize;
    let total = signals.anchors.len() + signals.aliases.len();

    for anchor in signals.anchors {
        if anchor.contains(' ') {
            if topic_lower.contains(anchor) {
                score += 1.5;
                hits += 1;
            }
        } else if tokens.iter().any(|t| t == anchor) {
            score += 1.5;
            hits += 1;
        }
    }
    for alias in signals.aliases {
        if alias.contains(' ') {
            if topic_lower.contains(alias) {
                score += 1.0;
                hits += 1;
            }
        } else if tokens.iter().any(|t| t == alias) {
            score += 1.0;
            hits += 1;
        }
    }

    if total == 0 || hits == 0 {
        return 0.0;
    }
    // Coverage-weighted confidence: how much of this signal set fired,
    // scaled by the raw weighted score so a single weak alias hit on a
    // huge signal set doesn't falsely dominate.
    let coverage = hits as f64 / total as f64;
    (score * coverage).min(1.0).max(coverage * 0.3)
}

/// Classify a topic into a primary intent plus the full set of intents
/// scoring above the confidence threshold (spec §4.3: "Multi-pack
/// classification may return a set of complementary intents").
///
/// Ties resolved by anchor weight (highest raw score wins); no signal
/// clearing the threshold falls back to [`Intent::Generic`].
pub fn classify_topic_multi(topic: &str) -> (Intent, BTreeSet<Intent>) {
    let tokens = normalize_tokens(topic);
    let topic_lower = topic.to_lowercase();

    if tokens.is_empty() {
        return (Intent::Generic, BTreeSet::from([Intent::Generic]));
    }

    let mut scored: Vec<(Intent, f64)> = SIGNALS
        .iter()
        .map(|s| (s.intent, score_intent(&topic_lower, &tokens, s)))
        .filter(|(_, score)| *score >= CONFIDENCE_THRESHOLD)
        .collect();

    if scored.is_empty() {
        return (Intent::Generic, BTreeSet::from([Intent::Generic]));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let primary = scored[0].0;

    let mut union: BTreeSet<Intent> = scored.iter().map(|(i, _)| *i).collect();
    for (a, b) in COMPATIBLE_PAIRS.iter() {
        if union.contains(a) || union.contains(b) {
            union.insert(*a);
            union.insert(*b);
        }
    }

    (primary, union)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_travel_topic() {
        let (primary, _) = classify_topic_multi("global tourism arrivals 2024 UNWTO");
        assert_eq!(primary, Intent::Travel);
    }

    #[test]
    fn classifies_medical_topic() {
        let (primary, _) = classify_topic_multi("randomized controlled trial aspirin primary prevention");
        assert_eq!(primary, Intent::Medical);
    }

    #[test]
    fn classifies_stats_topic() {
        let (primary, _) = classify_topic_multi("GDP inflation OECD 2025");
        assert_eq!(primary, Intent::Stats);
    }

    #[test]
    fn empty_topic_falls_back_to_generic() {
        let (primary, set) = classify_topic_multi("");
        assert_eq!(primary, Intent::Generic);
        assert_eq!(set, BTreeSet::from([Intent::Generic]));
    }

    #[test]
    fn unrecognized_topic_falls_back_to_generic() {
        let (primary, _) = classify_topic_multi("xyzzy plugh qux");
        assert_eq!(primary, Intent::Generic);
    }
}
