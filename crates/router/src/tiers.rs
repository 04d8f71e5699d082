use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::intent::Intent;

/// Four-tier provider bundle for one intent. Providers are
/// named as plain strings matching `eatc_providers::Search::name()` —
/// this crate has no dependency on `eatc-providers` so the tiers stay
/// free of any adapter-construction concern; the engine crate resolves
/// names to adapters when it wires router output to the scheduler.
#[derive(Clone, Debug, Default)]
pub struct ProviderBundle {
    pub free_primary: Vec<&'static str>,
    pub free_fallback: Vec<&'static str>,
    pub paid_primary: Vec<&'static str>,
    pub paid_fallback: Vec<&'static str>,
}

impl ProviderBundle {
    /// Flattened, order-preserving, deduplicated provider list across all
    /// four tiers in priority order (free before paid, primary before
    /// fallback), filtered to providers whose required credential (if
    /// any) is present. `credentialed` reports whether a provider name's
    /// required env var is set; pass a closure backed by
    /// [`eatc_common::config::Credentials`] plus the adapter registry.
    pub fn resolve(&self, credentialed: impl Fn(&str) -> bool) -> Vec<&'static str> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for tier in [&self.free_primary, &self.free_fallback, &self.paid_primary, &self.paid_fallback] {
            for name in tier {
                if seen.contains(name) {
                    continue;
                }
                if !credentialed(name) {
                    continue;
                }
                seen.insert(*name);
                out.push(*name);
            }
        }
        out
    }
}

/// Providers that require no credential — used by `credentialed` default
/// gating and the empty-bundle fallback.
pub const FREE_PROVIDERS: &[&str] = &[
    "wikipedia", "wikidata", "wayback", "openalex", "crossref", "pubmed", "europepmc", "arxiv",
    "worldbank", "oecd", "imf", "eurostat", "ec", "overpass", "nominatim", "unpaywall", "edgar", "gdelt",
];

pub const PAID_PROVIDERS: &[&str] = &["tavily", "brave", "serper", "serpapi"];

/// Per-intent provider routing table, ported in shape from the original
/// research system's `providers/intent_registry.py::INTENT_REGISTRY`.
static INTENT_REGISTRY: Lazy<BTreeMap<Intent, ProviderBundle>> = Lazy::new(|| {
    let mut m = BTreeMap::new();

    m.insert(
        Intent::Encyclopedia,
        ProviderBundle {
            free_primary: vec!["wikipedia", "wikidata"],
            free_fallback: vec!["wayback", "gdelt"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["brave", "serper", "serpapi"],
        },
    );
    m.insert(
        Intent::News,
        ProviderBundle {
            free_primary: vec!["gdelt", "wayback"],
            free_fallback: vec!["wikipedia"],
            paid_primary: vec!["tavily", "serper"],
            paid_fallback: vec!["brave", "serpapi"],
        },
    );
    m.insert(
        Intent::Product,
        ProviderBundle {
            free_primary: vec!["wikidata", "wikipedia"],
            free_fallback: vec!["wayback"],
            paid_primary: vec!["serper", "tavily"],
            paid_fallback: vec!["brave", "serpapi"],
        },
    );
    m.insert(
        Intent::Local,
        ProviderBundle {
            free_primary: vec!["nominatim", "overpass"],
            free_fallback: vec!["wikidata", "wikipedia"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["brave", "serper", "serpapi"],
        },
    );
    m.insert(
        Intent::Academic,
        ProviderBundle {
            free_primary: vec!["openalex", "crossref", "europepmc"],
            free_fallback: vec!["arxiv", "unpaywall"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["serper", "serpapi"],
        },
    );
    m.insert(
        Intent::Stats,
        ProviderBundle {
            free_primary: vec!["worldbank", "oecd", "imf", "eurostat", "fred"],
            free_fallback: vec!["ec", "wikidata"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["brave", "serper"],
        },
    );
    m.insert(
        Intent::Travel,
        ProviderBundle {
            free_primary: vec!["worldbank", "wikidata"],
            free_fallback: vec!["wikipedia", "wayback"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["brave", "serper", "serpapi"],
        },
    );
    m.insert(
        Intent::Regulatory,
        ProviderBundle {
            free_primary: vec!["edgar", "ec"],
            free_fallback: vec!["gdelt", "wayback"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["serper", "serpapi"],
        },
    );
    m.insert(
        Intent::Howto,
        ProviderBundle {
            free_primary: vec!["wikipedia"],
            free_fallback: vec!["wayback"],
            paid_primary: vec!["tavily", "serper"],
            paid_fallback: vec!["brave", "serpapi"],
        },
    );
    m.insert(
        Intent::Medical,
        ProviderBundle {
            free_primary: vec!["pubmed", "europepmc"],
            free_fallback: vec!["openalex", "unpaywall"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["serper", "serpapi"],
        },
    );
    m.insert(
        Intent::Generic,
        ProviderBundle {
            free_primary: vec!["wikipedia", "wikidata"],
            free_fallback: vec!["gdelt", "wayback"],
            paid_primary: vec!["tavily"],
            paid_fallback: vec!["brave", "serper", "serpapi"],
        },
    );

    m
});

/// The encyclopedia bundle, used as the fallback when a resolved bundle
/// comes back empty (spec §4.3: no intent may route to zero providers).
pub fn fallback_bundle() -> ProviderBundle {
    INTENT_REGISTRY.get(&Intent::Encyclopedia).cloned().unwrap_or_default()
}

pub fn bundle_for(intent: Intent) -> ProviderBundle {
    INTENT_REGISTRY.get(&intent).cloned().unwrap_or_else(fallback_bundle)
}

/// Union bundle across a multi-intent set (spec §4.3: complementary
/// intents expand the provider set). Tier membership is the union of
/// each tier across all intents in `intents`, order-preserving by
/// intent-set iteration order (a `BTreeSet`, so deterministic).
pub fn bundle_union(intents: &std::collections::BTreeSet<Intent>) -> ProviderBundle {
    let mut out = ProviderBundle::default();
    for intent in intents {
        let b = bundle_for(*intent);
        for (dst, src) in [
            (&mut out.free_primary, &b.free_primary),
            (&mut out.free_fallback, &b.free_fallback),
            (&mut out.paid_primary, &b.paid_primary),
            (&mut out.paid_fallback, &b.paid_fallback),
        ] {
            for name in src {
                if !dst.contains(name) {
                    dst.push(name);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_intent_has_a_nonempty_registered_bundle() {
        for intent in crate::intent::ALL_INTENTS {
            let b = bundle_for(intent);
            let total = b.free_primary.len() + b.free_fallback.len() + b.paid_primary.len() + b.paid_fallback.len();
            assert!(total > 0, "intent {:?} has an empty bundle", intent);
        }
    }

    #[test]
    fn resolve_drops_uncredentialed_paid_providers() {
        let b = bundle_for(Intent::News);
        let resolved = b.resolve(|name| FREE_PROVIDERS.contains(&name));
        assert!(!resolved.iter().any(|n| PAID_PROVIDERS.contains(n)));
        assert!(resolved.contains(&"gdelt"));
    }

    #[test]
    fn resolve_is_order_preserving_and_deduplicated() {
        let b = ProviderBundle {
            free_primary: vec!["wikipedia", "wikidata"],
            free_fallback: vec!["wikipedia"],
            paid_primary: vec![],
            paid_fallback: vec![],
        };
        let resolved = b.resolve(|_| true);
        assert_eq!(resolved, vec!["wikipedia", "wikidata"]);
    }

    #[test]
    fn union_merges_tiers_without_duplicates() {
        let intents = std::collections::BTreeSet::from([Intent::Academic, Intent::Medical]);
        let u = bundle_union(&intents);
        let count = u.free_primary.iter().filter(|p| **p == "europepmc").count();
        assert_eq!(count, 1);
    }
}
