//! Intent classification and provider-bundle routing.
//!
//! This crate decides, for a given topic string, which closed-set intent
//! it belongs to and which providers (by name) should be queried for it.
//! It knows nothing about how to actually invoke a provider — that's
//! `eatc-providers` — so the output here is just intent + ordered names,
//! resolved against whichever credentials are available.

pub mod intent;
pub mod tiers;

use std::collections::BTreeSet;

use eatc_common::config::Credentials;

pub use intent::{classify_topic_multi, Intent, ALL_INTENTS};
pub use tiers::{bundle_for, bundle_union, fallback_bundle, ProviderBundle, FREE_PROVIDERS, PAID_PROVIDERS};

/// Full routing decision for one run: the classified intent set plus the
/// resolved, credential-gated provider order to query.
#[derive(Clone, Debug)]
pub struct RouteDecision {
    pub primary_intent: Intent,
    pub intent_set: BTreeSet<Intent>,
    pub providers: Vec<&'static str>,
}

/// Returns whether `provider` can run given the credentials on hand.
/// Free providers always pass; paid providers require their specific key.
fn is_credentialed(provider: &str, creds: &Credentials) -> bool {
    match provider {
        "tavily" => creds.tavily_api_key.is_some(),
        "brave" => creds.brave_api_key.is_some(),
        "serper" => creds.serper_api_key.is_some(),
        "serpapi" => creds.serpapi_api_key.is_some(),
        "fred" => creds.fred_api_key.is_some(),
        _ => true,
    }
}

/// Classify `topic` and resolve its provider bundle, honoring an optional
/// caller-supplied intent hint (spec §4.3: an explicit `--intent-hint`
/// flag short-circuits classification and is used verbatim as the
/// primary intent, while the auxiliary intent set is still derived by
/// classification so compatible-pair expansion still applies).
pub fn route(topic: &str, intent_hint: Option<Intent>, creds: &Credentials) -> RouteDecision {
    let (classified_primary, mut intent_set) = classify_topic_multi(topic);
    let primary_intent = intent_hint.unwrap_or(classified_primary);
    intent_set.insert(primary_intent);

    let bundle = bundle_union(&intent_set);
    let mut providers = bundle.resolve(|name| is_credentialed(name, creds));

    if providers.is_empty() {
        providers = fallback_bundle().resolve(|name| is_credentialed(name, creds));
    }

    RouteDecision { primary_intent, intent_set, providers }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_with_no_credentials_uses_only_free_providers() {
        let creds = Credentials::default();
        let decision = route("GDP inflation OECD 2025", None, &creds);
        assert_eq!(decision.primary_intent, Intent::Stats);
        assert!(!decision.providers.is_empty());
        assert!(!decision.providers.iter().any(|p| PAID_PROVIDERS.contains(p)));
    }

    #[test]
    fn route_with_tavily_credential_includes_tavily() {
        let creds = Credentials { tavily_api_key: Some("k".into()), ..Default::default() };
        let decision = route("history of the printing press", None, &creds);
        assert!(decision.providers.contains(&"tavily"));
    }

    #[test]
    fn intent_hint_overrides_classification_but_keeps_classified_union() {
        let creds = Credentials::default();
        let decision = route("tourism statistics and arrivals", Some(Intent::Regulatory), &creds);
        assert_eq!(decision.primary_intent, Intent::Regulatory);
        assert!(decision.intent_set.contains(&Intent::Regulatory));
    }

    #[test]
    fn route_never_returns_empty_provider_list() {
        let creds = Credentials::default();
        let decision = route("", None, &creds);
        assert!(!decision.providers.is_empty());
    }
}
