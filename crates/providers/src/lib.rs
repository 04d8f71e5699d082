pub mod adapters;
pub mod support;
pub mod trait_def;

pub use trait_def::{ProviderContext, Search};

/// All built-in provider adapters, in a stable registration order. The
/// router selects a subset of these per intent; it never constructs
/// an adapter itself.
pub fn all_adapters() -> Vec<std::sync::Arc<dyn Search>> {
    use adapters::*;
    vec![
        std::sync::Arc::new(wikipedia::Wikipedia),
        std::sync::Arc::new(wikidata::Wikidata),
        std::sync::Arc::new(wayback::Wayback),
        std::sync::Arc::new(openalex::OpenAlex),
        std::sync::Arc::new(crossref::Crossref),
        std::sync::Arc::new(pubmed::PubMed),
        std::sync::Arc::new(europepmc::EuropePmc),
        std::sync::Arc::new(arxiv::Arxiv),
        std::sync::Arc::new(worldbank::WorldBank),
        std::sync::Arc::new(oecd::Oecd),
        std::sync::Arc::new(imf::Imf),
        std::sync::Arc::new(eurostat::Eurostat),
        std::sync::Arc::new(ec::Ec),
        std::sync::Arc::new(overpass::Overpass),
        std::sync::Arc::new(nominatim::Nominatim),
        std::sync::Arc::new(fred::Fred),
        std::sync::Arc::new(unpaywall::Unpaywall),
        std::sync::Arc::new(edgar::Edgar),
        std::sync::Arc::new(gdelt::Gdelt),
        std::sync::Arc::new(tavily::Tavily),
        std::sync::Arc::new(brave::Brave),
        std::sync::Arc::new(serper::Serper),
        std::sync::Arc::new(serpapi::SerpApi),
    ]
}
