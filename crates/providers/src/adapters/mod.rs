pub mod arxiv;
pub mod brave;
pub mod crossref;
pub mod ec;
pub mod edgar;
pub mod eurostat;
pub mod europepmc;
pub mod fred;
pub mod gdelt;
pub mod imf;
pub mod nominatim;
pub mod oecd;
pub mod openalex;
pub mod overpass;
pub mod pubmed;
pub mod serpapi;
pub mod serper;
pub mod tavily;
pub mod unpaywall;
pub mod wayback;
pub mod wikidata;
pub mod wikipedia;
pub mod worldbank;
