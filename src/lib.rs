//! Synthesizes Shibboleth IDP and SP configuration from SAML trust
//! relationships, attribute definitions, CAS settings and NameID
//! configuration held in a directory store.

pub mod attributes;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod files;
pub mod filters;
pub mod metadata_files;
pub mod model;
pub mod parsers;
pub mod render;
pub mod result;
pub mod schema;
pub mod store;
pub mod synthesis;

pub use config::Settings;
pub use error::SynthesisError;
pub use result::SynthesisReport;
pub use synthesis::Synthesizer;
