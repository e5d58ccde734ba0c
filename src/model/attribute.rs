use serde::{Deserialize, Serialize};

/// Directory attribute as known to the IDP, keyed by `name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Attribute {
    pub dn: String,
    pub name: String,
    pub display_name: Option<String>,
    /// Attribute was defined by the deployment rather than shipped with the schema.
    pub custom: bool,
    pub urn: Option<String>,
    pub saml1_uri: Option<String>,
    pub saml2_uri: Option<String>,
}

/// Source attribute for a SAML NameID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NameIdConfig {
    pub name: String,
    pub source_attribute: Option<String>,
    pub name_id_type: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CasConfiguration {
    pub enabled: bool,
    pub extended: bool,
    pub enable_to_proxy_patterns: bool,
    pub authorized_to_proxy_pattern: Option<String>,
    pub unauthorized_to_proxy_pattern: Option<String>,
}
