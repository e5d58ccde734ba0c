use std::collections::BTreeMap;

use serde::Serialize;

use super::attribute::{Attribute, CasConfiguration, NameIdConfig};
use super::trust_relationship::{MetadataSourceType, ProfileConfiguration};

/// Fully resolved input for one rendering pass.
///
/// Built by [`crate::context::ContextBuilder`], consumed once by the artifact
/// generator and then dropped.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationContext {
    pub trust: TrustParams,
    pub attributes: AttributeParams,
    pub cas: CasParams,
    pub resolver: ResolverParams,
    pub deployment: DeploymentParams,
}

impl ConfigurationContext {
    pub fn groups(&self) -> [ParameterGroup<'_>; 4] {
        [
            ParameterGroup::Trust(&self.trust),
            ParameterGroup::Attribute(&self.attributes),
            ParameterGroup::Cas(&self.cas),
            ParameterGroup::Resolver(&self.resolver),
        ]
    }
}

/// One of the four parameter groups a context is assembled from.
#[derive(Debug, Clone, Copy)]
pub enum ParameterGroup<'a> {
    Trust(&'a TrustParams),
    Attribute(&'a AttributeParams),
    Cas(&'a CasParams),
    Resolver(&'a ResolverParams),
}

impl ParameterGroup<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterGroup::Trust(_) => "trust",
            ParameterGroup::Attribute(_) => "attribute",
            ParameterGroup::Cas(_) => "cas",
            ParameterGroup::Resolver(_) => "resolver",
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ParameterGroup::Trust(p) => format!(
                "{} relationship(s), {} federated member(s), {} trust engine(s)",
                p.trusts.len(),
                p.deconstructed.len(),
                p.trust_engines.len()
            ),
            ParameterGroup::Attribute(p) => {
                format!("{} released attribute(s)", p.attributes.len())
            }
            ParameterGroup::Cas(p) => match &p.settings {
                Some(s) if s.enabled => "CAS enabled".to_string(),
                Some(_) => "CAS disabled".to_string(),
                None => "CAS not configured".to_string(),
            },
            ParameterGroup::Resolver(p) => format!(
                "{} NameID config(s), persistence {}",
                p.configs.len(),
                p.persistence_type
            ),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrustParams {
    pub idp_credentials_path: String,
    /// Standalone relationships that survived classification.
    pub trusts: Vec<TrustView>,
    /// inum → standalone sequence number.
    pub trust_ids: BTreeMap<String, u32>,
    /// inum → entity IDs, with federation members removed.
    pub trust_entity_ids: BTreeMap<String, Vec<String>>,
    /// Relationships deconstructed from a federation aggregate.
    pub deconstructed: Vec<TrustView>,
    /// entity ID → federation sequence number.
    pub deconstructed_ids: BTreeMap<String, u32>,
    /// federation inum → member entity IDs.
    pub federations: BTreeMap<String, Vec<String>>,
    pub trust_engines: Vec<TrustEngine>,
}

/// Render-ready projection of one trust relationship.
#[derive(Debug, Clone, Serialize)]
pub struct TrustView {
    pub inum: String,
    pub id: String,
    pub numeric_id: u32,
    pub display_name: String,
    pub entity_ids: Vec<String>,
    pub metadata_source_type: MetadataSourceType,
    pub metadata_file: Option<String>,
    pub container_federation: Option<String>,
    pub released_attributes: Vec<String>,
    pub filters: Vec<String>,
    pub profiles: Vec<ProfileConfiguration>,
    /// Replaces the relationship's raw signature validation filter.
    pub trust_engine: Option<TrustEngine>,
}

/// Metadata signature verification engine for one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustEngine {
    pub id: String,
    pub cert_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeParams {
    /// Deduplicated by name, ordered by name.
    pub attributes: Vec<Attribute>,
    pub saml1_uris: BTreeMap<String, String>,
    pub saml2_uris: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CasParams {
    pub settings: Option<CasConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolverParams {
    pub configs: Vec<NameIdConfig>,
    pub attributes: AttributeParams,
    pub persistence_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeploymentParams {
    pub salt: Option<String>,
    pub metadata_folder: String,
    pub org_inum: String,
    pub org_support_email: Option<String>,
    pub idp_url: String,
    pub idp_host: String,
    pub sp_url: String,
    pub sp_host: String,
    pub own_sp_entity_id: Option<String>,
    pub ldap_url: String,
    pub bind_dn: Option<String>,
    pub ldap_pass: Option<String>,
    pub security_key: Option<String>,
    pub security_cert: Option<String>,
    pub security_key_password: Option<String>,
}
