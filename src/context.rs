use tracing::{debug, error, warn};

use crate::attributes;
use crate::cache::RunCache;
use crate::classifier::{self, Classification};
use crate::config::{IdpLayout, Settings};
use crate::error::{AttributeResolutionError, SynthesisError};
use crate::filters::{self, SIGNATURE_VALIDATION};
use crate::model::context::{
    AttributeParams, CasParams, ConfigurationContext, DeploymentParams, ResolverParams,
    TrustEngine, TrustParams, TrustView,
};
use crate::model::trust_relationship::{remove_punctuation, TrustRelationship};
use crate::result::{ReportItem, Stage};
use crate::store::SecretDecryptor;

const DEFAULT_ORG_INUM: &str = "gluu";

/// Assembles the [`ConfigurationContext`] for one synthesis run.
pub struct ContextBuilder<'a> {
    settings: &'a Settings,
    cache: &'a RunCache<'a>,
    secrets: &'a dyn SecretDecryptor,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(
        settings: &'a Settings,
        cache: &'a RunCache<'a>,
        secrets: &'a dyn SecretDecryptor,
    ) -> Self {
        Self {
            settings,
            cache,
            secrets,
        }
    }

    /// Resolve, classify and merge everything the artifact templates need.
    ///
    /// Per-relationship problems land in `items`; a missing IDP root or a
    /// failed attribute or resolver group aborts the whole context.
    #[tracing::instrument(skip_all, fields(relationships = relationships.len()))]
    pub fn build(
        &self,
        relationships: &mut [TrustRelationship],
        items: &mut Vec<ReportItem>,
    ) -> Result<ConfigurationContext, SynthesisError> {
        let layout = self.settings.layout()?;

        items.extend(attributes::init_attributes(relationships, self.cache)?);
        for tr in relationships.iter_mut() {
            items.extend(filters::normalize(tr));
        }

        let mut classification = classifier::classify(relationships, &layout, self.cache.store());
        items.append(&mut classification.items);

        let trust = trust_params(relationships, &classification, &layout);
        let attributes = self.attribute_params_for(relationships, &classification)?;
        let cas = self.cas_params();
        let resolver = self.resolver_params(items)?;
        let deployment = self.deployment_params(&layout)?;

        let context = ConfigurationContext {
            trust,
            attributes,
            cas,
            resolver,
            deployment,
        };
        for group in context.groups() {
            debug!(group = group.name(), "{}", group.describe());
        }
        Ok(context)
    }

    /// URI maps for the attributes released by relationships that survived
    /// classification.
    fn attribute_params_for(
        &self,
        relationships: &[TrustRelationship],
        classification: &Classification,
    ) -> Result<AttributeParams, SynthesisError> {
        let released = classification
            .standalone
            .iter()
            .chain(&classification.deconstructed)
            .flat_map(|&i| &relationships[i].released_custom_attributes)
            .map(|r| r.metadata.clone());
        Ok(attributes::build_attribute_params(
            released,
            self.cache.schema()?,
            self.cache.schema_service(),
        )?)
    }

    fn cas_params(&self) -> CasParams {
        match self.cache.store().cas_configuration() {
            Ok(settings) => CasParams { settings },
            Err(e) => {
                error!("Failed to load CAS configuration, CAS is left out: {}", e);
                CasParams::default()
            }
        }
    }

    fn resolver_params(&self, items: &mut Vec<ReportItem>) -> Result<ResolverParams, SynthesisError> {
        let store = self.cache.store();
        let mut configs = Vec::new();
        let mut source_attributes = Vec::new();

        for config in store.name_id_configs()? {
            let Some(source) = config.source_attribute.clone().filter(|s| !s.is_empty()) else {
                continue;
            };
            if !config.enabled {
                continue;
            }
            match self.cache.attribute_by_name(&source)? {
                Some(attribute) => {
                    source_attributes.push(attribute.clone());
                    configs.push(config);
                }
                None => {
                    let e = AttributeResolutionError::UnknownNameIdSource(source);
                    warn!("Skipping NameID configuration {}: {}", config.name, e);
                    items.push(ReportItem::skipped(Stage::Context, &config.name, &e.to_string()));
                }
            }
        }

        let attributes = attributes::build_attribute_params(
            source_attributes,
            self.cache.schema()?,
            self.cache.schema_service(),
        )?;
        let persistence_type = store.persistence_type()?;
        debug!(persistence_type = %persistence_type, "resolver persistence type");

        Ok(ResolverParams {
            configs,
            attributes,
            persistence_type,
        })
    }

    fn deployment_params(&self, layout: &IdpLayout) -> Result<DeploymentParams, SynthesisError> {
        let idp = &self.settings.idp;
        let org = &self.settings.organization;
        let sp_url = &self.settings.sp.application_url;

        Ok(DeploymentParams {
            salt: org.crypto_salt.clone(),
            metadata_folder: layout.metadata_dir().to_string_lossy().to_string(),
            org_inum: remove_punctuation(org.inum.as_deref().unwrap_or(DEFAULT_ORG_INUM)),
            org_support_email: org.support_email.clone(),
            idp_url: idp.url.clone(),
            idp_host: derive_host(&idp.url),
            sp_url: sp_url.clone(),
            sp_host: derive_host(sp_url),
            own_sp_entity_id: self.own_sp_entity_id()?,
            ldap_url: normalize_ldap_url(&idp.ldap_protocol, &idp.ldap_server),
            bind_dn: idp.bind_dn.clone(),
            ldap_pass: self.decrypt("bind password", idp.bind_password.as_deref()),
            security_key: idp.security_key.clone(),
            security_cert: idp.security_cert.clone(),
            security_key_password: self
                .decrypt("security key password", idp.security_key_password.as_deref()),
        })
    }

    fn own_sp_entity_id(&self) -> Result<Option<String>, SynthesisError> {
        let store = self.cache.store();
        let Some(inum) = store.own_sp_inum()? else {
            return Ok(None);
        };
        Ok(store
            .find_trust_relationship(&inum)?
            .and_then(|tr| tr.entity_id))
    }

    fn decrypt(&self, what: &str, value: Option<&str>) -> Option<String> {
        let value = value?;
        match self.secrets.decrypt(value) {
            Ok(plain) => Some(plain),
            Err(e) => {
                error!("Failed to decrypt {}: {}", what, e);
                None
            }
        }
    }
}

fn trust_params(
    relationships: &[TrustRelationship],
    classification: &Classification,
    layout: &IdpLayout,
) -> TrustParams {
    let trusts = classification
        .standalone
        .iter()
        .filter_map(|&i| {
            let tr = &relationships[i];
            Some(trust_view(
                tr,
                *classification.trust_ids.get(&tr.inum)?,
                classification.trust_entity_ids.get(&tr.inum)?.clone(),
                classification.trust_engine_for(tr),
            ))
        })
        .collect();

    let deconstructed = classification
        .deconstructed
        .iter()
        .filter_map(|&i| {
            let tr = &relationships[i];
            let entity_id = tr.entity_id.clone()?;
            let numeric_id = *classification.deconstructed_ids.get(&entity_id)?;
            Some(trust_view(tr, numeric_id, vec![entity_id], None))
        })
        .collect();

    TrustParams {
        idp_credentials_path: layout.credentials_dir().to_string_lossy().to_string(),
        trusts,
        trust_ids: classification.trust_ids.clone(),
        trust_entity_ids: classification.trust_entity_ids.clone(),
        deconstructed,
        deconstructed_ids: classification.deconstructed_ids.clone(),
        federations: classification.federations.clone(),
        trust_engines: classification.trust_engines.clone(),
    }
}

fn trust_view(
    tr: &TrustRelationship,
    numeric_id: u32,
    entity_ids: Vec<String>,
    engine: Option<&TrustEngine>,
) -> TrustView {
    TrustView {
        inum: tr.inum.clone(),
        id: tr.sanitized_inum(),
        numeric_id,
        display_name: tr.display_name.clone(),
        entity_ids,
        metadata_source_type: tr.metadata_source_type,
        metadata_file: tr.metadata_file_name.clone(),
        container_federation: tr.container_federation.clone(),
        released_attributes: tr
            .released_custom_attributes
            .iter()
            .map(|r| r.metadata.name.clone())
            .collect(),
        filters: tr
            .parsed_filters
            .iter()
            .filter(|f| engine.is_none() || f.name != SIGNATURE_VALIDATION)
            .map(|f| f.xml.clone())
            .collect(),
        profiles: tr.profile_configurations.values().cloned().collect(),
        trust_engine: engine.cloned(),
    }
}

/// `"a:636, b:636"` with protocol `ldaps` → `"ldaps://a:636 ldaps://b:636"`.
pub fn normalize_ldap_url(protocol: &str, servers: &str) -> String {
    servers
        .replace("=>", " ")
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|server| format!("{}://{}", protocol, server))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Remove a trailing `:port`.
pub fn strip_port(url: &str) -> &str {
    match url.rfind(':') {
        Some(i) if url[i + 1..].bytes().all(|b| b.is_ascii_digit()) => &url[..i],
        _ => url,
    }
}

/// Remove everything up to and including the first `//`.
pub fn strip_scheme(url: &str) -> &str {
    url.find("//").map_or(url, |i| &url[i + 2..])
}

pub fn derive_host(url: &str) -> String {
    strip_scheme(strip_port(url)).to_string()
}
