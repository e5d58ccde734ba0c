use std::collections::{BTreeMap, HashMap};

use tracing::{debug, error, warn};

use crate::cache::RunCache;
use crate::error::{AttributeResolutionError, SchemaLookupError, StoreError, SynthesisError};
use crate::model::attribute::Attribute;
use crate::model::context::AttributeParams;
use crate::model::schema::SchemaSnapshot;
use crate::model::trust_relationship::{ReleasedAttribute, TrustRelationship};
use crate::result::{ItemOutcome, ReportItem, Stage};
use crate::schema::SchemaResolver;
use crate::store::SchemaService;

pub const UID: &str = "uid";
const GLUU_ATTRIBUTE_DEF_PREFIX: &str = "urn:gluu:dir:attribute-def:";

/// Resolve every relationship's released attribute DNs, with uid moved first.
///
/// A relationship that releases an unknown DN releases nothing this run.
pub fn init_attributes(
    relationships: &mut [TrustRelationship],
    cache: &RunCache<'_>,
) -> Result<Vec<ReportItem>, StoreError> {
    let by_dn = cache.attributes_by_dn()?;
    let uid_dn = cache.attribute_by_name(UID)?.map(|a| a.dn.as_str());
    let mut items = Vec::new();

    for tr in relationships.iter_mut() {
        let released = pin_uid(&tr.released_attributes, uid_dn);
        let outcome = match resolve_released(&tr.inum, &released, &by_dn) {
            Ok(resolved) => ItemOutcome::Ok(resolved),
            Err(e) => {
                warn!("{}", e);
                ItemOutcome::Skipped(e.to_string())
            }
        };
        items.push(ReportItem::from_outcome(
            Stage::Attributes,
            &tr.label(),
            &outcome,
            &format!("{} attribute(s) released", released.len()),
        ));
        tr.released_custom_attributes = match outcome {
            ItemOutcome::Ok(resolved) => resolved,
            _ => Vec::new(),
        };
    }

    Ok(items)
}

/// Released attributes of a single relationship; an unknown DN is an error.
pub fn released_attributes(
    tr: &TrustRelationship,
    cache: &RunCache<'_>,
) -> Result<Vec<ReleasedAttribute>, SynthesisError> {
    let by_dn = cache.attributes_by_dn()?;
    let uid_dn = cache.attribute_by_name(UID)?.map(|a| a.dn.as_str());
    let released = pin_uid(&tr.released_attributes, uid_dn);
    Ok(resolve_released(&tr.inum, &released, &by_dn)?)
}

fn pin_uid(dns: &[String], uid_dn: Option<&str>) -> Vec<String> {
    let mut released = dns.to_vec();
    if let Some(pos) = uid_dn.and_then(|uid| released.iter().position(|dn| dn == uid)) {
        let dn = released.remove(pos);
        released.insert(0, dn);
    }
    released
}

fn resolve_released(
    inum: &str,
    dns: &[String],
    by_dn: &HashMap<&str, &Attribute>,
) -> Result<Vec<ReleasedAttribute>, AttributeResolutionError> {
    dns.iter()
        .map(|dn| {
            by_dn
                .get(dn.as_str())
                .map(|attribute| ReleasedAttribute {
                    dn: dn.clone(),
                    metadata: (*attribute).clone(),
                })
                .ok_or_else(|| AttributeResolutionError::UnknownAttribute {
                    relationship: inum.to_string(),
                    dn: dn.clone(),
                })
        })
        .collect()
}

/// Build the name → SAML1/SAML2 URI maps for an attribute set.
///
/// Either both maps cover every attribute or the whole map fails.
pub fn build_attribute_params(
    attributes: impl IntoIterator<Item = Attribute>,
    snapshot: &SchemaSnapshot,
    schema_service: &dyn SchemaService,
) -> Result<AttributeParams, AttributeResolutionError> {
    let mut unique: BTreeMap<String, Attribute> = BTreeMap::new();
    for attribute in attributes {
        unique.entry(attribute.name.clone()).or_insert(attribute);
    }

    let names: Vec<&str> = unique.keys().map(String::as_str).collect();
    let definitions = SchemaSnapshot {
        attribute_types: schema_service
            .attribute_type_definitions(snapshot, &names)
            .into_iter()
            .cloned()
            .collect(),
    };
    let resolver = SchemaResolver::new(&definitions);

    let mut saml1_uris = BTreeMap::new();
    let mut saml2_uris = BTreeMap::new();
    for (name, attribute) in &unique {
        saml1_uris.insert(name.clone(), saml1_uri(attribute));
        let saml2 = saml2_uri(attribute, &resolver).inspect_err(|e| {
            error!("Failed to get OID for attribute name {}: {}", name, e);
        })?;
        saml2_uris.insert(name.clone(), saml2);
    }

    debug!(count = unique.len(), "built attribute URI maps");
    Ok(AttributeParams {
        attributes: unique.into_values().collect(),
        saml1_uris,
        saml2_uris,
    })
}

pub fn saml1_uri(attribute: &Attribute) -> String {
    if let Some(uri) = non_empty(attribute.saml1_uri.as_deref()) {
        return uri.to_string();
    }
    let urn = attribute.urn.as_deref().unwrap_or_default();
    let gluu =
        attribute.custom || urn.is_empty() || urn.starts_with(GLUU_ATTRIBUTE_DEF_PREFIX);
    format!(
        "urn:{}:dir:attribute-def:{}",
        if gluu { "gluu" } else { "mace" },
        attribute.name
    )
}

pub fn saml2_uri(
    attribute: &Attribute,
    resolver: &SchemaResolver<'_>,
) -> Result<String, SchemaLookupError> {
    if let Some(uri) = non_empty(attribute.saml2_uri.as_deref()) {
        return Ok(uri.to_string());
    }
    Ok(format!("urn:oid:{}", resolver.resolve_oid(&attribute.name)?))
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
