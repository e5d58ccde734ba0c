use std::collections::BTreeMap;
use tracing::warn;

use crate::model::trust_relationship::ProfileConfiguration;

/// Parse a stored profile configuration blob (a JSON array of profiles) into
/// a map keyed by profile name, e.g. `SAML2SSO`.
pub fn parse_str(json: &str) -> Result<BTreeMap<String, ProfileConfiguration>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let profiles: Vec<ProfileConfiguration> = serde_json::from_str(json)?;
    let mut by_name = BTreeMap::new();
    for profile in profiles {
        if profile.name.is_empty() {
            warn!("Ignoring profile configuration without a name");
            continue;
        }
        by_name.insert(profile.name.clone(), profile);
    }
    Ok(by_name)
}
