//! Boundary to the external directory, schema and secret services.
//!
//! The engine only talks to these traits. [`FileStore`] is a JSON snapshot of a
//! directory laid out as:
//!
//! ```text
//! <dir>/trust/<sanitized inum>.json   one trust relationship per file
//! <dir>/attributes.json               person attributes
//! <dir>/schema.json                   attribute type definitions
//! <dir>/nameid.json                   NameID configurations (optional)
//! <dir>/cas.json                      CAS protocol configuration (optional)
//! <dir>/configuration.json            own SP inum, persistence type (optional)
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{SecretError, StoreError};
use crate::model::attribute::{Attribute, CasConfiguration, NameIdConfig};
use crate::model::schema::{AttributeTypeDefinition, SchemaSnapshot};
use crate::model::trust_relationship::{remove_punctuation, TrustRelationship};

pub trait DirectoryStore {
    fn trust_relationships(&self) -> Result<Vec<TrustRelationship>, StoreError>;

    fn find_trust_relationship(&self, inum: &str) -> Result<Option<TrustRelationship>, StoreError>;

    /// Persist changes to an existing relationship.
    fn merge_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError>;

    fn add_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError>;

    /// Fresh inum not used by any stored relationship.
    fn generate_inum(&self) -> Result<String, StoreError>;

    fn person_attributes(&self) -> Result<Vec<Attribute>, StoreError>;

    fn name_id_configs(&self) -> Result<Vec<NameIdConfig>, StoreError>;

    fn cas_configuration(&self) -> Result<Option<CasConfiguration>, StoreError>;

    fn persistence_type(&self) -> Result<String, StoreError>;

    fn own_sp_inum(&self) -> Result<Option<String>, StoreError>;

    fn set_own_sp_inum(&self, inum: &str) -> Result<(), StoreError>;
}

pub trait SchemaService {
    fn schema(&self) -> Result<SchemaSnapshot, StoreError>;

    fn attribute_type_definitions<'s>(
        &self,
        snapshot: &'s SchemaSnapshot,
        names: &[&str],
    ) -> Vec<&'s AttributeTypeDefinition> {
        snapshot
            .attribute_types
            .iter()
            .filter(|t| names.iter().any(|n| t.has_name(n)))
            .collect()
    }
}

/// Decrypts secrets stored encrypted in the deployment settings.
pub trait SecretDecryptor {
    fn decrypt(&self, value: &str) -> Result<String, SecretError>;
}

/// Secrets are stored in clear text.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextSecrets;

impl SecretDecryptor for PlaintextSecrets {
    fn decrypt(&self, value: &str) -> Result<String, SecretError> {
        Ok(value.to_string())
    }
}

const TRUST_DIR: &str = "trust";
const ATTRIBUTES_FILE: &str = "attributes.json";
const SCHEMA_FILE: &str = "schema.json";
const NAME_ID_FILE: &str = "nameid.json";
const CAS_FILE: &str = "cas.json";
const CONFIGURATION_FILE: &str = "configuration.json";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StoreConfiguration {
    own_sp_inum: Option<String>,
    persistence_type: Option<String>,
}

/// Directory snapshot kept as JSON files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relationship_path(&self, inum: &str) -> PathBuf {
        self.root
            .join(TRUST_DIR)
            .join(format!("{}.json", remove_punctuation(inum)))
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T, StoreError> {
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| StoreError::Serde {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like `read_json` but a missing file yields the default value.
    fn read_optional<T: for<'de> Deserialize<'de> + Default>(
        &self,
        name: &str,
    ) -> Result<T, StoreError> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(T::default());
        }
        self.read_json(&path)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serde {
            path: path.to_path_buf(),
            source,
        })?;
        crate::files::write_atomic(path, content.as_bytes()).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn configuration(&self) -> Result<StoreConfiguration, StoreError> {
        self.read_optional(CONFIGURATION_FILE)
    }
}

impl DirectoryStore for FileStore {
    fn trust_relationships(&self) -> Result<Vec<TrustRelationship>, StoreError> {
        let pattern = self.root.join(TRUST_DIR).join("*.json");
        let mut relationships = Vec::new();
        if let Ok(entries) = glob::glob(&pattern.to_string_lossy()) {
            for entry in entries.filter_map(|e| e.ok()) {
                relationships.push(self.read_json(&entry)?);
            }
        }
        debug!(count = relationships.len(), "loaded trust relationships");
        Ok(relationships)
    }

    fn find_trust_relationship(&self, inum: &str) -> Result<Option<TrustRelationship>, StoreError> {
        let path = self.relationship_path(inum);
        if !path.exists() {
            return Ok(None);
        }
        self.read_json(&path).map(Some)
    }

    fn merge_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError> {
        let path = self.relationship_path(&relationship.inum);
        if !path.exists() {
            return Err(StoreError::NotFound(relationship.inum.clone()));
        }
        self.write_json(&path, relationship)
    }

    fn add_trust_relationship(&self, relationship: &TrustRelationship) -> Result<(), StoreError> {
        let path = self.relationship_path(&relationship.inum);
        if path.exists() {
            return Err(StoreError::Conflict(relationship.inum.clone()));
        }
        self.write_json(&path, relationship)
    }

    fn generate_inum(&self) -> Result<String, StoreError> {
        loop {
            let inum = format!(
                "{:04X}.{:04X}.{:04X}",
                rand::random::<u16>(),
                rand::random::<u16>(),
                rand::random::<u16>()
            );
            if !self.relationship_path(&inum).exists() {
                return Ok(inum);
            }
        }
    }

    fn person_attributes(&self) -> Result<Vec<Attribute>, StoreError> {
        self.read_json(&self.root.join(ATTRIBUTES_FILE))
    }

    fn name_id_configs(&self) -> Result<Vec<NameIdConfig>, StoreError> {
        self.read_optional(NAME_ID_FILE)
    }

    fn cas_configuration(&self) -> Result<Option<CasConfiguration>, StoreError> {
        self.read_optional(CAS_FILE)
    }

    fn persistence_type(&self) -> Result<String, StoreError> {
        Ok(self
            .configuration()?
            .persistence_type
            .unwrap_or_else(|| "ldap".to_string()))
    }

    fn own_sp_inum(&self) -> Result<Option<String>, StoreError> {
        Ok(self.configuration()?.own_sp_inum)
    }

    fn set_own_sp_inum(&self, inum: &str) -> Result<(), StoreError> {
        let mut configuration = self.configuration()?;
        configuration.own_sp_inum = Some(inum.to_string());
        self.write_json(&self.root.join(CONFIGURATION_FILE), &configuration)
    }
}

impl SchemaService for FileStore {
    fn schema(&self) -> Result<SchemaSnapshot, StoreError> {
        self.read_json(&self.root.join(SCHEMA_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::trust_relationship::Status;
    use tempfile::TempDir;

    fn store_with_relationship() -> (TempDir, FileStore) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(TRUST_DIR)).unwrap();
        fs::write(
            dir.path().join(TRUST_DIR).join("11110001.json"),
            r#"{"inum": "@!1111!0001", "metadataSourceType": "FILE", "metadataFileName": "a.xml"}"#,
        )
        .unwrap();
        let store = FileStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn merge_persists_status() {
        let (_dir, store) = store_with_relationship();
        let mut tr = store.find_trust_relationship("@!1111!0001").unwrap().unwrap();
        tr.status = Status::Inactive;
        store.merge_trust_relationship(&tr).unwrap();

        let all = store.trust_relationships().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, Status::Inactive);
    }

    #[test]
    fn merge_unknown_relationship_fails() {
        let (_dir, store) = store_with_relationship();
        let tr = TrustRelationship {
            inum: "@!9999".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            store.merge_trust_relationship(&tr),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn optional_files_default() {
        let (_dir, store) = store_with_relationship();
        assert!(store.name_id_configs().unwrap().is_empty());
        assert!(store.cas_configuration().unwrap().is_none());
        assert_eq!(store.persistence_type().unwrap(), "ldap");
        assert!(store.own_sp_inum().unwrap().is_none());

        store.set_own_sp_inum("@!1111!0001").unwrap();
        assert_eq!(store.own_sp_inum().unwrap().as_deref(), Some("@!1111!0001"));
    }

    #[test]
    fn schema_definitions_match_case_insensitively() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SCHEMA_FILE),
            r#"{"attributeTypes": [{"oid": "0.9.2342.19200300.100.1.3", "names": ["mail", "rfc822Mailbox"]}]}"#,
        )
        .unwrap();
        let store = FileStore::new(dir.path());
        let schema = store.schema().unwrap();
        let defs = store.attribute_type_definitions(&schema, &["MAIL"]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].oid, "0.9.2342.19200300.100.1.3");
    }
}
