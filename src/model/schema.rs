use serde::{Deserialize, Serialize};

/// Immutable copy of the directory schema, fetched once per synthesis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaSnapshot {
    pub attribute_types: Vec<AttributeTypeDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttributeTypeDefinition {
    pub oid: String,
    pub names: Vec<String>,
}

impl AttributeTypeDefinition {
    /// LDAP attribute type names compare case-insensitively.
    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }
}
