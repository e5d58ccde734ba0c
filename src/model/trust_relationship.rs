use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attribute::Attribute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataSourceType {
    #[default]
    File,
    Uri,
    Federation,
}

impl MetadataSourceType {
    /// FILE and URI relationships own their metadata; everything else inherits it.
    pub fn is_standalone(self) -> bool {
        matches!(self, MetadataSourceType::File | MetadataSourceType::Uri)
    }
}

impl std::fmt::Display for MetadataSourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataSourceType::File => write!(f, "FILE"),
            MetadataSourceType::Uri => write!(f, "URI"),
            MetadataSourceType::Federation => write!(f, "FEDERATION"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

/// A configured federation partner, as stored in the directory.
///
/// The `#[serde(skip)]` fields are materialized during a synthesis run and are
/// never written back to the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustRelationship {
    pub inum: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Base URL of the SP, used when generating SP metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata_source_type: MetadataSourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
    /// Released attribute DNs, in display order.
    #[serde(default)]
    pub released_attributes: Vec<String>,
    /// Stored profile configuration blob (JSON array).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_configuration: Option<String>,
    /// Stored metadata filter blobs (one XML element each).
    #[serde(default)]
    pub metadata_filters: Vec<String>,
    #[serde(default)]
    pub status: Status,
    /// Inum of the federation this relationship was deconstructed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_federation: Option<String>,

    #[serde(skip)]
    pub released_custom_attributes: Vec<ReleasedAttribute>,
    #[serde(skip)]
    pub parsed_filters: Vec<MetadataFilter>,
    #[serde(skip)]
    pub profile_configurations: BTreeMap<String, ProfileConfiguration>,
}

impl TrustRelationship {
    pub fn sanitized_inum(&self) -> String {
        remove_punctuation(&self.inum)
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }

    /// Parsed filter registered under `name` (e.g. `signatureValidation`).
    pub fn filter(&self, name: &str) -> Option<&MetadataFilter> {
        self.parsed_filters.iter().find(|f| f.name == name)
    }

    pub fn label(&self) -> String {
        if self.display_name.is_empty() {
            self.inum.clone()
        } else {
            format!("{} ({})", self.display_name, self.inum)
        }
    }
}

/// Released attribute resolved against the run's attribute set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedAttribute {
    pub dn: String,
    pub metadata: Attribute,
}

/// A parsed `<MetadataFilter>` blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataFilter {
    /// Lower camel case of the filter type, e.g. `signatureValidation`.
    pub name: String,
    /// Value of the `xsi:type` discriminator.
    pub filter_type: String,
    /// File name of the certificate used by signature validation filters.
    pub certificate_file: Option<String>,
    /// Original XML, passed through to the rendered providers file.
    pub xml: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileConfiguration {
    pub name: String,
    pub include_attribute_statement: bool,
    /// Assertion lifetime in milliseconds.
    pub assertion_lifetime: u64,
    pub sign_responses: String,
    pub sign_assertions: String,
    pub sign_requests: String,
    pub encrypt_assertions: String,
    pub encrypt_name_ids: String,
    pub default_authentication_method: Option<String>,
    pub name_id_format_precedence: Vec<String>,
}

impl Default for ProfileConfiguration {
    fn default() -> Self {
        Self {
            name: String::new(),
            include_attribute_statement: true,
            assertion_lifetime: 300_000,
            sign_responses: "conditional".to_string(),
            sign_assertions: "never".to_string(),
            sign_requests: "conditional".to_string(),
            encrypt_assertions: "conditional".to_string(),
            encrypt_name_ids: "never".to_string(),
            default_authentication_method: None,
            name_id_format_precedence: Vec::new(),
        }
    }
}

/// Strip ASCII punctuation, as used for inum-derived file names and ids.
pub fn remove_punctuation(value: &str) -> String {
    value.chars().filter(|c| !c.is_ascii_punctuation()).collect()
}
