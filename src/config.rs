use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::SynthesisError;

const IDP_CONF_FOLDER: &str = "conf";
const IDP_AUTHN_FOLDER: &str = "authn";
pub const IDP_METADATA_FOLDER: &str = "metadata";
pub const IDP_TEMP_METADATA_FOLDER: &str = "temp_metadata";
const IDP_CREDENTIALS_FOLDER: &str = "credentials";
const GENERATED_SSL_ARTIFACTS_DIR: &str = "ssl";

/// Deployment settings, loaded from `shibsynth.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub idp: IdpSettings,
    pub sp: SpSettings,
    pub organization: OrganizationSettings,
    pub metadata_fetch: FetchSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdpSettings {
    /// Shibboleth IDP installation root. Nothing is generated without it.
    pub root_dir: Option<PathBuf>,
    pub url: String,
    /// Whitespace or comma separated `host:port` list.
    pub ldap_server: String,
    pub ldap_protocol: String,
    pub bind_dn: Option<String>,
    /// Encrypted; decrypted through the configured secret capability.
    pub bind_password: Option<String>,
    pub security_key: Option<String>,
    pub security_cert: Option<String>,
    pub security_key_password: Option<String>,
    pub signing_cert: Option<PathBuf>,
    pub encryption_cert: Option<PathBuf>,
    pub user_fields: Option<String>,
    pub base_dn: Option<String>,
    pub shibboleth_version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SpSettings {
    /// Where the SP-side `shibboleth2.xml` is written.
    pub conf_dir: Option<PathBuf>,
    pub application_url: String,
    /// Certificate of the SP bundled with the IDP.
    pub cert: Option<PathBuf>,
    /// Attribute names released to the bundled SP.
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OrganizationSettings {
    /// Organization identifier; `gluu` when unset.
    pub inum: Option<String>,
    pub name: String,
    pub support_email: Option<String>,
    pub crypto_salt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Accept any TLS certificate when downloading metadata.
    pub accept_invalid_certs: bool,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// IDP directory layout; fails when the IDP root is not configured.
    pub fn layout(&self) -> Result<IdpLayout, SynthesisError> {
        self.idp
            .root_dir
            .as_deref()
            .map(IdpLayout::new)
            .ok_or_else(|| {
                SynthesisError::Configuration("IDP root folder is not defined".to_string())
            })
    }

    pub fn is_idp_installed(&self) -> bool {
        self.idp
            .shibboleth_version
            .as_deref()
            .is_some_and(|v| !v.is_empty())
    }
}

/// Paths inside a Shibboleth IDP installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpLayout {
    root: PathBuf,
}

impl IdpLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(IDP_CONF_FOLDER)
    }

    pub fn authn_dir(&self) -> PathBuf {
        self.conf_dir().join(IDP_AUTHN_FOLDER)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(IDP_METADATA_FOLDER)
    }

    pub fn temp_metadata_dir(&self) -> PathBuf {
        self.root.join(IDP_TEMP_METADATA_FOLDER)
    }

    pub fn credentials_dir(&self) -> PathBuf {
        self.metadata_dir().join(IDP_CREDENTIALS_FOLDER)
    }

    pub fn ssl_dir(&self) -> PathBuf {
        self.root.join(GENERATED_SSL_ARTIFACTS_DIR)
    }
}
