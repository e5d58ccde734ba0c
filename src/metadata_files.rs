//! Lifecycle of the metadata files kept under the IDP root: relationship
//! metadata (permanent and temporary), per-relationship certificates and keys,
//! generated SP and IDP metadata, and the small IDP-side configuration files
//! that are regenerated outside a full synthesis run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{debug, info, warn};

use crate::attributes;
use crate::cache::RunCache;
use crate::config::{IdpLayout, Settings};
use crate::context::{derive_host, normalize_ldap_url};
use crate::error::SynthesisError;
use crate::fetch::{MetadataFetcher, METADATA_ACCEPT};
use crate::files;
use crate::model::trust_relationship::{
    remove_punctuation, MetadataSourceType, Status, TrustRelationship,
};
use crate::parsers::{certificate, metadata};
use crate::render::{self, TemplateService};
use crate::store::SecretDecryptor;

const SP_METADATA_SUFFIX: &str = "-sp-metadata.xml";
const OWN_SP_DISPLAY_NAME: &str = "gluu SP on configuration";
const OWN_SP_DESCRIPTION: &str = "Trust Relationship for the SP";

/// `{sanitized inum}-sp-metadata.xml`
pub fn sp_metadata_file_name(inum: &str) -> String {
    format!("{}{}", remove_punctuation(inum), SP_METADATA_SUFFIX)
}

fn artifact_base(tr: &TrustRelationship) -> String {
    sp_metadata_file_name(&tr.inum)
        .trim_end_matches(".xml")
        .to_string()
}

pub struct MetadataFiles<'a> {
    settings: &'a Settings,
    templates: &'a dyn TemplateService,
    fetcher: &'a dyn MetadataFetcher,
}

impl<'a> MetadataFiles<'a> {
    pub fn new(
        settings: &'a Settings,
        templates: &'a dyn TemplateService,
        fetcher: &'a dyn MetadataFetcher,
    ) -> Self {
        Self {
            settings,
            templates,
            fetcher,
        }
    }

    fn layout(&self) -> Result<IdpLayout, SynthesisError> {
        self.settings.layout()
    }

    pub fn metadata_file_path(&self, name: &str) -> Result<PathBuf, SynthesisError> {
        Ok(self.layout()?.metadata_dir().join(name))
    }

    pub fn temp_metadata_file_path(&self, name: &str) -> Result<PathBuf, SynthesisError> {
        Ok(self.layout()?.temp_metadata_dir().join(name))
    }

    /// Write `data` as `metadata/<name>`, replacing any previous version.
    pub fn save_metadata_file(&self, name: &str, data: &[u8]) -> Result<PathBuf, SynthesisError> {
        let path = self.metadata_file_path(name)?;
        files::write_atomic(&path, data).map_err(|e| SynthesisError::io(&path, e))?;
        info!("Saved metadata file {}", path.display());
        Ok(path)
    }

    /// Save `data` under a fresh `temp_metadata/<base><suffix>` name and return
    /// the chosen file name.
    pub fn save_temp_metadata_file(&self, base: &str, data: &[u8]) -> Result<String, SynthesisError> {
        let dir = self.layout()?.temp_metadata_dir();
        let (path, mut file) =
            files::create_unique(&dir, base).map_err(|e| SynthesisError::io(&dir, e))?;
        if let Err(e) = file.write_all(data).and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(SynthesisError::io(&path, e));
        }
        debug!(path = %path.display(), "saved temporary metadata");
        Ok(file_name(&path))
    }

    /// Download `url` into `metadata/<name>`. False when nothing was downloaded.
    pub fn save_metadata_from_uri(&self, url: &str, name: &str) -> Result<bool, SynthesisError> {
        match self.fetcher.get(url, METADATA_ACCEPT) {
            Some(data) => {
                self.save_metadata_file(name, &data)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Download `url` into a fresh temporary metadata file.
    pub fn save_temp_metadata_from_uri(
        &self,
        url: &str,
        base: &str,
    ) -> Result<Option<String>, SynthesisError> {
        match self.fetcher.get(url, METADATA_ACCEPT) {
            Some(data) => Ok(Some(self.save_temp_metadata_file(base, &data)?)),
            None => Ok(None),
        }
    }

    pub fn exists_resource_uri(&self, url: &str) -> bool {
        self.fetcher.exists(url)
    }

    /// Delete `metadata/<name>`; a missing file is not an error.
    pub fn remove_metadata_file(&self, name: &str) -> Result<(), SynthesisError> {
        let path = self.metadata_file_path(name)?;
        remove_if_exists(&path)
    }

    pub fn remove_temp_metadata_file(&self, name: &str) -> Result<(), SynthesisError> {
        let path = self.temp_metadata_file_path(name)?;
        remove_if_exists(&path)
    }

    /// The file under `metadata/` declares at least one SP entity.
    pub fn is_correct_sp_metadata_file(&self, name: &str) -> Result<bool, SynthesisError> {
        let path = self.metadata_file_path(name)?;
        Ok(read_metadata(&path)
            .and_then(|bytes| metadata::extract_sp_entity_ids(&bytes))
            .is_some_and(|ids| !ids.is_empty()))
    }

    /// The file under `metadata/` declares at least one entity of any kind.
    pub fn is_correct_metadata_file(&self, name: &str) -> Result<bool, SynthesisError> {
        let path = self.metadata_file_path(name)?;
        Ok(read_metadata(&path)
            .and_then(|bytes| metadata::extract_entity_ids(&bytes))
            .is_some_and(|ids| !ids.is_empty()))
    }

    /// The file under `metadata/` is a multi-entity federation aggregate.
    pub fn is_federation_metadata(&self, name: &str) -> Result<bool, SynthesisError> {
        let path = self.metadata_file_path(name)?;
        Ok(read_metadata(&path).is_some_and(|bytes| metadata::is_federation_aggregate(&bytes)))
    }

    /// Certificate body (without PEM delimiters) stored for a relationship.
    pub fn public_certificate(&self, tr: &TrustRelationship) -> Result<Option<String>, SynthesisError> {
        let path = self.cert_path(tr)?;
        if !path.is_file() {
            return Ok(None);
        }
        certificate::read_certificate_body(&path)
            .map_err(|e| SynthesisError::Configuration(format!("{:#}", e)))
    }

    fn cert_path(&self, tr: &TrustRelationship) -> Result<PathBuf, SynthesisError> {
        Ok(self.layout()?.ssl_dir().join(format!("{}.crt", artifact_base(tr))))
    }

    fn key_path(&self, tr: &TrustRelationship) -> Result<PathBuf, SynthesisError> {
        Ok(self.layout()?.ssl_dir().join(format!("{}.key", artifact_base(tr))))
    }

    /// Write `ssl/{sanitized inum}-sp-metadata.crt` with the PEM delimiters on
    /// their own lines.
    pub fn save_cert(&self, tr: &TrustRelationship, body: &str) -> Result<PathBuf, SynthesisError> {
        let pem_text = certificate::wrap_certificate(body);
        match certificate::parse_pem_bytes(pem_text.as_bytes()) {
            Ok(info) if info.is_expired() => warn!(
                "Certificate of {} ({}) expired on {}",
                tr.label(),
                info.subject,
                info.not_after
            ),
            Ok(_) => {}
            Err(e) => warn!("Certificate of {} is not a parsable X.509 certificate: {:#}", tr.label(), e),
        }

        let path = self.cert_path(tr)?;
        files::write_atomic(&path, pem_text.as_bytes()).map_err(|e| SynthesisError::io(&path, e))?;
        info!("Saved certificate {}", path.display());
        Ok(path)
    }

    /// Write the relationship's private key, or delete it when `key` is `None`.
    pub fn save_key(
        &self,
        tr: &TrustRelationship,
        key: Option<&str>,
    ) -> Result<Option<PathBuf>, SynthesisError> {
        let path = self.key_path(tr)?;
        let Some(key) = key else {
            remove_if_exists(&path)?;
            return Ok(None);
        };
        if let Err(e) = certificate::validate_private_key(key) {
            warn!("Private key of {} looks invalid: {:#}", tr.label(), e);
        }
        files::write_atomic(&path, key.as_bytes()).map_err(|e| SynthesisError::io(&path, e))?;
        Ok(Some(path))
    }

    /// Render SP metadata for `tr` without writing it.
    pub fn sp_metadata_content(
        &self,
        tr: &TrustRelationship,
        certificate: Option<&str>,
    ) -> Result<String, SynthesisError> {
        let url = tr.url.as_deref().map(str::trim).unwrap_or_default();
        if url.is_empty() {
            return Err(SynthesisError::Configuration(format!(
                "trust relationship {} has no SP URL",
                tr.label()
            )));
        }
        let sp_host = url.strip_suffix('/').unwrap_or(url);
        let entity_id = tr
            .entity_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| tr.sanitized_inum());

        let data = json!({
            "entity_id": entity_id,
            "certificate": certificate.map(str::trim).filter(|c| !c.is_empty()),
            "sp_host": sp_host,
            "display_name": tr.display_name,
        });
        Ok(self.templates.render(render::SP_METADATA, &data)?)
    }

    /// Generate and save SP metadata; returns the written path.
    pub fn generate_sp_metadata_file(
        &self,
        tr: &TrustRelationship,
        certificate: Option<&str>,
    ) -> Result<PathBuf, SynthesisError> {
        let text = self.sp_metadata_content(tr, certificate)?;
        let name = tr
            .metadata_file_name
            .clone()
            .unwrap_or_else(|| sp_metadata_file_name(&tr.inum));
        let path = self.metadata_file_path(&name)?;
        self.templates.write(&path, &text)?;
        info!("Generated SP metadata {}", path.display());
        Ok(path)
    }

    /// Write `metadata/idp-metadata.xml` from the IDP signing and encryption
    /// certificates.
    pub fn generate_idp_metadata(&self) -> Result<PathBuf, SynthesisError> {
        let idp = &self.settings.idp;
        let signing = read_certificate_setting("signing", idp.signing_cert.as_deref())?;
        let encryption = read_certificate_setting("encryption", idp.encryption_cert.as_deref())?;
        let org_name = &self.settings.organization.name;

        let data = json!({
            "idp_host": idp.url,
            "domain": derive_host(&idp.url),
            "org_name": org_name,
            "org_short_name": org_name,
            "signing_certificate": signing,
            "encryption_certificate": encryption,
        });
        let text = self.templates.render(render::IDP_METADATA, &data)?;
        let path = self.metadata_file_path(render::IDP_METADATA)?;
        self.templates.write(&path, &text)?;
        info!("Generated IDP metadata {}", path.display());
        Ok(path)
    }

    /// Write `conf/login.config` with the LDAP authentication settings.
    pub fn generate_idp_configuration_files(
        &self,
        secrets: &dyn SecretDecryptor,
    ) -> Result<PathBuf, SynthesisError> {
        let idp = &self.settings.idp;
        let credential = match idp.bind_password.as_deref() {
            Some(value) => secrets.decrypt(value).unwrap_or_else(|e| {
                warn!("Failed to decrypt bind password, login.config has none: {}", e);
                String::new()
            }),
            None => String::new(),
        };

        let data = json!({
            "host": normalize_ldap_url(&idp.ldap_protocol, &idp.ldap_server),
            "base": idp.base_dn,
            "service_user": idp.bind_dn,
            "service_credential": credential,
            "user_field": idp.user_fields,
        });
        let text = self.templates.render(render::LOGIN_CONFIG, &data)?;
        let path = self.layout()?.conf_dir().join(render::LOGIN_CONFIG);
        self.templates.write(&path, &text)?;
        Ok(path)
    }

    /// Write `conf/authn/oxauth-supported-principals.xml` for `acrs`.
    pub fn generate_supported_principals(&self, acrs: &[String]) -> Result<PathBuf, SynthesisError> {
        let text = self
            .templates
            .render(render::SUPPORTED_PRINCIPALS, &json!({ "acrs": acrs }))?;
        let path = self.layout()?.authn_dir().join(render::SUPPORTED_PRINCIPALS);
        self.templates.write(&path, &text)?;
        Ok(path)
    }

    /// SP-side `attribute-map.xml` for the attributes `tr` releases.
    pub fn attribute_map(
        &self,
        tr: &TrustRelationship,
        cache: &RunCache<'_>,
    ) -> Result<String, SynthesisError> {
        let released = attributes::released_attributes(tr, cache)?;
        let params = attributes::build_attribute_params(
            released.into_iter().map(|r| r.metadata),
            cache.schema()?,
            cache.schema_service(),
        )?;
        let data = serde_json::to_value(&params).map_err(|e| {
            SynthesisError::Configuration(format!("attribute map is not serializable: {}", e))
        })?;
        Ok(self.templates.render(render::ATTRIBUTE_MAP, &data)?)
    }

    /// Register the SP bundled with the IDP as a trust relationship.
    pub fn add_own_sp(&self, cache: &RunCache<'_>) -> Result<TrustRelationship, SynthesisError> {
        let store = cache.store();
        let sp = &self.settings.sp;
        let cert_path = sp.cert.as_deref().ok_or_else(|| {
            SynthesisError::Configuration("SP certificate is not configured".to_string())
        })?;
        let cert_text = fs::read_to_string(cert_path).map_err(|e| SynthesisError::io(cert_path, e))?;
        let certificate = certificate::strip_pem_delimiters(&cert_text);

        let inum = store.generate_inum()?;
        let file_name = sp_metadata_file_name(&inum);
        let mut tr = TrustRelationship {
            entity_id: Some(remove_punctuation(&inum)),
            display_name: OWN_SP_DISPLAY_NAME.to_string(),
            description: Some(OWN_SP_DESCRIPTION.to_string()),
            url: Some(sp.application_url.clone()),
            metadata_source_type: MetadataSourceType::File,
            metadata_file_name: Some(file_name.clone()),
            status: Status::Active,
            inum,
            ..Default::default()
        };

        self.generate_sp_metadata_file(&tr, Some(&certificate))?;
        if !self.is_correct_sp_metadata_file(&file_name)? {
            return Err(SynthesisError::Configuration(format!(
                "generated SP metadata {} is not valid",
                file_name
            )));
        }

        for name in &sp.attributes {
            match cache.attribute_by_name(name)? {
                Some(attribute) => tr.released_attributes.push(attribute.dn.clone()),
                None => warn!("Own SP releases unknown attribute {}", name),
            }
        }
        tr.released_custom_attributes = attributes::released_attributes(&tr, cache)?;

        store.add_trust_relationship(&tr)?;
        store.set_own_sp_inum(&tr.inum)?;
        info!(
            "Registered own SP as {}; regenerate the IDP configuration to pick it up",
            tr.label()
        );
        Ok(tr)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn remove_if_exists(path: &Path) -> Result<(), SynthesisError> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SynthesisError::io(path, e)),
    }
}

fn read_metadata(path: &Path) -> Option<Vec<u8>> {
    metadata::read_file(path)
        .map_err(|e| warn!("{}", e))
        .ok()
}

fn read_certificate_setting(what: &str, path: Option<&Path>) -> Result<String, SynthesisError> {
    let path = path.ok_or_else(|| {
        SynthesisError::Configuration(format!("IDP {} certificate is not configured", what))
    })?;
    let text = fs::read_to_string(path).map_err(|e| SynthesisError::io(path, e))?;
    Ok(certificate::strip_pem_delimiters(&text).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::{attribute_dn, MemoryStore};
    use crate::render::HandlebarsTemplates;
    use crate::store::{DirectoryStore, PlaintextSecrets};
    use std::cell::RefCell;
    use tempfile::TempDir;

    const CERT_BODY: &str = "MIIBszCCAVmgAwIBAgIUQ2VydA==";

    #[derive(Default)]
    struct StubFetcher {
        body: Option<Vec<u8>>,
        requested: RefCell<Vec<String>>,
    }

    impl MetadataFetcher for StubFetcher {
        fn get(&self, url: &str, accept: &str) -> Option<Vec<u8>> {
            assert_eq!(accept, METADATA_ACCEPT);
            self.requested.borrow_mut().push(url.to_string());
            self.body.clone()
        }

        fn exists(&self, _url: &str) -> bool {
            self.body.is_some()
        }
    }

    struct Fixture {
        dir: TempDir,
        settings: Settings,
        templates: HandlebarsTemplates,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.idp.root_dir = Some(dir.path().join("idp"));
        settings.idp.url = "https://idp.example.org".to_string();
        Fixture {
            dir,
            settings,
            templates: HandlebarsTemplates::new().unwrap(),
        }
    }

    fn relationship() -> TrustRelationship {
        TrustRelationship {
            inum: "@!1234.AB".to_string(),
            display_name: "Wiki".to_string(),
            entity_id: Some("https://wiki.example.org/shibboleth".to_string()),
            url: Some("https://wiki.example.org/".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn sp_metadata_round_trip() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        let tr = relationship();

        let path = files.generate_sp_metadata_file(&tr, Some(CERT_BODY)).unwrap();
        assert_eq!(file_name(&path), "1234AB-sp-metadata.xml");

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("https://wiki.example.org/Shibboleth.sso/SAML2/POST\""));
        assert!(text.contains(CERT_BODY));
        assert_eq!(
            metadata::extract_sp_entity_ids(text.as_bytes()).unwrap(),
            vec!["https://wiki.example.org/shibboleth"]
        );
        assert!(files.is_correct_sp_metadata_file("1234AB-sp-metadata.xml").unwrap());
        assert!(!files.is_federation_metadata("1234AB-sp-metadata.xml").unwrap());
    }

    #[test]
    fn sp_metadata_requires_url() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        let mut tr = relationship();
        tr.url = None;
        assert!(matches!(
            files.sp_metadata_content(&tr, None),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn missing_root_is_configuration_error() {
        let mut fx = fixture();
        fx.settings.idp.root_dir = None;
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        assert!(matches!(
            files.save_metadata_file("a.xml", b"<x/>"),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn temp_files_get_distinct_names() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);

        let a = files.save_temp_metadata_file("upload.xml", b"one").unwrap();
        let b = files.save_temp_metadata_file("upload.xml", b"two").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("upload.xml"));
        assert_eq!(
            fs::read(files.temp_metadata_file_path(&b).unwrap()).unwrap(),
            b"two"
        );

        files.remove_temp_metadata_file(&a).unwrap();
        assert!(!files.temp_metadata_file_path(&a).unwrap().exists());
    }

    #[test]
    fn download_saves_body() {
        let fx = fixture();
        let fetcher = StubFetcher {
            body: Some(
                br#"<EntitiesDescriptor><EntityDescriptor entityID="a"/><EntityDescriptor entityID="b"/></EntitiesDescriptor>"#
                    .to_vec(),
            ),
            ..Default::default()
        };
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);

        assert!(files
            .save_metadata_from_uri("https://fed.example.org/md.xml", "fed.xml")
            .unwrap());
        assert_eq!(fetcher.requested.borrow().len(), 1);
        assert!(files.is_correct_metadata_file("fed.xml").unwrap());
        assert!(files.is_federation_metadata("fed.xml").unwrap());
        assert!(!files.is_correct_sp_metadata_file("fed.xml").unwrap());

        files.remove_metadata_file("fed.xml").unwrap();
        files.remove_metadata_file("fed.xml").unwrap();
        assert!(!files.is_correct_metadata_file("fed.xml").unwrap());
    }

    #[test]
    fn failed_download_saves_nothing() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        assert!(!files.save_metadata_from_uri("https://down", "x.xml").unwrap());
        assert!(files.save_temp_metadata_from_uri("https://down", "x").unwrap().is_none());
        assert!(!files.metadata_file_path("x.xml").unwrap().exists());
        assert!(!files.exists_resource_uri("https://down"));
    }

    #[test]
    fn certificate_and_key_artifacts() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        let tr = relationship();

        let cert = files.save_cert(&tr, CERT_BODY).unwrap();
        assert_eq!(
            cert,
            fx.dir.path().join("idp").join("ssl").join("1234AB-sp-metadata.crt")
        );
        assert_eq!(
            fs::read_to_string(&cert).unwrap(),
            format!(
                "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
                CERT_BODY
            )
        );
        assert_eq!(files.public_certificate(&tr).unwrap().as_deref(), Some(CERT_BODY));

        let key = files.save_key(&tr, Some("not a key")).unwrap().unwrap();
        assert!(key.is_file());
        assert!(files.save_key(&tr, None).unwrap().is_none());
        assert!(!key.exists());
    }

    #[test]
    fn idp_metadata_strips_pem_delimiters() {
        let mut fx = fixture();
        let signing = fx.dir.path().join("signing.crt");
        let encryption = fx.dir.path().join("encryption.crt");
        fs::write(&signing, format!("-----BEGIN CERTIFICATE-----\nSIGN{}\n-----END CERTIFICATE-----\n", CERT_BODY)).unwrap();
        fs::write(&encryption, format!("-----BEGIN CERTIFICATE-----\nENC{}\n-----END CERTIFICATE-----\n", CERT_BODY)).unwrap();
        fx.settings.idp.signing_cert = Some(signing);
        fx.settings.idp.encryption_cert = Some(encryption);
        fx.settings.organization.name = "Example Org".to_string();

        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        let path = files.generate_idp_metadata().unwrap();
        let text = fs::read_to_string(path).unwrap();

        assert!(text.contains(&format!("SIGN{}", CERT_BODY)));
        assert!(text.contains(&format!("ENC{}", CERT_BODY)));
        assert!(!text.contains("BEGIN CERTIFICATE"));
        assert!(text.contains("<shibmd:Scope regexp=\"false\">idp.example.org</shibmd:Scope>"));
    }

    #[test]
    fn idp_metadata_needs_certificates() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        assert!(matches!(
            files.generate_idp_metadata(),
            Err(SynthesisError::Configuration(_))
        ));
    }

    #[test]
    fn login_config_and_principals() {
        let mut fx = fixture();
        fx.settings.idp.ldap_protocol = "ldaps".to_string();
        fx.settings.idp.ldap_server = "ldap.example.org:1636".to_string();
        fx.settings.idp.base_dn = Some("o=gluu".to_string());
        fx.settings.idp.bind_password = Some("secret".to_string());
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);

        let login = files.generate_idp_configuration_files(&PlaintextSecrets).unwrap();
        let text = fs::read_to_string(&login).unwrap();
        assert!(text.contains("ldaps://ldap.example.org:1636"));
        assert!(text.contains("secret"));

        let principals = files
            .generate_supported_principals(&["u2f".to_string(), "otp".to_string()])
            .unwrap();
        assert!(principals.ends_with("conf/authn/oxauth-supported-principals.xml"));
        let text = fs::read_to_string(principals).unwrap();
        assert!(text.contains("u2f") && text.contains("otp"));
    }

    #[test]
    fn attribute_map_lists_released_attributes() {
        let fx = fixture();
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);
        let store = MemoryStore::with_attributes(&[("mail", "0.9.2342.19200300.100.1.3")]);
        let cache = RunCache::new(&store, &store);

        let mut tr = relationship();
        tr.released_attributes = vec![attribute_dn("mail")];
        let text = files.attribute_map(&tr, &cache).unwrap();
        assert!(text.contains("urn:oid:0.9.2342.19200300.100.1.3"));

        tr.released_attributes.push(attribute_dn("nope"));
        assert!(matches!(
            files.attribute_map(&tr, &cache),
            Err(SynthesisError::AttributeResolution(_))
        ));
    }

    #[test]
    fn own_sp_is_registered() {
        let mut fx = fixture();
        let cert = fx.dir.path().join("sp.crt");
        fs::write(&cert, format!("-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n", CERT_BODY)).unwrap();
        fx.settings.sp.cert = Some(cert);
        fx.settings.sp.application_url = "https://idp.example.org".to_string();
        fx.settings.sp.attributes = vec!["uid".to_string(), "unknown".to_string()];

        let store = MemoryStore::with_attributes(&[("uid", "0.9.2342.19200300.100.1.1")]);
        let cache = RunCache::new(&store, &store);
        let fetcher = StubFetcher::default();
        let files = MetadataFiles::new(&fx.settings, &fx.templates, &fetcher);

        let tr = files.add_own_sp(&cache).unwrap();
        assert_eq!(tr.released_attributes, vec![attribute_dn("uid")]);
        assert_eq!(tr.entity_id.as_deref(), Some(tr.sanitized_inum().as_str()));
        assert_eq!(store.own_sp_inum().unwrap(), Some(tr.inum.clone()));
        assert!(store.find_trust_relationship(&tr.inum).unwrap().is_some());

        let name = sp_metadata_file_name(&tr.inum);
        assert!(files.is_correct_sp_metadata_file(&name).unwrap());
        let text = fs::read_to_string(files.metadata_file_path(&name).unwrap()).unwrap();
        assert!(text.contains(CERT_BODY));
    }
}
