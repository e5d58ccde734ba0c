use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{RenderError, WriteError};

pub const METADATA_PROVIDERS: &str = "metadata-providers.xml";
pub const ATTRIBUTE_RESOLVER: &str = "attribute-resolver.xml";
pub const ATTRIBUTE_FILTER: &str = "attribute-filter.xml";
pub const RELYING_PARTY: &str = "relying-party.xml";
pub const CAS_PROTOCOL: &str = "cas-protocol.xml";
pub const SAML_NAMEID: &str = "saml-nameid.xml";
pub const SAML_NAMEID_PROPERTIES: &str = "saml-nameid.properties";
pub const SHIBBOLETH2: &str = "shibboleth2.xml";
pub const IDP_METADATA: &str = "idp-metadata.xml";
pub const SP_METADATA: &str = "sp-metadata.xml";
pub const ATTRIBUTE_MAP: &str = "attribute-map.xml";
pub const LOGIN_CONFIG: &str = "login.config";
pub const SUPPORTED_PRINCIPALS: &str = "oxauth-supported-principals.xml";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (METADATA_PROVIDERS, include_str!("../templates/metadata-providers.xml.hbs")),
    (ATTRIBUTE_RESOLVER, include_str!("../templates/attribute-resolver.xml.hbs")),
    (ATTRIBUTE_FILTER, include_str!("../templates/attribute-filter.xml.hbs")),
    (RELYING_PARTY, include_str!("../templates/relying-party.xml.hbs")),
    (CAS_PROTOCOL, include_str!("../templates/cas-protocol.xml.hbs")),
    (SAML_NAMEID, include_str!("../templates/saml-nameid.xml.hbs")),
    (SAML_NAMEID_PROPERTIES, include_str!("../templates/saml-nameid.properties.hbs")),
    (SHIBBOLETH2, include_str!("../templates/shibboleth2.xml.hbs")),
    (IDP_METADATA, include_str!("../templates/idp-metadata.xml.hbs")),
    (SP_METADATA, include_str!("../templates/sp-metadata.xml.hbs")),
    (ATTRIBUTE_MAP, include_str!("../templates/attribute-map.xml.hbs")),
    (LOGIN_CONFIG, include_str!("../templates/login.config.hbs")),
    (SUPPORTED_PRINCIPALS, include_str!("../templates/oxauth-supported-principals.xml.hbs")),
];

const PROFILE_PARTIAL: (&str, &str) = (
    "profile",
    include_str!("../templates/relying-party-profile.hbs"),
);

/// Renders named templates and persists the results.
pub trait TemplateService {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError>;

    /// Write `text` to `path`, replacing it atomically.
    fn write(&self, path: &Path, text: &str) -> Result<(), WriteError> {
        crate::files::write_atomic(path, text.as_bytes()).map_err(|source| WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), bytes = text.len(), "wrote artifact");
        Ok(())
    }
}

handlebars_helper!(ms_duration: |ms: u64| format!("PT{}S", ms / 1000));
handlebars_helper!(join: |values: array, sep: str| {
    values
        .iter()
        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
        .collect::<Vec<_>>()
        .join(sep)
});

/// Handlebars registry with the built-in templates, optionally overridden by
/// `<name>.hbs` files from a directory.
pub struct HandlebarsTemplates {
    registry: Handlebars<'static>,
}

impl HandlebarsTemplates {
    pub fn new() -> Result<Self, RenderError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(|s| quick_xml::escape::escape(s).into_owned());
        registry.register_helper("ms_duration", Box::new(ms_duration));
        registry.register_helper("join", Box::new(join));
        registry
            .register_partial(PROFILE_PARTIAL.0, PROFILE_PARTIAL.1)
            .map_err(|e| RenderError {
                template: PROFILE_PARTIAL.0.to_string(),
                message: e.to_string(),
            })?;

        for (name, source) in BUILTIN_TEMPLATES {
            registry
                .register_template_string(name, *source)
                .map_err(|e| RenderError {
                    template: name.to_string(),
                    message: e.to_string(),
                })?;
        }
        Ok(Self { registry })
    }

    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        let mut templates = Self::new()?;
        for (name, _) in BUILTIN_TEMPLATES {
            let path = dir.join(format!("{}.hbs", name));
            if !path.is_file() {
                continue;
            }
            templates
                .registry
                .register_template_file(name, &path)
                .map_err(|e| RenderError {
                    template: name.to_string(),
                    message: e.to_string(),
                })?;
            info!("Using template override {}", path.display());
        }
        Ok(templates)
    }
}

impl TemplateService for HandlebarsTemplates {
    fn render(&self, template: &str, data: &Value) -> Result<String, RenderError> {
        self.registry
            .render(template, data)
            .map_err(|e| RenderError {
                template: template.to_string(),
                message: e.to_string(),
            })
    }
}
