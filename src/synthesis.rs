use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::cache::RunCache;
use crate::config::Settings;
use crate::context::ContextBuilder;
use crate::error::SynthesisError;
use crate::model::trust_relationship::TrustRelationship;
use crate::render::{self, TemplateService};
use crate::result::{ArtifactRecord, GroupSummary, ReportItem, Stage, SynthesisReport};
use crate::store::{DirectoryStore, SchemaService, SecretDecryptor};

pub const LOCK_FILE: &str = ".shibsynth.lock";

/// Artifacts written under `{idp root}/conf`, in write order.
const IDP_ARTIFACTS: &[&str] = &[
    render::METADATA_PROVIDERS,
    render::ATTRIBUTE_RESOLVER,
    render::ATTRIBUTE_FILTER,
    render::RELYING_PARTY,
    render::CAS_PROTOCOL,
    render::SAML_NAMEID,
    render::SAML_NAMEID_PROPERTIES,
];

/// Exclusive claim on an IDP root, released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Claim `root`. A lock whose recorded holder is no longer running is
    /// taken over once.
    pub fn acquire(root: &Path) -> Result<Self, SynthesisError> {
        fs::create_dir_all(root).map_err(|e| SynthesisError::io(root, e))?;
        let path = root.join(LOCK_FILE);

        match Self::create(&path) {
            Err(SynthesisError::Locked(_)) if Self::is_stale(&path) => {
                warn!("Taking over stale lock {}", path.display());
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(SynthesisError::io(&path, e)),
                }
                Self::create(&path)
            }
            result => result,
        }
    }

    fn create(path: &Path) -> Result<Self, SynthesisError> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(SynthesisError::Locked(path.to_path_buf()));
            }
            Err(e) => return Err(SynthesisError::io(path, e)),
        };
        let lock = Self {
            path: path.to_path_buf(),
        };
        // Stale detection reads this back; a lock without a pid is never taken over.
        writeln!(file, "{}", std::process::id())
            .and_then(|_| file.sync_all())
            .map_err(|e| SynthesisError::io(path, e))?;
        Ok(lock)
    }

    /// The recorded holder pid, when it parses.
    fn holder(path: &Path) -> Option<u32> {
        fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    fn is_stale(path: &Path) -> bool {
        match Self::holder(path) {
            Some(pid) => pid != std::process::id() && !process_alive(pid),
            None => false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("Failed to release lock {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without procfs there is no portable liveness check; keep the lock.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

struct PlannedArtifact {
    name: &'static str,
    path: PathBuf,
}

/// Drives one synthesis run: lock, build the context, render every artifact,
/// then write them.
pub struct Synthesizer<'a> {
    settings: &'a Settings,
    store: &'a dyn DirectoryStore,
    schema: &'a dyn SchemaService,
    secrets: &'a dyn SecretDecryptor,
    templates: &'a dyn TemplateService,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        settings: &'a Settings,
        store: &'a dyn DirectoryStore,
        schema: &'a dyn SchemaService,
        secrets: &'a dyn SecretDecryptor,
        templates: &'a dyn TemplateService,
    ) -> Self {
        Self {
            settings,
            store,
            schema,
            secrets,
            templates,
        }
    }

    /// Generate the full artifact set from every relationship in the store.
    pub fn generate_configuration_files(&self) -> SynthesisReport {
        match self.store.trust_relationships() {
            Ok(relationships) => self.generate_configuration_files_for(relationships),
            Err(e) => {
                let e = SynthesisError::from(e);
                error!("Failed to load trust relationships: {}", e);
                let mut report = SynthesisReport::new(self.settings.idp.root_dir.clone());
                report.fail(&e);
                report
            }
        }
    }

    /// Generate the full artifact set from `relationships`. Inactive
    /// relationships are ignored.
    pub fn generate_configuration_files_for(
        &self,
        relationships: Vec<TrustRelationship>,
    ) -> SynthesisReport {
        let mut report = SynthesisReport::new(self.settings.idp.root_dir.clone());
        if let Err(e) = self.run(relationships, &mut report) {
            error!("Configuration generation failed: {}", e);
            report.fail(&e);
        }
        report
    }

    #[tracing::instrument(skip_all)]
    fn run(
        &self,
        mut relationships: Vec<TrustRelationship>,
        report: &mut SynthesisReport,
    ) -> Result<(), SynthesisError> {
        let layout = self.settings.layout()?;
        let _lock = RunLock::acquire(layout.root())?;

        relationships.retain(TrustRelationship::is_active);
        relationships.sort_by(|a, b| a.inum.cmp(&b.inum));
        info!("Generating configuration for {} active relationship(s)", relationships.len());

        let cache = RunCache::new(self.store, self.schema);
        let builder = ContextBuilder::new(self.settings, &cache, self.secrets);
        let context = builder.build(&mut relationships, &mut report.items)?;
        report.context_built = true;
        report.groups = context
            .groups()
            .iter()
            .map(|g| GroupSummary {
                name: g.name().to_string(),
                description: g.describe(),
            })
            .collect();

        let data = serde_json::to_value(&context).map_err(|e| {
            SynthesisError::Configuration(format!("configuration context is not serializable: {}", e))
        })?;

        let mut planned: Vec<PlannedArtifact> = IDP_ARTIFACTS
            .iter()
            .map(|&name| PlannedArtifact {
                name,
                path: layout.conf_dir().join(name),
            })
            .collect();
        match &self.settings.sp.conf_dir {
            Some(dir) => planned.push(PlannedArtifact {
                name: render::SHIBBOLETH2,
                path: dir.join(render::SHIBBOLETH2),
            }),
            None => report.items.push(ReportItem::skipped(
                Stage::Render,
                render::SHIBBOLETH2,
                "SP configuration folder is not defined",
            )),
        }

        // Nothing is written unless every artifact renders.
        let mut rendered = Vec::with_capacity(planned.len());
        for artifact in planned {
            let text = self.templates.render(artifact.name, &data)?;
            report.artifacts.push(ArtifactRecord {
                name: artifact.name.to_string(),
                path: artifact.path.clone(),
                written: false,
            });
            rendered.push((artifact, text));
        }

        for (index, (artifact, text)) in rendered.iter().enumerate() {
            self.templates.write(&artifact.path, text)?;
            report.artifacts[index].written = true;
            report
                .items
                .push(ReportItem::ok(Stage::Write, artifact.name, &artifact.path.display().to_string()));
        }

        report.complete = true;
        info!("Wrote {} configuration artifact(s)", report.artifacts.len());
        Ok(())
    }
}
