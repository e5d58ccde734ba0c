mod cli;
mod output;
mod rc_config;
mod watch;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser;
use colored::control;
use tracing::warn;
use tracing_subscriber::{filter::LevelFilter, prelude::*};

use shibsynth::cache::RunCache;
use shibsynth::error::StoreError;
use shibsynth::fetch::HttpFetcher;
use shibsynth::metadata_files::{sp_metadata_file_name, MetadataFiles};
use shibsynth::model::trust_relationship::TrustRelationship;
use shibsynth::parsers::{certificate, metadata};
use shibsynth::render::{self, HandlebarsTemplates};
use shibsynth::store::{DirectoryStore, FileStore, PlaintextSecrets};
use shibsynth::{Settings, SynthesisError, Synthesizer};

use cli::{Cli, Command};
use output::OutputFormat;
use rc_config::RcConfig;

const SETTINGS_FILE: &str = "shibsynth.toml";

/// Command-line flags merged with `.shibsynthrc` defaults.
struct Options {
    store_dir: PathBuf,
    config: Option<PathBuf>,
    idp_root: Option<PathBuf>,
    templates: Option<PathBuf>,
    insecure_tls: bool,
    verbose: bool,
    format: OutputFormat,
}

/// Everything a command needs, loaded fresh for every run.
struct Tools {
    settings: Settings,
    store: FileStore,
    templates: HandlebarsTemplates,
    fetcher: HttpFetcher,
}

fn main() {
    let cli = Cli::parse();

    let store_dir = if cli.store.is_absolute() {
        cli.store.clone()
    } else {
        std::env::current_dir()
            .unwrap_or_default()
            .join(&cli.store)
    };

    if !store_dir.is_dir() {
        eprintln!("Error: '{}' is not a directory", store_dir.display());
        process::exit(2);
    }

    let rc = RcConfig::load(&store_dir);
    let verbosity = cli.verbose.max(rc.verbose.unwrap_or(0));
    init_logging(verbosity);

    if cli.no_color || rc.no_color.unwrap_or(false) {
        control::set_override(false);
    }

    let options = Options {
        store_dir,
        config: cli.config.clone(),
        idp_root: cli.idp_root.clone(),
        templates: cli.templates.clone().or(rc.templates),
        insecure_tls: cli.insecure_tls || rc.insecure_tls.unwrap_or(false),
        verbose: verbosity > 0,
        format: if cli.json || rc.json.unwrap_or(false) {
            OutputFormat::Json
        } else {
            OutputFormat::Terminal
        },
    };

    let code = match &cli.command {
        Command::Generate { watch: true } => {
            let once = Command::Generate { watch: false };
            match watch::watch_and_run(&options.store_dir, || {
                run(&options, &once);
            }) {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    2
                }
            }
        }
        command => run(&options, command),
    };

    process::exit(code);
}

fn init_logging(verbosity: u8) {
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        });

    tracing_subscriber::registry().with(log_layer).init();
}

fn run(options: &Options, command: &Command) -> i32 {
    let tools = match Tools::load(options) {
        Ok(tools) => tools,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return 2;
        }
    };

    match execute(&tools, options, command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

impl Tools {
    fn load(options: &Options) -> anyhow::Result<Self> {
        let settings = load_settings(options)?;
        let templates = match &options.templates {
            Some(dir) => HandlebarsTemplates::with_overrides(dir)
                .with_context(|| format!("Failed to load templates from {}", dir.display()))?,
            None => HandlebarsTemplates::new().context("Failed to load built-in templates")?,
        };
        let fetcher = HttpFetcher::new(settings.metadata_fetch.accept_invalid_certs);

        Ok(Self {
            settings,
            store: FileStore::new(&options.store_dir),
            templates,
            fetcher,
        })
    }
}

fn load_settings(options: &Options) -> anyhow::Result<Settings> {
    let path = options
        .config
        .clone()
        .unwrap_or_else(|| options.store_dir.join(SETTINGS_FILE));

    let mut settings = if options.config.is_some() || path.is_file() {
        Settings::load(&path)?
    } else {
        Settings::default()
    };

    if let Some(root) = &options.idp_root {
        settings.idp.root_dir = Some(root.clone());
    }
    if options.insecure_tls {
        settings.metadata_fetch.accept_invalid_certs = true;
    }
    Ok(settings)
}

fn execute(tools: &Tools, options: &Options, command: &Command) -> Result<i32, SynthesisError> {
    let files = MetadataFiles::new(&tools.settings, &tools.templates, &tools.fetcher);
    let format = options.format;

    match command {
        Command::Generate { .. } => {
            let report = Synthesizer::new(
                &tools.settings,
                &tools.store,
                &tools.store,
                &PlaintextSecrets,
                &tools.templates,
            )
            .generate_configuration_files();
            output::print_report(&report, options.verbose, format);
            Ok(if report.is_success() { 0 } else { 1 })
        }

        Command::Analyze { file } => {
            let summary = metadata::analyze(&metadata::read_file(file)?)?;
            output::print_analysis(file, &summary, format);
            Ok(0)
        }

        Command::SpMetadata { inum, cert } => {
            let tr = find_relationship(&tools.store, inum)?;
            let certificate = match cert {
                Some(path) => {
                    let body = read_certificate(path)?;
                    files.save_cert(&tr, &body)?;
                    Some(body)
                }
                None => files.public_certificate(&tr)?,
            };
            let path = files.generate_sp_metadata_file(&tr, certificate.as_deref())?;
            output::print_written(render::SP_METADATA, &path, format);
            Ok(0)
        }

        Command::IdpMetadata => {
            let path = files.generate_idp_metadata()?;
            output::print_written(render::IDP_METADATA, &path, format);
            Ok(0)
        }

        Command::IdpConfig => {
            let path = files.generate_idp_configuration_files(&PlaintextSecrets)?;
            output::print_written(render::LOGIN_CONFIG, &path, format);
            Ok(0)
        }

        Command::AttributeMap { inum } => {
            let tr = find_relationship(&tools.store, inum)?;
            let cache = RunCache::new(&tools.store, &tools.store);
            let content = files.attribute_map(&tr, &cache)?;
            output::print_content(render::ATTRIBUTE_MAP, &content, format);
            Ok(0)
        }

        Command::Fetch { url, name, temp } => {
            let saved = if *temp {
                files
                    .save_temp_metadata_from_uri(url, name)?
                    .map(|saved| files.temp_metadata_file_path(&saved))
                    .transpose()?
            } else if files.save_metadata_from_uri(url, name)? {
                if !files.is_correct_metadata_file(name)? {
                    warn!("{} does not declare any entity", name);
                }
                Some(files.metadata_file_path(name)?)
            } else {
                None
            };

            match saved {
                Some(path) => {
                    output::print_written("metadata", &path, format);
                    Ok(0)
                }
                None => {
                    eprintln!("Error: no metadata downloaded from {}", url);
                    Ok(1)
                }
            }
        }

        Command::Principals { acrs } => {
            let path = files.generate_supported_principals(acrs)?;
            output::print_written(render::SUPPORTED_PRINCIPALS, &path, format);
            Ok(0)
        }

        Command::AddOwnSp => {
            let cache = RunCache::new(&tools.store, &tools.store);
            let tr = files.add_own_sp(&cache)?;
            let path = files.metadata_file_path(&sp_metadata_file_name(&tr.inum))?;
            output::print_written(render::SP_METADATA, &path, format);
            Ok(0)
        }
    }
}

fn find_relationship(store: &FileStore, inum: &str) -> Result<TrustRelationship, SynthesisError> {
    store
        .find_trust_relationship(inum)?
        .ok_or_else(|| StoreError::NotFound(inum.to_string()).into())
}

fn read_certificate(path: &Path) -> Result<String, SynthesisError> {
    let text = fs::read_to_string(path).map_err(|e| SynthesisError::io(path, e))?;
    certificate::certificate_body(&text).ok_or_else(|| {
        SynthesisError::Configuration(format!("{} holds no PEM certificate", path.display()))
    })
}
