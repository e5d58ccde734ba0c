use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Shibboleth configuration synthesizer
#[derive(Parser, Debug)]
#[command(
    name = "shibsynth",
    version,
    about = "Generate Shibboleth IDP/SP configuration from SAML trust relationships",
    long_about = "Reads trust relationships, attribute definitions, NameID and CAS settings \
                  from a directory snapshot and renders the Shibboleth IDP configuration \
                  (metadata providers, attribute resolver and filter, relying party, CAS, \
                  NameID) plus the SP-side shibboleth2.xml.",
    after_help = "\
EXAMPLES:
  shibsynth --store /var/lib/shibsynth generate           Render every artifact
  shibsynth generate --watch                               Re-render on snapshot changes
  shibsynth analyze metadata/fed.xml                       Show entity IDs in a metadata file
  shibsynth fetch https://fed.example.org/md.xml fed.xml   Download federation metadata
  shibsynth --json generate                                Report as JSON

EXIT CODES:
  0  Success
  1  Synthesis failed or the artifact set is incomplete
  2  Tool failure (e.g., snapshot directory or settings unreadable)

STORE LAYOUT:
  trust/*.json        trust relationships
  attributes.json     person attributes
  schema.json         attribute type definitions
  nameid.json         NameID configurations (optional)
  cas.json            CAS configuration (optional)
  configuration.json  own SP inum, persistence type (optional)
  shibsynth.toml      deployment settings (optional)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory snapshot to read trust relationships and attributes from
    #[arg(long, global = true, default_value = ".", value_name = "DIR")]
    pub store: PathBuf,

    /// Deployment settings (default: <store>/shibsynth.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the Shibboleth IDP installation root
    #[arg(long, global = true, value_name = "DIR")]
    pub idp_root: Option<PathBuf>,

    /// Directory with `<artifact>.hbs` template overrides
    #[arg(long, global = true, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Accept invalid TLS certificates when downloading metadata
    #[arg(long, global = true)]
    pub insecure_tls: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Output results as JSON (for scripting and CI)
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render and write the full configuration artifact set
    Generate {
        /// Re-run whenever a snapshot file changes
        #[arg(long)]
        watch: bool,
    },

    /// Show the entity IDs declared by a metadata file
    Analyze {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Generate SP metadata for a trust relationship
    #[command(name = "sp-metadata")]
    SpMetadata {
        inum: String,

        /// PEM certificate to store for the relationship and embed
        #[arg(long, value_name = "FILE")]
        cert: Option<PathBuf>,
    },

    /// Generate metadata/idp-metadata.xml
    #[command(name = "idp-metadata")]
    IdpMetadata,

    /// Generate conf/login.config
    #[command(name = "idp-config")]
    IdpConfig,

    /// Print the SP attribute-map.xml for a trust relationship
    #[command(name = "attribute-map")]
    AttributeMap { inum: String },

    /// Download metadata into the IDP metadata folder
    Fetch {
        url: String,

        /// File name under metadata/ (base name under temp_metadata/ with --temp)
        name: String,

        /// Save under temp_metadata/ with a unique suffix
        #[arg(long)]
        temp: bool,
    },

    /// Generate conf/authn/oxauth-supported-principals.xml
    Principals {
        #[arg(required = true, value_name = "ACR")]
        acrs: Vec<String>,
    },

    /// Register the SP bundled with the IDP as a trust relationship
    #[command(name = "add-own-sp")]
    AddOwnSp,
}
