use std::path::Path;

use serde::Deserialize;

/// Defaults loaded from a `.shibsynthrc` TOML file.
///
/// Looked up first in the store directory, then in `$HOME`.
/// CLI flags always take precedence over file values.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RcConfig {
    pub verbose: Option<u8>,
    pub json: Option<bool>,
    pub no_color: Option<bool>,
    pub insecure_tls: Option<bool>,
    pub templates: Option<std::path::PathBuf>,
}

impl RcConfig {
    /// Load `.shibsynthrc` from the store directory, falling back to `$HOME`.
    pub fn load(store_dir: &Path) -> Self {
        let candidates = [
            Some(store_dir.join(".shibsynthrc")),
            dirs_home().map(|h| h.join(".shibsynthrc")),
        ];

        for candidate in candidates.iter().flatten() {
            if let Ok(contents) = std::fs::read_to_string(candidate) {
                if let Ok(cfg) = toml::from_str::<RcConfig>(&contents) {
                    return cfg;
                }
            }
        }

        RcConfig::default()
    }
}

fn dirs_home() -> Option<std::path::PathBuf> {
    std::env::var_os("HOME").map(std::path::PathBuf::from)
}
