//! Layered configuration loading
//!
//! Files are merged lowest priority first:
//! `/etc/cbuilder/config.toml`, `$XDG_CONFIG_HOME/cbuilder/config.toml`,
//! `~/.cbuilder.toml`, `./.cbuilder.toml`, then the `--config` file.
//! `CBUILDER_*` environment variables win over every file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use super::model::Config;

const APP_NAME: &str = "cbuilder";

/// Nested keys are separated by a double underscore:
/// `CBUILDER_BUILD__TIMEOUT=600` sets `build.timeout`.
const ENV_PREFIX: &str = "CBUILDER_";

/// Well-known config locations, lowest priority first
pub fn config_paths() -> Vec<PathBuf> {
    let file_name = format!(".{}.toml", APP_NAME);

    let mut paths = vec![Path::new("/etc").join(APP_NAME).join("config.toml")];
    paths.extend(dirs::config_dir().map(|d| d.join(APP_NAME).join("config.toml")));
    paths.extend(dirs::home_dir().map(|h| h.join(&file_name)));
    paths.push(PathBuf::from(file_name));
    paths
}

/// Resolved configuration and the files it was read from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub sources: Vec<PathBuf>,
}

impl LoadedConfig {
    /// Merge the well-known files, `explicit` and the environment
    ///
    /// A missing well-known file is skipped. A missing `explicit` file is
    /// an error since the user asked for it by name.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut sources: Vec<PathBuf> = config_paths().into_iter().filter(|p| p.is_file()).collect();

        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            sources.push(path.to_path_buf());
        }

        let figment = sources.iter().fold(
            Figment::from(Serialized::defaults(Config::default())),
            |figment, path| {
                tracing::debug!(path = %path.display(), "Merging config file");
                figment.merge(Toml::file(path))
            },
        );

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to load configuration")?;

        Ok(Self { config, sources })
    }
}

/// Load the merged configuration, discarding source information
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    LoadedConfig::load(explicit.map(Path::new)).map(|loaded| loaded.config)
}
