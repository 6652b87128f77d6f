//! Locating and reading the editor's TOML configuration.
//!
//! An explicit `--config` path must exist. Without one, the first existing
//! file among `astrolabe/config.toml` under the working directory and
//! `config.toml` in the platform config directory is used. With neither,
//! defaults apply.

use std::{fs, path::PathBuf};

use directories::ProjectDirs;
use log::{debug, info};

use astrolabe::{AstrolabeError, config::AppConfig};

const LOCAL_CONFIG: &str = "astrolabe/config.toml";

/// Loads the configuration `run` hands to the editing session.
///
/// # Errors
///
/// Fails when an explicit path does not exist, or when the chosen file cannot
/// be read or is not a valid [`AppConfig`].
pub fn load_config(explicit_path: Option<&String>) -> Result<AppConfig, AstrolabeError> {
    let path = match explicit_path {
        Some(path) => {
            let path = PathBuf::from(path);
            if !path.is_file() {
                return Err(AstrolabeError::Config(format!(
                    "Missing configuration file: {}",
                    path.display()
                )));
            }
            path
        }
        None => match search_paths().into_iter().find(|path| path.is_file()) {
            Some(path) => path,
            None => {
                debug!("No configuration file found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    info!(path = path.display().to_string(); "Loading configuration");
    parse_config(&fs::read_to_string(&path)?)
}

fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
    match ProjectDirs::from("com", "astrolabe", "astrolabe") {
        Some(dirs) => paths.push(dirs.config_dir().join("config.toml")),
        None => debug!("No platform config directory"),
    }
    paths
}

fn parse_config(content: &str) -> Result<AppConfig, AstrolabeError> {
    toml::from_str(content).map_err(|err| AstrolabeError::Config(err.to_string()))
}
