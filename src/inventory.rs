//! Input loading for one run: device inventory, credential, command list
//!
//! All three inputs are plain text files. Any problem here is fatal and
//! surfaces before a single device session is opened.

use confsnap_session::{Credential, DeviceTarget};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading the run inputs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential file {path} must contain a single username:password line")]
    MalformedCredential { path: PathBuf },
}

/// One device identifier per line; blank lines are skipped
pub fn load_devices(path: &Path) -> Result<Vec<DeviceTarget>, ConfigError> {
    Ok(read_lines(path)?.into_iter().map(DeviceTarget::new).collect())
}

/// One command per line; blank lines are skipped, order is preserved
pub fn load_commands(path: &Path) -> Result<Vec<String>, ConfigError> {
    read_lines(path)
}

/// Single `username:password` line.
///
/// The split happens on the first colon only, so passwords may themselves
/// contain colons.
pub fn load_credential(path: &Path) -> Result<Credential, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_credential(raw.trim(), path)
}

fn parse_credential(line: &str, path: &Path) -> Result<Credential, ConfigError> {
    let (username, password) = line
        .split_once(':')
        .ok_or_else(|| ConfigError::MalformedCredential {
            path: path.to_path_buf(),
        })?;

    if username.is_empty() {
        return Err(ConfigError::MalformedCredential {
            path: path.to_path_buf(),
        });
    }

    Ok(Credential::new(username, password))
}

fn read_lines(path: &Path) -> Result<Vec<String>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
