//! Resolution of the server home directory.
//!
//! The home directory anchors every relative path in the configuration
//! (SQLite files, log files). Resolution rules:
//! - explicit absolute path: used as-is
//! - explicit path starting with `~`: expanded against the user home
//! - explicit relative path: joined onto the current working directory
//! - nothing provided: `<platform base>/<default_subdir>`, where the platform
//!   base is `%APPDATA%` on Windows and `$HOME` elsewhere

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory")]
    NoUserHome,
    #[error("cannot determine the current working directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
fn platform_base() -> Option<PathBuf> {
    std::env::var_os("APPDATA")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
}

#[cfg(not(target_os = "windows"))]
fn platform_base() -> Option<PathBuf> {
    dirs::home_dir()
}

fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return dirs::home_dir().ok_or(HomeDirError::NoUserHome);
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        let home = dirs::home_dir().ok_or(HomeDirError::NoUserHome)?;
        return Ok(home.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the home directory into an absolute path, optionally creating it.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let path = match configured {
        Some(raw) => {
            let expanded = expand_tilde(raw.trim())?;
            if expanded.is_absolute() {
                expanded
            } else {
                std::env::current_dir()
                    .map_err(HomeDirError::CurrentDir)?
                    .join(expanded)
            }
        }
        None => platform_base()
            .ok_or(HomeDirError::NoUserHome)?
            .join(default_subdir),
    };

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_string_lossy().to_string(),
        source,
    })
}
