//! Path resolution helpers for the configuration file.
//!
//! Supports absolute paths, paths relative to the config file, and "~" home
//! directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{CamError, Result};

/// Resolve a path from a config file.
///
/// Resolution rules:
/// 1. Absolute paths: used as-is
/// 2. Paths starting with `~`: expanded to home directory
/// 3. Relative paths: resolved relative to the config file's directory
pub fn resolve_path(path: &Path, config_dir: &Path) -> Result<PathBuf> {
    trace!(
        path = %path.display(),
        config_dir = %config_dir.display(),
        "Resolving path"
    );

    let path_str = path.to_string_lossy();

    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() {
            home
        } else {
            home.join(rest)
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let resolved = config_dir.join(path);
    debug!(
        original = %path.display(),
        resolved = %resolved.display(),
        "Resolved relative path"
    );
    Ok(resolved)
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| CamError::Config("Could not determine home directory".to_string()))
}

/// `<config_dir>/skycam/config.toml`, or `None` on platforms without a
/// config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("skycam").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_path() {
        let config_dir = Path::new("/etc/skycam");
        let path = Path::new("/opt/zwo/lib/libASICamera2.so");

        let resolved = resolve_path(path, config_dir).unwrap();
        assert_eq!(resolved, PathBuf::from("/opt/zwo/lib/libASICamera2.so"));
    }

    #[test]
    fn test_relative_path() {
        let config_dir = Path::new("/home/user/.config/skycam");
        let path = Path::new("lib/libASICamera2.so");

        let resolved = resolve_path(path, config_dir).unwrap();
        assert_eq!(
            resolved,
            PathBuf::from("/home/user/.config/skycam/lib/libASICamera2.so")
        );
    }

    #[test]
    fn test_home_expansion() {
        let resolved = resolve_path(Path::new("~/sdk/libASICamera2.so"), Path::new("/etc")).unwrap();
        let home = home_dir().unwrap();
        assert!(resolved.starts_with(&home));
        assert!(resolved.ends_with("sdk/libASICamera2.so"));
    }

    #[test]
    fn test_home_only() {
        let resolved = resolve_path(Path::new("~"), Path::new("/etc")).unwrap();
        assert_eq!(resolved, home_dir().unwrap());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("skycam/config.toml"));
        }
    }
}
