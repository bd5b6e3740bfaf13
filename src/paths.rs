//! Centralized path resolution for cloudup
//!
//! # Environment Variables
//!
//! - `CLOUDUP_CONFIG_DIR` - Override config directory (e.g., `~/infra/cloudup`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CLOUDUP_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/cloudup` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\cloudup`
//!    - macOS/Linux: `~/.config/cloudup`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CLOUDUP_CONFIG_DIR";

const APP_DIR: &str = "cloudup";

/// Get the cloudup config directory path
pub fn config_dir() -> Result<PathBuf> {
    config_dir_from(|key| std::env::var(key).ok())
}

fn config_dir_from<F>(var: F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    if let Some(xdg_config) = var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn test_config_dir_env_override() {
        let dir = config_dir_from(env(&[
            (ENV_CONFIG_DIR, "/custom/config/path"),
            ("XDG_CONFIG_HOME", "/tmp/xdg"),
        ]))
        .unwrap();
        assert_eq!(dir, PathBuf::from("/custom/config/path"));
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let dir = config_dir_from(env(&[(ENV_CONFIG_DIR, "~/infra/cloudup")])).unwrap();
        assert_eq!(dir, home.join("infra").join("cloudup"));
    }

    #[test]
    fn test_xdg_config_home() {
        let dir = config_dir_from(env(&[("XDG_CONFIG_HOME", "/tmp/xdg-config-test")])).unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/xdg-config-test/cloudup"));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_config_dir_unix() {
        let home = dirs::home_dir().unwrap();
        let dir = config_dir_from(env(&[])).unwrap();
        assert_eq!(dir, home.join(".config").join("cloudup"));
    }

    #[test]
    fn test_expand_with_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/test/path"), home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        assert_eq!(
            expand("/path/$NONEXISTENT_VAR_12345/file"),
            PathBuf::from("/path/$NONEXISTENT_VAR_12345/file")
        );
    }
}
