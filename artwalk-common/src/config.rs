//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Optional settings read from the TOML config file
///
/// Everything here has a compiled default; the file may be absent entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Root data folder (database, captured clips)
    pub root_folder: Option<String>,
    /// Listen address for the engine HTTP/SSE surface
    pub bind_addr: Option<String>,
    /// QR scan rate (decode dispatches per second)
    pub scans_per_second: Option<f64>,
    /// Base URL of the survey backend used for the submission-limit check
    pub submission_endpoint: Option<String>,
}

impl TomlConfig {
    /// Load the config file if one exists; absent file is not an error
    pub fn load() -> Result<Self> {
        let path = match config_file_path() {
            Ok(path) => path,
            Err(_) => return Ok(Self::default()),
        };

        let content = std::fs::read_to_string(&path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {:?}: {}", path, e)))
    }
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get default configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let candidate = if cfg!(target_os = "linux") {
        // Try ~/.config/artwalk/config.toml first, then /etc/artwalk/config.toml
        let user_config = dirs::config_dir().map(|d| d.join("artwalk").join("config.toml"));
        let system_config = PathBuf::from("/etc/artwalk/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else {
        dirs::config_dir()
            .map(|d| d.join("artwalk").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    };

    if candidate.exists() {
        Ok(candidate)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", candidate)))
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/artwalk (or /var/lib/artwalk for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("artwalk"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/artwalk"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/artwalk
        dirs::data_dir()
            .map(|d| d.join("artwalk"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/artwalk"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\artwalk
        dirs::data_local_dir()
            .map(|d| d.join("artwalk"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\artwalk"))
    } else {
        PathBuf::from("./artwalk_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_arg_takes_priority() {
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };

        let resolved = resolve_root_folder(
            Some("/from/cli"),
            "ARTWALK_TEST_UNSET_VAR",
            &toml,
        );
        assert_eq!(resolved, PathBuf::from("/from/cli"));
    }

    #[test]
    fn test_toml_used_when_no_cli_or_env() {
        let toml = TomlConfig {
            root_folder: Some("/from/toml".to_string()),
            ..Default::default()
        };

        let resolved = resolve_root_folder(None, "ARTWALK_TEST_UNSET_VAR", &toml);
        assert_eq!(resolved, PathBuf::from("/from/toml"));
    }

    #[test]
    fn test_fallback_is_platform_default() {
        let resolved = resolve_root_folder(None, "ARTWALK_TEST_UNSET_VAR", &TomlConfig::default());
        assert!(resolved.ends_with("artwalk") || resolved == PathBuf::from("./artwalk_data"));
    }

    #[test]
    fn test_toml_config_parses() {
        let parsed: TomlConfig = toml::from_str(
            r#"
            bind_addr = "127.0.0.1:5810"
            scans_per_second = 4.0
            submission_endpoint = "https://survey.example.com/api"
            "#,
        )
        .unwrap();

        assert_eq!(parsed.bind_addr.as_deref(), Some("127.0.0.1:5810"));
        assert_eq!(parsed.scans_per_second, Some(4.0));
        assert!(parsed.root_folder.is_none());
    }
}
