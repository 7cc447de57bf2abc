//! artwalk-engine specific configuration

use artwalk_common::config::TomlConfig;
use std::path::PathBuf;

/// Default QR scan rate (decode dispatches per second)
pub const DEFAULT_SCANS_PER_SECOND: f64 = 2.0;

/// Experience engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub root_folder: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: String,
    pub scans_per_second: f64,
    /// Base URL of the survey backend; None disables the submission-limit check
    pub submission_endpoint: Option<String>,
}

impl Config {
    /// Assemble the engine configuration from a resolved root folder and the
    /// optional TOML overrides
    pub fn from_parts(root_folder: PathBuf, toml: &TomlConfig, bind_override: Option<String>) -> Self {
        let db_path = root_folder.join("artwalk.db");
        let bind_addr = bind_override
            .or_else(|| toml.bind_addr.clone())
            .unwrap_or_else(|| "127.0.0.1:5810".to_string());
        let scans_per_second = toml
            .scans_per_second
            .filter(|r| *r > 0.0)
            .unwrap_or(DEFAULT_SCANS_PER_SECOND);

        Self {
            root_folder,
            db_path,
            bind_addr,
            scans_per_second,
            submission_endpoint: toml.submission_endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_toml_empty() {
        let config = Config::from_parts(PathBuf::from("/tmp/aw"), &TomlConfig::default(), None);

        assert_eq!(config.db_path, PathBuf::from("/tmp/aw/artwalk.db"));
        assert_eq!(config.bind_addr, "127.0.0.1:5810");
        assert_eq!(config.scans_per_second, DEFAULT_SCANS_PER_SECOND);
        assert!(config.submission_endpoint.is_none());
    }

    #[test]
    fn test_bind_override_wins_over_toml() {
        let toml = TomlConfig {
            bind_addr: Some("127.0.0.1:6000".to_string()),
            ..Default::default()
        };
        let config = Config::from_parts(
            PathBuf::from("/tmp/aw"),
            &toml,
            Some("0.0.0.0:7000".to_string()),
        );
        assert_eq!(config.bind_addr, "0.0.0.0:7000");
    }

    #[test]
    fn test_nonpositive_scan_rate_falls_back() {
        let toml = TomlConfig {
            scans_per_second: Some(0.0),
            ..Default::default()
        };
        let config = Config::from_parts(PathBuf::from("/tmp/aw"), &toml, None);
        assert_eq!(config.scans_per_second, DEFAULT_SCANS_PER_SECOND);
    }
}
