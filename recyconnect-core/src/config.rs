//! Application configuration
//!
//! Loaded from `~/.recyconnect/config.toml` (or an explicit path). Every
//! section is optional; a missing file yields the defaults. `DATABASE_URL`
//! from the environment overrides the file.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub uploads: UploadsSection,
    pub realtime: RealtimeSection,
    pub defaults: DefaultsSection,
    pub admin: AdminSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    /// Allow any origin. Localhost origins only when false.
    pub cors_permissive: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            cors_permissive: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/recyconnect".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadsSection {
    pub dir: PathBuf,
}

impl Default for UploadsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads/items"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSection {
    /// Events buffered per subscriber before it starts lagging
    pub channel_capacity: usize,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsSection {
    /// User credited with reports and concerns submitted without a known user
    pub fallback_user_id: i64,
}

impl Default for DefaultsSection {
    fn default() -> Self {
        Self {
            fallback_user_id: 2,
        }
    }
}

/// Administrator account created at startup when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
    pub bio: Option<String>,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            email: "admin@chitkara.edu.in".to_string(),
            password: "admin@1234".to_string(),
            name: "Administrator".to_string(),
            phone: Some("9999999999".to_string()),
            bio: Some("System Administrator".to_string()),
        }
    }
}

impl AppConfig {
    /// Default config path: ~/.recyconnect/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".recyconnect/config.toml")
    }

    /// Load from the given path, or the default path when `None`.
    ///
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Self::config_path();
        let path = path.unwrap_or(&default_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(path)?;
            Self::from_toml(&content).map_err(|source| CoreError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Render the config as TOML with the admin password masked
    pub fn to_redacted_toml(&self) -> Result<String> {
        let mut shown = self.clone();
        shown.admin.password = "********".to_string();
        Ok(toml::to_string_pretty(&shown)?)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.trim().is_empty() {
                self.database.url = url;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind.port(), 8080);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.defaults.fallback_user_id, 2);
        assert_eq!(config.uploads.dir, PathBuf::from("uploads/items"));
        assert_eq!(config.admin.email, "admin@chitkara.edu.in");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"

            [defaults]
            fallback_user_id = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert!(!config.server.cors_permissive);
        assert_eq!(config.defaults.fallback_user_id, 7);
        assert_eq!(config.realtime.channel_capacity, 64);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server\nbind = 1").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse { .. }));
    }

    #[test]
    fn redacted_output_hides_password() {
        let rendered = AppConfig::default().to_redacted_toml().unwrap();
        assert!(!rendered.contains("admin@1234"));
        assert!(rendered.contains("********"));
    }
}
