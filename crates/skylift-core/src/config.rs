//! skylift.toml configuration parser.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level daemon configuration.
///
/// All fields have working defaults; a missing `skylift.toml` yields the
/// default configuration. The storage endpoint may be overridden via the
/// `SKYLIFT_STORAGE_ENDPOINT` environment variable so credentials-bearing
/// URLs stay out of checked-in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyliftConfig {
    pub storage: StorageConfig,
    pub build: BuildConfig,
    pub proxy: ProxyConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the object storage bucket, e.g.
    /// `https://sites.s3.ap-south-1.amazonaws.com`.
    pub endpoint: String,
    /// Key prefix all published artifacts live under.
    pub base_path: String,
    /// Concurrent PUTs per deploy.
    pub upload_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default build command when a deploy request does not carry one.
    pub command: String,
    /// Directory under the source tree where build output lands.
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub port: u16,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:9000/skylift".to_string(),
            base_path: "__outputs".to_string(),
            upload_concurrency: 8,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: "npm install && npm run build".to_string(),
            output_dir: "build".to_string(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 9000 }
    }
}

impl Default for SkyliftConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            build: BuildConfig::default(),
            proxy: ProxyConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl SkyliftConfig {
    /// Load from a TOML file, then apply environment overrides.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: SkyliftConfig = toml::from_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = SkyliftConfig::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var("SKYLIFT_STORAGE_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
    }

    /// Origin the edge proxy forwards to: `{endpoint}/{base_path}`.
    pub fn storage_base(&self) -> String {
        format!(
            "{}/{}",
            self.storage.endpoint.trim_end_matches('/'),
            self.storage.base_path
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = SkyliftConfig::default();
        assert_eq!(config.storage.base_path, "__outputs");
        assert_eq!(config.build.output_dir, "build");
        assert_eq!(config.proxy.port, 8000);
    }

    #[test]
    fn parses_partial_toml() {
        let config: SkyliftConfig = toml::from_str(
            r#"
            [storage]
            endpoint = "https://sites.example.net"

            [proxy]
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.endpoint, "https://sites.example.net");
        assert_eq!(config.proxy.port, 8080);
        // Untouched sections keep their defaults.
        assert_eq!(config.storage.upload_concurrency, 8);
        assert_eq!(config.api.port, 9000);
    }

    #[test]
    fn storage_base_joins_without_double_slash() {
        let mut config = SkyliftConfig::default();
        config.storage.endpoint = "https://sites.example.net/".to_string();
        assert_eq!(config.storage_base(), "https://sites.example.net/__outputs");
    }
}
