//! CLI configuration file.

use std::path::Path;

use pxcanvas_core::ClientConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the `pxcanvas` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Connection and protocol settings.
    pub client: ClientConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl CliConfig {
    /// Load from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::debug!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Default configuration as TOML text.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pxcanvas_core::{EchoPolicy, StateEncoding};

    #[test]
    fn default_config_serializes() {
        let text = CliConfig::default_toml().unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("[logging]"));
        assert!(text.contains("poll_interval_ms"));
    }

    #[test]
    fn roundtrip_config() {
        let text = CliConfig::default_toml().unwrap();
        let parsed = CliConfig::parse(&text).unwrap();
        assert_eq!(parsed.client.port, 1234);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn sections_are_optional() {
        let parsed = CliConfig::parse(
            r#"
            [client]
            host = "10.0.0.7"
            echo = "expect"
            encoding = "rgba64"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.client.host, "10.0.0.7");
        assert_eq!(parsed.client.echo, EchoPolicy::Expect);
        assert_eq!(parsed.client.encoding, StateEncoding::Rgba64);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = CliConfig::load(Path::new("/nonexistent/pxcanvas.toml"));
        assert_eq!(cfg.client.host, "127.0.0.1");
    }
}
