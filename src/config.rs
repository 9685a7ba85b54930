//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/udadisi.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [trends]
//! default_interval = 1
//! default_limit = 20
//! grouping = "run"
//! on_upstream_error = "emit_empty"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use udadisi_core::{GroupingMode, UpstreamErrorPolicy};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub trends: TrendsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrendsConfig {
    /// Window length in hours when a request does not give `interval`.
    #[serde(default = "default_interval")]
    pub default_interval: u32,
    /// Root-level result cap when a request does not give `limit`.
    #[serde(default)]
    pub default_limit: Option<usize>,
    #[serde(default = "default_grouping")]
    pub grouping: String,
    #[serde(default = "default_on_upstream_error")]
    pub on_upstream_error: String,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            default_interval: default_interval(),
            default_limit: None,
            grouping: default_grouping(),
            on_upstream_error: default_on_upstream_error(),
        }
    }
}

fn default_interval() -> u32 {
    1
}
fn default_grouping() -> String {
    "run".to_string()
}
fn default_on_upstream_error() -> String {
    "emit_empty".to_string()
}

impl TrendsConfig {
    /// Validated by [`load_config`], so parsing cannot fail afterwards.
    pub fn grouping_mode(&self) -> GroupingMode {
        self.grouping.parse().unwrap_or_default()
    }

    pub fn upstream_policy(&self) -> UpstreamErrorPolicy {
        self.on_upstream_error.parse().unwrap_or_default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.trends.default_limit == Some(0) {
        anyhow::bail!("trends.default_limit must be >= 1 when set");
    }

    config
        .trends
        .grouping
        .parse::<GroupingMode>()
        .map_err(anyhow::Error::msg)?;
    config
        .trends
        .on_upstream_error
        .parse::<UpstreamErrorPolicy>()
        .map_err(anyhow::Error::msg)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    const BASE: &str = r#"
[db]
path = "./data/udadisi.sqlite"

[server]
bind = "127.0.0.1:8080"
"#;

    #[test]
    fn trends_section_defaults() {
        let file = write_config(BASE);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.trends.default_interval, 1);
        assert_eq!(config.trends.default_limit, None);
        assert_eq!(config.trends.grouping_mode(), GroupingMode::Run);
        assert_eq!(
            config.trends.upstream_policy(),
            UpstreamErrorPolicy::EmitEmpty
        );
    }

    #[test]
    fn parses_trends_section() {
        let file = write_config(&format!(
            "{}\n[trends]\ndefault_interval = 24\ndefault_limit = 5\ngrouping = \"keyed\"\non_upstream_error = \"propagate\"\n",
            BASE
        ));
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.trends.default_interval, 24);
        assert_eq!(config.trends.default_limit, Some(5));
        assert_eq!(config.trends.grouping_mode(), GroupingMode::Keyed);
        assert_eq!(
            config.trends.upstream_policy(),
            UpstreamErrorPolicy::Propagate
        );
    }

    #[test]
    fn rejects_unknown_grouping() {
        let file = write_config(&format!("{}\n[trends]\ngrouping = \"hash\"\n", BASE));
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown grouping mode"));
    }

    #[test]
    fn rejects_zero_limit() {
        let file = write_config(&format!("{}\n[trends]\ndefault_limit = 0\n", BASE));
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/udadisi.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
