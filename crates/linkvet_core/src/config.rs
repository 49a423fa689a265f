use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Browser-like identity for probe requests; some servers answer 403 to
/// anything that does not look like a browser.
pub const DEFAULT_PROBE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.5481.100 Safari/537.36";

pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct LinkvetConfig {
    #[serde(default)]
    pub repository: RepositorySection,
    #[serde(default)]
    pub probe: ProbeSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RepositorySection {
    pub url: Option<String>,
    pub token: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct ProbeSection {
    pub user_agent: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl LinkvetConfig {
    /// Resolve the repository API base URL: env API_URL > config > None.
    pub fn api_url(&self) -> Option<String> {
        if let Some(value) = non_empty_env("API_URL") {
            return Some(value);
        }
        self.repository.url.clone()
    }

    /// Resolve the repository API token: env API_TOKEN > config > None.
    pub fn api_token(&self) -> Option<String> {
        if let Some(value) = non_empty_env("API_TOKEN") {
            return Some(value);
        }
        self.repository.token.clone()
    }

    /// Resolve the page size used for the first listing request.
    pub fn page_size(&self) -> usize {
        if let Ok(value) = env::var("LINKVET_PAGE_SIZE")
            && let Ok(parsed) = value.trim().parse::<usize>()
            && parsed > 0
        {
            return parsed;
        }
        self.repository
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Resolve the probe User-Agent: env LINKVET_USER_AGENT > config > default.
    pub fn probe_user_agent(&self) -> String {
        if let Some(value) = non_empty_env("LINKVET_USER_AGENT") {
            return value;
        }
        self.probe
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_PROBE_USER_AGENT.to_string())
    }

    /// Resolve the per-request timeout: env LINKVET_HTTP_TIMEOUT_MS > config
    /// > default. A hung probe must not stall the whole run.
    pub fn timeout_ms(&self) -> u64 {
        if let Ok(value) = env::var("LINKVET_HTTP_TIMEOUT_MS")
            && let Ok(parsed) = value.trim().parse::<u64>()
        {
            return parsed;
        }
        self.probe.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)
    }
}

/// Load a LinkvetConfig from a TOML file. Returns default if the file does
/// not exist.
pub fn load_config(config_path: &Path) -> Result<LinkvetConfig> {
    if !config_path.exists() {
        return Ok(LinkvetConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: LinkvetConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}

fn non_empty_env(key: &str) -> Option<String> {
    let value = env::var(key).ok()?;
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

pub(crate) fn env_value_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_has_no_credentials() {
        let config = LinkvetConfig::default();
        assert!(config.repository.url.is_none());
        assert!(config.repository.token.is_none());
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(config.timeout_ms(), DEFAULT_TIMEOUT_MS);
        assert_eq!(config.probe_user_agent(), DEFAULT_PROBE_USER_AGENT);
    }

    #[test]
    fn load_config_returns_default_for_missing_file() {
        let config = load_config(Path::new("/nonexistent/linkvet.toml")).expect("load config");
        assert_eq!(config, LinkvetConfig::default());
    }

    #[test]
    fn load_config_parses_repository_and_probe_sections() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("linkvet.toml");
        fs::write(
            &config_path,
            r#"
[repository]
url = "https://links.example.org/api/bookmarks"
token = "secret"
page_size = 50

[probe]
user_agent = "test-agent/1.0"
timeout_ms = 5000
"#,
        )
        .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(
            config.repository.url.as_deref(),
            Some("https://links.example.org/api/bookmarks")
        );
        assert_eq!(config.repository.token.as_deref(), Some("secret"));
        assert_eq!(config.repository.page_size, Some(50));
        assert_eq!(config.probe.user_agent.as_deref(), Some("test-agent/1.0"));
        assert_eq!(config.probe.timeout_ms, Some(5000));
    }

    #[test]
    fn load_config_tolerates_partial_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("linkvet.toml");
        fs::write(&config_path, "[repository]\nurl = \"https://x.example\"\n")
            .expect("write config");

        let config = load_config(&config_path).expect("load config");
        assert_eq!(config.repository.url.as_deref(), Some("https://x.example"));
        assert!(config.repository.token.is_none());
        assert!(config.probe.user_agent.is_none());
    }

    #[test]
    fn load_config_returns_error_for_invalid_toml() {
        let temp = tempdir().expect("tempdir");
        let config_path = temp.path().join("linkvet.toml");
        fs::write(&config_path, "[repository\nurl = \"oops\"").expect("write config");
        let error = load_config(&config_path).expect_err("must fail");
        assert!(error.to_string().contains("failed to parse"));
    }

    #[test]
    fn zero_page_size_in_config_falls_back_to_default() {
        let config = LinkvetConfig {
            repository: RepositorySection {
                page_size: Some(0),
                ..RepositorySection::default()
            },
            probe: ProbeSection::default(),
        };
        assert_eq!(config.page_size(), DEFAULT_PAGE_SIZE);
    }
}
