use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Empty environment id")]
    EmptyEnvironmentId,

    #[error("Upstream has no URLs configured")]
    MissingUpstreamUrls,

    #[error("Internal address configured for unknown language: {0}")]
    UnknownInternalLanguage(String),

    #[error("Empty site name")]
    EmptySiteName,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// The deployment this process runs as.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct EnvironmentConfig {
    /// Project name, e.g. "asuminen"
    pub project: String,
    /// Environment name: local, dev, test, stage or prod
    pub name: String,
    /// Stable id used when pushing the menu upstream
    pub id: String,
    /// Public front page URL per language
    #[serde(default)]
    pub urls: HashMap<String, Url>,
}

/// The central site that aggregates the global menu.
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_project")]
    pub project: String,
    /// Public URL per language. Used for links that end up in a browser.
    pub urls: HashMap<String, Url>,
    /// Service address per language. Used for server-to-server calls only.
    ///
    /// Languages without an entry fall back to the public URL.
    #[serde(default)]
    pub internal_addresses: HashMap<String, Url>,
}

fn default_upstream_project() -> String {
    "etusivu".into()
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_secs: u64,
    pub tcp_keepalive_secs: u64,
    pub cache_ttl_secs: i64,
    pub cache_capacity: u64,
    pub fixtures_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            timeout_secs: 15,
            tcp_keepalive_secs: 60,
            cache_ttl_secs: 180,
            cache_capacity: 1000,
            fixtures_dir: PathBuf::from("fixtures"),
        }
    }
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct VaultEntry {
    pub id: String,
    pub data: String,
}

#[derive(Clone, Deserialize, Debug, Default, PartialEq)]
pub struct AuthorizationConfig {
    #[serde(default)]
    pub vault: Vec<VaultEntry>,
    /// Deprecated, use a vault entry instead.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Clone, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum LinkAlterConfig {
    #[default]
    AbsoluteUrl,
    Redirects {
        /// langcode -> (source path -> destination)
        #[serde(default)]
        redirects: HashMap<String, HashMap<String, String>>,
        /// Path the front page resolves to, e.g. "/node/1"
        #[serde(default)]
        front_page: Option<String>,
    },
    None,
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct SiteConfig {
    /// Site name in the default language
    pub name: String,
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Translated site names, langcode -> name
    #[serde(default)]
    pub translations: HashMap<String, String>,
    /// YAML file holding the local menu links
    #[serde(default)]
    pub menu_file: Option<PathBuf>,
    #[serde(default)]
    pub link_alter: LinkAlterConfig,
}

fn default_language() -> String {
    "fi".into()
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    pub environment: EnvironmentConfig,
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    /// Hosts considered part of the same site family. "*.example.com" matches
    /// example.com and all of its subdomains.
    #[serde(default)]
    pub internal_domains: Vec<String>,
    pub site: SiteConfig,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.environment.id.is_empty() {
            return Err(ValidationError::EmptyEnvironmentId);
        }

        if self.upstream.urls.is_empty() {
            return Err(ValidationError::MissingUpstreamUrls);
        }

        for lang in self.upstream.internal_addresses.keys() {
            if !self.upstream.urls.contains_key(lang) {
                return Err(ValidationError::UnknownInternalLanguage(lang.clone()));
            }
        }

        if self.site.name.is_empty() {
            return Err(ValidationError::EmptySiteName);
        }

        Ok(())
    }
}
