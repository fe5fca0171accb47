//! Deployment lookup.
//!
//! Two environments matter to the client: the one this process runs as
//! (the "active" environment) and the matching environment of the central
//! site that aggregates the global menu (the "upstream").

use crate::config::{EnvironmentConfig, UpstreamConfig};
use std::collections::HashMap;
use url::Url;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EnvironmentError {
    #[error("no URL configured for project {project} and language {langcode}")]
    MissingLanguage { project: String, langcode: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Environment {
    pub project: String,
    /// Environment name: local, dev, test, stage or prod
    pub name: String,
    pub id: String,
    urls: HashMap<String, Url>,
    internal_addresses: HashMap<String, Url>,
}

impl Environment {
    pub fn new(
        project: impl Into<String>,
        name: impl Into<String>,
        id: impl Into<String>,
        urls: HashMap<String, Url>,
        internal_addresses: HashMap<String, Url>,
    ) -> Self {
        Environment {
            project: project.into(),
            name: name.into(),
            id: id.into(),
            urls,
            internal_addresses,
        }
    }

    /// Public URL for the given language, without a trailing slash.
    pub fn url(&self, langcode: &str) -> Result<&str, EnvironmentError> {
        self.urls
            .get(langcode)
            .map(|url| url.as_str().trim_end_matches('/'))
            .ok_or_else(|| self.missing(langcode))
    }

    /// Service address for the given language. Falls back to the public URL.
    pub fn internal_address(&self, langcode: &str) -> Result<&str, EnvironmentError> {
        match self.internal_addresses.get(langcode) {
            Some(url) => Ok(url.as_str().trim_end_matches('/')),
            None => self.url(langcode),
        }
    }

    /// Scheme and host of the public URLs. Languages of one environment
    /// share the same base URL.
    pub fn base_url(&self) -> Option<String> {
        let url = self.urls.values().next()?;
        let host = url.host_str()?;

        Some(match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        })
    }

    pub fn is_local(&self) -> bool {
        self.name == "local"
    }

    fn missing(&self, langcode: &str) -> EnvironmentError {
        EnvironmentError::MissingLanguage {
            project: self.project.clone(),
            langcode: langcode.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnvironmentResolver {
    active: Environment,
    upstream: Environment,
}

impl EnvironmentResolver {
    pub fn new(active: Environment, upstream: Environment) -> Self {
        EnvironmentResolver { active, upstream }
    }

    pub fn from_config(environment: &EnvironmentConfig, upstream: &UpstreamConfig) -> Self {
        let active = Environment::new(
            &environment.project,
            &environment.name,
            &environment.id,
            environment.urls.clone(),
            HashMap::new(),
        );
        // The upstream always runs in the same environment as we do.
        let upstream = Environment::new(
            &upstream.project,
            &environment.name,
            &upstream.project,
            upstream.urls.clone(),
            upstream.internal_addresses.clone(),
        );
        EnvironmentResolver::new(active, upstream)
    }

    pub fn active(&self) -> &Environment {
        &self.active
    }

    pub fn upstream(&self) -> &Environment {
        &self.upstream
    }
}
