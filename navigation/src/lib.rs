pub mod api;
pub mod api_manager;
pub mod authorization;
pub mod cache;
pub mod cache_warmer;
pub mod clock;
pub mod config;
pub mod domain;
pub mod environment;
pub mod fixtures;
pub mod lazy_builder;
pub mod main_menu;
pub mod menu;
pub mod metrics_defs;
pub mod response;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testutils;

use api_manager::{ApiManager, ClientSettings};
use authorization::ApiAuthorization;
use cache::{CacheBackend, MemoryBackend, cache_tags};
use cache_warmer::CacheWarmer;
use clock::{Clock, SystemClock};
use config::{Config, ValidationError};
use domain::InternalDomainResolver;
use environment::EnvironmentResolver;
use fixtures::FixtureStore;
use main_menu::MainMenuManager;
use menu::external::ExternalMenuTreeBuilder;
use menu::link_alter::{self, LinkAlter};
use menu::local::{FileMenuSource, LocalMenu, MenuSource, StaticMenuSource};
use menu::tree_builder::MenuTreeBuilder;
use std::sync::Arc;
use std::time::Duration;
use transport::{HttpTransport, ReqwestTransport, TransportError, TransportSettings};

#[derive(thiserror::Error, Debug)]
pub enum NavigationError {
    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to create HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// Wires the navigation services together from one configuration.
///
/// Long lived parts (transport, cache, clock) are shared. Clients are
/// handed out fresh per call, so the fail-fast state of one operation never
/// leaks into another.
pub struct Navigation {
    config: Config,
    environments: Arc<EnvironmentResolver>,
    authorization: ApiAuthorization,
    domains: Arc<InternalDomainResolver>,
    link_alter: Arc<dyn LinkAlter>,
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    menu_source: Arc<dyn MenuSource>,
    warmer: CacheWarmer,
}

impl Navigation {
    pub fn from_config(config: Config) -> Result<Self, NavigationError> {
        config.validate()?;

        let transport = ReqwestTransport::new(&TransportSettings {
            tcp_keepalive: Duration::from_secs(config.client.tcp_keepalive_secs),
            // Local deployments run on self-signed certificates
            accept_invalid_certs: config.environment.name == "local",
        })?;
        let cache = MemoryBackend::new(config.client.cache_capacity);

        let menu_source: Arc<dyn MenuSource> = match &config.site.menu_file {
            Some(path) => Arc::new(FileMenuSource::new(path)),
            None => Arc::new(StaticMenuSource::new(LocalMenu::default())),
        };

        Ok(Navigation::new(
            config,
            Arc::new(transport),
            Arc::new(cache),
            Arc::new(SystemClock),
            menu_source,
        ))
    }

    pub fn new(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        menu_source: Arc<dyn MenuSource>,
    ) -> Self {
        let environments = Arc::new(EnvironmentResolver::from_config(
            &config.environment,
            &config.upstream,
        ));
        let link_alter = Arc::from(link_alter::from_config(
            &config.site.link_alter,
            &environments,
        ));

        Navigation {
            authorization: ApiAuthorization::from_config(&config.authorization),
            domains: Arc::new(InternalDomainResolver::new(config.internal_domains.clone())),
            environments,
            link_alter,
            transport,
            cache,
            clock,
            menu_source,
            warmer: CacheWarmer::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environments(&self) -> &EnvironmentResolver {
        &self.environments
    }

    /// A new client with a clean fail-fast state.
    pub fn api_manager(&self) -> ApiManager {
        ApiManager::new(
            self.transport.clone(),
            self.cache.clone(),
            self.clock.clone(),
            self.environments.clone(),
            &self.authorization,
        )
        .with_settings(ClientSettings {
            timeout: Duration::from_secs(self.config.client.timeout_secs),
            cache_ttl: self.config.client.cache_ttl_secs,
        })
        .with_fixtures(FixtureStore::new(&self.config.client.fixtures_dir))
    }

    pub fn menu_tree_builder(&self) -> MenuTreeBuilder {
        MenuTreeBuilder::new(self.domains.clone(), self.link_alter.clone())
    }

    pub fn external_tree_builder(&self) -> ExternalMenuTreeBuilder {
        ExternalMenuTreeBuilder::new(self.domains.clone())
    }

    pub fn main_menu_manager(&self) -> MainMenuManager {
        MainMenuManager::new(
            self.api_manager(),
            Arc::new(self.config.site.clone()),
            self.menu_source.clone(),
            self.menu_tree_builder(),
        )
    }

    pub fn cache_warmer(&self) -> &CacheWarmer {
        &self.warmer
    }

    /// Drops the cached copies of one menu in one language, whatever
    /// options they were fetched with.
    pub fn invalidate_menu(&self, menu_id: &str, langcode: &str) -> usize {
        self.cache.invalidate_tags(&cache_tags(menu_id, langcode))
    }
}
