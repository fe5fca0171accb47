use crate::Navigation;
use crate::api_manager::ApiManager;
use crate::cache::MemoryBackend;
use crate::clock::Clock;
use crate::config::Config;
use crate::main_menu::MainMenuManager;
use crate::menu::local::{LocalMenu, StaticMenuSource};
use crate::transport::{ApiRequest, HttpTransport, TransportError, TransportErrorKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Answers requests from a queue and records every request it gets.
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    history: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new(responses: Vec<Result<Value, TransportError>>) -> Arc<Self> {
        let transport = MockTransport {
            responses: Mutex::new(VecDeque::new()),
            history: Mutex::new(Vec::new()),
        };
        for response in responses {
            transport.push(response);
        }
        Arc::new(transport)
    }

    pub fn push(&self, response: Result<Value, TransportError>) {
        self.push_raw(response.map(|value| value.to_string()));
    }

    pub fn push_raw(&self, response: Result<String, TransportError>) {
        self.responses.lock().push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<String, TransportError> {
        self.history.lock().push(request);
        self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Request,
                "mock response queue is empty",
            ))
        })
    }
}

pub struct MockClock(AtomicI64);

impl MockClock {
    pub fn new(time: i64) -> Self {
        MockClock(AtomicI64::new(time))
    }

    pub fn advance(&self, seconds: i64) {
        self.0.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn request_time(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

const CONFIG: &str = r#"
environment:
    project: asuminen
    name: "{environment}"
    id: asuminen
    urls:
        fi: "https://www.hel.fi/fi/asuminen"
        en: "https://www.hel.fi/en/housing"
upstream:
    urls:
        fi: "https://www.hel.fi/fi"
        en: "https://www.hel.fi/en"
        sv: "https://www.hel.fi/sv"
    internal_addresses:
        fi: "http://etusivu.internal/fi"
client:
    timeout_secs: 1
authorization:
    vault:
        - id: global_navigation
          data: "123"
internal_domains:
    - "*.hel.fi"
site:
    name: Asuminen
    translations:
        en: Housing
"#;

const MENU: &str = r#"
name: main
links:
    - id: vuokra
      title: Vuokra-asunnot
      url: /fi/asuminen/vuokra-asunnot
      translations:
          fi: {title: Vuokra-asunnot}
          en: {title: Rental housing, url: /en/housing/rental-housing}
    - id: omistus
      title: Omistusasunnot
      url: /fi/asuminen/omistusasunnot
      weight: 1
      translations:
          fi: {title: Omistusasunnot}
    - id: hitas
      title: Hitas
      parent: omistus
      url: /fi/asuminen/omistusasunnot/hitas
      translations:
          fi: {title: Hitas}
    - id: hsl
      title: HSL
      url: https://www.hsl.fi
      weight: 2
      translations:
          fi: {title: HSL, lang_attribute: en}
    - id: restricted
      title: Ylläpito
      url: /fi/asuminen/yllapito
      visibility: restricted
      translations:
          fi: {title: Ylläpito}
    - id: unpublished
      title: Luonnos
      url: /fi/asuminen/luonnos
      translations:
          fi: {title: Luonnos, published: false}
    - id: disabled
      title: Poistettu
      url: /fi/asuminen/poistettu
      enabled: false
      translations:
          fi: {title: Poistettu}
"#;

/// A configured site wired to mocks. Clients created from one site share
/// the clock and the cache.
pub struct TestSite {
    pub config: Config,
    pub menu: LocalMenu,
    pub clock: Arc<MockClock>,
    pub cache: Arc<MemoryBackend>,
}

impl TestSite {
    pub fn new(environment: &str) -> Self {
        let config = serde_yaml::from_str(&CONFIG.replace("{environment}", environment))
            .expect("test config is valid");

        TestSite {
            config,
            menu: serde_yaml::from_str(MENU).expect("test menu is valid"),
            clock: Arc::new(MockClock::new(1_700_000_000)),
            cache: Arc::new(MemoryBackend::new(100)),
        }
    }

    pub fn without_authorization(mut self) -> Self {
        self.config.authorization.vault.clear();
        self.config.authorization.api_key = None;
        self
    }

    pub fn with_fixtures(mut self, dir: &Path) -> Self {
        self.config.client.fixtures_dir = dir.to_path_buf();
        self
    }

    pub fn navigation(&self, transport: Arc<MockTransport>) -> Navigation {
        Navigation::new(
            self.config.clone(),
            transport,
            self.cache.clone(),
            self.clock.clone(),
            Arc::new(StaticMenuSource::new(self.menu.clone())),
        )
    }

    pub fn api_manager(&self, transport: Arc<MockTransport>) -> ApiManager {
        self.navigation(transport).api_manager()
    }

    pub fn main_menu_manager(&self, transport: Arc<MockTransport>) -> MainMenuManager {
        self.navigation(transport).main_menu_manager()
    }
}

/// Records the level of every event logged by this crate.
#[derive(Clone, Default)]
pub struct LogCounter {
    levels: Arc<Mutex<Vec<Level>>>,
}

impl LogCounter {
    /// Captures events on the current thread until the guard is dropped.
    /// Tests run on a current-thread runtime, so spawned tasks are covered.
    pub fn install(&self) -> DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn count(&self, level: Level) -> usize {
        self.levels.lock().iter().filter(|l| **l == level).count()
    }
}

impl<S: Subscriber> Layer<S> for LogCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with("navigation") {
            self.levels.lock().push(*metadata.level());
        }
    }
}
