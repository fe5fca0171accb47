use crate::authorization::ApiAuthorization;
use crate::cache::{CacheBackend, CacheValue, cache_key, cache_tags};
use crate::clock::Clock;
use crate::environment::{EnvironmentError, EnvironmentResolver};
use crate::fixtures::FixtureStore;
use crate::metrics_defs::{
    CACHE_HIT, CACHE_MISS, CACHE_STALE, FIXTURE_SERVED, REQUEST_DURATION, REQUEST_FAIL_FAST,
    REQUEST_FAILED,
};
use crate::response::ApiResponse;
use crate::transport::{ApiRequest, HttpMethod, HttpTransport, RequestOptions, TransportError};
use crate::{counter, histogram};
use parking_lot::Mutex;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const GLOBAL_MENU_ENDPOINT: &str = "/api/v1/global-menu";
pub const MENU_ENDPOINT: &str = "/api/v1/menu";

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error(
        "missing authorization: no \"{}\" vault entry or api_key setting",
        ApiAuthorization::VAULT_KEY
    )]
    MissingAuthorization,

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error(
        "[{message}]. Attempted to use mock data, but the mock file \"{file}\" was not found for \"{endpoint}\" endpoint."
    )]
    FixtureNotFound {
        message: String,
        file: String,
        endpoint: String,
    },

    #[error("could not read fixture: {0}")]
    Fixture(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),
}

/// Which address of the upstream a URL is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlKind {
    /// Public front page of the upstream
    Canonical,
    /// Public URL, for links handed to browsers
    Js,
    /// Service address, for server-to-server calls only
    Api,
}

#[derive(Clone, Debug)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub cache_ttl: i64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            timeout: Duration::from_secs(15),
            cache_ttl: CacheValue::DEFAULT_TTL,
        }
    }
}

/// Client for the global menu API of the central site.
///
/// One instance is meant to live for one logical operation, e.g. a single
/// incoming request. Once a request fails at the transport level every later
/// request of the same instance fails immediately with that same error,
/// so an unreachable upstream costs one timeout instead of one per menu.
pub struct ApiManager {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    environments: Arc<EnvironmentResolver>,
    fixtures: FixtureStore,
    settings: ClientSettings,
    authorization: Option<String>,
    bypass_cache: bool,
    previous_error: Mutex<Option<TransportError>>,
}

impl ApiManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        environments: Arc<EnvironmentResolver>,
        authorization: &ApiAuthorization,
    ) -> Self {
        ApiManager {
            transport,
            cache,
            clock,
            environments,
            fixtures: FixtureStore::new("fixtures"),
            settings: ClientSettings::default(),
            authorization: authorization.get_authorization(),
            bypass_cache: false,
            previous_error: Mutex::new(None),
        }
    }

    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_fixtures(mut self, fixtures: FixtureStore) -> Self {
        self.fixtures = fixtures;
        self
    }

    /// Returns a copy that always refetches. The original is left untouched.
    pub fn with_bypass_cache(&self) -> Self {
        ApiManager {
            transport: self.transport.clone(),
            cache: self.cache.clone(),
            clock: self.clock.clone(),
            environments: self.environments.clone(),
            fixtures: self.fixtures.clone(),
            settings: self.settings.clone(),
            authorization: self.authorization.clone(),
            bypass_cache: true,
            previous_error: Mutex::new(self.previous_error.lock().clone()),
        }
    }

    pub fn has_authorization(&self) -> bool {
        self.authorization.is_some()
    }

    pub fn get_authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn environments(&self) -> &EnvironmentResolver {
        &self.environments
    }

    pub fn menu_endpoint(menu_id: &str) -> String {
        match menu_id {
            "main" => GLOBAL_MENU_ENDPOINT.to_string(),
            _ => format!("{MENU_ENDPOINT}/{menu_id}"),
        }
    }

    pub fn get_url(
        &self,
        kind: UrlKind,
        langcode: &str,
        endpoint: &str,
    ) -> Result<String, ApiError> {
        let upstream = self.environments.upstream();
        let endpoint = endpoint.trim_start_matches('/');

        Ok(match kind {
            UrlKind::Canonical => upstream.url(langcode)?.to_string(),
            UrlKind::Js => format!("{}/{endpoint}", upstream.url(langcode)?),
            UrlKind::Api => format!("{}/{endpoint}", upstream.internal_address(langcode)?),
        })
    }

    /// Fetches a menu. Served from cache while fresh; an expired entry is
    /// still returned when the refresh fails.
    pub async fn get(
        &self,
        langcode: &str,
        menu_id: &str,
        options: &RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let endpoint = Self::menu_endpoint(menu_id);
        let key = cache_key(menu_id, langcode, options);

        let value = self
            .cache(&key, || async {
                let response = self
                    .make_request(HttpMethod::Get, &endpoint, langcode, options, None)
                    .await?;

                Ok(CacheValue::new(
                    response,
                    self.clock.request_time(),
                    cache_tags(menu_id, langcode),
                )
                .with_ttl(self.settings.cache_ttl))
            })
            .await?;

        Ok(value.value)
    }

    /// Pushes the menu of the active environment upstream.
    pub async fn update(&self, langcode: &str, data: Value) -> Result<ApiResponse, ApiError> {
        if !self.has_authorization() {
            return Err(ApiError::MissingAuthorization);
        }

        let endpoint = format!(
            "{GLOBAL_MENU_ENDPOINT}/{}",
            self.environments.active().id
        );
        self.make_request(
            HttpMethod::Post,
            &endpoint,
            langcode,
            &RequestOptions::default(),
            Some(data),
        )
        .await
    }

    /// Whether the upstream answers the global menu endpoint with any data.
    ///
    /// Goes straight to the transport: cached values, fixtures and an earlier
    /// failure of this instance would all hide an outage.
    pub async fn is_available(&self, langcode: &str) -> bool {
        let url = match self.get_url(UrlKind::Api, langcode, GLOBAL_MENU_ENDPOINT) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, langcode, "No upstream address");
                return false;
            }
        };
        let request =
            self.build_request(HttpMethod::Get, url, &RequestOptions::default(), None);

        let body = match self.transport.send(request).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, langcode, "Upstream is not available");
                return false;
            }
        };

        match ApiResponse::from_json(&body) {
            Ok(response) => !is_empty(&response.data),
            Err(e) => {
                tracing::warn!(error = %e, langcode, "Upstream returned an invalid body");
                false
            }
        }
    }

    async fn cache<F, Fut>(&self, key: &str, producer: F) -> Result<CacheValue, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheValue, ApiError>>,
    {
        let current = self.cache.get(key);
        let now = self.clock.request_time();

        let refresh = self.bypass_cache || current.as_ref().is_none_or(|v| v.has_expired(now));

        if !refresh && let Some(value) = current {
            counter!(CACHE_HIT).increment(1);
            return Ok(value);
        }

        counter!(CACHE_MISS).increment(1);

        let failure = match producer().await {
            Ok(value) => {
                self.cache.set(key, value.clone());
                return Ok(value);
            }
            // Only transport failures may be papered over with a stale value.
            Err(ApiError::Transport(err)) => err,
            Err(err) => return Err(err),
        };

        match current {
            Some(value) => {
                tracing::debug!(key, error = %failure, "Refresh failed, serving stale cache");
                counter!(CACHE_STALE).increment(1);
                Ok(value)
            }
            None => Err(ApiError::Transport(failure)),
        }
    }

    async fn make_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        langcode: &str,
        options: &RequestOptions,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.get_url(UrlKind::Api, langcode, endpoint)?;
        let request = self.build_request(method, url, options, body);

        let (err, skipped) = match self.send(request).await {
            Ok(body) => {
                return ApiResponse::from_json(&body).map_err(|e| {
                    tracing::error!(error = %e, %method, endpoint, "Failed to decode response");
                    ApiError::Decode(e.to_string())
                });
            }
            Err(SendError::Failed(err)) => (err, false),
            Err(SendError::Skipped(err)) => (err, true),
        };

        if method == HttpMethod::Get
            && err.is_client_or_connect()
            && self.environments.active().is_local()
        {
            return match self.fixtures.load(endpoint, langcode, &err) {
                Ok(response) => {
                    tracing::warn!("Menu request failed: {err}. Mock data is used instead.");
                    counter!(FIXTURE_SERVED).increment(1);
                    Ok(response)
                }
                Err(fixture_err) => {
                    if !skipped {
                        tracing::error!(error = %fixture_err, %method, endpoint, "Request failed");
                    }
                    Err(fixture_err)
                }
            };
        }

        // Re-raised failures were logged when they happened.
        if !skipped {
            tracing::error!(error = %err, %method, endpoint, "Request failed");
        }
        Err(ApiError::Transport(err))
    }

    async fn send(&self, request: ApiRequest) -> Result<String, SendError> {
        let previous = self.previous_error.lock().clone();
        if let Some(err) = previous {
            tracing::debug!(url = request.url, "Skipping request after an earlier failure");
            counter!(REQUEST_FAIL_FAST).increment(1);
            return Err(SendError::Skipped(err));
        }

        let started = Instant::now();
        let result = self.transport.send(request).await;
        histogram!(REQUEST_DURATION).record(started.elapsed().as_secs_f64());

        result.map_err(|err| {
            counter!(REQUEST_FAILED).increment(1);
            *self.previous_error.lock() = Some(err.clone());
            SendError::Failed(err)
        })
    }

    fn build_request(
        &self,
        method: HttpMethod,
        url: String,
        options: &RequestOptions,
        body: Option<Value>,
    ) -> ApiRequest {
        let mut headers = options.headers.clone();

        if let Some(authorization) = &self.authorization {
            // The token is stored pre-encoded.
            headers.insert("Authorization".into(), format!("Basic {authorization}"));
        }

        ApiRequest {
            method,
            url,
            headers,
            query: options.query.clone(),
            body,
            timeout: options.timeout.unwrap_or(self.settings.timeout),
        }
    }
}

/// A failed send. `Skipped` re-raises an earlier failure without a call.
enum SendError {
    Failed(TransportError),
    Skipped(TransportError),
}

fn is_empty(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{LogCounter, MockClock, MockTransport, TestSite};
    use tracing::Level;
    use crate::transport::TransportErrorKind;
    use serde_json::json;

    fn connect_error() -> TransportError {
        TransportError::new(TransportErrorKind::Connect, "Connection refused")
    }

    #[tokio::test]
    async fn test_missing_authorization() {
        let site = TestSite::new("test").without_authorization();
        let transport = MockTransport::new(vec![]);
        let sut = site.api_manager(transport.clone());

        assert!(!sut.has_authorization());
        assert_eq!(
            sut.update("fi", json!({"key": "value"})).await,
            Err(ApiError::MissingAuthorization)
        );
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"key": "value"}))]);
        let sut = site.api_manager(transport.clone());

        let response = sut.update("fi", json!({"key": "value"})).await.unwrap();
        assert_eq!(response.data, json!({"key": "value"}));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(
            requests[0].url,
            "http://etusivu.internal/fi/api/v1/global-menu/asuminen"
        );
        assert_eq!(requests[0].headers["Authorization"], "Basic 123");
        assert_eq!(requests[0].body, Some(json!({"key": "value"})));
    }

    #[tokio::test]
    async fn test_get_uses_cache() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!([])), Ok(json!({"key": "value"}))]);
        let sut = site.api_manager(transport.clone());

        for _ in 0..3 {
            let response = sut.get("fi", "main", &RequestOptions::default()).await.unwrap();
            assert_eq!(response.data, json!([]));
        }

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://etusivu.internal/fi/api/v1/global-menu");
        // Authorization is sent with reads as well
        assert_eq!(requests[0].headers["Authorization"], "Basic 123");
        assert_eq!(requests[0].timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_named_menu_endpoint() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!([]))]);
        let sut = site.api_manager(transport.clone());

        sut.get("en", "footer-top-navigation", &RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].url,
            "https://www.hel.fi/en/api/v1/menu/footer-top-navigation"
        );
    }

    #[tokio::test]
    async fn test_cache_expires() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"value": 1})), Ok(json!({"value": 2}))]);
        let sut = site.api_manager(transport.clone());
        let options = RequestOptions::default();

        assert_eq!(sut.get("fi", "main", &options).await.unwrap().data["value"], 1);

        // Exactly at the TTL boundary the entry is still fresh
        site.clock.advance(CacheValue::DEFAULT_TTL);
        assert_eq!(sut.get("fi", "main", &options).await.unwrap().data["value"], 1);
        assert_eq!(transport.requests().len(), 1);

        site.clock.advance(1);
        assert_eq!(sut.get("fi", "main", &options).await.unwrap().data["value"], 2);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_on_error() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"value": 1})), Err(connect_error())]);
        let sut = site.api_manager(transport.clone());
        let options = RequestOptions::default();

        sut.get("fi", "main", &options).await.unwrap();
        site.clock.advance(CacheValue::DEFAULT_TTL + 1);

        // Refresh fails, the expired value stands in
        for _ in 0..3 {
            let response = sut.get("fi", "main", &options).await.unwrap();
            assert_eq!(response.data["value"], 1);
        }
        // One successful fetch, one failed refresh and nothing after that
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_error_without_cache() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Err(connect_error())]);
        let sut = site.api_manager(transport);

        assert_eq!(
            sut.get("fi", "main", &RequestOptions::default()).await,
            Err(ApiError::Transport(connect_error()))
        );
    }

    #[tokio::test]
    async fn test_fail_fast() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Err(connect_error())]);
        let sut = site.api_manager(transport.clone());

        for i in 0..50 {
            let result = sut
                .get("fi", &format!("menu-{i}"), &RequestOptions::default())
                .await;
            assert_eq!(result, Err(ApiError::Transport(connect_error())));
        }
        assert_eq!(
            sut.update("fi", json!({})).await,
            Err(ApiError::Transport(connect_error()))
        );
        assert_eq!(transport.requests().len(), 1);

        // A new instance starts with a clean slate
        transport.push(Ok(json!([])));
        let sut = site.api_manager(transport.clone());
        assert!(sut.get("fi", "main", &RequestOptions::default()).await.is_ok());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_fixture_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("api-v1-global-menu-fi.json"),
            r#"{"fixture": true}"#,
        )
        .unwrap();

        let site = TestSite::new("local").with_fixtures(dir.path());
        let transport = MockTransport::new(vec![Err(connect_error())]);
        let sut = site.api_manager(transport);

        let response = sut.get("fi", "main", &RequestOptions::default()).await.unwrap();
        assert_eq!(response.data, json!({"fixture": true}));

        // Same instance, different language: fails fast, no fixture either
        let err = sut
            .get("sv", "main", &RequestOptions::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::FixtureNotFound {
                message: "Connection refused".into(),
                file: "api-v1-global-menu-sv.json".into(),
                endpoint: "/api/v1/global-menu".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_fixture_fallback_on_client_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api-v1-menu-footer-fi.json"), "[]").unwrap();

        let site = TestSite::new("local").with_fixtures(dir.path());
        let transport = MockTransport::new(vec![Err(TransportError::new(
            TransportErrorKind::Status(403),
            "Forbidden",
        ))]);
        let sut = site.api_manager(transport);

        let response = sut.get("fi", "footer", &RequestOptions::default()).await.unwrap();
        assert_eq!(response.data, json!([]));
    }

    #[tokio::test]
    async fn test_no_fixture_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api-v1-global-menu-fi.json"), "{}").unwrap();
        let server_error = TransportError::new(TransportErrorKind::Status(500), "Server error");

        // Server errors are never replaced with fixtures
        let site = TestSite::new("local").with_fixtures(dir.path());
        let sut = site.api_manager(MockTransport::new(vec![Err(server_error.clone())]));
        assert_eq!(
            sut.get("fi", "main", &RequestOptions::default()).await,
            Err(ApiError::Transport(server_error))
        );

        // Neither is anything outside local deployments
        let site = TestSite::new("test").with_fixtures(dir.path());
        let sut = site.api_manager(MockTransport::new(vec![Err(connect_error())]));
        assert_eq!(
            sut.get("fi", "main", &RequestOptions::default()).await,
            Err(ApiError::Transport(connect_error()))
        );

        // Nor writes
        let site = TestSite::new("local").with_fixtures(dir.path());
        let sut = site.api_manager(MockTransport::new(vec![Err(connect_error())]));
        assert_eq!(
            sut.update("fi", json!({})).await,
            Err(ApiError::Transport(connect_error()))
        );
    }

    #[tokio::test]
    async fn test_cache_bypass() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"value": 1})), Ok(json!({"value": 2}))]);
        let sut = site.api_manager(transport.clone());
        let options = RequestOptions::default();

        for _ in 0..3 {
            assert_eq!(sut.get("en", "main", &options).await.unwrap().data["value"], 1);
        }

        let bypass = sut.with_bypass_cache();
        assert_eq!(bypass.get("en", "main", &options).await.unwrap().data["value"], 2);

        // The original instance keeps using the cache, now holding the
        // refreshed value. The queue only has two responses, so any request
        // would fail here.
        for _ in 0..3 {
            assert_eq!(sut.get("en", "main", &options).await.unwrap().data["value"], 2);
        }
        assert_eq!(transport.requests().len(), 2);

        // The bypassing instance keeps refetching
        transport.push(Ok(json!({"value": 3})));
        assert_eq!(bypass.get("en", "main", &options).await.unwrap().data["value"], 3);
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_bypass_falls_back_to_cache() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"value": 1})), Err(connect_error())]);
        let sut = site.api_manager(transport.clone());
        let options = RequestOptions::default();

        sut.get("fi", "main", &options).await.unwrap();

        let bypass = sut.with_bypass_cache();
        assert_eq!(bypass.get("fi", "main", &options).await.unwrap().data["value"], 1);

        // The failure stays with the bypassing instance
        transport.push(Ok(json!({"value": 2})));
        let second = sut.with_bypass_cache();
        assert_eq!(second.get("fi", "main", &options).await.unwrap().data["value"], 2);
    }

    #[tokio::test]
    async fn test_request_options() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Ok(json!({"value": 1})), Ok(json!({"value": 2}))]);
        let sut = site.api_manager(transport.clone());

        let mut options = RequestOptions::default();
        options.query.insert("max-depth".into(), "2".into());
        options.timeout = Some(Duration::from_secs(5));

        sut.get("fi", "main", &RequestOptions::default()).await.unwrap();
        let response = sut.get("fi", "main", &options).await.unwrap();
        // Different options, different cache entry
        assert_eq!(response.data["value"], 2);

        let requests = transport.requests();
        assert_eq!(requests[1].query["max-depth"], "2");
        assert_eq!(requests[1].timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_decode_error() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![]);
        transport.push_raw(Ok("<html>".into()));
        let sut = site.api_manager(transport);

        assert!(matches!(
            sut.get("fi", "main", &RequestOptions::default()).await,
            Err(ApiError::Decode(_))
        ));
    }

    #[test]
    fn test_get_url() {
        let site = TestSite::new("test");
        let sut = site.api_manager(MockTransport::new(vec![]));

        assert_eq!(
            sut.get_url(UrlKind::Canonical, "fi", "").unwrap(),
            "https://www.hel.fi/fi"
        );
        assert_eq!(
            sut.get_url(UrlKind::Js, "fi", "/api/v1/global-menu").unwrap(),
            "https://www.hel.fi/fi/api/v1/global-menu"
        );
        assert_eq!(
            sut.get_url(UrlKind::Api, "fi", "/api/v1/global-menu").unwrap(),
            "http://etusivu.internal/fi/api/v1/global-menu"
        );
        assert!(matches!(
            sut.get_url(UrlKind::Api, "de", "/api/v1/global-menu"),
            Err(ApiError::Environment(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_is_logged_once() {
        let logs = LogCounter::default();
        let _guard = logs.install();

        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![Err(connect_error())]);
        let sut = site.api_manager(transport.clone());

        for _ in 0..5 {
            assert!(sut.get("fi", "main", &RequestOptions::default()).await.is_err());
        }
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(logs.count(Level::ERROR), 1);
    }

    #[tokio::test]
    async fn test_fixture_fallback_logs_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api-v1-global-menu-fi.json"), "[]").unwrap();

        let logs = LogCounter::default();
        let _guard = logs.install();

        let site = TestSite::new("local").with_fixtures(dir.path());
        let sut = site.api_manager(MockTransport::new(vec![Err(connect_error())]));

        sut.get("fi", "main", &RequestOptions::default()).await.unwrap();
        assert_eq!(logs.count(Level::WARN), 1);
        assert_eq!(logs.count(Level::ERROR), 0);

        // The re-raised failure finds no Swedish fixture, still not logged twice
        assert!(sut.get("sv", "main", &RequestOptions::default()).await.is_err());
        assert_eq!(logs.count(Level::WARN), 1);
        assert_eq!(logs.count(Level::ERROR), 0);
    }

    #[tokio::test]
    async fn test_options_do_not_share_cache_entries() {
        let site = TestSite::new("test");
        let transport =
            MockTransport::new(vec![Ok(json!({"v": "query"})), Ok(json!({"v": "headers"}))]);
        let sut = site.api_manager(transport.clone());

        let mut query = RequestOptions::default();
        query.query.insert("x".into(), "1".into());
        let mut headers = RequestOptions::default();
        headers.headers.insert("x".into(), "1".into());

        assert_eq!(sut.get("fi", "main", &query).await.unwrap().data["v"], "query");
        assert_eq!(sut.get("fi", "main", &headers).await.unwrap().data["v"], "headers");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_is_available() {
        let site = TestSite::new("test");
        let transport = MockTransport::new(vec![
            Ok(json!({"liikenne": {}})),
            Ok(json!([])),
            Err(connect_error()),
            Ok(json!({"liikenne": {}})),
        ]);
        let sut = site.api_manager(transport.clone());

        assert!(sut.is_available("fi").await);
        assert!(!sut.is_available("fi").await);
        assert!(!sut.is_available("fi").await);
        // Not short-circuited by the earlier failure
        assert!(sut.is_available("fi").await);

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].url, "http://etusivu.internal/fi/api/v1/global-menu");
        assert_eq!(requests[0].headers["Authorization"], "Basic 123");
    }

    #[tokio::test]
    async fn test_is_available_skips_cache_and_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("api-v1-global-menu-fi.json"), "[1]").unwrap();

        let site = TestSite::new("local").with_fixtures(dir.path());
        let transport = MockTransport::new(vec![Ok(json!([1])), Err(connect_error())]);
        let sut = site.api_manager(transport);

        sut.get("fi", "main", &RequestOptions::default()).await.unwrap();
        assert!(!sut.is_available("fi").await);
    }

    #[test]
    fn test_mock_clock() {
        let clock = MockClock::new(10);
        clock.advance(5);
        assert_eq!(clock.request_time(), 15);
    }
}
