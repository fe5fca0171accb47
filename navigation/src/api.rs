use crate::Navigation;
use crate::config::Listener as ListenerConfig;
use crate::main_menu::SyncError;
use crate::transport::RequestOptions;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ApiServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub async fn serve(
    listener: ListenerConfig,
    navigation: Arc<Navigation>,
) -> Result<(), ApiServerError> {
    let addr = format!("{}:{}", listener.host, listener.port);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");
    axum::serve(listener, router(navigation)).await?;
    Ok(())
}

pub fn router(navigation: Arc<Navigation>) -> Router {
    Router::new()
        .route("/api/v1/global-mobile-menu", get(global_mobile_menu))
        .route("/health", get(health))
        .route("/health/upstream", get(upstream_health))
        .with_state(navigation)
}

#[derive(Serialize)]
struct ApiErrorResponse {
    error_message: String,
}

#[derive(Deserialize, Debug)]
struct Params {
    langcode: Option<String>,
}

async fn health() -> &'static str {
    "ok"
}

/// Whether the global menu API can be reached from here.
async fn upstream_health(State(navigation): State<Arc<Navigation>>) -> Response {
    let langcode = &navigation.config().site.default_language;

    if navigation.api_manager().is_available(langcode).await {
        (StatusCode::OK, "ok").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response()
    }
}

/// The global menu for mobile navigation. Sites that don't push their menu
/// upstream get it injected here so it is still part of the result.
async fn global_mobile_menu(
    State(navigation): State<Arc<Navigation>>,
    Query(params): Query<Params>,
) -> Response {
    let langcode = params
        .langcode
        .unwrap_or_else(|| navigation.config().site.default_language.clone());
    let api = navigation.api_manager();

    let response = match api.get(&langcode, "main", &RequestOptions::default()).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(error = %e, langcode, "Global menu not available");
            return (StatusCode::NOT_FOUND, Json(json!([]))).into_response();
        }
    };

    if api.has_authorization() {
        return Json(response.data).into_response();
    }

    match inject_local_menu(&navigation, &langcode, response.data) {
        Ok(data) => Json(data).into_response(),
        Err(e) => {
            tracing::error!(error = %e, langcode, "Failed to build local menu");
            let body = Json(ApiErrorResponse {
                error_message: e.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

fn inject_local_menu(
    navigation: &Navigation,
    langcode: &str,
    data: Value,
) -> Result<Value, SyncError> {
    let manager = navigation.main_menu_manager();

    let mut menu_tree = json!(manager.build(langcode)?);
    if let Value::Object(tree) = &mut menu_tree {
        tree.insert("is_injected".into(), Value::Bool(true));
    }

    let project = navigation.environments().active().id.clone();
    let site = json!({
        "langcode": [{"value": langcode}],
        "menu_tree": [menu_tree],
        "name": [{"value": manager.site_name(langcode)?}],
        "project": [{"value": project}],
        "status": [{"value": true}],
        "weight": [{"value": 0}],
    });

    let mut data = match data {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            tracing::warn!(
                langcode,
                payload = %other,
                "Global menu is not keyed by project, replacing it with the local menu"
            );
            Map::new()
        }
    };
    data.insert(project, site);
    Ok(Value::Object(data))
}
