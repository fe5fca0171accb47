use crate::api_manager::{ApiError, ApiManager};
use crate::config::SiteConfig;
use crate::environment::EnvironmentError;
use crate::menu::local::{MenuSource, MenuSourceError, Viewer};
use crate::menu::tree_builder::{MenuTreeBuilder, RootElement, TreeError};
use crate::types::MenuItem;
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum SyncError {
    #[error("Missing site name for language {0}")]
    MissingSiteName(String),

    #[error("Failed to parse entity published state.")]
    MissingStatus,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error(transparent)]
    Source(#[from] MenuSourceError),
}

/// Publishes this site's main menu to the global menu.
pub struct MainMenuManager {
    api: ApiManager,
    site: Arc<SiteConfig>,
    source: Arc<dyn MenuSource>,
    builder: MenuTreeBuilder,
}

impl MainMenuManager {
    pub fn new(
        api: ApiManager,
        site: Arc<SiteConfig>,
        source: Arc<dyn MenuSource>,
        builder: MenuTreeBuilder,
    ) -> Self {
        MainMenuManager {
            api,
            site,
            source,
            builder,
        }
    }

    /// Translated site name, falling back to the default language name.
    pub fn site_name(&self, langcode: &str) -> Result<String, SyncError> {
        self.site
            .translations
            .get(langcode)
            .filter(|name| !name.is_empty())
            .or(Some(&self.site.name).filter(|name| !name.is_empty()))
            .cloned()
            .ok_or_else(|| SyncError::MissingSiteName(langcode.to_string()))
    }

    pub fn root_element(&self, langcode: &str) -> Result<RootElement, SyncError> {
        let name = self.site_name(langcode)?;
        let url = self.api.environments().active().url(langcode)?.to_string();

        Ok(RootElement {
            id: format!("base:{}", slug(&name)),
            name,
            url,
        })
    }

    /// The local menu as pushed upstream. Always evaluated for anonymous
    /// users, so restricted links never leave the site.
    pub fn build(&self, langcode: &str) -> Result<MenuItem, SyncError> {
        let menu = self.source.load()?;
        let root = self.root_element(langcode)?;

        Ok(self
            .builder
            .build_rooted(&menu, langcode, &root, Viewer::Anonymous)?)
    }

    /// Pushes the menu upstream. Returns the published state upstream
    /// reports back.
    pub async fn sync(&self, langcode: &str) -> Result<bool, SyncError> {
        let payload = json!({
            "langcode": langcode,
            "site_name": self.site_name(langcode)?,
            "menu_tree": self.build(langcode)?,
        });

        let response = self.api.update(langcode, payload).await?;
        let status = published_status(&response.data).ok_or(SyncError::MissingStatus)?;

        tracing::info!(langcode, status, "Main menu synced");
        Ok(status)
    }
}

/// `status[0].value` of an upstream entity.
fn published_status(data: &Value) -> Option<bool> {
    let first = match data.get("status")? {
        Value::Array(values) => values.first()?,
        Value::Object(map) => map.values().next()?,
        _ => return None,
    };
    first.get("value")?.as_bool()
}

fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut in_run = false;

    // Runs of anything outside [a-z0-9_] collapse into one underscore.
    for c in name.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('_');
            in_run = true;
        }
    }
    slug
}
