use crate::config::LinkAlterConfig;
use crate::environment::EnvironmentResolver;
use crate::types::MenuItem;
use std::collections::HashMap;

/// Rewrites the URL of an outbound menu item. Runs once per item, after
/// every other field of the item is final.
pub trait LinkAlter: Send + Sync {
    fn alter(&self, url: &str, langcode: &str, item: &MenuItem) -> String;
}

/// Leaves every URL as is.
pub struct NoopAlter;

impl LinkAlter for NoopAlter {
    fn alter(&self, url: &str, _langcode: &str, _item: &MenuItem) -> String {
        url.to_string()
    }
}

/// Makes site relative URLs absolute when this site and the upstream are
/// served from different hosts. Other sites would resolve them against
/// the wrong host otherwise.
pub struct AbsoluteUrlAlter {
    base_url: Option<String>,
}

impl AbsoluteUrlAlter {
    pub fn new(base_url: Option<String>) -> Self {
        AbsoluteUrlAlter { base_url }
    }

    pub fn from_environments(environments: &EnvironmentResolver) -> Self {
        let active = environments.active().base_url();

        if active.is_some() && active == environments.upstream().base_url() {
            return AbsoluteUrlAlter::new(None);
        }
        AbsoluteUrlAlter::new(active)
    }
}

impl LinkAlter for AbsoluteUrlAlter {
    fn alter(&self, url: &str, _langcode: &str, _item: &MenuItem) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') && !url.starts_with("//") => {
                format!("{base}{url}")
            }
            _ => url.to_string(),
        }
    }
}

/// Points links at their redirect target, so the synced menu never links
/// to a path that only redirects.
pub struct RedirectAlter {
    /// langcode -> (source path -> destination)
    redirects: HashMap<String, HashMap<String, String>>,
    front_page: Option<String>,
}

impl RedirectAlter {
    pub fn new(
        redirects: HashMap<String, HashMap<String, String>>,
        front_page: Option<String>,
    ) -> Self {
        RedirectAlter {
            redirects,
            front_page,
        }
    }

    fn find(&self, path: &str, langcode: &str) -> Option<&String> {
        let prefix = format!("/{langcode}");

        let path = match path.strip_prefix(&prefix) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        };
        self.redirects.get(langcode)?.get(path)
    }
}

impl LinkAlter for RedirectAlter {
    fn alter(&self, url: &str, langcode: &str, _item: &MenuItem) -> String {
        if !url.starts_with('/') {
            return url.to_string();
        }

        let mut candidates = vec![url];
        // The front page can be redirected through its internal path too.
        if url == format!("/{langcode}")
            && let Some(front) = &self.front_page
        {
            candidates.push(front);
        }

        candidates
            .into_iter()
            .find_map(|candidate| self.find(candidate, langcode))
            .cloned()
            .unwrap_or_else(|| url.to_string())
    }
}

pub fn from_config(config: &LinkAlterConfig, environments: &EnvironmentResolver) -> Box<dyn LinkAlter> {
    match config {
        LinkAlterConfig::AbsoluteUrl => Box::new(AbsoluteUrlAlter::from_environments(environments)),
        LinkAlterConfig::Redirects {
            redirects,
            front_page,
        } => Box::new(RedirectAlter::new(redirects.clone(), front_page.clone())),
        LinkAlterConfig::None => Box::new(NoopAlter),
    }
}
