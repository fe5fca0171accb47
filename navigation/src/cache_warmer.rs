use crate::api_manager::ApiManager;
use crate::transport::RequestOptions;
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "error")]
pub enum WarmOutcome {
    Changed,
    Unchanged,
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WarmedMenu {
    pub langcode: String,
    pub menu_id: String,
    #[serde(flatten)]
    pub outcome: WarmOutcome,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WarmReport {
    pub menus: Vec<WarmedMenu>,
}

impl WarmReport {
    /// Menus whose content differs from the previous warm.
    pub fn changed(&self) -> impl Iterator<Item = &WarmedMenu> {
        self.menus
            .iter()
            .filter(|menu| menu.outcome == WarmOutcome::Changed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &WarmedMenu> {
        self.menus
            .iter()
            .filter(|menu| matches!(menu.outcome, WarmOutcome::Failed(_)))
    }
}

/// Refreshes cached menus ahead of readers and tracks which ones changed.
#[derive(Default)]
pub struct CacheWarmer {
    /// "{langcode}:{menu_id}" -> sha256 of the last payload
    hashes: Mutex<HashMap<String, String>>,
}

impl CacheWarmer {
    pub fn new() -> Self {
        CacheWarmer::default()
    }

    /// Refetches the given menus and `main` for every language. Failures
    /// end up in the report.
    pub async fn warm(
        &self,
        api: &ApiManager,
        languages: &[String],
        menu_ids: &[String],
    ) -> WarmReport {
        let mut report = WarmReport::default();

        for langcode in languages {
            let menus = menu_ids
                .iter()
                .map(String::as_str)
                .filter(|id| *id != "main")
                .chain(["main"]);

            for menu_id in menus {
                let outcome = match api
                    .with_bypass_cache()
                    .get(langcode, menu_id, &RequestOptions::default())
                    .await
                {
                    Ok(response) => self.record(langcode, menu_id, &response.data),
                    Err(e) => {
                        tracing::debug!(error = %e, langcode, menu_id, "Failed to warm menu");
                        WarmOutcome::Failed(e.to_string())
                    }
                };

                report.menus.push(WarmedMenu {
                    langcode: langcode.clone(),
                    menu_id: menu_id.to_string(),
                    outcome,
                });
            }
        }
        report
    }

    fn record(&self, langcode: &str, menu_id: &str, data: &serde_json::Value) -> WarmOutcome {
        let hash = format!("{:x}", Sha256::digest(data.to_string().as_bytes()));
        let key = format!("{langcode}:{menu_id}");

        let mut hashes = self.hashes.lock();
        if hashes.get(&key) == Some(&hash) {
            return WarmOutcome::Unchanged;
        }
        hashes.insert(key, hash);
        WarmOutcome::Changed
    }
}
