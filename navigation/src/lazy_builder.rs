use crate::api_manager::{ApiError, ApiManager};
use crate::menu::external::{BuildOptions, ExternalMenuTreeBuilder, MenuLink, RequestContext};
use crate::menu::tree_builder::TreeError;
use crate::response::MenuPayload;
use crate::transport::RequestOptions;
use serde::Serialize;

/// Cache lifetime of a render that had to give up.
pub const FAILED_RENDER_MAX_AGE: u64 = 60;

#[derive(thiserror::Error, Debug)]
enum RenderError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid menu payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderedMenu {
    pub menu_type: String,
    /// `None` when the menu could not be built
    pub items: Option<Vec<MenuLink>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
}

/// Renders an upstream menu for display. Never fails: a menu that can't be
/// built renders as nothing, and only briefly.
pub struct ExternalMenuLazyBuilder<'a> {
    api: &'a ApiManager,
    tree_builder: &'a ExternalMenuTreeBuilder,
}

impl<'a> ExternalMenuLazyBuilder<'a> {
    pub fn new(api: &'a ApiManager, tree_builder: &'a ExternalMenuTreeBuilder) -> Self {
        ExternalMenuLazyBuilder { api, tree_builder }
    }

    pub async fn build(
        &self,
        menu_id: &str,
        langcode: &str,
        request_options: &RequestOptions,
        options: &BuildOptions,
        request: Option<&RequestContext>,
    ) -> RenderedMenu {
        match self
            .try_build(menu_id, langcode, request_options, options, request)
            .await
        {
            Ok(items) => RenderedMenu {
                menu_type: menu_id.to_string(),
                items: Some(items),
                max_age: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, menu_id, langcode, "Failed to render external menu");
                RenderedMenu {
                    menu_type: menu_id.to_string(),
                    items: None,
                    max_age: Some(FAILED_RENDER_MAX_AGE),
                }
            }
        }
    }

    async fn try_build(
        &self,
        menu_id: &str,
        langcode: &str,
        request_options: &RequestOptions,
        options: &BuildOptions,
        request: Option<&RequestContext>,
    ) -> Result<Vec<MenuLink>, RenderError> {
        let response = self.api.get(langcode, menu_id, request_options).await?;
        let items = MenuPayload::parse(&response.data)?.into_items()?;

        Ok(self.tree_builder.build(&items, options, request)?)
    }
}
