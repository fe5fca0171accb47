//! Turns menu items fetched from upstream into a render tree.

use super::tree_builder::TreeError;
use crate::domain::{InternalDomainResolver, LinkUrl};
use crate::types::{Attributes, MenuItem};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq)]
pub struct BuildOptions {
    pub menu_type: String,
    /// Deepest level rendered
    pub max_depth: usize,
    /// Depth of the items passed in, starting from 1
    pub level: usize,
    pub expand_all_items: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            menu_type: "main".into(),
            max_depth: 10,
            level: 1,
            expand_all_items: false,
        }
    }
}

/// The page being rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    path: String,
}

impl RequestContext {
    /// Accepts a full URI or a site relative path.
    pub fn new(uri: &str) -> Self {
        let path = LinkUrl::parse(Some(uri)).path().unwrap_or("/").to_string();
        RequestContext { path }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MenuLink {
    pub title: String,
    pub id: String,
    pub parent_id: Option<String>,
    #[serde(serialize_with = "serialize_url")]
    pub url: LinkUrl,
    pub external: bool,
    pub attributes: Attributes,
    pub is_expanded: bool,
    pub in_active_trail: bool,
    #[serde(rename = "is_currentPage")]
    pub is_current_page: bool,
    pub weight: i64,
    pub menu_name: String,
    pub below: Vec<MenuLink>,
}

fn serialize_url<S: Serializer>(url: &LinkUrl, serializer: S) -> Result<S::Ok, S::Error> {
    match url {
        LinkUrl::NoLink => serializer.serialize_none(),
        url => serializer.collect_str(url),
    }
}

pub struct ExternalMenuTreeBuilder {
    domains: Arc<InternalDomainResolver>,
}

impl ExternalMenuTreeBuilder {
    pub fn new(domains: Arc<InternalDomainResolver>) -> Self {
        ExternalMenuTreeBuilder { domains }
    }

    /// Builds the render tree.
    ///
    /// The whole input is walked even past `max_depth`, so a link to the
    /// current page puts its ancestors in the active trail wherever it sits.
    /// A request context is required as soon as any link needs comparing.
    pub fn build(
        &self,
        items: &[MenuItem],
        options: &BuildOptions,
        request: Option<&RequestContext>,
    ) -> Result<Vec<MenuLink>, TreeError> {
        let mut active_trail = HashSet::new();
        let mut tree = self.transform(items, options, options.level, request, &mut active_trail)?;

        update_active_trail(&mut tree, &active_trail);
        Ok(tree)
    }

    fn transform(
        &self,
        items: &[MenuItem],
        options: &BuildOptions,
        level: usize,
        request: Option<&RequestContext>,
        active_trail: &mut HashSet<String>,
    ) -> Result<Vec<MenuLink>, TreeError> {
        let mut links = Vec::with_capacity(items.len());

        for item in items {
            let mut link = self.create_link(item, options, request, active_trail)?;

            if !item.sub_tree.is_empty() {
                let below =
                    self.transform(&item.sub_tree, options, level + 1, request, active_trail)?;
                if level < options.max_depth {
                    link.below = below;
                }
            }
            links.push(link);
        }
        Ok(links)
    }

    fn create_link(
        &self,
        item: &MenuItem,
        options: &BuildOptions,
        request: Option<&RequestContext>,
        active_trail: &mut HashSet<String>,
    ) -> Result<MenuLink, TreeError> {
        let url = LinkUrl::parse(item.url.as_deref());
        let external = item
            .external
            .unwrap_or_else(|| self.domains.is_external(&url));

        let current = is_current_page(&url, external, request)?;
        if current {
            active_trail.insert(item.id.clone());
            active_trail.extend(item.parents.iter().cloned());
        }

        Ok(MenuLink {
            title: item.name.clone(),
            id: item.id.clone(),
            parent_id: item.parent_id.clone(),
            url,
            external,
            attributes: item.attributes.clone(),
            is_expanded: options.expand_all_items || item.expanded,
            in_active_trail: current,
            is_current_page: current,
            weight: item.weight,
            menu_name: options.menu_type.clone(),
            below: Vec::new(),
        })
    }
}

fn is_current_page(
    url: &LinkUrl,
    external: bool,
    request: Option<&RequestContext>,
) -> Result<bool, TreeError> {
    if url.is_no_link() || external {
        return Ok(false);
    }
    let request = request.ok_or(TreeError::MissingRequest)?;

    // Hosts are ignored, the same page may be served from several domains.
    Ok(url.path() == Some(request.path()))
}

fn update_active_trail(tree: &mut [MenuLink], active_trail: &HashSet<String>) {
    for link in tree {
        update_active_trail(&mut link.below, active_trail);
        if active_trail.contains(&link.id) {
            link.in_active_trail = true;
        }
    }
}
