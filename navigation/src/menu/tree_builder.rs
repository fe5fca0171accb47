//! Builds the wire format tree pushed upstream from the local menu.

use super::link_alter::LinkAlter;
use super::local::{LocalMenu, LocalTreeNode, Viewer};
use crate::domain::{InternalDomainResolver, LinkUrl};
use crate::types::{Attributes, MenuItem};
use serde_json::Value;
use std::sync::Arc;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("Missing root element name, url or id")]
    InvalidRootElement,

    #[error("Request is not set")]
    MissingRequest,
}

/// The item standing in for this site in the global menu.
#[derive(Clone, Debug, PartialEq)]
pub struct RootElement {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl RootElement {
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.id.is_empty() || self.name.is_empty() || self.url.is_empty() {
            return Err(TreeError::InvalidRootElement);
        }
        Ok(())
    }
}

pub struct MenuTreeBuilder {
    domains: Arc<InternalDomainResolver>,
    link_alter: Arc<dyn LinkAlter>,
}

impl MenuTreeBuilder {
    pub fn new(domains: Arc<InternalDomainResolver>, link_alter: Arc<dyn LinkAlter>) -> Self {
        MenuTreeBuilder {
            domains,
            link_alter,
        }
    }

    /// First level links of the menu, without a root.
    pub fn build(&self, menu: &LocalMenu, langcode: &str, viewer: Viewer) -> Vec<MenuItem> {
        self.transform(menu, &menu.tree(), langcode, None, viewer)
    }

    /// The menu nested under `root`. First level links get the root as
    /// their parent.
    pub fn build_rooted(
        &self,
        menu: &LocalMenu,
        langcode: &str,
        root: &RootElement,
        viewer: Viewer,
    ) -> Result<MenuItem, TreeError> {
        root.validate()?;

        let sub_tree = self.transform(menu, &menu.tree(), langcode, Some(&root.id), viewer);
        let item = MenuItem {
            id: root.id.clone(),
            name: root.name.clone(),
            external: Some(false),
            has_items: !sub_tree.is_empty(),
            weight: 0,
            sub_tree,
            ..Default::default()
        };
        Ok(self.process_item(&root.url, langcode, item))
    }

    fn transform(
        &self,
        menu: &LocalMenu,
        nodes: &[LocalTreeNode<'_>],
        langcode: &str,
        root_id: Option<&str>,
        viewer: Viewer,
    ) -> Vec<MenuItem> {
        let mut items = Vec::with_capacity(nodes.len());

        for node in nodes {
            let link = node.link;

            let Some(translation) = link.translation(langcode) else {
                continue;
            };
            if !viewer.can_view(link.visibility) {
                continue;
            }

            let url = LinkUrl::parse(translation.url.as_deref().or(link.url.as_deref()));
            let external = self.domains.is_external(&url);

            let mut parents = menu.parent_ids(&link.id);
            if let Some(root_id) = root_id
                && !parents.iter().any(|id| id == root_id)
            {
                parents.push(root_id.to_string());
            }

            let mut attributes = Attributes::new();
            if external {
                attributes.insert("data-external".into(), Value::Bool(true));
            }
            if let Some(protocol) = self.domains.protocol(&url) {
                attributes.insert("data-protocol".into(), protocol.into());
            }
            if let Some(lang) = translation.lang_attribute.as_deref().filter(|l| !l.is_empty()) {
                attributes.insert("lang".into(), lang.into());
            }

            let sub_tree = self.transform(menu, &node.children, langcode, root_id, viewer);

            let item = MenuItem {
                id: link.id.clone(),
                name: translation.title.clone(),
                url: None,
                parent_id: link.parent.clone().or(root_id.map(String::from)),
                external: Some(external),
                has_items: !sub_tree.is_empty(),
                expanded: link.expanded,
                weight: link.weight,
                attributes,
                parents,
                sub_tree,
            };

            let raw = match url {
                LinkUrl::NoLink => String::new(),
                url => url.to_string(),
            };
            items.push(self.process_item(&raw, langcode, item));
        }
        items
    }

    fn process_item(&self, url: &str, langcode: &str, mut item: MenuItem) -> MenuItem {
        item.url = Some(self.link_alter.alter(url, langcode, &item));
        item
    }
}
