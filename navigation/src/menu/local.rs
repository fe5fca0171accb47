//! The menu maintained on this site.
//!
//! Links are stored flat with a parent reference, the way a content store
//! hands them out. [`LocalMenu::tree`] turns them into a hierarchy.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Only visible to privileged users
    Restricted,
}

/// Who the menu is evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    Privileged,
}

impl Viewer {
    pub fn can_view(self, visibility: Visibility) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Restricted => self == Viewer::Privileged,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LinkTranslation {
    pub title: String,
    #[serde(default = "default_true")]
    pub published: bool,
    /// Overrides the link URL for this language
    #[serde(default)]
    pub url: Option<String>,
    /// Value of the `lang` attribute, for titles written in another language
    #[serde(default)]
    pub lang_attribute: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LocalMenuLink {
    pub id: String,
    /// Title in the default language, used for sorting
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub weight: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_true")]
    pub translatable: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub translations: HashMap<String, LinkTranslation>,
}

fn default_true() -> bool {
    true
}

impl LocalMenuLink {
    /// The published translation for the language, if the link has one.
    pub fn translation(&self, langcode: &str) -> Option<&LinkTranslation> {
        if !self.translatable {
            return None;
        }
        self.translations
            .get(langcode)
            .filter(|translation| translation.published)
    }
}

/// A link and its enabled children.
#[derive(Debug)]
pub struct LocalTreeNode<'a> {
    pub link: &'a LocalMenuLink,
    pub children: Vec<LocalTreeNode<'a>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct LocalMenu {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub links: Vec<LocalMenuLink>,
}

impl LocalMenu {
    pub fn get(&self, id: &str) -> Option<&LocalMenuLink> {
        self.links.iter().find(|link| link.id == id)
    }

    /// Enabled links as a hierarchy, siblings sorted by weight and title.
    ///
    /// Children of a disabled link are left out with it. So are links whose
    /// parent doesn't exist.
    pub fn tree(&self) -> Vec<LocalTreeNode<'_>> {
        self.children_of(None)
    }

    fn children_of(&self, parent: Option<&str>) -> Vec<LocalTreeNode<'_>> {
        let mut links: Vec<&LocalMenuLink> = self
            .links
            .iter()
            .filter(|link| link.enabled && link.parent.as_deref() == parent)
            .collect();
        links.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.title.cmp(&b.title)));

        links
            .into_iter()
            .map(|link| LocalTreeNode {
                link,
                children: self.children_of(Some(&link.id)),
            })
            .collect()
    }

    /// Root path of a link: the link itself, then its ancestors closest first.
    pub fn parent_ids(&self, id: &str) -> Vec<String> {
        let mut ids = Vec::new();
        let mut current = self.get(id);

        while let Some(link) = current {
            // Broken data could contain a cycle.
            if ids.contains(&link.id) {
                break;
            }
            ids.push(link.id.clone());
            current = link.parent.as_deref().and_then(|parent| self.get(parent));
        }
        ids
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MenuSourceError {
    #[error("could not read menu file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse menu file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Supplies the local menu.
pub trait MenuSource: Send + Sync {
    fn load(&self) -> Result<LocalMenu, MenuSourceError>;
}

/// Reads the menu from a YAML file on every load.
pub struct FileMenuSource {
    path: PathBuf,
}

impl FileMenuSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileMenuSource { path: path.into() }
    }
}

impl MenuSource for FileMenuSource {
    fn load(&self) -> Result<LocalMenu, MenuSourceError> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// A fixed menu, for sites that have none of their own and for tests.
pub struct StaticMenuSource {
    menu: LocalMenu,
}

impl StaticMenuSource {
    pub fn new(menu: LocalMenu) -> Self {
        StaticMenuSource { menu }
    }
}

impl MenuSource for StaticMenuSource {
    fn load(&self) -> Result<LocalMenu, MenuSourceError> {
        Ok(self.menu.clone())
    }
}
