use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

pub type Attributes = Map<String, Value>;

/// A menu link as exchanged with the upstream API.
///
/// The same shape travels both ways: the local menu is pushed upstream in it,
/// and menus fetched from upstream are decoded into it before rendering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        rename = "parentId",
        alias = "parent_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<String>,
    /// Left unset by payloads that don't assert it; resolved from the URL then.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external: Option<bool>,
    #[serde(default, rename = "hasItems")]
    pub has_items: bool,
    #[serde(default)]
    pub expanded: bool,
    #[serde(default)]
    pub weight: i64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Attributes,
    /// Root path ids: the item itself first, then each ancestor, closest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(default, alias = "below", skip_serializing_if = "Vec::is_empty")]
    pub sub_tree: Vec<MenuItem>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
