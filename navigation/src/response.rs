use crate::types::MenuItem;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// A decoded upstream response.
///
/// Wrapping the value keeps "nothing was returned" apart from an empty
/// object or list that upstream actually sent.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiResponse {
    pub data: Value,
}

impl ApiResponse {
    pub fn new(data: Value) -> Self {
        ApiResponse { data }
    }

    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        Ok(ApiResponse {
            data: serde_json::from_str(body)?,
        })
    }
}

/// One site entry of the aggregated global menu.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MenuEnvelope {
    #[serde(default)]
    pub menu_tree: Option<Value>,
}

/// The two shapes menu endpoints answer with.
///
/// Named menus come back as a plain list of items. The global menu comes
/// back as an object keyed by project, each entry wrapping its own tree.
#[derive(Debug)]
pub enum MenuPayload {
    Flat(Vec<MenuItem>),
    Keyed(IndexMap<String, MenuEnvelope>),
}

impl MenuPayload {
    pub fn parse(data: &Value) -> Result<Self, serde_json::Error> {
        match data {
            Value::Array(items) => Ok(MenuPayload::Flat(decode_items(items)?)),
            Value::Object(map) => {
                let numeric = map
                    .keys()
                    .next()
                    .is_some_and(|key| key.parse::<u64>().is_ok());

                if numeric {
                    let items: Vec<Value> = map.values().cloned().collect();
                    return Ok(MenuPayload::Flat(decode_items(&items)?));
                }

                let mut envelopes = IndexMap::with_capacity(map.len());
                for (project, entry) in map {
                    // Entries without a menu tree are skipped later on, so
                    // anything that isn't an object is treated the same way.
                    let envelope = match entry {
                        Value::Object(_) => MenuEnvelope::deserialize(entry)?,
                        _ => MenuEnvelope::default(),
                    };
                    envelopes.insert(project.clone(), envelope);
                }
                Ok(MenuPayload::Keyed(envelopes))
            }
            _ => Ok(MenuPayload::Flat(Vec::new())),
        }
    }

    pub fn into_items(self) -> Result<Vec<MenuItem>, serde_json::Error> {
        match self {
            MenuPayload::Flat(items) => Ok(items),
            MenuPayload::Keyed(envelopes) => {
                let mut tree = Vec::with_capacity(envelopes.len());

                for envelope in envelopes.into_values() {
                    // Each site contributes the first element of its tree,
                    // which is the site's root item.
                    let root = match envelope.menu_tree {
                        Some(Value::Array(mut items)) if !items.is_empty() => items.swap_remove(0),
                        Some(Value::Object(map)) if map.contains_key("id") => Value::Object(map),
                        Some(Value::Object(map)) => match map.into_iter().next() {
                            Some((_, first)) => first,
                            None => continue,
                        },
                        _ => continue,
                    };
                    tree.push(MenuItem::deserialize(root)?);
                }
                Ok(tree)
            }
        }
    }
}

fn decode_items(items: &[Value]) -> Result<Vec<MenuItem>, serde_json::Error> {
    items.iter().map(MenuItem::deserialize).collect()
}
