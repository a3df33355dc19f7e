//! Reading configuration values and building state objects
//!
//! Expand side: typed getters over `Dynamic` objects that treat null and
//! unknown alike as "not set". Flatten side: `ObjectBuilder`, which turns
//! wire values back into the object shape the schema declares.

use std::collections::{BTreeMap, HashMap};

use tfplug::plan::changed_attributes;
use tfplug::schema::Block;
use tfplug::types::{Dynamic, DynamicValue};

pub fn get_string(value: &Dynamic, key: &str) -> Option<String> {
    value.get(key).as_string().map(str::to_string)
}

/// Like `get_string` but an empty string counts as unset
pub fn get_non_empty(value: &Dynamic, key: &str) -> Option<String> {
    get_string(value, key).filter(|s| !s.is_empty())
}

pub fn get_i64(value: &Dynamic, key: &str) -> Option<i64> {
    value.get(key).as_number().map(|n| n as i64)
}

pub fn get_bool(value: &Dynamic, key: &str) -> Option<bool> {
    value.get(key).as_bool()
}

/// List or set of strings; None when unset
pub fn get_strings(value: &Dynamic, key: &str) -> Option<Vec<String>> {
    value.get(key).as_list().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_string().map(str::to_string))
            .collect()
    })
}

pub fn get_string_map(value: &Dynamic, key: &str) -> Option<BTreeMap<String, String>> {
    value.get(key).as_map().map(|entries| {
        entries
            .iter()
            .filter_map(|(k, v)| v.as_string().map(|s| (k.clone(), s.to_string())))
            .collect()
    })
}

/// The single element of a list block limited to one item, or a single-nested block
pub fn first_block<'a>(value: &'a Dynamic, key: &str) -> Option<&'a Dynamic> {
    match value.get(key) {
        Dynamic::List(items) => items.first(),
        block @ Dynamic::Map(_) => Some(block),
        _ => None,
    }
}

pub fn blocks<'a>(value: &'a Dynamic, key: &str) -> Vec<&'a Dynamic> {
    match value.get(key) {
        Dynamic::List(items) => items.iter().collect(),
        _ => vec![],
    }
}

pub fn require_string(value: &Dynamic, key: &str) -> Result<String, String> {
    get_string(value, key).ok_or_else(|| format!("\"{}\" must be set", key))
}

/// Name of the first of `variants` present as a nested block of `value`
pub fn variant<'a>(value: &Dynamic, variants: &[&'a str]) -> Option<&'a str> {
    variants
        .iter()
        .copied()
        .find(|name| first_block(value, name).is_some())
}

/// Exactly one of `variants` is set; passes while any of them is unknown
pub fn exactly_one_block(value: &Dynamic, variants: &[&str]) -> bool {
    if variants.iter().any(|name| value.get(name).is_unknown()) {
        return true;
    }
    variants
        .iter()
        .filter(|name| first_block(value, name).is_some())
        .count()
        == 1
}

/// Replaces unknown values with null so a partial plan can be saved as state
pub fn resolve_unknowns(value: Dynamic) -> Dynamic {
    match value {
        Dynamic::Unknown => Dynamic::Null,
        Dynamic::List(items) => Dynamic::List(items.into_iter().map(resolve_unknowns).collect()),
        Dynamic::Map(entries) => Dynamic::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k, resolve_unknowns(v)))
                .collect(),
        ),
        other => other,
    }
}

/// True when any top-level attribute or block other than `ignored` differs
pub fn has_changes(block: &Block, prior: &Dynamic, planned: &Dynamic, ignored: &[&str]) -> bool {
    changed_attributes(block, prior, planned)
        .iter()
        .any(|name| !ignored.contains(&name.as_str()))
}

/// Builds a state object one attribute at a time
#[derive(Debug, Default, Clone)]
pub struct ObjectBuilder {
    values: HashMap<String, Dynamic>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing object so unmapped attributes (timeouts,
    /// write-only fields, version counters) carry over
    pub fn from_value(value: &Dynamic) -> Self {
        Self {
            values: value.as_map().cloned().unwrap_or_default(),
        }
    }

    pub fn set(mut self, key: &str, value: impl Into<Dynamic>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn number(self, key: &str, value: Option<i64>) -> Self {
        self.set(key, value.map(|n| n as f64))
    }

    pub fn strings(self, key: &str, value: Option<Vec<String>>) -> Self {
        let value = match value {
            Some(items) => Dynamic::List(items.into_iter().map(Dynamic::String).collect()),
            None => Dynamic::Null,
        };
        self.set(key, value)
    }

    pub fn string_map(self, key: &str, value: Option<BTreeMap<String, String>>) -> Self {
        let value = match value {
            Some(entries) => Dynamic::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Dynamic::String(v)))
                    .collect(),
            ),
            None => Dynamic::Null,
        };
        self.set(key, value)
    }

    /// A list block holding zero or one element
    pub fn block(self, key: &str, value: Option<Dynamic>) -> Self {
        self.set(key, Dynamic::List(value.into_iter().collect()))
    }

    pub fn block_list(self, key: &str, values: Vec<Dynamic>) -> Self {
        self.set(key, Dynamic::List(values))
    }

    pub fn build(self) -> Dynamic {
        Dynamic::Map(self.values)
    }

    pub fn into_value(self) -> DynamicValue {
        DynamicValue::new(self.build())
    }
}
