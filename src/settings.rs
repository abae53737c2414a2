//! # Canonical Settings Documents
//!
//! This module provides `CanonicalConfig`, an ordered tree of settings keyed
//! by dotted paths (`elasticsearch.ssl.enabled`), together with the
//! `SettingValue` variant that every layer is converted into before merging.
//!
//! ## Parsing
//!
//! Raw input arrives as YAML, either as text or as an already-parsed
//! `serde_yaml::Value`. Dotted keys are expanded into nested mappings, so
//! `a.b: 1` and `a: {b: 1}` produce the same document. Within a single
//! source, every fully-qualified key may be defined only once.
//!
//! ## Merging
//!
//! `merge_with` layers documents in argument order. Mappings are merged
//! recursively (a deep union); any other leaf is replaced by the later
//! source. Replacing a mapping with a non-mapping, or a list with a scalar,
//! is rejected with the offending key path.
//!
//! ## Rendering
//!
//! `render` produces YAML with keys in sorted order, so identical documents
//! always render to identical bytes regardless of how they were assembled.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;
use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};

/// A single settings value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    List(Vec<SettingValue>),
    Map(BTreeMap<String, SettingValue>),
}

/// Coarse shape of a value, used to decide whether two values may replace
/// one another during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Scalar,
    List,
    Map,
}

impl SettingValue {
    /// Human-readable type name, used in log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::String(_) => "String",
            SettingValue::Bool(_) => "Bool",
            SettingValue::Integer(_) => "Integer",
            SettingValue::Float(_) => "Float",
            SettingValue::List(_) => "List",
            SettingValue::Map(_) => "Map",
        }
    }

    fn shape(&self) -> Shape {
        match self {
            SettingValue::List(_) => Shape::List,
            SettingValue::Map(_) => Shape::Map,
            _ => Shape::Scalar,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SettingValue]> {
        match self {
            SettingValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a raw YAML value, expanding dotted mapping keys.
    ///
    /// `path` is the dotted path of `value` and is only used to label errors.
    fn from_yaml(value: &YamlValue, path: &str) -> Result<Self> {
        match value {
            YamlValue::Null => Err(parse_error(path, "null values are not allowed")),
            YamlValue::Bool(b) => Ok(SettingValue::Bool(*b)),
            YamlValue::String(s) => Ok(SettingValue::String(s.clone())),
            YamlValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(SettingValue::Integer(i))
                } else if n.is_f64() {
                    // is_f64 guarantees as_f64 succeeds
                    Ok(SettingValue::Float(n.as_f64().unwrap_or_default()))
                } else {
                    Err(parse_error(path, &format!("integer {} is out of range", n)))
                }
            }
            YamlValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| Self::from_yaml(item, &format!("{}[{}]", path, idx)))
                .collect::<Result<Vec<_>>>()
                .map(SettingValue::List),
            YamlValue::Mapping(mapping) => {
                let mut map = BTreeMap::new();
                for (key, item) in mapping {
                    let key = match key {
                        YamlValue::String(s) => s.as_str(),
                        other => {
                            return Err(parse_error(
                                path,
                                &format!("mapping keys must be strings, found {:?}", other),
                            ))
                        }
                    };
                    let segments = split_key(key, path)?;
                    let full_path = join_path(path, key);
                    let converted = Self::from_yaml(item, &full_path)?;
                    insert_at(&mut map, &segments, converted, path)?;
                }
                Ok(SettingValue::Map(map))
            }
            YamlValue::Tagged(tagged) => Err(parse_error(
                path,
                &format!("tagged values are not supported (tag {})", tagged.tag),
            )),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Integer(value)
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
    fn from(values: Vec<T>) -> Self {
        SettingValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// An ordered settings document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CanonicalConfig {
    root: BTreeMap<String, SettingValue>,
}

impl CanonicalConfig {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a raw YAML value.
    ///
    /// `null` yields an empty document; any other non-mapping value is
    /// rejected.
    pub fn from_value(value: &YamlValue) -> Result<Self> {
        match value {
            YamlValue::Null => Ok(Self::new()),
            YamlValue::Mapping(_) => match SettingValue::from_yaml(value, "")? {
                SettingValue::Map(root) => Ok(Self { root }),
                other => Err(parse_error(
                    "",
                    &format!("expected a mapping, found {}", other.type_name()),
                )),
            },
            _ => Err(parse_error("", "top-level settings must be a mapping")),
        }
    }

    /// Parse a document from YAML text.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: YamlValue =
            serde_yaml::from_str(content).map_err(|err| parse_error("", &err.to_string()))?;
        Self::from_value(&value)
    }

    /// Build a document from `(dotted key, value)` pairs.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<SettingValue>,
    {
        let mut root = BTreeMap::new();
        for (key, value) in entries {
            let key = key.as_ref();
            let segments = split_key(key, "")?;
            insert_at(&mut root, &segments, value.into(), "")?;
        }
        Ok(Self { root })
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Look up a value by dotted path.
    pub fn get(&self, path: &str) -> Option<&SettingValue> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            match current {
                SettingValue::Map(map) => current = map.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Merge `sources` into this document, in order.
    ///
    /// Later sources win per leaf key. On error the document is left
    /// untouched.
    pub fn merge_with(&mut self, sources: &[&CanonicalConfig]) -> Result<()> {
        let mut merged = self.root.clone();
        for source in sources {
            merge_maps(&mut merged, &source.root, "")?;
        }
        self.root = merged;
        Ok(())
    }

    /// Sorted dotted paths of every leaf. Lists count as leaves.
    pub fn leaf_paths(&self) -> Vec<String> {
        self.leaves().into_keys().collect()
    }

    /// Sorted dotted paths whose values differ between the two documents,
    /// including paths present on only one side.
    pub fn diff(&self, other: &CanonicalConfig) -> Vec<String> {
        let ours = self.leaves();
        let theirs = other.leaves();
        let mut paths = Vec::new();
        for (path, value) in &ours {
            if theirs.get(path) != Some(value) {
                paths.push(path.clone());
            }
        }
        for path in theirs.keys() {
            if !ours.contains_key(path) {
                paths.push(path.clone());
            }
        }
        paths.sort();
        paths
    }

    /// Serialize to YAML with sorted keys.
    pub fn render(&self) -> Result<Vec<u8>> {
        let rendered = serde_yaml::to_string(&self.root).map_err(|err| Error::Serialization {
            message: format!("Failed to render settings: {}", err),
        })?;
        Ok(ensure_trailing_newline(rendered).into_bytes())
    }

    fn leaves(&self) -> BTreeMap<String, &SettingValue> {
        let mut leaves = BTreeMap::new();
        collect_leaves(&self.root, "", &mut leaves);
        leaves
    }
}

fn parse_error(path: &str, message: &str) -> Error {
    Error::ConfigParse {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn split_key<'a>(key: &'a str, prefix: &str) -> Result<Vec<&'a str>> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(parse_error(
            &join_path(prefix, key),
            "key contains an empty path segment",
        ));
    }
    Ok(segments)
}

/// Insert `value` at `segments` below `map`, creating intermediate maps.
///
/// Used while building a single source, where redefining a leaf is an error.
fn insert_at(
    map: &mut BTreeMap<String, SettingValue>,
    segments: &[&str],
    value: SettingValue,
    prefix: &str,
) -> Result<()> {
    let Some((first, rest)) = segments.split_first() else {
        return Ok(());
    };
    let path = join_path(prefix, first);

    if rest.is_empty() {
        return match map.get_mut(*first) {
            None => {
                map.insert(first.to_string(), value);
                Ok(())
            }
            Some(SettingValue::Map(existing)) => match value {
                SettingValue::Map(incoming) => union_disjoint(existing, incoming, &path),
                _ => Err(parse_error(&path, "key is defined more than once")),
            },
            Some(_) => Err(parse_error(&path, "key is defined more than once")),
        };
    }

    let child = map
        .entry(first.to_string())
        .or_insert_with(|| SettingValue::Map(BTreeMap::new()));
    match child {
        SettingValue::Map(child_map) => insert_at(child_map, rest, value, &path),
        _ => Err(parse_error(&path, "key is defined more than once")),
    }
}

fn union_disjoint(
    target: &mut BTreeMap<String, SettingValue>,
    source: BTreeMap<String, SettingValue>,
    prefix: &str,
) -> Result<()> {
    for (key, value) in source {
        insert_at(target, &[key.as_str()], value, prefix)?;
    }
    Ok(())
}

fn merge_maps(
    target: &mut BTreeMap<String, SettingValue>,
    source: &BTreeMap<String, SettingValue>,
    prefix: &str,
) -> Result<()> {
    for (key, value) in source {
        let path = join_path(prefix, key);
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), value.clone());
            }
            Some(SettingValue::Map(existing)) => match value {
                SettingValue::Map(incoming) => merge_maps(existing, incoming, &path)?,
                other => return Err(shape_mismatch(&path, "Map", other.type_name())),
            },
            Some(existing) => {
                if existing.shape() != value.shape() {
                    return Err(shape_mismatch(&path, existing.type_name(), value.type_name()));
                }
                if existing != value {
                    debug!("Overriding setting '{}'", path);
                }
                *existing = value.clone();
            }
        }
    }
    Ok(())
}

fn shape_mismatch(path: &str, existing: &str, incoming: &str) -> Error {
    Error::ConfigMerge {
        path: path.to_string(),
        message: format!("cannot replace {} with {}", existing, incoming),
    }
}

fn collect_leaves<'a>(
    map: &'a BTreeMap<String, SettingValue>,
    prefix: &str,
    out: &mut BTreeMap<String, &'a SettingValue>,
) {
    for (key, value) in map {
        let path = join_path(prefix, key);
        match value {
            SettingValue::Map(child) if !child.is_empty() => collect_leaves(child, &path, out),
            _ => {
                out.insert(path, value);
            }
        }
    }
}

fn ensure_trailing_newline(mut content: String) -> String {
    if !content.ends_with('\n') {
        content.push('\n');
    }
    content
}
