//! Definition maps: symbolic keys mapped to translated text.
//!
//! A `DefinitionMap` is scoped to one (namespace, language) pair. Values are
//! either text or numbers; numbers only come from dynamic providers and are
//! stringified when a template references them.

use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashMap;

/// A single definition value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefValue {
    Text(String),
    Number(serde_json::Number),
}

impl DefValue {
    /// Text form of the value, as substituted into templates.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            DefValue::Text(text) => Cow::Borrowed(text),
            DefValue::Number(number) => Cow::Owned(number_to_text(number)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DefValue::Text(text) if text.is_empty())
    }
}

/// Integral floats print without a fractional part (`3.0` -> `3`).
fn number_to_text(number: &serde_json::Number) -> String {
    if let Some(i) = number.as_i64() {
        i.to_string()
    } else if let Some(u) = number.as_u64() {
        u.to_string()
    } else {
        number.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

impl From<String> for DefValue {
    fn from(text: String) -> Self {
        DefValue::Text(text)
    }
}

impl From<&str> for DefValue {
    fn from(text: &str) -> Self {
        DefValue::Text(text.to_string())
    }
}

impl From<usize> for DefValue {
    fn from(n: usize) -> Self {
        DefValue::Number(serde_json::Number::from(n as u64))
    }
}

impl From<i64> for DefValue {
    fn from(n: i64) -> Self {
        DefValue::Number(serde_json::Number::from(n))
    }
}

/// Mapping from symbolic key to definition value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DefinitionMap {
    entries: HashMap<String, DefValue>,
}

impl DefinitionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DefValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DefValue> {
        self.entries.get(key)
    }

    /// Text of a definition, if present.
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        self.entries.get(key).map(DefValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Lay `other` over this map. Keys present in `other` win.
    pub fn overlay(&mut self, other: &DefinitionMap) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Owned variant of [`DefinitionMap::overlay`].
    pub fn merge(&mut self, other: DefinitionMap) {
        self.entries.extend(other.entries);
    }

    /// Escape every text value with [`sanitize_inject`].
    pub fn sanitized(self) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|(key, value)| match value {
                DefValue::Text(text) => (key, DefValue::Text(sanitize_inject(&text))),
                number => (key, number),
            })
            .collect();
        Self { entries }
    }
}

impl<K: Into<String>, V: Into<DefValue>> FromIterator<(K, V)> for DefinitionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// Escape `<`, `>` and `"` so text can neither open tags nor leave an attribute.
pub fn sanitize_inject(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }

    result
}
