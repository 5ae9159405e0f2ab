//! Course content data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One key/value pair inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub key: String,
    pub value: String,
}

impl ContentItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

/// A named unit of course content. `module_title` is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub module_title: String,
    #[serde(default)]
    pub content_parts: Vec<ContentItem>,
}

impl Module {
    /// An empty module with the given title.
    pub fn new(module_title: impl Into<String>) -> Self {
        Self { module_title: module_title.into(), content_parts: Vec::new() }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.content_parts
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.content_parts.iter().any(|item| item.key == key)
    }

    /// Next free key for `prefix`: `{prefix}_{n}` where `n` is one past the
    /// number of keys already under that prefix, advanced past any key that
    /// is still taken (a partial delete can leave gaps).
    pub(crate) fn next_key(&self, prefix: &str) -> String {
        let namespace = format!("{prefix}_");
        let mut n = self
            .content_parts
            .iter()
            .filter(|item| item.key.starts_with(&namespace))
            .count()
            + 1;
        loop {
            let key = format!("{namespace}{n}");
            if !self.contains_key(&key) {
                return key;
            }
            n += 1;
        }
    }
}

/// Human-readable rendering used inside the system prompt.
impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.module_title)?;
        for item in &self.content_parts {
            write!(f, "\n- {}: {}", item.key, item.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_wire_field_names() {
        let mut m = Module::new("Intro");
        m.content_parts.push(ContentItem::new("content_1", "Hello"));
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["module_title"], "Intro");
        assert_eq!(json["content_parts"][0]["key"], "content_1");
        assert_eq!(json["content_parts"][0]["value"], "Hello");
    }

    #[test]
    fn next_key_counts_only_matching_prefix() {
        let mut m = Module::new("Intro");
        m.content_parts.push(ContentItem::new("content_1", "a"));
        m.content_parts.push(ContentItem::new("note_1", "b"));
        m.content_parts.push(ContentItem::new("content_2", "c"));
        assert_eq!(m.next_key("content"), "content_3");
        assert_eq!(m.next_key("note"), "note_2");
        assert_eq!(m.next_key("summary"), "summary_1");
    }

    #[test]
    fn next_key_skips_taken_slot_after_gap() {
        // content_1 was deleted, leaving one key under the prefix.
        let mut m = Module::new("Intro");
        m.content_parts.push(ContentItem::new("content_2", "kept"));
        assert_eq!(m.next_key("content"), "content_3");
    }

    #[test]
    fn display_lists_items_in_order() {
        let mut m = Module::new("Intro");
        m.content_parts.push(ContentItem::new("content_1", "Hello"));
        m.content_parts.push(ContentItem::new("content_2", "World"));
        assert_eq!(m.to_string(), "Intro\n- content_1: Hello\n- content_2: World");
    }

    #[test]
    fn display_empty_module_is_title_only() {
        assert_eq!(Module::new("Empty").to_string(), "Empty");
    }
}
