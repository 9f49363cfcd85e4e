//! Document metadata: native key/value fields, foreign-data passthrough,
//! submetadata sections and style sheets.
//!
//! Foreign metadata blocks are opaque to the model: they are retained as
//! verbatim XML fragments and re-emitted on save.

use std::collections::BTreeMap;

/// One metadata block (the document-level one or a submetadata section).
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Metadata format label; "native" for the key/value form.
    pub metadata_type: String,
    /// External metadata file reference, if any.
    pub src: Option<String>,
    pub fields: BTreeMap<String, String>,
    /// Verbatim foreign-data XML fragments, emitted back untouched.
    pub foreign: Vec<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            metadata_type: "native".to_string(),
            src: None,
            fields: BTreeMap::new(),
            foreign: Vec::new(),
        }
    }
}

impl Metadata {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Store a foreign XML fragment verbatim.
    pub fn add_foreign(&mut self, fragment: impl Into<String>) {
        self.foreign.push(fragment.into());
    }
}

/// A document style sheet association (`xml-stylesheet` processing instruction).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub styletype: String,
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_fields() {
        let mut m = Metadata::default();
        assert_eq!(m.metadata_type, "native");
        m.set("language", "nld");
        assert_eq!(m.get("language"), Some("nld"));
        assert_eq!(m.get("author"), None);
    }

    #[test]
    fn test_foreign_passthrough() {
        let mut m = Metadata::default();
        m.metadata_type = "imdi".to_string();
        m.add_foreign("<imdi:METATRANSCRIPT/>");
        assert_eq!(m.foreign.len(), 1);
    }
}
