//! Error types for the FoLiA document model.
//!
//! One crate-wide error enum plus a `Result` alias. Structural violations
//! (illegal child, duplicate id) are raised at the point of mutation and the
//! tree is left unchanged; deferred-pass failures (unresolved references,
//! offset mismatches) are collected and reported after the batch.

use thiserror::Error;

use crate::types::{AnnotationType, ElementType};

/// Main error type for the FoLiA library.
#[derive(Debug, Error)]
pub enum FoliaError {
    /// Malformed construction arguments.
    #[error("error in argument list: {0}")]
    Args(String),

    /// An id or annotation set was not found where a unique result is required.
    #[error("key not found: {0}")]
    Key(String),

    /// Operation invoked on an element kind that does not support it.
    #[error("not implemented: {operation} on <{}>", .kind.xmltag())]
    NotImplemented {
        operation: &'static str,
        kind: ElementType,
    },

    /// Semantically invalid value.
    #[error("{0}")]
    Value(String),

    /// Malformed or schema-illegal markup.
    #[error("XML error: {0}")]
    Xml(String),

    /// The underlying XML parser rejected the input.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// A requested annotation layer is absent.
    #[error("no such annotation: {0}")]
    NoSuchAnnotation(String),

    /// A requested text layer is absent for the given class.
    #[error("no such text: {0}")]
    NoSuchText(String),

    /// A requested phonetic layer is absent for the given class.
    #[error("no such phonetic content: {0}")]
    NoSuchPhon(String),

    /// An annotation uniqueness invariant was violated on insert.
    #[error("duplicate annotation: {0}")]
    DuplicateAnnotation(String),

    /// Two live nodes would share one id.
    #[error("duplicate ID: {0}")]
    DuplicateId(String),

    /// Zero or more than one candidate where exactly one default was required.
    #[error("no default found for {}{}", .annotation_type.label(), .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    NoDefault {
        annotation_type: AnnotationType,
        detail: Option<String>,
    },

    /// A weak reference did not resolve against the document index.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Operation requires the document to be fully resolved.
    #[error("document not ready: {0}")]
    NotReady(&'static str),

    /// The document declares a format version this library does not accept.
    #[error("unsupported document version {found} (library implements {supported})")]
    Version { found: String, supported: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for FoLiA operations.
pub type Result<T> = std::result::Result<T, FoliaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_id_display() {
        let err = FoliaError::DuplicateId("doc.w.1".to_string());
        assert_eq!(err.to_string(), "duplicate ID: doc.w.1");
    }

    #[test]
    fn test_not_implemented_display() {
        let err = FoliaError::NotImplemented {
            operation: "split",
            kind: ElementType::Sentence,
        };
        assert_eq!(err.to_string(), "not implemented: split on <s>");
    }

    #[test]
    fn test_no_default_display() {
        let err = FoliaError::NoDefault {
            annotation_type: AnnotationType::Pos,
            detail: None,
        };
        assert!(err.to_string().contains("pos-annotation"));
    }
}
