//! Text reconstruction and offset validation.
//!
//! An element's text is either its own content element (for the requested
//! text class) or the concatenation of its printable children's text, joined
//! by each child's delimiter. Offsets recorded on content elements are
//! validated in a deferred batch against the reconstructed reference text,
//! after comparing both sides in NFC form.

use tracing::warn;
use unicode_normalization::UnicodeNormalization;

use crate::document::{Document, DocumentState};
use crate::element::NodeId;
use crate::error::{FoliaError, Result};
use crate::types::ElementType;

/// Options for a text reconstruction call.
#[derive(Debug, Clone)]
pub struct TextParameters {
    /// Text class to reconstruct ("current" is the working text).
    pub class: String,
    /// Only consider the element's own content; never recurse.
    pub strict: bool,
    /// Emit every token delimiter even where `space="no"` suppresses it.
    pub retain_tokenization: bool,
}

impl Default for TextParameters {
    fn default() -> Self {
        Self {
            class: "current".to_string(),
            strict: false,
            retain_tokenization: false,
        }
    }
}

impl TextParameters {
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub fn retain_tokenization(mut self) -> Self {
        self.retain_tokenization = true;
        self
    }
}

/// Effective class of a content element ("current" when unspecified).
fn content_class(doc: &Document, node: NodeId) -> &str {
    doc.node(node).attrs.class.as_deref().unwrap_or("current")
}

impl Document {
    /// The element's own content element for a text class, non-recursive.
    pub fn text_content(&self, node: NodeId, class: &str) -> Result<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|c| {
                self.kind(*c) == ElementType::TextContent && content_class(self, *c) == class
            })
            .ok_or_else(|| {
                FoliaError::NoSuchText(format!(
                    "no text content of class '{class}' on <{}>",
                    self.kind(node).xmltag()
                ))
            })
    }

    /// The element's own phonetic content element for a class, non-recursive.
    pub fn phon_content(&self, node: NodeId, class: &str) -> Result<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|c| {
                self.kind(*c) == ElementType::PhonContent && content_class(self, *c) == class
            })
            .ok_or_else(|| {
                FoliaError::NoSuchPhon(format!(
                    "no phonetic content of class '{class}' on <{}>",
                    self.kind(node).xmltag()
                ))
            })
    }

    /// Flatten a content element (or markup subtree) to a plain string.
    /// Markup nesting is transparent; line breaks become newlines.
    #[must_use]
    pub fn flatten_text(&self, content: NodeId) -> String {
        let mut out = String::new();
        self.flatten_into(content, &mut out);
        out
    }

    fn flatten_into(&self, node: NodeId, out: &mut String) {
        for child in self.children(node) {
            let data = self.node(*child);
            match data.kind {
                ElementType::XmlText => {
                    if let Some(v) = &data.value {
                        out.push_str(v);
                    }
                }
                ElementType::LineBreak => out.push('\n'),
                ElementType::XmlComment => {}
                _ => self.flatten_into(*child, out),
            }
        }
    }

    /// Reconstruct the text of an element.
    ///
    /// Own content for the class wins; otherwise printable, authoritative
    /// children are reconstructed recursively and joined on the preceding
    /// child's delimiter. Elements with no text in the class at all raise
    /// `NoSuchText`.
    pub fn text(&self, node: NodeId, params: &TextParameters) -> Result<String> {
        let kind = self.kind(node);
        if !kind.properties().printable {
            return Err(FoliaError::NotImplemented {
                operation: "text",
                kind,
            });
        }
        match kind {
            ElementType::LineBreak => return Ok("\n".to_string()),
            ElementType::WhiteSpace => return Ok("\n\n".to_string()),
            ElementType::XmlText => {
                return Ok(self.node(node).value.clone().unwrap_or_default())
            }
            ElementType::TextContent => {
                if content_class(self, node) == params.class {
                    return Ok(self.flatten_text(node));
                }
                return Err(FoliaError::NoSuchText(params.class.clone()));
            }
            _ => {}
        }
        if let Ok(tc) = self.text_content(node, &params.class) {
            return Ok(self.flatten_text(tc));
        }
        if params.strict {
            return Err(FoliaError::NoSuchText(format!(
                "no text content of class '{}' on <{}>",
                params.class,
                kind.xmltag()
            )));
        }
        let child_params = TextParameters {
            strict: false,
            ..params.clone()
        };
        let mut parts: Vec<(String, String)> = Vec::new();
        for child in self.children(node) {
            let data = self.node(*child);
            if !data.auth() {
                continue;
            }
            if !data.kind.properties().printable {
                continue;
            }
            if data.kind == ElementType::TextContent {
                continue; // other classes; own class was handled above
            }
            match self.text(*child, &child_params) {
                Ok(t) if !t.is_empty() => {
                    let delim = self.text_delimiter(*child, params.retain_tokenization);
                    parts.push((t, delim));
                }
                Ok(_) => {}
                Err(
                    FoliaError::NoSuchText(_) | FoliaError::NotImplemented { .. },
                ) => {}
                Err(e) => return Err(e),
            }
        }
        if parts.is_empty() {
            return Err(FoliaError::NoSuchText(format!(
                "no text content of class '{}' under <{}>",
                params.class,
                kind.xmltag()
            )));
        }
        let mut out = String::new();
        let last = parts.len() - 1;
        for (i, (t, delim)) in parts.iter().enumerate() {
            out.push_str(t);
            if i != last {
                out.push_str(delim);
            }
        }
        Ok(out)
    }

    /// Shorthand for default-class, non-strict text reconstruction.
    pub fn str(&self, node: NodeId) -> Result<String> {
        self.text(node, &TextParameters::default())
    }

    /// Default-class text from the element's own content layer only.
    pub fn stricttext(&self, node: NodeId) -> Result<String> {
        self.text(node, &TextParameters::default().strict())
    }

    /// Default-class text with tokenization spacing retained.
    pub fn toktext(&self, node: NodeId) -> Result<String> {
        self.text(node, &TextParameters::default().retain_tokenization())
    }

    /// Reconstruct the phonetic transcript of an element.
    pub fn phon(&self, node: NodeId, class: &str) -> Result<String> {
        let kind = self.kind(node);
        if !kind.properties().speakable {
            return Err(FoliaError::NotImplemented {
                operation: "phon",
                kind,
            });
        }
        if let Ok(pc) = self.phon_content(node, class) {
            return Ok(self.flatten_text(pc));
        }
        let mut parts: Vec<(String, String)> = Vec::new();
        for child in self.children(node) {
            let data = self.node(*child);
            if !data.auth() || !data.kind.properties().speakable {
                continue;
            }
            match self.phon(*child, class) {
                Ok(t) if !t.is_empty() => {
                    let delim = self.text_delimiter(*child, false);
                    parts.push((t, delim));
                }
                Ok(_) => {}
                Err(
                    FoliaError::NoSuchPhon(_) | FoliaError::NotImplemented { .. },
                ) => {}
                Err(e) => return Err(e),
            }
        }
        if parts.is_empty() {
            return Err(FoliaError::NoSuchPhon(format!(
                "no phonetic content of class '{class}' under <{}>",
                kind.xmltag()
            )));
        }
        let mut out = String::new();
        let last = parts.len() - 1;
        for (i, (t, delim)) in parts.iter().enumerate() {
            out.push_str(t);
            if i != last {
                out.push_str(delim);
            }
        }
        Ok(out)
    }

    /// The delimiter a child contributes when joined with its successor.
    ///
    /// Corrections and correction roles delegate to their last effective
    /// child, so the delimiter of the corrected content is the one emitted.
    #[must_use]
    pub fn text_delimiter(&self, node: NodeId, retain_tokenization: bool) -> String {
        let data = self.node(node);
        match data.kind {
            ElementType::Correction | ElementType::New | ElementType::Current => {
                for child in self.children(node).iter().rev() {
                    if self.node(*child).auth() && self.kind(*child).properties().printable {
                        return self.text_delimiter(*child, retain_tokenization);
                    }
                }
                String::new()
            }
            _ => {
                if !data.attrs.space && !retain_tokenization {
                    return String::new();
                }
                data.kind.properties().text_delimiter.to_string()
            }
        }
    }

    // ------------------------------------------------------------------
    // offset validation

    /// Validate all buffered content offsets against their reference text.
    ///
    /// The reference is the element named by an explicit `ref` attribute,
    /// or the nearest ancestor carrying text in the same class. Both sides
    /// are NFC-normalized before comparison; positions count codepoints. In
    /// fixtext mode a failed offset is repaired to the first occurrence of
    /// the content in the reference; in permissive mode failures only warn.
    pub fn validate_offsets(&mut self) -> Result<()> {
        if self.state() != DocumentState::Ready {
            return Err(FoliaError::NotReady("validate_offsets"));
        }
        let mode = self.mode();
        let text_buffer = std::mem::take(&mut self.text_offset_buffer);
        let phon_buffer = std::mem::take(&mut self.phon_offset_buffer);
        let mut failures: Vec<String> = Vec::new();
        for content in text_buffer.into_iter().chain(phon_buffer) {
            if self.node(content).detached {
                continue;
            }
            let Some(offset) = self.node(content).offset else {
                continue;
            };
            match self.check_one_offset(content, offset) {
                Ok(None) => {}
                Ok(Some(repaired)) => {
                    if mode.fixtext {
                        self.node_mut(content).offset = Some(repaired);
                    } else {
                        let msg = self.offset_failure(content, offset);
                        if mode.permissive {
                            warn!("{msg}");
                        } else {
                            failures.push(msg);
                        }
                    }
                }
                Err(FoliaError::NoSuchText(_) | FoliaError::NoSuchPhon(_)) => {
                    let msg = self.offset_failure(content, offset);
                    if mode.permissive {
                        warn!("{msg}");
                    } else {
                        failures.push(msg);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(FoliaError::Value(format!(
                "offset validation failed: {}",
                failures.join("; ")
            )))
        }
    }

    /// Check one offset. `Ok(None)` means valid; `Ok(Some(n))` carries the
    /// repaired offset for a recoverable mismatch.
    fn check_one_offset(&mut self, content: NodeId, offset: usize) -> Result<Option<usize>> {
        let class = content_class(self, content).to_string();
        let phonetic = self.kind(content) == ElementType::PhonContent;
        let reference = self.offset_reference(content, &class, phonetic)?;
        if self.node(content).ref_id.is_some() {
            self.node_mut(content).resolved = Some(reference);
        }
        let own: Vec<char> = self.flatten_text(content).nfc().collect();
        let ref_text: Vec<char> = if phonetic {
            self.phon(reference, &class)?.nfc().collect()
        } else {
            let params = TextParameters::default().with_class(class);
            self.text(reference, &params)?.nfc().collect()
        };
        let end = offset + own.len();
        if end <= ref_text.len() && ref_text[offset..end] == own[..] {
            return Ok(None);
        }
        // first occurrence, as a repair candidate
        let repaired = ref_text
            .windows(own.len().max(1))
            .position(|w| w == own.as_slice());
        Ok(Some(repaired.unwrap_or(offset)))
    }

    /// The element an offset is measured against.
    fn offset_reference(&self, content: NodeId, class: &str, phonetic: bool) -> Result<NodeId> {
        if let Some(rid) = &self.node(content).ref_id {
            return self
                .get_by_id(rid)
                .ok_or_else(|| FoliaError::UnresolvedReference(rid.clone()));
        }
        let Some(owner) = self.parent(content) else {
            return Err(FoliaError::NoSuchText("content has no owner".to_string()));
        };
        self.ancestors(owner)
            .find(|a| {
                if phonetic {
                    self.phon_content(*a, class).is_ok()
                } else {
                    self.text_content(*a, class).is_ok()
                }
            })
            .ok_or_else(|| {
                FoliaError::NoSuchText(format!(
                    "no ancestor with content of class '{class}' to resolve offset against"
                ))
            })
    }

    fn offset_failure(&self, content: NodeId, offset: usize) -> String {
        let owner = self
            .parent(content)
            .and_then(|p| self.node(p).attrs.id.clone())
            .unwrap_or_else(|| "<unattached>".to_string());
        format!(
            "offset {offset} of <{}> under '{owner}' does not match its reference text",
            self.kind(content).xmltag()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Mode;
    use crate::element::ElementArgs;
    use pretty_assertions::assert_eq;

    fn sentence_doc() -> (Document, NodeId) {
        let mut d = Document::new("example").expect("doc");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        for token in ["De", "site", "staat", "online"] {
            d.add_word(s, ElementArgs::new().with_text(token)).expect("word");
        }
        d.add_word(s, ElementArgs::new().with_text(".").with_space(false))
            .expect("word");
        (d, s)
    }

    #[test]
    fn test_sentence_text_from_words() {
        let (d, s) = sentence_doc();
        assert_eq!(d.str(s).ok().as_deref(), Some("De site staat online ."));
    }

    #[test]
    fn test_own_text_wins_over_recursion() {
        let (mut d, s) = sentence_doc();
        d.attach_text(s, "De site staat online.", "original")
            .expect("attach");
        let params = TextParameters::default().with_class("original");
        assert_eq!(
            d.text(s, &params).ok().as_deref(),
            Some("De site staat online.")
        );
        // default class still reconstructs from the words
        assert_eq!(d.str(s).ok().as_deref(), Some("De site staat online ."));
    }

    #[test]
    fn test_strict_requires_own_content() {
        let (d, s) = sentence_doc();
        let params = TextParameters::default().strict();
        assert!(matches!(
            d.text(s, &params),
            Err(FoliaError::NoSuchText(_))
        ));
        let w = d.words()[0];
        let strict_word = d.text(w, &params);
        assert_eq!(strict_word.ok().as_deref(), Some("De"));
    }

    #[test]
    fn test_missing_class_is_no_such_text() {
        let (d, s) = sentence_doc();
        let params = TextParameters::default().with_class("ocr");
        assert!(matches!(d.text(s, &params), Err(FoliaError::NoSuchText(_))));
    }

    #[test]
    fn test_text_on_unprintable_kind() {
        let mut d = Document::new("example").expect("doc");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("x")).expect("word");
        let layer = d
            .append_element(w, crate::ElementType::MorphologyLayer, ElementArgs::new());
        // layers carry no text of their own
        let layer = layer.expect("layer");
        assert!(matches!(
            d.str(layer),
            Err(FoliaError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_space_attribute_suppresses_delimiter() {
        let (d, s) = sentence_doc();
        let words = d.words();
        assert_eq!(d.text_delimiter(words[0], false), " ");
        assert_eq!(d.text_delimiter(words[4], false), "");
        assert_eq!(d.text_delimiter(words[4], true), " ");
    }

    #[test]
    fn test_offset_validation_pass_and_fail() {
        let (mut d, s) = sentence_doc();
        d.attach_text(s, "De site staat online .", "current")
            .expect("sentence text");
        let w = d.words()[1]; // "site"
        let tc = d.text_content(w, "current").expect("tc");
        d.node_mut(tc).offset = Some(3);
        d.text_offset_buffer.push(tc);
        d.validate_offsets().expect("valid offset");

        d.node_mut(tc).offset = Some(4);
        d.text_offset_buffer.push(tc);
        assert!(d.validate_offsets().is_err());
    }

    #[test]
    fn test_offset_repair_in_fixtext_mode() {
        let mut d = Document::with_mode(
            "example",
            Mode {
                fixtext: true,
                ..Mode::default()
            },
        )
        .expect("doc");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        d.attach_text(s, "De site", "current").expect("sentence text");
        let w = d.add_word(s, ElementArgs::new().with_text("site")).expect("word");
        let tc = d.text_content(w, "current").expect("tc");
        d.node_mut(tc).offset = Some(1);
        d.text_offset_buffer.push(tc);
        d.validate_offsets().expect("repaired");
        assert_eq!(d.node(tc).offset, Some(3));
    }

    #[test]
    fn test_explicit_offset_reference() {
        let (mut d, s) = sentence_doc();
        d.attach_text(s, "De site staat online .", "current")
            .expect("sentence text");
        let sid = d.node(s).attrs.id.clone().expect("sentence id");
        let w = d.words()[0];
        let tc = d.text_content(w, "current").expect("tc");
        d.node_mut(tc).offset = Some(0);
        d.node_mut(tc).ref_id = Some(sid);
        d.text_offset_buffer.push(tc);
        d.validate_offsets().expect("valid");
        assert_eq!(d.node(tc).resolved, Some(s));
    }

    #[test]
    fn test_offset_validation_requires_ready_state() {
        let (mut d, _s) = sentence_doc();
        d.set_state(DocumentState::Building);
        assert!(matches!(
            d.validate_offsets(),
            Err(FoliaError::NotReady(_))
        ));
    }
}
