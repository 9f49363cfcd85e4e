//! Span annotations: layers, member references and their deferred
//! resolution.
//!
//! A span element never owns the words it covers; it holds weak references
//! (by id) that are resolved against the document index after the whole
//! tree is in place. Resolution failures are collected per pass, and member
//! access on an unresolved document reports the document as not ready.

use tracing::warn;

use crate::document::{Document, DocumentState, Select};
use crate::element::{ElementArgs, NodeId};
use crate::error::{FoliaError, Result};
use crate::types::{ElementGroup, ElementType};

impl Document {
    /// Find or create an annotation layer of the given kind (and set) under
    /// a structural element.
    pub fn annotation_layer(
        &mut self,
        parent: NodeId,
        layer_kind: ElementType,
        set: Option<&str>,
    ) -> Result<NodeId> {
        if !layer_kind.has_base(ElementGroup::AnnotationLayer) {
            return Err(FoliaError::Args(format!(
                "<{}> is not an annotation layer",
                layer_kind.xmltag()
            )));
        }
        let existing = self
            .children(parent)
            .iter()
            .copied()
            .find(|c| {
                self.kind(*c) == layer_kind
                    && (set.is_none() || self.node(*c).attrs.set.as_deref() == set)
            });
        if let Some(layer) = existing {
            return Ok(layer);
        }
        let mut args = ElementArgs::new();
        if let Some(set) = set {
            args.set = Some(set.to_string());
        }
        self.append_element(parent, layer_kind, args)
    }

    /// Create a span annotation in a layer, covering the given words.
    ///
    /// Each member becomes a word reference child carrying the member's id
    /// and its current text; the references are born resolved.
    pub fn append_span(
        &mut self,
        layer: NodeId,
        kind: ElementType,
        args: ElementArgs,
        members: &[NodeId],
    ) -> Result<NodeId> {
        if !kind.has_base(ElementGroup::SpanAnnotation) {
            return Err(FoliaError::Args(format!(
                "<{}> is not a span annotation",
                kind.xmltag()
            )));
        }
        let span = self.append_element(layer, kind, args)?;
        for member in members {
            if let Err(e) = self.add_span_member(span, *member) {
                // keep the mutation atomic
                if let Some(parent) = self.parent(span) {
                    self.remove_child(parent, span, false)?;
                }
                return Err(e);
            }
        }
        Ok(span)
    }

    /// Add one member to an existing span.
    pub fn add_span_member(&mut self, span: NodeId, member: NodeId) -> Result<()> {
        let id = self
            .node(member)
            .attrs
            .id
            .clone()
            .ok_or_else(|| FoliaError::Args("span member has no id".to_string()))?;
        let wref = self.append_element(span, ElementType::WordReference, ElementArgs::new())?;
        let text = self.str(member).ok();
        let data = self.node_mut(wref);
        data.ref_id = Some(id);
        data.ref_type = text;
        data.resolved = Some(member);
        Ok(())
    }

    /// The words a span covers, in reference order, nested spans included.
    ///
    /// Requires a resolved document; an unresolved reference inside the
    /// span is reported as such.
    pub fn wrefs(&self, span: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.collect_wrefs(span, &mut out)?;
        Ok(out)
    }

    fn collect_wrefs(&self, node: NodeId, out: &mut Vec<NodeId>) -> Result<()> {
        for child in self.children(node) {
            let data = self.node(*child);
            match data.kind {
                ElementType::WordReference => match data.resolved {
                    Some(target) => out.push(target),
                    None => {
                        if self.state() != DocumentState::Ready {
                            return Err(FoliaError::NotReady(
                                "word references are not resolved yet",
                            ));
                        }
                        return Err(FoliaError::UnresolvedReference(
                            data.ref_id.clone().unwrap_or_default(),
                        ));
                    }
                },
                k if k.has_base(ElementGroup::SpanAnnotation) => {
                    self.collect_wrefs(*child, out)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// All spans (of an optional kind) in the enclosing structure that
    /// cover the given word.
    pub fn find_spans(&self, word: NodeId, kind: Option<ElementType>) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        for ancestor in self.ancestors(word) {
            for layer in self.select_group(
                ancestor,
                ElementGroup::AnnotationLayer,
                Select::local(),
            ) {
                for span in
                    self.select_group(layer, ElementGroup::SpanAnnotation, Select::recursive())
                {
                    if let Some(k) = kind {
                        if self.kind(span) != k {
                            continue;
                        }
                    }
                    if self.wrefs(span)?.contains(&word) {
                        out.push(span);
                    }
                }
            }
        }
        Ok(out)
    }

    /// The span whose member sequence equals `words` exactly, if any.
    pub fn find_span(&self, words: &[NodeId]) -> Result<Option<NodeId>> {
        let Some(first) = words.first() else {
            return Ok(None);
        };
        for span in self.find_spans(*first, None)? {
            if self.wrefs(span)? == words {
                return Ok(Some(span));
            }
        }
        Ok(None)
    }

    /// Resolve every pending weak reference against the id index and mark
    /// the document ready.
    ///
    /// Word references must resolve; alignment references with an external
    /// `href` on their parent are left alone, and cross-document `external`
    /// nodes count as unresolved. In permissive mode a failed resolution
    /// warns and leaves the reference unresolved.
    pub fn resolve_references(&mut self) -> Result<()> {
        self.set_state(DocumentState::Resolving);
        let permissive = self.mode().permissive;
        let mut failures: Vec<String> = Vec::new();
        let pending: Vec<NodeId> = (0..self.len())
            .filter_map(|i| {
                let node = self.nth(i)?;
                let data = self.node(node);
                let wants_resolution = matches!(
                    data.kind,
                    ElementType::WordReference | ElementType::AlignReference
                );
                (wants_resolution && data.resolved.is_none() && data.ref_id.is_some())
                    .then_some(node)
            })
            .collect();
        for node in pending {
            let data = self.node(node);
            let Some(rid) = data.ref_id.clone() else {
                continue;
            };
            if data.kind == ElementType::AlignReference {
                // external alignment targets stay symbolic
                let external = self
                    .parent(node)
                    .is_some_and(|p| self.node(p).attrs.href.is_some());
                if external {
                    continue;
                }
            }
            match self.get_by_id(&rid) {
                Some(target) => {
                    if let Some(expected) = self.node(node).ref_type.clone() {
                        if self.kind(node) == ElementType::AlignReference
                            && self.kind(target).xmltag() != expected
                        {
                            failures.push(format!(
                                "reference '{rid}' resolves to <{}> but declares type '{expected}'",
                                self.kind(target).xmltag()
                            ));
                            continue;
                        }
                    }
                    self.node_mut(node).resolved = Some(target);
                }
                None => failures.push(rid),
            }
        }
        for external in std::mem::take(&mut self.pending_externals) {
            let src = self.node(external).attrs.src.clone().unwrap_or_default();
            failures.push(format!("external document '{src}'"));
        }
        if failures.is_empty() {
            self.set_state(DocumentState::Ready);
            Ok(())
        } else if permissive {
            for f in &failures {
                warn!(reference = f.as_str(), "unresolved reference");
            }
            self.set_state(DocumentState::Ready);
            Ok(())
        } else {
            Err(FoliaError::UnresolvedReference(failures.join(", ")))
        }
    }

    /// Node at position `i` in document order.
    #[must_use]
    pub(crate) fn nth(&self, i: usize) -> Option<NodeId> {
        self.order().get(i).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DeclareArgs;
    use crate::types::AnnotationType;
    use pretty_assertions::assert_eq;

    fn doc_with_sentence() -> (Document, NodeId) {
        let mut d = Document::new("example").expect("doc");
        d.declare(AnnotationType::Entity, "orgs", DeclareArgs::default())
            .expect("declare");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        for token in ["De", "site", "staat", "online", "."] {
            d.add_word(s, ElementArgs::new().with_text(token)).expect("word");
        }
        (d, s)
    }

    #[test]
    fn test_span_members_in_order() {
        let (mut d, s) = doc_with_sentence();
        let words = d.words();
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let span = d
            .append_span(
                layer,
                ElementType::Entity,
                ElementArgs::new().with_class("org").with_set("orgs"),
                &[words[1], words[2]],
            )
            .expect("span");
        assert_eq!(d.wrefs(span).expect("wrefs"), vec![words[1], words[2]]);
        // the wref carries the member's text for readability
        let wref = d.children(span)[0];
        assert_eq!(d.node(wref).ref_type.as_deref(), Some("site"));
    }

    #[test]
    fn test_layer_is_reused() {
        let (mut d, s) = doc_with_sentence();
        let a = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let b = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        assert_eq!(a, b);
    }

    #[test]
    fn test_find_spans_for_word() {
        let (mut d, s) = doc_with_sentence();
        let words = d.words();
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let span = d
            .append_span(
                layer,
                ElementType::Entity,
                ElementArgs::new().with_class("org").with_set("orgs"),
                &[words[1]],
            )
            .expect("span");
        assert_eq!(
            d.find_spans(words[1], Some(ElementType::Entity)).expect("spans"),
            vec![span]
        );
        assert!(d
            .find_spans(words[0], Some(ElementType::Entity))
            .expect("spans")
            .is_empty());
        assert_eq!(d.find_span(&[words[1]]).expect("span"), Some(span));
        assert_eq!(d.find_span(&[words[1], words[2]]).expect("span"), None);
    }

    #[test]
    fn test_unresolved_reference_detected() {
        let (mut d, s) = doc_with_sentence();
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let span = d
            .append_element(
                layer,
                ElementType::Entity,
                ElementArgs::new().with_class("org").with_set("orgs"),
            )
            .expect("span");
        let wref = d
            .append_element(span, ElementType::WordReference, ElementArgs::new())
            .expect("wref");
        d.node_mut(wref).ref_id = Some("example.nosuch.w.1".to_string());
        assert!(matches!(
            d.resolve_references(),
            Err(FoliaError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_resolution_fills_targets() {
        let (mut d, s) = doc_with_sentence();
        let words = d.words();
        let wid = d.node(words[3]).attrs.id.clone().expect("id");
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let span = d
            .append_element(
                layer,
                ElementType::Entity,
                ElementArgs::new().with_class("org").with_set("orgs"),
            )
            .expect("span");
        let wref = d
            .append_element(span, ElementType::WordReference, ElementArgs::new())
            .expect("wref");
        d.node_mut(wref).ref_id = Some(wid);
        d.resolve_references().expect("resolve");
        assert_eq!(d.wrefs(span).expect("wrefs"), vec![words[3]]);
    }

    #[test]
    fn test_member_without_id_rejected() {
        let (mut d, s) = doc_with_sentence();
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        // an unattached word with no id cannot be referenced
        let loose = d
            .create(ElementType::Word, ElementArgs::new())
            .expect("word");
        let err = d.append_span(
            layer,
            ElementType::Entity,
            ElementArgs::new().with_class("org").with_set("orgs"),
            &[loose],
        );
        assert!(err.is_err());
        // the failed span was rolled back
        assert!(d
            .select_group(layer, ElementGroup::SpanAnnotation, Select::recursive())
            .is_empty());
    }
}
