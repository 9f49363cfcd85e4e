//! Tracked corrections: replace, delete, insert, split and merge while
//! retaining the pre-correction content.
//!
//! A correction groups role children: `new` holds the replacement,
//! `original` the retained pre-correction content (non-authoritative),
//! `current` the unchanged content when only suggestions are offered, and
//! any number of `suggestion` children. Deletions are corrections with an
//! empty `new` role; insertions have a `new` role and no original.

use crate::document::Document;
use crate::element::{ElementArgs, NodeId};
use crate::error::{FoliaError, Result};
use crate::types::ElementType;

/// Content for one tracked correction.
#[derive(Debug, Clone, Default)]
pub struct CorrectArgs {
    /// Attributes of the correction element itself (class, set, annotator).
    pub args: ElementArgs,
    /// Unattached replacement nodes, placed under `new`.
    pub new: Vec<NodeId>,
    /// Attached children of the corrected parent, moved under `original`.
    pub original: Vec<NodeId>,
    /// Attached children kept in place under `current` (suggestions only).
    pub current: Vec<NodeId>,
    /// Unattached suggestion contents, each wrapped in its own `suggestion`.
    pub suggestions: Vec<NodeId>,
}

impl Document {
    /// Apply a tracked correction under `parent`.
    ///
    /// All argument checks run before any mutation, so a rejected
    /// correction leaves the tree untouched. Returns the correction node.
    pub fn correct(&mut self, parent: NodeId, corr: CorrectArgs) -> Result<NodeId> {
        if !self.kind(parent).allows_corrections() {
            return Err(FoliaError::NotImplemented {
                operation: "correct",
                kind: self.kind(parent),
            });
        }
        if !corr.current.is_empty() && (!corr.new.is_empty() || !corr.original.is_empty()) {
            return Err(FoliaError::Args(
                "current content excludes new and original content".to_string(),
            ));
        }
        if corr.new.is_empty()
            && corr.original.is_empty()
            && corr.current.is_empty()
            && corr.suggestions.is_empty()
        {
            return Err(FoliaError::Args("correction without any content".to_string()));
        }
        for moved in corr.original.iter().chain(&corr.current) {
            if self.parent(*moved) != Some(parent) {
                return Err(FoliaError::Args(
                    "original/current content must be a child of the corrected element"
                        .to_string(),
                ));
            }
        }
        for fresh in corr.new.iter().chain(&corr.suggestions) {
            if self.parent(*fresh).is_some() {
                return Err(FoliaError::Args(
                    "new/suggestion content must be unattached".to_string(),
                ));
            }
        }
        // every content node must fit its role before anything is detached
        for (role, content) in [
            (ElementType::New, &corr.new),
            (ElementType::Original, &corr.original),
            (ElementType::Current, &corr.current),
            (ElementType::Suggestion, &corr.suggestions),
        ] {
            for node in content.iter() {
                let kind = self.kind(*node);
                if !role.properties().accepts_kind(kind) {
                    return Err(FoliaError::Value(format!(
                        "<{}> is not accepted inside <{}>",
                        kind.xmltag(),
                        role.xmltag()
                    )));
                }
            }
        }
        self.check_acceptable_for_correction(parent)?;

        // placement: where the first corrected child sat, else at the end
        let anchor = corr
            .original
            .iter()
            .chain(&corr.current)
            .filter_map(|n| self.children(parent).iter().position(|c| c == n))
            .min();

        let mut args = corr.args;
        if args.id.is_none() {
            args.id = Some(self.generate_id(parent, ElementType::Correction));
        }
        let correction = self.create(ElementType::Correction, args)?;

        // deletions keep an explicitly empty new role
        let deletion = corr.new.is_empty() && !corr.original.is_empty();
        if !corr.new.is_empty() || deletion {
            let new_role =
                self.append_element(correction, ElementType::New, ElementArgs::new())?;
            for node in &corr.new {
                self.append_child(new_role, *node)?;
            }
        }
        if !corr.original.is_empty() {
            let orig_role =
                self.append_element(correction, ElementType::Original, ElementArgs::new())?;
            for node in &corr.original {
                self.remove_child(parent, *node, false)?;
                self.append_child(orig_role, *node)?;
                self.reindex_subtree(*node)?;
            }
        }
        if !corr.current.is_empty() {
            let cur_role =
                self.append_element(correction, ElementType::Current, ElementArgs::new())?;
            for node in &corr.current {
                self.remove_child(parent, *node, false)?;
                self.append_child(cur_role, *node)?;
                self.reindex_subtree(*node)?;
            }
        }
        for node in &corr.suggestions {
            let sug =
                self.append_element(correction, ElementType::Suggestion, ElementArgs::new())?;
            self.append_child(sug, *node)?;
        }
        self.insert_child(parent, anchor, correction)?;
        Ok(correction)
    }

    fn check_acceptable_for_correction(&self, parent: NodeId) -> Result<()> {
        if !self
            .kind(parent)
            .properties()
            .accepts_kind(ElementType::Correction)
        {
            return Err(FoliaError::Value(format!(
                "<correction> is not accepted inside <{}>",
                self.kind(parent).xmltag()
            )));
        }
        Ok(())
    }

    /// Replace a word's text with a tracked correction on its content.
    pub fn correct_word_text(
        &mut self,
        word: NodeId,
        new_text: &str,
        args: ElementArgs,
    ) -> Result<NodeId> {
        let original = self.text_content(word, "current")?;
        let replacement = self.create(ElementType::TextContent, ElementArgs::new())?;
        self.add_text_value(replacement, new_text)?;
        self.correct(
            word,
            CorrectArgs {
                args,
                new: vec![replacement],
                original: vec![original],
                ..Default::default()
            },
        )
    }

    /// Split one word into several, retaining the original.
    pub fn split_word(
        &mut self,
        word: NodeId,
        parts: &[&str],
        args: ElementArgs,
    ) -> Result<NodeId> {
        if parts.is_empty() {
            return Err(FoliaError::Args("split requires at least one part".to_string()));
        }
        let parent = self
            .parent(word)
            .ok_or_else(|| FoliaError::Args("word is not attached".to_string()))?;
        let mut replacements = Vec::with_capacity(parts.len());
        for part in parts {
            let id = self.generate_id(parent, ElementType::Word);
            let w = self.create(
                ElementType::Word,
                ElementArgs::new().with_id(id).with_text(*part),
            )?;
            replacements.push(w);
        }
        self.correct(
            parent,
            CorrectArgs {
                args,
                new: replacements,
                original: vec![word],
                ..Default::default()
            },
        )
    }

    /// Merge several adjacent words into one, retaining the originals.
    pub fn merge_words(
        &mut self,
        words: &[NodeId],
        merged_text: &str,
        args: ElementArgs,
    ) -> Result<NodeId> {
        let Some(first) = words.first() else {
            return Err(FoliaError::Args("merge requires at least one word".to_string()));
        };
        let parent = self
            .parent(*first)
            .ok_or_else(|| FoliaError::Args("word is not attached".to_string()))?;
        if words.iter().any(|w| self.parent(*w) != Some(parent)) {
            return Err(FoliaError::Args(
                "merged words must share one parent".to_string(),
            ));
        }
        let id = self.generate_id(parent, ElementType::Word);
        let merged = self.create(
            ElementType::Word,
            ElementArgs::new().with_id(id).with_text(merged_text),
        )?;
        self.correct(
            parent,
            CorrectArgs {
                args,
                new: vec![merged],
                original: words.to_vec(),
                ..Default::default()
            },
        )
    }

    /// Insert a new word after `after` (or at the start), as a correction
    /// with no original.
    pub fn insert_word(
        &mut self,
        parent: NodeId,
        after: Option<NodeId>,
        text: &str,
        args: ElementArgs,
    ) -> Result<NodeId> {
        let position = match after {
            None => Some(0),
            Some(a) => {
                let pos = self
                    .children(parent)
                    .iter()
                    .position(|c| *c == a)
                    .ok_or_else(|| {
                        FoliaError::Args("anchor is not a child of the parent".to_string())
                    })?;
                Some(pos + 1)
            }
        };
        let id = self.generate_id(parent, ElementType::Word);
        let word = self.create(
            ElementType::Word,
            ElementArgs::new().with_id(id).with_text(text),
        )?;
        let mut cargs = args;
        if cargs.id.is_none() {
            cargs.id = Some(self.generate_id(parent, ElementType::Correction));
        }
        let correction = self.create(ElementType::Correction, cargs)?;
        let new_role = self.append_element(correction, ElementType::New, ElementArgs::new())?;
        self.append_child(new_role, word)?;
        self.insert_child(parent, position, correction)?;
        Ok(correction)
    }

    /// Delete a word with a tracked correction (empty `new` role).
    pub fn delete_word(&mut self, word: NodeId, args: ElementArgs) -> Result<NodeId> {
        let parent = self
            .parent(word)
            .ok_or_else(|| FoliaError::Args("word is not attached".to_string()))?;
        self.correct(
            parent,
            CorrectArgs {
                args,
                original: vec![word],
                ..Default::default()
            },
        )
    }

    /// The replacement content of a correction (`new` role children).
    pub fn correction_new(&self, correction: NodeId) -> Result<Vec<NodeId>> {
        self.correction_role(correction, ElementType::New)
    }

    /// The retained content of a correction (`original` role children).
    pub fn correction_original(&self, correction: NodeId) -> Result<Vec<NodeId>> {
        self.correction_role(correction, ElementType::Original)
    }

    /// The unchanged content of a suggestions-only correction.
    pub fn correction_current(&self, correction: NodeId) -> Result<Vec<NodeId>> {
        self.correction_role(correction, ElementType::Current)
    }

    /// The suggestion role elements of a correction.
    pub fn correction_suggestions(&self, correction: NodeId) -> Vec<NodeId> {
        self.children(correction)
            .iter()
            .copied()
            .filter(|c| self.kind(*c) == ElementType::Suggestion)
            .collect()
    }

    /// Text of the i'th suggestion of a correction.
    pub fn suggestion_text(&self, correction: NodeId, i: usize) -> Result<String> {
        let suggestion = self
            .correction_suggestions(correction)
            .get(i)
            .copied()
            .ok_or_else(|| FoliaError::Key(format!("no suggestion at index {i}")))?;
        self.str(suggestion)
    }

    fn correction_role(&self, correction: NodeId, role: ElementType) -> Result<Vec<NodeId>> {
        if self.kind(correction) != ElementType::Correction {
            return Err(FoliaError::NotImplemented {
                operation: "correction role access",
                kind: self.kind(correction),
            });
        }
        let role_node = self
            .children(correction)
            .iter()
            .copied()
            .find(|c| self.kind(*c) == role)
            .ok_or_else(|| {
                FoliaError::NoSuchAnnotation(format!("correction has no <{}>", role.xmltag()))
            })?;
        Ok(self.children(role_node).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DeclareArgs, Select};
    use crate::types::AnnotationType;
    use pretty_assertions::assert_eq;

    fn corrections_doc() -> (Document, NodeId) {
        let mut d = Document::new("example").expect("doc");
        d.declare(
            AnnotationType::Correction,
            "corrections",
            DeclareArgs::default(),
        )
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

    fn corr_args() -> ElementArgs {
        ElementArgs::new()
            .with_class("spelling")
            .with_set("corrections")
    }

    #[test]
    fn test_text_correction_changes_rendering() {
        let (mut d, _s) = corrections_doc();
        let w = d.words()[1];
        let correction = d
            .correct_word_text(w, "website", corr_args())
            .expect("correct");
        assert_eq!(d.str(w).ok().as_deref(), Some("website"));
        // the original reading is retained but non-authoritative
        let original = d.correction_original(correction).expect("original");
        assert_eq!(original.len(), 1);
        assert_eq!(d.flatten_text(original[0]), "site");
    }

    #[test]
    fn test_word_correction_preserves_sentence_text() {
        let (mut d, s) = corrections_doc();
        let w = d.words()[1];
        d.correct_word_text(w, "website", corr_args()).expect("correct");
        assert_eq!(
            d.str(s).ok().as_deref(),
            Some("De website staat online .")
        );
    }

    #[test]
    fn test_split_word() {
        let (mut d, s) = corrections_doc();
        let w = d.words()[3]; // "online"
        let correction = d
            .split_word(w, &["on", "line"], corr_args())
            .expect("split");
        assert_eq!(d.str(s).ok().as_deref(), Some("De site staat on line ."));
        assert_eq!(d.correction_new(correction).expect("new").len(), 2);
        // the original word is out of the default iteration
        assert_eq!(d.words().len(), 6);
    }

    #[test]
    fn test_merge_words() {
        let (mut d, s) = corrections_doc();
        let words = d.words();
        d.merge_words(&[words[2], words[3]], "staatonline", corr_args())
            .expect("merge");
        assert_eq!(d.str(s).ok().as_deref(), Some("De site staatonline ."));
        assert_eq!(d.words().len(), 4);
    }

    #[test]
    fn test_insert_and_delete_word() {
        let (mut d, s) = corrections_doc();
        let words = d.words();
        d.insert_word(s, Some(words[1]), "nu", corr_args())
            .expect("insert");
        assert_eq!(d.str(s).ok().as_deref(), Some("De site nu staat online ."));
        let nu = d.words()[2];
        let correction = d.delete_word(nu, corr_args()).expect("delete");
        assert_eq!(d.str(s).ok().as_deref(), Some("De site staat online ."));
        assert!(d.correction_new(correction).expect("new").is_empty());
    }

    #[test]
    fn test_rejected_correction_leaves_tree_unchanged() {
        let (mut d, s) = corrections_doc();
        let before = d.children(s).len();
        // attached node offered as new content
        let w = d.words()[0];
        let err = d.correct(
            s,
            CorrectArgs {
                args: corr_args(),
                new: vec![w],
                ..Default::default()
            },
        );
        assert!(err.is_err());
        assert_eq!(d.children(s).len(), before);
        let corrections = d.select(s, ElementType::Correction, Select::recursive());
        assert!(corrections.is_empty());
    }

    #[test]
    fn test_current_excludes_new() {
        let (mut d, s) = corrections_doc();
        let w = d.words()[0];
        let loose = d
            .create(ElementType::Word, ElementArgs::new().with_text("x"))
            .expect("word");
        let err = d.correct(
            s,
            CorrectArgs {
                args: corr_args(),
                new: vec![loose],
                current: vec![w],
                ..Default::default()
            },
        );
        assert!(matches!(err, Err(FoliaError::Args(_))));
    }

    #[test]
    fn test_suggestions_only_correction() {
        let (mut d, _s) = corrections_doc();
        let w = d.words()[1];
        let tc = d.text_content(w, "current").expect("tc");
        let sug = d.create(ElementType::TextContent, ElementArgs::new()).expect("tc");
        d.add_text_value(sug, "website").expect("value");
        let correction = d
            .correct(
                w,
                CorrectArgs {
                    args: corr_args(),
                    current: vec![tc],
                    suggestions: vec![sug],
                    ..Default::default()
                },
            )
            .expect("correct");
        // the working text is unchanged; the suggestion is informational
        assert_eq!(d.str(w).ok().as_deref(), Some("site"));
        assert_eq!(d.correction_suggestions(correction).len(), 1);
        assert_eq!(
            d.suggestion_text(correction, 0).ok().as_deref(),
            Some("website")
        );
        assert!(matches!(
            d.suggestion_text(correction, 1),
            Err(FoliaError::Key(_))
        ));
        assert!(d.correction_new(correction).is_err());
    }

    #[test]
    fn test_rejected_role_content_keeps_tree() {
        let (mut d, s) = corrections_doc();
        d.declare(AnnotationType::Entity, "orgs", DeclareArgs::default())
            .expect("declare");
        let layer = d
            .annotation_layer(s, ElementType::EntitiesLayer, Some("orgs"))
            .expect("layer");
        let before = d.children(s).len();
        // a layer has no place under an <original> role
        let err = d.correct(
            s,
            CorrectArgs {
                args: corr_args(),
                original: vec![layer],
                ..Default::default()
            },
        );
        assert!(matches!(err, Err(FoliaError::Value(_))));
        assert_eq!(d.children(s).len(), before);
        assert_eq!(d.parent(layer), Some(s));
        let corrections = d.select(s, ElementType::Correction, Select::recursive());
        assert!(corrections.is_empty());
    }

    #[test]
    fn test_new_and_current_exclusive() {
        let (mut d, _s) = corrections_doc();
        let w = d.words()[1];
        let correction = d
            .correct_word_text(w, "website", corr_args())
            .expect("correct");
        let err = d.append_element(correction, ElementType::Current, ElementArgs::new());
        assert!(matches!(err, Err(FoliaError::DuplicateAnnotation(_))));
    }
}
