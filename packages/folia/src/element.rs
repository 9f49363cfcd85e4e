//! Element nodes: arena storage, common attributes, construction arguments.
//!
//! Nodes live in a single arena owned by the [`Document`](crate::Document);
//! all parent/child/reference relations are [`NodeId`] indices into that
//! arena, so weak references cannot dangle; a bad reference is a lookup
//! miss, not undefined behavior.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::{FoliaError, Result};
use crate::types::{AnnotatorType, Attrib, ElementType};

/// Index of a node in a document's arena.
///
/// Ids are only meaningful within the document that created them. Arena
/// slots are never reused during a document's lifetime, so a stale `NodeId`
/// refers to a detached node rather than to unrelated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The attributes every element may carry (per its kind's descriptor).
#[derive(Debug, Clone)]
pub struct CommonAttributes {
    pub id: Option<String>,
    pub class: Option<String>,
    pub set: Option<String>,
    pub annotator: Option<String>,
    pub annotator_type: Option<AnnotatorType>,
    pub processor: Option<String>,
    pub datetime: Option<String>,
    pub confidence: Option<f64>,
    pub n: Option<String>,
    pub begintime: Option<String>,
    pub endtime: Option<String>,
    pub src: Option<String>,
    pub href: Option<String>,
    pub speaker: Option<String>,
    /// Word spacing: when false, no delimiter follows this token.
    pub space: bool,
}

impl Default for CommonAttributes {
    fn default() -> Self {
        Self {
            id: None,
            class: None,
            set: None,
            annotator: None,
            annotator_type: None,
            processor: None,
            datetime: None,
            confidence: None,
            n: None,
            begintime: None,
            endtime: None,
            src: None,
            href: None,
            speaker: None,
            space: true,
        }
    }
}

/// One node in the arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: ElementType,
    pub attrs: CommonAttributes,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Raw character data (XmlText, XmlComment, Description, Content).
    pub value: Option<String>,
    /// Codepoint offset into the reference ancestor's text (TextContent/PhonContent).
    pub offset: Option<usize>,
    /// Explicit offset reference target id, or idref for wref/aref/markup.
    pub ref_id: Option<String>,
    /// Reference type hint (AlignReference) or expected text (wref `t`).
    pub ref_type: Option<String>,
    /// Resolved reference target, filled by the deferred resolution pass.
    pub resolved: Option<NodeId>,
    /// Feature subset (Feature kinds).
    pub subset: Option<String>,
    /// Shared-content reference count (suggestions/alternatives merging).
    pub refcount: u32,
    /// Detached from the tree (removed, possibly held for deletion).
    pub detached: bool,
}

impl NodeData {
    #[must_use]
    pub fn new(kind: ElementType, attrs: CommonAttributes) -> Self {
        Self {
            kind,
            attrs,
            parent: None,
            children: Vec::new(),
            value: None,
            offset: None,
            ref_id: None,
            ref_type: None,
            resolved: None,
            subset: None,
            refcount: 0,
            detached: false,
        }
    }

    /// Authoritative content contributes to reconstructed text and default
    /// iteration; retained originals, suggestions and alternatives do not.
    #[must_use]
    pub fn auth(&self) -> bool {
        self.kind.properties().auth
    }
}

/// Construction arguments for a new element.
///
/// All fields are optional here; kind-level legality (required attributes,
/// forbidden attributes, value ranges) is enforced when the element is
/// built.
#[derive(Debug, Clone, Default)]
pub struct ElementArgs {
    pub id: Option<String>,
    /// Derive an id from this parent id's per-tag counter instead of `id`.
    pub generate_id: bool,
    pub class: Option<String>,
    pub set: Option<String>,
    pub annotator: Option<String>,
    pub annotator_type: Option<AnnotatorType>,
    pub processor: Option<String>,
    pub datetime: Option<String>,
    pub confidence: Option<f64>,
    pub n: Option<String>,
    pub begintime: Option<String>,
    pub endtime: Option<String>,
    pub src: Option<String>,
    pub href: Option<String>,
    pub speaker: Option<String>,
    pub space: Option<bool>,
    /// Convenience: attach a TextContent child of class "current".
    pub text: Option<String>,
    /// Feature subset (Feature kinds only).
    pub subset: Option<String>,
}

impl ElementArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_generated_id(mut self) -> Self {
        self.generate_id = true;
        self
    }

    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[must_use]
    pub fn with_set(mut self, set: impl Into<String>) -> Self {
        self.set = Some(set.into());
        self
    }

    #[must_use]
    pub fn with_annotator(mut self, annotator: impl Into<String>) -> Self {
        self.annotator = Some(annotator.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_n(mut self, n: impl Into<String>) -> Self {
        self.n = Some(n.into());
        self
    }

    #[must_use]
    pub fn with_space(mut self, space: bool) -> Self {
        self.space = Some(space);
        self
    }

    /// Validate against the kind's descriptor and produce the attribute set.
    ///
    /// Checks required/forbidden attributes, the confidence range, id name
    /// legality and datetime format. Set declaration checks are the
    /// document's job (it owns the declaration table).
    pub fn into_attributes(self, kind: ElementType) -> Result<CommonAttributes> {
        let props = kind.properties();
        let allowed = props.required_attributes | props.optional_attributes;

        let check = |present: bool, bit: Attrib, name: &str| -> Result<()> {
            if present && !allowed.contains(bit) {
                return Err(FoliaError::Args(format!(
                    "attribute '{name}' not allowed on <{}>",
                    kind.xmltag()
                )));
            }
            if !present && props.required_attributes.contains(bit) {
                return Err(FoliaError::Args(format!(
                    "attribute '{name}' is required on <{}>",
                    kind.xmltag()
                )));
            }
            Ok(())
        };

        check(self.id.is_some() || self.generate_id, Attrib::ID, "xml:id")?;
        check(self.class.is_some(), Attrib::CLASS, "class")?;
        check(
            self.annotator.is_some() || self.processor.is_some(),
            Attrib::ANNOTATOR,
            "annotator",
        )?;
        check(self.confidence.is_some(), Attrib::CONFIDENCE, "confidence")?;
        check(self.n.is_some(), Attrib::N, "n")?;
        check(self.datetime.is_some(), Attrib::DATETIME, "datetime")?;
        check(self.begintime.is_some(), Attrib::BEGINTIME, "begintime")?;
        check(self.endtime.is_some(), Attrib::ENDTIME, "endtime")?;
        check(self.src.is_some(), Attrib::SRC, "src")?;
        check(self.speaker.is_some(), Attrib::SPEAKER, "speaker")?;

        if let Some(c) = self.confidence {
            if !(0.0..=1.0).contains(&c) {
                return Err(FoliaError::Value(format!(
                    "confidence must be in 0..1, got {c}"
                )));
            }
        }
        if let Some(id) = &self.id {
            if !is_ncname(id) {
                return Err(FoliaError::Args(format!("invalid id: '{id}'")));
            }
        }
        let datetime = match self.datetime {
            Some(dt) => Some(normalize_datetime(&dt)?),
            None => None,
        };

        Ok(CommonAttributes {
            id: self.id,
            class: self.class,
            set: self.set,
            annotator: self.annotator,
            annotator_type: self.annotator_type,
            processor: self.processor,
            datetime,
            confidence: self.confidence,
            n: self.n,
            begintime: self.begintime,
            endtime: self.endtime,
            src: self.src,
            href: self.href,
            speaker: self.speaker,
            space: self.space.unwrap_or(true),
        })
    }
}

static NCNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex"));

/// Whether a string is a valid name token for use as an id.
#[must_use]
pub fn is_ncname(s: &str) -> bool {
    NCNAME.is_match(s)
}

/// Normalize a datetime attribute to `YYYY-MM-DDThh:mm:ss`.
///
/// Accepts the canonical form and the space-separated variant.
pub fn normalize_datetime(s: &str) -> Result<String> {
    let parsed = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| FoliaError::Args(format!("invalid datetime '{s}': {e}")))?;
    Ok(parsed.format("%Y-%m-%dT%H:%M:%S").to_string())
}
