//! Core type lattice: element kinds, capability groups, annotation types.
//!
//! The element set is closed. Capability queries (`group`, `has_base`,
//! `is_subclass`) resolve through an explicit kind/group lattice instead of
//! inheritance; kind-specific behavior elsewhere dispatches on the tag.

use std::fmt;
use std::ops::BitOr;

use crate::error::{FoliaError, Result};

/// The closed set of concrete element kinds.
///
/// `Root` is the document element (xml tag `FoLiA`) and never appears below
/// the top of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementType {
    Root,
    // structure
    Text,
    Speech,
    Division,
    Paragraph,
    Sentence,
    Word,
    PlaceHolder,
    Head,
    Table,
    TableHead,
    Row,
    Cell,
    LineBreak,
    WhiteSpace,
    Part,
    Utterance,
    Event,
    Caption,
    Label,
    Item,
    List,
    Figure,
    Quote,
    Note,
    Definition,
    Term,
    Example,
    Entry,
    Reference,
    Morpheme,
    Alternative,
    AlternativeLayers,
    // token annotations
    PosAnnotation,
    LemmaAnnotation,
    LangAnnotation,
    DomainAnnotation,
    SenseAnnotation,
    SubjectivityAnnotation,
    Phoneme,
    ErrorDetection,
    Correction,
    Str,
    // span annotations
    SyntacticUnit,
    Chunk,
    Entity,
    Headwords,
    DependencyDependent,
    Dependency,
    CoreferenceLink,
    CoreferenceChain,
    SemanticRole,
    TimeSegment,
    // annotation layers
    SyntaxLayer,
    ChunkingLayer,
    EntitiesLayer,
    TimingLayer,
    MorphologyLayer,
    DependenciesLayer,
    CoreferenceLayer,
    SemanticRolesLayer,
    // text markup
    TextMarkupGap,
    TextMarkupString,
    TextMarkupCorrection,
    TextMarkupError,
    TextMarkupStyle,
    // correction children
    New,
    Original,
    Current,
    Suggestion,
    // features
    Feature,
    BeginDateTimeFeature,
    EndDateTimeFeature,
    SynsetFeature,
    ActorFeature,
    HeadFeature,
    ValueFeature,
    FunctionFeature,
    TimeFeature,
    LevelFeature,
    ModalityFeature,
    // content and references
    TextContent,
    PhonContent,
    Content,
    Gap,
    Metric,
    Description,
    XmlComment,
    XmlText,
    External,
    WordReference,
    Alignment,
    AlignReference,
}

/// Capability groupings over the kind set.
///
/// These replace the abstract base classes of the original class lattice:
/// membership in a group grants the corresponding behavior (structural
/// nesting, span membership, correction targets, and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementGroup {
    Structure,
    TokenAnnotation,
    SpanAnnotation,
    AnnotationLayer,
    TextMarkup,
    CorrectionChild,
    Feature,
}

impl ElementType {
    /// All concrete kinds, in declaration order.
    pub const ALL: &'static [ElementType] = &[
        Self::Root,
        Self::Text,
        Self::Speech,
        Self::Division,
        Self::Paragraph,
        Self::Sentence,
        Self::Word,
        Self::PlaceHolder,
        Self::Head,
        Self::Table,
        Self::TableHead,
        Self::Row,
        Self::Cell,
        Self::LineBreak,
        Self::WhiteSpace,
        Self::Part,
        Self::Utterance,
        Self::Event,
        Self::Caption,
        Self::Label,
        Self::Item,
        Self::List,
        Self::Figure,
        Self::Quote,
        Self::Note,
        Self::Definition,
        Self::Term,
        Self::Example,
        Self::Entry,
        Self::Reference,
        Self::Morpheme,
        Self::Alternative,
        Self::AlternativeLayers,
        Self::PosAnnotation,
        Self::LemmaAnnotation,
        Self::LangAnnotation,
        Self::DomainAnnotation,
        Self::SenseAnnotation,
        Self::SubjectivityAnnotation,
        Self::Phoneme,
        Self::ErrorDetection,
        Self::Correction,
        Self::Str,
        Self::SyntacticUnit,
        Self::Chunk,
        Self::Entity,
        Self::Headwords,
        Self::DependencyDependent,
        Self::Dependency,
        Self::CoreferenceLink,
        Self::CoreferenceChain,
        Self::SemanticRole,
        Self::TimeSegment,
        Self::SyntaxLayer,
        Self::ChunkingLayer,
        Self::EntitiesLayer,
        Self::TimingLayer,
        Self::MorphologyLayer,
        Self::DependenciesLayer,
        Self::CoreferenceLayer,
        Self::SemanticRolesLayer,
        Self::TextMarkupGap,
        Self::TextMarkupString,
        Self::TextMarkupCorrection,
        Self::TextMarkupError,
        Self::TextMarkupStyle,
        Self::New,
        Self::Original,
        Self::Current,
        Self::Suggestion,
        Self::Feature,
        Self::BeginDateTimeFeature,
        Self::EndDateTimeFeature,
        Self::SynsetFeature,
        Self::ActorFeature,
        Self::HeadFeature,
        Self::ValueFeature,
        Self::FunctionFeature,
        Self::TimeFeature,
        Self::LevelFeature,
        Self::ModalityFeature,
        Self::TextContent,
        Self::PhonContent,
        Self::Content,
        Self::Gap,
        Self::Metric,
        Self::Description,
        Self::XmlComment,
        Self::XmlText,
        Self::External,
        Self::WordReference,
        Self::Alignment,
        Self::AlignReference,
    ];

    /// The XML tag for this kind.
    #[must_use]
    pub fn xmltag(self) -> &'static str {
        match self {
            Self::Root => "FoLiA",
            Self::Text => "text",
            Self::Speech => "speech",
            Self::Division => "div",
            Self::Paragraph => "p",
            Self::Sentence => "s",
            Self::Word => "w",
            Self::PlaceHolder => "placeholder",
            Self::Head => "head",
            Self::Table => "table",
            Self::TableHead => "tablehead",
            Self::Row => "row",
            Self::Cell => "cell",
            Self::LineBreak => "br",
            Self::WhiteSpace => "whitespace",
            Self::Part => "part",
            Self::Utterance => "utt",
            Self::Event => "event",
            Self::Caption => "caption",
            Self::Label => "label",
            Self::Item => "item",
            Self::List => "list",
            Self::Figure => "figure",
            Self::Quote => "quote",
            Self::Note => "note",
            Self::Definition => "def",
            Self::Term => "term",
            Self::Example => "ex",
            Self::Entry => "entry",
            Self::Reference => "ref",
            Self::Morpheme => "morpheme",
            Self::Alternative => "alt",
            Self::AlternativeLayers => "altlayers",
            Self::PosAnnotation => "pos",
            Self::LemmaAnnotation => "lemma",
            Self::LangAnnotation => "lang",
            Self::DomainAnnotation => "domain",
            Self::SenseAnnotation => "sense",
            Self::SubjectivityAnnotation => "subjectivity",
            Self::Phoneme => "phoneme",
            Self::ErrorDetection => "errordetection",
            Self::Correction => "correction",
            Self::Str => "str",
            Self::SyntacticUnit => "su",
            Self::Chunk => "chunk",
            Self::Entity => "entity",
            Self::Headwords => "hd",
            Self::DependencyDependent => "dep",
            Self::Dependency => "dependency",
            Self::CoreferenceLink => "coreferencelink",
            Self::CoreferenceChain => "coreferencechain",
            Self::SemanticRole => "semrole",
            Self::TimeSegment => "timesegment",
            Self::SyntaxLayer => "syntax",
            Self::ChunkingLayer => "chunking",
            Self::EntitiesLayer => "entities",
            Self::TimingLayer => "timing",
            Self::MorphologyLayer => "morphology",
            Self::DependenciesLayer => "dependencies",
            Self::CoreferenceLayer => "coreferences",
            Self::SemanticRolesLayer => "semroles",
            Self::TextMarkupGap => "t-gap",
            Self::TextMarkupString => "t-str",
            Self::TextMarkupCorrection => "t-correction",
            Self::TextMarkupError => "t-error",
            Self::TextMarkupStyle => "t-style",
            Self::New => "new",
            Self::Original => "original",
            Self::Current => "current",
            Self::Suggestion => "suggestion",
            Self::Feature => "feat",
            Self::BeginDateTimeFeature => "begindatetime",
            Self::EndDateTimeFeature => "enddatetime",
            Self::SynsetFeature => "synset",
            Self::ActorFeature => "actor",
            Self::HeadFeature => "headfeature",
            Self::ValueFeature => "value",
            Self::FunctionFeature => "function",
            Self::TimeFeature => "time",
            Self::LevelFeature => "level",
            Self::ModalityFeature => "modality",
            Self::TextContent => "t",
            Self::PhonContent => "ph",
            Self::Content => "content",
            Self::Gap => "gap",
            Self::Metric => "metric",
            Self::Description => "desc",
            Self::XmlComment => "xml-comment",
            Self::XmlText => "xml-text",
            Self::External => "external",
            Self::WordReference => "wref",
            Self::Alignment => "alignment",
            Self::AlignReference => "aref",
        }
    }

    /// Resolve an XML tag to a kind.
    pub fn from_xmltag(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|et| et.xmltag() == tag)
            .ok_or_else(|| FoliaError::Xml(format!("unknown element <{tag}>")))
    }

    /// The capability group this kind belongs to, if any.
    #[must_use]
    pub fn group(self) -> Option<ElementGroup> {
        use ElementType as E;
        match self {
            E::Text
            | E::Speech
            | E::Division
            | E::Paragraph
            | E::Sentence
            | E::Word
            | E::PlaceHolder
            | E::Head
            | E::Table
            | E::TableHead
            | E::Row
            | E::Cell
            | E::LineBreak
            | E::WhiteSpace
            | E::Part
            | E::Utterance
            | E::Event
            | E::Caption
            | E::Label
            | E::Item
            | E::List
            | E::Figure
            | E::Quote
            | E::Note
            | E::Definition
            | E::Term
            | E::Example
            | E::Entry
            | E::Reference
            | E::Morpheme
            | E::Alternative => Some(ElementGroup::Structure),
            E::PosAnnotation
            | E::LemmaAnnotation
            | E::LangAnnotation
            | E::DomainAnnotation
            | E::SenseAnnotation
            | E::SubjectivityAnnotation
            | E::Phoneme
            | E::ErrorDetection
            | E::Correction
            | E::Str => Some(ElementGroup::TokenAnnotation),
            E::SyntacticUnit
            | E::Chunk
            | E::Entity
            | E::Headwords
            | E::DependencyDependent
            | E::Dependency
            | E::CoreferenceLink
            | E::CoreferenceChain
            | E::SemanticRole
            | E::TimeSegment => Some(ElementGroup::SpanAnnotation),
            E::SyntaxLayer
            | E::ChunkingLayer
            | E::EntitiesLayer
            | E::TimingLayer
            | E::MorphologyLayer
            | E::DependenciesLayer
            | E::CoreferenceLayer
            | E::SemanticRolesLayer => Some(ElementGroup::AnnotationLayer),
            E::TextMarkupGap
            | E::TextMarkupString
            | E::TextMarkupCorrection
            | E::TextMarkupError
            | E::TextMarkupStyle => Some(ElementGroup::TextMarkup),
            E::New | E::Original | E::Current | E::Suggestion => {
                Some(ElementGroup::CorrectionChild)
            }
            E::Feature
            | E::BeginDateTimeFeature
            | E::EndDateTimeFeature
            | E::SynsetFeature
            | E::ActorFeature
            | E::HeadFeature
            | E::ValueFeature
            | E::FunctionFeature
            | E::TimeFeature
            | E::LevelFeature
            | E::ModalityFeature => Some(ElementGroup::Feature),
            _ => None,
        }
    }

    /// Whether this kind sits in the given capability group.
    #[must_use]
    pub fn has_base(self, group: ElementGroup) -> bool {
        self.group() == Some(group)
    }

    /// Kind-level subclass query: `PlaceHolder` counts as a `Word`, every
    /// kind counts as itself.
    #[must_use]
    pub fn is_subclass(self, other: ElementType) -> bool {
        self == other || (self == ElementType::PlaceHolder && other == ElementType::Word)
    }

    /// Whether annotation children may be attached directly.
    #[must_use]
    pub fn allows_annotations(self) -> bool {
        matches!(
            self.group(),
            Some(ElementGroup::Structure)
                | Some(ElementGroup::SpanAnnotation)
                | Some(ElementGroup::AnnotationLayer)
        ) || self == ElementType::Str
    }

    /// Whether this kind may carry tracked corrections. Correction role
    /// content is itself correctable, so nested corrections work.
    #[must_use]
    pub fn allows_corrections(self) -> bool {
        self.allows_annotations() || self.has_base(ElementGroup::CorrectionChild)
    }

    /// Whether this kind maintains per-tag id counters for `generate_id`.
    #[must_use]
    pub fn generates_ids(self) -> bool {
        matches!(
            self.group(),
            Some(ElementGroup::Structure)
                | Some(ElementGroup::TokenAnnotation)
                | Some(ElementGroup::SpanAnnotation)
                | Some(ElementGroup::AnnotationLayer)
        ) || self == ElementType::Root
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xmltag())
    }
}

/// Categories of linguistic annotation, as used in declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationType {
    Text,
    Token,
    Division,
    Paragraph,
    Sentence,
    List,
    Figure,
    Whitespace,
    Linebreak,
    Pos,
    Lemma,
    Domain,
    Sense,
    Subjectivity,
    Correction,
    ErrorDetection,
    Phon,
    Phonological,
    Entity,
    Chunking,
    Syntax,
    Coreference,
    SemanticRole,
    Morphological,
    Event,
    Dependency,
    TimeSegment,
    Gap,
    Quote,
    Note,
    Reference,
    Alignment,
    String,
    Table,
    Style,
    Part,
    Utterance,
    Entry,
    Term,
    Definition,
    Example,
    Metric,
    Lang,
}

impl AnnotationType {
    /// All annotation types, in declaration order.
    pub const ALL: &'static [AnnotationType] = &[
        Self::Text,
        Self::Token,
        Self::Division,
        Self::Paragraph,
        Self::Sentence,
        Self::List,
        Self::Figure,
        Self::Whitespace,
        Self::Linebreak,
        Self::Pos,
        Self::Lemma,
        Self::Domain,
        Self::Sense,
        Self::Subjectivity,
        Self::Correction,
        Self::ErrorDetection,
        Self::Phon,
        Self::Phonological,
        Self::Entity,
        Self::Chunking,
        Self::Syntax,
        Self::Coreference,
        Self::SemanticRole,
        Self::Morphological,
        Self::Event,
        Self::Dependency,
        Self::TimeSegment,
        Self::Gap,
        Self::Quote,
        Self::Note,
        Self::Reference,
        Self::Alignment,
        Self::String,
        Self::Table,
        Self::Style,
        Self::Part,
        Self::Utterance,
        Self::Entry,
        Self::Term,
        Self::Definition,
        Self::Example,
        Self::Metric,
        Self::Lang,
    ];

    /// Base name, as used in declaration tags (`<X-annotation>`).
    #[must_use]
    pub fn base(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Token => "token",
            Self::Division => "division",
            Self::Paragraph => "paragraph",
            Self::Sentence => "sentence",
            Self::List => "list",
            Self::Figure => "figure",
            Self::Whitespace => "whitespace",
            Self::Linebreak => "linebreak",
            Self::Pos => "pos",
            Self::Lemma => "lemma",
            Self::Domain => "domain",
            Self::Sense => "sense",
            Self::Subjectivity => "subjectivity",
            Self::Correction => "correction",
            Self::ErrorDetection => "errordetection",
            Self::Phon => "phon",
            Self::Phonological => "phonological",
            Self::Entity => "entity",
            Self::Chunking => "chunking",
            Self::Syntax => "syntax",
            Self::Coreference => "coreference",
            Self::SemanticRole => "semrole",
            Self::Morphological => "morphological",
            Self::Event => "event",
            Self::Dependency => "dependency",
            Self::TimeSegment => "timesegment",
            Self::Gap => "gap",
            Self::Quote => "quote",
            Self::Note => "note",
            Self::Reference => "reference",
            Self::Alignment => "alignment",
            Self::String => "string",
            Self::Table => "table",
            Self::Style => "style",
            Self::Part => "part",
            Self::Utterance => "utterance",
            Self::Entry => "entry",
            Self::Term => "term",
            Self::Definition => "definition",
            Self::Example => "example",
            Self::Metric => "metric",
            Self::Lang => "lang",
        }
    }

    /// Declaration-tag label (`pos-annotation`, `token-annotation`, ...).
    #[must_use]
    pub fn label(self) -> String {
        format!("{}-annotation", self.base())
    }

    /// Resolve a declaration tag (`pos-annotation`) to an annotation type.
    pub fn from_label(label: &str) -> Result<Self> {
        let base = label
            .strip_suffix("-annotation")
            .ok_or_else(|| FoliaError::Xml(format!("not an annotation declaration: <{label}>")))?;
        Self::ALL
            .iter()
            .copied()
            .find(|at| at.base() == base)
            .ok_or_else(|| FoliaError::Xml(format!("unknown annotation type: {base}")))
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base())
    }
}

/// The kind of agent that produced an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotatorType {
    Auto,
    Manual,
    Generator,
    DataSource,
    Unknown,
}

impl AnnotatorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Generator => "generator",
            Self::DataSource => "datasource",
            Self::Unknown => "unknown",
        }
    }

    /// Unrecognized values map to `Unknown` rather than failing the load.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "auto" => Self::Auto,
            "manual" => Self::Manual,
            "generator" => Self::Generator,
            "datasource" => Self::DataSource,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AnnotatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitset over the common attributes an element kind may or must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attrib(u16);

impl Attrib {
    pub const NONE: Attrib = Attrib(0);
    pub const ID: Attrib = Attrib(1);
    pub const CLASS: Attrib = Attrib(1 << 1);
    pub const ANNOTATOR: Attrib = Attrib(1 << 2);
    pub const CONFIDENCE: Attrib = Attrib(1 << 3);
    pub const N: Attrib = Attrib(1 << 4);
    pub const DATETIME: Attrib = Attrib(1 << 5);
    pub const BEGINTIME: Attrib = Attrib(1 << 6);
    pub const ENDTIME: Attrib = Attrib(1 << 7);
    pub const SRC: Attrib = Attrib(1 << 8);
    pub const SPEAKER: Attrib = Attrib(1 << 9);

    /// The usual optional set for annotation elements.
    pub const COMMON: Attrib = Attrib(
        Self::ID.0
            | Self::CLASS.0
            | Self::ANNOTATOR.0
            | Self::CONFIDENCE.0
            | Self::N.0
            | Self::DATETIME.0,
    );

    #[must_use]
    pub const fn union(self, other: Attrib) -> Attrib {
        Attrib(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Attrib) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Attrib {
    type Output = Attrib;

    fn bitor(self, rhs: Attrib) -> Attrib {
        self.union(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for et in ElementType::ALL {
            assert_eq!(ElementType::from_xmltag(et.xmltag()).ok(), Some(*et));
        }
    }

    #[test]
    fn test_tags_unique() {
        let mut seen = std::collections::HashSet::new();
        for et in ElementType::ALL {
            assert!(seen.insert(et.xmltag()), "duplicate tag {}", et.xmltag());
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        assert!(ElementType::from_xmltag("artikel").is_err());
    }

    #[test]
    fn test_groups() {
        assert!(ElementType::Word.has_base(ElementGroup::Structure));
        assert!(ElementType::Entity.has_base(ElementGroup::SpanAnnotation));
        assert!(ElementType::EntitiesLayer.has_base(ElementGroup::AnnotationLayer));
        assert!(!ElementType::TextContent.has_base(ElementGroup::Structure));
        assert!(ElementType::PlaceHolder.is_subclass(ElementType::Word));
        assert!(!ElementType::Word.is_subclass(ElementType::PlaceHolder));
    }

    #[test]
    fn test_annotation_labels() {
        assert_eq!(AnnotationType::Pos.label(), "pos-annotation");
        assert_eq!(
            AnnotationType::from_label("token-annotation").ok(),
            Some(AnnotationType::Token)
        );
        assert!(AnnotationType::from_label("pos").is_err());
    }

    #[test]
    fn test_attrib_bitset() {
        let a = Attrib::ID | Attrib::CLASS;
        assert!(a.contains(Attrib::ID));
        assert!(a.contains(Attrib::CLASS));
        assert!(!a.contains(Attrib::CONFIDENCE));
        assert!(Attrib::COMMON.contains(Attrib::DATETIME));
    }

    #[test]
    fn test_annotator_type_unknown_fallback() {
        assert_eq!(AnnotatorType::parse("manual"), AnnotatorType::Manual);
        assert_eq!(AnnotatorType::parse("wetware"), AnnotatorType::Unknown);
        assert_eq!(AnnotatorType::Unknown.as_str(), "unknown");
    }
}
