//! Static per-kind descriptors: the type registry.
//!
//! Every element kind has exactly one [`Properties`] record in a process-wide
//! table, looked up by kind tag. The record fixes which attributes are
//! required or allowed, which children are acceptable, occurrence limits,
//! the bound annotation type, printability and the text delimiter. No
//! per-instance copies exist.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::types::{AnnotationType, Attrib, ElementGroup, ElementType};

/// An entry in an accepted-children set: a concrete kind or a whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Kind(ElementType),
    Group(ElementGroup),
}

/// Structural rules for one element kind.
#[derive(Debug, Clone)]
pub struct Properties {
    pub required_attributes: Attrib,
    pub optional_attributes: Attrib,
    pub accepted_data: Vec<Accept>,
    /// Maximum number of children of this kind under one parent; 0 = unlimited.
    pub occurrences: usize,
    /// Maximum per annotation set (or per text class for content kinds); 0 = unlimited.
    pub occurrences_per_set: usize,
    pub annotation_type: Option<AnnotationType>,
    pub printable: bool,
    pub speakable: bool,
    /// Authoritative content; false for alternatives and retained originals.
    pub auth: bool,
    pub xlink: bool,
    pub text_delimiter: &'static str,
}

impl Properties {
    fn new() -> Self {
        Self {
            required_attributes: Attrib::NONE,
            optional_attributes: Attrib::NONE,
            accepted_data: Vec::new(),
            occurrences: 0,
            occurrences_per_set: 0,
            annotation_type: None,
            printable: false,
            speakable: false,
            auth: true,
            xlink: false,
            text_delimiter: "",
        }
    }

    fn required(mut self, a: Attrib) -> Self {
        self.required_attributes = a;
        self
    }

    fn optional(mut self, a: Attrib) -> Self {
        self.optional_attributes = a;
        self
    }

    fn accepts(mut self, data: &[Accept]) -> Self {
        self.accepted_data = data.to_vec();
        self
    }

    fn annotation(mut self, at: AnnotationType) -> Self {
        self.annotation_type = Some(at);
        self
    }

    fn printable(mut self) -> Self {
        self.printable = true;
        self
    }

    fn speakable(mut self) -> Self {
        self.speakable = true;
        self
    }

    fn unauth(mut self) -> Self {
        self.auth = false;
        self
    }

    fn xlinked(mut self) -> Self {
        self.xlink = true;
        self
    }

    fn delimiter(mut self, d: &'static str) -> Self {
        self.text_delimiter = d;
        self
    }

    fn max(mut self, n: usize) -> Self {
        self.occurrences = n;
        self
    }

    fn max_per_set(mut self, n: usize) -> Self {
        self.occurrences_per_set = n;
        self
    }

    /// Whether a child of the given kind is in the accepted-children set.
    #[must_use]
    pub fn accepts_kind(&self, child: ElementType) -> bool {
        self.accepted_data.iter().any(|a| match a {
            Accept::Kind(k) => child.is_subclass(*k),
            Accept::Group(g) => child.has_base(*g),
        })
    }
}

/// Kinds skipped by default during normal iteration: retained originals,
/// informational suggestions and alternative readings.
pub const DEFAULT_IGNORE: &[ElementType] = &[
    ElementType::Original,
    ElementType::Suggestion,
    ElementType::Alternative,
    ElementType::AlternativeLayers,
];

const STRUCT_OPTIONAL: Attrib = Attrib::COMMON
    .union(Attrib::SRC)
    .union(Attrib::BEGINTIME)
    .union(Attrib::ENDTIME)
    .union(Attrib::SPEAKER);

use Accept::{Group, Kind};
use AnnotationType as A;
use ElementGroup as G;
use ElementType as E;

/// The common annotation/content children every structural kind accepts.
const STRUCT_EXTRAS: &[Accept] = &[
    Group(G::TokenAnnotation),
    Group(G::AnnotationLayer),
    Kind(E::TextContent),
    Kind(E::PhonContent),
    Kind(E::Description),
    Kind(E::Metric),
    Kind(E::Alternative),
    Kind(E::AlternativeLayers),
    Kind(E::Alignment),
    Kind(E::Feature),
    Kind(E::XmlComment),
    Kind(E::Gap),
    Kind(E::Part),
];

fn structure(at: AnnotationType, delim: &'static str, extra: &[Accept]) -> Properties {
    let mut accepted = STRUCT_EXTRAS.to_vec();
    accepted.extend_from_slice(extra);
    Properties::new()
        .annotation(at)
        .printable()
        .speakable()
        .delimiter(delim)
        .optional(STRUCT_OPTIONAL)
        .accepts(&accepted)
}

fn token_annotation(at: AnnotationType) -> Properties {
    Properties::new()
        .annotation(at)
        .required(Attrib::CLASS)
        .optional(Attrib::COMMON)
        .max_per_set(1)
        .accepts(&[
            Group(G::Feature),
            Kind(E::Description),
            Kind(E::Metric),
            Kind(E::XmlComment),
        ])
}

fn span_annotation(at: AnnotationType, extra: &[Accept]) -> Properties {
    let mut accepted = vec![
        Kind(E::WordReference),
        Group(G::Feature),
        Kind(E::Description),
        Kind(E::Metric),
        Kind(E::XmlComment),
    ];
    accepted.extend_from_slice(extra);
    Properties::new()
        .annotation(at)
        .printable()
        .optional(Attrib::COMMON)
        .accepts(&accepted)
}

fn layer(at: AnnotationType) -> Properties {
    Properties::new().annotation(at).accepts(&[
        Group(G::SpanAnnotation),
        Kind(E::Correction),
        Kind(E::Description),
        Kind(E::XmlComment),
    ])
}

fn markup() -> Properties {
    Properties::new()
        .printable()
        .optional(Attrib::COMMON)
        .delimiter("")
        .accepts(&[Kind(E::XmlText), Group(G::TextMarkup), Kind(E::LineBreak)])
}

fn correction_child() -> Properties {
    Properties::new().printable().speakable().accepts(&[
        Group(G::Structure),
        Group(G::TokenAnnotation),
        Group(G::SpanAnnotation),
        Kind(E::TextContent),
        Kind(E::PhonContent),
        Kind(E::Description),
        Kind(E::Metric),
        Kind(E::XmlComment),
    ])
}

fn feature() -> Properties {
    Properties::new()
        .required(Attrib::CLASS)
        .accepts(&[Kind(E::Description), Kind(E::XmlComment)])
}

fn build_table() -> HashMap<ElementType, Properties> {
    let mut m = HashMap::new();

    m.insert(
        E::Root,
        Properties::new()
            .required(Attrib::ID)
            .printable()
            .speakable()
            .delimiter("\n")
            .accepts(&[Kind(E::Text), Kind(E::Speech), Kind(E::XmlComment)]),
    );

    // structure
    m.insert(
        E::Text,
        structure(A::Text, "\n\n", &[Group(G::Structure), Kind(E::External)])
            .required(Attrib::ID),
    );
    m.insert(
        E::Speech,
        structure(A::Text, "\n\n", &[Group(G::Structure), Kind(E::External)])
            .required(Attrib::ID),
    );
    m.insert(
        E::Division,
        structure(A::Division, "\n\n", &[Group(G::Structure)]).required(Attrib::ID),
    );
    m.insert(
        E::Paragraph,
        structure(
            A::Paragraph,
            "\n\n",
            &[
                Kind(E::Sentence),
                Kind(E::Word),
                Kind(E::Quote),
                Kind(E::LineBreak),
                Kind(E::WhiteSpace),
                Kind(E::Entry),
                Kind(E::Example),
                Kind(E::Figure),
                Kind(E::List),
                Kind(E::Event),
                Kind(E::Note),
                Kind(E::Reference),
                Kind(E::Str),
            ],
        ),
    );
    m.insert(
        E::Sentence,
        structure(
            A::Sentence,
            " ",
            &[
                Kind(E::Word),
                Kind(E::Quote),
                Kind(E::LineBreak),
                Kind(E::WhiteSpace),
                Kind(E::Event),
                Kind(E::Note),
                Kind(E::Reference),
                Kind(E::Entry),
                Kind(E::Example),
                Kind(E::Str),
            ],
        ),
    );
    m.insert(
        E::Word,
        structure(
            A::Token,
            " ",
            &[Kind(E::PlaceHolder), Kind(E::Reference), Kind(E::Str)],
        ),
    );
    m.insert(E::PlaceHolder, structure(A::Token, " ", &[]));
    m.insert(
        E::Head,
        structure(
            A::Division,
            "\n\n",
            &[
                Kind(E::Sentence),
                Kind(E::Word),
                Kind(E::LineBreak),
                Kind(E::WhiteSpace),
                Kind(E::Event),
                Kind(E::Reference),
                Kind(E::Str),
            ],
        )
        .max(1),
    );
    m.insert(
        E::Table,
        structure(A::Table, "\n", &[Kind(E::Row), Kind(E::TableHead)]),
    );
    m.insert(E::TableHead, structure(A::Table, "\n", &[Kind(E::Row)]).max(1));
    m.insert(E::Row, structure(A::Table, "\n", &[Kind(E::Cell)]));
    m.insert(
        E::Cell,
        structure(
            A::Table,
            " | ",
            &[
                Kind(E::Sentence),
                Kind(E::Word),
                Kind(E::Paragraph),
                Kind(E::LineBreak),
                Kind(E::WhiteSpace),
                Kind(E::Event),
                Kind(E::Note),
                Kind(E::Reference),
                Kind(E::Str),
            ],
        ),
    );
    m.insert(
        E::LineBreak,
        Properties::new()
            .annotation(A::Linebreak)
            .printable()
            .optional(STRUCT_OPTIONAL)
            .delimiter(""),
    );
    m.insert(
        E::WhiteSpace,
        Properties::new()
            .annotation(A::Whitespace)
            .printable()
            .optional(STRUCT_OPTIONAL)
            .delimiter(""),
    );
    m.insert(E::Part, structure(A::Part, " ", &[Group(G::Structure)]));
    m.insert(
        E::Utterance,
        structure(A::Utterance, " ", &[Kind(E::Sentence), Kind(E::Word), Kind(E::Quote)]),
    );
    m.insert(E::Event, structure(A::Event, "\n\n", &[Group(G::Structure)]));
    m.insert(
        E::Caption,
        structure(A::Figure, "\n\n", &[Kind(E::Sentence), Kind(E::Reference), Kind(E::LineBreak), Kind(E::WhiteSpace)]).max(1),
    );
    m.insert(E::Label, structure(A::List, " ", &[Kind(E::Word), Kind(E::Reference)]));
    m.insert(
        E::Item,
        structure(A::List, "\n", &[Group(G::Structure)]),
    );
    m.insert(
        E::List,
        structure(A::List, "\n\n", &[Kind(E::Item), Kind(E::Caption), Kind(E::Event), Kind(E::Note), Kind(E::Reference)]),
    );
    m.insert(
        E::Figure,
        structure(A::Figure, "\n\n", &[Kind(E::Sentence), Kind(E::Caption)]),
    );
    m.insert(
        E::Quote,
        structure(
            A::Quote,
            " ",
            &[
                Kind(E::Word),
                Kind(E::Sentence),
                Kind(E::Paragraph),
                Kind(E::Utterance),
                Kind(E::Division),
                Kind(E::Reference),
                Kind(E::Str),
            ],
        )
        .delimiter(" "),
    );
    m.insert(E::Note, structure(A::Note, "\n\n", &[Group(G::Structure)]));
    m.insert(
        E::Definition,
        structure(A::Definition, "\n\n", &[Kind(E::Paragraph), Kind(E::Sentence), Kind(E::Word), Kind(E::Utterance), Kind(E::List), Kind(E::Figure), Kind(E::Table), Kind(E::Reference)]),
    );
    m.insert(
        E::Term,
        structure(A::Term, " ", &[Kind(E::Paragraph), Kind(E::Sentence), Kind(E::Word), Kind(E::Utterance), Kind(E::List), Kind(E::Figure), Kind(E::Table), Kind(E::Reference)]),
    );
    m.insert(
        E::Example,
        structure(A::Example, "\n\n", &[Kind(E::Paragraph), Kind(E::Sentence), Kind(E::Word), Kind(E::Utterance), Kind(E::List), Kind(E::Figure), Kind(E::Table), Kind(E::Reference)]),
    );
    m.insert(
        E::Entry,
        structure(A::Entry, "\n\n", &[Kind(E::Term), Kind(E::Definition), Kind(E::Example)]),
    );
    m.insert(
        E::Reference,
        structure(A::Reference, " ", &[Kind(E::Sentence), Kind(E::Word), Kind(E::Quote), Kind(E::Str)]),
    );
    m.insert(
        E::Morpheme,
        structure(A::Morphological, "", &[Kind(E::Morpheme), Kind(E::Str)]),
    );
    m.insert(
        E::Alternative,
        Properties::new()
            .optional(Attrib::COMMON)
            .unauth()
            .printable()
            .accepts(&[
                Group(G::TokenAnnotation),
                Kind(E::Correction),
                Kind(E::MorphologyLayer),
                Kind(E::XmlComment),
            ]),
    );
    m.insert(
        E::AlternativeLayers,
        Properties::new()
            .optional(Attrib::COMMON)
            .unauth()
            .accepts(&[Group(G::AnnotationLayer), Kind(E::XmlComment)]),
    );

    // token annotations
    m.insert(E::PosAnnotation, token_annotation(A::Pos));
    m.insert(E::LemmaAnnotation, token_annotation(A::Lemma));
    m.insert(E::LangAnnotation, token_annotation(A::Lang));
    m.insert(E::DomainAnnotation, token_annotation(A::Domain));
    m.insert(E::SenseAnnotation, token_annotation(A::Sense));
    m.insert(E::SubjectivityAnnotation, token_annotation(A::Subjectivity));
    m.insert(
        E::Phoneme,
        token_annotation(A::Phonological).speakable().accepts(&[
            Group(G::Feature),
            Kind(E::PhonContent),
            Kind(E::Description),
            Kind(E::XmlComment),
        ]),
    );
    m.insert(E::ErrorDetection, token_annotation(A::ErrorDetection).max_per_set(0));
    m.insert(
        E::Correction,
        Properties::new()
            .annotation(A::Correction)
            .printable()
            .speakable()
            .optional(Attrib::COMMON)
            .accepts(&[
                Kind(E::New),
                Kind(E::Original),
                Kind(E::Current),
                Kind(E::Suggestion),
                Group(G::Feature),
                Kind(E::Description),
                Kind(E::Metric),
                Kind(E::XmlComment),
            ]),
    );
    m.insert(
        E::Str,
        Properties::new()
            .annotation(A::String)
            .printable()
            .optional(Attrib::COMMON.union(Attrib::SRC).union(Attrib::BEGINTIME).union(Attrib::ENDTIME))
            .accepts(&[
                Group(G::TokenAnnotation),
                Kind(E::TextContent),
                Kind(E::PhonContent),
                Kind(E::Alignment),
                Kind(E::Description),
                Kind(E::Metric),
                Kind(E::XmlComment),
            ]),
    );

    // span annotations
    m.insert(
        E::SyntacticUnit,
        span_annotation(A::Syntax, &[Kind(E::SyntacticUnit)]),
    );
    m.insert(E::Chunk, span_annotation(A::Chunking, &[]));
    m.insert(E::Entity, span_annotation(A::Entity, &[]));
    m.insert(E::Headwords, span_annotation(A::Dependency, &[]).max(1));
    m.insert(E::DependencyDependent, span_annotation(A::Dependency, &[]).max(1));
    m.insert(
        E::Dependency,
        span_annotation(A::Dependency, &[Kind(E::Headwords), Kind(E::DependencyDependent)]),
    );
    m.insert(E::CoreferenceLink, span_annotation(A::Coreference, &[]));
    m.insert(
        E::CoreferenceChain,
        span_annotation(A::Coreference, &[Kind(E::CoreferenceLink)]),
    );
    m.insert(E::SemanticRole, span_annotation(A::SemanticRole, &[]));
    m.insert(E::TimeSegment, span_annotation(A::TimeSegment, &[]));

    // annotation layers
    m.insert(E::SyntaxLayer, layer(A::Syntax));
    m.insert(E::ChunkingLayer, layer(A::Chunking));
    m.insert(E::EntitiesLayer, layer(A::Entity));
    m.insert(E::TimingLayer, layer(A::TimeSegment));
    m.insert(E::MorphologyLayer, layer(A::Morphological).accepts(&[
        Kind(E::Morpheme),
        Kind(E::Correction),
        Kind(E::Description),
        Kind(E::XmlComment),
    ]));
    m.insert(E::DependenciesLayer, layer(A::Dependency));
    m.insert(E::CoreferenceLayer, layer(A::Coreference));
    m.insert(E::SemanticRolesLayer, layer(A::SemanticRole));

    // text markup
    m.insert(E::TextMarkupGap, markup().annotation(A::Gap));
    m.insert(E::TextMarkupString, markup().annotation(A::String));
    m.insert(E::TextMarkupCorrection, markup().annotation(A::Correction));
    m.insert(E::TextMarkupError, markup().annotation(A::ErrorDetection));
    m.insert(E::TextMarkupStyle, markup().annotation(A::Style));

    // correction children
    m.insert(E::New, correction_child().max(1));
    m.insert(E::Current, correction_child().max(1));
    m.insert(E::Original, correction_child().max(1).unauth());
    m.insert(E::Suggestion, correction_child().unauth().optional(Attrib::COMMON));

    // features
    m.insert(E::Feature, feature());
    m.insert(E::BeginDateTimeFeature, feature());
    m.insert(E::EndDateTimeFeature, feature());
    m.insert(E::SynsetFeature, feature());
    m.insert(E::ActorFeature, feature());
    m.insert(E::HeadFeature, feature());
    m.insert(E::ValueFeature, feature());
    m.insert(E::FunctionFeature, feature());
    m.insert(E::TimeFeature, feature());
    m.insert(E::LevelFeature, feature());
    m.insert(E::ModalityFeature, feature());

    // content and references
    m.insert(
        E::TextContent,
        Properties::new()
            .annotation(A::Text)
            .printable()
            .optional(Attrib::CLASS.union(Attrib::ANNOTATOR).union(Attrib::CONFIDENCE).union(Attrib::DATETIME))
            .max_per_set(1)
            .delimiter("")
            .accepts(&[Kind(E::XmlText), Group(G::TextMarkup), Kind(E::LineBreak), Kind(E::XmlComment)]),
    );
    m.insert(
        E::PhonContent,
        Properties::new()
            .annotation(A::Phon)
            .speakable()
            .optional(Attrib::CLASS.union(Attrib::ANNOTATOR).union(Attrib::CONFIDENCE).union(Attrib::DATETIME))
            .max_per_set(1)
            .delimiter("")
            .accepts(&[Kind(E::XmlText), Kind(E::XmlComment)]),
    );
    m.insert(E::Content, Properties::new().max(1));
    m.insert(
        E::Gap,
        Properties::new()
            .annotation(A::Gap)
            .optional(Attrib::COMMON)
            .accepts(&[Kind(E::Content), Kind(E::Description), Kind(E::Part), Kind(E::XmlComment)]),
    );
    m.insert(
        E::Metric,
        Properties::new()
            .annotation(A::Metric)
            .required(Attrib::CLASS)
            .optional(Attrib::COMMON)
            .accepts(&[Group(G::Feature), Kind(E::Description), Kind(E::XmlComment)]),
    );
    m.insert(E::Description, Properties::new().max(1));
    m.insert(E::XmlComment, Properties::new());
    m.insert(E::XmlText, Properties::new().printable().speakable().delimiter(""));
    m.insert(
        E::External,
        Properties::new().required(Attrib::SRC).optional(Attrib::ID),
    );
    m.insert(E::WordReference, Properties::new());
    m.insert(
        E::Alignment,
        Properties::new()
            .annotation(A::Alignment)
            .optional(Attrib::COMMON.union(Attrib::SRC))
            .xlinked()
            .accepts(&[Kind(E::AlignReference), Kind(E::Description), Kind(E::Metric), Group(G::Feature), Kind(E::XmlComment)]),
    );
    m.insert(E::AlignReference, Properties::new());

    m
}

static TABLE: LazyLock<HashMap<ElementType, Properties>> = LazyLock::new(build_table);

impl ElementType {
    /// The structural descriptor for this kind.
    #[must_use]
    pub fn properties(self) -> &'static Properties {
        // The table is total over ElementType by construction; the sanity
        // test below guards it.
        #[allow(clippy::expect_used)]
        TABLE.get(&self).expect("properties table is total")
    }
}

/// The token-annotation element kind bound to an annotation type, if any.
#[must_use]
pub fn annotation_element(at: AnnotationType) -> Option<ElementType> {
    ElementType::ALL.iter().copied().find(|et| {
        et.has_base(ElementGroup::TokenAnnotation)
            && et.properties().annotation_type == Some(at)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_total() {
        for et in ElementType::ALL {
            assert!(TABLE.contains_key(et), "no properties for {et:?}");
        }
    }

    #[test]
    fn test_word_accepts() {
        let p = ElementType::Word.properties();
        assert!(p.accepts_kind(ElementType::TextContent));
        assert!(p.accepts_kind(ElementType::PosAnnotation));
        assert!(!p.accepts_kind(ElementType::Sentence));
        assert_eq!(p.text_delimiter, " ");
    }

    #[test]
    fn test_sentence_accepts_words_not_paragraphs() {
        let p = ElementType::Sentence.properties();
        assert!(p.accepts_kind(ElementType::Word));
        assert!(p.accepts_kind(ElementType::PlaceHolder)); // subclass of Word
        assert!(!p.accepts_kind(ElementType::Paragraph));
    }

    #[test]
    fn test_correction_roles() {
        let p = ElementType::Correction.properties();
        assert!(p.accepts_kind(ElementType::New));
        assert!(p.accepts_kind(ElementType::Suggestion));
        assert!(!p.accepts_kind(ElementType::Word));
        assert_eq!(ElementType::New.properties().occurrences, 1);
        assert!(!ElementType::Original.properties().auth);
    }

    #[test]
    fn test_annotation_element_lookup() {
        assert_eq!(annotation_element(AnnotationType::Pos), Some(ElementType::PosAnnotation));
        assert_eq!(annotation_element(AnnotationType::Lemma), Some(ElementType::LemmaAnnotation));
        assert_eq!(annotation_element(AnnotationType::Syntax), None);
    }
}
