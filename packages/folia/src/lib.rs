//! A document model for FoLiA, the Format for Linguistic Annotation.
//!
//! The crate holds annotated documents as a typed tree over a node arena,
//! keeps a document-wide id index, tracks annotation declarations with
//! their defaults, reconstructs text from the token layer and validates
//! character offsets, applies tracked corrections, resolves span
//! annotations over weak word references and matches token-sequence
//! patterns over the word stream.
//!
//! ```
//! use folia::{Document, ElementArgs};
//!
//! let mut doc = Document::new("example")?;
//! let text = doc.add_text(ElementArgs::new().with_id("example.text"))?;
//! let sentence = doc.add_sentence(text, ElementArgs::new())?;
//! for token in ["Hallo", "wereld"] {
//!     doc.add_word(sentence, ElementArgs::new().with_text(token))?;
//! }
//! assert_eq!(doc.str(sentence)?, "Hallo wereld");
//! # Ok::<(), folia::FoliaError>(())
//! ```

pub mod correction;
pub mod document;
pub mod element;
pub mod error;
pub mod metadata;
pub mod pattern;
pub mod properties;
pub mod provenance;
pub mod span;
pub mod text;
pub mod types;
pub mod xml;

pub use correction::CorrectArgs;
pub use document::{
    DeclarationPolicy, DeclareArgs, Document, DocumentState, Mode, Select, UNDEFINED_SET,
};
pub use element::{ElementArgs, NodeId};
pub use error::{FoliaError, Result};
pub use metadata::{Metadata, Style};
pub use pattern::{Pattern, PatternOptions, PatternUnit};
pub use properties::Properties;
pub use provenance::{Processor, ProcessorArgs, Provenance};
pub use text::TextParameters;
pub use types::{AnnotationType, AnnotatorType, Attrib, ElementGroup, ElementType};
pub use xml::serialize::SerializeOptions;

/// The FoLiA XML namespace.
pub const NSFOLIA: &str = "http://ilk.uvt.nl/folia";

/// The XLink namespace, used for alignment targets.
pub const NSXLINK: &str = "http://www.w3.org/1999/xlink";

/// The FoLiA format version this library implements.
pub const FOLIA_VERSION: &str = "1.5.1";
