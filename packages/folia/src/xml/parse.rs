//! Two-phase XML loading.
//!
//! Phase one builds the typed tree top-down with the same schema checks
//! programmatic construction runs, recording weak references and content
//! offsets as encountered. Phase two resolves references against the
//! finished index and validates the buffered offsets.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use roxmltree::{Node, NodeType};
use tracing::{debug, warn};

use crate::document::{DeclareArgs, Document, DocumentState, Mode, UNDEFINED_SET};
use crate::element::{ElementArgs, NodeId};
use crate::error::{FoliaError, Result};
use crate::metadata::Metadata;
use crate::provenance::ProcessorArgs;
use crate::types::{AnnotationType, AnnotatorType, ElementGroup, ElementType};
use crate::xml::{attribute, element_children, find_child, tag_name, yes_no};
use crate::NSFOLIA;

static STYLESHEET_PI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<\?xml-stylesheet\s+([^?]*)\?>"#).expect("valid regex")
});
static PI_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\w+)="([^"]*)""#).expect("valid regex"));

impl Document {
    /// Load a document from a file.
    pub fn from_file(path: impl AsRef<Path>, mode: Mode) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_xml(&xml, mode)
    }

    /// Load a document from XML text.
    pub fn from_xml(xml: &str, mode: Mode) -> Result<Self> {
        let tree = roxmltree::Document::parse(xml)?;
        let root = tree.root_element();
        if tag_name(root) != "FoLiA" {
            return Err(FoliaError::Xml(format!(
                "root element is <{}>, expected <FoLiA>",
                tag_name(root)
            )));
        }
        if root.tag_name().namespace() != Some(NSFOLIA) {
            if mode.permissive {
                warn!("document does not declare the FoLiA namespace");
            } else {
                return Err(FoliaError::Xml(
                    "root element is not in the FoLiA namespace".to_string(),
                ));
            }
        }
        let id = attribute(root, "id")
            .ok_or_else(|| FoliaError::Xml("document has no xml:id".to_string()))?;
        let mut doc = Document::with_mode(id, mode)?;
        doc.set_state(DocumentState::Building);
        if let Some(version) = attribute(root, "version") {
            doc.check_version(version)?;
        }
        doc.generator = attribute(root, "generator").map(str::to_string);

        // stylesheet instructions precede the root element
        for pi in STYLESHEET_PI.captures_iter(xml) {
            let mut styletype = None;
            let mut href = None;
            for attr in PI_ATTR.captures_iter(&pi[1]) {
                match &attr[1] {
                    "type" => styletype = Some(attr[2].to_string()),
                    "href" => href = Some(attr[2].to_string()),
                    _ => {}
                }
            }
            if let (Some(t), Some(h)) = (styletype, href) {
                doc.add_style(&t, &h);
            }
        }

        if let Some(meta) = find_child(root, "metadata") {
            doc.parse_metadata(meta, xml)?;
        }
        for child in element_children(root) {
            match tag_name(child) {
                "metadata" => {}
                "text" | "speech" => {
                    let parent = doc.root();
                    doc.parse_element(child, parent)?;
                }
                other => {
                    return Err(FoliaError::Xml(format!(
                        "unexpected <{other}> at document level"
                    )))
                }
            }
        }
        doc.resolve_references()?;
        if mode.checktext || mode.fixtext {
            doc.validate_offsets()?;
        }
        debug!(id = doc.id(), nodes = doc.len(), "document loaded");
        Ok(doc)
    }

    fn parse_metadata(&mut self, node: Node<'_, '_>, xml: &str) -> Result<()> {
        if let Some(t) = attribute(node, "type") {
            self.metadata.metadata_type = t.to_string();
        }
        self.metadata.src = attribute(node, "src").map(str::to_string);
        for child in element_children(node) {
            match tag_name(child) {
                "annotations" => self.parse_annotations(child)?,
                "provenance" => {
                    for processor in element_children(child) {
                        self.parse_processor(processor, None)?;
                    }
                }
                "meta" => {
                    let key = attribute(child, "id").ok_or_else(|| {
                        FoliaError::Xml("<meta> without an id".to_string())
                    })?;
                    self.metadata
                        .set(key, child.text().unwrap_or_default().trim());
                }
                "submetadata" => {
                    let id = attribute(child, "id").ok_or_else(|| {
                        FoliaError::Xml("<submetadata> without an xml:id".to_string())
                    })?;
                    let mut sub = Metadata::default();
                    if let Some(t) = attribute(child, "type") {
                        sub.metadata_type = t.to_string();
                    }
                    for item in element_children(child) {
                        match tag_name(item) {
                            "meta" => {
                                if let Some(key) = attribute(item, "id") {
                                    sub.set(key, item.text().unwrap_or_default().trim());
                                }
                            }
                            "foreign-data" => sub.add_foreign(raw_fragment(item, xml)),
                            _ => {}
                        }
                    }
                    self.submetadata.insert(id.to_string(), sub);
                }
                "foreign-data" => {
                    let fragment = raw_fragment(child, xml);
                    self.metadata.add_foreign(fragment);
                }
                other => {
                    if self.mode().permissive {
                        warn!(tag = other, "skipping unknown metadata element");
                    } else {
                        return Err(FoliaError::Xml(format!(
                            "unexpected <{other}> in metadata"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn parse_annotations(&mut self, node: Node<'_, '_>) -> Result<()> {
        for decl in element_children(node) {
            let at = match AnnotationType::from_label(tag_name(decl)) {
                Ok(at) => at,
                Err(e) => {
                    if self.mode().permissive {
                        warn!(tag = tag_name(decl), "skipping unknown declaration");
                        continue;
                    }
                    return Err(e);
                }
            };
            let set = attribute(decl, "set").unwrap_or(UNDEFINED_SET).to_string();
            let annotator_type = attribute(decl, "annotatortype").map(AnnotatorType::parse);
            let processors = element_children(decl)
                .filter(|c| tag_name(*c) == "annotator")
                .filter_map(|c| attribute(c, "processor").map(str::to_string))
                .collect();
            self.declare(
                at,
                &set,
                DeclareArgs {
                    alias: attribute(decl, "alias").map(str::to_string),
                    annotator: attribute(decl, "annotator").map(str::to_string),
                    annotator_type,
                    datetime: attribute(decl, "datetime").map(str::to_string),
                    processors,
                },
            )?;
        }
        Ok(())
    }

    fn parse_processor(&mut self, node: Node<'_, '_>, parent: Option<&str>) -> Result<()> {
        if tag_name(node) != "processor" {
            return Err(FoliaError::Xml(format!(
                "unexpected <{}> in provenance",
                tag_name(node)
            )));
        }
        let name = attribute(node, "name")
            .ok_or_else(|| FoliaError::Xml("<processor> without a name".to_string()))?;
        let processor_type = attribute(node, "type").map(AnnotatorType::parse);
        let args = ProcessorArgs {
            id: attribute(node, "id").map(str::to_string),
            name: name.to_string(),
            processor_type,
            version: attribute(node, "version").map(str::to_string),
            command: attribute(node, "command").map(str::to_string),
            host: attribute(node, "host").map(str::to_string),
            user: attribute(node, "user").map(str::to_string),
            begindatetime: attribute(node, "begindatetime").map(str::to_string),
            enddatetime: attribute(node, "enddatetime").map(str::to_string),
            resourcelink: attribute(node, "resourcelink").map(str::to_string),
            system_defaults: false,
        };
        let id = self.add_processor(args, parent)?;
        if let Some(p) = self.provenance.get_mut(&id) {
            p.document_version = attribute(node, "document_version").map(str::to_string);
            p.folia_version = attribute(node, "folia_version").map(str::to_string);
        }
        for child in element_children(node) {
            match tag_name(child) {
                "processor" => self.parse_processor(child, Some(&id))?,
                "meta" => {
                    if let (Some(key), Some(p)) =
                        (attribute(child, "id"), self.provenance.get_mut(&id))
                    {
                        p.metadata.insert(
                            key.to_string(),
                            child.text().unwrap_or_default().trim().to_string(),
                        );
                    }
                }
                other => {
                    return Err(FoliaError::Xml(format!(
                        "unexpected <{other}> in <processor>"
                    )))
                }
            }
        }
        Ok(())
    }

    fn parse_element(&mut self, node: Node<'_, '_>, parent: NodeId) -> Result<()> {
        let tag = tag_name(node);
        match tag {
            "wref" => return self.parse_wref(node, parent, ElementType::WordReference),
            "aref" => return self.parse_wref(node, parent, ElementType::AlignReference),
            _ => {}
        }
        let kind = match ElementType::from_xmltag(tag) {
            Ok(kind) => kind,
            Err(e) => {
                if self.mode().permissive {
                    warn!(tag, "skipping unknown element");
                    return Ok(());
                }
                return Err(e);
            }
        };
        let args = element_args(node, kind)?;
        let child = self.create(kind, args)?;
        self.append_child(parent, child)?;

        match kind {
            ElementType::TextContent | ElementType::PhonContent => {
                if let Some(offset) = attribute(node, "offset") {
                    let offset = offset.parse::<usize>().map_err(|_| {
                        FoliaError::Xml(format!("invalid offset '{offset}'"))
                    })?;
                    self.node_mut(child).offset = Some(offset);
                    if kind == ElementType::TextContent {
                        self.text_offset_buffer.push(child);
                    } else {
                        self.phon_offset_buffer.push(child);
                    }
                }
                self.node_mut(child).ref_id = attribute(node, "ref").map(str::to_string);
            }
            ElementType::External => self.pending_externals.push(child),
            ElementType::Description | ElementType::Content => {
                self.node_mut(child).value =
                    Some(node.text().unwrap_or_default().trim().to_string());
                return Ok(());
            }
            _ => {}
        }

        let mixed = kind.properties().accepts_kind(ElementType::XmlText);
        for sub in node.children() {
            match sub.node_type() {
                NodeType::Element => self.parse_element(sub, child)?,
                NodeType::Text => {
                    if mixed {
                        if let Some(text) = sub.text() {
                            if !text.trim().is_empty() {
                                self.add_text_value(child, text)?;
                            }
                        }
                    }
                }
                NodeType::Comment => {
                    if kind.properties().accepts_kind(ElementType::XmlComment) {
                        let comment = self.create(
                            ElementType::XmlComment,
                            ElementArgs::new(),
                        )?;
                        self.node_mut(comment).value =
                            sub.text().map(str::to_string);
                        self.append_child(child, comment)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// References carry their target in `id`; that id names another node
    /// and must not enter the index for the reference itself.
    fn parse_wref(&mut self, node: Node<'_, '_>, parent: NodeId, kind: ElementType) -> Result<()> {
        let target = attribute(node, "id").ok_or_else(|| {
            FoliaError::Xml(format!("<{}> without a target id", tag_name(node)))
        })?;
        let wref = self.create(kind, ElementArgs::new())?;
        self.append_child(parent, wref)?;
        let data = self.node_mut(wref);
        data.ref_id = Some(target.to_string());
        data.ref_type = if kind == ElementType::AlignReference {
            attribute(node, "type").map(str::to_string)
        } else {
            attribute(node, "t").map(str::to_string)
        };
        Ok(())
    }
}

/// Slice the verbatim source text of a node (foreign-data passthrough).
fn raw_fragment(node: Node<'_, '_>, xml: &str) -> String {
    xml[node.range()].to_string()
}

fn element_args(node: Node<'_, '_>, kind: ElementType) -> Result<ElementArgs> {
    let mut args = ElementArgs::new();
    args.id = attribute(node, "id").map(str::to_string);
    args.class = attribute(node, "class").map(str::to_string);
    args.set = attribute(node, "set").map(str::to_string);
    args.annotator = attribute(node, "annotator").map(str::to_string);
    args.processor = attribute(node, "processor").map(str::to_string);
    args.datetime = attribute(node, "datetime").map(str::to_string);
    args.n = attribute(node, "n").map(str::to_string);
    args.begintime = attribute(node, "begintime").map(str::to_string);
    args.endtime = attribute(node, "endtime").map(str::to_string);
    args.src = attribute(node, "src").map(str::to_string);
    args.href = attribute(node, "href").map(str::to_string);
    args.speaker = attribute(node, "speaker").map(str::to_string);
    args.annotator_type = attribute(node, "annotatortype").map(AnnotatorType::parse);
    if let Some(c) = attribute(node, "confidence") {
        let c = c
            .parse::<f64>()
            .map_err(|_| FoliaError::Xml(format!("invalid confidence '{c}'")))?;
        args.confidence = Some(c);
    }
    if let Some(s) = attribute(node, "space") {
        args.space = Some(yes_no(s));
    }
    if kind.has_base(ElementGroup::Feature) {
        args.subset = if kind == ElementType::Feature {
            attribute(node, "subset").map(str::to_string)
        } else if kind == ElementType::HeadFeature {
            Some("head".to_string())
        } else {
            Some(kind.xmltag().to_string())
        };
    }
    Ok(args)
}
