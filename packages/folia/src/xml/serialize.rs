//! XML serialization via quick-xml.
//!
//! Output order is deterministic: stylesheets, metadata (annotations in
//! declaration order, provenance, native fields, foreign passthrough,
//! submetadata), then the body in document order.

use std::io::Write as _;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::document::{Declaration, Document, UNDEFINED_SET};
use crate::element::NodeId;
use crate::error::{FoliaError, Result};
use crate::metadata::Metadata;
use crate::provenance::Processor;
use crate::types::{AnnotationType, ElementType};
use crate::{FOLIA_VERSION, NSFOLIA, NSXLINK};

/// Options for one serialization call.
#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Drop annotator and datetime attributes from every element.
    pub strip: bool,
    /// Omit declarations no annotation references.
    pub prune_declarations: bool,
}

type XmlWriter = Writer<Vec<u8>>;

fn io_err(e: impl std::fmt::Display) -> FoliaError {
    FoliaError::Xml(format!("serialization failed: {e}"))
}

impl Document {
    /// Serialize the whole document to XML text.
    pub fn to_xml(&self, options: &SerializeOptions) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(io_err)?;
        for style in self.styles() {
            // processing instructions go out as raw text ahead of the root
            let pi = format!(
                "\n<?xml-stylesheet type=\"{}\" href=\"{}\"?>",
                style.styletype, style.href
            );
            writer
                .get_mut()
                .write_all(pi.as_bytes())
                .map_err(FoliaError::Io)?;
        }

        let mut root = BytesStart::new("FoLiA");
        root.push_attribute(("xmlns", NSFOLIA));
        root.push_attribute(("xmlns:xlink", NSXLINK));
        root.push_attribute(("xml:id", self.id()));
        let generator = self
            .generator
            .clone()
            .unwrap_or_else(|| format!("folia-rs-v{}", env!("CARGO_PKG_VERSION")));
        root.push_attribute(("generator", generator.as_str()));
        root.push_attribute(("version", self.version()));
        writer.write_event(Event::Start(root)).map_err(io_err)?;

        self.write_metadata(&mut writer, options)?;
        for child in self.children(self.root()) {
            self.write_element(&mut writer, *child, options)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("FoLiA")))
            .map_err(io_err)?;
        let bytes = writer.into_inner();
        String::from_utf8(bytes)
            .map_err(|e| FoliaError::Xml(format!("serialized document is not UTF-8: {e}")))
    }

    /// Serialize to a file.
    pub fn save(&self, path: impl AsRef<Path>, options: &SerializeOptions) -> Result<()> {
        let xml = self.to_xml(options)?;
        std::fs::write(path, xml)?;
        Ok(())
    }

    fn write_metadata(&self, writer: &mut XmlWriter, options: &SerializeOptions) -> Result<()> {
        let mut meta = BytesStart::new("metadata");
        if self.metadata.metadata_type != "native" {
            meta.push_attribute(("type", self.metadata.metadata_type.as_str()));
        }
        if let Some(src) = &self.metadata.src {
            meta.push_attribute(("src", src.as_str()));
        }
        writer.write_event(Event::Start(meta)).map_err(io_err)?;

        let declarations: Vec<(AnnotationType, &Declaration)> = self
            .declaration_list()
            .into_iter()
            .filter(|(at, decl)| {
                !options.prune_declarations
                    || !self
                        .unused_declarations()
                        .contains(&(*at, decl.set.as_str()))
            })
            .collect();
        writer
            .write_event(Event::Start(BytesStart::new("annotations")))
            .map_err(io_err)?;
        for (at, decl) in declarations {
            let label = at.label();
            let mut el = BytesStart::new(label.as_str());
            if decl.set != UNDEFINED_SET {
                el.push_attribute(("set", decl.set.as_str()));
            }
            if let Some(alias) = &decl.alias {
                el.push_attribute(("alias", alias.as_str()));
            }
            if !options.strip {
                if let Some(annotator) = &decl.annotator {
                    el.push_attribute(("annotator", annotator.as_str()));
                }
                if let Some(at) = decl.annotator_type {
                    el.push_attribute(("annotatortype", at.as_str()));
                }
                if let Some(dt) = &decl.datetime {
                    el.push_attribute(("datetime", dt.as_str()));
                }
            }
            if decl.processors.is_empty() {
                writer.write_event(Event::Empty(el)).map_err(io_err)?;
            } else {
                writer.write_event(Event::Start(el)).map_err(io_err)?;
                for pid in &decl.processors {
                    let mut a = BytesStart::new("annotator");
                    a.push_attribute(("processor", pid.as_str()));
                    writer.write_event(Event::Empty(a)).map_err(io_err)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(label.as_str())))
                    .map_err(io_err)?;
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new("annotations")))
            .map_err(io_err)?;

        if !self.provenance().is_empty() {
            writer
                .write_event(Event::Start(BytesStart::new("provenance")))
                .map_err(io_err)?;
            for p in &self.provenance().processors {
                write_processor(writer, p)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("provenance")))
                .map_err(io_err)?;
        }

        write_meta_fields(writer, &self.metadata)?;
        for (id, sub) in &self.submetadata {
            let mut el = BytesStart::new("submetadata");
            el.push_attribute(("xml:id", id.as_str()));
            if sub.metadata_type != "native" {
                el.push_attribute(("type", sub.metadata_type.as_str()));
            }
            writer.write_event(Event::Start(el)).map_err(io_err)?;
            write_meta_fields(writer, sub)?;
            writer
                .write_event(Event::End(BytesEnd::new("submetadata")))
                .map_err(io_err)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("metadata")))
            .map_err(io_err)?;
        Ok(())
    }

    fn write_element(
        &self,
        writer: &mut XmlWriter,
        node: NodeId,
        options: &SerializeOptions,
    ) -> Result<()> {
        let data = self.node(node);
        match data.kind {
            ElementType::XmlText => {
                let text = data.value.clone().unwrap_or_default();
                return writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(io_err);
            }
            ElementType::XmlComment => {
                let text = data.value.clone().unwrap_or_default();
                return writer
                    .write_event(Event::Comment(BytesText::new(&text)))
                    .map_err(io_err);
            }
            _ => {}
        }
        let tag = data.kind.xmltag();
        let mut el = BytesStart::new(tag);
        self.push_attributes(&mut el, node, options);

        let has_children = !data.children.is_empty();
        let has_value = data.value.is_some();
        if !has_children && !has_value {
            return writer.write_event(Event::Empty(el)).map_err(io_err);
        }
        writer.write_event(Event::Start(el)).map_err(io_err)?;
        if let Some(value) = &data.value {
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(io_err)?;
        }
        for child in &data.children {
            self.write_element(writer, *child, options)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(io_err)
    }

    fn push_attributes(&self, el: &mut BytesStart<'_>, node: NodeId, options: &SerializeOptions) {
        let data = self.node(node);
        match data.kind {
            ElementType::WordReference => {
                if let Some(rid) = &data.ref_id {
                    el.push_attribute(("id", rid.as_str()));
                }
                if let Some(t) = &data.ref_type {
                    el.push_attribute(("t", t.as_str()));
                }
                return;
            }
            ElementType::AlignReference => {
                if let Some(rid) = &data.ref_id {
                    el.push_attribute(("id", rid.as_str()));
                }
                if let Some(t) = &data.ref_type {
                    el.push_attribute(("type", t.as_str()));
                }
                return;
            }
            _ => {}
        }
        let attrs = &data.attrs;
        if let Some(id) = &attrs.id {
            el.push_attribute(("xml:id", id.as_str()));
        }
        if let Some(class) = &attrs.class {
            el.push_attribute(("class", class.as_str()));
        }
        if let Some(set) = &attrs.set {
            // the sole declared set for the type is implicit
            let implicit = data
                .kind
                .properties()
                .annotation_type
                .and_then(|at| self.default_set(at).ok())
                .is_some_and(|default| default == set);
            if !implicit {
                el.push_attribute(("set", set.as_str()));
            }
        }
        if let Some(subset) = &data.subset {
            if data.kind == ElementType::Feature {
                el.push_attribute(("subset", subset.as_str()));
            }
        }
        if !options.strip {
            if let Some(annotator) = &attrs.annotator {
                el.push_attribute(("annotator", annotator.as_str()));
            }
            if let Some(at) = attrs.annotator_type {
                el.push_attribute(("annotatortype", at.as_str()));
            }
            if let Some(dt) = &attrs.datetime {
                el.push_attribute(("datetime", dt.as_str()));
            }
        }
        if let Some(processor) = &attrs.processor {
            el.push_attribute(("processor", processor.as_str()));
        }
        if let Some(confidence) = attrs.confidence {
            el.push_attribute(("confidence", format_float(confidence).as_str()));
        }
        if let Some(n) = &attrs.n {
            el.push_attribute(("n", n.as_str()));
        }
        if let Some(bt) = &attrs.begintime {
            el.push_attribute(("begintime", bt.as_str()));
        }
        if let Some(et) = &attrs.endtime {
            el.push_attribute(("endtime", et.as_str()));
        }
        if let Some(src) = &attrs.src {
            el.push_attribute(("src", src.as_str()));
        }
        if let Some(href) = &attrs.href {
            el.push_attribute(("xlink:href", href.as_str()));
            el.push_attribute(("xlink:type", "simple"));
        }
        if let Some(speaker) = &attrs.speaker {
            el.push_attribute(("speaker", speaker.as_str()));
        }
        if !attrs.space {
            el.push_attribute(("space", "no"));
        }
        if let Some(offset) = data.offset {
            el.push_attribute(("offset", offset.to_string().as_str()));
        }
        if matches!(
            data.kind,
            ElementType::TextContent | ElementType::PhonContent
        ) {
            if let Some(rid) = &data.ref_id {
                el.push_attribute(("ref", rid.as_str()));
            }
        }
    }
}

fn write_meta_fields(writer: &mut XmlWriter, metadata: &Metadata) -> Result<()> {
    for (key, value) in &metadata.fields {
        let mut el = BytesStart::new("meta");
        el.push_attribute(("id", key.as_str()));
        writer.write_event(Event::Start(el)).map_err(io_err)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(io_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("meta")))
            .map_err(io_err)?;
    }
    for fragment in &metadata.foreign {
        // stored verbatim at parse time, emitted back untouched
        writer
            .write_event(Event::Text(BytesText::from_escaped(fragment.as_str())))
            .map_err(io_err)?;
    }
    Ok(())
}

fn write_processor(writer: &mut XmlWriter, p: &Processor) -> Result<()> {
    let mut el = BytesStart::new("processor");
    el.push_attribute(("xml:id", p.id.as_str()));
    el.push_attribute(("name", p.name.as_str()));
    el.push_attribute(("type", p.processor_type.as_str()));
    for (key, value) in [
        ("version", &p.version),
        ("document_version", &p.document_version),
        ("folia_version", &p.folia_version),
        ("command", &p.command),
        ("host", &p.host),
        ("user", &p.user),
        ("begindatetime", &p.begindatetime),
        ("enddatetime", &p.enddatetime),
        ("resourcelink", &p.resourcelink),
    ] {
        if let Some(v) = value {
            el.push_attribute((key, v.as_str()));
        }
    }
    if p.metadata.is_empty() && p.processors.is_empty() {
        return writer.write_event(Event::Empty(el)).map_err(io_err);
    }
    writer.write_event(Event::Start(el)).map_err(io_err)?;
    for (key, value) in &p.metadata {
        let mut m = BytesStart::new("meta");
        m.push_attribute(("id", key.as_str()));
        writer.write_event(Event::Start(m)).map_err(io_err)?;
        writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(io_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("meta")))
            .map_err(io_err)?;
    }
    for sub in &p.processors {
        write_processor(writer, sub)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("processor")))
        .map_err(io_err)
}

/// Trim trailing zeros so confidence 1.0 prints as "1".
fn format_float(f: f64) -> String {
    let s = format!("{f}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DeclareArgs, Mode};
    use crate::element::ElementArgs;
    use pretty_assertions::assert_eq;

    fn sample() -> Document {
        let mut d = Document::new("example").expect("doc");
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        d.set_metadata("language", "nld");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("boot")).expect("word");
        d.append_element(
            w,
            ElementType::PosAnnotation,
            ElementArgs::new().with_class("N").with_set("cgn"),
        )
        .expect("pos");
        d
    }

    #[test]
    fn test_serialized_shape() {
        let d = sample();
        let xml = d.to_xml(&SerializeOptions::default()).expect("serialize");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("xmlns=\"http://ilk.uvt.nl/folia\""));
        assert!(xml.contains("<pos-annotation set=\"cgn\"/>"));
        assert!(xml.contains("<meta id=\"language\">nld</meta>"));
        assert!(xml.contains("<t>boot</t>"));
        // the sole declared pos set is implicit on the element
        assert!(xml.contains("<pos class=\"N\"/>"));
    }

    #[test]
    fn test_round_trip_preserves_text_and_ids() {
        let d = sample();
        let xml = d.to_xml(&SerializeOptions::default()).expect("serialize");
        let loaded = Document::from_xml(&xml, Mode::default()).expect("reload");
        assert_eq!(loaded.id(), "example");
        assert_eq!(loaded.words().len(), 1);
        let w = loaded.words()[0];
        assert_eq!(loaded.str(w).ok().as_deref(), Some("boot"));
        assert!(loaded.index("example.text.1.s.1.w.1").is_ok());
        assert!(loaded.is_declared(AnnotationType::Pos, Some("cgn")));
    }

    #[test]
    fn test_strip_mode_drops_annotator() {
        let mut d = sample();
        let w = d.words()[0];
        let lemma = d
            .create(
                ElementType::LemmaAnnotation,
                ElementArgs::new()
                    .with_class("boot")
                    .with_set("lemmas")
                    .with_annotator("frog"),
            );
        // lemma set not declared; declare then attach
        assert!(lemma.is_err());
        d.declare(AnnotationType::Lemma, "lemmas", DeclareArgs::default())
            .expect("declare");
        d.append_element(
            w,
            ElementType::LemmaAnnotation,
            ElementArgs::new()
                .with_class("boot")
                .with_set("lemmas")
                .with_annotator("frog"),
        )
        .expect("lemma");
        let stripped = d
            .to_xml(&SerializeOptions {
                strip: true,
                ..Default::default()
            })
            .expect("serialize");
        assert!(!stripped.contains("annotator=\"frog\""));
        let full = d.to_xml(&SerializeOptions::default()).expect("serialize");
        assert!(full.contains("annotator=\"frog\""));
    }

    #[test]
    fn test_prune_unused_declarations() {
        let mut d = sample();
        d.declare(AnnotationType::Lemma, "lemmas", DeclareArgs::default())
            .expect("declare");
        let pruned = d
            .to_xml(&SerializeOptions {
                prune_declarations: true,
                ..Default::default()
            })
            .expect("serialize");
        assert!(!pruned.contains("lemma-annotation"));
        assert!(pruned.contains("pos-annotation"));
    }

    #[test]
    fn test_space_attribute_round_trip() {
        let mut d = Document::new("x").expect("doc");
        let text = d.add_text(ElementArgs::new().with_id("x.t")).expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("s");
        d.add_word(s, ElementArgs::new().with_text("einde").with_space(false))
            .expect("w");
        let xml = d.to_xml(&SerializeOptions::default()).expect("serialize");
        assert!(xml.contains("space=\"no\""));
        let loaded = Document::from_xml(&xml, Mode::default()).expect("reload");
        let w = loaded.words()[0];
        assert!(!loaded.node(w).attrs.space);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(1.0), "1");
        assert_eq!(format_float(0.5), "0.5");
        assert_eq!(format_float(0.125), "0.125");
    }
}
