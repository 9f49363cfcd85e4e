//! The owning document: node arena, id index, declarations, provenance and
//! the schema-checked tree mutation operations.
//!
//! A `Document` is single-writer: all index, declaration-table and
//! tree-structure mutations assume exclusive access. Read-only queries may
//! run side by side over an unmutated tree.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::element::{is_ncname, CommonAttributes, ElementArgs, NodeData, NodeId};
use crate::error::{FoliaError, Result};
use crate::metadata::{Metadata, Style};
use crate::properties::DEFAULT_IGNORE;
use crate::provenance::{Processor, ProcessorArgs, Provenance};
use crate::types::{AnnotationType, AnnotatorType, ElementGroup, ElementType};
use crate::FOLIA_VERSION;

/// Document-wide validation modes, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct Mode {
    /// Downgrade deferred-pass failures to warnings.
    pub permissive: bool,
    /// Validate text offsets after load.
    pub checktext: bool,
    /// Repair invalid offsets instead of reporting them.
    pub fixtext: bool,
    /// Drop annotator/datetime attributes on serialization.
    pub strip: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            permissive: false,
            checktext: true,
            fixtext: false,
            strip: false,
        }
    }
}

/// Parse/resolution lifecycle of a document.
///
/// Operations that need full resolution (offset validation, span lookups
/// over resolved members) refuse to run before `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Building,
    Resolving,
    Ready,
}

/// Precedence when both a type-wide ("undefined"-set) and a set-specific
/// declaration exist for an annotation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclarationPolicy {
    #[default]
    PreferSetSpecific,
    PreferTypeWide,
}

/// The set label used for type-wide (set-less) declarations.
pub const UNDEFINED_SET: &str = "undefined";

/// One annotation-set declaration with its defaults.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub set: String,
    pub alias: Option<String>,
    pub annotator: Option<String>,
    pub annotator_type: Option<AnnotatorType>,
    pub datetime: Option<String>,
    pub processors: Vec<String>,
}

/// Defaults attached when declaring an annotation set.
#[derive(Debug, Clone, Default)]
pub struct DeclareArgs {
    pub alias: Option<String>,
    pub annotator: Option<String>,
    pub annotator_type: Option<AnnotatorType>,
    pub datetime: Option<String>,
    pub processors: Vec<String>,
}

/// Parameters for a typed selection walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct Select<'a> {
    /// Restrict matches to this annotation set.
    pub set: Option<&'a str>,
    /// Kinds to skip entirely; `None` means the default ignore set
    /// (originals, suggestions, alternatives).
    pub exclude: Option<&'a [ElementType]>,
    pub recurse: bool,
}

impl<'a> Select<'a> {
    #[must_use]
    pub fn recursive() -> Self {
        Self {
            set: None,
            exclude: None,
            recurse: true,
        }
    }

    #[must_use]
    pub fn local() -> Self {
        Self {
            set: None,
            exclude: None,
            recurse: false,
        }
    }

    #[must_use]
    pub fn with_set(mut self, set: &'a str) -> Self {
        self.set = Some(set);
        self
    }

    #[must_use]
    pub fn with_exclude(mut self, exclude: &'a [ElementType]) -> Self {
        self.exclude = Some(exclude);
        self
    }
}

/// An in-memory FoLiA document: the tree root, the id index, the
/// declaration tables and all side-tables.
#[derive(Debug)]
pub struct Document {
    id: String,
    nodes: Vec<NodeData>,
    root: NodeId,
    /// Exclusive id lookup: every non-empty id maps to exactly one live node.
    sindex: HashMap<String, NodeId>,
    /// Insertion-ordered iteration index.
    iindex: Vec<NodeId>,
    declarations: HashMap<AnnotationType, Vec<Declaration>>,
    /// Declaration order, for stable serialization.
    declaration_order: Vec<(AnnotationType, String)>,
    refcounts: HashMap<(AnnotationType, String), usize>,
    pub(crate) provenance: Provenance,
    pub(crate) metadata: Metadata,
    pub(crate) submetadata: HashMap<String, Metadata>,
    pub(crate) styles: Vec<Style>,
    mode: Mode,
    policy: DeclarationPolicy,
    state: DocumentState,
    /// TextContent nodes awaiting deferred offset validation.
    pub(crate) text_offset_buffer: Vec<NodeId>,
    /// PhonContent nodes awaiting deferred offset validation.
    pub(crate) phon_offset_buffer: Vec<NodeId>,
    /// External nodes awaiting cross-document resolution.
    pub(crate) pending_externals: Vec<NodeId>,
    /// Detached nodes whose lifetime is extended to the document's.
    deletion_hold: HashSet<NodeId>,
    /// Per-(scope id, tag) counters backing `generate_id`.
    id_counters: HashMap<(String, &'static str), usize>,
    pub(crate) version_string: String,
    pub(crate) generator: Option<String>,
    next_processor: usize,
}

impl Document {
    /// Create an empty document with the given id.
    pub fn new(id: &str) -> Result<Self> {
        Self::with_mode(id, Mode::default())
    }

    /// Create an empty document with explicit validation modes.
    pub fn with_mode(id: &str, mode: Mode) -> Result<Self> {
        if !is_ncname(id) {
            return Err(FoliaError::Args(format!("invalid document id: '{id}'")));
        }
        let mut attrs = CommonAttributes::default();
        attrs.id = Some(id.to_string());
        let root_data = NodeData::new(ElementType::Root, attrs);
        let root = NodeId(0);
        let mut doc = Self {
            id: id.to_string(),
            nodes: vec![root_data],
            root,
            sindex: HashMap::new(),
            iindex: vec![root],
            declarations: HashMap::new(),
            declaration_order: Vec::new(),
            refcounts: HashMap::new(),
            provenance: Provenance::default(),
            metadata: Metadata::default(),
            submetadata: HashMap::new(),
            styles: Vec::new(),
            mode,
            policy: DeclarationPolicy::default(),
            state: DocumentState::Ready,
            text_offset_buffer: Vec::new(),
            phon_offset_buffer: Vec::new(),
            pending_externals: Vec::new(),
            deletion_hold: HashSet::new(),
            id_counters: HashMap::new(),
            version_string: FOLIA_VERSION.to_string(),
            generator: None,
            next_processor: 0,
        };
        doc.sindex.insert(id.to_string(), root);
        Ok(doc)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: DocumentState) {
        self.state = state;
    }

    #[must_use]
    pub fn declaration_policy(&self) -> DeclarationPolicy {
        self.policy
    }

    pub fn set_declaration_policy(&mut self, policy: DeclarationPolicy) {
        self.policy = policy;
    }

    /// The format version this document declares.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version_string
    }

    /// Number of live nodes (document order index length).
    #[must_use]
    pub fn len(&self) -> usize {
        self.iindex.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iindex.len() <= 1
    }

    /// Live nodes in insertion order.
    #[must_use]
    pub(crate) fn order(&self) -> &[NodeId] {
        &self.iindex
    }

    // ------------------------------------------------------------------
    // arena access

    /// Borrow a node's data.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> ElementType {
        self.node(id).kind
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Walk ancestors from the parent upward.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// Nearest ancestor of the given kind.
    #[must_use]
    pub fn ancestor_of_kind(&self, id: NodeId, kind: ElementType) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.kind(*a).is_subclass(kind))
    }

    // ------------------------------------------------------------------
    // id index

    /// Exclusive id lookup; signals a key error on a miss.
    pub fn index(&self, id: &str) -> Result<NodeId> {
        self.sindex
            .get(id)
            .copied()
            .ok_or_else(|| FoliaError::Key(format!("no such id: {id}")))
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<NodeId> {
        self.sindex.get(id).copied()
    }

    fn add_to_index(&mut self, id: &str, node: NodeId) -> Result<()> {
        if !is_ncname(id) {
            return Err(FoliaError::Args(format!("invalid id: '{id}'")));
        }
        if self.sindex.contains_key(id) {
            return Err(FoliaError::DuplicateId(id.to_string()));
        }
        self.sindex.insert(id.to_string(), node);
        Ok(())
    }

    fn remove_from_index(&mut self, id: &str) {
        self.sindex.remove(id);
    }

    /// Generate a fresh id scoped under the nearest id-carrying,
    /// id-generating ancestor (the scope node itself included).
    pub fn generate_id(&mut self, scope: NodeId, kind: ElementType) -> String {
        let base = std::iter::once(scope)
            .chain(self.ancestors(scope))
            .find_map(|n| {
                let data = self.node(n);
                if data.kind.generates_ids() {
                    data.attrs.id.clone()
                } else {
                    None
                }
            })
            .unwrap_or_else(|| self.id.clone());
        let tag = kind.xmltag();
        loop {
            let counter = self.id_counters.entry((base.clone(), tag)).or_insert(0);
            *counter += 1;
            let candidate = format!("{base}.{tag}.{counter}");
            if !self.sindex.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    // ------------------------------------------------------------------
    // element construction & tree mutation

    /// Build an unattached element. The node is indexed (if it has an id)
    /// but carries no parent until appended.
    pub fn create(&mut self, kind: ElementType, args: ElementArgs) -> Result<NodeId> {
        if args.generate_id {
            return Err(FoliaError::Args(
                "generate_id requires a parent scope; use append_element".to_string(),
            ));
        }
        let text = args.text.clone();
        let subset = args.subset.clone();
        let mut attrs = args.into_attributes(kind)?;
        self.resolve_set(kind, &mut attrs)?;
        let id = attrs.id.clone();
        if let Some(id) = &id {
            // checked before any state is touched
            if self.sindex.contains_key(id.as_str()) {
                return Err(FoliaError::DuplicateId(id.clone()));
            }
        }
        let node = self.push_node({
            let mut data = NodeData::new(kind, attrs);
            data.subset = subset;
            data
        });
        if let Some(id) = &id {
            self.add_to_index(id, node)?;
        }
        self.bump_refcount(node, 1);
        if let Some(text) = text {
            self.attach_text(node, &text, "current")?;
        }
        Ok(node)
    }

    fn push_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(data);
        self.iindex.push(id);
        id
    }

    /// Resolve the effective annotation set for a classed element and check
    /// it against the declaration table.
    fn resolve_set(&self, kind: ElementType, attrs: &mut CommonAttributes) -> Result<()> {
        let Some(at) = kind.properties().annotation_type else {
            return Ok(());
        };
        if attrs.class.is_none() && attrs.set.is_none() {
            return Ok(());
        }
        match &attrs.set {
            Some(set) => {
                let set = self.unalias(at, set).unwrap_or(set.as_str()).to_string();
                if !self.is_declared(at, Some(&set)) {
                    if self.mode.permissive {
                        warn!(set, %at, "annotation set used without declaration");
                    } else {
                        return Err(FoliaError::Value(format!(
                            "set '{set}' is not declared for {}",
                            at.label()
                        )));
                    }
                }
                attrs.set = Some(set);
            }
            None => {
                // adopt the sole declared set, if any
                if let Ok(set) = self.default_set(at) {
                    attrs.set = Some(set.to_string());
                }
            }
        }
        Ok(())
    }

    fn bump_refcount(&mut self, node: NodeId, delta: isize) {
        let data = self.node(node);
        let Some(at) = data.kind.properties().annotation_type else {
            return;
        };
        if data.attrs.class.is_none() {
            return;
        }
        let set = data
            .attrs
            .set
            .clone()
            .unwrap_or_else(|| UNDEFINED_SET.to_string());
        let entry = self.refcounts.entry((at, set)).or_insert(0);
        if delta > 0 {
            *entry += delta as usize;
        } else {
            *entry = entry.saturating_sub(delta.unsigned_abs());
        }
    }

    /// Create and append a child element in one step.
    ///
    /// Schema checks run before anything is built, so a rejection leaves
    /// both the tree and the index unchanged.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        kind: ElementType,
        mut args: ElementArgs,
    ) -> Result<NodeId> {
        self.check_acceptable(parent, kind)?;
        // occurrence limits count against the set the element will adopt
        let effective_set = match (&args.set, kind.properties().annotation_type) {
            (Some(set), _) => Some(set.clone()),
            (None, Some(at)) => self.default_set(at).ok().map(str::to_string),
            _ => None,
        };
        self.check_occurrences(
            parent,
            kind,
            effective_set.as_deref(),
            args.class.as_deref(),
            None,
        )?;
        if args.generate_id {
            args.generate_id = false;
            if args.id.is_none() {
                args.id = Some(self.generate_id(parent, kind));
            }
        }
        let child = self.create(kind, args)?;
        self.link(parent, child, None);
        Ok(child)
    }

    /// Append a pre-built (unattached) element.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_child(parent, None, child)
    }

    /// Insert a pre-built element at a position in the parent's child list.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        position: Option<usize>,
        child: NodeId,
    ) -> Result<()> {
        let data = self.node(child);
        if let Some(existing) = data.parent {
            return Err(FoliaError::Value(format!(
                "<{}> already has a parent (<{}>)",
                data.kind.xmltag(),
                self.kind(existing).xmltag()
            )));
        }
        let kind = data.kind;
        let set = data.attrs.set.clone();
        let class = data.attrs.class.clone();
        self.check_acceptable(parent, kind)?;
        self.check_occurrences(parent, kind, set.as_deref(), class.as_deref(), None)?;
        self.link(parent, child, position);
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, position: Option<usize>) {
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).detached = false;
        self.deletion_hold.remove(&child);
        match position {
            Some(pos) => self.node_mut(parent).children.insert(pos, child),
            None => self.node_mut(parent).children.push(child),
        }
    }

    fn check_acceptable(&self, parent: NodeId, kind: ElementType) -> Result<()> {
        let parent_kind = self.kind(parent);
        if !parent_kind.properties().accepts_kind(kind) {
            return Err(FoliaError::Value(format!(
                "<{}> is not accepted inside <{}>",
                kind.xmltag(),
                parent_kind.xmltag()
            )));
        }
        // a correction carries a replacement or an unchanged reading, never both
        if parent_kind == ElementType::Correction
            && matches!(kind, ElementType::New | ElementType::Current)
        {
            let other = if kind == ElementType::New {
                ElementType::Current
            } else {
                ElementType::New
            };
            if self.children(parent).iter().any(|c| self.kind(*c) == other) {
                return Err(FoliaError::DuplicateAnnotation(format!(
                    "<{}> excludes <{}> in a correction",
                    kind.xmltag(),
                    other.xmltag()
                )));
            }
        }
        Ok(())
    }

    /// Occurrence-limit check; `ignore` excludes one existing child from the
    /// counts (used by replace).
    fn check_occurrences(
        &self,
        parent: NodeId,
        kind: ElementType,
        set: Option<&str>,
        class: Option<&str>,
        ignore: Option<NodeId>,
    ) -> Result<()> {
        let props = kind.properties();
        let siblings: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| Some(*c) != ignore && self.kind(*c) == kind)
            .collect();
        if props.occurrences > 0 && siblings.len() >= props.occurrences {
            return Err(FoliaError::DuplicateAnnotation(format!(
                "<{}> occurs at most {} time(s) in <{}>",
                kind.xmltag(),
                props.occurrences,
                self.kind(parent).xmltag()
            )));
        }
        if props.occurrences_per_set > 0 {
            // content kinds key on class, annotations on set
            let content = matches!(kind, ElementType::TextContent | ElementType::PhonContent);
            let wanted = if content {
                class.unwrap_or("current").to_string()
            } else {
                set.unwrap_or(UNDEFINED_SET).to_string()
            };
            let same = siblings
                .iter()
                .filter(|c| {
                    let a = &self.node(**c).attrs;
                    let existing = if content {
                        a.class.as_deref().unwrap_or("current")
                    } else {
                        a.set.as_deref().unwrap_or(UNDEFINED_SET)
                    };
                    existing == wanted
                })
                .count();
            if same >= props.occurrences_per_set {
                return Err(FoliaError::DuplicateAnnotation(format!(
                    "<{}> for '{wanted}' already present in <{}>",
                    kind.xmltag(),
                    self.kind(parent).xmltag()
                )));
            }
        }
        Ok(())
    }

    /// Unlink a child. With `keep_for_deletion` the node (and its subtree)
    /// stays alive, detached, until the document is dropped.
    pub fn remove_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        keep_for_deletion: bool,
    ) -> Result<()> {
        let pos = self
            .children(parent)
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| FoliaError::Value("node is not a child of this parent".to_string()))?;
        self.node_mut(parent).children.remove(pos);
        self.node_mut(child).parent = None;
        self.node_mut(child).detached = true;
        self.unindex_subtree(child);
        if keep_for_deletion {
            self.deletion_hold.insert(child);
        }
        Ok(())
    }

    fn unindex_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        let mut dropped = HashSet::new();
        while let Some(n) = stack.pop() {
            dropped.insert(n);
            self.bump_refcount(n, -1);
            if let Some(id) = self.node(n).attrs.id.clone() {
                self.remove_from_index(&id);
            }
            stack.extend(self.children(n).iter().copied());
        }
        self.iindex.retain(|n| !dropped.contains(n));
    }

    /// Re-index a subtree that is being re-linked into the tree (used when
    /// corrections move existing nodes under a role child).
    pub(crate) fn reindex_subtree(&mut self, node: NodeId) -> Result<()> {
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            self.bump_refcount(n, 1);
            if let Some(id) = self.node(n).attrs.id.clone() {
                if self.get_by_id(&id) != Some(n) {
                    self.add_to_index(&id, n)?;
                }
            }
            self.iindex.push(n);
            stack.extend(self.children(n).iter().copied());
        }
        Ok(())
    }

    /// Swap `old` for `new_child`, preserving position. The old node is
    /// held for deletion.
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, new_child: NodeId) -> Result<()> {
        let pos = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .ok_or_else(|| FoliaError::Value("node is not a child of this parent".to_string()))?;
        let data = self.node(new_child);
        if data.parent.is_some() {
            return Err(FoliaError::Value("replacement already has a parent".to_string()));
        }
        let kind = data.kind;
        let set = data.attrs.set.clone();
        let class = data.attrs.class.clone();
        self.check_acceptable(parent, kind)?;
        self.check_occurrences(parent, kind, set.as_deref(), class.as_deref(), Some(old))?;
        self.remove_child(parent, old, true)?;
        self.link(parent, new_child, Some(pos));
        Ok(())
    }

    /// Existing children a candidate could legally replace: same kind, same
    /// set (or text class). Used to merge rather than duplicate annotations.
    #[must_use]
    pub fn find_replacables(&self, parent: NodeId, candidate: NodeId) -> Vec<NodeId> {
        let cand = self.node(candidate);
        let content = matches!(
            cand.kind,
            ElementType::TextContent | ElementType::PhonContent
        );
        self.children(parent)
            .iter()
            .copied()
            .filter(|c| {
                let data = self.node(*c);
                if data.kind != cand.kind {
                    return false;
                }
                if content {
                    data.attrs.class.as_deref().unwrap_or("current")
                        == cand.attrs.class.as_deref().unwrap_or("current")
                } else {
                    data.attrs.set == cand.attrs.set
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // selection

    /// Typed tree walk under `node` collecting elements of `kind`.
    #[must_use]
    pub fn select(&self, node: NodeId, kind: ElementType, params: Select<'_>) -> Vec<NodeId> {
        self.select_where(node, params, &|k| k.is_subclass(kind))
    }

    /// Tree walk collecting all members of a capability group.
    #[must_use]
    pub fn select_group(
        &self,
        node: NodeId,
        group: ElementGroup,
        params: Select<'_>,
    ) -> Vec<NodeId> {
        self.select_where(node, params, &|k| k.has_base(group))
    }

    fn select_where(
        &self,
        node: NodeId,
        params: Select<'_>,
        matches: &dyn Fn(ElementType) -> bool,
    ) -> Vec<NodeId> {
        let exclude = params.exclude.unwrap_or(DEFAULT_IGNORE);
        let mut out = Vec::new();
        self.select_into(node, params.set, exclude, params.recurse, matches, &mut out);
        out
    }

    fn select_into(
        &self,
        node: NodeId,
        set: Option<&str>,
        exclude: &[ElementType],
        recurse: bool,
        matches: &dyn Fn(ElementType) -> bool,
        out: &mut Vec<NodeId>,
    ) {
        for child in self.children(node) {
            let data = self.node(*child);
            if exclude.contains(&data.kind) {
                continue;
            }
            if matches(data.kind) {
                let set_ok = match set {
                    None => true,
                    Some(s) => data.attrs.set.as_deref() == Some(s),
                };
                if set_ok {
                    out.push(*child);
                }
            }
            if recurse {
                self.select_into(*child, set, exclude, recurse, matches, out);
            }
        }
    }

    /// All words in document order.
    #[must_use]
    pub fn words(&self) -> Vec<NodeId> {
        self.select(self.root, ElementType::Word, Select::recursive())
    }

    /// All sentences in document order.
    #[must_use]
    pub fn sentences(&self) -> Vec<NodeId> {
        self.select(self.root, ElementType::Sentence, Select::recursive())
    }

    /// All paragraphs in document order.
    #[must_use]
    pub fn paragraphs(&self) -> Vec<NodeId> {
        self.select(self.root, ElementType::Paragraph, Select::recursive())
    }

    /// The i'th word (0-based); signals a key error when out of range.
    pub fn word(&self, i: usize) -> Result<NodeId> {
        self.words()
            .get(i)
            .copied()
            .ok_or_else(|| FoliaError::Key(format!("no word at index {i}")))
    }

    /// The i'th word counted from the end.
    pub fn rword(&self, i: usize) -> Result<NodeId> {
        let words = self.words();
        words
            .len()
            .checked_sub(i + 1)
            .and_then(|idx| words.get(idx).copied())
            .ok_or_else(|| FoliaError::Key(format!("no word at reverse index {i}")))
    }

    /// The word immediately preceding `word` in document order.
    #[must_use]
    pub fn previous_word(&self, word: NodeId) -> Option<NodeId> {
        let words = self.words();
        let pos = words.iter().position(|w| *w == word)?;
        pos.checked_sub(1).map(|i| words[i])
    }

    /// The word immediately following `word` in document order.
    #[must_use]
    pub fn next_word(&self, word: NodeId) -> Option<NodeId> {
        let words = self.words();
        let pos = words.iter().position(|w| *w == word)?;
        words.get(pos + 1).copied()
    }

    /// Up to `size` words preceding `word`, in document order.
    #[must_use]
    pub fn left_context(&self, word: NodeId, size: usize) -> Vec<NodeId> {
        let words = self.words();
        match words.iter().position(|w| *w == word) {
            Some(pos) => words[pos.saturating_sub(size)..pos].to_vec(),
            None => Vec::new(),
        }
    }

    /// Up to `size` words following `word`, in document order.
    #[must_use]
    pub fn right_context(&self, word: NodeId, size: usize) -> Vec<NodeId> {
        let words = self.words();
        match words.iter().position(|w| *w == word) {
            Some(pos) => words.iter().skip(pos + 1).take(size).copied().collect(),
            None => Vec::new(),
        }
    }

    /// The word with up to `size` neighbours on each side.
    #[must_use]
    pub fn context(&self, word: NodeId, size: usize) -> Vec<NodeId> {
        let words = self.words();
        match words.iter().position(|w| *w == word) {
            Some(pos) => {
                let start = pos.saturating_sub(size);
                let end = (pos + size + 1).min(words.len());
                words[start..end].to_vec()
            }
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // features and alternatives

    /// Subset a feature element contributes under, explicit or implied by
    /// its tag.
    fn feature_subset(&self, node: NodeId) -> Option<&str> {
        let data = self.node(node);
        if !data.kind.has_base(ElementGroup::Feature) {
            return None;
        }
        if data.subset.is_some() {
            return data.subset.as_deref();
        }
        match data.kind {
            ElementType::Feature => None,
            ElementType::HeadFeature => Some("head"),
            k => Some(k.xmltag()),
        }
    }

    /// Classes of all direct features of `node` in the given subset.
    #[must_use]
    pub fn feats(&self, node: NodeId, subset: &str) -> Vec<&str> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| self.feature_subset(*c) == Some(subset))
            .filter_map(|c| self.node(c).attrs.class.as_deref())
            .collect()
    }

    /// Class of the first feature of `node` in the given subset.
    pub fn feat(&self, node: NodeId, subset: &str) -> Result<&str> {
        self.feats(node, subset).into_iter().next().ok_or_else(|| {
            FoliaError::NoSuchAnnotation(format!(
                "no feature with subset '{subset}' on <{}>",
                self.kind(node).xmltag()
            ))
        })
    }

    /// Alternative readings attached directly to `node`.
    #[must_use]
    pub fn alternatives(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .filter(|c| {
                matches!(
                    self.kind(*c),
                    ElementType::Alternative | ElementType::AlternativeLayers
                )
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // top-level structure conveniences

    /// Add a top-level text container.
    pub fn add_text(&mut self, args: ElementArgs) -> Result<NodeId> {
        let root = self.root;
        self.append_element(root, ElementType::Text, args)
    }

    /// Add a top-level speech container.
    pub fn add_speech(&mut self, args: ElementArgs) -> Result<NodeId> {
        let root = self.root;
        self.append_element(root, ElementType::Speech, args)
    }

    /// Add a sentence under a structural parent.
    pub fn add_sentence(&mut self, parent: NodeId, mut args: ElementArgs) -> Result<NodeId> {
        if args.id.is_none() {
            args.generate_id = true;
        }
        self.append_element(parent, ElementType::Sentence, args)
    }

    /// Add a word under a structural parent.
    pub fn add_word(&mut self, parent: NodeId, mut args: ElementArgs) -> Result<NodeId> {
        if args.id.is_none() {
            args.generate_id = true;
        }
        self.append_element(parent, ElementType::Word, args)
    }

    /// Attach raw character data (an XmlText node) under `parent`.
    pub fn add_text_value(&mut self, parent: NodeId, value: &str) -> Result<NodeId> {
        self.check_acceptable(parent, ElementType::XmlText)?;
        let node = self.push_node(NodeData::new(
            ElementType::XmlText,
            CommonAttributes::default(),
        ));
        self.node_mut(node).value = Some(value.to_string());
        self.link(parent, node, None);
        Ok(node)
    }

    /// Attach a TextContent child of the given class holding `text`.
    pub fn attach_text(&mut self, node: NodeId, text: &str, class: &str) -> Result<NodeId> {
        let mut args = ElementArgs::new();
        if class != "current" {
            args.class = Some(class.to_string());
        }
        let tc = self.append_element(node, ElementType::TextContent, args)?;
        self.add_text_value(tc, text)?;
        Ok(tc)
    }

    /// Set or replace the text content of a class on `node`.
    pub fn set_text(&mut self, node: NodeId, text: &str, class: &str) -> Result<NodeId> {
        if let Ok(old) = self.text_content(node, class) {
            self.remove_child(node, old, false)?;
        }
        self.attach_text(node, text, class)
    }

    // ------------------------------------------------------------------
    // declarations

    /// Register an annotation type/set with optional defaults.
    pub fn declare(&mut self, at: AnnotationType, set: &str, args: DeclareArgs) -> Result<()> {
        if let Some(alias) = &args.alias {
            for decl in self.declarations.values().flatten() {
                if decl.alias.as_deref() == Some(alias) && decl.set != set {
                    return Err(FoliaError::Value(format!(
                        "alias '{alias}' already bound to set '{}'",
                        decl.set
                    )));
                }
            }
        }
        let decls = self.declarations.entry(at).or_default();
        if let Some(existing) = decls.iter_mut().find(|d| d.set == set) {
            // re-declaration refreshes defaults; alias conflicts are errors
            if let (Some(old), Some(new)) = (&existing.alias, &args.alias) {
                if old != new {
                    return Err(FoliaError::Value(format!(
                        "set '{set}' already has alias '{old}'"
                    )));
                }
            }
            if args.alias.is_some() {
                existing.alias = args.alias;
            }
            if args.annotator.is_some() {
                existing.annotator = args.annotator;
            }
            if args.annotator_type.is_some() {
                existing.annotator_type = args.annotator_type;
            }
            if args.datetime.is_some() {
                existing.datetime = args.datetime;
            }
            for p in args.processors {
                if !existing.processors.contains(&p) {
                    existing.processors.push(p);
                }
            }
            return Ok(());
        }
        decls.push(Declaration {
            set: set.to_string(),
            alias: args.alias,
            annotator: args.annotator,
            annotator_type: args.annotator_type,
            datetime: args.datetime,
            processors: args.processors,
        });
        self.declaration_order.push((at, set.to_string()));
        self.refcounts.entry((at, set.to_string())).or_insert(0);
        debug!(%at, set, "declared annotation set");
        Ok(())
    }

    /// Remove a declaration. Refuses while annotations still reference it.
    pub fn undeclare(&mut self, at: AnnotationType, set: &str) -> Result<()> {
        let in_use = self
            .refcounts
            .get(&(at, set.to_string()))
            .copied()
            .unwrap_or(0);
        if in_use > 0 {
            return Err(FoliaError::Value(format!(
                "cannot undeclare {} set '{set}': {in_use} annotation(s) still reference it",
                at.label()
            )));
        }
        let Some(decls) = self.declarations.get_mut(&at) else {
            return Err(FoliaError::Key(format!("no declaration for {}", at.label())));
        };
        let before = decls.len();
        decls.retain(|d| d.set != set);
        if decls.len() == before {
            return Err(FoliaError::Key(format!(
                "set '{set}' is not declared for {}",
                at.label()
            )));
        }
        self.declaration_order
            .retain(|(t, s)| !(*t == at && s == set));
        self.refcounts.remove(&(at, set.to_string()));
        Ok(())
    }

    /// Whether the type (and set, when given) is declared.
    #[must_use]
    pub fn is_declared(&self, at: AnnotationType, set: Option<&str>) -> bool {
        match self.declarations.get(&at) {
            None => false,
            Some(decls) => match set {
                None => !decls.is_empty(),
                Some(s) => {
                    let s = self.unalias(at, s).unwrap_or(s);
                    decls.iter().any(|d| d.set == s)
                }
            },
        }
    }

    /// Declaration check against the full default tuple.
    #[must_use]
    pub fn is_declared_with(
        &self,
        at: AnnotationType,
        set: &str,
        annotator: Option<&str>,
        annotator_type: Option<AnnotatorType>,
        datetime: Option<&str>,
    ) -> bool {
        let set = self.unalias(at, set).unwrap_or(set);
        self.declarations
            .get(&at)
            .map(|decls| {
                decls.iter().any(|d| {
                    d.set == set
                        && d.annotator.as_deref() == annotator
                        && d.annotator_type == annotator_type
                        && d.datetime.as_deref() == datetime
                })
            })
            .unwrap_or(false)
    }

    fn declarations_for(&self, at: AnnotationType) -> &[Declaration] {
        self.declarations.get(&at).map_or(&[], Vec::as_slice)
    }

    /// The single declared set for a type; `NoDefault` when zero or many.
    pub fn default_set(&self, at: AnnotationType) -> Result<&str> {
        let decls = self.declarations_for(at);
        match decls.len() {
            1 => Ok(&decls[0].set),
            0 => Err(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no set declared".to_string()),
            }),
            n => Err(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some(format!("{n} sets declared")),
            }),
        }
    }

    /// The declaration providing defaults for (type, set), honoring the
    /// configured precedence policy when no set is given.
    fn default_declaration(&self, at: AnnotationType, set: Option<&str>) -> Result<&Declaration> {
        let decls = self.declarations_for(at);
        if let Some(set) = set {
            let set = self.unalias(at, set).unwrap_or(set);
            return decls.iter().find(|d| d.set == set).ok_or_else(|| {
                FoliaError::NoDefault {
                    annotation_type: at,
                    detail: Some(format!("set '{set}' is not declared")),
                }
            });
        }
        match decls.len() {
            0 => Err(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no set declared".to_string()),
            }),
            1 => Ok(&decls[0]),
            _ => {
                let type_wide = decls.iter().find(|d| d.set == UNDEFINED_SET);
                let named: Vec<&Declaration> =
                    decls.iter().filter(|d| d.set != UNDEFINED_SET).collect();
                match (self.policy, type_wide, named.as_slice()) {
                    (DeclarationPolicy::PreferTypeWide, Some(d), _) => Ok(d),
                    (DeclarationPolicy::PreferSetSpecific, _, [single]) => Ok(single),
                    (DeclarationPolicy::PreferSetSpecific, Some(d), []) => Ok(d),
                    _ => Err(FoliaError::NoDefault {
                        annotation_type: at,
                        detail: Some("ambiguous declarations".to_string()),
                    }),
                }
            }
        }
    }

    /// Default annotator for (type, set).
    pub fn default_annotator(&self, at: AnnotationType, set: Option<&str>) -> Result<&str> {
        self.default_declaration(at, set)?
            .annotator
            .as_deref()
            .ok_or(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no default annotator".to_string()),
            })
    }

    /// Default annotator type for (type, set).
    pub fn default_annotator_type(
        &self,
        at: AnnotationType,
        set: Option<&str>,
    ) -> Result<AnnotatorType> {
        self.default_declaration(at, set)?
            .annotator_type
            .ok_or(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no default annotator type".to_string()),
            })
    }

    /// Default datetime for (type, set).
    pub fn default_datetime(&self, at: AnnotationType, set: Option<&str>) -> Result<&str> {
        self.default_declaration(at, set)?
            .datetime
            .as_deref()
            .ok_or(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no default datetime".to_string()),
            })
    }

    /// Default processor for (type, set); requires exactly one.
    pub fn default_processor(&self, at: AnnotationType, set: Option<&str>) -> Result<&Processor> {
        let decl = self.default_declaration(at, set)?;
        match decl.processors.as_slice() {
            [single] => self.provenance.index(single),
            [] => Err(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("no processor attached".to_string()),
            }),
            _ => Err(FoliaError::NoDefault {
                annotation_type: at,
                detail: Some("multiple processors attached".to_string()),
            }),
        }
    }

    /// All annotator names declared for (type, set).
    #[must_use]
    pub fn annotators(&self, at: AnnotationType, set: Option<&str>) -> Vec<&str> {
        self.declarations_for(at)
            .iter()
            .filter(|d| set.is_none_or(|s| d.set == s))
            .filter_map(|d| d.annotator.as_deref())
            .collect()
    }

    /// All processors attached to declarations for (type, set).
    #[must_use]
    pub fn processors_for(&self, at: AnnotationType, set: Option<&str>) -> Vec<&Processor> {
        self.declarations_for(at)
            .iter()
            .filter(|d| set.is_none_or(|s| d.set == s))
            .flat_map(|d| d.processors.iter())
            .filter_map(|pid| self.provenance.get(pid))
            .collect()
    }

    /// Canonical set name for an alias.
    #[must_use]
    pub fn unalias<'a>(&'a self, at: AnnotationType, alias: &str) -> Option<&'a str> {
        self.declarations_for(at)
            .iter()
            .find(|d| d.alias.as_deref() == Some(alias))
            .map(|d| d.set.as_str())
    }

    /// Alias for a canonical set name.
    #[must_use]
    pub fn alias<'a>(&'a self, at: AnnotationType, set: &str) -> Option<&'a str> {
        self.declarations_for(at)
            .iter()
            .find(|d| d.set == set)
            .and_then(|d| d.alias.as_deref())
    }

    pub fn incr_ref(&mut self, at: AnnotationType, set: &str) {
        *self.refcounts.entry((at, set.to_string())).or_insert(0) += 1;
    }

    pub fn decr_ref(&mut self, at: AnnotationType, set: &str) {
        if let Some(c) = self.refcounts.get_mut(&(at, set.to_string())) {
            *c = c.saturating_sub(1);
        }
    }

    /// Declarations no live annotation references.
    #[must_use]
    pub fn unused_declarations(&self) -> Vec<(AnnotationType, &str)> {
        self.declaration_order
            .iter()
            .filter(|(at, set)| {
                self.refcounts
                    .get(&(*at, set.clone()))
                    .copied()
                    .unwrap_or(0)
                    == 0
            })
            .map(|(at, set)| (*at, set.as_str()))
            .collect()
    }

    /// Declarations in declaration order, for serialization.
    #[must_use]
    pub fn declaration_list(&self) -> Vec<(AnnotationType, &Declaration)> {
        self.declaration_order
            .iter()
            .filter_map(|(at, set)| {
                self.declarations_for(*at)
                    .iter()
                    .find(|d| &d.set == set)
                    .map(|d| (*at, d))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // provenance & metadata

    /// Register a processor, optionally nested under an existing one.
    pub fn add_processor(
        &mut self,
        args: ProcessorArgs,
        parent: Option<&str>,
    ) -> Result<String> {
        self.next_processor += 1;
        let fallback = format!("{}.processor.{}", self.id, self.next_processor);
        let processor = Processor::from_args(args, fallback);
        if processor.name.is_empty() {
            return Err(FoliaError::Args("processor requires a name".to_string()));
        }
        if self.provenance.get(&processor.id).is_some() {
            return Err(FoliaError::DuplicateId(processor.id));
        }
        let id = processor.id.clone();
        match parent {
            None => self.provenance.processors.push(processor),
            Some(pid) => {
                let Some(p) = self.provenance.get_mut(pid) else {
                    return Err(FoliaError::Key(format!("no such processor: {pid}")));
                };
                p.processors.push(processor);
            }
        }
        Ok(id)
    }

    #[must_use]
    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    #[must_use]
    pub fn metadata_type(&self) -> &str {
        &self.metadata.metadata_type
    }

    pub fn set_metadata(&mut self, key: &str, value: &str) {
        self.metadata.set(key, value);
    }

    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key)
    }

    #[must_use]
    pub fn submetadata(&self, id: &str) -> Option<&Metadata> {
        self.submetadata.get(id)
    }

    pub fn add_style(&mut self, styletype: &str, href: &str) {
        self.styles.push(Style {
            styletype: styletype.to_string(),
            href: href.to_string(),
        });
    }

    /// Replace the href of an existing style association.
    pub fn replace_style(&mut self, styletype: &str, href: &str) -> Result<()> {
        match self.styles.iter_mut().find(|s| s.styletype == styletype) {
            Some(s) => {
                s.href = href.to_string();
                Ok(())
            }
            None => Err(FoliaError::Key(format!("no style of type '{styletype}'"))),
        }
    }

    #[must_use]
    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    // ------------------------------------------------------------------
    // versioning

    /// Accept, or reject, a document-declared format version.
    ///
    /// Older or equal versions load normally; a newer major/minor than the
    /// library implements is rejected (warned about in permissive mode).
    pub(crate) fn check_version(&mut self, declared: &str) -> Result<()> {
        let (maj, min, _) = parse_version(declared)?;
        let (own_maj, own_min, _) = parse_version(FOLIA_VERSION)?;
        if (maj, min) > (own_maj, own_min) {
            if self.mode.permissive {
                warn!(declared, supported = FOLIA_VERSION, "document version is newer than library");
            } else {
                return Err(FoliaError::Version {
                    found: declared.to_string(),
                    supported: FOLIA_VERSION.to_string(),
                });
            }
        }
        self.version_string = declared.to_string();
        Ok(())
    }
}

/// Split a `major.minor.patch` version string.
pub(crate) fn parse_version(s: &str) -> Result<(u32, u32, u32)> {
    let mut parts = s.split('.');
    let mut next = |name: &str| -> Result<u32> {
        parts
            .next()
            .unwrap_or("0")
            .chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse::<u32>()
            .map_err(|_| FoliaError::Args(format!("invalid version component '{name}' in '{s}'")))
    };
    Ok((next("major")?, next("minor")?, next("patch")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc() -> Document {
        Document::new("example").expect("valid id")
    }

    #[test]
    fn test_new_document_indexes_own_id() {
        let d = doc();
        assert_eq!(d.index("example").ok(), Some(d.root()));
        assert!(d.index("nope").is_err());
        assert!(Document::new("not a name").is_err());
    }

    #[test]
    fn test_duplicate_id_rejected_tree_unchanged() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("add text");
        let s = d
            .add_sentence(text, ElementArgs::new().with_id("example.s.1"))
            .expect("add sentence");
        let before = d.children(s).len();
        let err = d.add_word(s, ElementArgs::new().with_id("example.s.1"));
        assert!(matches!(err, Err(FoliaError::DuplicateId(_))));
        assert_eq!(d.children(s).len(), before);
    }

    #[test]
    fn test_illegal_child_rejected() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("add text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        // paragraphs do not nest inside sentences
        let err = d.append_element(s, ElementType::Paragraph, ElementArgs::new());
        assert!(err.is_err());
        assert_eq!(d.children(s).len(), 0);
    }

    #[test]
    fn test_generate_id() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("add text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        assert_eq!(
            d.node(s).attrs.id.as_deref(),
            Some("example.text.1.s.1")
        );
        let w = d.add_word(s, ElementArgs::new()).expect("word");
        assert_eq!(
            d.node(w).attrs.id.as_deref(),
            Some("example.text.1.s.1.w.1")
        );
    }

    #[test]
    fn test_remove_unindexes_subtree() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("add text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d
            .add_word(s, ElementArgs::new().with_text("hallo"))
            .expect("word");
        let wid = d.node(w).attrs.id.clone().expect("word id");
        d.remove_child(s, w, false).expect("remove");
        assert!(d.index(&wid).is_err());
        assert!(d.node(w).detached);
    }

    #[test]
    fn test_declare_and_default_set() {
        let mut d = doc();
        assert!(matches!(
            d.default_set(AnnotationType::Token),
            Err(FoliaError::NoDefault { .. })
        ));
        d.declare(AnnotationType::Token, "adhocset", DeclareArgs::default())
            .expect("declare");
        assert_eq!(d.default_set(AnnotationType::Token).ok(), Some("adhocset"));
        d.declare(AnnotationType::Token, "otherset", DeclareArgs::default())
            .expect("declare");
        assert!(d.default_set(AnnotationType::Token).is_err());
        assert!(d.is_declared(AnnotationType::Token, Some("adhocset")));
        assert!(!d.is_declared(AnnotationType::Pos, None));
    }

    #[test]
    fn test_default_annotator() {
        let mut d = doc();
        d.declare(
            AnnotationType::Token,
            "adhocset",
            DeclareArgs {
                annotator: Some("proycon".to_string()),
                ..Default::default()
            },
        )
        .expect("declare");
        assert_eq!(
            d.default_annotator(AnnotationType::Token, None).ok(),
            Some("proycon")
        );
        assert_eq!(
            d.default_annotator(AnnotationType::Token, Some("adhocset")).ok(),
            Some("proycon")
        );
        assert!(d
            .default_annotator(AnnotationType::Token, Some("missing"))
            .is_err());
    }

    #[test]
    fn test_declaration_policy_precedence() {
        let mut d = doc();
        d.declare(
            AnnotationType::Pos,
            UNDEFINED_SET,
            DeclareArgs {
                annotator: Some("global".to_string()),
                ..Default::default()
            },
        )
        .expect("declare");
        d.declare(
            AnnotationType::Pos,
            "cgn",
            DeclareArgs {
                annotator: Some("frog".to_string()),
                ..Default::default()
            },
        )
        .expect("declare");

        // default: the single named set wins
        assert_eq!(d.default_annotator(AnnotationType::Pos, None).ok(), Some("frog"));

        d.set_declaration_policy(DeclarationPolicy::PreferTypeWide);
        assert_eq!(
            d.default_annotator(AnnotationType::Pos, None).ok(),
            Some("global")
        );

        // two named sets: ambiguous under set-specific policy
        d.set_declaration_policy(DeclarationPolicy::PreferSetSpecific);
        d.declare(AnnotationType::Pos, "alpino", DeclareArgs::default())
            .expect("declare");
        assert!(d.default_annotator(AnnotationType::Pos, None).is_err());
    }

    #[test]
    fn test_undeclare_refused_while_in_use() {
        let mut d = doc();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
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
        assert!(d.undeclare(AnnotationType::Pos, "cgn").is_err());
        assert!(d.unused_declarations().is_empty());
    }

    #[test]
    fn test_unused_declarations() {
        let mut d = doc();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        assert_eq!(d.unused_declarations(), vec![(AnnotationType::Pos, "cgn")]);
    }

    #[test]
    fn test_alias_resolution() {
        let mut d = doc();
        d.declare(
            AnnotationType::Pos,
            "http://example.org/sets/cgn",
            DeclareArgs {
                alias: Some("cgn".to_string()),
                ..Default::default()
            },
        )
        .expect("declare");
        assert_eq!(
            d.unalias(AnnotationType::Pos, "cgn"),
            Some("http://example.org/sets/cgn")
        );
        assert_eq!(
            d.alias(AnnotationType::Pos, "http://example.org/sets/cgn"),
            Some("cgn")
        );
        assert!(d.is_declared(AnnotationType::Pos, Some("cgn")));
        // conflicting alias for another set
        let err = d.declare(
            AnnotationType::Pos,
            "other",
            DeclareArgs {
                alias: Some("cgn".to_string()),
                ..Default::default()
            },
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_undeclared_set_rejected() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("boot")).expect("word");
        let err = d.append_element(
            w,
            ElementType::PosAnnotation,
            ElementArgs::new().with_class("N").with_set("cgn"),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_occurrence_limit_text_content() {
        let mut d = doc();
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("boot")).expect("word");
        // second current-class text content is a duplicate annotation
        let err = d.attach_text(w, "schip", "current");
        assert!(matches!(err, Err(FoliaError::DuplicateAnnotation(_))));
        // a different class is fine
        assert!(d.attach_text(w, "boot", "original").is_ok());
    }

    #[test]
    fn test_replace_and_find_replacables() {
        let mut d = doc();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        let text = d
            .add_text(ElementArgs::new().with_id("example.text.1"))
            .expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("boot")).expect("word");
        let pos = d
            .append_element(
                w,
                ElementType::PosAnnotation,
                ElementArgs::new().with_class("N").with_set("cgn"),
            )
            .expect("pos");
        let replacement = d
            .create(
                ElementType::PosAnnotation,
                ElementArgs::new().with_class("V").with_set("cgn"),
            )
            .expect("create");
        assert_eq!(d.find_replacables(w, replacement), vec![pos]);
        d.replace_child(w, pos, replacement).expect("replace");
        let selected = d.select(w, ElementType::PosAnnotation, Select::recursive());
        assert_eq!(selected, vec![replacement]);
        assert_eq!(d.node(selected[0]).attrs.class.as_deref(), Some("V"));
    }

    #[test]
    fn test_version_gate() {
        let mut d = doc();
        assert!(d.check_version("1.4.0").is_ok());
        assert!(d.check_version(FOLIA_VERSION).is_ok());
        assert!(matches!(
            d.check_version("99.0.0"),
            Err(FoliaError::Version { .. })
        ));
    }

    #[test]
    fn test_processor_registration() {
        let mut d = doc();
        let pid = d
            .add_processor(
                ProcessorArgs {
                    name: "frog".to_string(),
                    ..Default::default()
                },
                None,
            )
            .expect("processor");
        let sub = d
            .add_processor(
                ProcessorArgs {
                    name: "frog-pos".to_string(),
                    ..Default::default()
                },
                Some(&pid),
            )
            .expect("sub-processor");
        assert!(d.provenance().get(&sub).is_some());
        assert!(d
            .add_processor(
                ProcessorArgs {
                    name: "dup".to_string(),
                    id: Some(pid.clone()),
                    ..Default::default()
                },
                None
            )
            .is_err());
    }

    #[test]
    fn test_word_navigation_and_context() {
        let mut d = doc();
        let text = d.add_text(ElementArgs::new().with_id("example.text.1")).expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        for token in ["a", "b", "c", "d"] {
            d.add_word(s, ElementArgs::new().with_text(token)).expect("word");
        }
        let words = d.words();
        assert_eq!(d.previous_word(words[0]), None);
        assert_eq!(d.previous_word(words[2]), Some(words[1]));
        assert_eq!(d.next_word(words[2]), Some(words[3]));
        assert_eq!(d.next_word(words[3]), None);
        assert_eq!(d.left_context(words[2], 5), vec![words[0], words[1]]);
        assert_eq!(d.right_context(words[2], 1), vec![words[3]]);
        assert_eq!(d.context(words[1], 1), vec![words[0], words[1], words[2]]);
    }

    #[test]
    fn test_feature_lookup() {
        let mut d = doc();
        d.declare(AnnotationType::Pos, "cgn", DeclareArgs::default())
            .expect("declare");
        let text = d.add_text(ElementArgs::new().with_id("example.text.1")).expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        let w = d.add_word(s, ElementArgs::new().with_text("boot")).expect("word");
        let pos = d
            .append_element(
                w,
                ElementType::PosAnnotation,
                ElementArgs::new().with_class("N").with_set("cgn"),
            )
            .expect("pos");
        let mut feat_args = ElementArgs::new().with_class("singular");
        feat_args.subset = Some("number".to_string());
        d.append_element(pos, ElementType::Feature, feat_args)
            .expect("feature");
        d.append_element(
            pos,
            ElementType::HeadFeature,
            ElementArgs::new().with_class("noun"),
        )
        .expect("head feature");
        assert_eq!(d.feat(pos, "number").ok(), Some("singular"));
        assert_eq!(d.feat(pos, "head").ok(), Some("noun"));
        assert_eq!(d.feats(pos, "gender"), Vec::<&str>::new());
        assert!(matches!(
            d.feat(pos, "gender"),
            Err(FoliaError::NoSuchAnnotation(_))
        ));
    }

    #[test]
    fn test_set_text_replaces_layer() {
        let mut d = doc();
        let text = d.add_text(ElementArgs::new().with_id("example.text.1")).expect("text");
        let s = d.add_sentence(text, ElementArgs::new()).expect("sentence");
        d.set_text(s, "eerste", "current").expect("set");
        assert_eq!(d.str(s).ok().as_deref(), Some("eerste"));
        d.set_text(s, "tweede", "current").expect("replace");
        assert_eq!(d.str(s).ok().as_deref(), Some("tweede"));
    }
}
