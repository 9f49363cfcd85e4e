//! Provenance: the tree of annotation-producing agents.

use std::collections::BTreeMap;

use crate::error::{FoliaError, Result};
use crate::types::AnnotatorType;

/// One annotation-producing agent, possibly with nested sub-processors.
#[derive(Debug, Clone)]
pub struct Processor {
    pub id: String,
    pub name: String,
    pub processor_type: AnnotatorType,
    pub version: Option<String>,
    pub document_version: Option<String>,
    pub folia_version: Option<String>,
    pub command: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub begindatetime: Option<String>,
    pub enddatetime: Option<String>,
    pub resourcelink: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub processors: Vec<Processor>,
}

/// Construction arguments for [`Processor`].
#[derive(Debug, Clone, Default)]
pub struct ProcessorArgs {
    pub id: Option<String>,
    pub name: String,
    pub processor_type: Option<AnnotatorType>,
    pub version: Option<String>,
    pub command: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub begindatetime: Option<String>,
    pub enddatetime: Option<String>,
    pub resourcelink: Option<String>,
    /// Fill host, user and begindatetime from the running system.
    pub system_defaults: bool,
}

impl Processor {
    pub(crate) fn from_args(args: ProcessorArgs, fallback_id: String) -> Self {
        let mut p = Processor {
            id: args.id.unwrap_or(fallback_id),
            name: args.name,
            processor_type: args.processor_type.unwrap_or(AnnotatorType::Auto),
            version: args.version,
            document_version: None,
            folia_version: None,
            command: args.command,
            host: args.host,
            user: args.user,
            begindatetime: args.begindatetime,
            enddatetime: args.enddatetime,
            resourcelink: args.resourcelink,
            metadata: BTreeMap::new(),
            processors: Vec::new(),
        };
        if args.system_defaults {
            if p.host.is_none() {
                p.host = std::env::var("HOSTNAME").ok();
            }
            if p.user.is_none() {
                p.user = std::env::var("USER").ok();
            }
            if p.begindatetime.is_none() {
                p.begindatetime =
                    Some(chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string());
            }
        }
        p
    }

    /// Recursive lookup by processor id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Processor> {
        if self.id == id {
            return Some(self);
        }
        self.processors.iter().find_map(|p| p.get(id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Processor> {
        if self.id == id {
            return Some(self);
        }
        self.processors.iter_mut().find_map(|p| p.get_mut(id))
    }

    fn count(&self) -> usize {
        1 + self.processors.iter().map(Processor::count).sum::<usize>()
    }
}

/// The document-level provenance tree.
#[derive(Debug, Clone, Default)]
pub struct Provenance {
    pub processors: Vec<Processor>,
}

impl Provenance {
    /// Recursive lookup by processor id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Processor> {
        self.processors.iter().find_map(|p| p.get(id))
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Processor> {
        self.processors.iter_mut().find_map(|p| p.get_mut(id))
    }

    /// Lookup that signals a key error on a miss.
    pub fn index(&self, id: &str) -> Result<&Processor> {
        self.get(id)
            .ok_or_else(|| FoliaError::Key(format!("no such processor: {id}")))
    }

    /// Total number of processors, nested ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.processors.iter().map(Processor::count).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}
