//! Heading records and the navigation state derived from them.
//!
//! Entries are rebuilt wholesale on every content load, so nothing here
//! supports incremental patching. The only mutable part of a
//! [`NavigationState`] after construction is the current pointer, and its
//! setter refuses identifiers that do not belong to an entry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Prefix used for the positional identifiers written onto heading nodes.
pub const HEADING_ID_PREFIX: &str = "heading-";

/// Positional identifier for the heading at `index` in document order.
pub fn heading_id(index: usize) -> String {
    format!("{HEADING_ID_PREFIX}{index}")
}

/// Rank of a heading, 1 for `h1` through 6 for `h6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 6;

    /// Deepest heading rank, `h6`.
    pub const DEEPEST: HeadingLevel = HeadingLevel(Self::MAX);

    pub fn new(level: u8) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(DomainError::InvalidLevel { level })
        }
    }

    /// Parse the level out of a tag name such as `h2` or `H4`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let digits = tag.strip_prefix('h').or_else(|| tag.strip_prefix('H'))?;
        digits.parse::<u8>().ok().and_then(|level| Self::new(level).ok())
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn tag(self) -> &'static str {
        match self.0 {
            1 => "h1",
            2 => "h2",
            3 => "h3",
            4 => "h4",
            5 => "h5",
            _ => "h6",
        }
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> Self {
        level.0
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// Non-owning handle to a node living inside a document surface.
///
/// The generation ties the handle to one content load; surfaces refuse to
/// resolve handles minted for content they no longer display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    generation: u64,
    index: usize,
}

impl NodeRef {
    pub fn new(generation: u64, index: usize) -> Self {
        Self { generation, index }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    pub id: String,
    pub text: String,
    pub level: HeadingLevel,
    pub node: NodeRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    entries: Vec<HeadingEntry>,
    current_id: Option<String>,
}

impl NavigationState {
    /// Build a state from entries already in document order. The current
    /// pointer starts out empty.
    pub fn new(entries: Vec<HeadingEntry>) -> Self {
        Self {
            entries,
            current_id: None,
        }
    }

    pub fn entries(&self) -> &[HeadingEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    pub fn entry(&self, id: &str) -> Option<&HeadingEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn last(&self) -> Option<&HeadingEntry> {
        self.entries.last()
    }

    /// Point the current marker at `id`, or clear it with `None`.
    pub fn set_current(&mut self, id: Option<&str>) -> Result<bool, DomainError> {
        let next = match id {
            Some(id) => {
                if self.entry(id).is_none() {
                    return Err(DomainError::unknown_entry(id));
                }
                Some(id.to_string())
            }
            None => None,
        };

        let changed = next != self.current_id;
        self.current_id = next;
        Ok(changed)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.current_id = None;
    }

    pub fn snapshot(&self) -> NavigationSnapshot {
        NavigationSnapshot {
            entries: self
                .entries
                .iter()
                .map(|entry| SnapshotEntry {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    level: entry.level,
                })
                .collect(),
            current_id: self.current_id.clone(),
        }
    }
}

/// Read model handed to display collaborators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    pub entries: Vec<SnapshotEntry>,
    pub current_id: Option<String>,
}

impl NavigationSnapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub text: String,
    pub level: HeadingLevel,
}
