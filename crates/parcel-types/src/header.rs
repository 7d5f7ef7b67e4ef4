use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::{optional_hash, ContentHash};

/// Meta key carrying the node kind (`file` or `directory`).
pub const META_TYPE: &str = "type";
/// Meta key carrying the display name.
pub const META_NAME: &str = "name";

/// One key/value tag as it appears on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: String,
    pub value: String,
}

impl MetaEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Whether a header describes a file or a directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    File,
    Directory,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Self::File),
            "directory" => Some(Self::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of a header's meta tags.
///
/// Only `type` and `name` carry meaning. Any other tags are kept verbatim in
/// `extra` so that decoding and re-encoding a header reproduces its hash. The
/// wire list is always written as `type`, `name`, then the extras in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<MetaEntry>", into = "Vec<MetaEntry>")]
pub struct HeaderMeta {
    pub kind: NodeKind,
    pub name: String,
    pub extra: Vec<MetaEntry>,
}

impl HeaderMeta {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            extra: Vec::new(),
        }
    }
}

impl TryFrom<Vec<MetaEntry>> for HeaderMeta {
    type Error = TypeError;

    fn try_from(entries: Vec<MetaEntry>) -> Result<Self, Self::Error> {
        let mut kind = None;
        let mut name = None;
        let mut extra = Vec::new();

        for entry in entries {
            match entry.key.as_str() {
                META_TYPE if kind.is_none() => {
                    kind = Some(NodeKind::parse(&entry.value).ok_or_else(|| {
                        TypeError::InvalidMeta(format!("unknown type {:?}", entry.value))
                    })?);
                }
                META_NAME if name.is_none() => name = Some(entry.value),
                _ => extra.push(entry),
            }
        }

        Ok(Self {
            kind: kind.ok_or_else(|| TypeError::InvalidMeta("missing type".into()))?,
            name: name.ok_or_else(|| TypeError::InvalidMeta("missing name".into()))?,
            extra,
        })
    }
}

impl From<HeaderMeta> for Vec<MetaEntry> {
    fn from(meta: HeaderMeta) -> Self {
        let mut entries = Vec::with_capacity(2 + meta.extra.len());
        entries.push(MetaEntry::new(META_TYPE, meta.kind.as_str()));
        entries.push(MetaEntry::new(META_NAME, meta.name));
        entries.extend(meta.extra);
        entries
    }
}

/// Metadata node of the content-addressed tree.
///
/// A file header points at its object by hash. A directory header lists its
/// children's header hashes in `external_references`. Because a directory is
/// hashed only after all its children are final, every reference is a hash of
/// content and the headers form a Merkle tree.
///
/// Field order is part of the canonical encoding. Do not reorder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectHeader {
    #[serde(with = "optional_hash")]
    pub object_hash: Option<ContentHash>,
    pub object_size: u64,
    pub external_references: Vec<ContentHash>,
    pub external_references_size: u64,
    pub recursive_size_first_level: u64,
    pub recursive_size_total: u64,
    pub meta: HeaderMeta,
}

impl ObjectHeader {
    /// Header for a file whose object has the given hash and size.
    pub fn file(name: impl Into<String>, object_hash: ContentHash, object_size: u64) -> Self {
        Self {
            object_hash: Some(object_hash),
            object_size,
            external_references: Vec::new(),
            external_references_size: 0,
            recursive_size_first_level: 0,
            recursive_size_total: 0,
            meta: HeaderMeta::new(NodeKind::File, name),
        }
    }

    /// Empty directory header; children are linked in later.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            object_hash: None,
            object_size: 0,
            external_references: Vec::new(),
            external_references_size: 0,
            recursive_size_first_level: 0,
            recursive_size_total: 0,
            meta: HeaderMeta::new(NodeKind::Directory, name),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.meta.kind
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn is_directory(&self) -> bool {
        self.meta.kind == NodeKind::Directory
    }
}
