//! Depth-first construction of a parcel from the filesystem.
//!
//! Headers live in an arena (`Vec<ObjectHeader>`) and refer to their
//! ancestors by index. The chain of ancestor indices is passed down by value,
//! so a child can update every ancestor's sizes without holding references
//! into the arena.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parcel_crypto::CanonicalHasher;
use parcel_types::{ContentHash, Object, ObjectHeader, Parcel};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{BuildError, BuildResult};

/// Accumulates headers and objects in pre-order.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    headers: Vec<ObjectHeader>,
    objects: Vec<Object>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of headers emitted so far.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Add one top-level input. It gets no parent.
    pub fn add_path(&mut self, path: &Path) -> BuildResult<()> {
        self.visit(path, Vec::new())
    }

    pub fn finish(self) -> Parcel {
        Parcel {
            object_headers: self.headers,
            objects: self.objects,
        }
    }

    fn visit(&mut self, path: &Path, ancestors: Vec<usize>) -> BuildResult<()> {
        let metadata = fs::metadata(path).map_err(|e| unreadable(path, e))?;
        if metadata.is_file() {
            self.add_file(path, &ancestors)
        } else if metadata.is_dir() {
            self.add_directory(path, ancestors)
        } else {
            Err(unreadable(
                path,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "not a regular file or directory",
                ),
            ))
        }
    }

    fn add_file(&mut self, path: &Path, ancestors: &[usize]) -> BuildResult<()> {
        let data = fs::read(path).map_err(|e| unreadable(path, e))?;
        let object = Object::new(data);
        let size = object.length;
        let object_hash = CanonicalHasher::object_hash(&object)?;

        let header = ObjectHeader::file(display_name(path), object_hash, size);
        let header_hash = CanonicalHasher::header_hash(&header)?;
        debug!(path = %path.display(), size, hash = %header_hash.short_hex(), "added file");

        self.objects.push(object);
        self.headers.push(header);
        self.link(header_hash, size, ancestors);
        Ok(())
    }

    fn add_directory(&mut self, path: &Path, ancestors: Vec<usize>) -> BuildResult<()> {
        let index = self.headers.len();
        self.headers.push(ObjectHeader::directory(display_name(path)));

        let children: Vec<PathBuf> = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| {
                entry
                    .map(|e| e.into_path())
                    .map_err(|e| unreadable(path, io::Error::from(e)))
            })
            .collect::<BuildResult<_>>()?;

        let mut chain = ancestors.clone();
        chain.push(index);
        for child in &children {
            self.visit(child, chain.clone())?;
        }

        let hash = CanonicalHasher::header_hash(&self.headers[index])?;
        debug!(path = %path.display(), children = children.len(), hash = %hash.short_hex(), "added directory");
        self.link(hash, 0, &ancestors);
        Ok(())
    }

    /// Register a finished child with its parent and propagate its size.
    fn link(&mut self, child: ContentHash, size: u64, ancestors: &[usize]) {
        let Some(&parent) = ancestors.last() else {
            return;
        };
        let parent = &mut self.headers[parent];
        parent.external_references.push(child);
        parent.external_references_size += 1;
        parent.recursive_size_first_level += size;

        if size == 0 {
            return;
        }
        for &ancestor in ancestors {
            self.headers[ancestor].recursive_size_total += size;
        }
    }
}

/// Build a parcel from one or more input paths.
///
/// Only a single input yields a well-formed tree. Further inputs are appended
/// as unlinked trees after the first.
pub fn build_parcel<P: AsRef<Path>>(paths: &[P]) -> BuildResult<Parcel> {
    if paths.is_empty() {
        return Err(BuildError::EmptyInput);
    }
    if paths.len() > 1 {
        warn!(
            inputs = paths.len(),
            "multiple inputs produce unlinked trees; only the first is the root"
        );
    }

    let mut builder = TreeBuilder::new();
    for path in paths {
        builder.add_path(path.as_ref())?;
    }
    Ok(builder.finish())
}

/// Split a comma-separated path list, dropping empty segments.
pub fn parse_path_list(list: &str) -> Vec<PathBuf> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            fs::canonicalize(path)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

fn unreadable(path: &Path, source: io::Error) -> BuildError {
    BuildError::PathUnreadable {
        path: path.to_path_buf(),
        source,
    }
}
