//! Filesystem objects
//!
//! A file is an ENTITY under the `cpl.filesystem` originator, named by its
//! canonical path. Opening by content matches on a `SHA256` property instead.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs::File;
use std::io;
use std::ops::BitOr;
use std::path::Path;
use tracing::debug;

use crate::api::prov_graph::{ProvGraph, ProvObject};
use crate::core::{ObjectType, Outcome, ProvId, Status};
use crate::error::{Error, Result};
use crate::storage::ProvenanceBackend;

pub const FILESYSTEM_ORIGINATOR: &str = "cpl.filesystem";
pub const CONTENT_KEY: &str = "SHA256";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileFlags(u32);

impl FileFlags {
    pub const NONE: FileFlags = FileFlags(0);
    /// Always create a fresh object
    pub const ALWAYS_CREATE: FileFlags = FileFlags(1);
    /// Create when no match exists
    pub const CREATE_IF_MISSING: FileFlags = FileFlags(1 << 1);
    /// Match on content fingerprint rather than path
    pub const OPEN_BY_CONTENT: FileFlags = FileFlags(1 << 2);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: FileFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FileFlags {
    type Output = FileFlags;

    fn bitor(self, rhs: FileFlags) -> FileFlags {
        FileFlags(self.0 | rhs.0)
    }
}

/// Hex SHA-256 of a file's content
pub fn content_fingerprint(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Map `path` to its provenance object according to `flags`
pub fn open_file<B: ProvenanceBackend + ?Sized>(
    graph: &ProvGraph<B>,
    path: &Path,
    flags: FileFlags,
) -> Result<Outcome<ProvObject>> {
    let canonical = path.canonicalize().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(format!("file {}", path.display())),
        _ => Error::Io(e),
    })?;
    let name = canonical.to_string_lossy();
    let by_content = flags.contains(FileFlags::OPEN_BY_CONTENT);
    let fingerprint = if by_content { Some(content_fingerprint(&canonical)?) } else { None };

    let create = |fingerprint: Option<&str>| -> Result<Outcome<ProvObject>> {
        let object = graph.create_object(FILESYSTEM_ORIGINATOR, &name, ObjectType::Entity, None)?;
        if let Some(hex) = fingerprint {
            graph.add_property(object.id(), FILESYSTEM_ORIGINATOR, CONTENT_KEY, hex)?;
        }
        debug!("Created file object {} for {}", object.id(), name);
        Ok(Outcome::new(object, Status::ObjectCreated))
    };

    if flags.contains(FileFlags::ALWAYS_CREATE) {
        return create(fingerprint.as_deref());
    }

    if let Some(hex) = fingerprint.as_deref() {
        let matching: HashSet<ProvId> =
            graph.lookup_by_property(FILESYSTEM_ORIGINATOR, CONTENT_KEY, hex)?.into_iter().collect();
        // all_objects is in creation order, so the last match is the newest
        let newest = graph
            .all_objects(Some(FILESYSTEM_ORIGINATOR))?
            .into_iter()
            .filter(|info| info.object_type == ObjectType::Entity && matching.contains(&info.id))
            .last();
        return match newest {
            Some(info) => Ok(Outcome::new(graph.object(info.id), Status::Ok)),
            None if flags.contains(FileFlags::CREATE_IF_MISSING) => create(Some(hex)),
            None => Err(Error::NotFound(format!("no object with the content of {}", name))),
        };
    }

    if flags.contains(FileFlags::CREATE_IF_MISSING) {
        return graph.lookup_or_create_object(FILESYSTEM_ORIGINATOR, &name, ObjectType::Entity, None);
    }
    graph
        .lookup_object(FILESYSTEM_ORIGINATOR, &name, ObjectType::Entity, None)
        .map(|object| Outcome::new(object, Status::Ok))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fingerprint_of_known_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            content_fingerprint(file.path()).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_flags_combine() {
        let flags = FileFlags::CREATE_IF_MISSING | FileFlags::OPEN_BY_CONTENT;
        assert!(flags.contains(FileFlags::OPEN_BY_CONTENT));
        assert!(!flags.contains(FileFlags::ALWAYS_CREATE));
        assert_eq!(flags.bits(), 6);
    }
}
