//! Core record types decoded from a metadata snapshot.

use std::fmt;

use serde::Serialize;

use crate::constants::ROOT_INODE;

/// Inode identifier as stored in NODE and EDGE records
pub type InodeId = u32;

/// 64-bit chunk identifier
pub type ChunkId = u64;

/// Filesystem object kind, numbered as in the NODE section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum InodeType {
    File = 1,
    Directory = 2,
    Symlink = 3,
    Fifo = 4,
    BlockDev = 5,
    CharDev = 6,
    Socket = 7,
    Trash = 8,
    Sustained = 9,
}

impl InodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(InodeType::File),
            2 => Some(InodeType::Directory),
            3 => Some(InodeType::Symlink),
            4 => Some(InodeType::Fifo),
            5 => Some(InodeType::BlockDev),
            6 => Some(InodeType::CharDev),
            7 => Some(InodeType::Socket),
            8 => Some(InodeType::Trash),
            9 => Some(InodeType::Sustained),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Regular, trash and sustained files carry chunk lists
    pub fn has_chunks(self) -> bool {
        matches!(
            self,
            InodeType::File | InodeType::Trash | InodeType::Sustained
        )
    }

    pub fn is_device(self) -> bool {
        matches!(self, InodeType::BlockDev | InodeType::CharDev)
    }

    /// Name used in search reports; detached files report as plain files
    pub fn report_name(self) -> &'static str {
        match self {
            InodeType::File | InodeType::Trash | InodeType::Sustained => "file",
            InodeType::Directory => "directory",
            InodeType::Symlink => "symlink",
            InodeType::Fifo => "fifo",
            InodeType::BlockDev => "blockdev",
            InodeType::CharDev => "chardev",
            InodeType::Socket => "socket",
        }
    }
}

impl fmt::Display for InodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.report_name())
    }
}

/// One NODE record, normalised across section versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub inode: InodeId,
    pub kind: InodeType,
    pub sclass: u8,
    /// Extended attribute flags (noowner, snapshot, ...)
    pub eattr: u8,
    /// Windows attribute byte; zero before 0x14
    pub winattr: u8,
    pub mode: u16,
    pub uid: u32,
    pub gid: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    /// Trash retention in hours
    pub tretention: u32,
    /// Zero for objects other than files
    pub length: u64,
    pub major: u16,
    pub minor: u16,
    /// Ordered chunk list; empty for objects other than files
    pub chunks: Vec<ChunkId>,
}

impl NodeRecord {
    /// A record with every attribute zeroed
    pub fn new(inode: InodeId, kind: InodeType) -> Self {
        Self {
            inode,
            kind,
            sclass: 0,
            eattr: 0,
            winattr: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            atime: 0,
            mtime: 0,
            ctime: 0,
            tretention: 0,
            length: 0,
            major: 0,
            minor: 0,
            chunks: Vec::new(),
        }
    }
}

/// One EDGE record. Names are raw bytes; MooseFS does not enforce UTF-8.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeRecord {
    pub parent: InodeId,
    pub child: InodeId,
    pub name: Vec<u8>,
}

impl EdgeRecord {
    pub fn new(parent: InodeId, child: InodeId, name: impl Into<Vec<u8>>) -> Self {
        Self {
            parent,
            child,
            name: name.into(),
        }
    }

    /// Edges with parent 0 hold a full literal path of a trash/sustained file
    pub fn is_detached(&self) -> bool {
        self.parent == 0
    }

    pub fn is_from_root(&self) -> bool {
        self.parent == ROOT_INODE
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// One CHNK record; only the archive flag matters for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRecord {
    pub chunk_id: ChunkId,
    pub version: u32,
    pub locked_to: u32,
    pub flags: u8,
}

impl ChunkRecord {
    pub fn is_archived(&self) -> bool {
        self.flags != 0
    }
}

/// Storage class replication factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageClass {
    pub id: u16,
    pub create_copies: u8,
    pub keep_copies: u8,
    pub arch_copies: u8,
    /// Present only in 0x16 sections
    pub name: Option<String>,
}

/// Known section tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Node,
    Edge,
    StorageClass,
    Chunk,
}

impl SectionKind {
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"NODE" => Some(SectionKind::Node),
            b"EDGE" => Some(SectionKind::Edge),
            b"SCLA" | b"LABS" => Some(SectionKind::StorageClass),
            b"CHNK" => Some(SectionKind::Chunk),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            SectionKind::Node => "NODE",
            SectionKind::Edge => "EDGE",
            SectionKind::StorageClass => "SCLA",
            SectionKind::Chunk => "CHNK",
        }
    }
}

/// Location and version of one section body within the snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor {
    pub kind: SectionKind,
    pub version: u8,
    /// File offset of the first body byte
    pub offset: u64,
    pub length: u64,
}

impl SectionDescriptor {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_type_round_trip_and_names() {
        for raw in 1..=9u8 {
            let kind = InodeType::from_u8(raw).expect("known type");
            assert_eq!(kind.as_u8(), raw);
        }
        assert!(InodeType::from_u8(0).is_none());
        assert!(InodeType::from_u8(10).is_none());
        assert_eq!(InodeType::Trash.report_name(), "file");
        assert_eq!(InodeType::Directory.to_string(), "directory");
    }

    #[test]
    fn test_labs_is_alias_for_scla() {
        assert_eq!(SectionKind::from_tag(b"LABS"), Some(SectionKind::StorageClass));
        assert_eq!(SectionKind::from_tag(b"SESS"), None);
    }
}
