//! Synthetic snapshot writer used by tests and benchmarks.
//!
//! [`SnapshotBuilder`] keeps NODE, EDGE, CHNK and SCLA records in memory and
//! serialises them in the on-disk layout the reader expects. Records are
//! emitted in insertion order, so a tree built top-down has every
//! directory edge before the edges of its descendants.

use std::fs;
use std::path::Path;

use rand::Rng;

use crate::constants::geometry::CHUNK_SIZE;
use crate::constants::{EOF_MARKER, ROOT_INODE, SIGNATURE_PREFIX, version};
use crate::errors::MetaResult;
use crate::snapshot::class_header_size;
use crate::types::{
    ChunkId, ChunkRecord, EdgeRecord, InodeId, InodeType, NodeRecord, SectionKind, StorageClass,
};

const SYMLINK_TARGET: &[u8] = b"../target";

/// Encodes one NODE record, type byte included.
pub fn encode_node(record: &NodeRecord, section_version: u8) -> Vec<u8> {
    let extended = section_version >= 0x14;
    let mut out = Vec::with_capacity(64 + record.chunks.len() * 8);
    out.push(record.kind.as_u8());
    out.extend_from_slice(&record.inode.to_be_bytes());
    out.push(record.sclass);
    out.push(record.eattr);
    if extended {
        out.push(record.winattr);
    }
    out.extend_from_slice(&record.mode.to_be_bytes());
    out.extend_from_slice(&record.uid.to_be_bytes());
    out.extend_from_slice(&record.gid.to_be_bytes());
    out.extend_from_slice(&record.atime.to_be_bytes());
    out.extend_from_slice(&record.mtime.to_be_bytes());
    out.extend_from_slice(&record.ctime.to_be_bytes());
    if extended {
        out.extend_from_slice(&(record.tretention as u16).to_be_bytes());
    } else {
        out.extend_from_slice(&record.tretention.wrapping_mul(3600).to_be_bytes());
    }
    match record.kind {
        InodeType::BlockDev | InodeType::CharDev => {
            out.extend_from_slice(&record.major.to_be_bytes());
            out.extend_from_slice(&record.minor.to_be_bytes());
        }
        InodeType::Symlink => {
            out.extend_from_slice(&(SYMLINK_TARGET.len() as u32).to_be_bytes());
            out.extend_from_slice(SYMLINK_TARGET);
        }
        InodeType::File | InodeType::Trash | InodeType::Sustained => {
            out.extend_from_slice(&record.length.to_be_bytes());
            out.extend_from_slice(&(record.chunks.len() as u32).to_be_bytes());
            if !extended {
                out.extend_from_slice(&0u16.to_be_bytes()); // sessions
            }
            for chunk_id in &record.chunks {
                out.extend_from_slice(&chunk_id.to_be_bytes());
            }
        }
        InodeType::Directory | InodeType::Fifo | InodeType::Socket => {}
    }
    out
}

/// Encodes one EDGE record with the given (ignored) edge id.
pub fn encode_edge(record: &EdgeRecord, edge_id: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(18 + record.name.len());
    out.extend_from_slice(&record.parent.to_be_bytes());
    out.extend_from_slice(&record.child.to_be_bytes());
    out.extend_from_slice(&edge_id.to_be_bytes());
    out.extend_from_slice(&(record.name.len() as u16).to_be_bytes());
    out.extend_from_slice(&record.name);
    out
}

pub fn encode_chunk(record: &ChunkRecord) -> Vec<u8> {
    let mut out = Vec::with_capacity(17);
    out.extend_from_slice(&record.chunk_id.to_be_bytes());
    out.extend_from_slice(&record.version.to_be_bytes());
    out.extend_from_slice(&record.locked_to.to_be_bytes());
    out.push(record.flags);
    out
}

/// Encodes a complete SCLA body, terminator included.
pub fn encode_storage_classes(classes: &[StorageClass], section_version: u8) -> Vec<u8> {
    let mut out = Vec::new();
    if section_version < 0x15 {
        out.extend_from_slice(&[0u8; 26]);
    }
    if section_version != 0x10 {
        out.push(1); // or-groups
    }
    let header_size = class_header_size(section_version);
    for class in classes {
        let name = class.name.as_deref().unwrap_or("").as_bytes();
        let mut header = Vec::with_capacity(header_size);
        header.extend_from_slice(&class.id.to_be_bytes());
        match section_version {
            0x16 => {
                header.push(name.len() as u8);
                header.extend_from_slice(&[0u8; 4]);
                header.extend_from_slice(&[class.create_copies, class.keep_copies, class.arch_copies]);
            }
            0x15 => {
                header.extend_from_slice(&[0u8; 2]);
                header.extend_from_slice(&[class.create_copies, class.keep_copies, class.arch_copies]);
            }
            0x14 => {
                header.push(0);
                header.extend_from_slice(&[class.create_copies, class.keep_copies]);
            }
            _ => header.push(class.create_copies),
        }
        header.resize(header_size, 0);
        out.extend_from_slice(&header);
        if section_version == 0x16 {
            out.extend_from_slice(name);
        }
        let labels = match section_version {
            v if v > 0x14 => {
                usize::from(class.create_copies)
                    + usize::from(class.keep_copies)
                    + usize::from(class.arch_copies)
            }
            0x14 => usize::from(class.create_copies) + usize::from(class.keep_copies),
            _ => usize::from(class.create_copies),
        };
        out.resize(out.len() + labels * 4, 0);
    }
    out.resize(out.len() + header_size, 0);
    out
}

fn section_header(tag: &[u8; 4], section_version: u8, length: usize) -> [u8; 16] {
    let mut header = [0u8; 16];
    header[..4].copy_from_slice(tag);
    header[4] = b' ';
    header[5] = b'0' + (section_version >> 4);
    header[6] = b'.';
    header[7] = b'0' + (section_version & 0xF);
    header[8..].copy_from_slice(&(length as u64).to_be_bytes());
    header
}

/// In-memory snapshot under construction.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    file_version: u8,
    metadata_version: u64,
    node_version: u8,
    chunk_version: u8,
    sclass_version: u8,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    chunks: Vec<ChunkRecord>,
    classes: Vec<StorageClass>,
    omitted: Vec<SectionKind>,
    raw_sections: Vec<([u8; 4], u8, Vec<u8>)>,
    next_inode: InodeId,
    next_chunk: ChunkId,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    /// A snapshot holding only the root directory.
    pub fn new() -> Self {
        let mut root = NodeRecord::new(ROOT_INODE, InodeType::Directory);
        root.mode = 0o755;
        Self {
            file_version: 0x20,
            metadata_version: 1,
            node_version: 0x14,
            chunk_version: version::CHNK,
            sclass_version: 0x16,
            nodes: vec![root],
            edges: Vec::new(),
            chunks: Vec::new(),
            classes: Vec::new(),
            omitted: Vec::new(),
            raw_sections: Vec::new(),
            next_inode: ROOT_INODE + 1,
            next_chunk: 1,
        }
    }

    pub fn file_version(mut self, file_version: u8) -> Self {
        self.file_version = file_version;
        self
    }

    pub fn node_version(mut self, section_version: u8) -> Self {
        self.node_version = section_version;
        self
    }

    pub fn chunk_version(mut self, section_version: u8) -> Self {
        self.chunk_version = section_version;
        self
    }

    pub fn sclass_version(mut self, section_version: u8) -> Self {
        self.sclass_version = section_version;
        self
    }

    /// Leaves a known section out of the written file.
    pub fn without(mut self, kind: SectionKind) -> Self {
        self.omitted.push(kind);
        self
    }

    /// Appends an arbitrary section after the known ones.
    pub fn raw_section(mut self, tag: &[u8; 4], section_version: u8, body: Vec<u8>) -> Self {
        self.raw_sections.push((*tag, section_version, body));
        self
    }

    pub fn storage_class(&mut self, class: StorageClass) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn push_node(&mut self, record: NodeRecord) -> &mut Self {
        self.next_inode = self.next_inode.max(record.inode.saturating_add(1));
        self.nodes.push(record);
        self
    }

    pub fn push_edge(&mut self, record: EdgeRecord) -> &mut Self {
        self.edges.push(record);
        self
    }

    pub fn push_chunk(&mut self, record: ChunkRecord) -> &mut Self {
        self.next_chunk = self.next_chunk.max(record.chunk_id.saturating_add(1));
        self.chunks.push(record);
        self
    }

    pub fn node_mut(&mut self, inode: InodeId) -> Option<&mut NodeRecord> {
        self.nodes.iter_mut().find(|record| record.inode == inode)
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.nodes
    }

    pub fn edges(&self) -> &[EdgeRecord] {
        &self.edges
    }

    fn allocate_inode(&mut self) -> InodeId {
        let inode = self.next_inode;
        self.next_inode += 1;
        inode
    }

    /// Adds a node of `kind` linked under `parent`.
    pub fn entry(&mut self, parent: InodeId, name: &str, kind: InodeType) -> InodeId {
        let inode = self.allocate_inode();
        let mut record = NodeRecord::new(inode, kind);
        record.mode = if kind == InodeType::Directory { 0o755 } else { 0o644 };
        self.nodes.push(record);
        self.edges.push(EdgeRecord::new(parent, inode, name));
        inode
    }

    pub fn directory(&mut self, parent: InodeId, name: &str) -> InodeId {
        self.entry(parent, name, InodeType::Directory)
    }

    /// Adds a regular file with one fresh chunk per started 64 MiB of `length`.
    pub fn file(&mut self, parent: InodeId, name: &str, length: u64, sclass: u8) -> InodeId {
        let inode = self.entry(parent, name, InodeType::File);
        self.fill_file(inode, length, sclass);
        inode
    }

    /// Adds a detached trash file stored under its literal `path`.
    pub fn trash(&mut self, path: &str, length: u64) -> InodeId {
        self.detached(path, length, InodeType::Trash)
    }

    pub fn sustained(&mut self, path: &str, length: u64) -> InodeId {
        self.detached(path, length, InodeType::Sustained)
    }

    fn detached(&mut self, path: &str, length: u64, kind: InodeType) -> InodeId {
        let inode = self.allocate_inode();
        self.nodes.push(NodeRecord::new(inode, kind));
        self.edges.push(EdgeRecord::new(0, inode, path));
        self.fill_file(inode, length, 1);
        inode
    }

    fn fill_file(&mut self, inode: InodeId, length: u64, sclass: u8) {
        let count = length.div_ceil(CHUNK_SIZE);
        let mut ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let chunk_id = self.next_chunk;
            self.next_chunk += 1;
            self.chunks.push(ChunkRecord {
                chunk_id,
                version: 1,
                locked_to: 0,
                flags: 0,
            });
            ids.push(chunk_id);
        }
        if let Some(record) = self.node_mut(inode) {
            record.length = length;
            record.sclass = sclass;
            record.chunks = ids;
        }
    }

    /// Adds another directory entry for an existing inode.
    pub fn link(&mut self, parent: InodeId, child: InodeId, name: &str) -> &mut Self {
        self.edges.push(EdgeRecord::new(parent, child, name));
        self
    }

    /// Sets the archive flag on a chunk record.
    pub fn archive(&mut self, chunk_id: ChunkId) -> &mut Self {
        for record in self.chunks.iter_mut().filter(|record| record.chunk_id == chunk_id) {
            record.flags = 1;
        }
        self
    }

    /// Grows a random tree below the root: `directories` directories, each
    /// under a uniformly chosen earlier directory, then `files` files with
    /// lengths up to `max_length` spread over them.
    pub fn random_tree<G: Rng>(
        &mut self,
        rng: &mut G,
        directories: usize,
        files: usize,
        max_length: u64,
    ) -> &mut Self {
        let mut parents = vec![ROOT_INODE];
        for index in 0..directories {
            let parent = parents[rng.gen_range(0..parents.len())];
            let inode = self.directory(parent, &format!("dir{index}"));
            parents.push(inode);
        }
        for index in 0..files {
            let parent = parents[rng.gen_range(0..parents.len())];
            let length = rng.gen_range(0..=max_length);
            let sclass = rng.gen_range(1..=3);
            self.file(parent, &format!("file{index}.dat"), length, sclass);
        }
        self
    }

    fn includes(&self, kind: SectionKind) -> bool {
        !self.omitted.contains(&kind)
    }

    fn node_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.next_inode.to_be_bytes());
        body.extend_from_slice(&(self.nodes.len() as u32).to_be_bytes());
        for record in &self.nodes {
            body.extend(encode_node(record, self.node_version));
        }
        body.push(0);
        body
    }

    fn edge_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(self.edges.len() as u64 + 1).to_be_bytes());
        for (index, record) in self.edges.iter().enumerate() {
            body.extend(encode_edge(record, index as u64 + 1));
        }
        body.extend(encode_edge(&EdgeRecord::new(0, 0, Vec::new()), 0));
        body
    }

    fn chunk_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.next_chunk.to_be_bytes());
        for record in &self.chunks {
            body.extend(encode_chunk(record));
        }
        let terminator = ChunkRecord {
            chunk_id: 0,
            version: 0,
            locked_to: 0,
            flags: 0,
        };
        body.extend(encode_chunk(&terminator));
        body
    }

    /// Serialises the whole snapshot file.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(SIGNATURE_PREFIX);
        out.extend_from_slice(&[
            b'0' + (self.file_version >> 4),
            b'.',
            b'0' + (self.file_version & 0xF),
        ]);
        out.extend_from_slice(&self.metadata_version.to_be_bytes());
        out.extend_from_slice(&0x5EED_u64.to_be_bytes());

        let mut sections: Vec<([u8; 4], u8, Vec<u8>)> = Vec::new();
        if self.includes(SectionKind::StorageClass) {
            sections.push((
                *b"SCLA",
                self.sclass_version,
                encode_storage_classes(&self.classes, self.sclass_version),
            ));
        }
        if self.includes(SectionKind::Node) {
            sections.push((*b"NODE", self.node_version, self.node_body()));
        }
        if self.includes(SectionKind::Edge) {
            sections.push((*b"EDGE", version::EDGE, self.edge_body()));
        }
        if self.includes(SectionKind::Chunk) {
            sections.push((*b"CHNK", self.chunk_version, self.chunk_body()));
        }
        sections.extend(self.raw_sections.iter().cloned());

        for (tag, section_version, body) in &sections {
            out.extend_from_slice(&section_header(tag, *section_version, body.len()));
            out.extend_from_slice(body);
        }
        out.extend_from_slice(EOF_MARKER);
        out
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> MetaResult<()> {
        fs::write(path, self.build())?;
        Ok(())
    }
}
