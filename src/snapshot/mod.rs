//! Reader for MooseFS metadata snapshot files (`metadata.mfs`).
//!
//! A snapshot is an 8-byte signature, a 16-byte header and a list of
//! length-prefixed sections closed by `[MFS EOF MARKER]`. Opening a file
//! only walks the section headers; record bodies are decoded on demand by
//! the per-section cursors, each of which dispatches on the version the
//! section itself declares.

mod chunk;
mod codec;
mod edge;
mod header;
mod node;
mod sclass;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

pub use chunk::{ChunkCursor, decode_chunk};
pub use edge::{EdgeCursor, decode_edge, encoded_size, read_edge_block};
pub use header::{
    SectionTable, SnapshotHeader, check_version, decode_signature, is_supported_version,
    section_version,
};
pub use node::{NodeCursor, decode_node};
pub use sclass::{StorageClassTable, class_header_size, read_storage_classes};

use crate::errors::{MetaError, MetaResult};
use crate::types::{EdgeRecord, SectionDescriptor, SectionKind};

/// Random-access reader over one snapshot file.
pub struct SnapshotReader<R = BufReader<File>> {
    source: R,
    header: SnapshotHeader,
    sections: SectionTable,
}

impl SnapshotReader<BufReader<File>> {
    /// Opens `path`, validates the signature and indexes the sections.
    pub fn open<P: AsRef<Path>>(path: P) -> MetaResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> SnapshotReader<R> {
    pub fn from_reader(mut source: R) -> MetaResult<Self> {
        let header = header::read_header(&mut source)?;
        let sections = header::scan_sections(&mut source)?;
        log::info!(
            "metadata file version {}.{}, metadata version {}, sections: {}",
            header.file_version >> 4,
            header.file_version & 0xF,
            header.version,
            sections
                .iter()
                .map(|section| section.kind.tag())
                .collect::<Vec<_>>()
                .join(" ")
        );
        Ok(Self {
            source,
            header,
            sections,
        })
    }

    pub fn header(&self) -> &SnapshotHeader {
        &self.header
    }

    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Fails unless every listed section is present with a supported version.
    pub fn require(&self, kinds: &[SectionKind]) -> MetaResult<()> {
        self.sections.require(kinds)
    }

    fn section(&self, kind: SectionKind) -> MetaResult<SectionDescriptor> {
        let descriptor = self
            .sections
            .get(kind)
            .copied()
            .ok_or(MetaError::MissingSection { tag: kind.tag() })?;
        check_version(&descriptor)?;
        Ok(descriptor)
    }

    pub fn edges(&mut self) -> MetaResult<EdgeCursor<'_, R>> {
        let section = self.section(SectionKind::Edge)?;
        EdgeCursor::new(&mut self.source, section)
    }

    pub fn nodes(&mut self) -> MetaResult<NodeCursor<'_, R>> {
        let section = self.section(SectionKind::Node)?;
        NodeCursor::new(&mut self.source, section)
    }

    pub fn chunks(&mut self) -> MetaResult<ChunkCursor<'_, R>> {
        let section = self.section(SectionKind::Chunk)?;
        ChunkCursor::new(&mut self.source, section)
    }

    pub fn storage_classes(&mut self) -> MetaResult<StorageClassTable> {
        let section = self.section(SectionKind::StorageClass)?;
        read_storage_classes(&mut self.source, &section)
    }

    /// Re-reads `count` edges starting at absolute file `offset`.
    pub fn read_edge_block(&mut self, offset: u64, count: u32) -> MetaResult<Vec<EdgeRecord>> {
        read_edge_block(&mut self.source, offset, count)
    }

    pub fn into_inner(self) -> R {
        self.source
    }
}
