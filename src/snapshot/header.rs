//! File signature and section directory.

use std::io::{Read, Seek, SeekFrom};

use super::codec::{Fields, read_exact};
use crate::constants::{
    EMPTY_SIGNATURE, EOF_MARKER, FILE_HEADER_SIZE, FIRST_SECTION_OFFSET, MIN_FILE_VERSION,
    SECTION_HEADER_SIZE, SIGNATURE_PREFIX, SIGNATURE_SIZE, version,
};
use crate::errors::{MetaError, MetaResult};
use crate::types::{SectionDescriptor, SectionKind};

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Metadata version counter of the master at dump time
    pub version: u64,
    /// File format version, `0xMm` for "MFSM M.m"
    pub file_version: u8,
    pub file_id: u64,
}

/// Parses the 8-byte signature into a file format version byte.
pub fn decode_signature(signature: &[u8; SIGNATURE_SIZE]) -> MetaResult<u8> {
    if signature == EMPTY_SIGNATURE {
        return Err(MetaError::format("empty file"));
    }
    let major = signature[5];
    let minor = signature[7];
    if &signature[..5] != SIGNATURE_PREFIX
        || !(b'1'..=b'9').contains(&major)
        || signature[6] != b'.'
        || !minor.is_ascii_digit()
    {
        return Err(MetaError::format("unrecognized file format"));
    }
    let file_version = ((major - b'0') << 4) | (minor - b'0');
    if file_version < MIN_FILE_VERSION {
        return Err(MetaError::format(format!(
            "metadata file format too old {}.{}",
            file_version >> 4,
            file_version & 0xF
        )));
    }
    Ok(file_version)
}

pub fn read_header<R: Read + Seek>(source: &mut R) -> MetaResult<SnapshotHeader> {
    source.seek(SeekFrom::Start(0))?;
    let mut signature = [0u8; SIGNATURE_SIZE];
    read_exact(source, &mut signature, "metadata header")?;
    let file_version = decode_signature(&signature)?;

    let mut rest = [0u8; FILE_HEADER_SIZE];
    read_exact(source, &mut rest, "metadata header")?;
    let mut fields = Fields::new(&rest);
    Ok(SnapshotHeader {
        version: fields.u64(),
        file_version,
        file_id: fields.u64(),
    })
}

/// Section version byte from the "v.M.m"-style header digits.
pub fn section_version(header: &[u8; SECTION_HEADER_SIZE]) -> u8 {
    ((header[5].wrapping_sub(b'0') & 0xF) << 4) | (header[7] & 0xF)
}

/// Body locations of the known sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionTable {
    node: Option<SectionDescriptor>,
    edge: Option<SectionDescriptor>,
    storage_class: Option<SectionDescriptor>,
    chunk: Option<SectionDescriptor>,
    /// Tags that were skipped, in file order
    skipped: Vec<String>,
}

impl SectionTable {
    fn slot(&mut self, kind: SectionKind) -> &mut Option<SectionDescriptor> {
        match kind {
            SectionKind::Node => &mut self.node,
            SectionKind::Edge => &mut self.edge,
            SectionKind::StorageClass => &mut self.storage_class,
            SectionKind::Chunk => &mut self.chunk,
        }
    }

    pub fn get(&self, kind: SectionKind) -> Option<&SectionDescriptor> {
        match kind {
            SectionKind::Node => self.node.as_ref(),
            SectionKind::Edge => self.edge.as_ref(),
            SectionKind::StorageClass => self.storage_class.as_ref(),
            SectionKind::Chunk => self.chunk.as_ref(),
        }
    }

    pub fn insert(&mut self, descriptor: SectionDescriptor) -> MetaResult<()> {
        let slot = self.slot(descriptor.kind);
        if slot.is_some() {
            return Err(MetaError::malformed(
                descriptor.kind.tag(),
                "section present more than once",
            ));
        }
        *slot = Some(descriptor);
        Ok(())
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionDescriptor> {
        [&self.node, &self.edge, &self.storage_class, &self.chunk]
            .into_iter()
            .flatten()
    }

    /// Checks presence of every kind first, then their versions.
    pub fn require(&self, kinds: &[SectionKind]) -> MetaResult<()> {
        for &kind in kinds {
            if self.get(kind).is_none() {
                return Err(MetaError::MissingSection { tag: kind.tag() });
            }
        }
        for descriptor in kinds.iter().filter_map(|&kind| self.get(kind)) {
            check_version(descriptor)?;
        }
        Ok(())
    }
}

pub fn is_supported_version(kind: SectionKind, section_version: u8) -> bool {
    match kind {
        SectionKind::Node => (version::NODE_MIN..=version::NODE_MAX).contains(&section_version),
        SectionKind::Edge => section_version == version::EDGE,
        SectionKind::Chunk => section_version == version::CHNK,
        SectionKind::StorageClass => {
            (version::SCLA_MIN..=version::SCLA_MAX).contains(&section_version)
        }
    }
}

pub fn check_version(descriptor: &SectionDescriptor) -> MetaResult<()> {
    if is_supported_version(descriptor.kind, descriptor.version) {
        Ok(())
    } else {
        Err(MetaError::UnsupportedVersion {
            tag: descriptor.kind.tag(),
            version: descriptor.version,
        })
    }
}

/// Walks the section headers up to the end marker without reading bodies.
pub fn scan_sections<R: Read + Seek>(source: &mut R) -> MetaResult<SectionTable> {
    let mut table = SectionTable::default();
    let mut offset = FIRST_SECTION_OFFSET;
    source.seek(SeekFrom::Start(offset))?;
    loop {
        let mut header = [0u8; SECTION_HEADER_SIZE];
        read_exact(source, &mut header, "section header")?;
        if &header == EOF_MARKER {
            return Ok(table);
        }
        let length = Fields::new(&header[8..]).u64();
        let body = offset + SECTION_HEADER_SIZE as u64;
        let tag = &header[..4];
        match SectionKind::from_tag(tag) {
            Some(kind) => {
                let descriptor = SectionDescriptor {
                    kind,
                    version: section_version(&header),
                    offset: body,
                    length,
                };
                log::debug!(
                    "found {} section (version 0x{:02X}, {} bytes)",
                    kind.tag(),
                    descriptor.version,
                    length
                );
                table.insert(descriptor)?;
            }
            None => {
                let name = String::from_utf8_lossy(tag).into_owned();
                log::debug!("skipping {name} section ({length} bytes)");
                table.skipped.push(name);
            }
        }
        offset = body
            .checked_add(length)
            .ok_or_else(|| MetaError::format("section length overflows file offset"))?;
        source.seek(SeekFrom::Start(offset))?;
    }
}
