//! NODE section decoding for section versions 0x13 and 0x14.
//!
//! Layout per record (big-endian), after a one-byte type tag:
//!
//! | field       | 0x13          | 0x14          |
//! |-------------|---------------|---------------|
//! | inode       | u32           | u32           |
//! | sclass      | u8            | u8            |
//! | eattr       | u8            | u8            |
//! | winattr     | -             | u8            |
//! | mode        | u16           | u16           |
//! | uid, gid    | u32, u32      | u32, u32      |
//! | a/m/ctime   | 3 x u32       | 3 x u32       |
//! | tretention  | u32 (seconds) | u16 (hours)   |
//!
//! Devices append `rdev u32`, symlinks `length u32` plus the target path,
//! and files `length u64, chunks u32` (`sessions u16` in 0x13) followed by
//! the chunk ids and the session ids.

use std::io::{Read, Seek, SeekFrom};

use super::codec::{Fields, Tracked, read_exact, read_u8, skip};
use crate::constants::node::{CHUNK_ID_SIZE, SECTION_PREFIX_SIZE, SESSION_ID_SIZE};
use crate::errors::{MetaError, MetaResult};
use crate::types::{InodeType, NodeRecord, SectionDescriptor};

const COMMON_SIZE_V13: usize = 32;
const COMMON_SIZE_V14: usize = 31;
const FILE_TAIL_V13: usize = 14;
const FILE_TAIL_V14: usize = 12;
const MAX_PREALLOCATED_CHUNKS: usize = 4096;

/// Decodes one record; `None` at the zero type byte closing the section.
pub fn decode_node<R: Read>(source: &mut R, section_version: u8) -> MetaResult<Option<NodeRecord>> {
    let type_byte = read_u8(source, "node type")?;
    if type_byte == 0 {
        return Ok(None);
    }
    let kind = InodeType::from_u8(type_byte).ok_or_else(|| {
        MetaError::malformed("NODE", format!("unknown node type {type_byte}"))
    })?;
    let extended = section_version >= 0x14;

    let mut common = [0u8; COMMON_SIZE_V13];
    let common = if extended {
        &mut common[..COMMON_SIZE_V14]
    } else {
        &mut common[..]
    };
    read_exact(source, common, "node record")?;
    let mut fields = Fields::new(common);
    let mut record = NodeRecord::new(fields.u32(), kind);
    record.sclass = fields.u8();
    record.eattr = fields.u8();
    if extended {
        record.winattr = fields.u8();
    }
    record.mode = fields.u16();
    record.uid = fields.u32();
    record.gid = fields.u32();
    record.atime = fields.u32();
    record.mtime = fields.u32();
    record.ctime = fields.u32();
    record.tretention = if extended {
        u32::from(fields.u16())
    } else {
        fields.u32() / 3600
    };

    match kind {
        InodeType::BlockDev | InodeType::CharDev => {
            let mut rdev = [0u8; 4];
            read_exact(source, &mut rdev, "device node")?;
            let mut fields = Fields::new(&rdev);
            record.major = fields.u16();
            record.minor = fields.u16();
        }
        InodeType::Symlink => {
            let mut length = [0u8; 4];
            read_exact(source, &mut length, "symlink node")?;
            let path_length = Fields::new(&length).u32();
            skip(source, u64::from(path_length), "symlink path")?;
        }
        InodeType::File | InodeType::Trash | InodeType::Sustained => {
            let mut tail = [0u8; FILE_TAIL_V13];
            let tail = if extended {
                &mut tail[..FILE_TAIL_V14]
            } else {
                &mut tail[..]
            };
            read_exact(source, tail, "file node")?;
            let mut fields = Fields::new(tail);
            record.length = fields.u64();
            let chunk_count = fields.u32();
            let sessions = if extended { 0 } else { fields.u16() };

            // the count is untrusted; grow the list as ids actually arrive
            record.chunks = Vec::with_capacity((chunk_count as usize).min(MAX_PREALLOCATED_CHUNKS));
            let mut raw = [0u8; CHUNK_ID_SIZE];
            for _ in 0..chunk_count {
                read_exact(source, &mut raw, "chunk id")?;
                record.chunks.push(Fields::new(&raw).u64());
            }
            skip(
                source,
                u64::from(sessions) * SESSION_ID_SIZE as u64,
                "session ids",
            )?;
        }
        InodeType::Directory | InodeType::Fifo | InodeType::Socket => {}
    }
    Ok(Some(record))
}

/// Forward iterator over the NODE records of one section.
pub struct NodeCursor<'a, R> {
    source: Tracked<'a, R>,
    section: SectionDescriptor,
    finished: bool,
}

impl<'a, R: Read + Seek> NodeCursor<'a, R> {
    pub fn new(source: &'a mut R, section: SectionDescriptor) -> MetaResult<Self> {
        let start = section.offset + SECTION_PREFIX_SIZE;
        source.seek(SeekFrom::Start(start))?;
        Ok(Self {
            source: Tracked::new(source, start),
            section,
            finished: false,
        })
    }

    pub fn consumed(&self) -> u64 {
        self.source.position() - self.section.offset
    }

    pub fn section(&self) -> &SectionDescriptor {
        &self.section
    }

    pub fn next_node(&mut self) -> MetaResult<Option<NodeRecord>> {
        if self.finished {
            return Ok(None);
        }
        let record = decode_node(&mut self.source, self.section.version);
        if !matches!(record, Ok(Some(_))) {
            self.finished = true;
        }
        record
    }
}

impl<R: Read + Seek> Iterator for NodeCursor<'_, R> {
    type Item = MetaResult<NodeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_node().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot_builder::encode_node;
    use std::io::Cursor;

    fn sample_file() -> NodeRecord {
        let mut record = NodeRecord::new(42, InodeType::File);
        record.sclass = 3;
        record.eattr = 0x10;
        record.mode = 0o644;
        record.uid = 1000;
        record.gid = 100;
        record.atime = 1_700_000_000;
        record.mtime = 1_700_000_001;
        record.ctime = 1_700_000_002;
        record.tretention = 24;
        record.length = 5 << 20;
        record.chunks = vec![0x11, 0, 0x22];
        record
    }

    #[test]
    fn test_decode_file_across_versions() {
        for section_version in [0x13u8, 0x14] {
            let mut record = sample_file();
            if section_version >= 0x14 {
                record.winattr = 0x02;
            }
            let mut bytes = encode_node(&record, section_version);
            bytes.push(0);
            let mut source = Cursor::new(bytes);
            let decoded = decode_node(&mut source, section_version)
                .unwrap()
                .expect("node");
            assert_eq!(decoded, record, "version {section_version:#x}");
            assert!(decode_node(&mut source, section_version).unwrap().is_none());
        }
    }

    #[test]
    fn test_device_major_minor() {
        let mut record = NodeRecord::new(9, InodeType::BlockDev);
        record.major = 8;
        record.minor = 17;
        let bytes = encode_node(&record, 0x14);
        let decoded = decode_node(&mut Cursor::new(bytes), 0x14)
            .unwrap()
            .expect("node");
        assert_eq!((decoded.major, decoded.minor), (8, 17));
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let mut source = Cursor::new(vec![12u8; 64]);
        assert!(matches!(
            decode_node(&mut source, 0x14),
            Err(MetaError::MalformedSection { tag: "NODE", .. })
        ));
    }

    #[test]
    fn test_truncated_chunk_list() {
        let mut bytes = encode_node(&sample_file(), 0x14);
        bytes.truncate(bytes.len() - 3);
        assert!(matches!(
            decode_node(&mut Cursor::new(bytes), 0x14),
            Err(MetaError::Truncated { what: "chunk id" })
        ));
    }
}
