//! CHNK section decoding.

use std::io::{Read, Seek, SeekFrom};

use super::codec::{Fields, Tracked, read_exact};
use crate::constants::chunk;
use crate::errors::MetaResult;
use crate::types::{ChunkRecord, SectionDescriptor};

/// Decodes one v0x11 record; `None` at the zero chunk id closing the section.
pub fn decode_chunk<R: Read>(source: &mut R) -> MetaResult<Option<ChunkRecord>> {
    let mut raw = [0u8; chunk::RECORD_SIZE];
    read_exact(source, &mut raw, "chunk record")?;
    let mut fields = Fields::new(&raw);
    let chunk_id = fields.u64();
    if chunk_id == 0 {
        return Ok(None);
    }
    let version = fields.u32();
    let locked_to = fields.u32();
    let flags = fields.u8();
    Ok(Some(ChunkRecord {
        chunk_id,
        version,
        locked_to,
        flags,
    }))
}

/// Forward iterator over the CHNK records of one section.
pub struct ChunkCursor<'a, R> {
    source: Tracked<'a, R>,
    section: SectionDescriptor,
    finished: bool,
}

impl<'a, R: Read + Seek> ChunkCursor<'a, R> {
    pub fn new(source: &'a mut R, section: SectionDescriptor) -> MetaResult<Self> {
        let start = section.offset + chunk::SECTION_PREFIX_SIZE;
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

    pub fn next_chunk(&mut self) -> MetaResult<Option<ChunkRecord>> {
        if self.finished {
            return Ok(None);
        }
        let record = decode_chunk(&mut self.source);
        if !matches!(record, Ok(Some(_))) {
            self.finished = true;
        }
        record
    }
}

impl<R: Read + Seek> Iterator for ChunkCursor<'_, R> {
    type Item = MetaResult<ChunkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MetaError;
    use std::io::Cursor;

    #[test]
    fn test_decode_archive_flag() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0xABu64.to_be_bytes());
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.push(1);
        bytes.extend_from_slice(&0xCDu64.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 9]);
        bytes.extend_from_slice(&[0u8; 17]);
        let mut source = Cursor::new(bytes);
        let record = decode_chunk(&mut source).unwrap().expect("chunk");
        assert_eq!(record.chunk_id, 0xAB);
        assert_eq!(record.version, 3);
        assert!(record.is_archived());
        let record = decode_chunk(&mut source).unwrap().expect("chunk");
        assert_eq!(record.chunk_id, 0xCD);
        assert!(!record.is_archived());
        assert!(decode_chunk(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_truncated_record() {
        let mut source = Cursor::new(vec![0u8, 0, 0, 0, 0, 0, 0, 9, 0, 0]);
        assert!(matches!(
            decode_chunk(&mut source),
            Err(MetaError::Truncated { what: "chunk record" })
        ));
    }
}
