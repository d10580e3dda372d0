//! EDGE section decoding.

use std::io::{Read, Seek, SeekFrom};

use super::codec::{Fields, Tracked, read_exact, read_vec};
use crate::constants::{PATH_MAX, NAME_MAX, edge};
use crate::errors::{MetaError, MetaResult};
use crate::types::{EdgeRecord, SectionDescriptor};

/// Decodes one record; `None` at the parent=child=0 terminator.
pub fn decode_edge<R: Read>(source: &mut R) -> MetaResult<Option<EdgeRecord>> {
    let mut fixed = [0u8; edge::FIXED_SIZE];
    read_exact(source, &mut fixed, "edge record")?;
    let mut fields = Fields::new(&fixed);
    let parent = fields.u32();
    let child = fields.u32();
    fields.skip(8); // edge id
    let name_length = fields.u16();
    if parent == 0 && child == 0 {
        return Ok(None);
    }
    let limit = if parent == 0 { PATH_MAX } else { NAME_MAX };
    if name_length > limit {
        return Err(MetaError::NameTooLong {
            parent,
            length: name_length,
            limit,
        });
    }
    let name = read_vec(source, usize::from(name_length), "edge name")?;
    Ok(Some(EdgeRecord {
        parent,
        child,
        name,
    }))
}

/// On-disk size of an edge record
pub fn encoded_size(record: &EdgeRecord) -> usize {
    edge::FIXED_SIZE + record.name.len()
}

/// Forward iterator over the EDGE records of one section.
pub struct EdgeCursor<'a, R> {
    source: Tracked<'a, R>,
    section: SectionDescriptor,
    finished: bool,
}

impl<'a, R: Read + Seek> EdgeCursor<'a, R> {
    pub fn new(source: &'a mut R, section: SectionDescriptor) -> MetaResult<Self> {
        let start = section.offset + edge::SECTION_PREFIX_SIZE;
        source.seek(SeekFrom::Start(start))?;
        Ok(Self {
            source: Tracked::new(source, start),
            section,
            finished: false,
        })
    }

    /// File offset of the next record
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Bytes of the section body consumed so far
    pub fn consumed(&self) -> u64 {
        self.position() - self.section.offset
    }

    pub fn section(&self) -> &SectionDescriptor {
        &self.section
    }

    pub fn next_edge(&mut self) -> MetaResult<Option<EdgeRecord>> {
        if self.finished {
            return Ok(None);
        }
        let record = decode_edge(&mut self.source);
        if !matches!(record, Ok(Some(_))) {
            self.finished = true;
        }
        record
    }
}

impl<R: Read + Seek> Iterator for EdgeCursor<'_, R> {
    type Item = MetaResult<EdgeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_edge().transpose()
    }
}

/// Reads `count` consecutive records starting at `offset`, in file order.
pub fn read_edge_block<R: Read + Seek>(
    source: &mut R,
    offset: u64,
    count: u32,
) -> MetaResult<Vec<EdgeRecord>> {
    source.seek(SeekFrom::Start(offset))?;
    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match decode_edge(source)? {
            Some(record) => records.push(record),
            None => {
                return Err(MetaError::malformed(
                    "EDGE",
                    format!("terminator inside edge block at offset {offset}"),
                ));
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(parent: u32, child: u32, name: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&parent.to_be_bytes());
        out.extend_from_slice(&child.to_be_bytes());
        out.extend_from_slice(&7u64.to_be_bytes());
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name);
        out
    }

    #[test]
    fn test_decode_edge_and_terminator() {
        let mut bytes = encode(1, 2, b"docs");
        bytes.extend(encode(0, 0, b""));
        let mut source = Cursor::new(bytes);
        let first = decode_edge(&mut source).unwrap().expect("edge");
        assert_eq!(first, EdgeRecord::new(1, 2, "docs"));
        assert_eq!(encoded_size(&first), 22);
        assert!(decode_edge(&mut source).unwrap().is_none());
    }

    #[test]
    fn test_name_limits_depend_on_parent() {
        let long = vec![b'a'; 256];
        let mut source = Cursor::new(encode(5, 6, &long));
        assert!(matches!(
            decode_edge(&mut source),
            Err(MetaError::NameTooLong { limit: 255, .. })
        ));

        let mut source = Cursor::new(encode(0, 6, &long));
        let detached = decode_edge(&mut source).unwrap().expect("edge");
        assert!(detached.is_detached());

        let mut source = Cursor::new(encode(0, 6, &vec![b'p'; 1025]));
        assert!(matches!(
            decode_edge(&mut source),
            Err(MetaError::NameTooLong { limit: 1024, .. })
        ));
    }

    #[test]
    fn test_truncated_name() {
        let mut bytes = encode(1, 2, b"abcdef");
        bytes.truncate(bytes.len() - 2);
        let mut source = Cursor::new(bytes);
        assert!(matches!(
            decode_edge(&mut source),
            Err(MetaError::Truncated { what: "edge name" })
        ));
    }
}
