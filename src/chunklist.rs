//! Chunk id list files for inverse search.
//!
//! One hexadecimal id per line with an optional `0x` prefix. Blank lines and
//! lines starting with `#` or `;` are ignored, and a `#`/`;` after the id
//! starts a trailing comment. Ids are masked to their low 56 bits.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::constants::CHUNK_ID_MASK;
use crate::errors::{MetaError, MetaResult};
use crate::idset::SparseIdSet;

fn is_blank(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

fn ends_entry(rest: &[u8]) -> bool {
    matches!(rest.first(), None | Some(b'\r' | b'\n' | b'#' | b';'))
}

#[derive(Debug, PartialEq, Eq)]
enum Entry {
    Skip,
    Id(u64),
    Invalid,
}

fn parse_line(line: &[u8]) -> Entry {
    let start = line.iter().position(|&b| !is_blank(b)).unwrap_or(line.len());
    let mut rest = &line[start..];
    if ends_entry(rest) {
        return Entry::Skip;
    }
    if rest.len() >= 2 && rest[0] == b'0' && (rest[1] == b'x' || rest[1] == b'X') {
        rest = &rest[2..];
    }
    let digits = rest.iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if digits == 0 {
        return Entry::Invalid;
    }
    let mut value: u64 = 0;
    for &byte in &rest[..digits] {
        let nibble = (byte as char).to_digit(16).map(u64::from);
        value = match (value.checked_mul(16), nibble) {
            (Some(shifted), Some(nibble)) => shifted | nibble,
            _ => return Entry::Invalid,
        };
    }
    rest = &rest[digits..];
    let trailing = rest.iter().position(|&b| !is_blank(b)).unwrap_or(rest.len());
    if ends_entry(&rest[trailing..]) {
        Entry::Id(value & CHUNK_ID_MASK)
    } else {
        Entry::Invalid
    }
}

/// Reads every id from `source` into a new set.
pub fn read_chunk_ids<R: BufRead>(mut source: R) -> MetaResult<SparseIdSet> {
    let mut set = SparseIdSet::new();
    let mut line = Vec::new();
    let mut number = 0usize;
    loop {
        line.clear();
        if source.read_until(b'\n', &mut line)? == 0 {
            return Ok(set);
        }
        number += 1;
        match parse_line(&line) {
            Entry::Skip => {}
            Entry::Id(chunk_id) => {
                set.add(chunk_id);
            }
            Entry::Invalid => {
                return Err(MetaError::ChunkList {
                    line: number,
                    content: String::from_utf8_lossy(&line).trim_end().to_string(),
                });
            }
        }
    }
}

pub fn load_chunk_ids<P: AsRef<Path>>(path: P) -> MetaResult<SparseIdSet> {
    let file = File::open(path.as_ref())?;
    read_chunk_ids(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_prefixes_and_masking() {
        let input = b"# header\n\n  ; note\n0x1A\n\t2b  # trailing\nFF00000000000001\n0X10;x\n";
        let set = read_chunk_ids(&input[..]).unwrap();
        assert_eq!(set.cardinality(), 4);
        assert!(set.check(0x1A));
        assert!(set.check(0x2B));
        assert!(set.check(0x0000_0000_0000_0001));
        assert!(set.check(0x10));
    }

    #[test]
    fn test_last_line_without_newline() {
        let set = read_chunk_ids(&b"1\n2"[..]).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_garbage_reports_line() {
        let err = read_chunk_ids(&b"10\n0x\n"[..]).unwrap_err();
        assert!(matches!(err, MetaError::ChunkList { line: 2, ref content } if content == "0x"));

        let err = read_chunk_ids(&b"12 34\n"[..]).unwrap_err();
        assert!(matches!(err, MetaError::ChunkList { line: 1, .. }));

        let err = read_chunk_ids(&b"1ffffffffffffffff\n"[..]).unwrap_err();
        assert!(matches!(err, MetaError::ChunkList { line: 1, .. }));
    }
}
