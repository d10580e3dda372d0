//! Constants for the MooseFS metadata snapshot format.
//!
//! Signatures, section markers, per-section version ranges, name limits and
//! chunk geometry used by the decoders and the aggregation arithmetic.

/// Prefix of every metadata file signature ("MFSM x.y")
pub const SIGNATURE_PREFIX: &[u8; 5] = b"MFSM ";

/// Signature of a freshly created master that never stored metadata
pub const EMPTY_SIGNATURE: &[u8; 8] = b"MFSM NEW";

/// Oldest sectioned file format we understand (2.0)
pub const MIN_FILE_VERSION: u8 = 0x20;

/// Size of the file signature in bytes
pub const SIGNATURE_SIZE: usize = 8;

/// Metadata version (u64) followed by file id (u64)
pub const FILE_HEADER_SIZE: usize = 16;

/// Offset of the first section header
pub const FIRST_SECTION_OFFSET: u64 = (SIGNATURE_SIZE + FILE_HEADER_SIZE) as u64;

/// Size of a section header
pub const SECTION_HEADER_SIZE: usize = 16;

/// Literal that terminates the section list
pub const EOF_MARKER: &[u8; 16] = b"[MFS EOF MARKER]";

/// Inode number of the filesystem root
pub const ROOT_INODE: u32 = 1;

/// Maximum length of a single directory entry name
pub const NAME_MAX: u16 = 255;

/// Maximum length of a literal path stored on a detached edge
pub const PATH_MAX: u16 = 1024;

/// Supported section versions
pub mod version {
    pub const NODE_MIN: u8 = 0x13;
    pub const NODE_MAX: u8 = 0x14;
    pub const EDGE: u8 = 0x11;
    pub const CHNK: u8 = 0x11;
    pub const SCLA_MIN: u8 = 0x10;
    pub const SCLA_MAX: u8 = 0x16;
}

/// EDGE record layout
pub mod edge {
    /// next edge id preceding the records
    pub const SECTION_PREFIX_SIZE: u64 = 8;
    /// parent + child + edge id + name length
    pub const FIXED_SIZE: usize = 4 + 4 + 8 + 2;
}

/// NODE record layout
pub mod node {
    /// max inode id + hash elements preceding the records
    pub const SECTION_PREFIX_SIZE: u64 = 8;
    pub const CHUNK_ID_SIZE: usize = 8;
    pub const SESSION_ID_SIZE: usize = 4;
}

/// CHNK record layout
pub mod chunk {
    /// next chunk id preceding the records
    pub const SECTION_PREFIX_SIZE: u64 = 8;
    pub const RECORD_SIZE: usize = 17;
}

/// SCLA record layout
pub mod sclass {
    /// Label descriptions stored before 0x15 ('A'..'Z')
    pub const LABEL_DESCRIPTIONS: usize = 26;
    pub const MAX_DESCRIPTION_LENGTH: u8 = 128;
    pub const LABEL_SIZE: u64 = 4;
    pub const MAX_COPIES: u8 = 9;
    /// Storage class ids addressable from a NODE record (u8)
    pub const NODE_CLASS_SLOTS: usize = 256;
    /// Classes below this id default to keep = arch = id
    pub const DEFAULT_FACTOR_LIMIT: u16 = 10;
}

/// Chunk geometry used to compute on-disk sizes
pub mod geometry {
    pub const CHUNK_SIZE: u64 = 0x0400_0000;
    pub const CHUNK_MASK: u64 = 0x03FF_FFFF;
    pub const BLOCK_SIZE: u64 = 0x1_0000;
    pub const BLOCK_NEG_MASK: u64 = 0x7FFF_0000;
    pub const CHUNK_HEADER_SIZE: u64 = 0x2000;
}

/// Chunk ids in list files are masked to 56 bits
pub const CHUNK_ID_MASK: u64 = 0x00FF_FFFF_FFFF_FFFF;

/// Default byte budget of one block in the reverse edge scan
pub const DEFAULT_EDGE_BLOCK_SIZE: usize = 1_000_000;

/// Default number of records between progress reports
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;
