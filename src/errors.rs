use thiserror::Error;

use crate::expr::ParseError;

/// Error type for metadata snapshot analysis.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("format error: {0}")]
    Format(String),
    #[error("can't find {tag} section in metadata file")]
    MissingSection { tag: &'static str },
    #[error("unsupported {tag} section version 0x{version:02X}")]
    UnsupportedVersion { tag: &'static str, version: u8 },
    #[error("{tag} section malformed: {reason}")]
    MalformedSection { tag: &'static str, reason: String },
    #[error("name too long ({length} bytes, limit {limit}) in edge from parent {parent}")]
    NameTooLong { parent: u32, length: u16, limit: u16 },
    #[error("truncated metadata file while reading {what}")]
    Truncated { what: &'static str },
    #[error("expression error: {0}")]
    ExprParse(#[from] ParseError),
    #[error("chunk id list parse error on line {line}: {content}")]
    ChunkList { line: usize, content: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl MetaError {
    pub fn format<T: Into<String>>(msg: T) -> Self {
        MetaError::Format(msg.into())
    }

    pub fn malformed<T: Into<String>>(tag: &'static str, reason: T) -> Self {
        MetaError::MalformedSection {
            tag,
            reason: reason.into(),
        }
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        MetaError::InvalidInput(msg.into())
    }

    /// Maps a short read onto [`MetaError::Truncated`], leaving other I/O errors intact.
    pub fn from_read(err: std::io::Error, what: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            MetaError::Truncated { what }
        } else {
            MetaError::Io(err)
        }
    }
}

/// Result type alias for snapshot analysis.
pub type MetaResult<T> = Result<T, MetaError>;
