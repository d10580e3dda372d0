//! Filter expressions over inode records.
//!
//! A small C-like language: decimal, hex (`0x`), binary (`0b`) and octal
//! (leading `0`) literals, record fields (`inode`, `type`, `mode`,
//! `length`, `chunkid`, ...), named constants (`file`, `dir`, `suid`,
//! `ur`, `snapshot`, ...) and the usual arithmetic, bitwise, comparison,
//! logical and ternary operators over wrapping 64-bit unsigned values.
//! Identifiers may be abbreviated down to their distinguishing prefix.
//!
//! ```rust
//! use mfsmeta::expr::Expr;
//! use mfsmeta::types::{InodeType, NodeRecord};
//!
//! let expr = Expr::parse("type==file && length>0x100").unwrap();
//! assert_eq!(expr.to_string(), "((type==file)&&(length>256))");
//!
//! let mut record = NodeRecord::new(10, InodeType::File);
//! record.length = 4096;
//! assert!(expr.matches(&record));
//! ```

mod ast;
mod eval;
mod parser;
mod token;

use std::fmt;

pub use ast::{BinaryOp, Constant, Field, Node, UnaryOp};
pub use token::lookup_keyword;

use crate::types::NodeRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("closing round bracket expected")]
    ClosingBracketExpected,
    #[error("unknown identifier")]
    UnknownIdentifier,
    #[error("unexpected symbol")]
    UnexpectedSymbol,
    #[error("garbage at the end of expression")]
    TrailingGarbage,
}

/// Parse failure with the byte offset it was detected at.
///
/// `Display` renders the message followed by the expression and a caret
/// under the offending position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    source: String,
    position: usize,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, source: &str, position: usize) -> Self {
        Self {
            kind,
            source: source.to_string(),
            position,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let line = self.source.trim_end_matches(['\r', '\n']);
        write!(
            f,
            "parse error: {}\n{}\n{:>width$}",
            self.kind,
            line,
            "^",
            width = self.position + 1
        )
    }
}

impl std::error::Error for ParseError {}

/// A parsed filter expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    root: Node,
    uses_chunk_id: bool,
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let root = parser::Parser::new(source).parse(source)?;
        let uses_chunk_id = root.reads_chunk_id();
        Ok(Self {
            root,
            uses_chunk_id,
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Whether the expression must be evaluated once per chunk
    pub fn uses_chunk_id(&self) -> bool {
        self.uses_chunk_id
    }

    /// Evaluates with `chunkid` bound to `chunk_id`.
    pub fn evaluate(&self, record: &NodeRecord, chunk_id: u64) -> u64 {
        eval::evaluate(&self.root, record, chunk_id)
    }

    /// Decides whether an inode is shown.
    ///
    /// Expressions reading `chunkid` are tried against every non-zero chunk
    /// of a file and accept it if any evaluation is non-zero; files without
    /// chunks are then rejected. Other records evaluate once with
    /// `chunkid` bound to 0.
    pub fn matches(&self, record: &NodeRecord) -> bool {
        if self.uses_chunk_id && record.kind.has_chunks() {
            record
                .chunks
                .iter()
                .filter(|&&chunk_id| chunk_id != 0)
                .any(|&chunk_id| self.evaluate(record, chunk_id) != 0)
        } else {
            self.evaluate(record, 0) != 0
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

impl std::str::FromStr for Expr {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Expr::parse(source)
    }
}
