//! Tokenizer and keyword table for filter expressions.

use super::ast::{Constant, Field};

/// Operator and punctuation symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    Amp,
    AmpAmp,
    Caret,
    CaretCaret,
    Pipe,
    PipePipe,
    Bang,
    Tilde,
    Question,
    Colon,
    OpenParen,
    CloseParen,
}

/// Resolved identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Field(Field),
    Constant(Constant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number(u64),
    Keyword(Keyword),
    /// A run of letters matching no keyword
    UnknownIdentifier,
    Symbol(Symbol),
    /// A byte that starts no token
    Stray,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub position: usize,
}

struct KeywordEntry {
    canonical: &'static str,
    min_len: usize,
    keyword: Keyword,
}

const fn field(canonical: &'static str, min_len: usize, field: Field) -> KeywordEntry {
    KeywordEntry {
        canonical,
        min_len,
        keyword: Keyword::Field(field),
    }
}

const fn constant(canonical: &'static str, min_len: usize, constant: Constant) -> KeywordEntry {
    KeywordEntry {
        canonical,
        min_len,
        keyword: Keyword::Constant(constant),
    }
}

/// Canonical spelling and the length of its shortest accepted prefix.
/// Minimal prefixes never overlap, so at most one entry matches a word.
const KEYWORDS: &[KeywordEntry] = &[
    field("inode", 2, Field::Inode),
    field("type", 2, Field::Type),
    field("eattr", 2, Field::Eattr),
    field("sclass", 2, Field::Sclass),
    field("uid", 2, Field::Uid),
    field("gid", 2, Field::Gid),
    field("mode", 2, Field::Mode),
    field("umode", 2, Field::Umode),
    field("gmode", 2, Field::Gmode),
    field("omode", 2, Field::Omode),
    field("atime", 2, Field::Atime),
    field("mtime", 2, Field::Mtime),
    field("ctime", 2, Field::Ctime),
    field("tretention", 3, Field::Tretention),
    field("length", 1, Field::Length),
    field("major", 2, Field::Major),
    field("minor", 2, Field::Minor),
    field("time", 2, Field::Time),
    field("chunkid", 3, Field::ChunkId),
    constant("file", 3, Constant::File),
    constant("directory", 1, Constant::Directory),
    constant("folder", 2, Constant::Directory),
    constant("symlink", 2, Constant::Symlink),
    constant("fifo", 3, Constant::Fifo),
    constant("blockdev", 2, Constant::BlockDev),
    constant("bdev", 2, Constant::BlockDev),
    constant("chardev", 3, Constant::CharDev),
    constant("cdev", 2, Constant::CharDev),
    constant("socket", 2, Constant::Socket),
    constant("trash", 3, Constant::Trash),
    constant("sustained", 3, Constant::Sustained),
    constant("suid", 3, Constant::Suid),
    constant("sgid", 2, Constant::Sgid),
    constant("sticky", 2, Constant::Sticky),
    constant("uread", 2, Constant::UserRead),
    constant("uwrite", 2, Constant::UserWrite),
    constant("uexecute", 2, Constant::UserExecute),
    constant("ux", 2, Constant::UserExecute),
    constant("gread", 2, Constant::GroupRead),
    constant("gwrite", 2, Constant::GroupWrite),
    constant("gexecute", 2, Constant::GroupExecute),
    constant("gx", 2, Constant::GroupExecute),
    constant("oread", 2, Constant::OtherRead),
    constant("owrite", 2, Constant::OtherWrite),
    constant("oexecute", 2, Constant::OtherExecute),
    constant("ox", 2, Constant::OtherExecute),
    constant("read", 1, Constant::Read),
    constant("write", 1, Constant::Write),
    constant("execute", 2, Constant::Execute),
    constant("x", 1, Constant::Execute),
    constant("noowner", 3, Constant::NoOwner),
    constant("noacache", 3, Constant::NoAttrCache),
    constant("nodatacache", 3, Constant::NoDataCache),
    constant("snapshot", 2, Constant::Snapshot),
    constant("undeletable", 2, Constant::Undeletable),
    constant("appendonly", 2, Constant::AppendOnly),
    constant("immutable", 2, Constant::Immutable),
];

/// Resolves a (case-insensitive) word against the keyword table.
pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    let lower = word.to_ascii_lowercase();
    KEYWORDS
        .iter()
        .find(|entry| lower.len() >= entry.min_len && entry.canonical.starts_with(&lower))
        .map(|entry| entry.keyword)
}

/// Splits an expression into tokens; whitespace is spaces and tabs.
pub struct Lexer<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            position: 0,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::End;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.input.get(self.position + offset).copied()
    }

    fn skip_blanks(&mut self) {
        while matches!(self.peek(0), Some(b' ') | Some(b'\t')) {
            self.position += 1;
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_blanks();
        let start = self.position;
        let kind = match self.peek(0) {
            // a line terminator ends the expression like the end of input
            None | Some(b'\r') | Some(b'\n') => TokenKind::End,
            Some(c) if c.is_ascii_digit() => TokenKind::Number(self.number()),
            Some(c) if c.is_ascii_alphabetic() => self.identifier(),
            Some(c) => match self.symbol(c) {
                Some(symbol) => TokenKind::Symbol(symbol),
                None => TokenKind::Stray,
            },
        };
        Token {
            kind,
            position: start,
        }
    }

    fn digits(&mut self, radix: u32) -> u64 {
        let mut value = 0u64;
        while let Some(digit) = self.peek(0).and_then(|c| (c as char).to_digit(radix)) {
            value = value
                .wrapping_mul(u64::from(radix))
                .wrapping_add(u64::from(digit));
            self.position += 1;
        }
        value
    }

    fn number(&mut self) -> u64 {
        if self.peek(0) != Some(b'0') {
            return self.digits(10);
        }
        self.position += 1;
        match self.peek(0) {
            Some(b'x') => {
                self.position += 1;
                self.digits(16)
            }
            Some(b'b') => {
                self.position += 1;
                self.digits(2)
            }
            _ => self.digits(8),
        }
    }

    fn identifier(&mut self) -> TokenKind {
        let start = self.position;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.position += 1;
        }
        // the slice is pure ASCII letters
        let word = std::str::from_utf8(&self.input[start..self.position]).unwrap_or_default();
        match lookup_keyword(word) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::UnknownIdentifier,
        }
    }

    fn symbol(&mut self, first: u8) -> Option<Symbol> {
        let second = self.peek(1);
        let (symbol, width) = match (first, second) {
            (b'<', Some(b'<')) => (Symbol::ShiftLeft, 2),
            (b'>', Some(b'>')) => (Symbol::ShiftRight, 2),
            (b'<', Some(b'=')) => (Symbol::LessEqual, 2),
            (b'>', Some(b'=')) => (Symbol::GreaterEqual, 2),
            (b'=', Some(b'=')) => (Symbol::EqualEqual, 2),
            (b'!', Some(b'=')) => (Symbol::NotEqual, 2),
            (b'&', Some(b'&')) => (Symbol::AmpAmp, 2),
            (b'|', Some(b'|')) => (Symbol::PipePipe, 2),
            (b'^', Some(b'^')) => (Symbol::CaretCaret, 2),
            (b'+', _) => (Symbol::Plus, 1),
            (b'-', _) => (Symbol::Minus, 1),
            (b'*', _) => (Symbol::Star, 1),
            (b'/', _) => (Symbol::Slash, 1),
            (b'%', _) => (Symbol::Percent, 1),
            (b'<', _) => (Symbol::Less, 1),
            (b'>', _) => (Symbol::Greater, 1),
            (b'&', _) => (Symbol::Amp, 1),
            (b'^', _) => (Symbol::Caret, 1),
            (b'|', _) => (Symbol::Pipe, 1),
            (b'!', _) => (Symbol::Bang, 1),
            (b'~', _) => (Symbol::Tilde, 1),
            (b'?', _) => (Symbol::Question, 1),
            (b':', _) => (Symbol::Colon, 1),
            (b'(', _) => (Symbol::OpenParen, 1),
            (b')', _) => (Symbol::CloseParen, 1),
            _ => return None,
        };
        self.position += width;
        Some(symbol)
    }
}
