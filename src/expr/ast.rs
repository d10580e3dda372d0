//! Expression tree and its canonical rendering.

use std::fmt;

/// Inode record attributes an expression can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Inode,
    Type,
    Eattr,
    Sclass,
    Uid,
    Gid,
    Mode,
    Umode,
    Gmode,
    Omode,
    Atime,
    Mtime,
    Ctime,
    Tretention,
    Length,
    Major,
    Minor,
    Time,
    ChunkId,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Inode => "inode",
            Field::Type => "type",
            Field::Eattr => "eattr",
            Field::Sclass => "sclass",
            Field::Uid => "uid",
            Field::Gid => "gid",
            Field::Mode => "mode",
            Field::Umode => "umode",
            Field::Gmode => "gmode",
            Field::Omode => "omode",
            Field::Atime => "atime",
            Field::Mtime => "mtime",
            Field::Ctime => "ctime",
            Field::Tretention => "tretention",
            Field::Length => "length",
            Field::Major => "major",
            Field::Minor => "minor",
            Field::Time => "time",
            Field::ChunkId => "chunkid",
        }
    }
}

/// Named constants: object types, mode bits and eattr flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constant {
    File,
    Directory,
    Symlink,
    Fifo,
    BlockDev,
    CharDev,
    Socket,
    Trash,
    Sustained,
    Suid,
    Sgid,
    Sticky,
    UserRead,
    UserWrite,
    UserExecute,
    GroupRead,
    GroupWrite,
    GroupExecute,
    OtherRead,
    OtherWrite,
    OtherExecute,
    Read,
    Write,
    Execute,
    NoOwner,
    NoAttrCache,
    NoDataCache,
    Snapshot,
    Undeletable,
    AppendOnly,
    Immutable,
}

impl Constant {
    pub fn value(self) -> u64 {
        match self {
            Constant::File => 1,
            Constant::Directory => 2,
            Constant::Symlink => 3,
            Constant::Fifo => 4,
            Constant::BlockDev => 5,
            Constant::CharDev => 6,
            Constant::Socket => 7,
            Constant::Trash => 8,
            Constant::Sustained => 9,
            Constant::Suid => 0o4000,
            Constant::Sgid => 0o2000,
            Constant::Sticky => 0o1000,
            Constant::UserRead => 0o400,
            Constant::UserWrite => 0o200,
            Constant::UserExecute => 0o100,
            Constant::GroupRead => 0o040,
            Constant::GroupWrite => 0o020,
            Constant::GroupExecute => 0o010,
            Constant::OtherRead => 0o004,
            Constant::OtherWrite => 0o002,
            Constant::OtherExecute => 0o001,
            Constant::Read => 4,
            Constant::Write => 2,
            Constant::Execute => 1,
            Constant::NoOwner => 0x01,
            Constant::NoAttrCache => 0x02,
            Constant::NoDataCache => 0x08,
            Constant::Snapshot => 0x10,
            Constant::Undeletable => 0x20,
            Constant::AppendOnly => 0x40,
            Constant::Immutable => 0x80,
        }
    }

    /// Rendering name; permission bits use their short forms
    pub fn name(self) -> &'static str {
        match self {
            Constant::File => "file",
            Constant::Directory => "directory",
            Constant::Symlink => "symlink",
            Constant::Fifo => "fifo",
            Constant::BlockDev => "blockdev",
            Constant::CharDev => "chardev",
            Constant::Socket => "socket",
            Constant::Trash => "trash",
            Constant::Sustained => "sustained",
            Constant::Suid => "suid",
            Constant::Sgid => "sgid",
            Constant::Sticky => "sticky",
            Constant::UserRead => "ur",
            Constant::UserWrite => "uw",
            Constant::UserExecute => "ux",
            Constant::GroupRead => "gr",
            Constant::GroupWrite => "gw",
            Constant::GroupExecute => "gx",
            Constant::OtherRead => "or",
            Constant::OtherWrite => "ow",
            Constant::OtherExecute => "ox",
            Constant::Read => "read",
            Constant::Write => "write",
            Constant::Execute => "execute",
            Constant::NoOwner => "noowner",
            Constant::NoAttrCache => "noacache",
            Constant::NoDataCache => "nodatacache",
            Constant::Snapshot => "snapshot",
            Constant::Undeletable => "undeletable",
            Constant::AppendOnly => "appendonly",
            Constant::Immutable => "immutable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::LogicalNot => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    ShiftLeft,
    ShiftRight,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalXor,
    LogicalOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalXor => "^^",
            BinaryOp::LogicalOr => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Number(u64),
    Constant(Constant),
    Field(Field),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    /// `cond ? then : otherwise`; a missing else-branch evaluates to 0
    Conditional {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Option<Box<Node>>,
    },
}

impl Node {
    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Node, rhs: Node) -> Self {
        Node::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    /// True when any leaf reads the chunk id
    pub fn reads_chunk_id(&self) -> bool {
        match self {
            Node::Field(Field::ChunkId) => true,
            Node::Number(_) | Node::Constant(_) | Node::Field(_) => false,
            Node::Unary(_, operand) => operand.reads_chunk_id(),
            Node::Binary(_, lhs, rhs) => lhs.reads_chunk_id() || rhs.reads_chunk_id(),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                condition.reads_chunk_id()
                    || then.reads_chunk_id()
                    || otherwise.as_ref().is_some_and(|node| node.reads_chunk_id())
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(value) => write!(f, "{value}"),
            Node::Constant(constant) => f.write_str(constant.name()),
            Node::Field(field) => f.write_str(field.name()),
            Node::Unary(op, operand) => write!(f, "({}{})", op.symbol(), operand),
            Node::Binary(op, lhs, rhs) => write!(f, "({}{}{})", lhs, op.symbol(), rhs),
            Node::Conditional {
                condition,
                then,
                otherwise,
            } => {
                write!(f, "({condition}?{then}:")?;
                match otherwise {
                    Some(node) => write!(f, "{node})"),
                    None => f.write_str("0)"),
                }
            }
        }
    }
}
