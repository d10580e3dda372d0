//! Evaluation of an expression tree against one inode record.

use super::ast::{BinaryOp, Field, Node, UnaryOp};
use crate::types::NodeRecord;

fn read_field(field: Field, record: &NodeRecord, chunk_id: u64) -> u64 {
    match field {
        Field::Inode => u64::from(record.inode),
        Field::Type => u64::from(record.kind.as_u8()),
        Field::Eattr => u64::from(record.eattr),
        Field::Sclass => u64::from(record.sclass),
        Field::Uid => u64::from(record.uid),
        Field::Gid => u64::from(record.gid),
        Field::Mode => u64::from(record.mode),
        Field::Umode => u64::from((record.mode >> 6) & 7),
        Field::Gmode => u64::from((record.mode >> 3) & 7),
        Field::Omode => u64::from(record.mode & 7),
        Field::Atime => u64::from(record.atime),
        Field::Mtime => u64::from(record.mtime),
        Field::Ctime => u64::from(record.ctime),
        Field::Tretention => u64::from(record.tretention),
        Field::Length => record.length,
        Field::Major => u64::from(record.major),
        Field::Minor => u64::from(record.minor),
        // NODE records carry no such timestamp
        Field::Time => 0,
        Field::ChunkId => chunk_id,
    }
}

fn truth(value: bool) -> u64 {
    u64::from(value)
}

pub fn evaluate(node: &Node, record: &NodeRecord, chunk_id: u64) -> u64 {
    match node {
        Node::Number(value) => *value,
        Node::Constant(constant) => constant.value(),
        Node::Field(field) => read_field(*field, record, chunk_id),
        Node::Unary(op, operand) => {
            let value = evaluate(operand, record, chunk_id);
            match op {
                UnaryOp::Negate => value.wrapping_neg(),
                UnaryOp::LogicalNot => truth(value == 0),
                UnaryOp::BitNot => !value,
            }
        }
        Node::Binary(op, lhs, rhs) => evaluate_binary(*op, lhs, rhs, record, chunk_id),
        Node::Conditional {
            condition,
            then,
            otherwise,
        } => {
            if evaluate(condition, record, chunk_id) != 0 {
                evaluate(then, record, chunk_id)
            } else {
                otherwise
                    .as_ref()
                    .map_or(0, |node| evaluate(node, record, chunk_id))
            }
        }
    }
}

fn evaluate_binary(
    op: BinaryOp,
    lhs: &Node,
    rhs: &Node,
    record: &NodeRecord,
    chunk_id: u64,
) -> u64 {
    let a = evaluate(lhs, record, chunk_id);
    let b = || evaluate(rhs, record, chunk_id);
    match op {
        BinaryOp::LogicalAnd => truth(a != 0 && b() != 0),
        BinaryOp::LogicalOr => truth(a != 0 || b() != 0),
        BinaryOp::LogicalXor => truth((a != 0) != (b() != 0)),
        BinaryOp::Mul => a.wrapping_mul(b()),
        BinaryOp::Div => a.checked_div(b()).unwrap_or_else(|| {
            log::warn!("division by zero in expression (inode {})", record.inode);
            0
        }),
        BinaryOp::Mod => a.checked_rem(b()).unwrap_or_else(|| {
            log::warn!("modulo by zero in expression (inode {})", record.inode);
            0
        }),
        BinaryOp::Add => a.wrapping_add(b()),
        BinaryOp::Sub => a.wrapping_sub(b()),
        BinaryOp::ShiftLeft => shift_amount(b()).map_or(0, |shift| a << shift),
        BinaryOp::ShiftRight => shift_amount(b()).map_or(0, |shift| a >> shift),
        BinaryOp::Less => truth(a < b()),
        BinaryOp::LessEqual => truth(a <= b()),
        BinaryOp::Greater => truth(a > b()),
        BinaryOp::GreaterEqual => truth(a >= b()),
        BinaryOp::Equal => truth(a == b()),
        BinaryOp::NotEqual => truth(a != b()),
        BinaryOp::BitAnd => a & b(),
        BinaryOp::BitXor => a ^ b(),
        BinaryOp::BitOr => a | b(),
    }
}

/// Shifts by 64 or more bits clear the value
fn shift_amount(value: u64) -> Option<u32> {
    (value < 64).then_some(value as u32)
}
