//! Recursive-descent parser with one function per precedence level.
//!
//! Lowest to highest: `?:`, `||`, `^^`, `&&`, `|`, `^`, `&`, `== !=`,
//! `< <= > >=`, `<< >>`, `+ -`, `* / %`, unary `- ! ~`, primary.
//! `?:`, `||` and `&&` associate to the right, everything else to the left.

use super::ParseError;
use super::ParseErrorKind;
use super::ast::{BinaryOp, Node, UnaryOp};
use super::token::{Keyword, Lexer, Symbol, Token, TokenKind};

/// One left-associative binary level: symbols it accepts and the ops they map to
type Level = &'static [(Symbol, BinaryOp)];

const BIT_OR: Level = &[(Symbol::Pipe, BinaryOp::BitOr)];
const BIT_XOR: Level = &[(Symbol::Caret, BinaryOp::BitXor)];
const BIT_AND: Level = &[(Symbol::Amp, BinaryOp::BitAnd)];
const EQUALITY: Level = &[
    (Symbol::EqualEqual, BinaryOp::Equal),
    (Symbol::NotEqual, BinaryOp::NotEqual),
];
const RELATIONAL: Level = &[
    (Symbol::Less, BinaryOp::Less),
    (Symbol::LessEqual, BinaryOp::LessEqual),
    (Symbol::Greater, BinaryOp::Greater),
    (Symbol::GreaterEqual, BinaryOp::GreaterEqual),
];
const SHIFT: Level = &[
    (Symbol::ShiftLeft, BinaryOp::ShiftLeft),
    (Symbol::ShiftRight, BinaryOp::ShiftRight),
];
const ADDITIVE: Level = &[(Symbol::Plus, BinaryOp::Add), (Symbol::Minus, BinaryOp::Sub)];
const MULTIPLICATIVE: Level = &[
    (Symbol::Star, BinaryOp::Mul),
    (Symbol::Slash, BinaryOp::Div),
    (Symbol::Percent, BinaryOp::Mod),
];

/// Left-associative levels from loosest to tightest, below `&&`
const LEFT_LEVELS: &[Level] = &[
    BIT_OR,
    BIT_XOR,
    BIT_AND,
    EQUALITY,
    RELATIONAL,
    SHIFT,
    ADDITIVE,
    MULTIPLICATIVE,
];

pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            cursor: 0,
        }
    }

    /// Parses a complete expression; anything left over is an error.
    pub fn parse(mut self, source: &str) -> Result<Node, ParseError> {
        let root = self.conditional(source)?;
        let rest = self.peek();
        if rest.kind != TokenKind::End {
            return Err(ParseError::new(
                ParseErrorKind::TrailingGarbage,
                source,
                rest.position,
            ));
        }
        Ok(root)
    }

    fn peek(&self) -> Token {
        // the token list always ends with End, which is never consumed
        self.tokens[self.cursor.min(self.tokens.len() - 1)]
    }

    fn eat(&mut self, symbol: Symbol) -> bool {
        if self.peek().kind == TokenKind::Symbol(symbol) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn conditional(&mut self, source: &str) -> Result<Node, ParseError> {
        let condition = self.logical_or(source)?;
        if !self.eat(Symbol::Question) {
            return Ok(condition);
        }
        let then = self.conditional(source)?;
        let otherwise = if self.eat(Symbol::Colon) {
            Some(Box::new(self.conditional(source)?))
        } else {
            None
        };
        Ok(Node::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise,
        })
    }

    fn logical_or(&mut self, source: &str) -> Result<Node, ParseError> {
        let lhs = self.logical_xor(source)?;
        if self.eat(Symbol::PipePipe) {
            let rhs = self.logical_or(source)?;
            return Ok(Node::binary(BinaryOp::LogicalOr, lhs, rhs));
        }
        Ok(lhs)
    }

    fn logical_xor(&mut self, source: &str) -> Result<Node, ParseError> {
        let mut lhs = self.logical_and(source)?;
        while self.eat(Symbol::CaretCaret) {
            let rhs = self.logical_and(source)?;
            lhs = Node::binary(BinaryOp::LogicalXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn logical_and(&mut self, source: &str) -> Result<Node, ParseError> {
        let lhs = self.left_level(source, 0)?;
        if self.eat(Symbol::AmpAmp) {
            let rhs = self.logical_and(source)?;
            return Ok(Node::binary(BinaryOp::LogicalAnd, lhs, rhs));
        }
        Ok(lhs)
    }

    fn left_level(&mut self, source: &str, depth: usize) -> Result<Node, ParseError> {
        let Some(level) = LEFT_LEVELS.get(depth) else {
            return self.unary(source);
        };
        let mut lhs = self.left_level(source, depth + 1)?;
        'operators: loop {
            for &(symbol, op) in level.iter() {
                if self.eat(symbol) {
                    let rhs = self.left_level(source, depth + 1)?;
                    lhs = Node::binary(op, lhs, rhs);
                    continue 'operators;
                }
            }
            return Ok(lhs);
        }
    }

    fn unary(&mut self, source: &str) -> Result<Node, ParseError> {
        let op = match self.peek().kind {
            TokenKind::Symbol(Symbol::Minus) => UnaryOp::Negate,
            TokenKind::Symbol(Symbol::Bang) => UnaryOp::LogicalNot,
            TokenKind::Symbol(Symbol::Tilde) => UnaryOp::BitNot,
            _ => return self.primary(source),
        };
        self.cursor += 1;
        let operand = self.unary(source)?;
        Ok(Node::unary(op, operand))
    }

    fn primary(&mut self, source: &str) -> Result<Node, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Number(value) => {
                self.cursor += 1;
                Ok(Node::Number(value))
            }
            TokenKind::Keyword(Keyword::Field(field)) => {
                self.cursor += 1;
                Ok(Node::Field(field))
            }
            TokenKind::Keyword(Keyword::Constant(constant)) => {
                self.cursor += 1;
                Ok(Node::Constant(constant))
            }
            TokenKind::Symbol(Symbol::OpenParen) => {
                self.cursor += 1;
                let inner = self.conditional(source)?;
                if !self.eat(Symbol::CloseParen) {
                    return Err(ParseError::new(
                        ParseErrorKind::ClosingBracketExpected,
                        source,
                        self.peek().position,
                    ));
                }
                Ok(inner)
            }
            TokenKind::UnknownIdentifier => Err(ParseError::new(
                ParseErrorKind::UnknownIdentifier,
                source,
                token.position,
            )),
            _ => Err(ParseError::new(
                ParseErrorKind::UnexpectedSymbol,
                source,
                token.position,
            )),
        }
    }
}
