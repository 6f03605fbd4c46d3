//! Recursive-descent parser for engagement formulas.
//!
//! Grammar:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | METRIC | '(' expr ')'
//! ```

use engagedb_core::Metric;

use super::lexer::{Token, TokenKind};
use crate::error::FormulaError;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Metric(Metric),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub(crate) fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Evaluate against a lookup. `None` marks an undefined result: division
    /// by zero or any non-finite intermediate value.
    pub(crate) fn eval(&self, lookup: &impl Fn(Metric) -> f64) -> Option<f64> {
        let value = match self {
            Expr::Number(n) => *n,
            Expr::Metric(m) => lookup(*m),
            Expr::Neg(inner) => -inner.eval(lookup)?,
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(lookup)?;
                let r = rhs.eval(lookup)?;
                match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => {
                        if r == 0.0 {
                            return None;
                        }
                        l / r
                    }
                }
            }
        };
        value.is_finite().then_some(value)
    }

    pub(crate) fn collect_metrics(&self, out: &mut Vec<Metric>) {
        match self {
            Expr::Number(_) => {}
            Expr::Metric(m) => {
                if !out.contains(m) {
                    out.push(*m);
                }
            }
            Expr::Neg(inner) => inner.collect_metrics(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_metrics(out);
                rhs.collect_metrics(out);
            }
        }
    }
}

pub(crate) fn parse(tokens: &[Token]) -> Result<Expr, FormulaError> {
    if tokens.is_empty() {
        return Err(FormulaError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    if let Some(tok) = parser.peek() {
        return Err(FormulaError::UnexpectedToken {
            found: tok.kind.describe(),
            offset: tok.offset,
        });
    }

    Ok(expr)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn descend(&mut self) -> Result<(), FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep { max: MAX_DEPTH });
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        self.descend()?;
        let mut lhs = self.term()?;
        while let Some(tok) = self.peek() {
            let op = match tok.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        self.depth -= 1;
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(tok) = self.peek() {
            let op = match tok.kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, FormulaError> {
        match self.peek().map(|t| t.kind) {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner)))
            }
            Some(TokenKind::Plus) => {
                self.pos += 1;
                self.descend()?;
                let inner = self.unary()?;
                self.depth -= 1;
                Ok(inner)
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let tok = self.next().ok_or(FormulaError::UnexpectedEnd)?;
        match tok.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Metric(m) => Ok(Expr::Metric(m)),
            TokenKind::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => Ok(inner),
                    Some(other) => Err(FormulaError::UnexpectedToken {
                        found: other.kind.describe(),
                        offset: other.offset,
                    }),
                    None => Err(FormulaError::UnclosedParen { offset: tok.offset }),
                }
            }
            other => Err(FormulaError::UnexpectedToken {
                found: other.describe(),
                offset: tok.offset,
            }),
        }
    }
}
