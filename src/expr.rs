//! Immutable expression trees.
//!
//! An expression is either a concrete 256-bit value or an opcode applied to
//! child expressions. Trees are never mutated once built; every rewrite
//! allocates a fresh tree and may share subtrees with its input.

use crate::errors::ExprError;
use crate::opcode::Opcode;
use crate::word::{self, u256_serde, Word};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbolic expression tree node.
///
/// The child count of a `Node` always equals the opcode's declared arity;
/// the constructors enforce this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Concrete 256-bit value.
    Val(#[serde(with = "u256_serde")] Word),
    /// An opcode applied to its operands.
    Node(Opcode, Vec<Expr>),
}

impl Expr {
    // -- Convenience constructors ------------------------------------------

    /// Create a value expression from a `u64`.
    pub fn val(v: u64) -> Self {
        Expr::Val(Word::from(v))
    }

    /// Create a value expression from a full-width word.
    pub fn val_word(v: Word) -> Self {
        Expr::Val(v)
    }

    /// The zero expression.
    pub fn zero() -> Self {
        Expr::Val(Word::zero())
    }

    /// The one expression.
    pub fn one() -> Self {
        Expr::Val(Word::one())
    }

    /// Create a node, checking the child count against the opcode's arity.
    pub fn try_node(op: Opcode, children: Vec<Expr>) -> Result<Self, ExprError> {
        if children.len() != op.arity() {
            return Err(ExprError::ArityMismatch {
                opcode: op,
                expected: op.arity(),
                got: children.len(),
            });
        }
        Ok(Expr::Node(op, children))
    }

    /// Create a node. Panics when the child count disagrees with the
    /// opcode's arity; that is a caller contract violation, not a
    /// recoverable condition.
    pub fn node(op: Opcode, children: Vec<Expr>) -> Self {
        match Self::try_node(op, children) {
            Ok(e) => e,
            Err(e) => panic!("malformed expression: {e}"),
        }
    }

    /// Create a node with zero children (e.g. `address`, `caller`).
    pub fn node0(op: Opcode) -> Self {
        Self::node(op, vec![])
    }

    /// Create a node with one child.
    pub fn node1(op: Opcode, a: Expr) -> Self {
        Self::node(op, vec![a])
    }

    /// Create a node with two children.
    pub fn node2(op: Opcode, a: Expr, b: Expr) -> Self {
        Self::node(op, vec![a, b])
    }

    /// Create a node with three children (`addmod`, `mulmod`).
    pub fn node3(op: Opcode, a: Expr, b: Expr, c: Expr) -> Self {
        Self::node(op, vec![a, b, c])
    }

    // -- Predicates --------------------------------------------------------

    /// Return the opcode if this is a `Node`, `None` otherwise.
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Expr::Node(op, _) => Some(*op),
            _ => None,
        }
    }

    /// Return the children if this is a `Node`.
    pub fn children(&self) -> Option<&[Expr]> {
        match self {
            Expr::Node(_, ch) => Some(ch.as_slice()),
            _ => None,
        }
    }

    /// Return `true` if the expression is a concrete value.
    pub fn is_val(&self) -> bool {
        matches!(self, Expr::Val(_))
    }

    /// Try to extract a concrete word.
    pub fn as_val(&self) -> Option<Word> {
        match self {
            Expr::Val(v) => Some(*v),
            _ => None,
        }
    }

    /// Check if this is the zero value.
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Val(v) if v.is_zero())
    }

    // -- Reference evaluation ----------------------------------------------

    /// Evaluate the tree to a concrete word.
    ///
    /// Returns `None` as soon as any node is not computable at compile time
    /// (the address-producing opcodes have no known value here).
    pub fn eval(&self) -> Option<Word> {
        match self {
            Expr::Val(v) => Some(*v),
            Expr::Node(op, children) => {
                let mut args = Vec::with_capacity(children.len());
                for c in children {
                    args.push(c.eval()?);
                }
                word::eval(*op, &args)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Val(v) => {
                if *v <= Word::from(9999u64) {
                    write!(f, "{v}")
                } else {
                    write!(f, "0x{v:x}")
                }
            }
            Expr::Node(op, children) => {
                if children.is_empty() {
                    return write!(f, "{op}");
                }
                write!(f, "({op}")?;
                for c in children {
                    write!(f, " {c}")?;
                }
                write!(f, ")")
            }
        }
    }
}
