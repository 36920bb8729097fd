//! Pattern matching on expression trees.
//!
//! A pattern is an expression skeleton with typed holes. Matching binds each
//! hole to the subtree it covers; a hole that occurs more than once must
//! bind structurally equal subtrees every time.

use crate::expr::Expr;
use crate::opcode::Opcode;
use crate::word::{u256_serde, Word};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The five placeholders the rule catalog is written against.
///
/// `A`, `B` and `C` stand for compile-time constants only; `X` and `Y` stand
/// for arbitrary expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    A,
    B,
    C,
    X,
    Y,
}

impl Placeholder {
    /// Whether this placeholder only matches a concrete value.
    pub fn constant_only(self) -> bool {
        matches!(self, Placeholder::A | Placeholder::B | Placeholder::C)
    }

    pub fn name(self) -> &'static str {
        match self {
            Placeholder::A => "A",
            Placeholder::B => "B",
            Placeholder::C => "C",
            Placeholder::X => "X",
            Placeholder::Y => "Y",
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rule's left-hand side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// A typed hole, bound on first encounter.
    Slot(Placeholder),
    /// Match exactly this concrete value.
    Val(#[serde(with = "u256_serde")] Word),
    /// Match a node with this opcode and matching children.
    Node(Opcode, Vec<Pattern>),
}

impl Pattern {
    /// A pattern matching a specific small value.
    pub fn val(v: u64) -> Self {
        Pattern::Val(Word::from(v))
    }

    /// A pattern matching a node with the given opcode and child patterns.
    pub fn node(op: Opcode, children: Vec<Pattern>) -> Self {
        Pattern::Node(op, children)
    }

    /// Number of times a placeholder occurs in this pattern.
    ///
    /// A non-linear pattern mentions the same placeholder more than once;
    /// each occurrence stands for a separate evaluation of the bound
    /// operand.
    pub fn occurrences(&self, slot: Placeholder) -> usize {
        match self {
            Pattern::Slot(s) => usize::from(*s == slot),
            Pattern::Val(_) => 0,
            Pattern::Node(_, children) => {
                children.iter().map(|c| c.occurrences(slot)).sum()
            }
        }
    }
}

impl From<Placeholder> for Pattern {
    fn from(slot: Placeholder) -> Self {
        Pattern::Slot(slot)
    }
}

impl From<u64> for Pattern {
    fn from(v: u64) -> Self {
        Pattern::val(v)
    }
}

impl From<Word> for Pattern {
    fn from(v: Word) -> Self {
        Pattern::Val(v)
    }
}

/// The result of a successful match: what each placeholder was bound to.
#[derive(Debug, Clone, Default)]
pub struct Match {
    bindings: HashMap<Placeholder, Expr>,
}

impl Match {
    /// Retrieve the expression bound to a placeholder.
    pub fn get(&self, slot: Placeholder) -> Option<&Expr> {
        self.bindings.get(&slot)
    }

    /// Retrieve the concrete word bound to a placeholder, or `None` if the
    /// placeholder is unbound or bound to a non-constant.
    pub fn get_val(&self, slot: Placeholder) -> Option<Word> {
        self.bindings.get(&slot).and_then(|e| e.as_val())
    }

    /// Iterate over all bound placeholders.
    pub fn iter(&self) -> impl Iterator<Item = (Placeholder, &Expr)> {
        self.bindings.iter().map(|(slot, expr)| (*slot, expr))
    }

    fn bind(&mut self, slot: Placeholder, expr: &Expr) -> bool {
        if let Some(existing) = self.bindings.get(&slot) {
            // Non-linear occurrence: must be structurally equal to the
            // first binding, never compared by identity.
            existing == expr
        } else {
            self.bindings.insert(slot, expr.clone());
            true
        }
    }
}

/// Try to match `expr` against `pattern`.
///
/// Returns the completed bindings on success, `None` on failure. A failed
/// match leaves no observable state behind; partially filled bindings are
/// simply dropped.
pub fn match_expr(expr: &Expr, pattern: &Pattern) -> Option<Match> {
    let mut m = Match::default();
    if match_helper(expr, pattern, &mut m) {
        Some(m)
    } else {
        None
    }
}

fn match_helper(expr: &Expr, pattern: &Pattern, m: &mut Match) -> bool {
    match pattern {
        Pattern::Slot(slot) => {
            if slot.constant_only() && !expr.is_val() {
                return false;
            }
            m.bind(*slot, expr)
        }
        Pattern::Val(v) => {
            matches!(expr, Expr::Val(ev) if ev == v)
        }
        Pattern::Node(op, children) => {
            if let Expr::Node(eop, echildren) = expr {
                // Children are matched left to right; order is significant.
                eop == op
                    && echildren.len() == children.len()
                    && children
                        .iter()
                        .zip(echildren)
                        .all(|(p, e)| match_helper(e, p, m))
            } else {
                false
            }
        }
    }
}
