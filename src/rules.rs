//! The simplification rule catalog.
//!
//! A rule pairs a left-hand pattern with a recipe for building the cheaper
//! replacement and a flag saying whether matched operands may be thrown
//! away. The catalog is built once and never changes; rewrites walk it in
//! order and apply the first rule that fits.
//!
//! Replacement recipes are data, not closures, so a catalog can be
//! serialized and inspected: see [`Rhs`].

use crate::expr::Expr;
use crate::matcher::{Match, Pattern, Placeholder};
use crate::opcode::Opcode;
use crate::word::{self, u256_serde, Word, ADDRESS_MASK, UINT_256_MAX};
use serde::{Deserialize, Serialize};

use Opcode::*;
use Placeholder::{A, B, C, X, Y};

// ---------------------------------------------------------------------------
// Replacement recipes
// ---------------------------------------------------------------------------

/// A rule's right-hand side: instructions for building the replacement tree
/// from the match bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rhs {
    /// Substitute the expression bound to a placeholder.
    Ref(Placeholder),
    /// A literal constant.
    Lit(#[serde(with = "u256_serde")] Word),
    /// Construct a node from sub-recipes.
    Build(Opcode, Vec<Rhs>),
    /// Evaluate the opcode over sub-recipes that instantiate to constants.
    Fold(Opcode, Vec<Rhs>),
    /// Unsigned compare of two constant sub-recipes, selecting a branch.
    IfLt {
        lhs: Box<Rhs>,
        rhs: Box<Rhs>,
        then: Box<Rhs>,
        otherwise: Box<Rhs>,
    },
}

impl Rhs {
    /// Build the replacement expression for a completed match.
    ///
    /// The catalog guarantees that every referenced placeholder is bound and
    /// that fold operands are constants; a violation means the catalog
    /// itself is malformed and is treated as a fatal assertion.
    pub fn instantiate(&self, m: &Match) -> Expr {
        match self {
            Rhs::Ref(slot) => match m.get(*slot) {
                Some(bound) => bound.clone(),
                None => panic!("placeholder {slot} unbound during substitution"),
            },
            Rhs::Lit(v) => Expr::Val(*v),
            Rhs::Build(op, children) => {
                Expr::node(*op, children.iter().map(|c| c.instantiate(m)).collect())
            }
            Rhs::Fold(op, children) => {
                let args: Vec<Word> = children.iter().map(|c| c.fold_value(m)).collect();
                match word::eval(*op, &args) {
                    Some(v) => Expr::Val(v),
                    None => panic!("{op} cannot be folded"),
                }
            }
            Rhs::IfLt {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                if lhs.fold_value(m) < rhs.fold_value(m) {
                    then.instantiate(m)
                } else {
                    otherwise.instantiate(m)
                }
            }
        }
    }

    fn fold_value(&self, m: &Match) -> Word {
        match self.instantiate(m) {
            Expr::Val(v) => v,
            other => panic!("fold operand is not a constant: {other}"),
        }
    }

    /// Every placeholder this recipe references, in first-use order.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut out = Vec::new();
        self.collect_placeholders(&mut out);
        out
    }

    fn collect_placeholders(&self, out: &mut Vec<Placeholder>) {
        match self {
            Rhs::Ref(slot) => {
                if !out.contains(slot) {
                    out.push(*slot);
                }
            }
            Rhs::Lit(_) => {}
            Rhs::Build(_, children) | Rhs::Fold(_, children) => {
                for c in children {
                    c.collect_placeholders(out);
                }
            }
            Rhs::IfLt {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                lhs.collect_placeholders(out);
                rhs.collect_placeholders(out);
                then.collect_placeholders(out);
                otherwise.collect_placeholders(out);
            }
        }
    }

    /// Number of times a placeholder's bound expression is instantiated by
    /// this recipe. Only one arm of a conditional runs, so a conditional
    /// contributes the smaller of its two branch counts.
    pub fn occurrences(&self, slot: Placeholder) -> usize {
        match self {
            Rhs::Ref(s) => usize::from(*s == slot),
            Rhs::Lit(_) => 0,
            Rhs::Build(_, children) | Rhs::Fold(_, children) => {
                children.iter().map(|c| c.occurrences(slot)).sum()
            }
            Rhs::IfLt {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                lhs.occurrences(slot)
                    + rhs.occurrences(slot)
                    + then.occurrences(slot).min(otherwise.occurrences(slot))
            }
        }
    }
}

impl From<Placeholder> for Rhs {
    fn from(slot: Placeholder) -> Self {
        Rhs::Ref(slot)
    }
}

impl From<u64> for Rhs {
    fn from(v: u64) -> Self {
        Rhs::Lit(Word::from(v))
    }
}

impl From<Word> for Rhs {
    fn from(v: Word) -> Self {
        Rhs::Lit(v)
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// One simplification: a shape to detect, a replacement recipe, and whether
/// matched operands may be discarded without preserving their evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub lhs: Pattern,
    pub rhs: Rhs,
    /// When true the rewrite throws away at least one matched arbitrary
    /// subexpression; the rewriter must then prove the discarded subtree
    /// side-effect-free before applying the rule.
    pub removable: bool,
}

impl Rule {
    fn new(lhs: Pattern, rhs: impl Into<Rhs>, removable: bool) -> Self {
        Rule {
            lhs,
            rhs: rhs.into(),
            removable,
        }
    }
}

/// The fixed, ordered list of simplification rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCatalog {
    rules: Vec<Rule>,
}

impl RuleCatalog {
    /// Build the full catalog.
    pub fn new() -> Self {
        let mut rules = Vec::new();
        constant_folding(&mut rules);
        constant_identities(&mut rules);
        self_combinations(&mut rules);
        logic_combinations(&mut rules);
        mod_power_of_two(&mut rules);
        address_masks(&mut rules);
        boolean_negations(&mut rules);
        associative_sinking(&mut rules);
        add_sub_sinking(&mut rules);
        RuleCatalog { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// -- Pattern / recipe shorthand ----------------------------------------------

fn p1(op: Opcode, a: impl Into<Pattern>) -> Pattern {
    Pattern::Node(op, vec![a.into()])
}

fn p2(op: Opcode, a: impl Into<Pattern>, b: impl Into<Pattern>) -> Pattern {
    Pattern::Node(op, vec![a.into(), b.into()])
}

fn p3(op: Opcode, a: impl Into<Pattern>, b: impl Into<Pattern>, c: impl Into<Pattern>) -> Pattern {
    Pattern::Node(op, vec![a.into(), b.into(), c.into()])
}

fn b1(op: Opcode, a: impl Into<Rhs>) -> Rhs {
    Rhs::Build(op, vec![a.into()])
}

fn b2(op: Opcode, a: impl Into<Rhs>, b: impl Into<Rhs>) -> Rhs {
    Rhs::Build(op, vec![a.into(), b.into()])
}

fn f1(op: Opcode, a: impl Into<Rhs>) -> Rhs {
    Rhs::Fold(op, vec![a.into()])
}

fn f2(op: Opcode, a: impl Into<Rhs>, b: impl Into<Rhs>) -> Rhs {
    Rhs::Fold(op, vec![a.into(), b.into()])
}

fn f3(op: Opcode, a: impl Into<Rhs>, b: impl Into<Rhs>, c: impl Into<Rhs>) -> Rhs {
    Rhs::Fold(op, vec![a.into(), b.into(), c.into()])
}

fn if_lt(lhs: impl Into<Rhs>, rhs: impl Into<Rhs>, then: Rhs, otherwise: Rhs) -> Rhs {
    Rhs::IfLt {
        lhs: Box::new(lhs.into()),
        rhs: Box::new(rhs.into()),
        then: Box::new(then),
        otherwise: Box::new(otherwise),
    }
}

// -- Family: arithmetic on constants -----------------------------------------

fn constant_folding(rules: &mut Vec<Rule>) {
    for op in [Add, SAdd, Mul, SMul, Sub, SSub, Div, SDiv, Mod, SMod, Exp] {
        rules.push(Rule::new(p2(op, A, B), f2(op, A, B), false));
    }
    rules.push(Rule::new(p1(Not, A), f1(Not, A), false));
    for op in [Lt, Gt, Slt, Sgt, Eq] {
        rules.push(Rule::new(p2(op, A, B), f2(op, A, B), false));
    }
    rules.push(Rule::new(p1(IsZero, A), f1(IsZero, A), false));
    for op in [And, Or, Xor, Byte] {
        rules.push(Rule::new(p2(op, A, B), f2(op, A, B), false));
    }
    rules.push(Rule::new(p3(AddMod, A, B, C), f3(AddMod, A, B, C), false));
    rules.push(Rule::new(p3(MulMod, A, B, C), f3(MulMod, A, B, C), false));
    // Shadowed by the row above, which always matches first.
    rules.push(Rule::new(p3(MulMod, A, B, C), f2(Mul, A, B), false));
    for op in [SignExtend, Shl, Shr] {
        rules.push(Rule::new(p2(op, A, B), f2(op, A, B), false));
    }
}

// -- Family: invariants involving known constants ----------------------------

fn constant_identities(rules: &mut Vec<Rule>) {
    rules.push(Rule::new(p2(Add, X, 0), X, false));
    rules.push(Rule::new(p2(Add, 0, X), X, false));
    rules.push(Rule::new(p2(SAdd, X, 0), X, false));
    rules.push(Rule::new(p2(SAdd, 0, X), X, false));
    rules.push(Rule::new(p2(Sub, X, 0), X, false));
    rules.push(Rule::new(p2(SSub, X, 0), X, false));
    rules.push(Rule::new(p2(Mul, X, 0), 0, true));
    rules.push(Rule::new(p2(Mul, 0, X), 0, true));
    rules.push(Rule::new(p2(Mul, X, 1), X, false));
    rules.push(Rule::new(p2(Mul, 1, X), X, false));
    rules.push(Rule::new(p2(Mul, X, UINT_256_MAX), b2(Sub, 0, X), false));
    rules.push(Rule::new(p2(Mul, UINT_256_MAX, X), b2(Sub, 0, X), false));
    rules.push(Rule::new(p2(SMul, X, 0), 0, true));
    rules.push(Rule::new(p2(SMul, 0, X), 0, true));
    rules.push(Rule::new(p2(SMul, X, 1), X, false));
    rules.push(Rule::new(p2(SMul, 1, X), X, false));
    rules.push(Rule::new(p2(SMul, X, UINT_256_MAX), b2(SSub, 0, X), false));
    rules.push(Rule::new(p2(SMul, UINT_256_MAX, X), b2(SSub, 0, X), false));
    rules.push(Rule::new(p2(Div, X, 0), 0, true));
    rules.push(Rule::new(p2(Div, 0, X), 0, true));
    rules.push(Rule::new(p2(Div, X, 1), X, false));
    rules.push(Rule::new(p2(SDiv, X, 0), 0, true));
    rules.push(Rule::new(p2(SDiv, 0, X), 0, true));
    rules.push(Rule::new(p2(SDiv, X, 1), X, false));
    rules.push(Rule::new(p2(And, X, UINT_256_MAX), X, false));
    rules.push(Rule::new(p2(And, UINT_256_MAX, X), X, false));
    rules.push(Rule::new(p2(And, X, 0), 0, true));
    rules.push(Rule::new(p2(And, 0, X), 0, true));
    rules.push(Rule::new(p2(Or, X, 0), X, false));
    rules.push(Rule::new(p2(Or, 0, X), X, false));
    rules.push(Rule::new(p2(Or, X, UINT_256_MAX), UINT_256_MAX, true));
    rules.push(Rule::new(p2(Or, UINT_256_MAX, X), UINT_256_MAX, true));
    rules.push(Rule::new(p2(Xor, X, 0), X, false));
    rules.push(Rule::new(p2(Xor, 0, X), X, false));
    rules.push(Rule::new(p2(Mod, X, 0), 0, true));
    rules.push(Rule::new(p2(Mod, 0, X), 0, true));
    rules.push(Rule::new(p2(Eq, X, 0), b1(IsZero, X), false));
    rules.push(Rule::new(p2(Eq, 0, X), b1(IsZero, X), false));
}

// -- Family: operations involving an expression and itself --------------------

fn self_combinations(rules: &mut Vec<Rule>) {
    rules.push(Rule::new(p2(And, X, X), X, true));
    rules.push(Rule::new(p2(Or, X, X), X, true));
    rules.push(Rule::new(p2(Xor, X, X), 0, true));
    rules.push(Rule::new(p2(Sub, X, X), 0, true));
    rules.push(Rule::new(p2(SSub, X, X), 0, true));
    rules.push(Rule::new(p2(Eq, X, X), 1, true));
    rules.push(Rule::new(p2(Lt, X, X), 0, true));
    rules.push(Rule::new(p2(Slt, X, X), 0, true));
    rules.push(Rule::new(p2(Gt, X, X), 0, true));
    rules.push(Rule::new(p2(Sgt, X, X), 0, true));
    rules.push(Rule::new(p2(Mod, X, X), 0, true));
}

// -- Family: logical instruction combinations ---------------------------------

fn logic_combinations(rules: &mut Vec<Rule>) {
    rules.push(Rule::new(p1(Not, p1(Not, X)), X, false));
    rules.push(Rule::new(p2(Xor, X, p2(Xor, X, Y)), Y, true));
    rules.push(Rule::new(p2(Xor, X, p2(Xor, Y, X)), Y, true));
    rules.push(Rule::new(p2(Xor, p2(Xor, X, Y), X), Y, true));
    rules.push(Rule::new(p2(Xor, p2(Xor, Y, X), X), Y, true));
    rules.push(Rule::new(p2(Or, X, p2(And, X, Y)), X, true));
    rules.push(Rule::new(p2(Or, X, p2(And, Y, X)), X, true));
    rules.push(Rule::new(p2(Or, p2(And, X, Y), X), X, true));
    rules.push(Rule::new(p2(Or, p2(And, Y, X), X), X, true));
    rules.push(Rule::new(p2(And, X, p2(Or, X, Y)), X, true));
    rules.push(Rule::new(p2(And, X, p2(Or, Y, X)), X, true));
    rules.push(Rule::new(p2(And, p2(Or, X, Y), X), X, true));
    rules.push(Rule::new(p2(And, p2(Or, Y, X), X), X, true));
    rules.push(Rule::new(p2(And, X, p1(Not, X)), 0, true));
    rules.push(Rule::new(p2(And, p1(Not, X), X), 0, true));
    rules.push(Rule::new(p2(Or, X, p1(Not, X)), UINT_256_MAX, true));
    rules.push(Rule::new(p2(Or, p1(Not, X), X), UINT_256_MAX, true));
}

// -- Family: mod by a power of two --------------------------------------------

/// `mod(X, 2^i)` keeps only the low `i` bits, which is a mask.
fn mod_power_of_two(rules: &mut Vec<Rule>) {
    for i in 0..256usize {
        let value = Word::one() << i;
        rules.push(Rule::new(
            p2(Mod, X, value),
            b2(And, X, value - Word::one()),
            false,
        ));
    }
}

// -- Family: address-width masks ----------------------------------------------

/// Opcodes that already produce a value fitting in 160 bits; masking them to
/// address width is a no-op.
fn address_masks(rules: &mut Vec<Rule>) {
    for op in [Address, Caller, Origin, Coinbase] {
        rules.push(Rule::new(
            p2(And, Pattern::Node(op, vec![]), ADDRESS_MASK),
            Rhs::Build(op, vec![]),
            false,
        ));
        rules.push(Rule::new(
            p2(And, ADDRESS_MASK, Pattern::Node(op, vec![])),
            Rhs::Build(op, vec![]),
            false,
        ));
    }
}

// -- Family: double negation of boolean results -------------------------------

fn boolean_negations(rules: &mut Vec<Rule>) {
    for op in [Eq, Lt, Slt, Gt, Sgt] {
        rules.push(Rule::new(
            p1(IsZero, p1(IsZero, p2(op, X, Y))),
            b2(op, X, Y),
            false,
        ));
    }
    rules.push(Rule::new(
        p1(IsZero, p1(IsZero, p1(IsZero, X))),
        b1(IsZero, X),
        false,
    ));
    rules.push(Rule::new(p1(IsZero, p2(Xor, X, Y)), b2(Eq, X, Y), false));
}

// -- Family: associative operations -------------------------------------------

/// Move constants outward through commutative-associative chains. The
/// constant-combining rules come before the expression-reordering ones, and
/// non-constant operands are never reordered beyond what commutativity of
/// the operation already permits.
fn associative_sinking(rules: &mut Vec<Rule>) {
    for op in [Add, SAdd, Mul, SMul, And, Or, Xor] {
        for xa in [[Pattern::from(X), Pattern::from(A)], [Pattern::from(A), Pattern::from(X)]] {
            let inner = Pattern::Node(op, xa.to_vec());
            // (X+A)+B -> X+(A+B)
            rules.push(Rule::new(
                p2(op, inner.clone(), B),
                b2(op, X, f2(op, A, B)),
                false,
            ));
            // (X+A)+Y -> (X+Y)+A
            rules.push(Rule::new(
                p2(op, inner.clone(), Y),
                b2(op, b2(op, X, Y), A),
                false,
            ));
            // B+(X+A) -> X+(A+B)
            rules.push(Rule::new(
                p2(op, B, inner.clone()),
                b2(op, X, f2(op, A, B)),
                false,
            ));
            // Y+(X+A) -> (Y+X)+A
            rules.push(Rule::new(p2(op, Y, inner), b2(op, b2(op, Y, X), A), false));
        }
    }
}

// -- Family: add/sub interaction ----------------------------------------------

fn add_sub_sinking(rules: &mut Vec<Rule>) {
    for (add, sub) in [(Add, Sub), (SAdd, SSub)] {
        for xa in [[Pattern::from(X), Pattern::from(A)], [Pattern::from(A), Pattern::from(X)]] {
            let add_xa = Pattern::Node(add, xa.to_vec());
            // (X + A) - B -> X + (A - B), X - (B - A)
            rules.push(Rule::new(
                p2(sub, add_xa.clone(), B),
                if_lt(A, B, b2(sub, X, f2(Sub, B, A)), b2(add, X, f2(Sub, A, B))),
                false,
            ));
            // B - (X + A) -> (B - A) - X
            rules.push(Rule::new(
                p2(sub, B, add_xa),
                b2(sub, f2(Sub, B, A), X),
                false,
            ));
        }
        // (X - A) + B -> X + (B - A), X - (A - B)
        rules.push(Rule::new(
            p2(add, p2(sub, X, A), B),
            if_lt(B, A, b2(sub, X, f2(Sub, A, B)), b2(add, X, f2(Sub, B, A))),
            false,
        ));
        // B + (X - A) -> X + (B - A), X - (A - B)
        rules.push(Rule::new(
            p2(add, B, p2(sub, X, A)),
            if_lt(B, A, b2(sub, X, f2(Sub, A, B)), b2(add, X, f2(Sub, B, A))),
            false,
        ));
        // (X - A) - B -> X - (A + B)
        // B - (X - A) -> (A + B) - X is left alone: the folded constant may wrap.
        rules.push(Rule::new(
            p2(sub, p2(sub, X, A), B),
            b2(sub, X, f2(Add, A, B)),
            false,
        ));
        // (A - X) - B -> (A - B) - X
        // B - (A - X) -> X + (B - A) is left alone for the same reason.
        rules.push(Rule::new(
            p2(sub, p2(sub, A, X), B),
            b2(sub, f2(Sub, A, B), X),
            false,
        ));

        // Move constants across subtractions.
        // (X + A) - Y -> (X - Y) + A
        rules.push(Rule::new(
            p2(sub, p2(add, X, A), Y),
            b2(add, b2(sub, X, Y), A),
            false,
        ));
        // (A + X) - Y -> (X - Y) + A
        rules.push(Rule::new(
            p2(sub, p2(add, A, X), Y),
            b2(add, b2(sub, X, Y), A),
            false,
        ));
        // X - (Y + A) -> (X - Y) - A
        rules.push(Rule::new(
            p2(sub, X, p2(add, Y, A)),
            b2(sub, b2(sub, X, Y), A),
            false,
        ));
        // X - (A + Y) -> (X - Y) - A
        rules.push(Rule::new(
            p2(sub, X, p2(add, A, Y)),
            b2(sub, b2(sub, X, Y), A),
            false,
        ));
    }
}
