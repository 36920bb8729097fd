//! Applies the rule catalog to a single expression.
//!
//! The rewriter only ever looks at the root of the subject; the caller owns
//! the bottom-up traversal and the fixed-point loop that repeats rewriting
//! until nothing changes.

use crate::expr::Expr;
use crate::matcher::match_expr;
use crate::rules::RuleCatalog;

/// Applies the first matching catalog rule to an expression.
pub struct Rewriter {
    catalog: RuleCatalog,
}

impl Rewriter {
    /// A rewriter over the full default catalog.
    pub fn new() -> Self {
        Rewriter {
            catalog: RuleCatalog::new(),
        }
    }

    /// A rewriter over a caller-supplied catalog.
    pub fn with_catalog(catalog: RuleCatalog) -> Self {
        Rewriter { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    /// Attempt to simplify `subject`, without recursing into its children.
    ///
    /// `side_effect_free` is the caller's judgement of whether a subtree may
    /// be discarded without changing observable program behaviour. A rule
    /// that throws away a matched operand, including one of several matched
    /// occurrences of the same operand, only applies when the predicate
    /// accepts every discarded subtree; otherwise the walk continues with
    /// the next rule.
    ///
    /// Returns the replacement expression, or `None` when no rule applies.
    pub fn apply<F>(&self, subject: &Expr, side_effect_free: F) -> Option<Expr>
    where
        F: Fn(&Expr) -> bool,
    {
        for rule in self.catalog.rules() {
            let m = match match_expr(subject, &rule.lhs) {
                Some(m) => m,
                None => continue,
            };
            if rule.removable {
                // An operand is discarded when the pattern matched more
                // occurrences of its placeholder than the replacement
                // instantiates. Mere mention on the right-hand side is not
                // enough: and(X, X) -> X still drops one evaluation of X.
                let blocked = m.iter().any(|(slot, bound)| {
                    !slot.constant_only()
                        && rule.lhs.occurrences(slot) > rule.rhs.occurrences(slot)
                        && !side_effect_free(bound)
                });
                if blocked {
                    log::debug!(
                        "not rewriting {subject}: discarded operand not known side-effect-free"
                    );
                    continue;
                }
            }
            let result = rule.rhs.instantiate(&m);
            log::trace!("rewrote {subject} -> {result}");
            return Some(result);
        }
        None
    }
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new()
    }
}
