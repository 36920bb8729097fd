//! Domain-specific error types.
//!
//! The engine itself has no recoverable failure path: a rule either matches
//! or it does not. The only error surfaced to callers is a malformed tree,
//! which is a contract violation on their side.

use crate::opcode::Opcode;
use thiserror::Error;

/// Errors raised while constructing expression trees.
#[derive(Debug, Error)]
pub enum ExprError {
    #[error("{opcode} takes {expected} operand(s), got {got}")]
    ArityMismatch {
        opcode: Opcode,
        expected: usize,
        got: usize,
    },
}
