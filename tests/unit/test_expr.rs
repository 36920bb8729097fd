//! Extended expression tree tests.

use alesia::expr::Expr;
use alesia::opcode::Opcode;
use alesia::word::{Word, UINT_256_MAX};

#[test]
fn test_display_formats() {
    let e = Expr::node2(
        Opcode::And,
        Expr::node0(Opcode::Address),
        Expr::Val(UINT_256_MAX),
    );
    assert_eq!(e.to_string(), format!("(and address 0x{UINT_256_MAX:x})"));

    let e = Expr::node3(Opcode::AddMod, Expr::val(1), Expr::val(2), Expr::val(3));
    assert_eq!(e.to_string(), "(addmod 1 2 3)");
}

#[test]
fn test_arity_is_enforced_for_every_opcode() {
    for &op in Opcode::all() {
        let good = vec![Expr::val(1); op.arity()];
        assert!(Expr::try_node(op, good).is_ok(), "{op}");
        let bad = vec![Expr::val(1); op.arity() + 1];
        assert!(Expr::try_node(op, bad).is_err(), "{op}");
    }
}

#[test]
fn test_eval_nested() {
    // (3 + 5) * (10 - 4) = 48
    let e = Expr::node2(
        Opcode::Mul,
        Expr::node2(Opcode::Add, Expr::val(3), Expr::val(5)),
        Expr::node2(Opcode::Sub, Expr::val(10), Expr::val(4)),
    );
    assert_eq!(e.eval(), Some(Word::from(48u64)));
}

#[test]
fn test_eval_stops_at_environment_opcodes() {
    let e = Expr::node2(Opcode::Add, Expr::val(1), Expr::node0(Opcode::Caller));
    assert_eq!(e.eval(), None);
}

#[test]
fn test_eval_matches_division_convention() {
    let e = Expr::node2(Opcode::Div, Expr::val(1), Expr::val(0));
    assert_eq!(e.eval(), Some(Word::zero()));
}

#[test]
fn test_serde_round_trip() {
    let e = Expr::node2(
        Opcode::SignExtend,
        Expr::val(0),
        Expr::Val(UINT_256_MAX),
    );
    let json = serde_json::to_string(&e).unwrap();
    let back: Expr = serde_json::from_str(&json).unwrap();
    assert_eq!(back, e);
}

#[test]
fn test_values_serialize_as_hex_strings() {
    let json = serde_json::to_string(&Expr::val(255)).unwrap();
    assert!(json.contains("0xff"), "{json}");
}

#[test]
fn test_shared_subtrees_compare_structurally() {
    let shared = Expr::node2(Opcode::Add, Expr::val(1), Expr::node0(Opcode::Origin));
    let a = Expr::node2(Opcode::Xor, shared.clone(), shared.clone());
    let b = Expr::node2(
        Opcode::Xor,
        Expr::node2(Opcode::Add, Expr::val(1), Expr::node0(Opcode::Origin)),
        Expr::node2(Opcode::Add, Expr::val(1), Expr::node0(Opcode::Origin)),
    );
    assert_eq!(a, b);
}
