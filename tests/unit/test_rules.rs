//! Catalog structure tests: removability law, ordering enumeration,
//! serialization.

use alesia::matcher::{Pattern, Placeholder};
use alesia::opcode::Opcode;
use alesia::rules::{Rhs, RuleCatalog};
use alesia::word::{Word, ADDRESS_MASK, UINT_256_MAX};
use std::collections::HashMap;

/// Count occurrences of arbitrary-expression placeholders in a pattern.
fn lhs_occurrences(p: &Pattern, counts: &mut HashMap<Placeholder, usize>) {
    match p {
        Pattern::Slot(slot) if !slot.constant_only() => {
            *counts.entry(*slot).or_insert(0) += 1;
        }
        Pattern::Slot(_) | Pattern::Val(_) => {}
        Pattern::Node(_, children) => {
            for c in children {
                lhs_occurrences(c, counts);
            }
        }
    }
}

/// Count occurrences of arbitrary-expression placeholders in a recipe.
fn rhs_occurrences(r: &Rhs, counts: &mut HashMap<Placeholder, usize>) {
    match r {
        Rhs::Ref(slot) if !slot.constant_only() => {
            *counts.entry(*slot).or_insert(0) += 1;
        }
        Rhs::Ref(_) | Rhs::Lit(_) => {}
        Rhs::Build(_, children) | Rhs::Fold(_, children) => {
            for c in children {
                rhs_occurrences(c, counts);
            }
        }
        Rhs::IfLt {
            lhs,
            rhs,
            then,
            otherwise,
        } => {
            rhs_occurrences(lhs, counts);
            rhs_occurrences(rhs, counts);
            rhs_occurrences(then, counts);
            rhs_occurrences(otherwise, counts);
        }
    }
}

/// A rule is removable exactly when it drops at least one evaluation of an
/// arbitrary operand: the pattern mentions arbitrary placeholders more often
/// than the replacement does.
#[test]
fn test_removable_flag_matches_dropped_operands() {
    let catalog = RuleCatalog::new();
    for rule in catalog.rules() {
        let mut lhs = HashMap::new();
        lhs_occurrences(&rule.lhs, &mut lhs);
        let mut rhs = HashMap::new();
        rhs_occurrences(&rule.rhs, &mut rhs);

        let lhs_total: usize = lhs.values().sum();
        let rhs_total: usize = rhs.values().sum();
        let drops = lhs_total > rhs_total;
        assert_eq!(
            rule.removable, drops,
            "removable flag disagrees for {:?}",
            rule.lhs
        );
    }
}

/// Every arbitrary placeholder referenced by a replacement must have been
/// bound by the pattern.
#[test]
fn test_rhs_references_are_bound_by_lhs() {
    let catalog = RuleCatalog::new();
    for rule in catalog.rules() {
        let mut lhs = HashMap::new();
        lhs_occurrences(&rule.lhs, &mut lhs);
        for slot in rule.rhs.placeholders() {
            if !slot.constant_only() {
                assert!(
                    lhs.contains_key(&slot),
                    "{slot} referenced but never bound in {:?}",
                    rule.lhs
                );
            }
        }
    }
}

fn has_lhs(catalog: &RuleCatalog, lhs: &Pattern) -> bool {
    catalog.rules().iter().any(|r| r.lhs == *lhs)
}

/// Commutativity is not built into the matcher, so commutative shapes must
/// be enumerated in both operand orders.
#[test]
fn test_both_orderings_enumerated() {
    use Opcode::*;
    let catalog = RuleCatalog::new();
    let x = Pattern::Slot(Placeholder::X);

    let shapes: [(Opcode, Word); 16] = [
        (Add, Word::zero()),
        (SAdd, Word::zero()),
        (Mul, Word::zero()),
        (Mul, Word::one()),
        (Mul, UINT_256_MAX),
        (SMul, Word::zero()),
        (SMul, Word::one()),
        (SMul, UINT_256_MAX),
        (Div, Word::zero()),
        (SDiv, Word::zero()),
        (And, Word::zero()),
        (And, UINT_256_MAX),
        (Or, Word::zero()),
        (Or, UINT_256_MAX),
        (Xor, Word::zero()),
        (Eq, Word::zero()),
    ];
    for (op, val) in shapes {
        let forward = Pattern::Node(op, vec![x.clone(), Pattern::Val(val)]);
        let mirrored = Pattern::Node(op, vec![Pattern::Val(val), x.clone()]);
        assert!(has_lhs(&catalog, &forward), "missing ({op} X {val})");
        assert!(has_lhs(&catalog, &mirrored), "missing ({op} {val} X)");
    }

    // Mod has both zero-operand rules but no constant-divisor mirror beyond
    // the power-of-two family.
    assert!(has_lhs(
        &catalog,
        &Pattern::Node(Mod, vec![x.clone(), Pattern::Val(Word::zero())])
    ));
    assert!(has_lhs(
        &catalog,
        &Pattern::Node(Mod, vec![Pattern::Val(Word::zero()), x.clone()])
    ));

    // Address masks are enumerated in both orders as well.
    for op in [Address, Caller, Origin, Coinbase] {
        let node = Pattern::Node(op, vec![]);
        let forward = Pattern::Node(And, vec![node.clone(), Pattern::Val(ADDRESS_MASK)]);
        let mirrored = Pattern::Node(And, vec![Pattern::Val(ADDRESS_MASK), node]);
        assert!(has_lhs(&catalog, &forward), "missing (and {op} mask)");
        assert!(has_lhs(&catalog, &mirrored), "missing (and mask {op})");
    }
}

#[test]
fn test_power_of_two_family_is_complete() {
    let catalog = RuleCatalog::new();
    let x = Pattern::Slot(Placeholder::X);
    for i in 0..256usize {
        let lhs = Pattern::Node(Opcode::Mod, vec![x.clone(), Pattern::Val(Word::one() << i)]);
        assert!(has_lhs(&catalog, &lhs), "missing mod by 2^{i}");
    }
}

#[test]
fn test_catalog_serialization_round_trip() {
    let catalog = RuleCatalog::new();
    let json = serde_json::to_string(&catalog).unwrap();
    let back: RuleCatalog = serde_json::from_str(&json).unwrap();
    assert_eq!(back, catalog);
}

#[test]
fn test_catalog_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RuleCatalog>();
    assert_send_sync::<alesia::rewriter::Rewriter>();
}
