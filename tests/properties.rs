//! Cross-cutting invariants from spec.md §8 (numbered properties 1-9).
//! Properties over a generated space use `proptest`; properties that are
//! really about a single fixed configuration (scope restoration, length
//! decoupling) are plain `#[test]`s.

#![cfg(feature = "z3")]

use calor_verify::ast::{BinOp, Binding, CalorType, ComparisonMode, ContractExpr, Literal, QuantifierKind, Span, StringOp};
use calor_verify::config::Config;
use calor_verify::context;
use calor_verify::translator::Translator;
use calor_verify::verifier::{VerificationStatus, Verifier};
use proptest::prelude::*;

fn span() -> Span {
    Span::synthetic()
}

fn lit(v: i64) -> ContractExpr {
    ContractExpr::Literal(Literal::Int(v), span())
}

fn var(name: &str) -> ContractExpr {
    ContractExpr::Ref(name.to_string(), span())
}

fn bin(op: BinOp, l: ContractExpr, r: ContractExpr) -> ContractExpr {
    ContractExpr::Binary {
        op,
        lhs: Box::new(l),
        rhs: Box::new(r),
        span: span(),
    }
}

fn verifier() -> Verifier {
    Verifier::new(&Config::default())
}

macro_rules! skip_if_unavailable {
    () => {
        if !context::is_available() {
            return Ok(());
        }
    };
}

proptest! {
    /// Property 1: tautology safety. `x = x` holds for any literal x drawn
    /// from i32's range, treated as a degenerate precondition-free clause.
    #[test]
    fn prop1_tautology_safety(x in any::<i32>()) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let requires = vec![bin(BinOp::Eq, var("x"), lit(x as i64))];
        let ensures = bin(BinOp::Eq, var("x"), lit(x as i64));
        let result = v.verify_postcondition(&declared, &CalorType::I32, &requires, &ensures);
        prop_assert!(result.is_proven());
    }

    /// Property 5: overflow fidelity. `x + 1 > x` is disproven without a
    /// bound, for any declared ceiling below `i32::MAX` it still must be
    /// disproven unless the ceiling excludes `i32::MAX` itself.
    #[test]
    fn prop5_overflow_fidelity(ceiling in i32::MIN..i32::MAX) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let requires = vec![bin(BinOp::Lt, var("x"), lit(ceiling as i64))];
        let ensures = bin(BinOp::Gt, bin(BinOp::Add, var("x"), lit(1)), var("x"));
        let result = v.verify_postcondition(&declared, &CalorType::I32, &requires, &ensures);
        prop_assert!(result.is_proven());
    }

    /// Property 6: LSP precondition weakening is monotone in the bound: any
    /// threshold at or below the interface's is an acceptable weakening.
    #[test]
    fn prop6_weakening_monotone(threshold in -1000i64..=0) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let iface = bin(BinOp::Ge, var("x"), lit(0));
        let impl_p = bin(BinOp::Ge, var("x"), lit(threshold));
        let result = v.check_precondition_weakening(&declared, &iface, &impl_p);
        prop_assert!(result.is_proven());
    }

    /// Property 6 (inverse direction): any threshold strictly above the
    /// interface's is a rejected strengthening.
    #[test]
    fn prop6_strengthening_rejected(threshold in 1i64..1000) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let iface = bin(BinOp::Ge, var("x"), lit(0));
        let impl_p = bin(BinOp::Ge, var("x"), lit(threshold));
        let result = v.check_precondition_weakening(&declared, &iface, &impl_p);
        prop_assert!(!result.is_proven());
    }

    /// Property 7: LSP postcondition strengthening is monotone in the bound:
    /// any threshold at or above the interface's is an acceptable
    /// strengthening (the implementer's guarantee only needs to be at least
    /// as strong as the interface's).
    #[test]
    fn prop7_strengthening_monotone(threshold in 0i64..=1000) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("result".to_string(), CalorType::I32)];
        let iface = bin(BinOp::Ge, var("result"), lit(0));
        let impl_q = bin(BinOp::Ge, var("result"), lit(threshold));
        let result = v.check_postcondition_strengthening(&declared, &iface, &impl_q);
        prop_assert!(result.is_proven());
    }

    /// Property 7 (inverse direction): any threshold strictly below the
    /// interface's is a rejected weakening.
    #[test]
    fn prop7_weakening_rejected(threshold in -1000i64..0) {
        skip_if_unavailable!();
        let v = verifier();
        let declared = vec![("result".to_string(), CalorType::I32)];
        let iface = bin(BinOp::Ge, var("result"), lit(0));
        let impl_q = bin(BinOp::Ge, var("result"), lit(threshold));
        let result = v.check_postcondition_strengthening(&declared, &iface, &impl_q);
        prop_assert!(!result.is_proven());
    }
}

/// Property 2: contradiction safety.
#[test]
fn prop2_contradiction_safety() {
    if !context::is_available() {
        return;
    }
    let v = verifier();
    let declared = vec![("x".to_string(), CalorType::I32)];
    let requires = vec![
        bin(BinOp::Gt, var("x"), lit(0)),
        bin(BinOp::Lt, var("x"), lit(0)),
    ];
    let result = v.verify_precondition(&declared, &requires);
    assert!(matches!(result.status, VerificationStatus::Disproven { .. }));
}

/// Property 3: scope restoration. After translating a quantified clause
/// that binds `x`, a prior top-level declaration of `x` is unaffected.
#[test]
fn prop3_scope_restoration() {
    if !context::is_available() {
        return;
    }
    let ctx = context::create();
    let mut tr = Translator::new(&ctx);
    assert!(tr.declare("x", &CalorType::I32));
    let before = tr.translate(&var("x")).unwrap();

    let quantified = ContractExpr::Quantifier {
        kind: QuantifierKind::Forall,
        bindings: vec![Binding {
            name: "x".to_string(),
            ty: CalorType::I32,
        }],
        body: Box::new(bin(BinOp::Eq, var("x"), var("x"))),
        span: span(),
    };
    assert!(tr.translate_bool(&quantified).is_some());

    let after = tr.translate(&var("x")).unwrap();
    assert_eq!(before.to_string(), after.to_string());
}

/// Property 4: length decoupling. Without an explicit bound, `len(a) == k`
/// is disproven for any concrete `k` — the translator never implicitly
/// fixes an array's length.
#[test]
fn prop4_length_decoupling() {
    if !context::is_available() {
        return;
    }
    let v = verifier();
    for k in [0i64, 1, 5, 1000] {
        let declared = vec![("a".to_string(), CalorType::Array(Box::new(CalorType::I32)))];
        let ensures = bin(BinOp::Eq, ContractExpr::Len(Box::new(var("a")), span()), lit(k));
        let result = v.verify_postcondition(&declared, &CalorType::Bool, &[], &ensures);
        assert!(
            matches!(result.status, VerificationStatus::Disproven { .. }),
            "k={k}: {:?}",
            result.status
        );
    }
}

/// Property 8: unsupported is total — a float literal never yields Proven
/// or Disproven.
#[test]
fn prop8_float_literal_is_always_unsupported() {
    if !context::is_available() {
        return;
    }
    let v = verifier();
    let ensures = bin(BinOp::Gt, ContractExpr::Literal(Literal::Float(1.5), span()), lit(0));
    let result = v.verify_postcondition(&[], &CalorType::Bool, &[], &ensures);
    assert!(matches!(result.status, VerificationStatus::Unsupported { .. }));
}

/// Property 9: warning accumulation — a non-ordinal comparison mode in a
/// postcondition appends exactly one warning mentioning the mode's name.
#[test]
fn prop9_warning_accumulation() {
    if !context::is_available() {
        return;
    }
    let v = verifier();
    let declared = vec![("s".to_string(), CalorType::Str)];
    let ensures = ContractExpr::StringOp {
        op: StringOp::Contains,
        mode: ComparisonMode::IgnoreCase,
        args: vec![var("s"), ContractExpr::Literal(Literal::Str("h".to_string()), span())],
        span: span(),
    };
    let result = v.verify_postcondition(&declared, &CalorType::Bool, &[], &ensures);
    let matching = result.warnings.iter().filter(|w| w.contains("IgnoreCase")).count();
    assert_eq!(matching, 1);
}
