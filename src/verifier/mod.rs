//! Verifier / Implication Prover (spec.md §4.C)

pub mod prover;
pub mod result;

#[cfg(feature = "z3")]
pub use prover::Verifier;
pub use result::{VerificationResult, VerificationStatus};

#[cfg(not(feature = "z3"))]
pub struct Verifier;

#[cfg(not(feature = "z3"))]
impl Verifier {
    pub fn new(_config: &crate::config::Config) -> Self {
        Verifier
    }
}

#[cfg(all(test, feature = "z3"))]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::ast::{BinOp, CalorType, ContractExpr, Literal, Span};
    use crate::config::Config;

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
        Verifier::new(&Config {
            timeout_ms: 5000,
            ..Config::default()
        })
    }

    #[test]
    fn tautology_is_proven() {
        if !crate::context::is_available() {
            return;
        }
        let v = verifier();
        // x >= 0 || x < 0 is a tautology for any signed i32.
        let goal = bin(
            BinOp::Or,
            bin(BinOp::Ge, var("x"), lit(0)),
            bin(BinOp::Lt, var("x"), lit(0)),
        );
        let declared = vec![("x".to_string(), CalorType::I32)];
        let result = v.prove_implication(&declared, &[], &goal);
        assert!(result.is_proven(), "expected tautology to be proven, got {:?}", result);
    }

    #[test]
    fn contradiction_is_disproven_with_a_counterexample() {
        if !crate::context::is_available() {
            return;
        }
        let v = verifier();
        // x > 0 && x < 0 can never hold.
        let goal = bin(BinOp::Gt, var("x"), lit(0));
        let declared = vec![("x".to_string(), CalorType::I32)];
        let assumption = bin(BinOp::Lt, var("x"), lit(0));
        let result = v.prove_implication(&declared, &[assumption], &goal);
        match result.status {
            VerificationStatus::Disproven { counterexample } => assert!(!counterexample.is_empty()),
            other => panic!("expected Disproven, got {other:?}"),
        }
    }

    #[test]
    fn postcondition_discharge_respects_requires() {
        if !crate::context::is_available() {
            return;
        }
        let v = verifier();
        let declared = vec![("a".to_string(), CalorType::I32), ("b".to_string(), CalorType::I32)];
        let requires = vec![bin(BinOp::Ge, var("a"), lit(0)), bin(BinOp::Ge, var("b"), lit(0))];
        let ensures = bin(BinOp::Ge, var("result"), lit(0));
        let result = v.verify_postcondition(&declared, &CalorType::I32, &requires, &ensures);
        // result isn't actually constrained to a + b here (no body
        // verification, §2 non-goals), so this is Unproven/Disproven rather
        // than Proven — the point of this test is that it runs to
        // completion without panicking.
        assert!(matches!(
            result.status,
            VerificationStatus::Disproven { .. } | VerificationStatus::Unproven { .. } | VerificationStatus::Proven
        ));
        let _ = Duration::from_secs(0);
    }

    #[test]
    fn precondition_weakening_holds_for_identical_clauses() {
        if !crate::context::is_available() {
            return;
        }
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let clause = bin(BinOp::Ge, var("x"), lit(0));
        let result = v.check_precondition_weakening(&declared, &clause, &clause);
        assert!(result.is_proven());
    }

    #[test]
    fn precondition_strengthening_is_rejected() {
        if !crate::context::is_available() {
            return;
        }
        let v = verifier();
        let declared = vec![("x".to_string(), CalorType::I32)];
        let iface = bin(BinOp::Ge, var("x"), lit(0));
        // impl only accepts x >= 10: strictly narrower, so iface ⇒ impl does
        // NOT hold (x = 0 satisfies iface but not impl).
        let narrower_impl = bin(BinOp::Ge, var("x"), lit(10));
        let result = v.check_precondition_weakening(&declared, &iface, &narrower_impl);
        assert!(!result.is_proven());
    }
}
