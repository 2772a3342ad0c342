//! Verifier / Implication Prover (spec.md §4.C)
//!
//! Discharges a single obligation at a time: build a fresh `Context` and
//! `Translator`, declare the obligation's free variables, translate its
//! assumption set and goal, then ask the solver either a validity question
//! (is `assumptions ⇒ goal` always true?) or a satisfiability question (is
//! there an input satisfying `assumptions` at all?) — the direction depends
//! on which of the five operations below is asked.

#![cfg(feature = "z3")]

use std::time::{Duration, Instant};

use z3::ast::{Ast, Bool};
use z3::{SatResult, Solver};

use crate::ast::{CalorType, ContractExpr};
use crate::config::Config;
use crate::context;
use crate::translator::Translator;

use super::result::{format_counterexample, VerificationResult};

/// Discharges proof obligations against a solver, per-call, with a fixed
/// per-obligation timeout (§4.C, §6 `Config::timeout_ms`).
pub struct Verifier {
    timeout_ms: u32,
}

impl Verifier {
    pub fn new(config: &Config) -> Self {
        Verifier {
            timeout_ms: config.timeout_ms,
        }
    }

    /// A `requires` set is useless if no input can ever satisfy it. This is
    /// a satisfiability question, not a validity one: `Sat` means the
    /// precondition is live (`Proven`); `Unsat` means it's dead
    /// (`Disproven`, with the "counterexample" being the trivial statement
    /// that nothing satisfies it).
    pub fn verify_precondition(
        &self,
        declared: &[(String, CalorType)],
        requires: &[ContractExpr],
    ) -> VerificationResult {
        self.run(declared, &[], &conjunction(requires), Question::Satisfiable)
    }

    /// The core contract discharge: does `requires ⇒ ensures` hold for
    /// every input (§1, §4.C)? A validity question. `result` is declared
    /// automatically alongside `declared` regardless of whether `ensures`
    /// happens to mention it (§9 open question ii).
    pub fn verify_postcondition(
        &self,
        declared: &[(String, CalorType)],
        result_ty: &CalorType,
        requires: &[ContractExpr],
        ensures: &ContractExpr,
    ) -> VerificationResult {
        let mut declared = declared.to_vec();
        declared.push(("result".to_string(), result_ty.clone()));
        self.run(&declared, requires, ensures, Question::Valid)
    }

    /// LSP precondition weakening: an override's `requires` must accept at
    /// least everything the interface's `requires` does, i.e.
    /// `iface_requires ⇒ impl_requires` must be valid.
    pub fn check_precondition_weakening(
        &self,
        declared: &[(String, CalorType)],
        iface_requires: &ContractExpr,
        impl_requires: &ContractExpr,
    ) -> VerificationResult {
        self.run(declared, std::slice::from_ref(iface_requires), impl_requires, Question::Valid)
    }

    /// LSP postcondition strengthening: an override's `ensures` must
    /// guarantee at least everything the interface's `ensures` does, i.e.
    /// `impl_ensures ⇒ iface_ensures` must be valid.
    pub fn check_postcondition_strengthening(
        &self,
        declared: &[(String, CalorType)],
        iface_ensures: &ContractExpr,
        impl_ensures: &ContractExpr,
    ) -> VerificationResult {
        self.run(declared, std::slice::from_ref(impl_ensures), iface_ensures, Question::Valid)
    }

    /// The implication prover, exposed directly: is `assumptions ⇒ goal`
    /// valid? Every method above is a specific framing of this call.
    pub fn prove_implication(
        &self,
        declared: &[(String, CalorType)],
        assumptions: &[ContractExpr],
        goal: &ContractExpr,
    ) -> VerificationResult {
        self.run(declared, assumptions, goal, Question::Valid)
    }

    fn run(
        &self,
        declared: &[(String, CalorType)],
        assumptions: &[ContractExpr],
        goal: &ContractExpr,
        question: Question,
    ) -> VerificationResult {
        let start = Instant::now();

        if !context::is_available() {
            return VerificationResult::unsupported(
                "no SMT solver backend is available",
                Vec::new(),
                start.elapsed(),
            );
        }

        let ctx = context::create();
        let mut translator = Translator::new(&ctx);

        for (name, ty) in declared {
            if !translator.declare(name, ty) {
                return VerificationResult::unsupported(
                    format!("`{name}` has a type outside the supported fragment: {ty:?}"),
                    translator.warnings().to_vec(),
                    start.elapsed(),
                );
            }
        }
        let mut assumption_terms: Vec<Bool> = Vec::with_capacity(assumptions.len());
        let mut failing: Option<&ContractExpr> = None;
        for a in assumptions {
            match translator.translate_bool(a) {
                Some(term) => assumption_terms.push(term),
                None => {
                    failing = Some(a);
                    break;
                }
            }
        }
        if let Some(failing) = failing {
            return VerificationResult::unsupported(
                translator.diagnose_failure(failing),
                translator.warnings().to_vec(),
                start.elapsed(),
            );
        }

        let goal_term = match translator.translate_bool(goal) {
            Some(g) => g,
            None => {
                return VerificationResult::unsupported(
                    translator.diagnose_failure(goal),
                    translator.warnings().to_vec(),
                    start.elapsed(),
                );
            }
        };

        let solver = Solver::new(ctx.z3());
        let mut params = z3::Params::new(ctx.z3());
        params.set_u32("timeout", self.timeout_ms);
        solver.set_params(&params);

        for a in &assumption_terms {
            solver.assert(a);
        }

        let query_term = match question {
            Question::Valid => goal_term.not(),
            Question::Satisfiable => goal_term,
        };
        solver.assert(&query_term);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| solver.check()));
        let warnings = translator.warnings().to_vec();
        let duration = start.elapsed();

        let sat = match outcome {
            Ok(sat) => sat,
            Err(_) => return VerificationResult::unproven("internal solver error", warnings, duration),
        };

        match (question, sat) {
            (Question::Valid, SatResult::Unsat) => VerificationResult::proven(warnings, duration),
            (Question::Valid, SatResult::Sat) => {
                let model = solver.get_model();
                let counterexample = model
                    .map(|m| format_counterexample(&m, translator.table()))
                    .unwrap_or_else(|| "<no model>".to_string());
                VerificationResult::disproven(counterexample, warnings, duration)
            }
            (Question::Satisfiable, SatResult::Sat) => VerificationResult::proven(warnings, duration),
            (Question::Satisfiable, SatResult::Unsat) => VerificationResult::disproven(
                "no input satisfies the declared preconditions".to_string(),
                warnings,
                duration,
            ),
            (_, SatResult::Unknown) => {
                VerificationResult::unproven(reason_for_unknown(&solver, self.timeout_ms), warnings, duration)
            }
        }
    }
}

enum Question {
    Valid,
    Satisfiable,
}

fn conjunction(clauses: &[ContractExpr]) -> ContractExpr {
    use crate::ast::{BinOp, Literal, Span};

    clauses
        .iter()
        .cloned()
        .reduce(|acc, c| ContractExpr::Binary {
            op: BinOp::And,
            lhs: Box::new(acc),
            rhs: Box::new(c),
            span: Span::synthetic(),
        })
        .unwrap_or(ContractExpr::Literal(Literal::Bool(true), Span::synthetic()))
}

fn reason_for_unknown(solver: &Solver, timeout_ms: u32) -> String {
    let reason = solver.get_reason_unknown().unwrap_or_default();
    if reason.contains("timeout") || reason.contains("canceled") {
        format!("solver exceeded the {timeout_ms}ms timeout")
    } else if reason.is_empty() {
        "solver returned unknown".to_string()
    } else {
        format!("solver returned unknown: {reason}")
    }
}
