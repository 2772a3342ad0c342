//! Contract Translator (spec.md §4.B)
//!
//! Lowers `ContractExpr` trees to SMT terms against a scoped symbol table.
//! Never panics and never raises on unsupported input — every entry point
//! returns `None`/nothing usable, with `diagnose_failure` available to
//! explain why after the fact.

pub mod diagnose;
pub mod lower;
pub mod symbol_table;

#[cfg(feature = "z3")]
use z3::ast::{Bool, Dynamic};

use crate::ast::{CalorType, ContractExpr};

#[cfg(feature = "z3")]
use crate::context::Context;
#[cfg(feature = "z3")]
use symbol_table::SymbolTable;

/// Translates contract expressions for a single obligation. One
/// `Translator` is built per solver `Context` (§4.A/§4.B pairing).
#[cfg(feature = "z3")]
pub struct Translator<'ctx> {
    table: SymbolTable<'ctx>,
    warnings: Vec<String>,
}

#[cfg(feature = "z3")]
impl<'ctx> Translator<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        Translator {
            table: SymbolTable::new(ctx.z3()),
            warnings: Vec::new(),
        }
    }

    /// Declare a parameter, or the pseudo-name `result`, before translating
    /// any clause that references it. Returns `false` if `ty` is outside
    /// the supported fragment (floats, nested arrays) — the caller should
    /// treat the whole obligation as `Unsupported` in that case.
    pub fn declare(&mut self, name: &str, ty: &CalorType) -> bool {
        let ok = self.table.declare(name, ty);
        if !ok {
            log::debug!("cannot declare `{name}`: unsupported type {ty:?}");
        }
        ok
    }

    /// Lower `expr` to an SMT term of whatever sort it naturally has.
    /// Returns `None` on any unsupported construct, type mismatch, or
    /// reference to an undeclared name — never panics.
    pub fn translate(&mut self, expr: &ContractExpr) -> Option<Dynamic<'ctx>> {
        match lower::lower(&mut self.table, &mut self.warnings, expr) {
            Ok(l) => Some(l.term),
            Err(e) => {
                log::debug!("translation failed: {e}");
                None
            }
        }
    }

    /// Lower `expr`, requiring it to be boolean-sorted (the shape every
    /// top-level contract clause must have). `None` both when translation
    /// fails and when it succeeds at a non-boolean sort.
    pub fn translate_bool(&mut self, expr: &ContractExpr) -> Option<Bool<'ctx>> {
        match lower::lower(&mut self.table, &mut self.warnings, expr) {
            Ok(l) => {
                let b = l.term.as_bool();
                if b.is_none() {
                    log::debug!("clause did not translate to a boolean term");
                }
                b
            }
            Err(e) => {
                log::debug!("translation failed: {e}");
                None
            }
        }
    }

    /// Explain, in one sentence, why `expr` last failed to translate.
    /// Intended to be called immediately after a `translate`/`translate_bool`
    /// call returned `None` for this same expression.
    pub fn diagnose_failure(&mut self, expr: &ContractExpr) -> String {
        diagnose::diagnose_failure(&mut self.table, &mut self.warnings, expr)
    }

    /// Non-fatal notices accumulated since construction (unsupported
    /// comparison modes, literal overflow wraps). Cleared by nothing —
    /// callers build one `Translator` per obligation.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The underlying symbol table. Exposed crate-internally only, for the
    /// verifier to render counterexamples against the same declarations the
    /// translator built (§4.C).
    pub(crate) fn table(&self) -> &SymbolTable<'ctx> {
        &self.table
    }
}

#[cfg(not(feature = "z3"))]
pub struct Translator<'ctx> {
    _marker: std::marker::PhantomData<&'ctx ()>,
}

#[cfg(not(feature = "z3"))]
impl<'ctx> Translator<'ctx> {
    pub fn declare(&mut self, _name: &str, _ty: &CalorType) -> bool {
        false
    }

    pub fn warnings(&self) -> &[String] {
        &[]
    }
}

#[cfg(all(test, feature = "z3"))]
mod tests {
    use super::*;
    use crate::ast::{BinOp, ComparisonMode, ContractExpr, Literal, Span, StringOp};

    fn translator(ctx: &Context) -> Translator {
        Translator::new(ctx)
    }

    #[test]
    fn declares_and_translates_a_reference() {
        if !crate::context::is_available() {
            return;
        }
        let ctx = crate::context::create();
        let mut tr = translator(&ctx);
        assert!(tr.declare("x", &CalorType::I32));
        let expr = ContractExpr::Ref("x".to_string(), Span::synthetic());
        assert!(tr.translate(&expr).is_some());
    }

    #[test]
    fn unknown_variable_yields_none_and_a_diagnosis() {
        if !crate::context::is_available() {
            return;
        }
        let ctx = crate::context::create();
        let mut tr = translator(&ctx);
        let expr = ContractExpr::Ref("ghost".to_string(), Span::synthetic());
        assert!(tr.translate(&expr).is_none());
        assert!(tr.diagnose_failure(&expr).contains("ghost"));
    }

    #[test]
    fn comparison_mode_other_than_ordinal_warns() {
        if !crate::context::is_available() {
            return;
        }
        let ctx = crate::context::create();
        let mut tr = translator(&ctx);
        assert!(tr.declare("a", &CalorType::Str));
        assert!(tr.declare("b", &CalorType::Str));
        let span = Span::synthetic();
        let expr = ContractExpr::StringOp {
            op: StringOp::Equals,
            mode: ComparisonMode::IgnoreCase,
            args: vec![
                ContractExpr::Ref("a".to_string(), span),
                ContractExpr::Ref("b".to_string(), span),
            ],
            span,
        };
        assert!(tr.translate_bool(&expr).is_some());
        assert!(tr.warnings().iter().any(|w| w.contains("ignored")));
    }

    #[test]
    fn out_of_range_literal_warns_and_still_translates() {
        if !crate::context::is_available() {
            return;
        }
        let ctx = crate::context::create();
        let mut tr = translator(&ctx);
        tr.declare("x", &CalorType::I8);
        let span = Span::synthetic();
        let expr = ContractExpr::Binary {
            op: BinOp::Lt,
            lhs: Box::new(ContractExpr::Ref("x".to_string(), span)),
            rhs: Box::new(ContractExpr::Literal(Literal::Int(200), span)),
            span,
        };
        assert!(tr.translate_bool(&expr).is_some());
        assert!(tr.warnings().iter().any(|w| w.contains("does not fit")));
    }
}
