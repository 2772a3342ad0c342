//! Scoped symbol table (spec.md §3)
//!
//! A mapping from identifier to `{ sort, smt_expr, source_type }`. Parameters
//! are declared once, up front. Each array declaration additionally creates
//! a companion `<name>$length` entry, logically decoupled from the array's
//! element mapping (§3 invariants). Quantifier bindings open a lexical
//! scope: prior bindings of the same name are saved and restored on exit,
//! LIFO.

#![cfg(feature = "z3")]

use std::collections::HashMap;

use z3::ast::{Ast, Dynamic, BV};
use z3::Context;

use crate::ast::CalorType;

/// The SMT-level sort a declared symbol was given. Kept alongside the
/// `Dynamic` term because `Dynamic` alone can't tell a signed `i32` from an
/// unsigned `u32` of the same bit-vector width, and the width-coercion
/// policy (§4.B) needs the declared signedness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtSort {
    Bv { width: u32, signed: bool },
    Bool,
    Str,
    Array { index_width: u32, elem: Box<SmtSort> },
}

impl SmtSort {
    /// Translate a `CalorType` into the sort it's represented by, or `None`
    /// if the type is outside the supported fragment (§3: floats and
    /// nested arrays).
    pub fn of(ty: &CalorType) -> Option<SmtSort> {
        match ty {
            CalorType::Bool => Some(SmtSort::Bool),
            CalorType::Str => Some(SmtSort::Str),
            CalorType::I8 | CalorType::I16 | CalorType::I32 | CalorType::I64 => Some(SmtSort::Bv {
                width: ty.int_width().unwrap(),
                signed: true,
            }),
            CalorType::U8 | CalorType::U16 | CalorType::U32 | CalorType::U64 => Some(SmtSort::Bv {
                width: ty.int_width().unwrap(),
                signed: false,
            }),
            CalorType::Array(elem) => {
                // Only single-level arrays are supported.
                if matches!(**elem, CalorType::Array(_)) {
                    return None;
                }
                let elem_sort = SmtSort::of(elem)?;
                Some(SmtSort::Array {
                    index_width: 32,
                    elem: Box::new(elem_sort),
                })
            }
            CalorType::F32 | CalorType::F64 => None,
        }
    }
}

#[derive(Clone)]
pub struct SymbolEntry<'ctx> {
    pub sort: SmtSort,
    pub source_type: CalorType,
    pub term: Dynamic<'ctx>,
}

/// What to restore a name to when a scope closes: either the prior entry,
/// or nothing (the name was previously unbound).
enum Restore<'ctx> {
    Remove(String),
    Reinstate(String, SymbolEntry<'ctx>),
}

pub struct SymbolTable<'ctx> {
    ctx: &'ctx Context,
    symbols: HashMap<String, SymbolEntry<'ctx>>,
    scopes: Vec<Vec<Restore<'ctx>>>,
}

impl<'ctx> SymbolTable<'ctx> {
    pub fn new(ctx: &'ctx Context) -> Self {
        SymbolTable {
            ctx,
            symbols: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    pub fn ctx(&self) -> &'ctx Context {
        self.ctx
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry<'ctx>> {
        self.symbols.get(name)
    }

    /// All currently-declared names, including synthetic `$length`
    /// companions. Used to render counterexamples (§4.C).
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|s| s.as_str())
    }

    /// Declare a top-level symbol (a parameter, or the pseudo-name
    /// `result`). Returns whether the type was supported; on `false`,
    /// nothing is inserted. For array types, also inserts the synthetic
    /// `<name>$length` companion (unsigned 32-bit), decoupled from the
    /// array's element mapping.
    pub fn declare(&mut self, name: &str, ty: &CalorType) -> bool {
        let Some(sort) = SmtSort::of(ty) else {
            return false;
        };
        let term = self.fresh_term(name, &sort);
        self.symbols.insert(
            name.to_string(),
            SymbolEntry {
                sort: sort.clone(),
                source_type: ty.clone(),
                term,
            },
        );

        if let CalorType::Array(_) = ty {
            self.declare_length(name);
        }
        true
    }

    /// Insert (or, if already present, leave alone) the synthetic
    /// `<name>$length` variable for an array. Used both by `declare` and by
    /// `len(a)` auto-declaring on first reference for an array that was
    /// never explicitly declared (§9 open question (i) — the source does
    /// this, and this implementation preserves it).
    pub fn declare_length(&mut self, array_name: &str) -> SymbolEntry<'ctx> {
        let length_name = format!("{array_name}$length");
        if let Some(existing) = self.symbols.get(&length_name) {
            return existing.clone();
        }
        let sort = SmtSort::Bv {
            width: 32,
            signed: false,
        };
        let term = self.fresh_term(&length_name, &sort);
        let entry = SymbolEntry {
            sort,
            source_type: CalorType::U32,
            term,
        };
        self.symbols.insert(length_name, entry.clone());
        entry
    }

    fn fresh_term(&self, name: &str, sort: &SmtSort) -> Dynamic<'ctx> {
        match sort {
            SmtSort::Bv { width, .. } => BV::new_const(self.ctx, name, *width).into(),
            SmtSort::Bool => z3::ast::Bool::new_const(self.ctx, name).into(),
            SmtSort::Str => z3::ast::String::new_const(self.ctx, name).into(),
            SmtSort::Array { index_width, elem } => {
                let domain = z3::Sort::bitvector(self.ctx, *index_width);
                let range = elem_sort(self.ctx, elem);
                z3::ast::Array::new_const(self.ctx, name, &domain, &range).into()
            }
        }
    }

    /// Open a new lexical scope for a quantifier's bound variables. Returns
    /// nothing; matching `pop_scope` restores exactly what this call
    /// shadowed.
    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Bind a quantifier variable within the current scope, recording
    /// whatever it shadows so `pop_scope` can restore it.
    pub fn bind(&mut self, name: &str, ty: &CalorType) -> Option<Dynamic<'ctx>> {
        let sort = SmtSort::of(ty)?;
        let term = self.fresh_term(name, &sort);
        let entry = SymbolEntry {
            sort,
            source_type: ty.clone(),
            term: term.clone(),
        };

        let restore = match self.symbols.insert(name.to_string(), entry) {
            Some(shadowed) => Restore::Reinstate(name.to_string(), shadowed),
            None => Restore::Remove(name.to_string()),
        };
        self.scopes
            .last_mut()
            .expect("bind() called without an open scope")
            .push(restore);

        Some(term)
    }

    /// Close the most recently opened scope, restoring every binding it
    /// shadowed. LIFO: scopes must close in the reverse order they opened
    /// (§3 invariant: "opening and then closing a quantifier scope is a
    /// no-op on the outer symbol table").
    pub fn pop_scope(&mut self) {
        let restores = self.scopes.pop().expect("pop_scope() without push_scope()");
        for restore in restores.into_iter().rev() {
            match restore {
                Restore::Remove(name) => {
                    self.symbols.remove(&name);
                }
                Restore::Reinstate(name, entry) => {
                    self.symbols.insert(name, entry);
                }
            }
        }
    }
}

fn elem_sort<'ctx>(ctx: &'ctx Context, sort: &SmtSort) -> z3::Sort<'ctx> {
    match sort {
        SmtSort::Bv { width, .. } => z3::Sort::bitvector(ctx, *width),
        SmtSort::Bool => z3::Sort::bool(ctx),
        SmtSort::Str => z3::Sort::string(ctx),
        SmtSort::Array { index_width, elem } => {
            z3::Sort::array(ctx, &z3::Sort::bitvector(ctx, *index_width), &elem_sort(ctx, elem))
        }
    }
}
