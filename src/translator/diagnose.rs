//! `diagnose_failure`: turn a failed translation into one sentence naming
//! the smallest unsupported sub-expression (spec.md §4.B).

#![cfg(feature = "z3")]

use crate::ast::ContractExpr;

use super::lower::lower;
use super::symbol_table::SymbolTable;

/// Re-walk `expr`, depth-first, to find the smallest failing sub-expression
/// and report its `TranslationError`. Children are visited before the
/// parent; the first one that fails to translate is the answer, since a
/// parent can never succeed where a child failed, and any later sibling's
/// own failure is a separate, independent fact about the tree.
///
/// `Quantifier` is special-cased: its body can only translate inside the
/// scope its bound variables open, so re-walking `body` on its own (the way
/// every other node's children are re-walked) would misreport the bound
/// variable itself as unknown. Open the same scope `lower_quantifier` would,
/// diagnose the body within it, then close it.
pub(crate) fn diagnose_failure(table: &mut SymbolTable, warnings: &mut Vec<String>, expr: &ContractExpr) -> String {
    if let ContractExpr::Quantifier { bindings, body, .. } = expr {
        table.push_scope();
        let mut bind_err = None;
        for binding in bindings {
            if table.bind(&binding.name, &binding.ty).is_none() {
                bind_err = Some(format!(
                    "unsupported type in quantifier binding `{}`: {:?}",
                    binding.name, binding.ty
                ));
                break;
            }
        }
        let diagnosis = match bind_err {
            Some(msg) => msg,
            None => diagnose_failure(table, warnings, body),
        };
        table.pop_scope();
        return diagnosis;
    }

    for child in children(expr) {
        if lower(table, &mut Vec::new(), child).is_err() {
            return diagnose_failure(table, warnings, child);
        }
    }
    match lower(table, warnings, expr) {
        Err(e) => e.diagnose(),
        Ok(_) => "translation succeeded on re-check (transient failure?)".to_string(),
    }
}

fn children(expr: &ContractExpr) -> Vec<&ContractExpr> {
    match expr {
        ContractExpr::Literal(..) | ContractExpr::Ref(..) => Vec::new(),
        ContractExpr::Binary { lhs, rhs, .. } => vec![lhs, rhs],
        ContractExpr::Unary { operand, .. } => vec![operand],
        ContractExpr::Quantifier { body, .. } => vec![body],
        ContractExpr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => vec![cond, then_branch, else_branch],
        ContractExpr::Index { array, index, .. } => vec![array, index],
        ContractExpr::Len(inner, _) => vec![inner],
        ContractExpr::StringOp { args, .. } => args.iter().collect(),
        ContractExpr::Call { args, .. } => args.iter().collect(),
    }
}
