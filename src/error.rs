//! Translation error taxonomy (spec.md §7)
//!
//! These never escape the crate: `Translator::translate` returns `None` on
//! failure and retains the error internally for `diagnose_failure` to render
//! as a single sentence. `TranslationError` is the internal type that makes
//! that rendering a `Display` impl instead of ad-hoc string formatting.

use crate::ast::Span;

/// Why a `ContractExpr` failed to translate to an SMT term.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum TranslationError {
    #[error("unsupported construct: {what} at {span:?}")]
    UnsupportedConstruct { what: String, span: Span },

    #[error("type mismatch: operator `{op}` expected {expected} operands at {span:?}")]
    TypeMismatch {
        op: String,
        expected: String,
        span: Span,
    },

    #[error("unknown variable `{name}`")]
    UnknownVariable { name: String, span: Span },

    #[error("unsupported type: {ty}")]
    UnsupportedType { ty: String, span: Span },
}

impl TranslationError {
    pub fn span(&self) -> Span {
        match self {
            TranslationError::UnsupportedConstruct { span, .. }
            | TranslationError::TypeMismatch { span, .. }
            | TranslationError::UnknownVariable { span, .. }
            | TranslationError::UnsupportedType { span, .. } => *span,
        }
    }

    /// Single-sentence human-readable reason, per §4.B `diagnose_failure`.
    pub fn diagnose(&self) -> String {
        self.to_string()
    }
}
