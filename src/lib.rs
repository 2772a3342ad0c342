//! # calor-verify
//!
//! Static contract verifier for Calor. Discharges `requires`/`ensures`/
//! invariant clauses against an SMT solver, bit-precise in its arithmetic,
//! and reports one of four outcomes per obligation: `Proven`, `Disproven`
//! (with a counterexample), `Unsupported`, or `Unproven`.
//!
//! This crate is consumed as a library by a host compiler; it owns neither
//! the surface parser that produces [`ast::ContractExpr`] trees nor the
//! code generator that inserts runtime checks. See [`config`] for the
//! options a host compiler is expected to thread through.
//!
//! ```no_run
//! # #[cfg(feature = "z3")]
//! # fn example() {
//! use calor_verify::ast::{BinOp, CalorType, ContractExpr, Literal, Span};
//! use calor_verify::config::Config;
//! use calor_verify::verifier::Verifier;
//!
//! let span = Span::synthetic();
//! let ensures = ContractExpr::Binary {
//!     op: BinOp::Ge,
//!     lhs: Box::new(ContractExpr::Ref("result".to_string(), span)),
//!     rhs: Box::new(ContractExpr::Literal(Literal::Int(0), span)),
//!     span,
//! };
//! let verifier = Verifier::new(&Config::default());
//! let declared = vec![("height".to_string(), CalorType::I64)];
//! let result = verifier.verify_postcondition(&declared, &CalorType::I64, &[], &ensures);
//! println!("{:?}", result.status);
//! # }
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod translator;
pub mod verifier;

pub use config::Config;
pub use error::TranslationError;
pub use verifier::{VerificationResult, VerificationStatus};
