//! SMT Context Factory (spec.md §4.A)
//!
//! A thin capability layer: probe once whether the solver backend is usable,
//! then hand out scoped `Context` values. Every other component degrades to
//! `Unsupported`/`Unproven` when `is_available()` is false, so the host
//! compiler can always fall back to runtime checks.

use std::sync::OnceLock;

#[cfg(feature = "z3")]
static AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Probe that the underlying solver library is loadable and a minimal
/// sanity query succeeds. Memoized for the process lifetime — safe to call
/// from multiple threads (spec.md §5: "the factory's availability probe is
/// safely cacheable across threads").
#[cfg(feature = "z3")]
pub fn is_available() -> bool {
    *AVAILABLE.get_or_init(|| {
        let available = probe();
        if available {
            log::info!("z3 solver backend available, contracts will be statically verified");
        } else {
            log::info!("z3 solver backend not found, contracts will not be statically verified");
        }
        available
    })
}

#[cfg(not(feature = "z3"))]
pub fn is_available() -> bool {
    false
}

#[cfg(feature = "z3")]
fn probe() -> bool {
    // Build a throwaway context and check a trivial tautology. A panic
    // anywhere in here (e.g. the native library failing to load) means the
    // backend isn't usable; catch it rather than let it take down the host
    // compiler's build.
    std::panic::catch_unwind(|| {
        let cfg = z3::Config::new();
        let ctx = z3::Context::new(&cfg);
        let solver = z3::Solver::new(&ctx);
        let x = z3::ast::Bool::from_bool(&ctx, true);
        solver.assert(&x.not());
        matches!(solver.check(), z3::SatResult::Unsat)
    })
    .unwrap_or(false)
}

/// A scoped solver context. One `Context` typically backs one translator
/// and one solver instance per obligation (spec.md §5: "callers must not
/// share a Context across threads").
#[cfg(feature = "z3")]
pub struct Context {
    pub(crate) inner: z3::Context,
}

#[cfg(feature = "z3")]
impl Context {
    pub fn z3(&self) -> &z3::Context {
        &self.inner
    }
}

/// Construct a fresh `Context`. Panics if `is_available()` is false — callers
/// must check availability first; the verifier never calls this without
/// having done so.
#[cfg(feature = "z3")]
pub fn create() -> Context {
    debug_assert!(is_available(), "create() called without checking is_available()");
    let cfg = z3::Config::new();
    Context {
        inner: z3::Context::new(&cfg),
    }
}
