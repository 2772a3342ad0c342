//! Verification outcomes (spec.md §3, §4.C)
//!
//! `VerificationStatus` is the sum type every obligation collapses to:
//! `Proven`, `Disproven` with a counterexample, `Unsupported` when the
//! obligation falls outside the translatable fragment, or `Unproven` when
//! the solver itself couldn't decide in time. Serializable so a host
//! compiler can hand results straight to a diagnostics sink.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// The obligation is valid for all inputs.
    Proven,
    /// The obligation has a violating input; `counterexample` renders it as
    /// `name = value` lines (§4.C).
    Disproven { counterexample: String },
    /// The obligation (or some sub-expression of it) falls outside the
    /// translatable fragment.
    Unsupported { reason: String },
    /// The solver neither proved nor disproved the obligation within the
    /// configured timeout, or returned `unknown`.
    Unproven { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    /// Non-fatal notices accumulated while translating this obligation
    /// (ignored comparison modes, literal overflow wraps).
    pub warnings: Vec<String>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl VerificationResult {
    pub fn proven(warnings: Vec<String>, duration: Duration) -> Self {
        VerificationResult {
            status: VerificationStatus::Proven,
            warnings,
            duration,
        }
    }

    pub fn disproven(counterexample: String, warnings: Vec<String>, duration: Duration) -> Self {
        VerificationResult {
            status: VerificationStatus::Disproven { counterexample },
            warnings,
            duration,
        }
    }

    pub fn unsupported(reason: impl Into<String>, warnings: Vec<String>, duration: Duration) -> Self {
        VerificationResult {
            status: VerificationStatus::Unsupported { reason: reason.into() },
            warnings,
            duration,
        }
    }

    pub fn unproven(reason: impl Into<String>, warnings: Vec<String>, duration: Duration) -> Self {
        VerificationResult {
            status: VerificationStatus::Unproven { reason: reason.into() },
            warnings,
            duration,
        }
    }

    pub fn is_proven(&self) -> bool {
        matches!(self.status, VerificationStatus::Proven)
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Render a solver model's relevant assignments as `name = value` lines,
/// sorted by name for determinism (§4.C). Only names present in `table`
/// (including synthetic `$length` companions) are rendered — internal Z3
/// bookkeeping constants never leak into a counterexample.
#[cfg(feature = "z3")]
pub(crate) fn format_counterexample(
    model: &z3::Model,
    table: &crate::translator::symbol_table::SymbolTable,
) -> String {
    use crate::translator::symbol_table::SmtSort;

    let mut lines: Vec<(String, String)> = table
        .names()
        .map(|name| {
            let entry = table.get(name).expect("name came from table.names()");
            let rendered = model
                .eval(&entry.term, true)
                .map(|v| render_value(&v, &entry.sort))
                .unwrap_or_else(|| "<unknown>".to_string());
            (name.to_string(), rendered)
        })
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));
    lines
        .into_iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(feature = "z3")]
fn render_value(value: &z3::ast::Dynamic, sort: &crate::translator::symbol_table::SmtSort) -> String {
    use crate::translator::symbol_table::SmtSort;

    match sort {
        SmtSort::Bv { width, signed } => match value.as_bv().and_then(|bv| bv.as_i64()) {
            Some(i) if *signed => i.to_string(),
            Some(i) => {
                // as_i64 sign-extends from the solver's representation; mask
                // back down to the declared width for unsigned display.
                let mask = if *width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
                (i as u64 & mask).to_string()
            }
            None => "<unknown>".to_string(),
        },
        SmtSort::Bool => value
            .as_bool()
            .and_then(|b| b.as_bool())
            .map(|b| b.to_string())
            .unwrap_or_else(|| "<unknown>".to_string()),
        SmtSort::Str => value
            .as_string()
            .and_then(|s| s.as_string())
            .map(|s| format!("\"{s}\""))
            .unwrap_or_else(|| "<unknown>".to_string()),
        SmtSort::Array { .. } => "<array>".to_string(),
    }
}
