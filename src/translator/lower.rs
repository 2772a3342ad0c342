//! Expression lowering: `ContractExpr` → SMT term (spec.md §4.B)
//!
//! The core dispatch is a direct match on `ContractExpr`'s variants (§9:
//! "Dynamic dispatch on expression kind → tagged variants"). Translation is
//! pure with respect to the solver — declaring variables and lowering
//! expressions never assert anything (§3 invariant).

#![cfg(feature = "z3")]

use z3::ast::{Array, Ast, Bool, Dynamic, Int, BV};

use crate::ast::{BinOp, CalorType, ComparisonMode, ContractExpr, Literal, QuantifierKind, StringOp, UnOp};
use crate::error::TranslationError;

use super::symbol_table::{SmtSort, SymbolTable};

/// An SMT term paired with the sort it was built at. Tracking the sort
/// alongside the term (rather than re-deriving it from the `Dynamic`) is
/// what lets the width/signedness coercion policy in §4.B work without
/// re-querying Z3 for a bit-vector's declared sign, which Z3 itself doesn't
/// track (bit-vectors are sign-agnostic at the sort level).
pub(crate) struct Lowered<'ctx> {
    pub term: Dynamic<'ctx>,
    pub sort: SmtSort,
    /// Whether this term came directly from an integer literal with no
    /// declared width of its own — such terms may still be reinterpreted at
    /// a wider/narrower sort when paired with a declared operand (§4.B:
    /// "unless context demands otherwise").
    pub from_literal: bool,
}

impl<'ctx> Lowered<'ctx> {
    fn bv(&self) -> Option<BV<'ctx>> {
        self.term.as_bv()
    }

    fn bool(&self) -> Option<Bool<'ctx>> {
        self.term.as_bool()
    }

    fn string(&self) -> Option<z3::ast::String<'ctx>> {
        self.term.as_string()
    }

    fn array(&self) -> Option<Array<'ctx>> {
        self.term.as_array()
    }
}

/// Lower a single `ContractExpr` node to an SMT term, opening/closing
/// quantifier scopes as needed. This is the one recursive entry point; all
/// node kinds are handled here rather than split across per-kind visitor
/// methods (§9).
pub(crate) fn lower<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    expr: &ContractExpr,
) -> Result<Lowered<'ctx>, TranslationError> {
    match expr {
        ContractExpr::Literal(lit, span) => lower_literal(table, lit, *span),
        ContractExpr::Ref(name, span) => lower_ref(table, name, *span),
        ContractExpr::Binary { op, lhs, rhs, span } => lower_binary(table, warnings, *op, lhs, rhs, *span),
        ContractExpr::Unary { op, operand, span } => lower_unary(table, warnings, *op, operand, *span),
        ContractExpr::Quantifier {
            kind,
            bindings,
            body,
            span,
        } => lower_quantifier(table, warnings, *kind, bindings, body, *span),
        ContractExpr::If {
            cond,
            then_branch,
            else_branch,
            span,
        } => lower_if(table, warnings, cond, then_branch, else_branch, *span),
        ContractExpr::Index { array, index, span } => lower_index(table, warnings, array, index, *span),
        ContractExpr::Len(array, span) => lower_len(table, array, *span),
        ContractExpr::StringOp { op, mode, args, span } => {
            lower_string_op(table, warnings, *op, *mode, args, *span)
        }
        ContractExpr::Call { name, span, .. } => Err(TranslationError::UnsupportedConstruct {
            what: format!("call to external function `{name}`"),
            span: *span,
        }),
    }
}

fn lower_literal<'ctx>(
    table: &SymbolTable<'ctx>,
    lit: &Literal,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    let ctx = table.ctx();
    match lit {
        Literal::Int(v) => {
            let ty = CalorType::narrowest_signed_for(*v);
            let width = ty.int_width().unwrap();
            Ok(Lowered {
                term: BV::from_i64(ctx, *v, width).into(),
                sort: SmtSort::Bv { width, signed: true },
                from_literal: true,
            })
        }
        Literal::Bool(b) => Ok(Lowered {
            term: Bool::from_bool(ctx, *b).into(),
            sort: SmtSort::Bool,
            from_literal: false,
        }),
        Literal::Str(s) => Ok(Lowered {
            term: z3::ast::String::from_str(ctx, s)
                .map_err(|_| TranslationError::UnsupportedConstruct {
                    what: "string literal containing an interior NUL".to_string(),
                    span,
                })?
                .into(),
            sort: SmtSort::Str,
            from_literal: false,
        }),
        Literal::Float(_) => Err(TranslationError::UnsupportedConstruct {
            what: "floating-point literal".to_string(),
            span,
        }),
    }
}

fn lower_ref<'ctx>(
    table: &SymbolTable<'ctx>,
    name: &str,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    let entry = table.get(name).ok_or_else(|| TranslationError::UnknownVariable {
        name: name.to_string(),
        span,
    })?;
    Ok(Lowered {
        term: entry.term.clone(),
        sort: entry.sort.clone(),
        from_literal: false,
    })
}

/// Reinterpret an integer literal at a target bit-vector sort, wrapping
/// silently on overflow per the source's behavior (§9 open question iii) —
/// but, as that note explicitly permits, appending a warning.
fn reinterpret_literal<'ctx>(
    ctx: &'ctx z3::Context,
    value: i64,
    target: &SmtSort,
    warnings: &mut Vec<String>,
) -> BV<'ctx> {
    let SmtSort::Bv { width, signed } = target else {
        unreachable!("reinterpret_literal called with a non-bitvector target sort");
    };
    let fits = if *signed {
        let min = -(1i64 << (width - 1));
        let max = (1i64 << (width - 1)) - 1;
        *width >= 64 || (value >= min && value <= max)
    } else {
        value >= 0 && (*width >= 64 || value <= (1i64 << width) - 1)
    };
    if !fits {
        warnings.push(format!(
            "integer literal `{value}` does not fit in a {width}-bit {} type; wrapped via two's complement",
            if *signed { "signed" } else { "unsigned" }
        ));
    }
    BV::from_i64(ctx, value, *width)
}

/// Resolve the width/signedness the two sides of a binary bit-vector
/// operation should be computed at, widening literals to match a declared
/// operand's sort where one side came from a literal (§4.B: "unless context
/// demands otherwise"), then sign-extending the narrower side to
/// `max(w1, w2)` (§4.B — always sign-extension, a deliberate, documented
/// choice preserved from the source).
fn widen_pair<'ctx>(
    table: &SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    lhs: Lowered<'ctx>,
    rhs: Lowered<'ctx>,
) -> Result<(BV<'ctx>, BV<'ctx>, bool), TranslationError> {
    let ctx = table.ctx();
    let (SmtSort::Bv { width: lw, signed: ls }, SmtSort::Bv { width: rw, signed: rs }) = (&lhs.sort, &rhs.sort)
    else {
        return Err(TranslationError::TypeMismatch {
            op: "arithmetic/comparison".to_string(),
            expected: "integer".to_string(),
            span: crate::ast::Span::synthetic(),
        });
    };

    // A literal paired with a declared operand adopts that operand's sort,
    // as long as it's an honest reinterpretation (still checked for fit).
    let (lhs_bv, lw, ls) = if lhs.from_literal && !rhs.from_literal {
        let v = lhs.bv().unwrap().as_i64().expect("literal BV always has a constant value");
        (reinterpret_literal(ctx, v, &rhs.sort, warnings), *rw, *rs)
    } else {
        (lhs.bv().unwrap(), *lw, *ls)
    };
    let (rhs_bv, rw, rs) = if rhs.from_literal && !lhs.from_literal {
        let v = rhs.bv().unwrap().as_i64().expect("literal BV always has a constant value");
        (reinterpret_literal(ctx, v, &SmtSort::Bv { width: lw, signed: ls }, warnings), lw, ls)
    } else {
        (rhs.bv().unwrap(), rw, rs)
    };

    let width = lw.max(rw);
    let lhs_wide = if lw < width {
        lhs_bv.sign_ext(width - lw)
    } else {
        lhs_bv
    };
    let rhs_wide = if rw < width {
        rhs_bv.sign_ext(width - rw)
    } else {
        rhs_bv
    };

    // Unsigned comparison/division semantics only when *both* operands were
    // declared unsigned (§4.B); mixed or all-signed uses signed semantics.
    let both_unsigned = !ls && !rs;
    Ok((lhs_wide, rhs_wide, !both_unsigned))
}

fn lower_binary<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    op: BinOp,
    lhs: &ContractExpr,
    rhs: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    use BinOp::*;

    if matches!(op, And | Or | Implies) {
        let l = lower(table, warnings, lhs)?;
        let r = lower(table, warnings, rhs)?;
        let (lb, rb) = (
            l.bool().ok_or_else(|| type_mismatch(op, "boolean", span))?,
            r.bool().ok_or_else(|| type_mismatch(op, "boolean", span))?,
        );
        let ctx = table.ctx();
        let term = match op {
            And => Bool::and(ctx, &[&lb, &rb]),
            Or => Bool::or(ctx, &[&lb, &rb]),
            Implies => lb.implies(&rb),
            _ => unreachable!(),
        };
        return Ok(Lowered {
            term: term.into(),
            sort: SmtSort::Bool,
            from_literal: false,
        });
    }

    let l = lower(table, warnings, lhs)?;
    let r = lower(table, warnings, rhs)?;

    if matches!(op, Eq | Ne) {
        let term = match (&l.sort, &r.sort) {
            (SmtSort::Bool, SmtSort::Bool) => l.bool().unwrap()._eq(&r.bool().unwrap()),
            (SmtSort::Str, SmtSort::Str) => l.string().unwrap()._eq(&r.string().unwrap()),
            (SmtSort::Bv { .. }, SmtSort::Bv { .. }) => {
                let (lb, rb, _) = widen_pair(table, warnings, l, r).map_err(|_| type_mismatch(op, "integer", span))?;
                lb._eq(&rb)
            }
            _ => return Err(type_mismatch(op, "matching operand sorts", span)),
        };
        let term = if matches!(op, Ne) { term.not() } else { term };
        return Ok(Lowered {
            term: term.into(),
            sort: SmtSort::Bool,
            from_literal: false,
        });
    }

    // Everything left (arithmetic and ordered comparison) requires integer
    // operands.
    let (lb, rb, use_signed) = widen_pair(table, warnings, l, r).map_err(|_| type_mismatch(op, "integer", span))?;

    let term: Dynamic = match op {
        Add => lb.bvadd(&rb).into(),
        Sub => lb.bvsub(&rb).into(),
        Mul => lb.bvmul(&rb).into(),
        Div => {
            if use_signed {
                lb.bvsdiv(&rb).into()
            } else {
                lb.bvudiv(&rb).into()
            }
        }
        Mod => {
            if use_signed {
                lb.bvsrem(&rb).into()
            } else {
                lb.bvurem(&rb).into()
            }
        }
        Lt => {
            if use_signed {
                lb.bvslt(&rb).into()
            } else {
                lb.bvult(&rb).into()
            }
        }
        Le => {
            if use_signed {
                lb.bvsle(&rb).into()
            } else {
                lb.bvule(&rb).into()
            }
        }
        Gt => {
            if use_signed {
                lb.bvsgt(&rb).into()
            } else {
                lb.bvugt(&rb).into()
            }
        }
        Ge => {
            if use_signed {
                lb.bvsge(&rb).into()
            } else {
                lb.bvuge(&rb).into()
            }
        }
        Eq | Ne | And | Or | Implies => unreachable!("handled above"),
    };

    let sort = match op {
        Add | Sub | Mul | Div | Mod => SmtSort::Bv {
            width: lb.get_size(),
            signed: use_signed,
        },
        _ => SmtSort::Bool,
    };
    Ok(Lowered {
        term,
        sort,
        from_literal: false,
    })
}

fn type_mismatch(op: impl std::fmt::Debug, expected: &str, span: crate::ast::Span) -> TranslationError {
    TranslationError::TypeMismatch {
        op: format!("{op:?}"),
        expected: expected.to_string(),
        span,
    }
}

fn lower_unary<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    op: UnOp,
    operand: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    // Fold negation of an integer literal into a genuine numeral rather than
    // a `bvneg` application node. `widen_pair` re-reads `from_literal` terms
    // with `as_i64()`, which only succeeds on a raw numeral — a `bvneg` node
    // would make it panic instead of failing gracefully (§4.B, §7: failed
    // translation must never throw).
    if let (UnOp::Neg, ContractExpr::Literal(Literal::Int(value), _)) = (op, operand) {
        return lower_literal(table, &Literal::Int(value.wrapping_neg()), span);
    }

    let v = lower(table, warnings, operand)?;
    match op {
        UnOp::Not => {
            let b = v.bool().ok_or_else(|| type_mismatch(op, "boolean", span))?;
            Ok(Lowered {
                term: b.not().into(),
                sort: SmtSort::Bool,
                from_literal: false,
            })
        }
        UnOp::Neg => {
            let bv = v.bv().ok_or_else(|| type_mismatch(op, "integer", span))?;
            let sort = v.sort.clone();
            Ok(Lowered {
                term: bv.bvneg().into(),
                sort,
                from_literal: false,
            })
        }
    }
}

fn lower_quantifier<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    kind: QuantifierKind,
    bindings: &[crate::ast::Binding],
    body: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    table.push_scope();

    let mut bound_terms: Vec<Dynamic<'ctx>> = Vec::with_capacity(bindings.len());
    let mut bind_err = None;
    for binding in bindings {
        match table.bind(&binding.name, &binding.ty) {
            Some(term) => bound_terms.push(term),
            None => {
                bind_err = Some(TranslationError::UnsupportedType {
                    ty: format!("{:?}", binding.ty),
                    span,
                });
                break;
            }
        }
    }

    let result = if let Some(err) = bind_err {
        Err(err)
    } else {
        lower(table, warnings, body).and_then(|l| {
            l.bool().ok_or_else(|| type_mismatch("quantifier body", "boolean", span))
        })
    };

    table.pop_scope();

    let body_bool = result?;
    let refs: Vec<&dyn Ast<'ctx>> = bound_terms.iter().map(|t| t as &dyn Ast<'ctx>).collect();
    let ctx = table.ctx();
    let term = match kind {
        QuantifierKind::Forall => z3::ast::forall_const(ctx, &refs, &[], &body_bool),
        QuantifierKind::Exists => z3::ast::exists_const(ctx, &refs, &[], &body_bool),
    };
    Ok(Lowered {
        term: term.into(),
        sort: SmtSort::Bool,
        from_literal: false,
    })
}

fn lower_if<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    cond: &ContractExpr,
    then_branch: &ContractExpr,
    else_branch: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    let c = lower(table, warnings, cond)?;
    let cb = c.bool().ok_or_else(|| type_mismatch("if", "boolean condition", span))?;
    let then_v = lower(table, warnings, then_branch)?;
    let else_v = lower(table, warnings, else_branch)?;

    if then_v.sort != else_v.sort {
        return Err(TranslationError::TypeMismatch {
            op: "if".to_string(),
            expected: "matching branch types".to_string(),
            span,
        });
    }

    let term = z3::ast::ite(&cb, &then_v.term, &else_v.term);
    Ok(Lowered {
        term,
        sort: then_v.sort,
        from_literal: false,
    })
}

/// Coerce an index expression to unsigned 32-bit, per §4.B ("`i` is coerced
/// to unsigned 32-bit"). Never asserts bounds.
fn coerce_index_to_u32<'ctx>(lowered: Lowered<'ctx>, span: crate::ast::Span) -> Result<BV<'ctx>, TranslationError> {
    let SmtSort::Bv { width, signed } = lowered.sort else {
        return Err(type_mismatch("index", "integer", span));
    };
    let bv = lowered.term.as_bv().unwrap();
    Ok(match width.cmp(&32) {
        std::cmp::Ordering::Equal => bv,
        std::cmp::Ordering::Less => {
            if signed {
                bv.sign_ext(32 - width)
            } else {
                bv.zero_ext(32 - width)
            }
        }
        std::cmp::Ordering::Greater => bv.extract(31, 0),
    })
}

fn lower_index<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    array: &ContractExpr,
    index: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    let arr = lower(table, warnings, array)?;
    let SmtSort::Array { elem, .. } = arr.sort.clone() else {
        return Err(TranslationError::TypeMismatch {
            op: "index".to_string(),
            expected: "array".to_string(),
            span,
        });
    };
    let arr_term = arr.array().ok_or_else(|| type_mismatch("index", "array", span))?;
    let idx_v = lower(table, warnings, index)?;
    let idx_bv = coerce_index_to_u32(idx_v, span)?;

    let selected = arr_term.select(&idx_bv);
    Ok(Lowered {
        term: selected,
        sort: *elem,
        from_literal: false,
    })
}

fn lower_len<'ctx>(
    table: &mut SymbolTable<'ctx>,
    array: &ContractExpr,
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    // `len(a)` only makes sense applied directly to a named array; it
    // resolves (or creates on first reference) the synthetic
    // `<name>$length` variable (§3, §9 open question i).
    let ContractExpr::Ref(name, _) = array else {
        return Err(TranslationError::UnsupportedConstruct {
            what: "len() of a non-array-reference expression".to_string(),
            span,
        });
    };
    let entry = table.declare_length(name);
    Ok(Lowered {
        term: entry.term,
        sort: entry.sort,
        from_literal: false,
    })
}

fn lower_string_op<'ctx>(
    table: &mut SymbolTable<'ctx>,
    warnings: &mut Vec<String>,
    op: StringOp,
    mode: ComparisonMode,
    args: &[ContractExpr],
    span: crate::ast::Span,
) -> Result<Lowered<'ctx>, TranslationError> {
    if !op.is_supported() {
        return Err(TranslationError::UnsupportedConstruct {
            what: format!("string operation `{}`", op.name()),
            span,
        });
    }
    if !mode.is_ordinal() {
        warnings.push(format!(
            "comparison mode `{}` is ignored; verification uses ordinal comparison",
            mode.label()
        ));
    }

    let ctx = table.ctx();
    // Only a leading prefix of `args` is string-sorted for some ops —
    // `indexOf`'s optional start, and `substring`/`substringFrom`'s
    // start/length, are integers and are lowered separately below.
    let string_arg_count = match op {
        StringOp::Length | StringOp::IsEmpty | StringOp::Substring | StringOp::SubstringFrom => 1,
        StringOp::Contains | StringOp::StartsWith | StringOp::EndsWith | StringOp::Equals | StringOp::IndexOf => 2,
        StringOp::Replace => 3,
        StringOp::Concat => args.len(),
        StringOp::ToUpper
        | StringOp::ToLower
        | StringOp::Trim
        | StringOp::RegexTest
        | StringOp::Split
        | StringOp::IsBlank => unreachable!("rejected by is_supported() above"),
    };
    let mut strs = Vec::with_capacity(string_arg_count);
    for a in &args[..string_arg_count] {
        let lowered = lower(table, warnings, a)?;
        let s = lowered.string().ok_or_else(|| type_mismatch(op, "string", span))?;
        strs.push(s);
    }

    let out: Lowered = match op {
        StringOp::Length => {
            let len_int = strs[0].length();
            Lowered {
                term: BV::from_int(&len_int, 32).into(),
                sort: SmtSort::Bv { width: 32, signed: false },
                from_literal: false,
            }
        }
        StringOp::Contains => Lowered {
            term: strs[0].contains(&strs[1]).into(),
            sort: SmtSort::Bool,
            from_literal: false,
        },
        StringOp::StartsWith => Lowered {
            term: strs[0].prefix(&strs[1]).into(),
            sort: SmtSort::Bool,
            from_literal: false,
        },
        StringOp::EndsWith => Lowered {
            term: strs[0].suffix(&strs[1]).into(),
            sort: SmtSort::Bool,
            from_literal: false,
        },
        StringOp::Equals => Lowered {
            term: strs[0]._eq(&strs[1]).into(),
            sort: SmtSort::Bool,
            from_literal: false,
        },
        StringOp::IsEmpty => {
            let empty = z3::ast::String::from_str(ctx, "").expect("empty string literal is always valid");
            Lowered {
                term: strs[0]._eq(&empty).into(),
                sort: SmtSort::Bool,
                from_literal: false,
            }
        }
        StringOp::Concat => {
            let refs: Vec<&z3::ast::String> = strs.iter().collect();
            Lowered {
                term: z3::ast::String::concat(ctx, &refs).into(),
                sort: SmtSort::Str,
                from_literal: false,
            }
        }
        StringOp::IndexOf => {
            // indexOf(s, t, [start]) — convention "-1 when not found" is the
            // solver's own IndexOf semantics (§4.B).
            let offset = if args.len() > 2 {
                let off_v = lower(table, warnings, &args[2])?;
                let signed = off_v.sort.is_signed_bv();
                let off_bv = off_v.bv().ok_or_else(|| type_mismatch(op, "integer offset", span))?;
                Int::from_bv(&off_bv, signed)
            } else {
                Int::from_i64(ctx, 0)
            };
            let idx_int = strs[0].index_of(&strs[1], &offset);
            Lowered {
                term: BV::from_int(&idx_int, 32).into(),
                sort: SmtSort::Bv { width: 32, signed: true },
                from_literal: false,
            }
        }
        StringOp::Substring => {
            let start_v = lower(table, warnings, &args[1])?;
            let start_bv = start_v.bv().ok_or_else(|| type_mismatch(op, "integer start", span))?;
            let len_v = lower(table, warnings, &args[2])?;
            let len_bv = len_v.bv().ok_or_else(|| type_mismatch(op, "integer length", span))?;
            let start_int = Int::from_bv(&start_bv, start_v.sort.is_signed_bv());
            let len_int = Int::from_bv(&len_bv, len_v.sort.is_signed_bv());
            Lowered {
                term: strs[0].substr(&start_int, &len_int).into(),
                sort: SmtSort::Str,
                from_literal: false,
            }
        }
        StringOp::SubstringFrom => {
            let start_v = lower(table, warnings, &args[1])?;
            let start_bv = start_v.bv().ok_or_else(|| type_mismatch(op, "integer start", span))?;
            let start_int = Int::from_bv(&start_bv, start_v.sort.is_signed_bv());
            let len_int = strs[0].length() - &start_int;
            Lowered {
                term: strs[0].substr(&start_int, &len_int).into(),
                sort: SmtSort::Str,
                from_literal: false,
            }
        }
        StringOp::Replace => Lowered {
            // Single-occurrence replacement, matching the solver's built-in
            // (§4.B); callers needing global replacement must compose.
            term: strs[0].replace(&strs[1], &strs[2]).into(),
            sort: SmtSort::Str,
            from_literal: false,
        },
        StringOp::ToUpper
        | StringOp::ToLower
        | StringOp::Trim
        | StringOp::RegexTest
        | StringOp::Split
        | StringOp::IsBlank => unreachable!("rejected by is_supported() above"),
    };
    Ok(out)
}

impl SmtSort {
    fn is_signed_bv(&self) -> bool {
        matches!(self, SmtSort::Bv { signed: true, .. })
    }
}
