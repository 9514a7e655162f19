//! Resolve variable names into service addresses
//!
//! A single depth-first pass. Every `Variable` becomes an `Address`; calls
//! whose first argument names a whole array variable are rewritten over the
//! array's sub-elements. `Address` and `Value` nodes pass through untouched,
//! so resolving an already-resolved tree returns it unchanged.

use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{LookupError, Subvariable, VariableKind, VariableLookup};
use crate::ir::{Expr, Function, Value};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("invalid array operation on `{variable}`: {reason}")]
    InvalidArrayOperation { variable: String, reason: String },

    #[error(transparent)]
    Lookup(LookupError),
}

impl From<LookupError> for ResolveError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(name) => ResolveError::UndefinedVariable(name),
            other => ResolveError::Lookup(other),
        }
    }
}

type Result<T> = std::result::Result<T, ResolveError>;

/// Resolve every variable in `expr` against `lookup`
///
/// Fails on the first lookup or array error; nothing is partially substituted.
pub fn resolve<L>(expr: &Expr, lookup: &L) -> Result<Expr>
where
    L: VariableLookup + ?Sized,
{
    Ok(resolve_node(expr, lookup)?.expr)
}

/// Resolve a batch of expressions, failing on the first error
pub fn resolve_all<L>(exprs: &[Expr], lookup: &L) -> Result<Vec<Expr>>
where
    L: VariableLookup + ?Sized,
{
    exprs.iter().map(|expr| resolve(expr, lookup)).collect()
}

/// Whole-array variable a resolved node refers to
struct ArrayTarget {
    alias: String,
    address: String,
    subvariables: Arc<[Subvariable]>,
}

struct Resolved {
    expr: Expr,
    /// Set only for a direct reference to an array variable
    array: Option<ArrayTarget>,
}

impl Resolved {
    fn scalar(expr: Expr) -> Self {
        Self { expr, array: None }
    }
}

fn resolve_node<L>(expr: &Expr, lookup: &L) -> Result<Resolved>
where
    L: VariableLookup + ?Sized,
{
    match expr {
        Expr::Variable(name) => {
            let meta = lookup.lookup(name)?;
            let array = match meta.kind {
                VariableKind::Array(subvariables) => Some(ArrayTarget {
                    alias: name.clone(),
                    address: meta.address.clone(),
                    subvariables,
                }),
                VariableKind::Scalar | VariableKind::Subvariable { .. } => None,
            };
            Ok(Resolved {
                expr: Expr::Address(meta.address),
                array,
            })
        }
        Expr::Address(_) | Expr::Value(_) => Ok(Resolved::scalar(expr.clone())),
        Expr::Call(call) => {
            let mut args = call
                .args
                .iter()
                .map(|arg| resolve_node(arg, lookup))
                .collect::<Result<Vec<_>>>()?;

            if let Some(op) = ArrayOp::of(call.function)
                && let Some(first) = args.first_mut()
                && let Some(array) = first.array.take()
            {
                let rest: Vec<Expr> = args.into_iter().skip(1).map(|r| r.expr).collect();
                return expand_array(op, array, &rest).map(Resolved::scalar);
            }

            Ok(Resolved::scalar(Expr::call(
                call.function,
                args.into_iter().map(|r| r.expr).collect(),
            )))
        }
    }
}

// ============ Array expansion ============

/// Functions whose first argument may name a whole array variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayOp {
    Any,
    All,
    HasCount,
    Duplicates,
    IsValid,
    IsMissing,
}

impl ArrayOp {
    fn of(function: Function) -> Option<Self> {
        match function {
            Function::Any => Some(ArrayOp::Any),
            Function::All => Some(ArrayOp::All),
            Function::HasCount => Some(ArrayOp::HasCount),
            Function::Duplicates => Some(ArrayOp::Duplicates),
            Function::IsValid => Some(ArrayOp::IsValid),
            Function::IsMissing => Some(ArrayOp::IsMissing),
            _ => None,
        }
    }

    fn function(self) -> Function {
        match self {
            ArrayOp::Any => Function::Any,
            ArrayOp::All => Function::All,
            ArrayOp::HasCount => Function::HasCount,
            ArrayOp::Duplicates => Function::Duplicates,
            ArrayOp::IsValid => Function::IsValid,
            ArrayOp::IsMissing => Function::IsMissing,
        }
    }
}

fn expand_array(op: ArrayOp, array: ArrayTarget, rest: &[Expr]) -> Result<Expr> {
    let function = op.function();
    log::debug!(
        "Expanding `{}` over array `{}` ({} subvariables)",
        function,
        array.alias,
        array.subvariables.len()
    );

    match op {
        // any: s0 in L or (s1 in L or ...)
        ArrayOp::Any => {
            let values = list_argument(&array, function, rest)?;
            per_subvariable(&array, Function::Or, |address| {
                Expr::call(
                    Function::In,
                    vec![Expr::Address(address), Expr::Value(values.clone())],
                )
            })
        }
        // all: s0 == v and (s1 == v and ...)
        ArrayOp::All => {
            let values = list_argument(&array, function, rest)?;
            let target = values.single_element().ok_or_else(|| {
                invalid(
                    &array,
                    "has_all over an array only supports a single target value",
                )
            })?;
            per_subvariable(&array, Function::And, |address| {
                Expr::call(
                    Function::Eq,
                    vec![Expr::Address(address), Expr::Value(target.clone())],
                )
            })
        }
        ArrayOp::IsValid => Ok(Expr::call(
            Function::AllValid,
            vec![Expr::Address(array.address)],
        )),
        ArrayOp::IsMissing => Ok(Expr::call(
            Function::AllMissing,
            vec![Expr::Address(array.address)],
        )),
        ArrayOp::HasCount | ArrayOp::Duplicates => Err(invalid(
            &array,
            &format!("`{function}` is not defined over array variables"),
        )),
    }
}

fn list_argument<'a>(
    array: &ArrayTarget,
    function: Function,
    rest: &'a [Expr],
) -> Result<&'a Value> {
    match rest.first() {
        Some(Expr::Value(values)) if values.is_list() => Ok(values),
        _ => Err(invalid(
            array,
            &format!("`{function}` over an array needs a list of values"),
        )),
    }
}

/// Build one node per sub-element, in declaration order, right-folded with `join`
fn per_subvariable<F>(array: &ArrayTarget, join: Function, build: F) -> Result<Expr>
where
    F: Fn(String) -> Expr,
{
    let nodes = array
        .subvariables
        .iter()
        .map(|sub| build(sub.address.clone()))
        .collect();
    Expr::fold_right(join, nodes).ok_or_else(|| invalid(array, "the array has no subvariables"))
}

fn invalid(array: &ArrayTarget, reason: &str) -> ResolveError {
    ResolveError::InvalidArrayOperation {
        variable: array.alias.clone(),
        reason: reason.to_string(),
    }
}
