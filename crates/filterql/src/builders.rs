//! Helpers for building query trees in code
//!
//! ```ignore
//! use filterql::builders::*;
//!
//! // (exit_status > 178 and age == 21) or birthyr <= 2000
//! let expr = or(and(gt("exit_status", 178), eq("age", 21)), le("birthyr", 2000));
//! ```

use crate::ir::{Expr, Function, Value};

/// Build a `{variable}` node
pub fn var(name: &str) -> Expr {
    Expr::variable(name)
}

/// Build a `{value}` node
pub fn value(v: impl Into<Value>) -> Expr {
    Expr::value(v)
}

/// Build `function(variable, value)`
pub fn compare(function: Function, variable: &str, v: impl Into<Value>) -> Expr {
    Expr::call(function, vec![var(variable), value(v)])
}

pub fn eq(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Eq, variable, v)
}

pub fn ne(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Ne, variable, v)
}

pub fn lt(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Lt, variable, v)
}

pub fn le(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Le, variable, v)
}

pub fn gt(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Gt, variable, v)
}

pub fn ge(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::Ge, variable, v)
}

pub fn is_in(variable: &str, v: impl Into<Value>) -> Expr {
    compare(Function::In, variable, v)
}

pub fn not(expr: Expr) -> Expr {
    Expr::call(Function::Not, vec![expr])
}

pub fn and(left: Expr, right: Expr) -> Expr {
    Expr::call(Function::And, vec![left, right])
}

pub fn or(left: Expr, right: Expr) -> Expr {
    Expr::call(Function::Or, vec![left, right])
}

/// Right-folded `and` over any number of conditions; `None` when empty
pub fn all_of(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    Expr::fold_right(Function::And, exprs.into_iter().collect())
}

/// Right-folded `or` over any number of conditions; `None` when empty
pub fn any_of(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
    Expr::fold_right(Function::Or, exprs.into_iter().collect())
}
