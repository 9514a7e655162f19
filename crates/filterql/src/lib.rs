//! FilterQL - filter expressions for tabular data services
//!
//! Compiles a small Python-like boolean language into the `{function, args}`
//! query tree a remote dataset service accepts as a row filter or
//! derived-variable rule, then resolves variable aliases into addresses.
//!
//! ## Quick Start
//!
//! ```ignore
//! use filterql::{Catalog, Subvariable, compile, compile_and_resolve};
//!
//! let expr = compile("(disposition == 0 and exit_status == 1) or Q2.has_any([1, 2])")?;
//!
//! let catalog = Catalog::new()
//!     .with_scalar("disposition", "https://.../variables/0001/")
//!     .with_scalar("exit_status", "https://.../variables/0002/")
//!     .with_array("Q2", "https://.../variables/0003/", [
//!         Subvariable::new("Q2_1", "https://.../subvariables/a/"),
//!         Subvariable::new("Q2_2", "https://.../subvariables/b/"),
//!     ]);
//! let payload = compile_and_resolve("Q2.has_any([1, 2])", &catalog)?.to_json();
//! ```
//!
//! ## Language
//!
//! - comparisons: `==`, `!=`, `<`, `<=`, `>`, `>=`, `in`, `not in`
//! - boolean: `and`, `or`, `not`, parentheses
//! - methods: `var.has_any([..])`, `var.has_all([..])`, `var.has_count(n)`, `var.duplicates()`
//! - helpers: `valid(a, b, ...)`, `missing(a, b, ...)`

mod ast;
pub mod builders;
mod catalog;
mod ir;
mod normalize;
mod parse;
mod pretty;
mod resolve;

use thiserror::Error;

// ============ Primary Public API ============

pub use catalog::{
    Catalog, LookupError, Subvariable, VariableKind, VariableLookup, VariableMetadata,
};
pub use ir::{Call, Expr, Function, Value};

/// Compile an expression into an unresolved query tree
pub fn compile(source: &str) -> Result<Expr, FilterError> {
    let tree = parse::parse(source)?;
    let expr = normalize::normalize(&tree)?;
    log::trace!("Compiled `{}` into {:?}", source, expr);
    Ok(expr)
}

/// Compile an expression and resolve its variables against `lookup`
pub fn compile_and_resolve<L>(source: &str, lookup: &L) -> Result<Expr, FilterError>
where
    L: VariableLookup + ?Sized,
{
    let expr = compile(source)?;
    log::debug!("Resolving variables in `{}`", source);
    Ok(resolve::resolve(&expr, lookup)?)
}

/// Resolve variables in an already compiled tree
pub fn resolve<L>(expr: &Expr, lookup: &L) -> Result<Expr, FilterError>
where
    L: VariableLookup + ?Sized,
{
    Ok(resolve::resolve(expr, lookup)?)
}

/// Resolve a batch of compiled trees, failing on the first error
pub fn resolve_all<L>(exprs: &[Expr], lookup: &L) -> Result<Vec<Expr>, FilterError>
where
    L: VariableLookup + ?Sized,
{
    Ok(resolve::resolve_all(exprs, lookup)?)
}

// ============ Errors ============

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] parse::ParseError),
    #[error("Unsupported expression: {0}")]
    Unsupported(#[from] normalize::CompileError),
    #[error("Resolve error: {0}")]
    Resolve(#[from] resolve::ResolveError),
}

pub use normalize::CompileError;
pub use parse::ParseError;
pub use resolve::ResolveError;

// ============ Advanced: Tree Access ============

/// Low-level access to the individual passes
pub mod advanced {
    pub use crate::ast::{Arg, BoolOp, CmpOp, Expr as TreeExpr, Literal};
    pub use crate::normalize::normalize;
    pub use crate::parse::{MAX_NESTING, parse};
}
