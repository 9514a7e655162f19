//! Normalize the generic expression tree into the canonical query tree
//!
//! This pass:
//! - Folds flat `and`/`or` chains into right-associated binary calls
//! - Maps comparisons onto `{function, args}`, keeping operand sidedness
//! - Recognizes `var.has_any/has_all/has_count/duplicates(...)` method calls
//! - Expands the `valid(...)`/`missing(...)` helpers
//! - Rejects every construct outside the filter language

use thiserror::Error;

use crate::ast::{Arg, BoolOp, CmpOp, Expr, Literal};
use crate::ir::{Expr as IrExpr, Function, Value};

/// A syntactically valid expression outside the supported subset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("{construct} is not supported: `{fragment}`")]
    Unsupported {
        construct: &'static str,
        fragment: String,
    },

    #[error("`{0}` is not a condition")]
    NotAPredicate(String),

    #[error("invalid comparison operand `{0}`")]
    InvalidOperand(String),

    #[error("list literals must hold only integers or only strings: `{0}`")]
    InvalidList(String),

    #[error("unknown method `{0}`")]
    UnknownMethod(String),

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("calls must target a variable method or a helper function: `{0}`")]
    InvalidCallTarget(String),

    #[error("`{function}` does not accept keyword or starred arguments")]
    NonPositionalArgument { function: String },

    #[error("`{function}` expects {expected}, got {got} argument(s)")]
    Arity {
        function: String,
        expected: &'static str,
        got: usize,
    },

    #[error("`{function}` expects {expected}, got `{got}`")]
    InvalidArgument {
        function: String,
        expected: &'static str,
        got: String,
    },
}

type Result<T> = std::result::Result<T, CompileError>;

/// Compile a generic expression tree into the canonical query tree
pub fn normalize(expr: &Expr) -> Result<IrExpr> {
    normalize_predicate(expr)
}

fn normalize_predicate(expr: &Expr) -> Result<IrExpr> {
    match expr {
        Expr::BoolOp(op, operands) => {
            let function = match op {
                BoolOp::And => Function::And,
                BoolOp::Or => Function::Or,
            };
            let args = operands
                .iter()
                .map(normalize_predicate)
                .collect::<Result<Vec<_>>>()?;
            IrExpr::fold_right(function, args).ok_or_else(|| CompileError::Unsupported {
                construct: "an empty boolean chain",
                fragment: expr.to_string(),
            })
        }
        Expr::Not(inner) => Ok(IrExpr::call(
            Function::Not,
            vec![normalize_predicate(inner)?],
        )),
        Expr::Compare { left, ops } => normalize_compare(expr, left, ops),
        Expr::Call(callee, args) => normalize_call(expr, callee, args),
        Expr::Ident(_) | Expr::Literal(_) | Expr::List(_) | Expr::Tuple(_) | Expr::Attr(..) => {
            Err(CompileError::NotAPredicate(expr.to_string()))
        }
    }
}

// ============ Comparisons ============

fn normalize_compare(expr: &Expr, left: &Expr, ops: &[(CmpOp, Expr)]) -> Result<IrExpr> {
    let [(op, right)] = ops else {
        return Err(CompileError::Unsupported {
            construct: "a chained comparison",
            fragment: expr.to_string(),
        });
    };

    let function = match op {
        CmpOp::Eq => Function::Eq,
        CmpOp::Ne => Function::Ne,
        CmpOp::Lt => Function::Lt,
        CmpOp::Le => Function::Le,
        CmpOp::Gt => Function::Gt,
        CmpOp::Ge => Function::Ge,
        CmpOp::In | CmpOp::NotIn => Function::In,
        CmpOp::Is | CmpOp::IsNot => {
            return Err(CompileError::Unsupported {
                construct: "an identity comparison",
                fragment: expr.to_string(),
            });
        }
    };

    let call = IrExpr::call(
        function,
        vec![normalize_operand(left)?, normalize_operand(right)?],
    );
    if *op == CmpOp::NotIn {
        Ok(IrExpr::call(Function::Not, vec![call]))
    } else {
        Ok(call)
    }
}

fn normalize_operand(expr: &Expr) -> Result<IrExpr> {
    match expr {
        Expr::Ident(name) => Ok(IrExpr::Variable(name.clone())),
        Expr::Literal(Literal::Int(n)) => Ok(IrExpr::Value(Value::Int(*n))),
        Expr::Literal(Literal::Float(n)) => Ok(IrExpr::Value(Value::Float(*n))),
        Expr::Literal(Literal::Str(s)) => Ok(IrExpr::Value(Value::Str(s.clone()))),
        Expr::List(items) | Expr::Tuple(items) => Ok(IrExpr::Value(list_value(expr, items)?)),
        _ => Err(CompileError::InvalidOperand(expr.to_string())),
    }
}

/// Homogeneous list of integers or strings; `[]` is an empty integer list
fn list_value(expr: &Expr, items: &[Expr]) -> Result<Value> {
    if let Some(item) = items
        .iter()
        .find(|item| matches!(item, Expr::Literal(Literal::OutOfRange(_))))
    {
        return Err(CompileError::InvalidOperand(item.to_string()));
    }

    let ints: Option<Vec<i64>> = items
        .iter()
        .map(|item| match item {
            Expr::Literal(Literal::Int(n)) => Some(*n),
            _ => None,
        })
        .collect();
    if let Some(ints) = ints {
        return Ok(Value::IntList(ints));
    }

    let strs: Option<Vec<String>> = items
        .iter()
        .map(|item| match item {
            Expr::Literal(Literal::Str(s)) => Some(s.clone()),
            _ => None,
        })
        .collect();
    strs.map(Value::StrList)
        .ok_or_else(|| CompileError::InvalidList(expr.to_string()))
}

// ============ Calls ============

fn normalize_call(expr: &Expr, callee: &Expr, args: &[Arg]) -> Result<IrExpr> {
    match callee {
        Expr::Attr(base, method) => {
            let Expr::Ident(variable) = base.as_ref() else {
                return Err(CompileError::InvalidCallTarget(expr.to_string()));
            };
            normalize_method(variable, method, args)
        }
        Expr::Ident(name) => normalize_helper(name, args),
        _ => Err(CompileError::InvalidCallTarget(expr.to_string())),
    }
}

fn normalize_method(variable: &str, method: &str, args: &[Arg]) -> Result<IrExpr> {
    let function = match method {
        "has_any" => Function::Any,
        "has_all" => Function::All,
        "has_count" => Function::HasCount,
        "duplicates" => Function::Duplicates,
        _ => return Err(CompileError::UnknownMethod(method.to_string())),
    };
    let args = positional_args(method, args)?;
    let target = IrExpr::Variable(variable.to_string());

    match function {
        Function::Any | Function::All => {
            let [arg] = args.as_slice() else {
                return Err(CompileError::Arity {
                    function: method.to_string(),
                    expected: "exactly one list argument",
                    got: args.len(),
                });
            };
            let (Expr::List(items) | Expr::Tuple(items)) = arg else {
                return Err(CompileError::InvalidArgument {
                    function: method.to_string(),
                    expected: "a list of integers or strings",
                    got: arg.to_string(),
                });
            };
            let values = list_value(arg, items)?;
            Ok(IrExpr::call(function, vec![target, IrExpr::Value(values)]))
        }
        Function::HasCount => {
            let [arg] = args.as_slice() else {
                return Err(CompileError::Arity {
                    function: method.to_string(),
                    expected: "exactly one integer argument",
                    got: args.len(),
                });
            };
            let Expr::Literal(Literal::Int(count)) = arg else {
                return Err(CompileError::InvalidArgument {
                    function: method.to_string(),
                    expected: "an integer",
                    got: arg.to_string(),
                });
            };
            Ok(IrExpr::call(
                function,
                vec![target, IrExpr::Value(Value::Int(*count))],
            ))
        }
        _ => {
            if !args.is_empty() {
                return Err(CompileError::Arity {
                    function: method.to_string(),
                    expected: "no arguments",
                    got: args.len(),
                });
            }
            Ok(IrExpr::call(function, vec![target]))
        }
    }
}

/// `valid(a, b)` → `and(is_valid(a), is_valid(b))`
fn normalize_helper(name: &str, args: &[Arg]) -> Result<IrExpr> {
    let function = match name {
        "valid" => Function::IsValid,
        "missing" => Function::IsMissing,
        _ => return Err(CompileError::UnknownFunction(name.to_string())),
    };
    let args = positional_args(name, args)?;

    let checks = args
        .iter()
        .map(|arg| match arg {
            Expr::Ident(variable) => Ok(IrExpr::call(
                function,
                vec![IrExpr::Variable(variable.clone())],
            )),
            other => Err(CompileError::InvalidArgument {
                function: name.to_string(),
                expected: "variable names",
                got: other.to_string(),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    IrExpr::fold_right(Function::And, checks).ok_or_else(|| CompileError::Arity {
        function: name.to_string(),
        expected: "at least one variable",
        got: 0,
    })
}

fn positional_args<'a>(function: &str, args: &'a [Arg]) -> Result<Vec<&'a Expr>> {
    args.iter()
        .map(|arg| match arg {
            Arg::Positional(e) => Ok(e),
            Arg::Keyword(..) | Arg::Starred(_) | Arg::DoubleStarred(_) => {
                Err(CompileError::NonPositionalArgument {
                    function: function.to_string(),
                })
            }
        })
        .collect()
}
