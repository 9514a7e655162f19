//! Single-line rendering of the generic expression tree
//!
//! Used to quote the offending fragment in compile errors. The output
//! reparses to the same tree.

use crate::ast::{Arg, BoolOp, CmpOp, Expr, Literal};
use std::fmt::{self, Display};

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Literal::Int(n) => write!(f, "{}", n),
            Literal::Float(n) => {
                if n.is_finite() && n.fract() == 0.0 {
                    write!(f, "{n:.1}")
                } else {
                    write!(f, "{}", n)
                }
            }
            Literal::Bool(b) => {
                if *b {
                    write!(f, "True")
                } else {
                    write!(f, "False")
                }
            }
            Literal::None => write!(f, "None"),
            Literal::OutOfRange(text) => write!(f, "{}", text),
        }
    }
}

impl Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        };
        write!(f, "{}", s)
    }
}

impl Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::In => "in",
            CmpOp::NotIn => "not in",
            CmpOp::Is => "is",
            CmpOp::IsNot => "is not",
        };
        write!(f, "{}", s)
    }
}

impl Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Positional(e) => write!(f, "{}", e),
            Arg::Keyword(name, e) => write!(f, "{}={}", name, e),
            Arg::Starred(e) => write!(f, "*{}", e),
            Arg::DoubleStarred(e) => write!(f, "**{}", e),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::List(items) => {
                write!(f, "[")?;
                write_comma_separated(f, items)?;
                write!(f, "]")
            }
            Expr::Tuple(items) => {
                write!(f, "(")?;
                write_comma_separated(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Expr::Attr(base, name) => write!(f, "{}.{}", base, name),
            Expr::Call(callee, args) => {
                write!(f, "{}(", callee)?;
                write_comma_separated(f, args)?;
                write!(f, ")")
            }
            Expr::BoolOp(op, operands) => {
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write_operand(f, operand)?;
                }
                Ok(())
            }
            Expr::Not(inner) => {
                write!(f, "not ")?;
                write_operand(f, inner)
            }
            Expr::Compare { left, ops } => {
                write_operand(f, left)?;
                for (op, right) in ops {
                    write!(f, " {} ", op)?;
                    write_operand(f, right)?;
                }
                Ok(())
            }
        }
    }
}

fn write_comma_separated<T: Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Boolean and comparison sub-expressions are parenthesized so grouping survives a reparse
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::BoolOp(..) | Expr::Compare { .. } | Expr::Not(_) => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::parse::parse;

    fn roundtrip(src: &str) -> String {
        parse(src).unwrap().to_string()
    }

    #[test]
    fn display_comparisons_and_calls() {
        assert_eq!(roundtrip("age   ==  1"), "age == 1");
        assert_eq!(roundtrip("x not in ['a', 'b']"), r#"x not in ["a", "b"]"#);
        assert_eq!(roundtrip("Q2.has_any((1,))"), "Q2.has_any((1,))");
        assert_eq!(roundtrip("f(a, k=2, *c)"), "f(a, k=2, *c)");
    }

    #[test]
    fn display_keeps_grouping() {
        assert_eq!(
            roundtrip("(a == 1 and b == 2) or not c == 3"),
            "((a == 1) and (b == 2)) or (not (c == 3))"
        );
    }

    #[test]
    fn display_reparses_to_same_tree() {
        for src in [
            "(a and b) and c",
            "not (x in [1, 2]) or valid(a, b)",
            "1 < x < 5",
            r#"name == "quote\"d""#,
            "x == -2.5",
        ] {
            let parsed = parse(src).unwrap();
            assert_eq!(parse(&parsed.to_string()).unwrap(), parsed, "{src}");
        }
    }
}
