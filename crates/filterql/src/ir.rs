//! Canonical query tree
//!
//! Every node is one of `{function, args}`, `{variable}` or `{value}`, which is
//! also exactly how it serializes into a filter or derivation payload.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// Operator or method applied by a [`Call`] node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    /// `var.has_any([...])`
    Any,
    /// `var.has_all([...])`
    All,
    HasCount,
    Duplicates,
    IsValid,
    IsMissing,
    /// Whole-array validity, evaluated natively by the service
    AllValid,
    AllMissing,
}

impl Function {
    /// Name used in the service payload
    pub fn as_str(self) -> &'static str {
        match self {
            Function::And => "and",
            Function::Or => "or",
            Function::Not => "not",
            Function::Eq => "==",
            Function::Ne => "!=",
            Function::Lt => "<",
            Function::Le => "<=",
            Function::Gt => ">",
            Function::Ge => ">=",
            Function::In => "in",
            Function::Any => "any",
            Function::All => "all",
            Function::HasCount => "has_count",
            Function::Duplicates => "duplicates",
            Function::IsValid => "is_valid",
            Function::IsMissing => "is_missing",
            Function::AllValid => "all_valid",
            Function::AllMissing => "all_missing",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Function {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Literal carried by a `{value}` node
///
/// Lists are homogeneous; an empty list literal is an empty `IntList`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
    StrList(Vec<String>),
}

impl Value {
    pub fn list_len(&self) -> Option<usize> {
        match self {
            Value::IntList(items) => Some(items.len()),
            Value::StrList(items) => Some(items.len()),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        self.list_len().is_some()
    }

    /// The only element of a one-element list
    pub fn single_element(&self) -> Option<Value> {
        match self {
            Value::IntList(items) if items.len() == 1 => Some(Value::Int(items[0])),
            Value::StrList(items) if items.len() == 1 => Some(Value::Str(items[0].clone())),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<i64>> for Value {
    fn from(items: Vec<i64>) -> Self {
        Value::IntList(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::StrList(items)
    }
}

impl From<Vec<&str>> for Value {
    fn from(items: Vec<&str>) -> Self {
        Value::StrList(items.into_iter().map(String::from).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub function: Function,
    /// Order is significant: `a < b` and `b < a` differ only here
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Symbolic reference, not yet resolved
    Variable(String),

    /// Resolved reference carrying a service address
    Address(String),

    Value(Value),

    Call(Call),
}

impl Expr {
    pub fn variable(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn address(address: impl Into<String>) -> Self {
        Expr::Address(address.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Expr::Value(value.into())
    }

    pub fn call(function: Function, args: Vec<Expr>) -> Self {
        Expr::Call(Call { function, args })
    }

    /// Right-associated fold: `[a, b, c]` becomes `f(a, f(b, c))`.
    ///
    /// A single operand is returned unwrapped; no operands yields `None`.
    pub fn fold_right(function: Function, operands: Vec<Expr>) -> Option<Expr> {
        operands
            .into_iter()
            .rev()
            .reduce(|acc, operand| Expr::call(function, vec![operand, acc]))
    }

    /// True while any `Variable` node remains in the tree
    pub fn has_unresolved(&self) -> bool {
        match self {
            Expr::Variable(_) => true,
            Expr::Address(_) | Expr::Value(_) => false,
            Expr::Call(call) => call.args.iter().any(Expr::has_unresolved),
        }
    }

    /// Symbolic names in depth-first order, duplicates included
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Variable(name) => names.push(name),
            Expr::Address(_) | Expr::Value(_) => {}
            Expr::Call(call) => {
                for arg in &call.args {
                    arg.collect_variables(names);
                }
            }
        }
    }

    /// Payload form as a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        // Serializing plain strings, numbers and maps into a Value cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Expr::Variable(reference) | Expr::Address(reference) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("variable", reference)?;
                map.end()
            }
            Expr::Value(value) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("value", value)?;
                map.end()
            }
            Expr::Call(call) => call.serialize(serializer),
        }
    }
}

impl Serialize for Call {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("function", &self.function)?;
        map.serialize_entry("args", &self.args)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fold_right_associates() {
        let folded = Expr::fold_right(
            Function::And,
            vec![Expr::variable("a"), Expr::variable("b"), Expr::variable("c")],
        )
        .unwrap();
        assert_eq!(
            folded,
            Expr::call(
                Function::And,
                vec![
                    Expr::variable("a"),
                    Expr::call(Function::And, vec![Expr::variable("b"), Expr::variable("c")]),
                ]
            )
        );
    }

    #[test]
    fn fold_right_edge_sizes() {
        assert_eq!(Expr::fold_right(Function::Or, vec![]), None);
        assert_eq!(
            Expr::fold_right(Function::Or, vec![Expr::variable("a")]),
            Some(Expr::variable("a"))
        );
    }

    #[test]
    fn serializes_to_payload_shape() {
        let expr = Expr::call(
            Function::Not,
            vec![Expr::call(
                Function::In,
                vec![Expr::variable("country"), Expr::value(vec![1i64, 2, 3])],
            )],
        );
        assert_eq!(
            expr.to_json(),
            json!({
                "function": "not",
                "args": [{
                    "function": "in",
                    "args": [{"variable": "country"}, {"value": [1, 2, 3]}]
                }]
            })
        );
    }

    #[test]
    fn address_serializes_under_variable_key() {
        let expr = Expr::address("https://example.test/variables/0001/");
        assert_eq!(
            expr.to_json(),
            json!({"variable": "https://example.test/variables/0001/"})
        );
    }

    #[test]
    fn collects_unresolved_names() {
        let expr = Expr::call(
            Function::Lt,
            vec![Expr::variable("start"), Expr::address("addr")],
        );
        assert!(expr.has_unresolved());
        assert_eq!(expr.variables(), vec!["start"]);
        assert!(!Expr::address("addr").has_unresolved());
    }
}
