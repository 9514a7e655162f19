//! Generic expression tree - what the parser produces
//!
//! This mirrors the host expression grammar closely and performs no semantic
//! checks. Anything the grammar accepts lands here; the normalizer decides
//! which shapes are part of the filter language.

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    None,
    /// Numeric literal with no `i64`/finite `f64` value, kept as written
    OutOfRange(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    Keyword(String, Expr),
    /// `*expr`
    Starred(Expr),
    /// `**expr`
    DoubleStarred(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// One flat `and`/`or` chain: `a and b and c` holds three operands
    BoolOp(BoolOp, Vec<Expr>),

    /// `not expr`
    Not(Box<Expr>),

    /// `left op1 right1 op2 right2 ...`; more than one op is a chained comparison
    Compare {
        left: Box<Expr>,
        ops: Vec<(CmpOp, Expr)>,
    },

    /// Identifier: `age`, `valid`
    Ident(String),

    /// Literal value
    Literal(Literal),

    /// List display: `[1, 2, 3]`
    List(Vec<Expr>),

    /// Tuple display: `(1, 2)`, `(1,)`
    Tuple(Vec<Expr>),

    /// Attribute access: `expr.name`
    Attr(Box<Expr>, String),

    /// Function/method call: `expr(args...)`
    Call(Box<Expr>, Vec<Arg>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn attr(self, name: impl Into<String>) -> Self {
        Expr::Attr(Box::new(self), name.into())
    }

    pub fn call(self, args: Vec<Arg>) -> Self {
        Expr::Call(Box::new(self), args)
    }

    pub fn compare(self, op: CmpOp, rhs: Expr) -> Self {
        Expr::Compare {
            left: Box::new(self),
            ops: vec![(op, rhs)],
        }
    }
}
