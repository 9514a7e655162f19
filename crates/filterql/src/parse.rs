//! Parser for filter expressions
//!
//! Accepts the host expression grammar (boolean operators, comparisons,
//! literals, identifiers, attribute access and calls) and produces an
//! `ast::Expr`. No semantic checks happen here; `normalize` decides what is
//! part of the filter language.

use winnow::ascii::{digit1, multispace0};
use winnow::combinator::{alt, delimited, not, opt, preceded, repeat, separated, terminated};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::stream::Stateful;
use winnow::token::{any, one_of, take_till, take_while};

use crate::ast::{Arg, BoolOp, CmpOp, Expr, Literal};

type PResult<T> = winnow::ModalResult<T>;

type Input<'a> = Stateful<&'a str, Nesting>;

const KEYWORDS: &[&str] = &["and", "or", "not", "in", "is", "True", "False", "None"];

/// Deepest nesting of sub-expressions (brackets, call arguments, `not`)
pub const MAX_NESTING: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
struct Nesting {
    depth: usize,
    exceeded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (line {}, column {}, offset {})",
            self.message, self.line, self.column, self.offset
        )
    }
}

impl std::error::Error for ParseError {}

/// Parse a filter expression from a string
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(build_parse_error("empty expression".to_string(), input, 0));
    }
    let mut stream = Input {
        input,
        state: Nesting::default(),
    };
    match expr.parse_next(&mut stream) {
        Ok(parsed) => {
            if stream.input.trim().is_empty() {
                Ok(parsed)
            } else {
                let offset = trailing_input_offset(input, stream.input);
                Err(build_parse_error(
                    "unexpected trailing input".to_string(),
                    input,
                    offset,
                ))
            }
        }
        Err(e) => {
            let offset = input.len().saturating_sub(stream.input.len());
            let message = if stream.state.exceeded {
                "expression nested too deeply".to_string()
            } else {
                error_message(&e)
            };
            Err(build_parse_error(message, input, offset))
        }
    }
}

fn error_message(err: &ErrMode<ContextError>) -> String {
    let detail = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx.to_string(),
        ErrMode::Incomplete(_) => String::new(),
    };
    if detail.is_empty() {
        "invalid syntax".to_string()
    } else {
        format!("invalid syntax: {detail}")
    }
}

fn build_parse_error(message: String, input: &str, offset: usize) -> ParseError {
    let (line, column) = offset_to_line_column(input, offset);
    ParseError {
        message,
        offset,
        line,
        column,
    }
}

fn offset_to_line_column(input: &str, offset: usize) -> (usize, usize) {
    let bounded = offset.min(input.len());
    let mut line = 1usize;
    let mut column = 1usize;

    for ch in input[..bounded].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}

fn trailing_input_offset(input: &str, trailing: &str) -> usize {
    let base = input.len().saturating_sub(trailing.len());
    let non_ws = trailing
        .char_indices()
        .find(|(_, ch)| !ch.is_whitespace())
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    base + non_ws
}

/// Run `parser` one nesting level deeper, failing hard past `MAX_NESTING`
fn nested<'a, O>(
    mut parser: impl Parser<Input<'a>, O, ErrMode<ContextError>>,
) -> impl FnMut(&mut Input<'a>) -> PResult<O> {
    move |input: &mut Input<'a>| {
        if input.state.depth >= MAX_NESTING {
            input.state.exceeded = true;
            return Err(ErrMode::Cut(ContextError::new()));
        }
        input.state.depth += 1;
        let result = parser.parse_next(input);
        input.state.depth -= 1;
        result
    }
}

// ============ Boolean layer (handles precedence) ============

fn expr(input: &mut Input<'_>) -> PResult<Expr> {
    nested(or_expr).parse_next(input)
}

fn or_expr(input: &mut Input<'_>) -> PResult<Expr> {
    let first = and_expr.parse_next(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword("or")), and_expr)).parse_next(input)?;
    Ok(bool_chain(BoolOp::Or, first, rest))
}

fn and_expr(input: &mut Input<'_>) -> PResult<Expr> {
    let first = not_expr.parse_next(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, keyword("and")), not_expr)).parse_next(input)?;
    Ok(bool_chain(BoolOp::And, first, rest))
}

/// A chain keeps all of its operands flat; grouping is the normalizer's job.
fn bool_chain(op: BoolOp, first: Expr, rest: Vec<Expr>) -> Expr {
    if rest.is_empty() {
        return first;
    }
    let mut operands = Vec::with_capacity(rest.len() + 1);
    operands.push(first);
    operands.extend(rest);
    Expr::BoolOp(op, operands)
}

fn not_expr(input: &mut Input<'_>) -> PResult<Expr> {
    alt((
        preceded((ws, keyword("not")), nested(not_expr)).map(|e| Expr::Not(Box::new(e))),
        comparison,
    ))
    .parse_next(input)
}

fn comparison(input: &mut Input<'_>) -> PResult<Expr> {
    let left = postfix_expr.parse_next(input)?;
    let ops: Vec<(CmpOp, Expr)> =
        repeat(0.., (ws, cmp_op, postfix_expr).map(|(_, op, e)| (op, e))).parse_next(input)?;
    if ops.is_empty() {
        Ok(left)
    } else {
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
        })
    }
}

fn cmp_op(input: &mut Input<'_>) -> PResult<CmpOp> {
    alt((
        "==".value(CmpOp::Eq),
        "!=".value(CmpOp::Ne),
        "<=".value(CmpOp::Le),
        ">=".value(CmpOp::Ge),
        "<".value(CmpOp::Lt),
        ">".value(CmpOp::Gt),
        (keyword("not"), ws, keyword("in")).value(CmpOp::NotIn),
        keyword("in").value(CmpOp::In),
        (keyword("is"), ws, keyword("not")).value(CmpOp::IsNot),
        keyword("is").value(CmpOp::Is),
    ))
    .parse_next(input)
}

// ============ Postfix expressions (.attr and (call)) ============

enum Postfix {
    Attr(String),
    Call(Vec<Arg>),
}

fn postfix_expr(input: &mut Input<'_>) -> PResult<Expr> {
    let base = primary.parse_next(input)?;
    let ops: Vec<Postfix> = repeat(0.., postfix_op).parse_next(input)?;

    Ok(ops.into_iter().fold(base, |acc, op| match op {
        Postfix::Attr(name) => Expr::Attr(Box::new(acc), name),
        Postfix::Call(args) => Expr::Call(Box::new(acc), args),
    }))
}

fn postfix_op(input: &mut Input<'_>) -> PResult<Postfix> {
    preceded(ws, alt((attr_access, call_expr))).parse_next(input)
}

fn attr_access(input: &mut Input<'_>) -> PResult<Postfix> {
    preceded(('.', ws), ident)
        .map(Postfix::Attr)
        .parse_next(input)
}

fn call_expr(input: &mut Input<'_>) -> PResult<Postfix> {
    delimited(
        '(',
        (ws, opt(call_args), ws).map(|(_, args, _)| args.unwrap_or_default()),
        ')',
    )
    .map(Postfix::Call)
    .parse_next(input)
}

fn call_args(input: &mut Input<'_>) -> PResult<Vec<Arg>> {
    terminated(
        separated(1.., call_arg, (ws, ',', ws)),
        opt((ws, ',')), // trailing comma
    )
    .parse_next(input)
}

fn call_arg(input: &mut Input<'_>) -> PResult<Arg> {
    alt((
        preceded(("**", ws), expr).map(Arg::DoubleStarred),
        preceded(('*', ws), expr).map(Arg::Starred),
        // keyword arg: name=expr (but not name == expr)
        (ident, ws, terminated('=', not('=')), ws, expr)
            .map(|(name, _, _, _, e)| Arg::Keyword(name, e)),
        expr.map(Arg::Positional),
    ))
    .parse_next(input)
}

// ============ Primary expressions ============

fn primary(input: &mut Input<'_>) -> PResult<Expr> {
    preceded(
        ws,
        alt((
            paren_expr,
            list_expr,
            literal.map(Expr::Literal),
            ident.map(Expr::Ident),
        )),
    )
    .parse_next(input)
}

/// `(expr)` groups; `()`, `(a,)` and `(a, b)` are tuples
fn paren_expr(input: &mut Input<'_>) -> PResult<Expr> {
    let (items, trailing_comma): (Option<Vec<Expr>>, Option<((), char)>) = delimited(
        ('(', ws),
        (
            opt(separated(1.., expr, (ws, ',', ws))),
            opt((ws, ',')),
        ),
        (ws, ')'),
    )
    .parse_next(input)?;

    let mut items = items.unwrap_or_default();
    if items.len() == 1
        && trailing_comma.is_none()
        && let Some(inner) = items.pop()
    {
        return Ok(inner);
    }
    Ok(Expr::Tuple(items))
}

fn list_expr(input: &mut Input<'_>) -> PResult<Expr> {
    delimited(
        ('[', ws),
        opt(terminated(
            separated(1.., expr, (ws, ',', ws)),
            opt((ws, ',')),
        ))
        .map(|items| items.unwrap_or_default()),
        (ws, ']'),
    )
    .map(Expr::List)
    .parse_next(input)
}

// ============ Identifiers and keywords ============

fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

/// Match a whole word equal to `kw`, so `android` never reads as `and`
fn keyword<'a>(kw: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| word.verify(|w: &str| w == kw).parse_next(input)
}

fn ident(input: &mut Input<'_>) -> PResult<String> {
    word.verify(|w: &str| !KEYWORDS.contains(&w))
        .map(String::from)
        .parse_next(input)
}

// ============ Literals ============

fn literal(input: &mut Input<'_>) -> PResult<Literal> {
    alt((
        keyword("True").value(Literal::Bool(true)),
        keyword("False").value(Literal::Bool(false)),
        keyword("None").value(Literal::None),
        number,
        string_lit,
    ))
    .parse_next(input)
}

/// `12`, `1.5`, `1.`, `.5`, `1e5`, `2.5E-3`, with an optional leading `-`
///
/// Numbers that do not fit an `i64`/finite `f64` stay in the tree as
/// `Literal::OutOfRange` for the normalizer to reject.
fn number(input: &mut Input<'_>) -> PResult<Literal> {
    let negative = opt(('-', ws)).parse_next(input)?.is_some();
    let digits = alt((
        (digit1, opt(('.', opt(digit1))), opt(exponent)).take(),
        ('.', digit1, opt(exponent)).take(),
    ))
    .parse_next(input)?;
    let text = if negative {
        format!("-{digits}")
    } else {
        digits.to_string()
    };

    if digits.contains(['.', 'e', 'E']) {
        match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Literal::Float(n)),
            _ => Ok(Literal::OutOfRange(text)),
        }
    } else {
        match text.parse::<i64>() {
            Ok(n) => Ok(Literal::Int(n)),
            Err(_) => Ok(Literal::OutOfRange(text)),
        }
    }
}

fn exponent<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (one_of(['e', 'E']), opt(one_of(['+', '-'])), digit1)
        .take()
        .parse_next(input)
}

fn string_lit(input: &mut Input<'_>) -> PResult<Literal> {
    alt((
        delimited('"', string_contents('"'), '"'),
        delimited('\'', string_contents('\''), '\''),
    ))
    .map(Literal::Str)
    .parse_next(input)
}

enum StrPiece<'a> {
    Text(&'a str),
    Escaped(char),
}

fn string_contents<'a>(quote: char) -> impl FnMut(&mut Input<'a>) -> PResult<String> {
    move |input: &mut Input<'a>| {
        repeat(
            0..,
            alt((
                take_till(1.., move |c: char| c == quote || c == '\\').map(StrPiece::Text),
                preceded('\\', any).map(|c: char| StrPiece::Escaped(unescape(c))),
            )),
        )
        .fold(String::new, |mut acc: String, piece| {
            match piece {
                StrPiece::Text(text) => acc.push_str(text),
                StrPiece::Escaped(c) => acc.push(c),
            }
            acc
        })
        .parse_next(input)
    }
}

fn unescape(escaped: char) -> char {
    match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        // Unknown escapes, quotes and backslashes pass through
        other => other,
    }
}

// ============ Whitespace ============

fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

// ============ Sanity Tests ============
// Most testing is done via integration tests in tests/integration.rs
