//! Parser implementation: converts pest output to AST

use std::str::FromStr;

use bigdecimal::BigDecimal;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct HclParser;

/// Parse a single expression (requires full input consumption)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let pairs = HclParser::parse(Rule::standalone_expression, source)?;
    let standalone = pairs
        .into_iter()
        .next()
        .ok_or_else(|| ParseError::UnexpectedToken("empty input".to_string()))?;
    // standalone_expression contains SOI ~ expression ~ EOI, extract the expression
    let inner = standalone
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| ParseError::UnexpectedToken("missing expression".to_string()))?;
    build_expression(inner)
}

/// Largest decimal exponent, either sign, a number may carry
///
/// Rounding, printing and comparing materialize every digit up to the
/// exponent.
pub const MAX_NUMBER_SCALE: i64 = 4096;

/// Parse decimal number text, rejecting exponents beyond [`MAX_NUMBER_SCALE`]
pub fn parse_number(text: &str) -> ParseResult<BigDecimal> {
    let n = BigDecimal::from_str(text).map_err(|_| ParseError::InvalidNumber(text.to_string()))?;
    let (_, scale) = n.as_bigint_and_exponent();
    if scale.unsigned_abs() > MAX_NUMBER_SCALE.unsigned_abs() {
        return Err(ParseError::NumberOutOfRange(text.to_string()));
    }
    Ok(n)
}

// =============================================================================
// Helper functions
// =============================================================================

fn span_from_pair(pair: &Pair<Rule>) -> Span {
    let pest_span = pair.as_span();
    Span::new(pest_span.start(), pest_span.end())
}

fn first_inner(pair: Pair<Rule>) -> ParseResult<Pair<Rule>> {
    let rule = pair.as_rule();
    pair.into_inner()
        .next()
        .ok_or_else(|| ParseError::UnexpectedToken(format!("empty {:?}", rule)))
}

fn build_identifier(pair: Pair<Rule>) -> Identifier {
    debug_assert_eq!(pair.as_rule(), Rule::identifier);
    Identifier::new(pair.as_str().to_string(), span_from_pair(&pair))
}

// =============================================================================
// Expression building
// =============================================================================

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::expression);

    let mut prefix_ops = Vec::new();
    let mut expr: Option<Expr> = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::prefix_op => {
                let op = match inner.as_str() {
                    "-" => UnaryOp::Negate,
                    "!" => UnaryOp::Not,
                    other => return Err(ParseError::UnknownOperator(other.to_string())),
                };
                prefix_ops.push((op, span_from_pair(&inner).start));
            }
            Rule::index => {
                let base = expr.take().ok_or_else(|| {
                    ParseError::UnexpectedToken("index without a base expression".to_string())
                })?;
                let span = base.span.merge(span_from_pair(&inner));
                let key = build_expression(first_inner(inner)?)?;
                expr = Some(apply_index(base, key, span));
            }
            Rule::get_attr => {
                let base = expr.take().ok_or_else(|| {
                    ParseError::UnexpectedToken("attribute without a base expression".to_string())
                })?;
                let span = base.span.merge(span_from_pair(&inner));
                let name = build_identifier(first_inner(inner)?);
                expr = Some(apply_get_attr(base, name, span));
            }
            _ => {
                expr = Some(build_primary(inner)?);
            }
        }
    }

    let mut expr =
        expr.ok_or_else(|| ParseError::UnexpectedToken("missing operand".to_string()))?;

    // Prefix operators bind looser than postfix traversals
    for (op, start) in prefix_ops.into_iter().rev() {
        let span = Span::new(start, expr.span.end);
        expr = Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(expr),
            },
            span,
        );
    }

    Ok(expr)
}

/// Static keys extend a reference; anything else becomes a dynamic index node
fn apply_index(base: Expr, key: Expr, span: Span) -> Expr {
    if let ExprKind::Reference(reference) = &base.kind {
        if let Some(key) = static_key(&key) {
            let mut reference = reference.clone();
            reference.steps.push(Traverser::Index(key));
            reference.span = span;
            return Expr::new(ExprKind::Reference(reference), span);
        }
    }
    Expr::new(
        ExprKind::Index {
            collection: Box::new(base),
            key: Box::new(key),
        },
        span,
    )
}

fn apply_get_attr(base: Expr, name: Identifier, span: Span) -> Expr {
    if let ExprKind::Reference(reference) = &base.kind {
        let mut reference = reference.clone();
        reference.steps.push(Traverser::Attr(name.node));
        reference.span = span;
        return Expr::new(ExprKind::Reference(reference), span);
    }
    Expr::new(
        ExprKind::GetAttr {
            object: Box::new(base),
            name,
        },
        span,
    )
}

fn static_key(key: &Expr) -> Option<TraversalKey> {
    match &key.kind {
        ExprKind::Literal(Literal::String(s)) => Some(TraversalKey::String(s.clone())),
        ExprKind::Literal(Literal::Number(n)) if n.is_integer() => {
            n.to_string().parse::<i64>().ok().map(TraversalKey::Int)
        }
        _ => None,
    }
}

fn build_primary(pair: Pair<Rule>) -> ParseResult<Expr> {
    let span = span_from_pair(&pair);
    match pair.as_rule() {
        Rule::number => {
            let n = parse_number(pair.as_str())?;
            Ok(Expr::new(ExprKind::Literal(Literal::Number(n)), span))
        }
        Rule::string => {
            let raw = first_inner(pair)?;
            let s = unescape(raw.as_str())?;
            Ok(Expr::new(ExprKind::Literal(Literal::String(s)), span))
        }
        Rule::keyword_literal => {
            let lit = match pair.as_str() {
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                _ => Literal::Null,
            };
            Ok(Expr::new(ExprKind::Literal(lit), span))
        }
        Rule::tuple => {
            let items = pair
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::new(ExprKind::Tuple(items), span))
        }
        Rule::object => {
            let items = pair
                .into_inner()
                .map(build_object_item)
                .collect::<ParseResult<Vec<_>>>()?;
            Ok(Expr::new(ExprKind::Object(items), span))
        }
        Rule::function_call => build_call(pair, span),
        Rule::variable => {
            let root = build_identifier(first_inner(pair)?);
            Ok(Expr::new(
                ExprKind::Reference(Reference {
                    root,
                    steps: Vec::new(),
                    span,
                }),
                span,
            ))
        }
        Rule::paren_expr => {
            let inner = build_expression(first_inner(pair)?)?;
            Ok(Expr::new(ExprKind::Parens(Box::new(inner)), span))
        }
        other => Err(ParseError::UnexpectedToken(format!("{:?}", other))),
    }
}

fn build_object_item(pair: Pair<Rule>) -> ParseResult<ObjectItem> {
    debug_assert_eq!(pair.as_rule(), Rule::object_item);
    let mut parts = pair.into_inner();
    let key_pair = parts
        .next()
        .ok_or_else(|| ParseError::UnexpectedToken("object item without key".to_string()))?;
    let value_pair = parts
        .next()
        .ok_or_else(|| ParseError::UnexpectedToken("object item without value".to_string()))?;

    let key_expr = build_expression(key_pair)?;
    // A lone identifier is a literal attribute name, not a variable
    let key = match key_expr.kind {
        ExprKind::Reference(reference) if reference.steps.is_empty() => {
            ObjectKey::Name(reference.root)
        }
        kind => ObjectKey::Expr(Expr::new(kind, key_expr.span)),
    };

    Ok(ObjectItem {
        key,
        value: build_expression(value_pair)?,
    })
}

fn build_call(pair: Pair<Rule>, span: Span) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::function_call);
    let mut parts = pair.into_inner();
    let name = parts
        .next()
        .map(build_identifier)
        .ok_or_else(|| ParseError::UnexpectedToken("call without name".to_string()))?;

    let mut args = Vec::new();
    let mut expand_final = false;
    if let Some(call_args) = parts.next() {
        for arg in call_args.into_inner() {
            match arg.as_rule() {
                Rule::expand_final => expand_final = true,
                _ => args.push(build_expression(arg)?),
            }
        }
    }

    Ok(Expr::new(
        ExprKind::Call(Call {
            name,
            args,
            expand_final,
        }),
        span,
    ))
}

fn unescape(raw: &str) -> ParseResult<String> {
    let mut result = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('"') => result.push('"'),
            Some('\\') => result.push('\\'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| ParseError::InvalidEscape(format!("\\u{}", hex)))?;
                result.push(decoded);
            }
            Some(other) => return Err(ParseError::InvalidEscape(format!("\\{}", other))),
            None => return Err(ParseError::InvalidEscape("\\".to_string())),
        }
    }
    Ok(result)
}
