//! Abstract Syntax Tree definitions for rhcl expressions

use std::fmt;

use bigdecimal::BigDecimal;

/// Source location span (byte offsets, half-open)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// 1-based line and column of the span start within `source`
    pub fn line_col(&self, source: &str) -> (usize, usize) {
        let offset = self.start.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(nl) => before[nl + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        (line, column)
    }
}

/// A node with associated source span
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Simple identifier
pub type Identifier = Spanned<String>;

// =============================================================================
// Expressions
// =============================================================================

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Build a literal node with an empty span (handy for synthesized trees)
    pub fn literal(lit: Literal) -> Self {
        Self::new(ExprKind::Literal(lit), Span::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Literal value
    Literal(Literal),

    /// Static reference resolved by the data provider (e.g., `var.name[0]`)
    Reference(Reference),

    /// Function call
    Call(Call),

    /// Tuple constructor `[a, b]`
    Tuple(Vec<Expr>),

    /// Object constructor `{ key = value }`
    Object(Vec<ObjectItem>),

    /// Index into an arbitrary expression `expr[key]`
    Index { collection: Box<Expr>, key: Box<Expr> },

    /// Attribute access on an arbitrary expression `expr.name`
    GetAttr { object: Box<Expr>, name: Identifier },

    /// Prefix operator
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Parenthesized expression
    Parens(Box<Expr>),
}

/// Literal values embedded in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(BigDecimal),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Function call node
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: Identifier,
    pub args: Vec<Expr>,
    /// Whether the final argument was followed by `...`
    pub expand_final: bool,
}

/// One `key = value` item of an object constructor
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    pub key: ObjectKey,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKey {
    /// Bare identifier, taken literally
    Name(Identifier),
    /// Any other key expression
    Expr(Expr),
}

impl ObjectKey {
    pub fn span(&self) -> Span {
        match self {
            ObjectKey::Name(name) => name.span,
            ObjectKey::Expr(expr) => expr.span,
        }
    }
}

// =============================================================================
// References
// =============================================================================

/// A root name followed by static traversal steps
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub root: Identifier,
    pub steps: Vec<Traverser>,
    pub span: Span,
}

impl Reference {
    pub fn root_name(&self) -> &str {
        &self.root.node
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root.node)?;
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// A static traversal step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Traverser {
    Attr(String),
    Index(TraversalKey),
}

impl fmt::Display for Traverser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Traverser::Attr(name) => write!(f, ".{}", name),
            Traverser::Index(TraversalKey::Int(i)) => write!(f, "[{}]", i),
            Traverser::Index(TraversalKey::String(s)) => write!(f, "[{:?}]", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TraversalKey {
    Int(i64),
    String(String),
}
