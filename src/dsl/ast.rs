//! Syntax tree for the patch language.
//!
//! Every node owns its children and carries the span of source text it was
//! parsed from. Malformed regions become [`Expr::Error`] or
//! [`Statement::Error`] nodes so that the rest of a program can still be
//! resolved.

use super::error::Span;

/// A parsed program: one entry per statement, in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub lines: Vec<Line>,
}

/// Whether a statement appears inside the `startvoice`/`endvoice` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineScope {
    Global,
    Voice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub scope: LineScope,
    pub statement: Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Error(Span),
    /// `name = expr`
    ConstDefinition {
        name: Ident,
        value: Expr,
        span: Span,
    },
    /// An object construction used on its own, e.g. `Knob volume()`.
    Construction(Construction),
    Chain(Chain),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Error(span) => *span,
            Statement::ConstDefinition { span, .. } => *span,
            Statement::Construction(c) => c.span,
            Statement::Chain(c) => c.span,
        }
    }
}

/// A signal chain, stored source first regardless of the arrow direction
/// it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub source: Expr,
    pub mid_steps: Vec<Expr>,
    pub target: Expr,
    pub span: Span,
}

impl Chain {
    /// All links from source to target.
    pub fn links(&self) -> impl Iterator<Item = &Expr> {
        std::iter::once(&self.source)
            .chain(self.mid_steps.iter())
            .chain(std::iter::once(&self.target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    /// The discard name `_`, which is never bound.
    pub fn is_discard(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
        }
    }
}

/// `[from, to]` rescales a 0..1 source, `bi [from, to]` a -1..1 source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Unipolar,
    Bipolar,
}

/// `new Class(args)` or `Class name(args)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Construction {
    pub class: Ident,
    pub name: Option<Ident>,
    pub args: Vec<Arg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Positional(Expr),
    /// `.socket = expr`
    Keyword { name: Ident, value: Expr, span: Span },
}

impl Arg {
    pub fn value(&self) -> &Expr {
        match self {
            Arg::Positional(value) | Arg::Keyword { value, .. } => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Error(Span),
    Number {
        value: f64,
        unit: String,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Mapping {
        kind: MappingKind,
        source: Box<Expr>,
        from: Box<Expr>,
        to: Box<Expr>,
        span: Span,
    },
    Construction(Construction),
    /// `object.socket`
    SocketAccess {
        object: Ident,
        socket: Ident,
        span: Span,
    },
    /// `object:output`
    OutputAccess {
        object: Ident,
        output: Ident,
        span: Span,
    },
    ConstAccess(Ident),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Error(span) => *span,
            Expr::Number { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Mapping { span, .. }
            | Expr::SocketAccess { span, .. }
            | Expr::OutputAccess { span, .. } => *span,
            Expr::Construction(c) => c.span,
            Expr::ConstAccess(ident) => ident.span,
        }
    }

    /// Replace the node's own span. Used for parenthesized expressions,
    /// which take the span of the surrounding parentheses.
    pub fn set_span(&mut self, new_span: Span) {
        match self {
            Expr::Error(span) => *span = new_span,
            Expr::Number { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Mapping { span, .. }
            | Expr::SocketAccess { span, .. }
            | Expr::OutputAccess { span, .. } => *span = new_span,
            Expr::Construction(c) => c.span = new_span,
            Expr::ConstAccess(ident) => ident.span = new_span,
        }
    }
}
