//! Token types for the patch language lexer.

use super::error::Span;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Operator(Operator),
    Punct(Punct),
    Ident(String),
    /// A numeric literal with an optional unit suffix (`""` when absent).
    Number { value: f64, unit: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    New,
    Bi,
    StartVoice,
    EndVoice,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "new" => Some(Keyword::New),
            "bi" => Some(Keyword::Bi),
            "startvoice" => Some(Keyword::StartVoice),
            "endvoice" => Some(Keyword::EndVoice),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Assign,
    Arrow,     // =>
    BackArrow, // <=
}

impl Operator {
    /// Operators in longest-first match order.
    pub const ALL: [(&'static str, Operator); 6] = [
        ("=>", Operator::Arrow),
        ("<=", Operator::BackArrow),
        ("+", Operator::Plus),
        ("-", Operator::Minus),
        ("*", Operator::Star),
        ("=", Operator::Assign),
    ];

    /// Binding power when used as a binary operator.
    pub fn precedence(self) -> Option<u8> {
        match self {
            Operator::Plus | Operator::Minus => Some(1),
            Operator::Star => Some(2),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Assign => "=",
            Operator::Arrow => "=>",
            Operator::BackArrow => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Colon,
}

impl Punct {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '(' => Some(Punct::LParen),
            ')' => Some(Punct::RParen),
            '[' => Some(Punct::LBracket),
            ']' => Some(Punct::RBracket),
            ',' => Some(Punct::Comma),
            '.' => Some(Punct::Dot),
            ':' => Some(Punct::Colon),
            _ => None,
        }
    }
}

impl TokenKind {
    /// Source-like rendering used in "Unexpected token" messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(Keyword::New) => "new".to_string(),
            TokenKind::Keyword(Keyword::Bi) => "bi".to_string(),
            TokenKind::Keyword(Keyword::StartVoice) => "startvoice".to_string(),
            TokenKind::Keyword(Keyword::EndVoice) => "endvoice".to_string(),
            TokenKind::Operator(op) => op.symbol().to_string(),
            TokenKind::Punct(p) => match p {
                Punct::LParen => "(",
                Punct::RParen => ")",
                Punct::LBracket => "[",
                Punct::RBracket => "]",
                Punct::Comma => ",",
                Punct::Dot => ".",
                Punct::Colon => ":",
            }
            .to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Number { value, unit } => format!("{value}{unit}"),
        }
    }
}
