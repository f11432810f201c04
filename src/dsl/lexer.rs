//! Lexer for the patch language.
//!
//! Converts source text into a stream of [`Token`]s. Lexing never fails:
//! characters that start no token are skipped.

use super::error::Span;
use super::token::{Keyword, Operator, Punct, Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.skip_comment() {
                continue;
            }
            if self.is_at_end() {
                break;
            }

            let ch = self.peek();
            let token = if ch.is_ascii_digit() {
                self.lex_number()
            } else if let Some(token) = self.lex_operator() {
                Some(token)
            } else if ch.is_ascii_alphabetic() || ch == '_' {
                Some(self.lex_ident_or_keyword())
            } else if let Some(p) = Punct::from_char(ch) {
                Some(self.single_char(TokenKind::Punct(p)))
            } else {
                // Unknown character: skipped, lexing continues.
                self.advance();
                None
            };

            if let Some(token) = token {
                tokens.push(token);
            }
        }

        tokens
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn skip_comment(&mut self) -> bool {
        if !self.is_at_end() && self.peek() == '/' && self.peek_at(1) == Some('/') {
            while !self.is_at_end() && self.peek() != '\n' {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let start = self.pos;
        self.advance();
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn lex_operator(&mut self) -> Option<Token> {
        let (text, op) = Operator::ALL
            .iter()
            .find(|(text, _)| self.starts_with(text))
            .copied()?;
        let start = self.pos;
        self.pos += text.chars().count();
        Some(Token {
            kind: TokenKind::Operator(op),
            span: Span::new(start, self.pos),
        })
    }

    fn consume_digits(&mut self, text: &mut String) {
        while !self.is_at_end() && (self.peek().is_ascii_digit() || self.peek() == '_') {
            let ch = self.advance();
            if ch != '_' {
                text.push(ch);
            }
        }
    }

    fn lex_number(&mut self) -> Option<Token> {
        let start = self.pos;
        let mut text = String::new();

        self.consume_digits(&mut text);

        if !self.is_at_end() && self.peek() == '.' {
            text.push(self.advance());
            self.consume_digits(&mut text);
        }

        // Exponent only when a digit (optionally signed) follows, so `2e`
        // stays available as a unit suffix.
        if matches!(self.peek_at(0), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                text.push(self.advance());
                if signed {
                    text.push(self.advance());
                }
                self.consume_digits(&mut text);
            }
        }

        let mut unit = String::new();
        while !self.is_at_end() && (self.peek().is_ascii_alphabetic() || self.peek() == '%') {
            unit.push(self.advance());
        }

        let value: f64 = text.parse().ok()?;
        Some(Token {
            kind: TokenKind::Number { value, unit },
            span: Span::new(start, self.pos),
        })
    }

    fn lex_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();

        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == '_') {
            s.push(self.advance());
        }

        let kind = match Keyword::from_word(&s) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(s),
        };

        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }
}

/// Convenience wrapper: tokenize a whole source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}
