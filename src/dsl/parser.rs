//! Parser for the patch language.
//!
//! Recursive descent over the token stream with precedence climbing for
//! binary operators. The parser never stops at the first problem: errors
//! are collected as diagnostics and the offending region becomes an error
//! node. Inside argument lists and brackets it resynchronizes on the next
//! closing `)` or `]`.

use super::ast::*;
use super::error::{Diagnostic, Span};
use super::token::{Keyword, Operator, Punct, Token, TokenKind};

/// Directional capability of a parsed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Capability {
    input: bool,
    output: bool,
}

impl Capability {
    const INPUT: Capability = Capability {
        input: true,
        output: false,
    };
    const OUTPUT: Capability = Capability {
        input: false,
        output: true,
    };
    const BOTH: Capability = Capability {
        input: true,
        output: true,
    };
}

struct Parsed {
    expr: Expr,
    caps: Capability,
}

impl Parsed {
    fn new(expr: Expr, caps: Capability) -> Self {
        Self { expr, caps }
    }

    /// Error nodes claim both capabilities so they do not cascade.
    fn error(span: Span) -> Self {
        Self::new(Expr::Error(span), Capability::BOTH)
    }
}

/// Marker for an error that has already been recorded as a diagnostic.
#[derive(Debug, Clone, Copy)]
struct ParseError {
    span: Span,
}

type PResult<T> = Result<T, ParseError>;

/// Deepest allowed nesting of parentheses, unary operators and
/// constructions inside one expression.
const MAX_NESTING: usize = 64;

/// Result of parsing: the tree plus every syntax error found.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    pub program: Program,
    pub errors: Vec<Diagnostic>,
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    errors: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> ParseOutput {
        let mut lines = Vec::new();
        let mut voice_start: Option<Span> = None;
        let mut seen_voice = false;

        while let Some(token) = self.peek() {
            let span = token.span;
            let keyword = match token.kind {
                TokenKind::Keyword(k) => Some(k),
                _ => None,
            };
            match keyword {
                Some(Keyword::StartVoice) => {
                    self.advance();
                    if voice_start.is_some() {
                        self.report("Nested voice blocks are not allowed", Some(span));
                    } else {
                        if seen_voice {
                            self.report("Multiple voice blocks are not allowed", Some(span));
                        }
                        seen_voice = true;
                        voice_start = Some(span);
                    }
                }
                Some(Keyword::EndVoice) => {
                    self.advance();
                    if voice_start.take().is_none() {
                        self.report("endvoice without matching startvoice", Some(span));
                    }
                }
                _ => {
                    let start = self.pos;
                    let statement = match self.parse_statement() {
                        Ok(statement) => statement,
                        Err(e) => Statement::Error(e.span),
                    };
                    if self.pos == start {
                        self.advance();
                    }
                    let scope = if voice_start.is_some() {
                        LineScope::Voice
                    } else {
                        LineScope::Global
                    };
                    lines.push(Line { scope, statement });
                }
            }
        }

        if let Some(span) = voice_start {
            self.report("startvoice without matching endvoice", Some(span));
        }

        ParseOutput {
            program: Program { lines },
            errors: self.errors,
        }
    }

    // Statements

    fn parse_statement(&mut self) -> PResult<Statement> {
        if let (Some(TokenKind::Ident(_)), Some(TokenKind::Operator(Operator::Assign))) =
            (self.peek_kind_at(0), self.peek_kind_at(1))
        {
            let name = self.expect_ident()?;
            self.advance();
            let value = self.parse_expr()?.expr;
            let span = name.span.join(value.span());
            return Ok(Statement::ConstDefinition { name, value, span });
        }

        let first = self.parse_expr()?;
        if self.check_operator(Operator::Arrow) {
            return self.parse_forward_chain(first);
        }
        if self.check_operator(Operator::BackArrow) {
            return self.parse_reverse_chain(first);
        }

        match first.expr {
            Expr::Construction(c) => Ok(Statement::Construction(c)),
            other => {
                let span = other.span();
                self.report("Unexpected expression", Some(span));
                Ok(Statement::Error(span))
            }
        }
    }

    /// `source => step => ... => target`
    fn parse_forward_chain(&mut self, source: Parsed) -> PResult<Statement> {
        let mut links = vec![source];
        while self.eat_operator(Operator::Arrow) {
            links.push(self.parse_expr()?);
        }
        self.finish_chain(links)
    }

    /// `target <= step <= ... <= source`
    fn parse_reverse_chain(&mut self, target: Parsed) -> PResult<Statement> {
        let mut links = vec![target];
        while self.eat_operator(Operator::BackArrow) || self.eat_operator(Operator::Arrow) {
            links.push(self.parse_expr()?);
        }
        links.reverse();
        self.finish_chain(links)
    }

    fn finish_chain(&mut self, links: Vec<Parsed>) -> PResult<Statement> {
        let last = links.len() - 1;
        for (i, link) in links.iter().enumerate() {
            let span = Some(link.expr.span());
            if i < last && !link.caps.output {
                self.report("Cannot be used as an output", span);
            }
            if i > 0 && !link.caps.input {
                self.report("Cannot be used as an input", span);
            }
        }

        let mut exprs: Vec<Expr> = links.into_iter().map(|p| p.expr).collect();
        let span = exprs
            .iter()
            .map(Expr::span)
            .reduce(Span::join)
            .unwrap_or_else(|| self.end_span());
        match exprs.pop() {
            Some(target) if !exprs.is_empty() => {
                let source = exprs.remove(0);
                Ok(Statement::Chain(Chain {
                    source,
                    mid_steps: exprs,
                    target,
                    span,
                }))
            }
            _ => Err(ParseError { span }),
        }
    }

    // Expressions

    fn parse_expr(&mut self) -> PResult<Parsed> {
        self.parse_binary(1)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Parsed> {
        let mut left = self.parse_primary()?;

        while let Some(TokenKind::Operator(op)) = self.peek_kind_at(0) {
            let op = *op;
            let Some(prec) = op.precedence() else { break };
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.parse_binary(prec + 1)?;
            let op = match op {
                Operator::Plus => BinaryOp::Add,
                Operator::Minus => BinaryOp::Subtract,
                _ => BinaryOp::Multiply,
            };
            let span = left.expr.span().join(right.expr.span());
            left = Parsed::new(
                Expr::Binary {
                    op,
                    left: Box::new(left.expr),
                    right: Box::new(right.expr),
                    span,
                },
                Capability::OUTPUT,
            );
        }

        Ok(left)
    }

    /// A primary expression followed by any number of mapping suffixes.
    fn parse_primary(&mut self) -> PResult<Parsed> {
        let mut parsed = self.parse_primary_no_mapping()?;

        loop {
            let kind = if self.check_keyword(Keyword::Bi) {
                MappingKind::Bipolar
            } else if self.check_punct(Punct::LBracket) {
                MappingKind::Unipolar
            } else {
                break;
            };

            if !parsed.caps.output {
                self.report("Cannot be used as an output", Some(parsed.expr.span()));
            }
            if kind == MappingKind::Bipolar {
                self.advance();
            }
            self.expect_punct(Punct::LBracket)?;

            let (from, to, close) = match self.parse_interval() {
                Ok(interval) => interval,
                Err(e) => {
                    let close = self.recover();
                    (Expr::Error(e.span), Expr::Error(e.span), close)
                }
            };
            let span = parsed.expr.span().join(close);
            parsed = Parsed::new(
                Expr::Mapping {
                    kind,
                    source: Box::new(parsed.expr),
                    from: Box::new(from),
                    to: Box::new(to),
                    span,
                },
                Capability::OUTPUT,
            );
        }

        Ok(parsed)
    }

    /// `from, to]`, the opening bracket already consumed.
    fn parse_interval(&mut self) -> PResult<(Expr, Expr, Span)> {
        let from = self.parse_expr()?.expr;
        self.expect_punct(Punct::Comma)?;
        let to = self.parse_expr()?.expr;
        let close = self.expect_punct(Punct::RBracket)?;
        Ok((from, to, close))
    }

    fn parse_primary_no_mapping(&mut self) -> PResult<Parsed> {
        if self.depth >= MAX_NESTING {
            let span = self.peek().map_or_else(|| self.end_span(), |t| t.span);
            self.report("Expression nested too deeply", Some(span));
            return Err(ParseError { span });
        }
        self.depth += 1;
        let parsed = self.parse_atom();
        self.depth -= 1;
        parsed
    }

    fn parse_atom(&mut self) -> PResult<Parsed> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.unexpected());
        };

        match token.kind {
            TokenKind::Operator(op @ (Operator::Plus | Operator::Minus)) => {
                self.advance();
                let operand = self.parse_primary()?;
                if !operand.caps.output {
                    self.report("Cannot be used as an output", Some(operand.expr.span()));
                }
                let op = if op == Operator::Minus {
                    UnaryOp::Negate
                } else {
                    UnaryOp::Plus
                };
                let span = token.span.join(operand.expr.span());
                Ok(Parsed::new(
                    Expr::Unary {
                        op,
                        operand: Box::new(operand.expr),
                        span,
                    },
                    Capability::OUTPUT,
                ))
            }
            TokenKind::Number { value, unit } => {
                self.advance();
                Ok(Parsed::new(
                    Expr::Number {
                        value,
                        unit,
                        span: token.span,
                    },
                    Capability::OUTPUT,
                ))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                match self.parse_parenthesized() {
                    Ok((mut inner, close)) => {
                        inner.expr.set_span(token.span.join(close));
                        Ok(inner)
                    }
                    Err(_) => {
                        let close = self.recover();
                        Ok(Parsed::error(token.span.join(close)))
                    }
                }
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let class = self.expect_ident()?;
                let (args, close) = self.parse_args()?;
                Ok(Parsed::new(
                    Expr::Construction(Construction {
                        class,
                        name: None,
                        args,
                        span: token.span.join(close),
                    }),
                    Capability::BOTH,
                ))
            }
            TokenKind::Ident(ref name) => match (
                self.peek_kind_at(1).cloned(),
                self.peek_kind_at(2).cloned(),
            ) {
                (Some(TokenKind::Punct(Punct::Dot)), _) => {
                    let object = self.expect_ident()?;
                    self.advance();
                    let socket = self.expect_ident()?;
                    let span = object.span.join(socket.span);
                    Ok(Parsed::new(
                        Expr::SocketAccess {
                            object,
                            socket,
                            span,
                        },
                        Capability::INPUT,
                    ))
                }
                (Some(TokenKind::Punct(Punct::Colon)), _) => {
                    let object = self.expect_ident()?;
                    self.advance();
                    let output = self.expect_ident()?;
                    let span = object.span.join(output.span);
                    Ok(Parsed::new(
                        Expr::OutputAccess {
                            object,
                            output,
                            span,
                        },
                        Capability::OUTPUT,
                    ))
                }
                (Some(TokenKind::Ident(_)), Some(TokenKind::Punct(Punct::LParen))) => {
                    let class = self.expect_ident()?;
                    let instance = self.expect_ident()?;
                    let (args, close) = self.parse_args()?;
                    Ok(Parsed::new(
                        Expr::Construction(Construction {
                            span: class.span.join(close),
                            class,
                            name: Some(instance),
                            args,
                        }),
                        Capability::BOTH,
                    ))
                }
                _ => {
                    self.advance();
                    Ok(Parsed::new(
                        Expr::ConstAccess(Ident {
                            name: name.clone(),
                            span: token.span,
                        }),
                        Capability::BOTH,
                    ))
                }
            },
            _ => Err(self.unexpected()),
        }
    }

    /// `expr)`, the opening parenthesis already consumed.
    fn parse_parenthesized(&mut self) -> PResult<(Parsed, Span)> {
        let inner = self.parse_expr()?;
        let close = self.expect_punct(Punct::RParen)?;
        Ok((inner, close))
    }

    /// `(arg, arg, .name = arg)`. Returns the args and the span of the
    /// closing parenthesis (or of the token recovery stopped at).
    fn parse_args(&mut self) -> PResult<(Vec<Arg>, Span)> {
        self.expect_punct(Punct::LParen)?;
        let mut args = Vec::new();

        if self.check_punct(Punct::RParen) {
            let close = self.expect_punct(Punct::RParen)?;
            return Ok((args, close));
        }

        loop {
            match self.parse_arg() {
                Ok(arg) => args.push(arg),
                Err(e) => {
                    args.push(Arg::Positional(Expr::Error(e.span)));
                    return Ok((args, self.recover()));
                }
            }

            if self.eat_punct(Punct::Comma) {
                continue;
            }
            if self.check_punct(Punct::RParen) {
                let close = self.expect_punct(Punct::RParen)?;
                return Ok((args, close));
            }
            self.unexpected();
            return Ok((args, self.recover()));
        }
    }

    fn parse_arg(&mut self) -> PResult<Arg> {
        if self.eat_punct(Punct::Dot) {
            let name = self.expect_ident()?;
            self.expect_operator(Operator::Assign)?;
            let value = self.parse_expr()?;
            if !value.caps.output {
                self.report("Cannot be used as an output", Some(value.expr.span()));
            }
            let span = name.span.join(value.expr.span());
            return Ok(Arg::Keyword {
                name,
                value: value.expr,
                span,
            });
        }

        let value = self.parse_expr()?;
        if !value.caps.output {
            self.report("Cannot be used as an output", Some(value.expr.span()));
        }
        Ok(Arg::Positional(value.expr))
    }

    // Token helpers

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check_punct(&self, p: Punct) -> bool {
        self.peek_kind_at(0) == Some(&TokenKind::Punct(p))
    }

    fn check_operator(&self, op: Operator) -> bool {
        self.peek_kind_at(0) == Some(&TokenKind::Operator(op))
    }

    fn check_keyword(&self, k: Keyword) -> bool {
        self.peek_kind_at(0) == Some(&TokenKind::Keyword(k))
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        let found = self.check_punct(p);
        if found {
            self.advance();
        }
        found
    }

    fn eat_operator(&mut self, op: Operator) -> bool {
        let found = self.check_operator(op);
        if found {
            self.advance();
        }
        found
    }

    fn expect_punct(&mut self, p: Punct) -> PResult<Span> {
        if self.check_punct(p) {
            let span = self.tokens[self.pos].span;
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_operator(&mut self, op: Operator) -> PResult<Span> {
        if self.check_operator(op) {
            let span = self.tokens[self.pos].span;
            self.advance();
            Ok(span)
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Ident(name),
                span,
            }) => {
                let ident = Ident {
                    name: name.clone(),
                    span: *span,
                };
                self.advance();
                Ok(ident)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Span just past the last token, used for error nodes at end of input.
    fn end_span(&self) -> Span {
        let end = self.tokens.last().map_or(0, |t| t.span.end);
        Span::new(end, end)
    }

    /// Record an error for the current token (or end of input).
    fn unexpected(&mut self) -> ParseError {
        match self.peek() {
            Some(token) => {
                let span = token.span;
                let message = format!("Unexpected token: '{}'", token.kind.describe());
                self.report(message, Some(span));
                ParseError { span }
            }
            None => {
                self.report("Unexpected end of input", None);
                ParseError {
                    span: self.end_span(),
                }
            }
        }
    }

    /// Skip tokens up to and including the next `)` or `]`. Returns the
    /// span of the last token skipped.
    fn recover(&mut self) -> Span {
        let mut last = self.end_span();
        while let Some(token) = self.advance() {
            last = token.span;
            if matches!(
                token.kind,
                TokenKind::Punct(Punct::RParen) | TokenKind::Punct(Punct::RBracket)
            ) {
                break;
            }
        }
        last
    }

    fn report(&mut self, message: impl Into<String>, span: Option<Span>) {
        self.errors.push(Diagnostic::syntax(message, span));
    }
}

/// Parse a token stream into a program plus syntax errors.
pub fn parse(tokens: Vec<Token>) -> ParseOutput {
    Parser::new(tokens).parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn parse_src(src: &str) -> ParseOutput {
        parse(tokenize(src))
    }

    fn only_statement(src: &str) -> Statement {
        let out = parse_src(src);
        assert!(out.errors.is_empty(), "unexpected errors: {:?}", out.errors);
        assert_eq!(out.program.lines.len(), 1);
        out.program.lines[0].statement.clone()
    }

    fn number(expr: &Expr) -> f64 {
        match expr {
            Expr::Number { value, .. } => *value,
            other => panic!("expected number, got {other:?}"),
        }
    }

    fn messages(out: &ParseOutput) -> Vec<&str> {
        out.errors.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn parse_precedence() {
        let Statement::ConstDefinition { name, value, .. } = only_statement("a = 1 + 2 * 3")
        else {
            panic!("expected constant definition");
        };
        assert_eq!(name.name, "a");
        let Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
            ..
        } = value
        else {
            panic!("expected addition at the root");
        };
        assert_eq!(number(&left), 1.0);
        let Expr::Binary {
            op: BinaryOp::Multiply,
            left,
            right,
            ..
        } = *right
        else {
            panic!("expected multiplication on the right");
        };
        assert_eq!(number(&left), 2.0);
        assert_eq!(number(&right), 3.0);
    }

    #[test]
    fn parse_left_associative_subtraction() {
        let Statement::ConstDefinition { value, .. } = only_statement("a = 5 - 2 - 1") else {
            panic!("expected constant definition");
        };
        let Expr::Binary {
            op: BinaryOp::Subtract,
            left,
            right,
            ..
        } = value
        else {
            panic!("expected subtraction");
        };
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Subtract, .. }));
        assert_eq!(number(&right), 1.0);
    }

    #[test]
    fn parse_unary_minus_binds_tightest() {
        let Statement::ConstDefinition { value, .. } = only_statement("a = -1 * 2") else {
            panic!("expected constant definition");
        };
        let Expr::Binary { left, .. } = value else {
            panic!("expected binary");
        };
        assert!(matches!(*left, Expr::Unary { op: UnaryOp::Negate, .. }));
    }

    #[test]
    fn parse_forward_chain() {
        let Statement::Chain(chain) = only_statement("Sine osc(440hz) => output") else {
            panic!("expected chain");
        };
        assert!(matches!(chain.source, Expr::Construction(_)));
        assert!(chain.mid_steps.is_empty());
        assert!(matches!(chain.target, Expr::ConstAccess(ref i) if i.name == "output"));
    }

    #[test]
    fn parse_reverse_chain_is_stored_source_first() {
        let Statement::Chain(chain) = only_statement("f.cutoff <= env [20hz, 5000hz]") else {
            panic!("expected chain");
        };
        assert!(matches!(chain.source, Expr::Mapping { .. }));
        assert!(matches!(chain.target, Expr::SocketAccess { .. }));
    }

    #[test]
    fn parse_chain_with_mid_steps() {
        let Statement::Chain(chain) = only_statement("osc => new LowPass12db(1000hz) => d => output")
        else {
            panic!("expected chain");
        };
        assert_eq!(chain.mid_steps.len(), 2);
        assert_eq!(chain.links().count(), 4);
    }

    #[test]
    fn parse_socket_access_cannot_be_chain_source() {
        let out = parse_src("f.cutoff => output");
        assert_eq!(messages(&out), vec!["Cannot be used as an output"]);
    }

    #[test]
    fn parse_number_cannot_be_chain_target() {
        let out = parse_src("osc => 440hz");
        assert_eq!(messages(&out), vec!["Cannot be used as an input"]);
    }

    #[test]
    fn parse_output_access_cannot_be_mid_step() {
        let out = parse_src("osc => d:left => output");
        assert_eq!(messages(&out), vec!["Cannot be used as an input"]);
    }

    #[test]
    fn parse_named_construction_with_keyword_args() {
        let Statement::Construction(c) =
            only_statement("ADSRlog env(1ms, 1000ms, 0.4, 3000ms, .gate=gate)")
        else {
            panic!("expected construction");
        };
        assert_eq!(c.class.name, "ADSRlog");
        assert_eq!(c.name.as_ref().map(|n| n.name.as_str()), Some("env"));
        assert_eq!(c.args.len(), 5);
        assert!(matches!(&c.args[4], Arg::Keyword { name, .. } if name.name == "gate"));
    }

    #[test]
    fn parse_bipolar_mapping() {
        let Statement::ConstDefinition { value, .. } = only_statement("x = lfo bi [100hz, 200hz]")
        else {
            panic!("expected constant definition");
        };
        assert!(matches!(
            value,
            Expr::Mapping {
                kind: MappingKind::Bipolar,
                ..
            }
        ));
    }

    #[test]
    fn parse_chained_mapping_suffixes() {
        let Statement::ConstDefinition { value, .. } = only_statement("x = a [0, 1] [2, 3]") else {
            panic!("expected constant definition");
        };
        let Expr::Mapping { source, .. } = value else {
            panic!("expected mapping");
        };
        assert!(matches!(*source, Expr::Mapping { .. }));
    }

    #[test]
    fn parse_parenthesized_expression_takes_outer_span() {
        let Statement::ConstDefinition { value, .. } = only_statement("x = (1 + 2)") else {
            panic!("expected constant definition");
        };
        assert_eq!(value.span(), Span::new(4, 11));
        assert!(matches!(value, Expr::Binary { .. }));
    }

    #[test]
    fn parse_multiple_statements_without_separators() {
        let out = parse_src("Knob volume()\nKnob frequency()\nSine osc(frequency [110hz, 440hz])\nosc * volume => output");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        assert_eq!(out.program.lines.len(), 4);
    }

    #[test]
    fn parse_voice_scope_tags_lines() {
        let out = parse_src("Mix m()\nstartvoice\nSaw s(pitch)\ns => m\nendvoice\nm => output");
        assert!(out.errors.is_empty(), "{:?}", out.errors);
        let scopes: Vec<LineScope> = out.program.lines.iter().map(|l| l.scope).collect();
        assert_eq!(
            scopes,
            vec![
                LineScope::Global,
                LineScope::Voice,
                LineScope::Voice,
                LineScope::Global
            ]
        );
    }

    #[test]
    fn parse_nested_voice_block() {
        let out = parse_src("startvoice\nstartvoice\nendvoice");
        assert_eq!(messages(&out), vec!["Nested voice blocks are not allowed"]);
    }

    #[test]
    fn parse_duplicate_voice_block() {
        let out = parse_src("startvoice\nendvoice\nstartvoice\nendvoice");
        assert_eq!(messages(&out), vec!["Multiple voice blocks are not allowed"]);
    }

    #[test]
    fn parse_unmatched_endvoice() {
        let out = parse_src("endvoice");
        assert_eq!(messages(&out), vec!["endvoice without matching startvoice"]);
    }

    #[test]
    fn parse_unclosed_voice_block() {
        let out = parse_src("startvoice\nSaw s(pitch)");
        assert_eq!(messages(&out), vec!["startvoice without matching endvoice"]);
    }

    #[test]
    fn parse_unexpected_end_of_input_has_no_span() {
        let out = parse_src("Sine osc(");
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].message, "Unexpected end of input");
        assert_eq!(out.errors[0].span, None);
    }

    #[test]
    fn parse_recovers_after_bad_argument() {
        let out = parse_src("Sine osc(=> 1)\nSaw s(pitch) => output");
        assert_eq!(messages(&out), vec!["Unexpected token: '=>'"]);
        assert_eq!(out.program.lines.len(), 2);
        assert!(matches!(out.program.lines[1].statement, Statement::Chain(_)));
    }

    #[test]
    fn parse_lone_value_is_unexpected_expression() {
        let out = parse_src("440hz");
        assert_eq!(messages(&out), vec!["Unexpected expression"]);
        assert!(matches!(out.program.lines[0].statement, Statement::Error(_)));
    }

    #[test]
    fn parse_always_makes_progress() {
        let out = parse_src(") ] ,");
        assert_eq!(out.errors.len(), 3);
        assert_eq!(out.program.lines.len(), 3);
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let depth = 10_000;
        let src = format!("{}1{} => output", "(".repeat(depth), ")".repeat(depth));
        let out = parse_src(&src);
        assert!(messages(&out).contains(&"Expression nested too deeply"));
    }

    #[test]
    fn deep_unary_chain_is_rejected() {
        let src = format!("{}1 => output", "-".repeat(10_000));
        let out = parse_src(&src);
        let messages = messages(&out);
        assert!(!messages.is_empty());
        assert!(messages.iter().all(|m| *m == "Expression nested too deeply"));
    }

    #[test]
    fn moderate_nesting_parses() {
        let src = format!("{}1{} => output", "(".repeat(20), ")".repeat(20));
        only_statement(&src);
    }
}
