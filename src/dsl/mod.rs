//! Patch language compiler: source → tokens → syntax tree → resolved
//! names → structure.

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;

pub use ast::Program;
pub use error::{Diagnostic, DiagnosticKind, Span};
pub use token::Token;

use tracing::debug;

use crate::catalog::ClassCatalog;
use crate::config::CompileOptions;
use crate::ir::{self, Structure};

/// Everything the compiler produced for one source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    pub tokens: Vec<Token>,
    pub syntax_errors: Vec<Diagnostic>,
    pub semantic_errors: Vec<Diagnostic>,
    /// Present only when every stage succeeded.
    pub structure: Option<Structure>,
    pub interpretation_errors: Vec<Diagnostic>,
    pub interpretation_warnings: Vec<Diagnostic>,
}

impl CompileOutput {
    /// All diagnostics in stage order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.syntax_errors
            .iter()
            .chain(&self.semantic_errors)
            .chain(&self.interpretation_errors)
            .chain(&self.interpretation_warnings)
    }

    pub fn has_errors(&self) -> bool {
        !(self.syntax_errors.is_empty()
            && self.semantic_errors.is_empty()
            && self.interpretation_errors.is_empty())
    }
}

/// The patch compiler.
///
/// Parsing and resolving always both run so that their diagnostics are
/// reported together. The structure is built only when neither found an
/// error.
pub struct Compiler;

impl Compiler {
    /// Parse source text into a syntax tree and its syntax errors.
    pub fn parse(source: &str) -> parser::ParseOutput {
        parser::parse(lexer::tokenize(source))
    }

    pub fn compile(source: &str, catalog: &ClassCatalog, options: &CompileOptions) -> CompileOutput {
        let tokens = lexer::tokenize(source);
        let parsed = parser::parse(tokens.clone());
        let resolved = resolver::resolve(&parsed.program, catalog);
        debug!(
            tokens = tokens.len(),
            lines = parsed.program.lines.len(),
            syntax_errors = parsed.errors.len(),
            semantic_errors = resolved.errors.len(),
            "parsed and resolved"
        );

        let mut output = CompileOutput {
            tokens,
            syntax_errors: parsed.errors,
            semantic_errors: resolved.errors,
            structure: None,
            interpretation_errors: Vec::new(),
            interpretation_warnings: Vec::new(),
        };
        if !output.syntax_errors.is_empty() || !output.semantic_errors.is_empty() {
            return output;
        }

        let built = ir::build(&parsed.program, catalog, options);
        output.structure = built.structure;
        output.interpretation_errors = built.errors;
        output.interpretation_warnings = built.warnings;
        output
    }
}
