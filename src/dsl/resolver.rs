//! Semantic resolver.
//!
//! Walks the syntax tree once, in program order, binding names into the
//! global or voice scope and checking every reference against the class
//! catalog: undefined names and classes, unknown sockets and outputs,
//! argument count and duplicate socket assignment, and the input/output
//! direction of every value.

use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::error::{Diagnostic, Span};
use crate::catalog::builtin::{
    GLOBAL_INPUTS, GLOBAL_OUTPUT, USER_INPUT, USER_STEREO_OUTPUT, VOICE_INPUTS,
};
use crate::catalog::{ClassCatalog, ClassDescriptor};

/// Direction and class of a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprType {
    pub can_be_input: bool,
    pub can_be_output: bool,
    /// Canonical class name when the value is an object.
    pub class: Option<String>,
}

impl ExprType {
    pub fn input() -> Self {
        Self {
            can_be_input: true,
            can_be_output: false,
            class: None,
        }
    }

    pub fn output() -> Self {
        Self {
            can_be_input: false,
            can_be_output: true,
            class: None,
        }
    }

    /// Type given to unresolvable values so one mistake reports once.
    pub fn unknown() -> Self {
        Self {
            can_be_input: true,
            can_be_output: true,
            class: None,
        }
    }

    pub fn object(class: &ClassDescriptor) -> Self {
        Self {
            can_be_input: class.can_be_input(),
            can_be_output: class.can_be_output(),
            class: Some(class.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionKind {
    Builtin,
    Constant { declared_at: Span },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub kind: ResolutionKind,
    pub ty: ExprType,
}

/// One name table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    entries: HashMap<String, Resolution>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<&Resolution> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, name: &str, resolution: Resolution) {
        self.entries.insert(name.to_string(), resolution);
    }

    fn with_builtins(inputs: &[&str], output: Option<&str>) -> Self {
        let mut scope = Scope::default();
        for name in inputs {
            scope.insert(
                name,
                Resolution {
                    kind: ResolutionKind::Builtin,
                    ty: ExprType {
                        class: Some(USER_INPUT.to_string()),
                        ..ExprType::output()
                    },
                },
            );
        }
        if let Some(name) = output {
            scope.insert(
                name,
                Resolution {
                    kind: ResolutionKind::Builtin,
                    ty: ExprType {
                        class: Some(USER_STEREO_OUTPUT.to_string()),
                        ..ExprType::input()
                    },
                },
            );
        }
        scope
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOutput {
    pub global_scope: Scope,
    pub voice_scope: Scope,
    /// Type of every resolved expression, keyed by its span.
    pub expression_types: HashMap<Span, ExprType>,
    pub errors: Vec<Diagnostic>,
}

impl ResolveOutput {
    /// Look a name up the way a line in `scope` would see it.
    pub fn lookup(&self, name: &str, scope: LineScope) -> Option<&Resolution> {
        match scope {
            LineScope::Voice => self
                .voice_scope
                .get(name)
                .or_else(|| self.global_scope.get(name)),
            LineScope::Global => self.global_scope.get(name),
        }
    }
}

pub struct Resolver<'a> {
    catalog: &'a ClassCatalog,
    global: Scope,
    voice: Scope,
    types: HashMap<Span, ExprType>,
    errors: Vec<Diagnostic>,
    scope: LineScope,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a ClassCatalog) -> Self {
        Self {
            catalog,
            global: Scope::with_builtins(&GLOBAL_INPUTS, Some(GLOBAL_OUTPUT)),
            voice: Scope::with_builtins(&VOICE_INPUTS, None),
            types: HashMap::new(),
            errors: Vec::new(),
            scope: LineScope::Global,
        }
    }

    pub fn resolve(mut self, program: &Program) -> ResolveOutput {
        for line in &program.lines {
            self.scope = line.scope;
            self.resolve_statement(&line.statement);
        }

        ResolveOutput {
            global_scope: self.global,
            voice_scope: self.voice,
            expression_types: self.types,
            errors: self.errors,
        }
    }

    fn resolve_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Error(_) => {}
            Statement::ConstDefinition { name, value, .. } => {
                let ty = self.resolve_expr(value);
                self.define(name, ty);
            }
            Statement::Construction(c) => {
                self.resolve_construction(c);
            }
            Statement::Chain(chain) => self.resolve_chain(chain),
        }
    }

    fn resolve_chain(&mut self, chain: &Chain) {
        let source = self.resolve_expr(&chain.source);
        if !source.can_be_output {
            self.error("Chain source should be an output", chain.source.span());
        }

        for step in &chain.mid_steps {
            let ty = self.resolve_expr(step);
            if !ty.can_be_input {
                self.error("Chain mid step should be an input", step.span());
            }
            if !ty.can_be_output {
                self.error("Chain mid step should be an output", step.span());
            }
        }

        let target = self.resolve_expr(&chain.target);
        if !target.can_be_input {
            self.error("Chain target should be an input", chain.target.span());
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) -> ExprType {
        let ty = match expr {
            Expr::Error(_) => ExprType::unknown(),
            Expr::Number { .. } => ExprType::output(),
            Expr::Unary { operand, .. } => {
                self.require_output(operand, || "Operand should be an output".to_string());
                ExprType::output()
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                self.require_output(left, || {
                    format!("Left operand of '{}' should be an output", op.symbol())
                });
                self.require_output(right, || {
                    format!("Right operand of '{}' should be an output", op.symbol())
                });
                ExprType::output()
            }
            Expr::Mapping {
                source, from, to, ..
            } => {
                self.require_output(source, || "Mapping source should be an output".to_string());
                self.require_output(from, || {
                    "Mapping interval start should be an output".to_string()
                });
                self.require_output(to, || "Mapping interval end should be an output".to_string());
                ExprType::output()
            }
            Expr::Construction(c) => self.resolve_construction(c),
            Expr::SocketAccess { object, socket, .. } => {
                if let Some(class) = self.object_class(object, "sockets") {
                    if !class.has_socket(&socket.name) {
                        let message = format!(
                            "Undefined socket '{}' for class '{}'",
                            socket.name, class.name
                        );
                        self.error(message, socket.span);
                    }
                }
                ExprType::input()
            }
            Expr::OutputAccess { object, output, .. } => {
                if let Some(class) = self.object_class(object, "outputs") {
                    if !class.has_output(&output.name) {
                        let message = format!(
                            "Undefined output '{}' for class '{}'",
                            output.name, class.name
                        );
                        self.error(message, output.span);
                    }
                }
                ExprType::output()
            }
            Expr::ConstAccess(ident) => self
                .lookup(ident)
                .map(|r| r.ty)
                .unwrap_or_else(ExprType::unknown),
        };

        self.types.insert(expr.span(), ty.clone());
        ty
    }

    fn require_output(&mut self, expr: &Expr, message: impl FnOnce() -> String) {
        if !self.resolve_expr(expr).can_be_output {
            self.error(message(), expr.span());
        }
    }

    fn resolve_construction(&mut self, c: &Construction) -> ExprType {
        let Some(class) = self.catalog.resolve(&c.class.name) else {
            self.error(format!("Undefined class: {}", c.class.name), c.class.span);
            for arg in &c.args {
                self.resolve_expr(arg.value());
            }
            return ExprType::unknown();
        };

        let positional_count = c
            .args
            .iter()
            .filter(|a| matches!(a, Arg::Positional(_)))
            .count();
        if positional_count > class.positional.len() {
            let message = format!(
                "Too many positional arguments for {}: expected at most {}, got {}",
                class.name,
                class.positional.len(),
                positional_count
            );
            self.error(message, c.span);
        }

        let mut assigned: HashSet<&str> = HashSet::new();
        let mut position = 0;
        for arg in &c.args {
            match arg {
                Arg::Positional(value) => {
                    let index = position;
                    position += 1;
                    self.require_output(value, || {
                        format!("Argument {} for {} should be an output", index + 1, class.name)
                    });
                    if let Some(socket) = class.positional_socket(index) {
                        if !assigned.insert(socket) {
                            self.error(
                                format!(
                                    "Socket {} for class {} previously assigned",
                                    socket, class.name
                                ),
                                value.span(),
                            );
                        }
                    }
                }
                Arg::Keyword { name, value, span } => {
                    self.require_output(value, || {
                        format!(
                            "Keyword argument {} for {} should be an output",
                            name.name, class.name
                        )
                    });
                    match class.canonical_socket(&name.name) {
                        Some(socket) => {
                            if !assigned.insert(socket) {
                                self.error(
                                    format!(
                                        "Socket {} for class {} previously assigned",
                                        name.name, class.name
                                    ),
                                    *span,
                                );
                            }
                        }
                        None => self.error(
                            format!("Class {} has no socket named {}", class.name, name.name),
                            name.span,
                        ),
                    }
                }
            }
        }

        let ty = ExprType::object(class);
        if let Some(name) = &c.name {
            if !name.is_discard() {
                self.define(name, ty.clone());
            }
        }
        ty
    }

    /// Resolve `object` for a `.socket` or `:output` access. Returns its
    /// class when it is an object.
    fn object_class(&mut self, object: &Ident, what: &str) -> Option<&'a ClassDescriptor> {
        let catalog = self.catalog;
        let resolution = self.lookup(object)?;
        match resolution.ty.class.as_deref().and_then(|c| catalog.resolve(c)) {
            Some(class) => Some(class),
            None => {
                let message = format!("Only objects have {}: {}", what, object.name);
                self.error(message, object.span);
                None
            }
        }
    }

    /// Find a name in the scopes visible from the current line, reporting
    /// an error when it is missing.
    fn lookup(&mut self, ident: &Ident) -> Option<Resolution> {
        if ident.is_discard() {
            self.error("Identifier '_' cannot be accessed", ident.span);
            return None;
        }
        let found = match self.scope {
            LineScope::Voice => self
                .voice
                .get(&ident.name)
                .or_else(|| self.global.get(&ident.name)),
            LineScope::Global => self.global.get(&ident.name),
        }
        .cloned();
        if found.is_none() {
            self.error(format!("Undefined identifier: {}", ident.name), ident.span);
        }
        found
    }

    fn define(&mut self, name: &Ident, ty: ExprType) {
        if name.is_discard() {
            self.error("Identifier '_' cannot be defined as a constant", name.span);
            return;
        }
        let scope = match self.scope {
            LineScope::Voice => &mut self.voice,
            LineScope::Global => &mut self.global,
        };
        if scope.contains(&name.name) {
            let message = format!("Identifier already defined in this scope: {}", name.name);
            self.error(message, name.span);
            return;
        }
        scope.insert(
            &name.name,
            Resolution {
                kind: ResolutionKind::Constant {
                    declared_at: name.span,
                },
                ty,
            },
        );
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(Diagnostic::semantic(message, span));
    }
}

/// Resolve a parsed program against `catalog`.
pub fn resolve(program: &Program, catalog: &ClassCatalog) -> ResolveOutput {
    Resolver::new(catalog).resolve(program)
}
