//! IR builder: lowers a resolved program into a [`Structure`].
//!
//! Walks the program in order, keeping one binding table per scope. Operator
//! expressions become synthesized utility objects (`-x` an `Inverter`, `a * b`
//! an `Attenuator`, `x [a, b]` a `Mapping`), while `+` stays a plain sum that
//! is flattened into whichever socket it finally feeds. Every contribution
//! routed to a socket anywhere in the program is summed.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::debug;

use super::order::recalculation_order;
use super::{MixValue, Parameter, Structure, StructureObject};
use crate::catalog::builtin::{
    builtin_object_count, ATTENUATOR, BIPOLAR_MAPPING, GLOBAL_INPUTS, GLOBAL_OUTPUT, INVERTER,
    KNOB, MAPPING, OUTPUT_OBJECT, USER_INPUT, USER_STEREO_OUTPUT, VOICE_INPUTS,
};
use crate::catalog::{ClassCatalog, ClassDescriptor};
use crate::config::CompileOptions;
use crate::convert::convert_constant;
use crate::dsl::ast::*;
use crate::dsl::{Diagnostic, Span};

/// Working value of an expression during lowering.
#[derive(Debug, Clone)]
enum Value {
    Object {
        object: usize,
        span: Option<Span>,
    },
    Output {
        object: usize,
        output: String,
        span: Option<Span>,
    },
    /// Write-only reference to one socket, by index into the class sockets.
    Socket {
        object: usize,
        socket: usize,
        span: Option<Span>,
    },
    Constant {
        value: f64,
        span: Option<Span>,
    },
    /// Contributions not yet routed anywhere.
    Sum(Vec<Value>),
}

impl Value {
    fn span(&self) -> Option<Span> {
        match self {
            Value::Object { span, .. }
            | Value::Output { span, .. }
            | Value::Socket { span, .. }
            | Value::Constant { span, .. } => *span,
            Value::Sum(items) => items.iter().filter_map(Value::span).reduce(Span::join),
        }
    }
}

fn sum(left: Value, right: Value) -> Value {
    let mut items = match left {
        Value::Sum(items) => items,
        other => vec![other],
    };
    match right {
        Value::Sum(more) => items.extend(more),
        other => items.push(other),
    }
    Value::Sum(items)
}

struct BuildObject<'a> {
    class: &'a ClassDescriptor,
    per_voice: bool,
    /// One mix per socket, in class socket order.
    mixes: Vec<Vec<MixValue>>,
    span: Option<Span>,
}

/// The error has already been recorded.
struct Abort;

type BResult<T> = Result<T, Abort>;

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    /// `None` when any interpretation error was reported.
    pub structure: Option<Structure>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

pub struct IrBuilder<'a> {
    catalog: &'a ClassCatalog,
    objects: Vec<BuildObject<'a>>,
    global: HashMap<String, Value>,
    voice: HashMap<String, Value>,
    parameters: Vec<Parameter>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    scope: LineScope,
}

impl<'a> IrBuilder<'a> {
    pub fn new(catalog: &'a ClassCatalog) -> Self {
        Self {
            catalog,
            objects: Vec::new(),
            global: HashMap::new(),
            voice: HashMap::new(),
            parameters: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            scope: LineScope::Global,
        }
    }

    pub fn build(mut self, program: &Program, options: &CompileOptions) -> BuildOutput {
        let structure = self.build_structure(program, options);
        BuildOutput {
            structure,
            errors: self.errors,
            warnings: self.warnings,
        }
    }

    fn build_structure(&mut self, program: &Program, options: &CompileOptions) -> Option<Structure> {
        self.seed().ok()?;

        for line in &program.lines {
            self.scope = line.scope;
            // Failures are recorded; later lines still get checked.
            let _ = self.lower_statement(&line.statement);
        }
        if !self.errors.is_empty() {
            return None;
        }

        let dependencies: Vec<Vec<usize>> = self
            .objects
            .iter()
            .map(|o| {
                o.mixes
                    .iter()
                    .flatten()
                    .filter_map(|v| match v {
                        MixValue::Output { object, .. } => Some(*object),
                        MixValue::Constant { .. } => None,
                    })
                    .collect()
            })
            .collect();

        let order = match recalculation_order(&dependencies, OUTPUT_OBJECT) {
            Ok(order) => order,
            Err(cycle) => {
                let span = self.objects[cycle.object].span;
                self.error("Cyclic dependency detected", span);
                return None;
            }
        };

        let reachable: HashSet<usize> = order.iter().copied().collect();
        for (id, object) in self.objects.iter().enumerate().skip(builtin_object_count()) {
            if !reachable.contains(&id) {
                debug!(object = id, class = %object.class.name, "unconnected object");
                self.warnings.push(Diagnostic::warning(
                    "Unconnected object will not be processed",
                    object.span,
                ));
            }
        }

        debug!(
            objects = self.objects.len(),
            ordered = order.len(),
            parameters = self.parameters.len(),
            "built structure"
        );
        Some(self.export(order, options))
    }

    /// Create the built-in objects and bind their names.
    fn seed(&mut self) -> BResult<()> {
        let input = self.class(USER_INPUT, None)?;
        let output = self.class(USER_STEREO_OUTPUT, None)?;

        for name in GLOBAL_INPUTS {
            let object = self.add_object(input, false, None);
            self.global
                .insert(name.to_string(), Value::Object { object, span: None });
        }
        let object = self.add_object(output, false, None);
        self.global
            .insert(GLOBAL_OUTPUT.to_string(), Value::Object { object, span: None });
        for name in VOICE_INPUTS {
            let object = self.add_object(input, true, None);
            self.voice
                .insert(name.to_string(), Value::Object { object, span: None });
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement) -> BResult<()> {
        match statement {
            Statement::Error(span) => Err(self.error("Malformed statement", Some(*span))),
            Statement::ConstDefinition { name, value, .. } => {
                let lowered = self.lower(value)?;
                self.register_knob(name, &lowered)?;
                self.bind(name, lowered);
                Ok(())
            }
            Statement::Construction(c) => self.lower_construction(c).map(|_| ()),
            Statement::Chain(chain) => {
                let mut previous = self.lower(&chain.source)?;
                for link in chain.mid_steps.iter().chain(std::iter::once(&chain.target)) {
                    let next = self.lower(link)?;
                    self.connect(&previous, &next, link.span())?;
                    previous = next;
                }
                Ok(())
            }
        }
    }

    fn lower(&mut self, expr: &Expr) -> BResult<Value> {
        match expr {
            Expr::Error(span) => Err(self.error("Malformed expression", Some(*span))),
            Expr::Number { value, unit, span } => {
                let value = match convert_constant(*value, unit) {
                    Some(converted) => converted,
                    None => {
                        debug!(unit = %unit, "unknown unit suffix");
                        self.warnings.push(Diagnostic::warning(
                            format!("Unknown unit '{unit}', value used unconverted"),
                            Some(*span),
                        ));
                        *value
                    }
                };
                Ok(Value::Constant {
                    value,
                    span: Some(*span),
                })
            }
            Expr::Unary { op, operand, span } => {
                let value = self.lower(operand)?;
                match op {
                    UnaryOp::Plus => Ok(value),
                    UnaryOp::Negate => self.negate(value, *span),
                }
            }
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                match op {
                    BinaryOp::Add => Ok(sum(left, right)),
                    BinaryOp::Subtract => {
                        let negated = self.negate(right, *span)?;
                        Ok(sum(left, negated))
                    }
                    BinaryOp::Multiply => self.scale(left, right, *span),
                }
            }
            Expr::Mapping {
                kind,
                source,
                from,
                to,
                span,
            } => {
                let source = self.lower(source)?;
                let from = self.lower(from)?;
                let to = self.lower(to)?;
                let class = match kind {
                    MappingKind::Unipolar => MAPPING,
                    MappingKind::Bipolar => BIPOLAR_MAPPING,
                };
                let object = self.synthesize(class, *span)?;
                self.add_to_socket(object, "source", source)?;
                self.add_to_socket(object, "from", from)?;
                self.add_to_socket(object, "to", to)?;
                Ok(Value::Object {
                    object,
                    span: Some(*span),
                })
            }
            Expr::Construction(c) => self.lower_construction(c),
            Expr::SocketAccess {
                object,
                socket,
                span,
            } => {
                let id = self.object_of(object, "sockets")?;
                let class = self.objects[id].class;
                match class.socket_index(&socket.name) {
                    Some(index) => Ok(Value::Socket {
                        object: id,
                        socket: index,
                        span: Some(*span),
                    }),
                    None => Err(self.error(
                        format!(
                            "Undefined socket '{}' for class '{}'",
                            socket.name, class.name
                        ),
                        Some(socket.span),
                    )),
                }
            }
            Expr::OutputAccess {
                object,
                output,
                span,
            } => {
                let id = self.object_of(object, "outputs")?;
                let class = self.objects[id].class;
                match class.canonical_output(&output.name) {
                    Some(canonical) => Ok(Value::Output {
                        object: id,
                        output: canonical.to_string(),
                        span: Some(*span),
                    }),
                    None => Err(self.error(
                        format!(
                            "Undefined output '{}' for class '{}'",
                            output.name, class.name
                        ),
                        Some(output.span),
                    )),
                }
            }
            Expr::ConstAccess(ident) => self.lookup(ident),
        }
    }

    fn lower_construction(&mut self, c: &Construction) -> BResult<Value> {
        let class = self.class(&c.class.name, Some(c.class.span))?;
        let per_voice = self.scope == LineScope::Voice;
        let object = self.add_object(class, per_voice, Some(c.span));

        let mut position = 0;
        for arg in &c.args {
            let (socket, value) = match arg {
                Arg::Positional(value) => {
                    let socket = class.positional_socket(position);
                    position += 1;
                    (socket, value)
                }
                Arg::Keyword { name, value, .. } => (class.canonical_socket(&name.name), value),
            };
            let Some(socket) = socket else {
                return Err(self.error(
                    format!("Too many arguments for {}", class.name),
                    Some(arg.value().span()),
                ));
            };
            let lowered = self.lower(value)?;
            self.add_to_socket(object, socket, lowered)?;
        }

        let value = Value::Object {
            object,
            span: Some(c.span),
        };
        if let Some(name) = &c.name {
            self.register_knob(name, &value)?;
            self.bind(name, value.clone());
        }
        Ok(value)
    }

    /// `-value`. Constants fold; anything else goes through an `Inverter`.
    fn negate(&mut self, value: Value, span: Span) -> BResult<Value> {
        if let Value::Constant { value, .. } = value {
            return Ok(Value::Constant {
                value: -value,
                span: Some(span),
            });
        }
        let object = self.synthesize(INVERTER, span)?;
        self.add_to_socket(object, "input", value)?;
        Ok(Value::Object {
            object,
            span: Some(span),
        })
    }

    /// `left * right`. Constants fold; anything else goes through an
    /// `Attenuator` with `left` as the signal and `right` as the amount.
    fn scale(&mut self, left: Value, right: Value, span: Span) -> BResult<Value> {
        if let (Value::Constant { value: a, .. }, Value::Constant { value: b, .. }) = (&left, &right)
        {
            return Ok(Value::Constant {
                value: a * b,
                span: Some(span),
            });
        }
        let object = self.synthesize(ATTENUATOR, span)?;
        self.add_to_socket(object, "input", left)?;
        self.add_to_socket(object, "amount", right)?;
        Ok(Value::Object {
            object,
            span: Some(span),
        })
    }

    /// Route `from` into `to`, one step of a chain.
    fn connect(&mut self, from: &Value, to: &Value, span: Span) -> BResult<()> {
        match to {
            Value::Object { object, .. } => {
                let class = self.objects[*object].class;
                if let Some(input) = class.socket_index("input") {
                    self.mix_into(*object, input, from.clone())
                } else if let (Some(left), Some(right)) =
                    (class.socket_index("left"), class.socket_index("right"))
                {
                    self.connect_stereo(from, *object, left, right)
                } else {
                    Err(self.error("Incompatible connection in chain", Some(span)))
                }
            }
            Value::Socket { object, socket, .. } => self.mix_into(*object, *socket, from.clone()),
            _ => Err(self.error("Incompatible connection in chain", Some(span))),
        }
    }

    /// A stereo source feeds left to left and right to right; a mono
    /// source feeds both sides.
    fn connect_stereo(&mut self, from: &Value, target: usize, left: usize, right: usize) -> BResult<()> {
        if let Value::Object { object, span } = from {
            let class = self.objects[*object].class;
            if class.has_output("left") && class.has_output("right") {
                for (socket, output) in [(left, "left"), (right, "right")] {
                    self.objects[target].mixes[socket].push(MixValue::Output {
                        object: *object,
                        output: output.to_string(),
                        span: *span,
                    });
                }
                return Ok(());
            }
        }
        self.mix_into(target, left, from.clone())?;
        self.mix_into(target, right, from.clone())
    }

    fn add_to_socket(&mut self, object: usize, socket: &str, value: Value) -> BResult<()> {
        let class = self.objects[object].class;
        match class.socket_index(socket) {
            Some(index) => self.mix_into(object, index, value),
            None => Err(self.error(
                format!("Class {} has no socket named {}", class.name, socket),
                value.span(),
            )),
        }
    }

    /// Append `value` to one socket mix, flattening sums. An object value
    /// contributes its `output`, or both stereo outputs when it has none.
    fn mix_into(&mut self, target: usize, socket: usize, value: Value) -> BResult<()> {
        let contributions = match value {
            Value::Sum(items) => {
                for item in items {
                    self.mix_into(target, socket, item)?;
                }
                return Ok(());
            }
            Value::Constant { value, span } => vec![MixValue::Constant { value, span }],
            Value::Output {
                object,
                output,
                span,
            } => vec![MixValue::Output {
                object,
                output,
                span,
            }],
            Value::Object { object, span } => {
                let class = self.objects[object].class;
                let outputs: Vec<&str> = match class.canonical_output("output") {
                    Some(output) => vec![output],
                    None if class.has_output("left") && class.has_output("right") => {
                        vec!["left", "right"]
                    }
                    None => {
                        return Err(self.error("Incompatible connection in chain", span));
                    }
                };
                outputs
                    .into_iter()
                    .map(|output| MixValue::Output {
                        object,
                        output: output.to_string(),
                        span,
                    })
                    .collect()
            }
            Value::Socket { span, .. } => {
                return Err(self.error("Incompatible connection in chain", span));
            }
        };
        self.objects[target].mixes[socket].extend(contributions);
        Ok(())
    }

    /// Every constant bound to a knob becomes a parameter, aliases included.
    fn register_knob(&mut self, name: &Ident, value: &Value) -> BResult<()> {
        if name.is_discard() {
            return Ok(());
        }
        let Value::Object { object, .. } = value else {
            return Ok(());
        };
        if self.objects[*object].class.name != KNOB {
            return Ok(());
        }
        if self.scope == LineScope::Voice {
            return Err(self.error("Voice-level custom inputs are not supported", Some(name.span)));
        }
        self.parameters.push(Parameter {
            name: name.name.clone(),
            object: *object,
        });
        Ok(())
    }

    fn bind(&mut self, name: &Ident, value: Value) {
        if name.is_discard() {
            return;
        }
        let table = match self.scope {
            LineScope::Voice => &mut self.voice,
            LineScope::Global => &mut self.global,
        };
        table.insert(name.name.clone(), value);
    }

    fn lookup(&mut self, ident: &Ident) -> BResult<Value> {
        let found = match self.scope {
            LineScope::Voice => self
                .voice
                .get(&ident.name)
                .or_else(|| self.global.get(&ident.name)),
            LineScope::Global => self.global.get(&ident.name),
        };
        match found {
            Some(value) => Ok(value.clone()),
            None => Err(self.error(
                format!("Undefined identifier: {}", ident.name),
                Some(ident.span),
            )),
        }
    }

    fn object_of(&mut self, ident: &Ident, what: &str) -> BResult<usize> {
        match self.lookup(ident)? {
            Value::Object { object, .. } => Ok(object),
            _ => Err(self.error(
                format!("Only objects have {}: {}", what, ident.name),
                Some(ident.span),
            )),
        }
    }

    fn class(&mut self, name: &str, span: Option<Span>) -> BResult<&'a ClassDescriptor> {
        let catalog = self.catalog;
        match catalog.resolve(name) {
            Some(class) => Ok(class),
            None => Err(self.error(format!("Undefined class: {name}"), span)),
        }
    }

    fn synthesize(&mut self, class_name: &str, span: Span) -> BResult<usize> {
        let class = self.class(class_name, Some(span))?;
        let per_voice = self.scope == LineScope::Voice;
        Ok(self.add_object(class, per_voice, Some(span)))
    }

    fn add_object(&mut self, class: &'a ClassDescriptor, per_voice: bool, span: Option<Span>) -> usize {
        self.objects.push(BuildObject {
            class,
            per_voice,
            mixes: vec![Vec::new(); class.sockets.len()],
            span,
        });
        self.objects.len() - 1
    }

    fn export(&self, order: Vec<usize>, options: &CompileOptions) -> Structure {
        let objects = self
            .objects
            .iter()
            .map(|o| {
                let mut socket_mixes = BTreeMap::new();
                for (spec, mix) in o.class.sockets.iter().zip(&o.mixes) {
                    if options.remove_aliases {
                        socket_mixes.insert(spec.canonical().to_string(), mix.clone());
                    } else {
                        for name in &spec.names {
                            socket_mixes.insert(name.clone(), mix.clone());
                        }
                    }
                }
                StructureObject {
                    class_name: o.class.name.clone(),
                    per_voice: o.per_voice,
                    socket_mixes,
                    span: o.span,
                }
            })
            .collect();

        let mut structure = Structure {
            user_input_names: GLOBAL_INPUTS.iter().map(|s| s.to_string()).collect(),
            user_output_names: vec![GLOBAL_OUTPUT.to_string()],
            user_per_voice_input_names: VOICE_INPUTS.iter().map(|s| s.to_string()).collect(),
            parameters: self.parameters.clone(),
            objects,
            recalculation_order: order,
        };
        if options.remove_spans {
            structure.strip_spans();
        }
        structure
    }

    fn error(&mut self, message: impl Into<String>, span: Option<Span>) -> Abort {
        self.errors.push(Diagnostic::interpretation(message, span));
        Abort
    }
}

/// Lower a resolved program into a structure.
pub fn build(program: &Program, catalog: &ClassCatalog, options: &CompileOptions) -> BuildOutput {
    IrBuilder::new(catalog).build(program, options)
}
