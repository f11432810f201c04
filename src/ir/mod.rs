//! Intermediate representation: the flat object graph ("structure") that the
//! compiler produces and the engine instantiates.
//!
//! Objects are stored in a fixed order. The built-in global inputs come
//! first, then the global output, then the per-voice inputs, then every
//! user or operator-synthesized object in program order. The engine relies
//! on this order (see [`crate::catalog::builtin`]).

pub mod builder;
pub mod order;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dsl::Span;

pub use builder::{build, BuildOutput, IrBuilder};

/// A contribution to a socket. Every contribution to one socket is summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MixValue {
    /// The named output of another object.
    Output {
        object: usize,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
    /// A literal, already converted to the normalized scale.
    Constant {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },
}

impl MixValue {
    pub fn span(&self) -> Option<Span> {
        match self {
            MixValue::Output { span, .. } | MixValue::Constant { span, .. } => *span,
        }
    }

    fn strip_span(&mut self) {
        match self {
            MixValue::Output { span, .. } | MixValue::Constant { span, .. } => *span = None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureObject {
    pub class_name: String,
    pub per_voice: bool,
    /// Canonical socket name to its contributions. Every socket of the class
    /// has an entry, possibly empty. When aliases are kept, each alias is an
    /// extra key holding the same contributions.
    pub socket_mixes: BTreeMap<String, Vec<MixValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl StructureObject {
    /// Every object this one reads, in socket order, with repeats.
    pub fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.socket_mixes.values().flatten().filter_map(|v| match v {
            MixValue::Output { object, .. } => Some(*object),
            MixValue::Constant { .. } => None,
        })
    }
}

/// A user-adjustable parameter backed by a `Knob` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub object: usize,
}

/// The compiled patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub user_input_names: Vec<String>,
    pub user_output_names: Vec<String>,
    pub user_per_voice_input_names: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub objects: Vec<StructureObject>,
    /// Object indices, each after every object it reads.
    pub recalculation_order: Vec<usize>,
}

impl Structure {
    /// Drop every source span.
    pub fn strip_spans(&mut self) {
        for object in &mut self.objects {
            object.span = None;
            for mix in object.socket_mixes.values_mut() {
                mix.iter_mut().for_each(MixValue::strip_span);
            }
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
