//! Runtime engine: instantiates a compiled structure into a flat,
//! per-sample signal network and plays notes on it.
//!
//! Per-voice objects get one unit instance per voice, everything else gets a
//! single instance. All instance outputs and literal constants live in one
//! value buffer, and every socket's contributions are resolved to buffer
//! indices up front, so [`Engine::generate_into`] never looks anything up
//! and never allocates.

pub mod voice;

use std::ops::Range;

use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::builtin::{
    builtin_object_count, FIRST_VOICE_INPUT, GLOBAL_INPUTS, OUTPUT_OBJECT, USER_INPUT,
    USER_STEREO_OUTPUT, VOICE_INPUTS,
};
use crate::catalog::ClassDescriptor;
use crate::config::EngineSettings;
use crate::convert::note_to_pitch;
use crate::ir::{MixValue, Structure};
use crate::unit::{SoundUnit, UnitContext, UnitRegistry};

pub use voice::{Voice, VoiceAllocator, VoiceState, MAX_NOTE};

/// Most sockets a single unit class may have.
pub const MAX_SOCKETS: usize = 16;

const TRIGGER: usize = 0;
const GATE: usize = 1;
const PITCH: usize = 2;
const VELOCITY: usize = 3;
const VOICE_T: usize = 4;

/// Engine construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The structure uses a class the registry cannot instantiate.
    #[error("unknown unit class: {0}")]
    UnknownClass(String),
    /// A built-in input or output object is missing or has the wrong shape.
    #[error("object {index} should be a built-in {expected}")]
    MissingBuiltin { index: usize, expected: &'static str },
    #[error("class {class} has {count} sockets, at most {MAX_SOCKETS} are supported")]
    TooManySockets { class: String, count: usize },
    /// An object index points past the end of the structure.
    #[error("object index {index} out of range")]
    ObjectOutOfRange { index: usize },
    #[error("class {class} has no output named {output}")]
    UnknownOutput { class: String, output: String },
    #[error("at least one voice is required")]
    NoVoices,
}

/// One unit instance and where its arguments and outputs live.
struct Instance {
    unit: Box<dyn SoundUnit>,
    /// Range into `Engine::socket_args`, one entry per socket.
    sockets: Range<usize>,
    /// Range into `Engine::values`, one slot per output.
    outputs: Range<usize>,
}

/// Note inputs driven by note events, as instance ids.
#[derive(Debug, Clone, Copy)]
struct NoteInputs {
    trigger: usize,
    gate: usize,
    pitch: usize,
    velocity: usize,
}

/// Knob-backed parameter and the instances it drives.
struct ParameterSlot {
    name: String,
    instances: Range<usize>,
}

pub struct Engine {
    instances: Vec<Instance>,
    /// Per socket, a range into `args`.
    socket_args: Vec<Range<usize>>,
    /// Value-buffer indices summed into sockets.
    args: Vec<usize>,
    values: Vec<f64>,
    /// Instance ids in evaluation order.
    order: Vec<usize>,
    output: usize,
    output_left: usize,
    output_right: usize,
    global_inputs: NoteInputs,
    voice_inputs: Vec<NoteInputs>,
    /// Trigger instances set during the current sample.
    latched: Vec<usize>,
    parameters: Vec<ParameterSlot>,
    allocator: VoiceAllocator,
}

/// Maps object ids to their instance ids.
struct Layout {
    base: Vec<usize>,
    per_voice: Vec<bool>,
    voices: usize,
}

impl Layout {
    fn instance(&self, object: usize, voice: usize) -> usize {
        if self.per_voice[object] {
            self.base[object] + voice
        } else {
            self.base[object]
        }
    }

    fn instances(&self, object: usize) -> Range<usize> {
        let count = if self.per_voice[object] { self.voices } else { 1 };
        self.base[object]..self.base[object] + count
    }
}

impl Engine {
    pub fn new(
        structure: &Structure,
        registry: &UnitRegistry,
        settings: &EngineSettings,
    ) -> Result<Self, EngineError> {
        let voices = settings.voices;
        if voices == 0 {
            return Err(EngineError::NoVoices);
        }

        let descriptors = structure
            .objects
            .iter()
            .map(|object| {
                let class = registry
                    .catalog()
                    .resolve(&object.class_name)
                    .ok_or_else(|| EngineError::UnknownClass(object.class_name.clone()))?;
                if class.sockets.len() > MAX_SOCKETS {
                    return Err(EngineError::TooManySockets {
                        class: class.name.clone(),
                        count: class.sockets.len(),
                    });
                }
                Ok(class)
            })
            .collect::<Result<Vec<&ClassDescriptor>, _>>()?;
        check_builtins(structure, &descriptors)?;

        let mut layout = Layout {
            base: Vec::with_capacity(structure.objects.len()),
            per_voice: structure.objects.iter().map(|o| o.per_voice).collect(),
            voices,
        };
        let mut instances = Vec::new();
        let mut values = Vec::new();
        let sample_rate = f64::from(settings.sample_rate);
        for (object, class) in descriptors.iter().enumerate() {
            layout.base.push(instances.len());
            for _ in layout.instances(object) {
                let ctx = UnitContext {
                    sample_rate,
                    seed: settings.seed.wrapping_add(instances.len() as u64),
                };
                let unit = registry
                    .create(&class.name, &ctx)
                    .ok_or_else(|| EngineError::UnknownClass(class.name.clone()))?;
                let start = values.len();
                values.resize(start + class.outputs.len(), 0.0);
                instances.push(Instance {
                    unit,
                    sockets: 0..0,
                    outputs: start..values.len(),
                });
            }
        }

        let mut socket_args = Vec::new();
        let mut args = Vec::new();
        for (object, (entry, class)) in structure.objects.iter().zip(&descriptors).enumerate() {
            for voice in 0..layout.instances(object).len() {
                let start = socket_args.len();
                for socket in &class.sockets {
                    let first = args.len();
                    let mix = entry
                        .socket_mixes
                        .get(socket.canonical())
                        .map(Vec::as_slice)
                        .unwrap_or_default();
                    for value in mix {
                        match value {
                            MixValue::Constant { value, .. } => {
                                args.push(values.len());
                                values.push(*value);
                            }
                            MixValue::Output { object: producer, output, .. } => {
                                let producer = *producer;
                                let producer_class = descriptors
                                    .get(producer)
                                    .ok_or(EngineError::ObjectOutOfRange { index: producer })?;
                                let offset = producer_class.output_index(output).ok_or_else(|| {
                                    EngineError::UnknownOutput {
                                        class: producer_class.name.clone(),
                                        output: output.clone(),
                                    }
                                })?;
                                if layout.per_voice[producer] && !layout.per_voice[object] {
                                    for id in layout.instances(producer) {
                                        args.push(instances[id].outputs.start + offset);
                                    }
                                } else {
                                    let id = layout.instance(producer, voice);
                                    args.push(instances[id].outputs.start + offset);
                                }
                            }
                        }
                    }
                    socket_args.push(first..args.len());
                }
                let id = layout.instance(object, voice);
                instances[id].sockets = start..socket_args.len();
            }
        }

        let mut order = Vec::with_capacity(instances.len());
        for &object in &structure.recalculation_order {
            if object >= structure.objects.len() {
                return Err(EngineError::ObjectOutOfRange { index: object });
            }
            order.extend(layout.instances(object));
        }

        let note_inputs = |first: usize, voice: usize| NoteInputs {
            trigger: layout.instance(first + TRIGGER, voice),
            gate: layout.instance(first + GATE, voice),
            pitch: layout.instance(first + PITCH, voice),
            velocity: layout.instance(first + VELOCITY, voice),
        };
        let global_inputs = note_inputs(0, 0);
        let voice_inputs: Vec<NoteInputs> =
            (0..voices).map(|v| note_inputs(FIRST_VOICE_INPUT, v)).collect();

        let output_class = descriptors[OUTPUT_OBJECT];
        let parameters = structure
            .parameters
            .iter()
            .map(|p| {
                if p.object >= structure.objects.len() {
                    return Err(EngineError::ObjectOutOfRange { index: p.object });
                }
                Ok(ParameterSlot {
                    name: p.name.clone(),
                    instances: layout.instances(p.object),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut engine = Self {
            output: layout.instance(OUTPUT_OBJECT, 0),
            output_left: output_class.socket_index("left").unwrap_or(0),
            output_right: output_class.socket_index("right").unwrap_or(1),
            instances,
            socket_args,
            args,
            values,
            order,
            global_inputs,
            voice_inputs,
            latched: Vec::with_capacity(voices + 1),
            parameters,
            allocator: VoiceAllocator::new(voices),
        };

        let spread = (voices.max(2) - 1) as f64;
        for voice in 0..voices {
            let id = layout.instance(FIRST_VOICE_INPUT + VOICE_T, voice);
            engine.instances[id].unit.set_value(voice as f64 / spread);
        }

        debug!(
            objects = structure.objects.len(),
            instances = engine.instances.len(),
            slots = engine.values.len(),
            voices,
            "engine ready"
        );
        Ok(engine)
    }

    /// Knob names in declaration order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|p| p.name.as_str())
    }

    /// Set a knob, clamped to [0, 1]. Returns false for an unknown name.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> bool {
        let Some(parameter) = self.parameters.iter().find(|p| p.name == name) else {
            warn!(name, "unknown parameter");
            return false;
        };
        let value = value.clamp(0.0, 1.0);
        for id in parameter.instances.clone() {
            self.instances[id].unit.set_value(value);
        }
        true
    }

    pub fn voices(&self) -> &[Voice] {
        self.allocator.voices()
    }

    pub fn note_on(&mut self, note: u8, velocity: f64) {
        if note > MAX_NOTE {
            warn!(note, "note out of range");
            return;
        }
        let voice = self.allocator.assign(note);
        debug!(note, voice, "note on");
        let pitch = note_to_pitch(note);
        let velocity = velocity.clamp(0.0, 1.0);
        for inputs in [self.global_inputs, self.voice_inputs[voice]] {
            self.set_input(inputs.gate, 1.0);
            self.set_input(inputs.pitch, pitch);
            self.set_input(inputs.velocity, velocity);
            self.set_input(inputs.trigger, 1.0);
            if !self.latched.contains(&inputs.trigger) {
                self.latched.push(inputs.trigger);
            }
        }
    }

    /// Release `note`. The release velocity is accepted for symmetry with
    /// note-on and currently unused.
    pub fn note_off(&mut self, note: u8, _velocity: f64) {
        let Some(voice) = self.allocator.release(note) else {
            return;
        };
        debug!(note, voice, "note off");
        self.set_input(self.voice_inputs[voice].gate, 0.0);
        if !self.allocator.any_active() {
            self.set_input(self.global_inputs.gate, 0.0);
        }
    }

    pub fn release_all(&mut self) {
        self.allocator.release_all();
        for voice in 0..self.voice_inputs.len() {
            self.set_input(self.voice_inputs[voice].gate, 0.0);
        }
        self.set_input(self.global_inputs.gate, 0.0);
    }

    /// Render `frames` stereo frames, interleaved left/right.
    pub fn generate(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        self.generate_into(&mut out);
        out
    }

    /// Fill `out` with interleaved stereo frames. A trailing odd sample is
    /// left untouched.
    pub fn generate_into(&mut self, out: &mut [f32]) {
        for frame in out.chunks_exact_mut(2) {
            let (left, right) = self.tick();
            frame[0] = left as f32;
            frame[1] = right as f32;
        }
    }

    fn set_input(&mut self, instance: usize, value: f64) {
        self.instances[instance].unit.set_value(value);
    }

    /// Advance the whole network by one sample.
    fn tick(&mut self) -> (f64, f64) {
        let mut scratch = [0.0; MAX_SOCKETS];
        let mut frame = (0.0, 0.0);
        for &id in &self.order {
            let instance = &mut self.instances[id];
            let sockets = &self.socket_args[instance.sockets.clone()];
            for (slot, args) in scratch.iter_mut().zip(sockets) {
                *slot = self.args[args.clone()].iter().map(|&i| self.values[i]).sum();
            }
            if id == self.output {
                frame = (scratch[self.output_left], scratch[self.output_right]);
            }
            let inputs = &scratch[..sockets.len()];
            instance
                .unit
                .process(inputs, &mut self.values[instance.outputs.clone()]);
        }

        for &id in &self.latched {
            self.instances[id].unit.set_value(0.0);
        }
        self.latched.clear();
        frame
    }
}

fn check_builtins(structure: &Structure, classes: &[&ClassDescriptor]) -> Result<(), EngineError> {
    if classes.len() < builtin_object_count() {
        return Err(EngineError::MissingBuiltin {
            index: classes.len(),
            expected: USER_INPUT,
        });
    }
    let expect = |index: usize, class: &'static str, per_voice: bool| {
        if classes[index].name == class && structure.objects[index].per_voice == per_voice {
            Ok(())
        } else {
            Err(EngineError::MissingBuiltin {
                index,
                expected: class,
            })
        }
    };
    for index in 0..GLOBAL_INPUTS.len() {
        expect(index, USER_INPUT, false)?;
    }
    expect(OUTPUT_OBJECT, USER_STEREO_OUTPUT, false)?;
    let stereo = classes[OUTPUT_OBJECT];
    if !(stereo.has_socket("left") && stereo.has_socket("right")) {
        return Err(EngineError::MissingBuiltin {
            index: OUTPUT_OBJECT,
            expected: USER_STEREO_OUTPUT,
        });
    }
    for offset in 0..VOICE_INPUTS.len() {
        expect(FIRST_VOICE_INPUT + offset, USER_INPUT, true)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompileOptions;
    use crate::dsl::Compiler;

    fn engine_with(src: &str, voices: usize) -> Engine {
        let registry = UnitRegistry::with_defaults();
        let out = Compiler::compile(src, registry.catalog(), &CompileOptions::default());
        let structure = match out.structure {
            Some(structure) => structure,
            None => panic!("compile failed: {:?}", out.diagnostics().collect::<Vec<_>>()),
        };
        let settings = EngineSettings {
            voices,
            ..EngineSettings::default()
        };
        Engine::new(&structure, &registry, &settings).unwrap()
    }

    #[test]
    fn constant_reaches_both_channels() {
        let mut engine = engine_with("0.25 => output", 1);
        assert_eq!(engine.generate(2), vec![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn silent_without_notes() {
        let mut engine = engine_with("startvoice\nnew Saw(pitch) * gate => output\nendvoice", 3);
        assert!(engine.generate(64).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn gate_follows_notes() {
        let mut engine = engine_with("gate => output", 2);
        engine.note_on(60, 1.0);
        assert_eq!(engine.generate(1), vec![1.0, 1.0]);
        engine.note_off(60, 0.0);
        assert_eq!(engine.generate(1), vec![0.0, 0.0]);
    }

    #[test]
    fn trigger_lasts_one_sample() {
        let mut engine = engine_with("trigger => output", 1);
        engine.note_on(60, 1.0);
        let out = engine.generate(3);
        assert_eq!(out, vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn global_reads_sum_over_voices() {
        let mut engine = engine_with("startvoice\ngate => output\nendvoice", 3);
        engine.note_on(60, 1.0);
        engine.note_on(64, 1.0);
        assert_eq!(engine.generate(1), vec![2.0, 2.0]);
    }

    #[test]
    fn voice_t_spreads_across_voices() {
        let mut engine = engine_with("startvoice\nvoiceT => output\nendvoice", 3);
        assert_eq!(engine.generate(1), vec![1.5, 1.5]);
    }

    #[test]
    fn knob_defaults_and_clamps() {
        let mut engine = engine_with("Knob volume()\nvolume => output", 1);
        assert_eq!(engine.parameter_names().collect::<Vec<_>>(), vec!["volume"]);
        assert_eq!(engine.generate(1), vec![0.5, 0.5]);
        assert!(engine.set_parameter("volume", 3.0));
        assert_eq!(engine.generate(1), vec![1.0, 1.0]);
        assert!(!engine.set_parameter("missing", 0.1));
    }

    #[test]
    fn release_all_silences_gate() {
        let mut engine = engine_with("startvoice\ngate => output\nendvoice", 2);
        engine.note_on(60, 1.0);
        engine.note_on(62, 1.0);
        engine.release_all();
        assert_eq!(engine.generate(1), vec![0.0, 0.0]);
        assert!(engine.voices().iter().all(|v| !v.is_active()));
    }

    #[test]
    fn rejects_zero_voices() {
        let registry = UnitRegistry::with_defaults();
        let out = Compiler::compile("0 => output", registry.catalog(), &CompileOptions::default());
        let settings = EngineSettings {
            voices: 0,
            ..EngineSettings::default()
        };
        let err = Engine::new(&out.structure.unwrap(), &registry, &settings).err();
        assert_eq!(err, Some(EngineError::NoVoices));
    }

    #[test]
    fn rejects_unknown_class() {
        let registry = UnitRegistry::with_defaults();
        let out = Compiler::compile("new Sine(440hz) => output", registry.catalog(), &CompileOptions::default());
        let mut structure = out.structure.unwrap();
        let last = structure.objects.len() - 1;
        structure.objects[last].class_name = "Theremin".to_string();
        let err = Engine::new(&structure, &registry, &EngineSettings::default()).err();
        assert_eq!(err, Some(EngineError::UnknownClass("Theremin".to_string())));
    }
}
