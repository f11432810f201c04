//! Utility units: arithmetic nodes synthesized by the compiler and plain
//! mixers.

use super::{SoundUnit, UnitRegistry};
use crate::catalog::builtin::{ATTENUATOR, BIPOLAR_MAPPING, INVERTER, MAPPING};
use crate::catalog::ClassDescriptor;

/// `-input`
#[derive(Debug, Clone, Default)]
pub struct Inverter;

impl SoundUnit for Inverter {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = -inputs[0];
    }
}

/// `input * amount`. Sockets are `amount` then `input`.
#[derive(Debug, Clone, Default)]
pub struct Attenuator;

impl SoundUnit for Attenuator {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = inputs[1] * inputs[0];
    }
}

/// Rescales `source` onto `[from, to]`. A unipolar source spans 0..1, a
/// bipolar one -1..1.
#[derive(Debug, Clone)]
pub struct Mapping {
    bipolar: bool,
}

impl Mapping {
    pub fn unipolar() -> Self {
        Self { bipolar: false }
    }

    pub fn bipolar() -> Self {
        Self { bipolar: true }
    }
}

impl SoundUnit for Mapping {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        let (source, from, to) = (inputs[0], inputs[1], inputs[2]);
        let position = if self.bipolar {
            (source + 1.0) / 2.0
        } else {
            source
        };
        outputs[0] = position * (to - from) + from;
    }
}

/// Passes its socket sums straight through. Summing happens in the engine,
/// so a mixer is just a named junction.
#[derive(Debug, Clone, Default)]
pub struct PassThrough;

impl SoundUnit for PassThrough {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        outputs.copy_from_slice(&inputs[..outputs.len()]);
    }
}

pub fn register(registry: &mut UnitRegistry) {
    registry.register(
        ClassDescriptor::new(INVERTER)
            .socket(&["input"])
            .output(&["output"])
            .positional(&["input"])
            .group("Utility"),
        |_| Box::new(Inverter),
    );
    registry.register(
        ClassDescriptor::new(ATTENUATOR)
            .socket(&["amount", "amt", "a", "gain", "g"])
            .socket(&["input"])
            .output(&["output"])
            .positional(&["amount", "input"])
            .group("Utility"),
        |_| Box::new(Attenuator),
    );
    for (name, bipolar) in [(MAPPING, false), (BIPOLAR_MAPPING, true)] {
        registry.register(
            ClassDescriptor::new(name)
                .socket(&["source"])
                .socket(&["from"])
                .socket(&["to"])
                .output(&["output"])
                .positional(&["source", "from", "to"])
                .group("Utility"),
            move |_| Box::new(Mapping { bipolar }),
        );
    }
    registry.register(
        ClassDescriptor::new("Mix")
            .socket(&["input"])
            .output(&["output"])
            .positional(&["input"])
            .group("Utility"),
        |_| Box::new(PassThrough),
    );
    registry.register(
        ClassDescriptor::new("StereoMix")
            .socket(&["left"])
            .socket(&["right"])
            .output(&["left"])
            .output(&["right"])
            .positional(&["left", "right"])
            .group("Utility"),
        |_| Box::new(PassThrough),
    );
}
