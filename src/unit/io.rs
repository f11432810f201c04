//! Units fed from outside the graph: note inputs, knobs, and the final
//! stereo sink.

use super::{SoundUnit, UnitRegistry};
use crate::catalog::builtin::{KNOB, USER_INPUT, USER_STEREO_OUTPUT};
use crate::catalog::ClassDescriptor;

/// Value a knob holds until it is first set.
pub const KNOB_DEFAULT: f64 = 0.5;

/// Emits whatever value was last set.
#[derive(Debug, Clone, Default)]
pub struct UserInput {
    value: f64,
}

impl UserInput {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl SoundUnit for UserInput {
    fn process(&mut self, _inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = self.value;
    }

    fn set_value(&mut self, value: f64) {
        self.value = value;
    }
}

/// The final stereo sink. The engine reads its socket sums directly, so
/// there is nothing to compute.
#[derive(Debug, Clone, Default)]
pub struct StereoSink;

impl SoundUnit for StereoSink {
    fn process(&mut self, _inputs: &[f64], _outputs: &mut [f64]) {}
}

pub fn register(registry: &mut UnitRegistry) {
    registry.register(
        ClassDescriptor::new(USER_INPUT)
            .output(&["output"])
            .group("UserInterface"),
        |_| Box::new(UserInput::default()),
    );
    registry.register(
        ClassDescriptor::new(USER_STEREO_OUTPUT)
            .socket(&["left"])
            .socket(&["right"])
            .group("UserInterface"),
        |_| Box::new(StereoSink),
    );
    registry.register(
        ClassDescriptor::new(KNOB).output(&["output"]).group("UserInterface"),
        |_| Box::new(UserInput::new(KNOB_DEFAULT)),
    );
}
