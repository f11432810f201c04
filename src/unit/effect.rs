//! Tape delays and saturation.

use super::{SoundUnit, UnitContext, UnitRegistry};
use crate::catalog::ClassDescriptor;
use crate::convert::to_seconds;

/// Longest delay time a tape can hold.
pub const MAX_DELAY_SECONDS: f64 = 5.0;

const INPUT: usize = 0;
const TIME: usize = 1;
const FEEDBACK: usize = 2;

/// Circular buffer sized for [`MAX_DELAY_SECONDS`], allocated once.
#[derive(Debug, Clone)]
struct Tape {
    samples: Vec<f64>,
    head: usize,
}

impl Tape {
    fn new(sample_rate: f64) -> Self {
        let len = ((MAX_DELAY_SECONDS * sample_rate) as usize).max(2);
        Self {
            samples: vec![0.0; len],
            head: 0,
        }
    }

    /// Read position for a normalized delay time, at least one sample back.
    fn read_index(&self, time: f64, sample_rate: f64) -> usize {
        let len = self.samples.len();
        let delay = ((to_seconds(time) * sample_rate).round() as usize).clamp(1, len - 1);
        (self.head + len - delay) % len
    }

    fn read(&self, index: usize) -> f64 {
        self.samples[index]
    }

    fn write(&mut self, value: f64) {
        self.samples[self.head] = value;
    }

    fn advance(&mut self) {
        self.head = (self.head + 1) % self.samples.len();
    }
}

/// Mono feedback delay. Output is the dry input plus the delayed signal.
#[derive(Debug, Clone)]
pub struct Delay {
    sample_rate: f64,
    tape: Tape,
}

impl Delay {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            tape: Tape::new(sample_rate),
        }
    }
}

impl SoundUnit for Delay {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        let input = inputs[INPUT];
        let delayed = self
            .tape
            .read(self.tape.read_index(inputs[TIME], self.sample_rate));
        outputs[0] = input + delayed;
        self.tape.write(input + delayed * inputs[FEEDBACK]);
        self.tape.advance();
    }
}

/// Stereo delay whose echoes alternate between the left and right outputs.
#[derive(Debug, Clone)]
pub struct PingPongDelay {
    sample_rate: f64,
    left: Tape,
    right: Tape,
}

impl PingPongDelay {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            left: Tape::new(sample_rate),
            right: Tape::new(sample_rate),
        }
    }
}

impl SoundUnit for PingPongDelay {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        let (input, feedback) = (inputs[INPUT], inputs[FEEDBACK]);
        let index = self.left.read_index(inputs[TIME], self.sample_rate);
        let delayed_left = self.left.read(index);
        let delayed_right = self.right.read(index);
        outputs[0] = delayed_left;
        outputs[1] = delayed_right;
        self.left.write(input + delayed_right * feedback);
        self.right.write(delayed_left * feedback);
        self.left.advance();
        self.right.advance();
    }
}

/// `tanh(input * gain)`
#[derive(Debug, Clone, Default)]
pub struct Drive;

impl SoundUnit for Drive {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = (inputs[1] * inputs[0]).tanh();
    }
}

fn delay_descriptor(name: &str) -> ClassDescriptor {
    ClassDescriptor::new(name)
        .socket(&["input"])
        .socket(&["time", "t"])
        .socket(&["feedback", "fb"])
        .positional(&["time", "feedback"])
        .group("Effect")
}

pub fn register(registry: &mut UnitRegistry) {
    registry.register(
        delay_descriptor("Delay").output(&["output"]),
        |ctx: &UnitContext| Box::new(Delay::new(ctx.sample_rate)),
    );
    registry.register(
        delay_descriptor("PingPongDelay")
            .output(&["left"])
            .output(&["right"]),
        |ctx: &UnitContext| Box::new(PingPongDelay::new(ctx.sample_rate)),
    );
    registry.register(
        ClassDescriptor::new("Drive")
            .socket(&["gain", "g"])
            .socket(&["input"])
            .output(&["output"])
            .positional(&["gain"])
            .group("Effect"),
        |_| Box::new(Drive),
    );
}
