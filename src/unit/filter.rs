//! Resonant low-pass filters built from cascaded one-pole sections.
//!
//! Sockets are `input`, `cutoff` (normalized frequency) and `resonance`
//! (0..1).

use std::f64::consts::PI;

use super::{SoundUnit, UnitContext, UnitRegistry};
use crate::catalog::ClassDescriptor;
use crate::convert::to_hertz;

const INPUT: usize = 0;
const CUTOFF: usize = 1;
const RESONANCE: usize = 2;

fn one_pole_coefficient(cutoff: f64, sample_rate: f64) -> f64 {
    let a = 2.0 * PI * to_hertz(cutoff) / sample_rate;
    a / (a + 1.0)
}

/// Two-pole low-pass with feedback resonance.
#[derive(Debug, Clone)]
pub struct LowPass12 {
    sample_rate: f64,
    buf0: f64,
    buf1: f64,
}

impl LowPass12 {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            buf0: 0.0,
            buf1: 0.0,
        }
    }
}

impl SoundUnit for LowPass12 {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        let alpha = one_pole_coefficient(inputs[CUTOFF], self.sample_rate);
        let resonance = inputs[RESONANCE];
        let feedback = resonance + resonance / (1.0 - alpha);
        self.buf0 += alpha * (inputs[INPUT] - self.buf0 + feedback * (self.buf0 - self.buf1));
        self.buf1 += alpha * (self.buf0 - self.buf1);
        outputs[0] = self.buf1;
    }
}

/// Four-pole ladder-style low-pass. Resonance near 1 approaches
/// self-oscillation.
#[derive(Debug, Clone)]
pub struct LowPass24 {
    sample_rate: f64,
    stages: [f64; 4],
}

impl LowPass24 {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            stages: [0.0; 4],
        }
    }
}

impl SoundUnit for LowPass24 {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        let alpha = one_pole_coefficient(inputs[CUTOFF], self.sample_rate).min(0.99);
        let feedback = inputs[RESONANCE].clamp(0.0, 1.0) * 3.95;
        let mut signal = inputs[INPUT] - self.stages[3] * feedback;
        for stage in &mut self.stages {
            *stage += alpha * (signal - *stage);
            signal = *stage;
        }
        outputs[0] = self.stages[3];
    }
}

fn descriptor(name: &str) -> ClassDescriptor {
    ClassDescriptor::new(name)
        .socket(&["input"])
        .socket(&["cutoff", "frequency", "freq", "f"])
        .socket(&["resonance", "res", "q"])
        .output(&["output"])
        .positional(&["cutoff", "resonance"])
        .group("Filter")
}

pub fn register(registry: &mut UnitRegistry) {
    registry.register(descriptor("LowPass12db"), |ctx: &UnitContext| {
        Box::new(LowPass12::new(ctx.sample_rate))
    });
    registry.register(descriptor("LowPass24db"), |ctx: &UnitContext| {
        Box::new(LowPass24::new(ctx.sample_rate))
    });
    registry.register_alias("LP", "LowPass12db");
}
