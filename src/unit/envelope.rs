//! ADSR envelope generators driven by gate and trigger signals.
//!
//! Attack, decay and release are normalized durations (see
//! [`crate::convert::to_seconds`]); sustain is a level in 0..1. A gate
//! above 0.5 holds the note, a trigger above 0.5 restarts the attack.

use super::{SoundUnit, UnitContext, UnitRegistry};
use crate::catalog::ClassDescriptor;
use crate::convert::to_seconds;

const GATE: usize = 0;
const TRIGGER: usize = 1;
const ATTACK: usize = 2;
const DECAY: usize = 3;
const SUSTAIN: usize = 4;
const RELEASE: usize = 5;

/// Level at which an exponential segment counts as finished.
const MIN_LEVEL: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// Straight-line segments.
    Linear,
    /// Multiplicative segments that approach their target exponentially.
    Exponential,
}

#[derive(Debug, Clone)]
pub struct Adsr {
    curve: Curve,
    sample_rate: f64,
    stage: Stage,
    level: f64,
    multiplier: f64,
    sustain_level: f64,
}

impl Adsr {
    pub fn new(curve: Curve, sample_rate: f64) -> Self {
        Self {
            curve,
            sample_rate,
            stage: Stage::Idle,
            level: 0.0,
            multiplier: 1.0,
            sustain_level: 0.0,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn samples(&self, duration: f64) -> f64 {
        to_seconds(duration) * self.sample_rate
    }

    fn advance_linear(&mut self, inputs: &[f64]) {
        let gate = inputs[GATE] > 0.5;
        if inputs[TRIGGER] > 0.5 {
            self.stage = Stage::Attack;
        } else if gate && matches!(self.stage, Stage::Idle | Stage::Release) {
            self.stage = Stage::Attack;
        } else if !gate && matches!(self.stage, Stage::Attack | Stage::Decay | Stage::Sustain) {
            self.stage = Stage::Release;
        }

        let sustain = inputs[SUSTAIN];
        match self.stage {
            Stage::Idle => {}
            Stage::Sustain => self.level = sustain,
            Stage::Attack => {
                let samples = self.samples(inputs[ATTACK]);
                self.level = if samples <= 0.0 {
                    1.0
                } else {
                    self.level + 1.0 / samples
                };
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                let samples = self.samples(inputs[DECAY]);
                self.level = if samples <= 0.0 {
                    sustain
                } else {
                    self.level - 1.0 / samples
                };
                if self.level <= sustain {
                    self.level = sustain;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Release => {
                let samples = self.samples(inputs[RELEASE]);
                self.level = if samples <= 0.0 {
                    0.0
                } else {
                    self.level - 1.0 / samples
                };
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
    }

    fn advance_exponential(&mut self, inputs: &[f64]) {
        let gate = inputs[GATE] > 0.5;
        let retrigger = inputs[TRIGGER] > 0.5;
        if retrigger || (gate && matches!(self.stage, Stage::Idle | Stage::Release)) {
            self.stage = Stage::Attack;
            self.multiplier = MIN_LEVEL.powf(1.0 / self.samples(inputs[ATTACK]));
        } else if !gate && matches!(self.stage, Stage::Attack | Stage::Decay | Stage::Sustain) {
            self.stage = Stage::Release;
            self.multiplier = MIN_LEVEL.powf(1.0 / self.samples(inputs[RELEASE]));
        }

        match self.stage {
            Stage::Idle => {}
            Stage::Sustain => self.level = self.sustain_level,
            Stage::Attack => {
                self.level = if self.samples(inputs[ATTACK]) <= 0.0 {
                    1.0
                } else {
                    1.0 - (1.0 - self.level) * self.multiplier
                };
                if self.level >= 1.0 - MIN_LEVEL {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                    self.sustain_level = inputs[SUSTAIN].max(MIN_LEVEL);
                    self.multiplier = MIN_LEVEL.powf(1.0 / self.samples(inputs[DECAY]));
                }
            }
            Stage::Decay => {
                self.level = if self.samples(inputs[DECAY]) <= 0.0 {
                    self.sustain_level
                } else {
                    self.level * self.multiplier
                };
                if self.level <= self.sustain_level + MIN_LEVEL {
                    self.level = self.sustain_level;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Release => {
                self.level *= self.multiplier;
                if self.level <= MIN_LEVEL {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
    }
}

impl SoundUnit for Adsr {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        match self.curve {
            Curve::Linear => self.advance_linear(inputs),
            Curve::Exponential => self.advance_exponential(inputs),
        }
        outputs[0] = self.level;
    }
}

pub fn register(registry: &mut UnitRegistry) {
    for (name, curve) in [("ADSRlin", Curve::Linear), ("ADSRlog", Curve::Exponential)] {
        registry.register(
            ClassDescriptor::new(name)
                .socket(&["gate"])
                .socket(&["trigger", "trig", "retrigger", "retrig"])
                .socket(&["attack", "att", "a", "A"])
                .socket(&["decay", "dec", "d", "D"])
                .socket(&["sustain", "sus", "s", "S"])
                .socket(&["release", "rel", "r", "R"])
                .output(&["output"])
                .positional(&["attack", "decay", "sustain", "release"])
                .group("Envelope"),
            move |ctx: &UnitContext| Box::new(Adsr::new(curve, ctx.sample_rate)),
        );
    }
    registry.register_alias("ADSR", "ADSRlog");
}
