//! Oscillator primitives: phase-accumulating waveform generators.

use std::f64::consts::PI;

use super::{SoundUnit, UnitContext, UnitRegistry};
use crate::catalog::ClassDescriptor;
use crate::convert::to_hertz;

/// Available waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::Triangle,
    ];

    /// Catalog class name and its short alias.
    pub fn class_names(self) -> (&'static str, &'static str) {
        match self {
            Waveform::Sine => ("Sine", "Sin"),
            Waveform::Saw => ("Saw", "Saw"),
            Waveform::Square => ("Square", "Sqr"),
            Waveform::Triangle => ("Triangle", "Tri"),
        }
    }
}

/// Generate a single sample for the given waveform at the specified phase.
///
/// `phase` is in the range [0.0, 1.0), representing one full cycle.
/// Returns a value in [-1.0, 1.0].
pub fn oscillator(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine => (phase * 2.0 * PI).sin(),
        Waveform::Saw => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => {
            if phase < 0.25 {
                4.0 * phase
            } else if phase < 0.75 {
                2.0 - 4.0 * phase
            } else {
                4.0 * phase - 4.0
            }
        }
    }
}

/// Free-running oscillator. Its only socket is the normalized frequency.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    sample_period: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: f64) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_period: 1.0 / sample_rate,
        }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl SoundUnit for Oscillator {
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = oscillator(self.waveform, self.phase);
        let step = to_hertz(inputs[0]) * self.sample_period;
        self.phase = (self.phase + step).rem_euclid(1.0);
    }
}

pub fn register(registry: &mut UnitRegistry) {
    for waveform in Waveform::ALL {
        let (name, alias) = waveform.class_names();
        registry.register(
            ClassDescriptor::new(name)
                .socket(&["frequency", "freq", "f", "pitch"])
                .output(&["output"])
                .positional(&["frequency"])
                .group("Oscillator"),
            move |ctx: &UnitContext| Box::new(Oscillator::new(waveform, ctx.sample_rate)),
        );
        if alias != name {
            registry.register_alias(alias, name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::from_hertz;

    #[test]
    fn sine_at_zero() {
        let v = oscillator(Waveform::Sine, 0.0);
        assert!(v.abs() < 1e-10);
    }

    #[test]
    fn sine_at_quarter() {
        let v = oscillator(Waveform::Sine, 0.25);
        assert!((v - 1.0).abs() < 1e-10);
    }

    #[test]
    fn saw_endpoints() {
        assert!((oscillator(Waveform::Saw, 0.0) + 1.0).abs() < 1e-10);
        assert!(oscillator(Waveform::Saw, 0.5).abs() < 1e-10);
    }

    #[test]
    fn square_halves() {
        assert_eq!(oscillator(Waveform::Square, 0.25), 1.0);
        assert_eq!(oscillator(Waveform::Square, 0.75), -1.0);
    }

    #[test]
    fn triangle_peaks() {
        assert!((oscillator(Waveform::Triangle, 0.25) - 1.0).abs() < 1e-10);
        assert!(oscillator(Waveform::Triangle, 0.5).abs() < 1e-10);
        assert!((oscillator(Waveform::Triangle, 0.75) + 1.0).abs() < 1e-10);
    }

    #[test]
    fn all_waveforms_bounded() {
        for wf in Waveform::ALL {
            for i in 0..1000 {
                let phase = i as f64 / 1000.0;
                let v = oscillator(wf, phase);
                assert!(
                    (-1.0..=1.0).contains(&v),
                    "{wf:?} at phase {phase}: {v} out of bounds"
                );
            }
        }
    }

    #[test]
    fn phase_advances_by_frequency() {
        // 441 Hz at 44.1 kHz is one cycle every 100 samples.
        let mut osc = Oscillator::new(Waveform::Saw, 44_100.0);
        let freq = from_hertz(441.0);
        let mut out = [0.0];
        for _ in 0..25 {
            osc.process(&[freq], &mut out);
        }
        assert!((osc.phase() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn first_sample_starts_at_phase_zero() {
        let mut osc = Oscillator::new(Waveform::Sine, 44_100.0);
        let mut out = [1.0];
        osc.process(&[from_hertz(440.0)], &mut out);
        assert!(out[0].abs() < 1e-10);
    }

    #[test]
    fn sine_crosses_zero_at_expected_rate() {
        let sample_rate = 48_000.0;
        let mut osc = Oscillator::new(Waveform::Sine, sample_rate);
        let freq = from_hertz(1000.0);
        let mut out = [0.0];
        let mut previous = 0.0;
        let mut rising = 0;
        for _ in 0..sample_rate as usize {
            osc.process(&[freq], &mut out);
            if previous < 0.0 && out[0] >= 0.0 {
                rising += 1;
            }
            previous = out[0];
        }
        assert!((999..=1000).contains(&rising), "{rising} cycles");
    }
}
