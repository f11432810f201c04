//! Unit conversion between physical quantities and the normalized control
//! scale used on every socket.
//!
//! Pitch-like and rate-like values are stored as octaves relative to
//! [`REFERENCE_HZ`]: `0.0` is middle C, `1.0` an octave above. Levels stay
//! linear. Literal constants are converted once at compile time; units
//! convert back inside their transfer functions.

/// Frequency that normalizes to `0.0` (middle C).
pub const REFERENCE_HZ: f64 = 261.625_565_300_598_6;

pub fn from_hertz(hz: f64) -> f64 {
    (hz / REFERENCE_HZ).log2()
}

pub fn to_hertz(value: f64) -> f64 {
    REFERENCE_HZ * value.exp2()
}

/// Decibels to linear gain.
pub fn from_decibels(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Linear gain to decibels.
pub fn to_decibels(gain: f64) -> f64 {
    20.0 * gain.log10()
}

pub fn from_semitones(semitones: f64) -> f64 {
    semitones / 12.0
}

pub fn to_semitones(value: f64) -> f64 {
    value * 12.0
}

pub fn from_cents(cents: f64) -> f64 {
    cents / 1200.0
}

pub fn to_cents(value: f64) -> f64 {
    value * 1200.0
}

/// A duration, stored as the rate of one cycle per `seconds`.
pub fn from_seconds(seconds: f64) -> f64 {
    from_hertz(1.0 / seconds)
}

pub fn to_seconds(value: f64) -> f64 {
    1.0 / to_hertz(value)
}

pub fn from_milliseconds(ms: f64) -> f64 {
    from_seconds(ms / 1000.0)
}

pub fn to_milliseconds(value: f64) -> f64 {
    to_seconds(value) * 1000.0
}

pub fn from_minutes(minutes: f64) -> f64 {
    from_seconds(minutes * 60.0)
}

pub fn from_hours(hours: f64) -> f64 {
    from_seconds(hours * 3600.0)
}

/// A rate multiplier (`2x` is one octave up).
pub fn from_rate(ratio: f64) -> f64 {
    ratio.log2()
}

pub fn to_rate(value: f64) -> f64 {
    value.exp2()
}

/// Convert a literal with a unit suffix to the normalized scale. Suffixes
/// are case-insensitive. Returns `None` for an unknown suffix.
pub fn convert_constant(value: f64, unit: &str) -> Option<f64> {
    let converted = match unit.to_ascii_lowercase().as_str() {
        "" => value,
        "db" => from_decibels(value),
        "hz" => from_hertz(value),
        "ms" => from_milliseconds(value),
        "s" => from_seconds(value),
        "m" => from_minutes(value),
        "h" => from_hours(value),
        "semi" => from_semitones(value),
        "cent" => from_cents(value),
        "x" => from_rate(value),
        _ => return None,
    };
    Some(converted)
}

/// Frequency in hertz of a MIDI note number.
pub fn midi_to_hertz(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Normalized pitch of a MIDI note number.
pub fn note_to_pitch(note: u8) -> f64 {
    from_hertz(midi_to_hertz(note))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn hertz_roundtrip() {
        for hz in [20.0, 55.0, 261.6, 440.0, 1000.0, 8000.0, 20000.0] {
            assert_approx_eq!(to_hertz(from_hertz(hz)), hz, hz * 1e-12);
        }
    }

    #[test]
    fn reference_is_zero() {
        assert_approx_eq!(from_hertz(REFERENCE_HZ), 0.0, 1e-12);
        assert_approx_eq!(from_hertz(2.0 * REFERENCE_HZ), 1.0, 1e-12);
    }

    #[test]
    fn middle_c_note_is_zero_pitch() {
        assert_approx_eq!(note_to_pitch(60), 0.0, 1e-9);
        assert_approx_eq!(note_to_pitch(72), 1.0, 1e-9);
        assert_approx_eq!(midi_to_hertz(69), 440.0, 1e-9);
    }

    #[test]
    fn decibels() {
        assert_approx_eq!(from_decibels(0.0), 1.0, 1e-12);
        assert_approx_eq!(from_decibels(-20.0), 0.1, 1e-12);
        assert_approx_eq!(to_decibels(from_decibels(-6.0)), -6.0, 1e-9);
    }

    #[test]
    fn semitones_and_cents_are_octaves() {
        assert_approx_eq!(from_semitones(12.0), 1.0, 1e-12);
        assert_approx_eq!(from_cents(1200.0), 1.0, 1e-12);
        assert_approx_eq!(to_cents(from_semitones(1.0)), 100.0, 1e-9);
    }

    #[test]
    fn durations_are_rates() {
        assert_approx_eq!(to_seconds(from_seconds(0.25)), 0.25, 1e-12);
        assert_approx_eq!(to_milliseconds(from_milliseconds(400.0)), 400.0, 1e-9);
        assert_approx_eq!(from_minutes(1.0), from_seconds(60.0), 1e-12);
        assert_approx_eq!(from_hours(1.0), from_minutes(60.0), 1e-12);
    }

    #[test]
    fn convert_constant_units() {
        assert_eq!(convert_constant(0.4, ""), Some(0.4));
        assert_approx_eq!(convert_constant(2.0, "x").unwrap_or_default(), 1.0, 1e-12);
        assert_approx_eq!(
            convert_constant(440.0, "HZ").unwrap_or_default(),
            from_hertz(440.0),
            1e-12
        );
        assert_approx_eq!(
            convert_constant(1000.0, "ms").unwrap_or_default(),
            from_seconds(1.0),
            1e-12
        );
        assert_eq!(convert_constant(3.0, "furlong"), None);
    }
}
