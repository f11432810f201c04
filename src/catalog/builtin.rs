//! Names the compiler treats specially.

/// Source of the global and per-voice note inputs.
pub const USER_INPUT: &str = "UserInput";
/// Sink of the final stereo signal.
pub const USER_STEREO_OUTPUT: &str = "UserStereoOutput";
/// Class whose global constants become user parameters.
pub const KNOB: &str = "Knob";

pub const INVERTER: &str = "Inverter";
pub const ATTENUATOR: &str = "Attenuator";
pub const MAPPING: &str = "Mapping";
pub const BIPOLAR_MAPPING: &str = "BipolarMapping";

/// Global inputs, in object order.
pub const GLOBAL_INPUTS: [&str; 4] = ["trigger", "gate", "pitch", "velocity"];
/// The single global output object.
pub const GLOBAL_OUTPUT: &str = "output";
/// Per-voice inputs, in object order.
pub const VOICE_INPUTS: [&str; 5] = ["trigger", "gate", "pitch", "velocity", "voiceT"];

/// The name that is never bound.
pub const DISCARD: &str = "_";

/// Number of objects seeded into every structure before user objects.
pub const fn builtin_object_count() -> usize {
    GLOBAL_INPUTS.len() + 1 + VOICE_INPUTS.len()
}

/// Index of the global output object in every structure.
pub const OUTPUT_OBJECT: usize = GLOBAL_INPUTS.len();

/// Index of the first per-voice input object.
pub const FIRST_VOICE_INPUT: usize = GLOBAL_INPUTS.len() + 1;
