//! Engine integration tests: compiled patches played through the runtime
//! without any audio device.

use assert_approx_eq::assert_approx_eq;

use wiresynth::config::{CompileOptions, Config, EngineSettings};
use wiresynth::convert::note_to_pitch;
use wiresynth::dsl::Compiler;
use wiresynth::engine::Engine;
use wiresynth::ir::Structure;
use wiresynth::unit::UnitRegistry;

const SAMPLE_RATE: u32 = 44_100;

fn compile_with(src: &str, options: &CompileOptions) -> Structure {
    let registry = UnitRegistry::with_defaults();
    let out = Compiler::compile(src, registry.catalog(), options);
    match out.structure {
        Some(structure) => structure,
        None => panic!("compile failed: {:?}", out.diagnostics().collect::<Vec<_>>()),
    }
}

fn engine(src: &str, voices: usize) -> Engine {
    let structure = compile_with(src, &CompileOptions::default());
    let settings = EngineSettings {
        voices,
        sample_rate: SAMPLE_RATE,
        ..EngineSettings::default()
    };
    Engine::new(&structure, &UnitRegistry::with_defaults(), &settings).unwrap()
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0, |m, s| m.max(s.abs()))
}

const SYNTH: &str = "startvoice\n\
    ADSRlin env(10ms, 10ms, 0.5, 10ms)\n\
    gate => env.gate\n\
    new Sine(pitch) * env => output\n\
    endvoice";

#[test]
fn sine_renders_bounded_stereo() {
    let mut engine = engine("Sine osc(440hz) => output", 1);
    let out = engine.generate(4410);
    assert_eq!(out.len(), 8820);
    assert!(peak(&out) > 0.99 && peak(&out) <= 1.0);
    for frame in out.chunks(2) {
        assert_eq!(frame[0], frame[1]);
    }
}

#[test]
fn note_plays_then_releases() {
    let mut engine = engine(SYNTH, 4);
    assert_eq!(peak(&engine.generate(1000)), 0.0);

    engine.note_on(69, 1.0);
    let held = engine.generate(4410);
    assert!(peak(&held) > 0.4, "peak {}", peak(&held));

    engine.note_off(69, 0.0);
    let tail = engine.generate(4410);
    assert_eq!(peak(&tail[tail.len() - 200..]), 0.0);
}

#[test]
fn each_note_gets_its_own_voice() {
    let mut engine = engine(SYNTH, 2);
    engine.note_on(60, 1.0);
    engine.note_on(64, 1.0);
    let notes: Vec<Option<u8>> = engine.voices().iter().map(|v| v.note).collect();
    assert_eq!(notes, vec![Some(60), Some(64)]);
    assert!(engine.voices().iter().all(|v| v.is_active()));
}

#[test]
fn third_note_steals_oldest_voice() {
    let mut engine = engine(SYNTH, 2);
    engine.note_on(60, 1.0);
    engine.generate(10);
    engine.note_on(64, 1.0);
    engine.generate(10);
    engine.note_on(67, 1.0);
    let notes: Vec<Option<u8>> = engine.voices().iter().map(|v| v.note).collect();
    assert_eq!(notes, vec![Some(67), Some(64)]);
}

#[test]
fn voice_pitch_follows_note() {
    let mut engine = engine("startvoice\npitch => output\nendvoice", 1);
    engine.note_on(69, 1.0);
    let out = engine.generate(1);
    assert_approx_eq!(f64::from(out[0]), note_to_pitch(69), 1e-6);
    assert_approx_eq!(note_to_pitch(69), (440.0f64 / 261.625_565_300_598_6).log2(), 1e-9);
}

#[test]
fn velocity_reaches_global_and_voice_inputs() {
    let mut engine = engine("velocity => output\nstartvoice\nvelocity => output\nendvoice", 1);
    engine.note_on(60, 0.25);
    assert_eq!(engine.generate(1), vec![0.5, 0.5]);
}

#[test]
fn knob_scales_signal() {
    let mut engine = engine("Knob volume()\nSine osc(440hz)\nosc * volume => output", 1);
    engine.set_parameter("volume", 0.0);
    assert_eq!(peak(&engine.generate(2000)), 0.0);
    engine.set_parameter("volume", 1.0);
    assert!(peak(&engine.generate(2000)) > 0.99);
}

#[test]
fn identical_engines_render_identically() {
    let src = "Noise n()\nLowPass24db f(2000hz, 0.7)\nn => f => new PingPongDelay(20ms, 0.5) => output";
    let mut a = engine(src, 2);
    let mut b = engine(src, 2);
    let first = a.generate(2048);
    assert!(peak(&first) > 0.0);
    assert_eq!(first, b.generate(2048));
    assert_eq!(a.generate(512), b.generate(512));
}

#[test]
fn aliases_in_structure_do_not_change_sound() {
    let src = "Sine lfo(3hz)\nLP f(.freq = 800hz, .res = 0.2)\nlfo [200hz, 800hz] => f.cutoff\nnew Saw(110hz) => f => output";
    let canonical = compile_with(src, &CompileOptions::default());
    let aliased = compile_with(
        src,
        &CompileOptions {
            remove_aliases: false,
            ..CompileOptions::default()
        },
    );
    let registry = UnitRegistry::with_defaults();
    let settings = EngineSettings::default();
    let mut a = Engine::new(&canonical, &registry, &settings).unwrap();
    let mut b = Engine::new(&aliased, &registry, &settings).unwrap();
    assert_eq!(a.generate(1024), b.generate(1024));
}

#[test]
fn generate_into_fills_caller_buffer() {
    let mut engine = engine("0.5 => output", 1);
    let mut buffer = [9.0f32; 7];
    engine.generate_into(&mut buffer);
    assert_eq!(&buffer[..6], &[0.5; 6]);
    assert_eq!(buffer[6], 9.0);
}

#[test]
fn engine_settings_from_config_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "engine:\n  voices: 3\n  sample_rate: 48000").unwrap();
    let config = Config::load_from(file.path()).unwrap();

    let structure = compile_with(SYNTH, &config.compile);
    let engine = Engine::new(&structure, &UnitRegistry::with_defaults(), &config.engine).unwrap();
    assert_eq!(engine.voices().len(), 3);
}
