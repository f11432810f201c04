//! Compiler integration tests: source text → diagnostics → structure.

use std::collections::HashMap;

use wiresynth::catalog::builtin::{builtin_object_count, OUTPUT_OBJECT};
use wiresynth::config::CompileOptions;
use wiresynth::dsl::{CompileOutput, Compiler, DiagnosticKind};
use wiresynth::ir::{MixValue, Structure};
use wiresynth::unit::UnitRegistry;

fn compile(src: &str) -> CompileOutput {
    let registry = UnitRegistry::with_defaults();
    Compiler::compile(src, registry.catalog(), &CompileOptions::default())
}

fn structure(src: &str) -> Structure {
    let out = compile(src);
    match out.structure {
        Some(structure) => structure,
        None => panic!("compile failed: {:?}", out.diagnostics().collect::<Vec<_>>()),
    }
}

fn sources(mix: &[MixValue]) -> Vec<usize> {
    mix.iter()
        .filter_map(|v| match v {
            MixValue::Output { object, .. } => Some(*object),
            MixValue::Constant { .. } => None,
        })
        .collect()
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let s = structure("Sine a(1hz)\nSine b(2hz)\nSine c(3hz)\na + b * c => output");
    let first = builtin_object_count();
    let (a, b, c) = (first, first + 1, first + 2);

    let attenuator = s
        .objects
        .iter()
        .position(|o| o.class_name == "Attenuator")
        .expect("attenuator");
    let left = &s.objects[OUTPUT_OBJECT].socket_mixes["left"];
    assert_eq!(sources(left), vec![a, attenuator]);
    assert_eq!(sources(&s.objects[attenuator].socket_mixes["input"]), vec![b]);
    assert_eq!(sources(&s.objects[attenuator].socket_mixes["amount"]), vec![c]);
}

#[test]
fn reverse_chain_matches_forward_chain() {
    let forward = structure("Sine osc(440hz)\nosc => output");
    let reverse = structure("Sine osc(440hz)\noutput <= osc");
    assert_eq!(forward, reverse);
}

#[test]
fn recalculation_order_respects_dependencies() {
    let s = structure(
        "Knob cutoff()\n\
         Sine lfo(2hz)\n\
         LowPass24db f(lfo [200hz, 2000hz], 0.3)\n\
         startvoice\n\
         ADSRlog env(5ms, 100ms, 0.6, 200ms)\n\
         gate => env.gate\n\
         new Saw(pitch) * env => f\n\
         endvoice\n\
         f * cutoff => new Delay(300ms, 0.4) => output",
    );

    let position: HashMap<usize, usize> = s
        .recalculation_order
        .iter()
        .enumerate()
        .map(|(i, &object)| (object, i))
        .collect();
    for &object in &s.recalculation_order {
        for dependency in s.objects[object].dependencies() {
            assert!(
                position[&dependency] < position[&object],
                "object {dependency} must run before {object}"
            );
        }
    }
    assert_eq!(s.recalculation_order.last(), Some(&OUTPUT_OBJECT));
    assert_eq!(s.parameters.len(), 1);
    assert_eq!(s.parameters[0].name, "cutoff");
}

#[test]
fn cycle_produces_no_structure() {
    let out = compile("Mix a()\nMix b()\na => b\nb => a\na => output");
    assert!(out.syntax_errors.is_empty());
    assert!(out.semantic_errors.is_empty());
    assert!(out.structure.is_none());
    assert_eq!(out.interpretation_errors[0].message, "Cyclic dependency detected");
}

#[test]
fn diagnostics_render_with_line_and_column() {
    let src = "Sine osc(440hz)\nosc => nowhere";
    let out = compile(src);
    assert_eq!(out.semantic_errors.len(), 1);
    let rendered = out.semantic_errors[0].render(src);
    assert!(rendered.contains("line 2, col 8"), "{rendered}");
    assert!(rendered.ends_with("Undefined identifier: nowhere"));
}

#[test]
fn unterminated_construction_reports_end_of_input() {
    let src = "Sine osc(";
    let out = compile(src);
    assert_eq!(out.syntax_errors[0].kind, DiagnosticKind::Syntax);
    assert!(out.syntax_errors[0]
        .render(src)
        .contains("at end of input"));
}

#[test]
fn warnings_keep_the_structure() {
    let out = compile("Sine osc(440qq) => output\nSaw spare(1hz)");
    assert!(!out.has_errors());
    let messages: Vec<&str> = out
        .interpretation_warnings
        .iter()
        .map(|d| d.message.as_str())
        .collect();
    assert!(messages.contains(&"Unknown unit 'qq', value used unconverted"));
    assert!(messages.contains(&"Unconnected object will not be processed"));
    assert!(out.structure.is_some());
}

#[test]
fn class_aliases_compile_to_canonical_names() {
    let s = structure("Sin a(440hz)\nLP f(1000hz)\na => f => output");
    let classes: Vec<&str> = s.objects[builtin_object_count()..]
        .iter()
        .map(|o| o.class_name.as_str())
        .collect();
    assert_eq!(classes, vec!["Sine", "LowPass12db"]);
}

#[test]
fn structure_survives_json() {
    let s = structure("Knob volume()\nSine osc(440hz)\nosc * volume => output");
    let json = s.to_json().unwrap();
    assert!(!json.contains("span"));
    assert_eq!(Structure::from_json(&json).unwrap(), s);
}
