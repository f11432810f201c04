//! DSP unit library: the stateful per-sample building blocks a patch is
//! made of, and the registry that maps class names to them.
//!
//! Every unit is a [`SoundUnit`]: once per sample the engine hands it one
//! summed value per socket (in the class's socket order) and a slice with
//! one slot per output. Socket values arrive on the normalized scale of
//! [`crate::convert`]; units convert back to physical quantities as needed.

pub mod effect;
pub mod envelope;
pub mod filter;
pub mod io;
pub mod noise;
pub mod oscillator;
pub mod utility;

use std::collections::HashMap;

use crate::catalog::{ClassCatalog, ClassDescriptor};

/// A stateful one-sample transfer function.
///
/// Implementations must not allocate in `process`.
pub trait SoundUnit: Send {
    /// Compute one sample. `inputs` has one value per socket, `outputs` one
    /// slot per output, both in descriptor order.
    fn process(&mut self, inputs: &[f64], outputs: &mut [f64]);

    /// Set an externally driven value (note inputs and knobs). Ignored by
    /// units that have none.
    fn set_value(&mut self, _value: f64) {}
}

/// What a unit learns about its environment when it is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitContext {
    pub sample_rate: f64,
    /// Per-instance seed for units with random state.
    pub seed: u64,
}

impl Default for UnitContext {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            seed: 0,
        }
    }
}

pub type UnitFactory = Box<dyn Fn(&UnitContext) -> Box<dyn SoundUnit> + Send + Sync>;

/// Class descriptors plus the factory that instantiates each class.
pub struct UnitRegistry {
    catalog: ClassCatalog,
    factories: HashMap<String, UnitFactory>,
}

impl UnitRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            catalog: ClassCatalog::new(),
            factories: HashMap::new(),
        }
    }

    /// A registry with every built-in unit class.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        io::register(&mut registry);
        utility::register(&mut registry);
        oscillator::register(&mut registry);
        noise::register(&mut registry);
        filter::register(&mut registry);
        envelope::register(&mut registry);
        effect::register(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, descriptor: ClassDescriptor, factory: F)
    where
        F: Fn(&UnitContext) -> Box<dyn SoundUnit> + Send + Sync + 'static,
    {
        self.factories
            .insert(descriptor.name.clone(), Box::new(factory));
        self.catalog.register(descriptor);
    }

    pub fn register_alias(&mut self, alias: &str, class_name: &str) {
        self.catalog.register_alias(alias, class_name);
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// Instantiate `class_name` (canonical name or alias).
    pub fn create(&self, class_name: &str, ctx: &UnitContext) -> Option<Box<dyn SoundUnit>> {
        let class = self.catalog.resolve(class_name)?;
        self.factories.get(&class.name).map(|factory| factory(ctx))
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_builtin_classes() {
        let registry = UnitRegistry::with_defaults();
        let ctx = UnitContext::default();
        for class in [
            "UserInput",
            "UserStereoOutput",
            "Knob",
            "Inverter",
            "Attenuator",
            "Mapping",
            "BipolarMapping",
            "Mix",
            "StereoMix",
            "Sine",
            "Saw",
            "Square",
            "Triangle",
            "WhiteNoise",
            "LowPass12db",
            "LowPass24db",
            "ADSRlin",
            "ADSRlog",
            "Delay",
            "PingPongDelay",
            "Drive",
        ] {
            assert!(registry.create(class, &ctx).is_some(), "missing {class}");
        }
    }

    #[test]
    fn aliases_create_units() {
        let registry = UnitRegistry::with_defaults();
        let ctx = UnitContext::default();
        for alias in ["Sin", "Sqr", "Tri", "ADSR", "Noise", "LP"] {
            assert!(registry.create(alias, &ctx).is_some(), "missing {alias}");
        }
        assert_eq!(
            registry.catalog().resolve("ADSR").map(|d| d.name.as_str()),
            Some("ADSRlog")
        );
    }

    #[test]
    fn unknown_class_is_none() {
        let registry = UnitRegistry::with_defaults();
        assert!(registry.create("Theremin", &UnitContext::default()).is_none());
    }

    #[test]
    fn every_class_has_a_group() {
        let registry = UnitRegistry::with_defaults();
        assert!(registry.catalog().iter().all(|c| c.group.is_some()));
        assert!(registry.catalog().groups().contains_key("Oscillator"));
    }

    #[test]
    fn custom_registration() {
        struct Constant;
        impl SoundUnit for Constant {
            fn process(&mut self, _inputs: &[f64], outputs: &mut [f64]) {
                outputs[0] = 1.0;
            }
        }

        let mut registry = UnitRegistry::new();
        registry.register(
            ClassDescriptor::new("One").output(&["output"]),
            |_| Box::new(Constant),
        );
        let mut unit = registry.create("One", &UnitContext::default()).unwrap();
        let mut out = [0.0];
        unit.process(&[], &mut out);
        assert_eq!(out[0], 1.0);
    }
}
