//! Noise generator: white noise from a seeded RNG.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::{SoundUnit, UnitContext, UnitRegistry};
use crate::catalog::ClassDescriptor;

/// Uniform white noise in [-1, 1). Two instances with the same seed emit
/// the same sequence.
pub struct WhiteNoise {
    rng: ChaCha8Rng,
}

impl WhiteNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl SoundUnit for WhiteNoise {
    fn process(&mut self, _inputs: &[f64], outputs: &mut [f64]) {
        outputs[0] = self.rng.gen_range(-1.0..1.0);
    }
}

pub fn register(registry: &mut UnitRegistry) {
    registry.register(
        ClassDescriptor::new("WhiteNoise")
            .output(&["output"])
            .group("Noise"),
        |ctx: &UnitContext| Box::new(WhiteNoise::new(ctx.seed)),
    );
    registry.register_alias("Noise", "WhiteNoise");
}
