//! Random source for jitter and shuffling.
//!
//! Every pipeline function takes `&mut R where R: Rng + ?Sized`, so callers
//! choose the generator. Production runs draw a fresh `StdRng` from the thread
//! RNG; reproducible runs use [`DeterministicRng`] seeded from the configured
//! seed mixed with the job id.

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, RngCore, SeedableRng};

/// Boxed random source handed through one pipeline run.
pub type RunRng = Box<dyn RngCore + Send>;

/// `SplitMix64` generator. Small, `Send`, and stable across platforms.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }
}

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// Random source for one run: seeded when `seed` is configured, entropy otherwise.
pub fn run_rng(seed: Option<u64>, job_id: &str) -> RunRng {
    match seed {
        Some(seed) => Box::new(DeterministicRng::new(mix_seed(seed, job_id))),
        None => Box::new(StdRng::from_rng(&mut rand::rng())),
    }
}

pub fn mix_seed(base_seed: u64, job_id: &str) -> u64 {
    (base_seed ^ fnv1a64(job_id.as_bytes())).rotate_left(17)
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xCBF2_9CE4_8422_2325_u64;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
    hash
}

/// Uniform sample in `[min, max)`.
pub fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    rng.random::<f64>() * (max - min) + min
}

pub fn shuffled<R: Rng + ?Sized>(values: &[&'static str], rng: &mut R) -> Vec<&'static str> {
    let mut items = values.to_vec();
    items.shuffle(rng);
    items
}

/// Uniform pick from a non-empty registry list.
pub fn pick<R: Rng + ?Sized>(values: &[&'static str], rng: &mut R) -> &'static str {
    values.choose(rng).copied().unwrap_or_default()
}
