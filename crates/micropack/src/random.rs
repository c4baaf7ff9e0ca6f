//! Deterministic uniform variates for placement and flocculation.
//!
//! [`Ran1`] is the Park-Miller minimal standard generator with a 32-entry
//! Bays-Durham shuffle table. Every stochastic decision in the crate draws from
//! one instance in a fixed order, so a seed fully determines a microstructure.
use rand::RngCore;

use crate::error::{Error, Result};

const IA: i64 = 16_807;
const IM: i64 = 2_147_483_647;
const IQ: i64 = 127_773;
const IR: i64 = 2_836;
const NTAB: usize = 32;
const WARM_UP: usize = 8;
const AM: f64 = 1.0 / IM as f64;
const NDIV: f64 = 1.0 / (1.0 + (IM as f64 - 1.0) / NTAB as f64);
const RNMX: f64 = 1.0 - 1.2e-7;

/// Shuffled minimal standard generator producing values in the open interval (0, 1).
#[derive(Debug, Clone)]
pub struct Ran1 {
    state: i64,
    shuffle: [i64; NTAB],
    last: i64,
}

impl Ran1 {
    /// Seeds the generator. Seeds are conventionally negative; only the magnitude is used.
    pub fn new(seed: i32) -> Result<Self> {
        if seed == 0 {
            return Err(Error::InvalidConfig(
                "random seed must be a non-zero integer".into(),
            ));
        }

        let mut rng = Self {
            state: i64::from(seed).abs(),
            shuffle: [0; NTAB],
            last: 0,
        };
        for j in (0..NTAB + WARM_UP).rev() {
            rng.advance();
            if j < NTAB {
                rng.shuffle[j] = rng.state;
            }
        }
        rng.last = rng.shuffle[0];
        Ok(rng)
    }

    /// Schrage step of `state = IA * state mod IM` without overflow.
    #[inline]
    fn advance(&mut self) {
        let k = self.state / IQ;
        self.state = IA * (self.state - k * IQ) - IR * k;
        if self.state < 0 {
            self.state += IM;
        }
    }

    /// Next uniform deviate in (0, 1).
    pub fn next_uniform(&mut self) -> f64 {
        self.advance();
        let j = ((self.last as f64 * NDIV) as usize).min(NTAB - 1);
        self.last = self.shuffle[j];
        self.shuffle[j] = self.state;
        (AM * self.last as f64).min(RNMX)
    }

    /// Uniform integer in `1..=edge`: `trunc(edge * u) + 1`, multiplied in double precision.
    #[inline]
    pub fn next_coordinate(&mut self, edge: usize) -> i32 {
        ((edge as f64 * self.next_uniform()) as i32 + 1).min(edge as i32)
    }
}

impl RngCore for Ran1 {
    fn next_u32(&mut self) -> u32 {
        (self.next_uniform() * 4_294_967_296.0) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}
