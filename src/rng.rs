//! Small deterministic random source, one per render lane.
//!
//! PCG-XSH-RR with 64 bits of state and a per-stream increment. The state is
//! plain old data so a whole array of generators can be uploaded next to the
//! BVH, and every sampling routine takes it by `&mut` instead of reaching for a
//! thread local.

use bytemuck::{Pod, Zeroable};
use rand::{RngCore, SeedableRng};

const MULTIPLIER: u64 = 6364136223846793005;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    /// Generator for `stream` under the global `seed`. Distinct streams give
    /// independent sequences, so `(seed, lane index)` is enough to decorrelate lanes.
    #[inline(always)]
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (stream << 1) | 1,
        };
        rng.step();
        rng.state = rng.state.wrapping_add(seed);
        rng.step();
        rng
    }

    #[inline(always)]
    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(self.inc);
    }
}

impl RngCore for Pcg32 {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for Pcg32 {
    type Seed = [u8; 16];

    fn from_seed(seed: Self::Seed) -> Self {
        let (state, stream) = seed.split_at(8);
        let mut state_bytes = [0u8; 8];
        let mut stream_bytes = [0u8; 8];
        state_bytes.copy_from_slice(state);
        stream_bytes.copy_from_slice(stream);
        Self::new(
            u64::from_le_bytes(state_bytes),
            u64::from_le_bytes(stream_bytes),
        )
    }
}
