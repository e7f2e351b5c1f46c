//! The "people watching" counter.
//!
//! It is a presentation illusion and not derived from any real audience: the number starts low and
//! drifts randomly inside a fixed band every few seconds.

use std::ops::RangeInclusive;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MIN_VIEWERS: u32 = 208;
pub const MAX_VIEWERS: u32 = 698;

const STEP: RangeInclusive<i64> = -10..=10;

/// `clamp(previous + uniform(-10, 10), 208, 698)`.
pub fn next_viewer_count<R: Rng + ?Sized>(previous: u32, rng: &mut R) -> u32 {
    let next = i64::from(previous) + rng.gen_range(STEP);
    let next = next.clamp(i64::from(MIN_VIEWERS), i64::from(MAX_VIEWERS));
    u32::try_from(next).unwrap_or(MIN_VIEWERS)
}

/// A restartable generator owning its running count and its randomness.
#[derive(Debug, Clone)]
pub struct ViewerCounter {
    current: u32,
    rng: StdRng,
}

impl ViewerCounter {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A counter that produces the same sequence every time, for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            current: MIN_VIEWERS,
            rng,
        }
    }

    /// Starts from `count` instead of the lower bound, pulled into the band if needed.
    pub fn starting_at(mut self, count: u32) -> Self {
        self.current = count.clamp(MIN_VIEWERS, MAX_VIEWERS);
        self
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn roll(&mut self) -> u32 {
        self.current = next_viewer_count(self.current, &mut self.rng);
        self.current
    }
}

impl Default for ViewerCounter {
    fn default() -> Self {
        Self::new()
    }
}
