//! Level selection for newly inserted towers.
//!
//! The skip list asks its policy for a level once per insertion. The default
//! [`Geometric`] policy keeps promoting a tower with probability `p`, which
//! gives an expected height of `O(log_{1/p} n)`. Tests swap in a
//! [`Playback`] policy (or any closure) to build exact shapes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chooses the level of a new tower.
pub trait LevelPolicy {
    /// Return a level in `[1, max_level]`.
    fn next_level(&mut self, p: f64, max_level: usize) -> usize;
}

impl<F> LevelPolicy for F
where
    F: FnMut(f64, usize) -> usize,
{
    fn next_level(&mut self, p: f64, max_level: usize) -> usize {
        self(p, max_level)
    }
}

/// Geometric level distribution truncated at `max_level`.
pub struct Geometric {
    rng: StdRng,
}

impl Geometric {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Geometric {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence of levels.
    pub fn seeded(seed: u64) -> Self {
        Geometric {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for Geometric {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelPolicy for Geometric {
    fn next_level(&mut self, p: f64, max_level: usize) -> usize {
        let mut level = 1;
        while level < max_level && self.rng.gen_range(0.0..1.0) < p {
            level += 1;
        }
        level
    }
}

/// Replays a prescribed sequence of levels, one per insertion.
///
/// # Panics
///
/// Panics when asked for more levels than it was given.
#[derive(Clone, Debug)]
pub struct Playback {
    levels: Vec<usize>,
    pos: usize,
}

impl Playback {
    pub fn new(levels: impl Into<Vec<usize>>) -> Self {
        Playback {
            levels: levels.into(),
            pos: 0,
        }
    }
}

impl LevelPolicy for Playback {
    fn next_level(&mut self, _p: f64, _max_level: usize) -> usize {
        assert!(
            self.pos < self.levels.len(),
            "playback exhausted after {} levels",
            self.levels.len()
        );
        let level = self.levels[self.pos];
        self.pos += 1;
        level
    }
}
