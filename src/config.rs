//! Construction-time parameters.
//!
//! Parameters are checked once, when the list is built. Out-of-range values
//! are programmer errors: [`SkipListBuilder::build`] panics on them and
//! [`SkipListBuilder::try_build`] reports them as a [`ConfigError`]. Nothing is
//! ever clamped.

use std::marker::PhantomData;

use thiserror::Error;

use crate::level::{Geometric, LevelPolicy};
use crate::skip_list::SkipList;

/// Largest `max_level` a list may be configured with.
pub const HARD_MAX_LEVEL: usize = 512;

pub const DEFAULT_MAX_LEVEL: usize = 64;

pub const DEFAULT_PROBABILITY: f64 = 0.5;

pub const MIN_PROBABILITY: f64 = 0.01;

pub const MAX_PROBABILITY: f64 = 0.99;

/// Rejected construction parameter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(
        "probability {value} out of range (must be >= {} and <= {})",
        MIN_PROBABILITY,
        MAX_PROBABILITY
    )]
    ProbabilityOutOfRange { value: f64 },
    #[error("max level {value} out of range (must be >= 1 and <= {})", HARD_MAX_LEVEL)]
    MaxLevelOutOfRange { value: usize },
}

/// Tunable parameters of a skip list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// Probability of promoting a tower one more level.
    pub probability: f64,
    /// Upper bound on any tower's level.
    pub max_level: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            probability: DEFAULT_PROBABILITY,
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Written so that NaN fails too
        if !(self.probability >= MIN_PROBABILITY && self.probability <= MAX_PROBABILITY) {
            return Err(ConfigError::ProbabilityOutOfRange {
                value: self.probability,
            });
        }
        if self.max_level < 1 || self.max_level > HARD_MAX_LEVEL {
            return Err(ConfigError::MaxLevelOutOfRange {
                value: self.max_level,
            });
        }
        Ok(())
    }
}

/// Builds a [`SkipList`] from a [`Config`] and an optional level policy.
///
/// ```
/// use indexed_skiplist::SkipList;
///
/// let list: SkipList<u32, &str> = SkipList::builder()
///     .probability(0.25)
///     .max_level(32)
///     .build();
/// assert_eq!(list.max_level(), 32);
/// ```
pub struct SkipListBuilder<K, V> {
    config: Config,
    policy: Option<Box<dyn LevelPolicy>>,
    _list: PhantomData<fn() -> SkipList<K, V>>,
}

impl<K: Ord, V> SkipListBuilder<K, V> {
    pub fn new() -> Self {
        SkipListBuilder {
            config: Config::default(),
            policy: None,
            _list: PhantomData,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn probability(mut self, probability: f64) -> Self {
        self.config.probability = probability;
        self
    }

    pub fn max_level(mut self, max_level: usize) -> Self {
        self.config.max_level = max_level;
        self
    }

    /// Replace the default [`Geometric`] policy.
    pub fn level_policy(mut self, policy: impl LevelPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn try_build(self) -> Result<SkipList<K, V>, ConfigError> {
        self.config.validate()?;
        let policy: Box<dyn LevelPolicy> = match self.policy {
            Some(policy) => policy,
            None => Box::new(Geometric::new()),
        };
        Ok(SkipList::from_parts(self.config, policy))
    }

    /// # Panics
    ///
    /// Panics if the configuration is out of range.
    pub fn build(self) -> SkipList<K, V> {
        match self.try_build() {
            Ok(list) => list,
            Err(err) => panic!("invalid skip list configuration: {err}"),
        }
    }
}

impl<K: Ord, V> Default for SkipListBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
