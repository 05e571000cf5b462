//! An ordered key/value skip list indexable by key and by position.
//!
//! Every link carries a distance counter, so the list answers "what is the
//! rank of this key" and "which key has rank k" in O(log n) average steps,
//! alongside the usual ordered-map operations.
//!
//! # Quick Start
//!
//! ```
//! use indexed_skiplist::SkipList;
//!
//! let mut list = SkipList::new();
//! list.set(2, "dog");
//! list.set(1, "cat");
//!
//! let (tower, rank) = list.get(&2).unwrap();
//! assert_eq!(tower.value(), &"dog");
//! assert_eq!(rank, 1);
//!
//! // Overriding keeps the rank
//! let (_, rank, inserted) = list.set(1, "worm");
//! assert_eq!((rank, inserted), (0, false));
//!
//! assert_eq!(list.get_by_pos(0).unwrap().value(), &"worm");
//! let removed = list.remove_by_pos(1).unwrap();
//! assert_eq!(removed.key(), &2);
//! assert_eq!(list.len(), 1);
//! ```

pub mod config;
pub mod level;
pub mod skip_list;
pub mod tower;

pub use config::{Config, ConfigError, SkipListBuilder};
pub use level::{Geometric, LevelPolicy, Playback};
pub use skip_list::{Iter, SkipList};
pub use tower::{Tower, TowerId};
