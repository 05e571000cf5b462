//! Towers: the per-key records threaded through the skip list.
//!
//! A tower participates in `level()` levels. At each level it carries a
//! forward link (an arena index, never an owning pointer) and a distance
//! counter: the number of ranks advanced by following that link.
//!
//! ```text
//! Level 2: HEAD -(2)-------------> B -(3)----------------------> NULL
//! Level 1: HEAD -(1)-> A -(1)----> B -(2)-----------> D -(1)---> NULL
//! Level 0: HEAD -(1)-> A -(1)----> B -(1)-> C -(1)--> D -(1)---> NULL
//! ```
//!
//! A link to NULL counts the distance to the virtual end of the list, whose
//! rank is the element count.

use smallvec::SmallVec;

/// Arena index type. u32 saves space vs usize on 64-bit.
pub(crate) type Idx = u32;

/// Null index marker: the end of a level.
pub(crate) const NULL: Idx = Idx::MAX;

/// Inline capacity of the link arrays. With p = 0.5 almost every tower fits.
const INLINE_LEVELS: usize = 4;

/// Non-owning handle to a live tower.
///
/// Handles stay valid until the tower they name is removed. Arena slots are
/// recycled, so a handle kept past a removal may name a different tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TowerId(pub(crate) Idx);

impl TowerId {
    pub(crate) fn idx(self) -> Idx {
        self.0
    }
}

/// Forward links and distance counters, one pair per level.
///
/// Shared by real towers and the head sentinel, which has no key.
#[derive(Clone, Debug, Default)]
pub(crate) struct Links {
    pub(crate) next: SmallVec<[Idx; INLINE_LEVELS]>,
    pub(crate) dist: SmallVec<[usize; INLINE_LEVELS]>,
}

impl Links {
    pub(crate) fn with_level(level: usize) -> Self {
        let mut links = Links::default();
        links.extend_level(level);
        links
    }

    pub(crate) fn level(&self) -> usize {
        self.next.len()
    }

    /// Grow to `new_level`, new slots unlinked with distance 0.
    /// No-op if `new_level <= level()`.
    pub(crate) fn extend_level(&mut self, new_level: usize) {
        if new_level > self.level() {
            self.next.resize(new_level, NULL);
            self.dist.resize(new_level, 0);
        }
    }

    /// Truncate to `new_level`. No-op if `new_level >= level()`.
    pub(crate) fn shrink_level(&mut self, new_level: usize) {
        if new_level < self.level() {
            self.next.truncate(new_level);
            self.dist.truncate(new_level);
        }
    }

    /// Cut every link while keeping the level.
    fn detach(&mut self) {
        for level in 0..self.level() {
            self.next[level] = NULL;
            self.dist[level] = 0;
        }
    }
}

/// One key/value record and its links.
///
/// A tower's level is fixed by the list when the tower is created. Borrowing
/// a live tower mutably only gives access to its value:
///
/// ```compile_fail
/// use indexed_skiplist::SkipList;
///
/// let mut list = SkipList::new();
/// list.set(1, "one");
/// list.get_mut(&1).unwrap().0.shrink_level(0);
/// ```
#[derive(Clone, Debug)]
pub struct Tower<K, V> {
    key: K,
    value: V,
    pub(crate) links: Links,
}

impl<K, V> Tower<K, V> {
    pub(crate) fn new(key: K, value: V, level: usize) -> Self {
        Tower {
            key,
            value,
            links: Links::with_level(level),
        }
    }

    /// The key. Immutable for the tower's lifetime.
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    /// Replace the value, returning the old one.
    pub fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }

    /// Number of levels this tower participates in.
    pub fn level(&self) -> usize {
        self.links.level()
    }

    /// The tower following this one in ascending key order.
    ///
    /// `None` at the end of the list, and always for a removed tower.
    pub fn next(&self) -> Option<TowerId> {
        match self.links.next.first() {
            Some(&idx) if idx != NULL => Some(TowerId(idx)),
            _ => None,
        }
    }

    /// Consume the tower, returning its key and value.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }

    pub(crate) fn detach(&mut self) {
        self.links.detach();
    }
}
