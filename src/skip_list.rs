//! Indexable Skip List
//!
//! An ordered key/value skip list that answers both "where is this key" and
//! "which key is k-th" in O(log n) average steps.
//!
//! # Distance Semantics
//!
//! Every link carries a distance counter alongside it:
//!
//! - `links.dist[level]` = rank of `links.next[level]` minus rank of this tower
//! - A NULL link measures the distance to the virtual end, whose rank is `len()`
//! - The head sentinel has rank -1
//!
//! Summing the counters of the links followed during a descent yields the
//! exact rank of the tower reached, so neither lookup direction ever counts
//! items one by one.
//!
//! # Operations
//!
//! - `set(key, value)`: O(log n) - insert or override, returns the rank
//! - `get(key)`: O(log n) - tower and rank for a key
//! - `get_by_pos(k)`: O(log n) - tower at rank k
//! - `remove(key)` / `remove_by_pos(k)`: O(log n) - unlink and return the tower
//! - `len()` / `height()`: O(1)
//!
//! # Structure
//!
//! Towers live in an arena and link to each other by index. Removed slots go
//! on a free list and are reused by later insertions.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::config::{Config, SkipListBuilder};
use crate::level::LevelPolicy;
use crate::tower::{Idx, Links, NULL, Tower, TowerId};

/// Cursor marker for the head sentinel. Never stored in a link.
const HEAD: Idx = Idx::MAX - 1;

/// Inline capacity of a search path. Covers lists of a few billion towers at p = 0.5.
const PATH_INLINE: usize = 32;

/// Predecessors recorded during a descent, one per level.
///
/// `pos` counts ranks walked from the head, so the head is 0 and the tower of
/// rank r sits at r + 1. This keeps the arithmetic unsigned.
struct Path {
    update: SmallVec<[Idx; PATH_INLINE]>,
    pos: SmallVec<[usize; PATH_INLINE]>,
}

impl Path {
    fn new(height: usize) -> Self {
        Path {
            update: SmallVec::from_elem(HEAD, height),
            pos: SmallVec::from_elem(0, height),
        }
    }
}

/// An ordered map with O(log n) access by key and by rank.
pub struct SkipList<K, V> {
    /// Arena of towers. `None` marks a slot on the free list.
    towers: Vec<Option<Tower<K, V>>>,
    /// Free list for reusing removed tower slots.
    free_list: Vec<Idx>,
    /// Links of the head sentinel. Its level is the list height.
    head: Links,
    /// Number of towers (not counting head).
    len: usize,
    probability: f64,
    max_level: usize,
    policy: Box<dyn LevelPolicy>,
}

impl<K: Ord, V> SkipList<K, V> {
    /// Empty list with the default configuration and geometric levels.
    pub fn new() -> Self {
        SkipListBuilder::new().build()
    }

    /// Start configuring a list: probability, max level, level policy.
    pub fn builder() -> SkipListBuilder<K, V> {
        SkipListBuilder::new()
    }

    /// # Panics
    ///
    /// Panics if `config` is out of range.
    pub fn with_config(config: Config) -> Self {
        SkipListBuilder::new().config(config).build()
    }

    /// Caller has validated `config`.
    pub(crate) fn from_parts(config: Config, policy: Box<dyn LevelPolicy>) -> Self {
        debug!(
            probability = config.probability,
            max_level = config.max_level,
            "building skip list"
        );
        SkipList {
            towers: Vec::new(),
            free_list: Vec::new(),
            head: Links::default(),
            len: 0,
            probability: config.probability,
            max_level: config.max_level,
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current number of levels, 0 when empty.
    pub fn height(&self) -> usize {
        self.head.level()
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn max_level(&self) -> usize {
        self.max_level
    }

    // --- Arena access helpers ---

    fn tower_at(&self, idx: Idx) -> &Tower<K, V> {
        match &self.towers[idx as usize] {
            Some(tower) => tower,
            None => unreachable!("link to free slot {}", idx),
        }
    }

    fn tower_at_mut(&mut self, idx: Idx) -> &mut Tower<K, V> {
        match &mut self.towers[idx as usize] {
            Some(tower) => tower,
            None => unreachable!("link to free slot {}", idx),
        }
    }

    fn links(&self, idx: Idx) -> &Links {
        if idx == HEAD {
            &self.head
        } else {
            &self.tower_at(idx).links
        }
    }

    fn links_mut(&mut self, idx: Idx) -> &mut Links {
        if idx == HEAD {
            &mut self.head
        } else {
            &mut self.tower_at_mut(idx).links
        }
    }

    fn alloc(&mut self, tower: Tower<K, V>) -> Idx {
        if let Some(idx) = self.free_list.pop() {
            self.towers[idx as usize] = Some(tower);
            idx
        } else {
            let idx = self.towers.len();
            assert!(idx < HEAD as usize, "skip list arena is full");
            self.towers.push(Some(tower));
            idx as Idx
        }
    }

    fn release(&mut self, idx: Idx) -> Tower<K, V> {
        match self.towers[idx as usize].take() {
            Some(tower) => {
                self.free_list.push(idx);
                tower
            }
            None => unreachable!("double free of slot {}", idx),
        }
    }

    fn cmp_key<Q>(&self, idx: Idx, key: &Q) -> Ordering
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let stored: &Q = self.tower_at(idx).key().borrow();
        stored.cmp(key)
    }

    fn random_level(&mut self) -> usize {
        self.policy
            .next_level(self.probability, self.max_level)
            .clamp(1, self.max_level)
    }

    // --- Descent ---

    /// Walk from the top level down to level 0, following a link while
    /// `advance(list, next, pos_after_hop)` holds. Records the last tower
    /// visited on each level in `path`. Returns the final cursor and its pos.
    fn descend<F>(&self, mut path: Option<&mut Path>, mut advance: F) -> (Idx, usize)
    where
        F: FnMut(&Self, Idx, usize) -> bool,
    {
        let mut idx = HEAD;
        let mut pos = 0usize;

        for level in (0..self.height()).rev() {
            loop {
                let links = self.links(idx);
                let next = links.next[level];
                if next == NULL {
                    break;
                }
                let reach = pos + links.dist[level];
                if !advance(self, next, reach) {
                    break;
                }
                pos = reach;
                idx = next;
            }
            if let Some(path) = path.as_deref_mut() {
                path.update[level] = idx;
                path.pos[level] = pos;
            }
        }

        (idx, pos)
    }

    /// Predecessors of `key` on every level.
    fn search<Q>(&self, key: &Q) -> Path
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut path = Path::new(self.height());
        self.descend(Some(&mut path), |list, next, _| {
            list.cmp_key(next, key) == Ordering::Less
        });
        path
    }

    /// The tower right after `cursor` on level 0, if it holds `key`.
    fn matching<Q>(&self, cursor: Idx, key: &Q) -> Option<Idx>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if self.is_empty() {
            return None;
        }
        let next = self.links(cursor).next[0];
        if next != NULL && self.cmp_key(next, key) == Ordering::Equal {
            Some(next)
        } else {
            None
        }
    }

    /// Arena index and rank of `key`.
    fn find<Q>(&self, key: &Q) -> Option<(Idx, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (cursor, pos) = self.descend(None, |list, next, _| {
            list.cmp_key(next, key) == Ordering::Less
        });
        // The successor of a cursor at pos has rank pos
        let idx = self.matching(cursor, key)?;
        Some((idx, pos))
    }

    /// Arena index of the tower at `rank`.
    fn find_by_pos(&self, rank: usize) -> Option<Idx> {
        if rank >= self.len {
            return None;
        }
        let target = rank + 1;
        let (idx, pos) = self.descend(None, |_, _, reach| reach <= target);
        debug_assert_eq!(pos, target, "distance counters out of sync");
        Some(idx)
    }

    // --- Lookup ---

    /// The tower holding `key` and its rank.
    pub fn get<Q>(&self, key: &Q) -> Option<(&Tower<K, V>, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (idx, rank) = self.find(key)?;
        Some((self.tower_at(idx), rank))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<(&mut Tower<K, V>, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (idx, rank) = self.find(key)?;
        Some((self.tower_at_mut(idx), rank))
    }

    /// Handle and rank of `key`.
    pub fn get_id<Q>(&self, key: &Q) -> Option<(TowerId, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (idx, rank) = self.find(key)?;
        Some((TowerId(idx), rank))
    }

    /// Rank of `key` in ascending order.
    pub fn rank<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|(_, rank)| rank)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// The tower at rank `k`, for `k` in `[0, len())`.
    pub fn get_by_pos(&self, k: usize) -> Option<&Tower<K, V>> {
        let idx = self.find_by_pos(k)?;
        Some(self.tower_at(idx))
    }

    pub fn get_by_pos_mut(&mut self, k: usize) -> Option<&mut Tower<K, V>> {
        let idx = self.find_by_pos(k)?;
        Some(self.tower_at_mut(idx))
    }

    /// The smallest key's tower. Follow [`Tower::next`] to walk the list.
    pub fn first(&self) -> Option<TowerId> {
        match self.head.next.first() {
            Some(&idx) if idx != NULL => Some(TowerId(idx)),
            _ => None,
        }
    }

    /// The tower behind a handle, if it is still live.
    pub fn tower(&self, id: TowerId) -> Option<&Tower<K, V>> {
        self.towers.get(id.idx() as usize)?.as_ref()
    }

    pub fn tower_mut(&mut self, id: TowerId) -> Option<&mut Tower<K, V>> {
        self.towers.get_mut(id.idx() as usize)?.as_mut()
    }

    /// Towers in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            current: self.first().map_or(NULL, TowerId::idx),
            remaining: self.len,
        }
    }

    // --- Mutation ---

    /// Insert `key` or override its value.
    ///
    /// Returns the tower's handle, its rank and whether a new tower was
    /// created. Overriding leaves the structure untouched.
    pub fn set(&mut self, key: K, value: V) -> (TowerId, usize, bool) {
        let mut path = self.search(&key);
        // Rank of the successor of the level-0 cursor
        let rank = path.pos.first().copied().unwrap_or(0);

        if let Some(idx) = self.matching(path.update.first().copied().unwrap_or(HEAD), &key) {
            self.tower_at_mut(idx).replace_value(value);
            return (TowerId(idx), rank, false);
        }

        let level = self.random_level();
        let height = self.height();
        if level > height {
            self.head.extend_level(level);
            for l in height..level {
                // Distance from head to the virtual end before this insertion
                self.head.dist[l] = self.len + 1;
                path.update.push(HEAD);
                path.pos.push(0);
            }
            trace!(from = height, to = level, "height grew");
        }

        let new_idx = self.alloc(Tower::new(key, value, level));
        let new_pos = rank + 1;

        for l in 0..self.height() {
            let pred = path.update[l];
            if l < level {
                // Split pred's hop: pred -> new spans `hop`, new -> old next
                // keeps the rest plus the rank the new tower shifted right.
                let hop = new_pos - path.pos[l];
                let (old_next, old_dist) = {
                    let links = self.links(pred);
                    (links.next[l], links.dist[l])
                };
                let links = &mut self.tower_at_mut(new_idx).links;
                links.next[l] = old_next;
                links.dist[l] = old_dist + 1 - hop;
                let links = self.links_mut(pred);
                links.next[l] = new_idx;
                links.dist[l] = hop;
            } else {
                self.links_mut(pred).dist[l] += 1;
            }
        }

        self.len += 1;
        (TowerId(new_idx), rank, true)
    }

    /// Remove `key`, returning its detached tower and former rank.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<(Tower<K, V>, usize)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let path = self.search(key);
        let cursor = *path.update.first()?;
        let idx = self.matching(cursor, key)?;
        let rank = path.pos[0];
        Some((self.unlink(&path, idx), rank))
    }

    /// Remove the tower at rank `k`, for `k` in `[0, len())`.
    pub fn remove_by_pos(&mut self, k: usize) -> Option<Tower<K, V>> {
        if k >= self.len {
            return None;
        }
        let target = k + 1;
        let mut path = Path::new(self.height());
        // Stop one rank short of the target on every level
        self.descend(Some(&mut path), |_, _, reach| reach < target);
        let idx = self.links(path.update[0]).next[0];
        debug_assert_ne!(idx, NULL, "distance counters out of sync");
        Some(self.unlink(&path, idx))
    }

    /// Unlink `idx`, whose predecessors are recorded in `path`.
    fn unlink(&mut self, path: &Path, idx: Idx) -> Tower<K, V> {
        let height = self.height();

        for l in 0..height {
            let pred = path.update[l];
            if self.links(pred).next[l] == idx {
                let (next, dist) = {
                    let links = &self.tower_at(idx).links;
                    (links.next[l], links.dist[l])
                };
                // Merge both hops, minus the rank that disappears
                let links = self.links_mut(pred);
                links.next[l] = next;
                links.dist[l] += dist - 1;
            } else {
                self.links_mut(pred).dist[l] -= 1;
            }
        }

        let mut new_height = height;
        while new_height > 0 && self.head.next[new_height - 1] == NULL {
            new_height -= 1;
        }
        if new_height < height {
            self.head.shrink_level(new_height);
            trace!(from = height, to = new_height, "height shrank");
        }

        self.len -= 1;
        let mut tower = self.release(idx);
        tower.detach();
        tower
    }

    /// Drop every tower.
    pub fn clear(&mut self) {
        self.towers.clear();
        self.free_list.clear();
        self.head = Links::default();
        self.len = 0;
    }

    // --- Invariant checking ---

    /// Recompute every rank by a level-0 walk and cross-check each distance
    /// counter, the length and the height.
    ///
    /// # Panics
    ///
    /// Panics on the first violation.
    #[doc(hidden)]
    pub fn check_invariants(&self) {
        // pos of every live tower, from a level-0 walk
        let mut pos_of: FxHashMap<Idx, usize> = FxHashMap::default();
        let mut idx = self.head.next.first().copied().unwrap_or(NULL);
        let mut pos = 0usize;
        let mut prev: Option<&K> = None;
        while idx != NULL {
            pos += 1;
            assert!(
                pos <= self.len,
                "INVARIANT VIOLATED: level 0 longer than len()={}",
                self.len
            );
            let tower = self.tower_at(idx);
            if let Some(prev) = prev {
                assert!(
                    prev < tower.key(),
                    "INVARIANT VIOLATED: keys not ascending at rank {}",
                    pos - 1
                );
            }
            prev = Some(tower.key());
            pos_of.insert(idx, pos);
            idx = tower.links.next[0];
        }
        assert_eq!(
            pos, self.len,
            "INVARIANT VIOLATED: level 0 walk={} != len()={}",
            pos, self.len
        );

        let live = self.towers.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(
            live, self.len,
            "INVARIANT VIOLATED: live slots={} != len()={}",
            live, self.len
        );
        assert_eq!(
            live + self.free_list.len(),
            self.towers.len(),
            "INVARIANT VIOLATED: free list out of sync"
        );

        let end = self.len + 1;
        let check_links = |links: &Links, from: usize, what: &dyn fmt::Display| {
            assert_eq!(links.next.len(), links.dist.len());
            for level in 0..links.level() {
                let next = links.next[level];
                let to = if next == NULL {
                    end
                } else {
                    assert!(
                        self.tower_at(next).level() > level,
                        "INVARIANT VIOLATED: {} links to a shorter tower on level {}",
                        what,
                        level
                    );
                    match pos_of.get(&next) {
                        Some(&to) => to,
                        None => panic!(
                            "INVARIANT VIOLATED: {} links to unreachable slot {} on level {}",
                            what, next, level
                        ),
                    }
                };
                assert!(to > from, "INVARIANT VIOLATED: {} links backwards on level {}", what, level);
                assert_eq!(
                    links.dist[level],
                    to - from,
                    "INVARIANT VIOLATED: {} distance on level {}",
                    what,
                    level
                );
            }
        };

        check_links(&self.head, 0, &"head");
        let mut max_level = 0;
        for (&idx, &from) in &pos_of {
            let tower = self.tower_at(idx);
            let level = tower.level();
            assert!(
                (1..=self.max_level).contains(&level),
                "INVARIANT VIOLATED: tower level {} outside [1, {}]",
                level,
                self.max_level
            );
            max_level = max_level.max(level);
            check_links(&tower.links, from, &format_args!("tower at rank {}", from - 1));
        }
        assert_eq!(
            self.height(),
            max_level,
            "INVARIANT VIOLATED: height()={} != tallest tower={}",
            self.height(),
            max_level
        );
    }
}

impl<K: Ord, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Index<TowerId> for SkipList<K, V> {
    type Output = Tower<K, V>;

    fn index(&self, id: TowerId) -> &Tower<K, V> {
        match self.tower(id) {
            Some(tower) => tower,
            None => panic!("no live tower for {:?}", id),
        }
    }
}

impl<K: Ord, V> IndexMut<TowerId> for SkipList<K, V> {
    fn index_mut(&mut self, id: TowerId) -> &mut Tower<K, V> {
        match self.tower_mut(id) {
            Some(tower) => tower,
            None => panic!("no live tower for {:?}", id),
        }
    }
}

impl<K: Ord, V> Extend<(K, V)> for SkipList<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SkipList<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = SkipList::new();
        list.extend(iter);
        list
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for SkipList<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|tower| (tower.key(), tower.value())))
            .finish()
    }
}

/// Level-by-level dump with distance counters, top level first:
///
/// ```text
/// n=3 L=2
/// 1: HEAD -2-> 6 -2-> END
/// 0: HEAD -1-> 3 -1-> 6 -1-> 7 -1-> END
/// ```
impl<K: Ord + fmt::Display, V> fmt::Display for SkipList<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "n={} L={}", self.len, self.height())?;
        for level in (0..self.height()).rev() {
            write!(f, "{}: HEAD", level)?;
            let mut idx = HEAD;
            loop {
                let links = self.links(idx);
                write!(f, " -{}-> ", links.dist[level])?;
                idx = links.next[level];
                if idx == NULL {
                    break;
                }
                write!(f, "{}", self.tower_at(idx).key())?;
            }
            writeln!(f, "END")?;
        }
        Ok(())
    }
}

/// Ascending iterator over towers.
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    current: Idx,
    remaining: usize,
}

impl<'a, K: Ord, V> Iterator for Iter<'a, K, V> {
    type Item = &'a Tower<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NULL {
            return None;
        }
        let tower = self.list.tower_at(self.current);
        self.current = tower.links.next[0];
        self.remaining -= 1;
        Some(tower)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Ord, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'a, K: Ord, V> IntoIterator for &'a SkipList<K, V> {
    type Item = &'a Tower<K, V>;
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
