//! Scenario tests for the public skip list API.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use indexed_skiplist::{Geometric, Playback, SkipList};

// =============================================================================
// Test helpers
// =============================================================================

/// (key, level, expected rank) of Figure 1 in Pugh's "A Skip List Cookbook".
const COOKBOOK: [(u32, usize, usize); 10] = [
    (3, 1, 0),
    (6, 4, 1),
    (7, 1, 2),
    (9, 2, 3),
    (12, 1, 4),
    (17, 2, 5),
    (19, 1, 6),
    (21, 1, 7),
    (25, 3, 8),
    (26, 1, 9),
];

/// Build a list whose levels are replayed in insertion order.
fn playback_list(data: &[(u32, usize, usize)]) -> SkipList<u32, usize> {
    let levels: Vec<usize> = data.iter().map(|&(_, level, _)| level).collect();
    let mut list = SkipList::builder().level_policy(Playback::new(levels)).build();
    for &(key, _, rank) in data {
        list.set(key, rank);
    }
    list.check_invariants();
    list
}

fn shuffled_keys(count: u32, seed: u64) -> Vec<u32> {
    let mut keys: Vec<u32> = (0..count).collect();
    keys.shuffle(&mut StdRng::seed_from_u64(seed));
    keys
}

fn assert_ascending(list: &SkipList<u32, usize>) {
    let mut last = None;
    let mut cursor = list.first();
    while let Some(id) = cursor {
        let key = *list[id].key();
        if let Some(last) = last {
            assert!(last < key, "{} before {}", last, key);
        }
        last = Some(key);
        cursor = list[id].next();
    }
}

// =============================================================================
// Cookbook scenario
// =============================================================================

#[test]
fn cookbook_ranks() {
    let list = playback_list(&COOKBOOK);
    assert_eq!(list.len(), 10);
    assert_eq!(list.height(), 4);

    for &(key, _, rank) in &COOKBOOK {
        let tower = list.get_by_pos(rank).unwrap();
        assert_eq!(tower.key(), &key);

        let (tower, found) = list.get(&key).unwrap();
        assert_eq!(tower.key(), &key);
        assert_eq!(found, rank);
    }
}

#[test]
fn cookbook_remove_by_pos() {
    let mut list = playback_list(&COOKBOOK);

    let tower = list.remove_by_pos(8).unwrap();
    assert_eq!(tower.key(), &25);
    assert!(list.get(&25).is_none());
    assert_eq!(list.len(), 9);
    list.check_invariants();

    // Everything after the removed key moved down one rank
    assert_eq!(list.rank(&26), Some(8));
    assert_eq!(list.rank(&21), Some(7));
}

#[test]
fn cookbook_shuffled_insertion() {
    for seed in 0..20 {
        let mut data = COOKBOOK;
        data.shuffle(&mut StdRng::seed_from_u64(seed));
        let mut list = playback_list(&data);

        for &(key, _, rank) in &data {
            assert_eq!(list.get_by_pos(rank).unwrap().key(), &key, "seed {}", seed);
            let (tower, found) = list.get(&key).unwrap();
            assert_eq!(tower.value(), &rank);
            assert_eq!(found, rank, "seed {}", seed);
        }
        assert!(list.get(&1000).is_none());
        assert_ascending(&list);

        let tower = list.remove_by_pos(8).unwrap();
        assert_eq!(tower.key(), &25);
        assert!(list.get(&25).is_none());
        list.check_invariants();
    }
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn set_remove_by_key() {
    let mut list = SkipList::builder().level_policy(Geometric::seeded(11)).build();
    let keys = shuffled_keys(100, 11);

    for (i, &key) in keys.iter().enumerate() {
        assert_eq!(list.len(), i);
        assert!(list.get(&key).is_none());
        let (_, _, inserted) = list.set(key, i);
        assert!(inserted);
        assert_eq!(list.len(), i + 1);
    }
    list.check_invariants();
    assert_ascending(&list);

    for (i, &key) in keys.iter().enumerate() {
        let (tower, rank) = list.get(&key).unwrap();
        assert_eq!(tower.key(), &key);
        assert_eq!(tower.value(), &i);
        // Keys are 0..100, so each key is its own rank
        assert_eq!(rank, key as usize);
    }

    let mut n = list.len();
    for (i, &key) in keys.iter().enumerate() {
        let (tower, _) = list.remove(&key).unwrap();
        assert_eq!(tower.key(), &key);
        assert!(list.get(&key).is_none());
        n -= 1;
        assert_eq!(list.len(), n);
        list.check_invariants();

        // Every remaining key is still found, by key and by rank
        for &other in &keys[i + 1..] {
            let (id, rank) = list.get_id(&other).unwrap();
            assert!(rank < list.len());
            let tower = list.get_by_pos(rank).unwrap();
            assert_eq!(tower.key(), &other);
            assert_eq!(list[id].key(), &other);
        }
    }
    assert_eq!(list.height(), 0);
}

#[test]
fn get_remove_by_pos() {
    let mut list = SkipList::builder().level_policy(Geometric::seeded(173)).build();
    let keys = shuffled_keys(100, 173);
    for (i, &key) in keys.iter().enumerate() {
        list.set(key, i);
    }

    for (i, &key) in keys.iter().enumerate() {
        let tower = list.get_by_pos(key as usize).unwrap();
        assert_eq!(tower.key(), &key);
        assert_eq!(tower.value(), &i);
    }

    let mut rng = StdRng::seed_from_u64(173);
    while !list.is_empty() {
        let pos = rand::Rng::gen_range(&mut rng, 0..list.len());
        let key = *list.get_by_pos(pos).unwrap().key();
        assert_eq!(list.rank(&key), Some(pos));

        let size_before = list.len();
        let tower = list.remove_by_pos(pos).unwrap();
        assert_eq!(tower.key(), &key);
        assert_eq!(list.len(), size_before - 1);
        assert!(list.get(&key).is_none());
        list.check_invariants();
    }
}

#[test]
fn override_is_idempotent() {
    let mut list = SkipList::new();
    for key in [40, 10, 30, 20] {
        list.set(key, "first");
    }
    let (_, rank_before, _) = list.set(30, "first");

    let (id, rank, inserted) = list.set(30, "second");
    assert!(!inserted);
    assert_eq!(rank, rank_before);
    assert_eq!(rank, 2);
    assert_eq!(list.len(), 4);
    assert_eq!(list[id].value(), &"second");
    assert_eq!(list.get(&30).unwrap().0.value(), &"second");
}

#[test]
fn value_write_through() {
    let mut list = SkipList::new();
    let (id, _, _) = list.set("apples", 1);
    *list[id].value_mut() += 1;
    *list.get_mut("apples").unwrap().0.value_mut() += 1;
    assert_eq!(list.get("apples").unwrap().0.value(), &3);
}

// =============================================================================
// Boundaries
// =============================================================================

#[test]
fn out_of_range_positions() {
    let mut list: SkipList<u32, ()> = (0..5).map(|key| (key, ())).collect();
    assert!(list.get_by_pos(5).is_none());
    assert!(list.get_by_pos(usize::MAX).is_none());
    assert!(list.remove_by_pos(5).is_none());
    assert_eq!(list.len(), 5);
    assert!(list.get_by_pos(4).is_some());
}

#[test]
fn empty_structure() {
    let mut list: SkipList<u32, ()> = SkipList::new();
    assert!(list.get(&0).is_none());
    assert!(list.rank(&0).is_none());
    assert!(list.get_by_pos(0).is_none());
    assert!(list.remove(&0).is_none());
    assert!(list.remove_by_pos(0).is_none());
    assert!(list.first().is_none());
    assert_eq!(list.height(), 0);
}

#[test]
fn height_never_exceeds_max_level() {
    let mut list = SkipList::builder()
        .probability(0.99)
        .max_level(3)
        .level_policy(Geometric::seeded(5))
        .build();
    for key in 0..200u32 {
        list.set(key, ());
        assert!(list.height() <= 3);
    }
    list.check_invariants();
}

#[test]
fn low_probability_stays_flat() {
    let mut list = SkipList::builder()
        .probability(0.01)
        .level_policy(Geometric::seeded(9))
        .build();
    for key in 0..500u32 {
        list.set(key, key);
    }
    assert!(list.height() <= 4, "height {}", list.height());
    list.check_invariants();
}

#[test]
#[should_panic(expected = "invalid skip list configuration")]
fn rejects_bad_probability() {
    let _list: SkipList<u32, ()> = SkipList::builder().probability(0.995).build();
}

#[test]
fn try_build_reports_bad_max_level() {
    let result = SkipList::<u32, ()>::builder().max_level(513).try_build();
    assert!(result.is_err());
}
