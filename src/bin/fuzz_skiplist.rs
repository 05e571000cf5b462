//! AFL fuzz harness for the skip list.
//!
//! Decodes the input into a sequence of operations, applies them to a skip
//! list and a `BTreeMap`, and checks after every step that both agree and
//! that every distance counter is exact.
//!
//! Levels come from the input too, so the fuzzer can steer the shape of the
//! list instead of relying on the geometric policy.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use afl::fuzz;
use indexed_skiplist::SkipList;

const MAX_LEVEL: usize = 8;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// Insert or override `key`; `level` is used if a tower is created
    Set { key: u8, level: u8 },
    Remove { key: u8 },
    /// Remove at a fraction of the current length
    RemoveByPos { pos_frac: u8 },
    GetByPos { pos_frac: u8 },
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 2 => Some((
                FuzzOp::Set {
                    key: rest[0],
                    level: rest[1],
                },
                &rest[2..],
            )),
            1 if !rest.is_empty() => Some((FuzzOp::Remove { key: rest[0] }, &rest[1..])),
            2 if !rest.is_empty() => Some((FuzzOp::RemoveByPos { pos_frac: rest[0] }, &rest[1..])),
            3 if !rest.is_empty() => Some((FuzzOp::GetByPos { pos_frac: rest[0] }, &rest[1..])),
            _ => None,
        }
    }
}

fn pos_of(pos_frac: u8, len: usize) -> usize {
    (pos_frac as usize * len / 256).min(len.saturating_sub(1))
}

fn main() {
    fuzz!(|data: &[u8]| {
        // The policy reads the level the current Set op asked for
        let next_level = Rc::new(RefCell::new(1usize));
        let policy_level = Rc::clone(&next_level);
        let mut list: SkipList<u8, usize> = SkipList::builder()
            .max_level(MAX_LEVEL)
            .level_policy(move |_p: f64, _max: usize| *policy_level.borrow())
            .build();
        let mut model: BTreeMap<u8, usize> = BTreeMap::new();
        let mut remaining = data;
        let mut step = 0usize;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;
            step += 1;

            match op {
                FuzzOp::Set { key, level } => {
                    *next_level.borrow_mut() = 1 + level as usize % MAX_LEVEL;
                    let existed = model.insert(key, step).is_some();
                    let (_, rank, inserted) = list.set(key, step);
                    assert_eq!(inserted, !existed);
                    assert_eq!(rank, model.range(..key).count());
                }

                FuzzOp::Remove { key } => {
                    let expected = model.remove(&key);
                    let removed = list.remove(&key).map(|(tower, _)| *tower.value());
                    assert_eq!(removed, expected);
                }

                FuzzOp::RemoveByPos { pos_frac } => {
                    if model.is_empty() {
                        assert!(list.remove_by_pos(0).is_none());
                        continue;
                    }
                    let pos = pos_of(pos_frac, model.len());
                    let key = *model.keys().nth(pos).unwrap();
                    model.remove(&key);
                    let tower = list.remove_by_pos(pos).unwrap();
                    assert_eq!(tower.key(), &key);
                }

                FuzzOp::GetByPos { pos_frac } => {
                    let pos = pos_of(pos_frac, model.len());
                    let expected = model.keys().nth(pos);
                    assert_eq!(list.get_by_pos(pos).map(|t| t.key()), expected);
                }
            }

            assert_eq!(list.len(), model.len());
            list.check_invariants();
        }
    });
}
