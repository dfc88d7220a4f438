//! Keyed Diff - Matching an old key sequence to a new one.
//!
//! For every position of the new sequence the diff says whether the entry is
//! created, retained in place, moved, or dropped as a duplicate. Old entries
//! with no match are listed as removed.
//!
//! # Minimal moves
//!
//! Retained entries are split into *stable* ones (a longest increasing
//! subsequence of their old positions) and *moved* ones. Only moved entries
//! need repositioning. When several longest subsequences exist, the one
//! keeping entries that appear earliest in the new order wins:
//!
//! ```text
//! old: [A, B, C]   new: [B, A, C]   →   B, C stable; A moved
//! ```
//!
//! # Duplicates
//!
//! Keys are expected to be unique. A repeated key in the new sequence keeps its
//! first occurrence; later ones become [`Placement::Duplicate`] and are logged.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Create,
    Retain { from: usize },
    Move { from: usize },
    Duplicate,
}

impl Placement {
    pub fn source(&self) -> Option<usize> {
        match *self {
            Placement::Retain { from } | Placement::Move { from } => Some(from),
            Placement::Create | Placement::Duplicate => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyedDiff {
    /// One entry per position of the new sequence.
    pub placements: Vec<Placement>,
    /// Old positions with no match in the new sequence, ascending.
    pub removed: Vec<usize>,
}

impl KeyedDiff {
    pub fn created(&self) -> usize {
        self.count(|p| matches!(p, Placement::Create))
    }

    pub fn moved(&self) -> usize {
        self.count(|p| matches!(p, Placement::Move { .. }))
    }

    pub fn retained(&self) -> usize {
        self.count(|p| matches!(p, Placement::Retain { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|p| matches!(p, Placement::Duplicate))
    }

    /// True when applying the diff changes nothing.
    pub fn is_identity(&self) -> bool {
        self.removed.is_empty() && self.retained() == self.placements.len()
    }

    fn count(&self, f: impl Fn(&Placement) -> bool) -> usize {
        self.placements.iter().filter(|p| f(p)).count()
    }
}

pub fn diff_keys<K: Hash + Eq + Debug>(old: &[K], new: &[K]) -> KeyedDiff {
    let mut old_index: HashMap<&K, usize> = HashMap::with_capacity(old.len());
    for (index, key) in old.iter().enumerate() {
        old_index.entry(key).or_insert(index);
    }

    let mut seen: HashSet<&K> = HashSet::with_capacity(new.len());
    let mut matched = vec![false; old.len()];
    let mut placements = Vec::with_capacity(new.len());
    let mut retained_at = Vec::new();
    let mut sources = Vec::new();

    for (position, key) in new.iter().enumerate() {
        if !seen.insert(key) {
            tracing::warn!(?key, position, "duplicate key in keyed content, keeping the first occurrence");
            placements.push(Placement::Duplicate);
            continue;
        }
        match old_index.get(key) {
            Some(&from) => {
                matched[from] = true;
                placements.push(Placement::Retain { from });
                retained_at.push(position);
                sources.push(from);
            }
            None => placements.push(Placement::Create),
        }
    }

    let stable = stable_subsequence(&sources);
    for (position, keep) in retained_at.into_iter().zip(stable) {
        if !keep {
            if let Placement::Retain { from } = placements[position] {
                placements[position] = Placement::Move { from };
            }
        }
    }

    let removed = matched
        .iter()
        .enumerate()
        .filter_map(|(index, &hit)| (!hit).then_some(index))
        .collect();

    KeyedDiff { placements, removed }
}

/// Mark a longest strictly increasing subsequence of `values` (distinct).
///
/// Among equally long ones, picks the lexicographically earliest by position.
fn stable_subsequence(values: &[usize]) -> Vec<bool> {
    let n = values.len();

    // run[i]: length of the longest increasing run starting at i.
    // tails[k]: largest first value over runs of length k + 1 seen so far
    // (scanning right to left); strictly decreasing.
    let mut run = vec![0usize; n];
    let mut tails: Vec<usize> = Vec::new();
    for i in (0..n).rev() {
        let value = values[i];
        let len = tails.partition_point(|&t| t > value);
        run[i] = len + 1;
        if len == tails.len() {
            tails.push(value);
        } else {
            tails[len] = value;
        }
    }

    let mut keep = vec![false; n];
    let mut need = tails.len();
    let mut floor: Option<usize> = None;
    for i in 0..n {
        if need == 0 {
            break;
        }
        if run[i] == need && floor.is_none_or(|f| values[i] > f) {
            keep[i] = true;
            floor = Some(values[i]);
            need -= 1;
        }
    }
    keep
}
