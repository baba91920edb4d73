//! The spatial-index contract shared by all five variants (§4.3).
//!
//! Every variant maps an `M`-dimensional [`Point`] to a value, stores
//! duplicate keys as a multimap, and exposes the same query surface:
//! membership, range queries driven by a [`Predicate`] list, k-nearest
//! neighbours, per-dimension extrema, and whole-container iteration.
//!
//! Query methods return an eagerly-collected `Vec` of borrowed entries
//! rather than a custom external iterator carrying embedded traversal
//! state — see `SPEC_FULL.md` §4.3 for why that is a deliberate,
//! spec-sanctioned simplification rather than an oversight.

pub mod flat;
pub mod kd_tree;
pub mod quad_tree;
pub mod r_tree;
pub mod r_star_tree;

use crate::error::{Error, Result};
use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::Predicate;

/// A stored (key, value) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<K, V, const M: usize> {
    /// the point this entry is keyed by
    pub key: Point<K, M>,
    /// the value associated with `key`
    pub value: V,
}

impl<K, V, const M: usize> Entry<K, V, M> {
    /// builds an entry from a key and value
    pub fn new(key: Point<K, M>, value: V) -> Self {
        Self { key, value }
    }
}

/// Common contract implemented by `flat`, `kd_tree`, `quad_tree`, `r_tree`,
/// and `r_star_tree`.
pub trait SpatialIndex<K: Scalar, V, const M: usize>: Default {
    /// inserts `(key, value)`; duplicate keys are permitted (multimap
    /// semantics, per §9's Open Question resolution)
    fn insert(&mut self, key: Point<K, M>, value: V);

    /// removes every stored entry whose key equals `key`, returning how
    /// many were removed
    fn erase(&mut self, key: &Point<K, M>) -> usize;

    /// returns any one stored entry with key equal to `key`
    fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>>;

    /// `true` iff some stored entry has key equal to `key`
    fn contains(&self, key: &Point<K, M>) -> bool {
        self.find(key).is_some()
    }

    /// like [`Self::find`], but fails with [`Error::KeyNotFound`] instead of
    /// returning `None` when `key` is absent
    fn at(&self, key: &Point<K, M>) -> Result<&Entry<K, V, M>> {
        self.find(key).ok_or(Error::KeyNotFound)
    }

    /// entries whose key satisfies `predicates` (conjunction), in an
    /// implementation-defined but stable order
    fn query(&self, predicates: &[Predicate<K, V, M>]) -> Vec<&Entry<K, V, M>>;

    /// entries whose key lies in the axis-aligned box `[lo, hi]`
    fn find_intersection(&self, lo: &Point<K, M>, hi: &Point<K, M>) -> Vec<&Entry<K, V, M>> {
        self.query(&[Predicate::Intersects(Aabb::new(*lo, *hi))])
    }

    /// entries whose key lies in the axis-aligned box `[lo, hi]` (identical
    /// to `find_intersection` for point keys; kept distinct because the
    /// underlying predicate allows subtree-level short-circuiting)
    fn find_within(&self, lo: &Point<K, M>, hi: &Point<K, M>) -> Vec<&Entry<K, V, M>> {
        self.query(&[Predicate::Within(Aabb::new(*lo, *hi))])
    }

    /// entries whose key lies outside the axis-aligned box `[lo, hi]`
    fn find_disjoint(&self, lo: &Point<K, M>, hi: &Point<K, M>) -> Vec<&Entry<K, V, M>> {
        self.query(&[Predicate::Disjoint(Aabb::new(*lo, *hi))])
    }

    /// up to `k` entries in nondecreasing distance from `reference`, with no
    /// duplicates
    fn find_nearest(&self, reference: &Point<K, M>, k: usize) -> Vec<&Entry<K, V, M>>;

    /// every stored entry, in implementation-defined but stable order
    fn iter(&self) -> Vec<&Entry<K, V, M>>;

    /// the entry with the maximum `dim`-th coordinate
    fn max_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        self.iter()
            .into_iter()
            .max_by(|a, b| a.key.kth(dim).partial_cmp(&b.key.kth(dim)).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// the entry with the minimum `dim`-th coordinate
    fn min_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        self.iter()
            .into_iter()
            .min_by(|a, b| a.key.kth(dim).partial_cmp(&b.key.kth(dim)).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// number of dimensions (`M`)
    fn dimensions(&self) -> usize {
        M
    }

    /// number of stored entries
    fn len(&self) -> usize;

    /// `true` iff no entries are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// removes every stored entry
    fn clear(&mut self);

    /// removes and returns every stored entry, leaving the index empty
    fn drain(&mut self) -> Vec<Entry<K, V, M>>;

    /// removes and returns one stored entry with key equal to `key`, or
    /// `None` if absent; the default implementation drains the whole
    /// container and reinserts everything else, since giving every variant
    /// an efficient take-by-key would require threading owned-value removal
    /// through each variant's erase path for a rarely-hot operation (used by
    /// `Front`/`Archive` cascades, not by per-query hot paths)
    fn take(&mut self, key: &Point<K, M>) -> Option<Entry<K, V, M>> {
        let mut drained = self.drain();
        let idx = drained.iter().position(|e| e.key == *key)?;
        let entry = drained.swap_remove(idx);
        for e in drained {
            self.insert(e.key, e.value);
        }
        Some(entry)
    }

    /// inserts every entry of `other` into `self`, leaving `other` empty
    fn merge(&mut self, other: &mut Self) {
        for entry in other.drain() {
            self.insert(entry.key, entry.value);
        }
    }

    /// swaps the contents of `self` and `other`
    fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// runs a battery of contract-level checks shared by every variant
    pub fn exercise_basic_contract<Idx: SpatialIndex<i64, &'static str, 2>>() {
        let mut idx = Idx::default();
        assert!(idx.is_empty());
        idx.insert(Point::new([1, 2]), "a");
        idx.insert(Point::new([3, 4]), "b");
        idx.insert(Point::new([5, 6]), "c");
        assert_eq!(idx.len(), 3);
        assert!(idx.contains(&Point::new([3, 4])));
        assert!(!idx.contains(&Point::new([9, 9])));

        let found = idx.find(&Point::new([3, 4])).unwrap();
        assert_eq!(found.value, "b");

        let inter = idx.find_intersection(&Point::new([0, 0]), &Point::new([4, 4]));
        assert_eq!(inter.len(), 2);

        let disj = idx.find_disjoint(&Point::new([0, 0]), &Point::new([4, 4]));
        assert_eq!(disj.len(), 1);
        assert_eq!(disj[0].value, "c");

        let nearest = idx.find_nearest(&Point::new([0, 0]), 2);
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest[0].value, "a");
        assert_eq!(nearest[1].value, "b");

        assert_eq!(idx.max_element(0).unwrap().value, "c");
        assert_eq!(idx.min_element(0).unwrap().value, "a");

        assert_eq!(idx.erase(&Point::new([3, 4])), 1);
        assert_eq!(idx.len(), 2);
        assert!(!idx.contains(&Point::new([3, 4])));

        idx.clear();
        assert!(idx.is_empty());
    }

    #[test]
    fn test_at_hits_and_misses() {
        let mut idx = crate::index::flat::FlatIndex::<i64, &'static str, 2>::default();
        idx.insert(Point::new([1, 2]), "a");
        assert_eq!(idx.at(&Point::new([1, 2])).unwrap().value, "a");
        assert!(matches!(idx.at(&Point::new([9, 9])), Err(crate::error::Error::KeyNotFound)));
    }
}
