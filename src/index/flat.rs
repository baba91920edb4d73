//! `flat` — an unordered, appendable sequence scanned linearly by every
//! query (§4.3.1). Baseline for correctness and small-`n` performance.

use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::Predicate;

use super::{Entry, SpatialIndex};

/// Linear-scan spatial index: O(1) amortized insert, O(n) everything else.
#[derive(Debug, Clone)]
pub struct FlatIndex<K, V, const M: usize> {
    entries: Vec<Entry<K, V, M>>,
}

impl<K, V, const M: usize> Default for FlatIndex<K, V, M> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<K: Scalar, V, const M: usize> FlatIndex<K, V, M> {
    /// the tight bounding box of every stored key, used only to order the
    /// predicate list before a scan
    fn bounding_box(&self) -> Option<Aabb<K, M>> {
        let mut iter = self.entries.iter();
        let first = iter.next()?;
        let mut bbox = Aabb::from_point(first.key);
        for e in iter {
            bbox = bbox.stretch_point(&e.key);
        }
        Some(bbox)
    }
}

impl<K: Scalar, V, const M: usize> SpatialIndex<K, V, M> for FlatIndex<K, V, M> {
    fn insert(&mut self, key: Point<K, M>, value: V) {
        self.entries.push(Entry::new(key, value));
    }

    fn erase(&mut self, key: &Point<K, M>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != *key);
        before - self.entries.len()
    }

    fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        self.entries.iter().find(|e| e.key == *key)
    }

    fn query(&self, predicates: &[Predicate<K, V, M>]) -> Vec<&Entry<K, V, M>> {
        let mut predicates: Vec<&Predicate<K, V, M>> = predicates.iter().collect();
        if let Some(bbox) = self.bounding_box() {
            predicates.sort_by(|a, b| {
                b.restrictiveness(&bbox)
                    .partial_cmp(&a.restrictiveness(&bbox))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        self.entries
            .iter()
            .filter(|e| predicates.iter().all(|p| p.passes(&e.key, &e.value)))
            .collect()
    }

    fn find_nearest(&self, reference: &Point<K, M>, k: usize) -> Vec<&Entry<K, V, M>> {
        let mut candidates: Vec<&Entry<K, V, M>> = self.entries.iter().collect();
        candidates.sort_by(|a, b| {
            reference
                .distance_squared(&a.key)
                .partial_cmp(&reference.distance_squared(&b.key))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(k);
        candidates
    }

    fn iter(&self) -> Vec<&Entry<K, V, M>> {
        self.entries.iter().collect()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn drain(&mut self) -> Vec<Entry<K, V, M>> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::test_util::exercise_basic_contract;

    #[test]
    fn test_contract() {
        exercise_basic_contract::<FlatIndex<i64, &'static str, 2>>();
    }

    #[test]
    fn test_merge() {
        let mut a: FlatIndex<i64, i32, 1> = FlatIndex::default();
        let mut b: FlatIndex<i64, i32, 1> = FlatIndex::default();
        a.insert(Point::new([1]), 1);
        b.insert(Point::new([2]), 2);
        a.merge(&mut b);
        assert_eq!(a.len(), 2);
        assert!(b.is_empty());
    }
}
