//! A capacity-bounded ordered list of nested fronts (§4.5): `F₀` is the
//! non-dominated front; `Fᵢ₊₁` holds keys dominated by `Fᵢ` but not by any
//! shallower front.

use crate::error::{Error, Result};
use crate::front::indicators::crowding_distance;
use crate::front::Front;
use crate::geometry::{Direction, Point, Scalar};
use crate::index::{Entry, SpatialIndex};

/// An ordered stack of [`Front`]s sharing one [`Direction`] vector and one
/// total entry capacity.
pub struct Archive<K, V, Idx, const M: usize>
where
    Idx: SpatialIndex<K, V, M>,
    K: Scalar,
{
    fronts: Vec<Front<K, V, Idx, M>>,
    directions: Direction<M>,
    capacity: usize,
}

impl<K, V, Idx, const M: usize> Archive<K, V, Idx, M>
where
    Idx: SpatialIndex<K, V, M>,
    K: Scalar,
{
    /// builds an empty archive bounded at `capacity` total entries
    pub fn new(capacity: usize, directions: Direction<M>) -> Self {
        Self { fronts: Vec::new(), directions, capacity }
    }

    /// maximizes every dimension, per the shared constructor family default
    pub fn with_capacity_default_directions(capacity: usize) -> Self {
        Self::new(capacity, Direction::default())
    }

    /// builds an archive from an iterator of `(key, value)` pairs
    pub fn with_entries(entries: impl IntoIterator<Item = (Point<K, M>, V)>, capacity: usize, directions: Direction<M>) -> Self {
        let mut archive = Self::new(capacity, directions);
        for (key, value) in entries {
            archive.insert(key, value);
        }
        archive
    }

    pub fn directions(&self) -> &Direction<M> {
        &self.directions
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// references to every front, shallowest first
    pub fn fronts(&self) -> &[Front<K, V, Idx, M>] {
        &self.fronts
    }

    /// total entries across all fronts
    pub fn len(&self) -> usize {
        self.fronts.iter().map(Front::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.fronts.clear();
    }

    /// the depth of the front currently holding `key`, or `fronts().len()`
    /// if no front holds it; by the archive's dominance invariant, the
    /// holding front is the smallest `i` such that no key of `F₀..Fᵢ₋₁`
    /// dominates `key` and `key` is equal to or non-dominated with some key
    /// of `Fᵢ`, so a direct membership search is equivalent and simpler
    pub fn find_front(&self, key: &Point<K, M>) -> usize {
        self.fronts.iter().position(|f| f.contains(key)).unwrap_or(self.fronts.len())
    }

    pub fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        self.fronts.iter().find_map(|f| f.find(key))
    }

    pub fn contains(&self, key: &Point<K, M>) -> bool {
        self.find(key).is_some()
    }

    /// inserts `(key, value)`, cascading any displaced keys into
    /// progressively deeper fronts, then enforcing `capacity` by pruning the
    /// lowest-crowding-distance entry from the deepest non-empty front
    pub fn insert(&mut self, key: Point<K, M>, value: V) {
        self.cascade_into(0, key, value);
        self.enforce_capacity();
    }

    /// tries `front[depth]`; on rejection tries `front[depth + 1]`, growing
    /// the front stack as needed; on acceptance, every entry `key`
    /// displaced from `front[depth]` is recursively cascaded into
    /// `front[depth + 1]`
    fn cascade_into(&mut self, depth: usize, key: Point<K, M>, value: V) {
        if depth == self.fronts.len() {
            self.fronts.push(Front::with_directions(self.directions));
        }
        match self.fronts[depth].insert_cascading(key, value) {
            Ok(displaced) => {
                for entry in displaced {
                    self.cascade_into(depth + 1, entry.key, entry.value);
                }
            }
            Err((key, value)) => self.cascade_into(depth + 1, key, value),
        }
    }

    fn enforce_capacity(&mut self) {
        while self.len() > self.capacity {
            let Some(deepest) = self.fronts.iter().rposition(|f| !f.is_empty()) else {
                break;
            };
            let keys: Vec<Point<K, M>> = self.fronts[deepest].iter().iter().map(|e| e.key).collect();
            if keys.is_empty() {
                break;
            }
            let distances = crowding_distance(&keys);
            let (worst_idx, _) = distances
                .iter()
                .enumerate()
                .min_by(|(ia, a), (ib, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal).then(ia.cmp(ib)))
                .expect("deepest front is non-empty");
            self.fronts[deepest].erase(&keys[worst_idx]);
        }
        while self.fronts.last().is_some_and(Front::is_empty) {
            self.fronts.pop();
        }
    }

    /// removes `key` from whichever front holds it, then rebuilds the
    /// cascade from that front downward: every entry that was in the erased
    /// front or deeper is re-offered to `find_front`'s dominance test in
    /// front order, so entries no longer dominated by the (now smaller)
    /// union above them are promoted up, possibly cascading further
    pub fn erase(&mut self, key: &Point<K, M>) -> bool {
        let Some(origin) = self.fronts.iter().position(|f| f.contains(key)) else {
            return false;
        };
        if self.fronts[origin].take(key).is_none() {
            return false;
        }
        let mut displaced = Vec::new();
        for front in self.fronts[origin..].iter_mut() {
            displaced.extend(front.drain());
        }
        self.fronts.truncate(origin);
        for entry in displaced {
            self.cascade_into(origin, entry.key, entry.value);
        }
        while self.fronts.last().is_some_and(Front::is_empty) {
            self.fronts.pop();
        }
        true
    }

    /// removes every entry satisfying `predicate`, rebuilding all fronts
    /// from scratch; documented basic-guarantee exception to the
    /// strong-exception-guarantee the rest of the container provides, since
    /// a panic mid-rebuild (from a panicking `predicate`) can leave the
    /// archive with fewer fronts than it started with
    pub fn erase_all(&mut self, predicate: impl Fn(&Point<K, M>) -> bool) -> Result<usize> {
        if self.capacity == 0 {
            return Err(Error::CapacityInvariant("archive capacity is zero"));
        }
        let mut survivors: Vec<(Point<K, M>, V)> = Vec::new();
        let mut removed = 0;
        for front in self.fronts.iter_mut() {
            for entry in front.drain() {
                if predicate(&entry.key) {
                    removed += 1;
                } else {
                    survivors.push((entry.key, entry.value));
                }
            }
        }
        self.fronts.clear();
        for (key, value) in survivors {
            self.insert(key, value);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::flat::FlatIndex;

    type TestArchive = Archive<i64, i32, FlatIndex<i64, i32, 2>, 2>;

    #[test]
    fn test_scenario_c_capacity_pruning() {
        let mut archive = TestArchive::new(3, Direction::all_minimize());
        archive.insert(Point::new([1, 1]), 0);
        archive.insert(Point::new([2, 2]), 1);
        archive.insert(Point::new([3, 3]), 2);
        archive.insert(Point::new([4, 4]), 3);
        archive.insert(Point::new([5, 5]), 4);
        assert!(archive.len() <= 3);
        assert!(archive.contains(&Point::new([1, 1])));
    }

    #[test]
    fn test_cascade_into_deeper_front() {
        let mut archive = TestArchive::new(10, Direction::all_minimize());
        archive.insert(Point::new([1, 1]), 0);
        archive.insert(Point::new([2, 2]), 1);
        assert_eq!(archive.find_front(&Point::new([1, 1])), 0);
        assert_eq!(archive.find_front(&Point::new([2, 2])), 1);
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_erase_removes_entry() {
        let mut archive = TestArchive::new(10, Direction::all_minimize());
        archive.insert(Point::new([1, 1]), 0);
        archive.insert(Point::new([2, 2]), 1);
        assert!(archive.erase(&Point::new([1, 1])));
        assert!(!archive.contains(&Point::new([1, 1])));
    }
}
