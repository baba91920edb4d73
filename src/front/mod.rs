//! The dominance-preserving front engine (§4.4): wraps any [`SpatialIndex`]
//! and maintains an antichain under a per-dimension [`Direction`] vector.

pub mod indicators;

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::geometry::{Direction, Point, Scalar};
use crate::index::{Entry, SpatialIndex};

/// A Pareto front: every stored key is mutually non-dominated with every
/// other stored key under `directions`, and keys are unique (equal-key
/// insertion replaces rather than duplicates, per the Open Question
/// resolution in `SPEC_FULL.md` §9).
pub struct Front<K, V, Idx, const M: usize>
where
    Idx: SpatialIndex<K, V, M>,
    K: Scalar,
{
    index: Idx,
    directions: Direction<M>,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, Idx, const M: usize> Default for Front<K, V, Idx, M>
where
    Idx: SpatialIndex<K, V, M>,
    K: Scalar,
{
    fn default() -> Self {
        Self { index: Idx::default(), directions: Direction::default(), _marker: PhantomData }
    }
}

impl<K, V, Idx, const M: usize> Front<K, V, Idx, M>
where
    Idx: SpatialIndex<K, V, M>,
    K: Scalar,
{
    /// all dimensions minimized if `minimize`, else all maximized
    pub fn with_all_minimize(minimize: bool) -> Self {
        Self { index: Idx::default(), directions: Direction::all(minimize), _marker: PhantomData }
    }

    /// an explicit direction vector
    pub fn with_directions(directions: Direction<M>) -> Self {
        Self { index: Idx::default(), directions, _marker: PhantomData }
    }

    /// builds a front from an iterator of `(key, value)` pairs under the
    /// given directions, applying the insertion contract to each in turn
    pub fn with_entries(entries: impl IntoIterator<Item = (Point<K, M>, V)>, directions: Direction<M>) -> Self {
        let mut front = Self::with_directions(directions);
        for (key, value) in entries {
            front.insert(key, value);
        }
        front
    }

    /// the direction vector this front was constructed with
    pub fn directions(&self) -> &Direction<M> {
        &self.directions
    }

    /// the underlying spatial index
    pub fn index(&self) -> &Idx {
        &self.index
    }

    /// inserts `(key, value)` under the front's dominance rule (§4.4):
    /// rejected (returns `false`, no change) if some stored key dominates
    /// `key`; otherwise any stored key that `key` dominates is removed, any
    /// existing entry with an equal key is replaced, and `key` is inserted
    pub fn insert(&mut self, key: Point<K, M>, value: V) -> bool {
        self.insert_cascading(key, value).is_ok()
    }

    /// inserts `(key, value)` exactly as [`Self::insert`] does, but on
    /// acceptance also returns the entries that were displaced (removed for
    /// being dominated by `key`) with their values intact, so an [`Archive`]
    /// can cascade them into the next front; on rejection, hands `(key,
    /// value)` back unchanged so the caller can retry elsewhere without
    /// requiring `V: Clone`
    ///
    /// [`Archive`]: crate::archive::Archive
    #[allow(clippy::type_complexity)]
    pub fn insert_cascading(&mut self, key: Point<K, M>, value: V) -> std::result::Result<Vec<Entry<K, V, M>>, (Point<K, M>, V)> {
        if self.index.iter().iter().any(|e| e.key.dominates(&key, &self.directions)) {
            return Err((key, value));
        }
        let dominated_keys: Vec<Point<K, M>> = self.index.iter().iter().filter(|e| key.dominates(&e.key, &self.directions)).map(|e| e.key).collect();
        let mut displaced = Vec::with_capacity(dominated_keys.len());
        for d in dominated_keys {
            if let Some(entry) = self.index.take(&d) {
                displaced.push(entry);
            }
        }
        self.index.erase(&key);
        self.index.insert(key, value);
        Ok(displaced)
    }

    /// removes the entry with key `key`; does not pull back any
    /// previously-dominated entry (§4.4's erase contract)
    pub fn erase(&mut self, key: &Point<K, M>) -> bool {
        self.index.erase(key) > 0
    }

    /// removes and returns the entry with key `key`, preserving its value
    pub fn take(&mut self, key: &Point<K, M>) -> Option<Entry<K, V, M>> {
        self.index.take(key)
    }

    /// removes and returns every stored entry with `key`'s value intact,
    /// leaving the front empty
    pub fn drain(&mut self) -> Vec<Entry<K, V, M>> {
        self.index.drain()
    }

    pub fn contains(&self, key: &Point<K, M>) -> bool {
        self.index.contains(key)
    }

    pub fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        self.index.find(key)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn iter(&self) -> Vec<&Entry<K, V, M>> {
        self.index.iter()
    }

    /// best observed value per dimension under `directions`
    pub fn ideal(&self) -> Result<Point<K, M>> {
        self.extreme_point(|i| self.directions.minimizes(i))
    }

    /// worst value per dimension among this front's own keys (identical to
    /// `worst` for a standalone front, per §4.4)
    pub fn nadir(&self) -> Result<Point<K, M>> {
        self.extreme_point(|i| !self.directions.minimizes(i))
    }

    /// worst value per dimension across all observed keys; equal to
    /// `nadir` for a standalone front
    pub fn worst(&self) -> Result<Point<K, M>> {
        self.nadir()
    }

    fn extreme_point(&self, minimize_means_smallest: impl Fn(usize) -> bool) -> Result<Point<K, M>> {
        if self.is_empty() {
            return Err(Error::EmptyContainer);
        }
        let mut coords = [K::zero(); M];
        for i in 0..M {
            let entry = if minimize_means_smallest(i) { self.index.min_element(i) } else { self.index.max_element(i) };
            coords[i] = entry.expect("non-empty front has an extremum on every dimension").key.kth(i);
        }
        Ok(Point::new(coords))
    }

    pub fn ideal_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        if self.directions.minimizes(dim) { self.index.min_element(dim) } else { self.index.max_element(dim) }
    }

    pub fn nadir_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        if self.directions.minimizes(dim) { self.index.max_element(dim) } else { self.index.min_element(dim) }
    }

    pub fn worst_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        self.nadir_element(dim)
    }

    /// `true` iff every key of `other` is strictly dominated by some key of
    /// `self`
    pub fn dominates(&self, other: &[Point<K, M>]) -> bool {
        other.iter().all(|q| self.iter().iter().any(|p| p.key.dominates(q, &self.directions)))
    }

    /// `true` iff every key of `other` is strictly dominated by some key of
    /// `self`
    pub fn strongly_dominates(&self, other: &[Point<K, M>]) -> bool {
        other.iter().all(|q| self.iter().iter().any(|p| p.key.strongly_dominates(q, &self.directions)))
    }

    /// `true` iff no key of either set dominates any key of the other
    pub fn non_dominates(&self, other: &[Point<K, M>]) -> bool {
        let mine = self.iter();
        mine.iter().all(|p| other.iter().all(|q| p.key.non_dominates(q, &self.directions)))
    }

    /// `true` iff some key of `other` dominates some key of `self`
    pub fn is_partially_dominated_by(&self, other: &[Point<K, M>]) -> bool {
        let mine = self.iter();
        other.iter().any(|q| mine.iter().any(|p| q.dominates(&p.key, &self.directions)))
    }

    /// `true` iff every key of `self` is dominated by some key of `other`
    pub fn is_completely_dominated_by(&self, other: &[Point<K, M>]) -> bool {
        let mine = self.iter();
        mine.iter().all(|p| other.iter().any(|q| q.dominates(&p.key, &self.directions)))
    }
}

impl<K, V, Idx, const M: usize> Clone for Front<K, V, Idx, M>
where
    Idx: SpatialIndex<K, V, M> + Clone,
    K: Scalar,
{
    fn clone(&self) -> Self {
        Self { index: self.index.clone(), directions: self.directions, _marker: PhantomData }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::flat::FlatIndex;

    type TestFront = Front<i64, &'static str, FlatIndex<i64, &'static str, 2>, 2>;

    #[test]
    fn test_scenario_a_minimize_antichain() {
        let mut front = TestFront::with_directions(Direction::all_minimize());
        assert!(front.insert(Point::new([1, 4]), "a"));
        assert!(front.insert(Point::new([2, 3]), "b"));
        assert!(front.insert(Point::new([3, 2]), "c"));
        assert!(front.insert(Point::new([4, 1]), "d"));
        assert!(front.insert(Point::new([2, 2]), "f"));
        assert_eq!(front.len(), 3);
        assert!(front.contains(&Point::new([1, 4])));
        assert!(front.contains(&Point::new([2, 2])));
        assert!(front.contains(&Point::new([4, 1])));
        assert!(!front.contains(&Point::new([2, 3])));
        assert!(!front.contains(&Point::new([3, 2])));
    }

    #[test]
    fn test_reject_when_dominated() {
        let mut front = TestFront::with_directions(Direction::all_minimize());
        assert!(front.insert(Point::new([1, 1]), "a"));
        assert!(!front.insert(Point::new([2, 2]), "b"));
        assert_eq!(front.len(), 1);
    }

    #[test]
    fn test_equal_key_replaces() {
        let mut front = TestFront::with_directions(Direction::all_minimize());
        front.insert(Point::new([1, 1]), "a");
        front.insert(Point::new([1, 1]), "a2");
        assert_eq!(front.len(), 1);
        assert_eq!(front.find(&Point::new([1, 1])).unwrap().value, "a2");
    }

    #[test]
    fn test_reference_points() {
        let mut front = TestFront::with_directions(Direction::all_minimize());
        front.insert(Point::new([1, 4]), "a");
        front.insert(Point::new([2, 3]), "b");
        front.insert(Point::new([4, 1]), "d");
        assert_eq!(front.ideal().unwrap(), Point::new([1, 1]));
        assert_eq!(front.nadir().unwrap(), Point::new([4, 4]));
        assert_eq!(front.worst().unwrap(), front.nadir().unwrap());
    }

    #[test]
    fn test_empty_reference_point_errs() {
        let front = TestFront::default();
        assert!(matches!(front.ideal(), Err(Error::EmptyContainer)));
    }
}
