//! `r_star_tree` — same leaf/internal node shape as `r_tree`, with three
//! differences from Guttman's original (§4.3.5): choose-subtree prefers
//! minimum overlap enlargement near the leaves, overflow is resolved by a
//! topological (sort-by-axis) split instead of quadratic split, and the
//! first overflow encountered during an insertion triggers forced
//! reinsertion of its farthest entries instead of an immediate split.
//!
//! Forced reinsertion here is restricted to leaf-level overflow — the case
//! the original R*-tree paper motivates it with — and applied once per
//! insertion rather than once per level per insertion; internal-node
//! overflow always resolves via the topological split. Condensing on erase
//! follows the same collect-and-reinsert-from-root approach as `r_tree`.
//!
//! The leaf/internal node shape (`Child`, `RNode`, `min_fill`) and the
//! node-walking helpers (`bbox`, `rec_find`, `condense`, `collect_all`,
//! `rec_query`, `rec_iter`, `rec_extrema`, the nearest-neighbour
//! `Candidate`/`HeapItem` heap) are reused directly from `r_tree` rather
//! than redeclared here — only choose-subtree, split, and forced
//! reinsertion differ between the two trees.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::{sort_predicates, Predicate};

use super::r_tree::{min_fill, Candidate, Child, HeapItem, RNode};
use super::{Entry, SpatialIndex};

/// An R*-tree-backed spatial index with leaf fanout bounded by `MAX_FILL`.
#[derive(Debug)]
pub struct RStarTree<K, V, const M: usize, const MAX_FILL: usize = 8> {
    root: Option<Box<RNode<K, V, M, MAX_FILL>>>,
    root_bbox: Option<Aabb<K, M>>,
    len: usize,
}

impl<K, V, const M: usize, const MAX_FILL: usize> Default for RStarTree<K, V, M, MAX_FILL> {
    fn default() -> Self {
        Self { root: None, root_bbox: None, len: 0 }
    }
}

enum Outcome<K, V, const M: usize, const MAX_FILL: usize> {
    None,
    Split(Aabb<K, M>, Box<RNode<K, V, M, MAX_FILL>>),
    Reinsert(Vec<Entry<K, V, M>>),
}

fn union_bbox<K: Scalar, const M: usize, T>(idxs: &[usize], items: &[T], bbox_of: &impl Fn(&T) -> Aabb<K, M>) -> Aabb<K, M> {
    let mut iter = idxs.iter();
    let mut bbox = bbox_of(&items[*iter.next().expect("split group is never empty")]);
    for &i in iter {
        bbox = bbox.stretch_box(&bbox_of(&items[i]));
    }
    bbox
}

/// a topological split: sorts `items` by both `min` and `max` per axis,
/// scores every candidate distribution by perimeter sum, picks the axis
/// minimizing that sum, then within it the distribution minimizing overlap
fn rstar_split<K: Scalar, const M: usize, T>(items: Vec<T>, bbox_of: impl Fn(&T) -> Aabb<K, M>, min_fill: usize, max_fill: usize) -> (Vec<T>, Vec<T>) {
    let n = items.len();
    let distributions = (max_fill as isize - 2 * min_fill as isize + 2).max(1) as usize;

    let mut best_axis = 0;
    let mut best_perimeter_sum = f64::MAX;
    for axis in 0..M {
        let mut axis_sum = 0.0;
        for by_max in [false, true] {
            let mut order: Vec<usize> = (0..n).collect();
            order.sort_by(|&a, &b| {
                let ka = if by_max { bbox_of(&items[a]).max().kth(axis) } else { bbox_of(&items[a]).min().kth(axis) };
                let kb = if by_max { bbox_of(&items[b]).max().kth(axis) } else { bbox_of(&items[b]).min().kth(axis) };
                ka.partial_cmp(&kb).unwrap_or(Ordering::Equal)
            });
            for k in 1..=distributions {
                let split_at = min_fill - 1 + k;
                if split_at == 0 || split_at >= n {
                    continue;
                }
                let b1 = union_bbox(&order[..split_at], &items, &bbox_of);
                let b2 = union_bbox(&order[split_at..], &items, &bbox_of);
                axis_sum += b1.perimeter() + b2.perimeter();
            }
        }
        if axis_sum < best_perimeter_sum {
            best_perimeter_sum = axis_sum;
            best_axis = axis;
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| bbox_of(&items[a]).min().kth(best_axis).partial_cmp(&bbox_of(&items[b]).min().kth(best_axis)).unwrap_or(Ordering::Equal));

    let mut best_split = min_fill.max(1);
    let mut best_overlap = f64::MAX;
    let mut best_area = f64::MAX;
    for k in 1..=distributions {
        let split_at = min_fill - 1 + k;
        if split_at == 0 || split_at >= n {
            continue;
        }
        let b1 = union_bbox(&order[..split_at], &items, &bbox_of);
        let b2 = union_bbox(&order[split_at..], &items, &bbox_of);
        let overlap = b1.overlap_volume(&b2);
        let area = b1.volume() + b2.volume();
        if overlap < best_overlap || (overlap == best_overlap && area < best_area) {
            best_overlap = overlap;
            best_area = area;
            best_split = split_at;
        }
    }

    let mut in_a = vec![false; n];
    for &i in &order[..best_split] {
        in_a[i] = true;
    }
    let mut group_a = Vec::with_capacity(best_split);
    let mut group_b = Vec::with_capacity(n - best_split);
    for (i, item) in items.into_iter().enumerate() {
        if in_a[i] {
            group_a.push(item);
        } else {
            group_b.push(item);
        }
    }
    (group_a, group_b)
}

fn distance_to_center<K: Scalar, const M: usize>(key: &Point<K, M>, center: &Point<f64, M>) -> f64 {
    let mut acc = 0.0;
    for i in 0..M {
        let d = key.kth(i).to_f64() - center.kth(i);
        acc += d * d;
    }
    acc.sqrt()
}

/// removes the `~30%` entries farthest from the node's bbox center,
/// returning them for reinsertion from the root
fn forced_reinsert<K: Scalar, const M: usize, V>(entries: &mut Vec<Entry<K, V, M>>, max_fill: usize) -> Vec<Entry<K, V, M>> {
    let mut bbox_iter = entries.iter();
    let mut bbox = Aabb::from_point(bbox_iter.next().expect("overflow implies non-empty").key);
    for e in bbox_iter {
        bbox = bbox.stretch_point(&e.key);
    }
    let center = bbox.center();
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| {
        let da = distance_to_center(&entries[a].key, &center);
        let db = distance_to_center(&entries[b].key, &center);
        db.partial_cmp(&da).unwrap_or(Ordering::Equal)
    });
    let p = ((max_fill * 3) / 10).max(1).min(entries.len());
    let farthest: std::collections::HashSet<usize> = order.into_iter().take(p).collect();
    let mut removed = Vec::with_capacity(p);
    let mut kept = Vec::with_capacity(entries.len() - p);
    for (i, e) in std::mem::take(entries).into_iter().enumerate() {
        if farthest.contains(&i) {
            removed.push(e);
        } else {
            kept.push(e);
        }
    }
    *entries = kept;
    removed
}

impl<K: Scalar, V, const M: usize, const MAX_FILL: usize> RStarTree<K, V, M, MAX_FILL> {
    fn choose_subtree(children: &[Child<K, V, M, MAX_FILL>], point: &Point<K, M>) -> usize {
        let near_leaves = matches!(children.first().map(|c| c.node.as_ref()), Some(RNode::Leaf(_)));
        if !near_leaves {
            let mut best = 0;
            let mut best_enl = f64::MAX;
            let mut best_vol = f64::MAX;
            for (idx, child) in children.iter().enumerate() {
                let enl = child.bbox.stretch_point(point).volume() - child.bbox.volume();
                let vol = child.bbox.volume();
                if enl < best_enl || (enl == best_enl && vol < best_vol) {
                    best = idx;
                    best_enl = enl;
                    best_vol = vol;
                }
            }
            return best;
        }
        let mut best = 0;
        let mut best_overlap_enl = f64::MAX;
        let mut best_area_enl = f64::MAX;
        let mut best_vol = f64::MAX;
        for (idx, child) in children.iter().enumerate() {
            let stretched = child.bbox.stretch_point(point);
            let mut overlap_before = 0.0;
            let mut overlap_after = 0.0;
            for (j, other) in children.iter().enumerate() {
                if j == idx {
                    continue;
                }
                overlap_before += child.bbox.overlap_volume(&other.bbox);
                overlap_after += stretched.overlap_volume(&other.bbox);
            }
            let overlap_enl = overlap_after - overlap_before;
            let area_enl = stretched.volume() - child.bbox.volume();
            let vol = child.bbox.volume();
            let better = overlap_enl < best_overlap_enl
                || (overlap_enl == best_overlap_enl && area_enl < best_area_enl)
                || (overlap_enl == best_overlap_enl && area_enl == best_area_enl && vol < best_vol);
            if better {
                best = idx;
                best_overlap_enl = overlap_enl;
                best_area_enl = area_enl;
                best_vol = vol;
            }
        }
        best
    }

    fn insert_rec(node: &mut RNode<K, V, M, MAX_FILL>, entry: Entry<K, V, M>, reinsert_used: &mut bool) -> Outcome<K, V, M, MAX_FILL> {
        match node {
            RNode::Leaf(entries) => {
                entries.push(entry);
                if entries.len() > MAX_FILL {
                    if !*reinsert_used {
                        *reinsert_used = true;
                        Outcome::Reinsert(forced_reinsert(entries, MAX_FILL))
                    } else {
                        let items = std::mem::take(entries);
                        let (a, b) = rstar_split(items, |e: &Entry<K, V, M>| Aabb::from_point(e.key), min_fill(MAX_FILL), MAX_FILL);
                        *entries = a;
                        let sibling = RNode::Leaf(b);
                        let bbox = sibling.bbox();
                        Outcome::Split(bbox, Box::new(sibling))
                    }
                } else {
                    Outcome::None
                }
            }
            RNode::Internal(children) => {
                let idx = Self::choose_subtree(children, &entry.key);
                let outcome = Self::insert_rec(children[idx].node.as_mut(), entry, reinsert_used);
                children[idx].bbox = children[idx].node.bbox();
                match outcome {
                    Outcome::None => Outcome::None,
                    Outcome::Reinsert(v) => Outcome::Reinsert(v),
                    Outcome::Split(bbox, sibling) => {
                        children.push(Child { bbox, node: sibling });
                        if children.len() > MAX_FILL {
                            let items = std::mem::take(children);
                            let (a, b) = rstar_split(items, |c: &Child<K, V, M, MAX_FILL>| c.bbox, min_fill(MAX_FILL), MAX_FILL);
                            *children = a;
                            let sibling = RNode::Internal(b);
                            let sibling_bbox = sibling.bbox();
                            Outcome::Split(sibling_bbox, Box::new(sibling))
                        } else {
                            Outcome::None
                        }
                    }
                }
            }
        }
    }

    fn insert_entry(root: &mut Option<Box<RNode<K, V, M, MAX_FILL>>>, entry: Entry<K, V, M>, reinsert_used: &mut bool) -> Vec<Entry<K, V, M>> {
        match root {
            None => {
                *root = Some(Box::new(RNode::Leaf(vec![entry])));
                Vec::new()
            }
            Some(r) => match Self::insert_rec(r.as_mut(), entry, reinsert_used) {
                Outcome::None => Vec::new(),
                Outcome::Reinsert(v) => v,
                Outcome::Split(bbox, sibling) => {
                    let old = root.take().unwrap();
                    let old_bbox = old.bbox();
                    *root = Some(Box::new(RNode::Internal(vec![Child { bbox: old_bbox, node: old }, Child { bbox, node: sibling }])));
                    Vec::new()
                }
            },
        }
    }
}

impl<K: Scalar, V, const M: usize, const MAX_FILL: usize> SpatialIndex<K, V, M> for RStarTree<K, V, M, MAX_FILL> {
    fn insert(&mut self, key: Point<K, M>, value: V) {
        let mut reinsert_used = false;
        let pending = Self::insert_entry(&mut self.root, Entry::new(key, value), &mut reinsert_used);
        for e in pending {
            let mut used = true;
            Self::insert_entry(&mut self.root, e, &mut used);
        }
        self.root_bbox = self.root.as_ref().map(|r| r.bbox());
        self.len += 1;
    }

    fn erase(&mut self, key: &Point<K, M>) -> usize {
        let mut removed = 0;
        let mut orphans = Vec::new();
        if let Some(mut root) = self.root.take() {
            if RNode::condense(root.as_mut(), key, &mut removed, &mut orphans) {
                self.root = Some(root);
            } else {
                RNode::collect_all(*root, &mut orphans);
            }
        }
        self.len -= removed;
        for e in orphans {
            let mut used = true;
            Self::insert_entry(&mut self.root, e, &mut used);
        }
        self.root_bbox = self.root.as_ref().map(|r| r.bbox());
        removed
    }

    fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        self.root.as_ref().and_then(|r| RNode::rec_find(r, key))
    }

    fn query(&self, predicates: &[Predicate<K, V, M>]) -> Vec<&Entry<K, V, M>> {
        let mut sortable: Vec<Predicate<K, V, M>> = predicates.iter().map(Predicate::clone).collect();
        if let Some(bbox) = &self.root_bbox {
            sort_predicates(&mut sortable, bbox);
        }
        let refs: Vec<&Predicate<K, V, M>> = sortable.iter().collect();
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            RNode::rec_query(root, &refs, &mut out);
        }
        out
    }

    fn find_nearest(&self, reference: &Point<K, M>, k: usize) -> Vec<&Entry<K, V, M>> {
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapItem<K, V, M, MAX_FILL>> = BinaryHeap::new();
        if let Some(root) = &self.root {
            let bbox = self.root_bbox.unwrap();
            heap.push(HeapItem { dist: bbox.distance_to_point(reference), candidate: Candidate::Subtree(root) });
        }
        let mut result = Vec::with_capacity(k);
        while let Some(item) = heap.pop() {
            if result.len() >= k {
                break;
            }
            match item.candidate {
                Candidate::Subtree(node) => match node {
                    RNode::Leaf(entries) => {
                        for e in entries {
                            heap.push(HeapItem { dist: reference.distance(&e.key), candidate: Candidate::Point(e) });
                        }
                    }
                    RNode::Internal(children) => {
                        for child in children {
                            heap.push(HeapItem { dist: child.bbox.distance_to_point(reference), candidate: Candidate::Subtree(&child.node) });
                        }
                    }
                },
                Candidate::Point(entry) => result.push(entry),
            }
        }
        result
    }

    fn iter(&self) -> Vec<&Entry<K, V, M>> {
        let mut out = Vec::with_capacity(self.len);
        if let Some(root) = &self.root {
            RNode::rec_iter(root, &mut out);
        }
        out
    }

    fn max_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        let mut best = None;
        if let Some(root) = &self.root {
            RNode::rec_extrema(root, dim, true, &mut best);
        }
        best
    }

    fn min_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        let mut best = None;
        if let Some(root) = &self.root {
            RNode::rec_extrema(root, dim, false, &mut best);
        }
        best
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.root = None;
        self.root_bbox = None;
        self.len = 0;
    }

    fn drain(&mut self) -> Vec<Entry<K, V, M>> {
        let mut out = Vec::with_capacity(self.len);
        if let Some(root) = self.root.take() {
            RNode::collect_all(*root, &mut out);
        }
        self.root_bbox = None;
        self.len = 0;
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::test_util::exercise_basic_contract;

    #[test]
    fn test_contract() {
        exercise_basic_contract::<RStarTree<i64, &'static str, 2>>();
    }

    #[test]
    fn test_forced_reinsertion_keeps_all_entries() {
        let mut t: RStarTree<i64, i32, 2, 4> = RStarTree::default();
        for i in 0..40 {
            t.insert(Point::new([i, i * 3 % 17]), i as i32);
        }
        assert_eq!(t.len(), 40);
        for i in 0..40 {
            assert_eq!(t.find(&Point::new([i, i * 3 % 17])).unwrap().value, i as i32);
        }
    }

    #[test]
    fn test_erase_after_forced_reinsertion() {
        let mut t: RStarTree<i64, i32, 2, 4> = RStarTree::default();
        for i in 0..30 {
            t.insert(Point::new([i, -i]), i as i32);
        }
        for i in 0..20 {
            assert_eq!(t.erase(&Point::new([i, -i])), 1);
        }
        assert_eq!(t.len(), 10);
        for i in 20..30 {
            assert!(t.find(&Point::new([i, -i])).is_some());
        }
    }

    #[test]
    fn test_find_nearest() {
        let mut t: RStarTree<i64, i32, 2, 4> = RStarTree::default();
        for (p, v) in [([0, 10], 0), ([10, 5], 1), ([20, 0], 2)] {
            t.insert(Point::new(p), v);
        }
        let nearest = t.find_nearest(&Point::new([0, 0]), 2);
        let values: Vec<i32> = nearest.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0, 1]);
    }
}
