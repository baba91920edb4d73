//! `r_tree` — a classic Guttman R-tree: entries live only in leaves,
//! internal nodes hold between `MIN_FILL` and `MAX_FILL` children each
//! carrying its own bounding box (§4.3.4).
//!
//! `MAX_FILL` is a compile-time parameter (default 8, matching a typical
//! 4..16 fanout); `MIN_FILL` is derived as `(MAX_FILL + 1) / 2`. Overflow is
//! resolved with quadratic split (pick the two seeds maximizing dead space,
//! then distribute the rest by enlargement preference). Underflow is
//! resolved by condensing the tree: any node that drops below `MIN_FILL`
//! has its remaining entries pulled out and reinserted from the root,
//! rather than borrowing from a sibling.
//!
//! `Child`, `RNode`, `min_fill`, and `RNode`'s node-walking helpers
//! (`bbox`, `rec_find`, `condense`, `collect_all`, `rec_query`, `rec_iter`,
//! `rec_extrema`) plus the nearest-neighbour `Candidate`/`HeapItem` heap
//! machinery are `pub(crate)`: `r_star_tree` shares this exact node shape
//! rather than redeclaring it, since the two trees differ only in
//! choose-subtree, split, and (for R*) forced reinsertion.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::{sort_predicates, Predicate};

use super::{Entry, SpatialIndex};

#[derive(Debug)]
pub(crate) struct Child<K, V, const M: usize, const MAX_FILL: usize> {
    pub(crate) bbox: Aabb<K, M>,
    pub(crate) node: Box<RNode<K, V, M, MAX_FILL>>,
}

#[derive(Debug)]
pub(crate) enum RNode<K, V, const M: usize, const MAX_FILL: usize> {
    Leaf(Vec<Entry<K, V, M>>),
    Internal(Vec<Child<K, V, M, MAX_FILL>>),
}

pub(crate) const fn min_fill(max_fill: usize) -> usize {
    (max_fill + 1) / 2
}

/// An R-tree-backed spatial index with leaf fanout bounded by `MAX_FILL`.
#[derive(Debug)]
pub struct RTree<K, V, const M: usize, const MAX_FILL: usize = 8> {
    root: Option<Box<RNode<K, V, M, MAX_FILL>>>,
    root_bbox: Option<Aabb<K, M>>,
    len: usize,
}

impl<K, V, const M: usize, const MAX_FILL: usize> Default for RTree<K, V, M, MAX_FILL> {
    fn default() -> Self {
        Self { root: None, root_bbox: None, len: 0 }
    }
}

/// distributes `items` into two groups via Guttman's quadratic-cost
/// algorithm, respecting `min_fill` on both sides
fn quadratic_split<K: Scalar, const M: usize, T>(mut items: Vec<T>, bbox_of: impl Fn(&T) -> Aabb<K, M>, min_fill: usize) -> (Vec<T>, Vec<T>) {
    let n = items.len();
    let mut seeds = (0usize, 1usize, f64::MIN);
    for i in 0..n {
        for j in (i + 1)..n {
            let bi = bbox_of(&items[i]);
            let bj = bbox_of(&items[j]);
            let dead_space = bi.stretch_box(&bj).volume() - bi.volume() - bj.volume();
            if dead_space > seeds.2 {
                seeds = (i, j, dead_space);
            }
        }
    }
    let (lo, hi) = if seeds.0 < seeds.1 { (seeds.0, seeds.1) } else { (seeds.1, seeds.0) };
    let seed_hi = items.remove(hi);
    let seed_lo = items.remove(lo);
    let mut bbox_a = bbox_of(&seed_lo);
    let mut bbox_b = bbox_of(&seed_hi);
    let mut group_a = vec![seed_lo];
    let mut group_b = vec![seed_hi];
    let mut remaining = items;

    while !remaining.is_empty() {
        if group_a.len() + remaining.len() == min_fill {
            group_a.extend(remaining);
            break;
        }
        if group_b.len() + remaining.len() == min_fill {
            group_b.extend(remaining);
            break;
        }
        let mut pick = 0usize;
        let mut pick_enl_a = 0.0;
        let mut pick_enl_b = 0.0;
        let mut best_pref = f64::MIN;
        for (idx, item) in remaining.iter().enumerate() {
            let b = bbox_of(item);
            let enl_a = bbox_a.enlargement(&b);
            let enl_b = bbox_b.enlargement(&b);
            let pref = (enl_a - enl_b).abs();
            if pref > best_pref {
                best_pref = pref;
                pick = idx;
                pick_enl_a = enl_a;
                pick_enl_b = enl_b;
            }
        }
        let item = remaining.remove(pick);
        let b = bbox_of(&item);
        let goes_a = match pick_enl_a.partial_cmp(&pick_enl_b).unwrap_or(Ordering::Equal) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => match bbox_a.volume().partial_cmp(&bbox_b.volume()).unwrap_or(Ordering::Equal) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => group_a.len() <= group_b.len(),
            },
        };
        if goes_a {
            bbox_a = bbox_a.stretch_box(&b);
            group_a.push(item);
        } else {
            bbox_b = bbox_b.stretch_box(&b);
            group_b.push(item);
        }
    }
    (group_a, group_b)
}

impl<K: Scalar, V, const M: usize, const MAX_FILL: usize> RNode<K, V, M, MAX_FILL> {
    /// the union bounding box of a node's immediate contents; cheap since it
    /// only reads the already-maintained bboxes of direct children
    pub(crate) fn bbox(&self) -> Aabb<K, M> {
        match self {
            RNode::Leaf(entries) => {
                let mut iter = entries.iter();
                let mut bbox = Aabb::from_point(iter.next().expect("attached leaf is never empty").key);
                for e in iter {
                    bbox = bbox.stretch_point(&e.key);
                }
                bbox
            }
            RNode::Internal(children) => {
                let mut iter = children.iter();
                let mut bbox = iter.next().expect("attached internal node is never empty").bbox;
                for c in iter {
                    bbox = bbox.stretch_box(&c.bbox);
                }
                bbox
            }
        }
    }

    pub(crate) fn rec_find<'a>(node: &'a RNode<K, V, M, MAX_FILL>, key: &Point<K, M>) -> Option<&'a Entry<K, V, M>> {
        match node {
            RNode::Leaf(entries) => entries.iter().find(|e| e.key == *key),
            RNode::Internal(children) => children
                .iter()
                .filter(|c| c.bbox.contains_point(key))
                .find_map(|c| Self::rec_find(&c.node, key)),
        }
    }

    /// drops `entries`/`children` matching `key` bottom-up, moving the
    /// remainder of any node left below `MIN_FILL` into `orphans`; returns
    /// `true` iff the caller should keep this node
    pub(crate) fn condense(node: &mut RNode<K, V, M, MAX_FILL>, key: &Point<K, M>, removed: &mut usize, orphans: &mut Vec<Entry<K, V, M>>) -> bool {
        let threshold = min_fill(MAX_FILL);
        match node {
            RNode::Leaf(entries) => {
                let before = entries.len();
                entries.retain(|e| e.key != *key);
                *removed += before - entries.len();
                if entries.is_empty() {
                    false
                } else if entries.len() < threshold {
                    orphans.append(entries);
                    false
                } else {
                    true
                }
            }
            RNode::Internal(children) => {
                let mut kept = Vec::new();
                for mut child in children.drain(..) {
                    if Self::condense(child.node.as_mut(), key, removed, orphans) {
                        child.bbox = child.node.bbox();
                        kept.push(child);
                    }
                }
                *children = kept;
                if children.is_empty() {
                    false
                } else if children.len() < threshold {
                    for child in children.drain(..) {
                        Self::collect_all(*child.node, orphans);
                    }
                    false
                } else {
                    true
                }
            }
        }
    }

    pub(crate) fn collect_all(node: RNode<K, V, M, MAX_FILL>, orphans: &mut Vec<Entry<K, V, M>>) {
        match node {
            RNode::Leaf(entries) => orphans.extend(entries),
            RNode::Internal(children) => {
                for child in children {
                    Self::collect_all(*child.node, orphans);
                }
            }
        }
    }

    pub(crate) fn rec_query<'a>(node: &'a RNode<K, V, M, MAX_FILL>, predicates: &[&Predicate<K, V, M>], out: &mut Vec<&'a Entry<K, V, M>>) {
        match node {
            RNode::Leaf(entries) => {
                for e in entries {
                    if predicates.iter().all(|p| p.passes(&e.key, &e.value)) {
                        out.push(e);
                    }
                }
            }
            RNode::Internal(children) => {
                for child in children {
                    if predicates.iter().all(|p| p.may_pass(&child.bbox)) {
                        Self::rec_query(&child.node, predicates, out);
                    }
                }
            }
        }
    }

    pub(crate) fn rec_iter<'a>(node: &'a RNode<K, V, M, MAX_FILL>, out: &mut Vec<&'a Entry<K, V, M>>) {
        match node {
            RNode::Leaf(entries) => out.extend(entries.iter()),
            RNode::Internal(children) => {
                for child in children {
                    Self::rec_iter(&child.node, out);
                }
            }
        }
    }

    pub(crate) fn rec_extrema<'a>(node: &'a RNode<K, V, M, MAX_FILL>, dim: usize, maximize: bool, best: &mut Option<&'a Entry<K, V, M>>) {
        match node {
            RNode::Leaf(entries) => {
                for e in entries {
                    let better = match best {
                        None => true,
                        Some(b) => {
                            if maximize {
                                e.key.kth(dim) > b.key.kth(dim)
                            } else {
                                e.key.kth(dim) < b.key.kth(dim)
                            }
                        }
                    };
                    if better {
                        *best = Some(e);
                    }
                }
            }
            RNode::Internal(children) => {
                for child in children {
                    let bound = if maximize { child.bbox.max().kth(dim) } else { child.bbox.min().kth(dim) };
                    let worth_descending = match best {
                        None => true,
                        Some(b) => {
                            if maximize {
                                bound > b.key.kth(dim)
                            } else {
                                bound < b.key.kth(dim)
                            }
                        }
                    };
                    if worth_descending {
                        Self::rec_extrema(&child.node, dim, maximize, best);
                    }
                }
            }
        }
    }
}

impl<K: Scalar, V, const M: usize, const MAX_FILL: usize> RTree<K, V, M, MAX_FILL> {
    fn choose_subtree(children: &[Child<K, V, M, MAX_FILL>], point: &Point<K, M>) -> usize {
        let mut best = 0;
        let mut best_enlargement = f64::MAX;
        let mut best_volume = f64::MAX;
        for (idx, child) in children.iter().enumerate() {
            let enlargement = child.bbox.stretch_point(point).volume() - child.bbox.volume();
            let volume = child.bbox.volume();
            if enlargement < best_enlargement || (enlargement == best_enlargement && volume < best_volume) {
                best = idx;
                best_enlargement = enlargement;
                best_volume = volume;
            }
        }
        best
    }

    /// inserts `entry` into the subtree rooted at `node`, returning a split
    /// sibling (bbox, node) when `node` overflowed `MAX_FILL`
    fn insert_rec(node: &mut RNode<K, V, M, MAX_FILL>, entry: Entry<K, V, M>) -> Option<(Aabb<K, M>, Box<RNode<K, V, M, MAX_FILL>>)> {
        match node {
            RNode::Leaf(entries) => {
                entries.push(entry);
                if entries.len() > MAX_FILL {
                    let items = std::mem::take(entries);
                    let (a, b) = quadratic_split(items, |e: &Entry<K, V, M>| Aabb::from_point(e.key), min_fill(MAX_FILL));
                    *entries = a;
                    let sibling = RNode::Leaf(b);
                    let bbox = sibling.bbox();
                    Some((bbox, Box::new(sibling)))
                } else {
                    None
                }
            }
            RNode::Internal(children) => {
                let idx = Self::choose_subtree(children, &entry.key);
                let split = Self::insert_rec(children[idx].node.as_mut(), entry);
                children[idx].bbox = children[idx].node.bbox();
                if let Some((bbox, sibling)) = split {
                    children.push(Child { bbox, node: sibling });
                }
                if children.len() > MAX_FILL {
                    let items = std::mem::take(children);
                    let (a, b) = quadratic_split(items, |c: &Child<K, V, M, MAX_FILL>| c.bbox, min_fill(MAX_FILL));
                    *children = a;
                    let sibling = RNode::Internal(b);
                    let bbox = sibling.bbox();
                    Some((bbox, Box::new(sibling)))
                } else {
                    None
                }
            }
        }
    }

    /// structural-only insert used both for the public `insert` and for
    /// reinserting entries orphaned by underflow during `erase`
    fn insert_entry(root: &mut Option<Box<RNode<K, V, M, MAX_FILL>>>, entry: Entry<K, V, M>) {
        match root {
            None => *root = Some(Box::new(RNode::Leaf(vec![entry]))),
            Some(r) => {
                let split = Self::insert_rec(r.as_mut(), entry);
                if let Some((bbox, sibling)) = split {
                    let old = root.take().unwrap();
                    let old_bbox = old.bbox();
                    *root = Some(Box::new(RNode::Internal(vec![Child { bbox: old_bbox, node: old }, Child { bbox, node: sibling }])));
                }
            }
        }
    }

}

pub(crate) enum Candidate<'a, K, V, const M: usize, const MAX_FILL: usize> {
    Subtree(&'a RNode<K, V, M, MAX_FILL>),
    Point(&'a Entry<K, V, M>),
}

pub(crate) struct HeapItem<'a, K, V, const M: usize, const MAX_FILL: usize> {
    pub(crate) dist: f64,
    pub(crate) candidate: Candidate<'a, K, V, M, MAX_FILL>,
}

impl<K, V, const M: usize, const MAX_FILL: usize> PartialEq for HeapItem<'_, K, V, M, MAX_FILL> {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}
impl<K, V, const M: usize, const MAX_FILL: usize> Eq for HeapItem<'_, K, V, M, MAX_FILL> {}
impl<K, V, const M: usize, const MAX_FILL: usize> PartialOrd for HeapItem<'_, K, V, M, MAX_FILL> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<K, V, const M: usize, const MAX_FILL: usize> Ord for HeapItem<'_, K, V, M, MAX_FILL> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}

impl<K: Scalar, V, const M: usize, const MAX_FILL: usize> SpatialIndex<K, V, M> for RTree<K, V, M, MAX_FILL> {
    fn insert(&mut self, key: Point<K, M>, value: V) {
        Self::insert_entry(&mut self.root, Entry::new(key, value));
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
            Self::insert_entry(&mut self.root, e);
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
        exercise_basic_contract::<RTree<i64, &'static str, 2>>();
    }

    #[test]
    fn test_split_on_overflow() {
        let mut t: RTree<i64, i32, 2, 4> = RTree::default();
        for i in 0..20 {
            t.insert(Point::new([i, i * 2]), i as i32);
        }
        assert_eq!(t.len(), 20);
        for i in 0..20 {
            assert_eq!(t.find(&Point::new([i, i * 2])).unwrap().value, i as i32);
        }
    }

    #[test]
    fn test_erase_condenses_underflow() {
        let mut t: RTree<i64, i32, 2, 4> = RTree::default();
        for i in 0..30 {
            t.insert(Point::new([i, -i]), i as i32);
        }
        for i in 0..25 {
            assert_eq!(t.erase(&Point::new([i, -i])), 1);
        }
        assert_eq!(t.len(), 5);
        for i in 25..30 {
            assert!(t.find(&Point::new([i, -i])).is_some());
        }
    }

    #[test]
    fn test_find_intersection() {
        let mut t: RTree<i64, i32, 2, 4> = RTree::default();
        for (p, v) in [([0, 0], 0), ([5, 5], 1), ([10, 10], 2)] {
            t.insert(Point::new(p), v);
        }
        let found = t.find_intersection(&Point::new([0, 0]), &Point::new([6, 6]));
        let mut values: Vec<i32> = found.iter().map(|e| e.value).collect();
        values.sort();
        assert_eq!(values, vec![0, 1]);
    }

    #[test]
    fn test_find_nearest() {
        let mut t: RTree<i64, i32, 2, 4> = RTree::default();
        for (p, v) in [([0, 10], 0), ([10, 5], 1), ([20, 0], 2)] {
            t.insert(Point::new(p), v);
        }
        let nearest = t.find_nearest(&Point::new([0, 0]), 2);
        let values: Vec<i32> = nearest.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0, 1]);
    }
}
