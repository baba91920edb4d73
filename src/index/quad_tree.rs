//! `quad_tree` — a point quadtree: each node partitions space into `2^M`
//! quadrants relative to its own key, one per combination of "at or past"
//! versus "before" along every axis (§4.3.3).
//!
//! Generalizes the same `Node { entry, children, bbox }` bookkeeping
//! `kd_tree` uses, but fans out through [`Point::quadrant`] instead of a
//! single cycling split dimension. Erasure of an internal node falls back
//! to collecting and reinserting its whole subtree rather than `kd_tree`'s
//! Hibbard-style single-node splice, since a point quadtree has no single
//! child that can safely take over a deleted node's quadrant bucket.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::{sort_predicates, Predicate};

use super::{Entry, SpatialIndex};

type Link<K, V, const M: usize> = Option<Box<Node<K, V, M>>>;

#[derive(Debug)]
struct Node<K, V, const M: usize> {
    entry: Entry<K, V, M>,
    children: Vec<Link<K, V, M>>,
    bbox: Aabb<K, M>,
}

impl<K: Scalar, V, const M: usize> Node<K, V, M> {
    fn leaf(entry: Entry<K, V, M>) -> Self {
        let bbox = Aabb::from_point(entry.key);
        Self { entry, children: Self::empty_children(), bbox }
    }

    fn empty_children() -> Vec<Link<K, V, M>> {
        (0..(1usize << M)).map(|_| None).collect()
    }

    fn update_bbox(&mut self) {
        let mut bbox = Aabb::from_point(self.entry.key);
        for child in self.children.iter().flatten() {
            bbox = bbox.stretch_box(&child.bbox);
        }
        self.bbox = bbox;
    }
}

/// A point-quadtree-backed spatial index.
#[derive(Debug)]
pub struct QuadTree<K, V, const M: usize> {
    root: Link<K, V, M>,
    len: usize,
}

impl<K, V, const M: usize> Default for QuadTree<K, V, M> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Scalar, V, const M: usize> QuadTree<K, V, M> {
    fn rec_insert(link: &mut Link<K, V, M>, entry: Entry<K, V, M>) {
        match link {
            None => *link = Some(Box::new(Node::leaf(entry))),
            Some(node) => {
                let q = entry.key.quadrant(&node.entry.key);
                Self::rec_insert(&mut node.children[q], entry);
                node.update_bbox();
            }
        }
    }

    fn rec_find_ref<'a>(link: &'a Link<K, V, M>, key: &Point<K, M>) -> Option<&'a Node<K, V, M>> {
        let node = link.as_ref()?;
        if node.entry.key == *key {
            Some(node)
        } else {
            let q = key.quadrant(&node.entry.key);
            Self::rec_find_ref(&node.children[q], key)
        }
    }

    fn rec_find_link<'a>(link: &'a mut Link<K, V, M>, key: &Point<K, M>) -> Option<&'a mut Link<K, V, M>> {
        if link.is_none() {
            return None;
        }
        if link.as_ref().unwrap().entry.key == *key {
            return Some(link);
        }
        let q = key.quadrant(&link.as_ref().unwrap().entry.key);
        Self::rec_find_link(&mut link.as_mut().unwrap().children[q], key)
    }

    fn rec_collect_owned(link: &mut Link<K, V, M>, out: &mut Vec<Entry<K, V, M>>) {
        if let Some(mut node) = link.take() {
            for child in node.children.iter_mut() {
                Self::rec_collect_owned(child, out);
            }
            out.push(node.entry);
        }
    }

    /// reinserts `entries` into `link` median-first (§4.3.3): the median by
    /// first-coordinate order seeds the subtree root, and the rest are
    /// partitioned into the `2^M` quadrant buckets that median routes them
    /// to and recursively reinserted the same way, so the rebuilt subtree
    /// stays balanced instead of degenerating into the collection order
    fn rec_insert_median_first(link: &mut Link<K, V, M>, mut entries: Vec<Entry<K, V, M>>) {
        if entries.is_empty() {
            return;
        }
        entries.sort_by(|a, b| a.key.kth(0).partial_cmp(&b.key.kth(0)).unwrap_or(Ordering::Equal));
        let median = entries.remove(entries.len() / 2);
        let median_key = median.key;
        Self::rec_insert(link, median);
        let mut buckets: Vec<Vec<Entry<K, V, M>>> = (0..(1usize << M)).map(|_| Vec::new()).collect();
        for e in entries {
            buckets[e.key.quadrant(&median_key)].push(e);
        }
        if let Some(node) = link {
            for (q, bucket) in buckets.into_iter().enumerate() {
                Self::rec_insert_median_first(&mut node.children[q], bucket);
            }
            node.update_bbox();
        }
    }

    /// removes the node at `link` (which may have a whole subtree below it)
    /// by collecting its descendants and bulk-reinserting them median-first
    fn remove_at(link: &mut Link<K, V, M>) -> Entry<K, V, M> {
        let mut node = link.take().unwrap();
        let mut rest = Vec::new();
        for child in node.children.iter_mut() {
            Self::rec_collect_owned(child, &mut rest);
        }
        Self::rec_insert_median_first(link, rest);
        node.entry
    }

    fn rec_query<'a>(link: &'a Link<K, V, M>, predicates: &[&Predicate<K, V, M>], out: &mut Vec<&'a Entry<K, V, M>>) {
        if let Some(node) = link {
            if predicates.iter().any(|p| !p.may_pass(&node.bbox)) {
                return;
            }
            if predicates.iter().all(|p| p.passes(&node.entry.key, &node.entry.value)) {
                out.push(&node.entry);
            }
            for child in node.children.iter() {
                Self::rec_query(child, predicates, out);
            }
        }
    }

    fn rec_iter<'a>(link: &'a Link<K, V, M>, out: &mut Vec<&'a Entry<K, V, M>>) {
        if let Some(node) = link {
            out.push(&node.entry);
            for child in node.children.iter() {
                Self::rec_iter(child, out);
            }
        }
    }
}

enum Candidate<'a, K, V, const M: usize> {
    Subtree(&'a Node<K, V, M>),
    Point(&'a Entry<K, V, M>),
}

struct HeapItem<'a, K, V, const M: usize> {
    dist: f64,
    candidate: Candidate<'a, K, V, M>,
}

impl<K, V, const M: usize> PartialEq for HeapItem<'_, K, V, M> {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist
    }
}
impl<K, V, const M: usize> Eq for HeapItem<'_, K, V, M> {}
impl<K, V, const M: usize> PartialOrd for HeapItem<'_, K, V, M> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<K, V, const M: usize> Ord for HeapItem<'_, K, V, M> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}

impl<K: Scalar, V, const M: usize> SpatialIndex<K, V, M> for QuadTree<K, V, M> {
    fn insert(&mut self, key: Point<K, M>, value: V) {
        Self::rec_insert(&mut self.root, Entry::new(key, value));
        self.len += 1;
    }

    fn erase(&mut self, key: &Point<K, M>) -> usize {
        let mut count = 0;
        while let Some(link) = Self::rec_find_link(&mut self.root, key) {
            Self::remove_at(link);
            count += 1;
            self.len -= 1;
        }
        count
    }

    fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        Self::rec_find_ref(&self.root, key).map(|n| &n.entry)
    }

    fn query(&self, predicates: &[Predicate<K, V, M>]) -> Vec<&Entry<K, V, M>> {
        let mut sortable: Vec<Predicate<K, V, M>> = predicates.iter().map(Predicate::clone).collect();
        if let Some(root) = &self.root {
            sort_predicates(&mut sortable, &root.bbox);
        }
        let refs: Vec<&Predicate<K, V, M>> = sortable.iter().collect();
        let mut out = Vec::new();
        Self::rec_query(&self.root, &refs, &mut out);
        out
    }

    fn find_nearest(&self, reference: &Point<K, M>, k: usize) -> Vec<&Entry<K, V, M>> {
        if k == 0 || self.root.is_none() {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapItem<K, V, M>> = BinaryHeap::new();
        if let Some(root) = &self.root {
            heap.push(HeapItem { dist: root.bbox.distance_to_point(reference), candidate: Candidate::Subtree(root) });
        }
        let mut result = Vec::with_capacity(k);
        while let Some(item) = heap.pop() {
            if result.len() >= k {
                break;
            }
            match item.candidate {
                Candidate::Subtree(node) => {
                    heap.push(HeapItem { dist: reference.distance(&node.entry.key), candidate: Candidate::Point(&node.entry) });
                    for child in node.children.iter().flatten() {
                        heap.push(HeapItem { dist: child.bbox.distance_to_point(reference), candidate: Candidate::Subtree(child) });
                    }
                }
                Candidate::Point(entry) => result.push(entry),
            }
        }
        result
    }

    fn iter(&self) -> Vec<&Entry<K, V, M>> {
        let mut out = Vec::with_capacity(self.len);
        Self::rec_iter(&self.root, &mut out);
        out
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }

    fn drain(&mut self) -> Vec<Entry<K, V, M>> {
        let mut out = Vec::with_capacity(self.len);
        Self::rec_collect_owned(&mut self.root, &mut out);
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
        exercise_basic_contract::<QuadTree<i64, &'static str, 2>>();
    }

    #[test]
    fn test_quadrant_routing() {
        let mut t: QuadTree<i64, i32, 2> = QuadTree::default();
        t.insert(Point::new([0, 0]), 0);
        t.insert(Point::new([5, 5]), 1);
        t.insert(Point::new([-5, -5]), 2);
        t.insert(Point::new([5, -5]), 3);
        assert_eq!(t.len(), 4);
        for (p, v) in [([0, 0], 0), ([5, 5], 1), ([-5, -5], 2), ([5, -5], 3)] {
            assert_eq!(t.find(&Point::new(p)).unwrap().value, v);
        }
    }

    #[test]
    fn test_erase_internal_node_reinserts_subtree() {
        let mut t: QuadTree<i64, i32, 2> = QuadTree::default();
        for (p, v) in [([0, 0], 0), ([5, 5], 1), ([10, 10], 2), ([-5, 5], 3), ([3, 3], 4)] {
            t.insert(Point::new(p), v);
        }
        assert_eq!(t.erase(&Point::new([0, 0])), 1);
        assert_eq!(t.len(), 4);
        assert!(t.find(&Point::new([0, 0])).is_none());
        for (p, v) in [([5, 5], 1), ([10, 10], 2), ([-5, 5], 3), ([3, 3], 4)] {
            assert_eq!(t.find(&Point::new(p)).unwrap().value, v);
        }
    }

    #[test]
    fn test_find_within() {
        let mut t: QuadTree<i64, i32, 2> = QuadTree::default();
        for (p, v) in [([0, 0], 0), ([2, 2], 1), ([8, 8], 2)] {
            t.insert(Point::new(p), v);
        }
        let within = t.find_within(&Point::new([0, 0]), &Point::new([3, 3]));
        let mut values: Vec<i32> = within.iter().map(|e| e.value).collect();
        values.sort();
        assert_eq!(values, vec![0, 1]);
    }
}
