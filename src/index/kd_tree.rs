//! `kd_tree` — a binary space partition cycling through the split
//! dimension `depth % M` (§4.3.2).
//!
//! Directly generalizes `do_util`'s `pareto_pq::kd_tree::KDTreeFront`: same
//! `Node { e, l, r, bounds }` shape, same `attach_left`/`attach_right`/
//! `compute_bounds` bookkeeping, same Hibbard-style `remove_link` recursion
//! — but keyed by a full `Entry<K, V, M>` multimap instead of a single
//! Pareto element, and with range/nearest queries added.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::mem::swap;

use crate::geometry::{Aabb, Point, Scalar};
use crate::predicate::{sort_predicates, Predicate};

use super::{Entry, SpatialIndex};

type Link<K, V, const M: usize> = Option<Box<Node<K, V, M>>>;

#[derive(Debug)]
struct Node<K, V, const M: usize> {
    entry: Entry<K, V, M>,
    left: Link<K, V, M>,
    right: Link<K, V, M>,
    bbox: Aabb<K, M>,
}

impl<K: Scalar, V, const M: usize> Node<K, V, M> {
    fn leaf(entry: Entry<K, V, M>) -> Self {
        let bbox = Aabb::from_point(entry.key);
        Self { entry, left: None, right: None, bbox }
    }

    fn update_bbox(&mut self) {
        let mut bbox = Aabb::from_point(self.entry.key);
        if let Some(n) = &self.left {
            bbox = bbox.stretch_box(&n.bbox);
        }
        if let Some(n) = &self.right {
            bbox = bbox.stretch_box(&n.bbox);
        }
        self.bbox = bbox;
    }
}

/// A kd-tree-backed spatial index.
#[derive(Debug)]
pub struct KdTree<K, V, const M: usize> {
    root: Link<K, V, M>,
    len: usize,
}

impl<K, V, const M: usize> Default for KdTree<K, V, M> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Scalar, V, const M: usize> KdTree<K, V, M> {
    fn rec_insert(link: &mut Link<K, V, M>, entry: Entry<K, V, M>, dim: usize) {
        match link {
            None => {
                *link = Some(Box::new(Node::leaf(entry)));
            }
            Some(node) => {
                let next_dim = (dim + 1) % M.max(1);
                if entry.key.kth(dim) < node.entry.key.kth(dim) {
                    Self::rec_insert(&mut node.left, entry, next_dim);
                } else {
                    Self::rec_insert(&mut node.right, entry, next_dim);
                }
                node.update_bbox();
            }
        }
    }

    /// finds the link holding a key equal to `key`, following the same
    /// routing rule insertion uses, short-circuiting as soon as an equal
    /// key is found on the path (mirrors `do_util`'s `rec_search`)
    fn rec_find_link<'a>(link: &'a mut Link<K, V, M>, key: &Point<K, M>, dim: usize) -> (&'a mut Link<K, V, M>, Option<usize>) {
        if link.is_none() {
            (link, None)
        } else if link.as_ref().unwrap().entry.key == *key {
            (link, Some(dim))
        } else {
            let next_dim = (dim + 1) % M.max(1);
            let go_left = key.kth(dim) < link.as_ref().unwrap().entry.key.kth(dim);
            if go_left {
                Self::rec_find_link(&mut link.as_mut().unwrap().left, key, next_dim)
            } else {
                Self::rec_find_link(&mut link.as_mut().unwrap().right, key, next_dim)
            }
        }
    }

    fn rec_find_link_ref<'a>(link: &'a Link<K, V, M>, key: &Point<K, M>, dim: usize) -> Option<&'a Node<K, V, M>> {
        let node = link.as_ref()?;
        if node.entry.key == *key {
            Some(node)
        } else {
            let next_dim = (dim + 1) % M.max(1);
            if key.kth(dim) < node.entry.key.kth(dim) {
                Self::rec_find_link_ref(&node.left, key, next_dim)
            } else {
                Self::rec_find_link_ref(&node.right, key, next_dim)
            }
        }
    }

    /// finds the link (and its split dimension) with the minimum `target_dim`
    /// coordinate in the subtree rooted at `link`, using bbox lower bounds to
    /// prune (mirrors `do_util`'s `mut_rec_search_minimum`)
    fn mut_rec_search_minimum(link: &mut Link<K, V, M>, dim: usize, target_dim: usize) -> (&mut Link<K, V, M>, Option<usize>) {
        match link {
            None => (link, None),
            Some(node) => {
                let v_e = node.entry.key.kth(target_dim);
                let v_l = node.left.as_ref().map(|n| n.bbox.min().kth(target_dim));
                let v_r = node.right.as_ref().map(|n| n.bbox.min().kth(target_dim));
                let next_dim = (dim + 1) % M.max(1);
                let go_left = matches!(v_l, Some(vl) if vl < v_e && v_r.map_or(true, |vr| vl < vr));
                let go_right = !go_left && matches!(v_r, Some(vr) if vr < v_e);
                if go_left {
                    Self::mut_rec_search_minimum(&mut link.as_mut().unwrap().left, next_dim, target_dim)
                } else if go_right {
                    Self::mut_rec_search_minimum(&mut link.as_mut().unwrap().right, next_dim, target_dim)
                } else {
                    (link, Some(dim))
                }
            }
        }
    }

    /// removes the single entry at `link` (whose split dimension is `dim`),
    /// rebalancing locally exactly as `do_util`'s `remove_link` does
    fn remove_link(link: &mut Link<K, V, M>, dim: usize) -> Option<Entry<K, V, M>> {
        let mut node = link.take()?;
        let next_dim = (dim + 1) % M.max(1);
        let result = match (node.left.take(), node.right.take()) {
            (None, None) => Some(node.entry),
            (left, mut right @ Some(_)) => {
                let (min_link, min_dim) = Self::mut_rec_search_minimum(&mut right, next_dim, dim);
                let min_dim = min_dim.unwrap();
                let mut replacement = Self::remove_link(min_link, min_dim).unwrap();
                swap(&mut replacement, &mut node.entry);
                node.left = left;
                node.right = right;
                node.update_bbox();
                *link = Some(node);
                Some(replacement)
            }
            (mut left @ Some(_), None) => {
                let mut right = None;
                swap(&mut right, &mut left);
                let (min_link, min_dim) = Self::mut_rec_search_minimum(&mut right, next_dim, dim);
                let min_dim = min_dim.unwrap();
                let mut replacement = Self::remove_link(min_link, min_dim).unwrap();
                swap(&mut replacement, &mut node.entry);
                node.right = right;
                node.update_bbox();
                *link = Some(node);
                Some(replacement)
            }
        };
        result
    }

    fn rec_iter<'a>(link: &'a Link<K, V, M>, out: &mut Vec<&'a Entry<K, V, M>>) {
        if let Some(node) = link {
            out.push(&node.entry);
            Self::rec_iter(&node.left, out);
            Self::rec_iter(&node.right, out);
        }
    }

    fn rec_query<'a>(link: &'a Link<K, V, M>, predicates: &[&Predicate<K, V, M>], out: &mut Vec<&'a Entry<K, V, M>>) {
        if let Some(node) = link {
            if predicates.iter().any(|p| !p.may_pass(&node.bbox)) {
                return;
            }
            if predicates.iter().all(|p| p.passes(&node.entry.key, &node.entry.value)) {
                out.push(&node.entry);
            }
            Self::rec_query(&node.left, predicates, out);
            Self::rec_query(&node.right, predicates, out);
        }
    }

    fn rec_drain(link: &mut Link<K, V, M>, out: &mut Vec<Entry<K, V, M>>) {
        if let Some(mut node) = link.take() {
            Self::rec_drain(&mut node.left, out);
            Self::rec_drain(&mut node.right, out);
            out.push(node.entry);
        }
    }
}

/// a candidate in the Hjaltason–Samet best-first nearest-neighbour queue:
/// either an unexplored subtree (keyed by the distance from the reference
/// point to its bounding box) or a concrete point (keyed by its own
/// distance), ordered so the closest candidate pops first
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
        // BinaryHeap is a max-heap; reverse so the smallest distance pops first
        other.dist.partial_cmp(&self.dist).unwrap_or(Ordering::Equal)
    }
}

impl<K: Scalar, V, const M: usize> SpatialIndex<K, V, M> for KdTree<K, V, M> {
    fn insert(&mut self, key: Point<K, M>, value: V) {
        Self::rec_insert(&mut self.root, Entry::new(key, value), 0);
        self.len += 1;
    }

    fn erase(&mut self, key: &Point<K, M>) -> usize {
        let mut count = 0;
        loop {
            let (link, dim) = Self::rec_find_link(&mut self.root, key, 0);
            match dim {
                Some(d) => {
                    Self::remove_link(link, d);
                    count += 1;
                    self.len -= 1;
                }
                None => break,
            }
        }
        count
    }

    fn find(&self, key: &Point<K, M>) -> Option<&Entry<K, V, M>> {
        Self::rec_find_link_ref(&self.root, key, 0).map(|n| &n.entry)
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
                    if let Some(left) = &node.left {
                        heap.push(HeapItem { dist: left.bbox.distance_to_point(reference), candidate: Candidate::Subtree(left) });
                    }
                    if let Some(right) = &node.right {
                        heap.push(HeapItem { dist: right.bbox.distance_to_point(reference), candidate: Candidate::Subtree(right) });
                    }
                }
                Candidate::Point(entry) => {
                    result.push(entry);
                }
            }
        }
        result
    }

    fn iter(&self) -> Vec<&Entry<K, V, M>> {
        let mut out = Vec::with_capacity(self.len);
        Self::rec_iter(&self.root, &mut out);
        out
    }

    fn max_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        fn rec<'a, K: Scalar, V, const M: usize>(link: &'a Link<K, V, M>, dim: usize) -> Option<&'a Entry<K, V, M>> {
            let node = link.as_ref()?;
            let mut best = &node.entry;
            if let Some(n) = &node.left {
                if n.bbox.max().kth(dim) > best.key.kth(dim) {
                    if let Some(candidate) = rec::<K, V, M>(&node.left, dim) {
                        if candidate.key.kth(dim) > best.key.kth(dim) {
                            best = candidate;
                        }
                    }
                }
            }
            if let Some(n) = &node.right {
                if n.bbox.max().kth(dim) > best.key.kth(dim) {
                    if let Some(candidate) = rec::<K, V, M>(&node.right, dim) {
                        if candidate.key.kth(dim) > best.key.kth(dim) {
                            best = candidate;
                        }
                    }
                }
            }
            Some(best)
        }
        rec::<K, V, M>(&self.root, dim)
    }

    fn min_element(&self, dim: usize) -> Option<&Entry<K, V, M>> {
        fn rec<'a, K: Scalar, V, const M: usize>(link: &'a Link<K, V, M>, dim: usize) -> Option<&'a Entry<K, V, M>> {
            let node = link.as_ref()?;
            let mut best = &node.entry;
            if let Some(n) = &node.left {
                if n.bbox.min().kth(dim) < best.key.kth(dim) {
                    if let Some(candidate) = rec::<K, V, M>(&node.left, dim) {
                        if candidate.key.kth(dim) < best.key.kth(dim) {
                            best = candidate;
                        }
                    }
                }
            }
            if let Some(n) = &node.right {
                if n.bbox.min().kth(dim) < best.key.kth(dim) {
                    if let Some(candidate) = rec::<K, V, M>(&node.right, dim) {
                        if candidate.key.kth(dim) < best.key.kth(dim) {
                            best = candidate;
                        }
                    }
                }
            }
            Some(best)
        }
        rec::<K, V, M>(&self.root, dim)
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
        Self::rec_drain(&mut self.root, &mut out);
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
        exercise_basic_contract::<KdTree<i64, &'static str, 2>>();
    }

    #[test]
    fn test_insert_and_find() {
        let mut t: KdTree<u16, &'static str, 2> = KdTree::default();
        t.insert(Point::new([0, 1]), "a");
        t.insert(Point::new([1, 0]), "b");
        t.insert(Point::new([2, 0]), "c");
        t.insert(Point::new([0, 0]), "d");
        assert!(t.find(&Point::new([0, 1])).is_some());
        assert!(t.find(&Point::new([1, 0])).is_some());
        assert!(t.find(&Point::new([1, 1])).is_none());
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn test_erase_restructures_correctly() {
        let mut t: KdTree<u16, i32, 2> = KdTree::default();
        t.insert(Point::new([10, 10]), 0);
        t.insert(Point::new([5, 5]), 1);
        t.insert(Point::new([20, 20]), 2);
        assert_eq!(t.erase(&Point::new([10, 10])), 1);
        assert!(t.find(&Point::new([10, 10])).is_none());
        assert!(t.find(&Point::new([5, 5])).is_some());
        assert!(t.find(&Point::new([20, 20])).is_some());
        assert_eq!(t.erase(&Point::new([20, 20])), 1);
        assert_eq!(t.erase(&Point::new([5, 5])), 1);
        assert!(t.is_empty());
    }

    #[test]
    fn test_duplicate_keys_are_multimap() {
        let mut t: KdTree<i64, i32, 1> = KdTree::default();
        t.insert(Point::new([1]), 10);
        t.insert(Point::new([1]), 20);
        assert_eq!(t.len(), 2);
        assert_eq!(t.erase(&Point::new([1])), 2);
        assert!(t.is_empty());
    }

    #[test]
    fn test_bbox_invariant_after_many_ops() {
        fn check_bbox<K: Scalar, V, const M: usize>(link: &Link<K, V, M>) {
            if let Some(node) = link {
                let mut expected = Aabb::from_point(node.entry.key);
                if let Some(n) = &node.left {
                    expected = expected.stretch_box(&n.bbox);
                }
                if let Some(n) = &node.right {
                    expected = expected.stretch_box(&n.bbox);
                }
                assert_eq!(expected, node.bbox);
                check_bbox(&node.left);
                check_bbox(&node.right);
            }
        }

        let mut t: KdTree<i64, usize, 3> = KdTree::default();
        let mut state = 12345_i64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 33) % 1000
        };
        let mut points = Vec::with_capacity(1000);
        for i in 0..1000 {
            let key = Point::new([i, next(), next()]);
            t.insert(key, i as usize);
            points.push(key);
        }
        check_bbox(&t.root);
        assert_eq!(t.len(), 1000);

        for (i, key) in points.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(t.erase(key), 1);
            }
        }
        check_bbox(&t.root);

        fn count_nodes<K: Scalar, V, const M: usize>(link: &Link<K, V, M>) -> usize {
            match link {
                None => 0,
                Some(node) => 1 + count_nodes(&node.left) + count_nodes(&node.right),
            }
        }

        assert_eq!(count_nodes(&t.root), 500);
        assert_eq!(t.len(), 500);
    }

    #[test]
    fn test_find_intersection_and_disjoint() {
        let mut t: KdTree<i64, i32, 2> = KdTree::default();
        for (p, v) in [([0, 0], 0), ([5, 5], 1), ([10, 10], 2), ([1, 9], 3)] {
            t.insert(Point::new(p), v);
        }
        let inter = t.find_intersection(&Point::new([0, 0]), &Point::new([5, 5]));
        let mut values: Vec<i32> = inter.iter().map(|e| e.value).collect();
        values.sort();
        assert_eq!(values, vec![0, 1]);

        let disj = t.find_disjoint(&Point::new([0, 0]), &Point::new([5, 5]));
        let mut values: Vec<i32> = disj.iter().map(|e| e.value).collect();
        values.sort();
        assert_eq!(values, vec![2, 3]);
    }

    #[test]
    fn test_find_nearest_order() {
        let mut t: KdTree<i64, i32, 2> = KdTree::default();
        for (p, v) in [([0, 10], 0), ([10, 5], 1), ([20, 0], 2)] {
            t.insert(Point::new(p), v);
        }
        let nearest = t.find_nearest(&Point::new([0, 0]), 3);
        let values: Vec<i32> = nearest.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn test_scenario_e_nearest_neighbor_insertion_order_invariant() {
        let points = [([3, 7], 0), ([1, 1], 1), ([9, 2], 2), ([4, 4], 3), ([8, 8], 4), ([2, 9], 5), ([6, 1], 6)];
        let reference = Point::new([5, 5]);

        let mut forward: KdTree<i64, i32, 2> = KdTree::default();
        for (p, v) in points {
            forward.insert(Point::new(p), v);
        }
        let mut reversed: KdTree<i64, i32, 2> = KdTree::default();
        for (p, v) in points.iter().rev() {
            reversed.insert(Point::new(*p), *v);
        }

        let mut forward_distances: Vec<f64> = forward.find_nearest(&reference, points.len()).iter().map(|e| reference.distance(&e.key)).collect();
        let mut reversed_distances: Vec<f64> = reversed.find_nearest(&reference, points.len()).iter().map(|e| reference.distance(&e.key)).collect();
        forward_distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        reversed_distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(forward_distances, reversed_distances);
    }

    #[test]
    fn test_max_min_element() {
        let mut t: KdTree<i64, i32, 2> = KdTree::default();
        for (p, v) in [([0, 10], 0), ([10, 5], 1), ([20, 0], 2)] {
            t.insert(Point::new(p), v);
        }
        assert_eq!(t.max_element(0).unwrap().value, 2);
        assert_eq!(t.min_element(0).unwrap().value, 0);
        assert_eq!(t.max_element(1).unwrap().value, 0);
        assert_eq!(t.min_element(1).unwrap().value, 2);
    }
}
