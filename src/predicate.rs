//! The composable predicate list every spatial-index query runs through.

use std::rc::Rc;

use crate::geometry::{Aabb, Point, Scalar};

/// One filter in a query's predicate list.
///
/// Every variant answers two questions: [`Predicate::may_pass`] ("can any
/// point inside this subtree's bounding box still pass?", used to prune
/// subtrees) and [`Predicate::passes`] ("does this concrete point pass?").
/// `Nearest` is handled specially by the index's best-first traversal and
/// never appears in a sorted geometric predicate list.
pub enum Predicate<K, V, const M: usize> {
    /// keeps points whose box intersects the query box
    Intersects(Aabb<K, M>),
    /// keeps points whose box is within the query box
    Within(Aabb<K, M>),
    /// keeps points whose box is disjoint from the query box
    Disjoint(Aabb<K, M>),
    /// keeps points satisfying an arbitrary predicate over key and value
    Satisfies(Rc<dyn Fn(&Point<K, M>, &V) -> bool>),
    /// the k-nearest-neighbour predicate: not evaluated through `passes`,
    /// present only so callers can build a list containing it
    Nearest(Point<K, M>, usize),
}

impl<K: Scalar, V, const M: usize> Clone for Predicate<K, V, M> {
    fn clone(&self) -> Self {
        match self {
            Predicate::Intersects(b) => Predicate::Intersects(*b),
            Predicate::Within(b) => Predicate::Within(*b),
            Predicate::Disjoint(b) => Predicate::Disjoint(*b),
            Predicate::Satisfies(f) => Predicate::Satisfies(f.clone()),
            Predicate::Nearest(p, k) => Predicate::Nearest(*p, *k),
        }
    }
}

impl<K: Scalar, V, const M: usize> Predicate<K, V, M> {
    /// `true` if some point inside `node_bbox` could still pass this
    /// predicate — used to prune subtrees during traversal
    pub fn may_pass(&self, node_bbox: &Aabb<K, M>) -> bool {
        match self {
            Predicate::Intersects(b) => node_bbox.intersects(b),
            Predicate::Within(b) => node_bbox.intersects(b),
            Predicate::Disjoint(b) => !node_bbox.contains_box(b) || !b.contains_box(node_bbox),
            Predicate::Satisfies(_) => true,
            Predicate::Nearest(_, _) => true,
        }
    }

    /// `true` iff the whole subtree automatically passes without needing to
    /// check individual points — an optimization `within` and `disjoint`
    /// can take advantage of when the node bbox is entirely on one side of
    /// the query box
    pub fn always_passes(&self, node_bbox: &Aabb<K, M>) -> bool {
        match self {
            Predicate::Within(b) => b.contains_box(node_bbox),
            Predicate::Disjoint(b) => node_bbox.disjoint(b),
            _ => false,
        }
    }

    /// does the concrete point (with its associated value) pass?
    pub fn passes(&self, key: &Point<K, M>, value: &V) -> bool {
        match self {
            Predicate::Intersects(b) => b.contains_point(key),
            Predicate::Within(b) => b.contains_point(key),
            Predicate::Disjoint(b) => !b.contains_point(key),
            Predicate::Satisfies(f) => f(key, value),
            Predicate::Nearest(_, _) => true,
        }
    }

    /// restrictiveness score used to order the predicate list so the most
    /// restrictive predicate runs first (§4.2)
    pub fn restrictiveness(&self, root_bbox: &Aabb<K, M>) -> f64 {
        let root_volume = root_bbox.volume();
        match self {
            Predicate::Disjoint(b) => {
                if root_volume <= 0.0 {
                    0.0
                } else {
                    root_bbox.overlap_volume(b) / root_volume
                }
            }
            Predicate::Intersects(b) | Predicate::Within(b) => {
                if root_volume <= 0.0 {
                    1.0
                } else {
                    1.0 - root_bbox.overlap_volume(b) / root_volume
                }
            }
            Predicate::Satisfies(_) => 1.0,
            Predicate::Nearest(_, _) => f64::INFINITY,
        }
    }
}

/// sorts a predicate list by decreasing restrictiveness (most restrictive
/// first), leaving any `Nearest` predicate at the end since it is handled
/// by a dedicated traversal rather than by this list
pub fn sort_predicates<K: Scalar, V, const M: usize>(predicates: &mut [Predicate<K, V, M>], root_bbox: &Aabb<K, M>) {
    predicates.sort_by(|a, b| {
        b.restrictiveness(root_bbox)
            .partial_cmp(&a.restrictiveness(root_bbox))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_intersects_passes() {
        let p: Predicate<i64, (), 2> = Predicate::Intersects(Aabb::new(Point::new([0, 0]), Point::new([10, 10])));
        assert!(p.passes(&Point::new([5, 5]), &()));
        assert!(!p.passes(&Point::new([11, 5]), &()));
    }

    #[test]
    fn test_disjoint_passes() {
        let p: Predicate<i64, (), 2> = Predicate::Disjoint(Aabb::new(Point::new([0, 0]), Point::new([10, 10])));
        assert!(!p.passes(&Point::new([5, 5]), &()));
        assert!(p.passes(&Point::new([11, 5]), &()));
    }

    #[test]
    fn test_satisfies() {
        let f: Rc<dyn Fn(&Point<i64, 1>, &()) -> bool> = Rc::new(|k: &Point<i64, 1>, _: &()| k.kth(0) % 2 == 0);
        let p: Predicate<i64, (), 1> = Predicate::Satisfies(f);
        assert!(p.passes(&Point::new([4]), &()));
        assert!(!p.passes(&Point::new([3]), &()));
    }

    #[test]
    fn test_sort_predicates_puts_most_restrictive_first() {
        let root = Aabb::new(Point::new([0_i64, 0]), Point::new([100, 100]));
        let mut preds: Vec<Predicate<i64, (), 2>> = vec![
            Predicate::Intersects(Aabb::new(Point::new([0, 0]), Point::new([99, 99]))),
            Predicate::Intersects(Aabb::new(Point::new([0, 0]), Point::new([1, 1]))),
        ];
        sort_predicates(&mut preds, &root);
        // the tighter box (smaller overlap ratio => higher restrictiveness) comes first
        match &preds[0] {
            Predicate::Intersects(b) => assert_eq!(b.max().kth(0), 1),
            _ => panic!("unexpected predicate"),
        }
    }
}
