//! Quality indicators for a set of non-dominated points (§4.4): hypervolume,
//! generational/inverted-generational distance, coverage, spread and
//! conflict measures.
//!
//! Every indicator here takes the key set as a plain `&[Point<K, M>]` plus a
//! [`Direction`] vector rather than a [`super::Front`] directly, so callers
//! can compare two independently-maintained fronts (as the coverage and
//! conflict metrics require) without forcing them to share an index type.

use rand::Rng;

use crate::error::{Error, Result};
use crate::geometry::{Direction, Point, Scalar};

fn normalize<K: Scalar, const M: usize>(p: &Point<K, M>, directions: &Direction<M>) -> Vec<f64> {
    (0..M).map(|i| if directions.minimizes(i) { p.kth(i).to_f64() } else { -p.kth(i).to_f64() }).collect()
}

fn dominates_norm(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for i in 0..a.len() {
        if a[i] > b[i] {
            return false;
        }
        if a[i] < b[i] {
            strictly_better = true;
        }
    }
    strictly_better
}

fn keep_nondominated(mut pts: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
    pts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    pts.dedup();
    let mut kept = Vec::with_capacity(pts.len());
    for (i, p) in pts.iter().enumerate() {
        if !pts.iter().enumerate().any(|(j, q)| i != j && dominates_norm(q, p)) {
            kept.push(p.clone());
        }
    }
    kept
}

/// recursive exclusion hypervolume (normalized to all-minimize space, the
/// reference point is the worst corner): sums each point's exclusive
/// contribution, computed as its inclusive box minus the hypervolume of the
/// region that the remaining points already cover inside that box
fn hv_rec(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let dim = reference.len();
    if dim == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - best).max(0.0);
    }
    if dim == 2 {
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap());
        let mut volume = 0.0;
        let mut prev_y = reference[1];
        for p in &pts {
            if p[1] < prev_y {
                volume += (reference[0] - p[0]) * (prev_y - p[1]);
                prev_y = p[1];
            }
        }
        return volume;
    }
    let mut pts = points.to_vec();
    let last = dim - 1;
    pts.sort_by(|a, b| b[last].partial_cmp(&a[last]).unwrap());
    let mut total = 0.0;
    for i in 0..pts.len() {
        let inclusive: f64 = (0..dim).map(|j| reference[j] - pts[i][j]).product();
        let limited: Vec<Vec<f64>> = pts[i + 1..].iter().map(|q| (0..last).map(|j| q[j].max(pts[i][j])).collect()).collect();
        let limited = keep_nondominated(limited);
        let sub_reference = &reference[..last];
        total += inclusive - hv_rec(&limited, sub_reference);
    }
    total
}

/// exact hypervolume dominated by `points` and bounded by `reference`
/// (§4.4); errs if `reference` is not strictly worse than every point on
/// every dimension
pub fn hypervolume<K: Scalar, const M: usize>(points: &[Point<K, M>], reference: &Point<K, M>, directions: &Direction<M>) -> Result<f64> {
    if points.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let reference_norm = normalize(reference, directions);
    let points_norm: Vec<Vec<f64>> = points.iter().map(|p| normalize(p, directions)).collect();
    if points_norm.iter().any(|p| (0..M).any(|i| p[i] >= reference_norm[i])) {
        return Err(Error::ReferencePointInvalid);
    }
    let nondominated = keep_nondominated(points_norm);
    Ok(hv_rec(&nondominated, &reference_norm))
}

/// Monte-Carlo hypervolume estimate: samples `n_samples` points uniformly in
/// the box bounded by `reference` and the per-dimension ideal of `points`,
/// and returns the dominated fraction times the sampling box's volume
pub fn hypervolume_approx<K: Scalar, const M: usize>(
    points: &[Point<K, M>],
    reference: &Point<K, M>,
    directions: &Direction<M>,
    n_samples: usize,
) -> Result<f64> {
    if points.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let reference_norm = normalize(reference, directions);
    let points_norm: Vec<Vec<f64>> = points.iter().map(|p| normalize(p, directions)).collect();
    if points_norm.iter().any(|p| (0..M).any(|i| p[i] >= reference_norm[i])) {
        return Err(Error::ReferencePointInvalid);
    }
    let mut lo = reference_norm.clone();
    for p in &points_norm {
        for i in 0..M {
            lo[i] = lo[i].min(p[i]);
        }
    }
    let box_volume: f64 = (0..M).map(|i| reference_norm[i] - lo[i]).product();
    if box_volume <= 0.0 || n_samples == 0 {
        return Ok(0.0);
    }
    let mut rng = rand::thread_rng();
    let mut hits = 0usize;
    for _ in 0..n_samples {
        let sample: Vec<f64> = (0..M).map(|i| rng.gen_range(lo[i]..reference_norm[i])).collect();
        if points_norm.iter().any(|p| (0..M).all(|i| p[i] <= sample[i])) {
            hits += 1;
        }
    }
    Ok(box_volume * (hits as f64 / n_samples as f64))
}

/// fraction of `b` that is weakly dominated by at least one point of `a`
/// (the C-metric)
pub fn coverage<K: Scalar, const M: usize>(a: &[Point<K, M>], b: &[Point<K, M>], directions: &Direction<M>) -> f64 {
    if b.is_empty() {
        return 0.0;
    }
    let covered = b.iter().filter(|q| a.iter().any(|p| p.dominates(q, directions) || p == *q)).count();
    covered as f64 / b.len() as f64
}

/// `coverage(a, b) / coverage(b, a)`, or `f64::INFINITY` if the denominator
/// is zero and the numerator is not
pub fn coverage_ratio<K: Scalar, const M: usize>(a: &[Point<K, M>], b: &[Point<K, M>], directions: &Direction<M>) -> f64 {
    let denom = coverage(b, a, directions);
    let numer = coverage(a, b, directions);
    if denom == 0.0 {
        if numer == 0.0 {
            1.0
        } else {
            f64::INFINITY
        }
    } else {
        numer / denom
    }
}

fn nearest_distance<K: Scalar, const M: usize>(p: &Point<K, M>, reference_set: &[Point<K, M>]) -> f64 {
    reference_set.iter().map(|r| p.distance(r)).fold(f64::INFINITY, f64::min)
}

/// average distance from every point of `approx` to its nearest point in
/// `true_front` (generational distance)
pub fn gd<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>]) -> Result<f64> {
    if approx.is_empty() || true_front.is_empty() {
        return Err(Error::EmptyContainer);
    }
    Ok(approx.iter().map(|p| nearest_distance(p, true_front)).sum::<f64>() / approx.len() as f64)
}

/// standard deviation of the per-point nearest distances used by [`gd`]
pub fn std_gd<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>]) -> Result<f64> {
    population_std(approx, true_front)
}

/// average distance from every point of `true_front` to its nearest point
/// in `approx` (inverted generational distance)
pub fn igd<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>]) -> Result<f64> {
    gd(true_front, approx)
}

fn nearest_distance_plus<K: Scalar, const M: usize>(r: &Point<K, M>, approx: &[Point<K, M>], directions: &Direction<M>) -> f64 {
    approx
        .iter()
        .map(|p| {
            let mut acc = 0.0;
            for i in 0..M {
                let (pv, rv) = (p.kth(i).to_f64(), r.kth(i).to_f64());
                let d = if directions.minimizes(i) { (pv - rv).max(0.0) } else { (rv - pv).max(0.0) };
                acc += d * d;
            }
            acc.sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}

/// IGD+ (Ishibuchi et al. 2015): like [`igd`] but only counts, per
/// dimension, the amount by which `approx` is worse than the reference
/// point rather than raw Euclidean distance
pub fn igd_plus<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>], directions: &Direction<M>) -> Result<f64> {
    if approx.is_empty() || true_front.is_empty() {
        return Err(Error::EmptyContainer);
    }
    Ok(true_front.iter().map(|r| nearest_distance_plus(r, approx, directions)).sum::<f64>() / true_front.len() as f64)
}

/// standard deviation of the per-point distances used by [`igd_plus`]
pub fn std_igd_plus<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>], directions: &Direction<M>) -> Result<f64> {
    if approx.is_empty() || true_front.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let mean = igd_plus(approx, true_front, directions)?;
    let distances: Vec<f64> = true_front.iter().map(|r| nearest_distance_plus(r, approx, directions)).collect();
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / distances.len() as f64;
    Ok(variance.sqrt())
}

fn population_std<K: Scalar, const M: usize>(approx: &[Point<K, M>], true_front: &[Point<K, M>]) -> Result<f64> {
    if approx.is_empty() || true_front.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let distances: Vec<f64> = approx.iter().map(|p| nearest_distance(p, true_front)).collect();
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / distances.len() as f64;
    Ok(variance.sqrt())
}

/// the largest of the two one-directional nearest-distance maxima between
/// `a` and `b` (symmetric Hausdorff distance)
pub fn hausdorff<K: Scalar, const M: usize>(a: &[Point<K, M>], b: &[Point<K, M>]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let forward = a.iter().map(|p| nearest_distance(p, b)).fold(0.0, f64::max);
    let backward = b.iter().map(|p| nearest_distance(p, a)).fold(0.0, f64::max);
    Ok(forward.max(backward))
}

/// standard deviation of each point's nearest-neighbour distance within its
/// own front, a spread/uniformity measure
pub fn uniformity<K: Scalar, const M: usize>(points: &[Point<K, M>]) -> Result<f64> {
    if points.len() < 2 {
        return Err(Error::EmptyContainer);
    }
    let distances: Vec<f64> = points.iter().enumerate().map(|(i, p)| nearest_own_distance(points, i, p)).collect();
    let mean = distances.iter().sum::<f64>() / distances.len() as f64;
    let variance = distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / distances.len() as f64;
    Ok(variance.sqrt())
}

fn nearest_own_distance<K: Scalar, const M: usize>(points: &[Point<K, M>], i: usize, p: &Point<K, M>) -> f64 {
    points.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, q)| p.distance(q)).fold(f64::INFINITY, f64::min)
}

/// mean pairwise Euclidean distance within `points`
pub fn average_distance<K: Scalar, const M: usize>(points: &[Point<K, M>]) -> Result<f64> {
    if points.len() < 2 {
        return Err(Error::EmptyContainer);
    }
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            total += points[i].distance(&points[j]);
            count += 1;
        }
    }
    Ok(total / count as f64)
}

/// mean nearest-neighbour distance within `points`
pub fn average_nearest_distance<K: Scalar, const M: usize>(points: &[Point<K, M>]) -> Result<f64> {
    if points.len() < 2 {
        return Err(Error::EmptyContainer);
    }
    let total: f64 = points.iter().enumerate().map(|(i, p)| nearest_own_distance(points, i, p)).sum();
    Ok(total / points.len() as f64)
}

/// NSGA-II crowding distance for every point of `points`, indexed the same
/// way as `points`; boundary points (the extrema on some dimension) get
/// `f64::INFINITY`
pub fn crowding_distance<K: Scalar, const M: usize>(points: &[Point<K, M>]) -> Vec<f64> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let mut distance = vec![0.0; n];
    for dim in 0..M {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| points[a].kth(dim).partial_cmp(&points[b].kth(dim)).unwrap_or(std::cmp::Ordering::Equal));
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        let span = points[order[n - 1]].kth(dim).to_f64() - points[order[0]].kth(dim).to_f64();
        if span <= 0.0 || n < 3 {
            continue;
        }
        for w in 1..n - 1 {
            if distance[order[w]].is_finite() {
                let prev = points[order[w - 1]].kth(dim).to_f64();
                let next = points[order[w + 1]].kth(dim).to_f64();
                distance[order[w]] += (next - prev) / span;
            }
        }
    }
    distance
}

/// mean of the finite crowding distances in `points` (infinite boundary
/// contributions are excluded so one extremum doesn't dominate the mean)
pub fn average_crowding_distance<K: Scalar, const M: usize>(points: &[Point<K, M>]) -> Result<f64> {
    if points.is_empty() {
        return Err(Error::EmptyContainer);
    }
    let distances = crowding_distance(points);
    let finite: Vec<f64> = distances.into_iter().filter(|d| d.is_finite()).collect();
    if finite.is_empty() {
        return Ok(0.0);
    }
    Ok(finite.iter().sum::<f64>() / finite.len() as f64)
}

fn coord_range<K: Scalar, const M: usize>(points: &[Point<K, M>], dim: usize) -> f64 {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        let v = p.kth(dim).to_f64();
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (hi - lo).max(0.0)
}

/// per-dimension conflict: the `dim`-th coordinate's spread (§4.4's "direct
/// conflict" measure), a proxy for how much that objective varies across
/// `points`
pub fn direct_conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim: usize) -> f64 {
    coord_range(points, dim)
}

/// [`direct_conflict`] divided by the sum of every dimension's range
pub fn normalized_direct_conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim: usize) -> f64 {
    let total: f64 = (0..M).map(|i| coord_range(points, i)).sum();
    if total == 0.0 {
        0.0
    } else {
        coord_range(points, dim) / total
    }
}

/// maximum minus minimum achievable value of dimension `dim` among the
/// points that are extremal on at least one other dimension (a proxy for
/// how much `dim` trades off against the rest of the front)
pub fn maxmin_conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim: usize) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let extremal: Vec<&Point<K, M>> = points
        .iter()
        .filter(|p| {
            (0..M).filter(|&j| j != dim).any(|j| {
                let v = p.kth(j).to_f64();
                points.iter().all(|q| q.kth(j).to_f64() <= v) || points.iter().all(|q| q.kth(j).to_f64() >= v)
            })
        })
        .collect();
    if extremal.is_empty() {
        return coord_range(points, dim);
    }
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in extremal {
        let v = p.kth(dim).to_f64();
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (hi - lo).max(0.0)
}

/// [`maxmin_conflict`] divided by the sum of every dimension's maxmin
/// conflict
pub fn normalized_maxmin_conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim: usize) -> f64 {
    let total: f64 = (0..M).map(|i| maxmin_conflict(points, i)).sum();
    if total == 0.0 {
        0.0
    } else {
        maxmin_conflict(points, dim) / total
    }
}

fn rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(std::cmp::Ordering::Equal));
    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = ((i + j) as f64 / 2.0) + 1.0;
        for idx in order.iter().take(j + 1).skip(i) {
            ranks[*idx] = avg_rank;
        }
        i = j + 1;
    }
    ranks
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..a.len() {
        let (da, db) = (a[i] - mean_a, b[i] - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a == 0.0 || var_b == 0.0 {
        0.0
    } else {
        cov / (var_a.sqrt() * var_b.sqrt())
    }
}

/// Spearman rank correlation between dimensions `dim_a` and `dim_b` across
/// `points`; `1.0` means the two objectives always move together (no
/// trade-off), `-1.0` means they always trade off directly
pub fn conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim_a: usize, dim_b: usize) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let a: Vec<f64> = points.iter().map(|p| p.kth(dim_a).to_f64()).collect();
    let b: Vec<f64> = points.iter().map(|p| p.kth(dim_b).to_f64()).collect();
    pearson(&rank(&a), &rank(&b))
}

/// [`conflict`] rescaled from `[-1, 1]` to `[0, 1]`, with `0` meaning no
/// trade-off and `1` meaning maximal trade-off
pub fn normalized_conflict<K: Scalar, const M: usize>(points: &[Point<K, M>], dim_a: usize, dim_b: usize) -> f64 {
    (1.0 - conflict(points, dim_a, dim_b)) / 2.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hypervolume_2d() {
        let directions = Direction::<2>::all_minimize();
        let points = [Point::new([1.0, 4.0]), Point::new([2.0, 3.0]), Point::new([4.0, 1.0])];
        let reference = Point::new([5.0, 5.0]);
        let hv = hypervolume(&points, &reference, &directions).unwrap();
        // staircase area: (2-1)*(5-4) + (4-2)*(5-3) + (5-4)*(5-1) = 1 + 4 + 4 = 9
        assert!((hv - 9.0).abs() < 1e-9, "got {hv}");
    }

    #[test]
    fn test_hypervolume_rejects_bad_reference() {
        let directions = Direction::<2>::all_minimize();
        let points = [Point::new([1.0, 1.0])];
        let reference = Point::new([0.0, 5.0]);
        assert!(matches!(hypervolume(&points, &reference, &directions), Err(Error::ReferencePointInvalid)));
    }

    #[test]
    fn test_coverage_full() {
        let directions = Direction::<2>::all_minimize();
        let a = [Point::new([1.0, 1.0])];
        let b = [Point::new([2.0, 2.0]), Point::new([3.0, 3.0])];
        assert_eq!(coverage(&a, &b, &directions), 1.0);
        assert_eq!(coverage(&b, &a, &directions), 0.0);
    }

    #[test]
    fn test_gd_igd_zero_on_identical_fronts() {
        let points = [Point::new([1.0, 4.0]), Point::new([4.0, 1.0])];
        assert!(gd(&points, &points).unwrap() < 1e-12);
        assert!(igd(&points, &points).unwrap() < 1e-12);
    }

    #[test]
    fn test_crowding_distance_boundary_infinite() {
        let points = [Point::new([1.0, 4.0]), Point::new([2.0, 3.0]), Point::new([4.0, 1.0])];
        let d = crowding_distance(&points);
        assert_eq!(d[0], f64::INFINITY);
        assert_eq!(d[2], f64::INFINITY);
        assert!(d[1].is_finite());
    }

    #[test]
    fn test_conflict_perfect_tradeoff() {
        let points = [Point::new([1.0, 4.0]), Point::new([2.0, 3.0]), Point::new([3.0, 2.0]), Point::new([4.0, 1.0])];
        let c = conflict(&points, 0, 1);
        assert!((c - -1.0).abs() < 1e-9, "got {c}");
        assert!(normalized_conflict(&points, 0, 1) > 0.99);
    }
}
