//! Cross-cutting scenarios and universal invariants that span more than one
//! module: front antichain maintenance, archive layering, hypervolume
//! monotonicity, and directional symmetry of the indicators.
//!
//! Per-index contract tests live alongside each index variant; these tests
//! exercise `Front` and `Archive` as a whole, backed by `FlatIndex` since the
//! scenarios care about dominance bookkeeping, not any one index's traversal
//! strategy.

use pareto_spatial::archive::Archive;
use pareto_spatial::front::indicators::hypervolume;
use pareto_spatial::front::Front;
use pareto_spatial::geometry::{Direction, Point};
use pareto_spatial::index::flat::FlatIndex;

type TestFront<K, V, const M: usize> = Front<K, V, FlatIndex<K, V, M>, M>;
type TestArchive<K, V, const M: usize> = Archive<K, V, FlatIndex<K, V, M>, M>;

/// Scenario A: a 2-D minimize front stays an antichain as dominated and
/// equal-position keys arrive.
#[test]
fn scenario_a_minimize_front_antichain() {
    let mut front: TestFront<f64, &'static str, 2> = TestFront::with_directions(Direction::all_minimize());
    assert!(front.insert(Point::new([1.0, 4.0]), "a"));
    assert!(front.insert(Point::new([2.0, 3.0]), "b"));
    assert!(front.insert(Point::new([3.0, 2.0]), "c"));
    assert!(front.insert(Point::new([4.0, 1.0]), "d"));
    assert_eq!(front.len(), 4);

    assert!(front.insert(Point::new([2.5, 2.5]), "e"));
    assert_eq!(front.len(), 5);

    assert!(front.insert(Point::new([2.0, 2.0]), "f"));
    assert_eq!(front.len(), 3);
    assert!(front.contains(&Point::new([1.0, 4.0])));
    assert!(front.contains(&Point::new([2.0, 2.0])));
    assert!(front.contains(&Point::new([4.0, 1.0])));
    assert!(!front.contains(&Point::new([2.0, 3.0])));
    assert!(!front.contains(&Point::new([3.0, 2.0])));
    assert!(!front.contains(&Point::new([2.5, 2.5])));

    let keys: Vec<Point<f64, 2>> = front.iter().iter().map(|e| e.key).collect();
    for p in &keys {
        for q in &keys {
            if p != q {
                assert!(!p.dominates(q, front.directions()));
            }
        }
    }
}

/// Scenario B: exact hypervolume of a 2-D maximize staircase against the
/// origin.
#[test]
fn scenario_b_maximize_hypervolume() {
    let front: TestFront<f64, usize, 2> = TestFront::with_entries(
        [(Point::new([1.0, 4.0]), 0), (Point::new([2.0, 3.0]), 1), (Point::new([3.0, 2.0]), 2), (Point::new([4.0, 1.0]), 3)],
        Direction::all_maximize(),
    );
    let keys: Vec<Point<f64, 2>> = front.iter().iter().map(|e| e.key).collect();
    let reference = Point::new([0.0, 0.0]);
    let hv = hypervolume(&keys, &reference, front.directions()).unwrap();
    // 1*4 + 1*3 + 1*2 + 1*1 = 10
    assert!((hv - 10.0).abs() < 1e-9, "got {hv}");
}

/// Scenario C: a capacity-3 archive keeps its non-dominated front intact and
/// never exceeds capacity as strictly worse keys keep arriving.
#[test]
fn scenario_c_archive_capacity_pruning() {
    let mut archive: TestArchive<i64, &'static str, 2> = TestArchive::new(3, Direction::all_minimize());
    archive.insert(Point::new([1, 1]), "a");
    archive.insert(Point::new([2, 2]), "b");
    archive.insert(Point::new([3, 3]), "c");
    archive.insert(Point::new([4, 4]), "d");
    archive.insert(Point::new([5, 5]), "e");

    assert!(archive.len() <= 3);
    let front0 = &archive.fronts()[0];
    let f0_keys: Vec<Point<i64, 2>> = front0.iter().iter().map(|e| e.key).collect();
    assert_eq!(f0_keys, vec![Point::new([1, 1])]);
}

/// Scenario F: every indicator agrees whether directions are stated directly
/// or stated negated with negated coordinates, since both describe the same
/// dominance relation.
#[test]
fn scenario_f_directional_symmetry() {
    let directions = Direction::<2>::all_maximize();
    let points = [Point::new([1.0, 4.0]), Point::new([2.0, 3.0]), Point::new([3.0, 2.0]), Point::new([4.0, 1.0])];
    let reference = Point::new([0.0, 0.0]);

    let negated_directions = directions.negated();
    let negated_points: Vec<Point<f64, 2>> = points.iter().map(|p| *p * -1.0).collect();
    let negated_reference = reference * -1.0;

    let hv = hypervolume(&points, &reference, &directions).unwrap();
    let hv_negated = hypervolume(&negated_points, &negated_reference, &negated_directions).unwrap();
    assert!((hv - hv_negated).abs() < 1e-9, "hv {hv} vs negated {hv_negated}");
}

/// Invariant 1: a front is always an antichain under its own directions,
/// across many distinct insertion orders.
#[test]
fn invariant_1_front_is_always_an_antichain() {
    let raw = [
        [3_i64, 5],
        [1, 9],
        [7, 2],
        [4, 4],
        [2, 8],
        [6, 3],
        [5, 5],
        [8, 1],
        [9, 0],
        [0, 10],
        [3, 3],
        [4, 6],
    ];
    let mut front: TestFront<i64, usize, 2> = TestFront::with_directions(Direction::all_minimize());
    for (i, p) in raw.iter().enumerate() {
        front.insert(Point::new(*p), i);
    }
    let keys: Vec<Point<i64, 2>> = front.iter().iter().map(|e| e.key).collect();
    for p in &keys {
        for q in &keys {
            if p != q {
                assert!(!p.dominates(q, front.directions()), "{p:?} dominates {q:?}");
            }
        }
    }
}

/// Invariant 2: every key in front `i > 0` is dominated by some key in a
/// shallower front, and not by any key of a front shallower than its own
/// immediate predecessor's union.
#[test]
fn invariant_2_archive_layering_is_consistent() {
    let raw = [[1_i64, 1], [1, 2], [2, 1], [2, 2], [3, 1], [1, 3], [3, 3], [0, 5], [5, 0], [4, 4]];
    let mut archive: TestArchive<i64, usize, 2> = TestArchive::new(100, Direction::all_minimize());
    for (i, p) in raw.iter().enumerate() {
        archive.insert(Point::new(*p), i);
    }

    let fronts = archive.fronts();
    for i in 1..fronts.len() {
        let shallower: Vec<Point<i64, 2>> = fronts[..i].iter().flat_map(|f| f.iter().into_iter().map(|e| e.key)).collect();
        for entry in fronts[i].iter() {
            assert!(
                shallower.iter().any(|p| p.dominates(&entry.key, archive.directions())),
                "front {i} key {:?} has no dominator among shallower fronts",
                entry.key
            );
        }
    }
}

/// Invariant 9: hypervolume is non-negative and strictly increases when a
/// genuinely non-dominated point is added to the front.
#[test]
fn invariant_9_hypervolume_monotonic_on_insertion() {
    let directions = Direction::<2>::all_minimize();
    let reference = Point::new([10.0, 10.0]);

    let before = [Point::new([4.0, 4.0])];
    let hv_before = hypervolume(&before, &reference, &directions).unwrap();
    assert!(hv_before >= 0.0);

    let after = [Point::new([4.0, 4.0]), Point::new([2.0, 6.0])];
    let hv_after = hypervolume(&after, &reference, &directions).unwrap();
    assert!(hv_after >= 0.0);
    assert!(hv_after > hv_before, "hv_before {hv_before} hv_after {hv_after}");
}

/// Invariant 10: `gd`/`igd` vanish when compared against themselves, and
/// `hausdorff` is symmetric in its arguments.
#[test]
fn invariant_10_self_distance_vanishes_and_hausdorff_is_symmetric() {
    use pareto_spatial::front::indicators::{gd, hausdorff, igd};

    let a = [Point::new([1.0, 4.0]), Point::new([2.0, 3.0]), Point::new([4.0, 1.0])];
    let b = [Point::new([1.5, 3.5]), Point::new([3.0, 2.0])];

    assert!(gd(&a, &a).unwrap() < 1e-12);
    assert!(igd(&a, &a).unwrap() < 1e-12);

    let forward = hausdorff(&a, &b).unwrap();
    let backward = hausdorff(&b, &a).unwrap();
    assert!((forward - backward).abs() < 1e-12);
}
