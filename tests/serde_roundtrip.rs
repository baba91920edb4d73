//! Exercises the optional `serde` feature: `Point`, `Aabb`, and `Direction`
//! round-trip through JSON unchanged. Only compiled when the `serde` feature
//! is enabled (`cargo test --features serde`).

#![cfg(feature = "serde")]

use pareto_spatial::geometry::{Aabb, Direction, Point};

#[test]
fn point_roundtrips_through_json() {
    let p = Point::new([1.5_f64, -2.0, 3.25]);
    let json = serde_json::to_string(&p).unwrap();
    let back: Point<f64, 3> = serde_json::from_str(&json).unwrap();
    assert_eq!(p, back);
}

#[test]
fn aabb_roundtrips_through_json() {
    let b = Aabb::new(Point::new([0_i64, 0]), Point::new([10_i64, 20]));
    let json = serde_json::to_string(&b).unwrap();
    let back: Aabb<i64, 2> = serde_json::from_str(&json).unwrap();
    assert_eq!(b, back);
}

#[test]
fn direction_roundtrips_through_json() {
    let d: Direction<3> = Direction::from_bools([true, false, true]);
    let json = serde_json::to_string(&d).unwrap();
    let back: Direction<3> = serde_json::from_str(&json).unwrap();
    assert_eq!(d, back);
}
