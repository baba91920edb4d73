use std::time::Instant;

use rand::prelude::ThreadRng;
use rand::Rng;

use pareto_spatial::archive::Archive;
use pareto_spatial::front::Front;
use pareto_spatial::geometry::{Direction, Point};
use pareto_spatial::index::flat::FlatIndex;
use pareto_spatial::index::kd_tree::KdTree;
use pareto_spatial::index::SpatialIndex;

fn random_point<const M: usize>(rng: &mut ThreadRng) -> Point<u16, M> {
    let mut coords = [0u16; M];
    for c in coords.iter_mut() {
        *c = rng.gen();
    }
    Point::new(coords)
}

fn bench_front<Idx: SpatialIndex<u16, usize, 2>>(label: &str, elements: &[Point<u16, 2>]) {
    let mut front: Front<u16, usize, Idx, 2> = Front::with_directions(Direction::all_minimize());
    let start_insert = Instant::now();
    for (i, p) in elements.iter().enumerate() {
        front.insert(*p, i);
    }
    let time_insert = start_insert.elapsed().as_secs_f32();
    println!(
        "{label}: {:<7} inserts in {:.3}s ({:.0} inserts/s), front size {}",
        elements.len(),
        time_insert,
        elements.len() as f32 / time_insert,
        front.len()
    );
}

fn bench_archive<Idx: SpatialIndex<u16, usize, 2>>(label: &str, elements: &[Point<u16, 2>], capacity: usize) {
    let mut archive: Archive<u16, usize, Idx, 2> = Archive::new(capacity, Direction::all_minimize());
    let start_insert = Instant::now();
    for (i, p) in elements.iter().enumerate() {
        archive.insert(*p, i);
    }
    let time_insert = start_insert.elapsed().as_secs_f32();
    println!(
        "{label}: {:<7} inserts in {:.3}s ({:.0} inserts/s), archive size {} across {} fronts",
        elements.len(),
        time_insert,
        elements.len() as f32 / time_insert,
        archive.len(),
        archive.fronts().len()
    );
}

fn main() {
    let mut rng = rand::thread_rng();
    let nb_elts = 200_000;
    let elements: Vec<Point<u16, 2>> = (0..nb_elts).map(|_| random_point(&mut rng)).collect();

    println!("front insertion ({nb_elts} random points):");
    bench_front::<FlatIndex<u16, usize, 2>>("flat", &elements);
    bench_front::<KdTree<u16, usize, 2>>("kd_tree", &elements);

    println!("\narchive insertion ({nb_elts} random points, capacity 1000):");
    bench_archive::<FlatIndex<u16, usize, 2>>("flat", &elements, 1000);
    bench_archive::<KdTree<u16, usize, 2>>("kd_tree", &elements, 1000);
}
