//! Spatial containers specialized for Pareto-optimal sets.

// useful additional warnings (missing docs, crates imported but unused, ...)
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unsafe_code)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]

// some more useful warnings (no shadowing, similar names, ...)
#![warn(clippy::similar_names)]
#![warn(clippy::print_stdout)]
#![warn(clippy::use_debug)]
#![warn(clippy::shadow_unrelated)]
#![warn(clippy::shadow_same)]
#![warn(clippy::shadow_reuse)]

/// coordinates, points, axis-aligned boxes, and optimization directions
pub mod geometry;

/// range and nearest-neighbour predicates shared by every spatial index
pub mod predicate;

/// the five spatial index variants and their shared contract
pub mod index;

/// the dominance-preserving Pareto front and its quality indicators
pub mod front;

/// the capacity-bounded archive of nested fronts
pub mod archive;

/// the crate's shared error taxonomy
pub mod error;
