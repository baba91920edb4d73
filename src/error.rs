//! Error taxonomy shared by every container in the crate.

use thiserror::Error;

/// Failure kinds produced by spatial indexes, fronts, and archives.
///
/// Every fallible operation documented in the crate returns one of these
/// variants; container state is left unchanged when an operation fails
/// (strong guarantee for single-entry operations, see module docs on
/// [`crate::archive::Archive::erase_all`] for the one documented exception).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// [`crate::index::SpatialIndex::at`] was called with a key that is not
    /// stored.
    #[error("key not found")]
    KeyNotFound,

    /// A textual direction token was not one of the recognized tokens.
    #[error("invalid direction token: {0:?}")]
    InvalidDirectionToken(String),

    /// An archive's capacity was zero (or otherwise unusable) at insertion
    /// time, or an internal invariant was violated.
    #[error("capacity invariant violated: {0}")]
    CapacityInvariant(&'static str),

    /// A reference-point or indicator query requires at least one stored
    /// entry and none exists.
    #[error("container is empty")]
    EmptyContainer,

    /// A hypervolume reference point is not strictly worse than every
    /// stored key under the container's direction vector.
    #[error("reference point is not strictly worse than every stored key")]
    ReferencePointInvalid,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
