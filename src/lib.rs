//! # Tricensus
//!
//! Tricensus enumerates 3-manifold triangulations built from a fixed number of
//! tetrahedra. Given a facet pairing, which says which faces of which tetrahedra are glued
//! together, it searches over every way of gluing them and reports each resulting
//! triangulation once up to the symmetries of the pairing.
//!
//! Two searches are available:
//!
//! - a compact search for every closed triangulation with valid edges whose vertex links
//!   are 2-spheres;
//! - a much faster search that only looks for closed prime minimal P²-irreducible
//!   triangulations, the ones tabulated in census work.
//!
//! Start with [`search::enumerate`], or build a [`search::Searcher`] directly to split a
//! search into resumable pieces.

pub mod edge_class;
pub mod error;
pub mod gluing;
pub mod pairing;
pub mod perm;
pub mod qitmask;
pub mod search;
pub mod skeleton;
mod tokens;
pub mod union_find;
pub mod vertex_link;

pub use error::{CensusError, InvalidInput, PairingError};
pub use gluing::GluingPerms;
pub use pairing::{FacetPairing, FacetSpec, Isomorphism};
pub use perm::Perm4;
pub use search::{
    enumerate, enumerate_with_cancel, CancelToken, PurgeFlags, SearchOutcome, Searcher,
};
