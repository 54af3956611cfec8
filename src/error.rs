use thiserror::Error;

/// Malformed or out-of-range data handed to a parser or to a snapshot restore.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEnd(&'static str),

    #[error("malformed token {token:?} while reading {what}")]
    MalformedToken { what: &'static str, token: String },

    #[error("{what} value {value} is out of range")]
    OutOfRange { what: &'static str, value: i64 },

    #[error("facet {simp}:{facet} is not paired back consistently")]
    MismatchedPairing { simp: usize, facet: usize },

    #[error("facet {simp}:{facet} is a boundary facet, only closed pairings are supported")]
    BoundaryFacet { simp: usize, facet: usize },

    #[error("a facet pairing needs at least one simplex and 4 facets per simplex, got {0} tokens")]
    EmptyPairing(usize),

    #[error("unknown searcher tag {0:?}")]
    UnknownTag(String),

    #[error("inconsistent search state: {0}")]
    Inconsistent(&'static str),
}

/// A facet pairing that the census cannot be run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairingError {
    #[error("the facet pairing is not connected")]
    Disconnected,

    #[error("the facet pairing has {0} tetrahedra, at least 3 are required")]
    TooSmall(usize),

    #[error("the facet pairing is not in canonical form")]
    NotCanonical,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CensusError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    #[error("invalid facet pairing: {0}")]
    Pairing(#[from] PairingError),
}
