//! # Facet pairings
//!
//! A [`FacetPairing`] describes which faces of `n` tetrahedra are glued together, without
//! saying how. It is the combinatorial skeleton the census searches over: the search picks a
//! gluing permutation for every pair of matched facets.
//!
//! ## Key Features:
//!
//! - **Text form**: `from_text_rep` / `to_text_rep` read and write the pairing as a flat list
//!   of `simp facet` destinations, one per facet in facet order.
//! - **Structure**: connectivity, chain following and the structural filters used to
//!   discard pairings that cannot produce a closed prime minimal P²-irreducible
//!   triangulation (see [`predicates`](self::predicates)).
//! - **Symmetry**: the canonical form test and the automorphism group, see
//!   [`FacetPairing::find_automorphisms`].
//!
//! Only closed pairings are supported: every facet is glued to some other facet.

use std::fmt;

use bitvec::{bitvec, order::Lsb0};

use crate::error::InvalidInput;

pub mod automorphism;
pub mod facet;
pub mod predicates;

pub use automorphism::Isomorphism;
pub use facet::{FacePair, FacetSpec};

/// An involution on the `4n` facets of `n` tetrahedra without fixed points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetPairing {
    size: usize,
    pairs: Vec<FacetSpec>,
}

impl FacetPairing {
    /// Builds a pairing from the destination of every facet, listed in facet order.
    pub fn new(pairs: Vec<FacetSpec>) -> Result<Self, InvalidInput> {
        if pairs.is_empty() || pairs.len() % 4 != 0 {
            return Err(InvalidInput::EmptyPairing(2 * pairs.len()));
        }
        let size = pairs.len() / 4;

        for d in &pairs {
            if d.simp >= size {
                return Err(InvalidInput::OutOfRange {
                    what: "pairing simplex",
                    value: d.simp as i64,
                });
            }
            if d.facet >= 4 {
                return Err(InvalidInput::OutOfRange {
                    what: "pairing facet",
                    value: d.facet as i64,
                });
            }
        }
        for (i, d) in pairs.iter().enumerate() {
            let here = FacetSpec::from_index(i);
            if *d == here || pairs[d.index()] != here {
                return Err(InvalidInput::MismatchedPairing {
                    simp: here.simp,
                    facet: here.facet,
                });
            }
        }

        Ok(FacetPairing { size, pairs })
    }

    /// Reads the whitespace separated `simp facet` destinations of every facet in order.
    ///
    /// A destination equal to `(n, 0)` would denote a boundary facet, which is rejected.
    pub fn from_text_rep(rep: &str) -> Result<Self, InvalidInput> {
        let tokens: Vec<&str> = rep.split_whitespace().collect();
        if tokens.is_empty() || tokens.len() % 8 != 0 {
            return Err(InvalidInput::EmptyPairing(tokens.len()));
        }
        let size = tokens.len() / 8;

        let mut pairs = Vec::with_capacity(4 * size);
        for (i, pair) in tokens.chunks(2).enumerate() {
            let simp = parse_pairing_token(pair[0])?;
            let facet = parse_pairing_token(pair[1])?;
            if simp == size && facet == 0 {
                let here = FacetSpec::from_index(i);
                return Err(InvalidInput::BoundaryFacet {
                    simp: here.simp,
                    facet: here.facet,
                });
            }
            pairs.push(FacetSpec::new(simp, facet));
        }
        FacetPairing::new(pairs)
    }

    pub fn to_text_rep(&self) -> String {
        let mut out = String::with_capacity(self.pairs.len() * 4);
        for (i, d) in self.pairs.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{} {}", d.simp, d.facet));
        }
        out
    }

    /// Number of tetrahedra.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The facet glued to `f`.
    #[inline]
    pub fn dest(&self, f: FacetSpec) -> FacetSpec {
        self.pairs[f.index()]
    }

    #[inline]
    pub fn dest_of(&self, simp: usize, facet: usize) -> FacetSpec {
        self.pairs[4 * simp + facet]
    }

    /// Whether every tetrahedron can be reached from tetrahedron 0.
    pub fn is_connected(&self) -> bool {
        let mut seen = bitvec![usize, Lsb0; 0; self.size];
        let mut stack = vec![0];
        seen.set(0, true);
        let mut reached = 1;
        while let Some(simp) = stack.pop() {
            for facet in 0..4 {
                let next = self.dest_of(simp, facet).simp;
                if !seen[next] {
                    seen.set(next, true);
                    reached += 1;
                    stack.push(next);
                }
            }
        }
        reached == self.size
    }
}

fn parse_pairing_token(token: &str) -> Result<usize, InvalidInput> {
    token.parse().map_err(|_| InvalidInput::MalformedToken {
        what: "facet pairing",
        token: token.to_string(),
    })
}

/// Writes the pairing one tetrahedron at a time, e.g. `0:1 0:0 0:3 0:2`.
impl fmt::Display for FacetPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for simp in 0..self.size {
            if simp > 0 {
                write!(f, " | ")?;
            }
            for facet in 0..4 {
                if facet > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.dest_of(simp, facet))?;
            }
        }
        Ok(())
    }
}
