//! # Gluing permutations
//!
//! [`GluingPerms`] completes a [`FacetPairing`] into a triangulation by choosing, for every
//! matched pair of facets, how the two triangles are identified.
//!
//! ## Key Features:
//!
//! - **Compact storage**: each facet stores an index in `0..6` into [`Perm4::S3`]. The full
//!   gluing map is recovered by conjugating with the transpositions that move the two
//!   facet numbers to `3`, see [`GluingPerms::index_to_gluing`].
//! - **Partner consistency**: [`GluingPerms::set_perm`] writes the inverse index on the
//!   partner facet, so both sides always describe the same identification.
//! - **Unset markers**: `-1` means not chosen yet, `-2` is the orientation preset the search
//!   writes before trying the first candidate for a facet.

use std::{fmt, sync::Arc};

use itertools::Itertools;

use crate::{
    error::InvalidInput,
    pairing::{FacetPairing, FacetSpec},
    perm::{Perm4, S3_INV},
    tokens::Tokens,
};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GluingPerms {
    pairing: Arc<FacetPairing>,
    perm_indices: Vec<i8>,
}

impl GluingPerms {
    /// A gluing with every permutation still unchosen.
    pub fn new(pairing: Arc<FacetPairing>) -> Self {
        let slots = 4 * pairing.size();
        GluingPerms {
            pairing,
            perm_indices: vec![-1; slots],
        }
    }

    pub fn pairing(&self) -> &FacetPairing {
        &self.pairing
    }

    pub(crate) fn shared_pairing(&self) -> &Arc<FacetPairing> {
        &self.pairing
    }

    pub fn size(&self) -> usize {
        self.pairing.size()
    }

    pub fn perm_indices(&self) -> &[i8] {
        &self.perm_indices
    }

    #[inline]
    pub fn perm_index(&self, f: FacetSpec) -> i8 {
        self.perm_indices[f.index()]
    }

    /// Writes a raw index for `f` alone, leaving its partner untouched.
    #[inline]
    pub fn set_perm_index(&mut self, f: FacetSpec, index: i8) {
        self.perm_indices[f.index()] = index;
    }

    /// Chooses the gluing `S3[index]` on `f`, and its inverse on the partner of `f`.
    pub fn set_perm(&mut self, f: FacetSpec, index: usize) {
        debug_assert!(index < 6);
        let partner = self.pairing.dest(f);
        self.perm_indices[f.index()] = index as i8;
        self.perm_indices[partner.index()] = S3_INV[index] as i8;
    }

    /// Marks `f` and its partner as unchosen.
    pub fn clear(&mut self, f: FacetSpec) {
        let partner = self.pairing.dest(f);
        self.perm_indices[f.index()] = -1;
        self.perm_indices[partner.index()] = -1;
    }

    /// The gluing map on `f`, sending the vertices of `f`'s tetrahedron to the vertices of
    /// the partner's tetrahedron.
    #[inline]
    pub fn perm(&self, f: FacetSpec) -> Perm4 {
        let index = self.perm_index(f);
        debug_assert!(index >= 0, "gluing on {f} is not chosen");
        self.index_to_gluing(f, index.max(0) as usize)
    }

    /// The gluing map on `f` that the S₃ index `index` stands for.
    pub fn index_to_gluing(&self, f: FacetSpec, index: usize) -> Perm4 {
        let dest = self.pairing.dest(f);
        Perm4::transposition(dest.facet, 3) * Perm4::S3[index] * Perm4::transposition(f.facet, 3)
    }

    /// The S₃ index of the gluing map `p` on `f`, or `None` when `p` does not send `f` to
    /// its partner facet.
    pub fn gluing_to_index(&self, f: FacetSpec, p: Perm4) -> Option<usize> {
        let dest = self.pairing.dest(f);
        (Perm4::transposition(dest.facet, 3) * p * Perm4::transposition(f.facet, 3)).s3_index()
    }

    /// Whether every facet has a chosen gluing.
    pub fn is_complete(&self) -> bool {
        self.perm_indices.iter().all(|&i| i >= 0)
    }

    /// Appends the pairing on one line and the permutation indices on the next.
    pub fn dump_data(&self, out: &mut String) {
        out.push_str(&self.pairing.to_text_rep());
        out.push('\n');
        push_joined(out, self.perm_indices.iter());
        out.push('\n');
    }

    pub(crate) fn read_data(tokens: &mut Tokens<'_>) -> Result<Self, InvalidInput> {
        let pairing = Arc::new(FacetPairing::from_text_rep(tokens.next_line("facet pairing")?)?);
        let mut perm_indices = Vec::with_capacity(4 * pairing.size());
        for _ in 0..4 * pairing.size() {
            perm_indices.push(tokens.next_in("permutation index", -2..6)? as i8);
        }

        for f in FacetSpec::all(pairing.size()) {
            let here = perm_indices[f.index()];
            let there = perm_indices[pairing.dest(f).index()];
            if here >= 0 && there >= 0 && S3_INV[here as usize] as i8 != there {
                return Err(InvalidInput::Inconsistent(
                    "gluing permutations are not inverse across a facet pair",
                ));
            }
        }

        Ok(GluingPerms {
            pairing,
            perm_indices,
        })
    }

    /// Reads the output of [`GluingPerms::dump_data`].
    pub fn from_data(data: &str) -> Result<Self, InvalidInput> {
        let mut tokens = Tokens::new(data);
        let ans = GluingPerms::read_data(&mut tokens)?;
        tokens.expect_end()?;
        Ok(ans)
    }
}

pub(crate) fn push_joined<T: fmt::Display>(out: &mut String, items: impl Iterator<Item = T>) {
    out.push_str(&items.format(" ").to_string());
}

/// Prints every chosen gluing map, one tetrahedron per group, with `-` for unset facets.
impl fmt::Display for GluingPerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for simp in 0..self.size() {
            if simp > 0 {
                write!(f, " | ")?;
            }
            for facet in 0..4 {
                if facet > 0 {
                    write!(f, " ")?;
                }
                let spec = FacetSpec::new(simp, facet);
                if self.perm_index(spec) < 0 {
                    write!(f, "-")?;
                } else {
                    let dest = self.pairing.dest(spec);
                    write!(f, "{}:{}", dest.simp, self.perm(spec))?;
                }
            }
        }
        Ok(())
    }
}
