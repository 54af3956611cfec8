//! Canonical representatives of gluings up to automorphisms of the facet pairing.
//!
//! An automorphism of the pairing relabels a complete gluing into another complete gluing
//! on the same pairing. Only the gluing whose permutations, read in facet order, are
//! lexicographically smallest among all relabellings is reported.

use std::cmp::Ordering;

use crate::{
    gluing::GluingPerms,
    pairing::{FacetSpec, Isomorphism},
    perm::Perm4,
};

/// The gluing map on `f` after relabelling `perms` by `iso`.
#[inline]
fn relabelled_perm(perms: &GluingPerms, iso: &Isomorphism, f: FacetSpec) -> Perm4 {
    let dest = perms.pairing().dest(f);
    iso.facet_perm[dest.simp].inverse() * perms.perm(iso.apply(f)) * iso.facet_perm[f.simp]
}

/// Whether no automorphism gives a smaller gluing than `perms`.
///
/// Compares facet by facet, over the lower facet of each pair, and stops at the first
/// difference.
pub fn is_canonical(perms: &GluingPerms, autos: &[Isomorphism]) -> bool {
    let pairing = perms.pairing();
    for iso in autos {
        for f in FacetSpec::all(perms.size()) {
            if pairing.dest(f) < f {
                continue;
            }
            match perms.perm(f).compare_with(&relabelled_perm(perms, iso, f)) {
                Ordering::Less => break,
                Ordering::Greater => return false,
                Ordering::Equal => {}
            }
        }
    }
    true
}

/// The complete gluing `perms` relabelled by the automorphism `iso`.
///
/// Returns `None` when `iso` does not preserve the pairing.
pub fn relabel(perms: &GluingPerms, iso: &Isomorphism) -> Option<GluingPerms> {
    let mut image = GluingPerms::new(perms.shared_pairing().clone());
    for f in FacetSpec::all(perms.size()) {
        let index = perms.gluing_to_index(f, relabelled_perm(perms, iso, f))?;
        image.set_perm_index(f, index as i8);
    }
    Some(image)
}
