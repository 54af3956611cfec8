//! Canonical form and automorphisms of facet pairings.
//!
//! A pairing is *canonical* when no relabelling of its tetrahedra and facets gives a
//! lexicographically smaller list of destinations. The test builds relabellings one image
//! facet at a time, in facet order: the preimage of each image facet is either forced (it is
//! the partner of a facet placed earlier) or chosen among the unused facets of the
//! tetrahedron already mapped there. Every relabelling that reproduces the pairing exactly is
//! an automorphism.

use std::cmp::Ordering;

use crate::{error::PairingError, perm::Perm4};

use super::{FacetPairing, FacetSpec};

/// A relabelling of tetrahedra together with a permutation of the facets of each one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Isomorphism {
    pub simp_image: Vec<usize>,
    pub facet_perm: Vec<Perm4>,
}

impl Isomorphism {
    pub fn identity(n: usize) -> Self {
        Isomorphism {
            simp_image: (0..n).collect(),
            facet_perm: vec![Perm4::IDENTITY; n],
        }
    }

    pub fn size(&self) -> usize {
        self.simp_image.len()
    }

    /// The image of the facet `f`.
    #[inline]
    pub fn apply(&self, f: FacetSpec) -> FacetSpec {
        FacetSpec::new(self.simp_image[f.simp], self.facet_perm[f.simp][f.facet])
    }

    pub fn is_identity(&self) -> bool {
        self.simp_image.iter().enumerate().all(|(i, &s)| i == s)
            && self.facet_perm.iter().all(Perm4::is_identity)
    }
}

enum Step {
    Continue,
    NotCanonical,
}

/// Partial relabelling under construction.
struct Relabelling<'a> {
    pairing: &'a FacetPairing,
    /// `image[f]` for each facet of the pairing.
    image: Vec<Option<FacetSpec>>,
    /// `pre[g]` for each image facet.
    pre: Vec<Option<FacetSpec>>,
    found: Vec<Isomorphism>,
}

impl<'a> Relabelling<'a> {
    fn new(pairing: &'a FacetPairing) -> Self {
        let slots = 4 * pairing.size();
        Relabelling {
            pairing,
            image: vec![None; slots],
            pre: vec![None; slots],
            found: Vec::new(),
        }
    }

    fn assign(&mut self, from: FacetSpec, to: FacetSpec) {
        self.image[from.index()] = Some(to);
        self.pre[to.index()] = Some(from);
    }

    fn unassign(&mut self, from: FacetSpec, to: FacetSpec) {
        self.image[from.index()] = None;
        self.pre[to.index()] = None;
    }

    /// Picks the image of the partner of `from` once `from` is mapped to `to`, or `None`
    /// when the partner is already mapped.
    fn derive_partner(&self, from: FacetSpec, to: FacetSpec) -> Option<(FacetSpec, FacetSpec)> {
        let partner = self.pairing.dest(from);
        if self.image[partner.index()].is_some() {
            return None;
        }
        let labelled = (0..4).find_map(|f| self.image[4 * partner.simp + f]);
        let target = match labelled {
            Some(other) => {
                let facet = (0..4).find(|&f| self.pre[4 * other.simp + f].is_none())?;
                FacetSpec::new(other.simp, facet)
            }
            None => {
                let simp = ((to.simp + 1)..self.pairing.size())
                    .find(|&s| self.pre[4 * s].is_none())?;
                FacetSpec::new(simp, 0)
            }
        };
        Some((partner, target))
    }

    fn search(&mut self, k: usize) -> Step {
        let n = self.pairing.size();
        if k == 4 * n {
            self.record();
            return Step::Continue;
        }
        let target = FacetSpec::from_index(k);

        if self.pre[k].is_some() {
            return self.compare_and_descend(k);
        }

        let candidates: Vec<FacetSpec> = if k == 0 {
            FacetSpec::all(n).collect()
        } else {
            let Some(anchor) = self.pre[4 * target.simp] else {
                return Step::Continue;
            };
            (0..4)
                .map(|f| FacetSpec::new(anchor.simp, f))
                .filter(|f| self.image[f.index()].is_none())
                .collect()
        };

        for from in candidates {
            self.assign(from, target);
            let derived = self.derive_partner(from, target);
            let partner_unmappable =
                derived.is_none() && self.image[self.pairing.dest(from).index()].is_none();
            if !partner_unmappable {
                if let Some((p, img)) = derived {
                    self.assign(p, img);
                }
                let step = self.compare_and_descend(k);
                if let Some((p, img)) = derived {
                    self.unassign(p, img);
                }
                if let Step::NotCanonical = step {
                    return step;
                }
            }
            self.unassign(from, target);
        }
        Step::Continue
    }

    /// Compares the destination of image facet `k` with the image of its preimage's
    /// destination and recurses when they agree.
    fn compare_and_descend(&mut self, k: usize) -> Step {
        let target = FacetSpec::from_index(k);
        let Some(from) = self.pre[k] else {
            return Step::Continue;
        };
        let own = self.pairing.dest(target);
        let Some(mapped) = self.image[self.pairing.dest(from).index()] else {
            return Step::Continue;
        };
        match mapped.cmp(&own) {
            Ordering::Less => Step::NotCanonical,
            Ordering::Greater => Step::Continue,
            Ordering::Equal => self.search(k + 1),
        }
    }

    fn record(&mut self) {
        let n = self.pairing.size();
        let mut iso = Isomorphism::identity(n);
        for simp in 0..n {
            let images: Vec<FacetSpec> = (0..4)
                .filter_map(|f| self.image[4 * simp + f])
                .collect();
            if images.len() != 4 {
                return;
            }
            let Some(perm) = Perm4::from_images([
                images[0].facet,
                images[1].facet,
                images[2].facet,
                images[3].facet,
            ]) else {
                return;
            };
            iso.simp_image[simp] = images[0].simp;
            iso.facet_perm[simp] = perm;
        }
        self.found.push(iso);
    }
}

impl FacetPairing {
    /// Cheap necessary conditions for canonical form: destinations increase within each
    /// tetrahedron (apart from loops back to the previous facet), and facet 0 of each later
    /// tetrahedron is glued to an earlier tetrahedron, in increasing order.
    fn meets_canonical_preconditions(&self) -> bool {
        let n = self.size();
        for simp in 0..n {
            for facet in 0..3 {
                let here = self.dest_of(simp, facet);
                let next = self.dest_of(simp, facet + 1);
                if next < here && next != FacetSpec::new(simp, facet) {
                    return false;
                }
            }
            if simp > 0 && self.dest_of(simp, 0).simp >= simp {
                return false;
            }
            if simp > 1 && self.dest_of(simp, 0) <= self.dest_of(simp - 1, 0) {
                return false;
            }
        }
        true
    }

    /// Whether this pairing is the smallest representative of its isomorphism class.
    pub fn is_canonical(&self) -> bool {
        self.find_automorphisms().is_ok()
    }

    /// All automorphisms of a canonical pairing, the identity first.
    pub fn find_automorphisms(&self) -> Result<Vec<Isomorphism>, PairingError> {
        if !self.meets_canonical_preconditions() {
            return Err(PairingError::NotCanonical);
        }
        let mut relabelling = Relabelling::new(self);
        match relabelling.search(0) {
            Step::NotCanonical => Err(PairingError::NotCanonical),
            Step::Continue => {
                debug_assert!(relabelling.found.first().is_some_and(Isomorphism::is_identity));
                Ok(relabelling.found)
            }
        }
    }
}
