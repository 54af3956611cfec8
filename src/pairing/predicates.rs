//! Structural filters on facet pairings.
//!
//! Each predicate detects a subgraph of the pairing graph that cannot occur in a closed
//! prime minimal P²-irreducible triangulation. The chain based filters start from a loop
//! (a facet glued to another facet of the same tetrahedron), follow the one-ended chain
//! hanging off it with [`FacetPairing::follow_chain`] and then inspect what lies beyond.

use super::{FacePair, FacetPairing};

impl FacetPairing {
    /// Follows a chain of double edges from `tet`, leaving through `faces`.
    ///
    /// Moves along while both facets of `faces` lead to the same, different tetrahedron,
    /// and returns the tetrahedron and face pair at which the chain stops.
    pub fn follow_chain(&self, mut tet: usize, mut faces: FacePair) -> (usize, FacePair) {
        loop {
            let dest1 = self.dest_of(tet, faces.lower());
            let dest2 = self.dest_of(tet, faces.upper());
            if dest1.simp != dest2.simp || dest1.simp == tet {
                return (tet, faces);
            }
            tet = dest1.simp;
            faces = FacePair::new(dest1.facet, dest2.facet).complement();
        }
    }

    /// Runs `check` on the first loop of every tetrahedron in `0..end`.
    ///
    /// Only the first loop matters: a second one would make the tetrahedron a component
    /// of its own.
    fn any_chain_end(&self, end: usize, mut check: impl FnMut(usize, usize) -> bool) -> bool {
        for base_tet in 0..end {
            for base_face in 0..3 {
                if self.dest_of(base_tet, base_face).simp == base_tet {
                    if check(base_tet, base_face) {
                        return true;
                    }
                    break;
                }
            }
        }
        false
    }

    /// The tetrahedron and face pair at which the one-ended chain starting at the loop on
    /// `(base_tet, base_face)` stops.
    fn chain_from_loop(&self, base_tet: usize, base_face: usize) -> (usize, FacePair) {
        let faces = FacePair::new(base_face, self.dest_of(base_tet, base_face).facet).complement();
        self.follow_chain(base_tet, faces)
    }

    /// Three facets of one tetrahedron glued to three facets of another.
    pub fn has_triple_edge(&self) -> bool {
        (0..self.size()).any(|tet| {
            let mut equal = 0;
            for i in 0..4 {
                let d = self.dest_of(tet, i).simp;
                if d > tet {
                    equal += ((i + 1)..4)
                        .filter(|&j| self.dest_of(tet, j).simp == d)
                        .count();
                }
            }
            equal >= 3
        })
    }

    /// Two one-ended chains whose ends are joined by a single edge pair.
    pub fn has_broken_double_ended_chain(&self) -> bool {
        self.any_chain_end(self.size().saturating_sub(1), |base_tet, base_face| {
            let (bdry_tet, bdry_faces) = self.chain_from_loop(base_tet, base_face);
            if self.dest_of(bdry_tet, bdry_faces.lower()).simp == bdry_tet {
                return false;
            }
            [bdry_faces.lower(), bdry_faces.upper()]
                .into_iter()
                .any(|face| {
                    let dest_face = self.dest_of(bdry_tet, face);
                    (0..4).filter(|&ignore| ignore != dest_face.facet).any(|ignore| {
                        let (chain_tet, chain_faces) = self.follow_chain(
                            dest_face.simp,
                            FacePair::new(dest_face.facet, ignore).complement(),
                        );
                        self.dest_of(chain_tet, chain_faces.lower()).simp == chain_tet
                    })
                })
        })
    }

    /// A one-ended chain whose two exits lead to distinct tetrahedra joined by a double edge.
    pub fn has_one_ended_chain_with_double_handle(&self) -> bool {
        self.any_chain_end(self.size(), |base_tet, base_face| {
            let (bdry_tet, bdry_faces) = self.chain_from_loop(base_tet, base_face);
            let dest1 = self.dest_of(bdry_tet, bdry_faces.lower());
            let dest2 = self.dest_of(bdry_tet, bdry_faces.upper());
            if dest1.simp == dest2.simp {
                return false;
            }
            let handle = (0..4)
                .filter(|&i| self.dest_of(dest1.simp, i).simp == dest2.simp)
                .count();
            handle >= 2
        })
    }

    /// Two one-ended chains meeting at a pair of adjacent tetrahedra (the wedge).
    pub fn has_wedged_double_ended_chain(&self) -> bool {
        self.any_chain_end(self.size().saturating_sub(1), |base_tet, base_face| {
            let (bdry_tet, bdry_faces) = self.chain_from_loop(base_tet, base_face);
            let dest1 = self.dest_of(bdry_tet, bdry_faces.lower());
            let dest2 = self.dest_of(bdry_tet, bdry_faces.upper());
            if dest1.simp == dest2.simp {
                return false;
            }

            let mut through = [Vec::with_capacity(3), Vec::with_capacity(3)];
            let mut found_cross_edge = false;
            for i in 0..4 {
                if i != dest1.facet {
                    let next = self.dest_of(dest1.simp, i);
                    if next.simp == dest2.simp {
                        found_cross_edge = true;
                    } else if next.simp != dest1.simp {
                        through[0].push(next);
                    }
                }
                if i != dest2.facet {
                    let next = self.dest_of(dest2.simp, i);
                    if next.simp != dest1.simp && next.simp != dest2.simp {
                        through[1].push(next);
                    }
                }
            }
            if !found_cross_edge {
                return false;
            }

            through[0].iter().any(|a| {
                through[1].iter().filter(|b| a.simp == b.simp).any(|b| {
                    let (chain_tet, chain_faces) =
                        self.follow_chain(a.simp, FacePair::new(a.facet, b.facet).complement());
                    self.dest_of(chain_tet, chain_faces.lower()).simp == chain_tet
                })
            })
        })
    }

    /// A one-ended chain next to a bigon that is not part of one of two harmless
    /// configurations.
    pub fn has_one_ended_chain_with_stray_bigon(&self) -> bool {
        self.any_chain_end(self.size(), |base_tet, base_face| {
            let (bdry_tet, bdry_faces) = self.chain_from_loop(base_tet, base_face);
            if self.dest_of(bdry_tet, bdry_faces.lower()).simp == bdry_tet {
                return false;
            }

            for i in 0..2 {
                let (face, other) = if i == 0 {
                    (bdry_faces.lower(), bdry_faces.upper())
                } else {
                    (bdry_faces.upper(), bdry_faces.lower())
                };
                let dest_face = self.dest_of(bdry_tet, face);
                let bigon_tet = dest_face.simp;

                for ignore in (0..4).filter(|&f| f != dest_face.facet) {
                    let bigon_faces = FacePair::new(dest_face.facet, ignore).complement();
                    let far_upper = self.dest_of(bigon_tet, bigon_faces.upper());
                    let far_lower = self.dest_of(bigon_tet, bigon_faces.lower());
                    let far_tet = far_upper.simp;
                    if far_tet == bigon_tet || far_tet != far_lower.simp {
                        continue;
                    }

                    let extra_tet = self.dest_of(bdry_tet, other).simp;
                    if extra_tet == far_tet {
                        return true;
                    }
                    if extra_tet == self.dest_of(bigon_tet, ignore).simp {
                        // Harmless if extra_tet also meets far_tet.
                        if (0..4).all(|f| self.dest_of(far_tet, f).simp != extra_tet) {
                            return true;
                        }
                    } else {
                        // Harmless if extra_tet is joined twice to far_tet.
                        let far_faces = FacePair::new(far_upper.facet, far_lower.facet).complement();
                        if extra_tet != self.dest_of(far_tet, far_faces.upper()).simp
                            || extra_tet != self.dest_of(far_tet, far_faces.lower()).simp
                        {
                            return true;
                        }
                    }
                }
            }
            false
        })
    }

    /// Three one-ended chains meeting at a common pair of tetrahedra.
    pub fn has_triple_one_ended_chain(&self) -> bool {
        self.any_chain_end(self.size().saturating_sub(2), |base_tet, base_face| {
            let (bdry_tet, bdry_faces) = self.chain_from_loop(base_tet, base_face);
            if self.dest_of(bdry_tet, bdry_faces.lower()).simp == bdry_tet {
                return false;
            }
            let axis1 = self.dest_of(bdry_tet, bdry_faces.lower());
            let axis2 = self.dest_of(bdry_tet, bdry_faces.upper());
            if axis1.simp == axis2.simp {
                return false;
            }

            let mut n_chains = 1;
            for exit1 in (0..4).filter(|&f| f != axis1.facet) {
                let arrive1 = self.dest_of(axis1.simp, exit1);
                if arrive1.simp == bdry_tet
                    || arrive1.simp == axis1.simp
                    || arrive1.simp == axis2.simp
                {
                    continue;
                }
                for exit2 in (0..4).filter(|&f| f != axis2.facet) {
                    let arrive2 = self.dest_of(axis2.simp, exit2);
                    if arrive2.simp != arrive1.simp {
                        continue;
                    }
                    let (chain_tet, chain_faces) = self.follow_chain(
                        arrive1.simp,
                        FacePair::new(arrive1.facet, arrive2.facet).complement(),
                    );
                    if self.dest_of(chain_tet, chain_faces.lower()).simp == chain_tet {
                        n_chains += 1;
                        if n_chains == 3 {
                            return true;
                        }
                    }
                }
            }
            false
        })
    }

    /// Two adjacent tetrahedra whose eight neighbours are all distinct.
    pub fn has_single_star(&self) -> bool {
        let n = self.size();
        for first in 0..n.saturating_sub(1) {
            let mut half: Vec<usize> = (0..4).map(|f| self.dest_of(first, f).simp).collect();
            half.sort_unstable();
            if half.windows(2).any(|w| w[0] == w[1]) {
                continue;
            }
            for f1 in 0..4 {
                let second = self.dest_of(first, f1).simp;
                let mut all = half.clone();
                all.extend((0..4).map(|f| self.dest_of(second, f).simp));
                all.sort_unstable();
                if all.windows(2).all(|w| w[0] != w[1]) {
                    return true;
                }
            }
        }
        false
    }

    /// Two tetrahedra joined by a double edge whose remaining four neighbours, together
    /// with `first`'s other two, are all distinct.
    pub fn has_double_star(&self) -> bool {
        let n = self.size();
        for first in 0..n.saturating_sub(1) {
            let mut all: Vec<usize> = (0..4).map(|f| self.dest_of(first, f).simp).collect();
            all.sort_unstable();

            let second = if all[0] == all[1] && all[1] != all[2] && all[2] != all[3] {
                let s = all[0];
                all[0] = all[3];
                s
            } else if all[0] != all[1] && all[1] == all[2] && all[2] != all[3] {
                let s = all[1];
                all[1] = all[3];
                s
            } else if all[0] != all[1] && all[1] != all[2] && all[2] == all[3] {
                all[2]
            } else {
                continue;
            };
            all.truncate(3);
            all.extend((0..4).map(|f| self.dest_of(second, f).simp));
            all.sort_unstable();

            // Only one duplicate pair is allowed, and it must be two copies of first.
            let clean = (0..6).all(|i| {
                all[i] != all[i + 1] || (all[i] == first && (i >= 5 || all[i] != all[i + 2]))
            });
            if clean {
                return true;
            }
        }
        false
    }

    /// Four tetrahedra forming a square with two double edges on opposite sides.
    pub fn has_double_square(&self) -> bool {
        let n = self.size();
        for t1 in 0..n.saturating_sub(3) {
            for join in 0..4 {
                let t2 = self.dest_of(t1, join);
                if t2.simp == t1 {
                    continue;
                }

                let Some(adj1) = self.double_edge_away(t1, join, &[t1, t2.simp]) else {
                    continue;
                };
                let Some(adj2) = self.double_edge_away(t2.simp, t2.facet, &[t1, t2.simp, adj1])
                else {
                    continue;
                };
                if (0..4).any(|f| self.dest_of(adj1, f).simp == adj2) {
                    return true;
                }
            }
        }
        false
    }

    /// A tetrahedron outside `avoid` that `tet` meets through two of its facets other than
    /// `skip`, the lower facet being one of 0, 1, 2.
    fn double_edge_away(&self, tet: usize, skip: usize, avoid: &[usize]) -> Option<usize> {
        for fa in (0..3).filter(|&f| f != skip) {
            let adj = self.dest_of(tet, fa).simp;
            if avoid.contains(&adj) {
                continue;
            }
            if ((fa + 1)..4)
                .filter(|&fb| fb != skip)
                .any(|fb| self.dest_of(tet, fb).simp == adj)
            {
                return Some(adj);
            }
        }
        None
    }
}
