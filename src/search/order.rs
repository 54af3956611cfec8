//! The order in which facet pairs receive their gluings.
//!
//! The compact search glues facet pairs in plain facet order. The closed prime minimal
//! search first walks every one-ended chain of the pairing graph, from the loop at its end
//! outwards, because each gluing along such a chain is forced to one of two choices. All
//! other facet pairs follow in facet order, tagged by whether they belong to a double edge.

use tracing::debug;

use crate::{
    gluing::GluingPerms,
    pairing::{FacePair, FacetPairing, FacetSpec},
    perm::Perm4,
};

/// What kind of pairing-graph edge a facet pair in the search order sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderType {
    /// The loop at the end of a one-ended chain.
    ChainEnd = 1,
    /// First of the two parallel edges of a chain link.
    ChainInternalFirst = 2,
    /// Second of the two parallel edges of a chain link.
    ChainInternalSecond = 3,
    DoubleFirst = 4,
    DoubleSecond = 5,
    Misc = 6,
}

impl OrderType {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<OrderType> {
        Some(match code {
            1 => OrderType::ChainEnd,
            2 => OrderType::ChainInternalFirst,
            3 => OrderType::ChainInternalSecond,
            4 => OrderType::DoubleFirst,
            5 => OrderType::DoubleSecond,
            6 => OrderType::Misc,
            _ => return None,
        })
    }

    /// Whether the gluing is one of two precomputed chain permutations.
    pub fn is_chain(self) -> bool {
        matches!(
            self,
            OrderType::ChainEnd | OrderType::ChainInternalFirst | OrderType::ChainInternalSecond
        )
    }
}

/// Search order data specific to the closed prime minimal search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSchedule {
    /// One entry per position of the search order.
    pub order_type: Vec<OrderType>,
    /// The leading positions of the order that lie on one-ended chains.
    pub n_chain_edges: usize,
    /// Two candidate S₃ indices for every chain position, `2 * n_chain_edges` in all.
    pub chain_perm_indices: Vec<i8>,
}

impl ChainSchedule {
    /// The two candidate indices for position `elt`.
    pub fn candidates(&self, elt: usize) -> [i8; 2] {
        [
            self.chain_perm_indices[2 * elt],
            self.chain_perm_indices[2 * elt + 1],
        ]
    }
}

/// The lower facet of every facet pair, in facet order.
pub fn facet_order(pairing: &FacetPairing) -> Vec<FacetSpec> {
    FacetSpec::all(pairing.size())
        .filter(|&f| f < pairing.dest(f))
        .collect()
}

/// The first structural filter that rules out every closed prime minimal P²-irreducible
/// triangulation on this pairing, if any.
pub fn failing_filter(pairing: &FacetPairing) -> Option<&'static str> {
    let filters: [(&'static str, fn(&FacetPairing) -> bool); 6] = [
        ("triple edge", FacetPairing::has_triple_edge),
        (
            "broken double-ended chain",
            FacetPairing::has_broken_double_ended_chain,
        ),
        (
            "one-ended chain with double handle",
            FacetPairing::has_one_ended_chain_with_double_handle,
        ),
        (
            "one-ended chain with stray bigon",
            FacetPairing::has_one_ended_chain_with_stray_bigon,
        ),
        (
            "wedged double-ended chain",
            FacetPairing::has_wedged_double_ended_chain,
        ),
        (
            "triple one-ended chain",
            FacetPairing::has_triple_one_ended_chain,
        ),
    ];
    filters
        .into_iter()
        .find(|(_, test)| test(pairing))
        .map(|(name, _)| name)
}

/// Builds the chain-first search order and its schedule.
pub fn chain_order(perms: &GluingPerms) -> (Vec<FacetSpec>, ChainSchedule) {
    let pairing = perms.pairing();
    let n = pairing.size();
    let mut order = vec![FacetSpec::new(0, 0); 2 * n];
    let mut order_type = vec![OrderType::Misc; 2 * n];
    let mut assigned = vec![false; 4 * n];
    let mut done = 0;

    // Loops, each the end of a one-ended chain.
    for face in FacetSpec::all(n) {
        if assigned[face.index()] {
            continue;
        }
        let adj = pairing.dest(face);
        if adj.simp != face.simp {
            continue;
        }
        order[done] = face;
        order_type[done] = OrderType::ChainEnd;
        assigned[face.index()] = true;
        assigned[adj.index()] = true;
        done += 1;
    }
    let n_chains = done;

    for i in 0..n_chains {
        let mut tet = order[i].simp;
        let mut faces = FacePair::new(order[i].facet, pairing.dest(order[i]).facet).complement();
        let mut dest1 = pairing.dest_of(tet, faces.lower());
        let mut dest2 = pairing.dest_of(tet, faces.upper());

        while dest1.simp == dest2.simp
            && dest1.simp != tet
            && !assigned[FacetSpec::new(tet, faces.lower()).index()]
            && !assigned[FacetSpec::new(tet, faces.upper()).index()]
        {
            order_type[done] = OrderType::ChainInternalFirst;
            order_type[done + 1] = OrderType::ChainInternalSecond;
            if tet < dest1.simp {
                order[done] = FacetSpec::new(tet, faces.lower());
                order[done + 1] = FacetSpec::new(tet, faces.upper());
            }
            assigned[FacetSpec::new(tet, faces.lower()).index()] = true;
            assigned[FacetSpec::new(tet, faces.upper()).index()] = true;
            assigned[dest1.index()] = true;
            assigned[dest2.index()] = true;

            faces = FacePair::new(dest1.facet, dest2.facet);
            if dest1.simp < tet {
                order[done] = FacetSpec::new(dest1.simp, faces.lower());
                order[done + 1] = FacetSpec::new(dest1.simp, faces.upper());
            }

            faces = faces.complement();
            tet = dest1.simp;
            dest1 = pairing.dest_of(tet, faces.lower());
            dest2 = pairing.dest_of(tet, faces.upper());
            done += 2;
        }
    }
    let n_chain_edges = done;

    for face in FacetSpec::all(n) {
        if assigned[face.index()] {
            continue;
        }
        let adj = pairing.dest(face);
        order[done] = face;
        order_type[done] = if face.facet < 3
            && pairing.dest_of(face.simp, face.facet + 1).simp == adj.simp
        {
            OrderType::DoubleFirst
        } else if face.facet > 0 && pairing.dest_of(face.simp, face.facet - 1).simp == adj.simp
        {
            OrderType::DoubleSecond
        } else {
            OrderType::Misc
        };
        assigned[face.index()] = true;
        assigned[adj.index()] = true;
        done += 1;
    }
    debug_assert_eq!(done, 2 * n);

    let chain_perm_indices = chain_candidates(perms, &order, &order_type, n_chain_edges);
    debug!(n_chains, n_chain_edges, n_pairs = 2 * n, "built chain schedule");

    (
        order,
        ChainSchedule {
            order_type,
            n_chain_edges,
            chain_perm_indices,
        },
    )
}

fn index_of(perms: &GluingPerms, face: FacetSpec, p: Perm4) -> i8 {
    let index = perms.gluing_to_index(face, p);
    debug_assert!(index.is_some(), "{p} does not glue {face} to its partner");
    index.map_or(-1, |i| i as i8)
}

/// The two gluings worth trying on each chain position.
///
/// A loop can only be folded in the two ways that do not create a degree one or two edge.
/// Along a chain the two gluings of a link decide each other, so the second facet of the
/// link gets the matching choice for each choice on the first.
fn chain_candidates(
    perms: &GluingPerms,
    order: &[FacetSpec],
    order_type: &[OrderType],
    n_chain_edges: usize,
) -> Vec<i8> {
    let pairing = perms.pairing();
    let mut cpi = vec![-1i8; 2 * n_chain_edges];

    for i in 0..n_chain_edges {
        match order_type[i] {
            OrderType::ChainEnd => {
                let faces = FacePair::new(order[i].facet, pairing.dest(order[i]).facet);
                let comp = faces.complement();
                let (fl, fu) = (faces.lower(), faces.upper());
                let (cl, cu) = (comp.lower(), comp.upper());
                let first = Perm4::from_pairs(fl, fu, fu, cl, cl, cu, cu, fl);
                let second = Perm4::from_pairs(fl, fu, fu, cu, cu, cl, cl, fl);
                cpi[2 * i] = index_of(perms, order[i], first);
                cpi[2 * i + 1] = index_of(perms, order[i], second);
            }
            OrderType::ChainInternalFirst => {
                let faces = FacePair::new(order[i].facet, order[i + 1].facet);
                let comp = faces.complement();
                let adj = FacePair::new(
                    pairing.dest(order[i]).facet,
                    pairing.dest(order[i + 1]).facet,
                );
                let comp_adj = adj.complement();
                let (fl, fu) = (faces.lower(), faces.upper());
                let (cl, cu) = (comp.lower(), comp.upper());
                let (al, au) = (adj.lower(), adj.upper());
                let (cal, cau) = (comp_adj.lower(), comp_adj.upper());

                let trial1 = Perm4::from_pairs(fl, al, fu, cal, cl, cau, cu, au);
                let trial2 = Perm4::from_pairs(fl, al, fu, cau, cl, cal, cu, au);
                let (first, second) = if trial1.compare_with(&trial2).is_lt() {
                    (trial1, Perm4::from_pairs(fl, cau, fu, au, cl, al, cu, cal))
                } else {
                    (trial2, Perm4::from_pairs(fl, cal, fu, au, cl, al, cu, cau))
                };
                cpi[2 * i] = index_of(perms, order[i], first);
                cpi[2 * i + 2] = index_of(perms, order[i + 1], second);

                let trial1 = Perm4::from_pairs(fl, al, fu, cal, cl, au, cu, cau);
                let trial2 = Perm4::from_pairs(fl, al, fu, cau, cl, au, cu, cal);
                let (first, second) = if trial1.compare_with(&trial2).is_lt() {
                    (trial1, Perm4::from_pairs(fl, cau, fu, au, cl, cal, cu, al))
                } else {
                    (trial2, Perm4::from_pairs(fl, cal, fu, au, cl, cau, cu, al))
                };
                cpi[2 * i + 1] = index_of(perms, order[i], first);
                cpi[2 * i + 3] = index_of(perms, order[i + 1], second);
            }
            _ => {}
        }
    }
    cpi
}
