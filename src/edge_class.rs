//! # Edge class tracking
//!
//! The six edges of every tetrahedron are partitioned into edge classes as gluings are
//! chosen. [`EdgeClasses`] keeps the partition with undo, and checks each merge against the
//! local obstructions to a minimal prime triangulation.
//!
//! ## Key Features:
//!
//! - **Degree**: the root of each class holds `size`, the number of tetrahedron edges in it.
//!   A class that closes up with degree at most 2, or degree 3 around three distinct
//!   tetrahedra, can be simplified ([`EdgeFlags::LOW_DEG`]).
//! - **Twist**: an edge identified with itself in reverse gives [`EdgeFlags::TWISTED`].
//! - **Face incidence**: each class records, as two [`Qitmask`]s, the faces of tetrahedra
//!   `0..16` lying on the positive or negative side of its edges. A face seen on both sides
//!   has two edges identified to form a cone ([`EdgeFlags::CONE`]), and a face counted three
//!   times on one side has all its edges identified, spanning an L(3,1) spine
//!   ([`EdgeFlags::L31`]).
//! - **High degree**: the sum over classes of `size` above a fixed limit may not exceed a
//!   bound determined by the number of tetrahedra ([`EdgeFlags::HIGH_DEG`]).

use derive_more::{BitAnd, BitOr, BitOrAssign};
use tracing::warn;

use crate::{
    error::InvalidInput,
    gluing::{push_joined, GluingPerms},
    pairing::{FacetPairing, FacetSpec},
    qitmask::Qitmask,
    tokens::Tokens,
    union_find::{attach, detach, find, ChangeLog, UfLink, UfNode},
    vertex_link::forest_is_acyclic,
};

/// The number of the edge joining two distinct vertices of a tetrahedron.
pub const EDGE_NUMBER: [[usize; 4]; 4] = [[6, 0, 1, 2], [0, 6, 3, 4], [1, 3, 6, 5], [2, 4, 5, 6]];

/// The endpoints of each tetrahedron edge, smaller vertex first.
pub const EDGE_VERTEX: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// Tetrahedra beyond this many are not tracked in the face masks.
pub const MASKED_TETS: usize = Qitmask::BITS / 4;

/// Obstructions found while merging edge classes for one gluing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BitOr, BitOrAssign, BitAnd)]
pub struct EdgeFlags(u8);

impl EdgeFlags {
    /// An edge is identified with itself in reverse.
    pub const TWISTED: EdgeFlags = EdgeFlags(1);
    /// An edge of degree at most 3 closed up.
    pub const LOW_DEG: EdgeFlags = EdgeFlags(2);
    /// Too much total edge degree above the limit.
    pub const HIGH_DEG: EdgeFlags = EdgeFlags(4);
    /// Two edges of one face identified to form a cone.
    pub const CONE: EdgeFlags = EdgeFlags(8);
    /// All three edges of one face identified.
    pub const L31: EdgeFlags = EdgeFlags(16);

    pub const fn empty() -> Self {
        EdgeFlags(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: EdgeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// State of one tetrahedron edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeState {
    pub link: UfLink,
    /// Number of tetrahedron edges in the class; meaningful at roots only.
    pub size: usize,
    /// Whether the class still meets the boundary.
    pub bounded: bool,
    pub faces_pos: Qitmask,
    pub faces_neg: Qitmask,
}

impl EdgeState {
    /// The initial state of edge slot `id`, with its two incident faces recorded.
    fn pristine(id: usize) -> Self {
        let (tet, edge) = (id / 6, id % 6);
        let mut faces_pos = Qitmask::new();
        let mut faces_neg = Qitmask::new();
        if tet < MASKED_TETS {
            // Faces are numbered by their opposite vertex, signed by whether the edge runs
            // along the face's natural orientation.
            let face = |f: usize| 4 * tet + f;
            match edge {
                0 => {
                    faces_pos.set(face(3), 1);
                    faces_pos.set(face(2), 1);
                }
                1 => {
                    faces_neg.set(face(3), 1);
                    faces_pos.set(face(1), 1);
                }
                2 => {
                    faces_neg.set(face(2), 1);
                    faces_neg.set(face(1), 1);
                }
                3 => {
                    faces_pos.set(face(3), 1);
                    faces_pos.set(face(0), 1);
                }
                4 => {
                    faces_pos.set(face(2), 1);
                    faces_neg.set(face(0), 1);
                }
                _ => {
                    faces_pos.set(face(1), 1);
                    faces_pos.set(face(0), 1);
                }
            }
        }
        EdgeState {
            link: UfLink::default(),
            size: 1,
            bounded: true,
            faces_pos,
            faces_neg,
        }
    }
}

impl UfNode for EdgeState {
    fn link(&self) -> &UfLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut UfLink {
        &mut self.link
    }
}

/// Running total of edge degree above `limit`, bounded by `bound`.
///
/// A minimal triangulation of N tetrahedra with one vertex has N + 1 edges of total degree
/// 6N, which caps how much degree can sit above the limit. The limit is 3 when the pairing
/// begins with the chain end of a (1,3,4) layered solid torus, whose degree 3 edge is
/// allowed, and 4 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighDegree {
    pub limit: isize,
    pub sum: isize,
    pub bound: isize,
}

impl HighDegree {
    pub fn for_pairing(pairing: &FacetPairing) -> Self {
        let dest = |simp, facet| pairing.dest(FacetSpec::new(simp, facet)).simp;
        let limit = if dest(0, 0) == 0 && dest(0, 2) == 1 && dest(0, 3) == 1 {
            3
        } else {
            4
        };
        HighDegree {
            limit,
            sum: 0,
            bound: Self::bound_for(limit, pairing.size()),
        }
    }

    fn bound_for(limit: isize, n_tets: usize) -> isize {
        (6 - limit) * n_tets as isize - limit
    }

    /// The change in `sum` when classes of sizes `a` and `b` are merged.
    fn merge_excess(&self, a: isize, b: isize) -> isize {
        let limit = self.limit;
        if a >= limit {
            if b >= limit {
                limit
            } else {
                b
            }
        } else if b >= limit {
            a
        } else if a + b > limit {
            a + b - limit
        } else {
            0
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.sum > self.bound
    }

    pub(crate) fn dump_data(&self, out: &mut String) {
        out.push_str(&format!("{} {} {}\n", self.limit, self.sum, self.bound));
    }

    pub(crate) fn read_data(tokens: &mut Tokens<'_>, n_tets: usize) -> Result<Self, InvalidInput> {
        let limit = tokens.next_in("high degree limit", 3..=4)? as isize;
        let sum = tokens.next_in("high degree sum", 0..=6 * n_tets as i64)? as isize;
        let bound = tokens.next_int("high degree bound")? as isize;
        if bound != Self::bound_for(limit, n_tets) {
            return Err(InvalidInput::OutOfRange {
                what: "high degree bound",
                value: bound as i64,
            });
        }
        Ok(HighDegree { limit, sum, bound })
    }
}

/// The edge class tracker for all `6n` tetrahedron edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeClasses {
    states: Vec<EdgeState>,
    changed: ChangeLog,
    n_classes: usize,
    /// Present when merges check every obstruction, not only twists.
    high_deg: Option<HighDegree>,
}

impl EdgeClasses {
    /// A tracker that only reports [`EdgeFlags::TWISTED`].
    pub fn new(n_tets: usize) -> Self {
        EdgeClasses {
            states: (0..6 * n_tets).map(EdgeState::pristine).collect(),
            changed: ChangeLog::new(8 * n_tets),
            n_classes: 6 * n_tets,
            high_deg: None,
        }
    }

    /// A tracker that reports every obstruction to a closed prime minimal triangulation.
    pub fn closed_prime_min(pairing: &FacetPairing) -> Self {
        if pairing.size() > MASKED_TETS {
            warn!(
                n_tets = pairing.size(),
                "face masks only cover the first {MASKED_TETS} tetrahedra; cone and L(3,1) pruning is weakened"
            );
        }
        EdgeClasses {
            high_deg: Some(HighDegree::for_pairing(pairing)),
            ..EdgeClasses::new(pairing.size())
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn states(&self) -> &[EdgeState] {
        &self.states
    }

    pub fn changed(&self) -> &ChangeLog {
        &self.changed
    }

    pub fn high_degree(&self) -> Option<&HighDegree> {
        self.high_deg.as_ref()
    }

    /// Whether every edge is back in its initial, unglued state.
    pub fn is_pristine(&self) -> bool {
        self.n_classes == self.states.len()
            && self.changed.is_clear()
            && self.high_deg.map_or(true, |h| h.sum == 0)
            && self
                .states
                .iter()
                .enumerate()
                .all(|(i, s)| *s == EdgeState::pristine(i))
    }

    /// Merges the edge classes identified by the gluing on `face`, chosen at step `step`.
    pub fn merge(&mut self, perms: &GluingPerms, face: FacetSpec, step: usize) -> EdgeFlags {
        let adj = perms.pairing().dest(face);
        let p = perms.perm(face);
        let mut flags = EdgeFlags::empty();

        let v1 = face.facet;
        let w1 = p[v1];
        for v2 in (0..4).filter(|&v2| v2 != v1) {
            let w2 = p[v2];

            // The edge opposite v1-v2, and its image.
            let e = 5 - EDGE_NUMBER[v1][v2];
            let f = 5 - EDGE_NUMBER[w1][w2];
            let slot = ChangeLog::slot(step, v2);

            // Edges run from their smaller vertex to their larger one.
            let has_twist = p[EDGE_VERTEX[e][0]] > p[EDGE_VERTEX[e][1]];

            let (e_rep, e_up) = find(&self.states, e + 6 * face.simp);
            let (f_rep, f_up) = find(&self.states, f + 6 * adj.simp);
            let parent_twists = e_up ^ f_up;

            if e_rep == f_rep {
                self.states[e_rep].bounded = false;
                if self.high_deg.is_some() {
                    let size = self.states[e_rep].size;
                    if size <= 2 {
                        flags |= EdgeFlags::LOW_DEG;
                    } else if size == 3 {
                        let middle = perms.pairing().dest(FacetSpec::new(face.simp, v2)).simp;
                        if face.simp != adj.simp && adj.simp != middle && middle != face.simp {
                            flags |= EdgeFlags::LOW_DEG;
                        }
                    }
                }
                if has_twist ^ parent_twists {
                    flags |= EdgeFlags::TWISTED;
                }
                self.changed.record(slot, None);
            } else {
                if let Some(high_deg) = self.high_deg.as_mut() {
                    let excess = high_deg.merge_excess(
                        self.states[e_rep].size as isize,
                        self.states[f_rep].size as isize,
                    );
                    high_deg.sum += excess;
                }

                let child = attach(&mut self.states, e_rep, f_rep, has_twist ^ parent_twists);
                let rep = if child == e_rep { f_rep } else { e_rep };
                let sub = self.states[child];
                let root = &mut self.states[rep];
                root.size += sub.size;

                if let Some(high_deg) = self.high_deg {
                    if sub.link.twist_up {
                        root.faces_pos += sub.faces_neg;
                        root.faces_neg += sub.faces_pos;
                    } else {
                        root.faces_pos += sub.faces_pos;
                        root.faces_neg += sub.faces_neg;
                    }
                    if root.faces_pos.has_non_zero_match(&root.faces_neg) {
                        flags |= EdgeFlags::CONE;
                    }
                    if root.faces_pos.has3() || root.faces_neg.has3() {
                        flags |= EdgeFlags::L31;
                    }
                    if high_deg.is_exceeded() {
                        flags |= EdgeFlags::HIGH_DEG;
                    }
                }

                self.changed.record(slot, Some(child));
                self.n_classes -= 1;
            }
        }

        flags
    }

    /// Reverses [`EdgeClasses::merge`] for the gluing on `face` at step `step`.
    pub fn split(&mut self, face: FacetSpec, step: usize) {
        let v1 = face.facet;
        for v2 in (0..4).rev().filter(|&v2| v2 != v1) {
            let e = 5 - EDGE_NUMBER[v1][v2];
            let e_idx = e + 6 * face.simp;
            let slot = ChangeLog::slot(step, v2);

            match self.changed.take(slot) {
                None => {
                    let (rep, _) = find(&self.states, e_idx);
                    self.states[rep].bounded = true;
                }
                Some(child) => {
                    let sub = self.states[child];
                    let rep = detach(&mut self.states, child);
                    let root = &mut self.states[rep];
                    root.size -= sub.size;

                    if let Some(high_deg) = self.high_deg.as_mut() {
                        let excess = high_deg.merge_excess(root.size as isize, sub.size as isize);
                        high_deg.sum -= excess;
                        if sub.link.twist_up {
                            root.faces_pos -= sub.faces_neg;
                            root.faces_neg -= sub.faces_pos;
                        } else {
                            root.faces_pos -= sub.faces_pos;
                            root.faces_neg -= sub.faces_neg;
                        }
                    }
                    self.n_classes += 1;
                }
            }
        }
    }

    /// Appends the class count, one line per edge state and the change log.
    pub fn dump_data(&self, out: &mut String) {
        let n_digits = (self.states.len() / 6 * 4).min(Qitmask::BITS);
        out.push_str(&format!("{}\n", self.n_classes));
        for s in &self.states {
            out.push_str(&format!(
                "{} {} {} {} {} {} {} {}\n",
                s.link.parent,
                s.link.rank,
                s.size,
                u8::from(s.bounded),
                u8::from(s.link.twist_up),
                u8::from(s.link.had_equal_rank),
                s.faces_pos.digits(n_digits),
                s.faces_neg.digits(n_digits),
            ));
        }
        push_joined(out, self.changed.slots().iter());
        out.push('\n');
    }

    /// Reads the output of [`EdgeClasses::dump_data`]. The high degree data is stored
    /// separately and attached with [`EdgeClasses::set_high_degree`].
    pub(crate) fn read_data(tokens: &mut Tokens<'_>, n_tets: usize) -> Result<Self, InvalidInput> {
        let n_states = 6 * n_tets as i64;
        let n_digits = (4 * n_tets).min(Qitmask::BITS);
        let n_classes = tokens.next_in("edge class count", 0..=n_states)? as usize;

        let mut states = Vec::with_capacity(6 * n_tets);
        for _ in 0..6 * n_tets {
            let parent = tokens.next_in("edge parent", -1..n_states)? as isize;
            let rank = tokens.next_in("edge rank", 0..n_states)? as usize;
            let size = tokens.next_in("edge size", 1..=n_states)? as usize;
            let bounded = tokens.next_bit("edge bounded flag")?;
            let twist_up = tokens.next_bit("edge twist")?;
            let had_equal_rank = tokens.next_bit("edge equal rank flag")?;
            let mut mask = || -> Result<Qitmask, InvalidInput> {
                let tok = tokens.next_str("edge face mask")?;
                Qitmask::from_digits(tok)
                    .filter(|_| tok.len() == n_digits)
                    .ok_or_else(|| InvalidInput::MalformedToken {
                        what: "edge face mask",
                        token: tok.to_string(),
                    })
            };
            let faces_pos = mask()?;
            let faces_neg = mask()?;
            states.push(EdgeState {
                link: UfLink {
                    parent,
                    rank,
                    twist_up,
                    had_equal_rank,
                },
                size,
                bounded,
                faces_pos,
                faces_neg,
            });
        }

        let mut slots = Vec::with_capacity(8 * n_tets);
        for _ in 0..8 * n_tets {
            slots.push(tokens.next_in("edge change log", -1..n_states)? as isize);
        }

        let links: Vec<UfLink> = states.iter().map(|s| s.link).collect();
        if !forest_is_acyclic(&links) {
            return Err(InvalidInput::Inconsistent("edge classes contain a cycle"));
        }
        if links.iter().filter(|l| l.is_root()).count() != n_classes {
            return Err(InvalidInput::Inconsistent("edge class count does not match"));
        }

        Ok(EdgeClasses {
            states,
            changed: ChangeLog::from_slots(slots),
            n_classes,
            high_deg: None,
        })
    }

    pub(crate) fn set_high_degree(&mut self, high_deg: HighDegree) {
        self.high_deg = Some(high_deg);
    }
}
