//! # Vertex link tracking
//!
//! Every tetrahedron vertex contributes one triangle to the link of the vertex class it
//! belongs to. [`VertexLinks`] assembles these triangles into surfaces as gluings are chosen
//! and detects, one gluing at a time, when a link closes up or stops being a sphere.
//!
//! ## Key Features:
//!
//! - **Classes**: tetrahedron vertices form a twisted union–find (see
//!   [`union_find`](crate::union_find)); the root of each class stores `bdry`, the number of
//!   boundary edges of the whole link.
//! - **Boundary cycles**: each vertex triangle that still has boundary edges keeps
//!   `bdry_next` / `bdry_twist`, the neighbouring boundary edges in both directions of its
//!   boundary cycle. Consecutive boundary edges from the same triangle are skipped over.
//! - **Undo**: merges are logged in a [`ChangeLog`], and the neighbour pointers overwritten
//!   when a triangle drops to a single boundary edge are kept in `bdry_next_old` /
//!   `bdry_twist_old`, so [`VertexLinks::split`] restores the exact prior state.
//!
//! Identifying two boundary edges of different cycles in the same class creates genus, and
//! identifying edges with reversed orientation creates a non-orientable link; both are
//! reported as [`LinkFlags::NON_SPHERE`].

use derive_more::{BitAnd, BitOr, BitOrAssign};

use crate::{
    error::InvalidInput,
    gluing::{push_joined, GluingPerms},
    pairing::FacetSpec,
    tokens::Tokens,
    union_find::{attach, detach, find, ChangeLog, UfLink, UfNode},
};

/// For vertex `v` and a face `f` containing it, the face holding the next edge of `v`'s link
/// triangle going around in the positive direction.
pub const VERTEX_LINK_NEXT_FACE: [[usize; 4]; 4] =
    [[4, 2, 3, 1], [3, 4, 0, 2], [1, 3, 4, 0], [1, 2, 0, 4]];

/// As [`VERTEX_LINK_NEXT_FACE`], in the negative direction.
pub const VERTEX_LINK_PREV_FACE: [[usize; 4]; 4] =
    [[4, 3, 1, 2], [2, 4, 3, 0], [3, 0, 4, 1], [2, 0, 1, 4]];

/// Result of merging vertex classes for one gluing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BitOr, BitOrAssign, BitAnd)]
pub struct LinkFlags(u8);

impl LinkFlags {
    /// Some vertex link has no boundary left.
    pub const CLOSED: LinkFlags = LinkFlags(1);
    /// Some vertex link has become non-orientable or gained genus.
    pub const NON_SPHERE: LinkFlags = LinkFlags(2);

    pub const fn empty() -> Self {
        LinkFlags(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: LinkFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// State of one tetrahedron vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexState {
    pub link: UfLink,
    /// Boundary edges of the whole link; meaningful at roots only.
    pub bdry: isize,
    /// Boundary edges of this vertex's own triangle, `0..=3`.
    pub bdry_edges: i8,
    pub bdry_next: [usize; 2],
    pub bdry_twist: [bool; 2],
    pub bdry_next_old: [isize; 2],
    pub bdry_twist_old: [bool; 2],
}

impl VertexState {
    fn pristine(id: usize) -> Self {
        VertexState {
            link: UfLink::default(),
            bdry: 3,
            bdry_edges: 3,
            bdry_next: [id, id],
            bdry_twist: [false, false],
            bdry_next_old: [-1, -1],
            bdry_twist_old: [false, false],
        }
    }
}

impl UfNode for VertexState {
    fn link(&self) -> &UfLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut UfLink {
        &mut self.link
    }
}

#[inline]
fn bit(b: bool) -> usize {
    b as usize
}

/// The vertex link tracker for all `4n` tetrahedron vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLinks {
    states: Vec<VertexState>,
    changed: ChangeLog,
    n_classes: usize,
}

impl VertexLinks {
    pub fn new(n_tets: usize) -> Self {
        VertexLinks {
            states: (0..4 * n_tets).map(VertexState::pristine).collect(),
            changed: ChangeLog::new(8 * n_tets),
            n_classes: 4 * n_tets,
        }
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn states(&self) -> &[VertexState] {
        &self.states
    }

    pub fn changed(&self) -> &ChangeLog {
        &self.changed
    }

    /// Whether every vertex is back in its initial, unglued state.
    pub fn is_pristine(&self) -> bool {
        self.n_classes == self.states.len()
            && self.changed.is_clear()
            && self.states.iter().enumerate().all(|(i, s)| {
                let p = VertexState::pristine(i);
                s.link == p.link
                    && s.bdry == p.bdry
                    && s.bdry_edges == p.bdry_edges
                    && s.bdry_next == p.bdry_next
                    && s.bdry_twist == p.bdry_twist
            })
    }

    /// Merges the vertex classes identified by the gluing on `face`, chosen at step `step`.
    pub fn merge(&mut self, perms: &GluingPerms, face: FacetSpec, step: usize) -> LinkFlags {
        let adj = perms.pairing().dest(face);
        let p = perms.perm(face);
        let mut flags = LinkFlags::empty();

        for v in (0..4).filter(|&v| v != face.facet) {
            let w = p[v];
            let v_idx = v + 4 * face.simp;
            let w_idx = w + 4 * adj.simp;
            let slot = ChangeLog::slot(step, v);

            // Do the natural orientations of the two link triangles disagree?
            let has_twist = (p.sign() > 0) ^ ((v == 3) != (w == 3));
            let h = bit(has_twist);

            let (v_rep, v_up) = find(&self.states, v_idx);
            let (w_rep, w_up) = find(&self.states, w_idx);
            let parent_twists = v_up ^ w_up;

            if v_rep == w_rep {
                self.states[v_rep].bdry -= 2;
                if self.states[v_rep].bdry == 0 {
                    flags |= LinkFlags::CLOSED;
                }
                if has_twist ^ parent_twists {
                    flags |= LinkFlags::NON_SPHERE;
                }
                self.changed.record(slot, None);

                if v_idx == w_idx {
                    // Folding two edges of one triangle together.
                    let s = self.states[v_idx];
                    if !has_twist && s.bdry_edges < 3 && s.bdry_next[0] != v_idx {
                        self.join(
                            s.bdry_next[0],
                            1 ^ bit(s.bdry_twist[0]),
                            s.bdry_next[1],
                            s.bdry_twist[1] ^ s.bdry_twist[0],
                        );
                    }
                    self.states[v_idx].bdry_edges -= 2;
                } else {
                    self.backup_if_two(v_idx);
                    self.backup_if_two(w_idx);

                    if self.length_one(v_idx) && self.length_one(w_idx) {
                        flags |= LinkFlags::NON_SPHERE;
                    } else if !self.length_two(v_idx, w_idx) {
                        let (vn, vt) = self.next(perms, face, v_idx, face.simp, v, face.facet);
                        let (wn, wt) = self.next(perms, face, w_idx, adj.simp, w, adj.facet);
                        let (vt0, vt1) = (bit(vt[0]), bit(vt[1]));

                        if vn[0] == w_idx && wn[1 ^ vt0] == v_idx {
                            // Adjacent boundary edges: eliminate both.
                            self.join(vn[1], vt1, wn[vt0], (vt[0] ^ wt[vt0]) ^ vt[1]);
                        } else if vn[1] == w_idx && wn[vt1] == v_idx {
                            self.join(vn[0], 1 ^ vt0, wn[1 ^ vt1], (vt[1] ^ wt[1 ^ vt1]) ^ vt[0]);
                        } else if self.on_other_cycle(v_idx, w_idx) {
                            flags |= LinkFlags::NON_SPHERE;
                        } else {
                            self.join(vn[0], 1 ^ vt0, wn[1 ^ h], vt[0] ^ (has_twist ^ wt[1 ^ h]));
                            self.join(vn[1], vt1, wn[h], vt[1] ^ (has_twist ^ wt[h]));
                        }
                    }

                    self.states[v_idx].bdry_edges -= 1;
                    self.states[w_idx].bdry_edges -= 1;
                }
            } else {
                let child = attach(&mut self.states, v_rep, w_rep, has_twist ^ parent_twists);
                let rep = if child == v_rep { w_rep } else { v_rep };
                self.states[rep].bdry += self.states[child].bdry - 2;
                if self.states[rep].bdry == 0 {
                    flags |= LinkFlags::CLOSED;
                }
                self.changed.record(slot, Some(child));
                self.n_classes -= 1;

                self.backup_if_two(v_idx);
                self.backup_if_two(w_idx);

                if self.length_one(v_idx) {
                    if !self.length_one(w_idx) && self.states[w_idx].bdry_edges == 1 {
                        self.excise(w_idx);
                    }
                } else if self.length_one(w_idx) {
                    if self.states[v_idx].bdry_edges == 1 {
                        self.excise(v_idx);
                    }
                } else {
                    let (vn, vt) = self.next(perms, face, v_idx, face.simp, v, face.facet);
                    let (wn, wt) = self.next(perms, face, w_idx, adj.simp, w, adj.facet);
                    self.join(vn[0], 1 ^ bit(vt[0]), wn[1 ^ h], vt[0] ^ (has_twist ^ wt[1 ^ h]));
                    self.join(vn[1], bit(vt[1]), wn[h], vt[1] ^ (has_twist ^ wt[h]));
                }

                self.states[v_idx].bdry_edges -= 1;
                self.states[w_idx].bdry_edges -= 1;
            }
        }

        flags
    }

    /// Reverses [`VertexLinks::merge`] for the gluing on `face` at step `step`.
    pub fn split(&mut self, perms: &GluingPerms, face: FacetSpec, step: usize) {
        let adj = perms.pairing().dest(face);
        let p = perms.perm(face);

        for v in (0..4).rev().filter(|&v| v != face.facet) {
            let w = p[v];
            let v_idx = v + 4 * face.simp;
            let w_idx = w + 4 * adj.simp;
            let slot = ChangeLog::slot(step, v);

            match self.changed.take(slot) {
                None => {
                    let (rep, _) = find(&self.states, v_idx);
                    self.states[rep].bdry += 2;
                }
                Some(sub) => {
                    let rep = detach(&mut self.states, sub);
                    self.states[rep].bdry += 2 - self.states[sub].bdry;
                    self.n_classes += 1;
                }
            }

            if v_idx == w_idx {
                self.states[v_idx].bdry_edges += 2;
                if self.states[v_idx].bdry_edges == 2 {
                    self.fix_adjacent(v_idx);
                }
            } else {
                self.states[w_idx].bdry_edges += 1;
                self.states[v_idx].bdry_edges += 1;
                self.restore_boundary(w_idx);
                self.restore_boundary(v_idx);
            }
        }
    }

    fn restore_boundary(&mut self, id: usize) {
        match self.states[id].bdry_edges {
            3 => {
                self.states[id].bdry_next = [id, id];
                self.states[id].bdry_twist = [false, false];
            }
            2 => {
                self.restore(id);
                self.fix_adjacent(id);
            }
            1 => self.fix_adjacent(id),
            _ => {}
        }
    }

    /// Points `end` of `id` at `adj`, and the matching end of `adj` back at `id`.
    fn join(&mut self, id: usize, end: usize, adj: usize, twist: bool) {
        self.states[id].bdry_next[end] = adj;
        self.states[id].bdry_twist[end] = twist;
        let back = (end ^ 1) ^ bit(twist);
        self.states[adj].bdry_next[back] = id;
        self.states[adj].bdry_twist[back] = twist;
    }

    /// Makes both boundary neighbours of `id` point back at it.
    fn fix_adjacent(&mut self, id: usize) {
        let s = self.states[id];
        if s.bdry_next[0] != id {
            let a = 1 ^ bit(s.bdry_twist[0]);
            self.states[s.bdry_next[0]].bdry_next[a] = id;
            self.states[s.bdry_next[0]].bdry_twist[a] = s.bdry_twist[0];
            let b = bit(s.bdry_twist[1]);
            self.states[s.bdry_next[1]].bdry_next[b] = id;
            self.states[s.bdry_next[1]].bdry_twist[b] = s.bdry_twist[1];
        }
    }

    fn backup_if_two(&mut self, id: usize) {
        let s = &mut self.states[id];
        if s.bdry_edges == 2 {
            s.bdry_next_old = [s.bdry_next[0] as isize, s.bdry_next[1] as isize];
            s.bdry_twist_old = s.bdry_twist;
        }
    }

    fn restore(&mut self, id: usize) {
        let s = &mut self.states[id];
        s.bdry_next = [s.bdry_next_old[0].max(0) as usize, s.bdry_next_old[1].max(0) as usize];
        s.bdry_twist = s.bdry_twist_old;
    }

    /// Removes the single remaining boundary edge of `id` from its cycle.
    fn excise(&mut self, id: usize) {
        let s = self.states[id];
        self.join(
            s.bdry_next[0],
            1 ^ bit(s.bdry_twist[0]),
            s.bdry_next[1],
            s.bdry_twist[0] ^ s.bdry_twist[1],
        );
    }

    fn length_one(&self, id: usize) -> bool {
        self.states[id].bdry_next[0] == id && self.states[id].bdry_edges == 1
    }

    fn length_two(&self, a: usize, b: usize) -> bool {
        let sa = &self.states[a];
        sa.bdry_next == [b, b] && sa.bdry_edges == 1 && self.states[b].bdry_edges == 1
    }

    /// Walks the boundary cycle from `v` and reports whether it returns to `v` before
    /// meeting `w`.
    fn on_other_cycle(&self, v: usize, w: usize) -> bool {
        let mut at = self.states[v].bdry_next[0];
        let mut twist = self.states[v].bdry_twist[0];
        while at != v && at != w {
            let s = &self.states[at];
            let next = s.bdry_next[bit(twist)];
            twist ^= s.bdry_twist[bit(twist)];
            at = next;
        }
        at == v
    }

    /// The boundary edges on either side of the edge of `id`'s triangle lying in face
    /// `bdry_face`, which must be one of the two faces being glued.
    fn next(
        &self,
        perms: &GluingPerms,
        face: FacetSpec,
        id: usize,
        tet: usize,
        vertex: usize,
        bdry_face: usize,
    ) -> ([usize; 2], [bool; 2]) {
        let s = &self.states[id];
        let forward = ([s.bdry_next[0], id], [s.bdry_twist[0], false]);
        let backward = ([id, s.bdry_next[1]], [false, s.bdry_twist[1]]);
        match s.bdry_edges {
            3 => ([id, id], [false, false]),
            2 => {
                let next_face = VERTEX_LINK_NEXT_FACE[vertex][bdry_face];
                let prev_face = VERTEX_LINK_PREV_FACE[vertex][bdry_face];
                if perms.perm_index(FacetSpec::new(tet, next_face)) < 0 {
                    forward
                } else if perms.perm_index(FacetSpec::new(tet, prev_face)) < 0 {
                    backward
                } else {
                    // A tetrahedron glued to itself: the edge not yet visible in the
                    // gluings is on the face being glued or its partner.
                    let ghost = if bdry_face == face.facet {
                        perms.pairing().dest(face).facet
                    } else {
                        face.facet
                    };
                    if next_face == ghost {
                        forward
                    } else {
                        debug_assert_eq!(prev_face, ghost, "inconsistent vertex link boundary");
                        backward
                    }
                }
            }
            _ => (s.bdry_next, s.bdry_twist),
        }
    }

    /// Checks that every boundary neighbour points back with a matching twist.
    pub fn check_boundary_consistency(&self) -> Result<(), &'static str> {
        for (id, s) in self.states.iter().enumerate() {
            if s.bdry_edges <= 0 {
                continue;
            }
            for end in 0..2 {
                let adj = &self.states[s.bdry_next[end]];
                let back = (1 ^ end) ^ bit(s.bdry_twist[end]);
                if adj.bdry_edges == 0 {
                    return Err("vertex link boundary runs into an internal vertex");
                }
                if adj.bdry_next[back] != id {
                    return Err("vertex link boundary has a mismatched adjacency");
                }
                if adj.bdry_twist[back] != s.bdry_twist[end] {
                    return Err("vertex link boundary has a mismatched twist");
                }
            }
        }
        Ok(())
    }

    /// Every vertex with its boundary neighbours, as `prev-id-next [edges]` with `~` marking
    /// a twisted adjacency.
    pub fn boundary_summary(&self) -> String {
        let mut out = String::new();
        for (id, s) in self.states.iter().enumerate() {
            if id > 0 {
                out.push(' ');
            }
            let mark = |t: bool| if t { '~' } else { '-' };
            out.push_str(&format!(
                "{}{}{}{}{} [{}]",
                s.bdry_next[0],
                mark(s.bdry_twist[0]),
                id,
                mark(s.bdry_twist[1]),
                s.bdry_next[1],
                s.bdry_edges
            ));
        }
        out
    }

    /// Appends the class count, one line per vertex state and the change log.
    pub fn dump_data(&self, out: &mut String) {
        out.push_str(&format!("{}\n", self.n_classes));
        for s in &self.states {
            out.push_str(&format!(
                "{} {} {} {} {} {} {} {} {} {} {} {} {} {}\n",
                s.link.parent,
                s.link.rank,
                s.bdry,
                u8::from(s.link.twist_up),
                u8::from(s.link.had_equal_rank),
                s.bdry_edges,
                s.bdry_next[0],
                s.bdry_next[1],
                u8::from(s.bdry_twist[0]),
                u8::from(s.bdry_twist[1]),
                s.bdry_next_old[0],
                s.bdry_next_old[1],
                u8::from(s.bdry_twist_old[0]),
                u8::from(s.bdry_twist_old[1]),
            ));
        }
        push_joined(out, self.changed.slots().iter());
        out.push('\n');
    }

    pub(crate) fn read_data(tokens: &mut Tokens<'_>, n_tets: usize) -> Result<Self, InvalidInput> {
        let n_states = 4 * n_tets as i64;
        let n_classes = tokens.next_in("vertex class count", 0..=n_states)? as usize;

        let mut states = Vec::with_capacity(4 * n_tets);
        for _ in 0..4 * n_tets {
            let parent = tokens.next_in("vertex parent", -1..n_states)? as isize;
            let rank = tokens.next_in("vertex rank", 0..n_states)? as usize;
            let bdry = tokens.next_in("vertex boundary", 0..=3 * n_states)? as isize;
            let twist_up = tokens.next_bit("vertex twist")?;
            let had_equal_rank = tokens.next_bit("vertex equal rank flag")?;
            let bdry_edges = tokens.next_in("vertex boundary edges", 0..=3)? as i8;
            let next0 = tokens.next_in("vertex boundary next", 0..n_states)? as usize;
            let next1 = tokens.next_in("vertex boundary next", 0..n_states)? as usize;
            let tw0 = tokens.next_bit("vertex boundary twist")?;
            let tw1 = tokens.next_bit("vertex boundary twist")?;
            let old0 = tokens.next_in("vertex boundary backup", -1..n_states)? as isize;
            let old1 = tokens.next_in("vertex boundary backup", -1..n_states)? as isize;
            let tw_old0 = tokens.next_bit("vertex boundary twist backup")?;
            let tw_old1 = tokens.next_bit("vertex boundary twist backup")?;
            states.push(VertexState {
                link: UfLink {
                    parent,
                    rank,
                    twist_up,
                    had_equal_rank,
                },
                bdry,
                bdry_edges,
                bdry_next: [next0, next1],
                bdry_twist: [tw0, tw1],
                bdry_next_old: [old0, old1],
                bdry_twist_old: [tw_old0, tw_old1],
            });
        }

        let mut slots = Vec::with_capacity(8 * n_tets);
        for _ in 0..8 * n_tets {
            slots.push(tokens.next_in("vertex change log", -1..n_states)? as isize);
        }

        let links: Vec<UfLink> = states.iter().map(|s| s.link).collect();
        if !forest_is_acyclic(&links) {
            return Err(InvalidInput::Inconsistent("vertex classes contain a cycle"));
        }
        if links.iter().filter(|l| l.is_root()).count() != n_classes {
            return Err(InvalidInput::Inconsistent("vertex class count does not match"));
        }

        Ok(VertexLinks {
            states,
            changed: ChangeLog::from_slots(slots),
            n_classes,
        })
    }
}

/// Whether following parent pointers from every node reaches a root.
pub(crate) fn forest_is_acyclic(links: &[UfLink]) -> bool {
    (0..links.len()).all(|start| {
        let mut at = start;
        for _ in 0..=links.len() {
            if links[at].parent < 0 {
                return true;
            }
            at = links[at].parent as usize;
        }
        false
    })
}

#[cfg(test)]
mod test;
