//! # Gluing permutation search
//!
//! A [`Searcher`] walks the facet pairs of a [`FacetPairing`] in a fixed order and tries every
//! admissible gluing on each, backtracking depth first. Vertex links and edge classes are
//! kept up to date incrementally with undo, so a branch is abandoned as soon as it can no
//! longer lead to a wanted triangulation.
//!
//! ## Key Features:
//!
//! - **Two searches**, see [`SearchKind`]:
//!   - `Compact` finds every closed triangulation with valid edges whose vertex links are
//!     all 2-spheres.
//!   - `ClosedPrimeMin` finds closed one-vertex triangulations that may be prime, minimal
//!     and P²-irreducible, pruning on edge degree, cones, L(3,1) spines and edge and vertex
//!     counts, and fixing the gluings along one-ended chains to two choices each.
//! - **Canonical results**: only the representative of each orbit under the automorphisms
//!   of the pairing is emitted.
//! - **Partial search**: [`Searcher::partial_search`] stops at a given depth and hands every
//!   intermediate state to the caller, who can snapshot it
//!   ([`Searcher::tagged_data`], [`Searcher::snapshot_to_bytes`]) and finish it later or
//!   elsewhere.
//! - **Resume**: a state snapshotted while a full run reports a result can be restored and
//!   carried on to the end with [`Searcher::resume`].
//! - **Cancellation**: a [`CancelToken`] is polled once per step. A cancelled search unwinds
//!   to the state it started from.
//!
//! The top level entry points are [`enumerate`] and [`enumerate_with_cancel`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use derive_more::{BitAnd, BitOr, BitOrAssign};
use tracing::{debug, error, trace};

use crate::{
    edge_class::{EdgeClasses, EdgeFlags},
    error::{CensusError, PairingError},
    gluing::GluingPerms,
    pairing::{FacetPairing, FacetSpec, Isomorphism},
    vertex_link::{LinkFlags, VertexLinks},
};

pub mod canonical;
pub mod order;
mod snapshot;

pub use order::{ChainSchedule, OrderType};

/// Classes of triangulations the caller does not want to see.
///
/// The search is free to leave out any triangulation in a purged class. It may still
/// emit some of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, BitOr, BitOrAssign, BitAnd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PurgeFlags(u8);

impl PurgeFlags {
    pub const NON_MINIMAL: PurgeFlags = PurgeFlags(1);
    pub const NON_PRIME: PurgeFlags = PurgeFlags(2);
    pub const NON_MINIMAL_PRIME: PurgeFlags = PurgeFlags(3);
    pub const P2_REDUCIBLE: PurgeFlags = PurgeFlags(4);
    /// Kept with the other flags and in snapshots. Neither search prunes on it.
    pub const NON_MINIMAL_HYP: PurgeFlags = PurgeFlags(8);

    pub const fn empty() -> Self {
        PurgeFlags(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        PurgeFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: PurgeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A shared flag asking a running search to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Finished,
    Cancelled,
}

/// Which rules the search follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    Compact,
    ClosedPrimeMin(ChainSchedule),
}

impl SearchKind {
    /// The character identifying the search in a snapshot.
    pub fn tag(&self) -> char {
        match self {
            SearchKind::Compact => 'f',
            SearchKind::ClosedPrimeMin(_) => 'c',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SearchKind::Compact => "compact",
            SearchKind::ClosedPrimeMin(_) => "closed prime minimal",
        }
    }
}

/// Whether the purge flags let the closed prime minimal search stand in for the general one.
fn wants_closed_prime_min(orientable_only: bool, purge: PurgeFlags) -> bool {
    purge.contains(PurgeFlags::NON_MINIMAL | PurgeFlags::NON_PRIME)
        && (orientable_only || purge.contains(PurgeFlags::P2_REDUCIBLE))
}

/// The state of a depth first search over gluing permutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Searcher {
    perms: GluingPerms,
    autos: Vec<Isomorphism>,
    orientable_only: bool,
    purge: PurgeFlags,
    started: bool,
    /// `+1` or `-1` for every tetrahedron whose orientation is fixed, `0` otherwise.
    orientation: Vec<i8>,
    /// The lower facet of every facet pair, in the order gluings are chosen.
    order: Vec<FacetSpec>,
    /// Position in `order` currently being decided. `-1` once the search is exhausted.
    order_elt: isize,
    vertices: VertexLinks,
    edges: EdgeClasses,
    kind: SearchKind,
}

impl Searcher {
    /// A search for every closed triangulation whose vertex links are spheres.
    pub fn compact(
        pairing: impl Into<Arc<FacetPairing>>,
        autos: Vec<Isomorphism>,
        orientable_only: bool,
        purge: PurgeFlags,
    ) -> Self {
        let perms = GluingPerms::new(pairing.into());
        let n = perms.size();
        Searcher {
            order: order::facet_order(perms.pairing()),
            perms,
            autos,
            orientable_only,
            purge,
            started: false,
            orientation: vec![0; n],
            order_elt: 0,
            vertices: VertexLinks::new(n),
            edges: EdgeClasses::new(n),
            kind: SearchKind::Compact,
        }
    }

    /// A search restricted to closed prime minimal P²-irreducible triangulations.
    ///
    /// The pairing needs at least three tetrahedra.
    pub fn closed_prime_min(
        pairing: impl Into<Arc<FacetPairing>>,
        autos: Vec<Isomorphism>,
        orientable_only: bool,
        purge: PurgeFlags,
    ) -> Result<Self, PairingError> {
        let perms = GluingPerms::new(pairing.into());
        let n = perms.size();
        if n < 3 {
            return Err(PairingError::TooSmall(n));
        }
        let (order, schedule) = order::chain_order(&perms);
        Ok(Searcher {
            edges: EdgeClasses::closed_prime_min(perms.pairing()),
            perms,
            autos,
            orientable_only,
            purge,
            started: false,
            orientation: vec![0; n],
            order,
            order_elt: 0,
            vertices: VertexLinks::new(n),
            kind: SearchKind::ClosedPrimeMin(schedule),
        })
    }

    /// The most specialised search that still finds everything not purged.
    pub fn best(
        pairing: impl Into<Arc<FacetPairing>>,
        autos: Vec<Isomorphism>,
        orientable_only: bool,
        purge: PurgeFlags,
    ) -> Result<Self, PairingError> {
        let searcher = if wants_closed_prime_min(orientable_only, purge) {
            Searcher::closed_prime_min(pairing, autos, orientable_only, purge)?
        } else {
            Searcher::compact(pairing, autos, orientable_only, purge)
        };
        debug!(
            searcher = searcher.kind.name(),
            n_tets = searcher.perms.size(),
            orientable_only,
            purge = purge.bits(),
            "chose searcher"
        );
        Ok(searcher)
    }

    pub fn perms(&self) -> &GluingPerms {
        &self.perms
    }

    pub fn kind(&self) -> &SearchKind {
        &self.kind
    }

    pub fn automorphisms(&self) -> &[Isomorphism] {
        &self.autos
    }

    pub fn orientable_only(&self) -> bool {
        self.orientable_only
    }

    pub fn purge(&self) -> PurgeFlags {
        self.purge
    }

    pub fn order(&self) -> &[FacetSpec] {
        &self.order
    }

    pub fn order_elt(&self) -> isize {
        self.order_elt
    }

    pub fn orientation(&self) -> &[i8] {
        &self.orientation
    }

    pub fn vertex_links(&self) -> &VertexLinks {
        &self.vertices
    }

    pub fn edge_classes(&self) -> &EdgeClasses {
        &self.edges
    }

    /// Whether every gluing has been chosen.
    pub fn is_complete(&self) -> bool {
        self.perms.is_complete()
    }

    /// Whether both trackers are back in their unglued state.
    pub fn is_pristine(&self) -> bool {
        self.vertices.is_pristine() && self.edges.is_pristine()
    }

    /// Runs the search to the end, calling `action` on every canonical result.
    pub fn run(&mut self, mut action: impl FnMut(&Searcher)) {
        self.search(None, None, &mut action);
    }

    /// Like [`Searcher::run`], stopping early once `cancel` is set.
    pub fn run_with_cancel(
        &mut self,
        cancel: &CancelToken,
        mut action: impl FnMut(&Searcher),
    ) -> SearchOutcome {
        self.search(None, Some(cancel), &mut action)
    }

    /// Chooses at most `max_depth` further gluings. With `usize::MAX` this is a full run.
    ///
    /// `action` sees every state reached at that depth, and every canonical complete
    /// gluing found on the way. Each of these can be snapshotted and resumed with
    /// [`Searcher::run`], which then never backtracks above it.
    pub fn partial_search(&mut self, max_depth: usize, mut action: impl FnMut(&Searcher)) {
        self.search(Some(max_depth), None, &mut action);
    }

    /// Continues the search that handed out this state, through to its end.
    ///
    /// Unlike [`Searcher::run`], which only explores beneath the current state, this also
    /// backtracks above it, so a snapshot taken inside the action of a full run can be
    /// restored and finished elsewhere. A complete state counts as already reported.
    pub fn resume(&mut self, mut action: impl FnMut(&Searcher)) {
        if !self.started {
            self.search(None, None, &mut action);
            return;
        }
        if self.order_elt < 0 {
            return;
        }
        debug!(depth = self.order_elt, "resuming search");
        if self.order_elt == self.order.len() as isize {
            self.order_elt -= 1;
            self.split_current();
        }
        self.descend(0, None, None, &mut action);
    }

    fn search<F: FnMut(&Searcher)>(
        &mut self,
        max_depth: Option<usize>,
        cancel: Option<&CancelToken>,
        action: &mut F,
    ) -> SearchOutcome {
        let order_size = self.order.len() as isize;

        if !self.started {
            self.started = true;
            debug!(
                searcher = self.kind.name(),
                n_tets = self.perms.size(),
                orientable_only = self.orientable_only,
                "starting search"
            );
            match &self.kind {
                SearchKind::Compact => self.orientation[0] = 1,
                SearchKind::ClosedPrimeMin(schedule) => {
                    if let Some(filter) = order::failing_filter(self.perms.pairing()) {
                        debug!(filter, "pairing rejected");
                        self.order_elt = -1;
                        return SearchOutcome::Finished;
                    }
                    if schedule.n_chain_edges < self.order.len() {
                        self.orientation[self.order[schedule.n_chain_edges].simp] = 1;
                    }
                }
            }
            self.order_elt = 0;
        }

        if self.order_elt < 0 {
            return SearchOutcome::Finished;
        }
        if max_depth == Some(0) {
            action(&*self);
            return SearchOutcome::Finished;
        }
        if self.order_elt == order_size {
            if self.is_canonical() {
                trace!(gluing = %self.perms, "found triangulation");
                action(&*self);
            }
            return SearchOutcome::Finished;
        }

        let min_order = self.order_elt;
        let max_order =
            max_depth.map(|d| min_order.saturating_add(isize::try_from(d).unwrap_or(isize::MAX)));
        self.descend(min_order, max_order, cancel, action)
    }

    /// The backtracking loop, which stops once it backs out above `min_order`.
    fn descend<F: FnMut(&Searcher)>(
        &mut self,
        min_order: isize,
        max_order: Option<isize>,
        cancel: Option<&CancelToken>,
        action: &mut F,
    ) -> SearchOutcome {
        let order_size = self.order.len() as isize;
        let start_index = self.perms.perm_index(self.order[min_order as usize]);

        while self.order_elt >= min_order {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                self.unwind(min_order, start_index);
                debug!(depth = min_order, "search cancelled");
                return SearchOutcome::Cancelled;
            }

            let elt = self.order_elt as usize;
            let face = self.order[elt];
            let adj = self.perms.pairing().dest(face);

            let (index, generic) = self.next_index(elt, face, adj);
            if index >= 6 {
                self.perms.clear(face);
                self.order_elt -= 1;
                if self.order_elt >= min_order {
                    self.split_current();
                }
                continue;
            }
            self.perms.set_perm(face, index as usize);

            let edge_flags = self.edges.merge(&self.perms, face, elt);
            if self.prunes_edges(edge_flags, elt) {
                self.edges.split(face, elt);
                continue;
            }
            let link_flags = self.vertices.merge(&self.perms, face, elt);
            if self.prunes_vertices(link_flags, elt) {
                self.vertices.split(&self.perms, face, elt);
                self.edges.split(face, elt);
                continue;
            }

            // First gluing onto this tetrahedron fixes its orientation.
            if generic && adj.facet == 0 && self.orientable_only {
                let flips = i8::from(face.facet != 3) + i8::from(adj.facet != 3);
                self.orientation[adj.simp] = if (index + flips) % 2 == 0 {
                    -self.orientation[face.simp]
                } else {
                    self.orientation[face.simp]
                };
            }

            self.order_elt += 1;
            if self.order_elt == order_size {
                if self.is_canonical() {
                    trace!(gluing = %self.perms, "found triangulation");
                    action(&*self);
                }
                self.order_elt -= 1;
                self.split_current();
            } else {
                let next = self.order[self.order_elt as usize];
                self.preset_orientation(next);
                if Some(self.order_elt) == max_order {
                    action(&*self);
                    self.perms.set_perm_index(next, -1);
                    self.order_elt -= 1;
                    if self.order_elt >= min_order {
                        self.split_current();
                    }
                }
            }
        }

        if min_order == 0 {
            self.check_exhausted();
        }
        SearchOutcome::Finished
    }

    /// The next gluing index to try at position `elt`, and whether the choice is free.
    fn next_index(&self, elt: usize, face: FacetSpec, adj: FacetSpec) -> (i8, bool) {
        let current = self.perms.perm_index(face);
        if let SearchKind::ClosedPrimeMin(schedule) = &self.kind {
            match schedule.order_type[elt] {
                OrderType::ChainEnd | OrderType::ChainInternalFirst => {
                    let [first, second] = schedule.candidates(elt);
                    let next = if current < 0 {
                        first
                    } else if current == first {
                        second
                    } else {
                        6
                    };
                    return (next, false);
                }
                OrderType::ChainInternalSecond => {
                    let [first, second] = schedule.candidates(elt);
                    let previous = self.perms.perm_index(self.order[elt - 1]);
                    let next = if current >= 0 {
                        6
                    } else if previous == schedule.candidates(elt - 1)[0] {
                        first
                    } else {
                        second
                    };
                    return (next, false);
                }
                _ => {}
            }
        }
        // Odd steps would reverse the orientation fixed on both sides.
        let step = if !self.orientable_only || adj.facet == 0 { 1 } else { 2 };
        (current + step, true)
    }

    fn prunes_edges(&self, flags: EdgeFlags, elt: usize) -> bool {
        if !flags.is_empty() {
            return true;
        }
        match self.kind {
            SearchKind::Compact => false,
            SearchKind::ClosedPrimeMin(_) => {
                // Exactly n + 1 edges in the end, and each gluing merges at most three.
                let n = self.perms.size();
                let remaining = 2 * n - elt - 1;
                let n_edges = self.edges.n_classes();
                n_edges < n + 1 || n_edges > n + 1 + 3 * remaining
            }
        }
    }

    fn prunes_vertices(&self, flags: LinkFlags, elt: usize) -> bool {
        if flags.contains(LinkFlags::NON_SPHERE) {
            return true;
        }
        match self.kind {
            SearchKind::Compact => false,
            SearchKind::ClosedPrimeMin(_) => {
                // Exactly one vertex in the end.
                let n_gluings = self.order.len();
                let remaining = n_gluings - elt - 1;
                (flags.contains(LinkFlags::CLOSED) && elt + 1 < n_gluings)
                    || self.vertices.n_classes() > 1 + 3 * remaining
            }
        }
    }

    /// Writes the orientation preset for a facet pair reached for the first time.
    ///
    /// The preset is `-2` or `-1`, so that stepping by two only visits gluings that agree
    /// with the orientations already fixed.
    fn preset_orientation(&mut self, face: FacetSpec) {
        let adj = self.perms.pairing().dest(face);
        if !self.orientable_only || adj.facet == 0 {
            return;
        }
        let mut preset = i8::from(self.orientation[face.simp] == self.orientation[adj.simp]);
        if i8::from(face.facet != 3) + i8::from(adj.facet != 3) == 1 {
            preset = (preset + 1) % 2;
        }
        self.perms.set_perm_index(face, preset - 2);
    }

    /// Undoes the merges of the gluing at the current position.
    fn split_current(&mut self) {
        let elt = self.order_elt as usize;
        let face = self.order[elt];
        self.vertices.split(&self.perms, face, elt);
        self.edges.split(face, elt);
    }

    /// Backs out to position `min_order`, leaving its facet with index `start_index`.
    fn unwind(&mut self, min_order: isize, start_index: i8) {
        while self.order_elt > min_order {
            let face = self.order[self.order_elt as usize];
            self.perms.clear(face);
            self.order_elt -= 1;
            self.split_current();
        }
        let face = self.order[min_order as usize];
        self.perms.clear(face);
        if start_index >= 0 {
            self.perms.set_perm(face, start_index as usize);
        } else {
            self.perms.set_perm_index(face, start_index);
        }
    }

    fn is_canonical(&self) -> bool {
        canonical::is_canonical(&self.perms, &self.autos)
    }

    /// Reports trackers that did not return to their unglued state after a full search.
    fn check_exhausted(&self) {
        let n_tets = self.perms.size();
        if self.vertices.n_classes() != 4 * n_tets {
            error!(
                n_classes = self.vertices.n_classes(),
                expected = 4 * n_tets,
                "vertex classes not restored at end of search"
            );
        }
        if !self.vertices.is_pristine() {
            error!(
                summary = %self.vertices.boundary_summary(),
                "vertex links not restored at end of search"
            );
        }
        if self.edges.n_classes() != 6 * n_tets {
            error!(
                n_classes = self.edges.n_classes(),
                expected = 6 * n_tets,
                "edge classes not restored at end of search"
            );
        }
        if let Some(high) = self.edges.high_degree().filter(|h| h.sum != 0) {
            error!(sum = high.sum, "high degree sum not restored at end of search");
        }
        if !self.edges.is_pristine() {
            error!("edge states not restored at end of search");
        }
    }
}

/// Checks that the census can run on `pairing`.
fn validate(pairing: &FacetPairing) -> Result<(), PairingError> {
    if !pairing.is_connected() {
        return Err(PairingError::Disconnected);
    }
    if !pairing.is_canonical() {
        return Err(PairingError::NotCanonical);
    }
    Ok(())
}

/// Calls `action` on every canonical gluing of `pairing` that the best search for `purge`
/// finds.
///
/// `autos` are the automorphisms of the pairing, as returned by
/// [`FacetPairing::find_automorphisms`].
pub fn enumerate(
    pairing: FacetPairing,
    autos: Vec<Isomorphism>,
    orientable_only: bool,
    purge: PurgeFlags,
    mut action: impl FnMut(&GluingPerms),
) -> Result<SearchOutcome, CensusError> {
    validate(&pairing)?;
    let mut searcher = Searcher::best(pairing, autos, orientable_only, purge)?;
    searcher.run(|s| action(s.perms()));
    Ok(SearchOutcome::Finished)
}

/// Like [`enumerate`], stopping early once `cancel` is set.
pub fn enumerate_with_cancel(
    pairing: FacetPairing,
    autos: Vec<Isomorphism>,
    orientable_only: bool,
    purge: PurgeFlags,
    cancel: &CancelToken,
    mut action: impl FnMut(&GluingPerms),
) -> Result<SearchOutcome, CensusError> {
    validate(&pairing)?;
    let mut searcher = Searcher::best(pairing, autos, orientable_only, purge)?;
    Ok(searcher.run_with_cancel(cancel, |s| action(s.perms())))
}

#[cfg(test)]
mod test;
