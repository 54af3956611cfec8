//! Text snapshots of a search in progress.
//!
//! A snapshot is line oriented and whitespace separated. It starts with a one character tag
//! naming the search, followed by the gluing, the search flags, the orientation and order
//! data, the two trackers and, for the closed prime minimal search, its chain schedule.
//! Restoring checks every field, and then replays the chosen gluings to make sure the
//! trackers agree with them.

use crate::{
    edge_class::{EdgeClasses, HighDegree},
    error::{CensusError, InvalidInput},
    gluing::{push_joined, GluingPerms},
    pairing::FacetSpec,
    tokens::Tokens,
    vertex_link::VertexLinks,
};

use super::{
    order::{self, ChainSchedule, OrderType},
    PurgeFlags, SearchKind, Searcher,
};

impl Searcher {
    /// Appends everything needed to resume the search, except the tag.
    pub fn dump_data(&self, out: &mut String) {
        self.perms.dump_data(out);
        out.push(if self.orientable_only { 'o' } else { '.' });
        out.push('f');
        out.push(if self.started { 's' } else { '.' });
        out.push_str(&format!(" {}\n", self.purge.bits()));

        push_joined(out, self.orientation.iter());
        out.push('\n');
        out.push_str(&format!("{} {}\n", self.order_elt, self.order.len()));
        push_joined(out, self.order.iter().flat_map(|f| [f.simp, f.facet]));
        out.push('\n');

        self.vertices.dump_data(out);
        self.edges.dump_data(out);

        if let SearchKind::ClosedPrimeMin(schedule) = &self.kind {
            push_joined(out, schedule.order_type.iter().map(|t| t.code()));
            out.push('\n');
            out.push_str(&format!("{}\n", schedule.n_chain_edges));
            if schedule.n_chain_edges > 0 {
                push_joined(out, schedule.chain_perm_indices.iter());
                out.push('\n');
            }
            if let Some(high) = self.edges.high_degree() {
                high.dump_data(out);
            }
        }
    }

    /// The snapshot, starting with a line holding the tag of [`SearchKind::tag`].
    pub fn tagged_data(&self) -> String {
        let mut out = String::new();
        out.push(self.kind.tag());
        out.push('\n');
        self.dump_data(&mut out);
        out
    }

    pub fn snapshot_to_bytes(&self) -> Vec<u8> {
        self.tagged_data().into_bytes()
    }

    /// Reads the output of [`Searcher::tagged_data`].
    pub fn from_tagged_data(data: &str) -> Result<Searcher, CensusError> {
        let mut tokens = Tokens::new(data);
        let tag = tokens.next_line("searcher tag")?.trim();
        let compact = match tag {
            "f" => true,
            "c" => false,
            _ => return Err(InvalidInput::UnknownTag(tag.to_string()).into()),
        };
        let searcher = read_searcher(&mut tokens, compact)?;
        tokens.expect_end()?;
        Ok(searcher)
    }

    pub fn restore_from_bytes(bytes: &[u8]) -> Result<Searcher, CensusError> {
        let data = std::str::from_utf8(bytes).map_err(|e| InvalidInput::MalformedToken {
            what: "snapshot",
            token: e.to_string(),
        })?;
        Searcher::from_tagged_data(data)
    }
}

fn read_searcher(tokens: &mut Tokens<'_>, compact: bool) -> Result<Searcher, InvalidInput> {
    let perms = GluingPerms::read_data(tokens)?;
    let n_tets = perms.size();
    let autos = perms
        .pairing()
        .find_automorphisms()
        .map_err(|_| InvalidInput::Inconsistent("facet pairing is not canonical"))?;

    let flags = tokens.next_str("search flags")?;
    let (orientable_only, started) = match flags.as_bytes() {
        [o @ (b'o' | b'.'), b'f', s @ (b's' | b'.')] => (*o == b'o', *s == b's'),
        _ => {
            return Err(InvalidInput::MalformedToken {
                what: "search flags",
                token: flags.to_string(),
            })
        }
    };
    let purge = PurgeFlags::from_bits(tokens.next_in("purge flags", 0..=u8::MAX as i64)? as u8);

    let mut orientation = Vec::with_capacity(n_tets);
    for _ in 0..n_tets {
        orientation.push(tokens.next_in("orientation", -1..=1)? as i8);
    }

    let order_size = 2 * n_tets as i64;
    let order_elt = tokens.next_in("order position", -1..=order_size)? as isize;
    tokens.next_in("order size", order_size..=order_size)?;
    let mut order = Vec::with_capacity(2 * n_tets);
    for _ in 0..2 * n_tets {
        let simp = tokens.next_in("order simplex", 0..n_tets as i64)? as usize;
        let facet = tokens.next_in("order facet", 0..4)? as usize;
        order.push(FacetSpec::new(simp, facet));
    }

    let vertices = VertexLinks::read_data(tokens, n_tets)?;
    let mut edges = EdgeClasses::read_data(tokens, n_tets)?;

    let kind = if compact {
        if order != order::facet_order(perms.pairing()) {
            return Err(InvalidInput::Inconsistent("search order does not match the pairing"));
        }
        SearchKind::Compact
    } else {
        if n_tets < 3 {
            return Err(InvalidInput::Inconsistent(
                "closed prime minimal search needs at least three tetrahedra",
            ));
        }
        let schedule = read_schedule(tokens, n_tets)?;
        let (expected_order, expected) = order::chain_order(&perms);
        if order != expected_order || schedule != expected {
            return Err(InvalidInput::Inconsistent("chain schedule does not match the pairing"));
        }
        edges.set_high_degree(HighDegree::read_data(tokens, n_tets)?);
        SearchKind::ClosedPrimeMin(schedule)
    };

    check_gluings(&perms, &order, order_elt, orientable_only)?;

    let searcher = Searcher {
        perms,
        autos,
        orientable_only,
        purge,
        started,
        orientation,
        order,
        order_elt,
        vertices,
        edges,
        kind,
    };
    let (vertices, edges) = searcher.replayed_trackers();
    if vertices != searcher.vertices || edges != searcher.edges {
        return Err(InvalidInput::Inconsistent(
            "tracker state does not match the chosen gluings",
        ));
    }
    Ok(searcher)
}

fn read_schedule(tokens: &mut Tokens<'_>, n_tets: usize) -> Result<ChainSchedule, InvalidInput> {
    let mut order_type = Vec::with_capacity(2 * n_tets);
    for _ in 0..2 * n_tets {
        let code = tokens.next_in("order type", 1..=6)?;
        order_type.extend(OrderType::from_code(code));
    }
    let n_chain_edges = tokens.next_in("chain edge count", 0..=2 * n_tets as i64)? as usize;
    let mut chain_perm_indices = Vec::with_capacity(2 * n_chain_edges);
    for _ in 0..2 * n_chain_edges {
        chain_perm_indices.push(tokens.next_in("chain permutation", 0..6)? as i8);
    }
    Ok(ChainSchedule {
        order_type,
        n_chain_edges,
        chain_perm_indices,
    })
}

/// Gluings before the current position are chosen, gluings after it are not, and an
/// orientation preset only sits on the current position.
fn check_gluings(
    perms: &GluingPerms,
    order: &[FacetSpec],
    order_elt: isize,
    orientable_only: bool,
) -> Result<(), InvalidInput> {
    for (i, &face) in order.iter().enumerate() {
        let i = i as isize;
        let index = perms.perm_index(face);
        let partner = perms.perm_index(perms.pairing().dest(face));
        let ok = if i < order_elt {
            index >= 0 && partner >= 0
        } else if i > order_elt {
            index == -1 && partner == -1
        } else if index == -2 {
            orientable_only && perms.pairing().dest(face).facet > 0 && partner == -1
        } else {
            true
        };
        if !ok {
            return Err(InvalidInput::Inconsistent("gluings do not match the search position"));
        }
    }
    Ok(())
}

impl Searcher {
    /// Fresh trackers with every gluing before the current position merged again.
    ///
    /// The merges read the gluings of neighbouring facets, so each one runs on a gluing
    /// holding only the steps before it, as during the search.
    fn replayed_trackers(&self) -> (VertexLinks, EdgeClasses) {
        let n_tets = self.perms.size();
        let mut vertices = VertexLinks::new(n_tets);
        let mut edges = match &self.kind {
            SearchKind::Compact => EdgeClasses::new(n_tets),
            SearchKind::ClosedPrimeMin(_) => EdgeClasses::closed_prime_min(self.perms.pairing()),
        };
        let mut replay = GluingPerms::new(self.perms.shared_pairing().clone());
        let merged = self.order_elt.clamp(0, self.order.len() as isize) as usize;
        for (step, &face) in self.order[..merged].iter().enumerate() {
            replay.set_perm(face, self.perms.perm_index(face) as usize);
            edges.merge(&replay, face, step);
            vertices.merge(&replay, face, step);
        }
        (vertices, edges)
    }
}
