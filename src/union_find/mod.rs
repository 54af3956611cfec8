//! # Union–find with twists and undo
//!
//! The census trackers partition tetrahedron vertices and edges into classes while gluings
//! are chosen, and must restore the exact previous partition when the search backtracks.
//!
//! ## Key Features:
//!
//! - **No path compression**: [`find`] only walks parent pointers, so every union can be
//!   reversed by [`detach`]. Union by rank keeps the paths logarithmic.
//! - **Twists**: each link carries a bit saying whether the orientation of the child is
//!   reversed relative to its parent. [`find`] returns the parity of twists along the path.
//! - **Change log**: a [`ChangeLog`] slot per (step, vertex) records which root was attached
//!   beneath another, or nothing when the union joined a class with itself.
//! - [`TwistedUnionFind`] is a self-contained variant without undo, for one-shot
//!   classification of a complete triangulation.

/// The union–find part of a tracked slot.
///
/// - `parent` is `-1` for a root.
/// - `twist_up` is the orientation twist between this slot and its parent.
/// - `had_equal_rank` marks a child whose attachment raised its parent's rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UfLink {
    pub parent: isize,
    pub rank: usize,
    pub twist_up: bool,
    pub had_equal_rank: bool,
}

impl Default for UfLink {
    fn default() -> Self {
        UfLink {
            parent: -1,
            rank: 0,
            twist_up: false,
            had_equal_rank: false,
        }
    }
}

impl UfLink {
    pub fn is_root(&self) -> bool {
        self.parent < 0
    }
}

/// Slots that embed a [`UfLink`].
pub trait UfNode {
    fn link(&self) -> &UfLink;
    fn link_mut(&mut self) -> &mut UfLink;
}

impl UfNode for UfLink {
    fn link(&self) -> &UfLink {
        self
    }

    fn link_mut(&mut self) -> &mut UfLink {
        self
    }
}

/// The root of `x` and the parity of twists between `x` and that root.
#[inline]
pub fn find<T: UfNode>(nodes: &[T], mut x: usize) -> (usize, bool) {
    let mut twist = false;
    while nodes[x].link().parent >= 0 {
        twist ^= nodes[x].link().twist_up;
        x = nodes[x].link().parent as usize;
    }
    (x, twist)
}

/// Joins the distinct roots `a` and `b`, and returns the root that went beneath.
///
/// The lower ranked root becomes the child. On a tie `b` goes beneath `a`, `a`'s rank is
/// raised and `b` remembers it with `had_equal_rank`.
pub fn attach<T: UfNode>(nodes: &mut [T], a: usize, b: usize, twist: bool) -> usize {
    debug_assert!(a != b && nodes[a].link().is_root() && nodes[b].link().is_root());
    let (parent, child) = if nodes[a].link().rank < nodes[b].link().rank {
        (b, a)
    } else {
        (a, b)
    };
    if nodes[parent].link().rank == nodes[child].link().rank {
        nodes[parent].link_mut().rank += 1;
        nodes[child].link_mut().had_equal_rank = true;
    }
    let link = nodes[child].link_mut();
    link.parent = parent as isize;
    link.twist_up = twist;
    child
}

/// Reverses [`attach`] for `child`, returning its former parent.
pub fn detach<T: UfNode>(nodes: &mut [T], child: usize) -> usize {
    let parent = nodes[child].link().parent;
    debug_assert!(parent >= 0, "detaching a root");
    let parent = parent as usize;
    let link = nodes[child].link_mut();
    link.parent = -1;
    link.twist_up = false;
    if link.had_equal_rank {
        link.had_equal_rank = false;
        nodes[parent].link_mut().rank -= 1;
    }
    parent
}

/// Per-step record of attached roots, four slots per gluing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLog {
    slots: Vec<isize>,
}

impl ChangeLog {
    pub fn new(len: usize) -> Self {
        ChangeLog {
            slots: vec![-1; len],
        }
    }

    pub(crate) fn from_slots(slots: Vec<isize>) -> Self {
        ChangeLog { slots }
    }

    /// Slot for vertex `v` of the facet glued at step `step`.
    #[inline]
    pub fn slot(step: usize, v: usize) -> usize {
        v + 4 * step
    }

    #[inline]
    pub fn record(&mut self, slot: usize, child: Option<usize>) {
        self.slots[slot] = child.map_or(-1, |c| c as isize);
    }

    /// Clears `slot`, returning the root it recorded.
    #[inline]
    pub fn take(&mut self, slot: usize) -> Option<usize> {
        let value = std::mem::replace(&mut self.slots[slot], -1);
        (value >= 0).then_some(value as usize)
    }

    pub fn get(&self, slot: usize) -> Option<usize> {
        let value = self.slots[slot];
        (value >= 0).then_some(value as usize)
    }

    pub fn is_clear(&self) -> bool {
        self.slots.iter().all(|&s| s == -1)
    }

    pub fn slots(&self) -> &[isize] {
        &self.slots
    }
}

/// Outcome of [`TwistedUnionFind::union`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Union {
    Merged,
    /// Already in one class with matching orientation.
    Consistent,
    /// Already in one class, with the orientations reversed.
    Twisted,
}

/// A union–find over twisted classes without undo.
#[derive(Debug, Clone)]
pub struct TwistedUnionFind {
    nodes: Vec<UfLink>,
    classes: usize,
}

impl TwistedUnionFind {
    pub fn new(n: usize) -> Self {
        TwistedUnionFind {
            nodes: vec![UfLink::default(); n],
            classes: n,
        }
    }

    pub fn find(&self, x: usize) -> (usize, bool) {
        find(&self.nodes, x)
    }

    /// Declares `a` and `b` equivalent, with `twist` relating their orientations.
    pub fn union(&mut self, a: usize, b: usize, twist: bool) -> Union {
        let (ra, ta) = self.find(a);
        let (rb, tb) = self.find(b);
        let parity = twist ^ ta ^ tb;
        if ra == rb {
            return if parity { Union::Twisted } else { Union::Consistent };
        }
        attach(&mut self.nodes, ra, rb, parity);
        self.classes -= 1;
        Union::Merged
    }

    pub fn n_classes(&self) -> usize {
        self.classes
    }

    /// The root of every element.
    pub fn roots(&self) -> Vec<usize> {
        (0..self.nodes.len()).map(|x| self.find(x).0).collect()
    }
}

#[cfg(test)]
mod test;
