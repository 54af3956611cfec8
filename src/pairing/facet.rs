use std::fmt;

/// A single facet of a tetrahedron: `(simplex, facet)` with `facet < 4`.
///
/// Facets are ordered lexicographically, first by simplex and then by facet number.
/// The value `(n, 0)` for a pairing of `n` simplices is used as the past-the-end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FacetSpec {
    pub simp: usize,
    pub facet: usize,
}

impl FacetSpec {
    pub const fn new(simp: usize, facet: usize) -> Self {
        FacetSpec { simp, facet }
    }

    /// The facet with flat index `4 * simp + facet`.
    pub const fn from_index(i: usize) -> Self {
        FacetSpec {
            simp: i / 4,
            facet: i % 4,
        }
    }

    pub const fn index(self) -> usize {
        4 * self.simp + self.facet
    }

    pub const fn past_end(n: usize) -> Self {
        FacetSpec { simp: n, facet: 0 }
    }

    pub const fn is_past_end(self, n: usize) -> bool {
        self.simp >= n
    }

    /// The facet immediately after this one.
    pub const fn succ(self) -> Self {
        if self.facet == 3 {
            FacetSpec {
                simp: self.simp + 1,
                facet: 0,
            }
        } else {
            FacetSpec {
                simp: self.simp,
                facet: self.facet + 1,
            }
        }
    }

    /// Every facet of `n` simplices, in order.
    pub fn all(n: usize) -> impl Iterator<Item = FacetSpec> + Clone {
        (0..4 * n).map(FacetSpec::from_index)
    }
}

impl fmt::Display for FacetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.simp, self.facet)
    }
}

/// An unordered pair of distinct facet numbers of one tetrahedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacePair {
    lower: usize,
    upper: usize,
}

impl FacePair {
    pub fn new(a: usize, b: usize) -> Self {
        debug_assert!(a != b && a < 4 && b < 4, "invalid face pair {a} {b}");
        if a < b {
            FacePair { lower: a, upper: b }
        } else {
            FacePair { lower: b, upper: a }
        }
    }

    pub fn lower(&self) -> usize {
        self.lower
    }

    pub fn upper(&self) -> usize {
        self.upper
    }

    /// The two facet numbers not in this pair.
    pub fn complement(&self) -> FacePair {
        let mut rest = (0..4).filter(|&f| f != self.lower && f != self.upper);
        let lower = rest.next().unwrap_or(0);
        let upper = rest.next().unwrap_or(0);
        FacePair { lower, upper }
    }
}
