//! # Permutations of four elements
//!
//! This module provides [`Perm4`], an element of the symmetric group S₄ stored as a single
//! code in `0..24`, together with the copy of S₃ that fixes `3`.
//!
//! ## Key Features:
//!
//! - **Representation**: the code is an index into a fixed table of images. Codes are
//!   ordered so that even permutations have even codes and odd permutations odd codes,
//!   which makes [`Perm4::sign`] a parity check.
//! - **Construction**:
//!   - Identity: `Perm4::IDENTITY`.
//!   - From images: `Perm4::from_images([1, 0, 2, 3])`, `None` unless a permutation.
//!   - Transpositions: `Perm4::transposition(a, b)`.
//!   - From four mapping pairs: `Perm4::from_pairs(a, b, c, d, e, f, g, h)` sends
//!     `a -> b`, `c -> d`, `e -> f`, `g -> h`.
//! - **Basic Operations**:
//!   - Composition with `*` (`(p * q)[i] == p[q[i]]`), backed by a precomputed table.
//!   - Inverse: `p.inverse()`.
//!   - Sign: `p.sign()`.
//!   - Lexicographic comparison of images: `p.compare_with(&q)`, also used for `Ord`.
//! - **Subgroups**:
//!   - `Perm4::S3[i]` for the six permutations fixing `3`, in sign alternating order, with
//!     `S3_INV[i]` the index of the inverse of `S3[i]`.
//!   - `Perm4::ordered_s4(i)` enumerates S₄ in lexicographic order.

use std::{cmp::Ordering, fmt, ops::Index, ops::Mul};

/// Images of `0, 1, 2, 3` for each permutation code.
const IMAGES: [[usize; 4]; 24] = [
    [0, 1, 2, 3],
    [0, 1, 3, 2],
    [0, 2, 3, 1],
    [0, 2, 1, 3],
    [0, 3, 1, 2],
    [0, 3, 2, 1],
    [1, 0, 3, 2],
    [1, 0, 2, 3],
    [1, 2, 0, 3],
    [1, 2, 3, 0],
    [1, 3, 2, 0],
    [1, 3, 0, 2],
    [2, 0, 1, 3],
    [2, 0, 3, 1],
    [2, 1, 3, 0],
    [2, 1, 0, 3],
    [2, 3, 0, 1],
    [2, 3, 1, 0],
    [3, 0, 2, 1],
    [3, 0, 1, 2],
    [3, 1, 0, 2],
    [3, 1, 2, 0],
    [3, 2, 1, 0],
    [3, 2, 0, 1],
];

/// Codes (into S₄) of the six permutations fixing `3`.
const S3_CODES: [u8; 6] = [0, 3, 8, 7, 12, 15];

/// `S3_INV[i]` is the S₃ index of the inverse of `S3[i]`.
pub const S3_INV: [usize; 6] = [0, 1, 4, 3, 2, 5];

const fn find_code(img: [usize; 4]) -> Option<u8> {
    let mut code = 0;
    while code < 24 {
        let t = IMAGES[code];
        if t[0] == img[0] && t[1] == img[1] && t[2] == img[2] && t[3] == img[3] {
            return Some(code as u8);
        }
        code += 1;
    }
    None
}

const fn code_of(img: [usize; 4]) -> u8 {
    match find_code(img) {
        Some(code) => code,
        None => panic!("images do not describe a permutation of 0..4"),
    }
}

const fn build_products() -> [[u8; 24]; 24] {
    let mut table = [[0u8; 24]; 24];
    let mut p = 0;
    while p < 24 {
        let mut q = 0;
        while q < 24 {
            let a = IMAGES[p];
            let b = IMAGES[q];
            table[p][q] = code_of([a[b[0]], a[b[1]], a[b[2]], a[b[3]]]);
            q += 1;
        }
        p += 1;
    }
    table
}

const fn build_inverses() -> [u8; 24] {
    let mut table = [0u8; 24];
    let mut p = 0;
    while p < 24 {
        let a = IMAGES[p];
        let mut inv = [0usize; 4];
        let mut i = 0;
        while i < 4 {
            inv[a[i]] = i;
            i += 1;
        }
        table[p] = code_of(inv);
        p += 1;
    }
    table
}

const fn build_s3_index() -> [i8; 24] {
    let mut table = [-1i8; 24];
    let mut i = 0;
    while i < 6 {
        table[S3_CODES[i] as usize] = i as i8;
        i += 1;
    }
    table
}

const PRODUCTS: [[u8; 24]; 24] = build_products();
const INVERSES: [u8; 24] = build_inverses();
const S3_INDEX: [i8; 24] = build_s3_index();

/// A permutation of `{0, 1, 2, 3}`.
///
/// # Examples
///
/// ```
/// use tricensus::perm::Perm4;
///
/// let p = Perm4::from_images([1, 2, 0, 3]).unwrap();
/// let q = Perm4::transposition(0, 1);
/// assert_eq!((p * q)[0], 2);
/// assert_eq!(p * p.inverse(), Perm4::IDENTITY);
/// assert_eq!(p.sign(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Perm4 {
    code: u8,
}

impl Perm4 {
    pub const IDENTITY: Perm4 = Perm4 { code: 0 };

    /// The six permutations fixing `3`, indexed so that even indices are even permutations.
    pub const S3: [Perm4; 6] = [
        Perm4 { code: S3_CODES[0] },
        Perm4 { code: S3_CODES[1] },
        Perm4 { code: S3_CODES[2] },
        Perm4 { code: S3_CODES[3] },
        Perm4 { code: S3_CODES[4] },
        Perm4 { code: S3_CODES[5] },
    ];

    /// Returns the permutation with the given code.
    ///
    /// Panics if `code >= 24`.
    pub const fn from_code(code: u8) -> Perm4 {
        assert!(code < 24, "permutation code out of range");
        Perm4 { code }
    }

    pub const fn code(self) -> u8 {
        self.code
    }

    /// Builds the permutation sending `i` to `images[i]`, or `None` if `images` is not a
    /// permutation of `0..4`.
    pub const fn from_images(images: [usize; 4]) -> Option<Perm4> {
        match find_code(images) {
            Some(code) => Some(Perm4 { code }),
            None => None,
        }
    }

    /// Callers guarantee that `images` is a permutation.
    const fn from_valid_images(images: [usize; 4]) -> Perm4 {
        let code = find_code(images);
        debug_assert!(code.is_some(), "images do not describe a permutation of 0..4");
        match code {
            Some(code) => Perm4 { code },
            None => Perm4::IDENTITY,
        }
    }

    /// The transposition swapping `a` and `b`, or the identity when `a == b`.
    pub const fn transposition(a: usize, b: usize) -> Perm4 {
        let mut images = [0, 1, 2, 3];
        images[a] = b;
        images[b] = a;
        Perm4::from_valid_images(images)
    }

    /// The permutation sending `a -> b`, `c -> d`, `e -> f` and `g -> h`.
    ///
    /// `a, c, e, g` and `b, d, f, h` must each list `0..4` in some order.
    #[allow(clippy::too_many_arguments)]
    pub const fn from_pairs(
        a: usize,
        b: usize,
        c: usize,
        d: usize,
        e: usize,
        f: usize,
        g: usize,
        h: usize,
    ) -> Perm4 {
        let mut images = [0; 4];
        images[a] = b;
        images[c] = d;
        images[e] = f;
        images[g] = h;
        Perm4::from_valid_images(images)
    }

    /// The `i`-th permutation of S₄ in lexicographic order of images.
    pub const fn ordered_s4(i: usize) -> Perm4 {
        let code = if i & 2 != 0 { i ^ 1 } else { i };
        Perm4 { code: code as u8 }
    }

    pub const fn images(self) -> [usize; 4] {
        IMAGES[self.code as usize]
    }

    pub const fn inverse(self) -> Perm4 {
        Perm4 {
            code: INVERSES[self.code as usize],
        }
    }

    /// `1` for even permutations and `-1` for odd ones.
    pub const fn sign(self) -> i8 {
        if self.code % 2 == 0 {
            1
        } else {
            -1
        }
    }

    /// Position of this permutation in [`Perm4::S3`], if it fixes `3`.
    pub const fn s3_index(self) -> Option<usize> {
        let idx = S3_INDEX[self.code as usize];
        if idx < 0 {
            None
        } else {
            Some(idx as usize)
        }
    }

    /// Compares images of `0, 1, 2, 3` in turn.
    pub fn compare_with(&self, other: &Perm4) -> Ordering {
        self.images().cmp(&other.images())
    }

    pub fn is_identity(&self) -> bool {
        self.code == 0
    }
}

impl Index<usize> for Perm4 {
    type Output = usize;

    #[inline]
    fn index(&self, i: usize) -> &usize {
        &IMAGES[self.code as usize][i]
    }
}

impl Mul for Perm4 {
    type Output = Perm4;

    /// Composition: the right hand side is applied first.
    #[inline]
    fn mul(self, rhs: Perm4) -> Perm4 {
        Perm4 {
            code: PRODUCTS[self.code as usize][rhs.code as usize],
        }
    }
}

/// Implement ordering comparisons for permutations based on their images.
impl PartialOrd for Perm4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Perm4 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare_with(other)
    }
}

impl fmt::Display for Perm4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in self.images() {
            write!(f, "{i}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test;
