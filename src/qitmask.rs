//! A vector of 64 base-4 digits ("qits") packed into two words.
//!
//! Digit `i` is `bit i of low + 2 * bit i of high`. Addition and subtraction are digit-wise
//! modulo 4, which lets the edge tracker count how many edges of each triangle ended up in
//! one class: a digit of 3 means three edges of one face were identified.

use std::{
    fmt,
    ops::{AddAssign, SubAssign},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qitmask {
    low: u64,
    high: u64,
}

impl Qitmask {
    pub const BITS: usize = 64;

    pub const fn new() -> Self {
        Qitmask { low: 0, high: 0 }
    }

    pub fn get(&self, index: usize) -> u8 {
        (((self.low >> index) & 1) | (((self.high >> index) & 1) << 1)) as u8
    }

    pub fn set(&mut self, index: usize, digit: u8) {
        debug_assert!(index < Self::BITS && digit < 4);
        let bit = 1u64 << index;
        self.low = (self.low & !bit) | (u64::from(digit & 1) << index);
        self.high = (self.high & !bit) | (u64::from((digit >> 1) & 1) << index);
    }

    pub fn is_empty(&self) -> bool {
        self.low == 0 && self.high == 0
    }

    /// Whether some digit equals 3.
    pub fn has3(&self) -> bool {
        self.low & self.high != 0
    }

    /// Whether some position is non-zero in both masks.
    pub fn has_non_zero_match(&self, other: &Qitmask) -> bool {
        (self.low | self.high) & (other.low | other.high) != 0
    }

    /// The first `len` digits, lowest position first.
    pub fn digits(&self, len: usize) -> String {
        (0..len.min(Self::BITS))
            .map(|i| char::from(b'0' + self.get(i)))
            .collect()
    }

    /// Parses the output of [`Qitmask::digits`], or `None` on a bad digit or overlong string.
    pub fn from_digits(s: &str) -> Option<Self> {
        if s.len() > Self::BITS {
            return None;
        }
        let mut mask = Qitmask::new();
        for (i, c) in s.bytes().enumerate() {
            match c {
                b'0'..=b'3' => mask.set(i, c - b'0'),
                _ => return None,
            }
        }
        Some(mask)
    }
}

impl AddAssign for Qitmask {
    fn add_assign(&mut self, rhs: Qitmask) {
        self.high ^= rhs.high ^ (self.low & rhs.low);
        self.low ^= rhs.low;
    }
}

impl SubAssign for Qitmask {
    fn sub_assign(&mut self, rhs: Qitmask) {
        self.high ^= rhs.high ^ (rhs.low & !self.low);
        self.low ^= rhs.low;
    }
}

impl fmt::Display for Qitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digits(Self::BITS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn digits_and_flags() {
        let mut a = Qitmask::new();
        a.set(0, 1);
        a.set(5, 3);
        assert!(a.has3());
        assert_eq!(a.digits(8), "10000300");
        assert_eq!(Qitmask::from_digits("10000300"), Some(a));
        assert_eq!(Qitmask::from_digits("104"), None);

        let mut b = Qitmask::new();
        b.set(1, 2);
        assert!(!a.has_non_zero_match(&b));
        b.set(5, 1);
        assert!(a.has_non_zero_match(&b));
    }

    fn arb_mask() -> impl Strategy<Value = Qitmask> {
        (any::<u64>(), any::<u64>()).prop_map(|(low, high)| Qitmask { low, high })
    }

    proptest! {
        #[test]
        fn arithmetic_is_digitwise_mod_4(a in arb_mask(), b in arb_mask()) {
            let mut sum = a;
            sum += b;
            let mut diff = a;
            diff -= b;
            for i in 0..Qitmask::BITS {
                prop_assert_eq!(sum.get(i), (a.get(i) + b.get(i)) % 4);
                prop_assert_eq!(diff.get(i), (a.get(i) + 4 - b.get(i)) % 4);
            }
            sum -= b;
            prop_assert_eq!(sum, a);
        }
    }
}
