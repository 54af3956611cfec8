use super::*;
use proptest::prelude::*;

fn inversions(images: [usize; 4]) -> usize {
    let mut count = 0;
    for i in 0..4 {
        for j in (i + 1)..4 {
            if images[i] > images[j] {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn codes_are_distinct_permutations() {
    let mut seen = std::collections::HashSet::new();
    for code in 0..24u8 {
        let p = Perm4::from_code(code);
        let mut sorted = p.images();
        sorted.sort();
        assert_eq!(sorted, [0, 1, 2, 3]);
        assert!(seen.insert(p.images()));
    }
}

#[test]
fn sign_alternates_with_code() {
    for code in 0..24u8 {
        let p = Perm4::from_code(code);
        let expected = if inversions(p.images()) % 2 == 0 { 1 } else { -1 };
        assert_eq!(p.sign(), expected, "code {code}");
    }
}

#[test]
fn inverse_table() {
    let expected = [
        0, 1, 4, 3, 2, 5, 6, 7, 12, 19, 18, 13, 8, 11, 20, 15, 16, 23, 10, 9, 14, 21, 22, 17,
    ];
    for code in 0..24u8 {
        let p = Perm4::from_code(code);
        assert_eq!(p.inverse().code(), expected[code as usize]);
        assert_eq!(p * p.inverse(), Perm4::IDENTITY);
        assert_eq!(p.inverse() * p, Perm4::IDENTITY);
    }
}

#[test]
fn s3_fixes_three() {
    for (i, p) in Perm4::S3.iter().enumerate() {
        assert_eq!(p[3], 3);
        assert_eq!(p.s3_index(), Some(i));
        assert_eq!(p.sign(), if i % 2 == 0 { 1 } else { -1 });
        assert_eq!(p.inverse(), Perm4::S3[S3_INV[i]]);
    }
    assert_eq!(Perm4::transposition(0, 3).s3_index(), None);
}

#[test]
fn ordered_s4_is_lexicographic() {
    let ordered: Vec<_> = (0..24).map(Perm4::ordered_s4).collect();
    for w in ordered.windows(2) {
        assert!(w[0] < w[1], "{} !< {}", w[0], w[1]);
    }
}

#[test]
fn constructors() {
    let t = Perm4::transposition(1, 3);
    assert_eq!(t.images(), [0, 3, 2, 1]);
    assert_eq!(Perm4::transposition(2, 2), Perm4::IDENTITY);

    let p = Perm4::from_pairs(0, 2, 1, 0, 2, 3, 3, 1);
    assert_eq!(p.images(), [2, 0, 3, 1]);
    assert_eq!(Perm4::from_images([2, 0, 3, 1]), Some(p));
    assert_eq!(Perm4::from_images([0, 0, 3, 1]), None);
    assert_eq!(Perm4::from_images([0, 1, 2, 4]), None);
    assert!(Perm4::default().is_identity());
}

#[test]
fn display() {
    let p = Perm4::from_code(9);
    insta::assert_snapshot!(p.to_string(), @"1230");
    insta::assert_snapshot!(Perm4::S3.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(" "), @"0123 0213 1203 1023 2013 2103");
}

proptest! {
    #[test]
    fn composition_applies_right_first(a in 0u8..24, b in 0u8..24) {
        let p = Perm4::from_code(a);
        let q = Perm4::from_code(b);
        for i in 0..4 {
            prop_assert_eq!((p * q)[i], p[q[i]]);
        }
        prop_assert_eq!((p * q).sign(), p.sign() * q.sign());
    }

    #[test]
    fn composition_is_associative(a in 0u8..24, b in 0u8..24, c in 0u8..24) {
        let (p, q, r) = (Perm4::from_code(a), Perm4::from_code(b), Perm4::from_code(c));
        prop_assert_eq!((p * q) * r, p * (q * r));
    }

    #[test]
    fn ordering_matches_images(a in 0u8..24, b in 0u8..24) {
        let p = Perm4::from_code(a);
        let q = Perm4::from_code(b);
        prop_assert_eq!(p.cmp(&q), p.images().cmp(&q.images()));
        prop_assert_eq!(p == q, a == b);
    }
}
