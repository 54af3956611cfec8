use std::sync::Arc;

use super::*;
use crate::{pairing::FacetPairing, skeleton::Skeleton};
use proptest::prelude::*;

const ONE_TET: &str = "0 1 0 0 0 3 0 2";
const THREE_LOOPS: &str = "0 1 0 0 1 0 2 0 0 2 1 2 1 1 2 1 0 3 1 3 2 3 2 2";
const TWO_TETS: &str = "1 0 1 1 1 2 1 3 0 0 0 1 0 2 0 3";

fn gluing(rep: &str) -> GluingPerms {
    GluingPerms::new(Arc::new(FacetPairing::from_text_rep(rep).unwrap()))
}

/// The lower facet of every facet pair, in facet order.
fn gluing_order(perms: &GluingPerms) -> Vec<FacetSpec> {
    FacetSpec::all(perms.size())
        .filter(|&f| f < perms.pairing().dest(f))
        .collect()
}

#[test]
fn fresh_tracker_is_pristine() {
    let links = VertexLinks::new(2);
    assert!(links.is_pristine());
    assert_eq!(links.n_classes(), 8);
    assert!(links.check_boundary_consistency().is_ok());
    insta::assert_snapshot!(links.boundary_summary(), @"0-0-0 [3] 1-1-1 [3] 2-2-2 [3] 3-3-3 [3] 4-4-4 [3] 5-5-5 [3] 6-6-6 [3] 7-7-7 [3]");
}

#[test]
fn merge_single_gluing_and_split() {
    let mut perms = gluing(ONE_TET);
    let mut links = VertexLinks::new(1);
    let face = FacetSpec::new(0, 0);
    perms.set_perm(face, 0);

    // Vertex 2 is folded onto itself with a reversed orientation.
    let flags = links.merge(&perms, face, 0);
    assert_eq!(flags, LinkFlags::NON_SPHERE);
    assert!(!flags.contains(LinkFlags::CLOSED));
    assert_eq!(links.n_classes(), 2);
    assert!(links.check_boundary_consistency().is_ok());
    insta::assert_snapshot!(links.boundary_summary(), @"3-0-1 [2] 0-1-3 [2] 2-2-2 [1] 1-3-0 [1]");

    let (root, _) = find(links.states(), 0);
    assert_eq!(links.states()[root].bdry, 5);

    links.split(&perms, face, 0);
    assert!(links.is_pristine());
}

#[test]
fn dump_and_read() {
    let mut perms = gluing(ONE_TET);
    let mut links = VertexLinks::new(1);
    let face = FacetSpec::new(0, 0);
    perms.set_perm(face, 0);
    links.merge(&perms, face, 0);

    let mut dump = String::new();
    links.dump_data(&mut dump);
    similar_asserts::assert_eq!(
        dump,
        "2\n\
         1 0 3 0 0 2 3 1 0 0 -1 -1 0 0\n\
         -1 1 5 0 0 2 0 3 0 0 -1 -1 0 0\n\
         -1 0 1 0 0 1 2 2 0 0 -1 -1 0 0\n\
         1 0 3 0 1 1 1 0 0 0 1 1 0 0\n\
         -1 3 -1 0 -1 -1 -1 -1\n"
    );

    let read = VertexLinks::read_data(&mut Tokens::new(&dump), 1).unwrap();
    assert_eq!(read, links);
}

#[test]
fn read_rejects_bad_states() {
    let pristine = {
        let mut out = String::new();
        VertexLinks::new(1).dump_data(&mut out);
        out
    };
    assert!(VertexLinks::read_data(&mut Tokens::new(&pristine), 1).is_ok());

    // Class count disagrees with the number of roots.
    let wrong_count = pristine.replacen('4', "3", 1);
    assert!(matches!(
        VertexLinks::read_data(&mut Tokens::new(&wrong_count), 1),
        Err(InvalidInput::Inconsistent(_))
    ));

    // Boundary edge count out of range.
    let bad_edges = pristine.replacen("-1 0 3 0 0 3", "-1 0 3 0 0 4", 1);
    assert!(matches!(
        VertexLinks::read_data(&mut Tokens::new(&bad_edges), 1),
        Err(InvalidInput::OutOfRange { value: 4, .. })
    ));

    // A parent cycle.
    let cycle = pristine
        .replacen("-1 0 3 0 0 3 0 0", "1 0 3 0 0 3 0 0", 1)
        .replacen("-1 0 3 0 0 3 1 1", "0 0 3 0 0 3 1 1", 1);
    assert!(matches!(
        VertexLinks::read_data(&mut Tokens::new(&cycle), 1),
        Err(InvalidInput::Inconsistent(_))
    ));

    let truncated = &pristine[..pristine.len() - 6];
    assert!(matches!(
        VertexLinks::read_data(&mut Tokens::new(truncated), 1),
        Err(InvalidInput::UnexpectedEnd(_))
    ));
}

#[test]
fn doubled_tetrahedron() {
    // Two tetrahedra glued along their boundaries by the identity form the 3-sphere. The
    // link of vertex 3 closes once faces 0, 1 and 2 are glued, the others at the end.
    let mut perms = gluing(TWO_TETS);
    let mut links = VertexLinks::new(2);
    let order = gluing_order(&perms);
    for (step, &face) in order.iter().enumerate() {
        perms.set_perm(face, 0);
        let flags = links.merge(&perms, face, step);
        assert!(!flags.contains(LinkFlags::NON_SPHERE));
        assert_eq!(flags.contains(LinkFlags::CLOSED), step >= 2, "step {step}");
        assert!(links.check_boundary_consistency().is_ok());
    }
    assert_eq!(links.n_classes(), 4);
    assert_eq!(links.n_classes(), Skeleton::new(&perms).n_vertices());

    for (step, &face) in order.iter().enumerate().rev() {
        links.split(&perms, face, step);
    }
    assert!(links.is_pristine());
}

fn arb_gluing() -> impl Strategy<Value = (&'static str, Vec<usize>)> {
    prop_oneof![Just(ONE_TET), Just(THREE_LOOPS), Just(TWO_TETS)].prop_flat_map(|rep| {
        let n_pairs = 2 * FacetPairing::from_text_rep(rep).unwrap().size();
        (Just(rep), prop::collection::vec(0usize..6, n_pairs))
    })
}

proptest! {
    /// Merges gluings the way the search does, stopping at the first non-sphere link, and
    /// unwinds again.
    #[test]
    fn merge_split_round_trip((rep, indices) in arb_gluing()) {
        let mut perms = gluing(rep);
        let mut links = VertexLinks::new(perms.size());
        let order = gluing_order(&perms);
        let mut done = 0;
        let mut sphere = true;
        for (step, (&face, &index)) in order.iter().zip(&indices).enumerate() {
            perms.set_perm(face, index);
            let flags = links.merge(&perms, face, step);
            done += 1;
            if flags.contains(LinkFlags::NON_SPHERE) {
                sphere = false;
                break;
            }
            prop_assert!(links.check_boundary_consistency().is_ok());
        }

        if sphere {
            let skel = Skeleton::new(&perms);
            prop_assert_eq!(links.n_classes(), skel.n_vertices());
            if skel.has_valid_edges() {
                prop_assert!(skel.vertex_link_euler().iter().all(|&chi| chi == 2));
            }
            prop_assert!(links.states().iter().all(|s| s.bdry_edges == 0));
        }

        for step in (0..done).rev() {
            links.split(&perms, order[step], step);
        }
        prop_assert!(links.is_pristine());
    }
}
