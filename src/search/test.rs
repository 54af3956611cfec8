use std::sync::Arc;

use ahash::AHashSet;
use itertools::Itertools;
use proptest::prelude::*;

use super::{canonical::relabel, order::*, *};
use crate::{error::InvalidInput, perm::Perm4, skeleton::Skeleton};

const ONE_TET: &str = "0 1 0 0 0 3 0 2";
/// Two tetrahedra glued face to face along all four faces.
const TWO_TETS: &str = "1 0 1 1 1 2 1 3 0 0 0 1 0 2 0 3";
const THREE_LOOPS: &str = "0 1 0 0 1 0 2 0 0 2 1 2 1 1 2 1 0 3 1 3 2 3 2 2";
/// A chain of three tetrahedra with a loop at either end.
const LAYERED: &str = "0 1 0 0 1 0 1 1 0 2 0 3 2 0 2 1 1 2 1 3 2 3 2 2";
const DOUBLE_HANDLE: &str =
    "0 1 0 0 1 0 2 0 0 2 2 1 2 2 3 0 0 3 1 1 1 2 3 1 1 3 2 3 3 3 3 2";

const PRIME_MIN: PurgeFlags = PurgeFlags::from_bits(
    PurgeFlags::NON_MINIMAL_PRIME.bits() | PurgeFlags::P2_REDUCIBLE.bits(),
);

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn pairing(rep: &str) -> FacetPairing {
    FacetPairing::from_text_rep(rep).unwrap()
}

fn searcher(rep: &str, orientable_only: bool, purge: PurgeFlags) -> Searcher {
    let p = pairing(rep);
    let autos = p.find_automorphisms().unwrap();
    Searcher::best(p, autos, orientable_only, purge).unwrap()
}

fn run_all(mut s: Searcher) -> Vec<GluingPerms> {
    let mut found = Vec::new();
    s.run(|s| found.push(s.perms().clone()));
    found
}

/// The gluing maps on the lower facet of every pair, in facet order.
fn key(perms: &GluingPerms) -> Vec<Perm4> {
    FacetSpec::all(perms.size())
        .filter(|&f| f <= perms.pairing().dest(f))
        .map(|f| perms.perm(f))
        .collect()
}

fn sorted_indices(results: &[GluingPerms]) -> Vec<Vec<i8>> {
    let mut all: Vec<Vec<i8>> = results.iter().map(|p| p.perm_indices().to_vec()).collect();
    all.sort();
    all
}

/// Each result is the smallest of its orbit, and no two results share an orbit.
fn assert_canonical_and_distinct(results: &[GluingPerms], autos: &[Isomorphism]) {
    let seen: AHashSet<Vec<i8>> = results.iter().map(|p| p.perm_indices().to_vec()).collect();
    assert_eq!(seen.len(), results.len(), "duplicate results");
    for perms in results {
        for iso in autos {
            let image = relabel(perms, iso).unwrap();
            assert!(key(perms) <= key(&image), "{perms} is not canonical");
            if seen.contains(image.perm_indices()) {
                assert_eq!(&image, perms);
            }
        }
    }
}

#[test]
fn one_tetrahedron_is_too_small_for_prime_min() {
    let p = pairing(ONE_TET);
    let autos = p.find_automorphisms().unwrap();
    let mut count = 0;
    let res = enumerate(p, autos, false, PRIME_MIN, |_| count += 1);
    assert_eq!(res, Err(CensusError::Pairing(PairingError::TooSmall(1))));
    assert_eq!(count, 0);
}

#[test]
fn enumerate_rejects_bad_pairings() {
    let disconnected = pairing("0 1 0 0 0 3 0 2 1 1 1 0 1 3 1 2");
    assert_eq!(
        enumerate(disconnected, vec![], false, PurgeFlags::empty(), |_| {}),
        Err(CensusError::Pairing(PairingError::Disconnected))
    );
    let swapped = pairing("0 2 0 3 0 0 0 1");
    assert_eq!(
        enumerate(swapped, vec![], false, PurgeFlags::empty(), |_| {}),
        Err(CensusError::Pairing(PairingError::NotCanonical))
    );
}

#[test]
fn best_searcher_follows_purge_flags() {
    let kind = |orientable_only, purge| {
        matches!(
            searcher(LAYERED, orientable_only, purge).kind(),
            SearchKind::ClosedPrimeMin(_)
        )
    };
    assert!(kind(true, PurgeFlags::NON_MINIMAL_PRIME));
    assert!(!kind(false, PurgeFlags::NON_MINIMAL_PRIME));
    assert!(kind(false, PRIME_MIN));
    assert!(!kind(true, PurgeFlags::NON_MINIMAL));
    assert!(!kind(false, PurgeFlags::empty()));

    // The hyperbolic flag is carried along without changing the search.
    assert!(!kind(false, PurgeFlags::NON_MINIMAL_HYP));
    assert!(kind(true, PurgeFlags::NON_MINIMAL_PRIME | PurgeFlags::NON_MINIMAL_HYP));
    let s = searcher(LAYERED, false, PRIME_MIN | PurgeFlags::NON_MINIMAL_HYP);
    let restored = Searcher::from_tagged_data(&s.tagged_data()).unwrap();
    assert_eq!(restored.purge().bits(), 15);
    assert_eq!(restored, s);
}

#[test]
fn loops_are_chain_ends() {
    let perms = GluingPerms::new(Arc::new(pairing(THREE_LOOPS)));
    let (order, schedule) = chain_order(&perms);
    let specs: Vec<String> = order.iter().map(|f| f.to_string()).collect();
    insta::assert_snapshot!(specs.join(" "), @"0:0 1:1 2:2 0:2 0:3 1:3");
    assert_eq!(
        schedule.order_type,
        [
            OrderType::ChainEnd,
            OrderType::ChainEnd,
            OrderType::ChainEnd,
            OrderType::Misc,
            OrderType::Misc,
            OrderType::Misc,
        ]
    );
    assert_eq!(schedule.n_chain_edges, 3);
    for elt in 0..3 {
        let [first, second] = schedule.candidates(elt);
        assert!((0..6).contains(&first) && (0..6).contains(&second));
        assert_ne!(first, second);
    }
}

#[test]
fn chain_links_follow_chain_ends() {
    let perms = GluingPerms::new(Arc::new(pairing(LAYERED)));
    let (order, schedule) = chain_order(&perms);
    let specs: Vec<String> = order.iter().map(|f| f.to_string()).collect();
    insta::assert_snapshot!(specs.join(" "), @"0:0 2:2 0:2 0:3 1:2 1:3");
    let codes: Vec<u8> = schedule.order_type.iter().map(|t| t.code()).collect();
    assert_eq!(codes, [1, 1, 2, 3, 2, 3]);
    assert_eq!(schedule.n_chain_edges, 6);
    assert!(schedule.chain_perm_indices.iter().all(|i| (0..6).contains(i)));
    for (elt, t) in schedule.order_type.iter().enumerate() {
        if *t != OrderType::ChainInternalSecond {
            let [first, second] = schedule.candidates(elt);
            assert_ne!(first, second, "position {elt}");
        }
    }
}

#[test]
fn double_handle_yields_nothing() {
    init_logging();
    let p = pairing(DOUBLE_HANDLE);
    assert!(failing_filter(&p).is_some());
    let mut s = Searcher::closed_prime_min(p, vec![Isomorphism::identity(4)], false, PRIME_MIN)
        .unwrap();
    let mut count = 0;
    s.run(|_| count += 1);
    assert_eq!(count, 0);
    assert_eq!(s.order_elt(), -1);
    assert!(s.is_pristine());
}

#[test]
fn compact_results_are_closed_manifolds() {
    init_logging();
    for rep in [ONE_TET, LAYERED] {
        let s = searcher(rep, false, PurgeFlags::empty());
        let autos = s.automorphisms().to_vec();
        let results = run_all(s);
        assert!(!results.is_empty(), "{rep}");
        for perms in &results {
            assert!(perms.is_complete());
            assert!(Skeleton::new(perms).is_closed_manifold(), "{perms}");
        }
        assert_canonical_and_distinct(&results, &autos);
    }
}

#[test]
fn orientable_search_keeps_orientable_results() {
    for rep in [ONE_TET, LAYERED] {
        let all = run_all(searcher(rep, false, PurgeFlags::empty()));
        let orientable = run_all(searcher(rep, true, PurgeFlags::empty()));
        assert!(orientable.iter().all(|p| Skeleton::new(p).is_orientable()));

        let expected: Vec<GluingPerms> = all
            .into_iter()
            .filter(|p| Skeleton::new(p).is_orientable())
            .collect();
        assert_eq!(sorted_indices(&orientable), sorted_indices(&expected), "{rep}");
    }
}

#[test]
fn prime_min_results_have_one_vertex() {
    init_logging();
    let s = searcher(LAYERED, false, PRIME_MIN);
    assert!(matches!(s.kind(), SearchKind::ClosedPrimeMin(_)));
    let autos = s.automorphisms().to_vec();
    let results = run_all(s);
    assert!(!results.is_empty());

    for perms in &results {
        let skel = Skeleton::new(perms);
        assert_eq!(skel.n_vertices(), 1, "{perms}");
        assert_eq!(skel.n_edges(), perms.size() + 1, "{perms}");
        assert!(skel.is_closed_manifold(), "{perms}");
        assert!(skel.edge_degrees().iter().all(|&d| d >= 3), "{perms}");
    }
    assert_canonical_and_distinct(&results, &autos);

    // Every result is also found by the unrestricted search.
    let compact = sorted_indices(&run_all(searcher(LAYERED, false, PurgeFlags::empty())));
    for perms in &results {
        assert!(compact.binary_search(&perms.perm_indices().to_vec()).is_ok());
    }
}

#[test]
fn exhausted_search_is_pristine() {
    let mut s = searcher(LAYERED, false, PRIME_MIN);
    s.run(|_| {});
    assert_eq!(s.order_elt(), -1);
    assert!(s.is_pristine());
    assert!(s.perms().perm_indices().iter().all(|&i| i == -1));

    // Running again finds nothing more.
    let mut count = 0;
    s.run(|_| count += 1);
    assert_eq!(count, 0);
}

#[test]
fn zero_depth_hands_back_the_start() {
    let mut s = searcher(ONE_TET, false, PurgeFlags::empty());
    let mut states = Vec::new();
    s.partial_search(0, |s| states.push(s.clone()));
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].order_elt(), 0);
    assert!(!states[0].is_complete());
}

#[test]
fn cancelled_before_start() {
    let p = pairing(LAYERED);
    let autos = p.find_automorphisms().unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut count = 0;
    let res = enumerate_with_cancel(p, autos, false, PRIME_MIN, &cancel, |_| count += 1);
    assert_eq!(res, Ok(SearchOutcome::Cancelled));
    assert_eq!(count, 0);
}

#[test]
fn fresh_snapshot() {
    let s = searcher(ONE_TET, false, PurgeFlags::empty());
    similar_asserts::assert_eq!(
        s.tagged_data(),
        "f\n\
         0 1 0 0 0 3 0 2\n\
         -1 -1 -1 -1\n\
         .f. 0\n\
         0\n\
         0 2\n\
         0 0 0 2\n\
         4\n\
         -1 0 3 0 0 3 0 0 0 0 -1 -1 0 0\n\
         -1 0 3 0 0 3 1 1 0 0 -1 -1 0 0\n\
         -1 0 3 0 0 3 2 2 0 0 -1 -1 0 0\n\
         -1 0 3 0 0 3 3 3 0 0 -1 -1 0 0\n\
         -1 -1 -1 -1 -1 -1 -1 -1\n\
         6\n\
         -1 0 1 1 0 0 0011 0000\n\
         -1 0 1 1 0 0 0100 0001\n\
         -1 0 1 1 0 0 0000 0110\n\
         -1 0 1 1 0 0 1001 0000\n\
         -1 0 1 1 0 0 0010 1000\n\
         -1 0 1 1 0 0 1100 0000\n\
         -1 -1 -1 -1 -1 -1 -1 -1\n"
    );
    assert_eq!(Searcher::from_tagged_data(&s.tagged_data()).unwrap(), s);
}

#[test]
fn snapshots_round_trip() {
    for (rep, purge) in [(LAYERED, PRIME_MIN), (LAYERED, PurgeFlags::empty())] {
        let mut s = searcher(rep, false, purge);
        let mut states = Vec::new();
        s.partial_search(3, |s| states.push(s.clone()));
        assert!(!states.is_empty());
        for state in &states {
            let text = state.tagged_data();
            assert_eq!(&Searcher::from_tagged_data(&text).unwrap(), state);
            let bytes = state.snapshot_to_bytes();
            assert_eq!(&Searcher::restore_from_bytes(&bytes).unwrap(), state);
        }
    }
}

#[test]
fn restore_rejects_bad_snapshots() {
    let fresh = searcher(ONE_TET, false, PurgeFlags::empty()).tagged_data();

    let unknown = fresh.replacen('f', "x", 1);
    assert!(matches!(
        Searcher::from_tagged_data(&unknown),
        Err(CensusError::InvalidInput(InvalidInput::UnknownTag(_)))
    ));

    let flags = fresh.replacen(".f.", "xf.", 1);
    assert!(matches!(
        Searcher::from_tagged_data(&flags),
        Err(CensusError::InvalidInput(InvalidInput::MalformedToken { .. }))
    ));

    // Claims a gluing was chosen where none was.
    let ahead = fresh.replacen("\n0 2\n", "\n1 2\n", 1);
    assert!(matches!(
        Searcher::from_tagged_data(&ahead),
        Err(CensusError::InvalidInput(InvalidInput::Inconsistent(_)))
    ));

    let truncated: String = fresh.lines().take(10).map(|l| format!("{l}\n")).collect();
    assert!(matches!(
        Searcher::from_tagged_data(&truncated),
        Err(CensusError::InvalidInput(InvalidInput::UnexpectedEnd(_)))
    ));

    let trailing = format!("{fresh}7\n");
    assert!(matches!(
        Searcher::from_tagged_data(&trailing),
        Err(CensusError::InvalidInput(InvalidInput::MalformedToken { .. }))
    ));

    assert!(matches!(
        Searcher::restore_from_bytes(&[0x66, 0x0a, 0xff]),
        Err(CensusError::InvalidInput(InvalidInput::MalformedToken { .. }))
    ));
}

#[test]
fn restore_checks_trackers_against_gluings() {
    let mut s = searcher(ONE_TET, false, PurgeFlags::empty());
    let mut states = Vec::new();
    s.partial_search(1, |s| states.push(s.clone()));
    let state = states
        .iter()
        .find(|s| !s.is_complete())
        .expect("a state at depth one");

    // Swap the chosen gluing for another one without touching the trackers.
    let text = state.tagged_data();
    let face = state.order()[0];
    let chosen = state.perms().perm_index(face) as usize;
    let rejected = (0..6).filter(|&other| other != chosen).any(|other| {
        let mut perms = state.perms().clone();
        perms.set_perm(face, other);
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines[2] = perms.perm_indices().iter().map(|i| i.to_string()).join(" ");
        matches!(
            Searcher::from_tagged_data(&lines.join("\n")),
            Err(CensusError::InvalidInput(InvalidInput::Inconsistent(_)))
        )
    });
    assert!(rejected);
}

#[test]
fn two_tetrahedra_give_four_orientable_triangulations() {
    let s = searcher(TWO_TETS, true, PurgeFlags::empty());
    assert_eq!(s.kind(), &SearchKind::Compact);
    let autos = s.automorphisms().to_vec();
    let results = run_all(s);
    assert_eq!(results.len(), 4);
    for perms in &results {
        let skel = Skeleton::new(perms);
        assert!(skel.is_closed_manifold(), "{perms}");
        assert!(skel.is_orientable(), "{perms}");
    }
    assert_canonical_and_distinct(&results, &autos);
}

#[test]
fn three_loops_have_no_prime_minimal_triangulation() {
    let p = pairing(THREE_LOOPS);
    assert_eq!(failing_filter(&p), Some("broken double-ended chain"));
    let autos = p.find_automorphisms().unwrap();
    let mut count = 0;
    assert_eq!(
        enumerate(p, autos, false, PRIME_MIN, |_| count += 1),
        Ok(SearchOutcome::Finished)
    );
    assert_eq!(count, 0);

    // Every closed triangulation on this pairing has an edge of degree one.
    let compact = run_all(searcher(THREE_LOOPS, false, PurgeFlags::empty()));
    assert!(!compact.is_empty());
    for perms in &compact {
        assert!(Skeleton::new(perms).edge_degrees().contains(&1), "{perms}");
    }
}

#[test]
fn every_result_state_round_trips() {
    for (rep, purge) in [
        (ONE_TET, PurgeFlags::empty()),
        (LAYERED, PurgeFlags::empty()),
        (LAYERED, PRIME_MIN),
    ] {
        let mut s = searcher(rep, false, purge);
        let mut states = Vec::new();
        s.partial_search(usize::MAX, |s| states.push(s.clone()));
        assert!(!states.is_empty(), "{rep}");
        for state in &states {
            assert!(state.is_complete());
            let bytes = state.snapshot_to_bytes();
            assert_eq!(&Searcher::restore_from_bytes(&bytes).unwrap(), state);
        }
    }
}

#[test]
fn resume_after_any_result() {
    for (rep, purge) in [(LAYERED, PurgeFlags::empty()), (LAYERED, PRIME_MIN)] {
        let full = sorted_indices(&run_all(searcher(rep, false, purge)));
        for stop_at in 0..full.len() {
            let mut s = searcher(rep, false, purge);
            let cancel = CancelToken::new();
            let mut before = Vec::new();
            let mut saved = None;
            s.run_with_cancel(&cancel, |s| {
                before.push(s.perms().clone());
                if before.len() == stop_at + 1 {
                    saved = Some(s.snapshot_to_bytes());
                    cancel.cancel();
                }
            });

            let mut restored = Searcher::restore_from_bytes(&saved.unwrap()).unwrap();
            restored.resume(|s| before.push(s.perms().clone()));
            assert_eq!(restored.order_elt(), -1);
            assert!(restored.is_pristine());
            assert_eq!(sorted_indices(&before), full, "{rep} stopped at {stop_at}");
        }
    }
}

#[test]
fn resume_on_a_fresh_searcher_runs_everything() {
    let full = sorted_indices(&run_all(searcher(LAYERED, false, PurgeFlags::empty())));
    let mut s = searcher(LAYERED, false, PurgeFlags::empty());
    let mut found = Vec::new();
    s.resume(|s| found.push(s.perms().clone()));
    assert_eq!(sorted_indices(&found), full);
}

fn arb_case() -> impl Strategy<Value = (&'static str, PurgeFlags)> {
    prop_oneof![
        Just((ONE_TET, PurgeFlags::empty())),
        Just((LAYERED, PurgeFlags::empty())),
        Just((LAYERED, PRIME_MIN)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Splitting a search at any depth and finishing every piece from its snapshot finds
    /// exactly the results of one full run.
    #[test]
    fn partial_searches_resume((rep, purge) in arb_case(), depth in 0usize..7) {
        let full = sorted_indices(&run_all(searcher(rep, false, purge)));

        let mut s = searcher(rep, false, purge);
        let mut pieces = Vec::new();
        s.partial_search(depth, |s| pieces.push(s.snapshot_to_bytes()));

        let mut resumed = Vec::new();
        for bytes in &pieces {
            let piece = Searcher::restore_from_bytes(bytes).unwrap();
            prop_assert!(piece.is_complete() || piece.order_elt() == depth as isize);
            resumed.extend(run_all(piece));
        }
        prop_assert_eq!(sorted_indices(&resumed), full);
    }

    /// A cancelled search stops right away and unwinds every merge.
    #[test]
    fn cancellation_unwinds((rep, purge) in arb_case(), stop_after in 0usize..6) {
        let total = run_all(searcher(rep, false, purge)).len();

        let mut s = searcher(rep, false, purge);
        let cancel = CancelToken::new();
        let mut emitted = 0;
        let outcome = s.run_with_cancel(&cancel, |_| {
            emitted += 1;
            if emitted > stop_after {
                cancel.cancel();
            }
        });

        if stop_after < total {
            prop_assert_eq!(outcome, SearchOutcome::Cancelled);
            prop_assert_eq!(emitted, stop_after + 1);
            prop_assert_eq!(s.order_elt(), 0);
            prop_assert!(s.is_pristine());
            prop_assert!(s.perms().perm_indices().iter().all(|&i| i == -1));
        } else {
            prop_assert_eq!(outcome, SearchOutcome::Finished);
            prop_assert_eq!(emitted, total);
        }
    }
}
