use super::*;
use proptest::prelude::*;

#[test]
fn attach_by_rank() {
    let mut nodes = vec![UfLink::default(); 4];

    let child = attach(&mut nodes, 0, 1, true);
    assert_eq!(child, 1);
    assert_eq!(nodes[0].rank, 1);
    assert!(nodes[1].had_equal_rank);
    assert_eq!(find(&nodes, 1), (0, true));

    // Lower rank goes beneath, whichever side it is passed on.
    let child = attach(&mut nodes, 2, 0, false);
    assert_eq!(child, 2);
    assert_eq!(nodes[0].rank, 1);
    assert!(!nodes[2].had_equal_rank);
    assert_eq!(find(&nodes, 2), (0, false));

    let child = attach(&mut nodes, 0, 3, true);
    assert_eq!(child, 3);
    assert_eq!(find(&nodes, 3), (0, true));
}

#[test]
fn detach_restores_rank() {
    let mut nodes = vec![UfLink::default(); 2];
    let child = attach(&mut nodes, 0, 1, true);
    assert_eq!(detach(&mut nodes, child), 0);
    assert_eq!(nodes, vec![UfLink::default(); 2]);
}

#[test]
fn change_log_slots() {
    let mut log = ChangeLog::new(8);
    assert!(log.is_clear());
    let slot = ChangeLog::slot(1, 2);
    assert_eq!(slot, 6);
    log.record(slot, Some(5));
    assert_eq!(log.get(slot), Some(5));
    assert!(!log.is_clear());
    assert_eq!(log.take(slot), Some(5));
    assert_eq!(log.take(slot), None);
    log.record(0, None);
    assert!(log.is_clear());
}

#[test]
fn twisted_classes() {
    let mut uf = TwistedUnionFind::new(3);
    assert_eq!(uf.union(0, 1, true), Union::Merged);
    assert_eq!(uf.union(1, 2, true), Union::Merged);
    assert_eq!(uf.n_classes(), 1);
    assert_eq!(uf.union(0, 2, false), Union::Consistent);
    assert_eq!(uf.union(0, 2, true), Union::Twisted);
    let roots = uf.roots();
    assert!(roots.iter().all(|&r| r == roots[0]));
}

proptest! {
    /// Undoing a sequence of unions in reverse order restores every link.
    #[test]
    fn attach_detach_stack(ops in prop::collection::vec((0usize..12, 0usize..12, any::<bool>()), 0..30)) {
        let mut nodes = vec![UfLink::default(); 12];
        let mut history = Vec::new();
        for (a, b, twist) in ops {
            let (ra, ta) = find(&nodes, a);
            let (rb, tb) = find(&nodes, b);
            if ra != rb {
                history.push(attach(&mut nodes, ra, rb, twist ^ ta ^ tb));
                let (r1, t1) = find(&nodes, a);
                let (r2, t2) = find(&nodes, b);
                prop_assert_eq!(r1, r2);
                prop_assert_eq!(t1 ^ t2, twist);
            }
        }
        for &child in history.iter().rev() {
            detach(&mut nodes, child);
        }
        prop_assert_eq!(nodes, vec![UfLink::default(); 12]);
    }
}
