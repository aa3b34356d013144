//! The six universal invariants of SPEC_FULL.md §8, each isolated in its own
//! small graph rather than inferred from the end-to-end scenarios.

use reactive_core::Runtime;

#[test]
fn no_over_reactivity_single_write_runs_each_observer_once() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let a = rt.create_value(1i64);
    let f_b = {
        let rt = rt.clone();
        rt.create_expression(move || rt.read_value(a).unwrap() + 5)
    };
    let obs_c = {
        let rt = rt.clone();
        rt.create_observer(move || {
            let _ = rt.read_value(a).unwrap() + rt.read_expression(f_b).unwrap();
        })
    };

    rt.flush().unwrap();
    let before = rt.exec_count(obs_c);

    rt.write_value(a, 2).unwrap();
    rt.flush().unwrap();

    assert_eq!(rt.exec_count(obs_c), before + 1);
}

#[test]
fn value_equality_gating_suppresses_downstream_rerun() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let a = rt.create_value(10i64);
    let c = rt.create_value(false);

    let obs_b = {
        let rt = rt.clone();
        rt.create_observer(move || {
            rt.write_value(c, rt.read_value(a).unwrap() > 0).unwrap();
        })
    };
    let f_d = {
        let rt = rt.clone();
        rt.create_expression(move || rt.read_value(c).unwrap())
    };
    let obs_e = {
        let rt = rt.clone();
        rt.create_observer(move || {
            let _ = rt.read_expression(f_d).unwrap();
        })
    };

    rt.flush().unwrap();
    let d_before = rt.exec_count(f_d);
    let e_before = rt.exec_count(obs_e);

    // A changes but its sign doesn't, so C re-evaluates to the same bool and
    // must not propagate past it.
    rt.write_value(a, 11).unwrap();
    rt.flush().unwrap();

    assert_eq!(rt.exec_count(obs_b), 2);
    assert_eq!(rt.exec_count(f_d), d_before);
    assert_eq!(rt.exec_count(obs_e), e_before);
}

#[test]
fn minimal_edges_drop_branch_stops_tracking_the_untaken_source() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let flag = rt.create_value(true);
    let x = rt.create_value(1i64);
    let y = rt.create_value(2i64);

    let f = {
        let rt = rt.clone();
        rt.create_expression(move || {
            if rt.read_value(flag).unwrap() {
                rt.read_value(x).unwrap()
            } else {
                rt.read_value(y).unwrap()
            }
        })
    };
    let obs = {
        let rt = rt.clone();
        rt.create_observer(move || {
            let _ = rt.read_expression(f).unwrap();
        })
    };

    rt.flush().unwrap();
    assert_eq!(rt.exec_count(f), 1);

    // Flip the branch: f now reads y, not x, and its edge to x must be
    // dropped as part of this re-evaluation.
    rt.write_value(flag, false).unwrap();
    rt.flush().unwrap();
    assert_eq!(rt.exec_count(f), 2);
    let after_flip = rt.exec_count(obs);

    // x is no longer one of f's sources: writing it must not reach f or obs.
    rt.write_value(x, 99).unwrap();
    rt.flush().unwrap();

    assert_eq!(rt.exec_count(f), 2);
    assert_eq!(rt.exec_count(obs), after_flip);
}

#[test]
fn isolate_reads_never_produce_edges() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let b = rt.create_value(10i64);

    let obs = {
        let rt = rt.clone();
        rt.create_observer(move || {
            let _ = rt.isolate(|| rt.read_value(b).unwrap());
        })
    };

    rt.flush().unwrap();
    assert_eq!(rt.exec_count(obs), 1);

    rt.write_value(b, 20).unwrap();
    rt.flush().unwrap();

    assert_eq!(rt.exec_count(obs), 1);
}

#[test]
fn pull_semantics_unread_expression_is_not_reevaluated() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let flag = rt.create_value(true);
    let a = rt.create_value(1i64);

    let f = {
        let rt = rt.clone();
        rt.create_expression(move || rt.read_value(a).unwrap() * 2)
    };
    let obs = {
        let rt = rt.clone();
        rt.create_observer(move || {
            if rt.read_value(flag).unwrap() {
                let _ = rt.read_expression(f).unwrap();
            }
        })
    };

    rt.flush().unwrap();
    assert_eq!(rt.exec_count(f), 1);

    // obs stops reading f; its edge to f is dropped this round.
    rt.write_value(flag, false).unwrap();
    rt.flush().unwrap();

    // Invalidating a (now unread by anyone transitively) must not cause f to
    // re-run: nothing pulls it.
    rt.write_value(a, 2).unwrap();
    rt.flush().unwrap();

    assert_eq!(rt.exec_count(f), 1);
}

#[test]
fn at_most_once_queued_two_invalidations_enqueue_a_single_pass() {
    let _ = env_logger::try_init();
    let rt = Runtime::new();
    let a = rt.create_value(1i64);
    let b = rt.create_value(1i64);

    let obs = {
        let rt = rt.clone();
        rt.create_observer(move || {
            let _ = rt.read_value(a).unwrap() + rt.read_value(b).unwrap();
        })
    };
    rt.flush().unwrap();
    assert_eq!(rt.pending_count(), 0);

    rt.write_value(a, 2).unwrap();
    rt.write_value(b, 2).unwrap();
    // Both writes target the same observer; it must be queued exactly once.
    assert_eq!(rt.pending_count(), 1);

    let before = rt.exec_count(obs);
    rt.flush().unwrap();
    assert_eq!(rt.exec_count(obs), before + 1);
}
