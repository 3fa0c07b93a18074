use ctxpool::{AuthContext, ContextPool, Propagation, RejectionPolicy, TaskError, store, worker_id};
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;

fn ctx(name: &str) -> AuthContext {
    AuthContext::authenticated(name)
}

fn single_worker(propagation: Propagation) -> ContextPool {
    ContextPool::builder()
        .core_threads(1)
        .max_threads(1)
        .queue_capacity(16)
        .propagation(propagation)
        .build()
        .unwrap()
}

#[test]
fn test_capture_isolates_concurrent_submitters() {
    let pool = Arc::new(
        ContextPool::builder()
            .core_threads(4)
            .max_threads(4)
            .queue_capacity(64)
            .propagation(Propagation::CaptureAndRestore)
            .rejection(RejectionPolicy::Block)
            .build()
            .unwrap(),
    );

    let start = Arc::new(Barrier::new(2));

    let submitters: Vec<_> = ["Timon", "Pumbaa"]
        .into_iter()
        .map(|name| {
            let pool = pool.clone();
            let start = start.clone();

            thread::spawn(move || {
                store::set(ctx(name));
                start.wait();

                let handles: Vec<_> = (0..500)
                    .map(|_| pool.submit(|| Ok(store::current())).unwrap())
                    .collect();

                let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
                (name, seen)
            })
        })
        .collect();

    let mut total = 0;
    for submitter in submitters {
        let (name, seen) = submitter.join().unwrap();

        for value in seen {
            assert_eq!(value, Some(ctx(name)), "{name} observed a foreign context");
            total += 1;
        }
    }

    assert_eq!(total, 1000);
}

#[test]
fn test_capture_round_trip_is_exact() {
    let pool = single_worker(Propagation::CaptureAndRestore);
    let joe = AuthContext::new("Joe", true);

    let handle = store::enter(Some(joe.clone()), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });

    let seen = handle.join().unwrap().expect("context must be propagated");
    assert_eq!(seen, joe);
    assert_eq!(seen.principal(), "Joe");
    assert!(seen.is_authenticated());
}

#[test]
fn test_capture_preserves_unauthenticated_flag() {
    let pool = single_worker(Propagation::CaptureAndRestore);
    let guest = AuthContext::new("guest", false);

    let handle = store::enter(Some(guest.clone()), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });

    assert_eq!(handle.join().unwrap(), Some(guest));
}

#[test]
fn test_capture_restores_after_failure() {
    let pool = single_worker(Propagation::CaptureAndRestore);

    let failing = store::enter(Some(ctx("Scar")), || {
        pool.submit(|| -> anyhow::Result<()> { anyhow::bail!("hyenas") })
            .unwrap()
    });
    assert!(matches!(failing.join(), Err(TaskError::Failed(_))));

    let after = store::enter(None, || pool.submit(|| Ok(store::current())).unwrap());
    assert_eq!(
        after.join().unwrap(),
        None,
        "the failed task's context must not outlive it"
    );
}

#[test]
fn test_capture_restores_after_panic() {
    let pool = single_worker(Propagation::CaptureAndRestore);

    let panicking = store::enter(Some(ctx("Scar")), || {
        pool.submit(|| -> anyhow::Result<()> { panic!("stampede") })
            .unwrap()
    });
    assert!(matches!(panicking.join(), Err(TaskError::Panicked(_))));

    let after = store::enter(None, || pool.submit(|| Ok(store::current())).unwrap());
    assert_eq!(after.join().unwrap(), None);
}

#[test]
fn test_capture_undoes_context_set_by_the_task() {
    let pool = single_worker(Propagation::CaptureAndRestore);

    let careless = pool
        .submit(|| {
            store::set(ctx("Zazu"));
            Ok(())
        })
        .unwrap();
    careless.join().unwrap();

    let after = pool.submit(|| Ok(store::current())).unwrap();
    assert_eq!(after.join().unwrap(), None);
}

#[test]
fn test_capture_absent_context_clears_worker() {
    // A worker seeded through an earlier task is still cleared for a task
    // whose submitter had no context.
    let pool = single_worker(Propagation::CaptureAndRestore);

    let with = store::enter(Some(ctx("Rafiki")), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });
    let without = store::enter(None, || pool.submit(|| Ok(store::current())).unwrap());

    assert_eq!(with.join().unwrap(), Some(ctx("Rafiki")));
    assert_eq!(without.join().unwrap(), None);
}

#[test]
fn test_capture_is_a_snapshot_taken_at_submit() {
    let pool = single_worker(Propagation::CaptureAndRestore);
    let (gate_tx, gate_rx) = mpsc::channel::<()>();

    let handle = store::enter(Some(ctx("Sarabi")), || {
        pool.submit(move || {
            gate_rx.recv()?;
            Ok(store::current())
        })
        .unwrap()
    });

    // The submitter changes identity before the task is allowed to read it.
    store::enter(Some(ctx("Shenzi")), || gate_tx.send(()).unwrap());

    assert_eq!(handle.join().unwrap(), Some(ctx("Sarabi")));
}

#[test]
fn test_nested_submission_captures_current_worker_context() {
    let pool = Arc::new(
        ContextPool::builder()
            .core_threads(2)
            .max_threads(2)
            .queue_capacity(16)
            .propagation(Propagation::CaptureAndRestore)
            .build()
            .unwrap(),
    );

    let inner_pool = pool.clone();
    let outer = store::enter(Some(ctx("Kiara")), || {
        pool.submit(move || {
            let inner = inner_pool.submit(|| Ok(store::current()))?;
            Ok((store::current(), inner.join()?))
        })
        .unwrap()
    });

    let (outer_seen, inner_seen) = outer.join().unwrap();
    assert_eq!(outer_seen, Some(ctx("Kiara")));
    assert_eq!(inner_seen, Some(ctx("Kiara")));
}

#[test]
fn test_inherit_at_spawn_misses_reused_workers() {
    // Workers are spawned here, before any context exists on this thread.
    let pool = store::enter(None, || single_worker(Propagation::InheritAtSpawn));

    let handle = store::enter(Some(ctx("Simba")), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });

    assert_eq!(
        handle.join().unwrap(),
        None,
        "a pre-spawned worker never receives the submitter's context"
    );
}

#[test]
fn test_inherit_at_spawn_pins_build_time_context() {
    let pool = store::enter(Some(ctx("Mufasa")), || {
        single_worker(Propagation::InheritAtSpawn)
    });

    let handle = store::enter(Some(ctx("Simba")), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });

    assert_eq!(
        handle.join().unwrap(),
        Some(ctx("Mufasa")),
        "workers keep whatever was current when they were spawned"
    );
}

#[test]
fn test_inherit_at_spawn_burst_worker_takes_submitter_context() {
    let pool = store::enter(None, || {
        ContextPool::builder()
            .core_threads(1)
            .max_threads(2)
            .queue_capacity(1)
            .propagation(Propagation::InheritAtSpawn)
            .build()
            .unwrap()
    });

    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (gate_tx, gate_rx) = mpsc::channel::<()>();

    // Occupy the only core worker.
    let blocker = pool
        .submit(move || {
            started_tx.send(())?;
            gate_rx.recv()?;
            Ok(())
        })
        .unwrap();
    started_rx.recv().unwrap();

    // Fill the backlog.
    let filler = pool.submit(|| Ok(store::current())).unwrap();

    // The backlog is full, so this submission spawns a burst worker from
    // the submitting thread, which then copies Nala.
    let burst = store::enter(Some(ctx("Nala")), || {
        pool.submit(|| Ok((worker_id(), store::current()))).unwrap()
    });

    let (burst_worker, burst_seen) = burst.join().unwrap();
    assert_eq!(burst_worker, Some(1), "expected the second spawned worker");
    assert_eq!(burst_seen, Some(ctx("Nala")));

    gate_tx.send(()).unwrap();
    blocker.join().unwrap();

    // Whichever worker ran it, the filler was submitted without context.
    // On the burst worker it sees Nala's leftover identity.
    let filler_seen = filler.join().unwrap();
    assert!(filler_seen.is_none() || filler_seen == Some(ctx("Nala")));
}

#[test]
fn test_none_leaks_stale_context_between_tasks() {
    let pool = single_worker(Propagation::None);

    // An unrelated task sets a context and never cleans up.
    let careless = store::enter(Some(ctx("Scar")), || {
        pool.submit(|| {
            store::set(ctx("Scar"));
            Ok(())
        })
        .unwrap()
    });
    careless.join().unwrap();

    let victim = store::enter(None, || pool.submit(|| Ok(store::current())).unwrap());

    assert_eq!(
        victim.join().unwrap(),
        Some(ctx("Scar")),
        "without propagation the reused worker leaks the previous context"
    );
}

#[test]
fn test_none_does_not_carry_submitter_context() {
    let pool = single_worker(Propagation::None);

    let handle = store::enter(Some(ctx("Timon")), || {
        pool.submit(|| Ok(store::current())).unwrap()
    });

    assert_eq!(handle.join().unwrap(), None);
}

#[test]
fn test_capture_only_reads_store_for_capture_strategy() {
    store::enter(Some(ctx("Ed")), || {
        assert_eq!(Propagation::CaptureAndRestore.capture(), Some(ctx("Ed")));
        assert_eq!(Propagation::InheritAtSpawn.capture(), None);
        assert_eq!(Propagation::None.capture(), None);
    });
}

#[test]
fn test_run_with_applies_strategy() {
    store::enter(Some(ctx("Banzai")), || {
        let seen = Propagation::CaptureAndRestore.run_with(Some(ctx("Chaka")), store::current);
        assert_eq!(seen, Some(ctx("Chaka")));
        assert_eq!(store::current(), Some(ctx("Banzai")));

        let seen = Propagation::None.run_with(Some(ctx("Chaka")), store::current);
        assert_eq!(seen, Some(ctx("Banzai")));
    });
}
