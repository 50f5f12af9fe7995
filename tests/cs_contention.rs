//! Mutual exclusion under contention for both blocking and lock-free paths.

mod common;

use common::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vcilock::{ids, Granularity, MutexId, Runtime, RuntimeBuilder, StreamId};

const ITERATIONS: usize = 200;

#[derive(Default)]
struct Occupancy {
    inside: AtomicUsize,
    max_inside: AtomicUsize,
    total: AtomicUsize,
}

impl Occupancy {
    fn arrive(&self) {
        let now = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);
    }

    fn depart(&self) {
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one context per entry of `placements`, each entering `id`
/// `ITERATIONS` times. Inside the section a context sometimes yields the
/// stream and sometimes yields the section itself.
fn hammer(runtime: &Runtime, id: MutexId, placements: &[usize]) -> Arc<Occupancy> {
    let occupancy = Arc::new(Occupancy::default());
    let handles: Vec<_> = placements
        .iter()
        .map(|&stream| {
            let occupancy = Arc::clone(&occupancy);
            runtime
                .spawn(StreamId::new(stream), move |ctx| {
                    let runtime = ctx.runtime().clone();
                    let mutex = runtime.mutexes().get(id).expect("known mutex");
                    for i in 0..ITERATIONS {
                        ctx.enter(mutex, id);
                        occupancy.arrive();
                        assert_eq!(mutex.owner(), Some(ctx.id()));
                        match i % 4 {
                            1 => ctx.yield_now(),
                            2 => {
                                occupancy.depart();
                                ctx.yield_section(mutex, id);
                                occupancy.arrive();
                                assert_eq!(mutex.owner(), Some(ctx.id()));
                            }
                            _ => {}
                        }
                        occupancy.depart();
                        ctx.exit(mutex, id);
                    }
                })
                .expect("spawn")
        })
        .collect();

    for handle in handles {
        handle.join().expect("context panicked");
    }
    occupancy
}

#[test]
fn global_discipline_excludes_across_streams() {
    init_test_logging();
    test_phase!("global_discipline_excludes_across_streams");
    let runtime = runtime_with(Granularity::Global, 4, 4);
    let occupancy = hammer(&runtime, ids::PROGRESS, &[0, 0, 1, 1, 2, 3]);

    let max = occupancy.max_inside.load(Ordering::SeqCst);
    assert_with_log!(max == 1, "max concurrent holders", 1, max);
    let mutex = runtime.mutexes().get(ids::PROGRESS).expect("progress");
    assert_eq!(mutex.count(), 0);
    assert!(!mutex.is_locked());
    test_complete!("global_discipline_excludes_across_streams", max = max);
}

#[test]
fn vci_ids_under_global_discipline_block() {
    let runtime = RuntimeBuilder::new()
        .granularity(Granularity::Global)
        .streams(3)
        .vcis(2)
        .heavy_yield(true)
        .build()
        .expect("runtime");
    let occupancy = hammer(&runtime, MutexId::vci(2), &[0, 1, 2, 2]);
    assert_eq!(occupancy.max_inside.load(Ordering::SeqCst), 1);
    assert_eq!(occupancy.total.load(Ordering::SeqCst), 4 * ITERATIONS + 4 * ITERATIONS / 4);
}

#[test]
fn lock_free_path_excludes_with_offloads() {
    init_test_logging();
    test_phase!("lock_free_path_excludes_with_offloads");
    let runtime = runtime_with_masks(&[&[1], &[2]]);

    test_section!("two local contexts, three offloading ones");
    let occupancy = hammer(&runtime, MutexId::vci(2), &[1, 1, 0, 0, 0]);

    let max = occupancy.max_inside.load(Ordering::SeqCst);
    assert_with_log!(max == 1, "max concurrent holders", 1, max);
    let mutex = runtime.mutexes().vci(2).expect("vci 2");
    assert_eq!(mutex.count(), 0);
    assert_eq!(mutex.owner(), None);
    assert!(!mutex.is_locked(), "the raw lock is never engaged");
    test_complete!("lock_free_path_excludes_with_offloads", max = max);
}

#[test]
fn global_ids_under_vci_discipline_block() {
    let runtime = runtime_with(Granularity::Vci, 2, 2);
    let occupancy = hammer(&runtime, ids::UTIL, &[0, 1, 0, 1]);
    assert_eq!(occupancy.max_inside.load(Ordering::SeqCst), 1);
    let mutex = runtime.mutexes().get(ids::UTIL).expect("util");
    assert_eq!(mutex.count(), 0);
}

#[test]
fn nested_release_off_stream_excludes_local_contender() {
    init_test_logging();
    test_phase!("nested_release_off_stream_excludes_local_contender");
    let runtime = runtime_with_masks(&[&[1], &[2], &[3]]);
    let occupancy = Arc::new(Occupancy::default());
    let m2_id = MutexId::vci(2);
    let m3_id = MutexId::vci(3);

    test_section!("X releases vci 2 while inside vci 3");
    let x = {
        let occupancy = Arc::clone(&occupancy);
        runtime
            .spawn(StreamId::new(0), move |ctx| {
                let runtime = ctx.runtime().clone();
                let m2 = runtime.mutexes().vci(2).expect("vci 2");
                let m3 = runtime.mutexes().vci(3).expect("vci 3");
                for _ in 0..ITERATIONS {
                    ctx.enter(m2, m2_id);
                    occupancy.arrive();
                    ctx.enter(m3, m3_id);
                    occupancy.depart();
                    ctx.exit(m2, m2_id);
                    ctx.exit(m3, m3_id);
                    assert_eq!(ctx.stream(), StreamId::new(0));
                }
            })
            .expect("spawn X")
    };

    test_section!("Z takes vci 2 on its own stream");
    let z = {
        let occupancy = Arc::clone(&occupancy);
        runtime
            .spawn(StreamId::new(1), move |ctx| {
                let runtime = ctx.runtime().clone();
                let m2 = runtime.mutexes().vci(2).expect("vci 2");
                for _ in 0..ITERATIONS {
                    ctx.enter(m2, m2_id);
                    occupancy.arrive();
                    assert_eq!(m2.owner(), Some(ctx.id()));
                    ctx.yield_now();
                    occupancy.depart();
                    ctx.exit(m2, m2_id);
                }
            })
            .expect("spawn Z")
    };

    x.join().expect("X panicked");
    z.join().expect("Z panicked");

    let max = occupancy.max_inside.load(Ordering::SeqCst);
    assert_with_log!(max == 1, "max concurrent holders of vci 2", 1, max);
    for vci in [2, 3] {
        let mutex = runtime.mutexes().vci(vci).expect("vci");
        assert_eq!(mutex.count(), 0);
        assert_eq!(mutex.owner(), None);
    }
    test_complete!("nested_release_off_stream_excludes_local_contender", max = max);
}
