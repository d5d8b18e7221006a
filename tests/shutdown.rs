use pdes::prelude::*;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

#[test]
fn stop_drops_pending_events() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Builder::seeded(0).quiet().build().unwrap();
    let host = engine.add_host(HostConfig::new("main"));

    let work = {
        let log = log.clone();
        Task::named("work", move |ctx| log.lock().unwrap().push(ctx.now()))
    };
    for ms in 1..=20 {
        engine
            .schedule(work.clone(), host, Duration::from_millis(ms))
            .unwrap();
    }
    engine
        .schedule(Task::stop(), host, Duration::from_micros(10_500))
        .unwrap();
    assert_eq!(work.ref_count(), 21);

    match engine.run().unwrap() {
        RuntimeResult::PrematureAbort {
            time,
            profiler,
            active_events,
        } => {
            assert_eq!(time, SimTime::from_micros(10_500));
            assert_eq!(profiler.event_count, 11);
            assert_eq!(active_events, 10);
            assert_eq!(profiler.dropped, 10);
        }
        other => panic!("unexpected result {other:?}"),
    }

    assert_eq!(log.lock().unwrap().len(), 10);
    assert_eq!(work.ref_count(), 1);
    assert_eq!(engine.num_events_queued(), 0);
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn stop_ends_multi_threaded_runs() {
    fn forever(latest: Arc<AtomicU64>, marker: Arc<()>) -> Task {
        Task::named("forever", move |ctx| {
            latest.fetch_max(ctx.now().as_nanos(), Ordering::SeqCst);
            ctx.schedule_local(
                forever(latest.clone(), marker.clone()),
                Duration::from_micros(100),
            );
        })
    }

    for policy in PolicyKind::ALL {
        let latest = Arc::new(AtomicU64::new(0));
        let marker = Arc::new(());

        let mut engine = Builder::seeded(0)
            .workers(4)
            .policy(policy)
            .topology(UniformLatency(Duration::from_millis(1)))
            .quiet()
            .build()
            .unwrap();
        let hosts = (0..8)
            .map(|i| engine.add_host(HostConfig::new(format!("h{i}"))))
            .collect::<Vec<_>>();

        for host in &hosts {
            engine
                .schedule(forever(latest.clone(), marker.clone()), *host, Duration::ZERO)
                .unwrap();
        }
        engine
            .schedule(Task::stop(), hosts[3], Duration::from_millis(50))
            .unwrap();

        let res = engine.run().unwrap();
        assert!(
            matches!(res, RuntimeResult::PrematureAbort { .. }),
            "{policy}"
        );

        // Nothing runs beyond the window the stop was observed in.
        let latest = SimTime::from_nanos(latest.load(Ordering::SeqCst));
        assert!(latest < SimTime::from_millis(51), "{policy}: {latest}");

        // All queued tasks were released without execution.
        assert_eq!(Arc::strong_count(&marker), 1, "{policy}");
    }
}

#[test]
fn stop_from_a_task() {
    let mut engine = Builder::seeded(0).quiet().build().unwrap();
    let host = engine.add_host(HostConfig::new("main"));

    engine
        .schedule(
            Task::new(|ctx| {
                if ctx.now() >= SimTime::from_secs(2) {
                    ctx.stop();
                }
            }),
            host,
            Duration::from_secs(2),
        )
        .unwrap();
    engine
        .schedule(Task::new(|_| {}), host, Duration::from_secs(5))
        .unwrap();

    let res = engine.run().unwrap();
    assert_eq!(res.time(), SimTime::from_secs(2));
    assert!(matches!(
        res,
        RuntimeResult::PrematureAbort {
            active_events: 1,
            ..
        }
    ));
}

#[test]
fn stop_completes_the_window_for_every_policy() {
    type Log = Arc<Mutex<Vec<(SimTime, HostId)>>>;

    fn record(log: &Log) -> Task {
        let log = log.clone();
        Task::named("record", move |ctx| {
            log.lock().unwrap().push((ctx.now(), ctx.host_id()));
        })
    }

    for policy in PolicyKind::ALL {
        for workers in [1, 4] {
            let log = Log::default();
            let mut engine = Builder::seeded(0)
                .workers(workers)
                .policy(policy)
                .min_time_jump(Duration::from_millis(10))
                .quiet()
                .build()
                .unwrap();
            let a = engine.add_host(HostConfig::new("a"));
            let b = engine.add_host(HostConfig::new("b"));
            let c = engine.add_host(HostConfig::new("c"));

            let fork = {
                let log = log.clone();
                let local = record(&log);
                let remote = record(&log);
                Task::named("fork", move |ctx| {
                    log.lock().unwrap().push((ctx.now(), ctx.host_id()));
                    // Runs within the window of the stop.
                    ctx.schedule_local(local.clone(), Duration::from_millis(2));
                    // Deferred to the window end, thus never executed.
                    ctx.schedule(remote.clone(), c, Duration::from_millis(1));
                })
            };

            engine.schedule(Task::stop(), b, Duration::from_millis(1)).unwrap();
            engine.schedule(record(&log), a, Duration::from_millis(2)).unwrap();
            engine.schedule(fork, a, Duration::from_millis(3)).unwrap();
            engine.schedule(record(&log), c, Duration::from_millis(9)).unwrap();
            engine.schedule(record(&log), a, Duration::from_millis(15)).unwrap();

            let res = engine.run().unwrap();
            match res {
                RuntimeResult::PrematureAbort {
                    time,
                    profiler,
                    active_events,
                } => {
                    assert_eq!(time, SimTime::from_millis(9), "{policy}/{workers}");
                    assert_eq!(profiler.event_count, 5, "{policy}/{workers}");
                    assert_eq!(active_events, 2, "{policy}/{workers}");
                }
                other => panic!("{policy}/{workers}: unexpected result {other:?}"),
            }

            let mut log = log.lock().unwrap().clone();
            log.sort();
            assert_eq!(
                log,
                vec![
                    (SimTime::from_millis(2), a),
                    (SimTime::from_millis(3), a),
                    (SimTime::from_millis(5), a),
                    (SimTime::from_millis(9), c),
                ],
                "{policy}/{workers}"
            );
        }
    }
}
