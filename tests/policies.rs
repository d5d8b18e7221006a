use pdes::prelude::*;
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<(SimTime, HostId, String)>>>;

fn label(log: &Log, name: &'static str) -> Task {
    let log = log.clone();
    Task::named(name, move |ctx| {
        log.lock()
            .unwrap()
            .push((ctx.now(), ctx.host_id(), name.to_string()));
    })
}

fn engines() -> impl Iterator<Item = (PolicyKind, usize, Builder)> {
    PolicyKind::ALL.into_iter().flat_map(|policy| {
        [1, 4].into_iter().map(move |workers| {
            (
                policy,
                workers,
                Builder::seeded(7).workers(workers).policy(policy).quiet(),
            )
        })
    })
}

#[test]
fn equal_times_keep_schedule_order() {
    for (policy, workers, builder) in engines() {
        let log = Log::default();
        let mut engine = builder.build().unwrap();
        let host = engine.add_host(HostConfig::new("a"));
        let _ = engine.add_host(HostConfig::new("b"));

        engine.schedule(label(&log, "C"), host, Duration::from_nanos(5)).unwrap();
        engine.schedule(label(&log, "A"), host, Duration::from_nanos(5)).unwrap();
        engine.schedule(label(&log, "B"), host, Duration::from_nanos(3)).unwrap();
        engine.run().unwrap();

        let order = log
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, name)| name.clone())
            .collect::<Vec<_>>();
        assert_eq!(order, ["B", "C", "A"], "{policy} with {workers} workers");
    }
}

#[test]
fn cross_host_events_are_visible_after_latency() {
    for (policy, workers, builder) in engines() {
        let log = Log::default();
        let mut engine = builder
            .topology(UniformLatency(Duration::from_millis(10)))
            .build()
            .unwrap();
        let a = engine.add_host(HostConfig::new("a"));
        let b = engine.add_host(HostConfig::new("b"));
        assert_eq!(engine.min_time_jump().unwrap(), Duration::from_millis(10));

        let pong = label(&log, "pong");
        let ping_log = log.clone();
        let ping = Task::named("ping", move |ctx| {
            ping_log
                .lock()
                .unwrap()
                .push((ctx.now(), ctx.host_id(), "ping".to_string()));
            let latency = ctx.latency_to(b).unwrap();
            ctx.schedule(pong.clone(), b, latency);
        });
        engine.schedule(ping, a, Duration::from_millis(3)).unwrap();

        let res = engine.run().unwrap();
        assert_eq!(res.time(), SimTime::from_millis(13));

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                (SimTime::from_millis(3), a, "ping".to_string()),
                (SimTime::from_millis(13), b, "pong".to_string()),
            ],
            "{policy} with {workers} workers"
        );
    }
}

#[test]
fn short_cross_host_delays_are_deferred_to_window_end() {
    for (policy, workers, builder) in engines() {
        let log = Log::default();
        let mut engine = builder.min_time_jump(Duration::from_millis(10)).build().unwrap();
        let a = engine.add_host(HostConfig::new("a"));
        let b = engine.add_host(HostConfig::new("b"));

        let remote = label(&log, "remote");
        let local = label(&log, "local");
        let send = Task::named("send", move |ctx| {
            ctx.schedule(remote.clone(), b, Duration::from_millis(1));
            ctx.schedule_local(local.clone(), Duration::from_millis(1));
        });
        engine.schedule(send, a, Duration::ZERO).unwrap();
        engine.run().unwrap();

        let mut log = log.lock().unwrap().clone();
        log.sort();
        assert_eq!(
            log,
            vec![
                (SimTime::from_millis(1), a, "local".to_string()),
                (SimTime::from_millis(10), b, "remote".to_string()),
            ],
            "{policy} with {workers} workers"
        );
    }
}

#[test]
fn per_host_times_never_decrease() {
    for (policy, workers, builder) in engines() {
        let log = Log::default();
        let mut engine = builder
            .topology(UniformLatency(Duration::from_micros(50)))
            .max_time(SimTime::from_millis(20))
            .build()
            .unwrap();
        let hosts = (0..6)
            .map(|i| engine.add_host(HostConfig::new(format!("h{i}"))))
            .collect::<Vec<_>>();

        fn hop(log: Log, hosts: Arc<Vec<HostId>>) -> Task {
            Task::named("hop", move |ctx| {
                log.lock()
                    .unwrap()
                    .push((ctx.now(), ctx.host_id(), String::new()));
                let next = hosts[ctx.random::<u64>() as usize % hosts.len()];
                let delay = Duration::from_micros(50 + ctx.random::<u64>() % 200);
                ctx.schedule(hop(log.clone(), hosts.clone()), next, delay);
            })
        }

        let shared = Arc::new(hosts.clone());
        for host in &hosts {
            engine
                .schedule(hop(log.clone(), shared.clone()), *host, Duration::ZERO)
                .unwrap();
        }
        engine.run().unwrap();

        let log = log.lock().unwrap();
        assert!(!log.is_empty());
        for host in &hosts {
            let times = log
                .iter()
                .filter(|(_, h, _)| h == host)
                .map(|(t, _, _)| *t)
                .collect::<Vec<_>>();
            assert!(
                times.windows(2).all(|w| w[0] <= w[1]),
                "{policy} with {workers} workers"
            );
            assert!(times.iter().all(|t| *t <= SimTime::from_millis(20)));
        }
    }
}

#[test]
fn global_policy_serialises_execution() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let running = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicUsize::new(0));

    let mut engine = Builder::seeded(0)
        .workers(4)
        .policy(PolicyKind::GlobalSingle)
        .quiet()
        .build()
        .unwrap();
    let hosts = (0..4)
        .map(|i| engine.add_host(HostConfig::new(format!("h{i}"))))
        .collect::<Vec<_>>();

    let task = {
        let running = running.clone();
        let overlap = overlap.clone();
        Task::new(move |_| {
            if running.fetch_add(1, Ordering::SeqCst) > 0 {
                overlap.fetch_add(1, Ordering::SeqCst);
            }
            std::thread::yield_now();
            running.fetch_sub(1, Ordering::SeqCst);
        })
    };
    for i in 0..64 {
        engine
            .schedule(task.clone(), hosts[i % 4], Duration::from_nanos(i as u64 % 3))
            .unwrap();
    }

    let res = engine.run().unwrap();
    assert_eq!(res.profiler().unwrap().event_count, 64);
    assert_eq!(overlap.load(Ordering::SeqCst), 0);
}
