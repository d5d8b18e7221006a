use super::{
    context::{EngineContext, Window},
    HostContext, Violation,
};
use crate::{event::Event, logger, policy::WorkerId, sync};
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::atomic::Ordering,
};
use tracing::{error, trace};

///
/// The main loop of a worker thread.
///
/// Each iteration waits for the coordinator to release a round, drains
/// the worker's domain up to the window end and reports back. A panic
/// inside a round aborts the process, since peers would otherwise wait
/// at the barrier forever.
///
pub(crate) fn work(ctx: &EngineContext<'_>, worker: WorkerId) {
    loop {
        ctx.barrier.await_release();
        if ctx.is_shutdown() {
            break;
        }

        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| run_round(ctx, worker))) {
            error!(worker, "worker panicked: {}", panic_message(payload.as_ref()));
            std::process::abort();
        }

        ctx.barrier.report_drained();
    }
    trace!(worker, "worker exited");
}

///
/// Pops and executes events of the worker's domain until nothing below
/// the window end is left.
///
/// A stop request never cuts a window short. The window contents are
/// fixed when it is released, so every policy executes the same events.
///
pub(crate) fn run_round(ctx: &EngineContext<'_>, worker: WorkerId) {
    let window = ctx.window();
    logger::set_time(window.start);

    loop {
        let _section = ctx.policy.serial_section();
        let Some(event) = ctx.policy.pop(worker, window.end) else {
            break;
        };
        execute(ctx, event, window);
    }
}

fn execute(ctx: &EngineContext<'_>, mut event: Event, window: Window) {
    let time = event.time();
    if time < window.start {
        panic!(
            "{}",
            Violation::BeforeWindow {
                time,
                start: window.start
            }
        );
    }
    if time >= window.end {
        panic!(
            "{}",
            Violation::AfterWindow {
                time,
                end: window.end
            }
        );
    }

    let Some(host) = ctx.hosts.get(event.host().index()) else {
        panic!("{}", Violation::UnknownHost(event.host()));
    };
    let mut host = sync::lock(host);

    if let Err(watermark) = host.advance_watermark(time) {
        panic!(
            "{}",
            Violation::BelowWatermark {
                host: host.id(),
                time,
                watermark,
            }
        );
    }

    host.cpu.update_time(time);
    if host.cpu.is_blocked() {
        let deferred = time.saturating_add(host.cpu.delay());
        trace!(host = %host.id(), task = event.task().name(), %deferred, "cpu blocked, deferring");

        drop(host);
        event.set_time(deferred);
        ctx.policy.push(event);
        ctx.rescheduled.fetch_add(1, Ordering::SeqCst);
        return;
    }

    let _scope = logger::enter_host(time, host.shared_name());
    trace!(task = event.task().name(), seq = event.sequence(), "executing");

    event.execute(&mut HostContext::new(ctx, &mut host, time));

    host.executed += 1;
    ctx.executed.fetch_add(1, Ordering::SeqCst);
    ctx.observe(time);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event::Task,
        host::{Host, HostConfig, HostId},
        policy::{PolicyKind, SchedulerPolicy},
        time::SimTime,
    };
    use std::sync::Mutex;

    fn setup() -> (SchedulerPolicy, Vec<Mutex<Host>>) {
        let mut policy = SchedulerPolicy::new(PolicyKind::PerHostSingle, 1).unwrap();
        policy.add_host(HostId::new(0));
        let hosts = vec![Mutex::new(Host::new(HostId::new(0), HostConfig::new("a"), 0))];
        (policy, hosts)
    }

    fn event(host: u32, time: u64) -> Event {
        Event::new(
            Task::new(|_| {}),
            HostId::new(host),
            SimTime::from_nanos(time),
            0,
        )
    }

    fn window(start: u64, end: u64) -> Window {
        Window {
            start: SimTime::from_nanos(start),
            end: SimTime::from_nanos(end),
        }
    }

    #[test]
    fn executes_events_inside_the_window() {
        let (policy, hosts) = setup();
        let ctx = EngineContext::new(&policy, &hosts, None, SimTime::ZERO);

        execute(&ctx, event(0, 10), window(10, 20));
        execute(&ctx, event(0, 12), window(10, 20));

        assert_eq!(ctx.executed.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.latest(), SimTime::from_nanos(12));
        assert_eq!(sync::lock(&hosts[0]).watermark(), SimTime::from_nanos(12));
    }

    #[test]
    #[should_panic(expected = "event at 5ns popped before window start 10ns")]
    fn event_before_window_start() {
        let (policy, hosts) = setup();
        let ctx = EngineContext::new(&policy, &hosts, None, SimTime::ZERO);
        execute(&ctx, event(0, 5), window(10, 20));
    }

    #[test]
    #[should_panic(expected = "event at 20ns popped at or after window end 20ns")]
    fn event_at_window_end() {
        let (policy, hosts) = setup();
        let ctx = EngineContext::new(&policy, &hosts, None, SimTime::ZERO);
        execute(&ctx, event(0, 20), window(10, 20));
    }

    #[test]
    #[should_panic(expected = "event at 12ns lies before the watermark 15ns of host#0")]
    fn event_below_host_watermark() {
        let (policy, hosts) = setup();
        sync::lock(&hosts[0])
            .advance_watermark(SimTime::from_nanos(15))
            .unwrap();

        let ctx = EngineContext::new(&policy, &hosts, None, SimTime::ZERO);
        execute(&ctx, event(0, 12), window(10, 20));
    }

    #[test]
    #[should_panic(expected = "event for unregistered host host#3")]
    fn event_for_unknown_host() {
        let (policy, hosts) = setup();
        let ctx = EngineContext::new(&policy, &hosts, None, SimTime::ZERO);
        execute(&ctx, event(3, 12), window(10, 20));
    }
}
