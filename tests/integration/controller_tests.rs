//! Controller integration tests.
//!
//! Exercise the queue, worker and activation sequence together against
//! `MockRelays` and `RecordingSink`, with one time unit shrunk to 20 ms.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use retic::Controller;
use retic::app::events::{AuditLog, AuditOperation};
use retic::app::ports::Level;

use crate::mock_hw::{BrokenSink, MockRelays, RecordingSink, garden, rig, timing, units, wait_for};

// ── Start/Stop pairing ────────────────────────────────────────

#[test]
fn each_job_emits_one_start_then_one_stop() {
    let r = rig(garden());
    assert!(r.controller.enqueue("ZONE3", 2));
    assert!(wait_for(|| r.sink.stops() == 1));

    assert_eq!(
        r.sink.summary(),
        vec![
            ("ZONE3".to_string(), AuditOperation::Start),
            ("ZONE3".to_string(), AuditOperation::Stop),
        ]
    );
    let events = r.sink.events();
    assert_eq!(events[0].duration, 2, "Start carries the requested duration");
    assert!(events[1].timestamp >= events[0].timestamp);
}

#[test]
fn zone_without_master_touches_only_its_pin() {
    let r = rig(garden());
    r.controller.enqueue("zone3", 1);
    assert!(wait_for(|| r.sink.stops() == 1));
    assert_eq!(r.relays.sequence(), vec![(3, Level::High), (3, Level::Low)]);
}

// ── Master sequencing ─────────────────────────────────────────

#[test]
fn master_relay_sequence_and_delays() {
    let r = rig(garden());
    let start = Instant::now();
    r.controller.enqueue("ZONE1", 5);
    assert!(wait_for(|| r.sink.stops() == 1));
    let total = start.elapsed();

    assert_eq!(
        r.relays.sequence(),
        vec![(9, Level::High), (1, Level::High), (9, Level::Low), (1, Level::Low)]
    );

    let calls = r.relays.calls();
    let settle = calls[1].at - calls[0].at;
    let waited = calls[2].at - calls[1].at;
    let drain = calls[3].at - calls[2].at;
    assert!(settle >= units(1), "settle {settle:?}");
    assert!(waited >= units(5), "wait {waited:?}");
    assert!(drain >= units(3), "drain {drain:?}");
    // settle + duration + drain, not just the duration
    assert!(total >= units(9), "total {total:?}");

    let stop = &r.sink.events()[1];
    assert!(stop.duration >= 8, "measured {} units", stop.duration);
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reflects_the_running_job() {
    let r = rig(garden());
    let before = SystemTime::now();
    r.controller.enqueue("ZONE3", 10);
    assert!(wait_for(|| r.controller.current_status().zone() == "ZONE3"));

    let s = r.controller.current_status();
    assert_eq!(s.duration_secs(), 10);
    assert_eq!(s.queue_depth, 0);
    let started = s.active.as_ref().unwrap().start_time;
    assert!(started >= before);

    assert!(wait_for(|| r.sink.stops() == 1));
    assert!(wait_for(|| r.controller.current_status().is_idle()));
    let stop = &r.sink.events()[1];
    assert!((9..=12).contains(&stop.duration), "measured {}", stop.duration);
}

#[test]
fn queue_depth_counts_waiting_jobs() {
    let r = rig(garden());
    r.controller.enqueue("ZONE3", 50);
    assert!(wait_for(|| r.controller.current_status().zone() == "ZONE3"));
    r.controller.enqueue("ZONE1", 1);
    r.controller.enqueue("ZONE2", 1);
    assert_eq!(r.controller.current_status().queue_depth, 2);
    r.controller.cancel_all();
    assert_eq!(r.controller.current_status().queue_depth, 0);
}

// ── Ordering + mutual exclusion ───────────────────────────────

#[test]
fn jobs_run_fifo_and_never_overlap() {
    let r = rig(garden());
    let controller = Arc::new(r.controller);

    controller.enqueue("ZONE3", 3);
    assert!(wait_for(|| !controller.current_status().is_idle()));

    // Hammer enqueue from several threads while a job is active.
    let workers: Vec<_> = ["ZONE1", "ZONE2", "ZONE3"]
        .into_iter()
        .map(|zone| {
            let c = controller.clone();
            std::thread::spawn(move || {
                for _ in 0..2 {
                    assert!(c.enqueue(zone, 1));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    assert!(wait_for(|| r.sink.stops() == 7));
    assert!(wait_for(|| controller.current_status().is_idle()));

    // Start/Stop strictly alternate, each pair for the same zone.
    let summary = r.sink.summary();
    for pair in summary.chunks(2) {
        assert_eq!(pair[0].1, AuditOperation::Start);
        assert_eq!(pair[1].1, AuditOperation::Stop);
        assert_eq!(pair[0].0, pair[1].0);
    }
    assert_eq!(summary[0].0, "ZONE3", "first job runs first");

    // At most one zone pin high at any instant.
    let mut open = std::collections::BTreeSet::new();
    for (pin, level) in r.relays.sequence() {
        if pin == 9 {
            continue;
        }
        match level {
            Level::High => {
                assert!(open.is_empty(), "pin {pin} opened while {open:?} open");
                open.insert(pin);
            }
            Level::Low => {
                open.remove(&pin);
            }
        }
    }
    assert!(r.relays.open_pins().is_empty());
}

#[test]
fn sequential_enqueues_keep_their_order() {
    let r = rig(garden());
    for zone in ["ZONE2", "ZONE3", "ZONE1"] {
        r.controller.enqueue(zone, 1);
    }
    assert!(wait_for(|| r.sink.stops() == 3));
    let starts: Vec<String> = r
        .sink
        .summary()
        .into_iter()
        .filter(|(_, op)| *op == AuditOperation::Start)
        .map(|(z, _)| z)
        .collect();
    assert_eq!(starts, ["ZONE2", "ZONE3", "ZONE1"]);
}

// ── Cancellation ──────────────────────────────────────────────

#[test]
fn cancel_current_on_idle_is_a_no_op() {
    let r = rig(garden());
    let before = r.controller.current_status();
    r.controller.cancel_current();
    r.controller.cancel_current();
    std::thread::sleep(units(2));
    assert_eq!(r.controller.current_status(), before);
    assert!(r.sink.events().is_empty());
    assert!(r.relays.calls().is_empty());
}

#[test]
fn cancel_current_lets_the_queue_continue() {
    let r = rig(garden());
    r.controller.enqueue("ZONE3", 500);
    r.controller.enqueue("ZONE2", 1);
    assert!(wait_for(|| r.controller.current_status().zone() == "ZONE3"));

    let cancelled_at = Instant::now();
    r.controller.cancel_current();
    assert!(wait_for(|| r.sink.stops() == 2));
    assert!(cancelled_at.elapsed() < Duration::from_secs(2));

    let summary = r.sink.summary();
    assert_eq!(summary[1], ("ZONE3".to_string(), AuditOperation::Stop));
    assert_eq!(summary[3], ("ZONE2".to_string(), AuditOperation::Stop));
}

#[test]
fn cancel_all_drops_every_queued_job() {
    let r = rig(garden());
    r.controller.enqueue("ZONE3", 500);
    assert!(wait_for(|| r.controller.current_status().zone() == "ZONE3"));
    for zone in ["ZONE1", "ZONE2", "ZONE1"] {
        r.controller.enqueue(zone, 1);
    }

    r.controller.cancel_all();
    assert!(wait_for(|| r.sink.stops() == 1));
    assert!(wait_for(|| r.controller.current_status().is_idle()));
    std::thread::sleep(units(10));

    assert_eq!(
        r.sink.summary(),
        vec![
            ("ZONE3".to_string(), AuditOperation::Start),
            ("ZONE3".to_string(), AuditOperation::Stop),
        ]
    );
    assert_eq!(r.controller.current_status().queue_depth, 0);
    assert!(r.relays.open_pins().is_empty());
}

#[test]
fn unknown_zone_is_silently_dropped() {
    let r = rig(garden());
    assert!(!r.controller.enqueue("ZONE9", 10));
    assert!(!r.controller.enqueue("MASTER", 10), "masters are not zones");
    std::thread::sleep(units(3));

    let s = r.controller.current_status();
    assert!(s.is_idle());
    assert_eq!(s.queue_depth, 0);
    assert!(r.sink.events().is_empty());
}

// ── Failure isolation ─────────────────────────────────────────

#[test]
fn actuator_failure_still_closes_and_continues() {
    let r = rig(garden());
    r.relays.fail_pin(9);
    r.controller.enqueue("ZONE1", 1);
    r.controller.enqueue("ZONE3", 1);
    assert!(wait_for(|| r.sink.stops() == 2));

    let seq = r.relays.sequence();
    assert_eq!(
        &seq[..4],
        &[(9, Level::High), (1, Level::High), (9, Level::Low), (1, Level::Low)]
    );
    assert!(r.controller.is_running());
}

#[test]
fn failing_sink_does_not_stop_the_others() {
    let relays = MockRelays::new();
    let sink = RecordingSink::new();
    let audit = AuditLog::new().with_sink(BrokenSink).with_sink(sink.clone());
    let controller = Controller::start(garden(), relays.clone(), audit, timing()).unwrap();

    controller.enqueue("ZONE3", 1);
    assert!(wait_for(|| sink.stops() == 1));
    assert_eq!(sink.events().len(), 2);
    assert!(relays.open_pins().is_empty());
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn shutdown_closes_the_open_valve_and_is_idempotent() {
    let r = rig(garden());
    r.controller.enqueue("ZONE1", 500);
    r.controller.enqueue("ZONE2", 500);
    assert!(wait_for(|| r.relays.open_pins() == vec![1, 9]));

    r.controller.shutdown();
    assert!(!r.controller.is_running());
    assert!(r.relays.open_pins().is_empty());
    assert_eq!(r.sink.stops(), 1, "queued ZONE2 never ran");
    let calls_after_first = r.relays.calls().len();

    r.controller.shutdown();
    assert!(!r.controller.is_running());
    assert_eq!(r.relays.calls().len(), calls_after_first);
    assert_eq!(r.controller.current_status().queue_depth, 0);
    assert!(!r.controller.enqueue("ZONE1", 1));
}

#[test]
fn dropping_the_controller_closes_valves() {
    let r = rig(garden());
    r.controller.enqueue("ZONE3", 500);
    assert!(wait_for(|| r.relays.open_pins() == vec![3]));
    drop(r.controller);
    assert!(r.relays.open_pins().is_empty());
    assert_eq!(r.sink.stops(), 1);
}

// ── Lock-free status reads ────────────────────────────────────

#[test]
fn status_reads_stay_fast_during_activation() {
    let r = rig(garden());
    r.controller.enqueue("ZONE1", 20);
    assert!(wait_for(|| !r.controller.current_status().is_idle()));

    let start = Instant::now();
    for _ in 0..10_000 {
        let s = r.controller.current_status();
        assert!(s.zone().is_empty() || s.zone() == "ZONE1");
    }
    assert!(start.elapsed() < units(20));
    r.controller.cancel_all();
}
