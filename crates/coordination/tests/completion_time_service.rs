//! Completion Time Service Integration Tests
//!
//! Drives the service through its public handles only:
//! - writer registration (sequential and concurrent)
//! - local initiated/completed bookkeeping, including repeated start times
//! - peer completion times
//! - shutdown and fail-fast behaviour after a protocol violation

use cadence_coordination::{
    CompletionTimeConfig, CompletionTimeError, CompletionTimeService, CompletionTimeWriter,
    GlobalCompletionTimeReader,
};
use cadence_core::Time;
use cadence_sync::ErrorReporter;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = env_logger::try_init();
}

fn ms(millis: u64) -> Time {
    Time::from_milli(millis)
}

fn fast_config() -> CompletionTimeConfig {
    CompletionTimeConfig {
        poll_interval: Duration::from_millis(1),
        ..Default::default()
    }
}

fn start(peers: &[&str]) -> (CompletionTimeService, Arc<ErrorReporter>) {
    init_logging();
    let reporter = ErrorReporter::new();
    let service = CompletionTimeService::start(
        peers.iter().map(|peer| peer.to_string()),
        Arc::clone(&reporter),
        fast_config(),
    )
    .unwrap();
    (service, reporter)
}

#[test]
fn test_three_writers_converge_and_outstanding_holds_gct_back() {
    let (service, reporter) = start(&[]);
    let a = service.register_writer().unwrap();
    let b = service.register_writer().unwrap();
    let c = service.register_writer().unwrap();

    for writer in [&a, &b, &c] {
        writer.submit_initiated(ms(10)).unwrap();
        writer.submit_completed(ms(10)).unwrap();
        writer.submit_initiated(ms(20)).unwrap();
        writer.submit_completed(ms(20)).unwrap();
    }
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(20)));
    assert_eq!(service.global_completion_time(), Some(ms(20)));

    // A has 30 outstanding, B and C have nothing outstanding
    a.submit_initiated(ms(30)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(20)));

    a.submit_completed(ms(30)).unwrap();
    b.submit_initiated(ms(40)).unwrap();
    b.submit_completed(ms(40)).unwrap();
    c.submit_initiated(ms(35)).unwrap();
    c.submit_completed(ms(35)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(30)));

    service.shutdown().unwrap();
    assert!(service.is_shutdown_complete());
    assert!(!reporter.error_encountered());
}

#[test]
fn test_gct_never_passes_an_outstanding_initiated_time() {
    let (service, _reporter) = start(&[]);
    let writer = service.register_writer().unwrap();

    let times: Vec<Time> = (1..=50).map(|i| ms(i * 10)).collect();
    for time in &times {
        writer.submit_initiated(*time).unwrap();
    }
    // Complete out of order; the earliest stays open the longest
    for time in times.iter().rev() {
        let gct = service.wait_global_completion_time().unwrap();
        assert!(gct < Some(times[0]), "GCT {gct:?} passed outstanding 10ms");
        if *time != times[0] {
            writer.submit_completed(*time).unwrap();
        }
    }

    writer.submit_completed(times[0]).unwrap();
    let gct = service.wait_global_completion_time().unwrap();
    assert!(gct >= Some(ms(500)));
    service.shutdown().unwrap();
}

#[test]
fn test_repeated_start_time_after_completion_is_accepted() {
    let (service, reporter) = start(&[]);
    let writer = service.register_writer().unwrap();

    writer.submit_initiated(ms(10)).unwrap();
    writer.submit_completed(ms(10)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(10)));

    // Same start time again once the first copy finished
    writer.submit_initiated(ms(10)).unwrap();
    assert_eq!(
        service.wait_global_completion_time().unwrap(),
        ms(10).step_back()
    );

    writer.submit_completed(ms(10)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(10)));

    service.shutdown().unwrap();
    assert!(!reporter.error_encountered());
}

#[test]
fn test_concurrent_registration_yields_distinct_sequential_ids() {
    let (service, _reporter) = start(&[]);
    let service = Arc::new(service);
    let n = 16;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || service.register_writer().unwrap().id())
        })
        .collect();
    let ids: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let unique: HashSet<u32> = ids.iter().copied().collect();
    assert_eq!(unique.len(), n);
    assert_eq!(unique, (0..n as u32).collect());
    assert_eq!(service.writers().len(), n);

    service.shutdown().unwrap();
}

#[test]
fn test_gct_unknown_until_every_writer_and_peer_reports() {
    let (service, _reporter) = start(&["peer-1"]);
    assert_eq!(service.wait_global_completion_time().unwrap(), None);

    let writer = service.register_writer().unwrap();
    writer.submit_initiated(ms(10)).unwrap();
    writer.submit_completed(ms(10)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), None);

    service.submit_peer_completion_time("peer-1", ms(5)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(5)));

    service.submit_peer_completion_time("peer-1", ms(15)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(10)));

    service.shutdown().unwrap();
}

#[test]
fn test_peer_regression_is_rejected() {
    let (service, reporter) = start(&["peer-1"]);
    service.submit_peer_completion_time("peer-1", ms(30)).unwrap();
    assert_eq!(service.wait_global_completion_time().unwrap(), Some(ms(30)));

    service.submit_peer_completion_time("peer-1", ms(20)).unwrap();
    let result = service.wait_global_completion_time();

    assert!(matches!(result, Err(CompletionTimeError::Reported(msg)) if msg.contains("regressed")));
    assert!(reporter.error_encountered());
    // The regression never reached the published value
    assert_eq!(service.global_completion_time(), Some(ms(30)));
}

#[test]
fn test_shutdown_is_idempotent() {
    let (service, _reporter) = start(&[]);
    let writer = service.register_writer().unwrap();
    writer.submit_initiated(ms(1)).unwrap();
    writer.submit_completed(ms(1)).unwrap();

    service.shutdown().unwrap();

    let started = Instant::now();
    service.shutdown().unwrap();
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[test]
fn test_submit_initiated_rejected_after_shutdown() {
    let (service, _reporter) = start(&[]);
    let writer = service.register_writer().unwrap();
    service.shutdown().unwrap();

    assert_eq!(
        writer.submit_initiated(ms(1)),
        Err(CompletionTimeError::ShuttingDown)
    );
}

#[test]
fn test_untracked_completion_fails_fast() {
    let (service, reporter) = start(&[]);
    let writer = service.register_writer().unwrap();
    writer.submit_completed(ms(10)).unwrap();

    let started = Instant::now();
    let result = service.register_writer();

    assert!(matches!(result, Err(CompletionTimeError::Reported(msg)) if msg.contains("no outstanding")));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(reporter.errors().len(), 1);
    assert_eq!(reporter.errors()[0].source, "completion-time-service");

    // Thread is gone, so the drain can never be confirmed
    assert!(matches!(
        service.shutdown(),
        Err(CompletionTimeError::Reported(_) | CompletionTimeError::ChannelClosed)
    ));
}

#[test]
fn test_future_observes_events_enqueued_before_it() {
    let (service, _reporter) = start(&[]);
    let writer = service.register_writer().unwrap();
    writer.submit_initiated(ms(100)).unwrap();
    writer.submit_completed(ms(100)).unwrap();

    let pending = service.global_completion_time_future().unwrap();
    writer.submit_initiated(ms(200)).unwrap();

    let gct = pending
        .wait(cadence_sync::PollSchedule::default(), None)
        .unwrap();
    assert_eq!(gct, Some(ms(100)));
    service.shutdown().unwrap();
}
