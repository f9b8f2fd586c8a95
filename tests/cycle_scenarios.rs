// tests/cycle_scenarios.rs

use std::error::Error;

use runwatch::engine::{shutdown_channel, MAX_RUN_ATTEMPTS};
use runwatch::event::EventKind::*;
use runwatch::github::FetchError;
use runwatch::state::MonitorState;
use runwatch_test_utils::builders::{JobBuilder, RunBuilder, StepBuilder};
use runwatch_test_utils::{
    fake_cycle, init_tracing, mock_store, FakeRunSource, RecordingSink, SourceCall, STATE_PATH,
};

type TestResult = Result<(), Box<dyn Error>>;

fn persisted(fs: &runwatch::fs::mock::MockFileSystem) -> MonitorState {
    let raw = fs.contents(STATE_PATH).expect("state file written");
    serde_json::from_str(&raw).expect("state file parses")
}

#[tokio::test]
async fn run_is_followed_from_start_to_completion_and_pruned() -> TestResult {
    init_tracing();
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    // Cycle 1: run 101 in progress, job "build" in progress.
    source.push_listing(vec![RunBuilder::new(101).in_progress().build()]);
    source.set_jobs(101, vec![JobBuilder::new(1, "build").in_progress().build()]);

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(sink.kinds(), vec![WorkflowStarted, JobStarted]);
    assert_eq!(report.events_emitted, 2);
    assert!(state.watermark >= 101);
    assert!(state.is_in_flight(101));
    assert!(persisted(&fs).is_in_flight(101));

    // Cycle 2: same run, now concluded.
    sink.clear();
    source.push_listing(vec![RunBuilder::new(101).completed("success").build()]);
    source.set_jobs(101, vec![JobBuilder::new(1, "build").completed("success").build()]);

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(sink.kinds(), vec![WorkflowCompleted, JobCompleted]);
    assert_eq!(report.runs_pruned, 1);
    assert!(!state.is_in_flight(101));
    assert!(persisted(&fs).in_flight_runs.is_empty());

    // Cycle 3: nothing new; the pruned run is not revisited.
    sink.clear();
    source.clear_calls();
    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert!(sink.kinds().is_empty());
    assert_eq!(report.runs_diffed, 0);
    assert_eq!(source.calls(), vec![SourceCall::ListRuns]);
    Ok(())
}

#[tokio::test]
async fn already_finished_run_emits_started_and_completed_at_every_level() -> TestResult {
    init_tracing();
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![RunBuilder::new(7).completed("failure").build()]);
    source.set_jobs(
        7,
        vec![
            JobBuilder::new(70, "test")
                .step(StepBuilder::new(1, "checkout").completed("success").build())
                .step(StepBuilder::new(2, "cargo test").completed("failure").build())
                .completed("failure")
                .build(),
        ],
    );

    cycle.run_cycle(&mut state, &shutdown).await?;

    assert_eq!(
        sink.trace_for(7),
        vec![
            (WorkflowStarted, None, None),
            (WorkflowCompleted, None, None),
            (JobStarted, Some(70), None),
            (JobCompleted, Some(70), None),
            (StepStarted, Some(70), Some(1)),
            (StepCompleted, Some(70), Some(1)),
            (StepStarted, Some(70), Some(2)),
            (StepCompleted, Some(70), Some(2)),
        ]
    );
    assert!(state.in_flight_runs.is_empty());
    assert_eq!(state.watermark, 7);
    Ok(())
}

#[tokio::test]
async fn runs_are_processed_in_ascending_id_order() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    // Remote lists newest first.
    source.push_listing(vec![
        RunBuilder::new(30).in_progress().build(),
        RunBuilder::new(20).in_progress().build(),
        RunBuilder::new(10).in_progress().build(),
    ]);

    cycle.run_cycle(&mut state, &shutdown).await?;

    let order: Vec<_> = sink.events().iter().map(|e| e.run_id).collect();
    assert_eq!(order, vec![10, 20, 30]);
    assert_eq!(state.watermark, 30);
    Ok(())
}

#[tokio::test]
async fn one_failing_run_does_not_stop_the_others() -> TestResult {
    init_tracing();
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![
        RunBuilder::new(3).in_progress().build(),
        RunBuilder::new(2).in_progress().build(),
        RunBuilder::new(1).in_progress().build(),
    ]);
    source.fail_jobs(2, FetchError::Api("502 bad gateway".into()), 1);

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(report.runs_failed, 1);
    assert_eq!(report.runs_diffed, 2);
    assert!(sink.trace_for(2).is_empty());
    assert_eq!(state.watermark, 3);
    assert_eq!(state.retry_runs.get(&2), Some(&1));
    assert_eq!(persisted(&fs).retry_runs.get(&2), Some(&1));

    // Next cycle the failed run is retried even though the watermark passed it.
    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(report.runs_failed, 0);
    assert_eq!(sink.trace_for(2), vec![(WorkflowStarted, None, None)]);
    assert!(state.retry_runs.is_empty());
    assert!(state.is_in_flight(2));
    Ok(())
}

#[tokio::test]
async fn persistently_failing_run_is_eventually_dropped() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![RunBuilder::new(5).in_progress().build()]);
    source.fail_jobs(5, FetchError::Api("500".into()), MAX_RUN_ATTEMPTS as usize);

    for _ in 0..MAX_RUN_ATTEMPTS {
        cycle.run_cycle(&mut state, &shutdown).await?;
    }

    assert!(state.retry_runs.is_empty());
    assert!(!state.is_in_flight(5));
    assert!(sink.kinds().is_empty());

    // No longer eligible.
    source.clear_calls();
    cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(source.calls(), vec![SourceCall::ListRuns]);
    Ok(())
}

#[tokio::test]
async fn in_flight_run_off_the_listing_is_fetched_directly() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![RunBuilder::new(40).in_progress().build()]);
    cycle.run_cycle(&mut state, &shutdown).await?;
    assert!(state.is_in_flight(40));

    // Run 40 scrolls off the page and completes meanwhile.
    source.push_listing(vec![RunBuilder::new(41).in_progress().build()]);
    source.set_run(RunBuilder::new(40).completed("cancelled").build());
    source.clear_calls();
    sink.clear();

    cycle.run_cycle(&mut state, &shutdown).await?;

    assert_eq!(
        source.calls(),
        vec![
            SourceCall::ListRuns,
            SourceCall::GetRun(40),
            SourceCall::ListJobs(40),
            SourceCall::ListJobs(41),
        ]
    );
    assert_eq!(sink.trace_for(40), vec![(WorkflowCompleted, None, None)]);
    assert!(!state.is_in_flight(40));
    assert!(state.is_in_flight(41));
    Ok(())
}

#[tokio::test]
async fn sink_failure_leaves_snapshot_untouched() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![RunBuilder::new(9).in_progress().build()]);
    sink.fail_for_run(9);

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(report.runs_failed, 1);
    assert!(!state.is_in_flight(9));

    // Once the sink recovers the run is diffed from scratch.
    sink.recover_run(9);
    cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(sink.trace_for(9), vec![(WorkflowStarted, None, None)]);
    assert!(state.is_in_flight(9));
    Ok(())
}

#[tokio::test]
async fn listing_failure_aborts_the_cycle() {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing_error(FetchError::Api("connection reset".into()));

    let err = cycle.run_cycle(&mut state, &shutdown).await.unwrap_err();
    assert_eq!(err, FetchError::Api("connection reset".into()));
    assert_eq!(state, MonitorState::default());
    assert!(fs.contents(STATE_PATH).is_none());
}

#[tokio::test]
async fn rate_limit_on_a_run_stops_the_cycle_but_keeps_earlier_runs() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![
        RunBuilder::new(2).in_progress().build(),
        RunBuilder::new(1).in_progress().build(),
    ]);
    let limited = FetchError::RateLimited {
        retry_after: std::time::Duration::from_secs(30),
    };
    source.fail_jobs(2, limited.clone(), 1);

    let err = cycle.run_cycle(&mut state, &shutdown).await.unwrap_err();
    assert_eq!(err, limited);
    assert_eq!(state.watermark, 1);
    assert!(state.retry_runs.is_empty());
    assert_eq!(persisted(&fs).watermark, 1);

    // Run 2 is still above the watermark and gets picked up next time.
    cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(sink.trace_for(2), vec![(WorkflowStarted, None, None)]);
    Ok(())
}

#[tokio::test]
async fn persistence_failure_is_not_fatal() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    fs.set_fail_writes(true);
    source.push_listing(vec![RunBuilder::new(12).in_progress().build()]);

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert_eq!(report.persist_failures, 1);
    assert_eq!(report.runs_diffed, 1);
    assert!(state.is_in_flight(12));
    assert_eq!(state.watermark, 12);
    Ok(())
}

#[tokio::test]
async fn shutdown_between_runs_leaves_the_rest_for_later() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![
        RunBuilder::new(2).in_progress().build(),
        RunBuilder::new(1).in_progress().build(),
    ]);
    handle.trigger();

    let report = cycle.run_cycle(&mut state, &shutdown).await?;
    assert!(report.interrupted);
    assert_eq!(report.runs_diffed, 0);
    assert_eq!(state.watermark, 0);
    Ok(())
}

#[tokio::test]
async fn event_lines_use_the_pipe_format() -> TestResult {
    let source = FakeRunSource::new();
    let sink = RecordingSink::new();
    let (store, _fs) = mock_store();
    let mut cycle = fake_cycle(&source, &sink, store);
    let (_handle, shutdown) = shutdown_channel();
    let mut state = MonitorState::default();

    source.push_listing(vec![RunBuilder::new(101).in_progress().branch("feature/x").build()]);
    cycle.run_cycle(&mut state, &shutdown).await?;

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines[0],
        "2023-11-14T23:13:20+00:00 | WORKFLOW_STARTED | repo=octo/widgets | run=101 | job=- | step=- \
         | branch=feature/x | sha=0123456 | status=in_progress | msg=\"Workflow run started: CI\""
    );
    Ok(())
}
