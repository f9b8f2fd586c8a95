// tests/property_engine.rs

use std::time::Duration;

use proptest::prelude::*;
use runwatch::engine::{diff_run, shutdown_channel, Backoff, DiffContext};
use runwatch::event::EventKind;
use runwatch::github::{FetchError, Job, Step, WorkflowRun};
use runwatch::state::{MonitorState, SnapshotUpdate, StateStore};
use runwatch_test_utils::builders::{ts, RunBuilder};
use runwatch_test_utils::{fake_cycle, fixed_now, mock_store, FakeRunSource, RecordingSink};

fn status() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("queued".to_string()),
        Just("waiting".to_string()),
        Just("in_progress".to_string()),
        Just("completed".to_string()),
    ]
}

fn conclusion() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("success".to_string())),
        Just(Some("failure".to_string())),
        Just(Some("skipped".to_string())),
    ]
}

fn step(number: u32) -> impl Strategy<Value = Step> {
    (status(), conclusion(), any::<bool>()).prop_map(move |(status, conclusion, started)| Step {
        number,
        name: format!("step {number}"),
        status,
        conclusion,
        started_at: started.then(|| ts(5)),
    })
}

fn job(id: u64) -> impl Strategy<Value = Job> {
    (status(), conclusion(), any::<bool>(), 0..4u32)
        .prop_flat_map(move |(status, conclusion, started, n_steps)| {
            let steps: Vec<_> = (1..=n_steps).map(step).collect();
            (Just((status, conclusion, started)), steps)
        })
        .prop_map(move |((status, conclusion, started), steps)| Job {
            id,
            name: format!("job {id}"),
            status,
            conclusion,
            started_at: started.then(|| ts(1)),
                steps,
        })
}

fn fetch() -> impl Strategy<Value = (WorkflowRun, Vec<Job>)> {
    (status(), conclusion(), 0..4u64).prop_flat_map(|(status, conclusion, n_jobs)| {
        let run = WorkflowRun {
            id: 101,
            name: Some("CI".to_string()),
            head_branch: Some("main".to_string()),
            head_sha: Some("abcdef0123456789".to_string()),
            status,
            conclusion,
        };
        let jobs: Vec<_> = (1..=n_jobs).map(job).collect();
        (Just(run), jobs)
    })
}

fn ctx() -> DiffContext<'static> {
    DiffContext {
        repo: "octo/widgets",
        now: fixed_now(),
    }
}

proptest! {
    #[test]
    fn diff_is_a_pure_function((before_run, before_jobs) in fetch(), (run, jobs) in fetch()) {
        let previous = match diff_run(None, &before_run, &before_jobs, &ctx()).update {
            SnapshotUpdate::Upsert(snapshot) => Some(snapshot),
            SnapshotUpdate::Prune(_) => None,
        };

        let first = diff_run(previous.as_ref(), &run, &jobs, &ctx());
        let second = diff_run(previous.as_ref(), &run, &jobs, &ctx());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn rediffing_an_unchanged_run_emits_nothing((run, jobs) in fetch()) {
        let first = diff_run(None, &run, &jobs, &ctx());
        if let SnapshotUpdate::Upsert(snapshot) = first.update {
            let again = diff_run(Some(&snapshot), &run, &jobs, &ctx());
            prop_assert!(again.events.is_empty(), "unexpected events: {:?}", again.events);
            prop_assert_eq!(again.update, SnapshotUpdate::Upsert(snapshot));
        }
    }

    #[test]
    fn first_sight_of_finished_entities_reports_both_edges((run, jobs) in fetch()) {
        let diff = diff_run(None, &run, &jobs, &ctx());
        let has = |kind: EventKind, job: Option<u64>, step: Option<u32>| {
            diff.events
                .iter()
                .any(|e| e.kind == kind && e.job_id == job && e.step_number == step)
        };

        prop_assert!(has(EventKind::WorkflowStarted, None, None));
        if run.conclusion.is_some() {
            prop_assert!(has(EventKind::WorkflowCompleted, None, None));
        }
        for job in &jobs {
            if job.conclusion.is_some() {
                prop_assert!(has(EventKind::JobStarted, Some(job.id), None));
                prop_assert!(has(EventKind::JobCompleted, Some(job.id), None));
            }
            for step in &job.steps {
                if step.conclusion.is_some() {
                    prop_assert!(has(EventKind::StepStarted, Some(job.id), Some(step.number)));
                    prop_assert!(has(EventKind::StepCompleted, Some(job.id), Some(step.number)));
                }
            }
        }
    }

    #[test]
    fn fully_finished_runs_are_pruned((run, jobs) in fetch()) {
        let diff = diff_run(None, &run, &jobs, &ctx());
        let finished = run.conclusion.is_some() && jobs.iter().all(|j| j.conclusion.is_some());
        prop_assert_eq!(matches!(diff.update, SnapshotUpdate::Prune(101)), finished);
    }

    #[test]
    fn backoff_doubles_to_ceiling_and_resets(
        floor_ms in 1u64..1_000,
        factor in 1u64..64,
        failures in 1usize..20,
    ) {
        let floor = Duration::from_millis(floor_ms);
        let ceiling = Duration::from_millis(floor_ms * factor);
        let mut backoff = Backoff::new(floor, ceiling);

        let mut expected = floor;
        for _ in 0..failures {
            prop_assert_eq!(backoff.next_delay(), expected);
            expected = (expected * 2).min(ceiling);
        }

        backoff.reset();
        prop_assert_eq!(backoff.next_delay(), floor);
    }

    #[test]
    fn persisted_watermark_never_decreases(
        listings in proptest::collection::vec(
            proptest::collection::vec((1u64..200, any::<bool>(), any::<bool>()), 0..6),
            1..6,
        )
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let source = FakeRunSource::new();
            let sink = RecordingSink::new();
            let (store, fs) = mock_store();
            let path = store.path().to_path_buf();
            let mut cycle = fake_cycle(&source, &sink, store);
            let (_handle, shutdown) = shutdown_channel();
            let mut state = MonitorState::default();
            let mut last_persisted = 0;

            for listing in &listings {
                let mut runs = Vec::new();
                for &(id, finished, fails) in listing {
                    let run = if finished {
                        RunBuilder::new(id).completed("success").build()
                    } else {
                        RunBuilder::new(id).in_progress().build()
                    };
                    if fails {
                        source.fail_jobs(id, FetchError::Api("flaky".into()), 1);
                    }
                    runs.push(run);
                }
                source.push_listing(runs);

                let before = state.watermark;
                let _ = cycle.run_cycle(&mut state, &shutdown).await;
                assert!(state.watermark >= before);

                let reloaded = StateStore::new(&path, std::sync::Arc::new(fs.clone())).load();
                assert!(reloaded.watermark >= last_persisted);
                last_persisted = reloaded.watermark;
            }
        });
    }
}
