//! Acquisition loop behaviour on tokio's paused clock.
//!
//! Every test drives the engine with a scripted `MockProvider`, so cadence
//! and cancellation are checked on virtual time without any network.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use leadscout_common::{EngineStatus, LeadScoutError, LeadStatus, Mode};
use leadscout_engine::testing::{candidate, engine_with, engine_with_settings, wait_until, MemoryStore, MockProvider};
use leadscout_engine::{ActivityLevel, EngineError, EngineSettings};

fn count(engine: &leadscout_engine::AcquisitionEngine, level: ActivityLevel) -> usize {
    engine.activity().iter().filter(|e| e.level == level).count()
}

#[tokio::test(start_paused = true)]
async fn one_verified_lead_from_a_mixed_batch() {
    let provider = Arc::new(MockProvider::new().then_leads(vec![
        candidate("Ana Souza", "5511988887777", 96.0),
        candidate("Bruno Lima", "5521977776666", 60.0),
    ]));
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(provider.clone(), store.clone());

    engine.start("dentists", "Brazil", Mode::Quantum).unwrap();
    wait_until(Duration::from_secs(1), || store.save_count() >= 1).await;

    let leads = engine.leads(None);
    assert_eq!(leads.len(), 1);
    let ana = &leads[0];
    assert_eq!(ana.name, "Ana Souza");
    assert_eq!(ana.status, LeadStatus::New);
    assert_eq!(ana.phone_number, "5511988887777");
    assert_eq!(ana.niche, "dentists");
    assert_eq!(ana.country, "Brazil");
    assert!(!ana.id.is_nil());

    assert_eq!(count(&engine, ActivityLevel::Success), 1);
    assert_eq!(store.save_count(), 1);
    assert_eq!(store.stored(), leads);

    let criteria = provider.last_criteria().unwrap();
    assert_eq!(criteria.niche, "dentists");
    assert_eq!(criteria.mode, Mode::Quantum);

    engine.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn later_cycles_never_duplicate_a_phone() {
    let provider = Arc::new(
        MockProvider::new()
            .then_leads(vec![candidate("Ana Souza", "5511988887777", 96.0)])
            .then_leads(vec![
                candidate("Ana S.", "+55 (11) 98888-7777", 99.0),
                candidate("Carla Dias", "5531966665555", 88.0),
            ]),
    );
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(provider.clone(), store.clone());

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(10), || engine.snapshot().cycles >= 2).await;
    engine.stop().unwrap();

    let mut names: Vec<_> = engine.leads(None).into_iter().map(|l| l.name).collect();
    names.sort();
    assert_eq!(names, vec!["Ana Souza", "Carla Dias"]);

    let successes: Vec<_> = engine
        .activity()
        .into_iter()
        .filter(|e| e.level == ActivityLevel::Success)
        .map(|e| e.message)
        .collect();
    assert_eq!(successes, vec!["1 verified leads, 1 new", "2 verified leads, 1 new"]);
}

#[tokio::test(start_paused = true)]
async fn stop_during_a_call_discards_its_result() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(
        MockProvider::new()
            .gated(gate.clone())
            .then_leads(vec![candidate("Ana Souza", "5511988887777", 96.0)]),
    );
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(provider.clone(), store.clone());

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(1), || provider.calls() == 1).await;

    engine.stop().unwrap();
    assert_eq!(engine.status(), EngineStatus::Stopping);
    gate.add_permits(1);

    tokio::time::sleep(Duration::from_secs(60)).await;

    assert!(engine.leads(None).is_empty());
    assert_eq!(store.save_count(), 0);
    assert_eq!(provider.calls(), 1);
    assert_eq!(count(&engine, ActivityLevel::Success), 0);
    assert_eq!(engine.status(), EngineStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn failure_backs_off_longer_than_success() {
    for mode in Mode::ALL {
        let provider = Arc::new(
            MockProvider::new()
                .then_fail("upstream 503")
                .then_leads(vec![])
                .then_leads(vec![]),
        );
        let engine = engine_with(provider.clone(), Arc::new(MemoryStore::new()));

        engine.start("dentists", "Brazil", mode).unwrap();
        wait_until(Duration::from_secs(120), || provider.calls() >= 3).await;
        engine.stop().unwrap();

        let at = provider.call_instants();
        let after_failure = at[1] - at[0];
        let after_success = at[2] - at[1];

        assert!(
            after_failure >= mode.failure_backoff()
                && after_failure < mode.failure_backoff() + Duration::from_secs(1),
            "{mode}: retry after failure came after {after_failure:?}"
        );
        assert!(
            after_success >= mode.success_delay()
                && after_success < mode.success_delay() + Duration::from_secs(1),
            "{mode}: next cycle after success came after {after_success:?}"
        );
        assert!(after_failure > after_success);

        // Let the settle delay finish before the next mode's engine starts.
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

#[tokio::test(start_paused = true)]
async fn failed_call_merges_nothing_and_logs_an_error() {
    let provider = Arc::new(MockProvider::new().then_fail("connection reset"));
    let store = Arc::new(MemoryStore::new());
    let engine = engine_with(provider, store.clone());

    engine.start("dentists", "Brazil", Mode::Quantum).unwrap();
    wait_until(Duration::from_secs(1), || engine.snapshot().cycles >= 1).await;

    assert!(engine.leads(None).is_empty());
    assert_eq!(count(&engine, ActivityLevel::Error), 1);
    assert!(engine
        .snapshot()
        .last_error
        .unwrap()
        .contains("connection reset"));
    assert_eq!(store.save_count(), 0);
    assert_eq!(engine.status(), EngineStatus::Running);

    engine.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn empty_batch_is_a_success_with_a_warning() {
    let provider = Arc::new(MockProvider::new().then_leads(vec![candidate(
        "Ana Souza",
        "9999999999",
        99.0,
    )]));
    let engine = engine_with(provider.clone(), Arc::new(MemoryStore::new()));

    engine.start("dentists", "Brazil", Mode::Nano).unwrap();
    wait_until(Duration::from_secs(1), || engine.snapshot().cycles >= 1).await;

    assert!(engine.leads(None).is_empty());
    assert_eq!(count(&engine, ActivityLevel::Warning), 1);
    assert_eq!(count(&engine, ActivityLevel::Error), 0);

    // Next cycle follows the success cadence, not the backoff.
    tokio::time::sleep(Mode::Nano.success_delay() + Duration::from_millis(100)).await;
    assert_eq!(provider.calls(), 2);

    engine.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_revokes_the_pending_cycle_and_settles_to_idle() {
    let provider = Arc::new(MockProvider::new());
    let engine = engine_with(provider.clone(), Arc::new(MemoryStore::new()));

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(1), || engine.snapshot().cycles >= 1).await;

    engine.stop().unwrap();
    assert_eq!(engine.status(), EngineStatus::Stopping);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(engine.status(), EngineStatus::Idle);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.calls(), 1);

    let last = engine.activity().pop().unwrap();
    assert_eq!(last.message, "Operation finished");
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_are_rejected_in_the_wrong_state() {
    let engine = engine_with(Arc::new(MockProvider::new()), Arc::new(MemoryStore::new()));

    assert!(matches!(
        engine.start("   ", "Brazil", Mode::Quantum),
        Err(EngineError::Validation(LeadScoutError::EmptyNiche))
    ));
    assert_eq!(engine.status(), EngineStatus::Idle);
    assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));

    assert_eq!(engine.start("dentists", "Brazil", Mode::Quantum).unwrap(), 1);
    assert!(matches!(
        engine.start("lawyers", "Portugal", Mode::Quantum),
        Err(EngineError::NotIdle(EngineStatus::Running))
    ));

    engine.stop().unwrap();
    assert!(matches!(engine.stop(), Err(EngineError::NotRunning)));
    assert!(matches!(
        engine.start("dentists", "Brazil", Mode::Quantum),
        Err(EngineError::NotIdle(EngineStatus::Stopping))
    ));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(engine.start("dentists", "Brazil", Mode::Quantum).unwrap(), 2);
    engine.stop().unwrap();
}

#[tokio::test(start_paused = true)]
async fn result_from_a_previous_run_never_reaches_the_next() {
    let gate = Arc::new(Semaphore::new(0));
    let provider = Arc::new(
        MockProvider::new()
            .gated(gate.clone())
            .then_leads(vec![candidate("Ana Souza", "5511988887777", 96.0)])
            .then_leads(vec![candidate("Bruno Lima", "5521977776666", 91.0)]),
    );
    let engine = engine_with(provider.clone(), Arc::new(MemoryStore::new()));

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(1), || provider.calls() == 1).await;
    engine.stop().unwrap();
    wait_until(Duration::from_secs(2), || engine.status() == EngineStatus::Idle).await;

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(1), || provider.calls() == 2).await;

    // The first run's call is released first and must be dropped.
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(engine.leads(None).is_empty());

    gate.add_permits(1);
    wait_until(Duration::from_secs(1), || engine.snapshot().cycles >= 1).await;

    let names: Vec<_> = engine.leads(None).into_iter().map(|l| l.name).collect();
    assert_eq!(names, vec!["Bruno Lima"]);

    engine.stop().unwrap();
    gate.add_permits(10);
}

#[tokio::test(start_paused = true)]
async fn activity_log_keeps_only_the_newest_entries() {
    let settings = EngineSettings {
        activity_log_cap: 5,
        ..EngineSettings::default()
    };
    let engine = engine_with_settings(
        Arc::new(MockProvider::new()),
        Arc::new(MemoryStore::new()),
        settings,
    );

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(60), || engine.snapshot().cycles >= 10).await;
    engine.stop().unwrap();

    let activity = engine.activity();
    assert_eq!(activity.len(), 5);
    assert!(activity.windows(2).all(|w| w[0].seq < w[1].seq));
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_the_loop_running_and_retries_next_cycle() {
    let provider = Arc::new(
        MockProvider::new()
            .then_leads(vec![candidate("Ana Souza", "5511988887777", 96.0)])
            .then_leads(vec![]),
    );
    let store = Arc::new(MemoryStore::new());
    store.set_failing(true);
    let engine = engine_with(provider.clone(), store.clone());

    engine.start("dentists", "Brazil", Mode::Neural).unwrap();
    wait_until(Duration::from_secs(1), || engine.snapshot().last_error.is_some()).await;

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.status, EngineStatus::Running);
    assert_eq!(snapshot.lead_count, 1);
    assert!(snapshot.last_error.unwrap().contains("disk full"));
    assert_eq!(count(&engine, ActivityLevel::Error), 1);
    assert!(store.stored().is_empty());

    // The next cycle adds nothing new but still writes the unsaved lead.
    store.set_failing(false);
    wait_until(Duration::from_secs(60), || store.save_count() >= 1).await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(store.stored(), engine.leads(None));

    engine.stop().unwrap();
}
