//! End-to-end cycle tests through the public facade: decision to
//! execution to routed show records, against the in-memory store.

use impresario::{
    Destination, MemoryStore, NewEntity, PlaybookLibrary, ShowStore, Showrunner, ShowrunnerConfig,
    StoreObserver, Task, TaskDraft, TaskStatus, TaskStore, TelemetryStore, TroupeRegistry,
    WorkerStatus,
};
use impresario_models::ScriptedDriver;
use std::sync::Arc;

fn showrunner(store: &Arc<MemoryStore>, driver: Arc<ScriptedDriver>) -> Showrunner<ScriptedDriver> {
    let observer = Arc::new(StoreObserver::new(store.clone() as Arc<dyn TelemetryStore>));
    Showrunner::new(
        driver,
        store.clone() as Arc<dyn TaskStore>,
        store.clone() as Arc<dyn ShowStore>,
        Arc::new(TroupeRegistry::default_troupe()),
        PlaybookLibrary::builtin(),
        observer,
        ShowrunnerConfig::default(),
    )
}

#[tokio::test]
async fn test_design_gap_becomes_a_blueprint() {
    let store = Arc::new(MemoryStore::new());
    let mirelle = store
        .create_entity(NewEntity {
            name: "Mirelle".to_string(),
            description: "Silver-haired impresario of the night circus".to_string(),
        })
        .await
        .unwrap();

    let driver = Arc::new(ScriptedDriver::new(vec![
        r#"[{"worker": "design", "task_type": "design_blueprint", "description": "Design Mirelle's look for the opening number", "input_refs": {"entity": "Mirelle"}}]"#,
        r#"{"title": "Mirelle opening look", "visual_prompt": "Silver hair under a single spotlight, velvet curtain behind", "style": "art nouveau"}"#,
    ]));
    let runner = showrunner(&store, driver.clone());

    let outcome = runner.run_cycle().await.unwrap();

    assert_eq!(outcome.drained, 0);
    assert_eq!(outcome.decided, 1);
    assert_eq!(outcome.completed, 1);
    assert_eq!(outcome.rejected, 0);

    // The worker prompt saw the resolved entity, not just the name.
    let requests = driver.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[1].prompt.contains("Mirelle"));

    let blueprints = store.list_blueprints().await.unwrap();
    assert_eq!(blueprints.len(), 1);
    assert_eq!(blueprints[0].title, "Mirelle opening look");
    assert_eq!(blueprints[0].entity_id, Some(mirelle.id));

    let beats = store.list_heartbeats().await.unwrap();
    let design = beats.iter().find(|h| h.worker_name == "design").unwrap();
    assert_eq!(design.status, WorkerStatus::Idle);
}

#[tokio::test]
async fn test_unparseable_decision_leaves_no_trace() {
    let store = Arc::new(MemoryStore::new());
    let driver = Arc::new(ScriptedDriver::new(vec![
        "Honestly the troupe has earned a quiet week; let us plan in silence.",
    ]));
    let runner = showrunner(&store, driver.clone());

    let outcome = runner.run_cycle().await.unwrap();

    assert_eq!(outcome.decided, 0);
    assert_eq!(outcome.executed, 0);
    assert_eq!(outcome.completed, 0);
    assert!(store.list_pending().await.unwrap().is_empty());

    let counts = store.table_counts().await.unwrap();
    assert_eq!(counts.entities, 0);
    assert_eq!(counts.conflicts, 0);
    assert_eq!(counts.blueprints, 0);
    assert_eq!(counts.teasers, 0);

    // Only the decision call went out; no worker was consulted.
    assert_eq!(driver.request_count(), 1);
}

#[tokio::test]
async fn test_mid_cycle_failure_rejects_and_moves_on() {
    let store = Arc::new(MemoryStore::new());
    let fact_task = Task::from_draft(
        TaskDraft::new("lore", "record_fact", "Note the chandelier's provenance"),
        "worker-lore",
    );
    let teaser_task = Task::from_draft(
        TaskDraft::new("drama", "write_teaser", "Tease the chandelier reveal"),
        "worker-drama",
    );
    store
        .create_batch(vec![fact_task.clone(), teaser_task.clone()])
        .await
        .unwrap();

    let driver = Arc::new(ScriptedDriver::default());
    driver.push_failure("Upstream completion service melted down");
    driver.push_response(
        r#"{"content": "Tonight: the chandelier remembers everything.", "speaker": "Mirelle", "tone": "ominous"}"#,
    );
    driver.push_response("[]");
    let runner = showrunner(&store, driver);

    let outcome = runner.run_cycle().await.unwrap();

    assert_eq!(outcome.drained, 2);
    assert_eq!(outcome.completed, 1);
    assert_eq!(outcome.rejected, 1);
    assert_eq!(outcome.decided, 0);

    let rejected = store.get_task(&fact_task.id).await.unwrap().unwrap();
    assert_eq!(rejected.status, TaskStatus::Rejected);
    assert!(
        rejected
            .rejection_reason
            .as_deref()
            .unwrap()
            .contains("Upstream completion service melted down")
    );

    let teased = store.get_task(&teaser_task.id).await.unwrap().unwrap();
    assert_eq!(teased.status, TaskStatus::Completed);

    let beats = store.list_heartbeats().await.unwrap();
    let lore = beats.iter().find(|h| h.worker_name == "lore").unwrap();
    assert_eq!(lore.status, WorkerStatus::Error);
    let drama = beats.iter().find(|h| h.worker_name == "drama").unwrap();
    assert_eq!(drama.status, WorkerStatus::Idle);
}

#[tokio::test]
async fn test_feud_shaped_output_lands_in_conflicts() {
    let store = Arc::new(MemoryStore::new());
    let task = Task::from_draft(
        TaskDraft::new("drama", "stir_the_pot", "Get the rivals feuding again"),
        "worker-drama",
    );
    store.create_batch(vec![task.clone()]).await.unwrap();

    let driver = Arc::new(ScriptedDriver::new(vec![
        r#"{"side_a": "Mirelle", "side_b": "The Understudy", "intensity": 7}"#,
        "[]",
    ]));
    let runner = showrunner(&store, driver);

    let outcome = runner.run_cycle().await.unwrap();

    assert_eq!(outcome.drained, 1);
    assert_eq!(outcome.completed, 1);

    let conflicts = store.list_open_conflicts().await.unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].side_a, "Mirelle");
    assert_eq!(conflicts[0].side_b, "The Understudy");
    assert_eq!(conflicts[0].intensity, 7);

    let done = store.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(
        done.output.as_ref().map(|o| o.destination),
        Some(Destination::Conflicts)
    );
}
