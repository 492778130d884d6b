//! Round-trip tests against a live PostgreSQL database.
//!
//! Run with:
//! `DATABASE_URL=postgres://... cargo test -p impresario_database -- --ignored`

use impresario_core::{
    ConflictStatus, Destination, Heartbeat, NewConflict, NewEntity, OutputRef, Task, TaskDraft,
    TaskStatus, WorkerStatus,
};
use impresario_database::PgStore;
use impresario_interface::{ShowStore, TaskStore, TelemetryStore};

fn store() -> PgStore {
    dotenvy::dotenv().ok();
    PgStore::connect().expect("DATABASE_URL must point at a reachable PostgreSQL")
}

fn marker() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_task_lifecycle_round_trip() {
    let store = store();
    store.run_migrations().await.expect("migrations");

    let task = Task::from_draft(
        TaskDraft::new("drama", "write_teaser", "Tease the premiere"),
        "worker-drama",
    );
    let id = task.id.clone();
    let created = store.create_batch(vec![task]).await.expect("create batch");
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].status, TaskStatus::Assigned);

    let pending = store.list_pending().await.expect("list pending");
    assert!(pending.iter().any(|t| t.id == id));

    store.mark_in_progress(&id).await.expect("in progress");
    let completed = store
        .mark_completed(&id, OutputRef::new(Destination::Teasers, Some(1)))
        .await
        .expect("completed");
    assert_eq!(completed.status, TaskStatus::Completed);
    let output = completed.output.expect("output ref");
    assert_eq!(output.destination, Destination::Teasers);

    // Terminal states refuse further transitions.
    let err = store.mark_in_progress(&id).await.expect_err("terminal");
    assert!(format!("{err}").contains("Invalid status transition"));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_entity_fuzzy_lookup_round_trip() {
    let store = store();
    store.run_migrations().await.expect("migrations");

    let marker = marker();
    let entity = store
        .create_entity(NewEntity {
            name: format!("Velvet Mirage {marker}"),
            description: "Hologram diva".to_string(),
        })
        .await
        .expect("create entity");

    // ILIKE match must ignore case.
    let found = store
        .find_entity_fuzzy(&marker.to_uppercase())
        .await
        .expect("fuzzy query")
        .expect("fuzzy match");
    assert_eq!(found.id, entity.id);

    let updated = store
        .update_entity_description(entity.id, "Rebooted diva")
        .await
        .expect("update description");
    assert_eq!(updated.description, "Rebooted diva");
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_conflict_escalation_round_trip() {
    let store = store();
    store.run_migrations().await.expect("migrations");

    let conflict = store
        .create_conflict(NewConflict {
            title: format!("Feud {}", marker()),
            side_a: "Mirage".to_string(),
            side_b: "Nova".to_string(),
            intensity: 5,
        })
        .await
        .expect("create conflict");
    assert_eq!(conflict.status, ConflictStatus::Open);

    let escalated = store
        .escalate_conflict(conflict.id, None)
        .await
        .expect("escalate");
    assert_eq!(escalated.intensity, 6);
    assert_eq!(escalated.status, ConflictStatus::Escalated);

    let resolved = store
        .resolve_conflict(conflict.id, "Duet at the finale")
        .await
        .expect("resolve");
    assert_eq!(resolved.status, ConflictStatus::Resolved);
    assert_eq!(resolved.resolution.as_deref(), Some("Duet at the finale"));

    let open = store.list_open_conflicts().await.expect("open conflicts");
    assert!(open.iter().all(|c| c.id != conflict.id));
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL
async fn test_heartbeat_upsert_replaces_detail() {
    let store = store();
    store.run_migrations().await.expect("migrations");

    let worker_id = format!("worker-test-{}", marker());
    store
        .upsert_heartbeat(Heartbeat::now(
            &worker_id,
            "test",
            WorkerStatus::Error,
            Some("boom".to_string()),
        ))
        .await
        .expect("first upsert");
    store
        .upsert_heartbeat(Heartbeat::now(&worker_id, "test", WorkerStatus::Idle, None))
        .await
        .expect("second upsert");

    let beats = store.list_heartbeats().await.expect("list heartbeats");
    let beat = beats
        .iter()
        .find(|b| b.worker_id == worker_id)
        .expect("upserted row");
    assert_eq!(beat.status, WorkerStatus::Idle);
    assert!(beat.detail.is_none(), "stale detail must be cleared");
}
