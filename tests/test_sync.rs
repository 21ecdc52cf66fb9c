//! Integration tests for mirroring workspace mutations to a remote backend.
//!
//! Tests cover:
//! - Sync status with no remote, a working remote and an unreachable one
//! - Edits after a failed insert, deletes that never reach the remote
//! - Bulk reassignment and deletion with partial failures
//! - Pulling remote rows over local ones

mod common;

use common::*;
use serde_json::json;
use sitetrack::sync::RemoteStore;
use time::macros::date;

#[tokio::test]
async fn test_without_remote_everything_is_local_only() -> anyhow::Result<()> {
    let (mut workspace, _temp_dir) = create_test_workspace(None).await;
    let phase = workspace.add_phase(make_new_phase("Foundation", TEST_BROWN)).await?.value;
    assert_eq!(phase.sync_status, SyncStatus::LocalOnly);

    let unsynced = workspace.unsynced().await?;
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].kind, EntityKind::Phase);
    assert_eq!(unsynced[0].status, SyncStatus::LocalOnly);

    assert!(workspace.pull().await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_mutations_are_mirrored() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;

    let phase = workspace.add_phase(make_new_phase("Foundation", TEST_BROWN)).await?.value;
    let applied = workspace
        .add_milestone(make_new_milestone("Pour slab", date!(2024 - 03 - 01), date!(2024 - 03 - 02), Some(phase.id)))
        .await?;
    let milestone = applied.value;
    assert_eq!(milestone.sync_status, SyncStatus::Synced);
    assert_eq!(applied.snapshot.milestones.len(), 1);

    let rows = remote.rows("milestones").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["start_date"], "2024-03-01");
    assert_eq!(rows[0]["phase_id"], phase.id);
    assert_eq!(remote.rows("phases").await[0]["color"], "#8b4513");

    workspace.set_milestone_completed(milestone.id, true).await?;
    assert_eq!(remote.rows("milestones").await[0]["completed"], true);

    let deleted = workspace.delete_milestone(milestone.id).await?;
    assert_eq!(deleted.value, SyncStatus::Synced);
    assert!(remote.rows("milestones").await.is_empty());
    assert!(workspace.unsynced().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_remote_write_keeps_local_change() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    remote.set_offline(true);
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;

    let applied = workspace
        .add_note(NewNote {
            title: "Delivery".to_string(),
            body: "Trusses arrive Monday".to_string(),
        })
        .await?;
    assert_eq!(applied.value.sync_status, SyncStatus::Failed);
    assert_eq!(applied.snapshot.notes.len(), 1);
    assert_eq!(applied.snapshot.notes[0].sync_status, SyncStatus::Failed);

    // Coming back online does not reconcile on its own.
    remote.set_offline(false);
    assert!(remote.rows("notes").await.is_empty());
    let unsynced = workspace.unsynced().await?;
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].kind, EntityKind::Note);
    assert_eq!(unsynced[0].status, SyncStatus::Failed);

    Ok(())
}

#[tokio::test]
async fn test_edit_after_failed_insert_pushes_whole_row() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    remote.set_offline(true);
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;

    let milestone = workspace
        .add_milestone(make_new_milestone("Pour slab", date!(2024 - 03 - 01), date!(2024 - 03 - 02), None))
        .await?
        .value;
    assert_eq!(milestone.sync_status, SyncStatus::Failed);

    remote.set_offline(false);
    let completed = workspace.set_milestone_completed(milestone.id, true).await?.value;
    assert_eq!(completed.sync_status, SyncStatus::Synced);

    let rows = remote.rows("milestones").await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["title"], "Pour slab");
    assert_eq!(rows[0]["completed"], true);
    assert!(workspace.unsynced().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_edit_of_row_missing_remotely_is_failed() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;
    let phase = workspace.add_phase(make_new_phase("Foundation", TEST_BROWN)).await?.value;
    assert_eq!(phase.sync_status, SyncStatus::Synced);

    // Another client removed the row behind our back.
    remote.delete("phases", phase.id).await?;
    let update = PhaseUpdate {
        name: Some("Foundations".to_string()),
        color: None,
    };
    let renamed = workspace.update_phase(phase.id, update).await?.value;
    assert_eq!(renamed.sync_status, SyncStatus::Failed);
    assert!(remote.rows("phases").await.is_empty());

    // The next edit repairs the remote with the whole row.
    let update = PhaseUpdate {
        name: Some("Foundation works".to_string()),
        color: None,
    };
    let renamed = workspace.update_phase(phase.id, update).await?.value;
    assert_eq!(renamed.sync_status, SyncStatus::Synced);
    assert_eq!(remote.rows("phases").await[0]["name"], "Foundation works");

    Ok(())
}

#[tokio::test]
async fn test_failed_remote_delete_is_listed() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;
    let milestone = workspace
        .add_milestone(make_new_milestone("Pour slab", date!(2024 - 03 - 01), date!(2024 - 03 - 02), None))
        .await?
        .value;

    remote.set_offline(true);
    let deleted = workspace.delete_milestone(milestone.id).await?;
    assert_eq!(deleted.value, SyncStatus::Failed);
    assert!(deleted.snapshot.milestones.is_empty());
    assert_eq!(remote.rows("milestones").await.len(), 1);

    let unsynced = workspace.unsynced().await?;
    assert_eq!(unsynced.len(), 1);
    assert_eq!(unsynced[0].kind, EntityKind::Milestone);
    assert_eq!(unsynced[0].id, milestone.id);
    assert_eq!(unsynced[0].status, SyncStatus::Failed);
    assert!(unsynced[0].deleted);

    // Pulling brings the remote row back and settles the difference.
    remote.set_offline(false);
    let snapshot = workspace.pull().await?.snapshot;
    assert!(snapshot.milestone(milestone.id).is_some());
    assert!(workspace.unsynced().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_snapshots_are_immutable() -> anyhow::Result<()> {
    let (mut workspace, _temp_dir) = create_test_workspace(None).await;
    let before = workspace.snapshot();
    let after = workspace.add_phase(make_new_phase("Roofing", TEST_RED)).await?.snapshot;

    assert!(before.phases.is_empty());
    assert_eq!(after.phases.len(), 1);
    assert_eq!(workspace.snapshot().phases.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_bulk_reassign_reports_per_milestone() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;
    let framing = workspace.add_phase(make_new_phase("Framing", TEST_BLUE)).await?.value;

    let mut ids = Vec::new();
    for (i, title) in ["Walls", "Joists", "Trusses"].into_iter().enumerate() {
        let start = date!(2024 - 05 - 01) + time::Duration::days(i as i64 * 7);
        let milestone = workspace.add_milestone(make_new_milestone(title, start, start, None)).await?.value;
        ids.push(milestone.id);
    }
    remote.fail_id(ids[1]).await;
    ids.push(9999);

    let applied = workspace.reassign_phase(&ids, Some(framing.id)).await?;
    let outcome = applied.value;
    assert_eq!(outcome.applied.len(), 3);
    assert_eq!(outcome.remote_failures().collect::<Vec<_>>(), vec![ids[1]]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].id, 9999);

    // Local writes all landed, including the one the remote refused.
    assert!(applied.snapshot.milestones.iter().all(|m| m.phase_id == Some(framing.id)));
    let failed = applied.snapshot.milestone(ids[1]).expect("milestone exists");
    assert_eq!(failed.sync_status, SyncStatus::Failed);
    assert_eq!(remote.rows("milestones").await[0]["phase_id"], framing.id);

    Ok(())
}

#[tokio::test]
async fn test_bulk_reassign_to_missing_phase_fails() -> anyhow::Result<()> {
    let (mut workspace, _temp_dir) = create_test_workspace(None).await;
    let milestone = workspace
        .add_milestone(make_new_milestone("Walls", date!(2024 - 05 - 01), date!(2024 - 05 - 02), None))
        .await?
        .value;
    assert!(workspace.reassign_phase(&[milestone.id], Some(42)).await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_bulk_delete() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;
    let a = workspace
        .add_milestone(make_new_milestone("A", date!(2024 - 01 - 01), date!(2024 - 01 - 02), None))
        .await?
        .value;
    let b = workspace
        .add_milestone(make_new_milestone("B", date!(2024 - 01 - 03), date!(2024 - 01 - 04), None))
        .await?
        .value;
    let c = workspace
        .add_milestone(make_new_milestone("C", date!(2024 - 01 - 05), date!(2024 - 01 - 06), None))
        .await?
        .value;
    remote.set_offline(true);

    let applied = workspace.delete_milestones(&[a.id, b.id, a.id]).await?;
    let outcome: BulkOutcome = applied.value;
    assert_eq!(
        outcome.applied,
        vec![(a.id, SyncStatus::Failed), (b.id, SyncStatus::Failed)]
    );
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].reason, "not found");

    let remaining: Vec<i64> = applied.snapshot.milestones.iter().map(|m| m.id).collect();
    assert_eq!(remaining, vec![c.id]);
    // The remote still has the rows it never heard about deleting.
    assert_eq!(remote.rows("milestones").await.len(), 3);
    let pending: Vec<(i64, bool)> = workspace
        .unsynced()
        .await?
        .into_iter()
        .map(|entity| (entity.id, entity.deleted))
        .collect();
    assert_eq!(pending, vec![(a.id, true), (b.id, true)]);

    Ok(())
}

#[tokio::test]
async fn test_pull_overwrites_local_rows() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote.clone())).await;
    let phase = workspace.add_phase(make_new_phase("Foundation", TEST_BROWN)).await?.value;

    // Another client renamed the phase and added a milestone.
    remote
        .put("phases", phase.id, json!({"id": phase.id, "name": "Foundations", "color": "#8b4513"}))
        .await;
    remote
        .put(
            "milestones",
            77,
            json!({
                "id": 77,
                "title": "Backfill",
                "start_date": "2024-04-01",
                "end_date": "2024-04-03",
                "phase_id": phase.id,
                "notes": "",
                "completed": false
            }),
        )
        .await;

    let applied = workspace.pull().await?;
    assert_eq!(applied.value.phases, 1);
    assert_eq!(applied.value.milestones, 1);

    let snapshot = applied.snapshot;
    assert_eq!(snapshot.phases.len(), 1);
    assert_eq!(snapshot.phases[0].name, "Foundations");
    let pulled = snapshot.milestone(77).expect("pulled milestone");
    assert_eq!(pulled.title, "Backfill");
    assert_eq!(pulled.sync_status, SyncStatus::Synced);

    Ok(())
}

#[tokio::test]
async fn test_pull_while_offline_fails() -> anyhow::Result<()> {
    let remote = MemoryRemote::new();
    remote.set_offline(true);
    let (mut workspace, _temp_dir) = create_test_workspace(Some(remote)).await;
    assert!(workspace.pull().await.is_err());
    Ok(())
}
