//! Integration tests for Phase and Milestone storage.
//!
//! Tests cover:
//! - Adding, updating and deleting phases and milestones
//! - Partial milestone updates and unassigning a phase
//! - Unreadable dates surviving storage
//! - Persistence across save and reopen

mod common;

use common::*;
use time::macros::date;

#[tokio::test]
async fn test_phases_keep_insertion_order() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let roofing = project.add_phase(&make_new_phase("Roofing", TEST_RED)).await?;
    let foundation = project.add_phase(&make_new_phase("Foundation", TEST_BROWN)).await?;

    let phases = project.get_phases().await?;
    assert_eq!(
        phases.iter().map(|p| p.id).collect::<Vec<_>>(),
        vec![roofing.id, foundation.id]
    );
    assert_eq!(phases[1].color, TEST_BROWN);
    assert_eq!(phases[0].sync_status, SyncStatus::Pending);

    let update = PhaseUpdate {
        name: Some("Roof".to_string()),
        color: None,
    };
    let renamed = project.update_phase(&roofing, &update).await?;
    assert_eq!(renamed.name, "Roof");
    assert_eq!(renamed.color, TEST_RED);

    Ok(())
}

#[tokio::test]
async fn test_add_and_update_milestone() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let phase = project.add_phase(&make_new_phase("Foundation", TEST_BROWN)).await?;

    let new = make_new_milestone("Pour slab", date!(2024 - 03 - 01), date!(2024 - 03 - 05), Some(phase.id));
    let milestone = project.add_milestone(&new).await?;
    assert!(milestone.id > 0);
    assert_eq!(milestone.start_date, "2024-03-01");
    assert_eq!(milestone.end_date, "2024-03-05");
    assert_eq!(milestone.phase_id, Some(phase.id));
    assert!(!milestone.completed);

    // Title only: dates and phase are untouched.
    let update = MilestoneUpdate {
        title: Some("Pour garage slab".to_string()),
        ..Default::default()
    };
    let updated = project.update_milestone(&milestone, &update).await?;
    assert_eq!(updated.title, "Pour garage slab");
    assert_eq!(updated.start_date, "2024-03-01");
    assert_eq!(updated.phase_id, Some(phase.id));

    let update = MilestoneUpdate {
        schedule: Some(Schedule::new(date!(2024 - 04 - 10), date!(2024 - 04 - 01))),
        phase_id: Some(None),
        completed: Some(true),
        ..Default::default()
    };
    let updated = project.update_milestone(&updated, &update).await?;
    assert_eq!(updated.start_date, "2024-04-10");
    // End before start is clamped on the way in.
    assert_eq!(updated.end_date, "2024-04-10");
    assert_eq!(updated.phase_id, None);
    assert!(updated.completed);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_dates_are_stored_verbatim() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let milestone = Milestone {
        id: 40,
        title: "Imported".to_string(),
        start_date: "not-a-date".to_string(),
        end_date: "2024-01-01".to_string(),
        phase_id: None,
        notes: String::new(),
        completed: false,
        sync_status: SyncStatus::Synced,
    };
    project.upsert_milestone(&milestone).await?;

    let stored = project.get_milestone_by_id(40).await?.expect("milestone exists");
    assert_eq!(stored, milestone);
    assert!(stored.schedule().is_err());

    Ok(())
}

#[tokio::test]
async fn test_deleting_phase_leaves_milestones_unassigned() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let phase = project.add_phase(&make_new_phase("Framing", TEST_BLUE)).await?;
    let milestone = project
        .add_milestone(&make_new_milestone("Walls", date!(2024 - 05 - 01), date!(2024 - 05 - 20), Some(phase.id)))
        .await?;

    project.delete_phase(phase).await?;

    assert!(project.get_phases().await?.is_empty());
    let milestone = project.get_milestone_by_id(milestone.id).await?.expect("milestone survives");
    // Still points at the missing phase; the timeline shows it as unassigned.
    assert!(milestone.phase_id.is_some());

    Ok(())
}

#[tokio::test]
async fn test_deleting_milestone_detaches_tasks() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let milestone = project
        .add_milestone(&make_new_milestone("Inspection", date!(2024 - 06 - 01), date!(2024 - 06 - 01), None))
        .await?;
    let task = project
        .add_task(&NewTask {
            title: "Call inspector".to_string(),
            due_date: Some(date!(2024 - 05 - 30)),
            milestone_id: Some(milestone.id),
        })
        .await?;

    project.delete_milestone(milestone).await?;

    let task = project.get_task_by_id(task.id).await?.expect("task survives");
    assert_eq!(task.milestone_id, None);
    assert_eq!(task.due_date.as_deref(), Some("2024-05-30"));

    Ok(())
}

#[tokio::test]
async fn test_task_for_missing_milestone_fails() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let result = project
        .add_task(&NewTask {
            title: "Orphan".to_string(),
            due_date: None,
            milestone_id: Some(999),
        })
        .await;

    let error_msg = result.expect_err("foreign key should reject the task").to_string();
    assert!(
        error_msg.contains("FOREIGN KEY"),
        "Error should mention foreign key constraint, got: {}",
        error_msg
    );

    Ok(())
}

#[tokio::test]
async fn test_tasks_due_and_completion() -> anyhow::Result<()> {
    let (project, _temp_dir) = create_test_project().await;
    let today = date!(2024 - 07 - 01);
    let due_today = project
        .add_task(&NewTask {
            title: "Order rebar".to_string(),
            due_date: Some(today),
            milestone_id: None,
        })
        .await?;
    project
        .add_task(&NewTask {
            title: "Someday".to_string(),
            due_date: None,
            milestone_id: None,
        })
        .await?;

    let due = project.get_tasks_due(today).await?;
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, due_today.id);

    let update = TaskUpdate {
        completed: Some(true),
        ..Default::default()
    };
    let done = project.update_task(&due_today, &update).await?;
    assert!(done.completed);
    assert_eq!(done.due_date.as_deref(), Some("2024-07-01"));

    // Completed tasks sort last.
    let tasks = project.get_tasks().await?;
    assert_eq!(tasks.last().map(|t| t.id), Some(due_today.id));

    Ok(())
}

#[tokio::test]
async fn test_project_survives_save_and_reopen() -> anyhow::Result<()> {
    let (project, temp_dir) = create_test_project().await;
    let path = temp_dir.path().join("test.sitetrack");

    let phase = project.add_phase(&make_new_phase("Foundation", TEST_BROWN)).await?;
    let milestone = project
        .add_milestone(&make_new_milestone("Footings", date!(2024 - 02 - 01), date!(2024 - 02 - 09), Some(phase.id)))
        .await?;
    project
        .add_note(&NewNote {
            title: "Soil report".to_string(),
            body: "Clay at 1.2m".to_string(),
        })
        .await?;
    project
        .set_project_settings(sitetrack::core::db::UpdateProjectSettings {
            name: Some("Maple Street duplex".to_string()),
            ..Default::default()
        })
        .await?;
    let created_at = project.get_project_created_at().await?;

    project.save_project().await?;
    drop(project);

    let reopened = ProjectDb::new(&path).await?;
    assert_eq!(reopened.get_project_name().await?, "Maple Street duplex");
    assert_eq!(reopened.get_project_created_at().await?, created_at);
    assert_eq!(reopened.get_phases().await?, vec![phase]);
    assert_eq!(reopened.get_milestones().await?, vec![milestone]);
    let notes = reopened.get_notes().await?;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].body, "Clay at 1.2m");

    Ok(())
}
