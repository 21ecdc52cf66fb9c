//! End-to-end milestone extraction against a canned chat model.

mod common;

use common::*;
use sitetrack::assistant::{Assistant, ChatError, ExtractError};
use time::macros::date;

const FENCED_REPLY: &str = r#"Here is what I found:

```json
{
  "milestones": [
    {"title": "Pour concrete footings", "startDate": "March 15, 2024", "endDate": "2024-03-18", "notes": "", "phase": null},
    {"title": "Install roof shingles", "start_date": "04/02/2024", "end_date": null, "notes": "Weather permitting"},
    {"title": "Final walkthrough", "startDate": "TBD", "endDate": "TBD"}
  ]
}
```
"#;

#[tokio::test]
async fn test_extract_and_import() -> anyhow::Result<()> {
    let (mut workspace, _temp_dir) = create_test_workspace(None).await;
    let foundation = workspace.add_phase(make_new_phase("Foundation", TEST_BROWN)).await?.value;
    let roofing = workspace.add_phase(make_new_phase("Roofing", TEST_RED)).await?.value;
    workspace
        .add_milestone(make_new_milestone("Site survey", date!(2024 - 02 - 01), date!(2024 - 02 - 01), None))
        .await?;

    let model = CannedModel::replying(FENCED_REPLY);
    let prompts = model.prompts.clone();
    let assistant = Assistant::new(model);

    let snapshot = workspace.snapshot();
    let report = assistant
        .extract_milestones("Schedule: footings mid March, roof in April.", &snapshot.phases, &snapshot.milestones)
        .await?;

    // Phase names and existing titles are part of the prompt.
    let prompt = prompts.lock().unwrap()[0].clone();
    assert!(prompt.contains("Roofing"));
    assert!(prompt.contains("Site survey"));
    assert!(prompt.contains("footings mid March"));

    assert_eq!(report.accepted.len(), 2);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].title, "Final walkthrough");

    let inserted = workspace.import_extraction(&report).await?;
    let milestones = inserted.value;
    assert_eq!(milestones[0].title, "Pour concrete footings");
    assert_eq!(milestones[0].start_date, "2024-03-15");
    assert_eq!(milestones[0].end_date, "2024-03-18");
    assert_eq!(milestones[0].phase_id, Some(foundation.id));
    assert_eq!(milestones[1].start_date, "2024-04-02");
    assert_eq!(milestones[1].end_date, "2024-04-02");
    assert_eq!(milestones[1].phase_id, Some(roofing.id));
    assert_eq!(milestones[1].notes, "Weather permitting");
    assert_eq!(inserted.snapshot.milestones.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_unparsable_reply_is_malformed() -> anyhow::Result<()> {
    let (workspace, _temp_dir) = create_test_workspace(None).await;
    let assistant = Assistant::new(CannedModel::replying("Sorry, I could not find any dates."));
    let snapshot = workspace.snapshot();

    let result = assistant
        .extract_milestones("text", &snapshot.phases, &snapshot.milestones)
        .await;
    match result {
        Err(ExtractError::Malformed { raw, .. }) => assert!(raw.contains("Sorry")),
        other => panic!("expected a malformed reply, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_chat_errors_pass_through() -> anyhow::Result<()> {
    let assistant = Assistant::new(CannedModel::failing(ChatError::RateLimited));
    let result = assistant.extract_milestones("text", &[], &[]).await;
    assert!(matches!(result, Err(ExtractError::Chat(ChatError::RateLimited))));

    let answer = Assistant::new(CannedModel::replying("Footings first."))
        .ask("What comes first?", &[], &[])
        .await?;
    assert_eq!(answer, "Footings first.");
    Ok(())
}

#[tokio::test]
async fn test_long_documents_are_truncated() -> anyhow::Result<()> {
    let model = CannedModel::replying("[]");
    let prompts = model.prompts.clone();
    let assistant = Assistant::new(model).with_max_input_chars(100);

    let document = "é".repeat(500);
    let report = assistant.extract_milestones(&document, &[], &[]).await?;
    assert!(report.accepted.is_empty());

    let prompt = prompts.lock().unwrap()[0].clone();
    assert!(prompt.matches('é').count() <= 100);
    assert!(prompt.contains("[document truncated]"));
    Ok(())
}
