use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use time::Date;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sitetrack::assistant::{Assistant, ExtractError, OpenAiClient};
use sitetrack::core::date::{format_iso_date, normalize_date, today_local};
use sitetrack::core::db::{
    Color, MilestoneUpdate, NewDocument, NewMilestone, NewNote, NewPhase, NewPhoto, NewTask, PhaseUpdate, ProjectDb,
    ProjectRepository, Schedule, TaskUpdate, UpdateProjectSettings,
};
use sitetrack::inference::{MilestoneText, infer_phase};
use sitetrack::sync::RestRemote;
use sitetrack::timeline::Zoom;
use sitetrack::{BulkOutcome, Config, Workspace};

#[derive(Parser)]
#[command(name = "sitetrack")]
#[command(about = "Construction site timeline, phases, tasks and documents")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", env = "SITETRACK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Project file (created if missing)
    #[arg(value_name = "PROJECT")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(subcommand)]
    Phase(PhaseCommand),
    #[command(subcommand)]
    Milestone(MilestoneCommand),
    #[command(subcommand)]
    Task(TaskCommand),
    #[command(subcommand)]
    Note(NoteCommand),
    #[command(subcommand)]
    Document(DocumentCommand),
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// Print the timeline layout
    Timeline {
        #[arg(long, default_value_t = Zoom::Week)]
        zoom: Zoom,
        /// Pretend today is this date
        #[arg(long, value_parser = parse_date_arg)]
        today: Option<Date>,
    },
    /// Show which phase a milestone text would be assigned to
    Infer { text: String },
    /// Extract milestones from a text document with the assistant
    Extract {
        file: PathBuf,
        /// Show what would be imported without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Ask the assistant a question about the project
    Ask { question: String },
    #[command(subcommand)]
    Sync(SyncCommand),
    /// Rename the project
    Rename { name: String },
}

#[derive(Subcommand)]
enum PhaseCommand {
    Add {
        name: String,
        #[arg(long, default_value = "#9e9e9e")]
        color: String,
    },
    List,
    Rename {
        id: i64,
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    Remove { id: i64 },
}

#[derive(Args)]
struct MilestoneFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, value_parser = parse_date_arg)]
    start: Option<Date>,
    #[arg(long, value_parser = parse_date_arg)]
    end: Option<Date>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, conflicts_with = "unassign")]
    phase: Option<i64>,
    #[arg(long)]
    unassign: bool,
}

#[derive(Subcommand)]
enum MilestoneCommand {
    Add {
        title: String,
        #[arg(long, value_parser = parse_date_arg)]
        start: Date,
        /// Defaults to the start date
        #[arg(long, value_parser = parse_date_arg)]
        end: Option<Date>,
        /// Inferred from the title and notes when omitted
        #[arg(long)]
        phase: Option<i64>,
        #[arg(long, default_value = "")]
        notes: String,
    },
    List,
    Update {
        id: i64,
        #[command(flatten)]
        fields: MilestoneFields,
    },
    Complete {
        id: i64,
        /// Mark as not completed
        #[arg(long)]
        undo: bool,
    },
    Remove {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    /// Move milestones to a phase (no --phase unassigns them)
    Assign {
        #[arg(long)]
        phase: Option<i64>,
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    Add {
        title: String,
        #[arg(long, value_parser = parse_date_arg)]
        due: Option<Date>,
        #[arg(long)]
        milestone: Option<i64>,
    },
    List {
        /// Only tasks due on this date
        #[arg(long, value_parser = parse_date_arg)]
        due: Option<Date>,
    },
    Done { id: i64 },
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum NoteCommand {
    Add { title: String, body: String },
    List,
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum DocumentCommand {
    Add {
        path: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value = "general")]
        category: String,
    },
    List,
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum PhotoCommand {
    Add {
        path: PathBuf,
        #[arg(long, default_value = "")]
        caption: String,
        #[arg(long, value_parser = parse_date_arg)]
        taken_on: Option<Date>,
    },
    List,
    Remove { id: i64 },
}

#[derive(Subcommand)]
enum SyncCommand {
    /// List entities whose remote copy is not known to be current
    Status,
    /// Overwrite local phases and milestones with the remote rows
    Pull,
}

fn parse_date_arg(value: &str) -> Result<Date, String> {
    normalize_date(value).ok_or_else(|| format!("unrecognized date '{}'", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "sitetrack=debug" } else { "sitetrack=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(args.config.as_deref())?;
    let remote = match config.remote.credentials() {
        Some((url, key)) => Some(RestRemote::new(url, key.to_string())?),
        None => None,
    };

    let db = ProjectDb::new(&args.project).await?;
    let mut workspace = Workspace::open(db, remote).await?;
    let result = run(args.command, &mut workspace, &config).await;
    workspace.save().await?;
    result
}

async fn run(command: Command, workspace: &mut Workspace<RestRemote>, config: &Config) -> anyhow::Result<()> {
    match command {
        Command::Phase(cmd) => run_phase(cmd, workspace).await,
        Command::Milestone(cmd) => run_milestone(cmd, workspace).await,
        Command::Task(cmd) => run_task(cmd, workspace).await,
        Command::Note(cmd) => run_note(cmd, workspace).await,
        Command::Document(cmd) => run_document(cmd, workspace).await,
        Command::Photo(cmd) => run_photo(cmd, workspace).await,
        Command::Timeline { zoom, today } => {
            print_timeline(workspace, zoom, today.unwrap_or_else(today_local)).await
        }
        Command::Infer { text } => {
            let snapshot = workspace.snapshot();
            match infer_phase(&MilestoneText::new(&text, ""), &snapshot.phases).and_then(|id| snapshot.phase(id)) {
                Some(phase) => println!("{} ({})", phase.name, phase.id),
                None => println!("No phases defined."),
            }
            Ok(())
        }
        Command::Extract { file, dry_run } => run_extract(workspace, config, &file, dry_run).await,
        Command::Ask { question } => {
            let snapshot = workspace.snapshot();
            let answer = assistant(config)?
                .ask(&question, &snapshot.phases, &snapshot.milestones)
                .await?;
            println!("{}", answer);
            Ok(())
        }
        Command::Sync(SyncCommand::Status) => {
            if !workspace.is_remote_configured() {
                println!("No remote backend configured; every change is local only.");
            }
            let unsynced = workspace.unsynced().await?;
            if unsynced.is_empty() {
                println!("Everything is synced.");
            }
            for entity in unsynced {
                let deleted = if entity.deleted { "  (deleted locally)" } else { "" };
                println!("{:<10} {:>5}  {}{}", entity.kind, entity.id, entity.status, deleted);
            }
            Ok(())
        }
        Command::Rename { name } => {
            let settings = UpdateProjectSettings {
                name: Some(name),
                ..Default::default()
            };
            workspace.db().set_project_settings(settings).await
        }
        Command::Sync(SyncCommand::Pull) => {
            let summary = workspace.pull().await?.value;
            println!("Pulled {} phases and {} milestones.", summary.phases, summary.milestones);
            Ok(())
        }
    }
}

async fn run_phase(cmd: PhaseCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        PhaseCommand::Add { name, color } => {
            let color = Color::from_hex(&color)?;
            let phase = workspace.add_phase(NewPhase { name, color }).await?.value;
            println!("Added phase {} '{}' [{}]", phase.id, phase.name, phase.sync_status);
        }
        PhaseCommand::List => {
            for phase in workspace.snapshot().phases.iter() {
                println!("{:>4}  {}  {}  [{}]", phase.id, phase.color, phase.name, phase.sync_status);
            }
        }
        PhaseCommand::Rename { id, name, color } => {
            let update = PhaseUpdate {
                name: Some(name),
                color: color.as_deref().map(Color::from_hex).transpose()?,
            };
            let phase = workspace.update_phase(id, update).await?.value;
            println!("Phase {} is now '{}' [{}]", phase.id, phase.name, phase.sync_status);
        }
        PhaseCommand::Remove { id } => {
            let status = workspace.delete_phase(id).await?.value;
            println!("Removed phase {} [{}]", id, status);
        }
    }
    Ok(())
}

async fn run_milestone(cmd: MilestoneCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        MilestoneCommand::Add {
            title,
            start,
            end,
            phase,
            notes,
        } => {
            let phase_id = phase.or_else(|| workspace.suggest_phase(&title, &notes));
            let milestone = NewMilestone {
                title,
                schedule: Schedule::new(start, end.unwrap_or(start)),
                phase_id,
                notes,
            };
            let milestone = workspace.add_milestone(milestone).await?.value;
            println!(
                "Added milestone {} '{}' {}..{} [{}]",
                milestone.id, milestone.title, milestone.start_date, milestone.end_date, milestone.sync_status
            );
        }
        MilestoneCommand::List => {
            let snapshot = workspace.snapshot();
            for milestone in snapshot.milestones.iter() {
                let phase = milestone
                    .phase_id
                    .and_then(|id| snapshot.phase(id))
                    .map(|p| p.name.as_str())
                    .unwrap_or("Unassigned");
                let done = if milestone.completed { "x" } else { " " };
                println!(
                    "{:>4} [{}] {} .. {}  {}  ({})  [{}]",
                    milestone.id, done, milestone.start_date, milestone.end_date, milestone.title, phase, milestone.sync_status
                );
            }
        }
        MilestoneCommand::Update { id, fields } => {
            let current = workspace
                .snapshot()
                .milestone(id)
                .cloned()
                .with_context(|| format!("Milestone {} not found", id))?;
            let schedule = match (fields.start, fields.end) {
                (None, None) => None,
                (start, end) => {
                    let existing = current.schedule().ok();
                    let start = start.or(existing.map(|s| s.start)).or(end);
                    let end = end.or(existing.map(|s| s.end)).or(start);
                    start.zip(end).map(|(start, end)| Schedule::new(start, end))
                }
            };
            let phase_id = if fields.unassign { Some(None) } else { fields.phase.map(Some) };
            let update = MilestoneUpdate {
                title: fields.title,
                schedule,
                phase_id,
                notes: fields.notes,
                completed: None,
            };
            let milestone = workspace.update_milestone(id, update).await?.value;
            println!("Updated milestone {} [{}]", milestone.id, milestone.sync_status);
        }
        MilestoneCommand::Complete { id, undo } => {
            let milestone = workspace.set_milestone_completed(id, !undo).await?.value;
            println!("Milestone {} completed: {}", milestone.id, milestone.completed);
        }
        MilestoneCommand::Remove { ids } => {
            let outcome = workspace.delete_milestones(&ids).await?.value;
            print_bulk("Removed", &outcome);
        }
        MilestoneCommand::Assign { phase, ids } => {
            let outcome = workspace.reassign_phase(&ids, phase).await?.value;
            print_bulk("Reassigned", &outcome);
        }
    }
    Ok(())
}

fn print_bulk(verb: &str, outcome: &BulkOutcome) {
    println!("{} {} milestone(s).", verb, outcome.applied.len());
    for id in outcome.remote_failures() {
        println!("  {}: remote write failed, kept locally", id);
    }
    for failure in &outcome.failed {
        println!("  {}: {}", failure.id, failure.reason);
    }
}

async fn run_task(cmd: TaskCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        TaskCommand::Add { title, due, milestone } => {
            let task = NewTask {
                title,
                due_date: due,
                milestone_id: milestone,
            };
            let task = workspace.add_task(task).await?.value;
            println!("Added task {} '{}' [{}]", task.id, task.title, task.sync_status);
        }
        TaskCommand::List { due } => {
            let tasks = match due {
                Some(day) => workspace.tasks_due(day).await?,
                None => workspace.snapshot().tasks.to_vec(),
            };
            for task in tasks {
                let done = if task.completed { "x" } else { " " };
                println!(
                    "{:>4} [{}] {:<10}  {}",
                    task.id,
                    done,
                    task.due_date.as_deref().unwrap_or("-"),
                    task.title
                );
            }
        }
        TaskCommand::Done { id } => {
            let update = TaskUpdate {
                completed: Some(true),
                ..Default::default()
            };
            let task = workspace.update_task(id, update).await?.value;
            println!("Task {} done [{}]", task.id, task.sync_status);
        }
        TaskCommand::Remove { id } => {
            let status = workspace.delete_task(id).await?.value;
            println!("Removed task {} [{}]", id, status);
        }
    }
    Ok(())
}

async fn run_note(cmd: NoteCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        NoteCommand::Add { title, body } => {
            let note = workspace.add_note(NewNote { title, body }).await?.value;
            println!("Added note {} [{}]", note.id, note.sync_status);
        }
        NoteCommand::List => {
            for note in workspace.snapshot().notes.iter() {
                println!("{:>4}  {}  {}", note.id, format_iso_date(note.created_at.date()), note.title);
                if !note.body.is_empty() {
                    println!("      {}", note.body);
                }
            }
        }
        NoteCommand::Remove { id } => {
            let status = workspace.delete_note(id).await?.value;
            println!("Removed note {} [{}]", id, status);
        }
    }
    Ok(())
}

async fn run_document(cmd: DocumentCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        DocumentCommand::Add { path, name, category } => {
            let name = match name {
                Some(name) => name,
                None => file_stem(&path)?,
            };
            let document = NewDocument {
                name,
                category,
                source_path: path,
            };
            let document = workspace.add_document(document).await?.value;
            println!("Added document {} '{}' [{}]", document.id, document.name, document.sync_status);
        }
        DocumentCommand::List => {
            for document in workspace.snapshot().documents.iter() {
                println!("{:>4}  {:<12}  {}  ({})", document.id, document.category, document.name, document.file_name);
            }
        }
        DocumentCommand::Remove { id } => {
            let status = workspace.delete_document(id).await?.value;
            println!("Removed document {} [{}]", id, status);
        }
    }
    Ok(())
}

async fn run_photo(cmd: PhotoCommand, workspace: &mut Workspace<RestRemote>) -> anyhow::Result<()> {
    match cmd {
        PhotoCommand::Add {
            path,
            caption,
            taken_on,
        } => {
            let photo = NewPhoto {
                caption,
                taken_on,
                source_path: path,
            };
            let photo = workspace.add_photo(photo).await?.value;
            println!("Added photo {} [{}]", photo.id, photo.sync_status);
        }
        PhotoCommand::List => {
            for photo in workspace.snapshot().photos.iter() {
                println!(
                    "{:>4}  {:<10}  {}  ({})",
                    photo.id,
                    photo.taken_on.as_deref().unwrap_or("-"),
                    photo.caption,
                    photo.file_name
                );
            }
        }
        PhotoCommand::Remove { id } => {
            let status = workspace.delete_photo(id).await?.value;
            println!("Removed photo {} [{}]", id, status);
        }
    }
    Ok(())
}

fn file_stem(path: &std::path::Path) -> anyhow::Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a document name from {:?}", path))
}

fn assistant(config: &Config) -> anyhow::Result<Assistant<OpenAiClient>> {
    let api_key = config.assistant.api_key.clone().unwrap_or_default();
    let client = OpenAiClient::new(api_key, config.assistant.model.clone(), config.assistant.base_url.clone())?;
    Ok(Assistant::new(client).with_max_input_chars(config.assistant.max_input_chars))
}

async fn run_extract(
    workspace: &mut Workspace<RestRemote>,
    config: &Config,
    file: &std::path::Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let document = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let snapshot = workspace.snapshot();
    let report = match assistant(config)?
        .extract_milestones(&document, &snapshot.phases, &snapshot.milestones)
        .await
    {
        Ok(report) => report,
        Err(ExtractError::Malformed { raw, reason }) => {
            tracing::debug!(%raw, "Unparsable assistant reply");
            anyhow::bail!("Could not read milestones from the assistant's reply ({}). Try again or shorten the document.", reason);
        }
        Err(e) => return Err(e.into()),
    };

    for milestone in &report.accepted {
        let phase = milestone
            .phase_id
            .and_then(|id| snapshot.phase(id))
            .map(|p| p.name.as_str())
            .unwrap_or("Unassigned");
        println!(
            "  + {} .. {}  {}  ({})",
            format_iso_date(milestone.schedule.start),
            format_iso_date(milestone.schedule.end),
            milestone.title,
            phase
        );
    }
    for rejection in &report.rejected {
        println!("  - {}: {}", rejection.title, rejection.reason);
    }

    if dry_run {
        println!("Dry run: {} milestone(s) would be added, {} rejected.", report.accepted.len(), report.rejected.len());
        return Ok(());
    }
    let inserted = workspace.import_extraction(&report).await?.value;
    println!("Added {} milestone(s), {} rejected.", inserted.len(), report.rejected.len());
    Ok(())
}

async fn print_timeline(workspace: &Workspace<RestRemote>, zoom: Zoom, today: Date) -> anyhow::Result<()> {
    let name = workspace.db().get_project_name().await?;
    let layout = workspace.timeline(zoom, today);
    println!("{}", name);
    println!(
        "Range {} .. {}  zoom {}  {} buckets x {}px = {}px",
        format_iso_date(layout.range.start()),
        format_iso_date(layout.range.end()),
        layout.zoom,
        layout.buckets.len(),
        layout.bucket_width,
        layout.total_width
    );
    match layout.today {
        Some(offset) => println!("Today ({}) at {}px", format_iso_date(today), offset),
        None => println!("Today ({}) is outside the timeline", format_iso_date(today)),
    }
    for row in &layout.rows {
        println!("\n{} {}", row.color, row.label);
        for bar in &row.bars {
            let marker = if bar.placeholder { " (unreadable dates)" } else { "" };
            let done = if bar.completed { "x" } else { " " };
            println!("  [{}] {:>4}  {}  {}{}", done, bar.milestone_id, bar.span, bar.title, marker);
        }
    }
    Ok(())
}
