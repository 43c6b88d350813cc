use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use sf_api::{ApiClient, ApiConfig};
use sf_core::types::{DiffKind, StageStatus, StageType, VersionId, VersionSource};
use sf_core::StageNavigator;
use sf_engine::{EditorSession, EngineError, GenerationOutcome};
use sf_stream::SessionEvent;
use std::io::Write;

#[derive(Parser)]
#[command(name = "sf", about = "Staged content workflow client")]
struct Cli {
    /// Project to operate on
    #[arg(long, short)]
    project: i64,
    /// Backend base URL; falls back to STORYFORGE_API_URL
    #[arg(long)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all eight stages with their status and a content preview
    Stages,
    /// Print a stage's current content
    Show { stage: StageType },
    /// Overwrite a stage's content ("-" reads stdin)
    Save { stage: StageType, content: String },
    /// Stream an AI generation into a stage
    Generate {
        stage: StageType,
        #[arg(long)]
        settings_id: Option<i64>,
        #[arg(long)]
        prompt: Option<String>,
    },
    /// List a stage's version history, oldest first
    Versions { stage: StageType },
    /// Label a version
    Rename {
        stage: StageType,
        version: i64,
        label: String,
    },
    /// Delete a version permanently
    Delete { stage: StageType, version: i64 },
    /// Copy a version's content back into the live stage
    Restore { stage: StageType, version: i64 },
    /// Show a line diff between two versions
    Diff {
        stage: StageType,
        old: i64,
        new: i64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.api_url {
        Some(url) => ApiConfig::new(url.clone()),
        None => ApiConfig::from_env(),
    };
    let client = ApiClient::new(config);

    if let Err(err) = run(cli, client).await {
        eprintln!("{} {err}", "error:".red());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, client: ApiClient) -> Result<(), EngineError> {
    let project = sf_core::ProjectId(cli.project);
    match cli.command {
        Command::Stages => {
            let stages = client.stages().fetch_all(project).await?;
            for stage_type in StageType::ORDER {
                let record = stages.get(&stage_type);
                let status =
                    StageNavigator::effective_status(record.map(|stage| stage.status));
                let preview = record
                    .map(|stage| preview_line(&stage.content))
                    .unwrap_or_default();
                println!(
                    "{:>14}  {:<12} {preview}",
                    stage_type.to_string().bold(),
                    status_label(status)
                );
            }
        }
        Command::Show { stage } => {
            let record = client.stages().get(project, stage).await?;
            println!("{}", record.content);
        }
        Command::Save { stage, content } => {
            let content = if content == "-" {
                read_stdin()?
            } else {
                content
            };
            let record = client.stages().update(project, stage, &content).await?;
            println!(
                "saved {} ({} chars, status {})",
                stage,
                record.content.len(),
                status_label(record.status)
            );
        }
        Command::Generate {
            stage,
            settings_id,
            prompt,
        } => {
            let mut editor = EditorSession::open(client, project).await?;
            editor.navigate_to(stage).await?;

            let mut tokens = editor.generation().subscribe();
            let printer = tokio::spawn(async move {
                while let Ok(event) = tokens.recv().await {
                    if let SessionEvent::Token(token) = event {
                        print!("{token}");
                        let _ = std::io::stdout().flush();
                    }
                }
            });

            let outcome = editor.generate(settings_id, prompt).await?;
            printer.abort();
            println!();
            match outcome {
                GenerationOutcome::Completed { content } => {
                    println!("{} {} chars persisted", "done:".green(), content.len());
                }
                GenerationOutcome::Failed { message } => {
                    eprintln!("{} {message}", "generation failed:".red());
                    std::process::exit(1);
                }
                GenerationOutcome::Cancelled => {
                    eprintln!("{}", "generation closed before completing".yellow());
                }
                GenerationOutcome::AlreadyRunning => {
                    eprintln!("a generation is already running");
                }
            }
        }
        Command::Versions { stage } => {
            let versions = client.versions().list(project, stage).await?;
            if versions.is_empty() {
                println!("no versions yet");
            }
            for version in versions {
                let source = match version.source {
                    VersionSource::Manual => "manual",
                    VersionSource::Ai => "ai",
                };
                println!(
                    "{:>6}  v{:<4} {:<6} {}  {}",
                    version.id.to_string().bold(),
                    version.version_number,
                    source,
                    version.created_at.format("%Y-%m-%d %H:%M"),
                    version.display_name()
                );
            }
        }
        Command::Rename {
            stage,
            version,
            label,
        } => {
            client
                .versions()
                .rename(project, stage, VersionId(version), &label)
                .await?;
            println!("renamed version {version} to {label:?}");
        }
        Command::Delete { stage, version } => {
            client
                .versions()
                .delete(project, stage, VersionId(version))
                .await?;
            println!("deleted version {version}");
        }
        Command::Restore { stage, version } => {
            let record = client
                .stages()
                .restore(project, stage, VersionId(version))
                .await?;
            println!(
                "restored version {version} into {stage} ({} chars)",
                record.content.len()
            );
        }
        Command::Diff { stage, old, new } => {
            let versions = client.versions().list(project, stage).await?;
            let compare = sf_core::compare::VersionCompare::new(
                versions,
                VersionId(old),
                VersionId(new),
            )?;
            for run in compare.diff() {
                for line in run.display_lines() {
                    let marker = run.kind.marker();
                    match run.kind {
                        DiffKind::Added => println!("{}", format!("{marker} {line}").green()),
                        DiffKind::Removed => println!("{}", format!("{marker} {line}").red()),
                        DiffKind::Unchanged => println!("{marker} {line}"),
                    }
                }
            }
        }
    }
    Ok(())
}

fn status_label(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Locked => "locked",
        StageStatus::Unlocked => "unlocked",
        StageStatus::InProgress => "in_progress",
        StageStatus::Completed => "completed",
    }
}

fn preview_line(content: &str) -> String {
    let first = content.lines().next().unwrap_or_default();
    let mut preview: String = first.chars().take(60).collect();
    if first.chars().count() > 60 || content.lines().count() > 1 {
        preview.push('…');
    }
    preview
}

fn read_stdin() -> Result<String, EngineError> {
    use std::io::Read;
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| sf_api::ApiError::InvalidInput {
            message: format!("could not read stdin: {err}"),
        })?;
    Ok(buffer)
}
