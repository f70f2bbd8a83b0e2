use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use genflow_application::GenflowEngine;
use genflow_core::workflow::WorkflowVariant;
use genflow_infrastructure::ConfigService;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "genflow")]
#[command(about = "Genflow - step-by-step image generation workflows", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Workflow to operate on (composite, try-on, backdrop-swap)
    variant: WorkflowVariant,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the saved session
    Show,
    /// Attach an image file to an input slot
    Upload { slot: u8, file: PathBuf },
    /// Remove the image in an input slot
    Remove { slot: u8 },
    /// Select the subject (model/person) by catalog id
    Subject { id: String },
    /// Select the backdrop by catalog id
    Backdrop { id: String },
    /// Set the free-text instruction
    Instruct { text: String },
    /// Change output preferences
    Prefs {
        #[arg(long)]
        aspect_ratio: Option<String>,
        #[arg(long)]
        resolution: Option<String>,
    },
    /// Confirm the current step; on the last step this generates
    Next,
    /// Jump to an unlocked step by index or name
    Goto { step: String },
    /// Submit the session
    Generate,
    /// Restore the previous result
    Undo,
    /// Make a timeline entry the current result
    Pick { index: usize },
    /// Discard the session and start from scratch
    StartOver,
    /// Print the remaining credits
    Credits,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing()?;
    let cli = Cli::parse();

    let mut config_service = ConfigService::new();
    if let Some(path) = cli.config {
        config_service = config_service.with_path(path);
    }
    let engine = GenflowEngine::from_config_service(&config_service)?;
    let instance = engine.registry.get(cli.variant).await?;
    tracing::debug!(
        "Running {} on '{}' (step {})",
        command_name(&cli.command),
        cli.variant,
        instance.container().snapshot().await.current_step()
    );

    match cli.command {
        Commands::Show => commands::session::show(&instance).await?,
        Commands::Upload { slot, file } => commands::session::upload(&instance, slot, &file).await?,
        Commands::Remove { slot } => commands::session::remove(&instance, slot).await?,
        Commands::Subject { id } => commands::session::subject(&instance, &id).await?,
        Commands::Backdrop { id } => commands::session::backdrop(&instance, &id).await?,
        Commands::Instruct { text } => commands::session::instruct(&instance, text).await?,
        Commands::Prefs {
            aspect_ratio,
            resolution,
        } => {
            commands::session::prefs(&instance, aspect_ratio.as_deref(), resolution.as_deref())
                .await?
        }
        Commands::Next => commands::generate::next(&instance).await?,
        Commands::Goto { step } => commands::session::goto(&instance, &step).await?,
        Commands::Generate => commands::generate::generate(&instance).await?,
        Commands::Undo => commands::history::undo(&instance).await?,
        Commands::Pick { index } => commands::history::pick(&instance, index).await?,
        Commands::StartOver => commands::session::start_over(&instance).await?,
        Commands::Credits => commands::generate::credits(&engine).await?,
    }

    Ok(())
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Show => "show",
        Commands::Upload { .. } => "upload",
        Commands::Remove { .. } => "remove",
        Commands::Subject { .. } => "subject",
        Commands::Backdrop { .. } => "backdrop",
        Commands::Instruct { .. } => "instruct",
        Commands::Prefs { .. } => "prefs",
        Commands::Next => "next",
        Commands::Goto { .. } => "goto",
        Commands::Generate => "generate",
        Commands::Undo => "undo",
        Commands::Pick { .. } => "pick",
        Commands::StartOver => "start-over",
        Commands::Credits => "credits",
    }
}

fn setup_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}
