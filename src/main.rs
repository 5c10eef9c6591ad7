use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use converse_api::{Backend, CharacterClient};
use converse_core::{AppConfig, Character, UiCommand};
use converse_session::{AudioSettings, VoiceSession};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(
    name = "converse",
    about = "Terminal voice-chat client for the aiverse character service"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive voice chat (the default)
    Chat {
        /// Character id to open immediately
        character: Option<i64>,
    },

    /// Browse or create characters from the command line
    Characters {
        #[command(subcommand)]
        action: CharacterAction,
    },

    /// List audio devices usable as input/output device_name
    Devices,
}

#[derive(Subcommand)]
enum CharacterAction {
    /// Print all characters
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print one character
    Show { id: i64 },

    /// Register a new character
    Create {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        image_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let timeout = config.api.request_timeout_secs.map(Duration::from_secs);

    match cli.command.unwrap_or(Commands::Chat { character: None }) {
        Commands::Chat { character } => run_chat(config, timeout, character).await,
        Commands::Characters { action } => {
            init_cli_tracing(&config)?;
            run_characters(&config, timeout, action).await
        }
        Commands::Devices => {
            init_cli_tracing(&config)?;
            run_devices()
        }
    }
}

/// The default config path is optional; an explicit one must exist.
fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        return Ok(AppConfig::default());
    }
    AppConfig::load_from_file(path)
        .with_context(|| format!("failed to load config from {:?}", path))
}

fn init_cli_tracing(config: &AppConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run_chat(
    config: AppConfig,
    timeout: Option<Duration>,
    character: Option<i64>,
) -> Result<()> {
    // All logging goes through the TUI layer; stdout and stderr belong to
    // the terminal UI while the chat runs.
    let log_buffer = Arc::new(Mutex::new(VecDeque::<String>::new()));
    let tui_log_layer = converse_tui::TuiLogLayer::new(Arc::clone(&log_buffer), 1000);

    let env_filter =
        EnvFilter::try_new(&config.general.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(tui_log_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    tracing::info!("converse starting ({})", config.api.base_url);

    let backend: Arc<dyn Backend> = Arc::new(
        CharacterClient::new(&config.api.base_url, timeout)
            .context("invalid [api] configuration")?,
    );

    let session = VoiceSession::start(AudioSettings::from_config(&config), Arc::clone(&backend));
    let controller = session.controller(Arc::clone(&backend), config.session.save_dir.clone());

    let (state_tx, state_rx) = tokio::sync::watch::channel(converse_core::ChatState::default());
    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel::<UiCommand>();

    // Load the character list up front; jump straight into a session when
    // an id was given on the command line.
    let _ = cmd_tx.send(UiCommand::RefreshCharacters);
    if let Some(id) = character {
        let _ = cmd_tx.send(UiCommand::OpenCharacter(id));
    }

    let broadcast = tokio::spawn(converse_session::run_broadcast(state_tx, session.handle()));
    let commands = tokio::spawn(controller.run(cmd_rx));

    // Run TUI (blocks until user quits)
    converse_tui::run(state_rx, cmd_tx, log_buffer)
        .await
        .context("TUI error")?;

    tracing::info!("shutting down");
    session.shutdown().await;
    let _ = commands.await;
    let _ = broadcast.await;

    Ok(())
}

async fn run_characters(
    config: &AppConfig,
    timeout: Option<Duration>,
    action: CharacterAction,
) -> Result<()> {
    let client = CharacterClient::new(&config.api.base_url, timeout)
        .context("invalid [api] configuration")?;

    match action {
        CharacterAction::List { json } => {
            let characters = client
                .list_characters()
                .await
                .context("could not list characters")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&characters)?);
            } else if characters.is_empty() {
                println!("no characters");
            } else {
                for character in &characters {
                    println!("{:>6}  {:<24}  {}", character.id, character.name, character.prompt);
                }
            }
        }
        CharacterAction::Show { id } => {
            let character = client
                .get_character(id)
                .await
                .with_context(|| format!("could not fetch character {id}"))?;
            println!("id:     {}", character.id);
            println!("name:   {}", character.name);
            println!("prompt: {}", character.prompt);
            println!("image:  {}", character.profile_image_url);
        }
        CharacterAction::Create {
            id,
            name,
            prompt,
            image_url,
        } => {
            let created = client
                .create_character(&Character {
                    id,
                    name,
                    prompt,
                    profile_image_url: image_url,
                })
                .await
                .context("could not create character")?;
            println!("created character {} ({})", created.id, created.name);
        }
    }

    Ok(())
}

fn run_devices() -> Result<()> {
    use converse_audio::DeviceManager;

    let manager = DeviceManager::new();

    println!("Input devices:");
    for (name, device) in manager.list_input_devices()? {
        println!("  - {} ({})", name, DeviceManager::input_summary(&device));
    }
    println!("Output devices:");
    for (name, device) in manager.list_output_devices()? {
        println!("  - {} ({})", name, DeviceManager::output_summary(&device));
    }

    Ok(())
}
