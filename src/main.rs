use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use spotauth::{cli, config, error, spotify::client::RepeatMode};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth(AuthOptions),

    /// Refresh the stored token once
    Refresh,

    /// Show the authenticated user's profile
    Profile,

    /// Control playback
    #[command(subcommand)]
    Player(PlayerCommand),

    /// Keep the token fresh until interrupted
    Watch,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Client id of the registered Spotify application (stored for later runs)
    #[clap(long)]
    pub client_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlayerCommand {
    /// Pause playback
    Pause,
    /// Resume playback
    Resume,
    /// Turn shuffle on or off
    Shuffle {
        #[clap(value_enum)]
        state: Toggle,
    },
    /// Set the repeat mode
    Repeat {
        #[clap(value_enum)]
        mode: Repeat,
    },
    /// Skip to next track
    Next,
    /// Skip to previous track
    Previous,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Toggle {
    On,
    Off,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum Repeat {
    Track,
    Context,
    Off,
}

impl From<Repeat> for RepeatMode {
    fn from(repeat: Repeat) -> Self {
        match repeat {
            Repeat::Track => RepeatMode::Track,
            Repeat::Context => RepeatMode::Context,
            Repeat::Off => RepeatMode::Off,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth(opt) => cli::auth(opt.client_id).await,
        Command::Refresh => cli::refresh().await,
        Command::Profile => cli::profile().await,
        Command::Player(cmd) => {
            let action = match cmd {
                PlayerCommand::Pause => cli::PlayerAction::Pause,
                PlayerCommand::Resume => cli::PlayerAction::Resume,
                PlayerCommand::Shuffle { state } => {
                    cli::PlayerAction::Shuffle(matches!(state, Toggle::On))
                }
                PlayerCommand::Repeat { mode } => cli::PlayerAction::Repeat(mode.into()),
                PlayerCommand::Next => cli::PlayerAction::Next,
                PlayerCommand::Previous => cli::PlayerAction::Previous,
            };
            cli::player(action).await
        }
        Command::Watch => cli::watch().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
