use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use sporlctl::{cli, config, error, logging, warning};

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
  author=env!("CARGO_PKG_AUTHORS"),
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

    /// Show what is playing
    Status,

    /// List the upcoming queue
    Queue,

    /// Toggle between playing and paused
    PlayPause,

    /// Skip to the next track
    Next,

    /// Restart the track, or go to the previous one near its start
    Previous,

    /// Play a track by URI
    Play(PlayOptions),

    /// Jump to a track in the upcoming queue
    SkipTo(SkipToOptions),

    /// Toggle shuffle
    Shuffle,

    /// Cycle repeat mode (off, context, track)
    Repeat,

    /// Seek within the current track
    Seek(SeekOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Run the browser flow even when cached credentials can be refreshed
    #[clap(long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayOptions {
    /// Spotify URI, e.g. spotify:track:4uLU6hMCjMI75M1A2tKUQC
    pub uri: String,
}

#[derive(Parser, Debug, Clone)]
pub struct SkipToOptions {
    /// URI of a track in the upcoming queue
    pub uri: String,

    /// Play the enclosing context at the track's offset instead of skipping
    #[clap(long)]
    pub via_context: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SeekOptions {
    /// Position in milliseconds
    #[clap(allow_negative_numbers = true)]
    pub position_ms: i64,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    if let Err(e) = logging::init_tracing(&config::log_filter()) {
        warning!("Logging disabled: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth(opt) => cli::auth(opt.force).await,
        Command::Status => cli::status().await,
        Command::Queue => cli::queue().await,
        Command::PlayPause => cli::play_pause().await,
        Command::Next => cli::next().await,
        Command::Previous => cli::previous().await,
        Command::Play(opt) => cli::play(&opt.uri).await,
        Command::SkipTo(opt) => cli::skip_to(&opt.uri, opt.via_context).await,
        Command::Shuffle => cli::shuffle().await,
        Command::Repeat => cli::repeat().await,
        Command::Seek(opt) => cli::seek(opt.position_ms).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
