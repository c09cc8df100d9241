//! Snakecast — terminal snake with a gated, raise-only shared leaderboard.

mod app;
mod config;
mod game;
mod gate;
mod input;
mod leaderboard;
mod rank;
mod social;
mod submit;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use config::Settings;
use gate::{DryRunGate, HttpGate, TransactionGate};
use leaderboard::{FileStore, LeaderboardStore};
use social::{CastLogger, SocialClient, WebhookCaster};
use std::sync::Arc;
use std::time::Duration;
use submit::Identity;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    init_logging();

    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let identity = Identity {
        wallet_address: args.address.clone().or(settings.wallet_address.clone()),
        username: args.username.clone().or(settings.username.clone()),
    };

    // The UI loop stays synchronous; the submission pipeline lives on this
    // runtime and the two talk over channels.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let store = Arc::new(FileStore::open(
        settings
            .leaderboard_path
            .clone()
            .unwrap_or_else(Settings::default_leaderboard_path),
    )?);
    let gate: Arc<dyn TransactionGate> = match &settings.gate_endpoint {
        Some(endpoint) => Arc::new(HttpGate::new(
            endpoint.clone(),
            settings.gate_timeout_secs.map(Duration::from_secs),
        )),
        None => Arc::new(DryRunGate),
    };
    let social: Arc<dyn SocialClient> = match &settings.share_endpoint {
        Some(endpoint) => Arc::new(WebhookCaster::new(endpoint.clone())),
        None => Arc::new(CastLogger),
    };

    let leaderboard_rx = store.subscribe();
    let submit = submit::spawn_controller(
        runtime.handle(),
        gate,
        Arc::clone(&store) as Arc<dyn LeaderboardStore>,
        social,
        identity.clone(),
    );

    let mut app = App::new(&args, theme, identity, submit, leaderboard_rx);
    app.run()
}

/// Log to a file in the config directory; stdout belongs to the TUI. A log
/// file that cannot be opened just disables logging.
fn init_logging() {
    let path = Settings::log_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
}

/// Terminal snake with an on-chain-style score gate and shared leaderboard.
#[derive(Debug, Parser)]
#[command(
    name = "snakecast",
    version,
    about = "Snake in the terminal. Eat food, grow, submit your best score to a shared leaderboard.",
    long_about = "Snakecast is a terminal snake game with a shared, raise-only leaderboard.\n\n\
        Each food is worth 10 points. When a run ends you can submit the score; the \
        submission goes through a confirmation gate (a transaction endpoint when \
        configured) and only ever raises your stored best.\n\n\
        CONTROLS:\n  Arrows / wasd / hjkl  Steer    P  Pause    Q / Esc  Quit\n  \
        Enter/Space  Start or submit        R  Play again   X  Discard score\n\n\
        Identity (wallet address + handle) comes from config.toml or the flags below; \
        without it you can play but not submit. Use --theme to load a btop-style theme."
)]
pub struct Args {
    /// Grid width in cells (clamped to the terminal).
    #[arg(long, default_value = "20", value_name = "COLS")]
    pub width: u16,

    /// Grid height in cells (clamped to the terminal).
    #[arg(long, default_value = "20", value_name = "ROWS")]
    pub height: u16,

    /// Base ms per simulation tick at score 0 (ticks speed up as you eat).
    #[arg(long, default_value = "150", value_name = "MS")]
    pub tick_ms: u64,

    /// Path to theme file (btop-style theme[key]="value"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Config file (defaults to config.toml in the snakecast config dir).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Wallet address to submit under (overrides config).
    #[arg(long, value_name = "ADDR")]
    pub address: Option<String>,

    /// Social handle to submit and share under (overrides config).
    #[arg(long, value_name = "NAME")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
