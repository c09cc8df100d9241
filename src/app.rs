//! App: terminal init, main loop, tick pacing, key handling, and the bridge
//! between the synchronous UI and the background submission pipeline.

use crate::game::{GameStatus, SnakeGame};
use crate::input::{Action, key_to_action};
use crate::leaderboard::Snapshot;
use crate::rank::{Standings, compute_standings};
use crate::submit::{
    Identity, PendingScore, RefuseReason, SubmissionState, SubmitEvent, SubmitHandle,
};
use crate::theme::Theme;
use crate::Args;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;
use tokio::sync::watch;

/// Ticks get this much faster per food eaten.
const SPEEDUP_PER_FOOD_MS: u64 = 4;
/// Speed cap.
const MIN_TICK_MS: u64 = 60;
/// Render pacing when idle (~30 fps keeps the fade smooth).
const FRAME_MS: u64 = 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
}

pub struct App {
    theme: Theme,
    identity: Identity,
    /// Ms per tick at score 0, from the command line.
    base_tick_ms: u64,
    /// Grid size clamped to the terminal so board + sidebar fit on screen.
    grid_width: u16,
    grid_height: u16,
    game: SnakeGame,
    screen: Screen,
    last_tick: Instant,
    /// Latest finished run awaiting submission, discard, or replacement.
    pending: Option<PendingScore>,
    submission: SubmissionState,
    submit: SubmitHandle,
    leaderboard_rx: watch::Receiver<Snapshot>,
    standings: Standings,
    game_over_effect: Option<Effect>,
    game_over_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(
        args: &Args,
        theme: Theme,
        identity: Identity,
        submit: SubmitHandle,
        leaderboard_rx: watch::Receiver<Snapshot>,
    ) -> Self {
        let game = SnakeGame::new(args.width, args.height);
        let standings = compute_standings(
            &leaderboard_rx.borrow(),
            identity.wallet_address.as_deref(),
        );
        Self {
            theme,
            identity,
            base_tick_ms: args.tick_ms.max(MIN_TICK_MS),
            grid_width: args.width,
            grid_height: args.height,
            game,
            screen: Screen::Menu,
            last_tick: Instant::now(),
            pending: None,
            submission: SubmissionState::None,
            submit,
            leaderboard_rx,
            standings,
            game_over_effect: None,
            game_over_effect_process_time: None,
        }
    }

    /// Tick interval shrinks as the score climbs, floored at [`MIN_TICK_MS`].
    fn tick_interval(&self) -> Duration {
        let foods = u64::from(self.game.score() / crate::game::FOOD_REWARD);
        let ms = self
            .base_tick_ms
            .saturating_sub(foods * SPEEDUP_PER_FOOD_MS)
            .max(MIN_TICK_MS);
        Duration::from_millis(ms)
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{
                EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
                size,
            },
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        // Size the grid to fit the terminal; respect --width/--height when
        // they fit.
        let (term_cols, term_rows) = size()?;
        let (fit_w, fit_h) = crate::ui::max_grid_for_terminal(term_cols, term_rows);
        self.grid_width = self.grid_width.min(fit_w).max(1);
        self.grid_height = self.grid_height.min(fit_h).max(1);
        if self.grid_width as i32 != self.game.width()
            || self.grid_height as i32 != self.game.height()
        {
            self.game = SnakeGame::new(self.grid_width, self.grid_height);
        }

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            self.drain_submit_events();
            self.refresh_standings();

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.game,
                    &self.theme,
                    &self.standings,
                    &self.identity,
                    self.pending,
                    &self.submission,
                    self.game.status() == GameStatus::Paused,
                    &mut self.game_over_effect,
                    &mut self.game_over_effect_process_time,
                    now,
                );
            })?;

            let next_tick = self.last_tick + self.tick_interval();
            let timeout = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(FRAME_MS));
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle_key(key) {
                            return Ok(());
                        }
                    }
                }
            }

            if self.screen == Screen::Playing && Instant::now() >= next_tick {
                self.last_tick = Instant::now();
                if let Some(outcome) = self.game.tick() {
                    tracing::info!(score = outcome.score, reason = ?outcome.reason, "run over");
                    self.enter_game_over(outcome.score);
                }
            }
        }
    }

    /// Returns false when the app should exit.
    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> bool {
        let action = key_to_action(key);
        if action == Action::Quit {
            return false;
        }
        match self.screen {
            Screen::Menu => {
                if action == Action::Start {
                    self.start_run();
                }
            }
            Screen::Playing => match action {
                Action::Turn(d) => self.game.set_direction(d),
                Action::Pause => match self.game.status() {
                    GameStatus::Running => self.game.pause(),
                    GameStatus::Paused => self.game.resume(),
                    _ => {}
                },
                _ => {}
            },
            Screen::GameOver => match key.code {
                KeyCode::Enter => {
                    if let Some(p) = self.pending {
                        self.submit.submit(p.value);
                    }
                }
                KeyCode::Char('x') => {
                    self.pending = None;
                    self.submission = SubmissionState::None;
                }
                KeyCode::Char('r') => self.start_run(),
                _ => {}
            },
        }
        true
    }

    fn start_run(&mut self) {
        self.game.start();
        self.screen = Screen::Playing;
        self.last_tick = Instant::now();
        self.game_over_effect = None;
        self.game_over_effect_process_time = None;
    }

    fn enter_game_over(&mut self, score: u32) {
        self.screen = Screen::GameOver;
        self.game_over_effect = None;
        self.game_over_effect_process_time = None;
        // An awaiting submission still references the previous run's value, so
        // its pending score stays until the gate resolves.
        if self.submission == SubmissionState::AwaitingConfirmation {
            return;
        }
        self.submission = SubmissionState::None;
        self.pending = (score > 0).then(|| PendingScore::new(score));
    }

    fn drain_submit_events(&mut self) {
        while let Some(event) = self.submit.try_event() {
            match event {
                SubmitEvent::Awaiting => {
                    self.submission = SubmissionState::AwaitingConfirmation;
                }
                SubmitEvent::NotAnImprovement { stored } => {
                    tracing::info!(stored, "score does not beat stored best; dropped");
                    self.pending = None;
                    self.submission = SubmissionState::None;
                }
                SubmitEvent::Refused(RefuseReason::AlreadyAwaiting) => {}
                SubmitEvent::Refused(reason) => {
                    let text = match reason {
                        RefuseReason::MissingWallet => "connect a wallet to submit",
                        RefuseReason::MissingSocial => "connect a social handle to submit",
                        RefuseReason::ZeroScore => "score a point first",
                        RefuseReason::AlreadyAwaiting => unreachable!(),
                    };
                    self.submission = SubmissionState::Failed {
                        reason: text.to_string(),
                    };
                }
                SubmitEvent::Confirmed { reference } => {
                    self.pending = None;
                    self.submission = SubmissionState::Confirmed { reference };
                }
                SubmitEvent::Failed { reason } => {
                    self.submission = SubmissionState::Failed { reason };
                }
            }
        }
    }

    fn refresh_standings(&mut self) {
        if self.leaderboard_rx.has_changed().unwrap_or(false) {
            let snapshot = self.leaderboard_rx.borrow_and_update().clone();
            self.standings =
                compute_standings(&snapshot, self.identity.wallet_address.as_deref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::DryRunGate;
    use crate::leaderboard::{FileStore, LeaderboardStore};
    use crate::social::CastLogger;
    use crate::{Args, Palette};
    use std::sync::Arc;

    /// App with no terminal attached; the run loop is never entered.
    fn headless_app() -> App {
        let store = Arc::new(FileStore::in_memory());
        let submit = crate::submit::spawn_controller(
            &tokio::runtime::Handle::current(),
            Arc::new(DryRunGate),
            Arc::clone(&store) as Arc<dyn LeaderboardStore>,
            Arc::new(CastLogger),
            Identity::default(),
        );
        let args = Args {
            width: 10,
            height: 10,
            tick_ms: 150,
            theme: None,
            palette: Palette::Normal,
            config: None,
            address: None,
            username: None,
        };
        App::new(
            &args,
            Theme::default(),
            Identity::default(),
            submit,
            store.subscribe(),
        )
    }

    #[tokio::test]
    async fn awaiting_submission_keeps_its_pending_score() {
        let mut app = headless_app();
        app.pending = Some(PendingScore::new(80));
        app.submission = SubmissionState::AwaitingConfirmation;

        // A run ends while the gate is still confirming the 80: the new
        // score must not replace the value the transaction references.
        app.enter_game_over(20);
        assert_eq!(app.screen, Screen::GameOver);
        assert_eq!(app.pending.map(|p| p.value), Some(80));
        assert_eq!(app.submission, SubmissionState::AwaitingConfirmation);
    }

    #[tokio::test]
    async fn resolved_submission_is_replaced_by_the_next_run() {
        let mut app = headless_app();
        app.pending = Some(PendingScore::new(80));
        app.submission = SubmissionState::Failed {
            reason: "transaction rejected".to_string(),
        };

        // The failed 80 was retained for retry, but finishing another run
        // hands the slot to the fresh score.
        app.enter_game_over(20);
        assert_eq!(app.pending.map(|p| p.value), Some(20));
        assert_eq!(app.submission, SubmissionState::None);

        // A scoreless run clears the slot instead.
        app.enter_game_over(0);
        assert_eq!(app.pending, None);
    }
}
