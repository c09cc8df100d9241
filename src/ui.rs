//! Layout and drawing: menu, board, sidebar chrome, leaderboard panel,
//! pending-score panel, game-over overlay.

use crate::app::Screen;
use crate::game::{EndReason, GameStatus, Point, SnakeGame};
use crate::rank::{Standings, TOP_N};
use crate::submit::{Identity, PendingScore, SubmissionState, short_address};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::time::Instant;
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Each grid cell is two terminal columns wide so cells are roughly square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 34;

/// Game-over fade length in ms.
const GAME_OVER_FADE_MS: u32 = 500;

/// Board rect (border included) for the given area; sidebar sits to its right.
fn board_rect(area: Rect, game: &SnakeGame) -> Rect {
    let bw = game.width() as u16 * CELL_WIDTH + 2;
    let bh = game.height() as u16 + 2;
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    Rect::new(x, y, bw.min(area.width), bh.min(area.height))
}

/// Largest grid (in cells) whose board plus sidebar fits the terminal.
pub fn max_grid_for_terminal(term_cols: u16, term_rows: u16) -> (u16, u16) {
    let w = term_cols
        .saturating_sub(2 + SIDEBAR_WIDTH)
        .checked_div(CELL_WIDTH)
        .unwrap_or(0);
    let h = term_rows.saturating_sub(2);
    (w.max(1), h.max(1))
}

#[allow(clippy::too_many_arguments)]
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    game: &SnakeGame,
    theme: &Theme,
    standings: &Standings,
    identity: &Identity,
    pending: Option<PendingScore>,
    submission: &SubmissionState,
    paused: bool,
    game_over_effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    let board = board_rect(area, game);

    match screen {
        Screen::Menu => draw_menu(frame, board, theme, identity),
        Screen::Playing | Screen::GameOver => {
            draw_board(frame, board, game, theme);
            if paused {
                draw_centered_overlay(frame, board, theme, &["PAUSED", "p to resume"]);
            }
            if screen == Screen::GameOver {
                apply_game_over_effect(frame, board, theme, game_over_effect, effect_time, now);
                draw_game_over(frame, board, game, theme, pending, submission);
            }
        }
    }

    let sidebar = Rect::new(
        (board.x + board.width).min(area.x + area.width),
        board.y,
        SIDEBAR_WIDTH,
        board.height.max(20),
    )
    .intersection(area);
    draw_sidebar(
        frame, sidebar, game, theme, standings, identity, pending, submission, screen,
    );
}

fn draw_menu(frame: &mut Frame, board: Rect, theme: &Theme, identity: &Identity) {
    let mut lines = vec![
        Line::styled(
            "🐍 S N A K E C A S T",
            Style::default()
                .fg(theme.title)
                .add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
        Line::styled("Eat food, grow, don't crash.", Style::default().fg(theme.main_fg)),
        Line::styled("Each food is worth 10 points.", Style::default().fg(theme.main_fg)),
        Line::raw(""),
        Line::styled("Enter/Space  start", Style::default().fg(theme.main_fg)),
        Line::styled("arrows/wasd/hjkl  steer", Style::default().fg(theme.main_fg)),
        Line::styled("p pause · q quit", Style::default().fg(theme.inactive_fg)),
        Line::raw(""),
    ];
    if identity.wallet_address.is_none() || identity.username.is_none() {
        lines.push(Line::styled(
            "configure identity to submit scores",
            Style::default().fg(theme.inactive_fg),
        ));
    }
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line));
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(block),
        board,
    );
}

fn draw_board(frame: &mut Frame, board: Rect, game: &SnakeGame, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line));
    let inner = block.inner(board);
    frame.render_widget(block, board);

    let head = game.head();
    let snake: std::collections::HashSet<Point> = game.snake().collect();
    let food = game.food();

    let mut rows = Vec::with_capacity(game.height() as usize);
    for y in 0..game.height() {
        let mut spans = Vec::with_capacity(game.width() as usize);
        for x in 0..game.width() {
            let p = Point::new(x, y);
            let bg = if head == Some(p) {
                theme.snake_head
            } else if snake.contains(&p) {
                theme.snake
            } else if food == Some(p) {
                theme.food
            } else {
                theme.bg
            };
            spans.push(Span::styled("  ", Style::default().bg(bg)));
        }
        rows.push(Line::from(spans));
    }
    frame.render_widget(Paragraph::new(rows), inner);
}

fn draw_centered_overlay(frame: &mut Frame, board: Rect, theme: &Theme, text: &[&str]) {
    let h = text.len() as u16;
    let rect = Rect::new(
        board.x + 1,
        board.y + board.height.saturating_sub(h) / 2,
        board.width.saturating_sub(2),
        h.min(board.height),
    );
    let lines: Vec<Line> = text
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let style = if i == 0 {
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.main_fg)
            };
            Line::styled(*t, style)
        })
        .collect();
    frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center),
        rect,
    );
}

fn draw_game_over(
    frame: &mut Frame,
    board: Rect,
    game: &SnakeGame,
    theme: &Theme,
    pending: Option<PendingScore>,
    submission: &SubmissionState,
) {
    let headline = match game.end_reason() {
        Some(EndReason::BoardFull) => "BOARD CLEARED!",
        Some(EndReason::HitWall) => "GAME OVER — hit the wall",
        Some(EndReason::HitSelf) => "GAME OVER — bit yourself",
        None => "GAME OVER",
    };
    let score_line = format!("score {}", game.score());
    let hint = match (pending, submission) {
        (Some(_), SubmissionState::AwaitingConfirmation) => "processing transaction…",
        (Some(_), SubmissionState::Failed { .. }) => "Enter retry · x discard · r play again",
        (Some(_), _) => "Enter submit · x discard · r play again",
        (None, _) => "r play again · q quit",
    };
    draw_centered_overlay(frame, board, theme, &[headline, &score_line, "", hint]);
}

#[allow(clippy::too_many_arguments)]
fn draw_sidebar(
    frame: &mut Frame,
    sidebar: Rect,
    game: &SnakeGame,
    theme: &Theme,
    standings: &Standings,
    identity: &Identity,
    pending: Option<PendingScore>,
    submission: &SubmissionState,
    screen: Screen,
) {
    let fg = Style::default().fg(theme.main_fg);
    let dim = Style::default().fg(theme.inactive_fg);
    let title = Style::default()
        .fg(theme.title)
        .add_modifier(Modifier::BOLD);
    let accent = Style::default().fg(theme.accent);

    let mut lines = vec![Line::styled("SNAKECAST", title)];
    if screen != Screen::Menu {
        let status = match game.status() {
            GameStatus::Paused => " (paused)",
            GameStatus::GameOver => " (over)",
            _ => "",
        };
        lines.push(Line::styled(format!("score {}{}", game.score(), status), fg));
    }
    if let Some(you) = &standings.you {
        lines.push(Line::styled(format!("best  {}", you.entry.score), dim));
    }
    lines.push(Line::raw(""));

    // Identity chrome: both halves must be present to submit.
    match &identity.wallet_address {
        Some(a) => lines.push(Line::from(vec![
            Span::styled("wallet ", dim),
            Span::styled(short_address(a), fg),
        ])),
        None => lines.push(Line::styled("wallet not connected", dim)),
    }
    match &identity.username {
        Some(u) => lines.push(Line::from(vec![
            Span::styled("cast   ", dim),
            Span::styled(format!("@{u}"), fg),
        ])),
        None => lines.push(Line::styled("cast   not connected", dim)),
    }
    lines.push(Line::raw(""));

    lines.push(Line::styled("🏆 LEADERBOARD", title));
    if standings.top.is_empty() {
        lines.push(Line::styled("no scores yet — be the first!", dim));
    }
    let own = identity.wallet_address.as_deref();
    for ranked in &standings.top {
        let medal = match ranked.rank {
            1 => "🥇".to_string(),
            2 => "🥈".to_string(),
            3 => "🥉".to_string(),
            n => format!("{n:2}."),
        };
        let is_you = own == Some(ranked.entry.identity.as_str());
        let style = if is_you {
            Style::default()
                .fg(theme.snake)
                .add_modifier(Modifier::BOLD)
        } else {
            fg
        };
        lines.push(Line::styled(
            format!(
                "{medal} {:<14} {:>5}",
                truncate(&ranked.entry.display_name, 14),
                ranked.entry.score
            ),
            style,
        ));
    }
    if let Some(you) = &standings.you {
        if you.rank > TOP_N {
            lines.push(Line::styled("────────", dim));
            lines.push(Line::styled(
                format!(
                    "#{} {:<14} {:>5}",
                    you.rank,
                    truncate(&you.entry.display_name, 14),
                    you.entry.score
                ),
                Style::default()
                    .fg(theme.snake)
                    .add_modifier(Modifier::BOLD),
            ));
        }
    }
    lines.push(Line::raw(""));

    if let Some(p) = pending {
        lines.push(Line::styled(format!("pending score: {}", p.value), accent));
        match submission {
            SubmissionState::None => {
                if identity.wallet_address.is_none() {
                    lines.push(Line::styled("connect a wallet to submit", dim));
                } else if identity.username.is_none() {
                    lines.push(Line::styled("connect a social handle to submit", dim));
                }
            }
            SubmissionState::AwaitingConfirmation => {
                lines.push(Line::styled("⏳ processing transaction…", accent));
            }
            SubmissionState::Confirmed { reference } => {
                lines.push(Line::styled("✅ saved to leaderboard", fg));
                if let Some(r) = reference {
                    lines.push(Line::styled(format!("tx {}", short_address(r)), dim));
                }
            }
            SubmissionState::Failed { reason } => {
                lines.push(Line::styled(format!("❌ {}", truncate(reason, 30)), fg));
                lines.push(Line::styled("Enter to retry, x to discard", dim));
            }
        }
    } else if let SubmissionState::Confirmed { reference } = submission {
        lines.push(Line::styled("✅ saved to leaderboard", fg));
        if let Some(r) = reference {
            lines.push(Line::styled(format!("tx {}", short_address(r)), dim));
        }
    }

    frame.render_widget(Paragraph::new(lines), sidebar);
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Dim the board once per game over; same lazy-effect pattern as a
/// line-clear fade.
fn apply_game_over_effect(
    frame: &mut Frame,
    board: Rect,
    theme: &Theme,
    effect: &mut Option<Effect>,
    effect_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = effect_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let tfx_delta = TfxDuration::from_millis(delta.as_millis().min(u128::from(u32::MAX)) as u32);
    *effect_time = Some(now);

    if effect.is_none() {
        *effect = Some(
            fx::fade_to(
                theme.inactive_fg,
                theme.bg,
                (GAME_OVER_FADE_MS, Interpolation::Linear),
            )
            .with_area(board),
        );
    }
    if let Some(effect) = effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}
