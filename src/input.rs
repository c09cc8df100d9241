//! Key bindings: arrows, WASD and vim-style movement plus game-flow keys.

use crate::game::Direction;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press. Directional intents are staged in the engine's
/// single-slot buffer; rapid presses between two ticks collapse to the last.
/// Screen-specific keys (submit/discard/restart on the game-over screen) are
/// matched on the raw key code by the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Turn(Direction),
    Pause,
    /// Start a run from the menu (Enter/Space).
    Start,
    Quit,
    None,
}

/// Map key event to action. Supports arrows, WASD and vim (hjkl).
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('c') if modifiers == KeyModifiers::CONTROL => Action::Quit,
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') if no_mod => {
            Action::Turn(Direction::Up)
        }
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') if no_mod => {
            Action::Turn(Direction::Down)
        }
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') if no_mod => {
            Action::Turn(Direction::Left)
        }
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') if no_mod => {
            Action::Turn(Direction::Right)
        }
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Start,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn action(code: KeyCode) -> Action {
        key_to_action(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn arrows_wasd_and_vim_turn() {
        assert_eq!(action(KeyCode::Up), Action::Turn(Direction::Up));
        assert_eq!(action(KeyCode::Char('s')), Action::Turn(Direction::Down));
        assert_eq!(action(KeyCode::Char('h')), Action::Turn(Direction::Left));
        assert_eq!(action(KeyCode::Char('l')), Action::Turn(Direction::Right));
    }

    #[test]
    fn flow_keys() {
        assert_eq!(action(KeyCode::Enter), Action::Start);
        assert_eq!(action(KeyCode::Char('p')), Action::Pause);
        assert_eq!(action(KeyCode::Esc), Action::Quit);
        assert_eq!(action(KeyCode::Char('?')), Action::None);
    }

    #[test]
    fn modified_keys_are_ignored() {
        let ev = KeyEvent {
            code: KeyCode::Up,
            modifiers: KeyModifiers::ALT,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        };
        assert_eq!(key_to_action(ev), Action::None);
    }
}
