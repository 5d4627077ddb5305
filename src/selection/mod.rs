//! Keyboard-driven selection over one resolved list
//!
//! Two states: `Hidden` (no list) and `Visible` with a cursor that always
//! points inside the list. An empty list is never visible.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::{ActionIntent, CommandResult};

#[derive(Debug, Clone, Default)]
pub enum SelectionState {
    #[default]
    Hidden,
    Visible {
        results: Vec<CommandResult>,
        index: usize,
    },
}

/// The intent produced by executing a selection, with the item it came from
#[derive(Debug, Clone)]
pub struct ExecutedSelection {
    pub intent: ActionIntent,
    pub item: CommandResult,
}

/// What a key press did to the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not handled; the caller should fall through to its own handling
    Ignored,
    /// Consumed; the cursor now points at this index (possibly unchanged)
    Moved(usize),
    /// Consumed; the caller should run [`SelectionState::execute_selected`]
    Execute,
}

impl KeyOutcome {
    pub fn consumed(&self) -> bool {
        !matches!(self, KeyOutcome::Ignored)
    }
}

impl SelectionState {
    pub fn new() -> Self {
        Self::Hidden
    }

    /// Show a fresh list with the cursor on the first entry
    pub fn show(&mut self, results: Vec<CommandResult>) {
        *self = if results.is_empty() {
            SelectionState::Hidden
        } else {
            SelectionState::Visible { results, index: 0 }
        };
    }

    pub fn hide(&mut self) {
        *self = SelectionState::Hidden;
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, SelectionState::Visible { .. })
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            SelectionState::Visible { index, .. } => Some(*index),
            SelectionState::Hidden => None,
        }
    }

    pub fn results(&self) -> &[CommandResult] {
        match self {
            SelectionState::Visible { results, .. } => results,
            SelectionState::Hidden => &[],
        }
    }

    pub fn selected(&self) -> Option<&CommandResult> {
        match self {
            SelectionState::Visible { results, index } => results.get(*index),
            SelectionState::Hidden => None,
        }
    }

    /// Move the cursor by `delta`; out-of-range moves are ignored
    ///
    /// Returns whether the cursor moved.
    pub fn move_selection(&mut self, delta: isize) -> bool {
        let Some(current) = self.index() else {
            return false;
        };
        match current.checked_add_signed(delta) {
            Some(target) => self.set_selected(target),
            None => false,
        }
    }

    /// Point the cursor at `target` if it is inside the list
    pub fn set_selected(&mut self, target: usize) -> bool {
        match self {
            SelectionState::Visible { results, index } if target < results.len() => {
                let moved = *index != target;
                *index = target;
                moved
            }
            _ => false,
        }
    }

    /// Run the selected item's action
    ///
    /// Returns `None` when hidden or when the item is label-only.
    pub async fn execute_selected(&self) -> Option<ExecutedSelection> {
        let item = self.selected()?;
        let action = item.action.as_ref()?;
        let intent = action.invoke().await;
        tracing::debug!(id = %item.id, intent = intent.name(), "Executed selection");
        Some(ExecutedSelection {
            intent,
            item: item.clone(),
        })
    }

    /// Navigation keys: Up/Down, Tab/Shift+Tab and Enter
    ///
    /// Consumed only while a non-empty list is visible.
    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if !self.is_visible() {
            return KeyOutcome::Ignored;
        }
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        let delta = match key.code {
            KeyCode::Down => 1,
            KeyCode::Up => -1,
            KeyCode::Tab if shift => -1,
            KeyCode::Tab => 1,
            KeyCode::BackTab => -1,
            KeyCode::Enter if !shift => return KeyOutcome::Execute,
            _ => return KeyOutcome::Ignored,
        };
        self.move_selection(delta);
        match self.index() {
            Some(index) => KeyOutcome::Moved(index),
            None => KeyOutcome::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ResultKind;

    fn list(n: usize) -> Vec<CommandResult> {
        (0..n)
            .map(|i| {
                CommandResult::new(format!("r{i}"), format!("Result {i}"), "", ResultKind::Action)
                    .with_intent(ActionIntent::Copy {
                        text: i.to_string(),
                    })
            })
            .collect()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_show_empty_hides() {
        let mut state = SelectionState::new();
        state.show(list(2));
        assert_eq!(state.index(), Some(0));
        assert_eq!(state.results().len(), 2);
        state.show(Vec::new());
        assert!(!state.is_visible());
        assert!(state.results().is_empty());
    }

    #[test]
    fn test_move_is_bounded_without_wraparound() {
        let mut state = SelectionState::new();
        state.show(list(3));

        assert!(!state.move_selection(-1));
        assert_eq!(state.index(), Some(0));
        assert!(state.move_selection(2));
        assert!(!state.move_selection(1));
        assert_eq!(state.index(), Some(2));
        assert!(!state.move_selection(isize::MIN));
        assert_eq!(state.index(), Some(2));
    }

    #[test]
    fn test_set_selected_bounds() {
        let mut state = SelectionState::new();
        assert!(!state.set_selected(0));
        state.show(list(2));
        assert!(state.set_selected(1));
        assert!(!state.set_selected(5));
        assert_eq!(state.index(), Some(1));
    }

    #[test]
    fn test_show_resets_cursor() {
        let mut state = SelectionState::new();
        state.show(list(3));
        state.set_selected(2);
        state.show(list(3));
        assert_eq!(state.index(), Some(0));
    }

    #[test]
    fn test_keys_only_consumed_while_visible() {
        let mut state = SelectionState::new();
        assert_eq!(state.handle_key(key(KeyCode::Down)), KeyOutcome::Ignored);
        assert_eq!(state.handle_key(key(KeyCode::Enter)), KeyOutcome::Ignored);

        state.show(list(3));
        assert_eq!(state.handle_key(key(KeyCode::Down)), KeyOutcome::Moved(1));
        assert_eq!(state.handle_key(key(KeyCode::Tab)), KeyOutcome::Moved(2));
        assert_eq!(state.handle_key(key(KeyCode::Tab)), KeyOutcome::Moved(2));
        assert_eq!(state.handle_key(key(KeyCode::BackTab)), KeyOutcome::Moved(1));
        assert_eq!(
            state.handle_key(KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT)),
            KeyOutcome::Moved(0)
        );
        assert_eq!(state.handle_key(key(KeyCode::Up)), KeyOutcome::Moved(0));
        assert_eq!(state.handle_key(key(KeyCode::Enter)), KeyOutcome::Execute);
        assert_eq!(
            state.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)),
            KeyOutcome::Ignored
        );
        assert_eq!(state.handle_key(key(KeyCode::Esc)), KeyOutcome::Ignored);
        assert!(!state.handle_key(key(KeyCode::Esc)).consumed());
        assert!(state.handle_key(key(KeyCode::Up)).consumed());
    }

    #[tokio::test]
    async fn test_execute_selected() {
        let mut state = SelectionState::new();
        assert!(state.execute_selected().await.is_none());

        let mut results = list(2);
        results.push(CommandResult::new("hint", "Keep typing", "", ResultKind::System));
        state.show(results);
        state.set_selected(1);

        let executed = state.execute_selected().await.unwrap();
        assert_eq!(executed.item.id, "r1");
        assert_eq!(
            executed.intent,
            ActionIntent::Copy {
                text: "1".to_string()
            }
        );

        state.set_selected(2);
        assert!(state.execute_selected().await.is_none());
    }
}
