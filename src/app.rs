use crate::events::Event;
use crate::models::PlacePrediction;
use crate::picker::PickerState;
use crate::state::LocationState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Something the main loop has to do on the app's behalf. Key handling stays
/// synchronous; anything that talks to the pipeline is returned as an action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    Clear,
    OpenPicker,
    ClosePicker,
    QueryChanged(String),
    Select(PlacePrediction),
    UseCurrentLocation,
}

#[derive(Debug, Default)]
pub struct App {
    pub location: LocationState,
    pub picker: PickerState,
    /// Row under the cursor in the picker. Row 0 is "Use current location",
    /// predictions follow.
    pub selected_index: usize,
    /// Search text as typed. Owned here rather than read back from
    /// `picker.query`, which lags behind queued key presses.
    pub query: String,
    pub tick_count: usize,
    pub should_quit: bool,
    pub picker_error: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a non-input event. Returns nothing; input goes through
    /// [`App::handle_key`] so the caller can dispatch the resulting action.
    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::Tick => self.tick_count = self.tick_count.wrapping_add(1),
            Event::Location(state) => self.location = state,
            Event::Picker(state) => {
                if !state.visible {
                    self.query.clear();
                    self.picker_error = None;
                }
                self.picker = state;
                self.selected_index = self.selected_index.min(self.row_count() - 1);
            }
            Event::PickerError(message) => self.picker_error = Some(message),
            Event::Input(_) => {}
        }
    }

    fn row_count(&self) -> usize {
        self.picker.predictions.len() + 1
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Some(Action::Quit);
        }

        if self.picker.visible {
            return self.handle_picker_key(key);
        }

        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Some(Action::Quit)
            }
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('c') => Some(Action::Clear),
            KeyCode::Char('l') | KeyCode::Enter => {
                self.picker.visible = true;
                self.query.clear();
                self.selected_index = 0;
                self.picker_error = None;
                Some(Action::OpenPicker)
            }
            _ => None,
        }
    }

    fn handle_picker_key(&mut self, key: KeyEvent) -> Option<Action> {
        match key.code {
            KeyCode::Esc => {
                self.picker.visible = false;
                self.query.clear();
                Some(Action::ClosePicker)
            }
            KeyCode::Down => {
                self.selected_index = (self.selected_index + 1) % self.row_count();
                None
            }
            KeyCode::Up => {
                self.selected_index = self
                    .selected_index
                    .checked_sub(1)
                    .unwrap_or(self.row_count() - 1);
                None
            }
            KeyCode::Enter => {
                // Block double submits while details are loading.
                if self.picker.is_selecting {
                    return None;
                }
                match self.selected_index {
                    0 => Some(Action::UseCurrentLocation),
                    i => self
                        .picker
                        .predictions
                        .get(i - 1)
                        .cloned()
                        .map(Action::Select),
                }
            }
            KeyCode::Backspace => {
                self.query.pop()?;
                Some(self.query_changed())
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                Some(self.query_changed())
            }
            _ => None,
        }
    }

    fn query_changed(&mut self) -> Action {
        self.selected_index = 0;
        self.picker_error = None;
        Action::QueryChanged(self.query.clone())
    }
}
