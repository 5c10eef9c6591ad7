use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use converse_core::{ChatState, SessionPhase, UiCommand};
use crossterm::event::{KeyCode, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Characters,
    Session,
    Logs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    None,
    Quit,
    Command(UiCommand),
}

pub struct App {
    pub tab: Tab,
    pub state: ChatState,
    pub selected_character: usize,
    pub should_quit: bool,
    pub logs: Arc<Mutex<VecDeque<String>>>,
    pub log_scroll: usize,
    pub log_auto_scroll: bool,
}

impl App {
    pub fn new(logs: Arc<Mutex<VecDeque<String>>>) -> Self {
        Self {
            tab: Tab::Characters,
            state: ChatState::default(),
            selected_character: 0,
            should_quit: false,
            logs,
            log_scroll: 0,
            log_auto_scroll: true,
        }
    }

    pub fn update_state(&mut self, new_state: ChatState) {
        self.state = new_state;
        // Clamp selection to valid range
        if !self.state.characters.is_empty()
            && self.selected_character >= self.state.characters.len()
        {
            self.selected_character = self.state.characters.len() - 1;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        // Global keys
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return AppAction::Quit;
            }
            KeyCode::Char('1') => {
                self.tab = Tab::Characters;
                return AppAction::None;
            }
            KeyCode::Char('2') => {
                self.tab = Tab::Session;
                return AppAction::None;
            }
            KeyCode::Char('3') => {
                self.tab = Tab::Logs;
                return AppAction::None;
            }
            _ => {}
        }

        match self.tab {
            Tab::Characters => self.handle_characters_key(key),
            Tab::Session => self.handle_session_key(key),
            Tab::Logs => self.handle_logs_key(key),
        }
    }

    fn handle_characters_key(&mut self, key: KeyEvent) -> AppAction {
        if let KeyCode::Char('R') = key.code {
            return AppAction::Command(UiCommand::RefreshCharacters);
        }

        if self.state.characters.is_empty() {
            return AppAction::None;
        }

        match key.code {
            KeyCode::Up => {
                if self.selected_character > 0 {
                    self.selected_character -= 1;
                }
                AppAction::None
            }
            KeyCode::Down => {
                if self.selected_character + 1 < self.state.characters.len() {
                    self.selected_character += 1;
                }
                AppAction::None
            }
            KeyCode::Enter => {
                let character = &self.state.characters[self.selected_character];
                self.tab = Tab::Session;
                AppAction::Command(UiCommand::OpenCharacter(character.id))
            }
            _ => AppAction::None,
        }
    }

    fn handle_session_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Char('r') => match self.state.phase {
                SessionPhase::Idle => AppAction::Command(UiCommand::StartRecording),
                SessionPhase::Recording => AppAction::Command(UiCommand::StopRecording),
                // Busy processing or playing — ignore, like the stages demand
                _ => AppAction::None,
            },
            KeyCode::Char('p') | KeyCode::Char(' ') => match self.state.phase {
                SessionPhase::Playing => AppAction::Command(UiCommand::StopPlayback),
                SessionPhase::Idle if self.state.response_bytes > 0 => {
                    AppAction::Command(UiCommand::PlayResponse)
                }
                _ => AppAction::None,
            },
            KeyCode::Char('s') if self.state.response_bytes > 0 => {
                AppAction::Command(UiCommand::SaveResponse)
            }
            _ => AppAction::None,
        }
    }

    fn handle_logs_key(&mut self, key: KeyEvent) -> AppAction {
        match key.code {
            KeyCode::Up => {
                self.log_scroll = self.log_scroll.saturating_add(1);
                self.log_auto_scroll = false;
                AppAction::None
            }
            KeyCode::Down => {
                self.log_scroll = self.log_scroll.saturating_sub(1);
                AppAction::None
            }
            KeyCode::Char('G') => {
                self.log_scroll = 0;
                self.log_auto_scroll = true;
                AppAction::None
            }
            _ => AppAction::None,
        }
    }
}
