// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::TableName;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPanel {
    Grid,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_table: TableName,
    pub focus: FocusPanel,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_table: TableName::Organizations,
            focus: FocusPanel::Grid,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTable,
    PrevTable,
    EnterEditMode,
    ExitToNav,
    ToggleFocus,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TableChanged(TableName),
    FocusChanged(FocusPanel),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTable => self.rotate_table(1),
            AppCommand::PrevTable => self.rotate_table(-1),
            AppCommand::EnterEditMode => {
                self.mode = AppMode::Edit;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode), self.set_status("nav")]
            }
            AppCommand::ToggleFocus => {
                self.focus = match self.focus {
                    FocusPanel::Grid => FocusPanel::Map,
                    FocusPanel::Map => FocusPanel::Grid,
                };
                let label = match self.focus {
                    FocusPanel::Grid => "grid focused",
                    FocusPanel::Map => "map focused",
                };
                vec![AppEvent::FocusChanged(self.focus), self.set_status(label)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_table(&mut self, delta: isize) -> Vec<AppEvent> {
        let tables = TableName::ALL;
        let current = tables
            .iter()
            .position(|table| *table == self.active_table)
            .unwrap_or(0) as isize;
        let len = tables.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_table = tables[next];
        vec![AppEvent::TableChanged(self.active_table)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppMode, AppState, FocusPanel};
    use crate::TableName;

    #[test]
    fn table_rotation_wraps() {
        let mut state = AppState {
            active_table: TableName::Assets,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextTable);
        assert_eq!(state.active_table, TableName::Organizations);
        assert_eq!(events, vec![AppEvent::TableChanged(TableName::Organizations)]);

        state.dispatch(AppCommand::PrevTable);
        assert_eq!(state.active_table, TableName::Assets);
    }

    #[test]
    fn toggle_focus_alternates_panels() {
        let mut state = AppState::default();

        let events = state.dispatch(AppCommand::ToggleFocus);
        assert_eq!(state.focus, FocusPanel::Map);
        assert_eq!(
            events,
            vec![
                AppEvent::FocusChanged(FocusPanel::Map),
                AppEvent::StatusUpdated("map focused".to_owned()),
            ],
        );

        state.dispatch(AppCommand::ToggleFocus);
        assert_eq!(state.focus, FocusPanel::Grid);
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::EnterEditMode);
        assert_eq!(state.mode, AppMode::Edit);

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(state.status_line.as_deref(), Some("nav"));
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::SetStatus("saved".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("saved"));

        let events = state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
        assert_eq!(events, vec![AppEvent::StatusCleared]);
    }
}
