// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// A key press reduced to what the history chords care about. `primary` is
/// Control, or Command where the terminal reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub key: char,
    pub primary: bool,
    pub shift: bool,
}

impl KeyChord {
    pub const fn primary(key: char) -> Self {
        Self {
            key,
            primary: true,
            shift: false,
        }
    }

    pub const fn primary_shift(key: char) -> Self {
        Self {
            key,
            primary: true,
            shift: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

pub fn history_action_for(chord: KeyChord) -> Option<HistoryAction> {
    if !chord.primary {
        return None;
    }
    // Some terminals report shift only through the uppercase letter.
    let shift = chord.shift || chord.key.is_ascii_uppercase();
    match chord.key.to_ascii_lowercase() {
        'z' if shift => Some(HistoryAction::Redo),
        'z' => Some(HistoryAction::Undo),
        'y' => Some(HistoryAction::Redo),
        _ => None,
    }
}

/// Undo/redo chords owned by one panel. Only an attached binding matches, and
/// attaching twice does not double-bind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UndoRedoBinding {
    attached: bool,
}

impl UndoRedoBinding {
    pub fn attach(&mut self) -> bool {
        let newly = !self.attached;
        self.attached = true;
        newly
    }

    pub fn detach(&mut self) -> bool {
        let was = self.attached;
        self.attached = false;
        was
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Returns the action for a matching chord; a match means the key is
    /// consumed and must not reach any other handler.
    pub fn dispatch(&self, chord: KeyChord) -> Option<HistoryAction> {
        if !self.attached {
            return None;
        }
        history_action_for(chord)
    }
}
