// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod map;

pub use map::{COUNTRIES, Country, CountryMap, MapPanel};

use adsdesk_app::{
    AppCommand, AppEvent, AppMode, AppState, CellEditor, ColumnKind, EditorInput, FocusPanel,
    HistoryAction, KeyChord, NewRowInput, Notification, Record, RowId, TableName, UndoRedoBinding,
    display_value, field_value, record_id, validate_field,
};
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use serde_json::Value;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::debug;

const CELL_PREVIEW_CHARS: usize = 28;

/// Everything the terminal app needs from the outside world.
pub trait AppRuntime {
    fn load_table(&mut self, table: TableName) -> Result<Vec<Record>>;
    fn commit_edit(
        &mut self,
        table: TableName,
        row_id: &RowId,
        field: &str,
        value: Value,
    ) -> Result<bool>;
    fn create_row(&mut self, input: &NewRowInput) -> Result<Record>;
    fn delete_row(&mut self, table: TableName, row_id: &RowId) -> Result<()>;
    fn undo_last_edit(&mut self) -> Result<bool>;
    fn redo_last_edit(&mut self) -> Result<bool>;
    fn generate_persona_image(&mut self, row_id: &RowId) -> Result<String>;
    fn public_url(&self, path: &str) -> String;
    fn take_notifications(&mut self) -> Vec<Notification>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct GridUiState {
    selected_row: usize,
    selected_col: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct EditorUiState {
    table: TableName,
    row_id: RowId,
    editor: CellEditor,
}

#[derive(Debug, Default)]
struct ViewData {
    rows: Vec<Record>,
    grid: GridUiState,
    editor: Option<EditorUiState>,
    new_row: Option<String>,
    map: MapPanel,
    undo_binding: UndoRedoBinding,
    help_visible: bool,
    status_token: u64,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    view_data.map.load(CountryMap::world());
    sync_undo_binding(state, &mut view_data);
    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, runtime, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event
            && let Event::Key(key) = event::read().context("read event")?
            && handle_key_event(state, runtime, &mut view_data, &internal_tx, key)
        {
            break;
        }
    }

    view_data.undo_binding.detach();
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

/// Shows the most recent notification from the runtime, or `fallback` when
/// the runtime had nothing to say. A failed `reload` after the write is
/// appended so stale rows never pass silently.
fn emit_outcome<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    reload: Result<()>,
    fallback: impl Into<String>,
) {
    let message = runtime
        .take_notifications()
        .pop()
        .map_or_else(|| fallback.into(), |notification| notification.status_text());
    let message = match reload {
        Ok(()) => message,
        Err(error) => format!("{message}; reload failed: {error}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
            emit_status(state, view_data, internal_tx, "help hidden");
        }
        return false;
    }

    if view_data.editor.is_some() {
        handle_editor_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if view_data.new_row.is_some() {
        handle_new_row_key(state, runtime, view_data, internal_tx, key);
        return false;
    }

    if let Some(chord) = key_chord(key)
        && let Some(action) = view_data.undo_binding.dispatch(chord)
    {
        apply_history_action(state, runtime, view_data, internal_tx, action);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => {
            state.dispatch(AppCommand::ToggleFocus);
            sync_undo_binding(state, view_data);
            bump_status_token(view_data, internal_tx);
            return false;
        }
        (KeyCode::Char('?'), _) => {
            view_data.help_visible = true;
            return false;
        }
        _ => {}
    }

    match state.focus {
        FocusPanel::Grid => handle_grid_key(state, runtime, view_data, internal_tx, key),
        FocusPanel::Map => handle_map_key(state, view_data, internal_tx, key),
    }
    false
}

fn key_chord(key: KeyEvent) -> Option<KeyChord> {
    let KeyCode::Char(ch) = key.code else {
        return None;
    };
    Some(KeyChord {
        key: ch,
        primary: key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER),
        shift: key.modifiers.contains(KeyModifiers::SHIFT),
    })
}

// The grid owns the undo/redo chords; they go away while the map has focus.
fn sync_undo_binding(state: &AppState, view_data: &mut ViewData) {
    let changed = match state.focus {
        FocusPanel::Grid => view_data.undo_binding.attach(),
        FocusPanel::Map => view_data.undo_binding.detach(),
    };
    if changed {
        debug!(attached = view_data.undo_binding.is_attached(), "undo binding");
    }
}

fn bump_status_token(view_data: &mut ViewData, internal_tx: &Sender<InternalEvent>) {
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn apply_history_action<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    action: HistoryAction,
) {
    let (outcome, label) = match action {
        HistoryAction::Undo => (runtime.undo_last_edit(), "undo"),
        HistoryAction::Redo => (runtime.redo_last_edit(), "redo"),
    };
    match outcome {
        Ok(true) => {
            runtime.take_notifications();
            if let Err(error) = refresh_view_data(state, runtime, view_data) {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("reload failed: {error}"),
                );
            } else {
                emit_status(state, view_data, internal_tx, format!("{label} applied"));
            }
        }
        Ok(false) => emit_status(state, view_data, internal_tx, format!("nothing to {label}")),
        Err(error) => {
            runtime.take_notifications();
            let reload = refresh_view_data(state, runtime, view_data);
            emit_outcome(
                state,
                runtime,
                view_data,
                internal_tx,
                reload,
                format!("{label} failed: {error}"),
            );
        }
    }
}

fn handle_grid_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j') | KeyCode::Down, _) => move_row(view_data, 1),
        (KeyCode::Char('k') | KeyCode::Up, _) => move_row(view_data, -1),
        (KeyCode::Char('l') | KeyCode::Right, _) => move_col(state, view_data, 1),
        (KeyCode::Char('h') | KeyCode::Left, _) => move_col(state, view_data, -1),
        (KeyCode::Char('g'), KeyModifiers::NONE) => view_data.grid.selected_row = 0,
        (KeyCode::Char('G'), _) => {
            view_data.grid.selected_row = view_data.rows.len().saturating_sub(1);
        }
        (KeyCode::Char('f'), KeyModifiers::NONE) => {
            switch_table(state, runtime, view_data, internal_tx, AppCommand::NextTable);
        }
        (KeyCode::Char('b'), KeyModifiers::NONE) => {
            switch_table(state, runtime, view_data, internal_tx, AppCommand::PrevTable);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            match refresh_view_data(state, runtime, view_data) {
                Ok(()) => emit_status(state, view_data, internal_tx, "reloaded"),
                Err(error) => emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("load failed: {error}"),
                ),
            }
        }
        (KeyCode::Enter | KeyCode::Char('e'), _) => {
            open_cell_editor(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('a'), KeyModifiers::NONE) => {
            view_data.new_row = Some(String::new());
            state.dispatch(AppCommand::EnterEditMode);
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            delete_selected_row(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('p'), KeyModifiers::NONE) => {
            generate_selected_persona_image(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
}

fn handle_map_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if !view_data.map.selection.is_ready() {
        return;
    }
    let highlighted = view_data.map.highlighted().map(|country| country.id.clone());
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => view_data.map.move_cursor(1),
        KeyCode::Char('k') | KeyCode::Up => view_data.map.move_cursor(-1),
        KeyCode::Enter => {
            if let Some(id) = highlighted {
                view_data.map.selection.select(id);
                let summary = view_data.map.summary();
                emit_status(state, view_data, internal_tx, summary);
            }
        }
        KeyCode::Char('x') => {
            if let Some(id) = highlighted {
                view_data.map.selection.exclude(id);
                let summary = view_data.map.summary();
                emit_status(state, view_data, internal_tx, summary);
            }
        }
        KeyCode::Char('c') => {
            view_data.map.selection.clear_selection();
            emit_status(state, view_data, internal_tx, "selection cleared");
        }
        KeyCode::Char('X') => {
            view_data.map.selection.clear_exclusion();
            emit_status(state, view_data, internal_tx, "exclusion cleared");
        }
        _ => {}
    }
}

fn switch_table<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::TableChanged(_)))
    {
        view_data.grid = GridUiState::default();
        if let Err(error) = refresh_view_data(state, runtime, view_data) {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("load failed: {error}"),
            );
        }
    }
}

fn move_row(view_data: &mut ViewData, delta: isize) {
    let max = view_data.rows.len().saturating_sub(1);
    view_data.grid.selected_row = view_data
        .grid
        .selected_row
        .saturating_add_signed(delta)
        .min(max);
}

fn move_col(state: &AppState, view_data: &mut ViewData, delta: isize) {
    let max = state.active_table.columns().len().saturating_sub(1);
    view_data.grid.selected_col = view_data
        .grid
        .selected_col
        .saturating_add_signed(delta)
        .min(max);
}

fn selected_row(view_data: &ViewData) -> Option<(RowId, &Record)> {
    let row = view_data.rows.get(view_data.grid.selected_row)?;
    Some((record_id(row)?, row))
}

fn open_cell_editor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let table = state.active_table;
    let Some(column) = table.columns().get(view_data.grid.selected_col) else {
        return;
    };
    let Some((row_id, row)) = selected_row(view_data) else {
        emit_status(state, view_data, internal_tx, "no row selected");
        return;
    };
    let current = field_value(row, column.field);
    let Some(editor) = CellEditor::open(column, &current) else {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("{} is read-only", column.label),
        );
        return;
    };
    if column.kind == ColumnKind::Image
        && let Some(path) = editor.preview_path()
    {
        let url = runtime.public_url(path);
        emit_status(state, view_data, internal_tx, format!("preview: {url}"));
    }
    view_data.editor = Some(EditorUiState {
        table,
        row_id,
        editor,
    });
    state.dispatch(AppCommand::EnterEditMode);
}

fn handle_editor_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(ui) = view_data.editor.as_mut() else {
        return;
    };
    let multiline = matches!(ui.editor, CellEditor::Text { multiline: true, .. });
    let is_select = matches!(ui.editor, CellEditor::Select { .. });

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            if let Some(ui) = view_data.editor.take() {
                let field = ui.editor.field();
                let kept = ui.editor.cancel();
                debug!(field, kept = %display_value(&kept), "edit canceled");
            }
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "edit canceled");
        }
        (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            commit_cell_editor(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Enter, _) if multiline => ui.editor.apply(EditorInput::Newline),
        (KeyCode::Enter, _) => commit_cell_editor(state, runtime, view_data, internal_tx),
        (KeyCode::Backspace, _) => ui.editor.apply(EditorInput::Backspace),
        (KeyCode::Right | KeyCode::Down, _) if is_select => {
            ui.editor.apply(EditorInput::NextOption);
        }
        (KeyCode::Left | KeyCode::Up, _) if is_select => ui.editor.apply(EditorInput::PrevOption),
        (KeyCode::Char('j' | 'l'), _) if is_select => ui.editor.apply(EditorInput::NextOption),
        (KeyCode::Char('k' | 'h'), _) if is_select => ui.editor.apply(EditorInput::PrevOption),
        (KeyCode::Char(ch), modifiers)
            if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            ui.editor.apply(EditorInput::Char(ch));
        }
        _ => {}
    }
}

fn commit_cell_editor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(ui) = view_data.editor.take() else {
        return;
    };
    let field = ui.editor.field();
    let draft = ui.editor.draft();
    if let Err(error) = validate_field(ui.table, field, &draft) {
        emit_status(state, view_data, internal_tx, error.to_string());
        view_data.editor = Some(ui);
        return;
    }

    state.dispatch(AppCommand::ExitToNav);
    let Some(value) = ui.editor.commit() else {
        emit_status(state, view_data, internal_tx, "no change");
        return;
    };
    match runtime.commit_edit(ui.table, &ui.row_id, field, value) {
        Ok(_) => {
            let reload = refresh_view_data(state, runtime, view_data);
            emit_outcome(
                state,
                runtime,
                view_data,
                internal_tx,
                reload,
                format!("saved {field}"),
            );
        }
        Err(error) => {
            let reload = refresh_view_data(state, runtime, view_data);
            emit_outcome(
                state,
                runtime,
                view_data,
                internal_tx,
                reload,
                format!("save failed: {error}"),
            );
        }
    }
}

fn handle_new_row_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(title) = view_data.new_row.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.new_row = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            title.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => title.push(ch),
        KeyCode::Enter => {
            let input = NewRowInput::new(state.active_table, title.clone());
            if let Err(error) = input.validate() {
                emit_status(state, view_data, internal_tx, error.to_string());
                return;
            }
            view_data.new_row = None;
            state.dispatch(AppCommand::ExitToNav);
            let outcome = runtime.create_row(&input);
            let reload = refresh_view_data(state, runtime, view_data);
            match outcome {
                Ok(record) => {
                    if let Some(id) = record_id(&record)
                        && let Some(index) = view_data
                            .rows
                            .iter()
                            .position(|row| record_id(row).as_ref() == Some(&id))
                    {
                        view_data.grid.selected_row = index;
                    }
                    emit_outcome(state, runtime, view_data, internal_tx, reload, "row created");
                }
                Err(error) => emit_outcome(
                    state,
                    runtime,
                    view_data,
                    internal_tx,
                    reload,
                    format!("create failed: {error}"),
                ),
            }
        }
        _ => {}
    }
}

fn delete_selected_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some((row_id, _)) = selected_row(view_data) else {
        emit_status(state, view_data, internal_tx, "no row selected");
        return;
    };
    let outcome = runtime.delete_row(state.active_table, &row_id);
    let reload = refresh_view_data(state, runtime, view_data);
    match outcome {
        Ok(()) => emit_outcome(
            state,
            runtime,
            view_data,
            internal_tx,
            reload,
            format!("deleted {row_id} (ctrl+z to undo)"),
        ),
        Err(error) => emit_outcome(
            state,
            runtime,
            view_data,
            internal_tx,
            reload,
            format!("delete failed: {error}"),
        ),
    }
}

fn generate_selected_persona_image<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if state.active_table != TableName::Personas {
        emit_status(
            state,
            view_data,
            internal_tx,
            "image generation works on personas -- press f to switch tables",
        );
        return;
    }
    let Some((row_id, _)) = selected_row(view_data) else {
        emit_status(state, view_data, internal_tx, "no row selected");
        return;
    };
    match runtime.generate_persona_image(&row_id) {
        Ok(path) => {
            runtime.take_notifications();
            let reload = refresh_view_data(state, runtime, view_data);
            let url = runtime.public_url(&path);
            emit_outcome(
                state,
                runtime,
                view_data,
                internal_tx,
                reload,
                format!("image ready: {url}"),
            );
        }
        Err(error) => emit_outcome(
            state,
            runtime,
            view_data,
            internal_tx,
            Ok(()),
            format!("image generation failed: {error}"),
        ),
    }
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.rows = runtime.load_table(state.active_table)?;
    view_data.grid.selected_row = view_data
        .grid
        .selected_row
        .min(view_data.rows.len().saturating_sub(1));
    view_data.grid.selected_col = view_data
        .grid
        .selected_col
        .min(state.active_table.columns().len().saturating_sub(1));
    Ok(())
}

fn render<R: AppRuntime>(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    runtime: &R,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected = TableName::ALL
        .iter()
        .position(|table| *table == state.active_table)
        .unwrap_or(0);
    let tabs = Tabs::new(TableName::ALL.iter().map(|table| table.label()))
        .block(Block::default().title("adsdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
        .split(layout[1]);
    render_grid(frame, body[0], state, view_data);
    render_map(frame, body[1], state, view_data);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[2]);

    if let Some(ui) = &view_data.editor {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let editor = Paragraph::new(render_editor_text(ui, runtime)).block(
            Block::default()
                .title(format!("edit {}", ui.editor.field()))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(editor, area);
    }

    if let Some(title) = &view_data.new_row {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(format!(
            "{}: {title}_\n\nenter create | esc cancel",
            state.active_table.title_field()
        ))
        .block(
            Block::default()
                .title(format!("new {}", state.active_table.label()))
                .borders(Borders::ALL),
        );
        frame.render_widget(prompt, area);
    }

    if view_data.help_visible {
        let area = centered_rect(76, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_grid(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let columns = state.active_table.columns();
    let focused = state.focus == FocusPanel::Grid;
    let header = Row::new(columns.iter().map(|column| {
        Cell::from(column.label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = view_data.rows.iter().enumerate().map(|(row_index, row)| {
        let selected_row = row_index == view_data.grid.selected_row;
        let cells = columns
            .iter()
            .enumerate()
            .map(|(column_index, column)| {
                let mut style = Style::default();
                if !column.editable {
                    style = style.fg(Color::DarkGray);
                }
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if focused && selected_row && column_index == view_data.grid.selected_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(cell_text(&field_value(row, column.field))).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widths = vec![Constraint::Min(6); columns.len().max(1)];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(grid_title(state, view_data))
                .borders(Borders::ALL)
                .border_style(panel_border(focused)),
        );
    frame.render_widget(table, area);
}

fn render_map(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let focused = state.focus == FocusPanel::Map;
    let mut lines = vec![view_data.map.summary(), String::new()];
    lines.extend(view_data.map.lines());
    let map = Paragraph::new(lines.join("\n")).block(
        Block::default()
            .title("countries")
            .borders(Borders::ALL)
            .border_style(panel_border(focused)),
    );
    frame.render_widget(map, area);
}

fn panel_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn grid_title(state: &AppState, view_data: &ViewData) -> String {
    let count = view_data.rows.len();
    if count == 0 {
        return format!("{} (empty -- a to add)", state.active_table.label());
    }
    format!(
        "{} {}/{count}",
        state.active_table.label(),
        view_data.grid.selected_row + 1
    )
}

fn cell_text(value: &Value) -> String {
    let text = display_value(value);
    let first_line = text.lines().next().unwrap_or_default();
    let mut preview: String = first_line.chars().take(CELL_PREVIEW_CHARS).collect();
    if first_line.chars().count() > CELL_PREVIEW_CHARS || text.lines().nth(1).is_some() {
        preview.push('…');
    }
    preview
}

fn render_editor_text<R: AppRuntime>(ui: &EditorUiState, runtime: &R) -> String {
    let mut lines = vec![format!("{} {}", ui.table.label(), ui.row_id), String::new()];
    lines.push(ui.editor.display());
    if let Some(path) = ui.editor.preview_path() {
        lines.push(String::new());
        lines.push(format!("preview: {}", runtime.public_url(path)));
    }
    lines.push(String::new());
    lines.push(
        match ui.editor {
            CellEditor::Text {
                multiline: true, ..
            } => "ctrl+s save | enter newline | esc cancel",
            CellEditor::Select { .. } => "h/l or 1-9 choose | enter save | esc cancel",
            _ => "enter save | esc cancel",
        }
        .to_owned(),
    );
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }
    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Edit => "EDIT",
    };
    let hints = match state.focus {
        FocusPanel::Grid => {
            "j/k/h/l | enter edit | a add | d del | p image | ctrl+z/ctrl+y | f/b tables | tab map | ? | ctrl+q"
        }
        FocusPanel::Map => "j/k | enter select | x exclude | c/X clear | tab grid | ? | ctrl+q",
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | tab switch grid/map | ? help\n\
grid: j/k/h/l move | g/G first/last | f/b next/prev table | r reload\n\
grid: enter/e edit cell | a add row | d delete row | p generate persona image\n\
grid: ctrl+z undo | ctrl+y or ctrl+shift+z redo\n\
edit: enter save | ctrl+s save textarea | esc cancel | select: h/l or 1-9\n\
map: j/k move | enter select target | x exclude | c clear target | X clear exclusion"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, CountryMap, InternalEvent, ViewData, cell_text, handle_key_event,
        help_overlay_text, process_internal_events, refresh_view_data, status_text,
        sync_undo_binding,
    };
    use adsdesk_app::{
        AppMode, AppState, CountryId, FocusPanel, NewRowInput, Notification, Record, RowId,
        TableName, field_value, record_id,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::{Value, json};
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        rows: Vec<Record>,
        commits: Vec<(RowId, String, Value)>,
        created: Vec<String>,
        deleted: Vec<RowId>,
        undo_count: usize,
        redo_count: usize,
        can_undo: bool,
        fail_commits: Option<String>,
        fail_loads: Option<String>,
        notifications: Vec<Notification>,
    }

    impl TestRuntime {
        fn with_personas() -> Self {
            let rows = [("per-1", "Dana", "25-34"), ("per-2", "Ezra", "35-44")]
                .into_iter()
                .map(|(id, name, age)| {
                    let mut row = Record::new();
                    row.insert("id".to_owned(), json!(id));
                    row.insert("name".to_owned(), json!(name));
                    row.insert("age_range".to_owned(), json!(age));
                    row.insert("bio".to_owned(), json!("first line\nsecond line"));
                    row.insert("image_path".to_owned(), Value::Null);
                    row
                })
                .collect();
            Self {
                rows,
                ..Self::default()
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_table(&mut self, _table: TableName) -> Result<Vec<Record>> {
            if let Some(message) = &self.fail_loads {
                bail!("{message}");
            }
            Ok(self.rows.clone())
        }

        fn commit_edit(
            &mut self,
            _table: TableName,
            row_id: &RowId,
            field: &str,
            value: Value,
        ) -> Result<bool> {
            if let Some(message) = &self.fail_commits {
                self.notifications.push(Notification::error(message.clone()));
                bail!("{message}");
            }
            if let Some(row) = self
                .rows
                .iter_mut()
                .find(|row| record_id(row).as_ref() == Some(row_id))
            {
                row.insert(field.to_owned(), value.clone());
            }
            self.commits.push((row_id.clone(), field.to_owned(), value));
            self.can_undo = true;
            self.notifications
                .push(Notification::success(format!("saved {field}")));
            Ok(true)
        }

        fn create_row(&mut self, input: &NewRowInput) -> Result<Record> {
            self.created.push(input.title.clone());
            let mut record = input.to_record();
            record.insert("id".to_owned(), json!(format!("new-{}", self.created.len())));
            self.rows.push(record.clone());
            Ok(record)
        }

        fn delete_row(&mut self, _table: TableName, row_id: &RowId) -> Result<()> {
            self.deleted.push(row_id.clone());
            self.rows.retain(|row| record_id(row).as_ref() != Some(row_id));
            self.can_undo = true;
            Ok(())
        }

        fn undo_last_edit(&mut self) -> Result<bool> {
            self.undo_count += 1;
            Ok(std::mem::take(&mut self.can_undo))
        }

        fn redo_last_edit(&mut self) -> Result<bool> {
            self.redo_count += 1;
            Ok(false)
        }

        fn generate_persona_image(&mut self, row_id: &RowId) -> Result<String> {
            Ok(format!("personas/{row_id}/generated.png"))
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://cdn.test/{path}")
        }

        fn take_notifications(&mut self) -> Vec<Notification> {
            std::mem::take(&mut self.notifications)
        }
    }

    fn internal_tx() -> mpsc::Sender<InternalEvent> {
        let (tx, _rx) = mpsc::channel();
        tx
    }

    fn personas_state() -> AppState {
        AppState {
            active_table: TableName::Personas,
            ..AppState::default()
        }
    }

    fn ready_view(state: &AppState, runtime: &mut TestRuntime) -> ViewData {
        let mut view_data = ViewData::default();
        view_data.map.load(CountryMap::world());
        sync_undo_binding(state, &mut view_data);
        refresh_view_data(state, runtime, &mut view_data).expect("refresh should work");
        view_data
    }

    fn press(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        code: KeyCode,
        modifiers: KeyModifiers,
    ) -> bool {
        handle_key_event(
            state,
            runtime,
            view_data,
            &internal_tx(),
            KeyEvent::new(code, modifiers),
        )
    }

    fn type_text(
        state: &mut AppState,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        text: &str,
    ) {
        for ch in text.chars() {
            press(state, runtime, view_data, KeyCode::Char(ch), KeyModifiers::NONE);
        }
    }

    #[test]
    fn quit_keys_exit() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        assert!(press(
            &mut state,
            &mut runtime,
            &mut view_data,
            KeyCode::Char('q'),
            KeyModifiers::CONTROL
        ));
        assert!(!press(
            &mut state,
            &mut runtime,
            &mut view_data,
            KeyCode::Char('q'),
            KeyModifiers::NONE
        ));
    }

    #[test]
    fn editing_a_text_cell_commits_through_runtime() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        view_data.grid.selected_col = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(state.mode, AppMode::Edit);
        type_text(&mut state, &mut runtime, &mut view_data, "na");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(
            runtime.commits,
            vec![(RowId::new("per-1"), "name".to_owned(), json!("Danana"))]
        );
        assert_eq!(field_value(&view_data.rows[0], "name"), json!("Danana"));
        assert_eq!(state.status_line.as_deref(), Some("saved name"));
    }

    #[test]
    fn failed_reload_after_commit_is_reported() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);
        runtime.fail_loads = Some("connection reset".to_owned());

        view_data.grid.selected_col = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        type_text(&mut state, &mut runtime, &mut view_data, "na");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(runtime.commits.len(), 1);
        assert_eq!(field_value(&view_data.rows[0], "name"), json!("Dana"));
        assert_eq!(
            state.status_line.as_deref(),
            Some("saved name; reload failed: connection reset")
        );
    }

    #[test]
    fn escape_discards_the_draft() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        view_data.grid.selected_col = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('e'), KeyModifiers::NONE);
        type_text(&mut state, &mut runtime, &mut view_data, "zzz");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Esc, KeyModifiers::NONE);

        assert!(view_data.editor.is_none());
        assert!(runtime.commits.is_empty());
    }

    #[test]
    fn invalid_website_keeps_editor_open() {
        let mut state = AppState {
            active_table: TableName::Organizations,
            ..AppState::default()
        };
        let mut runtime = TestRuntime::default();
        let mut row = Record::new();
        row.insert("id".to_owned(), json!("org-1"));
        row.insert("name".to_owned(), json!("Acme"));
        row.insert("website".to_owned(), json!("https://acme.test"));
        runtime.rows.push(row);
        let mut view_data = ready_view(&state, &mut runtime);

        view_data.grid.selected_col = 3;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        for _ in 0.."https://acme.test".len() {
            press(
                &mut state,
                &mut runtime,
                &mut view_data,
                KeyCode::Backspace,
                KeyModifiers::NONE,
            );
        }
        type_text(&mut state, &mut runtime, &mut view_data, "acme.test");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);

        assert!(view_data.editor.is_some());
        assert!(runtime.commits.is_empty());
        assert_eq!(
            state.status_line.as_deref(),
            Some("website must start with http:// or https://")
        );
    }

    #[test]
    fn read_only_id_column_does_not_open_editor() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        assert!(view_data.editor.is_none());
        assert_eq!(state.status_line.as_deref(), Some("id is read-only"));
    }

    #[test]
    fn failed_commit_shows_backend_message() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        runtime.fail_commits = Some("permission denied for table personas".to_owned());
        let mut view_data = ready_view(&state, &mut runtime);

        view_data.grid.selected_col = 1;
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        type_text(&mut state, &mut runtime, &mut view_data, "x");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);

        assert_eq!(
            state.status_line.as_deref(),
            Some("error: permission denied for table personas")
        );
    }

    #[test]
    fn undo_chords_only_fire_while_grid_has_focus() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(runtime.undo_count, 1);
        assert_eq!(state.status_line.as_deref(), Some("nothing to undo"));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab, KeyModifiers::NONE);
        assert_eq!(state.focus, FocusPanel::Map);
        assert!(!view_data.undo_binding.is_attached());
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('z'), KeyModifiers::CONTROL);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('y'), KeyModifiers::CONTROL);
        assert_eq!(runtime.undo_count, 1);
        assert_eq!(runtime.redo_count, 0);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab, KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('y'), KeyModifiers::CONTROL);
        press(
            &mut state,
            &mut runtime,
            &mut view_data,
            KeyCode::Char('Z'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT,
        );
        assert_eq!(runtime.redo_count, 2);
    }

    #[test]
    fn delete_then_undo_reports_each_step() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('d'), KeyModifiers::NONE);
        assert_eq!(runtime.deleted, vec![RowId::new("per-1")]);
        assert_eq!(view_data.rows.len(), 1);
        assert_eq!(
            state.status_line.as_deref(),
            Some("deleted per-1 (ctrl+z to undo)")
        );

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('z'), KeyModifiers::CONTROL);
        assert_eq!(state.status_line.as_deref(), Some("undo applied"));
    }

    #[test]
    fn add_row_requires_a_title() {
        let mut state = AppState {
            active_table: TableName::Campaigns,
            ..AppState::default()
        };
        let mut runtime = TestRuntime::default();
        let mut view_data = ready_view(&state, &mut runtime);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('a'), KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        assert!(view_data.new_row.is_some());
        assert!(runtime.created.is_empty());

        type_text(&mut state, &mut runtime, &mut view_data, "Spring push");
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        assert!(view_data.new_row.is_none());
        assert_eq!(runtime.created, vec!["Spring push".to_owned()]);
        assert_eq!(view_data.grid.selected_row, 0);
        assert_eq!(state.status_line.as_deref(), Some("row created"));
    }

    #[test]
    fn persona_image_needs_personas_table() {
        let mut state = AppState {
            active_table: TableName::Assets,
            ..AppState::default()
        };
        let mut runtime = TestRuntime::default();
        let mut view_data = ready_view(&state, &mut runtime);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('p'), KeyModifiers::NONE);
        assert!(
            state
                .status_line
                .as_deref()
                .is_some_and(|status| status.starts_with("image generation works on personas"))
        );

        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('p'), KeyModifiers::NONE);
        assert_eq!(
            state.status_line.as_deref(),
            Some("image ready: https://cdn.test/personas/per-1/generated.png")
        );
    }

    #[test]
    fn map_keys_select_and_exclude_independently() {
        let mut state = personas_state();
        let mut runtime = TestRuntime::with_personas();
        let mut view_data = ready_view(&state, &mut runtime);

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Tab, KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Enter, KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('j'), KeyModifiers::NONE);
        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('x'), KeyModifiers::NONE);

        let selection = view_data.map.selection.state().clone();
        assert_eq!(selection.selected_country_id, Some(CountryId::new("AR")));
        assert_eq!(selection.excluded_country_id, Some(CountryId::new("AU")));

        press(&mut state, &mut runtime, &mut view_data, KeyCode::Char('c'), KeyModifiers::NONE);
        let selection = view_data.map.selection.state().clone();
        assert_eq!(selection.selected_country_id, None);
        assert_eq!(selection.excluded_country_id, Some(CountryId::new("AU")));
    }

    #[test]
    fn stale_status_clear_tokens_are_ignored() {
        let mut state = personas_state();
        state.status_line = Some("saved".to_owned());
        let mut view_data = ViewData {
            status_token: 2,
            ..ViewData::default()
        };
        let (tx, rx) = mpsc::channel();
        tx.send(InternalEvent::ClearStatus { token: 1 })
            .expect("send should work");
        process_internal_events(&mut state, &mut view_data, &rx);
        assert_eq!(state.status_line.as_deref(), Some("saved"));

        tx.send(InternalEvent::ClearStatus { token: 2 })
            .expect("send should work");
        process_internal_events(&mut state, &mut view_data, &rx);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn cells_show_first_line_only() {
        assert_eq!(cell_text(&json!("first line\nsecond line")), "first line…");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn help_and_status_mention_history_chords() {
        assert!(help_overlay_text().contains("ctrl+shift+z"));
        let state = AppState::default();
        assert!(status_text(&state, &ViewData::default()).starts_with("NAV | "));
    }
}
