use std::{
    io::{self, Stdout},
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::{
    config::AppConfig,
    filter::{FileFilter, FilterExpr},
    flatten::{flatten_torrents, Flattened, NameStyle, Row, RowKey},
    model::{format_bytes, format_progress, FileSnapshot, Priority},
    rpc::{RpcResult, TransmissionClient},
    table::{Cells, Column, TableLayout},
};

type Backend = ratatui::backend::CrosstermBackend<Stdout>;

pub fn run(config: AppConfig) -> Result<()> {
    let client = TransmissionClient::new(config.rpc.clone())
        .context("failed to construct Transmission RPC client")?;
    let mut terminal = setup_terminal()?;
    let (event_tx, event_rx) = unbounded();
    let (rpc_tx, rpc_rx) = unbounded();

    let input_handle = spawn_input_thread(event_tx.clone());
    let worker_handle = spawn_rpc_worker(client, rpc_rx, event_tx.clone(), config.poll_interval);

    let mut app = App::new(&config);
    app.set_status(StatusUpdate::info("Connecting to transmission…"));

    if rpc_tx.send(RpcCommand::Refresh).is_err() {
        app.set_status(StatusUpdate::error(
            "RPC worker not available; shutting down",
        ));
    }

    let loop_result = run_loop(&mut terminal, &mut app, event_rx, rpc_tx.clone());

    drop(rpc_tx);
    drop(event_tx);

    restore_terminal(&mut terminal)?;
    input_handle.join().ok();
    worker_handle.join().ok();

    loop_result
}

fn run_loop(
    terminal: &mut Terminal<Backend>,
    app: &mut App,
    events: Receiver<AppEvent>,
    rpc_tx: Sender<RpcCommand>,
) -> Result<()> {
    terminal.draw(|f| app.render(f))?;
    loop {
        let event = match events.recv() {
            Ok(event) => event,
            Err(_) => break,
        };
        if app.process_event(event, &rpc_tx) {
            break;
        }
        terminal.draw(|f| app.render(f))?;
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn setup_terminal() -> Result<Terminal<Backend>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<Backend>) -> Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(tx: Sender<AppEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let tick_rate = Duration::from_millis(250);
        loop {
            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(evt) => {
                        if tx.send(AppEvent::Input(evt)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(AppEvent::Status(StatusUpdate::error(format!(
                            "Input error: {err}"
                        ))));
                    }
                },
                Ok(false) | Err(_) => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_rpc_worker(
    client: TransmissionClient,
    rx: Receiver<RpcCommand>,
    tx: Sender<AppEvent>,
    poll_interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || rpc_worker_loop(client, rx, tx, poll_interval))
}

fn rpc_worker_loop(
    client: TransmissionClient,
    rx: Receiver<RpcCommand>,
    tx: Sender<AppEvent>,
    poll_interval: Duration,
) {
    let poll_enabled = poll_interval > Duration::ZERO;
    if !poll_enabled {
        while let Ok(cmd) = rx.recv() {
            handle_command(&client, cmd, &tx);
        }
        return;
    }
    loop {
        match rx.recv_timeout(poll_interval) {
            Ok(cmd) => handle_command(&client, cmd, &tx),
            Err(RecvTimeoutError::Timeout) => send_snapshot(&client, &tx),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_command(client: &TransmissionClient, cmd: RpcCommand, tx: &Sender<AppEvent>) {
    match cmd {
        RpcCommand::Refresh => send_snapshot(client, tx),
        RpcCommand::SetPriority {
            torrent_id,
            indices,
            priority,
            label,
        } => handle_set_priority(client, torrent_id, &indices, priority, label, tx),
    }
}

fn send_snapshot(client: &TransmissionClient, tx: &Sender<AppEvent>) {
    let result = client.fetch_snapshot();
    let _ = tx.send(AppEvent::Snapshot(result));
}

fn handle_set_priority(
    client: &TransmissionClient,
    torrent_id: i64,
    indices: &[usize],
    priority: Priority,
    label: String,
    tx: &Sender<AppEvent>,
) {
    match client.set_file_priority(torrent_id, indices, priority) {
        Ok(()) => {
            let _ = tx.send(AppEvent::Status(StatusUpdate::success(format!(
                "{label}: priority {priority}"
            ))));
            send_snapshot(client, tx);
        }
        Err(err) => {
            let _ = tx.send(AppEvent::Status(StatusUpdate::error(format!(
                "Priority change failed: {err}"
            ))));
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    Snapshot(RpcResult<FileSnapshot>),
    Status(StatusUpdate),
}

#[derive(Clone)]
struct StatusUpdate {
    text: String,
    level: StatusLevel,
}

impl StatusUpdate {
    fn info(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Info,
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Success,
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Warning,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            text: message.into(),
            level: StatusLevel::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone)]
struct StatusMessage {
    text: String,
    level: StatusLevel,
    expires_at: Option<Instant>,
}

impl StatusMessage {
    fn from_update(update: StatusUpdate) -> Self {
        let duration = match update.level {
            StatusLevel::Info => Duration::from_secs(4),
            StatusLevel::Success => Duration::from_secs(5),
            StatusLevel::Warning => Duration::from_secs(6),
            StatusLevel::Error => Duration::from_secs(8),
        };
        Self {
            text: update.text,
            level: update.level,
            expires_at: Some(Instant::now() + duration),
        }
    }
}

struct App {
    connection_label: String,
    columns: Vec<Column>,
    snapshot: Option<FileSnapshot>,
    flattened: Flattened,
    list_state: ListState,
    filter: Option<FilterExpr>,
    filter_text: String,
    selected_key: Option<RowKey>,
    cells: Cells,
    status: Option<StatusMessage>,
    toast: Option<StatusMessage>,
    mode: InputMode,
    should_quit: bool,
    pending_manual_refresh: bool,
}

impl App {
    fn new(config: &AppConfig) -> Self {
        Self {
            connection_label: config.rpc.endpoint(),
            columns: config.columns.clone(),
            snapshot: None,
            flattened: Flattened::default(),
            list_state: ListState::default(),
            filter: None,
            filter_text: String::new(),
            selected_key: None,
            cells: Cells::new(),
            status: None,
            toast: None,
            mode: InputMode::Normal,
            should_quit: false,
            pending_manual_refresh: false,
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.size());
        self.render_header(frame, chunks[0]);
        self.render_body(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);
        self.render_toast(frame);
        if let InputMode::Help = self.mode {
            let area = centered_rect(70, 70, frame.size());
            let block = Block::default().title("Key Bindings").borders(Borders::ALL);
            let paragraph = Paragraph::new(help_lines())
                .block(block)
                .wrap(Wrap { trim: false });
            frame.render_widget(Clear, area);
            frame.render_widget(paragraph, area);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("Files", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  |  "),
            Span::raw(&self.connection_label),
        ]));
        if let Some(snapshot) = &self.snapshot {
            lines.push(Line::from(format!(
                "Torrents {}  Files {}  | Shown {}  Filtered {}",
                snapshot.torrents.len(),
                snapshot.file_count(),
                self.flattened.file_rows(),
                self.flattened.total_filtered()
            )));
        } else {
            lines.push(Line::from("Waiting for file lists…"));
        }
        if let Some(status) = &self.status {
            lines.push(Line::from(Span::styled(
                status.text.clone(),
                status_style(status.level),
            )));
        }
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::raw(" Session ")),
        );
        frame.render_widget(paragraph, area);
    }

    fn render_body(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
            .split(area);
        self.render_list(frame, chunks[0]);
        self.render_detail(frame, chunks[1]);
    }

    fn render_list(&mut self, frame: &mut Frame, area: Rect) {
        // Borders and the highlight symbol take four columns.
        let width = area.width.saturating_sub(4) as usize;
        let layout = TableLayout::new(&self.columns, &self.flattened.rows, Some(width), &mut self.cells);
        let title = match layout.header() {
            Some(header) => format!(" {header} "),
            None => " Files ".to_string(),
        };
        let mut items = self
            .flattened
            .rows
            .iter()
            .map(|row| {
                let line = layout.format_row(row, &mut self.cells);
                let style = if row.is_directory() {
                    Style::default().add_modifier(Modifier::BOLD)
                } else if row.priority() == Some(Priority::Off) {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(line, style)))
            })
            .collect::<Vec<_>>();
        if items.is_empty() {
            let message = if self.snapshot.is_some() {
                "No matching files"
            } else {
                "No files loaded"
            };
            items.push(ListItem::new(Line::from(message)));
        }
        let block = Block::default().borders(Borders::ALL).title(Span::raw(title));
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(Span::raw(" Details "));
        let Some(row) = self.current_row() else {
            let paragraph = Paragraph::new("No file selected")
                .block(block)
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
            return;
        };
        let location = match row {
            Row::File(file) => file.path.clone(),
            Row::Directory(dir) => dir.path.clone(),
        };
        let mut lines = vec![
            Line::from(Span::styled(
                row.name().trim_start().to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Location: {location}")),
            Line::from(format!(
                "Progress: {} of {} ({})",
                format_bytes(row.downloaded()),
                format_bytes(row.size()),
                format_progress(row.progress()).trim_start()
            )),
            Line::from(format!(
                "Priority: {}",
                row.priority().map_or("mixed", Priority::label)
            )),
        ];
        if let Row::Directory(dir) = row {
            lines.push(Line::from(format!(
                "Files: {}  Filtered here: {}",
                dir.file_indices.len(),
                dir.filtered_count
            )));
        }
        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mode_label = match &self.mode {
            InputMode::Normal => "NORMAL",
            InputMode::Filter { .. } => "FILTER",
            InputMode::Help => "HELP",
        };
        let filter_display = match &self.mode {
            InputMode::Filter { buffer } => format!("/{}", buffer),
            _ => {
                if self.filter_text.is_empty() {
                    "(no filter)".to_string()
                } else {
                    format!("/{}", self.filter_text)
                }
            }
        };
        let summary = Line::from(format!("Mode {mode_label} | Filter {filter_display}"));
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(14)])
            .split(area);
        let left = Paragraph::new(summary).wrap(Wrap { trim: true });
        frame.render_widget(left, sections[0]);
        let help_label =
            Paragraph::new(Line::from(Span::raw("Help [?]"))).alignment(Alignment::Right);
        frame.render_widget(help_label, sections[1]);
    }

    fn render_toast(&self, frame: &mut Frame) {
        if !matches!(self.mode, InputMode::Normal | InputMode::Filter { .. }) {
            return;
        }
        let Some(toast) = &self.toast else {
            return;
        };
        let frame_area = frame.size();
        if frame_area.width < 20 || frame_area.height < 5 {
            return;
        }
        let padding = 2;
        let max_width = frame_area.width.saturating_sub(padding * 2);
        let width = max_width.clamp(20, 60);
        let height = 3;
        let x = frame_area
            .x
            .saturating_add(frame_area.width.saturating_sub(width + padding));
        let y = frame_area
            .y
            .saturating_add(frame_area.height.saturating_sub(height + padding));
        let area = Rect::new(x, y, width, height);
        let text = Line::from(Span::styled(toast.text.clone(), status_style(toast.level)));
        let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .title(Span::raw(" Notice ")),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }

    /// Returns `true` when the app should exit.
    fn process_event(&mut self, event: AppEvent, rpc_tx: &Sender<RpcCommand>) -> bool {
        match event {
            AppEvent::Input(event) => return self.handle_input(event, rpc_tx),
            AppEvent::Tick => self.expire_status(),
            AppEvent::Snapshot(result) => self.apply_snapshot(result),
            AppEvent::Status(update) => self.set_status(update),
        }
        false
    }

    fn handle_input(&mut self, event: Event, rpc_tx: &Sender<RpcCommand>) -> bool {
        let Event::Key(key) = event else {
            return false;
        };
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return true;
        }
        match &mut self.mode {
            InputMode::Normal => return self.handle_normal_key(key, rpc_tx),
            InputMode::Filter { buffer } => {
                let mut action = FilterAction::None;
                match key.code {
                    KeyCode::Enter => action = FilterAction::Apply(buffer.trim().to_string()),
                    KeyCode::Esc => action = FilterAction::Cancel,
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    KeyCode::Char(c) => buffer.push(c),
                    _ => {}
                }
                match action {
                    FilterAction::Apply(value) => {
                        self.mode = InputMode::Normal;
                        self.apply_filter_text(value);
                    }
                    FilterAction::Cancel => self.mode = InputMode::Normal,
                    FilterAction::None => {}
                }
            }
            InputMode::Help => {
                if matches!(
                    key.code,
                    KeyCode::Char('?') | KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')
                ) {
                    self.mode = InputMode::Normal;
                }
            }
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent, rpc_tx: &Sender<RpcCommand>) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return true;
            }
            KeyCode::Char('R') => self.queue_refresh(rpc_tx),
            KeyCode::Char('+') => self.change_priority(Priority::raise, rpc_tx),
            KeyCode::Char('-') => self.change_priority(Priority::lower, rpc_tx),
            KeyCode::Char('/') => {
                self.mode = InputMode::Filter {
                    buffer: self.filter_text.clone(),
                };
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(10)
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.move_selection(-10)
            }
            KeyCode::Char('g') | KeyCode::Home => self.goto_top(),
            KeyCode::Char('G') | KeyCode::End => self.goto_bottom(),
            KeyCode::Char('?') => self.mode = InputMode::Help,
            KeyCode::Esc => self.clear_filter(),
            _ => {}
        }
        false
    }

    fn move_selection(&mut self, delta: isize) {
        if self.flattened.rows.is_empty() {
            return;
        }
        let max_index = self.flattened.rows.len() as isize - 1;
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.select_index(next);
    }

    fn goto_top(&mut self) {
        if !self.flattened.rows.is_empty() {
            self.select_index(0);
        }
    }

    fn goto_bottom(&mut self) {
        if let Some(last) = self.flattened.rows.len().checked_sub(1) {
            self.select_index(last);
        }
    }

    fn select_index(&mut self, index: usize) {
        self.list_state.select(Some(index));
        self.selected_key = self.current_row().map(Row::key);
    }

    fn current_row(&self) -> Option<&Row> {
        self.flattened.rows.get(self.list_state.selected()?)
    }

    fn clear_filter(&mut self) {
        if self.filter_text.is_empty() {
            return;
        }
        self.filter_text.clear();
        self.filter = None;
        self.rebuild_rows();
    }

    fn apply_filter_text(&mut self, value: String) {
        match FilterExpr::parse_optional(Some(&value)) {
            Ok(filter) => {
                self.filter = filter;
                self.filter_text = value;
                self.rebuild_rows();
                if self.snapshot.is_some() && self.flattened.file_rows() == 0 {
                    self.set_status(StatusUpdate::warning(format!(
                        "No matching files: {}",
                        self.filter_text
                    )));
                }
            }
            Err(err) => self.set_status(StatusUpdate::error(format!("Invalid filter: {err}"))),
        }
    }

    fn rebuild_rows(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            self.flattened = Flattened::default();
            self.list_state.select(None);
            return;
        };
        let filter = self.filter.as_ref().map(|expr| expr as &dyn FileFilter);
        match flatten_torrents(&snapshot.torrents, filter, NameStyle::Indented) {
            Ok(flattened) => self.flattened = flattened,
            Err(err) => {
                self.flattened = Flattened::default();
                self.set_status(StatusUpdate::error(format!("Bad file list: {err}")));
            }
        }
        self.restore_selection();
    }

    fn restore_selection(&mut self) {
        if self.flattened.rows.is_empty() {
            self.list_state.select(None);
            return;
        }
        if let Some(target) = &self.selected_key {
            if let Some(pos) = self.flattened.rows.iter().position(|row| row.key() == *target) {
                self.list_state.select(Some(pos));
                return;
            }
        }
        let selected = self
            .list_state
            .selected()
            .unwrap_or(0)
            .min(self.flattened.rows.len() - 1);
        self.select_index(selected);
    }

    fn change_priority(&mut self, step: fn(Priority) -> Priority, rpc_tx: &Sender<RpcCommand>) {
        let Some(row) = self.current_row() else {
            self.set_status(StatusUpdate::warning("No file selected"));
            return;
        };
        let current = row.priority().unwrap_or(Priority::Normal);
        let priority = step(current);
        if row.priority() == Some(priority) {
            return;
        }
        let label = row.name().trim_start().to_string();
        let indices = row.file_indices();
        if indices.is_empty() {
            self.set_status(StatusUpdate::warning(format!("No files shown in {label}")));
            return;
        }
        let command = RpcCommand::SetPriority {
            torrent_id: row.torrent_id(),
            indices,
            priority,
            label,
        };
        self.set_status(StatusUpdate::info(format!("Setting priority {priority}…")));
        if rpc_tx.send(command).is_err() {
            self.set_status(StatusUpdate::error("Failed to queue priority change"));
        }
    }

    fn expire_status(&mut self) {
        let now = Instant::now();
        if self
            .status
            .as_ref()
            .and_then(|s| s.expires_at)
            .is_some_and(|expiry| now >= expiry)
        {
            self.status = None;
        }
        if self
            .toast
            .as_ref()
            .and_then(|t| t.expires_at)
            .is_some_and(|expiry| now >= expiry)
        {
            self.toast = None;
        }
    }

    fn set_status(&mut self, update: StatusUpdate) {
        let message = StatusMessage::from_update(update.clone());
        if matches!(update.level, StatusLevel::Warning | StatusLevel::Error) {
            self.toast = Some(message.clone());
        }
        self.status = Some(message);
    }

    fn queue_refresh(&mut self, rpc_tx: &Sender<RpcCommand>) {
        self.pending_manual_refresh = true;
        self.set_status(StatusUpdate::info("Refreshing…"));
        if rpc_tx.send(RpcCommand::Refresh).is_err() {
            self.set_status(StatusUpdate::error("Failed to queue refresh"));
        }
    }

    fn apply_snapshot(&mut self, result: RpcResult<FileSnapshot>) {
        match result {
            Ok(snapshot) => {
                let files = snapshot.file_count();
                self.snapshot = Some(snapshot);
                self.rebuild_rows();
                if self.pending_manual_refresh || self.status.is_none() {
                    self.set_status(StatusUpdate::success(format!("Refreshed {files} files")));
                }
                self.pending_manual_refresh = false;
            }
            Err(err) => {
                self.set_status(StatusUpdate::error(format!("RPC error: {err}")));
                self.pending_manual_refresh = false;
            }
        }
    }
}

enum InputMode {
    Normal,
    Filter { buffer: String },
    Help,
}

enum FilterAction {
    None,
    Apply(String),
    Cancel,
}

enum RpcCommand {
    Refresh,
    SetPriority {
        torrent_id: i64,
        indices: Vec<usize>,
        priority: Priority,
        label: String,
    },
}

fn status_style(level: StatusLevel) -> Style {
    match level {
        StatusLevel::Info => Style::default().fg(Color::Blue),
        StatusLevel::Success => Style::default().fg(Color::Green),
        StatusLevel::Warning => Style::default().fg(Color::Yellow),
        StatusLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
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
    let vertical = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    vertical[1]
}

fn help_lines() -> Vec<Line<'static>> {
    let heading = |text: &'static str| {
        Line::from(Span::styled(
            text,
            Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
    };
    vec![
        heading("Navigation"),
        Line::from("  j / k: move selection"),
        Line::from("  g / G: jump to first / last"),
        Line::from("  Ctrl+d / Ctrl+u: page down/up"),
        Line::from(""),
        heading("Actions"),
        Line::from("  + / -: raise / lower priority of file or directory"),
        Line::from("  R: refresh now"),
        Line::from("  /: filter files (e.g. wanted & size>100M)"),
        Line::from("  Esc: clear filter / close dialog"),
        Line::from("  ?: toggle this help"),
        Line::from("  q or Ctrl+c: quit"),
    ]
}
