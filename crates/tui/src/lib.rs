use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::time::Duration;

use bayanat_adapters::clipboard::{SystemClipboard, TextClipboard};
use bayanat_adapters::postgres::PostgresBackend;
use bayanat_core::config_store::ConfigStore;
use bayanat_core::query_view::ResultTab;
use bayanat_core::workbench::Workbench;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use thiserror::Error;
use tracing::{info, warn};

mod render;

const POLL_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub config_path: PathBuf,
    pub connection_override: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Connection,
    Explorer,
    Editor,
    Results,
}

impl Pane {
    fn next(self) -> Self {
        match self {
            Self::Connection => Self::Explorer,
            Self::Explorer => Self::Editor,
            Self::Editor => Self::Results,
            Self::Results => Self::Connection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    NextPane,
    Connect,
    RunQuery,
    ToggleResultTab,
    Navigate(DirectionKey),
    Activate,
    Preview,
    Refresh,
    ToggleRowSelection,
    Copy,
    Input(char),
    Backspace,
    Newline,
}

/// Database work that blocks the loop until it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DbTask {
    Connect,
    RefreshTables,
    ExpandTable,
    PreviewTable,
    RunQuery,
}

impl DbTask {
    fn busy_message(self) -> &'static str {
        match self {
            Self::Connect => "Connecting...",
            Self::RefreshTables => "Loading tables...",
            Self::ExpandTable => "Loading columns...",
            Self::PreviewTable | Self::RunQuery => "Executing query...",
        }
    }
}

struct TuiApp {
    workbench: Workbench<PostgresBackend>,
    pane: Pane,
    clipboard: Box<dyn TextClipboard>,
    should_quit: bool,
}

impl TuiApp {
    fn new(config: ConfigStore) -> Self {
        Self::with_clipboard(config, Box::new(SystemClipboard::new()))
    }

    fn with_clipboard(config: ConfigStore, clipboard: Box<dyn TextClipboard>) -> Self {
        Self {
            workbench: Workbench::new(PostgresBackend, config),
            pane: Pane::Connection,
            clipboard,
            should_quit: false,
        }
    }

    fn handle(&mut self, msg: Msg) -> Option<DbTask> {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::NextPane => self.pane = self.pane.next(),
            Msg::Connect => return Some(DbTask::Connect),
            Msg::RunQuery => return Some(DbTask::RunQuery),
            Msg::ToggleResultTab => self.workbench.query_mut().toggle_tab(),
            Msg::Navigate(direction) => return self.navigate(direction),
            Msg::Activate => return self.activate_table(),
            Msg::Preview => return Some(DbTask::PreviewTable),
            Msg::Refresh => return Some(DbTask::RefreshTables),
            Msg::ToggleRowSelection => self.workbench.query_mut().toggle_row_selection(),
            Msg::Copy => self.copy_results(),
            Msg::Input(ch) => {
                if let Some(buffer) = self.focused_input() {
                    buffer.push(ch);
                }
            }
            Msg::Backspace => {
                if let Some(buffer) = self.focused_input() {
                    buffer.pop();
                }
            }
            Msg::Newline => {
                if self.pane == Pane::Editor {
                    self.workbench.query_mut().query_text_mut().push('\n');
                }
            }
        }
        None
    }

    async fn run_task(&mut self, task: DbTask) {
        match task {
            DbTask::Connect => self.workbench.connect().await,
            DbTask::RefreshTables => self.workbench.refresh_tables().await,
            DbTask::ExpandTable => self.workbench.expand_selected_table().await,
            DbTask::PreviewTable => {
                self.workbench.preview_selected_table().await;
                self.pane = Pane::Results;
            }
            DbTask::RunQuery => self.workbench.run_query().await,
        }
    }

    fn navigate(&mut self, direction: DirectionKey) -> Option<DbTask> {
        match self.pane {
            Pane::Explorer => {
                let explorer = self.workbench.explorer_mut();
                match direction {
                    DirectionKey::Up => explorer.move_up(),
                    DirectionKey::Down => explorer.move_down(),
                    DirectionKey::Left => explorer.collapse_selected(),
                    DirectionKey::Right => return Some(DbTask::ExpandTable),
                }
            }
            Pane::Results => {
                let query = self.workbench.query_mut();
                match (query.active_tab(), direction) {
                    (ResultTab::Table, DirectionKey::Up) => query.move_cursor_up(),
                    (ResultTab::Table, DirectionKey::Down) => query.move_cursor_down(),
                    (ResultTab::Text, DirectionKey::Up) => query.scroll_text_up(),
                    (ResultTab::Text, DirectionKey::Down) => query.scroll_text_down(),
                    (_, DirectionKey::Left | DirectionKey::Right) => {}
                }
            }
            Pane::Connection | Pane::Editor => {}
        }
        None
    }

    fn activate_table(&mut self) -> Option<DbTask> {
        let explorer = self.workbench.explorer();
        if explorer.selected_table().is_none() {
            self.workbench.set_status("No table selected.");
            return None;
        }

        if explorer.selected_table_is_expanded() {
            Some(DbTask::PreviewTable)
        } else {
            Some(DbTask::ExpandTable)
        }
    }

    fn copy_results(&mut self) {
        let Some((text, count)) = self.workbench.query().copy_text() else {
            self.workbench.set_status("No rows to copy.");
            return;
        };

        match self.clipboard.set_text(&text) {
            Ok(()) => self
                .workbench
                .set_status(format!("Copied {count} rows to clipboard.")),
            Err(error) => {
                warn!(%error, "copy failed");
                self.workbench.set_status(error.to_string());
            }
        }
    }

    fn focused_input(&mut self) -> Option<&mut String> {
        match self.pane {
            Pane::Connection => Some(self.workbench.query_mut().connection_input_mut()),
            Pane::Editor => Some(self.workbench.query_mut().query_text_mut()),
            Pane::Explorer | Pane::Results => None,
        }
    }
}

pub fn run(options: RunOptions) -> Result<(), TuiError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &runtime, options);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    enter_screen(&mut stdout)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    leave_screen(terminal.backend_mut())?;
    terminal.show_cursor()?;
    Ok(())
}

fn enter_screen(writer: &mut impl Write) -> io::Result<()> {
    execute!(writer, EnterAlternateScreen)
}

fn leave_screen(writer: &mut impl Write) -> io::Result<()> {
    execute!(writer, LeaveAlternateScreen)
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    runtime: &tokio::runtime::Runtime,
    options: RunOptions,
) -> Result<(), TuiError> {
    let mut app = TuiApp::new(ConfigStore::new(options.config_path));
    let mut pending = app
        .workbench
        .load_initial_config(options.connection_override)
        .then_some(DbTask::Connect);
    info!("workbench started");

    loop {
        if let Some(task) = pending.take() {
            app.workbench.set_status(task.busy_message());
            terminal.draw(|frame| render::render(frame, &app))?;
            runtime.block_on(app.run_task(task));
        }

        terminal.draw(|frame| render::render(frame, &app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key, app.pane) {
                        pending = app.handle(message);
                    }
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    runtime.block_on(app.workbench.close());
    Ok(())
}

fn map_key_event(key: KeyEvent, pane: Pane) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('q')) => return Some(Msg::Quit),
        (_, KeyCode::Tab) => return Some(Msg::NextPane),
        (_, KeyCode::F(5)) | (KeyModifiers::CONTROL, KeyCode::Char('r')) => {
            return Some(Msg::RunQuery)
        }
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => return Some(Msg::Connect),
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => return Some(Msg::ToggleResultTab),
        _ => {}
    }

    match pane {
        Pane::Connection => map_text_input(key, Msg::Connect),
        Pane::Editor => map_text_input(key, Msg::Newline),
        Pane::Explorer => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Msg::Navigate(DirectionKey::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(Msg::Navigate(DirectionKey::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(Msg::Navigate(DirectionKey::Left)),
            KeyCode::Right | KeyCode::Char('l') => Some(Msg::Navigate(DirectionKey::Right)),
            KeyCode::Enter => Some(Msg::Activate),
            KeyCode::Char('p') => Some(Msg::Preview),
            KeyCode::Char('r') => Some(Msg::Refresh),
            _ => None,
        },
        Pane::Results => match (key.modifiers, key.code) {
            (_, KeyCode::Up | KeyCode::Char('k')) => Some(Msg::Navigate(DirectionKey::Up)),
            (_, KeyCode::Down | KeyCode::Char('j')) => Some(Msg::Navigate(DirectionKey::Down)),
            (_, KeyCode::Char(' ')) => Some(Msg::ToggleRowSelection),
            (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('y')) => {
                Some(Msg::Copy)
            }
            _ => None,
        },
    }
}

fn map_text_input(key: KeyEvent, on_enter: Msg) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (_, KeyCode::Enter) => Some(on_enter),
        (_, KeyCode::Backspace) => Some(Msg::Backspace),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => Some(Msg::Input(ch)),
        _ => None,
    }
}
