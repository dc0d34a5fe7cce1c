use bayanat_core::explorer::{ExplorerRow, ExplorerRowKind};
use bayanat_core::query_view::{QueryView, ResultTab};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Tabs, Wrap};
use ratatui::Frame;

use crate::{Pane, TuiApp};

const KEY_HINTS: &str = "Tab: pane | Ctrl+O: connect | F5: run | Ctrl+T: tab | Ctrl+Q: quit";

pub(crate) fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_connection_bar(frame, app, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);
    render_explorer(frame, app, body[0]);

    let work_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(body[1]);
    render_editor(frame, app, work_area[0]);
    render_results(frame, app, work_area[1]);

    let status = Paragraph::new(Line::from(vec![
        Span::raw(format!("Status: {}", app.workbench.status())),
        Span::raw("  "),
        Span::styled(KEY_HINTS, Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[2]);
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title)
}

fn render_connection_bar(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let state = if app.workbench.is_connected() {
        Span::styled(" connected ", Style::default().fg(Color::Green))
    } else {
        Span::styled(" disconnected ", Style::default().fg(Color::Red))
    };
    let input = app.workbench.query().connection_string();
    let line = Line::from(vec![
        Span::raw("URI: "),
        Span::raw(input.to_string()),
        Span::raw(" |"),
        state,
    ]);
    let widget = Paragraph::new(line).block(pane_block(
        "Connection (Enter to connect)",
        app.pane == Pane::Connection,
    ));
    frame.render_widget(widget, area);
}

fn render_explorer(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let explorer = app.workbench.explorer();
    let rows = explorer.visible_rows();
    let cursor_row = explorer.cursor();

    let visible_limit = usize::from(area.height.saturating_sub(2)).max(1);
    let window_start = cursor_row.saturating_sub(visible_limit / 2);
    let lines = rows
        .iter()
        .enumerate()
        .skip(window_start)
        .take(visible_limit)
        .map(|(index, row)| explorer_line(row, index == cursor_row))
        .collect::<Vec<_>>();

    let widget = Paragraph::new(lines).block(pane_block(
        "Database Explorer",
        app.pane == Pane::Explorer,
    ));
    frame.render_widget(widget, area);
}

fn explorer_line(row: &ExplorerRow, is_cursor: bool) -> Line<'static> {
    let marker = if is_cursor { ">" } else { " " };
    let (text, style) = match row.kind {
        ExplorerRowKind::Table { expanded } => {
            let arrow = if expanded { "▾" } else { "▸" };
            (format!("{marker} {arrow} {}", row.label), Style::default())
        }
        ExplorerRowKind::Column => (format!("{marker}   {}", row.label), Style::default()),
        ExplorerRowKind::Placeholder => (
            format!("{marker}   {}", row.label),
            Style::default().fg(Color::DarkGray),
        ),
    };

    if is_cursor {
        Line::styled(text, style.add_modifier(Modifier::BOLD))
    } else {
        Line::styled(text, style)
    }
}

fn render_editor(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let text = app
        .workbench
        .query()
        .query_text()
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect::<Vec<_>>();
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(pane_block("SQL Query (F5 to run)", app.pane == Pane::Editor));
    frame.render_widget(widget, area);
}

fn render_results(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let block = pane_block("Results", app.pane == Pane::Results);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);

    let query = app.workbench.query();
    let selected_tab = match query.active_tab() {
        ResultTab::Table => 0,
        ResultTab::Text => 1,
    };
    let tabs = Tabs::new([ResultTab::Table.title(), ResultTab::Text.title()])
        .select(selected_tab)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, sections[0]);

    match query.active_tab() {
        ResultTab::Table => render_grid(frame, query, sections[1]),
        ResultTab::Text => {
            let scroll = u16::try_from(query.text_scroll()).unwrap_or(u16::MAX);
            let widget = Paragraph::new(query.text_output().to_string())
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0));
            frame.render_widget(widget, sections[1]);
        }
    }
}

fn render_grid(frame: &mut Frame<'_>, query: &QueryView, area: Rect) {
    let grid = query.grid();
    if grid.columns.is_empty() {
        frame.render_widget(Paragraph::new("No rows to display"), area);
        return;
    }

    let visible_limit = usize::from(area.height.saturating_sub(1)).max(1);
    let window_start = query.cursor().saturating_sub(visible_limit / 2);
    let rows = grid
        .rows
        .iter()
        .enumerate()
        .skip(window_start)
        .take(visible_limit)
        .map(|(index, row)| {
            let mut style = Style::default();
            if query.is_row_selected(index) {
                style = style.fg(Color::Cyan);
            }
            if index == query.cursor() {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(row.values.iter().map(|value| Cell::from(value.clone()))).style(style)
        })
        .collect::<Vec<_>>();

    let header = Row::new(grid.columns.iter().map(|column| Cell::from(column.clone())))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let widths = vec![Constraint::Fill(1); grid.columns.len()];
    let table = Table::new(rows, widths).header(header).column_spacing(1);
    frame.render_widget(table, area);
}
