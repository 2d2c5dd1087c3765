// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt::Write as _;
use std::sync::Arc;

use noteleaf_app::{BrowserMode, BrowserState, Record};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::keymap::MAX_JUMP;

/// Rows the list screen spends outside the record rows: two border rows and
/// the status line.
const LIST_CHROME_ROWS: usize = 3;
const COLUMN_GAP: &str = "  ";

/// Renders one list row. The flag is true for the selected row.
pub type ItemRenderer<R> = Arc<dyn Fn(&R, bool) -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub field: String,
    pub header: String,
    pub width: usize,
}

impl Column {
    pub fn new(field: impl Into<String>, header: impl Into<String>, width: usize) -> Self {
        Self {
            field: field.into(),
            header: header.into(),
            width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    List,
    Table(Vec<Column>),
}

pub struct ViewConfig<R> {
    pub title: String,
    pub shape: Shape,
    pub item_renderer: Option<ItemRenderer<R>>,
    /// Reachable action keys with their descriptions.
    pub actions: Vec<(char, String)>,
    pub searchable: bool,
    pub viewable: bool,
}

impl<R> ViewConfig<R> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            shape: Shape::List,
            item_renderer: None,
            actions: Vec::new(),
            searchable: true,
            viewable: false,
        }
    }
}

/// Full screen text for a state: body, a blank line, then the key hint.
pub fn render_text<R: Record>(state: &BrowserState<R>, config: &ViewConfig<R>) -> String {
    let (body, hint) = render_parts(state, config);
    format!("{body}\n\n{hint}")
}

pub fn draw<R: Record>(frame: &mut Frame<'_>, state: &BrowserState<R>, config: &ViewConfig<R>) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let (body, hint) = render_parts(state, config);
    let title = format!(" {} · {} ", config.title, state.mode.label());
    let body = Paragraph::new(body).block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(body, layout[0]);

    let status = Paragraph::new(hint).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout[1]);
}

/// Static-mode output: the title once, then one line per record.
pub fn render_static<R: Record>(records: &[R], config: &ViewConfig<R>) -> String {
    let mut out = format!("{}\n", config.title);
    if records.is_empty() {
        out.push_str("No items found\n");
        return out;
    }
    if let Shape::Table(columns) = &config.shape {
        let _ = writeln!(out, "{}", header_row(columns).trim_end());
    }
    for record in records {
        let line = match &config.shape {
            Shape::Table(columns) => table_cells(record, columns),
            Shape::List => match &config.item_renderer {
                Some(renderer) => renderer(record, false),
                None => default_item(record),
            },
        };
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn render_parts<R: Record>(state: &BrowserState<R>, config: &ViewConfig<R>) -> (String, String) {
    match state.mode {
        BrowserMode::Help => {
            let jumps = page_rows(state, config).min(MAX_JUMP);
            return (help_legend(config, jumps), "esc close help".to_owned());
        }
        BrowserMode::Viewing => return render_detail(state),
        BrowserMode::Searching => {
            return (
                format!("Search: {}_", state.search_query),
                "enter search · esc cancel".to_owned(),
            );
        }
        BrowserMode::Navigating => {}
    }

    if state.loading {
        return ("Loading...".to_owned(), "q quit".to_owned());
    }
    if let Some(error) = &state.error {
        return (format!("Error: {error}"), "r refresh · q quit".to_owned());
    }
    if state.records.is_empty() {
        let body = if state.filter.has_query() {
            format!("No results for \"{}\"", state.filter.query)
        } else {
            "No items found".to_owned()
        };
        let hint = if config.searchable {
            "r refresh · / search · q quit"
        } else {
            "r refresh · q quit"
        };
        return (body, hint.to_owned());
    }

    (render_records(state, config), key_summary(state, config))
}

fn render_detail<R: Record>(state: &BrowserState<R>) -> (String, String) {
    let lines = state.view_content.lines().collect::<Vec<_>>();
    let height = state.view_body_height();
    let start = state.view_scroll.min(lines.len());
    let end = (start + height).min(lines.len());
    let body = lines[start..end].join("\n");

    let hint = if lines.len() > height {
        format!(
            "lines {}-{end} of {} · j/k scroll · pgup/pgdn page · esc back",
            start + 1,
            lines.len()
        )
    } else {
        "esc back · q back".to_owned()
    };
    (body, hint)
}

/// Record rows the list shows at the current viewport height.
pub fn page_rows<R>(state: &BrowserState<R>, config: &ViewConfig<R>) -> usize {
    let rows = usize::from(state.viewport.height).saturating_sub(LIST_CHROME_ROWS);
    match config.shape {
        Shape::Table(_) => rows.saturating_sub(1).max(1),
        Shape::List => rows.max(1),
    }
}

fn render_records<R: Record>(state: &BrowserState<R>, config: &ViewConfig<R>) -> String {
    let mut lines = Vec::new();
    if let Shape::Table(columns) = &config.shape {
        lines.push(format!("  {}", header_row(columns)).trim_end().to_owned());
    }

    let capacity = page_rows(state, config);
    let (start, end) = visible_window(state.selected, state.records.len(), capacity);
    for (index, record) in state.records[start..end].iter().enumerate() {
        let index = start + index;
        let selected = index == state.selected;
        let marker = if selected { '>' } else { ' ' };
        let row = match &config.shape {
            Shape::Table(columns) => table_cells(record, columns),
            Shape::List => match &config.item_renderer {
                Some(renderer) => renderer(record, selected),
                None => format!("{:>2}. {}", index + 1, default_item(record)),
            },
        };
        lines.push(format!("{marker} {row}").trim_end().to_owned());
    }
    lines.join("\n")
}

/// Rows `[start, end)` to draw so the selection stays on screen.
fn visible_window(selected: usize, len: usize, capacity: usize) -> (usize, usize) {
    let start = (selected + 1).saturating_sub(capacity);
    (start, (start + capacity).min(len))
}

fn default_item<R: Record>(record: &R) -> String {
    let description = record.description();
    if description.is_empty() {
        record.title()
    } else {
        format!("{} · {description}", record.title())
    }
}

fn header_row(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| fit(&column.header, column.width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
}

fn table_cells<R: Record>(record: &R, columns: &[Column]) -> String {
    columns
        .iter()
        .map(|column| fit(&record.field_value(&column.field).display(), column.width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP)
}

/// Pads or truncates to exactly `width` characters.
fn fit(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count <= width {
        return format!("{value:<width$}");
    }
    if width == 0 {
        return String::new();
    }
    let mut truncated = value.chars().take(width - 1).collect::<String>();
    truncated.push('…');
    truncated
}

fn key_summary<R: Record>(state: &BrowserState<R>, config: &ViewConfig<R>) -> String {
    let mut parts = vec![format!(
        "{} of {}",
        state.records.len(),
        state.total_count.max(state.records.len())
    )];
    parts.push("j/k move".to_owned());
    if config.viewable {
        parts.push("enter view".to_owned());
    }
    if config.searchable {
        parts.push("/ search".to_owned());
    }
    parts.push("r refresh".to_owned());
    for (key, description) in &config.actions {
        parts.push(format!("{key} {description}"));
    }
    parts.push("? help".to_owned());
    parts.push("q quit".to_owned());
    parts.join(" · ")
}

fn help_legend<R>(config: &ViewConfig<R>, jumps: usize) -> String {
    let mut out = String::from("Navigate\n");
    push_key(&mut out, "k / up", "move up");
    push_key(&mut out, "j / down", "move down");
    let jump_keys = if jumps > 1 {
        format!("1-{jumps}")
    } else {
        "1".to_owned()
    };
    push_key(&mut out, &jump_keys, "jump to row");
    if config.viewable {
        push_key(&mut out, "enter / v", "view details");
    }
    if config.searchable {
        push_key(&mut out, "/", "search");
    }
    push_key(&mut out, "r", "refresh");
    push_key(&mut out, "?", "toggle help");
    push_key(&mut out, "q", "quit");

    if !config.actions.is_empty() {
        out.push_str("\nActions\n");
        for (key, description) in &config.actions {
            push_key(&mut out, &key.to_string(), description);
        }
    }
    if config.searchable {
        out.push_str("\nSearch\n");
        push_key(&mut out, "enter", "run search");
        push_key(&mut out, "esc", "cancel");
    }
    if config.viewable {
        out.push_str("\nDetails\n");
        push_key(&mut out, "j / k", "scroll");
        push_key(&mut out, "pgup / pgdn", "page");
        push_key(&mut out, "esc", "back");
    }
    out.trim_end().to_owned()
}

fn push_key(out: &mut String, key: &str, description: &str) {
    let _ = writeln!(out, "  {key:<12}{description}");
}

#[cfg(test)]
mod tests {
    use super::{
        Column, Shape, ViewConfig, fit, page_rows, render_static, render_text, visible_window,
    };
    use noteleaf_app::{
        BrowserMode, BrowserState, Capabilities, FilterState, Intent, Message, Task, TaskPriority,
        Viewport,
    };
    use noteleaf_testkit::LeafFaker;
    use std::sync::Arc;

    fn loaded(records: Vec<String>) -> BrowserState<String> {
        let mut state = BrowserState::new(
            FilterState::new(),
            Capabilities {
                searchable: true,
                viewable: true,
            },
        );
        state.start();
        let generation = state.generation;
        let count = records.len();
        state.apply(Message::RecordsLoaded {
            generation,
            records,
        });
        state.apply(Message::CountLoaded { generation, count });
        state
    }

    fn config() -> ViewConfig<String> {
        let mut config = ViewConfig::new("Tasks");
        config.viewable = true;
        config.actions = vec![('d', "mark done".to_owned())];
        config
    }

    fn names() -> Vec<String> {
        ["alpha", "beta", "gamma"].map(str::to_owned).to_vec()
    }

    #[test]
    fn render_is_idempotent() {
        let state = loaded(names());
        let config = config();
        assert_eq!(render_text(&state, &config), render_text(&state, &config));
    }

    #[test]
    fn list_marks_selection_and_summarises_keys() {
        let mut state = loaded(names());
        state.selected = 1;
        let text = render_text(&state, &config());
        assert!(text.contains("   1. alpha"), "{text}");
        assert!(text.contains(">  2. beta"), "{text}");
        assert!(text.contains(
            "3 of 3 · j/k move · enter view · / search · r refresh · d mark done · ? help · q quit"
        ));
    }

    #[test]
    fn loading_placeholder_wins_over_stale_records() {
        let mut state = loaded(names());
        state.loading = true;
        let text = render_text(&state, &config());
        assert!(text.starts_with("Loading..."));
        assert!(!text.contains("alpha"));
    }

    #[test]
    fn error_replaces_the_list() {
        let mut state = loaded(names());
        state.error = Some("database is locked".to_owned());
        assert_eq!(
            render_text(&state, &config()),
            "Error: database is locked\n\nr refresh · q quit"
        );
    }

    #[test]
    fn empty_states_mention_the_query() {
        let mut state = loaded(Vec::new());
        assert_eq!(
            render_text(&state, &config()),
            "No items found\n\nr refresh · / search · q quit"
        );

        state.filter = state.filter.clone().with_query("zzz");
        assert!(render_text(&state, &config()).starts_with("No results for \"zzz\""));

        let mut plain = config();
        plain.searchable = false;
        assert!(render_text(&state, &plain).ends_with("r refresh · q quit"));
    }

    #[test]
    fn help_outranks_everything() {
        let mut state = loaded(names());
        state.error = Some("boom".to_owned());
        state.mode = BrowserMode::Help;
        let text = render_text(&state, &config());
        assert!(text.starts_with("Navigate"));
        assert!(text.contains("  d           mark done"));
        assert!(text.contains("Details"));
        assert!(!text.contains("boom"));
    }

    #[test]
    fn search_prompt_shows_the_buffer() {
        let mut state = loaded(names());
        state.mode = BrowserMode::Searching;
        state.search_query = "bre".to_owned();
        assert_eq!(
            render_text(&state, &config()),
            "Search: bre_\n\nenter search · esc cancel"
        );
    }

    #[test]
    fn detail_view_scrolls_within_the_viewport() {
        let mut state = loaded(names());
        let content = (1..=40)
            .map(|line| format!("line {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        state.handle(Intent::View);
        let request = state.view_request;
        state.apply(Message::ViewRendered { request, content });
        state.view_scroll = 5;
        let text = render_text(&state, &config());
        assert!(text.starts_with("line 6\n"));
        assert!(text.contains("lines 6-25 of 40"), "{text}");
        assert!(!text.contains("line 26\n"));
    }

    #[test]
    fn help_lists_only_the_jump_keys_that_fit() {
        let mut state = loaded(names());
        state.mode = BrowserMode::Help;
        assert!(render_text(&state, &config()).contains("  1-9         jump to row"));

        state.viewport = Viewport {
            width: 80,
            height: 6,
        };
        assert_eq!(page_rows(&state, &config()), 3);
        assert!(render_text(&state, &config()).contains("  1-3         jump to row"));

        let mut table = config();
        table.shape = Shape::Table(vec![Column::new("title", "Title", 10)]);
        assert_eq!(page_rows(&state, &table), 2);
        state.viewport.height = 2;
        assert_eq!(page_rows(&state, &table), 1);
        assert!(render_text(&state, &table).contains("  1           jump to row"));
    }

    #[test]
    fn long_lists_keep_the_selection_visible() {
        assert_eq!(visible_window(0, 50, 10), (0, 10));
        assert_eq!(visible_window(9, 50, 10), (0, 10));
        assert_eq!(visible_window(10, 50, 10), (1, 11));
        assert_eq!(visible_window(49, 50, 10), (40, 50));
        assert_eq!(visible_window(0, 3, 10), (0, 3));

        let mut state = loaded((0..60).map(|index| format!("row {index}")).collect());
        state.selected = 59;
        let text = render_text(&state, &config());
        assert!(text.contains("> 60. row 59"));
        assert!(!text.contains(" 1. row 0\n"));
    }

    #[test]
    fn table_shape_renders_named_columns() {
        let mut faker = LeafFaker::new(7);
        let mut task: Task = faker.task_record(1);
        task.description = "Renew passport before the trip".to_owned();
        task.priority = TaskPriority::High;
        let mut state: BrowserState<Task> = BrowserState::new(FilterState::new(), Capabilities::default());
        state.start();
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: vec![task],
        });

        let mut config = ViewConfig::new("Tasks");
        config.shape = Shape::Table(vec![
            Column::new("id", "ID", 3),
            Column::new("description", "Description", 12),
            Column::new("priority", "Pri", 6),
        ]);
        let text = render_text(&state, &config);
        assert!(text.starts_with("  ID   Description   Pri"), "{text}");
        assert!(text.contains("> 1    Renew passp…  high"), "{text}");
    }

    #[test]
    fn item_renderer_overrides_default_rows() {
        let state = loaded(names());
        let mut config = config();
        config.item_renderer = Some(Arc::new(|record: &String, selected: bool| {
            if selected {
                record.to_uppercase()
            } else {
                record.clone()
            }
        }));
        let text = render_text(&state, &config);
        assert!(text.starts_with("> ALPHA\n  beta\n  gamma"), "{text}");
    }

    #[test]
    fn static_output_prints_title_then_rows() {
        assert_eq!(
            render_static(&names(), &config()),
            "Tasks\nalpha\nbeta\ngamma\n"
        );
        assert_eq!(
            render_static::<String>(&[], &config()),
            "Tasks\nNo items found\n"
        );
    }

    #[test]
    fn fit_pads_and_truncates() {
        assert_eq!(fit("ab", 4), "ab  ");
        assert_eq!(fit("abcdef", 4), "abc…");
        assert_eq!(fit("abc", 0), "");
    }
}
