// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::FilterState;

/// Rows the detail view reserves for its header and key hints.
pub const VIEW_CHROME_ROWS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    Navigating,
    Searching,
    Viewing,
    Help,
}

impl BrowserMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Navigating => "nav",
            Self::Searching => "search",
            Self::Viewing => "view",
            Self::Help => "help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub searchable: bool,
    pub viewable: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            searchable: true,
            viewable: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

/// Semantic input, already resolved against the active mode's key table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    MoveUp,
    MoveDown,
    /// One-based row number.
    Jump(usize),
    View,
    OpenSearch,
    SearchInput(char),
    SearchBackspace,
    CommitSearch,
    CancelSearch,
    Refresh,
    /// Index into the browser's action table.
    Action(usize),
    ToggleHelp,
    Quit,
    Back,
    ScrollView(isize),
    PageView(isize),
    Resize { width: u16, height: u16 },
}

/// Work the controller asks the dispatcher to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Command<R> {
    Load {
        generation: u64,
        filter: FilterState,
    },
    Count {
        generation: u64,
        filter: FilterState,
    },
    Search {
        generation: u64,
        query: String,
        filter: FilterState,
    },
    /// `request` is echoed back so only the latest view is shown.
    View {
        request: u64,
        record: R,
    },
    Action {
        action: usize,
        record: R,
    },
    Exit,
}

/// Outcome of one dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<R> {
    RecordsLoaded { generation: u64, records: Vec<R> },
    LoadFailed { generation: u64, error: String },
    SearchFailed { generation: u64, error: String },
    CountLoaded { generation: u64, count: usize },
    CountFailed { generation: u64, error: String },
    ViewRendered { request: u64, content: String },
    ViewFailed { request: u64, error: String },
    ActionCompleted { action: usize },
    ActionFailed { action: usize, error: String },
}

impl<R> Message<R> {
    /// Generation the message answers, for load, count and search results.
    pub const fn generation(&self) -> Option<u64> {
        match self {
            Self::RecordsLoaded { generation, .. }
            | Self::LoadFailed { generation, .. }
            | Self::SearchFailed { generation, .. }
            | Self::CountLoaded { generation, .. }
            | Self::CountFailed { generation, .. } => Some(*generation),
            Self::ViewRendered { .. }
            | Self::ViewFailed { .. }
            | Self::ActionCompleted { .. }
            | Self::ActionFailed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserState<R> {
    pub records: Vec<R>,
    pub selected: usize,
    pub mode: BrowserMode,
    pub search_query: String,
    pub total_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub view_content: String,
    pub view_scroll: usize,
    pub viewport: Viewport,
    pub filter: FilterState,
    pub generation: u64,
    /// Id of the most recent detail view request.
    pub view_request: u64,
    pub capabilities: Capabilities,
}

impl<R: Clone> BrowserState<R> {
    pub fn new(filter: FilterState, capabilities: Capabilities) -> Self {
        Self {
            records: Vec::new(),
            selected: 0,
            mode: BrowserMode::Navigating,
            search_query: String::new(),
            total_count: 0,
            loading: true,
            error: None,
            view_content: String::new(),
            view_scroll: 0,
            viewport: Viewport::default(),
            filter,
            generation: 0,
            view_request: 0,
            capabilities,
        }
    }

    /// Commands for the first load of a session.
    pub fn start(&mut self) -> Vec<Command<R>> {
        self.reload()
    }

    pub fn selected_record(&self) -> Option<&R> {
        self.records.get(self.selected)
    }

    pub fn is_stale(&self, generation: u64) -> bool {
        generation < self.generation
    }

    pub fn view_body_height(&self) -> usize {
        usize::from(self.viewport.height)
            .saturating_sub(VIEW_CHROME_ROWS)
            .max(1)
    }

    pub fn handle(&mut self, intent: Intent) -> Vec<Command<R>> {
        if let Intent::Resize { width, height } = intent {
            self.viewport = Viewport { width, height };
            self.clamp_view_scroll();
            return Vec::new();
        }

        match self.mode {
            BrowserMode::Help => self.handle_help(intent),
            BrowserMode::Viewing => self.handle_viewing(intent),
            BrowserMode::Searching => self.handle_searching(intent),
            BrowserMode::Navigating => self.handle_navigating(intent),
        }
    }

    pub fn apply(&mut self, message: Message<R>) -> Vec<Command<R>> {
        if let Some(generation) = message.generation()
            && self.is_stale(generation)
        {
            return Vec::new();
        }

        match message {
            Message::RecordsLoaded { records, .. } => {
                self.records = records;
                self.loading = false;
                self.error = None;
                self.clamp_selection();
                Vec::new()
            }
            Message::LoadFailed { error, .. } | Message::SearchFailed { error, .. } => {
                self.error = Some(error);
                self.loading = false;
                Vec::new()
            }
            Message::CountLoaded { count, .. } => {
                self.total_count = count;
                Vec::new()
            }
            Message::CountFailed { .. } => {
                self.total_count = 0;
                Vec::new()
            }
            Message::ViewRendered { request, content } => {
                // Views only open from the list, and only for the latest request.
                if request == self.view_request && self.mode == BrowserMode::Navigating {
                    self.view_content = content;
                    self.view_scroll = 0;
                    self.mode = BrowserMode::Viewing;
                }
                Vec::new()
            }
            Message::ViewFailed { request, error } => {
                if request == self.view_request {
                    self.error = Some(error);
                }
                Vec::new()
            }
            Message::ActionFailed { error, .. } => {
                self.error = Some(error);
                Vec::new()
            }
            Message::ActionCompleted { .. } => self.reload(),
        }
    }

    fn handle_help(&mut self, intent: Intent) -> Vec<Command<R>> {
        if matches!(intent, Intent::ToggleHelp | Intent::Back | Intent::Quit) {
            self.mode = BrowserMode::Navigating;
        }
        Vec::new()
    }

    fn handle_viewing(&mut self, intent: Intent) -> Vec<Command<R>> {
        match intent {
            Intent::Back | Intent::Quit => self.close_view(),
            Intent::ToggleHelp => {
                self.close_view();
                self.mode = BrowserMode::Help;
            }
            Intent::ScrollView(delta) => self.scroll_view(delta),
            Intent::PageView(pages) => {
                let page = isize::try_from(self.view_body_height()).unwrap_or(isize::MAX);
                self.scroll_view(pages.saturating_mul(page));
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_searching(&mut self, intent: Intent) -> Vec<Command<R>> {
        match intent {
            Intent::SearchInput(ch) => {
                self.search_query.push(ch);
                Vec::new()
            }
            Intent::SearchBackspace => {
                self.search_query.pop();
                Vec::new()
            }
            Intent::CommitSearch => self.commit_search(),
            Intent::CancelSearch => {
                self.search_query.clear();
                self.mode = BrowserMode::Navigating;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn handle_navigating(&mut self, intent: Intent) -> Vec<Command<R>> {
        match intent {
            Intent::MoveUp => {
                self.selected = self.selected.saturating_sub(1);
                self.clamp_selection();
            }
            Intent::MoveDown => {
                self.selected = self.selected.saturating_add(1);
                self.clamp_selection();
            }
            Intent::Jump(row) => {
                if row >= 1 && row <= self.records.len() {
                    self.selected = row - 1;
                }
            }
            Intent::View => {
                if self.capabilities.viewable
                    && let Some(record) = self.selected_record().cloned()
                {
                    self.view_request += 1;
                    return vec![Command::View {
                        request: self.view_request,
                        record,
                    }];
                }
            }
            Intent::OpenSearch => {
                if self.capabilities.searchable {
                    self.search_query.clear();
                    self.mode = BrowserMode::Searching;
                }
            }
            Intent::Refresh => {
                if !self.loading {
                    return self.reload();
                }
            }
            Intent::Action(action) => {
                if let Some(record) = self.selected_record() {
                    return vec![Command::Action {
                        action,
                        record: record.clone(),
                    }];
                }
            }
            Intent::ToggleHelp => self.mode = BrowserMode::Help,
            Intent::Quit => return vec![Command::Exit],
            Intent::SearchInput(_)
            | Intent::SearchBackspace
            | Intent::CommitSearch
            | Intent::CancelSearch
            | Intent::Back
            | Intent::ScrollView(_)
            | Intent::PageView(_)
            | Intent::Resize { .. } => {}
        }
        Vec::new()
    }

    fn commit_search(&mut self) -> Vec<Command<R>> {
        self.mode = BrowserMode::Navigating;
        let query = self.search_query.trim().to_owned();
        if query.is_empty() {
            self.filter = self.filter.clone().with_query("");
            return self.reload();
        }

        self.filter = self.filter.clone().with_query(query.clone());
        self.generation += 1;
        self.loading = true;
        vec![
            Command::Search {
                generation: self.generation,
                query,
                filter: self.filter.clone(),
            },
            Command::Count {
                generation: self.generation,
                filter: self.filter.clone(),
            },
        ]
    }

    fn reload(&mut self) -> Vec<Command<R>> {
        self.generation += 1;
        self.loading = true;
        vec![
            Command::Load {
                generation: self.generation,
                filter: self.filter.clone(),
            },
            Command::Count {
                generation: self.generation,
                filter: self.filter.clone(),
            },
        ]
    }

    fn close_view(&mut self) {
        self.view_content.clear();
        self.view_scroll = 0;
        self.mode = BrowserMode::Navigating;
    }

    fn scroll_view(&mut self, delta: isize) {
        self.view_scroll = if delta.is_negative() {
            self.view_scroll.saturating_sub(delta.unsigned_abs())
        } else {
            self.view_scroll.saturating_add(delta.unsigned_abs())
        };
        self.clamp_view_scroll();
    }

    fn clamp_view_scroll(&mut self) {
        let lines = self.view_content.lines().count();
        let max_scroll = lines.saturating_sub(self.view_body_height());
        self.view_scroll = self.view_scroll.min(max_scroll);
    }

    fn clamp_selection(&mut self) {
        if self.records.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.records.len() - 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BrowserMode, BrowserState, Capabilities, Command, Intent, Message, Viewport};
    use crate::FilterState;

    fn capabilities() -> Capabilities {
        Capabilities {
            searchable: true,
            viewable: true,
        }
    }

    fn records(count: usize) -> Vec<String> {
        (0..count).map(|index| format!("record {index}")).collect()
    }

    fn loaded_state(count: usize) -> BrowserState<String> {
        let mut state = BrowserState::new(FilterState::new(), capabilities());
        state.start();
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: records(count),
        });
        state
    }

    fn open_view(state: &mut BrowserState<String>, content: &str) {
        state.handle(Intent::View);
        let request = state.view_request;
        state.apply(Message::ViewRendered {
            request,
            content: content.to_owned(),
        });
    }

    #[test]
    fn start_seeds_loading_and_requests_load_and_count() {
        let filter = FilterState::new().with_limit(10);
        let mut state: BrowserState<String> = BrowserState::new(filter.clone(), capabilities());
        assert!(state.loading);

        let commands = state.start();
        assert_eq!(
            commands,
            vec![
                Command::Load {
                    generation: 1,
                    filter: filter.clone(),
                },
                Command::Count {
                    generation: 1,
                    filter,
                },
            ]
        );
    }

    #[test]
    fn selection_stays_in_bounds_for_any_navigation_sequence() {
        for count in 0..6 {
            let mut state = loaded_state(count);
            let mut seed = 0x2545_F491_u64.wrapping_add(count as u64);
            for _ in 0..200 {
                seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
                let intent = match (seed >> 33) % 3 {
                    0 => Intent::MoveUp,
                    1 => Intent::MoveDown,
                    _ => Intent::Jump(((seed >> 40) % 10) as usize),
                };
                state.handle(intent);
                if count == 0 {
                    assert_eq!(state.selected, 0);
                } else {
                    assert!(state.selected < count, "selected {}", state.selected);
                }
            }
        }
    }

    #[test]
    fn jump_ignores_rows_past_the_end() {
        let mut state = loaded_state(3);
        state.handle(Intent::Jump(3));
        assert_eq!(state.selected, 2);
        state.handle(Intent::Jump(5));
        assert_eq!(state.selected, 2);
        state.handle(Intent::Jump(0));
        assert_eq!(state.selected, 2);
        state.handle(Intent::Jump(1));
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn reload_that_shrinks_the_set_clamps_selection() {
        let mut state = loaded_state(5);
        state.handle(Intent::Jump(5));
        assert_eq!(state.selected, 4);

        let commands = state.handle(Intent::Refresh);
        assert_eq!(commands.len(), 2);
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: records(2),
        });
        assert_eq!(state.selected, 1);

        state.handle(Intent::Refresh);
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: Vec::new(),
        });
        assert_eq!(state.selected, 0);
    }

    #[test]
    fn viewing_and_help_suppress_navigation_and_search() {
        let mut state = loaded_state(4);
        state.handle(Intent::MoveDown);
        open_view(&mut state, "details");
        assert_eq!(state.mode, BrowserMode::Viewing);

        for intent in [
            Intent::MoveDown,
            Intent::MoveUp,
            Intent::Jump(3),
            Intent::OpenSearch,
            Intent::Refresh,
            Intent::View,
            Intent::Action(0),
        ] {
            assert!(state.handle(intent).is_empty());
            assert_eq!(state.mode, BrowserMode::Viewing);
            assert_eq!(state.selected, 1);
        }

        state.handle(Intent::ToggleHelp);
        assert_eq!(state.mode, BrowserMode::Help);
        assert!(state.view_content.is_empty());
        for intent in [Intent::MoveDown, Intent::OpenSearch, Intent::Refresh] {
            assert!(state.handle(intent).is_empty());
            assert_eq!(state.mode, BrowserMode::Help);
        }
        assert_eq!(state.selected, 1);
    }

    #[test]
    fn quit_backs_out_of_sub_modes_before_exiting() {
        let mut state = loaded_state(1);
        state.handle(Intent::ToggleHelp);
        assert!(state.handle(Intent::Quit).is_empty());
        assert_eq!(state.mode, BrowserMode::Navigating);

        open_view(&mut state, "body");
        assert!(state.handle(Intent::Quit).is_empty());
        assert_eq!(state.mode, BrowserMode::Navigating);
        assert!(state.view_content.is_empty());

        assert_eq!(state.handle(Intent::Quit), vec![Command::Exit]);
    }

    #[test]
    fn help_toggle_always_returns_to_navigation() {
        let mut state = loaded_state(1);
        state.handle(Intent::ToggleHelp);
        assert_eq!(state.mode, BrowserMode::Help);
        state.handle(Intent::ToggleHelp);
        assert_eq!(state.mode, BrowserMode::Navigating);

        state.handle(Intent::ToggleHelp);
        state.handle(Intent::Back);
        assert_eq!(state.mode, BrowserMode::Navigating);
    }

    #[test]
    fn search_round_trip_edits_buffer_and_commits_one_search() {
        let mut state = loaded_state(2);
        state.handle(Intent::OpenSearch);
        assert_eq!(state.mode, BrowserMode::Searching);
        for ch in ['a', 'b', 'c'] {
            state.handle(Intent::SearchInput(ch));
        }
        state.handle(Intent::SearchBackspace);
        assert_eq!(state.search_query, "ab");

        let commands = state.handle(Intent::CommitSearch);
        assert_eq!(state.mode, BrowserMode::Navigating);
        assert!(state.loading);
        let filter = FilterState::new().with_query("ab");
        assert_eq!(
            commands,
            vec![
                Command::Search {
                    generation: state.generation,
                    query: "ab".to_owned(),
                    filter: filter.clone(),
                },
                Command::Count {
                    generation: state.generation,
                    filter,
                },
            ]
        );
    }

    #[test]
    fn search_count_replaces_the_unfiltered_total() {
        let mut state = loaded_state(3);
        let generation = state.generation;
        state.apply(Message::CountLoaded {
            generation,
            count: 3,
        });

        state.handle(Intent::OpenSearch);
        state.handle(Intent::SearchInput('b'));
        state.handle(Intent::CommitSearch);
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: records(2),
        });
        state.apply(Message::CountLoaded {
            generation,
            count: 2,
        });
        assert_eq!(state.records.len(), 2);
        assert_eq!(state.total_count, 2);
    }

    #[test]
    fn cancel_search_keeps_records_and_emits_nothing() {
        let mut state = loaded_state(3);
        state.handle(Intent::OpenSearch);
        state.handle(Intent::SearchInput('x'));
        let commands = state.handle(Intent::CancelSearch);

        assert!(commands.is_empty());
        assert_eq!(state.mode, BrowserMode::Navigating);
        assert_eq!(state.records, records(3));
        assert!(state.search_query.is_empty());
        assert_eq!(state.filter.query, "");
    }

    #[test]
    fn searching_treats_command_keys_as_text() {
        let mut state = loaded_state(3);
        state.handle(Intent::OpenSearch);
        assert!(state.handle(Intent::MoveDown).is_empty());
        assert!(state.handle(Intent::Refresh).is_empty());
        assert_eq!(state.selected, 0);
        assert_eq!(state.mode, BrowserMode::Searching);
    }

    #[test]
    fn empty_commit_clears_query_and_reloads() {
        let mut state = loaded_state(2);
        state.filter = state.filter.clone().with_query("old");
        state.handle(Intent::OpenSearch);
        state.handle(Intent::SearchInput(' '));

        let commands = state.handle(Intent::CommitSearch);
        assert_eq!(state.filter.query, "");
        assert!(matches!(commands[0], Command::Load { .. }));
        assert!(matches!(commands[1], Command::Count { .. }));
    }

    #[test]
    fn search_is_ignored_when_disabled() {
        let mut state: BrowserState<String> = BrowserState::new(
            FilterState::new(),
            Capabilities {
                searchable: false,
                viewable: false,
            },
        );
        state.handle(Intent::OpenSearch);
        assert_eq!(state.mode, BrowserMode::Navigating);
    }

    #[test]
    fn refresh_is_debounced_while_loading() {
        let mut state: BrowserState<String> = BrowserState::new(FilterState::new(), capabilities());
        state.start();
        assert!(state.handle(Intent::Refresh).is_empty());

        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: records(1),
        });
        assert_eq!(state.handle(Intent::Refresh).len(), 2);
    }

    #[test]
    fn count_failure_is_invisible() {
        let mut state = loaded_state(3);
        let generation = state.generation;
        state.apply(Message::CountLoaded {
            generation,
            count: 9,
        });
        assert_eq!(state.total_count, 9);

        state.apply(Message::CountFailed {
            generation,
            error: "count exploded".to_owned(),
        });
        assert_eq!(state.total_count, 0);
        assert!(state.error.is_none());
        assert_eq!(state.records, records(3));
    }

    #[test]
    fn load_failure_keeps_stale_records_until_next_success() {
        let mut state = loaded_state(2);
        state.handle(Intent::Refresh);
        let generation = state.generation;
        state.apply(Message::LoadFailed {
            generation,
            error: "database error".to_owned(),
        });
        assert_eq!(state.error.as_deref(), Some("database error"));
        assert!(!state.loading);
        assert_eq!(state.records, records(2));

        state.handle(Intent::MoveDown);
        assert!(state.error.is_some(), "navigation must not clear errors");

        state.handle(Intent::Refresh);
        let generation = state.generation;
        state.apply(Message::RecordsLoaded {
            generation,
            records: records(4),
        });
        assert!(state.error.is_none());
        assert_eq!(state.records.len(), 4);
    }

    #[test]
    fn stale_results_from_superseded_generations_are_dropped() {
        let mut state = loaded_state(1);
        state.handle(Intent::Refresh);
        let load_generation = state.generation;

        state.handle(Intent::OpenSearch);
        state.handle(Intent::SearchInput('q'));
        state.handle(Intent::CommitSearch);
        let search_generation = state.generation;
        assert!(search_generation > load_generation);

        state.apply(Message::RecordsLoaded {
            generation: search_generation,
            records: vec!["match".to_owned()],
        });
        state.apply(Message::RecordsLoaded {
            generation: load_generation,
            records: records(5),
        });
        state.apply(Message::LoadFailed {
            generation: load_generation,
            error: "late failure".to_owned(),
        });

        assert_eq!(state.records, vec!["match".to_owned()]);
        assert!(state.error.is_none());
    }

    #[test]
    fn view_requires_formatter_and_a_record() {
        let mut state = loaded_state(0);
        assert!(state.handle(Intent::View).is_empty());

        let mut state = loaded_state(3);
        state.handle(Intent::MoveDown);
        state.handle(Intent::MoveDown);
        assert_eq!(
            state.handle(Intent::View),
            vec![Command::View {
                request: 1,
                record: "record 2".to_owned(),
            }]
        );

        state.capabilities.viewable = false;
        assert!(state.handle(Intent::View).is_empty());
    }

    #[test]
    fn late_view_does_not_interrupt_typing() {
        let mut state = loaded_state(1);
        state.handle(Intent::View);
        state.handle(Intent::OpenSearch);
        let request = state.view_request;
        state.apply(Message::ViewRendered {
            request,
            content: "late".to_owned(),
        });
        assert_eq!(state.mode, BrowserMode::Searching);
        assert!(state.view_content.is_empty());
    }

    #[test]
    fn late_view_does_not_replace_help() {
        let mut state = loaded_state(1);
        state.handle(Intent::View);
        state.handle(Intent::ToggleHelp);
        let request = state.view_request;
        state.apply(Message::ViewRendered {
            request,
            content: "detail of record 0".to_owned(),
        });
        assert_eq!(state.mode, BrowserMode::Help);
        assert!(state.view_content.is_empty());
    }

    #[test]
    fn only_the_latest_view_request_is_shown() {
        let mut state = loaded_state(2);
        state.handle(Intent::View);
        let first = state.view_request;
        state.handle(Intent::MoveDown);
        let commands = state.handle(Intent::View);
        let second = state.view_request;
        assert!(second > first);
        assert_eq!(
            commands,
            vec![Command::View {
                request: second,
                record: "record 1".to_owned(),
            }]
        );

        state.apply(Message::ViewFailed {
            request: first,
            error: "record 0 vanished".to_owned(),
        });
        assert!(state.error.is_none());
        state.apply(Message::ViewRendered {
            request: second,
            content: "detail of record 1".to_owned(),
        });
        state.apply(Message::ViewRendered {
            request: first,
            content: "detail of record 0".to_owned(),
        });

        assert_eq!(state.selected, 1);
        assert_eq!(state.mode, BrowserMode::Viewing);
        assert_eq!(state.view_content, "detail of record 1");
    }

    #[test]
    fn latest_view_failure_surfaces_as_error() {
        let mut state = loaded_state(1);
        state.handle(Intent::View);
        let request = state.view_request;
        state.apply(Message::ViewFailed {
            request,
            error: "note body is unreadable".to_owned(),
        });
        assert_eq!(state.error.as_deref(), Some("note body is unreadable"));
        assert_eq!(state.mode, BrowserMode::Navigating);
    }

    #[test]
    fn action_binds_selected_record_and_completion_reloads() {
        let mut state = loaded_state(2);
        state.handle(Intent::MoveDown);
        let commands = state.handle(Intent::Action(1));
        assert_eq!(
            commands,
            vec![Command::Action {
                action: 1,
                record: "record 1".to_owned(),
            }]
        );

        let before = state.generation;
        let follow_up = state.apply(Message::ActionCompleted { action: 1 });
        assert_eq!(follow_up.len(), 2);
        assert!(state.loading);
        assert_eq!(state.generation, before + 1);

        let mut empty = loaded_state(0);
        assert!(empty.handle(Intent::Action(0)).is_empty());
    }

    #[test]
    fn action_failure_surfaces_as_error() {
        let mut state = loaded_state(1);
        state.apply(Message::ActionFailed {
            action: 0,
            error: "task is locked".to_owned(),
        });
        assert_eq!(state.error.as_deref(), Some("task is locked"));
        assert_eq!(state.records.len(), 1);
    }

    #[test]
    fn resize_updates_viewport_and_clamps_scroll() {
        let mut state = loaded_state(1);
        let content = (0..50)
            .map(|line| format!("line {line}"))
            .collect::<Vec<_>>()
            .join("\n");
        open_view(&mut state, &content);
        state.handle(Intent::PageView(10));
        assert_eq!(state.view_scroll, 50 - state.view_body_height());

        state.handle(Intent::Resize {
            width: 120,
            height: 60,
        });
        assert_eq!(
            state.viewport,
            Viewport {
                width: 120,
                height: 60,
            }
        );
        assert_eq!(state.view_scroll, 0);
        assert_eq!(state.mode, BrowserMode::Viewing);

        state.handle(Intent::ScrollView(-3));
        assert_eq!(state.view_scroll, 0);
    }
}
