// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use noteleaf_app::{BrowserMode, Intent};

pub(crate) const MAX_JUMP: usize = 9;

/// Keys the browser itself owns in navigation mode. Action bindings on
/// these keys are never reachable.
const RESERVED_KEYS: &[char] = &[
    'j', 'k', 'v', 'r', 'q', '/', '?', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Per-browser key table. Only the jump table changes after construction,
/// following the visible page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    jump_limit: usize,
    actions: Vec<(char, usize)>,
    searchable: bool,
}

impl Keymap {
    /// `action_keys` are given in action-table order.
    pub fn new(action_keys: impl IntoIterator<Item = char>, searchable: bool) -> Self {
        let mut actions: Vec<(char, usize)> = Vec::new();
        for (index, key) in action_keys.into_iter().enumerate() {
            if is_reserved(key) || actions.iter().any(|(bound, _)| *bound == key) {
                continue;
            }
            actions.push((key, index));
        }
        Self {
            jump_limit: MAX_JUMP,
            actions,
            searchable,
        }
    }

    pub const fn jump_limit(&self) -> usize {
        self.jump_limit
    }

    /// Limits numeric jumps to the rows currently on screen.
    pub fn fit_page(&mut self, visible_rows: usize) {
        self.jump_limit = visible_rows.clamp(1, MAX_JUMP);
    }

    pub fn action_index(&self, key: char) -> Option<usize> {
        self.actions
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, index)| *index)
    }
}

fn is_reserved(key: char) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Resolves a key press against the active mode. Help and viewing modes
/// only answer to their own keys.
pub fn route(key: KeyEvent, mode: BrowserMode, keymap: &Keymap) -> Option<Intent> {
    if is_interrupt(key) {
        return Some(match mode {
            BrowserMode::Searching => Intent::CancelSearch,
            BrowserMode::Navigating | BrowserMode::Viewing | BrowserMode::Help => Intent::Quit,
        });
    }

    match mode {
        BrowserMode::Help => route_help(key),
        BrowserMode::Viewing => route_viewing(key),
        BrowserMode::Searching => route_searching(key),
        BrowserMode::Navigating => route_navigating(key, keymap),
    }
}

fn route_help(key: KeyEvent) -> Option<Intent> {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => Some(Intent::Back),
        KeyCode::Char('q') => Some(Intent::Quit),
        KeyCode::Char('?') => Some(Intent::ToggleHelp),
        _ => None,
    }
}

fn route_viewing(key: KeyEvent) -> Option<Intent> {
    match key.code {
        KeyCode::Esc | KeyCode::Backspace => Some(Intent::Back),
        KeyCode::Char('q') => Some(Intent::Quit),
        KeyCode::Char('?') => Some(Intent::ToggleHelp),
        KeyCode::Char('j') | KeyCode::Down => Some(Intent::ScrollView(1)),
        KeyCode::Char('k') | KeyCode::Up => Some(Intent::ScrollView(-1)),
        KeyCode::PageDown => Some(Intent::PageView(1)),
        KeyCode::PageUp => Some(Intent::PageView(-1)),
        _ => None,
    }
}

fn route_searching(key: KeyEvent) -> Option<Intent> {
    match key.code {
        KeyCode::Enter => Some(Intent::CommitSearch),
        KeyCode::Esc => Some(Intent::CancelSearch),
        KeyCode::Backspace => Some(Intent::SearchBackspace),
        KeyCode::Char(ch) if is_plain(key.modifiers) => Some(Intent::SearchInput(ch)),
        _ => None,
    }
}

fn route_navigating(key: KeyEvent, keymap: &Keymap) -> Option<Intent> {
    match key.code {
        KeyCode::Up => return Some(Intent::MoveUp),
        KeyCode::Down => return Some(Intent::MoveDown),
        KeyCode::Enter => return Some(Intent::View),
        _ => {}
    }

    let KeyCode::Char(ch) = key.code else {
        return None;
    };
    if !is_plain(key.modifiers) {
        return None;
    }

    match ch {
        'k' => Some(Intent::MoveUp),
        'j' => Some(Intent::MoveDown),
        'v' => Some(Intent::View),
        'r' => Some(Intent::Refresh),
        'q' => Some(Intent::Quit),
        '?' => Some(Intent::ToggleHelp),
        '/' if keymap.searchable => Some(Intent::OpenSearch),
        '1'..='9' => {
            let row = ch.to_digit(10).map_or(0, |digit| digit as usize);
            (row <= keymap.jump_limit).then_some(Intent::Jump(row))
        }
        _ => keymap.action_index(ch).map(Intent::Action),
    }
}

fn is_interrupt(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

fn is_plain(modifiers: KeyModifiers) -> bool {
    !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}
