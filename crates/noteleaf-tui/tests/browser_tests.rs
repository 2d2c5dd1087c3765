// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use noteleaf_app::{BrowserMode, DataSource, FilterState};
use noteleaf_testkit::{MemorySource, SourceCall};
use noteleaf_tui::{Browser, Column, EventSource};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const END_OF_SCRIPT: &str = "end of script";

enum Step {
    Key(KeyEvent),
    Run(Box<dyn FnOnce()>),
}

/// Replays keys in order, waiting for every worker result before each one.
struct Script {
    steps: VecDeque<Step>,
}

impl Script {
    fn keys(keys: &str) -> Self {
        Self {
            steps: keys.chars().map(|ch| Step::Key(key(code_for(ch)))).collect(),
        }
    }

    fn then(mut self, step: Step) -> Self {
        self.steps.push_back(step);
        self
    }

    fn then_keys(mut self, keys: &str) -> Self {
        self.steps
            .extend(keys.chars().map(|ch| Step::Key(key(code_for(ch)))));
        self
    }
}

impl EventSource for Script {
    fn next_event(&mut self, _timeout: Duration) -> Result<Option<Event>> {
        match self.steps.pop_front() {
            Some(Step::Key(key)) => Ok(Some(Event::Key(key))),
            Some(Step::Run(effect)) => {
                effect();
                Ok(None)
            }
            None => bail!(END_OF_SCRIPT),
        }
    }

    fn settle_first(&self) -> bool {
        true
    }
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

/// `\n` stands for Enter and `\x1b` for Esc.
fn code_for(ch: char) -> KeyCode {
    match ch {
        '\n' => KeyCode::Enter,
        '\x1b' => KeyCode::Esc,
        other => KeyCode::Char(other),
    }
}

fn records(count: usize) -> Vec<String> {
    (0..count).map(|index| format!("record {index}")).collect()
}

fn terminal() -> Result<Terminal<TestBackend>> {
    Ok(Terminal::new(TestBackend::new(72, 20))?)
}

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

/// Runs until the script is exhausted, leaving the last frame on screen.
fn run_until_script_ends(
    browser: &Browser<String>,
    terminal: &mut Terminal<TestBackend>,
    mut script: Script,
) -> Result<()> {
    match browser.run_loop(terminal, &mut script) {
        Ok(state) => Err(anyhow!("browser exited early in {:?} mode", state.mode)),
        Err(error) if error.to_string() == END_OF_SCRIPT => Ok(()),
        Err(error) => Err(error),
    }
}

fn source_of(source: &Arc<MemorySource<String>>) -> Arc<dyn DataSource<String>> {
    Arc::clone(source) as Arc<dyn DataSource<String>>
}

#[test]
fn empty_repository_shows_empty_state() -> Result<()> {
    let source = Arc::new(MemorySource::new(Vec::new()));
    let browser = Browser::new(source_of(&source)).title("Tasks");
    let mut terminal = terminal()?;

    let state = browser.run_loop(&mut terminal, &mut Script::keys("q"))?;

    let screen = screen(&terminal);
    assert!(screen.contains("Tasks · nav"), "{screen}");
    assert!(screen.contains("No items found"), "{screen}");
    assert!(screen.contains("r refresh · / search · q quit"), "{screen}");
    assert!(state.records.is_empty());
    assert_eq!(state.total_count, 0);
    Ok(())
}

#[test]
fn viewing_the_third_record_shows_its_details() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(5)));
    let viewed = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&viewed);
    let browser = Browser::new(source_of(&source))
        .title("Notes")
        .detail_view(move |record: &String| {
            seen.lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push(record.clone());
            Ok(format!("# {record}\n\nbody of {record}"))
        });
    let mut terminal = terminal()?;

    run_until_script_ends(&browser, &mut terminal, Script::keys("jj\n"))?;

    let screen = screen(&terminal);
    assert!(screen.contains("Notes · view"), "{screen}");
    assert!(screen.contains("# record 2"), "{screen}");
    assert!(screen.contains("body of record 2"), "{screen}");
    assert!(screen.contains("esc back"), "{screen}");
    assert_eq!(
        *viewed.lock().map_err(|_| anyhow!("poisoned"))?,
        vec!["record 2".to_owned()]
    );
    Ok(())
}

#[test]
fn load_error_then_refresh_recovers() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(3)));
    source.fail_loads(Some("database error"));
    let browser = Browser::new(source_of(&source)).title("Books");

    let mut terminal = terminal()?;
    run_until_script_ends(&browser, &mut terminal, Script::keys(""))?;
    let screen = screen(&terminal);
    assert!(screen.contains("Error: database error"), "{screen}");
    assert!(screen.contains("r refresh · q quit"), "{screen}");

    let recovering = Arc::clone(&source);
    let mut script = Script::keys("")
        .then(Step::Run(Box::new(move || recovering.fail_loads(None))))
        .then_keys("rq");
    let state = browser.run_loop(&mut terminal, &mut script)?;

    assert!(state.error.is_none());
    assert_eq!(state.records, records(3));
    assert_eq!(state.total_count, 3);
    let screen = self::screen(&terminal);
    assert!(screen.contains(">  1. record 0"), "{screen}");
    Ok(())
}

#[test]
fn search_replaces_records_with_matches() -> Result<()> {
    let source = Arc::new(MemorySource::new(vec![
        "buy bread".to_owned(),
        "call plumber".to_owned(),
        "bread recipe".to_owned(),
    ]));
    let browser = Browser::new(source_of(&source)).filter(FilterState::new().with_limit(20));
    let mut terminal = terminal()?;

    let state = browser.run_loop(&mut terminal, &mut Script::keys("/bread\nq"))?;

    assert_eq!(
        state.records,
        vec!["buy bread".to_owned(), "bread recipe".to_owned()]
    );
    assert_eq!(state.filter.query, "bread");
    assert_eq!(state.mode, BrowserMode::Navigating);
    assert!(source.calls().contains(&SourceCall::Search(
        "bread".to_owned(),
        FilterState::new().with_limit(20).with_query("bread"),
    )));
    assert!(source.calls().contains(&SourceCall::Count(
        FilterState::new().with_limit(20).with_query("bread"),
    )));
    assert_eq!(state.total_count, 2);
    let screen = screen(&terminal);
    assert!(screen.contains("2 of 2"), "{screen}");
    Ok(())
}

#[test]
fn jumps_stop_at_the_last_visible_row() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(5)));
    let browser = Browser::new(source_of(&source));
    let mut terminal = Terminal::new(TestBackend::new(72, 6))?;

    let state = browser.run_loop(&mut terminal, &mut Script::keys("35q"))?;

    assert_eq!(state.selected, 2);
    Ok(())
}

#[test]
fn search_prompt_captures_command_keys() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(2)));
    let browser = Browser::new(source_of(&source));
    let mut terminal = terminal()?;

    let state = browser.run_loop(&mut terminal, &mut Script::keys("/qj\x1bq"))?;

    assert_eq!(state.mode, BrowserMode::Navigating);
    assert_eq!(state.selected, 0);
    assert!(state.search_query.is_empty());
    assert!(
        !source
            .calls()
            .iter()
            .any(|call| matches!(call, SourceCall::Search(..)))
    );
    Ok(())
}

#[test]
fn action_runs_on_selection_and_reloads() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(3)));
    let store = Arc::clone(&source);
    let browser = Browser::new(source_of(&source))
        .title("Tasks")
        .action('d', "mark done", move |record: &String| {
            let remaining = records(3)
                .into_iter()
                .filter(|candidate| candidate != record)
                .collect();
            store.set_records(remaining);
            Ok(())
        });
    let mut terminal = terminal()?;

    let state = browser.run_loop(&mut terminal, &mut Script::keys("jdq"))?;

    assert_eq!(
        state.records,
        vec!["record 0".to_owned(), "record 2".to_owned()]
    );
    assert_eq!(state.selected, 1);
    let loads = source
        .calls()
        .iter()
        .filter(|call| matches!(call, SourceCall::Load(_)))
        .count();
    assert_eq!(loads, 2);
    Ok(())
}

#[test]
fn failed_action_surfaces_error() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(1)));
    let browser = Browser::new(source_of(&source))
        .action('d', "mark done", |_: &String| bail!("task is locked"));
    let mut terminal = terminal()?;

    run_until_script_ends(&browser, &mut terminal, Script::keys("d"))?;

    let screen = screen(&terminal);
    assert!(screen.contains("Error: task is locked"), "{screen}");
    Ok(())
}

#[test]
fn help_overlay_lists_bound_actions() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(1)));
    let browser = Browser::new(source_of(&source))
        .action('a', "archive", |_: &String| Ok(()))
        .action('q', "shadowed", |_: &String| Ok(()));
    let mut terminal = terminal()?;

    run_until_script_ends(&browser, &mut terminal, Script::keys("?"))?;

    let screen = screen(&terminal);
    assert!(screen.contains("Navigate"), "{screen}");
    assert!(screen.contains("archive"), "{screen}");
    assert!(!screen.contains("shadowed"), "{screen}");
    Ok(())
}

#[test]
fn table_shape_draws_headers() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(2)));
    let browser = Browser::new(source_of(&source)).columns(vec![Column::new("title", "Name", 10)]);
    let mut terminal = terminal()?;

    browser.run_loop(&mut terminal, &mut Script::keys("q"))?;

    let screen = screen(&terminal);
    assert!(screen.contains("Name"), "{screen}");
    Ok(())
}

#[test]
fn static_mode_prints_title_and_one_line_per_record() -> Result<()> {
    let source = Arc::new(MemorySource::new(records(2)));
    let browser = Browser::new(source_of(&source))
        .title("Articles")
        .static_mode(true);
    assert!(browser.is_static());

    let mut out = Vec::new();
    browser.run_static(&mut out)?;
    assert_eq!(String::from_utf8(out)?, "Articles\nrecord 0\nrecord 1\n");

    source.set_records(Vec::new());
    let mut out = Vec::new();
    browser.run_static(&mut out)?;
    assert_eq!(String::from_utf8(out)?, "Articles\nNo items found\n");
    assert_eq!(
        source.calls(),
        vec![
            SourceCall::Load(FilterState::new()),
            SourceCall::Load(FilterState::new()),
        ]
    );
    Ok(())
}

#[test]
fn static_mode_returns_load_errors() {
    let source = Arc::new(MemorySource::new(records(2)));
    source.fail_loads(Some("no such table: tasks"));
    let browser = Browser::new(source_of(&source)).title("Tasks");

    let mut out = Vec::new();
    let error = browser
        .run_static(&mut out)
        .expect_err("load failure must reach the caller");
    assert_eq!(format!("{error:#}"), "load Tasks: no such table: tasks");
    assert!(out.is_empty());
}
