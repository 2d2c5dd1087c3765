// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod dispatch;
pub mod keymap;
pub mod view;

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use noteleaf_app::{
    ActionBinding, BrowserState, Capabilities, Command, DataSource, DetailFormatter, FilterState,
    Intent, Message, Record,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use tracing::{trace, warn};

pub use dispatch::Dispatcher;
pub use keymap::{Keymap, route};
pub use view::{Column, ItemRenderer, Shape, ViewConfig, render_static, render_text};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Where the event loop reads terminal input from.
pub trait EventSource {
    /// Next input event, or `None` when nothing arrived within `timeout`.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>>;

    /// When true the loop applies every outstanding worker result before
    /// asking for the next event. Scripted sources use this to replay input
    /// deterministically.
    fn settle_first(&self) -> bool {
        false
    }
}

/// Live input from the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if !event::poll(timeout).context("poll event")? {
            return Ok(None);
        }
        event::read().context("read event").map(Some)
    }
}

/// A browsable list over any [`DataSource`], configured builder-style.
pub struct Browser<R: Record> {
    source: Arc<dyn DataSource<R>>,
    title: String,
    searchable: bool,
    shape: Shape,
    item_renderer: Option<ItemRenderer<R>>,
    detail: Option<DetailFormatter<R>>,
    actions: Vec<ActionBinding<R>>,
    filter: FilterState,
    static_mode: bool,
}

impl<R: Record> Browser<R> {
    pub fn new(source: Arc<dyn DataSource<R>>) -> Self {
        Self {
            source,
            title: "noteleaf".to_owned(),
            searchable: true,
            shape: Shape::List,
            item_renderer: None,
            detail: None,
            actions: Vec::new(),
            filter: FilterState::new(),
            static_mode: false,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    /// Switches to the table shape.
    pub fn columns(mut self, columns: Vec<Column>) -> Self {
        self.shape = Shape::Table(columns);
        self
    }

    pub fn item_renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&R, bool) -> String + Send + Sync + 'static,
    {
        self.item_renderer = Some(Arc::new(renderer));
        self
    }

    pub fn detail_view<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&R) -> Result<String> + Send + Sync + 'static,
    {
        self.detail = Some(Arc::new(formatter));
        self
    }

    pub fn action<F>(mut self, key: char, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&R) -> Result<()> + Send + Sync + 'static,
    {
        self.actions
            .push(ActionBinding::new(key, description, handler));
        self
    }

    pub fn filter(mut self, filter: FilterState) -> Self {
        self.filter = filter;
        self
    }

    pub fn static_mode(mut self, static_mode: bool) -> Self {
        self.static_mode = static_mode;
        self
    }

    pub fn is_static(&self) -> bool {
        self.static_mode
    }

    /// Static mode prints to stdout; otherwise takes over the terminal until
    /// the user quits.
    pub fn run(&self) -> Result<()> {
        if self.static_mode {
            let mut stdout = io::stdout().lock();
            return self.run_static(&mut stdout);
        }

        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

        let backend = CrosstermBackend::new(stdout);
        let result = Terminal::new(backend)
            .context("create terminal")
            .and_then(|mut terminal| self.run_loop(&mut terminal, &mut TerminalEvents));

        disable_raw_mode().context("disable raw mode")?;
        execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
        result.map(|_| ())
    }

    /// One synchronous load, printed once. Load errors go to the caller.
    pub fn run_static<W: Write>(&self, out: &mut W) -> Result<()> {
        let records = self
            .source
            .load(&self.filter)
            .with_context(|| format!("load {}", self.title))?;
        let text = render_static(&records, &self.view_config(&self.keymap()));
        out.write_all(text.as_bytes())
            .context("write static output")?;
        out.flush().context("flush static output")
    }

    /// Drives the browser until the user quits and returns the final state.
    pub fn run_loop<B, E>(&self, terminal: &mut Terminal<B>, events: &mut E) -> Result<BrowserState<R>>
    where
        B: Backend,
        E: EventSource,
    {
        let mut keymap = self.keymap();
        let config = self.view_config(&keymap);
        let (tx, rx) = mpsc::channel();
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.source),
            self.detail.clone(),
            self.actions.clone(),
            tx,
        );

        let mut state = BrowserState::new(
            self.filter.clone(),
            Capabilities {
                searchable: self.searchable,
                viewable: self.detail.is_some(),
            },
        );
        let size = terminal.size().context("read terminal size")?;
        state.handle(Intent::Resize {
            width: size.width,
            height: size.height,
        });

        let mut in_flight = 0usize;
        let mut exit = run_commands(state.start(), &dispatcher, &mut in_flight);
        while !exit {
            if events.settle_first() {
                exit = settle(&mut state, &rx, &dispatcher, &mut in_flight);
            }
            while !exit && let Ok(message) = rx.try_recv() {
                exit = apply_message(&mut state, message, &dispatcher, &mut in_flight);
            }
            if exit {
                break;
            }

            terminal
                .draw(|frame| view::draw(frame, &state, &config))
                .context("draw frame")?;
            keymap.fit_page(view::page_rows(&state, &config));

            let intent = match events.next_event(POLL_INTERVAL)? {
                Some(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                    route(key, state.mode, &keymap)
                }
                Some(Event::Resize(width, height)) => Some(Intent::Resize { width, height }),
                _ => None,
            };
            if let Some(intent) = intent {
                exit = run_commands(state.handle(intent), &dispatcher, &mut in_flight);
            }
        }
        Ok(state)
    }

    fn keymap(&self) -> Keymap {
        let keymap = Keymap::new(
            self.actions.iter().map(|binding| binding.key),
            self.searchable,
        );
        for (index, binding) in self.actions.iter().enumerate() {
            if keymap.action_index(binding.key) != Some(index) {
                warn!(
                    key = %binding.key,
                    action = %binding.description,
                    "action key is already taken; binding ignored"
                );
            }
        }
        keymap
    }

    fn view_config(&self, keymap: &Keymap) -> ViewConfig<R> {
        let actions = self
            .actions
            .iter()
            .enumerate()
            .filter(|(index, binding)| keymap.action_index(binding.key) == Some(*index))
            .map(|(_, binding)| (binding.key, binding.description.clone()))
            .collect();
        ViewConfig {
            title: self.title.clone(),
            shape: self.shape.clone(),
            item_renderer: self.item_renderer.clone(),
            actions,
            searchable: self.searchable,
            viewable: self.detail.is_some(),
        }
    }
}

/// Hands commands to the dispatcher; true once an exit was requested.
fn run_commands<R: Record>(
    commands: Vec<Command<R>>,
    dispatcher: &Dispatcher<R>,
    in_flight: &mut usize,
) -> bool {
    for command in commands {
        if matches!(command, Command::Exit) {
            return true;
        }
        if dispatcher.dispatch(command).is_some() {
            *in_flight += 1;
        }
    }
    false
}

fn apply_message<R: Record>(
    state: &mut BrowserState<R>,
    message: Message<R>,
    dispatcher: &Dispatcher<R>,
    in_flight: &mut usize,
) -> bool {
    *in_flight = in_flight.saturating_sub(1);
    if let Some(generation) = message.generation()
        && state.is_stale(generation)
    {
        trace!(generation, current = state.generation, "dropping stale result");
        return false;
    }
    run_commands(state.apply(message), dispatcher, in_flight)
}

fn settle<R: Record>(
    state: &mut BrowserState<R>,
    rx: &Receiver<Message<R>>,
    dispatcher: &Dispatcher<R>,
    in_flight: &mut usize,
) -> bool {
    while *in_flight > 0 {
        let Ok(message) = rx.recv_timeout(SETTLE_TIMEOUT) else {
            warn!(pending = *in_flight, "gave up waiting for worker results");
            *in_flight = 0;
            return false;
        };
        if apply_message(state, message, dispatcher, in_flight) {
            return true;
        }
    }
    false
}
