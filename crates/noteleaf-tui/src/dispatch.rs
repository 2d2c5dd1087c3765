// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use noteleaf_app::{ActionBinding, Command, DataSource, DetailFormatter, Message, Record};
use tracing::{debug, warn};

/// Runs browser commands on worker threads. Every spawned job sends exactly
/// one [`Message`] back to the event loop.
pub struct Dispatcher<R> {
    source: Arc<dyn DataSource<R>>,
    detail: Option<DetailFormatter<R>>,
    actions: Vec<ActionBinding<R>>,
    tx: Sender<Message<R>>,
}

impl<R: Record> Dispatcher<R> {
    pub fn new(
        source: Arc<dyn DataSource<R>>,
        detail: Option<DetailFormatter<R>>,
        actions: Vec<ActionBinding<R>>,
        tx: Sender<Message<R>>,
    ) -> Self {
        Self {
            source,
            detail,
            actions,
            tx,
        }
    }

    pub fn spawn<F>(&self, thunk: F) -> JoinHandle<()>
    where
        F: FnOnce() -> Message<R> + Send + 'static,
    {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let message = thunk();
            log_outcome(&message);
            if tx.send(message).is_err() {
                debug!("browser closed before the result arrived");
            }
        })
    }

    /// Returns `None` for commands that need no worker, which is only
    /// [`Command::Exit`].
    pub fn dispatch(&self, command: Command<R>) -> Option<JoinHandle<()>> {
        debug!(command = command_name(&command), "dispatch");
        match command {
            Command::Load { generation, filter } => {
                let source = Arc::clone(&self.source);
                Some(self.spawn(move || match source.load(&filter) {
                    Ok(records) => Message::RecordsLoaded {
                        generation,
                        records,
                    },
                    Err(error) => Message::LoadFailed {
                        generation,
                        error: format!("{error:#}"),
                    },
                }))
            }
            Command::Count { generation, filter } => {
                let source = Arc::clone(&self.source);
                Some(self.spawn(move || match source.count(&filter) {
                    Ok(count) => Message::CountLoaded { generation, count },
                    Err(error) => Message::CountFailed {
                        generation,
                        error: format!("{error:#}"),
                    },
                }))
            }
            Command::Search {
                generation,
                query,
                filter,
            } => {
                let source = Arc::clone(&self.source);
                Some(self.spawn(move || match source.search(&query, &filter) {
                    Ok(records) => Message::RecordsLoaded {
                        generation,
                        records,
                    },
                    Err(error) => Message::SearchFailed {
                        generation,
                        error: format!("{error:#}"),
                    },
                }))
            }
            Command::View { request, record } => {
                let detail = self.detail.clone();
                Some(self.spawn(move || {
                    let Some(detail) = detail else {
                        return Message::ViewFailed {
                            request,
                            error: "this list has no detail view".to_owned(),
                        };
                    };
                    match detail(&record) {
                        Ok(content) => Message::ViewRendered { request, content },
                        Err(error) => Message::ViewFailed {
                            request,
                            error: format!("{error:#}"),
                        },
                    }
                }))
            }
            Command::Action { action, record } => {
                let handler = self
                    .actions
                    .get(action)
                    .map(|binding| Arc::clone(&binding.handler));
                Some(self.spawn(move || {
                    let Some(handler) = handler else {
                        return Message::ActionFailed {
                            action,
                            error: format!("no action is bound at index {action}"),
                        };
                    };
                    match handler(&record) {
                        Ok(()) => Message::ActionCompleted { action },
                        Err(error) => Message::ActionFailed {
                            action,
                            error: format!("{error:#}"),
                        },
                    }
                }))
            }
            Command::Exit => None,
        }
    }
}

fn command_name<R>(command: &Command<R>) -> &'static str {
    match command {
        Command::Load { .. } => "load",
        Command::Count { .. } => "count",
        Command::Search { .. } => "search",
        Command::View { .. } => "view",
        Command::Action { .. } => "action",
        Command::Exit => "exit",
    }
}

fn log_outcome<R>(message: &Message<R>) {
    match message {
        Message::CountFailed { generation, error } => {
            debug!(generation, %error, "count failed; showing zero");
        }
        Message::LoadFailed { generation, error } => {
            warn!(generation, %error, "load failed");
        }
        Message::SearchFailed { generation, error } => {
            warn!(generation, %error, "search failed");
        }
        Message::ViewFailed { request, error } => warn!(request, %error, "detail view failed"),
        Message::ActionFailed { action, error } => warn!(action, %error, "action failed"),
        Message::RecordsLoaded { .. }
        | Message::CountLoaded { .. }
        | Message::ViewRendered { .. }
        | Message::ActionCompleted { .. } => {}
    }
}
