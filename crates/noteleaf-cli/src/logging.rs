// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result};
use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "NOTELEAF_LOG";

/// Routes `tracing` output to the log file; the terminal belongs to the
/// browser. Returns the file path.
pub fn init(config: &Config) -> Result<PathBuf> {
    let path = config.log_file()?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| {
            format!(
                "open log file {}; set [log].file to a writable path",
                path.display()
            )
        })?;

    let filter = resolve_filter(config.log_level(), env::var(LOG_ENV).ok().as_deref())?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_target(true)
                .with_ansi(false),
        )
        .try_init()
        .context("install log subscriber")?;
    Ok(path)
}

/// A non-empty `NOTELEAF_LOG` wins over the configured level.
fn resolve_filter(configured: &str, env_override: Option<&str>) -> Result<EnvFilter> {
    match env_override.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("{LOG_ENV}={directive:?} is not a valid log filter")),
        None => EnvFilter::try_new(configured)
            .with_context(|| format!("log level {configured:?} is not a valid log filter")),
    }
}
