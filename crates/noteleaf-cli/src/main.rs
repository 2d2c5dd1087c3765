// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use noteleaf_app::{FilterState, SortSpec, parse_filter_arg};
use noteleaf_db::Store;
use runtime::{Entity, LaunchOptions};
use std::env;
use std::path::PathBuf;
use tracing::info;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `noteleaf --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let log_path = logging::init(&config)?;
    info!(
        db = %db_path.display(),
        log = %log_path.display(),
        list = options.entity.as_str(),
        "starting noteleaf"
    );

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or NOTELEAF_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }
    if options.check_only {
        return Ok(());
    }

    let launch = LaunchOptions {
        filter: options.filter_state(config.page_size()),
        static_mode: options.static_mode,
        searchable: config.search_enabled(),
    };
    runtime::browse(options.entity, runtime::shared(store), &launch)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    entity: Entity,
    static_mode: bool,
    query: Option<String>,
    limit: Option<usize>,
    filters: Vec<(String, String)>,
    sort: Option<SortSpec>,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

impl CliOptions {
    fn filter_state(&self, page_size: usize) -> FilterState {
        let mut filter = FilterState::new().with_limit(self.limit.unwrap_or(page_size));
        if let Some(query) = &self.query {
            filter = filter.with_query(query.as_str());
        }
        if let Some(sort) = &self.sort {
            filter = filter.with_sort(sort.clone());
        }
        for (key, value) in &self.filters {
            filter = filter.with_filter(key.as_str(), value.as_str());
        }
        filter
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        entity: Entity::Tasks,
        static_mode: false,
        query: None,
        limit: None,
        filters: Vec::new(),
        sort: None,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };
    let mut entity_seen = false;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--static" => {
                options.static_mode = true;
            }
            "--query" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--query requires search text"))?;
                options.query = Some(value.as_ref().to_owned());
            }
            "--limit" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--limit requires a number"))?;
                let limit = value.as_ref().parse::<usize>().with_context(|| {
                    format!("--limit {:?} is not a whole number", value.as_ref())
                })?;
                if limit == 0 {
                    bail!("--limit must be at least 1");
                }
                options.limit = Some(limit);
            }
            "--filter" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--filter requires key=value"))?;
                options.filters.push(parse_filter_arg(value.as_ref())?);
            }
            "--sort" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--sort requires key[:asc|desc]"))?;
                options.sort = Some(SortSpec::parse(value.as_ref())?);
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown if unknown.starts_with('-') => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
            list => {
                if entity_seen {
                    bail!("only one list can be browsed at a time; got an extra {list:?}");
                }
                options.entity = Entity::parse(list)?;
                entity_seen = true;
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("noteleaf [options] [tasks|notes|books|articles|tags|projects]");
    println!("  --static                 Print the list once and exit");
    println!("  --query <text>           Start with a search applied");
    println!("  --limit <n>              Load at most n records (default [ui].page_size)");
    println!("  --filter <key=value>     Narrow the list; repeatable");
    println!("  --sort <key[:asc|desc]>  Order the list by a field");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Launch with seeded demo data (in-memory)");
    println!("  --check                  Validate config, logging and database, then exit");
    println!("  --help                   Show this help");
}
