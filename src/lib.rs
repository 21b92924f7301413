pub mod cli;
pub mod config;
pub mod controls;
pub mod data;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod frame;
pub mod io_utils;
pub mod join;
pub mod loader;
pub mod render;
pub mod report;
pub mod schema;

use std::{env, rc::Rc, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug, info};
use serde::Serialize;

use crate::{
    cli::{Cli, Commands, DetailArgs, LeadersArgs, ListArgs, OutputFormat, ReportArgs, ViewArgs},
    config::DashboardConfig,
    dataset::{Dataset, DatasetCache},
    filter::FilterSet,
    frame::Table,
    report::{LEADERBOARD_SIZE, Report},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("rankings_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let mut cache = DatasetCache::new();
    match cli.command {
        Commands::Report(args) => handle_report(&mut cache, &args),
        Commands::Kpis(args) => handle_kpis(&mut cache, &args),
        Commands::List(args) => handle_list(&mut cache, &args),
        Commands::Detail(args) => handle_detail(&mut cache, &args),
        Commands::Countries(args) => handle_countries(&mut cache, &args),
        Commands::Leaders(args) => handle_leaders(&mut cache, &args),
    }
}

/// JSON payload: load notices next to the command's data.
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    notices: &'a [String],
    data: Option<T>,
}

/// Everything a command needs after loading and filtering.
struct Session {
    config: DashboardConfig,
    dataset: Rc<Dataset>,
    filters: FilterSet,
    filtered: Table,
    notices: Vec<String>,
    format: OutputFormat,
}

impl Session {
    fn leaderboard_size(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.config.leaderboard_size)
            .unwrap_or(LEADERBOARD_SIZE)
    }

    /// Prints the command output, prefixed by any load notices.
    fn emit<T: Serialize>(&self, data: T, render: impl FnOnce(&T) -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let envelope = Envelope {
                    notices: &self.notices,
                    data: Some(data),
                };
                println!("{}", render::to_json(&envelope)?);
            }
            OutputFormat::Table => {
                for notice in &self.notices {
                    println!("Notice: {notice}");
                }
                print!("{}", render(&data));
            }
        }
        Ok(())
    }
}

/// Loads the dataset and applies the filters. Returns `None` after printing
/// the top-level notice when there is nothing to report on.
fn open_session(cache: &mut DatasetCache, view: &ViewArgs) -> Result<Option<Session>> {
    let config = DashboardConfig::resolve(&view.sources)?;
    let sources = config.sources(&view.sources)?;
    info!(
        "Loading competitors from {:?} and rankings from {:?}",
        sources.competitors, sources.rankings
    );
    let dataset = cache.get_or_load(&sources);
    let notices = dataset
        .notices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    if !dataset.has_data() {
        let message = format!(
            "No data found. Please place {:?} and {:?}.",
            sources.competitors, sources.rankings
        );
        match view.format {
            OutputFormat::Json => {
                let mut all = notices;
                all.push(message);
                let envelope: Envelope<'_, ()> = Envelope {
                    notices: &all,
                    data: None,
                };
                println!("{}", render::to_json(&envelope)?);
            }
            OutputFormat::Table => println!("{message}"),
        }
        return Ok(None);
    }

    let filters = controls::build_filters(&dataset.merged, &view.filters);
    let filtered = filters.apply(&dataset.merged);
    debug!(
        "{} of {} merged row(s) pass the filters",
        filtered.row_count(),
        dataset.merged.row_count()
    );
    Ok(Some(Session {
        config,
        dataset,
        filters,
        filtered,
        notices,
        format: view.format,
    }))
}

fn handle_report(cache: &mut DatasetCache, args: &ReportArgs) -> Result<()> {
    let Some(session) = open_session(cache, &args.view)? else {
        return Ok(());
    };
    let report = Report::build(
        &session.filtered,
        session.dataset.overall,
        &session.filters,
        args.select.as_deref(),
        session.leaderboard_size(args.top),
    );
    session.emit(report, render::render_report)
}

#[derive(Serialize)]
struct KpiPair {
    overall: report::Kpis,
    filtered: report::Kpis,
}

fn handle_kpis(cache: &mut DatasetCache, args: &ViewArgs) -> Result<()> {
    let Some(session) = open_session(cache, args)? else {
        return Ok(());
    };
    let pair = KpiPair {
        overall: session.dataset.overall,
        filtered: report::kpis(&session.filtered),
    };
    session.emit(pair, |pair| {
        render::render_kpis(&pair.overall, &pair.filtered)
    })
}

fn handle_list(cache: &mut DatasetCache, args: &ListArgs) -> Result<()> {
    let Some(session) = open_session(cache, &args.view)? else {
        return Ok(());
    };
    let listing = report::listing(&session.filtered);
    let shown = match args.limit {
        Some(limit) if limit < listing.row_count() => {
            listing.take(&(0..limit).collect::<Vec<_>>())
        }
        _ => listing,
    };
    info!("Listing {} row(s)", shown.row_count());
    session.emit(shown, |table| render::render_listing(table))
}

fn handle_detail(cache: &mut DatasetCache, args: &DetailArgs) -> Result<()> {
    let Some(session) = open_session(cache, &args.view)? else {
        return Ok(());
    };
    let name = match &args.select {
        Some(name) => Some(name.clone()),
        None => report::selectable_names(&session.filtered).into_iter().next(),
    };
    let detail = name.and_then(|name| report::detail(&session.filtered, &name));
    session.emit(detail, |detail| render::render_detail(detail.as_ref()))
}

fn handle_countries(cache: &mut DatasetCache, args: &ViewArgs) -> Result<()> {
    let Some(session) = open_session(cache, args)? else {
        return Ok(());
    };
    let stats = report::country_rollup(&session.filtered);
    session.emit(stats, |stats| render::render_countries(stats))
}

#[derive(Serialize)]
struct Leaderboards {
    top_ranked: Vec<report::LeaderRow>,
    top_points: Vec<report::LeaderRow>,
}

fn handle_leaders(cache: &mut DatasetCache, args: &LeadersArgs) -> Result<()> {
    let Some(session) = open_session(cache, &args.view)? else {
        return Ok(());
    };
    let top = session.leaderboard_size(args.top);
    let boards = Leaderboards {
        top_ranked: report::top_by_rank(&session.filtered, top),
        top_points: report::top_by_points(&session.filtered, top),
    };
    session.emit(boards, |boards| {
        format!(
            "Top Ranked\n{}\nHighest Points\n{}",
            render::render_leaderboard(&boards.top_ranked),
            render::render_leaderboard(&boards.top_points)
        )
    })
}
