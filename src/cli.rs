//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::file_storage_adapter::FileStorageAdapter;
use crate::adapters::json_data_adapter::JsonDataAdapter;
use crate::adapters::text_table::{render_memo_panel, render_table};
use crate::domain::annotation::{AnnotationStore, AnnotationTable};
use crate::domain::config_validation::{build_viewer_config, ViewerConfig};
use crate::domain::error::KrxError;
use crate::domain::history::window_dates;
use crate::domain::market::{DailySnapshot, DateIndex, Market};
use crate::domain::table::{Column, RenderRequest, TableView, ViewState};
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "krxrank", about = "Daily KRX trading-value ranking viewer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Locations shared by every command. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    #[arg(long)]
    pub memo_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List available trading days, newest first
    Dates {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Render one market's ranking table
    Show {
        #[command(flatten)]
        paths: PathArgs,
        /// Trading day (YYYY-MM-DD); defaults to the newest
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long)]
        market: Option<String>,
        /// Filter by name, ticker or tag
        #[arg(short = 'q', long)]
        search: Option<String>,
        /// Column header clicks, applied in order (repeatable)
        #[arg(short, long)]
        sort: Vec<String>,
        /// Ticker whose history block is expanded
        #[arg(short, long)]
        expand: Option<String>,
    },
    /// Attach a tag to a ticker
    TagAdd {
        #[command(flatten)]
        paths: PathArgs,
        ticker: String,
        tag: String,
    },
    /// Remove a tag from a ticker
    TagRemove {
        #[command(flatten)]
        paths: PathArgs,
        ticker: String,
        tag: String,
    },
    /// Replace a ticker's note; an empty text clears it
    Note {
        #[command(flatten)]
        paths: PathArgs,
        ticker: String,
        text: String,
    },
    /// Delete a ticker's tags and note
    Delete {
        #[command(flatten)]
        paths: PathArgs,
        ticker: String,
    },
    /// List every tag in use
    Tags {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Show memos grouped by tag
    Memos {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Write all annotations as JSON
    Export {
        #[command(flatten)]
        paths: PathArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all annotations from a JSON file
    Import {
        #[command(flatten)]
        paths: PathArgs,
        file: PathBuf,
    },
}

/// Options of one `show` invocation.
#[derive(Debug, Clone, Default)]
pub struct ShowOptions {
    pub date: Option<NaiveDate>,
    pub market: Option<Market>,
    pub search: String,
    pub sort: Vec<Column>,
    pub expand: Option<String>,
}

/// A rendered table together with the day and market it shows.
#[derive(Debug, Clone)]
pub struct ShowOutput {
    pub date: NaiveDate,
    pub market: Market,
    pub updated_at: Option<String>,
    pub table: TableView,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Dates { paths } => run_dates(&paths),
        Command::Show {
            paths,
            date,
            market,
            search,
            sort,
            expand,
        } => run_show(&paths, date, market.as_deref(), search, &sort, expand),
        Command::TagAdd { paths, ticker, tag } => run_tag_add(&paths, &ticker, &tag),
        Command::TagRemove { paths, ticker, tag } => run_tag_remove(&paths, &ticker, &tag),
        Command::Note {
            paths,
            ticker,
            text,
        } => run_note(&paths, &ticker, &text),
        Command::Delete { paths, ticker } => run_delete(&paths, &ticker),
        Command::Tags { paths } => run_tags(&paths),
        Command::Memos { paths } => run_memos(&paths),
        Command::Export { paths, output } => run_export(&paths, output.as_ref()),
        Command::Import { paths, file } => run_import(&paths, &file),
    }
}

fn fail(e: KrxError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, KrxError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| KrxError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Config file values (or defaults without one), then flag overrides.
pub fn resolve_config(paths: &PathArgs) -> Result<ViewerConfig, KrxError> {
    let mut config = match &paths.config {
        Some(path) => build_viewer_config(&load_config(path)?)?,
        None => ViewerConfig::default(),
    };
    if let Some(dir) = &paths.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &paths.memo_dir {
        config.memo_dir = dir.clone();
    }
    Ok(config)
}

pub fn open_store(config: &ViewerConfig) -> Result<AnnotationStore<FileStorageAdapter>, KrxError> {
    AnnotationStore::open(
        FileStorageAdapter::new(config.memo_dir.clone()),
        &config.memo_key,
    )
}

pub fn open_data(config: &ViewerConfig) -> JsonDataAdapter {
    JsonDataAdapter::new(config.data_dir.clone(), config.cache_capacity)
}

/// Loads the selected day and its trailing window, then renders the table.
///
/// Without an explicit date the newest indexed day is used. An empty index
/// falls back to `latest.json` with a single-day window.
pub fn build_view(
    port: &dyn DataPort,
    annotations: &AnnotationTable,
    config: &ViewerConfig,
    options: &ShowOptions,
    now: DateTime<Utc>,
) -> Result<ShowOutput, KrxError> {
    let index = DateIndex {
        dates: port.date_index()?,
    };

    let (snapshot, window): (DailySnapshot, Vec<DailySnapshot>) = match options.date {
        Some(date) => {
            let selected = index.position(date).ok_or_else(|| KrxError::NoData {
                date: date.to_string(),
            })?;
            load_window(port, &index, selected, config.window)?
        }
        None if index.dates.is_empty() => {
            let latest = port.latest().ok_or_else(|| KrxError::NoData {
                date: "latest".to_string(),
            })?;
            (latest.clone(), vec![latest])
        }
        None => load_window(port, &index, 0, config.window)?,
    };

    let market = options.market.unwrap_or(config.market);

    let mut view = ViewState::new();
    for column in &options.sort {
        if !view.toggle_sort(*column) {
            eprintln!("warning: column '{}' is not sortable", column.key());
        }
    }
    if let Some(ticker) = &options.expand {
        view.toggle_expand(ticker);
    }

    let request = RenderRequest {
        stocks: snapshot.entries(market),
        market,
        window: &window,
        query: &options.search,
    };
    let table = view.render(&request, annotations, now);

    Ok(ShowOutput {
        date: snapshot.date,
        market,
        updated_at: snapshot.updated_at.clone(),
        table,
    })
}

fn load_window(
    port: &dyn DataPort,
    index: &DateIndex,
    selected: usize,
    size: usize,
) -> Result<(DailySnapshot, Vec<DailySnapshot>), KrxError> {
    let date = index.dates[selected];
    let snapshot = port.snapshot(date).ok_or_else(|| KrxError::NoData {
        date: date.to_string(),
    })?;
    let dates = window_dates(&index.dates, selected, size);
    let window = port.window(dates, size);
    Ok((snapshot, window))
}

fn run_dates(paths: &PathArgs) -> ExitCode {
    let config = match resolve_config(paths) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let data = open_data(&config);
    let dates = match data.date_index() {
        Ok(d) => d,
        Err(e) => return fail(e),
    };
    if dates.is_empty() {
        eprintln!("No trading days indexed under {}", config.data_dir.display());
    }
    for date in &dates {
        println!("{}", date);
    }
    ExitCode::SUCCESS
}

fn run_show(
    paths: &PathArgs,
    date: Option<NaiveDate>,
    market: Option<&str>,
    search: Option<String>,
    sort: &[String],
    expand: Option<String>,
) -> ExitCode {
    let config = match resolve_config(paths) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };

    let market = match market.map(str::parse::<Market>).transpose() {
        Ok(m) => m,
        Err(e) => return fail(e),
    };
    let sort = match sort
        .iter()
        .map(|s| s.parse::<Column>())
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    let store = match open_store(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let data = open_data(&config);
    let options = ShowOptions {
        date,
        market,
        search: search.unwrap_or_default(),
        sort,
        expand,
    };

    let output = match build_view(&data, store.get_all(), &config, &options, store.now()) {
        Ok(o) => o,
        Err(e) => return fail(e),
    };

    match &output.updated_at {
        Some(updated) => println!(
            "{} {} ({}종목, 업데이트 {})",
            output.date,
            output.market.label(),
            output.table.rows.len(),
            updated
        ),
        None => println!(
            "{} {} ({}종목)",
            output.date,
            output.market.label(),
            output.table.rows.len()
        ),
    }
    print!("{}", render_table(&output.table));
    ExitCode::SUCCESS
}

fn clean_tag(tag: &str) -> Result<String, ExitCode> {
    let tag = tag.trim();
    if tag.is_empty() {
        eprintln!("error: tag must not be empty");
        return Err(ExitCode::from(5));
    }
    Ok(tag.to_string())
}

fn run_tag_add(paths: &PathArgs, ticker: &str, tag: &str) -> ExitCode {
    let tag = match clean_tag(tag) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let mut store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match store.add_tag(ticker, &tag) {
        Ok(true) => eprintln!("Tagged {} with '{}'", ticker, tag),
        Ok(false) => eprintln!("{} already has tag '{}'", ticker, tag),
        Err(e) => return fail(e),
    }
    ExitCode::SUCCESS
}

fn run_tag_remove(paths: &PathArgs, ticker: &str, tag: &str) -> ExitCode {
    let tag = match clean_tag(tag) {
        Ok(t) => t,
        Err(code) => return code,
    };
    let mut store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match store.remove_tag(ticker, &tag) {
        Ok(true) => eprintln!("Removed tag '{}' from {}", tag, ticker),
        Ok(false) => eprintln!("{} had no tag '{}'", ticker, tag),
        Err(e) => return fail(e),
    }
    ExitCode::SUCCESS
}

fn run_note(paths: &PathArgs, ticker: &str, text: &str) -> ExitCode {
    let mut store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    if let Err(e) = store.set_note(ticker, text) {
        return fail(e);
    }
    if text.is_empty() {
        eprintln!("Cleared note for {}", ticker);
    } else {
        eprintln!("Saved note for {}", ticker);
    }
    ExitCode::SUCCESS
}

fn run_delete(paths: &PathArgs, ticker: &str) -> ExitCode {
    let mut store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match store.delete(ticker) {
        Ok(true) => eprintln!("Deleted memo for {}", ticker),
        Ok(false) => eprintln!("No memo stored for {}", ticker),
        Err(e) => return fail(e),
    }
    ExitCode::SUCCESS
}

fn run_tags(paths: &PathArgs) -> ExitCode {
    let store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    for tag in store.all_tags() {
        println!("{}", tag);
    }
    ExitCode::SUCCESS
}

fn run_memos(paths: &PathArgs) -> ExitCode {
    let store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    print!("{}", render_memo_panel(store.get_all()));
    ExitCode::SUCCESS
}

fn run_export(paths: &PathArgs, output: Option<&PathBuf>) -> ExitCode {
    let store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let json = match store.export() {
        Ok(j) => j,
        Err(e) => return fail(e),
    };
    match output {
        Some(path) => {
            if let Err(e) = fs::write(path, format!("{json}\n")) {
                return fail(e.into());
            }
            eprintln!(
                "Exported {} memos to {}",
                store.get_all().len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }
    ExitCode::SUCCESS
}

fn run_import(paths: &PathArgs, file: &PathBuf) -> ExitCode {
    let text = match fs::read_to_string(file) {
        Ok(t) => t,
        Err(e) => return fail(e.into()),
    };
    let mut store = match resolve_config(paths).and_then(|c| open_store(&c)) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match store.import(&text) {
        Ok(()) => {
            eprintln!(
                "Imported {} memos from {}",
                store.get_all().len(),
                file.display()
            );
            ExitCode::SUCCESS
        }
        Err(KrxError::Import(parse)) => {
            eprintln!("error: {}", parse.display_with_context(&text));
            (&KrxError::Import(parse)).into()
        }
        Err(e) => fail(e),
    }
}
