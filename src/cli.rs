//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::future::Future;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_provider::CsvProvider;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_file_store::JsonFileStore;
use crate::adapters::json_group_store::JsonGroupStore;
use crate::adapters::ticker_resolver::TickerResolver;
use crate::adapters::yahoo_provider::YahooChartProvider;
use crate::domain::align::AlignedChart;
use crate::domain::basket::{draft_basket, Draft, Group};
use crate::domain::comparison::{Comparison, ComparisonReport};
use crate::domain::config_validation::{validate_config, DEFAULT_MAX_ENTRIES};
use crate::domain::error::PerfError;
use crate::domain::history_cache::HistoryCache;
use crate::domain::range::Range;
use crate::domain::summary::format_pct;
use crate::domain::yoy::YoyRow;
use crate::ports::config_port::ConfigPort;
use crate::ports::group_store::GroupStore;
use crate::ports::history_store::HistoryStore;
use crate::ports::price_provider::PriceProvider;
use crate::ports::symbol_resolver::SymbolResolver;

#[derive(Parser, Debug)]
#[command(name = "basketperf", about = "Compare the performance of weighted asset baskets")]
pub struct Cli {
    /// INI configuration file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compare symbols and saved groups over one range
    Compare {
        #[arg(required = true)]
        entries: Vec<String>,
        #[arg(short, long)]
        range: Option<String>,
        /// Print the aligned chart as CSV instead of the summary table
        #[arg(long)]
        csv: bool,
    },
    /// Compare every component of a saved group
    Components {
        group: String,
        #[arg(short, long)]
        range: Option<String>,
    },
    /// Year-over-year returns for one symbol or group
    Yoy {
        entry: String,
        #[arg(short, long, default_value = "5y")]
        range: String,
    },
    /// Refresh the local history cache
    Fetch {
        #[arg(required = true)]
        symbols: Vec<String>,
    },
    /// Manage saved groups
    Group {
        #[command(subcommand)]
        action: GroupCommand,
    },
    /// Show which symbol a name resolves to
    Resolve { text: String },
}

#[derive(Subcommand, Debug)]
pub enum GroupCommand {
    /// Draft a group from text (file or stdin) and save it
    Save {
        name: String,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// List saved groups
    List,
    /// Delete a saved group
    Delete { name: String },
    /// Preview the draft parsed from text without saving
    Draft {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => return report_error(&e),
    };
    init_tracing(&config);

    if let Err(e) = validate_config(&config) {
        return report_error(&e);
    }

    let result = match cli.command {
        Command::Compare {
            entries,
            range,
            csv,
        } => run_compare(&config, &entries, range.as_deref(), csv),
        Command::Components { group, range } => run_components(&config, &group, range.as_deref()),
        Command::Yoy { entry, range } => run_yoy(&config, &entry, &range),
        Command::Fetch { symbols } => run_fetch(&config, &symbols),
        Command::Group { action } => run_group(&config, action),
        Command::Resolve { text } => run_resolve(&config, &text),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn report_error(err: &PerfError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FileConfigAdapter, PerfError> {
    let Some(path) = path else {
        return Ok(FileConfigAdapter::empty());
    };
    FileConfigAdapter::from_file(path).map_err(|e| PerfError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `RUST_LOG` wins; otherwise `[logging] level`, then `info`.
pub fn init_tracing(config: &dyn ConfigPort) {
    let fallback = config
        .get_string("logging", "level")
        .unwrap_or_else(|| "info".to_string());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn build_history_store(config: &dyn ConfigPort) -> Result<Arc<dyn HistoryStore>, PerfError> {
    let backend = config
        .get_string("cache", "backend")
        .unwrap_or_else(|| "json".to_string());
    match backend.trim().to_lowercase().as_str() {
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            use crate::adapters::sqlite_store::SqliteHistoryStore;
            Ok(Arc::new(SqliteHistoryStore::from_config(config)?))
        }
        "json" => Ok(Arc::new(JsonFileStore::from_config(config))),
        other => Err(PerfError::ConfigInvalid {
            section: "cache".into(),
            key: "backend".into(),
            reason: format!("unsupported backend \"{other}\""),
        }),
    }
}

pub fn build_provider(config: &dyn ConfigPort) -> Result<Arc<dyn PriceProvider>, PerfError> {
    let kind = config
        .get_string("provider", "kind")
        .unwrap_or_else(|| "yahoo".to_string());
    match kind.trim().to_lowercase().as_str() {
        "yahoo" => Ok(Arc::new(YahooChartProvider::from_config(config)?)),
        "csv" => Ok(Arc::new(CsvProvider::from_config(config)?)),
        other => Err(PerfError::ConfigInvalid {
            section: "provider".into(),
            key: "kind".into(),
            reason: format!("unsupported provider \"{other}\""),
        }),
    }
}

pub fn build_comparison(config: &dyn ConfigPort) -> Result<Comparison, PerfError> {
    let cache = HistoryCache::new(build_provider(config)?, build_history_store(config)?);
    let max_entries = config.get_int("compare", "max_entries", DEFAULT_MAX_ENTRIES);
    Ok(Comparison::new(
        cache,
        Arc::new(TickerResolver::from_config(config)),
        Arc::new(JsonGroupStore::from_config(config)),
    )
    .with_max_entries(max_entries.max(1) as usize))
}

/// `--range` if given, else `[compare] range`, else year-to-date.
pub fn resolve_range(arg: Option<&str>, config: &dyn ConfigPort) -> Result<Range, PerfError> {
    match arg
        .map(str::to_string)
        .or_else(|| config.get_string("compare", "range"))
    {
        Some(token) => token.parse(),
        None => Ok(Range::Ytd),
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output, PerfError> {
    let runtime = tokio::runtime::Runtime::new()?;
    Ok(runtime.block_on(future))
}

fn warn_skipped(report: &ComparisonReport) {
    for text in &report.unresolved {
        eprintln!("warning: could not resolve \"{}\"", text);
    }
    for failure in &report.failures {
        eprintln!("warning: skipping {} ({})", failure.symbol, failure.reason);
    }
}

fn print_report(report: &ComparisonReport, csv: bool) -> Result<(), PerfError> {
    warn_skipped(report);
    if csv {
        print!("{}", render_chart_csv(&report.chart)?);
    } else {
        eprintln!(
            "Range {}: {} dates, {} to {}",
            report.range,
            report.chart.labels.len(),
            report.chart.labels.first().map(|d| d.to_string()).unwrap_or_default(),
            report.chart.labels.last().map(|d| d.to_string()).unwrap_or_default(),
        );
        print!("{}", render_table(report));
    }
    Ok(())
}

fn run_compare(
    config: &dyn ConfigPort,
    entries: &[String],
    range: Option<&str>,
    csv: bool,
) -> Result<(), PerfError> {
    let range = resolve_range(range, config)?;
    let comparison = build_comparison(config)?;
    let report = block_on(comparison.compare(entries, range))??;
    print_report(&report, csv)
}

fn run_components(
    config: &dyn ConfigPort,
    group: &str,
    range: Option<&str>,
) -> Result<(), PerfError> {
    let range = resolve_range(range, config)?;
    let comparison = build_comparison(config)?;
    let report = block_on(comparison.compare_components(group, range))??;
    print_report(&report, false)
}

fn run_yoy(config: &dyn ConfigPort, entry: &str, range: &str) -> Result<(), PerfError> {
    let range: Range = range.parse()?;
    let comparison = build_comparison(config)?;
    let (label, rows) = block_on(comparison.yoy(entry, range))??;
    eprintln!("Year-over-year for {} ({})", label, range);
    print!("{}", render_yoy(&rows));
    Ok(())
}

fn run_fetch(config: &dyn ConfigPort, symbols: &[String]) -> Result<(), PerfError> {
    let resolver = TickerResolver::from_config(config);
    let mut resolved = Vec::new();
    for text in symbols {
        match resolver.resolve(text) {
            Some(symbol) => resolved.push(symbol),
            None => eprintln!("warning: could not resolve \"{}\"", text),
        }
    }

    let comparison = build_comparison(config)?;
    let outcome = block_on(comparison.fetch_all(&resolved))?;

    let mut fetched: Vec<_> = outcome.histories.values().collect();
    fetched.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    for history in fetched {
        println!(
            "{}: {} points, {} to {} ({})",
            history.symbol,
            history.points.len(),
            history.first_date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            history.last_date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            history.provider,
        );
    }
    for failure in &outcome.failures {
        eprintln!("warning: skipping {} ({})", failure.symbol, failure.reason);
    }

    match outcome.failures.first() {
        Some(first) if outcome.histories.is_empty() => {
            Err(PerfError::provider(&first.symbol, first.reason.clone()))
        }
        _ => Ok(()),
    }
}

fn read_draft_text(file: Option<&PathBuf>) -> Result<String, PerfError> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn print_draft(draft: &Draft) {
    for asset in &draft.assets {
        println!(
            "{:<10} {:>9}  ({})",
            asset.symbol,
            asset
                .weight
                .map(|w| format!("{w}%"))
                .unwrap_or_else(|| "-".into()),
            asset.raw
        );
    }
    for text in &draft.unresolved {
        eprintln!("warning: could not resolve \"{}\"", text);
    }
}

fn run_group(config: &dyn ConfigPort, action: GroupCommand) -> Result<(), PerfError> {
    let store = JsonGroupStore::from_config(config);
    match action {
        GroupCommand::Save { name, file } => {
            let resolver = TickerResolver::from_config(config);
            let draft = draft_basket(&read_draft_text(file.as_ref())?, &resolver);
            print_draft(&draft);
            let group = Group::from_draft(&name, &draft.weighted_assets())?;
            eprintln!("Saved group {}: {}", group.name, group.composition());
            store.save(group)
        }
        GroupCommand::List => {
            let groups = store.list()?;
            if groups.is_empty() {
                eprintln!("No saved groups in {}", store.path().display());
            }
            for group in groups {
                println!("{}: {}", group.name, group.composition());
            }
            Ok(())
        }
        GroupCommand::Delete { name } => {
            if store.delete(&name)? {
                eprintln!("Deleted group {}", name.trim());
                Ok(())
            } else {
                Err(PerfError::InvalidGroup {
                    reason: format!("no saved group named \"{}\"", name.trim()),
                })
            }
        }
        GroupCommand::Draft { file } => {
            let resolver = TickerResolver::from_config(config);
            let draft = draft_basket(&read_draft_text(file.as_ref())?, &resolver);
            print_draft(&draft);
            Ok(())
        }
    }
}

fn run_resolve(config: &dyn ConfigPort, text: &str) -> Result<(), PerfError> {
    let resolver = TickerResolver::from_config(config);
    let symbol = resolver.resolve(text).ok_or_else(|| PerfError::Resolution {
        text: text.trim().to_string(),
    })?;
    println!("{}", symbol);
    Ok(())
}

/// Period returns table, one row per basket.
pub fn render_table(report: &ComparisonReport) -> String {
    let width = report
        .returns
        .iter()
        .map(|r| r.label.len())
        .max()
        .unwrap_or(0)
        .max("Label".len());

    let mut out = format!("{:<width$}  {:>9}  {:>9}  {:>9}\n", "Label", "YTD", "1Y", "3Y");
    for row in &report.returns {
        out.push_str(&format!(
            "{:<width$}  {:>9}  {:>9}  {:>9}\n",
            row.label,
            format_pct(row.ytd),
            format_pct(row.one_year),
            format_pct(row.three_years),
        ));
    }
    out
}

/// Aligned chart as CSV: a `date` column then one column per series.
/// Dates before a series starts are left blank.
pub fn render_chart_csv(chart: &AlignedChart) -> Result<String, PerfError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["date".to_string()];
    header.extend(chart.series.iter().map(|s| s.label.clone()));
    wtr.write_record(&header).map_err(std::io::Error::other)?;

    for (i, date) in chart.labels.iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(chart.series.iter().map(|s| {
            s.values
                .get(i)
                .copied()
                .flatten()
                .map(|v| format!("{v:.4}"))
                .unwrap_or_default()
        }));
        wtr.write_record(&record).map_err(std::io::Error::other)?;
    }

    let bytes = wtr.into_inner().map_err(|e| std::io::Error::other(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PerfError::Io(std::io::Error::other(e)))
}

pub fn render_yoy(rows: &[YoyRow]) -> String {
    let mut out = format!("{:<6}  {:>9}\n", "Year", "Return");
    for row in rows {
        out.push_str(&format!(
            "{:<6}  {:>9}\n",
            row.year,
            format_pct(Some(row.return_pct))
        ));
    }
    out
}
