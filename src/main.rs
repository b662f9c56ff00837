use analytics::{BucketStats, DimensionReport};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use configuration::{ConfluenceMode, load_config};
use core_types::CandleSeries;
use engine::JournalReport;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the trade journal analytics tool.
fn main() -> Result<()> {
    // JOURNAL__* overrides may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => handle_analyze(args)?,
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Performance analytics for a crypto trading journal.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a trade export and print the full analytics report.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// JSON file with an array of trade records or an object of id -> record.
    #[arg(long, short)]
    input: PathBuf,

    /// Configuration file (defaults to ./config.toml when present).
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// JSON file with candle series to attach to the report for replay.
    #[arg(long)]
    candles: Option<PathBuf>,

    #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Overrides the configured confluence mode.
    #[arg(long, value_enum)]
    mode: Option<ConfluenceMode>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// ==============================================================================
// Analyze Command Logic
// ==============================================================================

fn handle_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(mode) = args.mode {
        config.confluence.mode = mode;
    }

    let records: serde_json::Value = read_json(&args.input)?;
    let candles: Vec<CandleSeries> = match &args.candles {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let report = engine::compute_with_replay(&records, &config, candles)
        .with_context(|| format!("Failed to analyze trades from {:?}", args.input))?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => print_tables(&report),
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("{:?} is not valid JSON", path))
}

// ==============================================================================
// Table Rendering
// ==============================================================================

fn print_tables(report: &JournalReport) {
    let n = &report.normalization;
    println!(
        "Trades: {} accepted, {} rejected, {} fields coerced",
        n.accepted, n.rejected, n.coerced_fields
    );
    for rejection in &n.rejections {
        println!(
            "  record {} ({}): {}",
            rejection.position,
            rejection.id.as_deref().unwrap_or("no id"),
            rejection.reason
        );
    }

    let p = &report.performance;
    let mut summary = Table::new();
    summary.set_header(vec!["Metric", "Value"]);
    summary.add_row(vec!["Total trades".to_string(), p.total_trades.to_string()]);
    summary.add_row(vec!["Net profit".to_string(), money(p.total_net_profit)]);
    summary.add_row(vec!["Gross profit".to_string(), money(p.gross_profit)]);
    summary.add_row(vec!["Gross loss".to_string(), money(p.gross_loss)]);
    summary.add_row(vec!["Fees".to_string(), money(p.total_fees)]);
    summary.add_row(vec!["Win rate %".to_string(), optional(p.win_rate_pct)]);
    summary.add_row(vec!["Profit factor".to_string(), optional(p.profit_factor)]);
    summary.add_row(vec!["Payoff ratio".to_string(), optional(p.payoff_ratio)]);
    summary.add_row(vec!["Average win".to_string(), money(p.average_win)]);
    summary.add_row(vec!["Average loss".to_string(), money(p.average_loss)]);
    summary.add_row(vec!["Largest win".to_string(), money(p.largest_win)]);
    summary.add_row(vec!["Largest loss".to_string(), money(p.largest_loss)]);
    summary.add_row(vec!["Max drawdown".to_string(), money(p.max_drawdown)]);
    summary.add_row(vec![
        "Longest drawdown (trades)".to_string(),
        p.longest_drawdown.to_string(),
    ]);
    summary.add_row(vec![
        "Avg holding hours".to_string(),
        optional(p.average_holding_hours),
    ]);
    println!("\nPerformance\n{summary}");

    let s = &report.streaks;
    let mut streaks = Table::new();
    streaks.set_header(vec!["Streaks", "Wins", "Losses"]);
    streaks.add_row(vec![
        "Longest".to_string(),
        s.max_win_streak.to_string(),
        s.max_loss_streak.to_string(),
    ]);
    streaks.add_row(vec![
        "Average".to_string(),
        money(s.average_win_streak),
        money(s.average_loss_streak),
    ]);
    println!("\nStreaks ({} total)\n{streaks}", s.total_streaks);

    let r = &report.risk;
    let mut risk = Table::new();
    risk.set_header(vec!["Risk", "Value"]);
    risk.add_row(vec!["Loss rate".to_string(), money(r.loss_rate)]);
    risk.add_row(vec!["Average loss size".to_string(), money(r.avg_risk)]);
    risk.add_row(vec!["Max single loss".to_string(), money(r.max_single_loss)]);
    risk.add_row(vec!["Average margin".to_string(), money(r.avg_position_size)]);
    risk.add_row(vec!["Max margin".to_string(), money(r.max_position_size)]);
    risk.add_row(vec!["Average leverage".to_string(), money(r.avg_leverage)]);
    println!("\nRisk\n{risk}");

    for dimension in &report.buckets.dimensions {
        println!("\n{:?}\n{}", dimension.kind, bucket_table(dimension));
    }

    println!(
        "\nConfluence (average score {})\n{}",
        money(report.confluence.average_score),
        bucket_table(&report.confluence.bands)
    );
}

fn bucket_table(dimension: &DimensionReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Bucket", "Trades", "Wins", "Win rate", "Total PnL", "Avg PnL"]);
    for bucket in dimension.buckets.iter().filter(|b| b.count > 0) {
        table.add_row(bucket_row(bucket));
    }
    table
}

fn bucket_row(bucket: &BucketStats) -> Vec<String> {
    vec![
        bucket.label.clone(),
        bucket.count.to_string(),
        bucket.win_count.to_string(),
        money(bucket.win_rate),
        money(bucket.total_pnl),
        money(bucket.avg_pnl),
    ]
}

fn money(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn optional(value: Option<Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), money)
}
