//! trendpilot CLI: run the bot, inspect signals, look up market limits.
//!
//! Commands:
//! - `run`: decide and trade every poll interval (paper fills, or `--live`)
//! - `signal`: compute indicators over a CSV file and print the decision
//! - `constraints`: print the exchange's order limits for a pair

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use trendpilot_core::domain::{MarketConstraints, TradingPair};
use trendpilot_core::{
    compute_rows, detect, AccountSource, IndicatorParams, MarketDataSource, OrderSink,
    SignalThresholds,
};
use trendpilot_runner::logging;
use trendpilot_runner::{
    run_cycle, stop_on_interrupt, BotConfig, Collaborators, CsvMarketData, HuobiAccount,
    HuobiMarketData, PaperAccount, Scheduler,
};

#[derive(Parser)]
#[command(
    name = "trendpilot",
    version,
    about = "trendpilot: Supertrend + RSI spot trading bot"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RunArgs {
    /// Trading pair, e.g. BTC/USDT.
    pair: String,

    /// Quote currency to spend per buy.
    quote_amount: f64,

    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replay bars from a CSV file instead of the exchange.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Place real orders on the exchange (needs HUOBI_API_KEY and HUOBI_SECRET_KEY).
    #[arg(long, default_value_t = false, conflicts_with = "csv")]
    live: bool,

    /// Run a single cycle and exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Stop after this many cycles.
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Append logs to this file (overrides the config).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run decision cycles at the configured poll interval.
    Run(RunArgs),
    /// Compute indicators over a CSV file and print the latest decision.
    Signal {
        /// CSV with timestamp,open,high,low,close,volume columns.
        #[arg(long)]
        csv: PathBuf,

        /// ATR/RSI period.
        #[arg(long, default_value_t = 15)]
        period: usize,

        /// Supertrend band multiplier.
        #[arg(long, default_value_t = 5.0)]
        multiplier: f64,

        /// Use only the most recent N bars.
        #[arg(long)]
        window: Option<usize>,

        /// Trailing indicator rows to print.
        #[arg(long, default_value_t = 3)]
        rows: usize,
    },
    /// Print the exchange's order limits and rounding steps for a pair.
    Constraints {
        /// Trading pair, e.g. BTC/USDT.
        pair: String,

        /// Path to a TOML config file (for the exchange endpoint).
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args),
        Commands::Signal {
            csv,
            period,
            multiplier,
            window,
            rows,
        } => cmd_signal(csv, period, multiplier, window, rows),
        Commands::Constraints { pair, config } => cmd_constraints(pair, config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<BotConfig> {
    match path {
        Some(path) => BotConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(BotConfig::default()),
    }
}

fn parse_pair(pair: &str) -> Result<TradingPair> {
    pair.parse()
        .with_context(|| format!("invalid trading pair '{pair}'"))
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let pair = parse_pair(&args.pair)?;
    let mut config =
        load_config(args.config)?.with_overrides(Some(pair.clone()), Some(args.quote_amount));
    if args.log_file.is_some() {
        config.log_file = args.log_file;
    }
    let ctx = config.cycle_context()?;
    logging::init(config.log_file.as_deref())?;

    let market: Box<dyn MarketDataSource> = match &args.csv {
        Some(path) => Box::new(CsvMarketData::new(path)),
        None => Box::new(HuobiMarketData::new(&config.exchange)?),
    };

    let paper;
    let live;
    let (account, orders): (&dyn AccountSource, &dyn OrderSink) = if args.live {
        live = HuobiAccount::new(&config.exchange, config.exchange.credentials()?)?;
        (&live, &live)
    } else {
        let constraints = resolve_constraints(&config, &pair, args.csv.is_some())?;
        paper = PaperAccount::new(config.paper.balances.clone(), constraints)
            .with_fee_rate(config.paper.fee_rate);
        (&paper, &paper)
    };

    info!(
        pair = %ctx.pair,
        timeframe = %ctx.timeframe,
        source = market.name(),
        mode = if args.live { "live" } else { "paper" },
        config = %ctx.fingerprint,
        "trendpilot starting"
    );

    let deps = Collaborators {
        market: market.as_ref(),
        account,
        orders,
    };
    let mut scheduler = Scheduler::new(config.poll_interval());
    if args.once {
        scheduler = scheduler.max_cycles(1);
    } else if let Some(n) = args.max_cycles {
        scheduler = scheduler.max_cycles(n);
    }

    let stop = stop_on_interrupt().context("failed to install Ctrl-C handler")?;
    let summary = scheduler.run(&stop, |_| run_cycle(&ctx, &deps));

    let balances = match account.fetch_free_balances() {
        Ok(balances) => serde_json::to_string(&balances)?,
        Err(e) => format!("unavailable ({e})"),
    };
    println!(
        "{} cycle(s), {} failed; final balances: {balances}",
        summary.cycles, summary.failures
    );
    Ok(())
}

/// Limits from the config when given, otherwise from the exchange.
fn resolve_constraints(
    config: &BotConfig,
    pair: &TradingPair,
    offline: bool,
) -> Result<MarketConstraints> {
    if let Some(constraints) = config.paper.constraints {
        return Ok(constraints);
    }
    if offline {
        bail!("CSV replay needs [paper.constraints] in the config file");
    }
    let client = HuobiMarketData::new(&config.exchange)?;
    client
        .market_constraints(pair)
        .with_context(|| format!("failed to look up order limits for {pair}"))
}

fn cmd_signal(
    csv: PathBuf,
    period: usize,
    multiplier: f64,
    window: Option<usize>,
    rows: usize,
) -> Result<()> {
    let params = IndicatorParams::new(period, multiplier)?;
    let mut series = CsvMarketData::new(&csv)
        .load()
        .with_context(|| format!("failed to read {}", csv.display()))?;
    if let Some(window) = window {
        series = series.tail(window);
    }
    if series.is_empty() {
        bail!("{} contains no bars", csv.display());
    }

    let computed = compute_rows(series.as_slice(), &params);
    let decision = detect(&computed, &params, &SignalThresholds::default());

    for row in &computed[computed.len().saturating_sub(rows)..] {
        println!("{}", serde_json::to_string(row)?);
    }
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}

fn cmd_constraints(pair: String, config_path: Option<PathBuf>) -> Result<()> {
    let pair = parse_pair(&pair)?;
    let config = load_config(config_path)?;
    let constraints = HuobiMarketData::new(&config.exchange)?.market_constraints(&pair)?;
    println!("{}", serde_json::to_string_pretty(&constraints)?);
    Ok(())
}
