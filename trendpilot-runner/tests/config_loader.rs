//! Loading bot configuration from TOML files.

use std::io::Write;

use trendpilot_core::domain::Timeframe;
use trendpilot_runner::{BotConfig, ConfigError};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn full_file_round_trips_into_a_cycle_context() {
    let file = write_config(
        r#"
pair = "btc/usdt"
quote_amount = 25.0
timeframe = "4h"
period = 10
multiplier = 3.0
window = 40
poll_interval_secs = 300
log_file = "bot.log"

[thresholds]
overbought = 80.0
oversold = 20.0

[exchange]
base_url = "https://api.huobi.pro/"
max_retries = 5

[paper]
fee_rate = 0.001

[paper.balances]
usdt = 500.0
BTC = 0.01

[paper.constraints]
min_amount = 0.0001
max_amount = 1000.0
price_precision = 0.01
amount_precision = 0.000001
"#,
    );

    let config = BotConfig::load(file.path()).unwrap();
    assert_eq!(config.timeframe, Timeframe::Hour4);
    assert_eq!(config.thresholds.overbought, 80.0);
    assert_eq!(config.exchange.max_retries, 5);
    assert_eq!(config.exchange.timeout_secs, 30);
    assert_eq!(config.paper.balances.free("USDT"), 500.0);
    assert_eq!(config.paper.balances.free("btc"), 0.01);
    assert_eq!(config.paper.constraints.unwrap().amount_precision, 0.000001);

    let ctx = config.cycle_context().unwrap();
    assert_eq!(ctx.pair.to_string(), "BTC/USDT");
    assert_eq!(ctx.params.period(), 10);
    assert_eq!(ctx.window, 40);
    assert_eq!(ctx.quote_amount, 25.0);
}

#[test]
fn empty_file_uses_defaults() {
    let file = write_config("");
    let config = BotConfig::load(file.path()).unwrap();
    assert_eq!(config, BotConfig::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let file = write_config("perod = 14\n");
    assert!(matches!(
        BotConfig::load(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn bad_timeframe_is_a_parse_error() {
    assert!(matches!(
        BotConfig::from_toml_str("timeframe = \"2h\"\n"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = BotConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::Io { .. })));
}

#[test]
fn command_line_overrides_complete_a_partial_file() {
    let file = write_config("period = 14\nwindow = 30\n");
    let config = BotConfig::load(file.path())
        .unwrap()
        .with_overrides(Some("ETH/USDT".parse().unwrap()), Some(15.0));
    let ctx = config.cycle_context().unwrap();
    assert_eq!(ctx.params.period(), 14);
    assert_eq!(ctx.quote_amount, 15.0);
}

#[test]
fn fingerprint_tracks_file_content() {
    let a = BotConfig::from_toml_str("period = 14\n").unwrap();
    let b = BotConfig::from_toml_str("period = 14\n").unwrap();
    let c = BotConfig::from_toml_str("period = 20\n").unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
