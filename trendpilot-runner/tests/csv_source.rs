//! CSV bar replay source.

use std::io::Write;

use trendpilot_core::domain::{Timeframe, TradingPair};
use trendpilot_core::{DataError, MarketDataSource};
use trendpilot_runner::CsvMarketData;

fn write_csv(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn pair() -> TradingPair {
    "BTC/USDT".parse().unwrap()
}

const BARS: &str = "\
timestamp,open,high,low,close,volume
2024-01-02T00:00:00Z,100.0,101.0,99.0,100.5,10
2024-01-02T01:00:00Z,100.5,102.0,100.0,101.5,12
1704160800000,101.5,103.0,101.0,102.5,9
2024-01-02T03:00:00Z, 102.5 , 104.0 , 102.0 , 103.5 , 11
";

#[test]
fn replays_last_bars_in_order() {
    let file = write_csv(BARS);
    let source = CsvMarketData::new(file.path());

    let series = source.fetch_bars(&pair(), Timeframe::Hour1, 3).unwrap();
    let closes: Vec<f64> = series.as_slice().iter().map(|b| b.close).collect();
    assert_eq!(closes, vec![101.5, 102.5, 103.5]);
    assert_eq!(source.load().unwrap().len(), 4);
}

#[test]
fn latest_price_is_last_close() {
    let file = write_csv(BARS);
    let source = CsvMarketData::new(file.path());
    assert_eq!(source.fetch_latest_price(&pair()).unwrap(), 103.5);
}

#[test]
fn out_of_order_rows_are_rejected() {
    let file = write_csv(
        "timestamp,open,high,low,close,volume\n\
         2024-01-02T01:00:00Z,1,1,1,1,1\n\
         2024-01-02T00:00:00Z,1,1,1,1,1\n",
    );
    let source = CsvMarketData::new(file.path());
    assert!(matches!(source.load(), Err(DataError::Io(_))));
}

#[test]
fn header_only_file_has_no_data() {
    let file = write_csv("timestamp,open,high,low,close,volume\n");
    let source = CsvMarketData::new(file.path());
    assert!(matches!(
        source.fetch_bars(&pair(), Timeframe::Hour1, 10),
        Err(DataError::NoData { .. })
    ));
    assert!(matches!(
        source.fetch_latest_price(&pair()),
        Err(DataError::NoData { .. })
    ));
}

#[test]
fn malformed_number_names_the_row() {
    let file = write_csv("timestamp,open,high,low,close,volume\n2024-01-02T00:00:00Z,1,x,1,1,1\n");
    let source = CsvMarketData::new(file.path());
    match source.load() {
        Err(DataError::Io(msg)) => assert!(msg.contains("row 1"), "{msg}"),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn inconsistent_bar_is_rejected() {
    // high below close
    let file = write_csv(
        "timestamp,open,high,low,close,volume\n\
         2024-01-02T00:00:00Z,100,101,99,100.5,10\n\
         2024-01-02T01:00:00Z,100.5,100.0,99.5,102.0,10\n",
    );
    let source = CsvMarketData::new(file.path());
    match source.load() {
        Err(DataError::Io(msg)) => assert!(msg.contains("row 2: inconsistent"), "{msg}"),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn void_bar_is_rejected() {
    let file = write_csv("timestamp,open,high,low,close,volume\n2024-01-02T00:00:00Z,NaN,1,1,1,1\n");
    let source = CsvMarketData::new(file.path());
    match source.fetch_bars(&pair(), Timeframe::Hour1, 5) {
        Err(DataError::Io(msg)) => assert!(msg.contains("void"), "{msg}"),
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_io_error() {
    let source = CsvMarketData::new("/definitely/not/here.csv");
    assert!(matches!(source.load(), Err(DataError::Io(_))));
    assert!(source.name().starts_with("csv:"));
}
