use super::config::{parse_tickers, resolve_settings, Config, ConfigError};
use crate::calc::calculate_volatility::VolatilitySettings;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup(|key| vars.get(key).cloned(), today())
}

#[test]
fn test_parse_tickers_normalises_input() {
    assert_eq!(parse_tickers(" aapl, Msft ,goog"), vec!["AAPL", "MSFT", "GOOG"]);
    assert_eq!(parse_tickers("spy,, ,qqq,"), vec!["SPY", "QQQ"]);
    assert!(parse_tickers(" , ").is_empty());
}

#[test]
fn test_defaults() {
    let config = load(&[("POLYGON_API_KEY", "key")]).expect("config should load");

    assert_eq!(config.request.tickers, vec!["AAPL", "MSFT", "GOOG"]);
    assert_eq!(
        config.request.start_date,
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    );
    assert_eq!(config.request.end_date, today());
    assert_eq!(config.request.settings, VolatilitySettings::new(21, None));
    assert_eq!(config.polygon.api_url, "https://api.polygon.io/v2/aggs/ticker");
    assert_eq!(config.polygon.timeout, Duration::from_secs(10));
    assert_eq!(config.chart_path, PathBuf::from("volatility.svg"));
}

#[test]
fn test_explicit_values() {
    let config = load(&[
        ("POLYGON_API_KEY", "key"),
        ("POLYGON_API_URL", "http://localhost:8080/aggs/"),
        ("TICKERS", "tsla"),
        ("START_DATE", "2023-01-03"),
        ("END_DATE", "2023-12-29"),
        ("ROLLING_WINDOW", "10"),
        ("MA_WINDOW", "5"),
        ("REQUEST_TIMEOUT_SECS", "3"),
        ("CHART_PATH", "out/tsla.svg"),
    ])
    .expect("config should load");

    assert_eq!(config.request.tickers, vec!["TSLA"]);
    assert_eq!(
        config.request.end_date,
        NaiveDate::from_ymd_opt(2023, 12, 29).unwrap()
    );
    assert_eq!(config.request.settings, VolatilitySettings::new(10, Some(5)));
    assert_eq!(config.polygon.api_url, "http://localhost:8080/aggs");
    assert_eq!(config.polygon.timeout, Duration::from_secs(3));
    assert_eq!(config.chart_path, PathBuf::from("out/tsla.svg"));
}

#[test]
fn test_weekly_timeframe_overrides_other_inputs() {
    let settings = resolve_settings(Some("63"), Some("10"), Some("Weekly")).unwrap();
    assert_eq!(settings, VolatilitySettings::new(5, None));

    let settings = resolve_settings(Some("not a number"), None, Some("weekly")).unwrap();
    assert_eq!(settings.window, 5);
}

#[test]
fn test_blank_optional_inputs_are_ignored() {
    let settings = resolve_settings(Some("7"), Some(" "), Some("")).unwrap();
    assert_eq!(settings, VolatilitySettings::new(7, None));

    let settings = resolve_settings(Some("  "), Some("3"), None).unwrap();
    assert_eq!(settings, VolatilitySettings::new(21, Some(3)));

    let config = load(&[("POLYGON_API_KEY", "key"), ("ROLLING_WINDOW", "")]).unwrap();
    assert_eq!(config.request.settings.window, 21);
}

#[test]
fn test_invalid_values_are_rejected() {
    assert_eq!(
        load(&[]).unwrap_err(),
        ConfigError::Missing("POLYGON_API_KEY")
    );
    assert_eq!(
        load(&[("POLYGON_API_KEY", "key"), ("TICKERS", " , ")]).unwrap_err(),
        ConfigError::NoTickers
    );
    assert_eq!(
        load(&[("POLYGON_API_KEY", "key"), ("ROLLING_WINDOW", "0")]).unwrap_err(),
        ConfigError::InvalidWindow {
            name: "ROLLING_WINDOW",
            value: "0".to_string()
        }
    );
    assert!(matches!(
        load(&[("POLYGON_API_KEY", "key"), ("MA_WINDOW", "-3")]),
        Err(ConfigError::InvalidWindow { name: "MA_WINDOW", .. })
    ));
    assert!(matches!(
        load(&[("POLYGON_API_KEY", "key"), ("START_DATE", "01/02/2020")]),
        Err(ConfigError::InvalidDate { name: "START_DATE", .. })
    ));
    assert_eq!(
        load(&[("POLYGON_API_KEY", "key"), ("TIMEFRAME", "Hourly")]).unwrap_err(),
        ConfigError::InvalidTimeframe("Hourly".to_string())
    );
}
