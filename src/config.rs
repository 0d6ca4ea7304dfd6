use chrono::{NaiveDate, Utc};
use dotenv::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::calc::calculate_volatility::{Timeframe, VolatilitySettings};

const DEFAULT_TICKERS: &str = "AAPL, MSFT, GOOG";
const DEFAULT_START_DATE: &str = "2020-01-01";
const DEFAULT_ROLLING_WINDOW: usize = 21;
const DEFAULT_POLYGON_API_URL: &str = "https://api.polygon.io/v2/aggs/ticker";
const DEFAULT_CHART_PATH: &str = "volatility.svg";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidWindow { name: &'static str, value: String },

    #[error("{name} must be a date in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { name: &'static str, value: String },

    #[error("TIMEFRAME must be one of Daily, Weekly, Monthly, got '{0}'")]
    InvalidTimeframe(String),

    #[error("{name} must be a whole number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },

    #[error("no ticker symbols given")]
    NoTickers,
}

/// One volatility comparison: which tickers, which dates, which windows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolatilityRequest {
    pub tickers: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub settings: VolatilitySettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolygonConfig {
    pub api_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub request: VolatilityRequest,
    pub polygon: PolygonConfig,
    pub chart_path: PathBuf,
}

/// Splits a comma-separated ticker list, trimming and upper-casing each symbol.
pub fn parse_tickers(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|ticker| ticker.trim().to_uppercase())
        .filter(|ticker| !ticker.is_empty())
        .collect()
}

fn parse_window(name: &'static str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(window) if window >= 1 => Ok(window),
        _ => Err(ConfigError::InvalidWindow {
            name,
            value: value.to_string(),
        }),
    }
}

fn parse_date(name: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        name,
        value: value.to_string(),
    })
}

/// Window settings from the three inputs. A timeframe label wins over
/// everything else and turns smoothing off.
pub fn resolve_settings(
    rolling_window: Option<&str>,
    ma_window: Option<&str>,
    timeframe: Option<&str>,
) -> Result<VolatilitySettings, ConfigError> {
    if let Some(label) = timeframe.filter(|label| !label.trim().is_empty()) {
        let timeframe: Timeframe = label
            .parse()
            .map_err(|_| ConfigError::InvalidTimeframe(label.to_string()))?;
        return Ok(VolatilitySettings::from_timeframe(timeframe));
    }

    let window = match rolling_window.filter(|value| !value.trim().is_empty()) {
        Some(value) => parse_window("ROLLING_WINDOW", value)?,
        None => DEFAULT_ROLLING_WINDOW,
    };
    let smoothing_window = match ma_window.filter(|value| !value.trim().is_empty()) {
        Some(value) => Some(parse_window("MA_WINDOW", value)?),
        None => None,
    };

    Ok(VolatilitySettings::new(window, smoothing_window))
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok(), Utc::now().date_naive())
    }

    pub fn from_lookup<F>(lookup: F, today: NaiveDate) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let tickers = parse_tickers(&lookup("TICKERS").unwrap_or_else(|| DEFAULT_TICKERS.to_string()));
        if tickers.is_empty() {
            return Err(ConfigError::NoTickers);
        }

        let start_date = parse_date(
            "START_DATE",
            &lookup("START_DATE").unwrap_or_else(|| DEFAULT_START_DATE.to_string()),
        )?;
        let end_date = match lookup("END_DATE") {
            Some(value) => parse_date("END_DATE", &value)?,
            None => today,
        };

        let settings = resolve_settings(
            lookup("ROLLING_WINDOW").as_deref(),
            lookup("MA_WINDOW").as_deref(),
            lookup("TIMEFRAME").as_deref(),
        )?;

        let api_key = lookup("POLYGON_API_KEY").ok_or(ConfigError::Missing("POLYGON_API_KEY"))?;
        let api_url = lookup("POLYGON_API_URL").unwrap_or_else(|| DEFAULT_POLYGON_API_URL.to_string());
        let timeout_secs = match lookup("REQUEST_TIMEOUT_SECS") {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout {
                    name: "REQUEST_TIMEOUT_SECS",
                    value,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let chart_path = lookup("CHART_PATH").unwrap_or_else(|| DEFAULT_CHART_PATH.to_string());

        Ok(Config {
            request: VolatilityRequest {
                tickers,
                start_date,
                end_date,
                settings,
            },
            polygon: PolygonConfig {
                api_url: api_url.trim_end_matches('/').to_string(),
                api_key,
                timeout: Duration::from_secs(timeout_secs),
            },
            chart_path: PathBuf::from(chart_path),
        })
    }
}
