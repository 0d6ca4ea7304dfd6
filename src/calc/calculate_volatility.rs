use chrono::NaiveDate;
use log::{debug, warn};
use std::str::FromStr;

use super::series::{mean_defined, pct_change, rolling_mean, rolling_std, PriceSeries};

/// Coarse window selector. Maps a label straight to a trading-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub fn trading_days(self) -> usize {
        match self {
            Timeframe::Daily => 1,
            Timeframe::Weekly => 5,
            Timeframe::Monthly => 21,
        }
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Timeframe::Daily),
            "weekly" => Ok(Timeframe::Weekly),
            "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!("unknown timeframe '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolatilitySettings {
    /// Rolling window W in trading days.
    pub window: usize,
    /// Moving-average window M applied on top of the volatility series.
    pub smoothing_window: Option<usize>,
}

impl VolatilitySettings {
    pub fn new(window: usize, smoothing_window: Option<usize>) -> Self {
        VolatilitySettings {
            window,
            smoothing_window,
        }
    }

    /// Timeframe mode never smooths.
    pub fn from_timeframe(timeframe: Timeframe) -> Self {
        VolatilitySettings {
            window: timeframe.trading_days(),
            smoothing_window: None,
        }
    }

    pub fn is_smoothed(&self) -> bool {
        self.smoothing_window.is_some()
    }
}

/// Final per-ticker output: the (possibly smoothed) volatility series dated on
/// the return dates, and the mean of its defined values.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerVolatility {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
    pub average: Option<f64>,
}

impl TickerVolatility {
    pub fn has_data(&self) -> bool {
        self.values.iter().any(Option::is_some)
    }
}

/// Rolling volatility of a price path, indexed like its return series.
///
/// `vol[i] = sample_std(returns[i-W+1..=i]) * sqrt(W)`
///
/// The scale factor is the window length itself, not a trading-year constant
/// such as `sqrt(252)`. Values are therefore only comparable between runs that
/// use the same window.
pub fn rolling_volatility(prices: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let returns = pct_change(prices);
    let scale = (window as f64).sqrt();
    rolling_std(&returns, window)
        .into_iter()
        .map(|std| std.map(|s| s * scale))
        .collect()
}

/// Volatility series for a bare price path, smoothed if the settings ask for it.
pub fn volatility_values(prices: &[Option<f64>], settings: &VolatilitySettings) -> Vec<Option<f64>> {
    let volatility = rolling_volatility(prices, settings.window);
    match settings.smoothing_window {
        Some(ma_window) => rolling_mean(&volatility, ma_window),
        None => volatility,
    }
}

pub fn calculate_volatility(
    price_series: &PriceSeries,
    settings: &VolatilitySettings,
) -> TickerVolatility {
    let values = volatility_values(&price_series.prices, settings);
    let average = mean_defined(&values);

    if values.iter().all(Option::is_none) {
        warn!(
            "{}: no volatility values for window {} over {} prices",
            price_series.ticker,
            settings.window,
            price_series.prices.len()
        );
    } else {
        debug!(
            "{}: {} of {} volatility values defined, average {:?}",
            price_series.ticker,
            values.iter().filter(|v| v.is_some()).count(),
            values.len(),
            average
        );
    }

    TickerVolatility {
        ticker: price_series.ticker.clone(),
        dates: price_series.return_dates().to_vec(),
        values,
        average,
    }
}
