use anyhow::{Context, Result};
use log::info;

mod calc;
mod chart;
mod config;
mod data;
mod util;

#[cfg(test)]
mod config_test;

use crate::calc::align::{align_volatility, VolatilityTable};
use crate::calc::calculate_volatility::{calculate_volatility, TickerVolatility};
use crate::calc::series::PriceSeries;
use crate::chart::svg::{chart_title, render_volatility_chart, write_chart};
use crate::config::{Config, VolatilityRequest};
use crate::data::polygon::fetch_price_series;
use crate::util::rounding::format_volatility;

/// Volatility for every requested ticker plus the chart-ready table.
struct VolatilityReport {
    results: Vec<TickerVolatility>,
    table: VolatilityTable,
}

fn build_report(request: &VolatilityRequest, price_series: &[PriceSeries]) -> VolatilityReport {
    let results: Vec<TickerVolatility> = price_series
        .iter()
        .map(|series| calculate_volatility(series, &request.settings))
        .collect();
    let table = align_volatility(&results);
    VolatilityReport { results, table }
}

fn averages(results: &[TickerVolatility]) -> Vec<(String, f64)> {
    results
        .iter()
        .filter_map(|result| result.average.map(|avg| (result.ticker.clone(), avg)))
        .collect()
}

async fn run(config: &Config) -> Result<()> {
    let request = &config.request;
    info!(
        "Historical volatility for {} from {} to {} (window {}, smoothing {:?})",
        request.tickers.join(", "),
        request.start_date,
        request.end_date,
        request.settings.window,
        request.settings.smoothing_window
    );

    let price_series = fetch_price_series(&config.polygon, request)
        .await
        .context("fetching price data")?;

    let report = build_report(request, &price_series);

    println!(
        "Historical Volatility ({} trading days){}",
        request.settings.window,
        if request.settings.is_smoothed() {
            " with Moving Average"
        } else {
            ""
        }
    );
    for result in &report.results {
        println!(
            "{:<8} average volatility: {}",
            result.ticker,
            format_volatility(result.average)
        );
    }
    println!("{} dates plotted", report.table.dates.len());

    let title = chart_title(request.settings.window, request.settings.is_smoothed());
    let svg = render_volatility_chart(&report.table, &averages(&report.results), &title);
    write_chart(&config.chart_path, &svg)?;
    println!("Chart saved to {}", config.chart_path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env().context("invalid configuration")?;
    run(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::calculate_volatility::VolatilitySettings;
    use crate::data::polygon::merge_price_series;
    use chrono::{Duration, NaiveDate};

    fn request(tickers: &[&str], settings: VolatilitySettings) -> VolatilityRequest {
        VolatilityRequest {
            tickers: tickers.iter().map(|t| t.to_string()).collect(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            settings,
        }
    }

    fn closes(prices: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| (start + Duration::days(i as i64), p))
            .collect()
    }

    #[test]
    fn report_aligns_tickers_and_keeps_unknown_ticker_average_empty() {
        let settings = VolatilitySettings::new(3, None);
        let series = merge_price_series(vec![
            (
                "AAA".to_string(),
                closes(&[100.0, 102.0, 101.0, 103.0, 104.0, 102.0, 105.0, 107.0]),
            ),
            (
                "BBB".to_string(),
                closes(&[50.0, 50.5, 49.0, 51.0, 52.0, 51.5]),
            ),
            ("ZZZZ".to_string(), vec![]),
        ]);

        let report = build_report(&request(&["AAA", "BBB", "ZZZZ"], settings), &series);

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[2].average, None);
        assert_eq!(report.table.tickers, vec!["AAA", "BBB"]);
        // BBB has 5 returns, so W = 3 leaves 3 defined values on shared dates
        assert_eq!(report.table.dates.len(), 3);

        let avgs = averages(&report.results);
        assert_eq!(avgs.len(), 2);
        assert_eq!(avgs[0].0, "AAA");
    }

    #[test]
    fn smoothing_is_applied_per_ticker() {
        let prices = closes(&[
            100.0, 101.0, 99.5, 102.0, 103.5, 101.0, 104.0, 106.0, 105.0, 107.5, 108.0, 106.5,
        ]);
        let series = merge_price_series(vec![("AAA".to_string(), prices)]);

        let raw = build_report(&request(&["AAA"], VolatilitySettings::new(3, None)), &series);
        let smoothed = build_report(&request(&["AAA"], VolatilitySettings::new(3, Some(4))), &series);

        // 11 returns: 9 raw values, 6 after a 4-day moving average
        assert_eq!(raw.table.dates.len(), 9);
        assert_eq!(smoothed.table.dates.len(), 6);
        let first_smoothed = smoothed.table.rows[0][0];
        let expected = raw.table.rows[..4].iter().map(|row| row[0]).sum::<f64>() / 4.0;
        assert!((first_smoothed - expected).abs() < 1e-12);
    }
}
