use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use log::{debug, error, info, warn};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tokio::time::timeout;

use crate::calc::series::PriceSeries;
use crate::config::{PolygonConfig, VolatilityRequest};

#[derive(Deserialize, Debug)]
struct ApiResponse {
    // Absent when the ticker is unknown or there were no trading days
    #[serde(default)]
    results: Vec<DataPoint>,
}

#[derive(Deserialize, Debug)]
struct DataPoint {
    c: f64, // Close, split/dividend adjusted when `adjusted=true`
    t: i64, // Unix timestamp in milliseconds
}

/// Parses an aggregates response body into (trading date, adjusted close) pairs,
/// ascending by date. Later bars win on duplicate dates.
pub fn parse_daily_closes(body: &str) -> Result<Vec<(NaiveDate, f64)>> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| anyhow!("Failed to deserialize response: {}", e))?;

    let mut closes: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for data_point in response.results {
        // Convert the timestamp (t) from milliseconds to a UTC trading date
        let Some(timestamp) = Utc.timestamp_millis_opt(data_point.t).single() else {
            warn!("Skipping bar with invalid timestamp {}", data_point.t);
            continue;
        };
        if !data_point.c.is_finite() {
            warn!("Skipping non-finite close on {}", timestamp.date_naive());
            continue;
        }
        closes.insert(timestamp.date_naive(), data_point.c);
    }

    Ok(closes.into_iter().collect())
}

/// The key travels in the `Authorization` header, so the URL is safe to log.
fn daily_aggregates_url(
    config: &PolygonConfig,
    ticker: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> String {
    format!(
        "{}/{}/range/1/day/{}/{}?adjusted=true&sort=asc&limit=50000",
        config.api_url,
        ticker,
        start_date.format("%Y-%m-%d"),
        end_date.format("%Y-%m-%d")
    )
}

async fn request_daily_closes(
    client: &Client,
    config: &PolygonConfig,
    ticker: &str,
    url: &str,
) -> Result<Vec<(NaiveDate, f64)>> {
    let response = client
        .get(url)
        .bearer_auth(&config.api_key)
        .send()
        .await
        .map_err(|e| {
            anyhow!(
                "Error sending request to Polygon for {}: {}",
                ticker,
                e.without_url()
            )
        })?;

    if response.status() != StatusCode::OK {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(
            "Request for {} failed with status: {} and body: {}",
            ticker, status, error_text
        );
        return Err(anyhow!(
            "Polygon request for {} failed with status {}",
            ticker,
            status
        ));
    }

    let body = response.text().await.map_err(|e| {
        anyhow!(
            "Error reading Polygon response for {}: {}",
            ticker,
            e.without_url()
        )
    })?;
    parse_daily_closes(&body).with_context(|| format!("parsing {} bars", ticker))
}

/// Fetches daily adjusted closes for one ticker. An unknown ticker comes back
/// as an empty vector; transport errors, non-200 responses and a request that
/// does not finish (body included) within `config.timeout` fail.
pub async fn get_polygon_prices(
    client: &Client,
    config: &PolygonConfig,
    ticker: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<(NaiveDate, f64)>> {
    if start_date > end_date {
        warn!("{}: start date {} is after end date {}", ticker, start_date, end_date);
        return Ok(Vec::new());
    }

    let url = daily_aggregates_url(config, ticker, start_date, end_date);
    debug!("Requesting {}", url);

    let closes = match timeout(
        config.timeout,
        request_daily_closes(client, config, ticker, &url),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => {
            error!("Timeout occurred while fetching {} from Polygon", ticker);
            return Err(anyhow!(
                "Timeout occurred while fetching {} from Polygon",
                ticker
            ));
        }
    };

    if closes.is_empty() {
        warn!("{}: no prices returned between {} and {}", ticker, start_date, end_date);
    } else {
        debug!("{}: received {} daily closes", ticker, closes.len());
    }

    Ok(closes)
}

/// Puts every ticker on the union of all fetched dates. Days a ticker did not
/// trade (or every day, for an unknown ticker) hold `None`.
pub fn merge_price_series(fetched: Vec<(String, Vec<(NaiveDate, f64)>)>) -> Vec<PriceSeries> {
    let dates: Vec<NaiveDate> = fetched
        .iter()
        .flat_map(|(_, closes)| closes.iter().map(|(date, _)| *date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    fetched
        .into_iter()
        .map(|(ticker, closes)| {
            let by_date: BTreeMap<NaiveDate, f64> = closes.into_iter().collect();
            let prices = dates.iter().map(|date| by_date.get(date).copied()).collect();
            PriceSeries::new(&ticker, dates.clone(), prices)
        })
        .collect()
}

/// Fetches each requested ticker in turn. The first failure aborts the request.
pub async fn fetch_price_series(
    config: &PolygonConfig,
    request: &VolatilityRequest,
) -> Result<Vec<PriceSeries>> {
    let client = Client::new();

    let mut fetched = Vec::with_capacity(request.tickers.len());
    for ticker in &request.tickers {
        let closes =
            get_polygon_prices(&client, config, ticker, request.start_date, request.end_date)
                .await?;
        fetched.push((ticker.clone(), closes));
    }

    let series = merge_price_series(fetched);
    info!(
        "Fetched {} tickers over {} trading days",
        series.len(),
        series.first().map_or(0, |s| s.dates.len())
    );
    Ok(series)
}
