use chrono::NaiveDate;
use log::warn;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::calculate_volatility::TickerVolatility;

/// Per-date rows of the displayed tickers, complete rows only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolatilityTable {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    /// `rows[i][j]` is the value for `tickers[j]` on `dates[i]`.
    pub rows: Vec<Vec<f64>>,
}

impl VolatilityTable {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, ticker: &str) -> Option<Vec<f64>> {
        let idx = self.tickers.iter().position(|t| t == ticker)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// Lines tickers up by date and keeps only the dates where every displayed
/// ticker has a value. Tickers with no value at all are left off the table.
pub fn align_volatility(results: &[TickerVolatility]) -> VolatilityTable {
    let displayed: Vec<&TickerVolatility> = results
        .iter()
        .filter(|result| {
            let keep = result.has_data();
            if !keep {
                warn!("{}: no volatility data, leaving it off the chart", result.ticker);
            }
            keep
        })
        .collect();

    if displayed.is_empty() {
        return VolatilityTable::default();
    }

    let lookups: Vec<HashMap<NaiveDate, f64>> = displayed
        .iter()
        .map(|result| {
            result
                .dates
                .iter()
                .zip(result.values.iter())
                .filter_map(|(date, value)| value.map(|v| (*date, v)))
                .collect()
        })
        .collect();

    let all_dates: BTreeSet<NaiveDate> = displayed
        .iter()
        .flat_map(|result| result.dates.iter().copied())
        .collect();

    let mut complete: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for date in all_dates {
        let row: Option<Vec<f64>> = lookups.iter().map(|lookup| lookup.get(&date).copied()).collect();
        if let Some(row) = row {
            complete.insert(date, row);
        }
    }

    let (dates, rows): (Vec<NaiveDate>, Vec<Vec<f64>>) = complete.into_iter().unzip();
    VolatilityTable {
        tickers: displayed.iter().map(|result| result.ticker.clone()).collect(),
        dates,
        rows,
    }
}
