use chrono::NaiveDate;

/// Adjusted-close prices for one ticker on a shared, strictly increasing date index.
/// `None` marks a trading day with no price for this ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub prices: Vec<Option<f64>>,
}

impl PriceSeries {
    pub fn new(ticker: &str, dates: Vec<NaiveDate>, prices: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(dates.len(), prices.len());
        PriceSeries {
            ticker: ticker.to_string(),
            dates,
            prices,
        }
    }

    /// Dates of the return series: every price date except the first.
    pub fn return_dates(&self) -> &[NaiveDate] {
        if self.dates.is_empty() {
            &self.dates
        } else {
            &self.dates[1..]
        }
    }
}

/// Simple period-over-period change, `price[i+1] / price[i] - 1`.
/// One entry shorter than `prices`.
pub fn pct_change(prices: &[Option<f64>]) -> Vec<Option<f64>> {
    prices
        .windows(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(prev), Some(curr)) if prev != 0.0 => {
                let change = curr / prev - 1.0;
                change.is_finite().then_some(change)
            }
            _ => None,
        })
        .collect()
}

/// Collects a trailing window, or `None` if any value in it is absent.
fn defined_window(window: &[Option<f64>]) -> Option<Vec<f64>> {
    window.iter().copied().collect()
}

/// Applies `stat` to every trailing window of `window` values.
/// Positions before the first full window, and windows holding an absent
/// value, come out as `None`.
fn rolling<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }

    for (offset, slice) in values.windows(window).enumerate() {
        out[offset + window - 1] = defined_window(slice).and_then(|w| stat(&w));
    }
    out
}

/// Sample standard deviation (n - 1 denominator). Undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std = variance.sqrt();
    std.is_finite().then_some(std)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn rolling_std(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, sample_std)
}

pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Mean of the defined entries, ignoring absent ones.
pub fn mean_defined(values: &[Option<f64>]) -> Option<f64> {
    let defined: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    mean(&defined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pct_change_skips_absent_and_zero_prices() {
        let prices = [Some(100.0), Some(110.0), None, Some(121.0), Some(0.0), Some(5.0)];
        let returns = pct_change(&prices);

        assert_eq!(returns.len(), 5);
        assert!((returns[0].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(returns[1], None);
        assert_eq!(returns[2], None);
        assert!((returns[3].unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(returns[4], None);
    }

    #[test]
    fn pct_change_of_short_series_is_empty() {
        assert!(pct_change(&[]).is_empty());
        assert!(pct_change(&[Some(1.0)]).is_empty());
    }

    #[test]
    fn rolling_std_needs_full_window() {
        let values = [Some(1.0), Some(2.0), Some(3.0), None, Some(5.0), Some(6.0)];
        let out = rolling_std(&values, 2);

        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 0.5f64.sqrt()).abs() < 1e-12);
        assert!((out[2].unwrap() - 0.5f64.sqrt()).abs() < 1e-12);
        assert_eq!(out[3], None);
        assert_eq!(out[4], None);
        assert!((out[5].unwrap() - 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rolling_with_degenerate_window_is_all_absent() {
        let values = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(rolling_mean(&values, 0), vec![None, None, None]);
        assert_eq!(rolling_mean(&values, 4), vec![None, None, None]);
        assert_eq!(rolling_std(&values, 1), vec![None, None, None]);
    }

    #[test]
    fn mean_defined_ignores_gaps() {
        assert_eq!(mean_defined(&[None, Some(1.0), None, Some(3.0)]), Some(2.0));
        assert_eq!(mean_defined(&[None, None]), None);
    }
}
