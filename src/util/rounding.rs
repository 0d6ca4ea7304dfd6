/// Rounds a value to `places` decimal places for display.
pub fn round_to_places(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Volatility as a percentage string, `n/a` when undefined.
pub fn format_volatility(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}%", round_to_places(v * 100.0, 2)),
        None => "n/a".to_string(),
    }
}
