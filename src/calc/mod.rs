pub mod align;
pub mod calculate_volatility;
pub mod series;
