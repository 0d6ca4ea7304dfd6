use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use crate::calc::align::VolatilityTable;
use crate::util::rounding::round_to_places;

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 450.0;
const PADDING: f64 = 50.0;
const LEGEND_WIDTH: f64 = 170.0;
const X_TICKS: usize = 6;
const Y_TICKS: usize = 5;
const COLORS: [&str; 8] = [
    "#348dc1", "#ff9933", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

struct LegendEntry {
    label: String,
    color: &'static str,
    dash: bool,
}

fn svg_header() -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:11px;fill:#444}}</style><rect width="100%" height="100%" fill="#ffffff" />"##,
        w = WIDTH,
        h = HEIGHT
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn color_for(index: usize) -> &'static str {
    COLORS[index % COLORS.len()]
}

fn plot_width() -> f64 {
    WIDTH - 2.0 * PADDING - LEGEND_WIDTH
}

fn plot_height() -> f64 {
    HEIGHT - 2.0 * PADDING
}

fn x_position(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return PADDING + plot_width() / 2.0;
    }
    PADDING + plot_width() * index as f64 / (len - 1) as f64
}

fn y_position(value: f64, min_v: f64, max_v: f64) -> f64 {
    let span = max_v - min_v;
    let fraction = if span > 0.0 { (value - min_v) / span } else { 0.5 };
    PADDING + plot_height() * (1.0 - fraction)
}

/// Value range covering every plotted point and every average line.
fn value_range(table: &VolatilityTable, averages: &[(String, f64)]) -> (f64, f64) {
    let values = table
        .rows
        .iter()
        .flatten()
        .copied()
        .chain(averages.iter().map(|(_, avg)| *avg));
    let (min_v, max_v) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min_v == max_v {
        (min_v - 0.01, max_v + 0.01)
    } else {
        (min_v.min(0.0), max_v)
    }
}

fn draw_axes(svg: &mut String, table: &VolatilityTable, min_v: f64, max_v: f64) {
    let x0 = PADDING;
    let x1 = PADDING + plot_width();
    let y0 = PADDING;
    let y1 = PADDING + plot_height();

    svg.push_str(&format!(
        r##"<line x1="{x0:.2}" y1="{y1:.2}" x2="{x1:.2}" y2="{y1:.2}" stroke="#000" stroke-width="1" />"##
    ));
    svg.push_str(&format!(
        r##"<line x1="{x0:.2}" y1="{y0:.2}" x2="{x0:.2}" y2="{y1:.2}" stroke="#000" stroke-width="1" />"##
    ));

    for tick in 0..=Y_TICKS {
        let value = min_v + (max_v - min_v) * tick as f64 / Y_TICKS as f64;
        let y = y_position(value, min_v, max_v);
        svg.push_str(&format!(
            r##"<line x1="{x0:.2}" y1="{y:.2}" x2="{x1:.2}" y2="{y:.2}" stroke="#dddddd" stroke-width="0.5" />"##
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="end">{label}</text>"#,
            x = x0 - 6.0,
            ty = y + 4.0,
            label = round_to_places(value, 4)
        ));
    }

    let len = table.dates.len();
    let ticks = X_TICKS.min(len);
    for tick in 0..ticks {
        let index = if ticks <= 1 {
            0
        } else {
            tick * (len - 1) / (ticks - 1)
        };
        let x = x_position(index, len);
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#ccc" stroke-width="1" />"##,
            y2 = y1 + 5.0
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}" text-anchor="middle">{date}</text>"#,
            ty = y1 + 18.0,
            date = table.dates[index].format("%Y-%m-%d")
        ));
    }

    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">Date</text>"#,
        x = PADDING + plot_width() / 2.0,
        y = HEIGHT - 8.0
    ));
    svg.push_str(&format!(
        r#"<text x="14" y="{y:.2}" text-anchor="middle" transform="rotate(-90 14 {y:.2})">Volatility</text>"#,
        y = PADDING + plot_height() / 2.0
    ));
}

fn draw_legend(svg: &mut String, entries: &[LegendEntry]) {
    let x1 = WIDTH - LEGEND_WIDTH - PADDING / 2.0;
    let x2 = x1 + 22.0;
    for (i, entry) in entries.iter().enumerate() {
        let y = PADDING + 16.0 * i as f64;
        let dash = if entry.dash { "5 3" } else { "none" };
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" />"##,
            color = entry.color
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{ty:.2}">{label}</text>"#,
            x = x2 + 6.0,
            ty = y + 4.0,
            label = escape(&entry.label)
        ));
    }
}

/// Renders one line per displayed ticker plus a flat dashed line at each
/// ticker's average volatility.
pub fn render_volatility_chart(
    table: &VolatilityTable,
    averages: &[(String, f64)],
    title: &str,
) -> String {
    let mut svg = svg_header();
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="24" text-anchor="middle" style="font-size:15px;fill:#222">{title}</text>"#,
        x = WIDTH / 2.0,
        title = escape(title)
    ));

    if table.is_empty() {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">No data</text>"#,
            x = WIDTH / 2.0,
            y = HEIGHT / 2.0
        ));
        svg.push_str("</svg>");
        return svg;
    }

    let (min_v, max_v) = value_range(table, averages);
    draw_axes(&mut svg, table, min_v, max_v);

    let len = table.dates.len();
    let mut legend = Vec::new();
    for (column, ticker) in table.tickers.iter().enumerate() {
        let color = color_for(column);
        let points = table
            .column(ticker)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                format!(
                    "{:.2},{:.2}",
                    x_position(i, len),
                    y_position(value, min_v, max_v)
                )
            })
            .collect::<Vec<_>>()
            .join(" ");
        svg.push_str(&format!(
            r#"<polyline fill="none" stroke="{color}" stroke-width="1.5" points="{points}" />"#
        ));
        legend.push(LegendEntry {
            label: ticker.clone(),
            color,
            dash: false,
        });
    }

    for (ticker, average) in averages {
        // Averages share the colour of their ticker's line when it is plotted
        let index = table
            .tickers
            .iter()
            .position(|t| t == ticker)
            .unwrap_or(legend.len());
        let color = color_for(index);
        let y = y_position(*average, min_v, max_v);
        svg.push_str(&format!(
            r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1" stroke-dasharray="5 3" />"##,
            x1 = x_position(0, len),
            x2 = x_position(len - 1, len)
        ));
        legend.push(LegendEntry {
            label: format!("{} Avg Volatility", ticker),
            color,
            dash: true,
        });
    }

    draw_legend(&mut svg, &legend);
    svg.push_str("</svg>");
    svg
}

pub fn chart_title(window: usize, smoothed: bool) -> String {
    format!(
        "Volatility Comparison ({} Trading Days){}",
        window,
        if smoothed { " with Moving Average" } else { "" }
    )
}

pub fn write_chart(path: &Path, svg: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating chart directory {}", parent.display()))?;
    }
    fs::write(path, svg).with_context(|| format!("writing chart to {}", path.display()))?;
    info!("Chart written to {}", path.display());
    Ok(())
}
