use crate::analysis::Analysis;
use crate::error::{Result, SkewError};
use crate::models::{TimeSkew, VolatilitySurface};
use plotly::common::{Mode, Title};
use plotly::layout::{Axis, LayoutScene};
use plotly::{Layout, Plot, Scatter, Surface};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SURFACE_TITLE: &str = "Volatility Surface";
pub const SKEW_TITLE: &str = "Time Skew";

/// 3D surface: x = moneyness, y = days to expiration, z = implied volatility.
/// Gaps in the grid are emitted as `null` so the renderer leaves holes.
pub fn surface_plot(surface: &VolatilitySurface) -> Plot {
    let trace = Surface::new(surface.rows())
        .x(surface.moneyness.clone())
        .y(surface.days_to_expiration.clone())
        .name(&surface.symbol);

    let layout = Layout::new().title(Title::with_text(SURFACE_TITLE)).scene(
        LayoutScene::new()
            .x_axis(Axis::new().title(Title::with_text("Moneyness")))
            .y_axis(Axis::new().title(Title::with_text("Days to Expiration")))
            .z_axis(Axis::new().title(Title::with_text("Implied Volatility"))),
    );

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Mean implied volatility against days to expiration, lines and markers.
pub fn time_skew_plot(skew: &TimeSkew) -> Plot {
    let trace = Scatter::new(skew.days(), skew.mean_volatilities())
        .mode(Mode::LinesMarkers)
        .name(&skew.symbol);

    let layout = Layout::new()
        .title(Title::with_text(SKEW_TITLE))
        .x_axis(Axis::new().title(Title::with_text("Days to Expiration")))
        .y_axis(Axis::new().title(Title::with_text("Average Implied Volatility")));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);
    plot
}

/// Static PNG of the time skew curve.
pub fn plot_time_skew_png<P: AsRef<Path>>(skew: &TimeSkew, output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();

    let points: Vec<(f64, f64)> = skew
        .points
        .iter()
        .map(|p| (p.days_to_expiration as f64, p.mean_implied_volatility))
        .collect();

    if points.is_empty() {
        return Err(SkewError::Plot(
            "No data points for time skew plot".to_string(),
        ));
    }

    let min_days = points.iter().map(|(d, _)| *d).fold(f64::INFINITY, f64::min);
    let max_days = points.iter().map(|(d, _)| *d).fold(f64::NEG_INFINITY, f64::max);
    let min_vol = points.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max_vol = points.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);

    // A single expiration still needs a non-empty range
    let days_pad = ((max_days - min_days) * 0.05).max(1.0);
    let vol_pad = ((max_vol - min_vol) * 0.1).max(0.01);
    let days_range = (min_days - days_pad)..(max_days + days_pad);
    let vol_range = (min_vol - vol_pad).max(0.0)..(max_vol + vol_pad);

    let root = BitMapBackend::new(output_path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} {}", skew.symbol, SKEW_TITLE),
            ("sans-serif", 30).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(days_range, vol_range)
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    chart
        .configure_mesh()
        .x_desc("Days to Expiration")
        .y_desc("Average Implied Volatility")
        .axis_desc_style(("sans-serif", 15))
        .draw()
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|&(d, v)| Circle::new((d, v), 3, BLUE.filled())),
        )
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    root.present()
        .map_err(|e| SkewError::Plot(e.to_string()))?;

    Ok(())
}

/// Files produced by [`write_charts`].
#[derive(Debug, Clone)]
pub struct ChartFiles {
    pub surface_html: PathBuf,
    pub skew_html: PathBuf,
    pub skew_png: Option<PathBuf>,
}

/// Write both charts as standalone HTML pages, plus the skew PNG when asked.
pub fn write_charts<P: AsRef<Path>>(analysis: &Analysis, output_dir: P, png: bool) -> Result<ChartFiles> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir)?;

    let surface_html = output_dir.join("volatility_surface.html");
    std::fs::write(&surface_html, surface_plot(&analysis.surface).to_html())?;
    info!("Volatility surface saved to {:?}", surface_html);

    let skew_html = output_dir.join("time_skew.html");
    std::fs::write(&skew_html, time_skew_plot(&analysis.skew).to_html())?;
    info!("Time skew saved to {:?}", skew_html);

    let skew_png = if !png {
        None
    } else if analysis.skew.is_empty() {
        warn!("No time skew points for {}, skipping PNG", analysis.symbol);
        None
    } else {
        let path = output_dir.join("time_skew.png");
        plot_time_skew_png(&analysis.skew, &path)?;
        info!("Time skew image saved to {:?}", path);
        Some(path)
    };

    Ok(ChartFiles {
        surface_html,
        skew_html,
        skew_png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregation, EnrichedRecord, EnrichedSet, OptionRecord, SkewPoint};
    use chrono::NaiveDate;

    fn enriched_set() -> EnrichedSet {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let record = |days: i64, moneyness: f64, iv: f64| EnrichedRecord {
            record: OptionRecord::new(100.0, 100.0 - 100.0 * moneyness, as_of + chrono::Duration::days(days), iv),
            moneyness,
            days_to_expiration: days,
        };
        EnrichedSet {
            symbol: "QQQ".to_string(),
            records: vec![record(5, -0.1, 0.3), record(5, 0.1, 0.2), record(20, 0.1, 0.25)],
            as_of,
        }
    }

    #[test]
    fn surface_plot_carries_titles_and_gaps() {
        let surface = VolatilitySurface::from_records(&enriched_set(), Aggregation::Mean);
        let json = surface_plot(&surface).to_json();

        assert!(json.contains(SURFACE_TITLE));
        assert!(json.contains("\"surface\""));
        assert!(json.contains("\"scene\""));
        assert!(json.contains("Moneyness"));
        assert!(json.contains("Days to Expiration"));
        assert!(json.contains("Implied Volatility"));
        // (20, -0.1) has no contract
        assert!(json.contains("null"));
    }

    #[test]
    fn skew_plot_uses_lines_and_markers() {
        let skew = TimeSkew {
            symbol: "QQQ".to_string(),
            points: vec![
                SkewPoint { days_to_expiration: 5, mean_implied_volatility: 0.25 },
                SkewPoint { days_to_expiration: 20, mean_implied_volatility: 0.2 },
            ],
        };
        let json = time_skew_plot(&skew).to_json();

        assert!(json.contains(SKEW_TITLE));
        assert!(json.contains("lines+markers"));
        assert!(json.contains("Average Implied Volatility"));
    }

    #[test]
    fn empty_skew_still_renders_a_chart() {
        let skew = TimeSkew { symbol: "QQQ".to_string(), points: vec![] };
        let json = time_skew_plot(&skew).to_json();
        assert!(json.contains(SKEW_TITLE));
    }

    #[test]
    fn png_refuses_an_empty_series() {
        let dir = tempfile::tempdir().unwrap();
        let skew = TimeSkew { symbol: "QQQ".to_string(), points: vec![] };
        let result = plot_time_skew_png(&skew, dir.path().join("skew.png"));
        assert!(matches!(result, Err(SkewError::Plot(_))));
    }

    #[test]
    fn html_files_are_written() {
        let set = enriched_set();
        let analysis = Analysis {
            symbol: set.symbol.clone(),
            record_count: set.len(),
            expired_count: 0,
            as_of: set.as_of,
            surface: VolatilitySurface::from_records(&set, Aggregation::Mean),
            skew: TimeSkew::from_records(&set),
        };
        let dir = tempfile::tempdir().unwrap();

        let files = write_charts(&analysis, dir.path().join("charts"), false).unwrap();

        let surface = std::fs::read_to_string(&files.surface_html).unwrap();
        let skew = std::fs::read_to_string(&files.skew_html).unwrap();
        assert!(surface.contains(SURFACE_TITLE));
        assert!(skew.contains(SKEW_TITLE));
        assert!(files.skew_png.is_none());
    }
}
