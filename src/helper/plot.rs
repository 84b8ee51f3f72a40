use std::error::Error;
use std::path::Path;

use once_cell::sync::Lazy;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use statrs::statistics::{Data, OrderStatistics};

use crate::helper::annotation::BracketPlacement;
use crate::helper::config::{Configuration, ErrorBars};
use crate::helper::metric::Metric;
use crate::helper::stats::GroupSummary;

/// Adaptive group palette, indexed by the configured one-based palette lists.
static ADAPTIVE_HEX: [&str; 34] = [
    "#f27a63", "#9693db", "#a0c55b", "#59b8d0", "#f29d57", "#c281d1", "#60c57d",
    "#5e889e", "#82bfec", "#f594bf", "#cdc35f", "#a4bfb8", "#ff8b8c", "#7aa6ff",
    "#64cfbc", "#ffca60", "#cf9b60", "#c96552", "#7d7ab6", "#85a44c", "#4a99ad",
    "#c98248", "#a16bae", "#50a468", "#94908d", "#6c9fc4", "#cc7b9f", "#aaa24f",
    "#889f99", "#d47474", "#658ad4", "#53ac9c", "#d4a850", "#ac8150",
];

/// The same palette ten percent darker, used for the strip dots.
static ADAPTIVE_DARK_HEX: [&str; 34] = [
    "#D9614A", "#7D7AC2", "#87AC42", "#409FB7", "#D9843E", "#A968B8", "#47AC64",
    "#456F85", "#69A6D3", "#DC7BA6", "#B4AA46", "#8BA69F", "#E67273", "#7AA6FF",
    "#4BB6A3", "#E6B147", "#E6B147", "#B04C39", "#64619D", "#6C8B33", "#318094",
    "#B0692F", "#885295", "#378B4F", "#7B7774", "#5386AB", "#B36286", "#918936",
    "#6F8680", "#BB5B5B", "#4C71BB", "#3A9383", "#BB8F37", "#AC8150",
];

pub static ADAPTIVE_COLORS: Lazy<Vec<RGBColor>> =
    Lazy::new(|| ADAPTIVE_HEX.iter().map(|hex| parse_hex(hex)).collect());

pub static ADAPTIVE_COLORS_DARK: Lazy<Vec<RGBColor>> =
    Lazy::new(|| ADAPTIVE_DARK_HEX.iter().map(|hex| parse_hex(hex)).collect());

fn parse_hex(hex: &str) -> RGBColor {
    let value = u32::from_str_radix(hex.trim_start_matches('#'), 16).unwrap_or(0);
    RGBColor((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

fn palette_color(palette: &Option<Vec<usize>>, table: &[RGBColor], slot: usize) -> RGBColor {
    match palette {
        Some(indices) if !indices.is_empty() => {
            table[indices[slot % indices.len()] % table.len()]
        }
        _ => table[slot % table.len()],
    }
}

struct Frame<'a> {
    series: &'a [(String, Vec<f64>)],
    placements: &'a [BracketPlacement],
    summary: Option<&'a GroupSummary>,
    config: &'a Configuration,
    metric: &'a Metric,
    range: f64,
    font_px: u32,
}

/// Render one metric's comparison plot. Layer order, back to front: boxes,
/// strip dots, significance brackets, mean bars, error bars. Failures are
/// returned to the caller, which reports them and moves on to the next
/// metric.
pub fn render(
    series: &[(String, Vec<f64>)],
    placements: &[BracketPlacement],
    summary: Option<&GroupSummary>,
    metric: &Metric,
    config: &Configuration,
    output: &Path,
) -> Result<(), Box<dyn Error>> {
    if series.is_empty() {
        return Err("no groups with plottable values".into());
    }
    let group_count = series.len();
    let width_px = (config.width * config.dpi as f64).round() as u32;
    let height_px = (config.height * config.dpi as f64).round() as u32;

    let values: Vec<f64> = series
        .iter()
        .flat_map(|(_, values)| values.iter().copied())
        .collect();
    let data_min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let data_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = data_max - data_min;
    let pad = if span > 0.0 { span * 0.05 } else { 0.5 };

    // built-in [0,1] metrics snap to a bound when data come within 0.1 of it
    let (mut y_min, mut y_max) = if metric.unit_bounded() {
        let lo = if data_min <= 0.1 { 0.0 } else { data_min - pad };
        let hi = if data_max >= 0.9 { 1.0 } else { data_max + pad };
        (lo, hi)
    } else {
        (data_min - pad, data_max + pad)
    };

    // headroom so stacked brackets stay inside the drawing area
    if let Some(top) = placements
        .iter()
        .map(|p| p.y2)
        .fold(None, |acc: Option<f64>, y| Some(acc.map_or(y, |a| a.max(y))))
    {
        y_max = y_max.max(top + 0.03 * span.max(pad));
    }

    let use_log = config.log_scale && !metric.unit_bounded() && data_min > 0.0;
    if use_log {
        y_min = data_min * 0.8;
        y_max = y_max.max(data_max * 1.25);
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }

    let frame = Frame {
        series,
        placements,
        summary,
        config,
        metric,
        range: span.max(pad),
        font_px: (config.dpi / 15).max(12),
    };

    let root = BitMapBackend::new(output, (width_px, height_px)).into_drawing_area();
    root.fill(&WHITE)?;

    let title_font = ("sans-serif", (config.dpi / 12).max(16)).into_font();
    let x_range = -0.5f64..(group_count as f64 - 0.5);
    let label_area = (config.dpi / 5).max(40);

    if use_log {
        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, title_font)
            .margin(config.dpi / 20)
            .x_label_area_size(label_area)
            .y_label_area_size(label_area)
            .build_cartesian_2d(x_range, (y_min..y_max).log_scale())?;
        draw_layers(&mut chart, &frame)?;
    } else {
        let mut chart = ChartBuilder::on(&root)
            .caption(&config.title, title_font)
            .margin(config.dpi / 20)
            .x_label_area_size(label_area)
            .y_label_area_size(label_area)
            .build_cartesian_2d(x_range, y_min..y_max)?;
        draw_layers(&mut chart, &frame)?;
    }

    root.present()?;
    Ok(())
}

fn draw_layers<DB, Y>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf64, Y>>,
    frame: &Frame<'_>,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let config = frame.config;
    let labels: Vec<String> = frame.series.iter().map(|(label, _)| label.clone()).collect();
    let label_font = ("sans-serif", frame.font_px).into_font();
    let x_label_style = match config.x_rotation {
        r if r >= 45 => label_font.clone().transform(FontTransform::Rotate90),
        r if r <= -45 => label_font.clone().transform(FontTransform::Rotate270),
        _ => label_font.clone(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("SAMPLE GROUP")
        .y_desc(frame.metric.axis_label())
        .axis_desc_style(("sans-serif", frame.font_px + 4))
        .x_labels(labels.len() * 4 + 1)
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            if (x - idx).abs() < 0.01 && idx >= 0.0 && (idx as usize) < labels.len() {
                labels[idx as usize].clone()
            } else {
                String::new()
            }
        })
        .x_label_style(x_label_style)
        .y_label_style(label_font.clone())
        .draw()?;

    let two_group = frame.series.len() <= 2;
    let box_half = if two_group { 0.075 } else { 0.15 };

    if config.boxplots {
        for (slot, (_, values)) in frame.series.iter().enumerate() {
            let x = slot as f64;
            let mut data = Data::new(values.clone());
            let q1 = data.quantile(0.25);
            let median = data.median();
            let q3 = data.quantile(0.75);
            let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            if config.box_colors {
                let color = palette_color(&config.box_palette, &ADAPTIVE_COLORS, slot);
                chart.draw_series(std::iter::once(Rectangle::new(
                    [(x - box_half, q1), (x + box_half, q3)],
                    color.mix(0.85).filled(),
                )))?;
            }
            chart.draw_series(std::iter::once(Rectangle::new(
                [(x - box_half, q1), (x + box_half, q3)],
                BLACK.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x - box_half, median), (x + box_half, median)],
                BLACK.stroke_width(2),
            )))?;
            // whiskers span the full value range
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, q3), (x, hi)],
                BLACK.stroke_width(1),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, q1), (x, lo)],
                BLACK.stroke_width(1),
            )))?;
            for cap in [lo, hi] {
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(x - box_half / 2.0, cap), (x + box_half / 2.0, cap)],
                    BLACK.stroke_width(1),
                )))?;
            }
        }
    }

    if config.strip_plots {
        // fixed seed: repeated runs on identical input render identically
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dot_px = (config.dpi / 75).max(3) as i32;
        for (slot, (_, values)) in frame.series.iter().enumerate() {
            for &value in values {
                let dx = if config.jitter {
                    rng.random_range(-0.08..0.08)
                } else {
                    0.0
                };
                let at = (slot as f64 + dx, value);
                if config.dot_colors {
                    let color = palette_color(&config.dot_palette, &ADAPTIVE_COLORS_DARK, slot);
                    chart.draw_series(std::iter::once(Circle::new(at, dot_px, color.filled())))?;
                    chart.draw_series(std::iter::once(Circle::new(
                        at,
                        dot_px,
                        RGBColor(128, 128, 128).stroke_width(1),
                    )))?;
                } else {
                    chart.draw_series(std::iter::once(Circle::new(
                        at,
                        dot_px - 1,
                        BLACK.filled(),
                    )))?;
                }
            }
        }
    }

    if config.annotation {
        let marker_style = ("sans-serif", frame.font_px + 6)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        for placement in frame.placements {
            chart.draw_series(std::iter::once(PathElement::new(
                vec![
                    (placement.x1, placement.y1),
                    (placement.x1, placement.y2),
                    (placement.x2, placement.y2),
                    (placement.x2, placement.y1),
                ],
                BLACK.stroke_width(2),
            )))?;
            if let Some(marker) = placement.marker {
                let marker_y = placement.y1 + 0.005 * frame.range;
                chart.draw_series(std::iter::once(Text::new(
                    marker.symbol().to_string(),
                    (placement.center_x, marker_y),
                    marker_style.clone(),
                )))?;
            }
        }
    }

    if config.mean_bars {
        if let Some(summary) = frame.summary {
            let half = if two_group { 0.15 } else { 0.25 };
            for slot in 0..frame.series.len() {
                let Some(mean) = summary.means.get(slot).copied().flatten() else {
                    continue;
                };
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(slot as f64 - half, mean), (slot as f64 + half, mean)],
                    BLACK.stroke_width(4),
                )))?;
            }
        }
    }

    if config.error_bars != ErrorBars::None {
        if let Some(summary) = frame.summary {
            let errors = match config.error_bars {
                ErrorBars::Sd => &summary.sd,
                ErrorBars::Sem => &summary.sem,
                ErrorBars::None => unreachable!(),
            };
            let cap_half = if two_group { 0.12 } else { 0.06 };
            for slot in 0..frame.series.len() {
                let (Some(mean), Some(error)) = (
                    summary.means.get(slot).copied().flatten(),
                    errors.get(slot).copied().flatten(),
                ) else {
                    continue;
                };
                let x = slot as f64;
                chart.draw_series(std::iter::once(PathElement::new(
                    vec![(x, mean - error), (x, mean + error)],
                    BLACK.stroke_width(2),
                )))?;
                for cap in [mean - error, mean + error] {
                    chart.draw_series(std::iter::once(PathElement::new(
                        vec![(x - cap_half, cap), (x + cap_half, cap)],
                        BLACK.stroke_width(2),
                    )))?;
                }
            }
        }
    }

    Ok(())
}
