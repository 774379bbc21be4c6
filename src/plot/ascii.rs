//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - periodogram: `*` line, best peak `P`
//! - folded light curve: observed points `o`, box model `-` line

use crate::domain::LightCurve;
use crate::search::BlsPeriodogram;

/// Render power against trial period.
pub fn render_periodogram(periodogram: &BlsPeriodogram, width: usize, height: usize) -> String {
    let curve: Vec<(f64, f64)> = periodogram
        .period
        .iter()
        .zip(&periodogram.power)
        .filter(|(p, w)| p.is_finite() && w.is_finite())
        .map(|(&p, &w)| (p, w))
        .collect();
    let (x_min, x_max) = x_range(&curve).unwrap_or((0.0, 1.0));
    let peak = periodogram
        .peak_index()
        .map(|i| (periodogram.period[i], periodogram.power[i]));

    let plot = render_plot(
        &[],
        Some((&curve, '*')),
        peak.map(|p| (p, 'P')),
        x_min,
        x_max,
        width,
        height,
    );
    let mut out = format!(
        "Periodogram: P=[{x_min:.3}, {x_max:.3}] d | power=[{:.2}, {:.2}]\n",
        plot.y_min, plot.y_max
    );
    out.push_str(&plot.body);
    out
}

/// Render the light curve folded on `period`/`epoch` with a box model overlay.
///
/// The x axis is hours from mid-transit; only a window of a few durations
/// around the transit is shown.
pub fn render_folded(
    lc: &LightCurve,
    period: f64,
    epoch: f64,
    duration: f64,
    depth: f64,
    width: usize,
    height: usize,
) -> String {
    let half_window = (3.0 * duration).max(0.1).min(0.5 * period);
    let phase = lc.fold_phase(period, epoch);
    let points: Vec<(f64, f64)> = phase
        .iter()
        .zip(&lc.flux)
        .filter(|(p, f)| p.abs() <= half_window && f.is_finite())
        .map(|(&p, &f)| (p * 24.0, f))
        .collect();

    let w = half_window * 24.0;
    let d = 0.5 * duration * 24.0;
    let model = [
        (-w, 1.0),
        (-d, 1.0),
        (-d, 1.0 - depth),
        (d, 1.0 - depth),
        (d, 1.0),
        (w, 1.0),
    ];

    let plot = render_plot(&points, Some((&model, '-')), None, -w, w, width, height);
    let mut out = format!(
        "Folded: P={period:.6} d | phase=[{:.2}, {:.2}] h | flux=[{:.5}, {:.5}] | n={}\n",
        -w,
        w,
        plot.y_min,
        plot.y_max,
        points.len()
    );
    out.push_str(&plot.body);
    out
}

struct Plot {
    body: String,
    y_min: f64,
    y_max: f64,
}

fn render_plot(
    points: &[(f64, f64)],
    curve: Option<(&[(f64, f64)], char)>,
    marker: Option<((f64, f64), char)>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
) -> Plot {
    let width = width.max(10);
    let height = height.max(5);

    let curve_points = curve.map(|(c, _)| c);
    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some((c, ch)) = curve {
        draw_curve(&mut grid, c, x_min, x_max, y_min, y_max, ch);
    }

    for &(x, y) in points {
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        grid[gy][gx] = 'o';
    }

    if let Some(((x, y), ch)) = marker {
        grid[map_y(y, y_min, y_max, height)][map_x(x, x_min, x_max, width)] = ch;
    }

    let mut body = String::new();
    for row in grid {
        body.push_str(&row.into_iter().collect::<String>());
        body.push('\n');
    }

    Plot { body, y_min, y_max }
}

fn x_range(curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in curve {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve.unwrap_or(&[]).iter()) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    ch: char,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let gx = map_x(x, x_min, x_max, width);
        let gy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, gx, gy, ch);
        } else {
            grid[gy][gx] = ch;
        }
        prev = Some((gx, gy));
    }
}

/// Integer line drawing (Bresenham).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
