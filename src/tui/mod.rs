//! Ratatui-based terminal UI.
//!
//! Shows a finished BLS run in three views: the periodogram, the light curve
//! folded on a selected peak, and the flattened time series.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::RunOutput;
use crate::domain::{BestFit, LightCurve, SearchConfig};
use crate::error::AppError;
use crate::report::format_result_line;
use crate::search::BlsPeriodogram;

mod plotters_chart;

use plotters_chart::SeriesChart;

/// Number of periodogram peaks the folded view cycles through.
const MAX_PEAKS: usize = 10;

/// Upper bound on points drawn in the time-series view.
const MAX_RAW_POINTS: usize = 5000;

/// Start the TUI for a finished run.
pub fn run(run: RunOutput, config: SearchConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(run, config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Periodogram,
    Folded,
    Raw,
}

impl View {
    fn next(self) -> Self {
        match self {
            View::Periodogram => View::Folded,
            View::Folded => View::Raw,
            View::Raw => View::Periodogram,
        }
    }

    fn title(self) -> &'static str {
        match self {
            View::Periodogram => "Periodogram",
            View::Folded => "Folded light curve",
            View::Raw => "Flattened light curve",
        }
    }
}

struct App {
    run: RunOutput,
    config: SearchConfig,
    view: View,
    /// Periodogram indices of the strongest peaks, strongest first.
    peaks: Vec<usize>,
    selected_peak: usize,
    status: String,
}

impl App {
    fn new(run: RunOutput, config: SearchConfig) -> Self {
        let peaks = run.periodogram.top_peaks(MAX_PEAKS);
        let status = format_result_line(run.best.period_days, run.best.epoch_btjd);
        Self {
            run,
            config,
            view: View::Periodogram,
            peaks,
            selected_peak: 0,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.view = self.view.next();
                self.status = self.view.title().to_string();
            }
            KeyCode::Left if self.view == View::Folded => self.step_peak(-1),
            KeyCode::Right if self.view == View::Folded => self.step_peak(1),
            _ => {}
        }
        false
    }

    fn step_peak(&mut self, delta: isize) {
        if self.peaks.is_empty() {
            self.status = "No periodogram peaks to cycle.".to_string();
            return;
        }
        let n = self.peaks.len() as isize;
        self.selected_peak = (self.selected_peak as isize + delta).rem_euclid(n) as usize;
        let fit = self.selected_fit();
        self.status = format!(
            "peak {}/{}: {}",
            self.selected_peak + 1,
            self.peaks.len(),
            format_result_line(fit.period_days, fit.epoch_btjd)
        );
    }

    /// Fit shown in the folded view; peak 1 is the extracted best fit.
    fn selected_fit(&self) -> BestFit {
        if self.selected_peak == 0 {
            return self.run.best;
        }
        self.peaks
            .get(self.selected_peak)
            .and_then(|&i| self.run.periodogram.best_at(i))
            .unwrap_or(self.run.best)
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_chart(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let target = self.run.raw.meta.target.as_deref().unwrap_or("-");
        let sectors = if self.run.sectors.is_empty() {
            "-".to_string()
        } else {
            self.run
                .sectors
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let best = &self.run.best;
        let range = &self.config.range;

        let lines = vec![
            Line::from(vec![
                Span::styled("slc", Style::default().fg(Color::Cyan)),
                Span::raw(format!(" | {target} | sectors: {sectors} | n={}", self.run.flat.len())),
            ]),
            Line::from(Span::styled(
                format!(
                    "P={:.6} d | T0={:.6} BTJD | dur={:.2} h | depth={:.0} ppm | snr={:.1} | grid P=[{:.2}, {:.2}] x {}",
                    best.period_days,
                    best.epoch_btjd,
                    best.duration_days * 24.0,
                    best.depth * 1e6,
                    best.depth_snr,
                    range.period_min,
                    range.period_max,
                    range.grid_size,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title(self.view.title()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let series = match self.view {
            View::Periodogram => {
                let marker = self.peaks.get(self.selected_peak).copied();
                periodogram_series(&self.run.periodogram, marker)
            }
            View::Folded => folded_series(&self.run.flat, &self.selected_fit()),
            View::Raw => raw_series(&self.run.flat),
        };

        let Some(series) = series else {
            let msg = Paragraph::new("Nothing to plot.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let widget = SeriesChart {
            line: &series.line,
            points: &series.points,
            marker: series.marker,
            x_bounds: series.x_bounds,
            y_bounds: series.y_bounds,
            x_label: series.x_label,
            y_label: series.y_label,
            fmt_x: series.fmt_x,
            fmt_y: series.fmt_y,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab view  ←/→ peak (folded)  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Data for one chart, prepared outside the render call.
#[derive(Debug, Clone)]
struct ChartSeries {
    line: Vec<(f64, f64)>,
    points: Vec<(f64, f64)>,
    marker: Option<(f64, f64)>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
    x_label: &'static str,
    y_label: &'static str,
    fmt_x: fn(f64) -> String,
    fmt_y: fn(f64) -> String,
}

fn periodogram_series(periodogram: &BlsPeriodogram, marker: Option<usize>) -> Option<ChartSeries> {
    let line: Vec<(f64, f64)> = periodogram
        .period
        .iter()
        .zip(&periodogram.power)
        .filter(|(p, w)| p.is_finite() && w.is_finite())
        .map(|(&p, &w)| (p, w))
        .collect();
    let x_bounds = bounds(line.iter().map(|&(x, _)| x), 0.0)?;
    let y_bounds = bounds(line.iter().map(|&(_, y)| y), 0.05)?;
    let marker = marker
        .filter(|&i| i < periodogram.period.len() && periodogram.power[i].is_finite())
        .map(|i| (periodogram.period[i], periodogram.power[i]));

    Some(ChartSeries {
        line,
        points: Vec::new(),
        marker,
        x_bounds,
        y_bounds,
        x_label: "period (d)",
        y_label: "power",
        fmt_x: fmt_fixed2,
        fmt_y: fmt_fixed1,
    })
}

/// Folded light curve in hours from mid-transit, with the box model.
fn folded_series(lc: &LightCurve, fit: &BestFit) -> Option<ChartSeries> {
    if !(fit.period_days.is_finite() && fit.period_days > 0.0) {
        return None;
    }
    let half_window = (3.0 * fit.duration_days).max(0.1).min(0.5 * fit.period_days);
    let points: Vec<(f64, f64)> = lc
        .fold_phase(fit.period_days, fit.epoch_btjd)
        .iter()
        .zip(&lc.flux)
        .filter(|(p, f)| p.abs() <= half_window && f.is_finite())
        .map(|(&p, &f)| (p * 24.0, f))
        .collect();

    let w = half_window * 24.0;
    let d = 0.5 * fit.duration_days * 24.0;
    let floor = 1.0 - fit.depth;
    let line = vec![(-w, 1.0), (-d, 1.0), (-d, floor), (d, floor), (d, 1.0), (w, 1.0)];

    let y_bounds = bounds(points.iter().map(|&(_, y)| y).chain([1.0, floor]), 0.05)?;
    Some(ChartSeries {
        line,
        points,
        marker: None,
        x_bounds: [-w, w],
        y_bounds,
        x_label: "hours from mid-transit",
        y_label: "flux",
        fmt_x: fmt_fixed1,
        fmt_y: fmt_flux,
    })
}

fn raw_series(lc: &LightCurve) -> Option<ChartSeries> {
    let step = lc.len().div_ceil(MAX_RAW_POINTS).max(1);
    let points: Vec<(f64, f64)> = lc
        .time
        .iter()
        .zip(&lc.flux)
        .step_by(step)
        .filter(|(t, f)| t.is_finite() && f.is_finite())
        .map(|(&t, &f)| (t, f))
        .collect();
    let (t0, t1) = lc.time_span()?;
    let x_bounds = if t1 > t0 { [t0, t1] } else { [t0 - 0.5, t0 + 0.5] };
    let y_bounds = bounds(points.iter().map(|&(_, y)| y), 0.05)?;

    Some(ChartSeries {
        line: Vec::new(),
        points,
        marker: None,
        x_bounds,
        y_bounds,
        x_label: "time (BTJD)",
        y_label: "flux",
        fmt_x: fmt_fixed1,
        fmt_y: fmt_flux,
    })
}

/// Min/max of the finite values, widened by `pad` of the span.
fn bounds(values: impl Iterator<Item = f64>, pad: f64) -> Option<[f64; 2]> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return None;
    }
    if hi <= lo {
        let half = (lo.abs() * 1e-3).max(1e-6);
        return Some([lo - half, hi + half]);
    }
    let margin = (hi - lo) * pad;
    Some([lo - margin, hi + margin])
}

fn fmt_fixed1(v: f64) -> String {
    format!("{v:.1}")
}

fn fmt_fixed2(v: f64) -> String {
    format!("{v:.2}")
}

fn fmt_flux(v: f64) -> String {
    format!("{v:.4}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Objective;

    fn run_output() -> RunOutput {
        let time: Vec<f64> = (0..200).map(|i| 1000.0 + i as f64 * 0.05).collect();
        let flux: Vec<f64> = time
            .iter()
            .map(|&t| {
                let phase = (t - 1000.5 + 1.0).rem_euclid(2.0) - 1.0;
                if phase.abs() < 0.05 { 0.99 } else { 1.0 }
            })
            .collect();
        let lc = LightCurve::new(time, flux, None).unwrap();
        let n = 5;
        let periodogram = BlsPeriodogram {
            objective: Objective::Snr,
            period: vec![1.0, 1.5, 2.0, 2.5, 3.0],
            power: vec![3.0, 1.0, 9.0, 2.0, 4.0],
            duration: vec![0.1; n],
            transit_time: vec![1000.5; n],
            depth: vec![0.01; n],
            depth_err: vec![0.001; n],
            depth_snr: vec![10.0; n],
            log_likelihood: vec![1.0; n],
            durations: vec![0.1],
        };
        let best = periodogram.best_at(2).unwrap();
        RunOutput {
            source: "test".to_string(),
            sectors: vec![1],
            raw: lc.clone(),
            flat: lc,
            periodogram,
            best,
        }
    }

    #[test]
    fn tab_cycles_views_and_q_quits() {
        let mut app = App::new(run_output(), SearchConfig::default());
        assert_eq!(app.view, View::Periodogram);
        assert!(!app.handle_key(KeyCode::Tab));
        assert_eq!(app.view, View::Folded);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Raw);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.view, View::Periodogram);
        assert!(app.handle_key(KeyCode::Char('q')));
    }

    #[test]
    fn arrows_cycle_peaks_only_in_folded_view() {
        let mut app = App::new(run_output(), SearchConfig::default());
        assert_eq!(app.peaks, vec![2, 4, 0]);

        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected_peak, 0);

        app.handle_key(KeyCode::Tab);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.selected_peak, 1);
        assert_eq!(app.selected_fit().period_days, 3.0);
        app.handle_key(KeyCode::Left);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.selected_peak, 2);
        assert_eq!(app.selected_fit().period_days, 1.0);
        assert!(app.status.starts_with("peak 3/3"));
    }

    #[test]
    fn periodogram_series_marks_selected_peak() {
        let run = run_output();
        let series = periodogram_series(&run.periodogram, Some(2)).unwrap();
        assert_eq!(series.line.len(), 5);
        assert_eq!(series.marker, Some((2.0, 9.0)));
        assert_eq!(series.x_bounds, [1.0, 3.0]);
        assert!(series.y_bounds[0] < 1.0 && series.y_bounds[1] > 9.0);
    }

    #[test]
    fn folded_series_centres_transit() {
        let run = run_output();
        let series = folded_series(&run.flat, &run.best).unwrap();
        assert!(!series.points.is_empty());
        assert!(series.points.iter().all(|&(x, _)| x.abs() <= series.x_bounds[1] + 1e-9));
        // In-transit samples sit near zero phase.
        assert!(
            series
                .points
                .iter()
                .filter(|&&(_, y)| y < 0.995)
                .all(|&(x, _)| x.abs() < 1.3)
        );
        let (x, y) = series.line[2];
        assert!((x + 1.2).abs() < 1e-9 && (y - 0.99).abs() < 1e-12);
    }

    #[test]
    fn raw_series_is_decimated() {
        let time: Vec<f64> = (0..12_000).map(|i| i as f64 * 0.001).collect();
        let lc = LightCurve::new(time, vec![1.0; 12_000], None).unwrap();
        let series = raw_series(&lc).unwrap();
        assert!(series.points.len() <= MAX_RAW_POINTS);
        assert!(series.y_bounds[0] < 1.0 && series.y_bounds[1] > 1.0);
    }

    #[test]
    fn bounds_ignore_non_finite() {
        assert_eq!(bounds([f64::NAN, 1.0, 3.0].into_iter(), 0.0), Some([1.0, 3.0]));
        assert_eq!(bounds([f64::NAN].into_iter(), 0.1), None);
    }
}
