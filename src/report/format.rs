//! Formatted terminal output for BLS runs.
//!
//! We keep formatting code in one place so:
//! - the search code stays clean and testable
//! - output changes are localized (golden tests below)

use chrono::{DateTime, Utc};

use crate::domain::{BTJD_OFFSET, BestFit, Objective, SearchRange};
use crate::search::BlsPeriodogram;

/// Julian Date of the Unix epoch.
const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// What the summary needs to know about a run beyond the best fit.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub source: String,
    pub target: Option<String>,
    pub sectors: Vec<u32>,
    pub n_raw: usize,
    pub n_clean: usize,
    pub range: SearchRange,
    /// Durations actually searched, after clamping to the period floor.
    pub durations: Vec<f64>,
    pub objective: Objective,
}

/// The one-line result printed by `slc bls`.
pub fn format_result_line(period_days: f64, epoch_btjd: f64) -> String {
    format!("P={period_days:.6} d, T0={epoch_btjd:.6} (BTJD)")
}

/// Approximate UTC calendar time for a BTJD.
///
/// Ignores the TDB-UTC offset (about a minute), which is below the precision
/// of a BLS epoch anyway.
pub fn btjd_to_utc(btjd: f64) -> Option<DateTime<Utc>> {
    if !btjd.is_finite() {
        return None;
    }
    let unix_seconds = (btjd + BTJD_OFFSET - UNIX_EPOCH_JD) * 86_400.0;
    let secs = unix_seconds.floor();
    let nanos = ((unix_seconds - secs) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::from_timestamp(secs as i64, nanos)
}

/// Format the full run summary (data provenance + grid + best peak).
pub fn format_run_summary(ctx: &RunContext, best: &BestFit) -> String {
    let mut out = String::new();

    out.push_str("=== slc - TESS transit search (BLS) ===\n");
    out.push_str(&format!("Source: {}\n", ctx.source));
    if let Some(target) = &ctx.target {
        out.push_str(&format!("Target: {target}\n"));
    }
    if !ctx.sectors.is_empty() {
        let sectors: Vec<String> = ctx.sectors.iter().map(u32::to_string).collect();
        out.push_str(&format!("Sectors: {}\n", sectors.join(", ")));
    }
    out.push_str(&format!(
        "Points: raw={} | after cleaning={}\n",
        ctx.n_raw, ctx.n_clean
    ));
    let d_min = ctx.durations.iter().copied().fold(f64::INFINITY, f64::min);
    let d_max = ctx.durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    out.push_str(&format!(
        "Grid: P=[{:.3}, {:.3}] d x {} | duration=[{:.3}, {:.3}] d x {} | objective={}\n",
        ctx.range.period_min,
        ctx.range.period_max,
        ctx.range.grid_size,
        d_min,
        d_max,
        ctx.durations.len(),
        objective_name(ctx.objective),
    ));

    out.push_str("\nBest peak:\n");
    out.push_str(&format!("- period   : {:.6} d\n", best.period_days));
    out.push_str(&format!("- epoch    : {:.6} BTJD", best.epoch_btjd));
    if let Some(utc) = btjd_to_utc(best.epoch_btjd) {
        out.push_str(&format!(" (~{} UTC)", utc.format("%Y-%m-%d %H:%M")));
    }
    out.push('\n');
    out.push_str(&format!(
        "- duration : {:.4} d ({:.2} h)\n",
        best.duration_days,
        best.duration_days * 24.0
    ));
    out.push_str(&format!("- depth    : {:.1} ppm\n", best.depth * 1e6));
    out.push_str(&format!("- depth SNR: {:.2}\n", best.depth_snr));
    out.push_str(&format!("- power    : {:.4}\n", best.power));
    out.push('\n');

    out
}

/// Table of the strongest periodogram peaks.
pub fn format_top_peaks(periodogram: &BlsPeriodogram, top_n: usize) -> String {
    let mut out = String::new();
    let peaks = periodogram.top_peaks(top_n);

    out.push_str(&format!("Top {} peaks:\n", peaks.len()));
    out.push_str(
        format!(
            "{:>4} {:>12} {:>10} {:>9} {:>10} {:>8} {:>14}\n",
            "rank", "period_d", "power", "dur_h", "depth_ppm", "snr", "t0_btjd"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<4} {:-<12} {:-<10} {:-<9} {:-<10} {:-<8} {:-<14}\n",
            "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for (rank, &i) in peaks.iter().enumerate() {
        out.push_str(
            format!(
                "{:>4} {:>12.6} {:>10.4} {:>9.2} {:>10.1} {:>8.2} {:>14.6}\n",
                rank + 1,
                periodogram.period[i],
                periodogram.power[i],
                periodogram.duration[i] * 24.0,
                periodogram.depth[i] * 1e6,
                periodogram.depth_snr[i],
                periodogram.transit_time[i],
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn objective_name(objective: Objective) -> &'static str {
    match objective {
        Objective::Snr => "snr",
        Objective::LogLikelihood => "likelihood",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn periodogram() -> BlsPeriodogram {
        let n = 5;
        BlsPeriodogram {
            objective: Objective::Snr,
            period: vec![1.0, 1.5, 2.0, 2.5, 3.0],
            power: vec![1.0, 9.0, 2.0, 5.0, f64::NAN],
            duration: vec![0.1; n],
            transit_time: vec![1000.5; n],
            depth: vec![0.001; n],
            depth_err: vec![0.0001; n],
            depth_snr: vec![10.0; n],
            log_likelihood: vec![50.0; n],
            durations: vec![0.1],
        }
    }

    #[test]
    fn result_line_matches_cli_contract() {
        assert_eq!(
            format_result_line(1.7497798, 1355.1234567),
            "P=1.749780 d, T0=1355.123457 (BTJD)"
        );
    }

    #[test]
    fn btjd_zero_is_december_2014() {
        let utc = btjd_to_utc(0.0).unwrap();
        assert_eq!(utc.format("%Y-%m-%d %H:%M").to_string(), "2014-12-08 12:00");
        assert!(btjd_to_utc(f64::NAN).is_none());
    }

    #[test]
    fn top_peaks_table_lists_local_maxima() {
        let txt = format_top_peaks(&periodogram(), 3);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines[0], "Top 2 peaks:");
        assert!(lines[3].contains("1.500000"));
        assert!(lines[4].contains("2.500000"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn summary_mentions_sectors_and_best_period() {
        let ctx = RunContext {
            source: "CSV lc.csv".to_string(),
            target: Some("WASP-52".to_string()),
            sectors: vec![42, 70],
            n_raw: 1000,
            n_clean: 990,
            range: SearchRange::default(),
            durations: vec![0.01, 0.1, 0.2],
            objective: Objective::Snr,
        };
        let best = BestFit {
            period_days: 1.7498,
            epoch_btjd: 1355.9,
            duration_days: 0.075,
            depth: 0.027,
            depth_snr: 80.0,
            power: 80.0,
        };
        let txt = format_run_summary(&ctx, &best);
        assert!(txt.contains("Sectors: 42, 70"));
        assert!(txt.contains("- period   : 1.749800 d"));
        assert!(txt.contains("27000.0 ppm"));
        assert!(txt.contains("objective=snr"));
    }

    #[test]
    fn summary_grid_shows_clamped_duration_ceiling() {
        let ctx = RunContext {
            source: "simulated".to_string(),
            target: None,
            sectors: Vec::new(),
            n_raw: 10,
            n_clean: 10,
            range: SearchRange {
                period_min: 0.3,
                duration_max: 0.5,
                ..SearchRange::default()
            },
            durations: vec![0.01, 0.14, 0.27],
            objective: Objective::Snr,
        };
        let best = BestFit {
            period_days: 1.0,
            epoch_btjd: 1000.0,
            duration_days: 0.1,
            depth: 0.001,
            depth_snr: 10.0,
            power: 10.0,
        };
        let txt = format_run_summary(&ctx, &best);
        assert!(txt.contains("duration=[0.010, 0.270] d x 3"));
        assert!(!txt.contains("0.500"));
    }
}
