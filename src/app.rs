//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads light curves (MAST archive or CSV)
//! - runs the BLS search pipeline
//! - prints reports/plots and writes optional exports

use clap::Parser;
use tracing::{Level, info};

use crate::cli::{BlsArgs, Command, DownloadArgs, FetchArgs, ModelArgs, SimulateArgs, TransitArgs};
use crate::data::mast::{MastClient, search_and_stitch};
use crate::data::sample::{SimulationConfig, simulate};
use crate::data::{CsvSource, LightCurveSource, MastSource};
use crate::domain::{FetchConfig, SearchConfig, SearchRange, TransitParams};
use crate::error::AppError;

pub mod pipeline;

/// Target searched when `slc bls` gets neither `--target` nor `--input`.
pub const DEFAULT_TARGET: &str = "WASP-52";

/// Entry point for the `slc` binary.
pub fn run() -> Result<(), AppError> {
    // `slc WASP-52` and `slc --pmin 1` should behave like `slc bls ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);
    init_logging(cli.verbose);

    match cli.command {
        Command::Download(args) => handle_download(args),
        Command::Bls(args) => handle_bls(args),
        Command::Model(args) => handle_model(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_download(args: DownloadArgs) -> Result<(), AppError> {
    let fetch = fetch_config(args.target, &args.fetch);
    let client = MastClient::from_env()?;
    let (lc, sectors) = search_and_stitch(&client, &fetch)?;
    info!(object = %fetch.target, ?sectors, n_points = lc.len(), "stitched light curve");

    let out = crate::io::lc_to_csv(&lc, &args.out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn handle_bls(args: BlsArgs) -> Result<(), AppError> {
    let config = search_config_from_args(&args);
    let source = source_from_args(&args)?;
    let run = pipeline::run_search(source.as_ref(), &config)?;

    println!("{}", crate::report::format_run_summary(&run.context(&config), &run.best));
    if config.top_n > 0 {
        println!("{}", crate::report::format_top_peaks(&run.periodogram, config.top_n));
    }

    if config.plot {
        println!(
            "{}",
            crate::plot::render_periodogram(&run.periodogram, config.plot_width, config.plot_height)
        );
        println!(
            "{}",
            crate::plot::render_folded(
                &run.flat,
                run.best.period_days,
                run.best.epoch_btjd,
                run.best.duration_days,
                run.best.depth,
                config.plot_width,
                config.plot_height,
            )
        );
    }

    // Optional exports.
    if let Some(path) = &config.export {
        crate::io::write_periodogram_csv(path, &run.periodogram)?;
        info!(path = %path.display(), "wrote periodogram");
    }
    if let Some(path) = &config.export_summary {
        let summary = crate::io::build_summary(
            &run.raw,
            &run.sectors,
            config.objective,
            &config.range,
            &run.periodogram.durations,
            run.best,
        );
        crate::io::write_summary_json(path, &summary)?;
        info!(path = %path.display(), "wrote summary");
    }

    println!(
        "{}",
        crate::report::format_result_line(run.best.period_days, run.best.epoch_btjd)
    );
    Ok(())
}

fn handle_model(args: ModelArgs) -> Result<(), AppError> {
    let time = match &args.input {
        Some(path) => crate::io::csv_to_lightcurve(path)?.lc.time,
        None => time_grid(args.start, args.span, args.cadence_min)?,
    };
    let first = time.iter().copied().fold(f64::INFINITY, f64::min);
    let params = transit_params_from_args(&args.transit, first);
    let model = crate::models::transit_model(&time, &params, args.transit.shape)?;

    crate::io::write_model_csv(&args.out, &time, &model)?;
    println!("Wrote {}", args.out.display());
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let gap_days = match args.gap.as_deref() {
        None => None,
        Some(&[lo, hi]) if lo < hi => Some((lo, hi)),
        Some(_) => return Err(AppError::usage("--gap expects START,END with START < END.")),
    };
    let config = SimulationConfig {
        start_btjd: args.start,
        span_days: args.span,
        cadence_days: args.cadence_min / (60.0 * 24.0),
        noise_ppm: args.noise_ppm,
        seed: args.seed,
        gap_days,
        shape: args.transit.shape,
        params: transit_params_from_args(&args.transit, args.start),
    };
    let lc = simulate(&config)?;

    let out = crate::io::lc_to_csv(&lc, &args.out)?;
    println!("Wrote {}", out.display());
    Ok(())
}

fn handle_tui(args: BlsArgs) -> Result<(), AppError> {
    let config = search_config_from_args(&args);
    let source = source_from_args(&args)?;
    let run = pipeline::run_search(source.as_ref(), &config)?;
    crate::tui::run(run, config)
}

pub fn search_config_from_args(args: &BlsArgs) -> SearchConfig {
    SearchConfig {
        range: SearchRange {
            period_min: args.pmin,
            period_max: args.pmax,
            duration_min: args.dmin,
            duration_max: args.dmax,
            grid_size: args.nper,
        },
        objective: args.objective,
        sigma: args.sigma,
        window_length: args.window,
        top_n: args.top,
        plot: args.plot,
        plot_width: args.width,
        plot_height: args.height,
        export: args.export.clone(),
        export_summary: args.export_summary.clone(),
    }
}

fn source_from_args(args: &BlsArgs) -> Result<Box<dyn LightCurveSource>, AppError> {
    if let Some(path) = &args.input {
        return Ok(Box::new(CsvSource::new(path)));
    }
    let target = args.target.clone().unwrap_or_else(|| DEFAULT_TARGET.to_string());
    let fetch = fetch_config(target, &args.fetch);
    Ok(Box::new(MastSource::new(MastClient::from_env()?, fetch)))
}

fn fetch_config(target: String, args: &FetchArgs) -> FetchConfig {
    FetchConfig {
        target,
        author: args.author.clone(),
        cadence: args.cadence,
        quality_bitmask: args.quality_bitmask,
    }
}

/// Transit parameters from CLI flags. Without `--t0` the first transit falls
/// half a period after `first_time`.
pub fn transit_params_from_args(args: &TransitArgs, first_time: f64) -> TransitParams {
    let t0_days = args.t0.unwrap_or_else(|| {
        let start = if first_time.is_finite() { first_time } else { 0.0 };
        start + 0.5 * args.period
    });
    TransitParams {
        rp_rs: args.rp_rs,
        a_rs: args.a_rs,
        inc_deg: args.inc,
        period_days: args.period,
        t0_days,
        ecc: args.ecc,
        omega_deg: args.omega,
        limb_darkening: args.law.with_coefficients(args.u1, args.u2),
        exp_time_days: args.exp_time,
        supersample_factor: args.supersample,
    }
}

fn time_grid(start: f64, span_days: f64, cadence_min: f64) -> Result<Vec<f64>, AppError> {
    if !(start.is_finite() && span_days.is_finite() && span_days > 0.0) {
        return Err(AppError::usage("Model grid needs a finite start and a span > 0 days."));
    }
    if !(cadence_min.is_finite() && cadence_min > 0.0) {
        return Err(AppError::usage("Model grid cadence must be > 0 minutes."));
    }
    let step = cadence_min / (60.0 * 24.0);
    let n = crate::data::sample::sample_count(span_days, step)?;
    Ok((0..n).map(|i| start + i as f64 * step).collect())
}

/// Rewrite argv so bare targets and flags default to `slc bls`.
///
/// Rules:
/// - `slc WASP-52 ...`          -> `slc bls --target WASP-52 ...`
/// - `slc --pmin 1 ...`         -> `slc bls --pmin 1 ...`
/// - `slc --help/--version/-h`  -> unchanged (show top-level help/version)
/// - leading `-v` flags are skipped when looking for the first token
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(idx) = (1..argv.len()).find(|&i| !is_verbose_flag(&argv[i])) else {
        return argv;
    };
    let arg = argv[idx].as_str();

    let is_top_level_help_or_version = matches!(arg, "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg, "download" | "bls" | "model" | "simulate" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "bls flags".
    if arg.starts_with('-') {
        argv.insert(idx, "bls".to_string());
        return argv;
    }

    // Otherwise it is a target name.
    argv.insert(idx, "--target".to_string());
    argv.insert(idx, "bls".to_string());
    argv
}

fn is_verbose_flag(arg: &str) -> bool {
    arg == "--verbose" || (arg.len() > 1 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v'))
}
