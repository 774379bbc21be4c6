//! Command-line parsing for the TESS transit search tool.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! search and modelling code. `app` maps these structs into typed configs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{
    Cadence, DEFAULT_GRID_SIZE, DEFAULT_QUALITY_BITMASK, LdLaw, ModelShape, Objective,
};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "slc", version, about = "TESS light curve download and BLS transit search")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download and stitch a target's light curves into a CSV.
    ///
    /// Archive products are FITS tables, so this needs a build with the `fits`
    /// feature (`cargo install --features fits`, requires cfitsio).
    Download(DownloadArgs),
    /// Run a BLS transit search and print the best period and epoch.
    ///
    /// Fetching `--target` from MAST reads FITS products and needs a build with
    /// the `fits` feature (`cargo install --features fits`, requires cfitsio).
    /// `--input` CSV light curves work in every build.
    Bls(BlsArgs),
    /// Synthesize a transit model and write it to CSV.
    Model(ModelArgs),
    /// Write a synthetic noisy light curve with an injected transit.
    Simulate(SimulateArgs),
    /// Launch the interactive viewer for a BLS run.
    ///
    /// Runs the same pipeline as `slc bls`, then shows the periodogram, the
    /// folded curve and the flattened series in a terminal UI. Archive targets
    /// need the `fits` feature (`cargo install --features fits`, requires cfitsio).
    Tui(BlsArgs),
}

/// Archive query options shared by `download` and `bls`.
#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Product author (SPOC, QLP, ...); `any` disables the filter.
    #[arg(long, default_value = "SPOC")]
    pub author: String,

    /// Exposure-time filter for archive products.
    #[arg(long, value_enum, default_value_t = Cadence::Short)]
    pub cadence: Cadence,

    /// TESS QUALITY bits to drop when reading products.
    #[arg(long, default_value_t = DEFAULT_QUALITY_BITMASK)]
    pub quality_bitmask: u32,
}

#[derive(Debug, Args, Clone)]
pub struct DownloadArgs {
    /// Target name resolvable by MAST (e.g. "WASP-52", "TIC 123456").
    #[arg(long, default_value = "WASP-52")]
    pub target: String,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Output CSV path.
    #[arg(long, default_value = "lightcurve.csv")]
    pub out: PathBuf,
}

/// Options for a BLS search (also used by the TUI).
#[derive(Debug, Args, Clone)]
pub struct BlsArgs {
    /// Target name to fetch from MAST.
    #[arg(long, conflicts_with = "input")]
    pub target: Option<String>,

    /// Light curve CSV (`time,flux[,flux_err]`) instead of an archive query.
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Minimum trial period (days).
    #[arg(long, default_value_t = 0.3)]
    pub pmin: f64,

    /// Maximum trial period (days).
    #[arg(long, default_value_t = 20.0)]
    pub pmax: f64,

    /// Minimum trial duration (days).
    #[arg(long, default_value_t = 0.01)]
    pub dmin: f64,

    /// Maximum trial duration (days).
    #[arg(long, default_value_t = 0.20)]
    pub dmax: f64,

    /// Number of trial periods.
    #[arg(long, default_value_t = DEFAULT_GRID_SIZE)]
    pub nper: usize,

    /// Savitzky-Golay flatten window (samples, odd).
    #[arg(long, default_value_t = 401)]
    pub window: usize,

    /// Outlier clip threshold (sigma).
    #[arg(long, default_value_t = 5.0)]
    pub sigma: f64,

    /// Statistic maximized by the search.
    #[arg(long, value_enum, default_value_t = Objective::Snr)]
    pub objective: Objective,

    /// Show the top-N periodogram peaks.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Render ASCII periodogram and folded plots.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Export the periodogram to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export a JSON run summary.
    #[arg(long = "export-summary")]
    pub export_summary: Option<PathBuf>,
}

/// Transit parameters shared by `model` and `simulate`.
#[derive(Debug, Args, Clone)]
pub struct TransitArgs {
    /// Planet-to-star radius ratio.
    #[arg(long, default_value_t = 0.1)]
    pub rp_rs: f64,

    /// Semi-major axis in stellar radii.
    #[arg(long, default_value_t = 15.0)]
    pub a_rs: f64,

    /// Orbital inclination (degrees).
    #[arg(long, default_value_t = 90.0)]
    pub inc: f64,

    /// Orbital period (days).
    #[arg(long, default_value_t = 3.0)]
    pub period: f64,

    /// Mid-transit time (BTJD).
    #[arg(long)]
    pub t0: Option<f64>,

    /// Eccentricity.
    #[arg(long, default_value_t = 0.0)]
    pub ecc: f64,

    /// Argument of periastron (degrees).
    #[arg(long, default_value_t = 90.0)]
    pub omega: f64,

    #[arg(long, value_enum, default_value_t = LdLaw::Quadratic)]
    pub law: LdLaw,

    /// First limb-darkening coefficient.
    #[arg(long, default_value_t = 0.3)]
    pub u1: f64,

    /// Second limb-darkening coefficient (quadratic law).
    #[arg(long, default_value_t = 0.2)]
    pub u2: f64,

    /// Exposure time for supersampling (days).
    #[arg(long)]
    pub exp_time: Option<f64>,

    /// Sub-samples per exposure.
    #[arg(long)]
    pub supersample: Option<usize>,

    #[arg(long, value_enum, default_value_t = ModelShape::Auto)]
    pub shape: ModelShape,
}

#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    #[command(flatten)]
    pub transit: TransitArgs,

    /// Evaluate on the times of this light curve CSV.
    #[arg(long, value_name = "CSV", conflicts_with_all = ["start", "span", "cadence_min"])]
    pub input: Option<PathBuf>,

    /// Grid start (BTJD).
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,

    /// Grid span (days).
    #[arg(long, default_value_t = 10.0)]
    pub span: f64,

    /// Grid spacing (minutes).
    #[arg(long = "cadence-min", default_value_t = 2.0)]
    pub cadence_min: f64,

    /// Output CSV path.
    #[arg(long, default_value = "model.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub transit: TransitArgs,

    /// First timestamp (BTJD).
    #[arg(long, default_value_t = 1325.0)]
    pub start: f64,

    /// Span (days).
    #[arg(long, default_value_t = 27.0)]
    pub span: f64,

    /// Sample spacing (minutes).
    #[arg(long = "cadence-min", default_value_t = 2.0)]
    pub cadence_min: f64,

    /// White noise per point (ppm).
    #[arg(long, default_value_t = 1000.0)]
    pub noise_ppm: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Data gap as `START,END` (BTJD).
    #[arg(long, value_delimiter = ',')]
    pub gap: Option<Vec<f64>>,

    /// Output CSV path.
    #[arg(long, default_value = "simulated.csv")]
    pub out: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn bls_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["slc", "bls", "--target", "WASP-52"]).unwrap();
        let Command::Bls(args) = cli.command else {
            panic!("expected bls");
        };
        assert_eq!(args.target.as_deref(), Some("WASP-52"));
        assert_eq!(args.pmin, 0.3);
        assert_eq!(args.pmax, 20.0);
        assert_eq!(args.dmin, 0.01);
        assert_eq!(args.dmax, 0.20);
        assert_eq!(args.nper, 6000);
        assert_eq!(args.window, 401);
        assert_eq!(args.sigma, 5.0);
        assert_eq!(args.objective, Objective::Snr);
        assert_eq!(args.fetch.author, "SPOC");
        assert_eq!(args.fetch.cadence, Cadence::Short);
    }

    #[test]
    fn target_and_input_conflict() {
        let res = Cli::try_parse_from(["slc", "bls", "--target", "X", "--input", "lc.csv"]);
        assert!(res.is_err());
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::try_parse_from(["slc", "download", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn archive_commands_document_fits_feature() {
        let mut cmd = Cli::command();
        for name in ["download", "bls", "tui"] {
            let sub = cmd.find_subcommand_mut(name).unwrap();
            let help = sub.render_long_help().to_string();
            assert!(help.contains("--features") && help.contains("cfitsio"), "{name} help: {help}");
        }
    }

    #[test]
    fn simulate_gap_takes_two_values() {
        let cli = Cli::try_parse_from(["slc", "simulate", "--gap", "1330,1332"]).unwrap();
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.gap, Some(vec![1330.0, 1332.0]));
    }
}
