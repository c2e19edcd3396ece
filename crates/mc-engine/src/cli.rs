//! `calibrate` command surface.
//!
//! Binaries embedding a concrete [`RatingEngine`] parse [`CalibrateArgs`],
//! call [`init_tracing`] and hand both to [`run`].

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mc_data::GameLoader;
use mc_types::{CalError, Mode};
use tracing_subscriber::EnvFilter;

use crate::calibrator::Calibrator;
use crate::config::CalibrationConfig;
use crate::diagnostics::Diagnostics;
use crate::model::RatingEngine;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "calibrate")]
#[command(about = "Calibrate rating-model parameters and cache the winners", long_about = None)]
pub struct CalibrateArgs {
    /// Historical games CSV (date,home,away,home_points,away_points,neutral)
    #[arg(long)]
    pub games: PathBuf,

    /// Ignore cached calibrations and re-run the optimizer
    #[arg(long)]
    pub retrain: bool,

    /// Mode to calibrate; repeat for several. Defaults to every registered mode
    #[arg(long = "mode", value_name = "MODE")]
    pub modes: Vec<String>,

    /// Calibration settings file (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Cache directory, overriding the config file and MC_CACHE_DIR
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Seed for reproducible optimizer runs
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the default
/// `info` level. Repeated calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Outcome of calibrating one requested mode.
#[derive(Debug)]
pub struct ModeReport {
    pub mode: String,
    pub result: std::result::Result<Diagnostics, CalError>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub modes: Vec<ModeReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.modes.iter().all(|report| report.result.is_ok())
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.succeeded() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    fn print(&self) {
        for report in &self.modes {
            match &report.result {
                Ok(d) => println!(
                    "{}: entropy {:.6}, residual mean {:.3}, residual std {:.3}, quantile KS {:.3} ({} games)",
                    report.mode,
                    d.entropy,
                    d.residual_mean,
                    d.residual_std,
                    d.quantile_ks,
                    d.observations
                ),
                Err(e) => eprintln!("{}: {}: {}", report.mode, e.kind(), e),
            }
        }
    }
}

/// Load settings and games, then calibrate the requested modes.
///
/// Setup failures (config, games) abort the whole run. Per-mode failures
/// are collected in the report so the remaining modes still run.
pub fn execute<E: RatingEngine>(args: &CalibrateArgs, engine: E) -> Result<RunReport> {
    let mut config = match &args.config {
        Some(path) => CalibrationConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CalibrationConfig::default(),
    };
    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }

    let data = GameLoader::new()
        .load_csv(&args.games)
        .with_context(|| format!("Failed to load games from {}", args.games.display()))?;
    let calibrator = Calibrator::from_config(engine, &config)?;

    let requested: Vec<(String, std::result::Result<Mode, CalError>)> = if args.modes.is_empty() {
        config
            .modes
            .modes()
            .into_iter()
            .map(|mode| (mode.to_string(), Ok(mode)))
            .collect()
    } else {
        args.modes
            .iter()
            .map(|name| (name.clone(), name.parse::<Mode>()))
            .collect()
    };

    let known: Vec<Mode> = requested
        .iter()
        .filter_map(|(_, parsed)| parsed.as_ref().ok().copied())
        .collect();
    tracing::info!(
        "Calibrating {} mode(s){}",
        known.len(),
        if args.retrain { " (retrain)" } else { "" }
    );
    let mut results = calibrator
        .calibrate_modes(&known, &data, args.retrain)
        .into_iter();

    let mut report = RunReport::default();
    for (name, parsed) in requested {
        let result = match parsed {
            Ok(_) => match results.next() {
                Some((_, Ok(model))) => Ok(Diagnostics::from_model(&model)),
                Some((_, Err(e))) => Err(e),
                None => Err(CalError::UnknownMode(name.clone())),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::error!("Calibration of {} failed: {}", name, e);
        }
        report.modes.push(ModeReport { mode: name, result });
    }
    Ok(report)
}

/// Run the command and map the outcome to a process exit status.
pub fn run<E: RatingEngine>(args: &CalibrateArgs, engine: E) -> ExitCode {
    match execute(args, engine) {
        Ok(report) => {
            report.print();
            report.exit_code()
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
