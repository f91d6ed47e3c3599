//! hydro-inversion - command-line front end
//!
//! Reads measurement files, runs one analysis and prints the result as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Theis fit of a drawdown file (Q and r from header comments or flags)
//! hydro-inversion theis --file pumping.csv --pumping-rate 0.001 --distance 50
//!
//! # Lugeon test from pressure:discharge steps
//! hydro-inversion lugeon --segment-length 5 --step 10:30 --step 5:14
//!
//! # Many files in parallel
//! hydro-inversion batch --method cooper-jacob data/*.csv
//! ```
//!
//! # Environment Variables
//!
//! - `HYDRO_CONFIG`: Path to the analysis TOML (default: ./hydro_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use hydro_inversion::advisor::{GeologyParameters, TheisParameters};
use hydro_inversion::ingest::parse_injection_test;
use hydro_inversion::types::MeasuredValues;
use hydro_inversion::{
    AnalysisConfig, AnalysisMethod, AnalysisToolkit, DecayGeometry, FittedModel, InjectionTest,
    LevelSeries, TestMeasurementSeries,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hydro-inversion")]
#[command(about = "Hydrogeological parameter inversion with explainable validation")]
#[command(version)]
struct CliArgs {
    /// Analysis config TOML (overrides HYDRO_CONFIG and ./hydro_config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print compact single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: SubCommand,
}

/// Test scalars that override or complete the ones read from the file.
#[derive(clap::Args, Debug, Default)]
struct SeriesOverrides {
    /// Pumping rate Q (m³/s)
    #[arg(long)]
    pumping_rate: Option<f64>,
    /// Observation distance r (m)
    #[arg(long)]
    distance: Option<f64>,
    /// Borehole / packer radius (m)
    #[arg(long)]
    radius: Option<f64>,
    /// Tested segment length (m)
    #[arg(long)]
    segment_length: Option<f64>,
    /// Initial water height (m)
    #[arg(long)]
    initial_head: Option<f64>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Fit T and S to a pumping-test drawdown series (Theis)
    Theis {
        #[arg(short, long)]
        file: PathBuf,
        /// Fix S and fit T alone
        #[arg(long)]
        storativity: Option<f64>,
        #[command(flatten)]
        overrides: SeriesOverrides,
    },

    /// Semi-log straight-line analysis of a drawdown series
    CooperJacob {
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        overrides: SeriesOverrides,
    },

    /// Variable-head decay test
    Lefranc {
        #[arg(short, long)]
        file: PathBuf,
        /// cylinder or packer
        #[arg(long, default_value = "cylinder")]
        geometry: DecayGeometry,
        /// Initial guess of the formation head h∞ (m)
        #[arg(long)]
        aquifer_head: Option<f64>,
        #[command(flatten)]
        overrides: SeriesOverrides,
    },

    /// Falling-head test above the water table
    Porchet {
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        overrides: SeriesOverrides,
    },

    /// Stepped packer injection test
    Lugeon {
        /// JSON document with segment_length and steps
        #[arg(short, long, conflicts_with_all = ["segment_length", "steps"])]
        file: Option<PathBuf>,
        /// Tested segment length (m)
        #[arg(long, requires = "steps")]
        segment_length: Option<f64>,
        /// PRESSURE_BAR:DISCHARGE_LPM, repeat per step
        #[arg(long = "step", value_name = "P:Q", value_parser = parse_step)]
        steps: Vec<(f64, f64)>,
    },

    /// Statistics, trend and behavior of a piezometric level series (time column in days)
    Piezo {
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Outlier screening of one or more series files
    Anomalies {
        files: Vec<PathBuf>,
    },

    /// Plausible parameter ranges for a lithology or partial measurements
    Recommend {
        /// Lithology key (e.g. sables, argiles, silt)
        #[arg(long)]
        lithology: Option<String>,
        /// Measured K (m/s)
        #[arg(long)]
        conductivity: Option<f64>,
        #[arg(long)]
        porosity: Option<f64>,
        /// List known lithologies and exit
        #[arg(long)]
        list: bool,
    },

    /// Rule-based verdict on a Theis and/or geology parameter set
    Validate {
        #[arg(long)]
        pumping_rate: Option<f64>,
        #[arg(long)]
        transmissivity: Option<f64>,
        #[arg(long)]
        storativity: Option<f64>,
        #[arg(long)]
        distance: Option<f64>,
        /// Last observation time (s)
        #[arg(long)]
        time_max: Option<f64>,
        #[arg(long)]
        conductivity: Option<f64>,
        #[arg(long)]
        porosity: Option<f64>,
        #[arg(long)]
        lithology: Option<String>,
    },

    /// Run one method over many files in parallel
    Batch {
        /// theis, cooper-jacob, lefranc, lefranc-packer or porchet
        #[arg(short, long)]
        method: AnalysisMethod,
        files: Vec<PathBuf>,
    },
}

fn parse_step(s: &str) -> Result<(f64, f64), String> {
    let (p, q) = s
        .split_once(':')
        .ok_or_else(|| format!("expected PRESSURE:DISCHARGE, got '{s}'"))?;
    let p = p.trim().parse::<f64>().map_err(|e| format!("pressure '{p}': {e}"))?;
    let q = q.trim().parse::<f64>().map_err(|e| format!("discharge '{q}': {e}"))?;
    Ok((p, q))
}

// ============================================================================
// Helpers
// ============================================================================

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(p) => AnalysisConfig::load_from_file(p)
            .with_context(|| format!("Failed to load config {}", p.display())),
        None => Ok(AnalysisConfig::load()),
    }
}

fn load_series(
    toolkit: &AnalysisToolkit,
    path: &Path,
    overrides: &SeriesOverrides,
) -> Result<TestMeasurementSeries> {
    let mut series = toolkit
        .formats()
        .load_file(path)
        .with_context(|| format!("Failed to read series {}", path.display()))?;
    if let Some(q) = overrides.pumping_rate {
        series = series.with_pumping_rate(q);
    }
    if let Some(r) = overrides.distance {
        series = series.with_distance(r);
    }
    if let Some(radius) = overrides.radius {
        series = series.with_radius(radius);
    }
    if let Some(length) = overrides.segment_length {
        series = series.with_segment_length(length);
    }
    if let Some(h0) = overrides.initial_head {
        series = series.with_initial_head(h0);
    }
    Ok(series)
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let text = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{text}");
    Ok(())
}

#[derive(Serialize)]
struct AnomalyOutput {
    report: hydro_inversion::AnomalyReport,
    recommendations: Vec<String>,
}

#[derive(Serialize)]
struct BatchEntry {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<FittedModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn run_batch(toolkit: &AnalysisToolkit, method: AnalysisMethod, files: &[PathBuf]) -> Vec<BatchEntry> {
    info!(%method, files = files.len(), "Starting batch analysis");
    files
        .par_iter()
        .map(|path| {
            let outcome = load_series(toolkit, path, &SeriesOverrides::default())
                .and_then(|series| Ok(toolkit.fit(method, &series)?));
            let file = path.display().to_string();
            match outcome {
                Ok(model) => BatchEntry {
                    file,
                    result: Some(model),
                    error: None,
                },
                Err(e) => {
                    warn!(file = %file, "Batch analysis failed: {:#}", e);
                    BatchEntry {
                        file,
                        result: None,
                        error: Some(format!("{e:#}")),
                    }
                }
            }
        })
        .collect()
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let toolkit = AnalysisToolkit::new(load_config(args.config.as_deref())?);
    let compact = args.compact;

    match args.command {
        SubCommand::Theis {
            file,
            storativity,
            overrides,
        } => {
            let series = load_series(&toolkit, &file, &overrides)?;
            let fit = match storativity {
                Some(s) => toolkit.theis().fit_with_storativity(&series, s)?,
                None => toolkit.theis().fit(&series)?,
            };
            print_json(&FittedModel::from(fit), compact)
        }

        SubCommand::CooperJacob { file, overrides } => {
            let series = load_series(&toolkit, &file, &overrides)?;
            let fit = toolkit.cooper_jacob().fit(&series)?;
            if !fit.is_valid() {
                warn!(
                    validity = fit.validity_percent,
                    "Cooper-Jacob approximation poorly satisfied"
                );
            }
            print_json(&FittedModel::from(fit), compact)
        }

        SubCommand::Lefranc {
            file,
            geometry,
            aquifer_head,
            overrides,
        } => {
            let series = load_series(&toolkit, &file, &overrides)?;
            let fit = toolkit
                .lefranc()
                .fit_with_aquifer_head(&series, geometry, aquifer_head)?;
            print_json(&FittedModel::from(fit), compact)
        }

        SubCommand::Porchet { file, overrides } => {
            let series = load_series(&toolkit, &file, &overrides)?;
            let fit = toolkit.porchet().fit(&series)?;
            print_json(&FittedModel::from(fit), compact)
        }

        SubCommand::Lugeon {
            file,
            segment_length,
            steps,
        } => {
            let test = match (file, segment_length) {
                (Some(path), _) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    parse_injection_test(&bytes)
                        .with_context(|| format!("Invalid injection test {}", path.display()))?
                }
                (None, Some(length)) => InjectionTest::from_steps(length, steps)?,
                (None, None) => anyhow::bail!("lugeon needs --file or --segment-length with --step"),
            };
            let result = toolkit.lugeon().analyze(&test)?;
            print_json(&FittedModel::from(result), compact)
        }

        SubCommand::Piezo { file } => {
            let series = load_series(&toolkit, &file, &SeriesOverrides::default())?;
            let levels = LevelSeries::new(series.times().to_vec(), series.values().to_vec())?;
            let report = toolkit.piezometry().analyze(&levels)?;
            print_json(&report, compact)
        }

        SubCommand::Anomalies { files } => {
            if files.is_empty() {
                anyhow::bail!("anomalies needs at least one file");
            }
            let loaded = files
                .iter()
                .map(|path| {
                    let series = load_series(&toolkit, path, &SeriesOverrides::default())?;
                    Ok((path.display().to_string(), series))
                })
                .collect::<Result<Vec<_>>>()?;
            let report = toolkit.anomaly().comprehensive_check(
                loaded
                    .iter()
                    .map(|(name, series)| (name.as_str(), series.values())),
            );
            let recommendations = toolkit.anomaly().recommendations(&report);
            print_json(
                &AnomalyOutput {
                    report,
                    recommendations,
                },
                compact,
            )
        }

        SubCommand::Recommend {
            lithology,
            conductivity,
            porosity,
            list,
        } => {
            if list {
                let entries: Vec<_> = hydro_inversion::advisor::lithology_list();
                return print_json(&entries, compact);
            }
            match (lithology, conductivity, porosity) {
                (Some(name), None, None) => {
                    let set = toolkit.recommender().recommend_from_lithology(&name)?;
                    print_json(&set, compact)
                }
                (lithology, conductivity, porosity) => {
                    let measured = MeasuredValues {
                        hydraulic_conductivity: conductivity,
                        porosity,
                        lithology,
                    };
                    print_json(
                        &toolkit.recommender().recommend_from_measurements(&measured),
                        compact,
                    )
                }
            }
        }

        SubCommand::Validate {
            pumping_rate,
            transmissivity,
            storativity,
            distance,
            time_max,
            conductivity,
            porosity,
            lithology,
        } => {
            let theis = match (pumping_rate, transmissivity, storativity, distance, time_max) {
                (Some(q), Some(t), Some(s), Some(r), Some(time)) => Some(TheisParameters {
                    pumping_rate: q,
                    transmissivity: t,
                    storativity: s,
                    distance: r,
                    time_max: time,
                }),
                _ => None,
            };
            let geology = match (conductivity, porosity, storativity) {
                (Some(k), Some(phi), Some(s)) => Some(GeologyParameters {
                    hydraulic_conductivity: k,
                    porosity: phi,
                    storativity: s,
                    lithology,
                }),
                _ => None,
            };
            if theis.is_none() && geology.is_none() {
                anyhow::bail!(
                    "validate needs Q, T, S, r and --time-max, or K, porosity and S"
                );
            }
            let report = toolkit
                .validation()
                .global_check(theis.as_ref(), geology.as_ref(), None);
            print_json(&report, compact)
        }

        SubCommand::Batch { method, files } => {
            let entries = run_batch(&toolkit, method, &files);
            let failed = entries.iter().filter(|e| e.error.is_some()).count();
            info!(total = entries.len(), failed, "Batch analysis complete");
            print_json(&entries, compact)
        }
    }
}
