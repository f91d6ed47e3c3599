//! Analysis Configuration Module
//!
//! Every inversion and advisory threshold is an operator-tunable TOML value.
//!
//! ## Loading Order
//!
//! 1. `HYDRO_CONFIG` environment variable (path to TOML file)
//! 2. `hydro_config.toml` in the current working directory
//! 3. Built-in defaults (the reference constants)
//!
//! ## Usage
//!
//! The config is an ordinary value handed to whatever needs it; nothing reads
//! process-wide state:
//!
//! ```ignore
//! let config = AnalysisConfig::load();
//! let toolkit = AnalysisToolkit::new(config);
//! let fit = toolkit.theis().fit(&series)?;
//! ```

mod analysis_config;
pub mod defaults;
pub mod validation;

pub use analysis_config::*;
