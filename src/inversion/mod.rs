//! Parameter inversion engine
//!
//! Converts field-test series into formation parameters:
//!
//! | Model        | Input                        | Estimates        | Method                |
//! |--------------|------------------------------|------------------|-----------------------|
//! | Theis        | drawdown vs time, Q, r       | T, S             | Nelder-Mead / Brent   |
//! | Cooper-Jacob | drawdown vs time, Q, r       | T, S, validity   | closed-form OLS       |
//! | Lefranc      | head decay vs time           | τ → K            | Nelder-Mead           |
//! | Porchet      | falling head vs time, r      | K                | Brent (bounded)       |
//! | Lugeon       | pressure / discharge steps   | UL → K, CV       | averaging             |
//! | Piezometry   | level vs elapsed days        | trend, behavior  | OLS + Student t       |
//!
//! Every inverter is a small value type holding its configuration section;
//! `fit`/`analyze` borrow the input and return a fresh result record.

pub mod cooper_jacob;
pub mod decay;
pub mod diagnostics;
pub mod fitter;
pub mod lugeon;
pub mod piezometry;
pub mod theis;
pub mod well_function;

pub use cooper_jacob::{cooper_jacob_curve, cooper_jacob_drawdown, CooperJacobInverter};
pub use decay::{
    lefranc_head, permeability_from_tau, porchet_head, porchet_head_strict, porchet_radicand,
    LefrancInverter, PorchetInverter,
};
pub use diagnostics::{drawdown_derivative, fit_recovery, linear_regression, rmse, LinearRegression};
pub use fitter::{LeastSquaresFit, Minimum, NonlinearFitter, Parameter, Scale};
pub use lugeon::{lugeon_to_ms, ms_to_lugeon, LugeonAverager};
pub use piezometry::TrendAnalyzer;
pub use theis::{theis_curve, theis_drawdown, theis_u, TheisInverter};
pub use well_function::{well_function, well_function_many};
