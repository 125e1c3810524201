//! RRTMG longwave and shortwave radiation for climrad column models.
//!
//! The crate is the coupling layer between the host column state and an
//! RRTMG-style solver:
//!
//! - [`ordering`] converts between host (top first) and solver (surface first)
//!   vertical order
//! - [`config`], [`options`] and [`fields`] hold the fixed configuration and
//!   the per-call gas and cloud fields
//! - [`arguments`] assembles the solvers' positional argument lists
//! - [`driver`] defines the solver interface and its one-time initialisation
//! - [`translate`] turns solver output into host tendencies and diagnostics
//! - [`longwave`], [`shortwave`] and [`composite`] are the processes exposed
//!   to the host
//!
//! [`gray`] provides reference drivers that honour the same contract.

pub mod arguments;
pub mod composite;
pub mod config;
pub mod driver;
pub mod fields;
pub mod gray;
pub mod longwave;
pub mod options;
pub mod ordering;
pub mod shortwave;
pub mod translate;

pub use composite::Rrtmg;
pub use config::RadiationConfig;
pub use longwave::RrtmgLongwave;
pub use shortwave::RrtmgShortwave;
