//! Radiative processes for column climate models.
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: the process interface, column grid and host state
//! - [`rrtmg`]: the RRTMG longwave and shortwave processes

pub use climrad_core as core;
pub use climrad_rrtmg as rrtmg;

pub use climrad_core::errors::{ClimradError, ClimradResult};
pub use climrad_core::process::{CompositeProcess, Process};
pub use climrad_rrtmg::{RadiationConfig, Rrtmg, RrtmgLongwave, RrtmgShortwave};
