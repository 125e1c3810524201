//! Core types for coupling radiative processes to a column model.
//!
//! The host owns a [`state::ColumnState`] on a [`grid::ColumnGrid`]. Each
//! [`process::Process`] declares what it reads and writes, receives a read-only
//! [`state::InputState`] and returns tendencies and diagnostics.

pub mod constants;
pub mod errors;
pub mod grid;
pub mod process;
pub mod standard_variables;
pub mod state;
pub mod variable;

pub use ndarray;

/// Floating point type used throughout
pub type FloatValue = f64;
