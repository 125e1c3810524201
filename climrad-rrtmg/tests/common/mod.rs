//! Shared column setups for the integration tests.

#![allow(dead_code)]

use climrad_core::grid::ColumnGrid;
use climrad_core::state::{ColumnState, StateVariable};
use ndarray::{Array1, Array2};

/// Heat capacity of a 1 m deep water slab (J / m^2 / K)
pub const SLAB_HEAT_CAPACITY: f64 = 4.0e6;

/// An Earth-like column: `nlay` evenly spaced layers, temperature falling
/// linearly from 285 K near the surface to 210 K at the top
pub fn earth_like_column(ncol: usize, nlay: usize, ts: f64) -> ColumnState {
    let grid = ColumnGrid::uniform(nlay, 1000.0).unwrap();
    let tatm = Array2::from_shape_fn((ncol, nlay), |(_, k)| {
        210.0 + 75.0 * k as f64 / (nlay - 1) as f64
    });
    let tatm = StateVariable::atmosphere(&grid, tatm).unwrap();
    let ts = StateVariable::surface(Array1::from_elem(ncol, ts), SLAB_HEAT_CAPACITY).unwrap();

    ColumnState::new(grid)
        .with_variable("Tatm", tatm)
        .unwrap()
        .with_variable("Ts", ts)
        .unwrap()
}

/// Add the solar geometry required by the shortwave process
pub fn with_sun(state: ColumnState, coszen: f64) -> ColumnState {
    state
        .with_input("coszen", coszen)
        .with_input("irradiance_factor", 1.0)
        .with_input("day_of_year", 0.0)
}
