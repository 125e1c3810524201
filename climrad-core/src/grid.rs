//! Vertical column grid.
//!
//! The host convention indexes levels from the top of the atmosphere down:
//! index 0 is the uppermost layer and `lev_bounds[nlay]` is the surface.

use crate::constants::{CP, GRAVITY, MB_TO_PA};
use crate::errors::{ClimradError, ClimradResult};
use crate::FloatValue;
use ndarray::{Array, Array1};
use serde::{Deserialize, Serialize};

/// Pressure levels of a column, in hPa
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnGrid {
    lev: Array1<FloatValue>,
    lev_bounds: Array1<FloatValue>,
}

impl ColumnGrid {
    /// Create a grid from layer midpoints and layer interfaces
    ///
    /// Fails if there is not exactly one more interface than layers, if the
    /// pressures do not increase from the top down or if a midpoint does not lie
    /// strictly between its bounding interfaces.
    pub fn new(lev: Array1<FloatValue>, lev_bounds: Array1<FloatValue>) -> ClimradResult<Self> {
        if lev.is_empty() {
            return Err(ClimradError::InvalidGrid(
                "a column needs at least one layer".to_string(),
            ));
        }
        if lev_bounds.len() != lev.len() + 1 {
            return Err(ClimradError::InvalidGrid(format!(
                "expected {} layer interfaces for {} layers, got {}",
                lev.len() + 1,
                lev.len(),
                lev_bounds.len()
            )));
        }
        if lev_bounds.iter().any(|p| !p.is_finite() || *p < 0.0) {
            return Err(ClimradError::InvalidGrid(
                "interface pressures must be finite and non-negative".to_string(),
            ));
        }
        for (k, p) in lev.iter().enumerate() {
            let (top, bottom) = (lev_bounds[k], lev_bounds[k + 1]);
            if top >= bottom {
                return Err(ClimradError::InvalidGrid(format!(
                    "interface pressures must increase towards the surface (index {})",
                    k
                )));
            }
            if !(*p > top && *p < bottom) {
                return Err(ClimradError::InvalidGrid(format!(
                    "layer {} midpoint {} hPa lies outside ({}, {}) hPa",
                    k, p, top, bottom
                )));
            }
        }

        Ok(Self { lev, lev_bounds })
    }

    /// Evenly spaced layers between the top of the atmosphere (0 hPa) and the surface
    pub fn uniform(num_layers: usize, surface_pressure: FloatValue) -> ClimradResult<Self> {
        let bounds = Array::linspace(0.0, surface_pressure, num_layers + 1);
        Self::from_bounds(bounds)
    }

    /// Create a grid whose midpoints are halfway between consecutive interfaces
    pub fn from_bounds(lev_bounds: Array1<FloatValue>) -> ClimradResult<Self> {
        if lev_bounds.len() < 2 {
            return Err(ClimradError::InvalidGrid(
                "at least two interfaces are required".to_string(),
            ));
        }
        let n = lev_bounds.len() - 1;
        let lev = Array1::from_iter((0..n).map(|k| 0.5 * (lev_bounds[k] + lev_bounds[k + 1])));
        Self::new(lev, lev_bounds)
    }

    /// Number of layers
    pub fn nlay(&self) -> usize {
        self.lev.len()
    }

    /// Layer midpoint pressures (hPa)
    pub fn lev(&self) -> &Array1<FloatValue> {
        &self.lev
    }

    /// Layer interface pressures (hPa)
    pub fn lev_bounds(&self) -> &Array1<FloatValue> {
        &self.lev_bounds
    }

    /// Pressure thickness of each layer (hPa)
    pub fn delta_pressure(&self) -> Array1<FloatValue> {
        Array1::from_iter((0..self.nlay()).map(|k| self.lev_bounds[k + 1] - self.lev_bounds[k]))
    }

    /// Heat capacity of each layer, $c_p \Delta p / g$ (J / m^2 / K)
    pub fn heat_capacity(&self) -> Array1<FloatValue> {
        self.delta_pressure().mapv(|dp| CP * dp * MB_TO_PA / GRAVITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn test_uniform_grid() {
        let grid = ColumnGrid::uniform(10, 1000.0).unwrap();

        assert_eq!(grid.nlay(), 10);
        assert_eq!(grid.lev_bounds().len(), 11);
        assert_eq!(grid.lev()[0], 50.0);
        assert_eq!(grid.lev()[9], 950.0);
        assert!(grid.delta_pressure().iter().all(|dp| is_close!(*dp, 100.0)));
    }

    #[test]
    fn test_heat_capacity() {
        let grid = ColumnGrid::uniform(2, 1000.0).unwrap();
        let expected = CP * 500.0 * MB_TO_PA / GRAVITY;

        grid.heat_capacity()
            .iter()
            .for_each(|c| assert!(is_close!(*c, expected)));
    }

    #[test]
    fn test_single_layer() {
        let grid = ColumnGrid::new(array![500.0], array![0.0, 1000.0]).unwrap();
        assert_eq!(grid.nlay(), 1);
    }

    #[test]
    fn test_bounds_length_mismatch() {
        let result = ColumnGrid::new(array![250.0, 750.0], array![0.0, 1000.0]);
        assert!(matches!(result, Err(ClimradError::InvalidGrid(_))));
    }

    #[test]
    fn test_surface_first_ordering_rejected() {
        let result = ColumnGrid::new(array![750.0, 250.0], array![1000.0, 500.0, 0.0]);
        assert!(matches!(result, Err(ClimradError::InvalidGrid(_))));
    }

    #[test]
    fn test_midpoint_outside_bounds() {
        let result = ColumnGrid::new(array![600.0, 750.0], array![0.0, 500.0, 1000.0]);
        assert!(matches!(result, Err(ClimradError::InvalidGrid(_))));
    }

    #[test]
    fn test_midpoint_on_interface() {
        let result = ColumnGrid::new(array![100.0, 100.0], array![0.0, 100.0, 200.0]);
        assert!(matches!(result, Err(ClimradError::InvalidGrid(_))));

        let result = ColumnGrid::new(array![0.0], array![0.0, 1000.0]);
        assert!(matches!(result, Err(ClimradError::InvalidGrid(_))));
    }
}
