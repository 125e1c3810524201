//! Vertical ordering between host and solver conventions.
//!
//! The host stores profiles from the top of the atmosphere downward (index 0 is
//! the highest layer or interface). RRTMG expects the opposite, with index 0 at
//! the surface. Converting between the two is a pure reversal of the vertical
//! axis: no interpolation and no unit conversion.

use climrad_core::FloatValue;
use ndarray::{Array, Array2, ArrayBase, Axis, Data, Dimension, Slice};

/// Reverse `array` along `axis`
///
/// Applying this twice returns the original array exactly.
pub fn reverse_vertical<S, D>(array: &ArrayBase<S, D>, axis: Axis) -> Array<FloatValue, D>
where
    S: Data<Elem = FloatValue>,
    D: Dimension,
{
    array
        .slice_axis(axis, Slice::new(0, None, -1))
        .as_standard_layout()
        .into_owned()
}

/// Convert a host `(ncol, n)` profile to solver order
pub fn to_solver_order<S>(array: &ArrayBase<S, ndarray::Ix2>) -> Array2<FloatValue>
where
    S: Data<Elem = FloatValue>,
{
    reverse_vertical(array, Axis(1))
}

/// Convert a solver `(ncol, n)` profile to host order
pub fn to_host_order<S>(array: &ArrayBase<S, ndarray::Ix2>) -> Array2<FloatValue>
where
    S: Data<Elem = FloatValue>,
{
    reverse_vertical(array, Axis(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    #[test]
    fn test_reverse_profile() {
        let host = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let solver = to_solver_order(&host);
        assert_eq!(solver, array![[3.0, 2.0, 1.0], [6.0, 5.0, 4.0]]);
    }

    #[test]
    fn test_involution() {
        let host = Array2::from_shape_fn((3, 7), |(i, j)| (i * 7 + j) as f64 * 0.1 + 1e-12);
        let roundtrip = to_host_order(&to_solver_order(&host));
        assert_eq!(roundtrip, host);
    }

    #[test]
    fn test_single_layer_is_unchanged() {
        let host = array![[288.0], [250.0]];
        assert_eq!(to_solver_order(&host), host);
    }

    #[test]
    fn test_reverse_spectral_layer_axis() {
        // (nbnd, ncol, nlay)
        let tauc = Array3::from_shape_fn((2, 1, 3), |(b, _, k)| (b * 10 + k) as f64);
        let reversed = reverse_vertical(&tauc, Axis(2));

        assert_eq!(reversed[[0, 0, 0]], 2.0);
        assert_eq!(reversed[[1, 0, 2]], 10.0);
        assert_eq!(reverse_vertical(&reversed, Axis(2)), tauc);
    }

    #[test]
    fn test_result_is_standard_layout() {
        let host = array![[1.0, 2.0, 3.0]];
        assert!(to_solver_order(&host).is_standard_layout());
    }
}
