//! Absorber and cloud fields read from the host state.
//!
//! Everything here stays in host order. Reordering for the solver happens
//! once, when the argument lists are assembled.

use crate::config::RadiationConfig;
use crate::options::check_range;
use climrad_core::constants::AIR_TO_WATER_MOLAR_MASS;
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::standard_variables::{
    VAR_CCL4, VAR_CFC11, VAR_CFC12, VAR_CFC22, VAR_CH4, VAR_CLOUD_FRACTION, VAR_CO2, VAR_H2O,
    VAR_ICE_EFFECTIVE_SIZE, VAR_ICE_WATER_PATH, VAR_LIQUID_EFFECTIVE_RADIUS,
    VAR_LIQUID_WATER_PATH, VAR_N2O, VAR_O2, VAR_O3, VAR_SPECIFIC_HUMIDITY,
};
use climrad_core::state::{InputState, StateValue};
use climrad_core::FloatValue;
use ndarray::Array2;
use std::fmt;

/// Absorbing gases known to RRTMG
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gas {
    H2o,
    O3,
    Co2,
    Ch4,
    N2o,
    O2,
    Cfc11,
    Cfc12,
    Cfc22,
    Ccl4,
}

impl Gas {
    /// All gases, in solver argument order
    pub const ALL: [Gas; 10] = [
        Gas::H2o,
        Gas::O3,
        Gas::Co2,
        Gas::Ch4,
        Gas::N2o,
        Gas::O2,
        Gas::Cfc11,
        Gas::Cfc12,
        Gas::Cfc22,
        Gas::Ccl4,
    ];

    /// Name of the host input holding this gas
    pub fn name(&self) -> &'static str {
        match self {
            Gas::H2o => VAR_H2O.name,
            Gas::O3 => VAR_O3.name,
            Gas::Co2 => VAR_CO2.name,
            Gas::Ch4 => VAR_CH4.name,
            Gas::N2o => VAR_N2O.name,
            Gas::O2 => VAR_O2.name,
            Gas::Cfc11 => VAR_CFC11.name,
            Gas::Cfc12 => VAR_CFC12.name,
            Gas::Cfc22 => VAR_CFC22.name,
            Gas::Ccl4 => VAR_CCL4.name,
        }
    }
}

impl fmt::Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A volume mixing ratio that is either well mixed or given per layer
#[derive(Debug, Clone, PartialEq)]
pub enum GasField {
    WellMixed(FloatValue),
    /// `(ncol, nlay)` in host order
    Profile(Array2<FloatValue>),
}

impl GasField {
    pub fn from_state_value(field: &str, value: &StateValue, ncol: usize, nlay: usize) -> ClimradResult<Self> {
        match value {
            StateValue::Scalar(v) => Ok(GasField::WellMixed(*v)),
            other => Ok(GasField::Profile(other.broadcast_levels(field, ncol, nlay)?)),
        }
    }

    /// Expand to a `(ncol, nlay)` array
    ///
    /// A well-mixed value is repeated exactly, with no arithmetic applied.
    pub fn broadcast(&self, field: &str, ncol: usize, nlay: usize) -> ClimradResult<Array2<FloatValue>> {
        match self {
            GasField::WellMixed(v) => Ok(Array2::from_elem((ncol, nlay), *v)),
            GasField::Profile(p) if p.dim() == (ncol, nlay) => Ok(p.clone()),
            GasField::Profile(p) => Err(ClimradError::ShapeMismatch {
                field: field.to_string(),
                expected: vec![ncol, nlay],
                found: p.shape().to_vec(),
            }),
        }
    }
}

/// Convert specific humidity (kg / kg) to a water vapour volume mixing ratio
pub fn specific_humidity_to_vmr(q: &Array2<FloatValue>) -> Array2<FloatValue> {
    q.mapv(|q| q / (1.0 - q) * AIR_TO_WATER_MOLAR_MASS)
}

/// Resolve a gas profile from the host state, falling back to the configured default
///
/// Water vapour may also be provided as specific humidity `q`, which is used
/// only when no `h2o` mixing ratio is present.
pub fn gas_profile(
    input: &InputState,
    config: &RadiationConfig,
    gas: Gas,
    ncol: usize,
    nlay: usize,
) -> ClimradResult<Array2<FloatValue>> {
    let field = match input.get(gas.name()) {
        Some(value) => GasField::from_state_value(gas.name(), value, ncol, nlay)?,
        None => match (gas, input.get(VAR_SPECIFIC_HUMIDITY.name)) {
            (Gas::H2o, Some(q)) => {
                let q = q.broadcast_levels(VAR_SPECIFIC_HUMIDITY.name, ncol, nlay)?;
                check_non_negative(VAR_SPECIFIC_HUMIDITY.name, &q)?;
                if q.iter().any(|v| *v >= 1.0) {
                    return Err(ClimradError::InvalidValue {
                        field: VAR_SPECIFIC_HUMIDITY.name.to_string(),
                        reason: "specific humidity must be below 1".to_string(),
                    });
                }
                GasField::Profile(specific_humidity_to_vmr(&q))
            }
            _ => GasField::WellMixed(config.absorbers.get(gas)),
        },
    };
    let profile = field.broadcast(gas.name(), ncol, nlay)?;
    check_non_negative(gas.name(), &profile)?;
    Ok(profile)
}

fn check_non_negative(field: &str, values: &Array2<FloatValue>) -> ClimradResult<()> {
    match values.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        Some(v) => Err(ClimradError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected finite non-negative values, found {}", v),
        }),
        None => Ok(()),
    }
}

/// Per-layer cloud fields in host order, each `(ncol, nlay)`
#[derive(Debug, Clone, PartialEq)]
pub struct CloudFields {
    /// Cloud fraction, in [0, 1]
    pub cldfrac: Array2<FloatValue>,
    /// In-cloud ice water path (g / m^2)
    pub ciwp: Array2<FloatValue>,
    /// In-cloud liquid water path (g / m^2)
    pub clwp: Array2<FloatValue>,
    /// Ice effective size (micron)
    pub reic: Array2<FloatValue>,
    /// Liquid effective radius (micron)
    pub relq: Array2<FloatValue>,
}

impl CloudFields {
    /// Clear sky everywhere with the configured effective sizes
    pub fn clear(config: &RadiationConfig, ncol: usize, nlay: usize) -> Self {
        Self {
            cldfrac: Array2::zeros((ncol, nlay)),
            ciwp: Array2::zeros((ncol, nlay)),
            clwp: Array2::zeros((ncol, nlay)),
            reic: Array2::from_elem((ncol, nlay), config.r_ice),
            relq: Array2::from_elem((ncol, nlay), config.r_liq),
        }
    }

    /// Read whichever cloud fields the host supplies and validate them
    pub fn from_input(
        input: &InputState,
        config: &RadiationConfig,
        ncol: usize,
        nlay: usize,
    ) -> ClimradResult<Self> {
        let mut clouds = Self::clear(config, ncol, nlay);
        let fields = [
            (VAR_CLOUD_FRACTION.name, &mut clouds.cldfrac),
            (VAR_ICE_WATER_PATH.name, &mut clouds.ciwp),
            (VAR_LIQUID_WATER_PATH.name, &mut clouds.clwp),
            (VAR_ICE_EFFECTIVE_SIZE.name, &mut clouds.reic),
            (VAR_LIQUID_EFFECTIVE_RADIUS.name, &mut clouds.relq),
        ];
        for (name, target) in fields {
            if let Some(value) = input.get(name) {
                *target = value.broadcast_levels(name, ncol, nlay)?;
            }
        }
        clouds.validate(config)?;
        Ok(clouds)
    }

    pub fn validate(&self, config: &RadiationConfig) -> ClimradResult<()> {
        if let Some(v) = self.cldfrac.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(ClimradError::InvalidValue {
                field: VAR_CLOUD_FRACTION.name.to_string(),
                reason: format!("cloud fraction must lie in [0, 1], found {}", v),
            });
        }
        check_non_negative(VAR_ICE_WATER_PATH.name, &self.ciwp)?;
        check_non_negative(VAR_LIQUID_WATER_PATH.name, &self.clwp)?;

        let ice_range = config.ice_optics.valid_range();
        for value in self.reic.iter() {
            check_range(VAR_ICE_EFFECTIVE_SIZE.name, &config.ice_optics, *value, ice_range)?;
        }
        let liquid_range = config.liquid_optics.valid_range();
        for value in self.relq.iter() {
            check_range(
                VAR_LIQUID_EFFECTIVE_RADIUS.name,
                &config.liquid_optics,
                *value,
                liquid_range,
            )?;
        }
        Ok(())
    }

    pub fn has_cloud(&self) -> bool {
        self.cldfrac.iter().any(|f| *f > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use climrad_core::grid::ColumnGrid;
    use climrad_core::state::{ColumnState, StateVariable};
    use is_close::is_close;
    use ndarray::array;

    fn state(nlay: usize) -> ColumnState {
        let grid = ColumnGrid::uniform(nlay, 1000.0).unwrap();
        let tatm = StateVariable::atmosphere(&grid, Array2::from_elem((1, nlay), 250.0)).unwrap();
        ColumnState::new(grid).with_variable("Tatm", tatm).unwrap()
    }

    #[test]
    fn test_well_mixed_broadcast_is_exact() {
        let value = 3.123456789e-4;
        let field = GasField::WellMixed(value);
        let profile = field.broadcast("co2", 2, 5).unwrap();
        assert!(profile.iter().all(|v| *v == value));
    }

    #[test]
    fn test_profile_with_wrong_layer_count() {
        let field = GasField::Profile(Array2::zeros((1, 4)));
        let err = field.broadcast("o3", 1, 5).unwrap_err();
        assert!(matches!(err, ClimradError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_gas_default_from_config() {
        let state = state(3);
        let input = InputState::build(&state);
        let config = RadiationConfig::default();

        let co2 = gas_profile(&input, &config, Gas::Co2, 1, 3).unwrap();
        assert_eq!(co2, Array2::from_elem((1, 3), 380e-6));
    }

    #[test]
    fn test_gas_from_host() {
        let state = state(3).with_input("o3", array![[1e-6, 2e-6, 3e-6]]);
        let input = InputState::build(&state);
        let o3 = gas_profile(&input, &RadiationConfig::default(), Gas::O3, 1, 3).unwrap();
        assert_eq!(o3, array![[1e-6, 2e-6, 3e-6]]);
    }

    #[test]
    fn test_negative_gas_rejected() {
        let state = state(2).with_input("ch4", -1.0e-6);
        let input = InputState::build(&state);
        let result = gas_profile(&input, &RadiationConfig::default(), Gas::Ch4, 1, 2);
        assert!(matches!(result, Err(ClimradError::InvalidValue { .. })));
    }

    #[test]
    fn test_specific_humidity_conversion() {
        let state = state(2).with_input("q", array![[0.0, 0.01]]);
        let input = InputState::build(&state);
        let h2o = gas_profile(&input, &RadiationConfig::default(), Gas::H2o, 1, 2).unwrap();

        assert_eq!(h2o[[0, 0]], 0.0);
        assert!(is_close!(h2o[[0, 1]], 0.01 / 0.99 * 28.97 / 18.015));
    }

    #[test]
    fn test_h2o_takes_precedence_over_q() {
        let state = state(2)
            .with_input("q", array![[0.01, 0.01]])
            .with_input("h2o", 0.02);
        let input = InputState::build(&state);
        let h2o = gas_profile(&input, &RadiationConfig::default(), Gas::H2o, 1, 2).unwrap();
        assert_eq!(h2o, Array2::from_elem((1, 2), 0.02));
    }

    #[test]
    fn test_clouds_default_to_clear() {
        let state = state(4);
        let input = InputState::build(&state);
        let clouds = CloudFields::from_input(&input, &RadiationConfig::default(), 1, 4).unwrap();

        assert!(!clouds.has_cloud());
        assert!(clouds.reic.iter().all(|r| *r == 20.0));
        assert!(clouds.relq.iter().all(|r| *r == 14.0));
    }

    #[test]
    fn test_cloud_fraction_out_of_range() {
        let state = state(2).with_input("cldfrac", array![[0.5, 1.5]]);
        let input = InputState::build(&state);
        let result = CloudFields::from_input(&input, &RadiationConfig::default(), 1, 2);
        assert!(matches!(result, Err(ClimradError::InvalidValue { .. })));
    }

    #[test]
    fn test_cloud_effective_size_checked_per_layer() {
        let state = state(2).with_input("r_ice", array![[20.0, 200.0]]);
        let input = InputState::build(&state);
        let result = CloudFields::from_input(&input, &RadiationConfig::default(), 1, 2);
        assert!(matches!(result, Err(ClimradError::OutOfRange { .. })));
    }

    #[test]
    fn test_cloud_layer_count_mismatch() {
        let state = state(3).with_input("clwp", array![[10.0, 20.0]]);
        let input = InputState::build(&state);
        let result = CloudFields::from_input(&input, &RadiationConfig::default(), 1, 3);
        assert!(matches!(result, Err(ClimradError::ShapeMismatch { .. })));
    }
}
