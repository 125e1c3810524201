//! Standard host variable definitions.
//!
//! These are the names under which the host framework stores the fields that
//! radiation processes read. Thermal state variables (`Tatm`, `Ts`) carry a
//! heat capacity; everything else is an auxiliary input stored as a
//! [`StateValue`](crate::state::StateValue).
//!
//! # Thermal state
//! - `VAR_TATM` - Atmospheric layer temperature in K
//! - `VAR_TS` - Surface temperature in K
//!
//! # Absorbers
//! Volume mixing ratios (dimensionless). Any of these may be a scalar
//! (well-mixed) or a per-layer profile.
//!
//! # Clouds
//! In-cloud water paths in g / m^2, effective sizes in microns.
//!
//! # Solar geometry
//! Shortwave only, required on every call.

use crate::define_variable;
use crate::variable::FieldShape;

// ============================================================================
// Thermal state
// ============================================================================

define_variable!(
    VAR_TATM,
    name = "Tatm",
    unit = "K",
    shape = FieldShape::Layer,
    description = "Atmospheric temperature at layer midpoints",
);

define_variable!(
    VAR_TS,
    name = "Ts",
    unit = "K",
    shape = FieldShape::Column,
    description = "Surface temperature",
);

// ============================================================================
// Absorbers
// ============================================================================

define_variable!(
    VAR_H2O,
    name = "h2o",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Water vapour volume mixing ratio",
);

define_variable!(
    VAR_SPECIFIC_HUMIDITY,
    name = "q",
    unit = "kg/kg",
    shape = FieldShape::Layer,
    description = "Specific humidity, converted to a water vapour mixing ratio when h2o is absent",
);

define_variable!(
    VAR_O3,
    name = "o3",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Ozone volume mixing ratio",
);

define_variable!(
    VAR_CO2,
    name = "co2",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Carbon dioxide volume mixing ratio",
);

define_variable!(
    VAR_CH4,
    name = "ch4",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Methane volume mixing ratio",
);

define_variable!(
    VAR_N2O,
    name = "n2o",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Nitrous oxide volume mixing ratio",
);

define_variable!(
    VAR_O2,
    name = "o2",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Oxygen volume mixing ratio",
);

define_variable!(
    VAR_CFC11,
    name = "cfc11",
    unit = "1",
    shape = FieldShape::Layer,
    description = "CFC-11 volume mixing ratio",
);

define_variable!(
    VAR_CFC12,
    name = "cfc12",
    unit = "1",
    shape = FieldShape::Layer,
    description = "CFC-12 volume mixing ratio",
);

define_variable!(
    VAR_CFC22,
    name = "cfc22",
    unit = "1",
    shape = FieldShape::Layer,
    description = "CFC-22 volume mixing ratio",
);

define_variable!(
    VAR_CCL4,
    name = "ccl4",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Carbon tetrachloride volume mixing ratio",
);

// ============================================================================
// Clouds
// ============================================================================

define_variable!(
    VAR_CLOUD_FRACTION,
    name = "cldfrac",
    unit = "1",
    shape = FieldShape::Layer,
    description = "Layer cloud fraction",
);

define_variable!(
    VAR_ICE_WATER_PATH,
    name = "ciwp",
    unit = "g/m^2",
    shape = FieldShape::Layer,
    description = "In-cloud ice water path",
);

define_variable!(
    VAR_LIQUID_WATER_PATH,
    name = "clwp",
    unit = "g/m^2",
    shape = FieldShape::Layer,
    description = "In-cloud liquid water path",
);

define_variable!(
    VAR_ICE_EFFECTIVE_SIZE,
    name = "r_ice",
    unit = "micron",
    shape = FieldShape::Layer,
    description = "Cloud ice particle effective size",
);

define_variable!(
    VAR_LIQUID_EFFECTIVE_RADIUS,
    name = "r_liq",
    unit = "micron",
    shape = FieldShape::Layer,
    description = "Cloud water drop effective radius",
);

// ============================================================================
// Solar geometry
// ============================================================================

define_variable!(
    VAR_COSZEN,
    name = "coszen",
    unit = "1",
    shape = FieldShape::Column,
    description = "Cosine of the solar zenith angle",
);

define_variable!(
    VAR_IRRADIANCE_FACTOR,
    name = "irradiance_factor",
    unit = "1",
    shape = FieldShape::Scalar,
    description = "Flux adjustment for the earth-sun distance, used when day_of_year is 0",
);

define_variable!(
    VAR_DAY_OF_YEAR,
    name = "day_of_year",
    unit = "day",
    shape = FieldShape::Scalar,
    description = "Day of the year used to compute the earth-sun distance, 0 to use irradiance_factor",
);
