//! Physical constants shared by the host framework and the radiation processes.
//!
//! Values follow the conventions of the column models these processes are
//! coupled to, so that heat capacities computed here match the ones used by
//! the rest of the host model.

use crate::FloatValue;

/// Specific heat of dry air at constant pressure (J / kg / K)
pub const CP: FloatValue = 1004.0;

/// Gravitational acceleration (m / s^2)
pub const GRAVITY: FloatValue = 9.8;

/// Number of seconds in one day
pub const SECONDS_PER_DAY: FloatValue = 86400.0;

/// Conversion from millibar (hPa) to Pa
pub const MB_TO_PA: FloatValue = 100.0;

/// Stefan-Boltzmann constant (W / m^2 / K^4)
pub const STEFAN_BOLTZMANN: FloatValue = 5.670_373e-8;

/// Solar constant (W / m^2)
pub const SOLAR_CONSTANT: FloatValue = 1365.2;

/// Ratio of the molecular weight of dry air to that of water vapour
pub const AIR_TO_WATER_MOLAR_MASS: FloatValue = 28.97 / 18.015;
