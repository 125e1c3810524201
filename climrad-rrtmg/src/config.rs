//! Radiation configuration
//!
//! A [`RadiationConfig`] is fixed when a process is constructed and never
//! changes afterwards. Every field has a documented default so that an empty
//! TOML document yields the standard configuration.

use crate::driver::{Domain, NAEREC, NGPTLW, NGPTSW};
use crate::fields::Gas;
use crate::options::{
    check_range, AerosolMode, CloudOverlap, CloudPropertyMode, IceOptics, LiquidOptics,
    RandomGenerator,
};
use climrad_core::constants::SOLAR_CONSTANT;
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::FloatValue;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default volume mixing ratios used when the host does not supply a gas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsorberDefaults {
    /// default: 0.0
    pub h2o: FloatValue,
    /// default: 1e-9
    pub o3: FloatValue,
    /// default: 380e-6
    pub co2: FloatValue,
    /// default: 1e-9
    pub ch4: FloatValue,
    /// default: 1e-9
    pub n2o: FloatValue,
    /// default: 0.0
    pub o2: FloatValue,
    /// default: 1e-9
    pub cfc11: FloatValue,
    /// default: 1e-9
    pub cfc12: FloatValue,
    /// default: 0.0
    pub cfc22: FloatValue,
    /// default: 0.0
    pub ccl4: FloatValue,
}

impl Default for AbsorberDefaults {
    fn default() -> Self {
        Self {
            h2o: 0.0,
            o3: 1e-9,
            co2: 380e-6,
            ch4: 1e-9,
            n2o: 1e-9,
            o2: 0.0,
            cfc11: 1e-9,
            cfc12: 1e-9,
            cfc22: 0.0,
            ccl4: 0.0,
        }
    }
}

impl AbsorberDefaults {
    pub fn get(&self, gas: Gas) -> FloatValue {
        match gas {
            Gas::H2o => self.h2o,
            Gas::O3 => self.o3,
            Gas::Co2 => self.co2,
            Gas::Ch4 => self.ch4,
            Gas::N2o => self.n2o,
            Gas::O2 => self.o2,
            Gas::Cfc11 => self.cfc11,
            Gas::Cfc12 => self.cfc12,
            Gas::Cfc22 => self.cfc22,
            Gas::Ccl4 => self.ccl4,
        }
    }
}

/// Radiative properties of the surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceProperties {
    /// Longwave emissivity, applied to every band
    /// unit: dimensionless
    /// default: 1.0
    pub emissivity: FloatValue,
    /// UV/visible albedo for direct radiation
    /// default: 0.3
    pub asdir: FloatValue,
    /// UV/visible albedo for diffuse radiation
    /// default: 0.3
    pub asdif: FloatValue,
    /// Near-IR albedo for direct radiation
    /// default: 0.3
    pub aldir: FloatValue,
    /// Near-IR albedo for diffuse radiation
    /// default: 0.3
    pub aldif: FloatValue,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            emissivity: 1.0,
            asdir: 0.3,
            asdif: 0.3,
            aldir: 0.3,
            aldif: 0.3,
        }
    }
}

/// Longwave aerosol optical depth per band, applied to every layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongwaveAerosol {
    pub tau: Vec<FloatValue>,
}

/// Shortwave aerosol optical properties per band, applied to every layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortwaveAerosol {
    /// Optical depth (not delta scaled)
    pub tau: Vec<FloatValue>,
    /// Single scattering albedo
    pub ssa: Vec<FloatValue>,
    /// Asymmetry parameter
    pub asm: Vec<FloatValue>,
}

/// Configuration shared by the longwave and shortwave processes
///
/// ```
/// use climrad_rrtmg::config::RadiationConfig;
///
/// let config = RadiationConfig::from_toml_str(
///     r#"
///     cloud_overlap = "maximum_random"
///     r_ice = 40.0
///
///     [absorbers]
///     co2 = 560e-6
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.cloud_overlap.flag(), 2);
/// assert_eq!(config.absorbers.ch4, 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiationConfig {
    /// Cloud overlap assumption
    /// default: random
    pub cloud_overlap: CloudOverlap,
    /// How in-cloud optical properties are obtained
    /// default: separate
    pub cloud_properties: CloudPropertyMode,
    /// default: Ebert-Curry with 13-130 micron limits
    pub ice_optics: IceOptics,
    /// default: Hu-Stamnes
    pub liquid_optics: LiquidOptics,
    /// default: Mersenne Twister
    pub random_generator: RandomGenerator,
    /// Seed offset of the longwave sub-column generator
    /// default: 300
    pub permute_seed_lw: i32,
    /// Seed offset of the shortwave sub-column generator
    /// default: 150
    pub permute_seed_sw: i32,
    /// Compute the derivative of upward flux with respect to surface temperature
    /// default: false
    pub surface_derivative: bool,
    /// default: explicit
    pub aerosol_mode: AerosolMode,
    pub absorbers: AbsorberDefaults,
    pub surface: SurfaceProperties,
    /// Ice effective size used when the host does not supply `r_ice`
    /// unit: micron
    /// default: 20.0
    pub r_ice: FloatValue,
    /// Liquid effective radius used when the host does not supply `r_liq`
    /// unit: micron
    /// default: 14.0
    pub r_liq: FloatValue,
    /// unit: W / m^2
    /// default: 1365.2
    pub solar_constant: FloatValue,
    /// default: none (zero optical depth)
    pub aerosol_lw: Option<LongwaveAerosol>,
    /// default: none (zero optical depth)
    pub aerosol_sw: Option<ShortwaveAerosol>,
    /// Optical depth at 0.55 micron of the six ECMWF aerosol types, used when
    /// `aerosol_mode` is `ecmwf`
    /// default: none (zero optical depth)
    pub aerosol_ecmwf: Option<Vec<FloatValue>>,
}

impl Default for RadiationConfig {
    fn default() -> Self {
        Self {
            cloud_overlap: CloudOverlap::default(),
            cloud_properties: CloudPropertyMode::default(),
            ice_optics: IceOptics::default(),
            liquid_optics: LiquidOptics::default(),
            random_generator: RandomGenerator::default(),
            permute_seed_lw: 300,
            permute_seed_sw: 150,
            surface_derivative: false,
            aerosol_mode: AerosolMode::default(),
            absorbers: AbsorberDefaults::default(),
            surface: SurfaceProperties::default(),
            r_ice: 20.0,
            r_liq: 14.0,
            solar_constant: SOLAR_CONSTANT,
            aerosol_lw: None,
            aerosol_sw: None,
            aerosol_ecmwf: None,
        }
    }
}

fn check_fraction(field: &str, value: FloatValue) -> ClimradResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ClimradError::Configuration(format!(
            "{} must lie in [0, 1], got {}",
            field, value
        )))
    }
}

fn check_band_count(
    field: &str,
    domain: Domain,
    values: &[FloatValue],
    expected: usize,
) -> ClimradResult<()> {
    if values.len() != expected {
        return Err(ClimradError::BandCountMismatch {
            field: field.to_string(),
            domain: domain.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

impl RadiationConfig {
    /// Parse and validate a configuration from TOML
    pub fn from_toml_str(content: &str) -> ClimradResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ClimradError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check everything that does not depend on the solver's band counts
    pub fn validate(&self) -> ClimradResult<()> {
        self.check_seeds(NGPTLW, NGPTSW)?;
        check_range("r_ice", &self.ice_optics, self.r_ice, self.ice_optics.valid_range())?;
        check_range(
            "r_liq",
            &self.liquid_optics,
            self.r_liq,
            self.liquid_optics.valid_range(),
        )?;

        check_fraction("surface.emissivity", self.surface.emissivity)?;
        check_fraction("surface.asdir", self.surface.asdir)?;
        check_fraction("surface.asdif", self.surface.asdif)?;
        check_fraction("surface.aldir", self.surface.aldir)?;
        check_fraction("surface.aldif", self.surface.aldif)?;

        if !(self.solar_constant.is_finite() && self.solar_constant > 0.0) {
            return Err(ClimradError::Configuration(format!(
                "solar_constant must be positive, got {}",
                self.solar_constant
            )));
        }
        for gas in Gas::ALL {
            let value = self.absorbers.get(gas);
            if !(value.is_finite() && value >= 0.0) {
                return Err(ClimradError::Configuration(format!(
                    "Default {} mixing ratio must be non-negative, got {}",
                    gas, value
                )));
            }
        }
        if let Some(ecaer) = &self.aerosol_ecmwf {
            if ecaer.len() != NAEREC {
                return Err(ClimradError::Configuration(format!(
                    "aerosol_ecmwf needs {} aerosol types, got {}",
                    NAEREC,
                    ecaer.len()
                )));
            }
        }

        debug!(
            icld = self.cloud_overlap.flag(),
            permute_seed_lw = self.permute_seed_lw,
            permute_seed_sw = self.permute_seed_sw,
            "Validated radiation configuration"
        );
        Ok(())
    }

    /// The sub-column seed ranges `[seed, seed + ngpt)` of the two domains must
    /// not overlap
    ///
    /// `longwave_subcolumns` and `shortwave_subcolumns` are the sub-column
    /// counts of the solvers in use. [`RadiationConfig::validate`] checks the
    /// standard RRTMG counts.
    pub fn check_seeds(
        &self,
        longwave_subcolumns: usize,
        shortwave_subcolumns: usize,
    ) -> ClimradResult<()> {
        let lw = self.permute_seed_lw as i64;
        let sw = self.permute_seed_sw as i64;
        let overlaps =
            lw < sw + shortwave_subcolumns as i64 && sw < lw + longwave_subcolumns as i64;
        if overlaps {
            let required = if lw <= sw {
                longwave_subcolumns
            } else {
                shortwave_subcolumns
            };
            return Err(ClimradError::SeedCollision {
                longwave: self.permute_seed_lw,
                shortwave: self.permute_seed_sw,
                required,
            });
        }
        Ok(())
    }

    /// Check the static aerosol tables against the solver's band count
    pub fn check_band_counts(&self, domain: Domain, band_count: usize) -> ClimradResult<()> {
        match domain {
            Domain::Longwave => {
                if let Some(aerosol) = &self.aerosol_lw {
                    check_band_count("aerosol_lw.tau", domain, &aerosol.tau, band_count)?;
                }
            }
            Domain::Shortwave => {
                if let Some(aerosol) = &self.aerosol_sw {
                    check_band_count("aerosol_sw.tau", domain, &aerosol.tau, band_count)?;
                    check_band_count("aerosol_sw.ssa", domain, &aerosol.ssa, band_count)?;
                    check_band_count("aerosol_sw.asm", domain, &aerosol.asm, band_count)?;
                }
            }
        }
        Ok(())
    }

    pub fn permute_seed(&self, domain: Domain) -> i32 {
        match domain {
            Domain::Longwave => self.permute_seed_lw,
            Domain::Shortwave => self.permute_seed_sw,
        }
    }

    /// `idrv` flag passed to the solver
    pub fn derivative_flag(&self) -> i32 {
        i32::from(self.surface_derivative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{NBNDLW, NBNDSW};
    use climrad_core::errors::ErrorKind;

    #[test]
    fn test_default_is_valid() {
        let config = RadiationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.absorbers.co2, 380e-6);
        assert_eq!(config.surface.emissivity, 1.0);
        assert_eq!(config.derivative_flag(), 0);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = RadiationConfig::from_toml_str("").unwrap();
        assert_eq!(config, RadiationConfig::default());
    }

    #[test]
    fn test_ice_size_out_of_range() {
        let config = RadiationConfig {
            r_ice: 200.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(matches!(err, ClimradError::OutOfRange { .. }));
    }

    #[test]
    fn test_ice_size_valid_for_fu() {
        let config = RadiationConfig {
            r_ice: 135.0,
            ice_optics: IceOptics::Fu,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seed_collision() {
        let config = RadiationConfig {
            permute_seed_lw: 200,
            permute_seed_sw: 150,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        match err {
            ClimradError::SeedCollision { required, .. } => assert_eq!(required, NGPTSW),
            _ => panic!("Expected a seed collision"),
        }

        let config = RadiationConfig {
            permute_seed_lw: 0,
            permute_seed_sw: 139,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ClimradError::SeedCollision { required: NGPTLW, .. })
        ));
    }

    #[test]
    fn test_seeds_just_far_enough() {
        let config = RadiationConfig {
            permute_seed_lw: 0,
            permute_seed_sw: NGPTLW as i32,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_albedo() {
        let mut config = RadiationConfig::default();
        config.surface.asdir = 1.5;
        assert!(config.validate().unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_aerosol_band_counts() {
        let config = RadiationConfig {
            aerosol_lw: Some(LongwaveAerosol {
                tau: vec![0.01; NBNDSW],
            }),
            ..Default::default()
        };
        assert!(config.check_band_counts(Domain::Shortwave, NBNDSW).is_ok());
        let err = config
            .check_band_counts(Domain::Longwave, NBNDLW)
            .unwrap_err();
        assert!(matches!(
            err,
            ClimradError::BandCountMismatch {
                expected: 16,
                found: 14,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_toml() {
        let err = RadiationConfig::from_toml_str("cloud_overlap = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ClimradError::Configuration(_)));

        let err = RadiationConfig::from_toml_str("r_liq = 100.0").unwrap_err();
        assert!(matches!(err, ClimradError::OutOfRange { .. }));
    }
}
