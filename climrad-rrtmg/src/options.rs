//! Integer option flags understood by RRTMG.
//!
//! Each option is a closed enum. Conversion to the solver's integer flag is
//! infallible, while conversion from an integer rejects anything outside the
//! documented set.

use climrad_core::errors::ClimradError;
use climrad_core::FloatValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Implement `flag()` and `TryFrom<i32>` for a one-to-one flag enum
macro_rules! flag_enum {
    ($ty:ident, $option:expr, { $($variant:ident => $flag:literal),+ $(,)? }) => {
        impl $ty {
            /// Integer flag passed to the solver
            pub fn flag(&self) -> i32 {
                match self {
                    $($ty::$variant => $flag,)+
                }
            }
        }

        impl TryFrom<i32> for $ty {
            type Error = ClimradError;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                match value {
                    $($flag => Ok($ty::$variant),)+
                    _ => Err(ClimradError::InvalidFlag {
                        option: $option.to_string(),
                        value: value as i64,
                        expected: [$($flag.to_string()),+].join(", "),
                    }),
                }
            }
        }
    };
}

/// Cloud overlap assumption used by the McICA sub-column generator (`icld`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudOverlap {
    /// Clouds are ignored entirely
    ClearOnly,
    #[default]
    Random,
    MaximumRandom,
    Maximum,
}

flag_enum!(CloudOverlap, "icld", {
    ClearOnly => 0,
    Random => 1,
    MaximumRandom => 2,
    Maximum => 3,
});

/// How cloud optical properties are specified (`inflglw` / `inflgsw`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudPropertyMode {
    /// In-cloud optical depth is supplied directly
    Explicit,
    /// Optical depth derived from the combined ice and liquid water path
    Combined,
    /// Ice and liquid optical properties computed separately
    #[default]
    Separate,
}

flag_enum!(CloudPropertyMode, "inflg", {
    Explicit => 0,
    Combined => 1,
    Separate => 2,
});

/// Random number generator used for sub-column sampling (`irng`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomGenerator {
    Kiss,
    #[default]
    MersenneTwister,
}

flag_enum!(RandomGenerator, "irng", {
    Kiss => 0,
    MersenneTwister => 1,
});

/// Shortwave aerosol treatment (`iaer`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AerosolMode {
    None,
    /// ECMWF aerosol climatology, optical depth at 0.55 micron for six types
    Ecmwf,
    /// Per-band optical depth, single scattering albedo and asymmetry
    #[default]
    Explicit,
}

flag_enum!(AerosolMode, "iaer", {
    None => 0,
    Ecmwf => 6,
    Explicit => 10,
});

/// Liquid cloud optics (`liqflglw` / `liqflgsw`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidOptics {
    Ccm3,
    #[default]
    HuStamnes,
}

flag_enum!(LiquidOptics, "liqflg", {
    Ccm3 => 0,
    HuStamnes => 1,
});

impl LiquidOptics {
    /// Valid liquid effective radius in microns (inclusive)
    pub fn valid_range(&self) -> (FloatValue, FloatValue) {
        match self {
            LiquidOptics::Ccm3 => (0.0, FloatValue::INFINITY),
            LiquidOptics::HuStamnes => (2.5, 60.0),
        }
    }
}

impl fmt::Display for LiquidOptics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiquidOptics::Ccm3 => write!(f, "CCM3 liquid"),
            LiquidOptics::HuStamnes => write!(f, "Hu-Stamnes"),
        }
    }
}

/// Ice cloud optics (`iceflglw` / `iceflgsw`)
///
/// The Ebert-Curry parameterisation is implemented with different effective
/// size limits in the longwave and shortwave solvers, so it is exposed as two
/// variants that share flag 1 but validate against different ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IceOptics {
    /// Ice effective radius, at least 10 microns
    Ccm3,
    /// Ebert-Curry with the 10-30 micron limits
    EbertCurryNarrow,
    /// Ebert-Curry with the 13-130 micron limits
    #[default]
    EbertCurryWide,
    /// Key (Streamer) ice effective radius, 5-131 microns
    Streamer,
    /// Fu generalised effective size, 5-140 microns
    Fu,
}

impl IceOptics {
    pub fn flag(&self) -> i32 {
        match self {
            IceOptics::Ccm3 => 0,
            IceOptics::EbertCurryNarrow | IceOptics::EbertCurryWide => 1,
            IceOptics::Streamer => 2,
            IceOptics::Fu => 3,
        }
    }

    /// Valid ice effective size in microns (inclusive)
    pub fn valid_range(&self) -> (FloatValue, FloatValue) {
        match self {
            IceOptics::Ccm3 => (10.0, FloatValue::INFINITY),
            IceOptics::EbertCurryNarrow => (10.0, 30.0),
            IceOptics::EbertCurryWide => (13.0, 130.0),
            IceOptics::Streamer => (5.0, 131.0),
            IceOptics::Fu => (5.0, 140.0),
        }
    }
}

/// Flag 1 maps to the wide Ebert-Curry limits
impl TryFrom<i32> for IceOptics {
    type Error = ClimradError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IceOptics::Ccm3),
            1 => Ok(IceOptics::EbertCurryWide),
            2 => Ok(IceOptics::Streamer),
            3 => Ok(IceOptics::Fu),
            _ => Err(ClimradError::InvalidFlag {
                option: "iceflg".to_string(),
                value: value as i64,
                expected: "0, 1, 2, 3".to_string(),
            }),
        }
    }
}

impl fmt::Display for IceOptics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IceOptics::Ccm3 => "CCM3 ice",
            IceOptics::EbertCurryNarrow => "Ebert-Curry (10-30 micron)",
            IceOptics::EbertCurryWide => "Ebert-Curry (13-130 micron)",
            IceOptics::Streamer => "Streamer",
            IceOptics::Fu => "Fu",
        };
        write!(f, "{}", name)
    }
}

/// Check that an effective size lies inside `range`
pub(crate) fn check_range(
    parameter: &str,
    scheme: &dyn fmt::Display,
    value: FloatValue,
    (min, max): (FloatValue, FloatValue),
) -> Result<(), ClimradError> {
    // NaN fails both comparisons and is rejected
    if value >= min && value <= max && value > 0.0 {
        Ok(())
    } else {
        Err(ClimradError::OutOfRange {
            parameter: parameter.to_string(),
            scheme: scheme.to_string(),
            value,
            min,
            max,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(CloudOverlap::default().flag(), 1);
        assert_eq!(CloudPropertyMode::default().flag(), 2);
        assert_eq!(IceOptics::default().flag(), 1);
        assert_eq!(LiquidOptics::default().flag(), 1);
        assert_eq!(RandomGenerator::default().flag(), 1);
        assert_eq!(AerosolMode::default().flag(), 10);
    }

    #[test]
    fn test_flag_roundtrip() {
        for flag in 0..4 {
            assert_eq!(CloudOverlap::try_from(flag).unwrap().flag(), flag);
        }
        assert_eq!(AerosolMode::try_from(6).unwrap(), AerosolMode::Ecmwf);
        assert_eq!(IceOptics::try_from(1).unwrap(), IceOptics::EbertCurryWide);
    }

    #[test]
    fn test_invalid_flags() {
        let err = CloudOverlap::try_from(4).unwrap_err();
        assert!(err.is_configuration_error());
        assert_eq!(
            err.to_string(),
            "Invalid value 4 for icld. Expected one of 0, 1, 2, 3"
        );
        assert!(AerosolMode::try_from(5).is_err());
        assert!(IceOptics::try_from(-1).is_err());
        assert!(LiquidOptics::try_from(2).is_err());
        assert!(RandomGenerator::try_from(3).is_err());
        assert!(CloudPropertyMode::try_from(3).is_err());
    }

    #[test]
    fn test_ice_ranges() {
        let scheme = IceOptics::EbertCurryWide;
        assert!(check_range("r_ice", &scheme, 20.0, scheme.valid_range()).is_ok());
        assert!(check_range("r_ice", &scheme, 13.0, scheme.valid_range()).is_ok());
        assert!(check_range("r_ice", &scheme, 200.0, scheme.valid_range()).is_err());
        assert!(check_range("r_ice", &scheme, FloatValue::NAN, scheme.valid_range()).is_err());

        let narrow = IceOptics::EbertCurryNarrow;
        assert!(check_range("r_ice", &narrow, 40.0, narrow.valid_range()).is_err());
    }

    #[test]
    fn test_liquid_ranges() {
        let ccm3 = LiquidOptics::Ccm3;
        assert!(check_range("r_liq", &ccm3, 1000.0, ccm3.valid_range()).is_ok());
        assert!(check_range("r_liq", &ccm3, 0.0, ccm3.valid_range()).is_err());

        let hu = LiquidOptics::HuStamnes;
        assert!(check_range("r_liq", &hu, 2.0, hu.valid_range()).is_err());
    }

    #[test]
    fn test_serde_names() {
        let overlap: CloudOverlap = serde_json::from_str("\"maximum_random\"").unwrap();
        assert_eq!(overlap, CloudOverlap::MaximumRandom);
        assert_eq!(
            serde_json::to_string(&IceOptics::EbertCurryWide).unwrap(),
            "\"ebert_curry_wide\""
        );
    }
}
