//! Assembly of the solver argument lists.
//!
//! The RRTMG drivers take a long, fixed list of positional arguments. This
//! module builds strongly typed [`LongwaveArguments`] and
//! [`ShortwaveArguments`] from the host state and the configuration. The
//! positional layout only exists in the `positional()` adapters.
//!
//! All arrays held by the argument structs are in solver order (index 0 at
//! the surface). Every check happens here, before a solver is called.

use crate::config::RadiationConfig;
use crate::driver::{Domain, NAEREC};
use crate::fields::{gas_profile, CloudFields, Gas};
use crate::ordering::{reverse_vertical, to_solver_order};
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::standard_variables::{
    VAR_COSZEN, VAR_DAY_OF_YEAR, VAR_IRRADIANCE_FACTOR, VAR_TATM, VAR_TS,
};
use climrad_core::state::{InputState, StateValue};
use climrad_core::FloatValue;
use ndarray::{Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

/// Input holding the longwave in-cloud optical depth, `(nbnd, ncol, nlay)`
pub const INPUT_TAUC_LW: &str = "tauc_lw";
/// Input holding the shortwave in-cloud optical depth, `(nbnd, ncol, nlay)`
pub const INPUT_TAUC_SW: &str = "tauc_sw";
/// Shortwave in-cloud single scattering albedo
pub const INPUT_SSAC_SW: &str = "ssac_sw";
/// Shortwave in-cloud asymmetry parameter
pub const INPUT_ASMC_SW: &str = "asmc_sw";
/// Shortwave in-cloud forward scattering fraction
pub const INPUT_FSFC_SW: &str = "fsfc_sw";

/// Argument names of the longwave driver, in call order
pub const LONGWAVE_ARGUMENT_ORDER: [&str; 32] = [
    "ncol",
    "nlay",
    "icld",
    "permuteseed",
    "irng",
    "idrv",
    "play",
    "plev",
    "tlay",
    "tlev",
    "tsfc",
    "h2ovmr",
    "o3vmr",
    "co2vmr",
    "ch4vmr",
    "n2ovmr",
    "o2vmr",
    "cfc11vmr",
    "cfc12vmr",
    "cfc22vmr",
    "ccl4vmr",
    "emis",
    "inflglw",
    "iceflglw",
    "liqflglw",
    "cldfrac",
    "ciwp",
    "clwp",
    "reic",
    "relq",
    "tauc",
    "tauaer",
];

/// Argument names of the shortwave driver, in call order
pub const SHORTWAVE_ARGUMENT_ORDER: [&str; 42] = [
    "ncol",
    "nlay",
    "icld",
    "iaer",
    "permuteseed",
    "irng",
    "idrv",
    "play",
    "plev",
    "tlay",
    "tlev",
    "tsfc",
    "h2ovmr",
    "o3vmr",
    "co2vmr",
    "ch4vmr",
    "n2ovmr",
    "o2vmr",
    "asdir",
    "asdif",
    "aldir",
    "aldif",
    "coszen",
    "adjes",
    "dyofyr",
    "scon",
    "inflgsw",
    "iceflgsw",
    "liqflgsw",
    "cldfrac",
    "ciwp",
    "clwp",
    "reic",
    "relq",
    "tauc",
    "ssac",
    "asmc",
    "fsfc",
    "tauaer",
    "ssaaer",
    "asmaer",
    "ecaer",
];

/// A single positional argument, borrowed from the argument struct
#[derive(Debug, Clone, PartialEq)]
pub enum Argument<'a> {
    Int(i32),
    Float(FloatValue),
    Column(ArrayView1<'a, FloatValue>),
    Profile(ArrayView2<'a, FloatValue>),
    Spectral(ArrayView3<'a, FloatValue>),
}

impl Argument<'_> {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Argument::Int(_) | Argument::Float(_) => vec![],
            Argument::Column(v) => v.shape().to_vec(),
            Argument::Profile(v) => v.shape().to_vec(),
            Argument::Spectral(v) => v.shape().to_vec(),
        }
    }
}

/// Temperatures at layer interfaces, in host order `(ncol, nlay + 1)`
///
/// Interior interfaces are interpolated linearly in pressure between the two
/// adjacent layer midpoints. The top interface takes the temperature of the
/// top layer and the bottom interface takes the surface temperature.
pub fn interface_temperatures(
    lev: &Array1<FloatValue>,
    lev_bounds: &Array1<FloatValue>,
    tatm: &Array2<FloatValue>,
    ts: &Array1<FloatValue>,
) -> Array2<FloatValue> {
    let (ncol, nlay) = tatm.dim();
    let mut tlev = Array2::zeros((ncol, nlay + 1));
    for i in 0..ncol {
        tlev[[i, 0]] = tatm[[i, 0]];
        for k in 1..nlay {
            let weight = (lev_bounds[k] - lev[k - 1]) / (lev[k] - lev[k - 1]);
            tlev[[i, k]] = tatm[[i, k - 1]] + weight * (tatm[[i, k]] - tatm[[i, k - 1]]);
        }
        tlev[[i, nlay]] = ts[i];
    }
    tlev
}

/// Volume mixing ratios in solver order, each `(ncol, nlay)`
#[derive(Debug, Clone, PartialEq)]
pub struct GasProfiles {
    pub h2ovmr: Array2<FloatValue>,
    pub o3vmr: Array2<FloatValue>,
    pub co2vmr: Array2<FloatValue>,
    pub ch4vmr: Array2<FloatValue>,
    pub n2ovmr: Array2<FloatValue>,
    pub o2vmr: Array2<FloatValue>,
    pub cfc11vmr: Array2<FloatValue>,
    pub cfc12vmr: Array2<FloatValue>,
    pub cfc22vmr: Array2<FloatValue>,
    pub ccl4vmr: Array2<FloatValue>,
}

/// Pressure, temperature, gas and cloud profiles shared by both domains
#[derive(Debug, Clone, PartialEq)]
struct ColumnProfiles {
    ncol: usize,
    nlay: usize,
    play: Array2<FloatValue>,
    plev: Array2<FloatValue>,
    tlay: Array2<FloatValue>,
    tlev: Array2<FloatValue>,
    tsfc: Array1<FloatValue>,
    gases: GasProfiles,
    clouds: CloudFields,
}

fn check_temperatures(field: &str, values: &Array2<FloatValue>) -> ClimradResult<()> {
    match values.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
        Some(t) => Err(ClimradError::InvalidValue {
            field: field.to_string(),
            reason: format!("temperatures must be finite and positive, found {}", t),
        }),
        None => Ok(()),
    }
}

impl ColumnProfiles {
    fn from_input(input: &InputState, config: &RadiationConfig) -> ClimradResult<Self> {
        let grid = input.grid();
        let nlay = grid.nlay();

        let tatm = input.variable(VAR_TATM.name)?.values();
        let ncol = tatm.nrows();
        if ncol == 0 || tatm.ncols() != nlay {
            return Err(ClimradError::ShapeMismatch {
                field: VAR_TATM.name.to_string(),
                expected: vec![ncol.max(1), nlay],
                found: tatm.shape().to_vec(),
            });
        }
        let ts = input.variable(VAR_TS.name)?.values();
        if ts.dim() != (ncol, 1) {
            return Err(ClimradError::ShapeMismatch {
                field: VAR_TS.name.to_string(),
                expected: vec![ncol, 1],
                found: ts.shape().to_vec(),
            });
        }
        check_temperatures(VAR_TATM.name, tatm)?;
        check_temperatures(VAR_TS.name, ts)?;
        let ts = ts.column(0).to_owned();

        let play = Array2::from_shape_fn((ncol, nlay), |(_, k)| grid.lev()[k]);
        let plev = Array2::from_shape_fn((ncol, nlay + 1), |(_, k)| grid.lev_bounds()[k]);
        let tlev = interface_temperatures(grid.lev(), grid.lev_bounds(), tatm, &ts);
        check_temperatures("tlev", &tlev)?;

        let gas = |gas: Gas| -> ClimradResult<Array2<FloatValue>> {
            Ok(to_solver_order(&gas_profile(input, config, gas, ncol, nlay)?))
        };
        let gases = GasProfiles {
            h2ovmr: gas(Gas::H2o)?,
            o3vmr: gas(Gas::O3)?,
            co2vmr: gas(Gas::Co2)?,
            ch4vmr: gas(Gas::Ch4)?,
            n2ovmr: gas(Gas::N2o)?,
            o2vmr: gas(Gas::O2)?,
            cfc11vmr: gas(Gas::Cfc11)?,
            cfc12vmr: gas(Gas::Cfc12)?,
            cfc22vmr: gas(Gas::Cfc22)?,
            ccl4vmr: gas(Gas::Ccl4)?,
        };

        let clouds = CloudFields::from_input(input, config, ncol, nlay)?;
        let clouds = CloudFields {
            cldfrac: to_solver_order(&clouds.cldfrac),
            ciwp: to_solver_order(&clouds.ciwp),
            clwp: to_solver_order(&clouds.clwp),
            reic: to_solver_order(&clouds.reic),
            relq: to_solver_order(&clouds.relq),
        };

        Ok(Self {
            ncol,
            nlay,
            play: to_solver_order(&play),
            plev: to_solver_order(&plev),
            tlay: to_solver_order(tatm),
            tlev: to_solver_order(&tlev),
            tsfc: ts,
            gases,
            clouds,
        })
    }
}

/// Read an in-cloud optical property shaped `(nbnd, ncol, nlay)`
///
/// Scalars and `(ncol, nlay)` profiles are repeated over every band. Absent
/// inputs are zero. The result is in solver order.
fn cloud_optical_property(
    input: &InputState,
    name: &str,
    domain: Domain,
    (nbnd, ncol, nlay): (usize, usize, usize),
    (min, max): (FloatValue, FloatValue),
) -> ClimradResult<Array3<FloatValue>> {
    let property = match input.get(name) {
        None => return Ok(Array3::zeros((nbnd, ncol, nlay))),
        Some(StateValue::Spectral(values)) => {
            if values.len_of(Axis(0)) != nbnd {
                return Err(ClimradError::BandCountMismatch {
                    field: name.to_string(),
                    domain: domain.to_string(),
                    expected: nbnd,
                    found: values.len_of(Axis(0)),
                });
            }
            if values.dim() != (nbnd, ncol, nlay) {
                return Err(ClimradError::ShapeMismatch {
                    field: name.to_string(),
                    expected: vec![nbnd, ncol, nlay],
                    found: values.shape().to_vec(),
                });
            }
            reverse_vertical(values, Axis(2))
        }
        Some(value) => {
            let profile = to_solver_order(&value.broadcast_levels(name, ncol, nlay)?);
            Array3::from_shape_fn((nbnd, ncol, nlay), |(_, i, k)| profile[[i, k]])
        }
    };
    if let Some(v) = property.iter().find(|v| !(**v >= min && **v <= max)) {
        return Err(ClimradError::InvalidValue {
            field: name.to_string(),
            reason: format!("values must lie in [{}, {}], found {}", min, max, v),
        });
    }
    Ok(property)
}

/// Repeat per-band values over every column and layer, `(ncol, nlay, nbnd)`
fn per_band(values: Option<&Vec<FloatValue>>, (ncol, nlay, nbnd): (usize, usize, usize)) -> Array3<FloatValue> {
    match values {
        Some(values) => Array3::from_shape_fn((ncol, nlay, nbnd), |(_, _, b)| values[b]),
        None => Array3::zeros((ncol, nlay, nbnd)),
    }
}

/// Arguments of the longwave driver
#[derive(Debug, Clone, PartialEq)]
pub struct LongwaveArguments {
    pub ncol: usize,
    pub nlay: usize,
    pub icld: i32,
    pub permuteseed: i32,
    pub irng: i32,
    pub idrv: i32,
    /// Layer pressures (hPa), `(ncol, nlay)`
    pub play: Array2<FloatValue>,
    /// Interface pressures (hPa), `(ncol, nlay + 1)`
    pub plev: Array2<FloatValue>,
    /// Layer temperatures (K), `(ncol, nlay)`
    pub tlay: Array2<FloatValue>,
    /// Interface temperatures (K), `(ncol, nlay + 1)`
    pub tlev: Array2<FloatValue>,
    /// Surface temperature (K), `(ncol)`
    pub tsfc: Array1<FloatValue>,
    pub gases: GasProfiles,
    /// Surface emissivity, `(ncol, nbnd)`
    pub emis: Array2<FloatValue>,
    pub inflglw: i32,
    pub iceflglw: i32,
    pub liqflglw: i32,
    pub clouds: CloudFields,
    /// In-cloud optical depth, `(nbnd, ncol, nlay)`
    pub tauc: Array3<FloatValue>,
    /// Aerosol optical depth, `(ncol, nlay, nbnd)`
    pub tauaer: Array3<FloatValue>,
}

impl LongwaveArguments {
    /// Build the longwave arguments for a solver with `band_count` bands
    pub fn assemble(
        input: &InputState,
        config: &RadiationConfig,
        band_count: usize,
    ) -> ClimradResult<Self> {
        let profiles = ColumnProfiles::from_input(input, config)?;
        let (ncol, nlay) = (profiles.ncol, profiles.nlay);

        let tauc = cloud_optical_property(
            input,
            INPUT_TAUC_LW,
            Domain::Longwave,
            (band_count, ncol, nlay),
            (0.0, FloatValue::INFINITY),
        )?;
        config.check_band_counts(Domain::Longwave, band_count)?;
        let tauaer = per_band(
            config.aerosol_lw.as_ref().map(|a| &a.tau),
            (ncol, nlay, band_count),
        );

        Ok(Self {
            ncol,
            nlay,
            icld: config.cloud_overlap.flag(),
            permuteseed: config.permute_seed_lw,
            irng: config.random_generator.flag(),
            idrv: config.derivative_flag(),
            play: profiles.play,
            plev: profiles.plev,
            tlay: profiles.tlay,
            tlev: profiles.tlev,
            tsfc: profiles.tsfc,
            gases: profiles.gases,
            emis: Array2::from_elem((ncol, band_count), config.surface.emissivity),
            inflglw: config.cloud_properties.flag(),
            iceflglw: config.ice_optics.flag(),
            liqflglw: config.liquid_optics.flag(),
            clouds: profiles.clouds,
            tauc,
            tauaer,
        })
    }

    /// The arguments in driver call order, paired with their names
    pub fn positional(&self) -> Vec<(&'static str, Argument<'_>)> {
        let gases = &self.gases;
        let clouds = &self.clouds;
        let values = vec![
            Argument::Int(self.ncol as i32),
            Argument::Int(self.nlay as i32),
            Argument::Int(self.icld),
            Argument::Int(self.permuteseed),
            Argument::Int(self.irng),
            Argument::Int(self.idrv),
            Argument::Profile(self.play.view()),
            Argument::Profile(self.plev.view()),
            Argument::Profile(self.tlay.view()),
            Argument::Profile(self.tlev.view()),
            Argument::Column(self.tsfc.view()),
            Argument::Profile(gases.h2ovmr.view()),
            Argument::Profile(gases.o3vmr.view()),
            Argument::Profile(gases.co2vmr.view()),
            Argument::Profile(gases.ch4vmr.view()),
            Argument::Profile(gases.n2ovmr.view()),
            Argument::Profile(gases.o2vmr.view()),
            Argument::Profile(gases.cfc11vmr.view()),
            Argument::Profile(gases.cfc12vmr.view()),
            Argument::Profile(gases.cfc22vmr.view()),
            Argument::Profile(gases.ccl4vmr.view()),
            Argument::Profile(self.emis.view()),
            Argument::Int(self.inflglw),
            Argument::Int(self.iceflglw),
            Argument::Int(self.liqflglw),
            Argument::Profile(clouds.cldfrac.view()),
            Argument::Profile(clouds.ciwp.view()),
            Argument::Profile(clouds.clwp.view()),
            Argument::Profile(clouds.reic.view()),
            Argument::Profile(clouds.relq.view()),
            Argument::Spectral(self.tauc.view()),
            Argument::Spectral(self.tauaer.view()),
        ];
        LONGWAVE_ARGUMENT_ORDER.into_iter().zip(values).collect()
    }
}

/// Arguments of the shortwave driver
#[derive(Debug, Clone, PartialEq)]
pub struct ShortwaveArguments {
    pub ncol: usize,
    pub nlay: usize,
    pub icld: i32,
    pub iaer: i32,
    pub permuteseed: i32,
    pub irng: i32,
    pub idrv: i32,
    pub play: Array2<FloatValue>,
    pub plev: Array2<FloatValue>,
    pub tlay: Array2<FloatValue>,
    pub tlev: Array2<FloatValue>,
    pub tsfc: Array1<FloatValue>,
    /// Only the first six gases are passed to the shortwave driver
    pub gases: GasProfiles,
    pub asdir: Array1<FloatValue>,
    pub asdif: Array1<FloatValue>,
    pub aldir: Array1<FloatValue>,
    pub aldif: Array1<FloatValue>,
    /// Cosine of the solar zenith angle, `(ncol)`
    pub coszen: Array1<FloatValue>,
    /// Earth-sun distance factor, used when `dyofyr` is zero
    pub adjes: FloatValue,
    pub dyofyr: i32,
    pub scon: FloatValue,
    pub inflgsw: i32,
    pub iceflgsw: i32,
    pub liqflgsw: i32,
    pub clouds: CloudFields,
    /// In-cloud properties, `(nbnd, ncol, nlay)`
    pub tauc: Array3<FloatValue>,
    pub ssac: Array3<FloatValue>,
    pub asmc: Array3<FloatValue>,
    pub fsfc: Array3<FloatValue>,
    /// Aerosol properties, `(ncol, nlay, nbnd)`
    pub tauaer: Array3<FloatValue>,
    pub ssaaer: Array3<FloatValue>,
    pub asmaer: Array3<FloatValue>,
    /// ECMWF aerosol optical depth, `(ncol, nlay, 6)`
    pub ecaer: Array3<FloatValue>,
}

fn required_scalar(input: &InputState, name: &str) -> ClimradResult<FloatValue> {
    match input.require(name)? {
        StateValue::Scalar(v) if v.is_finite() => Ok(*v),
        StateValue::Scalar(v) => Err(ClimradError::InvalidValue {
            field: name.to_string(),
            reason: format!("expected a finite value, found {}", v),
        }),
        other => Err(ClimradError::ShapeMismatch {
            field: name.to_string(),
            expected: vec![],
            found: other.shape(),
        }),
    }
}

impl ShortwaveArguments {
    /// Build the shortwave arguments for a solver with `band_count` bands
    ///
    /// The solar geometry (`coszen`, `irradiance_factor` and `day_of_year`)
    /// must be present in the host state.
    pub fn assemble(
        input: &InputState,
        config: &RadiationConfig,
        band_count: usize,
    ) -> ClimradResult<Self> {
        let coszen_value = input.require(VAR_COSZEN.name)?;
        let adjes = required_scalar(input, VAR_IRRADIANCE_FACTOR.name)?;
        let day_of_year = required_scalar(input, VAR_DAY_OF_YEAR.name)?;

        let profiles = ColumnProfiles::from_input(input, config)?;
        let (ncol, nlay) = (profiles.ncol, profiles.nlay);

        let coszen = coszen_value.broadcast_columns(VAR_COSZEN.name, ncol)?;
        if let Some(mu) = coszen.iter().find(|mu| !(**mu >= -1.0 && **mu <= 1.0)) {
            return Err(ClimradError::InvalidValue {
                field: VAR_COSZEN.name.to_string(),
                reason: format!("cosine of the zenith angle must lie in [-1, 1], found {}", mu),
            });
        }
        if adjes <= 0.0 {
            return Err(ClimradError::InvalidValue {
                field: VAR_IRRADIANCE_FACTOR.name.to_string(),
                reason: format!("expected a positive factor, found {}", adjes),
            });
        }
        if day_of_year.fract() != 0.0 || !(0.0..=366.0).contains(&day_of_year) {
            return Err(ClimradError::InvalidValue {
                field: VAR_DAY_OF_YEAR.name.to_string(),
                reason: format!("expected a whole day between 0 and 366, found {}", day_of_year),
            });
        }

        let shape = (band_count, ncol, nlay);
        let tauc = cloud_optical_property(
            input,
            INPUT_TAUC_SW,
            Domain::Shortwave,
            shape,
            (0.0, FloatValue::INFINITY),
        )?;
        let ssac = cloud_optical_property(input, INPUT_SSAC_SW, Domain::Shortwave, shape, (0.0, 1.0))?;
        let asmc = cloud_optical_property(input, INPUT_ASMC_SW, Domain::Shortwave, shape, (-1.0, 1.0))?;
        let fsfc = cloud_optical_property(input, INPUT_FSFC_SW, Domain::Shortwave, shape, (0.0, 1.0))?;

        config.check_band_counts(Domain::Shortwave, band_count)?;
        let aerosol = config.aerosol_sw.as_ref();
        let aerosol_shape = (ncol, nlay, band_count);
        let surface = &config.surface;

        Ok(Self {
            ncol,
            nlay,
            icld: config.cloud_overlap.flag(),
            iaer: config.aerosol_mode.flag(),
            permuteseed: config.permute_seed_sw,
            irng: config.random_generator.flag(),
            idrv: config.derivative_flag(),
            play: profiles.play,
            plev: profiles.plev,
            tlay: profiles.tlay,
            tlev: profiles.tlev,
            tsfc: profiles.tsfc,
            gases: profiles.gases,
            asdir: Array1::from_elem(ncol, surface.asdir),
            asdif: Array1::from_elem(ncol, surface.asdif),
            aldir: Array1::from_elem(ncol, surface.aldir),
            aldif: Array1::from_elem(ncol, surface.aldif),
            coszen,
            adjes,
            dyofyr: day_of_year as i32,
            scon: config.solar_constant,
            inflgsw: config.cloud_properties.flag(),
            iceflgsw: config.ice_optics.flag(),
            liqflgsw: config.liquid_optics.flag(),
            clouds: profiles.clouds,
            tauc,
            ssac,
            asmc,
            fsfc,
            tauaer: per_band(aerosol.map(|a| &a.tau), aerosol_shape),
            ssaaer: per_band(aerosol.map(|a| &a.ssa), aerosol_shape),
            asmaer: per_band(aerosol.map(|a| &a.asm), aerosol_shape),
            ecaer: per_band(config.aerosol_ecmwf.as_ref(), (ncol, nlay, NAEREC)),
        })
    }

    /// The arguments in driver call order, paired with their names
    pub fn positional(&self) -> Vec<(&'static str, Argument<'_>)> {
        let gases = &self.gases;
        let clouds = &self.clouds;
        let values = vec![
            Argument::Int(self.ncol as i32),
            Argument::Int(self.nlay as i32),
            Argument::Int(self.icld),
            Argument::Int(self.iaer),
            Argument::Int(self.permuteseed),
            Argument::Int(self.irng),
            Argument::Int(self.idrv),
            Argument::Profile(self.play.view()),
            Argument::Profile(self.plev.view()),
            Argument::Profile(self.tlay.view()),
            Argument::Profile(self.tlev.view()),
            Argument::Column(self.tsfc.view()),
            Argument::Profile(gases.h2ovmr.view()),
            Argument::Profile(gases.o3vmr.view()),
            Argument::Profile(gases.co2vmr.view()),
            Argument::Profile(gases.ch4vmr.view()),
            Argument::Profile(gases.n2ovmr.view()),
            Argument::Profile(gases.o2vmr.view()),
            Argument::Column(self.asdir.view()),
            Argument::Column(self.asdif.view()),
            Argument::Column(self.aldir.view()),
            Argument::Column(self.aldif.view()),
            Argument::Column(self.coszen.view()),
            Argument::Float(self.adjes),
            Argument::Int(self.dyofyr),
            Argument::Float(self.scon),
            Argument::Int(self.inflgsw),
            Argument::Int(self.iceflgsw),
            Argument::Int(self.liqflgsw),
            Argument::Profile(clouds.cldfrac.view()),
            Argument::Profile(clouds.ciwp.view()),
            Argument::Profile(clouds.clwp.view()),
            Argument::Profile(clouds.reic.view()),
            Argument::Profile(clouds.relq.view()),
            Argument::Spectral(self.tauc.view()),
            Argument::Spectral(self.ssac.view()),
            Argument::Spectral(self.asmc.view()),
            Argument::Spectral(self.fsfc.view()),
            Argument::Spectral(self.tauaer.view()),
            Argument::Spectral(self.ssaaer.view()),
            Argument::Spectral(self.asmaer.view()),
            Argument::Spectral(self.ecaer.view()),
        ];
        SHORTWAVE_ARGUMENT_ORDER.into_iter().zip(values).collect()
    }
}
