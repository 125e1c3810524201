//! Gray reference drivers.
//!
//! [`GrayLongwave`] and [`GrayShortwave`] implement the driver traits with a
//! band-independent two-stream scheme. They accept exactly the arguments the
//! RRTMG drivers accept and return results with the same shapes and order, so
//! the whole coupling can run and be tested without the Fortran library.
//!
//! The physics is intentionally simple:
//!
//! - Longwave: a gray optical depth per layer from the pressure thickness and
//!   the CO2 and water vapour amounts, with upward and downward Schwarzschild
//!   sweeps using the diffusivity approximation $t = e^{-D \tau}$.
//! - Shortwave: Beer-Lambert attenuation of the direct beam along the slant
//!   path, reflection at the surface and attenuation of the reflected diffuse
//!   flux on the way up.
//!
//! Clouds add their optical depth weighted by the cloud fraction. Heating rates
//! follow $\frac{g}{c_p} \frac{\Delta F_{net}}{\Delta p} \cdot 86400$ so that
//! the heating of a column balances the net flux divergence exactly.

use crate::arguments::{LongwaveArguments, ShortwaveArguments};
use crate::driver::{LongwaveDriver, RadiativeFluxes, ShortwaveDriver, NBNDLW, NBNDSW};
use crate::fields::CloudFields;
use climrad_core::constants::{GRAVITY, MB_TO_PA, SECONDS_PER_DAY, STEFAN_BOLTZMANN};
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::FloatValue;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Diffusivity factor of the two-stream approximation
const DIFFUSIVITY: FloatValue = 1.66;

/// Fluxes of a single column in solver order
struct ColumnFluxes {
    up: Vec<FloatValue>,
    down: Vec<FloatValue>,
    derivative: Vec<FloatValue>,
}

fn check_cp(domain: &str, cp: FloatValue) -> ClimradResult<()> {
    if cp.is_finite() && cp > 0.0 {
        Ok(())
    } else {
        Err(ClimradError::SolverFailure {
            domain: domain.to_string(),
            message: format!("invalid heat capacity of air {}", cp),
        })
    }
}

/// Store `cp` on first initialisation; re-initialising with another value fails
fn store_cp(cell: &OnceLock<FloatValue>, domain: &str, cp: FloatValue) -> ClimradResult<()> {
    check_cp(domain, cp)?;
    let stored = *cell.get_or_init(|| cp);
    if stored != cp {
        return Err(ClimradError::SolverFailure {
            domain: domain.to_string(),
            message: format!("already initialised with cp={}, got cp={}", stored, cp),
        });
    }
    Ok(())
}

fn stored_cp(cell: &OnceLock<FloatValue>, domain: &str) -> ClimradResult<FloatValue> {
    cell.get()
        .copied()
        .ok_or_else(|| ClimradError::NotInitialised(domain.to_string()))
}

/// Layer pressure thickness (hPa) of column `i`, in solver order
fn layer_thickness(plev: &Array2<FloatValue>, i: usize) -> Vec<FloatValue> {
    (0..plev.ncols() - 1)
        .map(|k| plev[[i, k]] - plev[[i, k + 1]])
        .collect()
}

/// Heating rate (K / day) of each layer from the net upward flux at interfaces
fn heating_rates(net_up: &[FloatValue], dp: &[FloatValue], cp: FloatValue) -> Vec<FloatValue> {
    dp.iter()
        .enumerate()
        .map(|(k, dp)| GRAVITY / cp * (net_up[k] - net_up[k + 1]) / (dp * MB_TO_PA) * SECONDS_PER_DAY)
        .collect()
}

/// Grid-box mean cloud optical depth of layer `k` in column `i`
///
/// Explicit mode (`inflg == 0`) uses the band mean of the supplied in-cloud
/// optical depth. Otherwise the optical depth is proportional to the water
/// paths. Clear-only overlap (`icld == 0`) ignores clouds.
#[allow(clippy::too_many_arguments)]
fn cloud_optical_depth(
    icld: i32,
    inflg: i32,
    clouds: &CloudFields,
    tauc: &Array3<FloatValue>,
    k_liquid: FloatValue,
    k_ice: FloatValue,
    i: usize,
    k: usize,
) -> FloatValue {
    let fraction = clouds.cldfrac[[i, k]];
    if icld == 0 || fraction == 0.0 {
        return 0.0;
    }
    let in_cloud = if inflg == 0 {
        let nbnd = tauc.shape()[0];
        (0..nbnd).map(|b| tauc[[b, i, k]]).sum::<FloatValue>() / nbnd as FloatValue
    } else {
        k_liquid * clouds.clwp[[i, k]] + k_ice * clouds.ciwp[[i, k]]
    };
    fraction * in_cloud
}

/// Band mean of an `(ncol, nlay, nbnd)` aerosol optical depth
fn band_mean(tauaer: &Array3<FloatValue>, i: usize, k: usize) -> FloatValue {
    let nbnd = tauaer.shape()[2];
    if nbnd == 0 {
        return 0.0;
    }
    (0..nbnd).map(|b| tauaer[[i, k, b]]).sum::<FloatValue>() / nbnd as FloatValue
}

fn check_bands(domain: &str, field: &str, found: usize, expected: usize) -> ClimradResult<()> {
    if found != expected {
        return Err(ClimradError::SolverFailure {
            domain: domain.to_string(),
            message: format!("{} has {} bands, expected {}", field, found, expected),
        });
    }
    Ok(())
}

/// Assemble per-column results into solver-order arrays
struct FluxBuilder {
    fluxes: RadiativeFluxes,
    derivative: bool,
}

impl FluxBuilder {
    fn new(ncol: usize, nlay: usize, derivative: bool) -> Self {
        let interfaces = || Array2::zeros((ncol, nlay + 1));
        let layers = || Array2::zeros((ncol, nlay));
        Self {
            fluxes: RadiativeFluxes {
                flux_up: interfaces(),
                flux_down: interfaces(),
                heating_rate: layers(),
                flux_up_clear: interfaces(),
                flux_down_clear: interfaces(),
                heating_rate_clear: layers(),
                dflux_up_dts: derivative.then(interfaces),
                dflux_up_dts_clear: derivative.then(interfaces),
            },
            derivative,
        }
    }

    fn set_column(
        &mut self,
        i: usize,
        all_sky: &ColumnFluxes,
        clear_sky: &ColumnFluxes,
        dp: &[FloatValue],
        cp: FloatValue,
    ) {
        let f = &mut self.fluxes;
        for (k, v) in all_sky.up.iter().enumerate() {
            f.flux_up[[i, k]] = *v;
            f.flux_down[[i, k]] = all_sky.down[k];
            f.flux_up_clear[[i, k]] = clear_sky.up[k];
            f.flux_down_clear[[i, k]] = clear_sky.down[k];
        }
        let net = |c: &ColumnFluxes| -> Vec<FloatValue> {
            c.up.iter().zip(c.down.iter()).map(|(u, d)| u - d).collect()
        };
        for (k, hr) in heating_rates(&net(all_sky), dp, cp).into_iter().enumerate() {
            f.heating_rate[[i, k]] = hr;
        }
        for (k, hr) in heating_rates(&net(clear_sky), dp, cp).into_iter().enumerate() {
            f.heating_rate_clear[[i, k]] = hr;
        }
        if self.derivative {
            if let (Some(d), Some(dc)) = (f.dflux_up_dts.as_mut(), f.dflux_up_dts_clear.as_mut()) {
                for k in 0..all_sky.derivative.len() {
                    d[[i, k]] = all_sky.derivative[k];
                    dc[[i, k]] = clear_sky.derivative[k];
                }
            }
        }
    }

    fn finish(self) -> RadiativeFluxes {
        self.fluxes
    }
}

// =============================================================================
// Longwave
// =============================================================================

/// Parameters of the gray longwave scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrayLongwaveParameters {
    /// Column optical depth of the dry atmosphere
    /// default: 0.5
    pub tau_dry: FloatValue,
    /// Column optical depth per unit CO2 volume mixing ratio
    /// default: 790.0
    pub k_co2: FloatValue,
    /// Column optical depth per unit H2O volume mixing ratio
    /// default: 100.0
    pub k_h2o: FloatValue,
    /// Optical depth per in-cloud liquid water path
    /// unit: m^2 / g
    /// default: 0.1
    pub k_liquid: FloatValue,
    /// Optical depth per in-cloud ice water path
    /// unit: m^2 / g
    /// default: 0.05
    pub k_ice: FloatValue,
}

impl Default for GrayLongwaveParameters {
    fn default() -> Self {
        Self {
            tau_dry: 0.5,
            k_co2: 790.0,
            k_h2o: 100.0,
            k_liquid: 0.1,
            k_ice: 0.05,
        }
    }
}

/// Gray two-stream longwave driver
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GrayLongwave {
    parameters: GrayLongwaveParameters,
    #[serde(skip)]
    cp: OnceLock<FloatValue>,
}

impl GrayLongwave {
    pub fn from_parameters(parameters: GrayLongwaveParameters) -> Self {
        Self {
            parameters,
            cp: OnceLock::new(),
        }
    }

    /// Upward and downward sweeps for one column
    ///
    /// `tau`, `tlay` are per layer from the surface upward.
    fn sweep(
        tau: &[FloatValue],
        tlay: &[FloatValue],
        tsfc: FloatValue,
        emissivity: FloatValue,
    ) -> ColumnFluxes {
        let nlay = tau.len();
        let transmission: Vec<FloatValue> = tau.iter().map(|t| (-DIFFUSIVITY * t).exp()).collect();
        let emission: Vec<FloatValue> = (0..nlay)
            .map(|k| (1.0 - transmission[k]) * STEFAN_BOLTZMANN * tlay[k].powi(4))
            .collect();

        let mut down = vec![0.0; nlay + 1];
        for k in (0..nlay).rev() {
            down[k] = down[k + 1] * transmission[k] + emission[k];
        }

        let mut up = vec![0.0; nlay + 1];
        let mut derivative = vec![0.0; nlay + 1];
        up[0] = emissivity * STEFAN_BOLTZMANN * tsfc.powi(4) + (1.0 - emissivity) * down[0];
        derivative[0] = 4.0 * emissivity * STEFAN_BOLTZMANN * tsfc.powi(3);
        for k in 0..nlay {
            up[k + 1] = up[k] * transmission[k] + emission[k];
            derivative[k + 1] = derivative[k] * transmission[k];
        }

        ColumnFluxes {
            up,
            down,
            derivative,
        }
    }
}

#[typetag::serde]
impl LongwaveDriver for GrayLongwave {
    fn initialise(&self, cp: FloatValue) -> ClimradResult<()> {
        store_cp(&self.cp, "longwave", cp)
    }

    fn run(&self, args: &LongwaveArguments) -> ClimradResult<RadiativeFluxes> {
        let cp = stored_cp(&self.cp, "longwave")?;
        check_bands("longwave", "emis", args.emis.ncols(), NBNDLW)?;
        check_bands("longwave", "tauc", args.tauc.shape()[0], NBNDLW)?;

        let p = &self.parameters;
        let (ncol, nlay) = (args.ncol, args.nlay);
        let mut builder = FluxBuilder::new(ncol, nlay, args.idrv == 1);

        for i in 0..ncol {
            let dp = layer_thickness(&args.plev, i);
            let total: FloatValue = dp.iter().sum();
            let tau_clear: Vec<FloatValue> = (0..nlay)
                .map(|k| {
                    let gas = p.tau_dry
                        + p.k_co2 * args.gases.co2vmr[[i, k]]
                        + p.k_h2o * args.gases.h2ovmr[[i, k]];
                    dp[k] / total * gas + band_mean(&args.tauaer, i, k)
                })
                .collect();
            let tau_all: Vec<FloatValue> = (0..nlay)
                .map(|k| {
                    tau_clear[k]
                        + cloud_optical_depth(
                            args.icld,
                            args.inflglw,
                            &args.clouds,
                            &args.tauc,
                            p.k_liquid,
                            p.k_ice,
                            i,
                            k,
                        )
                })
                .collect();

            let tlay: Vec<FloatValue> = args.tlay.row(i).to_vec();
            let emissivity = args.emis.row(i).mean().unwrap_or(1.0);
            let clear_sky = Self::sweep(&tau_clear, &tlay, args.tsfc[i], emissivity);
            let all_sky = Self::sweep(&tau_all, &tlay, args.tsfc[i], emissivity);
            builder.set_column(i, &all_sky, &clear_sky, &dp, cp);
        }

        Ok(builder.finish())
    }
}

// =============================================================================
// Shortwave
// =============================================================================

/// Earth-sun distance factor for a day of the year (Spencer, 1971)
pub fn earth_sun_factor(day_of_year: i32) -> FloatValue {
    let theta = 2.0 * PI * (day_of_year as FloatValue - 1.0) / 365.0;
    1.000110 + 0.034221 * theta.cos() + 0.001280 * theta.sin() + 0.000719 * (2.0 * theta).cos()
        + 0.000077 * (2.0 * theta).sin()
}

/// Parameters of the gray shortwave scheme
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrayShortwaveParameters {
    /// Column optical depth of the dry atmosphere
    /// default: 0.1
    pub tau_dry: FloatValue,
    /// Column optical depth per unit H2O volume mixing ratio
    /// default: 20.0
    pub k_h2o: FloatValue,
    /// Column optical depth per unit O3 volume mixing ratio
    /// default: 5000.0
    pub k_o3: FloatValue,
    /// unit: m^2 / g
    /// default: 0.1
    pub k_liquid: FloatValue,
    /// unit: m^2 / g
    /// default: 0.05
    pub k_ice: FloatValue,
}

impl Default for GrayShortwaveParameters {
    fn default() -> Self {
        Self {
            tau_dry: 0.1,
            k_h2o: 20.0,
            k_o3: 5000.0,
            k_liquid: 0.1,
            k_ice: 0.05,
        }
    }
}

/// Gray direct-beam shortwave driver
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GrayShortwave {
    parameters: GrayShortwaveParameters,
    #[serde(skip)]
    cp: OnceLock<FloatValue>,
}

impl GrayShortwave {
    pub fn from_parameters(parameters: GrayShortwaveParameters) -> Self {
        Self {
            parameters,
            cp: OnceLock::new(),
        }
    }

    fn sweep(tau: &[FloatValue], incoming: FloatValue, coszen: FloatValue, albedo: FloatValue) -> ColumnFluxes {
        let nlay = tau.len();
        let mut down = vec![0.0; nlay + 1];
        let mut up = vec![0.0; nlay + 1];
        if coszen > 0.0 {
            down[nlay] = incoming;
            for k in (0..nlay).rev() {
                down[k] = down[k + 1] * (-tau[k] / coszen).exp();
            }
            up[0] = albedo * down[0];
            for k in 0..nlay {
                up[k + 1] = up[k] * (-DIFFUSIVITY * tau[k]).exp();
            }
        }
        ColumnFluxes {
            up,
            down,
            // Reflected sunlight does not depend on the surface temperature
            derivative: vec![0.0; nlay + 1],
        }
    }

    /// Aerosol optical depth of layer `k` in column `i` for the active mode
    fn aerosol(args: &ShortwaveArguments, i: usize, k: usize) -> FloatValue {
        match args.iaer {
            10 => band_mean(&args.tauaer, i, k),
            6 => (0..args.ecaer.shape()[2]).map(|a| args.ecaer[[i, k, a]]).sum(),
            _ => 0.0,
        }
    }
}

#[typetag::serde]
impl ShortwaveDriver for GrayShortwave {
    fn initialise(&self, cp: FloatValue) -> ClimradResult<()> {
        store_cp(&self.cp, "shortwave", cp)
    }

    fn run(&self, args: &ShortwaveArguments) -> ClimradResult<RadiativeFluxes> {
        let cp = stored_cp(&self.cp, "shortwave")?;
        check_bands("shortwave", "tauc", args.tauc.shape()[0], NBNDSW)?;
        check_bands("shortwave", "tauaer", args.tauaer.shape()[2], NBNDSW)?;

        let p = &self.parameters;
        let (ncol, nlay) = (args.ncol, args.nlay);
        let factor = if args.dyofyr > 0 {
            earth_sun_factor(args.dyofyr)
        } else {
            args.adjes
        };
        let mut builder = FluxBuilder::new(ncol, nlay, args.idrv == 1);

        for i in 0..ncol {
            let dp = layer_thickness(&args.plev, i);
            let total: FloatValue = dp.iter().sum();
            let tau_clear: Vec<FloatValue> = (0..nlay)
                .map(|k| {
                    let gas = p.tau_dry
                        + p.k_h2o * args.gases.h2ovmr[[i, k]]
                        + p.k_o3 * args.gases.o3vmr[[i, k]];
                    dp[k] / total * gas + Self::aerosol(args, i, k)
                })
                .collect();
            let tau_all: Vec<FloatValue> = (0..nlay)
                .map(|k| {
                    tau_clear[k]
                        + cloud_optical_depth(
                            args.icld,
                            args.inflgsw,
                            &args.clouds,
                            &args.tauc,
                            p.k_liquid,
                            p.k_ice,
                            i,
                            k,
                        )
                })
                .collect();

            let coszen = args.coszen[i];
            let incoming = args.scon * factor * coszen.max(0.0);
            let albedo = 0.5 * (args.asdir[i] + args.aldir[i]);
            let clear_sky = Self::sweep(&tau_clear, incoming, coszen, albedo);
            let all_sky = Self::sweep(&tau_all, incoming, coszen, albedo);
            builder.set_column(i, &all_sky, &clear_sky, &dp, cp);
        }

        Ok(builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_run_before_initialise() {
        let driver = GrayLongwave::default();
        assert!(matches!(
            stored_cp(&driver.cp, "longwave"),
            Err(ClimradError::NotInitialised(_))
        ));
    }

    #[test]
    fn test_reinitialise_with_other_cp() {
        let driver = GrayShortwave::default();
        driver.initialise(1004.0).unwrap();
        driver.initialise(1004.0).unwrap();
        assert!(driver.initialise(1000.0).is_err());
        assert!(GrayShortwave::default().initialise(-1.0).is_err());
    }

    #[test]
    fn test_transparent_atmosphere() {
        let fluxes = GrayLongwave::sweep(&[0.0, 0.0], &[250.0, 200.0], 288.0, 1.0);
        let surface = STEFAN_BOLTZMANN * 288.0_f64.powi(4);

        assert_relative_eq!(fluxes.up[2], surface);
        assert_eq!(fluxes.down[0], 0.0);
    }

    #[test]
    fn test_opaque_layer_emits_at_its_temperature() {
        let fluxes = GrayLongwave::sweep(&[1.0e3], &[250.0], 288.0, 1.0);
        assert_relative_eq!(fluxes.up[1], STEFAN_BOLTZMANN * 250.0_f64.powi(4));
        assert_relative_eq!(fluxes.down[0], STEFAN_BOLTZMANN * 250.0_f64.powi(4));
    }

    #[test]
    fn test_surface_derivative() {
        let tau = [0.3, 0.2, 0.1];
        let tlay = [270.0, 250.0, 220.0];
        let delta = 1.0e-3;
        let base = GrayLongwave::sweep(&tau, &tlay, 288.0, 0.9);
        let perturbed = GrayLongwave::sweep(&tau, &tlay, 288.0 + delta, 0.9);

        for k in 0..4 {
            let numerical = (perturbed.up[k] - base.up[k]) / delta;
            assert_relative_eq!(base.derivative[k], numerical, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_heating_balances_flux_divergence() {
        let net_up = [100.0, 80.0, 90.0];
        let dp = [500.0, 500.0];
        let hr = heating_rates(&net_up, &dp, 1004.0);

        let energy: FloatValue = hr
            .iter()
            .zip(dp.iter())
            .map(|(h, dp)| h / SECONDS_PER_DAY * 1004.0 * dp * MB_TO_PA / GRAVITY)
            .sum();
        assert_relative_eq!(energy, net_up[0] - net_up[2], max_relative = 1e-12);
    }

    #[test]
    fn test_shortwave_night() {
        let fluxes = GrayShortwave::sweep(&[0.1, 0.1], 0.0, -0.2, 0.3);
        assert!(fluxes.up.iter().chain(fluxes.down.iter()).all(|f| *f == 0.0));
    }

    #[test]
    fn test_shortwave_reflection() {
        let fluxes = GrayShortwave::sweep(&[0.0], 1000.0, 1.0, 0.3);
        assert_relative_eq!(fluxes.down[0], 1000.0);
        assert_relative_eq!(fluxes.up[1], 300.0);
    }

    #[test]
    fn test_earth_sun_factor() {
        // Perihelion in early January, aphelion in early July
        assert!(earth_sun_factor(3) > 1.03);
        assert!(earth_sun_factor(185) < 0.97);
    }

    #[test]
    fn test_serialise_parameters() {
        let driver = GrayLongwave::from_parameters(GrayLongwaveParameters {
            k_co2: 500.0,
            ..Default::default()
        });
        let serialised = serde_json::to_string(&driver).unwrap();
        let deserialised: GrayLongwave = serde_json::from_str(&serialised).unwrap();
        assert_eq!(deserialised.parameters.k_co2, 500.0);
        assert!(deserialised.cp.get().is_none());
    }
}
