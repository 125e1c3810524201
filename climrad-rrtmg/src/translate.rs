//! Translation of solver output back to host conventions.
//!
//! Solver profiles are reordered to host order before anything else is done
//! with them. Heating rates in K / day become energy tendencies in W / m^2 by
//! multiplying with the heat capacity the host associates with `Tatm`, which
//! keeps the energy budget of the host exact.

use crate::driver::{Domain, RadiativeFluxes};
use crate::ordering::to_host_order;
use climrad_core::constants::SECONDS_PER_DAY;
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::FloatValue;
use ndarray::{Array1, Array2, Axis, Zip};

/// Solver output in host order (index 0 at the top of the atmosphere)
#[derive(Debug, Clone, PartialEq)]
pub struct HostFluxes {
    pub flux_up: Array2<FloatValue>,
    pub flux_down: Array2<FloatValue>,
    pub heating_rate: Array2<FloatValue>,
    pub flux_up_clear: Array2<FloatValue>,
    pub flux_down_clear: Array2<FloatValue>,
    pub heating_rate_clear: Array2<FloatValue>,
    pub dflux_up_dts: Option<Array2<FloatValue>>,
    pub dflux_up_dts_clear: Option<Array2<FloatValue>>,
}

fn check_result(
    domain: Domain,
    name: &str,
    values: &Array2<FloatValue>,
    expected: (usize, usize),
) -> ClimradResult<()> {
    if values.dim() != expected {
        return Err(ClimradError::SolverFailure {
            domain: domain.to_string(),
            message: format!(
                "{} has shape {:?}, expected {:?}",
                name,
                values.shape(),
                [expected.0, expected.1]
            ),
        });
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ClimradError::SolverFailure {
            domain: domain.to_string(),
            message: format!("{} contains non-finite values", name),
        });
    }
    Ok(())
}

impl HostFluxes {
    /// Validate the solver result for `ncol` columns of `nlay` layers and reorder it
    pub fn from_solver(
        fluxes: RadiativeFluxes,
        domain: Domain,
        ncol: usize,
        nlay: usize,
    ) -> ClimradResult<Self> {
        let interfaces = (ncol, nlay + 1);
        let layers = (ncol, nlay);
        check_result(domain, "flux_up", &fluxes.flux_up, interfaces)?;
        check_result(domain, "flux_down", &fluxes.flux_down, interfaces)?;
        check_result(domain, "heating_rate", &fluxes.heating_rate, layers)?;
        check_result(domain, "flux_up_clear", &fluxes.flux_up_clear, interfaces)?;
        check_result(domain, "flux_down_clear", &fluxes.flux_down_clear, interfaces)?;
        check_result(domain, "heating_rate_clear", &fluxes.heating_rate_clear, layers)?;
        if let Some(d) = &fluxes.dflux_up_dts {
            check_result(domain, "dflux_up_dts", d, interfaces)?;
        }
        if let Some(d) = &fluxes.dflux_up_dts_clear {
            check_result(domain, "dflux_up_dts_clear", d, interfaces)?;
        }

        Ok(Self {
            flux_up: to_host_order(&fluxes.flux_up),
            flux_down: to_host_order(&fluxes.flux_down),
            heating_rate: to_host_order(&fluxes.heating_rate),
            flux_up_clear: to_host_order(&fluxes.flux_up_clear),
            flux_down_clear: to_host_order(&fluxes.flux_down_clear),
            heating_rate_clear: to_host_order(&fluxes.heating_rate_clear),
            dflux_up_dts: fluxes.dflux_up_dts.as_ref().map(to_host_order),
            dflux_up_dts_clear: fluxes.dflux_up_dts_clear.as_ref().map(to_host_order),
        })
    }
}

/// Convert a heating rate `X` (K / day) to an energy tendency `X * C / 86400` (W / m^2)
///
/// `heat_capacity` has one entry per layer and applies to every column.
pub fn heating_to_tendency(
    heating_rate: &Array2<FloatValue>,
    heat_capacity: &Array1<FloatValue>,
) -> ClimradResult<Array2<FloatValue>> {
    if heating_rate.ncols() != heat_capacity.len() {
        return Err(ClimradError::ShapeMismatch {
            field: "heat_capacity".to_string(),
            expected: vec![heating_rate.ncols()],
            found: vec![heat_capacity.len()],
        });
    }
    let mut tendency = heating_rate.clone();
    for mut row in tendency.rows_mut() {
        Zip::from(&mut row)
            .and(heat_capacity)
            .for_each(|x, &c| *x = *x * c / SECONDS_PER_DAY);
    }
    Ok(tendency)
}

/// Values at the top interface (host index 0), one per column
pub fn top_of_atmosphere(flux: &Array2<FloatValue>) -> Array1<FloatValue> {
    flux.index_axis(Axis(1), 0).to_owned()
}

/// Values at the surface interface (last host index), one per column
pub fn surface(flux: &Array2<FloatValue>) -> Array1<FloatValue> {
    flux.index_axis(Axis(1), flux.ncols() - 1).to_owned()
}

/// Net downward flux at the surface as a `(ncol, 1)` tendency for `Ts`
pub fn surface_tendency(up: &Array2<FloatValue>, down: &Array2<FloatValue>) -> Array2<FloatValue> {
    (surface(down) - surface(up)).insert_axis(Axis(1))
}
