//! Longwave radiation process
//!
//! Couples the host column state to a longwave driver: assemble the
//! arguments, call the solver once, and translate the result into `Tatm` and
//! `Ts` tendencies plus diagnostics.

use crate::arguments::LongwaveArguments;
use crate::config::RadiationConfig;
use crate::driver::{Domain, LongwaveDriver, LongwaveSolver};
use crate::translate::{
    heating_to_tendency, surface, surface_tendency, top_of_atmosphere, HostFluxes,
};
use climrad_core::constants::CP;
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::process::{Process, RequirementDefinition, RequirementType};
use climrad_core::standard_variables::VAR_TATM;
use climrad_core::state::{InputState, OutputState};
use climrad_macros::ProcessIO;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// RRTMG longwave radiation
///
/// The configuration is fixed at construction. Each call to `compute` is
/// independent of every other call: nothing is cached between steps and the
/// host state is never modified.
///
/// Tendencies are energy fluxes (W / m^2). For the atmosphere the solver's
/// heating rate $X$ (K / day) becomes $X \, C / 86400$ with $C$ the heat
/// capacity the host uses for `Tatm`; for the surface it is the net downward
/// longwave flux at the lowest interface.
#[derive(Debug, Serialize, Deserialize, ProcessIO)]
#[inputs(
    tatm { name = "Tatm", unit = "K", shape = "Layer" },
    ts { name = "Ts", unit = "K", shape = "Column" },
    h2o { name = "h2o", unit = "1", shape = "Layer", optional = true },
    q { name = "q", unit = "kg / kg", shape = "Layer", optional = true },
    o3 { name = "o3", unit = "1", shape = "Layer", optional = true },
    co2 { name = "co2", unit = "1", shape = "Layer", optional = true },
    ch4 { name = "ch4", unit = "1", shape = "Layer", optional = true },
    n2o { name = "n2o", unit = "1", shape = "Layer", optional = true },
    o2 { name = "o2", unit = "1", shape = "Layer", optional = true },
    cfc11 { name = "cfc11", unit = "1", shape = "Layer", optional = true },
    cfc12 { name = "cfc12", unit = "1", shape = "Layer", optional = true },
    cfc22 { name = "cfc22", unit = "1", shape = "Layer", optional = true },
    ccl4 { name = "ccl4", unit = "1", shape = "Layer", optional = true },
    cldfrac { name = "cldfrac", unit = "1", shape = "Layer", optional = true },
    ciwp { name = "ciwp", unit = "g / m^2", shape = "Layer", optional = true },
    clwp { name = "clwp", unit = "g / m^2", shape = "Layer", optional = true },
    r_ice { name = "r_ice", unit = "micron", shape = "Layer", optional = true },
    r_liq { name = "r_liq", unit = "micron", shape = "Layer", optional = true },
    tauc { name = "tauc_lw", unit = "1", shape = "Spectral", optional = true },
)]
#[tendencies(
    tatm { name = "Tatm", unit = "W / m^2", shape = "Layer" },
    ts { name = "Ts", unit = "W / m^2", shape = "Column" },
)]
#[diagnostics(
    olr { name = "OLR", unit = "W / m^2", shape = "Column" },
    olr_clr { name = "OLRclr", unit = "W / m^2", shape = "Column" },
    lw_sfc { name = "LW_sfc", unit = "W / m^2", shape = "Column" },
    lw_sfc_clr { name = "LW_sfc_clr", unit = "W / m^2", shape = "Column" },
    tdot { name = "TdotLW", unit = "K / day", shape = "Layer" },
    tdot_clr { name = "TdotLW_clr", unit = "K / day", shape = "Layer" },
    heating { name = "LW_heating", unit = "W / m^2", shape = "Layer" },
    flux_up { name = "LW_flux_up", unit = "W / m^2", shape = "Interface" },
    flux_down { name = "LW_flux_down", unit = "W / m^2", shape = "Interface" },
    flux_up_clr { name = "LW_flux_up_clr", unit = "W / m^2", shape = "Interface" },
    flux_down_clr { name = "LW_flux_down_clr", unit = "W / m^2", shape = "Interface" },
    dolr_dts { name = "dOLR_dTs", unit = "W / m^2 / K", shape = "Column", optional = true },
    dolr_clr_dts { name = "dOLRclr_dTs", unit = "W / m^2 / K", shape = "Column", optional = true },
    dflux_up_dts { name = "LW_dflux_up_dTs", unit = "W / m^2 / K", shape = "Interface", optional = true },
)]
pub struct RrtmgLongwave {
    config: RadiationConfig,
    solver: LongwaveSolver,
}

impl RrtmgLongwave {
    /// Validate `config` against the driver and initialise the solver
    pub fn new(config: RadiationConfig, driver: impl LongwaveDriver + 'static) -> ClimradResult<Self> {
        Self::from_solver(config, LongwaveSolver::longwave(driver))
    }

    pub fn from_solver(config: RadiationConfig, solver: LongwaveSolver) -> ClimradResult<Self> {
        config.validate()?;
        config.check_band_counts(Domain::Longwave, solver.band_count())?;
        solver.initialise(CP)?;
        Ok(Self { config, solver })
    }

    pub fn config(&self) -> &RadiationConfig {
        &self.config
    }

    pub fn solver(&self) -> &LongwaveSolver {
        &self.solver
    }

    /// Run one longwave calculation and return the typed outputs
    pub fn compute_outputs(&self, input_state: &InputState) -> ClimradResult<RrtmgLongwaveOutputs> {
        // Processes restored from a serialised tree start uninitialised
        self.solver.initialise(CP)?;

        let arguments =
            LongwaveArguments::assemble(input_state, &self.config, self.solver.band_count())?;
        let (ncol, nlay) = (arguments.ncol, arguments.nlay);
        let fluxes = self.solver.run(&arguments)?;
        let host = HostFluxes::from_solver(fluxes, Domain::Longwave, ncol, nlay)?;

        let heat_capacity = input_state.variable(VAR_TATM.name)?.heat_capacity();
        let tatm = heating_to_tendency(&host.heating_rate, heat_capacity)?;
        let ts = surface_tendency(&host.flux_up, &host.flux_down);

        let derivative = match (self.config.surface_derivative, host.dflux_up_dts) {
            (false, _) => None,
            (true, Some(derivative)) => Some(derivative),
            (true, None) => {
                return Err(ClimradError::SolverFailure {
                    domain: Domain::Longwave.to_string(),
                    message: "surface temperature derivative was requested but not returned"
                        .to_string(),
                })
            }
        };
        let derivative_clear = match (&derivative, host.dflux_up_dts_clear) {
            (Some(_), Some(clear)) => Some(top_of_atmosphere(&clear)),
            _ => None,
        };

        let olr = top_of_atmosphere(&host.flux_up);
        debug!(
            ncol,
            nlay,
            olr = olr.mean().unwrap_or_default(),
            "Computed longwave fluxes"
        );

        let diagnostics = RrtmgLongwaveDiagnostics {
            olr,
            olr_clr: top_of_atmosphere(&host.flux_up_clear),
            lw_sfc: surface(&host.flux_up) - surface(&host.flux_down),
            lw_sfc_clr: surface(&host.flux_up_clear) - surface(&host.flux_down_clear),
            tdot: host.heating_rate,
            tdot_clr: host.heating_rate_clear,
            heating: tatm.clone(),
            flux_up: host.flux_up,
            flux_down: host.flux_down,
            flux_up_clr: host.flux_up_clear,
            flux_down_clr: host.flux_down_clear,
            dolr_dts: derivative.as_ref().map(top_of_atmosphere),
            dolr_clr_dts: derivative_clear,
            dflux_up_dts: derivative,
        };

        Ok(RrtmgLongwaveOutputs {
            tendencies: RrtmgLongwaveTendencies { tatm, ts },
            diagnostics,
        })
    }
}

/// Declared definitions, without the derivative diagnostics when they are disabled
pub(crate) fn active_definitions(
    mut definitions: Vec<RequirementDefinition>,
    surface_derivative: bool,
) -> Vec<RequirementDefinition> {
    if !surface_derivative {
        definitions
            .retain(|d| !(d.requirement_type == RequirementType::Diagnostic && d.optional));
    }
    definitions
}

#[typetag::serde]
impl Process for RrtmgLongwave {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        active_definitions(Self::generated_definitions(), self.config.surface_derivative)
    }

    fn compute(&self, input_state: &InputState) -> ClimradResult<OutputState> {
        Ok(self.compute_outputs(input_state)?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SolverStatus;
    use crate::gray::GrayLongwave;
    use crate::options::CloudOverlap;
    use approx::assert_relative_eq;
    use climrad_core::grid::ColumnGrid;
    use climrad_core::state::{ColumnState, StateVariable};
    use ndarray::{Array1, Array2};

    fn column(nlay: usize) -> ColumnState {
        let grid = ColumnGrid::uniform(nlay, 1000.0).unwrap();
        // Linear lapse from 200 K at the top to 285 K near the surface
        let tatm = Array2::from_shape_fn((1, nlay), |(_, k)| {
            200.0 + 85.0 * k as f64 / (nlay - 1).max(1) as f64
        });
        let tatm = StateVariable::atmosphere(&grid, tatm).unwrap();
        let ts = StateVariable::surface(Array1::from_elem(1, 288.0), 4.0e6).unwrap();
        ColumnState::new(grid)
            .with_variable("Tatm", tatm)
            .unwrap()
            .with_variable("Ts", ts)
            .unwrap()
    }

    #[test]
    fn test_construction_initialises_solver() {
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        assert_eq!(process.solver().status().unwrap(), SolverStatus::Ready);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = RadiationConfig {
            r_ice: 200.0,
            ..Default::default()
        };
        let err = RrtmgLongwave::new(config, GrayLongwave::default()).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_definitions() {
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        assert_eq!(process.tendency_names(), vec!["Tatm", "Ts"]);
        assert_eq!(process.required_input_names(), vec!["Tatm", "Ts"]);
        assert!(process.input_names().contains(&"tauc_lw".to_string()));
        assert!(process.diagnostic_names().contains(&"OLR".to_string()));
        assert!(!process.diagnostic_names().contains(&"dOLR_dTs".to_string()));

        let config = RadiationConfig {
            surface_derivative: true,
            ..Default::default()
        };
        let process = RrtmgLongwave::new(config, GrayLongwave::default()).unwrap();
        assert!(process.diagnostic_names().contains(&"dOLR_dTs".to_string()));
    }

    #[test]
    fn test_outputs_have_host_shapes() {
        let state = column(10);
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let output = process.compute(&InputState::build(&state)).unwrap();

        assert_eq!(output.tendency("Tatm").unwrap().dim(), (1, 10));
        assert_eq!(output.tendency("Ts").unwrap().dim(), (1, 1));
        assert_eq!(output.diagnostic("OLR").unwrap().shape(), vec![1]);
        assert_eq!(output.diagnostic("TdotLW").unwrap().shape(), vec![1, 10]);
        assert_eq!(output.diagnostic("LW_flux_up").unwrap().shape(), vec![1, 11]);
        assert!(output.diagnostic("dOLR_dTs").is_none());
    }

    #[test]
    fn test_tendency_matches_heating_rate() {
        let state = column(5);
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        let heat_capacity = state.variable("Tatm").unwrap().heat_capacity();
        for k in 0..5 {
            assert_eq!(
                outputs.tendencies.tatm[[0, k]],
                outputs.diagnostics.tdot[[0, k]] * heat_capacity[k] / 86400.0
            );
        }
        assert_eq!(outputs.diagnostics.heating, outputs.tendencies.tatm);
    }

    #[test]
    fn test_olr_at_top_of_host_profile() {
        let state = column(5);
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        assert_eq!(outputs.diagnostics.olr[0], outputs.diagnostics.flux_up[[0, 0]]);
        // No downward longwave flux enters from space
        assert_eq!(outputs.diagnostics.flux_down[[0, 0]], 0.0);
        assert_relative_eq!(
            outputs.tendencies.ts[[0, 0]],
            -outputs.diagnostics.lw_sfc[0],
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_surface_derivative_outputs() {
        let state = column(5);
        let config = RadiationConfig {
            surface_derivative: true,
            ..Default::default()
        };
        let process = RrtmgLongwave::new(config, GrayLongwave::default()).unwrap();
        let output = process.compute(&InputState::build(&state)).unwrap();

        let dolr = output.diagnostic("dOLR_dTs").unwrap().to_scalar();
        let surface = 4.0 * 5.670373e-8 * 288.0_f64.powi(3);
        assert!(dolr > 0.0 && dolr < surface);
        assert!(output.diagnostic("dOLRclr_dTs").is_some());
        assert_eq!(output.diagnostic("LW_dflux_up_dTs").unwrap().shape(), vec![1, 6]);
    }

    #[test]
    fn test_clouds_reduce_olr() {
        let clear_state = column(5);
        let cloudy_state = column(5)
            .with_input("cldfrac", Array2::from_elem((1, 5), 0.8))
            .with_input("clwp", Array2::from_elem((1, 5), 50.0));

        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let clear = process.compute_outputs(&InputState::build(&clear_state)).unwrap();
        let cloudy = process.compute_outputs(&InputState::build(&cloudy_state)).unwrap();

        assert!(cloudy.diagnostics.olr[0] < clear.diagnostics.olr[0]);
        assert_eq!(cloudy.diagnostics.olr_clr, clear.diagnostics.olr_clr);

        let config = RadiationConfig {
            cloud_overlap: CloudOverlap::ClearOnly,
            ..Default::default()
        };
        let process = RrtmgLongwave::new(config, GrayLongwave::default()).unwrap();
        let ignored = process.compute_outputs(&InputState::build(&cloudy_state)).unwrap();
        assert_eq!(ignored.diagnostics.olr, ignored.diagnostics.olr_clr);
    }

    #[test]
    fn test_host_state_untouched() {
        let state = column(4);
        let before = state.clone();
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        process.compute(&InputState::build(&state)).unwrap();
        assert_eq!(state, before);
    }
}
