//! Shortwave radiation process

use crate::arguments::ShortwaveArguments;
use crate::config::RadiationConfig;
use crate::driver::{Domain, ShortwaveDriver, ShortwaveSolver};
use crate::longwave::active_definitions;
use crate::translate::{
    heating_to_tendency, surface, surface_tendency, top_of_atmosphere, HostFluxes,
};
use climrad_core::constants::CP;
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::process::{Process, RequirementDefinition};
use climrad_core::standard_variables::VAR_TATM;
use climrad_core::state::{InputState, OutputState};
use climrad_macros::ProcessIO;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// RRTMG shortwave radiation
///
/// Mirrors [`RrtmgLongwave`](crate::longwave::RrtmgLongwave), with the solar
/// geometry as additional required inputs. `irradiance_factor` is only used
/// when `day_of_year` is zero; otherwise the solver derives the earth-sun
/// distance from the day of the year.
#[derive(Debug, Serialize, Deserialize, ProcessIO)]
#[inputs(
    tatm { name = "Tatm", unit = "K", shape = "Layer" },
    ts { name = "Ts", unit = "K", shape = "Column" },
    coszen { name = "coszen", unit = "1", shape = "Column" },
    irradiance_factor { name = "irradiance_factor", unit = "1", shape = "Scalar" },
    day_of_year { name = "day_of_year", unit = "day", shape = "Scalar" },
    h2o { name = "h2o", unit = "1", shape = "Layer", optional = true },
    q { name = "q", unit = "kg / kg", shape = "Layer", optional = true },
    o3 { name = "o3", unit = "1", shape = "Layer", optional = true },
    co2 { name = "co2", unit = "1", shape = "Layer", optional = true },
    ch4 { name = "ch4", unit = "1", shape = "Layer", optional = true },
    n2o { name = "n2o", unit = "1", shape = "Layer", optional = true },
    o2 { name = "o2", unit = "1", shape = "Layer", optional = true },
    cldfrac { name = "cldfrac", unit = "1", shape = "Layer", optional = true },
    ciwp { name = "ciwp", unit = "g / m^2", shape = "Layer", optional = true },
    clwp { name = "clwp", unit = "g / m^2", shape = "Layer", optional = true },
    r_ice { name = "r_ice", unit = "micron", shape = "Layer", optional = true },
    r_liq { name = "r_liq", unit = "micron", shape = "Layer", optional = true },
    tauc { name = "tauc_sw", unit = "1", shape = "Spectral", optional = true },
    ssac { name = "ssac_sw", unit = "1", shape = "Spectral", optional = true },
    asmc { name = "asmc_sw", unit = "1", shape = "Spectral", optional = true },
    fsfc { name = "fsfc_sw", unit = "1", shape = "Spectral", optional = true },
)]
#[tendencies(
    tatm { name = "Tatm", unit = "W / m^2", shape = "Layer" },
    ts { name = "Ts", unit = "W / m^2", shape = "Column" },
)]
#[diagnostics(
    swup_toa { name = "SWup_toa", unit = "W / m^2", shape = "Column" },
    swup_toa_clr { name = "SWup_toa_clr", unit = "W / m^2", shape = "Column" },
    asr { name = "ASR", unit = "W / m^2", shape = "Column" },
    asr_clr { name = "ASRclr", unit = "W / m^2", shape = "Column" },
    sw_sfc { name = "SW_sfc", unit = "W / m^2", shape = "Column" },
    sw_sfc_clr { name = "SW_sfc_clr", unit = "W / m^2", shape = "Column" },
    tdot { name = "TdotSW", unit = "K / day", shape = "Layer" },
    tdot_clr { name = "TdotSW_clr", unit = "K / day", shape = "Layer" },
    heating { name = "SW_heating", unit = "W / m^2", shape = "Layer" },
    flux_up { name = "SW_flux_up", unit = "W / m^2", shape = "Interface" },
    flux_down { name = "SW_flux_down", unit = "W / m^2", shape = "Interface" },
    flux_up_clr { name = "SW_flux_up_clr", unit = "W / m^2", shape = "Interface" },
    flux_down_clr { name = "SW_flux_down_clr", unit = "W / m^2", shape = "Interface" },
    dflux_up_dts { name = "SW_dflux_up_dTs", unit = "W / m^2 / K", shape = "Interface", optional = true },
)]
pub struct RrtmgShortwave {
    config: RadiationConfig,
    solver: ShortwaveSolver,
}

impl RrtmgShortwave {
    pub fn new(config: RadiationConfig, driver: impl ShortwaveDriver + 'static) -> ClimradResult<Self> {
        Self::from_solver(config, ShortwaveSolver::shortwave(driver))
    }

    pub fn from_solver(config: RadiationConfig, solver: ShortwaveSolver) -> ClimradResult<Self> {
        config.validate()?;
        config.check_band_counts(Domain::Shortwave, solver.band_count())?;
        solver.initialise(CP)?;
        Ok(Self { config, solver })
    }

    pub fn config(&self) -> &RadiationConfig {
        &self.config
    }

    pub fn solver(&self) -> &ShortwaveSolver {
        &self.solver
    }

    pub fn compute_outputs(&self, input_state: &InputState) -> ClimradResult<RrtmgShortwaveOutputs> {
        self.solver.initialise(CP)?;

        let arguments =
            ShortwaveArguments::assemble(input_state, &self.config, self.solver.band_count())?;
        let (ncol, nlay) = (arguments.ncol, arguments.nlay);
        let fluxes = self.solver.run(&arguments)?;
        let host = HostFluxes::from_solver(fluxes, Domain::Shortwave, ncol, nlay)?;

        let heat_capacity = input_state.variable(VAR_TATM.name)?.heat_capacity();
        let tatm = heating_to_tendency(&host.heating_rate, heat_capacity)?;
        let ts = surface_tendency(&host.flux_up, &host.flux_down);

        let derivative = match (self.config.surface_derivative, host.dflux_up_dts) {
            (false, _) => None,
            (true, Some(derivative)) => Some(derivative),
            (true, None) => {
                return Err(ClimradError::SolverFailure {
                    domain: Domain::Shortwave.to_string(),
                    message: "surface temperature derivative was requested but not returned"
                        .to_string(),
                })
            }
        };

        let asr = top_of_atmosphere(&host.flux_down) - top_of_atmosphere(&host.flux_up);
        debug!(
            ncol,
            nlay,
            asr = asr.mean().unwrap_or_default(),
            "Computed shortwave fluxes"
        );

        let diagnostics = RrtmgShortwaveDiagnostics {
            swup_toa: top_of_atmosphere(&host.flux_up),
            swup_toa_clr: top_of_atmosphere(&host.flux_up_clear),
            asr,
            asr_clr: top_of_atmosphere(&host.flux_down_clear)
                - top_of_atmosphere(&host.flux_up_clear),
            sw_sfc: surface(&host.flux_down) - surface(&host.flux_up),
            sw_sfc_clr: surface(&host.flux_down_clear) - surface(&host.flux_up_clear),
            tdot: host.heating_rate,
            tdot_clr: host.heating_rate_clear,
            heating: tatm.clone(),
            flux_up: host.flux_up,
            flux_down: host.flux_down,
            flux_up_clr: host.flux_up_clear,
            flux_down_clr: host.flux_down_clear,
            dflux_up_dts: derivative,
        };

        Ok(RrtmgShortwaveOutputs {
            tendencies: RrtmgShortwaveTendencies { tatm, ts },
            diagnostics,
        })
    }
}

#[typetag::serde]
impl Process for RrtmgShortwave {
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
    use crate::gray::{earth_sun_factor, GrayShortwave};
    use approx::assert_relative_eq;
    use climrad_core::grid::ColumnGrid;
    use climrad_core::state::{ColumnState, StateVariable};
    use ndarray::{array, Array1, Array2};

    fn column(coszen: f64) -> ColumnState {
        let grid = ColumnGrid::uniform(6, 1000.0).unwrap();
        let tatm = StateVariable::atmosphere(&grid, Array2::from_elem((1, 6), 260.0)).unwrap();
        let ts = StateVariable::surface(Array1::from_elem(1, 288.0), 4.0e6).unwrap();
        ColumnState::new(grid)
            .with_variable("Tatm", tatm)
            .unwrap()
            .with_variable("Ts", ts)
            .unwrap()
            .with_input("coszen", coszen)
            .with_input("irradiance_factor", 1.0)
            .with_input("day_of_year", 0.0)
            .with_input("h2o", 3.0e-3)
    }

    fn process() -> RrtmgShortwave {
        RrtmgShortwave::new(RadiationConfig::default(), GrayShortwave::default()).unwrap()
    }

    #[test]
    fn test_definitions() {
        let process = process();
        assert_eq!(
            process.required_input_names(),
            vec!["Tatm", "Ts", "coszen", "irradiance_factor", "day_of_year"]
        );
        assert!(process.diagnostic_names().contains(&"ASR".to_string()));
        assert!(!process.diagnostic_names().contains(&"SW_dflux_up_dTs".to_string()));
    }

    #[test]
    fn test_incoming_flux_at_top() {
        let state = column(0.5);
        let outputs = process().compute_outputs(&InputState::build(&state)).unwrap();

        assert_relative_eq!(outputs.diagnostics.flux_down[[0, 0]], 1365.2 * 0.5);
        assert_relative_eq!(
            outputs.diagnostics.asr[0],
            1365.2 * 0.5 - outputs.diagnostics.swup_toa[0]
        );
        assert!(outputs.diagnostics.asr[0] > 0.0);
        assert!(outputs.tendencies.ts[[0, 0]] > 0.0);
        assert!(outputs.diagnostics.tdot.iter().all(|t| *t >= 0.0));
    }

    #[test]
    fn test_night_gives_zero() {
        let state = column(-0.3);
        let output = process().compute(&InputState::build(&state)).unwrap();

        assert!(output.tendency("Tatm").unwrap().iter().all(|t| *t == 0.0));
        assert_eq!(output.tendency("Ts").unwrap(), &array![[0.0]]);
        assert_eq!(output.diagnostic("ASR").unwrap().to_scalar(), 0.0);
    }

    #[test]
    fn test_day_of_year_overrides_irradiance_factor() {
        let state = column(1.0)
            .with_input("day_of_year", 3.0)
            .with_input("irradiance_factor", 0.5);
        let outputs = process().compute_outputs(&InputState::build(&state)).unwrap();

        assert_relative_eq!(
            outputs.diagnostics.flux_down[[0, 0]],
            1365.2 * earth_sun_factor(3)
        );
    }

    #[test]
    fn test_irradiance_factor() {
        let state = column(1.0).with_input("irradiance_factor", 0.25);
        let outputs = process().compute_outputs(&InputState::build(&state)).unwrap();
        assert_relative_eq!(outputs.diagnostics.flux_down[[0, 0]], 1365.2 * 0.25);
    }

    #[test]
    fn test_missing_coszen() {
        let grid = ColumnGrid::uniform(2, 1000.0).unwrap();
        let tatm = StateVariable::atmosphere(&grid, Array2::from_elem((1, 2), 260.0)).unwrap();
        let ts = StateVariable::surface(Array1::from_elem(1, 288.0), 4.0e6).unwrap();
        let state = ColumnState::new(grid)
            .with_variable("Tatm", tatm)
            .unwrap()
            .with_variable("Ts", ts)
            .unwrap();

        let err = process().compute(&InputState::build(&state)).unwrap_err();
        assert!(matches!(err, ClimradError::MissingInput(name) if name == "coszen"));
    }

    #[test]
    fn test_derivative_symmetry_with_longwave() {
        let config = RadiationConfig {
            surface_derivative: true,
            ..Default::default()
        };
        let process = RrtmgShortwave::new(config, GrayShortwave::default()).unwrap();
        let state = column(1.0);
        let output = process.compute(&InputState::build(&state)).unwrap();

        let derivative = output.diagnostic("SW_dflux_up_dTs").unwrap();
        assert_eq!(derivative.shape(), vec![1, 7]);
        assert_eq!(derivative.to_scalar(), 0.0);
    }
}
