//! Energy conservation of the radiative tendencies.
//!
//! Summing the atmospheric and surface tendencies over a column must recover
//! the net downward flux at the top of the atmosphere.

mod common;

use approx::assert_relative_eq;
use climrad_core::process::Process;
use climrad_core::state::InputState;
use climrad_rrtmg::gray::{GrayLongwave, GrayShortwave};
use climrad_rrtmg::{RadiationConfig, Rrtmg, RrtmgLongwave, RrtmgShortwave};
use common::{earth_like_column, with_sun};
use ndarray::{Array2, Axis};

/// Column integral of the atmospheric tendency plus the surface tendency
fn column_total(tatm: &Array2<f64>, ts: &Array2<f64>) -> ndarray::Array1<f64> {
    tatm.sum_axis(Axis(1)) + ts.column(0)
}

mod longwave {
    use super::*;

    /// Everything the column loses escapes as outgoing longwave radiation
    #[test]
    fn test_column_loses_olr() {
        let state = earth_like_column(2, 20, 290.0);
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        let total = column_total(&outputs.tendencies.tatm, &outputs.tendencies.ts);
        for i in 0..2 {
            assert_relative_eq!(
                total[i],
                -outputs.diagnostics.olr[i],
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn test_surface_tendency_matches_net_flux() {
        let state = earth_like_column(1, 10, 288.0);
        let process = RrtmgLongwave::new(RadiationConfig::default(), GrayLongwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        assert_eq!(outputs.tendencies.ts.dim(), (1, 1));
        assert_relative_eq!(
            outputs.tendencies.ts[[0, 0]],
            -outputs.diagnostics.lw_sfc[0],
            max_relative = 1e-12
        );
    }
}

mod shortwave {
    use super::*;

    /// Everything absorbed at the top is deposited in the atmosphere or surface
    #[test]
    fn test_column_gains_asr() {
        let state = with_sun(earth_like_column(1, 20, 290.0), 0.6);
        let process = RrtmgShortwave::new(RadiationConfig::default(), GrayShortwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        let total = column_total(&outputs.tendencies.tatm, &outputs.tendencies.ts);
        assert!(outputs.diagnostics.asr[0] > 0.0);
        assert_relative_eq!(total[0], outputs.diagnostics.asr[0], max_relative = 1e-9);
        assert_relative_eq!(
            outputs.tendencies.ts[[0, 0]],
            outputs.diagnostics.sw_sfc[0],
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_night_column_is_untouched() {
        let state = with_sun(earth_like_column(1, 10, 290.0), 0.0);
        let process = RrtmgShortwave::new(RadiationConfig::default(), GrayShortwave::default()).unwrap();
        let outputs = process.compute_outputs(&InputState::build(&state)).unwrap();

        assert!(outputs.tendencies.tatm.iter().all(|v| *v == 0.0));
        assert_eq!(outputs.tendencies.ts[[0, 0]], 0.0);
        assert_eq!(outputs.diagnostics.asr[0], 0.0);
    }
}

mod combined {
    use super::*;

    /// The combined tendency is the element-wise sum of the two domains
    #[test]
    fn test_tendencies_are_summed() {
        let state = with_sun(earth_like_column(1, 10, 288.0), 0.8);
        let input = InputState::build(&state);
        let rrtmg = Rrtmg::gray(RadiationConfig::default()).unwrap();

        let lw = rrtmg.longwave().compute(&input).unwrap();
        let sw = rrtmg.shortwave().compute(&input).unwrap();
        let both = rrtmg.compute(&input).unwrap();

        for name in ["Tatm", "Ts"] {
            let expected = lw.tendency(name).unwrap() + sw.tendency(name).unwrap();
            assert_eq!(both.tendency(name).unwrap(), &expected);
        }
    }

    #[test]
    fn test_net_top_of_atmosphere_flux() {
        let state = with_sun(earth_like_column(1, 10, 288.0), 0.8);
        let rrtmg = Rrtmg::gray(RadiationConfig::default()).unwrap();
        let output = rrtmg.compute(&InputState::build(&state)).unwrap();

        let total = column_total(output.tendency("Tatm").unwrap(), output.tendency("Ts").unwrap());
        let asr = output.diagnostic("SW|ASR").unwrap().to_scalar();
        let olr = output.diagnostic("LW|OLR").unwrap().to_scalar();
        assert_relative_eq!(total[0], asr - olr, epsilon = 1e-8, max_relative = 1e-9);
    }
}
