//! Combined longwave and shortwave radiation
//!
//! [`Rrtmg`] evaluates both spectral domains against the same state. The
//! tendencies of the two are summed element-wise and the diagnostics of each
//! stay addressable as `LW|<name>` and `SW|<name>`.

use crate::config::RadiationConfig;
use crate::driver::{LongwaveDriver, ShortwaveDriver};
use crate::gray::{GrayLongwave, GrayShortwave};
use crate::longwave::RrtmgLongwave;
use crate::shortwave::RrtmgShortwave;
use climrad_core::errors::ClimradResult;
use climrad_core::process::{merge_definitions, CompositeProcess, Process, RequirementDefinition};
use climrad_core::state::{InputState, OutputState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Name under which the longwave diagnostics are published
pub const LONGWAVE: &str = "LW";
/// Name under which the shortwave diagnostics are published
pub const SHORTWAVE: &str = "SW";

#[derive(Debug, Serialize, Deserialize)]
pub struct Rrtmg {
    longwave: RrtmgLongwave,
    shortwave: RrtmgShortwave,
}

impl Rrtmg {
    /// Build both domains from one configuration
    ///
    /// Each domain validates the configuration against its own driver. The
    /// seed separation is then checked again with the sub-column counts the
    /// two drivers actually use.
    pub fn new(
        config: RadiationConfig,
        longwave_driver: impl LongwaveDriver + 'static,
        shortwave_driver: impl ShortwaveDriver + 'static,
    ) -> ClimradResult<Self> {
        let longwave = RrtmgLongwave::new(config.clone(), longwave_driver)?;
        let shortwave = RrtmgShortwave::new(config, shortwave_driver)?;
        longwave.config().check_seeds(
            longwave.solver().subcolumn_count(),
            shortwave.solver().subcolumn_count(),
        )?;
        Ok(Self {
            longwave,
            shortwave,
        })
    }

    /// Both domains running on the gray reference drivers
    pub fn gray(config: RadiationConfig) -> ClimradResult<Self> {
        Self::new(config, GrayLongwave::default(), GrayShortwave::default())
    }

    pub fn longwave(&self) -> &RrtmgLongwave {
        &self.longwave
    }

    pub fn shortwave(&self) -> &RrtmgShortwave {
        &self.shortwave
    }

    /// Split into a generic composite so that other processes can be added
    pub fn into_composite(self) -> ClimradResult<CompositeProcess> {
        CompositeProcess::new()
            .add_subprocess(LONGWAVE, Arc::new(self.longwave))?
            .add_subprocess(SHORTWAVE, Arc::new(self.shortwave))
    }
}

#[typetag::serde]
impl Process for Rrtmg {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        merge_definitions([
            (LONGWAVE, self.longwave.definitions()),
            (SHORTWAVE, self.shortwave.definitions()),
        ])
    }

    fn compute(&self, input_state: &InputState) -> ClimradResult<OutputState> {
        let mut output = OutputState::new();
        output.accumulate(LONGWAVE, self.longwave.compute(input_state)?)?;
        output.accumulate(SHORTWAVE, self.shortwave.compute(input_state)?)?;
        debug!(
            diagnostics = output.diagnostics.len(),
            "Computed longwave and shortwave radiation"
        );
        Ok(output)
    }
}
