//! Solver invocation.
//!
//! A radiation solver is reached through the [`LongwaveDriver`] and
//! [`ShortwaveDriver`] traits: one opaque call per spectral domain that maps
//! assembled arguments to flux and heating-rate profiles. Drivers are
//! serialisable trait objects so that a process tree can be stored together
//! with the backend it runs on.
//!
//! [`Solver`] adds an explicit initialisation state around a driver. The
//! solver's tables are loaded exactly once, however many processes or threads
//! share it, and calls made before initialisation fail.

use crate::arguments::{LongwaveArguments, ShortwaveArguments};
use climrad_core::errors::{ClimradError, ClimradResult};
use climrad_core::FloatValue;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::sync::Mutex;
use tracing::{debug, info};

/// Number of longwave spectral bands
pub const NBNDLW: usize = 16;
/// Number of shortwave spectral bands
pub const NBNDSW: usize = 14;
/// Number of longwave g-points (McICA sub-columns)
pub const NGPTLW: usize = 140;
/// Number of shortwave g-points (McICA sub-columns)
pub const NGPTSW: usize = 112;
/// Number of ECMWF aerosol types
pub const NAEREC: usize = 6;

/// Spectral domain of a solver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Longwave,
    Shortwave,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Longwave => write!(f, "longwave"),
            Domain::Shortwave => write!(f, "shortwave"),
        }
    }
}

/// Fluxes and heating rates returned by a solver, in solver order
///
/// Fluxes are `(ncol, nlay + 1)` in W / m^2 and heating rates `(ncol, nlay)`
/// in K / day.
#[derive(Debug, Clone, PartialEq)]
pub struct RadiativeFluxes {
    pub flux_up: Array2<FloatValue>,
    pub flux_down: Array2<FloatValue>,
    pub heating_rate: Array2<FloatValue>,
    pub flux_up_clear: Array2<FloatValue>,
    pub flux_down_clear: Array2<FloatValue>,
    pub heating_rate_clear: Array2<FloatValue>,
    /// Derivative of the upward flux with respect to surface temperature
    /// (W / m^2 / K), only when requested
    pub dflux_up_dts: Option<Array2<FloatValue>>,
    pub dflux_up_dts_clear: Option<Array2<FloatValue>>,
}

/// Longwave radiation solver
#[typetag::serde(tag = "driver")]
pub trait LongwaveDriver: Debug + Send + Sync {
    /// Number of spectral bands the solver was built with
    fn band_count(&self) -> usize {
        NBNDLW
    }

    /// Number of McICA sub-columns
    fn subcolumn_count(&self) -> usize {
        NGPTLW
    }

    /// Load the solver's tables for an atmosphere with heat capacity `cp`
    fn initialise(&self, cp: FloatValue) -> ClimradResult<()>;

    fn run(&self, arguments: &LongwaveArguments) -> ClimradResult<RadiativeFluxes>;
}

/// Shortwave radiation solver
#[typetag::serde(tag = "driver")]
pub trait ShortwaveDriver: Debug + Send + Sync {
    fn band_count(&self) -> usize {
        NBNDSW
    }

    fn subcolumn_count(&self) -> usize {
        NGPTSW
    }

    fn initialise(&self, cp: FloatValue) -> ClimradResult<()>;

    fn run(&self, arguments: &ShortwaveArguments) -> ClimradResult<RadiativeFluxes>;
}

/// Common view over both driver traits
pub trait DriverInterface {
    const DOMAIN: Domain;
    type Arguments;

    fn bands(&self) -> usize;
    fn subcolumns(&self) -> usize;
    fn initialise_tables(&self, cp: FloatValue) -> ClimradResult<()>;
    fn call(&self, arguments: &Self::Arguments) -> ClimradResult<RadiativeFluxes>;
}

impl DriverInterface for dyn LongwaveDriver {
    const DOMAIN: Domain = Domain::Longwave;
    type Arguments = LongwaveArguments;

    fn bands(&self) -> usize {
        self.band_count()
    }

    fn subcolumns(&self) -> usize {
        self.subcolumn_count()
    }

    fn initialise_tables(&self, cp: FloatValue) -> ClimradResult<()> {
        self.initialise(cp)
    }

    fn call(&self, arguments: &LongwaveArguments) -> ClimradResult<RadiativeFluxes> {
        self.run(arguments)
    }
}

impl DriverInterface for dyn ShortwaveDriver {
    const DOMAIN: Domain = Domain::Shortwave;
    type Arguments = ShortwaveArguments;

    fn bands(&self) -> usize {
        self.band_count()
    }

    fn subcolumns(&self) -> usize {
        self.subcolumn_count()
    }

    fn initialise_tables(&self, cp: FloatValue) -> ClimradResult<()> {
        self.initialise(cp)
    }

    fn call(&self, arguments: &ShortwaveArguments) -> ClimradResult<RadiativeFluxes> {
        self.run(arguments)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverStatus {
    #[default]
    Uninitialised,
    Ready,
}

/// A driver together with its initialisation state
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "D: Serialize",
    deserialize = "Box<D>: Deserialize<'de>"
))]
pub struct Solver<D: ?Sized> {
    #[serde(skip)]
    status: Mutex<SolverStatus>,
    driver: Box<D>,
}

pub type LongwaveSolver = Solver<dyn LongwaveDriver>;
pub type ShortwaveSolver = Solver<dyn ShortwaveDriver>;

impl<D: DriverInterface + ?Sized> Solver<D> {
    pub fn new(driver: Box<D>) -> Self {
        Self {
            status: Mutex::new(SolverStatus::Uninitialised),
            driver,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn domain(&self) -> Domain {
        D::DOMAIN
    }

    pub fn band_count(&self) -> usize {
        self.driver.bands()
    }

    pub fn subcolumn_count(&self) -> usize {
        self.driver.subcolumns()
    }

    fn lock(&self) -> ClimradResult<std::sync::MutexGuard<'_, SolverStatus>> {
        self.status.lock().map_err(|_| ClimradError::SolverFailure {
            domain: D::DOMAIN.to_string(),
            message: "initialisation state is poisoned".to_string(),
        })
    }

    pub fn status(&self) -> ClimradResult<SolverStatus> {
        Ok(*self.lock()?)
    }

    /// Initialise the solver tables
    ///
    /// The driver is initialised at most once; later calls return immediately.
    /// A failed initialisation leaves the solver uninitialised.
    pub fn initialise(&self, cp: FloatValue) -> ClimradResult<()> {
        let mut status = self.lock()?;
        if *status == SolverStatus::Ready {
            return Ok(());
        }
        self.driver.initialise_tables(cp)?;
        *status = SolverStatus::Ready;
        info!(domain = %D::DOMAIN, cp, "Initialised radiation solver");
        Ok(())
    }

    /// Call the driver once
    ///
    /// Driver errors are passed through unchanged. There are no retries.
    pub fn run(&self, arguments: &D::Arguments) -> ClimradResult<RadiativeFluxes> {
        if self.status()? != SolverStatus::Ready {
            return Err(ClimradError::NotInitialised(D::DOMAIN.to_string()));
        }
        debug!(domain = %D::DOMAIN, "Calling radiation solver");
        self.driver.call(arguments)
    }
}

impl LongwaveSolver {
    pub fn longwave(driver: impl LongwaveDriver + 'static) -> Self {
        Self::new(Box::new(driver))
    }
}

impl ShortwaveSolver {
    pub fn shortwave(driver: impl ShortwaveDriver + 'static) -> Self {
        Self::new(Box::new(driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gray::GrayLongwave;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts initialisations and always fails to run
    #[derive(Debug, Default, Serialize, Deserialize)]
    struct CountingDriver {
        #[serde(skip)]
        initialised: Arc<AtomicUsize>,
    }

    #[typetag::serde]
    impl LongwaveDriver for CountingDriver {
        fn initialise(&self, _cp: FloatValue) -> ClimradResult<()> {
            self.initialised.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn run(&self, _arguments: &LongwaveArguments) -> ClimradResult<RadiativeFluxes> {
            Err(ClimradError::SolverFailure {
                domain: "longwave".to_string(),
                message: "table lookup out of bounds".to_string(),
            })
        }
    }

    #[test]
    fn test_initialise_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let solver = LongwaveSolver::longwave(CountingDriver {
            initialised: counter.clone(),
        });
        assert_eq!(solver.status().unwrap(), SolverStatus::Uninitialised);

        solver.initialise(1004.0).unwrap();
        solver.initialise(1004.0).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(solver.status().unwrap(), SolverStatus::Ready);
    }

    #[test]
    fn test_initialise_from_many_threads() {
        let counter = Arc::new(AtomicUsize::new(0));
        let solver = Arc::new(LongwaveSolver::longwave(CountingDriver {
            initialised: counter.clone(),
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let solver = solver.clone();
                std::thread::spawn(move || solver.initialise(1004.0))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_band_counts() {
        let solver = LongwaveSolver::longwave(GrayLongwave::default());
        assert_eq!(solver.domain(), Domain::Longwave);
        assert_eq!(solver.band_count(), NBNDLW);
        assert_eq!(solver.subcolumn_count(), NGPTLW);
    }

    #[test]
    fn test_serialise_solver() {
        let solver = LongwaveSolver::longwave(GrayLongwave::default());
        let serialised = serde_json::to_string(&solver).unwrap();
        assert!(serialised.contains("GrayLongwave"));

        let deserialised: LongwaveSolver = serde_json::from_str(&serialised).unwrap();
        assert_eq!(deserialised.status().unwrap(), SolverStatus::Uninitialised);
    }
}
