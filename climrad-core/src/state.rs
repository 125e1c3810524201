//! State management for radiative processes.
//!
//! This module provides the types passed across the process boundary:
//!
//! - [`StateValue`]: scalar, per-column, per-layer or spectral values
//! - [`StateVariable`]: a thermal field together with its heat capacity
//! - [`ColumnState`]: the host's column grid, state variables and auxiliary inputs
//! - [`InputState`]: the read-only view a process receives in `compute`
//! - [`OutputState`]: tendencies and diagnostics returned by a process
//!
//! Processes never mutate host state. The host applies returned tendencies
//! itself, for example with [`ColumnState::apply`].

use crate::errors::{ClimradError, ClimradResult};
use crate::grid::ColumnGrid;
use crate::FloatValue;
use ndarray::{Array1, Array2, Array3, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// State Value Types
// =============================================================================

/// A value that is either scalar or resolved over columns, layers or bands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StateValue {
    /// A single value shared by every column
    Scalar(FloatValue),
    /// One value per column
    Column(Array1<FloatValue>),
    /// One value per column and level, shape `(ncol, n)`
    Profile(Array2<FloatValue>),
    /// Rank-3 spectral optical properties
    Spectral(Array3<FloatValue>),
}

impl StateValue {
    /// Shape of the underlying data, empty for scalars
    pub fn shape(&self) -> Vec<usize> {
        match self {
            StateValue::Scalar(_) => vec![],
            StateValue::Column(v) => v.shape().to_vec(),
            StateValue::Profile(v) => v.shape().to_vec(),
            StateValue::Spectral(v) => v.shape().to_vec(),
        }
    }

    /// Convert to a scalar value, aggregating if necessary
    ///
    /// Non-scalar variants return the arithmetic mean of all values.
    pub fn to_scalar(&self) -> FloatValue {
        match self {
            StateValue::Scalar(v) => *v,
            StateValue::Column(v) => v.mean().unwrap_or(FloatValue::NAN),
            StateValue::Profile(v) => v.mean().unwrap_or(FloatValue::NAN),
            StateValue::Spectral(v) => v.mean().unwrap_or(FloatValue::NAN),
        }
    }

    pub fn as_scalar(&self) -> Option<FloatValue> {
        match self {
            StateValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_column(&self) -> Option<&Array1<FloatValue>> {
        match self {
            StateValue::Column(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&Array2<FloatValue>> {
        match self {
            StateValue::Profile(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_spectral(&self) -> Option<&Array3<FloatValue>> {
        match self {
            StateValue::Spectral(v) => Some(v),
            _ => None,
        }
    }

    /// Expand to a `(ncol, n)` array
    ///
    /// Scalars fill every element and per-column values are repeated along the
    /// levels. Profiles must already have the requested shape.
    pub fn broadcast_levels(&self, field: &str, ncol: usize, n: usize) -> ClimradResult<Array2<FloatValue>> {
        match self {
            StateValue::Scalar(v) => Ok(Array2::from_elem((ncol, n), *v)),
            StateValue::Column(v) if v.len() == ncol => Ok(Array2::from_shape_fn((ncol, n), |(i, _)| v[i])),
            StateValue::Profile(v) if v.dim() == (ncol, n) => Ok(v.clone()),
            other => Err(ClimradError::ShapeMismatch {
                field: field.to_string(),
                expected: vec![ncol, n],
                found: other.shape(),
            }),
        }
    }

    /// Expand to one value per column
    ///
    /// Profiles are accepted when they hold a single level.
    pub fn broadcast_columns(&self, field: &str, ncol: usize) -> ClimradResult<Array1<FloatValue>> {
        match self {
            StateValue::Scalar(v) => Ok(Array1::from_elem(ncol, *v)),
            StateValue::Column(v) if v.len() == ncol => Ok(v.clone()),
            StateValue::Profile(v) if v.dim() == (ncol, 1) => Ok(v.column(0).to_owned()),
            other => Err(ClimradError::ShapeMismatch {
                field: field.to_string(),
                expected: vec![ncol],
                found: other.shape(),
            }),
        }
    }
}

impl From<FloatValue> for StateValue {
    fn from(value: FloatValue) -> Self {
        StateValue::Scalar(value)
    }
}

impl From<Array1<FloatValue>> for StateValue {
    fn from(value: Array1<FloatValue>) -> Self {
        StateValue::Column(value)
    }
}

impl From<Array2<FloatValue>> for StateValue {
    fn from(value: Array2<FloatValue>) -> Self {
        StateValue::Profile(value)
    }
}

impl From<Array3<FloatValue>> for StateValue {
    fn from(value: Array3<FloatValue>) -> Self {
        StateValue::Spectral(value)
    }
}

// =============================================================================
// Thermal state variables
// =============================================================================

/// A temperature field and the heat capacity the host associates with it
///
/// Values are shaped `(ncol, n)`; the heat capacity has one entry per level
/// (J / m^2 / K) and is shared by all columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVariable {
    values: Array2<FloatValue>,
    heat_capacity: Array1<FloatValue>,
}

impl StateVariable {
    pub fn new(values: Array2<FloatValue>, heat_capacity: Array1<FloatValue>) -> ClimradResult<Self> {
        if values.ncols() != heat_capacity.len() {
            return Err(ClimradError::ShapeMismatch {
                field: "heat_capacity".to_string(),
                expected: vec![values.ncols()],
                found: vec![heat_capacity.len()],
            });
        }
        if heat_capacity.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return Err(ClimradError::InvalidValue {
                field: "heat_capacity".to_string(),
                reason: "heat capacities must be finite and positive".to_string(),
            });
        }
        Ok(Self {
            values,
            heat_capacity,
        })
    }

    /// Atmospheric temperatures on `grid`, using the grid's layer heat capacity
    pub fn atmosphere(grid: &ColumnGrid, values: Array2<FloatValue>) -> ClimradResult<Self> {
        if values.ncols() != grid.nlay() {
            return Err(ClimradError::ShapeMismatch {
                field: "Tatm".to_string(),
                expected: vec![values.nrows(), grid.nlay()],
                found: values.shape().to_vec(),
            });
        }
        Self::new(values, grid.heat_capacity())
    }

    /// Surface temperatures (one per column) with a single heat capacity
    pub fn surface(values: Array1<FloatValue>, heat_capacity: FloatValue) -> ClimradResult<Self> {
        Self::new(values.insert_axis(Axis(1)), Array1::from_elem(1, heat_capacity))
    }

    pub fn values(&self) -> &Array2<FloatValue> {
        &self.values
    }

    pub fn heat_capacity(&self) -> &Array1<FloatValue> {
        &self.heat_capacity
    }

    pub fn ncol(&self) -> usize {
        self.values.nrows()
    }

    /// Number of levels per column
    pub fn nlev(&self) -> usize {
        self.values.ncols()
    }
}

// =============================================================================
// Host column state
// =============================================================================

/// The host's state for a set of columns sharing one vertical grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnState {
    grid: ColumnGrid,
    variables: BTreeMap<String, StateVariable>,
    inputs: BTreeMap<String, StateValue>,
}

impl ColumnState {
    pub fn new(grid: ColumnGrid) -> Self {
        Self {
            grid,
            variables: BTreeMap::new(),
            inputs: BTreeMap::new(),
        }
    }

    /// Add a thermal state variable
    ///
    /// All state variables must describe the same number of columns.
    pub fn with_variable(mut self, name: &str, variable: StateVariable) -> ClimradResult<Self> {
        if let Some(ncol) = self.ncol() {
            if ncol != variable.ncol() {
                return Err(ClimradError::ShapeMismatch {
                    field: name.to_string(),
                    expected: vec![ncol, variable.nlev()],
                    found: variable.values().shape().to_vec(),
                });
            }
        }
        self.variables.insert(name.to_string(), variable);
        Ok(self)
    }

    /// Add an auxiliary input such as a gas profile or the solar zenith angle
    pub fn with_input(mut self, name: &str, value: impl Into<StateValue>) -> Self {
        self.set_input(name, value);
        self
    }

    pub fn set_input(&mut self, name: &str, value: impl Into<StateValue>) {
        self.inputs.insert(name.to_string(), value.into());
    }

    pub fn grid(&self) -> &ColumnGrid {
        &self.grid
    }

    /// Number of columns, if any state variable has been added
    pub fn ncol(&self) -> Option<usize> {
        self.variables.values().next().map(|v| v.ncol())
    }

    pub fn variable(&self, name: &str) -> Option<&StateVariable> {
        self.variables.get(name)
    }

    pub fn input(&self, name: &str) -> Option<&StateValue> {
        self.inputs.get(name)
    }

    /// Apply tendencies over a time step of `dt` seconds
    ///
    /// Each tendency (W / m^2) is divided by the heat capacity of its state
    /// variable, so that $\Delta T = F \, \Delta t / C$.
    pub fn apply(&mut self, output: &OutputState, dt: FloatValue) -> ClimradResult<()> {
        // Check every tendency first so that a failed update changes nothing
        for (name, tendency) in output.tendencies.iter() {
            let variable = self
                .variables
                .get(name)
                .ok_or_else(|| ClimradError::MissingInput(name.clone()))?;
            if tendency.dim() != variable.values.dim() {
                return Err(ClimradError::ShapeMismatch {
                    field: name.clone(),
                    expected: variable.values.shape().to_vec(),
                    found: tendency.shape().to_vec(),
                });
            }
        }

        for (name, tendency) in output.tendencies.iter() {
            if let Some(variable) = self.variables.get_mut(name) {
                let StateVariable {
                    values,
                    heat_capacity,
                } = variable;
                Zip::from(values.rows_mut())
                    .and(tendency.rows())
                    .for_each(|mut values, tend| {
                        Zip::from(&mut values)
                            .and(&tend)
                            .and(&*heat_capacity)
                            .for_each(|t, &f, &c| *t += f * dt / c);
                    });
            }
        }
        Ok(())
    }
}

/// Read-only view of the host state passed to a process
///
/// This is very similar to a reference to the [`ColumnState`], but lookups
/// return errors suitable for rejecting a step rather than options.
#[derive(Debug, Clone, Copy)]
pub struct InputState<'a> {
    state: &'a ColumnState,
}

impl<'a> InputState<'a> {
    pub fn build(state: &'a ColumnState) -> Self {
        Self { state }
    }

    pub fn grid(&self) -> &'a ColumnGrid {
        &self.state.grid
    }

    /// Number of columns, or zero when no state variable is present
    pub fn ncol(&self) -> usize {
        self.state.ncol().unwrap_or(0)
    }

    pub fn nlay(&self) -> usize {
        self.state.grid.nlay()
    }

    /// Get a thermal state variable
    pub fn variable(&self, name: &str) -> ClimradResult<&'a StateVariable> {
        self.state
            .variable(name)
            .ok_or_else(|| ClimradError::MissingInput(name.to_string()))
    }

    /// Get an auxiliary input if present
    pub fn get(&self, name: &str) -> Option<&'a StateValue> {
        self.state.input(name)
    }

    /// Get an auxiliary input that must be present
    pub fn require(&self, name: &str) -> ClimradResult<&'a StateValue> {
        self.get(name)
            .ok_or_else(|| ClimradError::MissingInput(name.to_string()))
    }

    /// Test if the state contains an input or state variable with the given name
    pub fn has(&self, name: &str) -> bool {
        self.state.inputs.contains_key(name) || self.state.variables.contains_key(name)
    }
}

// =============================================================================
// Output state
// =============================================================================

/// Tendencies keyed by state variable name, in W / m^2, shaped like the variable
pub type Tendencies = HashMap<String, Array2<FloatValue>>;

/// Diagnostics keyed by name
pub type Diagnostics = HashMap<String, StateValue>;

/// Output of a single process computation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputState {
    pub tendencies: Tendencies,
    pub diagnostics: Diagnostics,
}

impl OutputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tendency(&self, name: &str) -> Option<&Array2<FloatValue>> {
        self.tendencies.get(name)
    }

    pub fn diagnostic(&self, name: &str) -> Option<&StateValue> {
        self.diagnostics.get(name)
    }

    /// Fold the output of the subprocess `name` into this output
    ///
    /// Tendencies for the same state variable are summed element-wise.
    /// Diagnostics keep their origin and are stored as `name|diagnostic`.
    pub fn accumulate(&mut self, name: &str, other: OutputState) -> ClimradResult<()> {
        for (variable, tendency) in other.tendencies {
            match self.tendencies.get_mut(&variable) {
                Some(total) => {
                    if total.dim() != tendency.dim() {
                        return Err(ClimradError::ShapeMismatch {
                            field: variable,
                            expected: total.shape().to_vec(),
                            found: tendency.shape().to_vec(),
                        });
                    }
                    *total += &tendency;
                }
                None => {
                    self.tendencies.insert(variable, tendency);
                }
            }
        }
        for (diagnostic, value) in other.diagnostics {
            self.diagnostics
                .insert(format!("{}|{}", name, diagnostic), value);
        }
        Ok(())
    }
}
