//! The process abstraction shared by every radiative scheme.
//!
//! A process declares its inputs, tendencies and diagnostics up front and then,
//! given a read-only view of the host state, returns an [`OutputState`]. The
//! host owns the state and decides how to apply the tendencies.

use crate::errors::{ClimradError, ClimradResult};
use crate::state::{InputState, OutputState};
pub use crate::variable::{FieldShape, RequirementDefinition, RequirementType};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Process that computes tendencies and diagnostics from the column state
///
/// Processes are serialisable trait objects so that a full process tree can be
/// stored alongside the host configuration.
#[typetag::serde(tag = "type")]
pub trait Process: Debug + Send + Sync {
    /// Every input, tendency and diagnostic this process declares
    fn definitions(&self) -> Vec<RequirementDefinition>;

    /// Compute tendencies and diagnostics for the current state
    ///
    /// Implementations must not retain references into `input_state`.
    fn compute(&self, input_state: &InputState) -> ClimradResult<OutputState>;

    fn input_names(&self) -> Vec<String> {
        self.names_of(RequirementType::Input)
    }

    fn tendency_names(&self) -> Vec<String> {
        self.names_of(RequirementType::Tendency)
    }

    fn diagnostic_names(&self) -> Vec<String> {
        self.names_of(RequirementType::Diagnostic)
    }

    /// Names of the non-optional inputs
    fn required_input_names(&self) -> Vec<String> {
        self.definitions()
            .into_iter()
            .filter(|d| d.requirement_type == RequirementType::Input && !d.optional)
            .map(|d| d.name)
            .collect()
    }

    fn names_of(&self, requirement_type: RequirementType) -> Vec<String> {
        self.definitions()
            .into_iter()
            .filter(|d| d.requirement_type == requirement_type)
            .map(|d| d.name)
            .collect()
    }
}

/// A collection of named subprocesses evaluated against the same state
///
/// Tendencies of the subprocesses are summed, while diagnostics are published
/// under `name|diagnostic`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CompositeProcess {
    subprocesses: Vec<(String, Arc<dyn Process>)>,
}

impl CompositeProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subprocess
    ///
    /// Subprocess names must be unique and must not contain the `|` separator.
    pub fn add_subprocess(
        mut self,
        name: &str,
        process: Arc<dyn Process>,
    ) -> ClimradResult<Self> {
        if name.is_empty() || name.contains('|') {
            return Err(ClimradError::Configuration(format!(
                "Invalid subprocess name '{}'",
                name
            )));
        }
        if self.subprocesses.iter().any(|(n, _)| n == name) {
            return Err(ClimradError::Configuration(format!(
                "Duplicate subprocess name '{}'",
                name
            )));
        }
        self.subprocesses.push((name.to_string(), process));
        Ok(self)
    }

    pub fn subprocess(&self, name: &str) -> Option<&Arc<dyn Process>> {
        self.subprocesses
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.subprocesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subprocesses.is_empty()
    }
}

/// Merge the definitions of named subprocesses
///
/// Inputs and tendencies that are declared by several subprocesses appear
/// once. An input is optional only if every subprocess treats it as optional.
/// Diagnostics are prefixed by the subprocess name.
pub fn merge_definitions<'a>(
    subprocesses: impl IntoIterator<Item = (&'a str, Vec<RequirementDefinition>)>,
) -> Vec<RequirementDefinition> {
    let mut merged: Vec<RequirementDefinition> = Vec::new();
    for (name, definitions) in subprocesses {
        for definition in definitions {
            if definition.requirement_type == RequirementType::Diagnostic {
                merged.push(definition.prefixed(name));
                continue;
            }
            match merged.iter_mut().find(|d| {
                d.name == definition.name && d.requirement_type == definition.requirement_type
            }) {
                Some(existing) => existing.optional &= definition.optional,
                None => merged.push(definition),
            }
        }
    }
    merged
}

#[typetag::serde]
impl Process for CompositeProcess {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        merge_definitions(
            self.subprocesses
                .iter()
                .map(|(name, process)| (name.as_str(), process.definitions())),
        )
    }

    fn compute(&self, input_state: &InputState) -> ClimradResult<OutputState> {
        let mut output = OutputState::new();
        for (name, process) in self.subprocesses.iter() {
            debug!(subprocess = name.as_str(), "Computing subprocess");
            output.accumulate(name, process.compute(input_state)?)?;
        }
        Ok(output)
    }
}
