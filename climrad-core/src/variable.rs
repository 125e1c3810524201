//! Variable and requirement definitions.
//!
//! Processes declare the variables they read (inputs), the state variables they
//! produce a tendency for, and the diagnostics they publish. The host framework
//! uses these declarations to check that a process tree is consistent before any
//! step is taken.
//!
//! Well-known host variables are declared once with [`define_variable!`] in
//! [`crate::standard_variables`] so that names and units are not repeated as
//! string literals throughout the code base.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of a field relative to the column grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldShape {
    /// A single value shared by every column
    Scalar,
    /// One value per column
    Column,
    /// One value per column and layer
    Layer,
    /// One value per column and layer interface
    Interface,
    /// Per-band values for every column and layer
    Spectral,
}

impl fmt::Display for FieldShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldShape::Scalar => "Scalar",
            FieldShape::Column => "Column",
            FieldShape::Layer => "Layer",
            FieldShape::Interface => "Interface",
            FieldShape::Spectral => "Spectral",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequirementType {
    /// A value read from the host state
    Input,
    /// A state variable the process returns a tendency for
    Tendency,
    /// A derived quantity published for recording only
    Diagnostic,
}

/// A declared input, tendency or diagnostic of a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementDefinition {
    pub name: String,
    pub unit: String,
    pub requirement_type: RequirementType,
    pub shape: FieldShape,
    /// Optional inputs fall back to configured defaults; optional diagnostics
    /// are only published when the matching feature is enabled
    pub optional: bool,
}

impl RequirementDefinition {
    pub fn new(
        name: &str,
        unit: &str,
        requirement_type: RequirementType,
        shape: FieldShape,
    ) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            requirement_type,
            shape,
            optional: false,
        }
    }

    pub fn input(name: &str, unit: &str, shape: FieldShape) -> Self {
        Self::new(name, unit, RequirementType::Input, shape)
    }

    pub fn tendency(name: &str, unit: &str, shape: FieldShape) -> Self {
        Self::new(name, unit, RequirementType::Tendency, shape)
    }

    pub fn diagnostic(name: &str, unit: &str, shape: FieldShape) -> Self {
        Self::new(name, unit, RequirementType::Diagnostic, shape)
    }

    /// Mark the requirement as optional
    pub fn into_optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Copy of this definition with the name prefixed by `prefix|`
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            name: format!("{}|{}", prefix, self.name),
            ..self.clone()
        }
    }
}

/// Static metadata for a well-known host variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableDefinition {
    pub name: &'static str,
    pub unit: &'static str,
    pub shape: FieldShape,
    pub description: &'static str,
}

impl VariableDefinition {
    pub fn as_input(&self) -> RequirementDefinition {
        RequirementDefinition::input(self.name, self.unit, self.shape)
    }
}

/// Declare a well-known variable as a `VariableDefinition` constant.
///
/// ```
/// use climrad_core::define_variable;
/// use climrad_core::variable::FieldShape;
///
/// define_variable!(
///     VAR_EXAMPLE,
///     name = "Example",
///     unit = "K",
///     shape = FieldShape::Layer,
///     description = "An example variable",
/// );
/// assert_eq!(VAR_EXAMPLE.name, "Example");
/// ```
#[macro_export]
macro_rules! define_variable {
    (
        $ident:ident,
        name = $name:expr,
        unit = $unit:expr,
        shape = $shape:expr,
        description = $description:expr $(,)?
    ) => {
        pub const $ident: $crate::variable::VariableDefinition =
            $crate::variable::VariableDefinition {
                name: $name,
                unit: $unit,
                shape: $shape,
                description: $description,
            };
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_definition_keeps_metadata() {
        let def = RequirementDefinition::diagnostic("OLR", "W/m^2", FieldShape::Column);
        let prefixed = def.prefixed("LW");

        assert_eq!(prefixed.name, "LW|OLR");
        assert_eq!(prefixed.unit, "W/m^2");
        assert_eq!(prefixed.requirement_type, RequirementType::Diagnostic);
        assert_eq!(prefixed.shape, FieldShape::Column);
    }

    #[test]
    fn test_optional() {
        let def = RequirementDefinition::input("h2o", "1", FieldShape::Layer);
        assert!(!def.optional);
        assert!(def.into_optional().optional);
    }
}
