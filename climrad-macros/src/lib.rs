//! Procedural macros for climrad process development
//!
//! This crate provides a derive macro that generates the requirement
//! definitions and typed output structs of a radiative process, so that
//! variable names and units are written once.
//!
//! # Overview
//!
//! The `ProcessIO` derive macro reads three struct-level attributes:
//! - `#[inputs(...)]` - values read from the host state
//! - `#[tendencies(...)]` - state variables the process returns a tendency for
//! - `#[diagnostics(...)]` - derived quantities published for recording
//!
//! Each attribute holds a comma separated list of `field { key = value, ... }`
//! entries with the keys `name`, `unit`, `shape` (`"Scalar"`, `"Column"`,
//! `"Layer"`, `"Interface"` or `"Spectral"`) and `optional` (bool, default false).
//!
//! # Example
//!
//! ```ignore
//! use climrad_macros::ProcessIO;
//!
//! #[derive(ProcessIO)]
//! #[inputs(tatm { name = "Tatm", unit = "K", shape = "Layer" })]
//! #[tendencies(tatm { name = "Tatm", unit = "W / m^2", shape = "Layer" })]
//! #[diagnostics(
//!     olr { name = "OLR", unit = "W / m^2", shape = "Column" },
//!     dolr_dts { name = "dOLR_dTs", unit = "W / m^2 / K", shape = "Column", optional = true },
//! )]
//! pub struct Longwave {
//!     pub emissivity: f64,
//! }
//! ```
//!
//! This generates:
//! - `Longwave::generated_definitions()` returning every `RequirementDefinition`
//! - `LongwaveTendencies` with a `tatm: Array2<FloatValue>` field
//! - `LongwaveDiagnostics` with `olr: Array1<FloatValue>` and
//!   `dolr_dts: Option<Array1<FloatValue>>` fields
//! - `LongwaveOutputs` bundling both, convertible into an `OutputState`

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    braced, parse_macro_input, Attribute, Data, DeriveInput, Expr, ExprLit, Ident, Lit,
    MetaNameValue, Token,
};

/// Which section of the struct attributes an entry came from
#[derive(Clone, Copy, PartialEq)]
enum Section {
    Input,
    Tendency,
    Diagnostic,
}

/// Metadata for one declared variable
struct IoField {
    rust_name: Ident,
    variable_name: String,
    unit: String,
    shape: String,
    optional: bool,
}

/// `field { name = "...", unit = "...", shape = "...", optional = true }`
struct IoEntry {
    rust_name: Ident,
    values: Punctuated<MetaNameValue, Token![,]>,
}

impl Parse for IoEntry {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let rust_name: Ident = input.parse()?;
        let content;
        braced!(content in input);
        let values = content.parse_terminated(MetaNameValue::parse, Token![,])?;
        Ok(Self { rust_name, values })
    }
}

fn lit_str(value: &MetaNameValue) -> syn::Result<String> {
    match &value.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

fn lit_bool(value: &MetaNameValue) -> syn::Result<bool> {
    match &value.value {
        Expr::Lit(ExprLit {
            lit: Lit::Bool(b), ..
        }) => Ok(b.value),
        other => Err(syn::Error::new_spanned(other, "expected a boolean literal")),
    }
}

impl IoEntry {
    fn into_field(self) -> syn::Result<IoField> {
        let mut name = None;
        let mut unit = String::new();
        let mut shape = String::from("Scalar");
        let mut optional = false;

        for value in self.values.iter() {
            if value.path.is_ident("name") {
                name = Some(lit_str(value)?);
            } else if value.path.is_ident("unit") {
                unit = lit_str(value)?;
            } else if value.path.is_ident("shape") {
                shape = lit_str(value)?;
                if !matches!(shape.as_str(), "Scalar" | "Column" | "Layer" | "Interface" | "Spectral") {
                    return Err(syn::Error::new_spanned(
                        &value.value,
                        "shape must be one of Scalar, Column, Layer, Interface or Spectral",
                    ));
                }
            } else if value.path.is_ident("optional") {
                optional = lit_bool(value)?;
            } else {
                return Err(syn::Error::new_spanned(&value.path, "unknown key"));
            }
        }

        // Use rust field name if name not specified
        let variable_name = name.unwrap_or_else(|| self.rust_name.to_string());

        Ok(IoField {
            rust_name: self.rust_name,
            variable_name,
            unit,
            shape,
            optional,
        })
    }
}

fn parse_section(attr: &Attribute) -> syn::Result<Vec<IoField>> {
    let entries = attr.parse_args_with(Punctuated::<IoEntry, Token![,]>::parse_terminated)?;
    entries.into_iter().map(IoEntry::into_field).collect()
}

/// Extract the declared variables from the struct attributes
fn extract_io_fields(attrs: &[Attribute]) -> syn::Result<Vec<(Section, IoField)>> {
    let mut fields = Vec::new();
    for attr in attrs {
        let section = if attr.path().is_ident("inputs") {
            Section::Input
        } else if attr.path().is_ident("tendencies") {
            Section::Tendency
        } else if attr.path().is_ident("diagnostics") {
            Section::Diagnostic
        } else {
            continue;
        };
        for field in parse_section(attr)? {
            fields.push((section, field));
        }
    }
    Ok(fields)
}

fn shape_token(shape: &str) -> TokenStream2 {
    match shape {
        "Column" => quote! { ::climrad_core::variable::FieldShape::Column },
        "Layer" => quote! { ::climrad_core::variable::FieldShape::Layer },
        "Interface" => quote! { ::climrad_core::variable::FieldShape::Interface },
        "Spectral" => quote! { ::climrad_core::variable::FieldShape::Spectral },
        _ => quote! { ::climrad_core::variable::FieldShape::Scalar },
    }
}

/// Rust type used to hold a diagnostic of the given shape
fn diagnostic_type(shape: &str) -> TokenStream2 {
    match shape {
        "Column" => quote! { ::climrad_core::ndarray::Array1<::climrad_core::FloatValue> },
        "Layer" | "Interface" => {
            quote! { ::climrad_core::ndarray::Array2<::climrad_core::FloatValue> }
        }
        "Spectral" => quote! { ::climrad_core::ndarray::Array3<::climrad_core::FloatValue> },
        _ => quote! { ::climrad_core::FloatValue },
    }
}

fn state_value_variant(shape: &str) -> TokenStream2 {
    match shape {
        "Column" => quote! { ::climrad_core::state::StateValue::Column },
        "Layer" | "Interface" => quote! { ::climrad_core::state::StateValue::Profile },
        "Spectral" => quote! { ::climrad_core::state::StateValue::Spectral },
        _ => quote! { ::climrad_core::state::StateValue::Scalar },
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let tendencies_name = format_ident!("{}Tendencies", struct_name);
    let diagnostics_name = format_ident!("{}Diagnostics", struct_name);
    let outputs_name = format_ident!("{}Outputs", struct_name);

    if !matches!(input.data, Data::Struct(_)) {
        return Err(syn::Error::new_spanned(
            struct_name,
            "ProcessIO can only be derived for structs",
        ));
    }

    let fields = extract_io_fields(&input.attrs)?;

    let definitions: Vec<TokenStream2> = fields
        .iter()
        .map(|(section, f)| {
            let name = &f.variable_name;
            let unit = &f.unit;
            let shape = shape_token(&f.shape);
            let requirement_type = match section {
                Section::Input => quote! { Input },
                Section::Tendency => quote! { Tendency },
                Section::Diagnostic => quote! { Diagnostic },
            };
            let optional = f.optional;
            quote! {
                ::climrad_core::variable::RequirementDefinition {
                    optional: #optional,
                    ..::climrad_core::variable::RequirementDefinition::new(
                        #name,
                        #unit,
                        ::climrad_core::variable::RequirementType::#requirement_type,
                        #shape,
                    )
                }
            }
        })
        .collect();

    let tendencies: Vec<&IoField> = fields
        .iter()
        .filter(|(s, _)| *s == Section::Tendency)
        .map(|(_, f)| f)
        .collect();
    let diagnostics: Vec<&IoField> = fields
        .iter()
        .filter(|(s, _)| *s == Section::Diagnostic)
        .map(|(_, f)| f)
        .collect();

    // Tendencies are always shaped like their state variable, (ncol, n)
    let tendency_struct_fields: Vec<TokenStream2> = tendencies
        .iter()
        .map(|f| {
            let name = &f.rust_name;
            quote! { pub #name: ::climrad_core::ndarray::Array2<::climrad_core::FloatValue> }
        })
        .collect();
    let tendency_conversions: Vec<TokenStream2> = tendencies
        .iter()
        .map(|f| {
            let name = &f.rust_name;
            let var_name = &f.variable_name;
            quote! { map.insert(#var_name.to_string(), tendencies.#name); }
        })
        .collect();

    let diagnostic_struct_fields: Vec<TokenStream2> = diagnostics
        .iter()
        .map(|f| {
            let name = &f.rust_name;
            let ty = diagnostic_type(&f.shape);
            if f.optional {
                quote! { pub #name: Option<#ty> }
            } else {
                quote! { pub #name: #ty }
            }
        })
        .collect();
    let diagnostic_conversions: Vec<TokenStream2> = diagnostics
        .iter()
        .map(|f| {
            let name = &f.rust_name;
            let var_name = &f.variable_name;
            let variant = state_value_variant(&f.shape);
            if f.optional {
                quote! {
                    if let Some(value) = diagnostics.#name {
                        map.insert(#var_name.to_string(), #variant(value));
                    }
                }
            } else {
                quote! { map.insert(#var_name.to_string(), #variant(diagnostics.#name)); }
            }
        })
        .collect();

    Ok(quote! {
        /// Generated tendency struct
        #[derive(Debug, Clone, PartialEq)]
        pub struct #tendencies_name {
            #(#tendency_struct_fields,)*
        }

        /// Generated diagnostic struct
        #[derive(Debug, Clone, PartialEq)]
        pub struct #diagnostics_name {
            #(#diagnostic_struct_fields,)*
        }

        /// Generated output struct
        #[derive(Debug, Clone, PartialEq)]
        pub struct #outputs_name {
            pub tendencies: #tendencies_name,
            pub diagnostics: #diagnostics_name,
        }

        impl #struct_name {
            /// Returns the requirement definitions declared for this process
            pub fn generated_definitions() -> Vec<::climrad_core::variable::RequirementDefinition> {
                vec![
                    #(#definitions,)*
                ]
            }
        }

        impl From<#tendencies_name> for ::climrad_core::state::Tendencies {
            fn from(tendencies: #tendencies_name) -> Self {
                let mut map = ::climrad_core::state::Tendencies::new();
                #(#tendency_conversions)*
                map
            }
        }

        impl From<#diagnostics_name> for ::climrad_core::state::Diagnostics {
            fn from(diagnostics: #diagnostics_name) -> Self {
                let mut map = ::climrad_core::state::Diagnostics::new();
                #(#diagnostic_conversions)*
                map
            }
        }

        impl From<#outputs_name> for ::climrad_core::state::OutputState {
            fn from(outputs: #outputs_name) -> Self {
                ::climrad_core::state::OutputState {
                    tendencies: outputs.tendencies.into(),
                    diagnostics: outputs.diagnostics.into(),
                }
            }
        }
    })
}

/// Derive macro for generating process requirement definitions and typed outputs
///
/// # Attributes
///
/// - `#[inputs(field { name = "...", unit = "...", shape = "...", optional = bool }, ...)]`
/// - `#[tendencies(...)]`
/// - `#[diagnostics(...)]`
///
/// # Generated Types
///
/// For a struct `Foo`, this macro generates:
/// - `FooTendencies` - one `Array2` per declared tendency
/// - `FooDiagnostics` - one field per diagnostic, `Option` when optional
/// - `FooOutputs` - both of the above, convertible into an `OutputState`
#[proc_macro_derive(ProcessIO, attributes(inputs, tendencies, diagnostics))]
pub fn derive_process_io(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}
