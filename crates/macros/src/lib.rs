//! bemkit Proc Macros
//!
//! This crate provides `#[derive(IddObject)]`, which turns a struct of
//! `PhantomData` markers into a typed façade over one workspace record type.
//!
//! # Example
//!
//! ```ignore
//! use bemkit_core::{Handle, IddObject, Workspace};
//! use std::marker::PhantomData;
//!
//! #[derive(Clone, Copy, IddObject)]
//! #[idd(object = "OS:AirflowNetworkZone")]
//! pub struct AirflowNetworkZone<'w> {
//!     ws: &'w Workspace,
//!     handle: Handle,
//!
//!     #[idd(field = "Thermal Zone Name")]
//!     thermal_zone: PhantomData<ThermalZone<'w>>,
//!
//!     #[idd(field = "Ventilation Control Mode", default)]
//!     ventilation_control_mode: PhantomData<String>,
//!
//!     #[idd(field = "Minimum Venting Open Factor", default)]
//!     minimum_venting_open_factor: PhantomData<f64>,
//! }
//!
//! // Generated methods:
//! // - afn.thermal_zone() -> Option<ThermalZone>
//! // - afn.set_thermal_zone(&zone) -> bool
//! // - afn.ventilation_control_mode() -> String
//! // - afn.set_ventilation_control_mode("Constant") -> bool
//! // - afn.reset_ventilation_control_mode()
//! // - afn.is_ventilation_control_mode_defaulted() -> bool
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[idd(object = "OS:Type")]` - **Required.** The schema type name.
//!
//! The struct needs a workspace lifetime and `ws: &'w Workspace` and
//! `handle: Handle` fields.
//!
//! ## Field Attributes
//!
//! - `#[idd(field = "Field Name")]` - Mark as a schema field with the given name.
//! - `#[idd(default)]` - Generate `is_x_defaulted()`.
//! - `#[idd(autosize)]` - Generate `is_x_autosized()` and `autosize_x()`.
//! - `#[idd(autocalculate)]` - Generate `is_x_autocalculated()` and `autocalculate_x()`.
//! - `#[idd(readonly)]` - Don't generate a setter or reset.
//!
//! The marker type picks the accessors: `f64`, `i32`, `bool` (Yes/No choice
//! fields) and `String` are values, `Option<_>` of those makes the getter
//! optional, and any other type is the façade of a reference target.

mod idd_object;
mod parse;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for typed record façades
///
/// # Generated Code
///
/// For each schema field, the macro generates:
///
/// - A getter. Non-optional value getters panic when the field is blank
///   without a default; reference getters return `None` when dangling.
/// - A setter returning `false` when the value is rejected, and a
///   `reset_x()` that blanks the field, unless `readonly`
/// - Constants for the type and field names
///
/// Plus `insert`, `get_or_insert`, `all` and `by_name` constructors and
/// implementations of `ModelObject`, `PartialEq` and `Debug`.
///
/// Field indices are looked up in the workspace's registry on each access,
/// so one façade type works against any registry that defines its fields.
#[proc_macro_derive(IddObject, attributes(idd))]
pub fn derive_idd_object(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    idd_object::derive_idd_object(input).into()
}
