//! Attribute parsing for the IddObject derive macro

use darling::{FromDeriveInput, FromField};
use syn::{DeriveInput, Generics, Ident, Lifetime, Type};

/// Parsed #[idd(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(idd), supports(struct_named))]
pub struct IddObjectArgs {
    /// Struct identifier
    pub ident: Ident,

    pub generics: Generics,

    /// Struct fields
    pub data: darling::ast::Data<(), IddFieldArgs>,

    /// Schema type name (e.g., "OS:ThermalZone")
    #[darling(rename = "object")]
    pub object_type: String,
}

impl IddObjectArgs {
    /// The workspace lifetime: the struct's first lifetime parameter
    pub fn workspace_lifetime(&self) -> Option<&Lifetime> {
        self.generics.lifetimes().next().map(|l| &l.lifetime)
    }
}

/// Parsed #[idd(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(idd))]
pub struct IddFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// Schema field name (e.g., "Coefficient1 Constant")
    /// If not specified, this is not a schema field (e.g., the handle field)
    #[darling(rename = "field")]
    pub field_name: Option<String>,

    /// The schema declares a default (generates `is_x_defaulted`)
    #[darling(default)]
    pub default: bool,

    /// Accepts "Autosize" (generates `is_x_autosized` and `autosize_x`)
    #[darling(default)]
    pub autosize: bool,

    /// Accepts "Autocalculate"
    #[darling(default)]
    pub autocalculate: bool,

    /// Whether this field is read-only (no setter or reset generated)
    #[darling(default)]
    pub readonly: bool,
}

impl IddFieldArgs {
    /// Check if this is a schema field (has field attribute)
    pub fn is_idd_field(&self) -> bool {
        self.field_name.is_some()
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.ident.as_ref().map(|i| i == name).unwrap_or(false)
    }
}

/// Parse a DeriveInput into IddObjectArgs
pub fn parse_idd_object(input: &DeriveInput) -> darling::Result<IddObjectArgs> {
    IddObjectArgs::from_derive_input(input)
}
