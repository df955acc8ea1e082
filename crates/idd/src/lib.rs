//! bemkit IDD - Input Data Dictionary
//!
//! This crate holds the schema side of bemkit: the definitions of every
//! object type a workspace can contain.
//!
//! - [`FieldSchema`] - one positional field (kind, default, bounds, choices)
//! - [`ObjectSchema`] - fixed fields plus an optional extensible group
//! - [`SchemaRegistry`] - the loaded, immutable set of object types
//!
//! Registries are usually loaded from a TOML description with
//! [`SchemaRegistry::from_toml_str`] or [`SchemaRegistry::from_path`].

mod error;
mod field;
mod object;
mod registry;
mod source;

pub use error::{IddError, ValueError};
pub use field::{FieldKind, FieldSchema, NumericBound, AUTOCALCULATE, AUTOSIZE};
pub use object::{ObjectSchema, ObjectSchemaBuilder};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
