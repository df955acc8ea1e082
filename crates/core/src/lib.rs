//! bemkit - Core Logic
//!
//! Typed-field records validated against a schema registry:
//! - [`IdfObject`] - one record, a positional vector of string-encoded fields
//! - [`Workspace`] - the arena owning every record, with type and name
//!   indexes, reference resolution and change notifications
//! - [`ModelObject`] / [`ParentObject`] - capabilities shared by façades
//! - [`idf`] - the IDF text codec
//!
//! Typed façades are generated with `#[derive(IddObject)]`.
//!
//! # Re-exports
//!
//! - [`idd`] - the schema registry crate

// Allow the crate to refer to itself as `bemkit_core` for proc macro compatibility
extern crate self as bemkit_core;

pub use bemkit_idd as idd;

pub mod config;
pub mod error;
pub mod facade;
pub mod group;
pub mod handle;
pub mod idf;
pub mod listeners;
pub mod object;
pub mod units;
pub mod validity;
pub mod workspace;

// Re-export commonly used items
pub use error::{FieldError, UnitError, WorkspaceError};
pub use facade::{ModelObject, ParentObject, WorkspaceObject};
pub use group::{ExtensibleGroup, GroupRef};
pub use handle::{Handle, ParseHandleError};
pub use idf::{IdfParseError, IdfRecord};
pub use listeners::{ChangeCallback, ListenerKey, WorkspaceEvent};
pub use object::IdfObject;
pub use units::{Quantity, UnitSystem};
pub use validity::{DataError, DataErrorKind, Strictness, ValidityReport};
pub use workspace::Workspace;

// Re-export schema types
pub use bemkit_idd::{FieldKind, FieldSchema, IddError, ObjectSchema, SchemaRegistry, ValueError};

// Re-export config types
pub use config::{ConfigError, ConfigResult, WorkspaceConfig};

// Re-export macros
pub use bemkit_macros::IddObject;
