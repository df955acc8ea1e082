//! Error types for field access and workspace operations

use bemkit_idd::{IddError, ValueError};

use crate::handle::Handle;
use crate::validity::{DataError, Strictness};

/// Error type for reading or writing a single field
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FieldError {
    #[error("Field {index} out of range ({len} fields)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Field {index} holds {value:?}, which is not a valid {expected}")]
    TypeMismatch {
        index: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Required field {index} is empty")]
    MissingRequiredField { index: usize },

    #[error("Invalid value for field {index}: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValueError,
    },

    #[error("Field {index}: {value:?} is reserved for object handles")]
    ReservedName { index: usize, value: String },

    /// Reference fields are written through the workspace
    #[error("Field {index} is an object reference")]
    ReferenceField { index: usize },

    #[error("Object type has no extensible group")]
    NotExtensible,

    #[error("Extensible group needs {expected} values, got {got}")]
    GroupSize { expected: usize, got: usize },

    #[error("Extensible group limit of {max} reached")]
    GroupLimit { max: usize },

    #[error("Extensible group {group} does not exist")]
    NoSuchGroup { group: usize },
}

/// Error type for workspace operations
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Schema(#[from] IddError),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("No object with handle {0}")]
    UnknownHandle(Handle),

    #[error("Field {index} of {object_type} is not an object reference")]
    NotAReference { object_type: String, index: usize },

    #[error("{target_type} is not a valid target for field {index} of {object_type}")]
    InvalidReferenceType {
        object_type: String,
        index: usize,
        target_type: String,
    },

    #[error("{value:?} does not name a valid target for field {index}")]
    UnresolvedReference { index: usize, value: String },

    #[error(transparent)]
    Parse(#[from] crate::idf::IdfParseError),

    #[error("line {line}: {object_type}: {source}")]
    InvalidRecord {
        line: usize,
        object_type: String,
        #[source]
        source: FieldError,
    },

    /// Loaded records failed the workspace's validity check; nothing was added
    #[error("{} problems at {level:?} strictness in loaded records", .errors.len())]
    InvalidRecords {
        level: Strictness,
        errors: Vec<DataError>,
    },
}

/// Error type for unit conversion
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UnitError {
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    #[error("Cannot convert {from} to {to}")]
    Incompatible { from: String, to: String },
}
