//! Error types for schema loading and lookup

/// Error type for schema registry operations
#[derive(Debug, thiserror::Error)]
pub enum IddError {
    #[error("Unknown object type: {0}")]
    UnknownType(String),

    #[error("Unknown field: {object_type}.{field}")]
    UnknownField { object_type: String, field: String },

    #[error("Field index {index} out of range for {object_type}")]
    FieldIndexOutOfRange { object_type: String, index: usize },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Failed to read a schema file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse a TOML schema description
    #[error("Failed to parse schema TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Reason a value was rejected by a field definition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("illegal character {0:?} in field value")]
    IllegalCharacter(char),

    #[error("{0:?} is not a number")]
    NotANumber(String),

    #[error("{0:?} is not an integer")]
    NotAnInteger(String),

    #[error("{0:?} does not fit a 32-bit integer")]
    IntegerOutOfRange(String),

    #[error("{value} is below the minimum {bound}")]
    BelowMinimum { value: f64, bound: String },

    #[error("{value} is above the maximum {bound}")]
    AboveMaximum { value: f64, bound: String },

    #[error("{0:?} is not one of the allowed choices")]
    InvalidChoice(String),
}
