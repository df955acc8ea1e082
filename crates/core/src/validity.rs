//! Validity reports
//!
//! Setters never store a value their field rejects, but records loaded from
//! text are stored as written. A [`ValidityReport`] lists what is wrong with
//! a workspace at a given [`Strictness`].

use std::fmt;

use bemkit_idd::ValueError;
use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// How much checking a validity report performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// No checks
    None,
    /// Stored values against kind, range and choice lists
    #[default]
    Draft,
    /// Draft, plus required fields, required references and field counts
    Final,
}

/// What is wrong with one field or record
#[derive(Debug, Clone, PartialEq)]
pub enum DataErrorKind {
    InvalidValue(ValueError),
    MissingRequiredField,
    /// The stored reference does not resolve to an allowed target
    UnresolvedReference(String),
    InvalidFieldCount(usize),
}

/// One problem found by a validity check
#[derive(Debug, Clone, PartialEq)]
pub struct DataError {
    pub handle: Handle,
    pub object_type: String,
    /// Offending field, or `None` for record-level problems
    pub index: Option<usize>,
    pub field_name: Option<String>,
    pub kind: DataErrorKind,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.object_type, self.handle)?;
        if let Some(index) = self.index {
            match &self.field_name {
                Some(name) => write!(f, " field {} ({})", index, name)?,
                None => write!(f, " field {}", index)?,
            }
        }
        match &self.kind {
            DataErrorKind::InvalidValue(e) => write!(f, ": {}", e),
            DataErrorKind::MissingRequiredField => write!(f, ": required field is empty"),
            DataErrorKind::UnresolvedReference(value) => {
                write!(f, ": reference {:?} does not resolve", value)
            }
            DataErrorKind::InvalidFieldCount(n) => write!(f, ": {} fields is not a legal count", n),
        }
    }
}

/// Result of checking a workspace
#[derive(Debug, Clone, PartialEq)]
pub struct ValidityReport {
    pub level: Strictness,
    pub errors: Vec<DataError>,
}

impl ValidityReport {
    pub fn new(level: Strictness) -> Self {
        Self {
            level,
            errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors for one record
    pub fn errors_for(&self, handle: Handle) -> impl Iterator<Item = &DataError> {
        self.errors.iter().filter(move |e| e.handle == handle)
    }
}

impl fmt::Display for ValidityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return writeln!(f, "Valid at {:?} strictness", self.level);
        }
        writeln!(f, "{} errors at {:?} strictness:", self.errors.len(), self.level)?;
        for error in &self.errors {
            writeln!(f, "  {}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strictness_ordering() {
        assert!(Strictness::None < Strictness::Draft);
        assert!(Strictness::Draft < Strictness::Final);
        assert_eq!(Strictness::default(), Strictness::Draft);
    }

    #[test]
    fn test_report_display() {
        let mut report = ValidityReport::new(Strictness::Final);
        assert!(report.is_valid());

        report.errors.push(DataError {
            handle: Handle::from_raw(3),
            object_type: "OS:AirflowNetworkZone".to_string(),
            index: Some(1),
            field_name: Some("Thermal Zone Name".to_string()),
            kind: DataErrorKind::MissingRequiredField,
        });
        assert!(!report.is_valid());
        assert_eq!(report.errors_for(Handle::from_raw(3)).count(), 1);

        let text = report.to_string();
        assert!(text.contains("1 errors at Final strictness"));
        assert!(text.contains("OS:AirflowNetworkZone #3 field 1 (Thermal Zone Name): required field is empty"));
    }
}
