//! Field definitions
//!
//! A [`FieldSchema`] describes one positional slot of an object type: its
//! name, value kind, default, numeric bounds, allowed choices and reference
//! targets. Values are always stored as strings; [`FieldSchema::normalize`]
//! is the single place where a candidate string is checked against the
//! definition and brought into its canonical stored form.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValueError;

/// Keyword stored in autosizable number fields
pub const AUTOSIZE: &str = "Autosize";

/// Keyword stored in autocalculatable number fields
pub const AUTOCALCULATE: &str = "Autocalculate";

/// Characters that would break the positional text format
const ILLEGAL_CHARS: [char; 5] = [',', ';', '!', '\n', '\r'];

/// The value kind of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Integer,
    Choice,
    ObjectReference,
    Url,
}

impl FieldKind {
    /// Whether values of this kind are parsed as numbers
    pub const fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Number | FieldKind::Integer)
    }
}

/// An inclusive or exclusive numeric limit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericBound {
    pub value: f64,
    pub exclusive: bool,
}

impl NumericBound {
    pub const fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    pub const fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }

    /// Check `candidate` against this bound used as a minimum
    pub fn admits_from_below(&self, candidate: f64) -> bool {
        if self.exclusive {
            candidate > self.value
        } else {
            candidate >= self.value
        }
    }

    /// Check `candidate` against this bound used as a maximum
    pub fn admits_from_above(&self, candidate: f64) -> bool {
        if self.exclusive {
            candidate < self.value
        } else {
            candidate <= self.value
        }
    }
}

impl fmt::Display for NumericBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exclusive {
            write!(f, "{} (exclusive)", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// One field definition
///
/// Immutable once it is part of a loaded [`SchemaRegistry`](crate::SchemaRegistry).
/// For fields of an extensible group, `index` is the offset within the group.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub index: usize,
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub is_name: bool,
    pub default: Option<String>,
    pub minimum: Option<NumericBound>,
    pub maximum: Option<NumericBound>,
    /// Allowed values of a Choice field, in declaration order
    pub choices: Vec<String>,
    /// Object types a reference field may point at
    pub references: BTreeSet<String>,
    /// SI units of a Number field
    pub units: Option<String>,
    /// Preferred IP units of a Number field
    pub ip_units: Option<String>,
    pub autosizable: bool,
    pub autocalculatable: bool,
}

impl FieldSchema {
    /// Create a field of the given kind with no constraints
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            index: 0,
            name: name.into(),
            kind,
            required: false,
            is_name: false,
            default: None,
            minimum: None,
            maximum: None,
            choices: Vec::new(),
            references: BTreeSet::new(),
            units: None,
            ip_units: None,
            autosizable: false,
            autocalculatable: false,
        }
    }

    /// The conventional `Name` field (field 0)
    pub fn name_field() -> Self {
        let mut field = Self::new("Name", FieldKind::Text);
        field.is_name = true;
        field
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn url(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Url)
    }

    /// Shorthand for a choice field with fixed options
    pub fn choice<I, S>(name: impl Into<String>, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldKind::Choice);
        field.choices = choices.into_iter().map(Into::into).collect();
        field
    }

    /// Shorthand for an object reference field
    pub fn reference<I, S>(name: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field = Self::new(name, FieldKind::ObjectReference);
        field.references = targets.into_iter().map(Into::into).collect();
        field
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn with_minimum(mut self, value: f64) -> Self {
        self.minimum = Some(NumericBound::inclusive(value));
        self
    }

    pub fn with_minimum_exclusive(mut self, value: f64) -> Self {
        self.minimum = Some(NumericBound::exclusive(value));
        self
    }

    pub fn with_maximum(mut self, value: f64) -> Self {
        self.maximum = Some(NumericBound::inclusive(value));
        self
    }

    pub fn with_maximum_exclusive(mut self, value: f64) -> Self {
        self.maximum = Some(NumericBound::exclusive(value));
        self
    }

    pub fn with_units(mut self, si: impl Into<String>, ip: impl Into<String>) -> Self {
        self.units = Some(si.into());
        self.ip_units = Some(ip.into());
        self
    }

    pub fn autosizable(mut self) -> Self {
        self.autosizable = true;
        self
    }

    pub fn autocalculatable(mut self) -> Self {
        self.autocalculatable = true;
        self
    }

    /// Whether this is a `Yes`/`No` choice field
    pub fn is_boolean_choice(&self) -> bool {
        self.kind == FieldKind::Choice
            && self.choices.len() == 2
            && self.choices.iter().any(|c| c.eq_ignore_ascii_case("yes"))
            && self.choices.iter().any(|c| c.eq_ignore_ascii_case("no"))
    }

    /// Allowed values of a Choice field; empty for other kinds
    pub fn valid_choice_values(&self) -> BTreeSet<String> {
        if self.kind == FieldKind::Choice {
            self.choices.iter().cloned().collect()
        } else {
            BTreeSet::new()
        }
    }

    /// Whether `type_name` may be the target of this reference field
    pub fn accepts_reference_to(&self, type_name: &str) -> bool {
        self.kind == FieldKind::ObjectReference
            && self
                .references
                .iter()
                .any(|t| t.eq_ignore_ascii_case(type_name))
    }

    /// Check a candidate value and return its canonical stored form
    ///
    /// Blank values are always accepted; they mean "not set" and fall back
    /// to the default on read. Choice values are matched case-insensitively
    /// and stored with the schema's spelling.
    pub fn normalize(&self, value: &str) -> Result<String, ValueError> {
        if let Some(c) = value.chars().find(|c| ILLEGAL_CHARS.contains(c)) {
            return Err(ValueError::IllegalCharacter(c));
        }

        let value = value.trim();
        if value.is_empty() {
            return Ok(String::new());
        }

        match self.kind {
            FieldKind::Number => {
                if self.autosizable && value.eq_ignore_ascii_case(AUTOSIZE) {
                    return Ok(AUTOSIZE.to_string());
                }
                if self.autocalculatable && value.eq_ignore_ascii_case(AUTOCALCULATE) {
                    return Ok(AUTOCALCULATE.to_string());
                }
                let number = parse_finite(value)
                    .ok_or_else(|| ValueError::NotANumber(value.to_string()))?;
                self.check_bounds(number)?;
                Ok(value.to_string())
            }
            FieldKind::Integer => {
                let number = parse_finite(value)
                    .ok_or_else(|| ValueError::NotANumber(value.to_string()))?;
                if number.fract() != 0.0 {
                    return Err(ValueError::NotAnInteger(value.to_string()));
                }
                if number < f64::from(i32::MIN) || number > f64::from(i32::MAX) {
                    return Err(ValueError::IntegerOutOfRange(value.to_string()));
                }
                self.check_bounds(number)?;
                Ok((number as i32).to_string())
            }
            FieldKind::Choice => self
                .choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(value))
                .cloned()
                .ok_or_else(|| ValueError::InvalidChoice(value.to_string())),
            FieldKind::Text | FieldKind::Url | FieldKind::ObjectReference => {
                Ok(value.to_string())
            }
        }
    }

    fn check_bounds(&self, number: f64) -> Result<(), ValueError> {
        if let Some(min) = &self.minimum {
            if !min.admits_from_below(number) {
                return Err(ValueError::BelowMinimum {
                    value: number,
                    bound: min.to_string(),
                });
            }
        }
        if let Some(max) = &self.maximum {
            if !max.admits_from_above(number) {
                return Err(ValueError::AboveMaximum {
                    value: number,
                    bound: max.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
