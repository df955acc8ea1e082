//! Field store
//!
//! An [`IdfObject`] is one record: the handle it is known by, the schema of
//! its type, and a positional vector of string-encoded field values. The
//! vector always holds every fixed field plus a whole number of extensible
//! groups.
//!
//! Reads are public. Writes are crate-private and go through the
//! [`Workspace`](crate::Workspace), which keeps its name index, reference
//! resolution and change notifications consistent with the stored values.

use std::sync::Arc;

use bemkit_idd::{FieldKind, FieldSchema, ObjectSchema, AUTOCALCULATE, AUTOSIZE};
use tracing::warn;

use crate::error::FieldError;
use crate::group::GroupRef;
use crate::handle::Handle;

/// One data record
#[derive(Debug, Clone)]
pub struct IdfObject {
    handle: Handle,
    schema: Arc<ObjectSchema>,
    fields: Vec<String>,
    dirty: bool,
    comment: Option<String>,
    /// User comment per field position; may be shorter than `fields`
    field_comments: Vec<Option<String>>,
}

impl IdfObject {
    /// Create a record with every fixed field blank
    pub(crate) fn new(handle: Handle, schema: Arc<ObjectSchema>) -> Self {
        let fields = vec![String::new(); schema.num_fields()];
        Self {
            handle,
            schema,
            fields,
            dirty: true,
            comment: None,
            field_comments: Vec::new(),
        }
    }

    /// Create a record from raw values, padded or truncated to a legal length
    pub(crate) fn from_values(handle: Handle, schema: Arc<ObjectSchema>, values: Vec<String>) -> Self {
        let mut object = Self {
            handle,
            schema,
            fields: values,
            dirty: true,
            comment: None,
            field_comments: Vec::new(),
        };
        object.normalize_len();
        object
    }

    /// Attach comments read with the record
    pub(crate) fn with_comments(mut self, comment: Option<String>, mut field_comments: Vec<Option<String>>) -> Self {
        field_comments.truncate(self.fields.len());
        self.comment = comment.filter(|c| !c.trim().is_empty());
        self.field_comments = field_comments;
        self
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn schema(&self) -> &Arc<ObjectSchema> {
        &self.schema
    }

    /// Type name of this record
    pub fn object_type(&self) -> &str {
        self.schema.name()
    }

    /// Stored values, fixed fields first
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Total number of stored fields, including extensible groups
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Comment written above the record
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// User comment on one field
    pub fn field_comment(&self, index: usize) -> Option<&str> {
        self.field_comments.get(index).and_then(Option::as_deref)
    }

    pub(crate) fn field_comments(&self) -> &[Option<String>] {
        &self.field_comments
    }

    /// Replace the record comment; blank text removes it
    pub(crate) fn set_comment(&mut self, comment: &str) {
        let comment = comment.trim();
        let comment = (!comment.is_empty()).then(|| comment.to_string());
        if self.comment != comment {
            self.comment = comment;
            self.dirty = true;
        }
    }

    /// Replace one field's comment; blank text removes it
    ///
    /// Line breaks are folded into spaces. Returns `false` for out-of-range fields.
    pub(crate) fn set_field_comment(&mut self, index: usize, comment: &str) -> bool {
        if index >= self.fields.len() {
            return false;
        }
        let comment = comment
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let comment = (!comment.is_empty()).then_some(comment);
        if self.field_comments.len() <= index {
            if comment.is_none() {
                return true;
            }
            self.field_comments.resize(index + 1, None);
        }
        if self.field_comments[index] != comment {
            self.field_comments[index] = comment;
            self.dirty = true;
        }
        true
    }

    /// Non-blank value of the name field
    pub fn name(&self) -> Option<&str> {
        self.schema
            .name_field_index()
            .and_then(|i| self.raw(i))
            .filter(|v| !v.is_empty())
    }

    /// Field definition at `index`
    pub fn field_schema(&self, index: usize) -> Option<&FieldSchema> {
        if index < self.fields.len() {
            self.schema.field(index)
        } else {
            None
        }
    }

    fn field_schema_checked(&self, index: usize) -> Result<&FieldSchema, FieldError> {
        self.field_schema(index).ok_or(FieldError::IndexOutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    /// The stored string, without defaulting
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// Whether the stored string is blank (out-of-range fields count as blank)
    pub fn is_empty(&self, index: usize) -> bool {
        self.raw(index).map_or(true, str::is_empty)
    }

    /// Whether the field is blank and falls back to a schema default
    pub fn is_defaulted(&self, index: usize) -> bool {
        self.is_empty(index)
            && self
                .field_schema(index)
                .is_some_and(|f| f.default.is_some())
    }

    /// Whether the field holds, or defaults to, "Autosize"
    pub fn is_autosized(&self, index: usize) -> bool {
        self.get_string(index)
            .is_some_and(|v| v.eq_ignore_ascii_case(AUTOSIZE))
    }

    pub fn is_autocalculated(&self, index: usize) -> bool {
        self.get_string(index)
            .is_some_and(|v| v.eq_ignore_ascii_case(AUTOCALCULATE))
    }

    /// Get a field value, falling back to the schema default when blank
    ///
    /// Returns `None` when the field is blank without a default, or out of range.
    pub fn get_string(&self, index: usize) -> Option<String> {
        let value = self.raw(index)?;
        if !value.is_empty() {
            return Some(value.to_string());
        }
        self.field_schema(index).and_then(|f| f.default.clone())
    }

    /// Get a field that must be populated
    pub fn get_required_string(&self, index: usize) -> Result<String, FieldError> {
        self.field_schema_checked(index)?;
        self.get_string(index)
            .ok_or(FieldError::MissingRequiredField { index })
    }

    /// Parse a field as a number
    ///
    /// Blank fields and the autosize/autocalculate keywords read as `Ok(None)`.
    pub fn try_get_double(&self, index: usize) -> Result<Option<f64>, FieldError> {
        self.field_schema_checked(index)?;
        let Some(value) = self.get_string(index) else {
            return Ok(None);
        };
        if value.eq_ignore_ascii_case(AUTOSIZE) || value.eq_ignore_ascii_case(AUTOCALCULATE) {
            return Ok(None);
        }
        parse_double(&value)
            .map(Some)
            .ok_or(FieldError::TypeMismatch {
                index,
                value,
                expected: "number",
            })
    }

    /// Parse a field as an integer
    pub fn try_get_int(&self, index: usize) -> Result<Option<i32>, FieldError> {
        self.field_schema_checked(index)?;
        let Some(value) = self.get_string(index) else {
            return Ok(None);
        };
        parse_int(&value)
            .map(Some)
            .ok_or(FieldError::TypeMismatch {
                index,
                value,
                expected: "integer",
            })
    }

    /// Read a `Yes`/`No` choice field
    pub fn try_get_bool(&self, index: usize) -> Result<Option<bool>, FieldError> {
        self.field_schema_checked(index)?;
        let Some(value) = self.get_string(index) else {
            return Ok(None);
        };
        if value.eq_ignore_ascii_case("yes") {
            Ok(Some(true))
        } else if value.eq_ignore_ascii_case("no") {
            Ok(Some(false))
        } else {
            Err(FieldError::TypeMismatch {
                index,
                value,
                expected: "Yes/No",
            })
        }
    }

    /// Like [`try_get_double`](Self::try_get_double), logging and discarding mismatches
    pub fn get_double(&self, index: usize) -> Option<f64> {
        self.try_get_double(index)
            .unwrap_or_else(|e| self.log_mismatch(e))
    }

    pub fn get_int(&self, index: usize) -> Option<i32> {
        self.try_get_int(index)
            .unwrap_or_else(|e| self.log_mismatch(e))
    }

    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.try_get_bool(index)
            .unwrap_or_else(|e| self.log_mismatch(e))
    }

    fn log_mismatch<T>(&self, error: FieldError) -> Option<T> {
        warn!("{} {}: {}", self.object_type(), self.handle, error);
        None
    }

    /// Validate a candidate value and return its canonical stored form
    ///
    /// Reference fields are rejected; their values are resolved by the workspace.
    /// Names that read as a serialized handle are refused.
    pub(crate) fn validate(&self, index: usize, value: &str) -> Result<String, FieldError> {
        let field = self.field_schema_checked(index)?;
        if field.kind == FieldKind::ObjectReference {
            return Err(FieldError::ReferenceField { index });
        }
        let normalized = field
            .normalize(value)
            .map_err(|source| FieldError::Invalid { index, source })?;
        if self.schema.name_field_index() == Some(index) && normalized.parse::<Handle>().is_ok() {
            return Err(FieldError::ReservedName {
                index,
                value: normalized,
            });
        }
        Ok(normalized)
    }

    /// Validate and store a value
    ///
    /// Returns the previous value when the stored string changed.
    pub(crate) fn set_string(&mut self, index: usize, value: &str) -> Result<Option<String>, FieldError> {
        let normalized = self.validate(index, value)?;
        Ok(self.write(index, normalized))
    }

    /// Store an already-validated value
    pub(crate) fn write(&mut self, index: usize, value: String) -> Option<String> {
        let slot = self.fields.get_mut(index)?;
        if *slot == value {
            return None;
        }
        self.dirty = true;
        Some(std::mem::replace(slot, value))
    }

    // === Extensible groups ===

    /// Number of extensible groups currently stored
    pub fn num_extensible_groups(&self) -> usize {
        match self.schema.group_size() {
            0 => 0,
            size => (self.fields.len() - self.schema.num_fields()) / size,
        }
    }

    /// Borrowed views of every extensible group, in insertion order
    pub fn extensible_groups(&self) -> impl Iterator<Item = GroupRef<'_>> {
        (0..self.num_extensible_groups()).map(move |group| GroupRef::new(self, group))
    }

    /// Borrowed view of one extensible group
    pub fn extensible_group(&self, group: usize) -> Option<GroupRef<'_>> {
        (group < self.num_extensible_groups()).then(|| GroupRef::new(self, group))
    }

    /// Check that another group fits and that `values` match the group size
    pub(crate) fn check_group_push(&self, values: usize) -> Result<(), FieldError> {
        let size = self.schema.group_size();
        if size == 0 {
            return Err(FieldError::NotExtensible);
        }
        if values != 0 && values != size {
            return Err(FieldError::GroupSize {
                expected: size,
                got: values,
            });
        }
        if let Some(max) = self.schema.max_groups() {
            if self.num_extensible_groups() >= max {
                return Err(FieldError::GroupLimit { max });
            }
        }
        Ok(())
    }

    /// Insert a blank group at position `group` (appends when `group` is past the end)
    pub(crate) fn insert_blank_group(&mut self, group: usize) -> usize {
        let size = self.schema.group_size();
        let group = group.min(self.num_extensible_groups());
        let at = self.schema.num_fields() + group * size;
        self.fields
            .splice(at..at, std::iter::repeat(String::new()).take(size));
        if self.field_comments.len() > at {
            self.field_comments
                .splice(at..at, std::iter::repeat(None).take(size));
        }
        self.dirty = true;
        group
    }

    /// Remove one group, returning its values
    pub(crate) fn remove_group(&mut self, group: usize) -> Result<Vec<String>, FieldError> {
        if group >= self.num_extensible_groups() {
            return Err(FieldError::NoSuchGroup { group });
        }
        let size = self.schema.group_size();
        let at = self.schema.num_fields() + group * size;
        self.dirty = true;
        if self.field_comments.len() > at {
            let end = (at + size).min(self.field_comments.len());
            self.field_comments.drain(at..end);
        }
        Ok(self.fields.drain(at..at + size).collect())
    }

    /// Remove every group
    pub(crate) fn clear_groups(&mut self) -> Vec<String> {
        let fixed = self.schema.num_fields();
        if self.fields.len() > fixed {
            self.dirty = true;
        }
        self.field_comments.truncate(fixed);
        self.fields.split_off(fixed)
    }

    /// Pad or truncate to the nearest legal field count
    fn normalize_len(&mut self) {
        let fixed = self.schema.num_fields();
        let size = self.schema.group_size();
        if self.fields.len() <= fixed || size == 0 {
            if self.fields.len() > fixed {
                warn!(
                    "{} {}: dropping {} values past the last field",
                    self.object_type(),
                    self.handle,
                    self.fields.len() - fixed
                );
            }
            self.fields.resize(fixed, String::new());
            return;
        }

        let mut groups = (self.fields.len() - fixed).div_ceil(size);
        if let Some(max) = self.schema.max_groups() {
            if groups > max {
                warn!(
                    "{} {}: dropping {} extensible groups past the limit of {}",
                    self.object_type(),
                    self.handle,
                    groups - max,
                    max
                );
                groups = max;
            }
        }
        self.fields.resize(fixed + groups * size, String::new());
    }
}

pub(crate) fn parse_double(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn parse_int(value: &str) -> Option<i32> {
    let value = value.trim();
    value.parse::<i32>().ok().or_else(|| {
        parse_double(value)
            .filter(|v| v.fract() == 0.0 && *v >= i32::MIN as f64 && *v <= i32::MAX as f64)
            .map(|v| v as i32)
    })
}

/// Text form used when a number is written to a field
pub(crate) fn format_double(value: f64) -> String {
    format!("{}", value)
}
