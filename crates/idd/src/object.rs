//! Object type definitions
//!
//! An [`ObjectSchema`] is the positional layout of one object type: a fixed
//! list of fields followed by zero or more copies of an optional extensible
//! group.
//!
//! ```text
//! ┌──────────────── fixed fields ───────────────┬──── group 0 ────┬──── group 1 ────┐
//! │ Name │ Field 1 │ ... │ Field n-1            │ g[0] │ ... g[m] │ g[0] │ ... g[m] │
//! └─────────────────────────────────────────────┴─────────────────┴─────────────────┘
//! ```

use std::collections::HashMap;

use crate::field::FieldSchema;

/// One object type definition
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    name: String,
    fields: Vec<FieldSchema>,
    extensible: Vec<FieldSchema>,
    unique: bool,
    max_fields: Option<usize>,
    /// lowercase field name -> fixed field index
    field_lookup: HashMap<String, usize>,
    /// lowercase field name -> offset within the extensible group
    group_lookup: HashMap<String, usize>,
}

impl ObjectSchema {
    /// Start building an object type definition
    pub fn builder(name: impl Into<String>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
            extensible: Vec::new(),
            unique: false,
            max_fields: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fixed (non-extensible) fields
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Field template of one extensible group (empty if not extensible)
    pub fn extensible_group(&self) -> &[FieldSchema] {
        &self.extensible
    }

    /// Number of fixed fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Number of fields in one extensible group
    pub fn group_size(&self) -> usize {
        self.extensible.len()
    }

    pub fn is_extensible(&self) -> bool {
        !self.extensible.is_empty()
    }

    /// At most one instance of this type may live in a workspace
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn max_fields(&self) -> Option<usize> {
        self.max_fields
    }

    /// Maximum number of extensible groups, if limited
    pub fn max_groups(&self) -> Option<usize> {
        match (self.max_fields, self.group_size()) {
            (Some(max), size) if size > 0 => Some(max.saturating_sub(self.num_fields()) / size),
            _ => None,
        }
    }

    /// Index of the name field, if this type is named
    pub fn name_field_index(&self) -> Option<usize> {
        self.fields.first().filter(|f| f.is_name).map(|_| 0)
    }

    pub fn has_name_field(&self) -> bool {
        self.name_field_index().is_some()
    }

    /// Resolve a fixed field name to its index (case-insensitive)
    pub fn field_index(&self, field_name: &str) -> Option<usize> {
        self.field_lookup.get(&field_name.to_lowercase()).copied()
    }

    /// Resolve an extensible field name to its offset within a group
    pub fn group_offset(&self, field_name: &str) -> Option<usize> {
        self.group_lookup.get(&field_name.to_lowercase()).copied()
    }

    /// Field definition for any position, including extensible positions
    pub fn field(&self, index: usize) -> Option<&FieldSchema> {
        if index < self.fields.len() {
            return self.fields.get(index);
        }
        self.extensible_position(index)
            .and_then(|(_, offset)| self.extensible.get(offset))
    }

    /// Map an absolute index to `(group, offset)` for extensible positions
    pub fn extensible_position(&self, index: usize) -> Option<(usize, usize)> {
        let size = self.group_size();
        if size == 0 || index < self.fields.len() {
            return None;
        }
        let rel = index - self.fields.len();
        Some((rel / size, rel % size))
    }

    /// Absolute index of `offset` within extensible group `group`
    pub fn extensible_index(&self, group: usize, offset: usize) -> Option<usize> {
        (offset < self.group_size()).then(|| self.fields.len() + group * self.group_size() + offset)
    }

    /// Whether `len` is a legal field-array length for this type
    pub fn is_valid_len(&self, len: usize) -> bool {
        if len < self.fields.len() {
            return false;
        }
        let tail = len - self.fields.len();
        match self.group_size() {
            0 => tail == 0,
            size => tail % size == 0 && self.max_fields.map_or(true, |max| len <= max),
        }
    }
}

/// Builder for [`ObjectSchema`]
///
/// Field indices are assigned in declaration order by [`build`](Self::build).
#[derive(Debug)]
pub struct ObjectSchemaBuilder {
    name: String,
    fields: Vec<FieldSchema>,
    extensible: Vec<FieldSchema>,
    unique: bool,
    max_fields: Option<usize>,
}

impl ObjectSchemaBuilder {
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Append a field to the extensible group template
    pub fn extensible(mut self, field: FieldSchema) -> Self {
        self.extensible.push(field);
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn max_fields(mut self, max: usize) -> Self {
        self.max_fields = Some(max);
        self
    }

    /// Finish the definition
    ///
    /// Structural checks (duplicate names, missing choices, ...) run when the
    /// schema is added to a registry.
    pub fn build(self) -> ObjectSchema {
        let mut fields = self.fields;
        let mut extensible = self.extensible;

        for (i, field) in fields.iter_mut().enumerate() {
            field.index = i;
        }
        for (i, field) in extensible.iter_mut().enumerate() {
            field.index = i;
        }

        let field_lookup = fields
            .iter()
            .map(|f| (f.name.to_lowercase(), f.index))
            .collect();
        let group_lookup = extensible
            .iter()
            .map(|f| (f.name.to_lowercase(), f.index))
            .collect();

        ObjectSchema {
            name: self.name,
            fields,
            extensible,
            unique: self.unique,
            max_fields: self.max_fields,
            field_lookup,
            group_lookup,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ObjectSchema {
        ObjectSchema::builder("OS:Table")
            .field(FieldSchema::name_field())
            .field(FieldSchema::number("Scale"))
            .extensible(FieldSchema::number("X"))
            .extensible(FieldSchema::number("Y"))
            .max_fields(8)
            .build()
    }

    #[test]
    fn test_field_lookup() {
        let schema = table();
        assert_eq!(schema.field_index("scale"), Some(1));
        assert_eq!(schema.field_index("X"), None);
        assert_eq!(schema.group_offset("y"), Some(1));
        assert_eq!(schema.name_field_index(), Some(0));
    }

    #[test]
    fn test_extensible_positions() {
        let schema = table();
        assert_eq!(schema.extensible_position(1), None);
        assert_eq!(schema.extensible_position(2), Some((0, 0)));
        assert_eq!(schema.extensible_position(5), Some((1, 1)));
        assert_eq!(schema.extensible_index(1, 1), Some(5));
        assert_eq!(schema.extensible_index(0, 2), None);
        assert_eq!(schema.field(5).map(|f| f.name.as_str()), Some("Y"));
    }

    #[test]
    fn test_valid_lengths() {
        let schema = table();
        assert!(!schema.is_valid_len(1));
        assert!(schema.is_valid_len(2));
        assert!(!schema.is_valid_len(3));
        assert!(schema.is_valid_len(8));
        assert!(!schema.is_valid_len(10));
        assert_eq!(schema.max_groups(), Some(3));
    }

    #[test]
    fn test_unnamed_type() {
        let schema = ObjectSchema::builder("OS:Version")
            .field(FieldSchema::text("Version Identifier"))
            .unique()
            .build();
        assert!(schema.is_unique());
        assert!(!schema.has_name_field());
        assert!(!schema.is_extensible());
        assert!(schema.is_valid_len(1));
        assert!(!schema.is_valid_len(2));
    }
}
