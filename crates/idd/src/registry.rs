//! Schema registry
//!
//! The registry is the single source of truth for every object type's field
//! layout. It is built once (from a TOML description or programmatically),
//! is read-only afterwards, and is shared by reference (`Arc`) with every
//! workspace that uses it. There is no process-wide registry: independent
//! schema versions can be loaded side by side.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::error::IddError;
use crate::field::{FieldKind, FieldSchema};
use crate::object::ObjectSchema;
use crate::source::SchemaSource;

/// Loaded set of object type definitions
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    version: String,
    objects: Vec<Arc<ObjectSchema>>,
    /// lowercase type name -> position in `objects`
    lookup: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Start building a registry for the given schema version
    pub fn builder(version: impl Into<String>) -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            version: version.into(),
            objects: Vec::new(),
        }
    }

    /// Load a registry from a TOML schema description
    pub fn from_toml_str(content: &str) -> Result<Self, IddError> {
        let source: SchemaSource = toml::from_str(content)?;
        let registry = source.into_builder()?.build()?;
        info!(
            "Loaded schema version {} with {} object types",
            registry.version,
            registry.len()
        );
        Ok(registry)
    }

    /// Load a registry from a TOML schema file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IddError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!("Read schema from {:?}", path);
        Self::from_toml_str(&content)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of registered object types
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.lookup.contains_key(&type_name.to_lowercase())
    }

    /// Registered type names in declaration order
    pub fn object_types(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(|o| o.name())
    }

    /// Get the definition of an object type
    ///
    /// Type names are matched case-insensitively.
    pub fn get_schema(&self, type_name: &str) -> Result<&Arc<ObjectSchema>, IddError> {
        trace!("Schema lookup for {}", type_name);
        self.lookup
            .get(&type_name.to_lowercase())
            .map(|&i| &self.objects[i])
            .ok_or_else(|| IddError::UnknownType(type_name.to_string()))
    }

    /// Resolve a field name to its positional index
    pub fn field_index(&self, type_name: &str, field_name: &str) -> Result<usize, IddError> {
        let schema = self.get_schema(type_name)?;
        schema
            .field_index(field_name)
            .ok_or_else(|| IddError::UnknownField {
                object_type: schema.name().to_string(),
                field: field_name.to_string(),
            })
    }

    /// Allowed values of a Choice field; empty for any other kind
    pub fn valid_choice_values(
        &self,
        type_name: &str,
        field_index: usize,
    ) -> Result<BTreeSet<String>, IddError> {
        let schema = self.get_schema(type_name)?;
        schema
            .field(field_index)
            .map(FieldSchema::valid_choice_values)
            .ok_or_else(|| IddError::FieldIndexOutOfRange {
                object_type: schema.name().to_string(),
                index: field_index,
            })
    }
}

/// Builder for [`SchemaRegistry`]
#[derive(Debug)]
pub struct SchemaRegistryBuilder {
    version: String,
    objects: Vec<ObjectSchema>,
}

impl SchemaRegistryBuilder {
    pub fn object(mut self, schema: ObjectSchema) -> Self {
        self.objects.push(schema);
        self
    }

    /// Validate all definitions and freeze the registry
    pub fn build(self) -> Result<SchemaRegistry, IddError> {
        let mut lookup = HashMap::with_capacity(self.objects.len());
        for (i, object) in self.objects.iter().enumerate() {
            if lookup.insert(object.name().to_lowercase(), i).is_some() {
                return Err(IddError::InvalidSchema(format!(
                    "duplicate object type {}",
                    object.name()
                )));
            }
        }

        for object in &self.objects {
            validate_object(object, &lookup)?;
        }

        Ok(SchemaRegistry {
            version: self.version,
            objects: self.objects.into_iter().map(Arc::new).collect(),
            lookup,
        })
    }
}

fn validate_object(object: &ObjectSchema, types: &HashMap<String, usize>) -> Result<(), IddError> {
    let invalid = |msg: String| IddError::InvalidSchema(format!("{}: {}", object.name(), msg));

    if let Some(pos) = object.fields().iter().position(|f| f.is_name) {
        if pos != 0 {
            return Err(invalid("name field must be field 0".to_string()));
        }
    }
    if object.extensible_group().iter().any(|f| f.is_name) {
        return Err(invalid("extensible fields cannot be name fields".to_string()));
    }
    if let Some(max) = object.max_fields() {
        if max < object.num_fields() {
            return Err(invalid(format!("max_fields {} is below the fixed field count", max)));
        }
    }

    for fields in [object.fields(), object.extensible_group()] {
        let mut seen = HashSet::new();
        for field in fields {
            if !seen.insert(field.name.to_lowercase()) {
                return Err(invalid(format!("duplicate field {}", field.name)));
            }
            validate_field(field, types).map_err(|msg| invalid(format!("{}: {}", field.name, msg)))?;
        }
    }

    Ok(())
}

fn validate_field(field: &FieldSchema, types: &HashMap<String, usize>) -> Result<(), String> {
    match field.kind {
        FieldKind::Choice if field.choices.is_empty() => {
            return Err("choice field without choices".to_string());
        }
        FieldKind::ObjectReference => {
            if field.references.is_empty() {
                return Err("reference field without targets".to_string());
            }
            if let Some(missing) = field
                .references
                .iter()
                .find(|t| !types.contains_key(&t.to_lowercase()))
            {
                return Err(format!("reference target {} is not a registered type", missing));
            }
        }
        _ => {}
    }

    if !field.kind.is_numeric()
        && (field.minimum.is_some() || field.maximum.is_some() || field.units.is_some())
    {
        return Err("bounds and units only apply to numeric fields".to_string());
    }
    if (field.autosizable || field.autocalculatable) && field.kind != FieldKind::Number {
        return Err("only number fields can be autosized".to_string());
    }

    if let Some(default) = &field.default {
        if field.kind == FieldKind::ObjectReference {
            return Err("reference fields cannot have defaults".to_string());
        }
        match field.normalize(default) {
            Ok(normalized) if !normalized.is_empty() => {}
            Ok(_) => return Err("default is blank".to_string()),
            Err(e) => return Err(format!("default violates the field: {}", e)),
        }
    }

    Ok(())
}
