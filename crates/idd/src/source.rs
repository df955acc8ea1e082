//! TOML schema description
//!
//! ```toml
//! version = "3.7.0"
//!
//! [[object]]
//! name = "OS:UtilityBill"
//! max_fields = 120
//!
//! [[object.field]]
//! name = "Name"
//! kind = "text"
//! is_name = true
//!
//! [[object.extensible]]
//! name = "Billing Period Begin Month"
//! kind = "integer"
//! minimum = 1
//! maximum = 12
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::IddError;
use crate::field::{FieldKind, FieldSchema, NumericBound};
use crate::object::ObjectSchema;
use crate::registry::{SchemaRegistry, SchemaRegistryBuilder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SchemaSource {
    pub version: String,
    #[serde(default, rename = "object")]
    pub objects: Vec<ObjectSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ObjectSource {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub max_fields: Option<usize>,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldSource>,
    #[serde(default)]
    pub extensible: Vec<FieldSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FieldSource {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_name: bool,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub minimum_exclusive: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub maximum_exclusive: Option<f64>,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub references: BTreeSet<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub ip_units: Option<String>,
    #[serde(default)]
    pub autosizable: bool,
    #[serde(default)]
    pub autocalculatable: bool,
}

/// Defaults may be written as TOML strings or numbers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum DefaultValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl DefaultValue {
    fn into_string(self) -> String {
        match self {
            DefaultValue::Text(s) => s,
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
        }
    }
}

impl SchemaSource {
    pub fn into_builder(self) -> Result<SchemaRegistryBuilder, IddError> {
        let mut builder = SchemaRegistry::builder(self.version);
        for object in self.objects {
            builder = builder.object(object.into_schema()?);
        }
        Ok(builder)
    }
}

impl ObjectSource {
    fn into_schema(self) -> Result<ObjectSchema, IddError> {
        let mut builder = ObjectSchema::builder(&self.name);
        for field in self.fields {
            builder = builder.field(field.into_schema(&self.name)?);
        }
        for field in self.extensible {
            builder = builder.extensible(field.into_schema(&self.name)?);
        }
        if self.unique {
            builder = builder.unique();
        }
        if let Some(max) = self.max_fields {
            builder = builder.max_fields(max);
        }
        Ok(builder.build())
    }
}

impl FieldSource {
    fn into_schema(self, object_type: &str) -> Result<FieldSchema, IddError> {
        let minimum = pick_bound(object_type, &self.name, self.minimum, self.minimum_exclusive)?;
        let maximum = pick_bound(object_type, &self.name, self.maximum, self.maximum_exclusive)?;

        let mut field = FieldSchema::new(self.name, self.kind);
        field.required = self.required;
        field.is_name = self.is_name;
        field.default = self.default.map(DefaultValue::into_string);
        field.minimum = minimum;
        field.maximum = maximum;
        field.choices = self.choices;
        field.references = self.references;
        field.units = self.units;
        field.ip_units = self.ip_units;
        field.autosizable = self.autosizable;
        field.autocalculatable = self.autocalculatable;
        Ok(field)
    }
}

fn pick_bound(
    object_type: &str,
    field: &str,
    inclusive: Option<f64>,
    exclusive: Option<f64>,
) -> Result<Option<NumericBound>, IddError> {
    match (inclusive, exclusive) {
        (Some(_), Some(_)) => Err(IddError::InvalidSchema(format!(
            "{}: {}: both inclusive and exclusive bound given",
            object_type, field
        ))),
        (Some(v), None) => Ok(Some(NumericBound::inclusive(v))),
        (None, Some(v)) => Ok(Some(NumericBound::exclusive(v))),
        (None, None) => Ok(None),
    }
}
