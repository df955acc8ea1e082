//! Workspace
//!
//! The [`Workspace`] owns every record of one model, hands out handles, keeps
//! the type and name indexes in sync with the stored values, and resolves
//! reference fields on demand.
//!
//! All operations take `&self`. State lives behind a `RefCell`, which makes
//! the workspace `!Sync`: it belongs to one thread of control, and sharing it
//! across threads needs an external mutex. Listeners run after each mutation
//! has released the state, never during it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::Arc;

use bemkit_idd::{FieldKind, FieldSchema, IddError, ObjectSchema, SchemaRegistry};
use tracing::{debug, info, trace, warn};

use crate::config::WorkspaceConfig;
use crate::error::{FieldError, UnitError, WorkspaceError};
use crate::facade::WorkspaceObject;
use crate::group::ExtensibleGroup;
use crate::handle::Handle;
use crate::idf::{self, IdfRecord, RecordComments};
use crate::listeners::{ListenerKey, Listeners, WorkspaceEvent};
use crate::object::{format_double, IdfObject};
use crate::units::{self, Quantity, UnitSystem};
use crate::validity::{DataError, DataErrorKind, Strictness, ValidityReport};

/// Owning container of all records in one model
pub struct Workspace {
    registry: Arc<SchemaRegistry>,
    config: WorkspaceConfig,
    state: RefCell<State>,
    listeners: Listeners,
}

#[derive(Debug, Clone)]
struct State {
    last_handle: Handle,
    objects: BTreeMap<Handle, IdfObject>,
    /// lowercase type name -> handles of that type
    by_type: HashMap<String, BTreeSet<Handle>>,
    /// (lowercase type name, lowercase name) -> handle
    by_name: HashMap<(String, String), Handle>,
}

fn name_key(object_type: &str, name: &str) -> (String, String) {
    (object_type.to_lowercase(), name.to_lowercase())
}

impl State {
    fn new() -> Self {
        Self {
            last_handle: Handle::from_raw(0),
            objects: BTreeMap::new(),
            by_type: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    fn allocate(&mut self) -> Handle {
        self.last_handle = self.last_handle.next();
        self.last_handle
    }

    fn insert(&mut self, object: IdfObject) {
        let handle = object.handle();
        self.by_type
            .entry(object.object_type().to_lowercase())
            .or_default()
            .insert(handle);
        if let Some(name) = object.name() {
            self.by_name
                .insert(name_key(object.object_type(), name), handle);
        }
        self.objects.insert(handle, object);
    }

    fn remove(&mut self, handle: Handle) -> Option<IdfObject> {
        let object = self.objects.remove(&handle)?;
        let type_key = object.object_type().to_lowercase();
        if let Some(set) = self.by_type.get_mut(&type_key) {
            set.remove(&handle);
            if set.is_empty() {
                self.by_type.remove(&type_key);
            }
        }
        if let Some(name) = object.name() {
            let key = name_key(object.object_type(), name);
            if self.by_name.get(&key) == Some(&handle) {
                self.by_name.remove(&key);
            }
        }
        Some(object)
    }

    fn first_of_type(&self, object_type: &str) -> Option<Handle> {
        self.by_type
            .get(&object_type.to_lowercase())
            .and_then(|set| set.iter().next().copied())
    }

    /// Resolve a stored reference value: a serialized handle, or a target name
    ///
    /// A name shared by targets of several allowed types resolves to nothing.
    fn resolve(&self, field: &FieldSchema, value: &str) -> Option<Handle> {
        if value.is_empty() {
            return None;
        }
        if let Ok(handle) = value.parse::<Handle>() {
            return self
                .objects
                .get(&handle)
                .filter(|target| field.accepts_reference_to(target.object_type()))
                .map(|_| handle);
        }
        match self.named_targets(field, value).as_slice() {
            [target] => Some(*target),
            _ => None,
        }
    }

    /// Records of the field's target types named `name`
    fn named_targets(&self, field: &FieldSchema, name: &str) -> Vec<Handle> {
        field
            .references
            .iter()
            .filter_map(|target_type| self.by_name.get(&name_key(target_type, name)).copied())
            .collect()
    }

    /// Every (handle, field index) whose reference resolves to `target`
    fn referencing_fields(&self, target: Handle) -> Vec<(Handle, usize)> {
        let mut found = Vec::new();
        for (handle, object) in &self.objects {
            for (index, value) in object.fields().iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let Some(field) = object.schema().field(index) else {
                    continue;
                };
                if field.kind == FieldKind::ObjectReference && self.resolve(field, value) == Some(target) {
                    found.push((*handle, index));
                }
            }
        }
        found
    }

    /// Store a validated value, keeping the name index in sync
    fn write(&mut self, handle: Handle, index: usize, value: String) -> Option<WorkspaceEvent> {
        let object = self.objects.get_mut(&handle)?;
        let is_name = object.schema().name_field_index() == Some(index);
        let old_name = object.name().map(str::to_string);

        let old = object.write(index, value)?;
        let new = object.fields()[index].clone();

        if is_name {
            let object_type = object.object_type().to_string();
            if let Some(old_name) = old_name {
                let key = name_key(&object_type, &old_name);
                if self.by_name.get(&key) == Some(&handle) {
                    self.by_name.remove(&key);
                }
            }
            if !new.is_empty() {
                self.by_name.insert(name_key(&object_type, &new), handle);
            }
        }

        Some(WorkspaceEvent::FieldChanged {
            handle,
            index,
            old,
            new,
        })
    }

    /// `candidate`, or the next free suffixed name if another object of the type has it
    fn unique_name(&self, object_type: &str, handle: Handle, candidate: &str) -> String {
        match self.by_name.get(&name_key(object_type, candidate)) {
            Some(owner) if *owner != handle => self.next_name(object_type, candidate, false),
            _ => candidate.to_string(),
        }
    }

    /// Next name in the series `base`, `base 1`, `base 2`, ...
    ///
    /// With `fill_in` the lowest free suffix is used, otherwise one past the highest.
    fn next_name(&self, object_type: &str, name: &str, fill_in: bool) -> String {
        let (base, _, spacer) = split_name_suffix(name);
        let type_key = object_type.to_lowercase();

        let taken: BTreeSet<u64> = self
            .by_name
            .keys()
            .filter(|(t, _)| *t == type_key)
            .filter_map(|(_, existing)| {
                let (existing_base, suffix, _) = split_name_suffix(existing);
                suffix.filter(|_| existing_base.eq_ignore_ascii_case(base))
            })
            .collect();

        let mut suffix = if fill_in {
            (1u64..).find(|n| !taken.contains(n)).unwrap_or(1)
        } else {
            taken.iter().next_back().map_or(1, |max| max + 1)
        };
        loop {
            let candidate = format!("{}{}{}", base, spacer, suffix);
            if !self.by_name.contains_key(&name_key(object_type, &candidate)) {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Stored form of `value` for `field` at absolute position `index`
    fn stored_value(&self, field: &FieldSchema, index: usize, value: &str) -> Result<String, WorkspaceError> {
        if field.kind != FieldKind::ObjectReference {
            return field
                .normalize(value)
                .map_err(|source| FieldError::Invalid { index, source }.into());
        }
        let value = value.trim();
        if value.is_empty() {
            return Ok(String::new());
        }
        self.resolve(field, value)
            .map(|h| h.to_string())
            .ok_or_else(|| WorkspaceError::UnresolvedReference {
                index,
                value: value.to_string(),
            })
    }

    /// Problems with one record at the given strictness
    fn object_errors(&self, object: &IdfObject, level: Strictness) -> Vec<DataError> {
        let mut errors = Vec::new();
        if level == Strictness::None {
            return errors;
        }
        let schema = object.schema();
        let error = |index: Option<usize>, kind: DataErrorKind| DataError {
            handle: object.handle(),
            object_type: object.object_type().to_string(),
            index,
            field_name: index.and_then(|i| schema.field(i)).map(|f| f.name.clone()),
            kind,
        };

        if level >= Strictness::Final && !schema.is_valid_len(object.num_fields()) {
            errors.push(error(None, DataErrorKind::InvalidFieldCount(object.num_fields())));
        }

        for (index, value) in object.fields().iter().enumerate() {
            let Some(field) = schema.field(index) else {
                continue;
            };
            if value.is_empty() {
                if level >= Strictness::Final && field.required && field.default.is_none() {
                    errors.push(error(Some(index), DataErrorKind::MissingRequiredField));
                }
                continue;
            }
            if field.kind == FieldKind::ObjectReference {
                if level >= Strictness::Final && self.resolve(field, value).is_none() {
                    errors.push(error(Some(index), DataErrorKind::UnresolvedReference(value.clone())));
                }
            } else if let Err(e) = field.normalize(value) {
                errors.push(error(Some(index), DataErrorKind::InvalidValue(e)));
            }
        }
        errors
    }

    /// Text of a reference field as written to IDF: the target's name when it has one
    fn export_value(&self, field: &FieldSchema, value: &str) -> String {
        if field.kind != FieldKind::ObjectReference {
            return value.to_string();
        }
        self.resolve(field, value)
            .and_then(|h| self.objects.get(&h))
            .and_then(|target| target.name())
            .map_or_else(|| value.to_string(), str::to_string)
    }
}

/// Split `"Zone 12"` into `("Zone", Some(12), ' ')`
fn split_name_suffix(name: &str) -> (&str, Option<u64>, char) {
    if let Some(pos) = name.rfind([' ', '_']) {
        let digits = &name[pos + 1..];
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(suffix) = digits.parse() {
                let spacer = if name.as_bytes()[pos] == b'_' { '_' } else { ' ' };
                return (&name[..pos], Some(suffix), spacer);
            }
        }
    }
    let spacer = if name.contains('_') && !name.contains(' ') { '_' } else { ' ' };
    (name, None, spacer)
}

/// Generated name for a new object of `object_type`, e.g. `OS:ThermalZone` -> `ThermalZone`
fn default_base_name(object_type: &str) -> String {
    object_type
        .strip_prefix("OS:")
        .unwrap_or(object_type)
        .replace(':', " ")
}

impl Workspace {
    /// Create an empty workspace over a loaded schema registry
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_config(registry, WorkspaceConfig::default())
    }

    pub fn with_config(registry: Arc<SchemaRegistry>, config: WorkspaceConfig) -> Self {
        debug!(
            "Created workspace for schema version {}",
            registry.version()
        );
        Self {
            registry,
            config,
            state: RefCell::new(State::new()),
            listeners: Listeners::default(),
        }
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WorkspaceConfig) {
        self.config = config;
    }

    /// Resolve a field name of a registered type to its index
    pub fn field_index(&self, object_type: &str, field_name: &str) -> Result<usize, IddError> {
        self.registry.field_index(object_type, field_name)
    }

    // === Objects ===

    /// Add a new record of `object_type`
    ///
    /// For a unique type that already has an instance, the existing handle is
    /// returned instead.
    pub fn add_object(&self, object_type: &str) -> Result<Handle, WorkspaceError> {
        self.get_or_add_object(object_type).map(|(handle, _)| handle)
    }

    /// Like [`add_object`](Self::add_object), also reporting whether a record was created
    pub fn get_or_add_object(&self, object_type: &str) -> Result<(Handle, bool), WorkspaceError> {
        let schema = Arc::clone(self.registry.get_schema(object_type)?);

        let handle = {
            let mut state = self.state.borrow_mut();
            if schema.is_unique() {
                if let Some(existing) = state.first_of_type(schema.name()) {
                    trace!("{} is unique, reusing {}", schema.name(), existing);
                    return Ok((existing, false));
                }
            }

            let handle = state.allocate();
            let mut object = IdfObject::new(handle, Arc::clone(&schema));
            if self.config.auto_name && schema.has_name_field() {
                let name = state.next_name(schema.name(), &default_base_name(schema.name()), true);
                object.write(0, name);
            }
            state.insert(object);
            handle
        };

        debug!("Added {} {}", schema.name(), handle);
        self.listeners.fire(&[WorkspaceEvent::ObjectAdded {
            handle,
            object_type: schema.name().to_string(),
        }]);
        Ok((handle, true))
    }

    /// Remove a record, blanking every reference field that resolved to it
    ///
    /// Returns `false` if there was no such record.
    pub fn remove_object(&self, handle: Handle) -> bool {
        let events = {
            let mut state = self.state.borrow_mut();
            if !state.objects.contains_key(&handle) {
                return false;
            }

            let mut events = Vec::new();
            for (source, index) in state.referencing_fields(handle) {
                if source == handle {
                    continue;
                }
                debug!("Detaching field {} of {} from {}", index, source, handle);
                events.extend(state.write(source, index, String::new()));
            }

            let Some(removed) = state.remove(handle) else {
                return false;
            };
            events.push(WorkspaceEvent::ObjectRemoved {
                handle,
                object_type: removed.object_type().to_string(),
            });
            debug!("Removed {} {}", removed.object_type(), handle);
            events
        };

        self.listeners.fire(&events);
        true
    }

    /// Copy a record under a new handle
    ///
    /// Reference fields keep pointing at the same targets. The copy's name is
    /// made unique. Returns `None` for unknown handles and unique types.
    pub fn clone_object(&self, handle: Handle) -> Option<Handle> {
        let (new_handle, object_type) = {
            let mut state = self.state.borrow_mut();
            let source = state.objects.get(&handle)?;
            if source.schema().is_unique() {
                debug!("Refusing to clone unique {}", source.object_type());
                return None;
            }
            let schema = Arc::clone(source.schema());
            let values = source.fields().to_vec();
            let name = source.name().map(str::to_string);
            let comment = source.comment().map(str::to_string);
            let field_comments = source.field_comments().to_vec();

            let new_handle = state.allocate();
            let mut copy = IdfObject::from_values(new_handle, Arc::clone(&schema), values)
                .with_comments(comment, field_comments);
            if let Some(name) = name {
                let new_name = state.next_name(schema.name(), &name, false);
                copy.write(0, new_name);
            }
            state.insert(copy);
            (new_handle, schema.name().to_string())
        };

        debug!("Cloned {} into {}", handle, new_handle);
        self.listeners.fire(&[WorkspaceEvent::ObjectAdded {
            handle: new_handle,
            object_type,
        }]);
        Some(new_handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.state.borrow().objects.contains_key(&handle)
    }

    pub fn num_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    /// All handles in creation order
    pub fn handles(&self) -> Vec<Handle> {
        self.state.borrow().objects.keys().copied().collect()
    }

    /// Handles of every record of `object_type`, in creation order
    pub fn get_objects_by_type(&self, object_type: &str) -> Vec<Handle> {
        trace!("Type lookup for {}", object_type);
        self.state
            .borrow()
            .by_type
            .get(&object_type.to_lowercase())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Find a record by type and name (case-insensitive)
    pub fn get_object_by_type_and_name(&self, object_type: &str, name: &str) -> Option<Handle> {
        self.state
            .borrow()
            .by_name
            .get(&name_key(object_type, name))
            .copied()
    }

    /// Records of any type named `name` (case-insensitive)
    pub fn get_objects_by_name(&self, name: &str) -> Vec<Handle> {
        let name = name.to_lowercase();
        let state = self.state.borrow();
        let mut found: Vec<Handle> = state
            .by_name
            .iter()
            .filter(|((_, n), _)| *n == name)
            .map(|(_, h)| *h)
            .collect();
        found.sort();
        found
    }

    /// Run `f` against the record behind `handle`
    pub fn with_object<R>(&self, handle: Handle, f: impl FnOnce(&IdfObject) -> R) -> Option<R> {
        self.state.borrow().objects.get(&handle).map(f)
    }

    /// Untyped view of a record
    pub fn get_object(&self, handle: Handle) -> Option<WorkspaceObject<'_>> {
        self.contains(handle)
            .then(|| WorkspaceObject::new(self, handle))
    }

    /// Untyped views of every record of `object_type`
    pub fn objects_of_type(&self, object_type: &str) -> Vec<WorkspaceObject<'_>> {
        self.get_objects_by_type(object_type)
            .into_iter()
            .map(|h| WorkspaceObject::new(self, h))
            .collect()
    }

    pub fn object_type(&self, handle: Handle) -> Option<String> {
        self.with_object(handle, |o| o.object_type().to_string())
    }

    pub fn schema(&self, handle: Handle) -> Option<Arc<ObjectSchema>> {
        self.with_object(handle, |o| Arc::clone(o.schema()))
    }

    // === Field reads ===

    pub fn name(&self, handle: Handle) -> Option<String> {
        self.with_object(handle, |o| o.name().map(str::to_string))
            .flatten()
    }

    pub fn get_string(&self, handle: Handle, index: usize) -> Option<String> {
        self.with_object(handle, |o| o.get_string(index)).flatten()
    }

    pub fn get_required_string(&self, handle: Handle, index: usize) -> Result<String, WorkspaceError> {
        self.with_object(handle, |o| o.get_required_string(index))
            .ok_or(WorkspaceError::UnknownHandle(handle))?
            .map_err(Into::into)
    }

    pub fn get_double(&self, handle: Handle, index: usize) -> Option<f64> {
        self.with_object(handle, |o| o.get_double(index)).flatten()
    }

    pub fn try_get_double(&self, handle: Handle, index: usize) -> Result<Option<f64>, WorkspaceError> {
        self.with_object(handle, |o| o.try_get_double(index))
            .ok_or(WorkspaceError::UnknownHandle(handle))?
            .map_err(Into::into)
    }

    pub fn get_int(&self, handle: Handle, index: usize) -> Option<i32> {
        self.with_object(handle, |o| o.get_int(index)).flatten()
    }

    pub fn try_get_int(&self, handle: Handle, index: usize) -> Result<Option<i32>, WorkspaceError> {
        self.with_object(handle, |o| o.try_get_int(index))
            .ok_or(WorkspaceError::UnknownHandle(handle))?
            .map_err(Into::into)
    }

    pub fn get_bool(&self, handle: Handle, index: usize) -> Option<bool> {
        self.with_object(handle, |o| o.get_bool(index)).flatten()
    }

    pub fn is_empty(&self, handle: Handle, index: usize) -> bool {
        self.with_object(handle, |o| o.is_empty(index))
            .unwrap_or(true)
    }

    pub fn is_defaulted(&self, handle: Handle, index: usize) -> bool {
        self.with_object(handle, |o| o.is_defaulted(index))
            .unwrap_or(false)
    }

    pub fn is_autosized(&self, handle: Handle, index: usize) -> bool {
        self.with_object(handle, |o| o.is_autosized(index))
            .unwrap_or(false)
    }

    pub fn is_autocalculated(&self, handle: Handle, index: usize) -> bool {
        self.with_object(handle, |o| o.is_autocalculated(index))
            .unwrap_or(false)
    }

    pub fn comment(&self, handle: Handle) -> Option<String> {
        self.with_object(handle, |o| o.comment().map(str::to_string))
            .flatten()
    }

    pub fn field_comment(&self, handle: Handle, index: usize) -> Option<String> {
        self.with_object(handle, |o| o.field_comment(index).map(str::to_string))
            .flatten()
    }

    /// Set the comment written above the record; blank text removes it
    pub fn set_comment(&self, handle: Handle, comment: &str) -> bool {
        self.state
            .borrow_mut()
            .objects
            .get_mut(&handle)
            .map(|o| o.set_comment(comment))
            .is_some()
    }

    /// Set the comment written after one field value; blank text removes it
    pub fn set_field_comment(&self, handle: Handle, index: usize, comment: &str) -> bool {
        self.state
            .borrow_mut()
            .objects
            .get_mut(&handle)
            .is_some_and(|o| o.set_field_comment(index, comment))
    }

    // === Field writes ===

    /// Validate and store a value; `false` leaves the field unchanged
    pub fn set_string(&self, handle: Handle, index: usize, value: &str) -> bool {
        self.log_rejection(handle, index, self.try_set_string(handle, index, value))
    }

    pub fn try_set_string(&self, handle: Handle, index: usize, value: &str) -> Result<(), WorkspaceError> {
        let event = {
            let mut state = self.state.borrow_mut();
            let object = state
                .objects
                .get(&handle)
                .ok_or(WorkspaceError::UnknownHandle(handle))?;
            let mut value = object.validate(index, value)?;
            if object.schema().name_field_index() == Some(index) && !value.is_empty() {
                let object_type = object.object_type().to_string();
                value = state.unique_name(&object_type, handle, &value);
            }
            state.write(handle, index, value)
        };

        if let Some(event) = event {
            self.listeners.fire(&[event]);
        }
        Ok(())
    }

    pub fn set_double(&self, handle: Handle, index: usize, value: f64) -> bool {
        self.log_rejection(handle, index, self.try_set_double(handle, index, value))
    }

    pub fn try_set_double(&self, handle: Handle, index: usize, value: f64) -> Result<(), WorkspaceError> {
        if !value.is_finite() {
            return Err(FieldError::Invalid {
                index,
                source: bemkit_idd::ValueError::NotANumber(value.to_string()),
            }
            .into());
        }
        self.try_set_string(handle, index, &format_double(value))
    }

    pub fn set_int(&self, handle: Handle, index: usize, value: i32) -> bool {
        self.set_string(handle, index, &value.to_string())
    }

    pub fn set_bool(&self, handle: Handle, index: usize, value: bool) -> bool {
        self.set_string(handle, index, if value { "Yes" } else { "No" })
    }

    /// Blank a field, reverting it to its schema default
    pub fn reset_field(&self, handle: Handle, index: usize) {
        let event = {
            let mut state = self.state.borrow_mut();
            state.write(handle, index, String::new())
        };
        if let Some(event) = event {
            self.listeners.fire(&[event]);
        }
    }

    /// Set the name, suffixing it if another object of the type already has it
    ///
    /// Returns the name actually stored, or `None` if the type has no name
    /// field or the name is invalid.
    pub fn set_name(&self, handle: Handle, name: &str) -> Option<String> {
        let index = self.with_object(handle, |o| o.schema().name_field_index())??;
        if self.set_string(handle, index, name) {
            Some(self.name(handle).unwrap_or_default())
        } else {
            None
        }
    }

    fn log_rejection(&self, handle: Handle, index: usize, result: Result<(), WorkspaceError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                debug!("Rejected write to field {} of {}: {}", index, handle, e);
                false
            }
        }
    }

    // === References ===

    /// The record a reference field points at, if it still exists
    pub fn resolve_reference(&self, handle: Handle, index: usize) -> Option<Handle> {
        let state = self.state.borrow();
        let object = state.objects.get(&handle)?;
        let field = object.field_schema(index)?;
        if field.kind != FieldKind::ObjectReference {
            return None;
        }
        state.resolve(field, object.raw(index)?)
    }

    /// Point a reference field at `target`; `false` if the target type is not allowed
    pub fn set_reference(&self, handle: Handle, index: usize, target: Handle) -> bool {
        self.log_rejection(handle, index, self.try_set_reference(handle, index, target))
    }

    pub fn try_set_reference(&self, handle: Handle, index: usize, target: Handle) -> Result<(), WorkspaceError> {
        let event = {
            let mut state = self.state.borrow_mut();
            let object = state
                .objects
                .get(&handle)
                .ok_or(WorkspaceError::UnknownHandle(handle))?;
            let field = object.field_schema(index).ok_or(FieldError::IndexOutOfRange {
                index,
                len: object.num_fields(),
            })?;
            if field.kind != FieldKind::ObjectReference {
                return Err(WorkspaceError::NotAReference {
                    object_type: object.object_type().to_string(),
                    index,
                });
            }
            let target_type = state
                .objects
                .get(&target)
                .ok_or(WorkspaceError::UnknownHandle(target))?
                .object_type();
            if !field.accepts_reference_to(target_type) {
                return Err(WorkspaceError::InvalidReferenceType {
                    object_type: object.object_type().to_string(),
                    index,
                    target_type: target_type.to_string(),
                });
            }
            state.write(handle, index, target.to_string())
        };

        if let Some(event) = event {
            self.listeners.fire(&[event]);
        }
        Ok(())
    }

    /// Records with a reference field resolving to `handle`
    pub fn direct_sources(&self, handle: Handle) -> Vec<Handle> {
        let state = self.state.borrow();
        let sources: BTreeSet<Handle> = state
            .referencing_fields(handle)
            .into_iter()
            .map(|(source, _)| source)
            .filter(|source| *source != handle)
            .collect();
        sources.into_iter().collect()
    }

    /// Records that the reference fields of `handle` resolve to, in field order
    pub fn targets(&self, handle: Handle) -> Vec<Handle> {
        let state = self.state.borrow();
        let Some(object) = state.objects.get(&handle) else {
            return Vec::new();
        };
        let mut targets = Vec::new();
        for (index, value) in object.fields().iter().enumerate() {
            let Some(field) = object.schema().field(index) else {
                continue;
            };
            if field.kind != FieldKind::ObjectReference {
                continue;
            }
            if let Some(target) = state.resolve(field, value) {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        targets
    }

    // === Extensible groups ===

    pub fn num_extensible_groups(&self, handle: Handle) -> usize {
        self.with_object(handle, IdfObject::num_extensible_groups)
            .unwrap_or(0)
    }

    /// Live views of every group, in insertion order
    pub fn extensible_groups(&self, handle: Handle) -> Vec<ExtensibleGroup<'_>> {
        (0..self.num_extensible_groups(handle))
            .map(|group| ExtensibleGroup::new(self, handle, group))
            .collect()
    }

    pub fn extensible_group(&self, handle: Handle, group: usize) -> Option<ExtensibleGroup<'_>> {
        (group < self.num_extensible_groups(handle))
            .then(|| ExtensibleGroup::new(self, handle, group))
    }

    /// Append a group
    ///
    /// `values` must be empty (a blank group) or hold exactly one value per
    /// group field. Reference values may be serialized handles or names. If
    /// any value is rejected, nothing is added.
    pub fn push_extensible_group<S: AsRef<str>>(&self, handle: Handle, values: &[S]) -> Option<ExtensibleGroup<'_>> {
        let result = self.try_insert_extensible_group(handle, None, values);
        self.group_result(handle, result)
    }

    /// Insert a group before position `group` (appends past the end)
    pub fn insert_extensible_group<S: AsRef<str>>(
        &self,
        handle: Handle,
        group: usize,
        values: &[S],
    ) -> Option<ExtensibleGroup<'_>> {
        let result = self.try_insert_extensible_group(handle, Some(group), values);
        self.group_result(handle, result)
    }

    fn group_result(&self, handle: Handle, result: Result<usize, WorkspaceError>) -> Option<ExtensibleGroup<'_>> {
        match result {
            Ok(group) => Some(ExtensibleGroup::new(self, handle, group)),
            Err(e) => {
                debug!("Rejected extensible group for {}: {}", handle, e);
                None
            }
        }
    }

    pub fn try_push_extensible_group<S: AsRef<str>>(&self, handle: Handle, values: &[S]) -> Result<usize, WorkspaceError> {
        self.try_insert_extensible_group(handle, None, values)
    }

    fn try_insert_extensible_group<S: AsRef<str>>(
        &self,
        handle: Handle,
        at: Option<usize>,
        values: &[S],
    ) -> Result<usize, WorkspaceError> {
        let (group, num_groups) = {
            let mut state = self.state.borrow_mut();
            let object = state
                .objects
                .get(&handle)
                .ok_or(WorkspaceError::UnknownHandle(handle))?;
            object.check_group_push(values.len())?;

            let schema = Arc::clone(object.schema());
            let count = object.num_extensible_groups();
            let group = at.map_or(count, |g| g.min(count));
            let start = schema.num_fields() + group * schema.group_size();

            // Validate everything before touching the record
            let stored = values
                .iter()
                .zip(schema.extensible_group())
                .enumerate()
                .map(|(offset, (value, field))| state.stored_value(field, start + offset, value.as_ref()))
                .collect::<Result<Vec<_>, _>>()?;

            let object = state
                .objects
                .get_mut(&handle)
                .ok_or(WorkspaceError::UnknownHandle(handle))?;
            let group = object.insert_blank_group(group);
            for (offset, value) in stored.into_iter().enumerate() {
                object.write(start + offset, value);
            }
            (group, object.num_extensible_groups())
        };

        self.listeners.fire(&[WorkspaceEvent::GroupsChanged { handle, num_groups }]);
        Ok(group)
    }

    /// Remove one group; later groups move up
    pub fn erase_extensible_group(&self, handle: Handle, group: usize) -> bool {
        let result = {
            let mut state = self.state.borrow_mut();
            state
                .objects
                .get_mut(&handle)
                .map(|o| o.remove_group(group).map(|_| o.num_extensible_groups()))
        };
        match result {
            Some(Ok(num_groups)) => {
                self.listeners.fire(&[WorkspaceEvent::GroupsChanged { handle, num_groups }]);
                true
            }
            _ => false,
        }
    }

    /// Remove the last group, returning its stored values
    pub fn pop_extensible_group(&self, handle: Handle) -> Option<Vec<String>> {
        let (values, num_groups) = {
            let mut state = self.state.borrow_mut();
            let object = state.objects.get_mut(&handle)?;
            let last = object.num_extensible_groups().checked_sub(1)?;
            let values = object.remove_group(last).ok()?;
            (values, object.num_extensible_groups())
        };
        self.listeners.fire(&[WorkspaceEvent::GroupsChanged { handle, num_groups }]);
        Some(values)
    }

    /// Remove every group
    pub fn clear_extensible_groups(&self, handle: Handle) {
        let cleared = {
            let mut state = self.state.borrow_mut();
            state
                .objects
                .get_mut(&handle)
                .map(|o| !o.clear_groups().is_empty())
                .unwrap_or(false)
        };
        if cleared {
            self.listeners.fire(&[WorkspaceEvent::GroupsChanged {
                handle,
                num_groups: 0,
            }]);
        }
    }

    // === Units ===

    /// Read a number field as a quantity in the requested unit system
    pub fn get_quantity(&self, handle: Handle, index: usize, system: UnitSystem) -> Option<Quantity> {
        let (value, si, ip) = self
            .with_object(handle, |o| {
                let field = o.field_schema(index)?;
                let value = o.get_double(index)?;
                Some((value, field.units.clone(), field.ip_units.clone()))
            })
            .flatten()?;
        let si = si.unwrap_or_default();

        match (system, ip) {
            (UnitSystem::Ip, Some(ip)) => match units::convert(value, &si, &ip) {
                Ok(converted) => Some(Quantity::new(converted, ip)),
                Err(e) => {
                    warn!("Field {} of {}: {}", index, handle, e);
                    None
                }
            },
            _ => Some(Quantity::new(value, si)),
        }
    }

    /// Store a quantity, converting it to the field's units
    pub fn set_quantity(&self, handle: Handle, index: usize, quantity: &Quantity) -> bool {
        let si = self
            .with_object(handle, |o| o.field_schema(index).map(|f| f.units.clone().unwrap_or_default()))
            .flatten();
        let Some(si) = si else {
            return false;
        };
        let converted: Result<f64, UnitError> = units::convert(quantity.value, &quantity.units, &si);
        match converted {
            Ok(value) => self.set_double(handle, index, value),
            Err(e) => {
                debug!("Rejected quantity for field {} of {}: {}", index, handle, e);
                false
            }
        }
    }

    // === Change tracking ===

    /// Register a callback for every change to this workspace
    pub fn on_change<F>(&self, callback: F) -> ListenerKey
    where
        F: Fn(&WorkspaceEvent) + 'static,
    {
        self.listeners.insert(callback)
    }

    /// Remove a listener by its key
    ///
    /// Returns `true` if the listener was found and removed.
    pub fn remove_listener(&self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    pub fn is_dirty(&self, handle: Handle) -> bool {
        self.with_object(handle, IdfObject::is_dirty)
            .unwrap_or(false)
    }

    /// Records changed since the last [`clear_dirty`](Self::clear_dirty)
    pub fn dirty_handles(&self) -> Vec<Handle> {
        self.state
            .borrow()
            .objects
            .values()
            .filter(|o| o.is_dirty())
            .map(IdfObject::handle)
            .collect()
    }

    pub fn clear_dirty(&self) {
        for object in self.state.borrow_mut().objects.values_mut() {
            object.set_dirty(false);
        }
    }

    // === Validity ===

    /// Check every record at the given strictness
    pub fn validity_report(&self, level: Strictness) -> ValidityReport {
        let mut report = ValidityReport::new(level);
        if level == Strictness::None {
            return report;
        }

        let state = self.state.borrow();
        for object in state.objects.values() {
            report.errors.extend(state.object_errors(object, level));
        }
        report
    }

    /// Whether the workspace passes a check at the configured strictness
    pub fn is_valid(&self) -> bool {
        self.validity_report(self.config.strictness).is_valid()
    }

    // === IDF text ===

    /// Parse IDF text and add its records
    pub fn load_idf(&self, text: &str) -> Result<Vec<Handle>, WorkspaceError> {
        let records = idf::parse_records(text)?;
        self.load_records(records)
    }

    /// Add parsed records
    ///
    /// Everything is checked before the workspace changes: every object type
    /// must be registered, and below [`Strictness::None`] every value must
    /// suit its field, in canonical form. Names and references that look like
    /// handles are always refused. At [`Strictness::Final`] the added records
    /// must also pass a full validity check, or the whole load is undone.
    ///
    /// Unique types merge into their existing instance; duplicate names are
    /// suffixed; reference fields naming exactly one loaded or existing
    /// object are rewritten as handles.
    pub fn load_records(&self, records: Vec<IdfRecord>) -> Result<Vec<Handle>, WorkspaceError> {
        let level = self.config.strictness;
        let prepared = records
            .into_iter()
            .map(|record| {
                let schema = Arc::clone(self.registry.get_schema(&record.object_type)?);
                let fields = prepare_fields(&record, &schema, level)?;
                Ok((record, schema, fields))
            })
            .collect::<Result<Vec<_>, WorkspaceError>>()?;

        let mut events = Vec::new();
        let mut handles = Vec::with_capacity(prepared.len());
        {
            let mut state = self.state.borrow_mut();
            let snapshot = (level == Strictness::Final).then(|| state.clone());

            for (record, schema, fields) in prepared {
                if schema.is_unique() {
                    if let Some(existing) = state.first_of_type(schema.name()) {
                        debug!("Merging {} into existing {}", schema.name(), existing);
                        let merged = IdfObject::from_values(existing, schema, fields)
                            .with_comments(record.comment, record.field_comments);
                        events.extend(replace_object(&mut state, merged));
                        handles.push(existing);
                        continue;
                    }
                }

                let handle = state.allocate();
                let mut object = IdfObject::from_values(handle, Arc::clone(&schema), fields)
                    .with_comments(record.comment, record.field_comments);
                if let Some(name) = object.name().map(str::to_string) {
                    let unique = state.unique_name(schema.name(), handle, &name);
                    if unique != name {
                        warn!("Line {}: renamed duplicate {} {:?} to {:?}", record.line, schema.name(), name, unique);
                        object.write(0, unique);
                    }
                }
                state.insert(object);
                events.push(WorkspaceEvent::ObjectAdded {
                    handle,
                    object_type: schema.name().to_string(),
                });
                handles.push(handle);
            }

            // Rewrite names in reference fields as handles
            for &handle in &handles {
                let updates: Vec<(usize, String)> = match state.objects.get(&handle) {
                    Some(object) => object
                        .fields()
                        .iter()
                        .enumerate()
                        .filter(|(_, value)| !value.is_empty() && value.parse::<Handle>().is_err())
                        .filter_map(|(index, value)| {
                            let field = object.schema().field(index)?;
                            if field.kind != FieldKind::ObjectReference {
                                return None;
                            }
                            match state.named_targets(field, value).as_slice() {
                                [target] => Some((index, target.to_string())),
                                [] => None,
                                targets => {
                                    warn!(
                                        "{} {}: {:?} names {} objects of different types, leaving field {} unresolved",
                                        object.object_type(),
                                        handle,
                                        value,
                                        targets.len(),
                                        index
                                    );
                                    None
                                }
                            }
                        })
                        .collect(),
                    None => continue,
                };
                if let Some(object) = state.objects.get_mut(&handle) {
                    for (index, value) in updates {
                        object.write(index, value);
                    }
                }
            }

            if let Some(snapshot) = snapshot {
                let errors: Vec<DataError> = handles
                    .iter()
                    .filter_map(|h| state.objects.get(h))
                    .flat_map(|object| state.object_errors(object, level))
                    .collect();
                if !errors.is_empty() {
                    *state = snapshot;
                    return Err(WorkspaceError::InvalidRecords { level, errors });
                }
            }
        }

        info!("Loaded {} objects", handles.len());
        self.listeners.fire(&events);
        Ok(handles)
    }

    /// Serialize every record as IDF text, in creation order
    ///
    /// Reference fields are written as their target's name.
    pub fn to_idf_string(&self) -> String {
        let state = self.state.borrow();
        let mut out = String::new();
        for object in state.objects.values() {
            let values: Vec<String> = object
                .fields()
                .iter()
                .enumerate()
                .map(|(index, value)| match object.schema().field(index) {
                    Some(field) => state.export_value(field, value),
                    None => value.clone(),
                })
                .collect();
            let comments = RecordComments {
                object: object.comment(),
                fields: object.field_comments(),
            };
            if idf::write_record(&mut out, object.object_type(), &values, Some(&**object.schema()), comments).is_err() {
                break;
            }
            let _ = writeln!(out);
        }
        out
    }
}

/// Values of a parsed record in stored form
///
/// Reference values stay as written; they are resolved once every record is in.
fn prepare_fields(record: &IdfRecord, schema: &ObjectSchema, level: Strictness) -> Result<Vec<String>, WorkspaceError> {
    let invalid = |source: FieldError| WorkspaceError::InvalidRecord {
        line: record.line,
        object_type: schema.name().to_string(),
        source,
    };

    record
        .fields
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let value = value.trim();
            let Some(field) = schema.field(index) else {
                return Ok(value.to_string());
            };
            let names_object = field.kind == FieldKind::ObjectReference || schema.name_field_index() == Some(index);
            if names_object && value.parse::<Handle>().is_ok() {
                return Err(invalid(FieldError::ReservedName {
                    index,
                    value: value.to_string(),
                }));
            }
            if field.kind == FieldKind::ObjectReference {
                return Ok(value.to_string());
            }
            match field.normalize(value) {
                Ok(normalized) => Ok(normalized),
                Err(_) if level == Strictness::None => Ok(value.to_string()),
                Err(source) => Err(invalid(FieldError::Invalid { index, source })),
            }
        })
        .collect()
}

/// Swap in new values for an existing record, reporting what changed
fn replace_object(state: &mut State, replacement: IdfObject) -> Vec<WorkspaceEvent> {
    let handle = replacement.handle();
    let Some(old) = state.remove(handle) else {
        state.insert(replacement);
        return Vec::new();
    };

    let fixed = replacement.schema().num_fields();
    let mut events: Vec<WorkspaceEvent> = old.fields()[..fixed]
        .iter()
        .zip(&replacement.fields()[..fixed])
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(index, (a, b))| WorkspaceEvent::FieldChanged {
            handle,
            index,
            old: a.clone(),
            new: b.clone(),
        })
        .collect();
    if old.fields()[fixed..] != replacement.fields()[fixed..] {
        events.push(WorkspaceEvent::GroupsChanged {
            handle,
            num_groups: replacement.num_extensible_groups(),
        });
    }

    state.insert(replacement);
    events
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("schema_version", &self.registry.version())
            .field("objects", &self.num_objects())
            .field("listeners", &self.listeners)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bemkit_idd::FieldSchema;
    use std::cell::RefCell as TestCell;
    use std::rc::Rc;

    fn registry() -> Arc<SchemaRegistry> {
        Arc::new(
            SchemaRegistry::builder("1.0.0")
                .object(
                    ObjectSchema::builder("OS:Building")
                        .field(FieldSchema::name_field())
                        .field(FieldSchema::number("North Axis").with_default("0"))
                        .unique()
                        .build(),
                )
                .object(
                    ObjectSchema::builder("OS:ThermalZone")
                        .field(FieldSchema::name_field())
                        .field(FieldSchema::integer("Multiplier").with_minimum(1.0).with_default("1"))
                        .field(FieldSchema::number("Volume").autosizable().with_units("m3", "ft3"))
                        .build(),
                )
                .object(
                    ObjectSchema::builder("OS:AirflowNetworkZone")
                        .field(FieldSchema::name_field())
                        .field(FieldSchema::reference("Thermal Zone Name", ["OS:ThermalZone"]).required())
                        .field(FieldSchema::choice("Ventilation Control Mode", ["Constant", "NoVent"]).with_default("NoVent"))
                        .build(),
                )
                .object(
                    ObjectSchema::builder("OS:ZoneList")
                        .field(FieldSchema::name_field())
                        .extensible(FieldSchema::reference("Zone Name", ["OS:ThermalZone"]))
                        .extensible(FieldSchema::number("Weight"))
                        .build(),
                )
                .object(
                    ObjectSchema::builder("OS:Curve")
                        .field(FieldSchema::name_field())
                        .build(),
                )
                .object(
                    ObjectSchema::builder("OS:Actuator")
                        .field(FieldSchema::name_field())
                        .field(FieldSchema::reference("Component Name", ["OS:ThermalZone", "OS:Curve"]).required())
                        .build(),
                )
                .build()
                .unwrap(),
        )
    }

    fn workspace() -> Workspace {
        Workspace::new(registry())
    }

    fn workspace_at(strictness: Strictness) -> Workspace {
        let config = WorkspaceConfig {
            strictness,
            ..WorkspaceConfig::default()
        };
        Workspace::with_config(registry(), config)
    }

    #[test]
    fn test_add_object_auto_names() {
        let ws = workspace();
        let a = ws.add_object("OS:ThermalZone").unwrap();
        let b = ws.add_object("os:thermalzone").unwrap();
        assert_ne!(a, b);
        assert_eq!(ws.name(a).as_deref(), Some("ThermalZone 1"));
        assert_eq!(ws.name(b).as_deref(), Some("ThermalZone 2"));
        assert_eq!(ws.get_objects_by_type("OS:ThermalZone"), vec![a, b]);
        assert_eq!(ws.num_objects(), 2);

        // The lowest free suffix is reused
        assert!(ws.remove_object(a));
        let c = ws.add_object("OS:ThermalZone").unwrap();
        assert_eq!(ws.name(c).as_deref(), Some("ThermalZone 1"));
    }

    #[test]
    fn test_unknown_type() {
        let ws = workspace();
        assert!(matches!(
            ws.add_object("OS:Nope"),
            Err(WorkspaceError::Schema(IddError::UnknownType(_)))
        ));
        assert_eq!(ws.num_objects(), 0);
    }

    #[test]
    fn test_unique_type_returns_existing() {
        let ws = workspace();
        let (first, created) = ws.get_or_add_object("OS:Building").unwrap();
        assert!(created);
        let (second, created) = ws.get_or_add_object("OS:Building").unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(ws.clone_object(first), None);
        assert_eq!(ws.get_objects_by_type("OS:Building").len(), 1);
    }

    #[test]
    fn test_names_are_unique_per_type() {
        let ws = workspace();
        let a = ws.add_object("OS:ThermalZone").unwrap();
        let b = ws.add_object("OS:ThermalZone").unwrap();
        assert_eq!(ws.set_name(a, "Core").as_deref(), Some("Core"));
        assert_eq!(ws.set_name(b, "core").as_deref(), Some("core 1"));
        assert_eq!(ws.get_object_by_type_and_name("OS:ThermalZone", "CORE"), Some(a));

        // Same name on a different type is fine
        let afn = ws.add_object("OS:AirflowNetworkZone").unwrap();
        assert_eq!(ws.set_name(afn, "Core").as_deref(), Some("Core"));
        assert_eq!(ws.get_objects_by_name("core"), vec![a, afn]);

        assert_eq!(ws.set_name(a, "Bad;Name"), None);
        assert_eq!(ws.name(a).as_deref(), Some("Core"));
    }

    #[test]
    fn test_setters_validate() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();

        assert_eq!(ws.get_int(zone, 1), Some(1));
        assert!(ws.is_defaulted(zone, 1));
        assert!(ws.set_int(zone, 1, 3));
        assert!(!ws.set_int(zone, 1, 0));
        assert_eq!(ws.get_int(zone, 1), Some(3));

        assert!(ws.set_string(zone, 2, "AUTOSIZE"));
        assert!(ws.is_autosized(zone, 2));
        assert_eq!(ws.get_double(zone, 2), None);
        assert!(!ws.set_double(zone, 2, f64::NAN));

        ws.reset_field(zone, 1);
        assert_eq!(ws.get_int(zone, 1), Some(1));
        assert!(!ws.set_string(zone, 42, "1"));

        // Integers must read back as i32
        assert!(!ws.set_string(zone, 1, "3000000000"));
        assert!(ws.set_int(zone, 1, i32::MAX));
        assert_eq!(ws.get_int(zone, 1), Some(i32::MAX));
    }

    #[test]
    fn test_handle_like_names_are_refused() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        assert_eq!(ws.set_name(zone, "#1"), None);
        assert!(matches!(
            ws.try_set_string(zone, 0, " #7 "),
            Err(WorkspaceError::Field(FieldError::ReservedName { index: 0, .. }))
        ));
        assert_eq!(ws.set_name(zone, "#1 North").as_deref(), Some("#1 North"));

        assert!(matches!(
            ws.load_idf("OS:ThermalZone, #1;"),
            Err(WorkspaceError::InvalidRecord {
                source: FieldError::ReservedName { .. },
                ..
            })
        ));
        assert!(ws.load_idf("OS:AirflowNetworkZone, A, #1;").is_err());
        assert_eq!(ws.num_objects(), 1);
    }

    #[test]
    fn test_references_resolve_and_detach() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        let afn = ws.add_object("OS:AirflowNetworkZone").unwrap();
        let building = ws.add_object("OS:Building").unwrap();

        assert!(!ws.set_reference(afn, 1, building));
        assert!(matches!(
            ws.try_set_reference(afn, 2, zone),
            Err(WorkspaceError::NotAReference { index: 2, .. })
        ));
        assert!(!ws.set_string(afn, 1, "ThermalZone 1"));

        assert!(ws.set_reference(afn, 1, zone));
        assert_eq!(ws.resolve_reference(afn, 1), Some(zone));
        assert_eq!(ws.direct_sources(zone), vec![afn]);
        assert_eq!(ws.targets(afn), vec![zone]);

        // Renaming the target does not break the reference
        ws.set_name(zone, "Renamed");
        assert_eq!(ws.resolve_reference(afn, 1), Some(zone));

        assert!(ws.remove_object(zone));
        assert!(!ws.remove_object(zone));
        assert_eq!(ws.resolve_reference(afn, 1), None);
        assert!(ws.is_empty(afn, 1));
        assert!(ws.contains(afn));
    }

    #[test]
    fn test_clone_object() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        let afn = ws.add_object("OS:AirflowNetworkZone").unwrap();
        ws.set_name(afn, "AFN");
        ws.set_reference(afn, 1, zone);

        let copy = ws.clone_object(afn).unwrap();
        assert_eq!(ws.name(copy).as_deref(), Some("AFN 1"));
        assert_eq!(ws.resolve_reference(copy, 1), Some(zone));
        assert_eq!(ws.direct_sources(zone), vec![afn, copy]);
        assert_eq!(ws.clone_object(Handle::from_raw(999)), None);
    }

    #[test]
    fn test_extensible_groups_keep_order() {
        let ws = workspace();
        let z1 = ws.add_object("OS:ThermalZone").unwrap();
        let z2 = ws.add_object("OS:ThermalZone").unwrap();
        let list = ws.add_object("OS:ZoneList").unwrap();

        let first = ws.push_extensible_group(list, &["ThermalZone 2", "0.5"]).unwrap();
        assert_eq!(first.group_index(), 0);
        assert!(ws.push_extensible_group(list, &[z1.to_string(), "1".to_string()]).is_some());
        assert!(ws.insert_extensible_group(list, 0, &[] as &[&str]).is_some());

        // Rejected groups leave nothing behind
        assert!(ws.push_extensible_group(list, &["Missing", "1"]).is_none());
        assert!(ws.push_extensible_group(list, &["ThermalZone 1"]).is_none());
        assert_eq!(ws.num_extensible_groups(list), 3);

        let zones: Vec<_> = ws
            .extensible_groups(list)
            .iter()
            .map(|g| g.resolve_reference(0))
            .collect();
        assert_eq!(zones, vec![None, Some(z2), Some(z1)]);

        assert!(ws.erase_extensible_group(list, 0));
        assert!(!ws.erase_extensible_group(list, 5));
        assert_eq!(ws.extensible_group(list, 0).unwrap().get_double(1), Some(0.5));

        assert!(ws.remove_object(z2));
        assert_eq!(ws.num_extensible_groups(list), 2);
        assert!(ws.extensible_group(list, 0).unwrap().is_empty(0));

        let popped = ws.pop_extensible_group(list).unwrap();
        assert_eq!(popped, vec![z1.to_string(), "1".to_string()]);
        ws.clear_extensible_groups(list);
        assert_eq!(ws.num_extensible_groups(list), 0);
        assert_eq!(ws.pop_extensible_group(list), None);
    }

    #[test]
    fn test_listeners_see_changes() {
        let ws = workspace();
        let events = Rc::new(TestCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let key = ws.on_change(move |e| sink.borrow_mut().push(e.clone()));

        let zone = ws.add_object("OS:ThermalZone").unwrap();
        ws.set_int(zone, 1, 2);
        ws.set_int(zone, 1, 2);
        ws.remove_object(zone);

        {
            // Auto-naming happens before the object is published; the repeated write is a no-op
            let events = events.borrow();
            assert_eq!(events.len(), 3);
            assert!(matches!(events[0], WorkspaceEvent::ObjectAdded { .. }));
            assert!(matches!(&events[1], WorkspaceEvent::FieldChanged { index: 1, new, .. } if new == "2"));
            assert!(matches!(events[2], WorkspaceEvent::ObjectRemoved { .. }));
        }

        assert!(ws.remove_listener(key));
        ws.add_object("OS:ThermalZone").unwrap();
        assert_eq!(events.borrow().len(), 3);
    }

    #[test]
    fn test_dirty_tracking() {
        let ws = workspace();
        let a = ws.add_object("OS:ThermalZone").unwrap();
        let b = ws.add_object("OS:ThermalZone").unwrap();
        assert_eq!(ws.dirty_handles(), vec![a, b]);

        ws.clear_dirty();
        assert!(ws.dirty_handles().is_empty());
        ws.set_double(b, 2, 10.0);
        assert!(!ws.is_dirty(a));
        assert!(ws.is_dirty(b));
    }

    #[test]
    fn test_quantities() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        assert!(ws.set_quantity(zone, 2, &Quantity::new(1.0, "ft3")));

        let si = ws.get_quantity(zone, 2, UnitSystem::Si).unwrap();
        assert_eq!(si.units, "m3");
        assert!((si.value - 0.028_316_846_592).abs() < 1e-9);

        let ip = ws.get_quantity(zone, 2, UnitSystem::Ip).unwrap();
        assert_eq!(ip.units, "ft3");
        assert!((ip.value - 1.0).abs() < 1e-9);

        assert!(!ws.set_quantity(zone, 2, &Quantity::new(1.0, "kW")));
    }

    #[test]
    fn test_validity_report() {
        let ws = workspace();
        let afn = ws.add_object("OS:AirflowNetworkZone").unwrap();
        assert!(ws.validity_report(Strictness::Draft).is_valid());
        assert!(ws.is_valid());

        let report = ws.validity_report(Strictness::Final);
        assert_eq!(report.len(), 1);
        assert_eq!(report.errors[0].kind, DataErrorKind::MissingRequiredField);
        assert_eq!(report.errors[0].field_name.as_deref(), Some("Thermal Zone Name"));

        assert_eq!(ws.validity_report(Strictness::Final).errors_for(afn).count(), 1);

        // Only an unchecked workspace stores loaded values as written
        let lax = workspace_at(Strictness::None);
        lax.load_idf("OS:ThermalZone, Bad Zone, 0;").unwrap();
        let draft = lax.validity_report(Strictness::Draft);
        assert_eq!(draft.len(), 1);
        assert!(matches!(draft.errors[0].kind, DataErrorKind::InvalidValue(_)));
        assert!(lax.validity_report(Strictness::None).is_valid());
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let ws = workspace();
        let result = ws.load_idf("OS:ThermalZone, A;\nOS:ThermalZone, Z, abc;");
        assert!(matches!(
            result,
            Err(WorkspaceError::InvalidRecord {
                line: 2,
                source: FieldError::Invalid { index: 1, .. },
                ..
            })
        ));
        assert_eq!(ws.num_objects(), 0);

        // Accepted values are stored in canonical form
        let handles = ws
            .load_idf("OS:ThermalZone, Z, 3.0;\nOS:AirflowNetworkZone, A, Z, novent;")
            .unwrap();
        assert_eq!(ws.get_string(handles[0], 1).as_deref(), Some("3"));
        assert_eq!(ws.get_string(handles[1], 2).as_deref(), Some("NoVent"));
    }

    #[test]
    fn test_final_load_is_undone_when_invalid() {
        let ws = workspace_at(Strictness::Final);
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        let events = Rc::new(TestCell::new(0));
        let sink = Rc::clone(&events);
        ws.on_change(move |_| *sink.borrow_mut() += 1);

        let result = ws.load_idf("OS:ThermalZone, Z2;\nOS:AirflowNetworkZone, A, Missing;");
        match result {
            Err(WorkspaceError::InvalidRecords { level, errors }) => {
                assert_eq!(level, Strictness::Final);
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, DataErrorKind::UnresolvedReference("Missing".to_string()));
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(ws.handles(), vec![zone]);
        assert_eq!(*events.borrow(), 0);
        assert_eq!(ws.add_object("OS:ThermalZone").unwrap(), Handle::from_raw(2));

        let handles = ws
            .load_idf("OS:ThermalZone, Z3;\nOS:AirflowNetworkZone, A, Z3;")
            .unwrap();
        assert_eq!(ws.resolve_reference(handles[1], 1), Some(handles[0]));
    }

    #[test]
    fn test_names_shared_across_target_types() {
        let ws = workspace();
        let zone = ws.add_object("OS:ThermalZone").unwrap();
        let curve = ws.add_object("OS:Curve").unwrap();
        let actuator = ws.add_object("OS:Actuator").unwrap();
        ws.set_name(zone, "Core");
        ws.set_name(curve, "Core");

        // Live references are stored as handles and stay exact
        assert!(ws.set_reference(actuator, 1, zone));
        assert_eq!(ws.resolve_reference(actuator, 1), Some(zone));

        // In text the name is ambiguous, so it is left unresolved
        let reloaded = workspace();
        let handles = reloaded.load_idf(&ws.to_idf_string()).unwrap();
        let copy = handles[2];
        assert_eq!(reloaded.object_type(copy).as_deref(), Some("OS:Actuator"));
        assert_eq!(reloaded.resolve_reference(copy, 1), None);
        assert_eq!(reloaded.get_string(copy, 1).as_deref(), Some("Core"));
        let report = reloaded.validity_report(Strictness::Final);
        assert_eq!(report.errors_for(copy).count(), 1);

        // Once the name is unique again it resolves
        ws.set_name(curve, "Decay");
        let reloaded = workspace();
        let handles = reloaded.load_idf(&ws.to_idf_string()).unwrap();
        assert_eq!(reloaded.resolve_reference(handles[2], 1), Some(handles[0]));
    }

    #[test]
    fn test_comments_survive_round_trip() {
        let text = "\
! Core of the first floor
OS:ThermalZone,
  Core,                    !- Name
  2;                       ! east wing counted twice
";
        let ws = workspace();
        let zone = ws.load_idf(text).unwrap()[0];
        assert_eq!(ws.comment(zone).as_deref(), Some("Core of the first floor"));
        assert_eq!(ws.field_comment(zone, 1).as_deref(), Some("east wing counted twice"));
        assert_eq!(ws.field_comment(zone, 0), None);

        let written = ws.to_idf_string();
        assert!(written.starts_with("! Core of the first floor\nOS:ThermalZone,\n"));
        assert!(written.contains("! east wing counted twice"));
        assert!(written.contains("!- Name"));

        assert!(ws.set_comment(zone, ""));
        assert!(ws.set_field_comment(zone, 0, "main zone"));
        assert!(!ws.set_field_comment(zone, 9, "nope"));
        let copy = ws.clone_object(zone).unwrap();
        assert_eq!(ws.comment(copy), None);
        assert_eq!(ws.field_comment(copy, 0).as_deref(), Some("main zone"));

        let reloaded = workspace();
        let again = reloaded.load_idf(&ws.to_idf_string()).unwrap();
        assert_eq!(reloaded.field_comment(again[0], 0).as_deref(), Some("main zone"));
        assert_eq!(reloaded.field_comment(again[0], 1).as_deref(), Some("east wing counted twice"));
    }

    #[test]
    fn test_idf_round_trip() {
        let text = "\
OS:ThermalZone,
  Core,                    !- Name
  2;                       !- Multiplier

OS:AirflowNetworkZone,
  AFN Core,
  Core,
  Constant;

OS:ZoneList,
  All Zones,
  Core, 1.0;
";
        let ws = workspace();
        let handles = ws.load_idf(text).unwrap();
        assert_eq!(handles.len(), 3);
        let (zone, afn, list) = (handles[0], handles[1], handles[2]);

        assert_eq!(ws.get_int(zone, 1), Some(2));
        assert_eq!(ws.resolve_reference(afn, 1), Some(zone));
        assert_eq!(ws.get_string(afn, 1), Some(zone.to_string()));
        assert_eq!(ws.extensible_group(list, 0).unwrap().resolve_reference(0), Some(zone));

        let written = ws.to_idf_string();
        assert!(written.contains("  Core,                    !- Thermal Zone Name"));
        assert!(written.contains("!- Zone Name 1"));

        let reloaded = workspace();
        let again = reloaded.load_idf(&written).unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(reloaded.resolve_reference(again[1], 1), Some(again[0]));
        assert_eq!(reloaded.get_string(again[1], 2).as_deref(), Some("Constant"));
    }

    #[test]
    fn test_load_is_all_or_nothing_on_unknown_type() {
        let ws = workspace();
        let result = ws.load_idf("OS:ThermalZone, A;\nOS:Unknown, B;");
        assert!(matches!(result, Err(WorkspaceError::Schema(_))));
        assert_eq!(ws.num_objects(), 0);
    }

    #[test]
    fn test_load_merges_unique_and_renames_duplicates() {
        let ws = workspace();
        let building = ws.add_object("OS:Building").unwrap();
        let handles = ws
            .load_idf("OS:Building, HQ, 30;\nOS:ThermalZone, Z;\nOS:ThermalZone, Z;")
            .unwrap();
        assert_eq!(handles[0], building);
        assert_eq!(ws.get_double(building, 1), Some(30.0));
        assert_eq!(ws.name(handles[1]).as_deref(), Some("Z"));
        assert_eq!(ws.name(handles[2]).as_deref(), Some("Z 1"));
    }

    #[test]
    fn test_split_name_suffix() {
        assert_eq!(split_name_suffix("Zone 12"), ("Zone", Some(12), ' '));
        assert_eq!(split_name_suffix("Zone_3"), ("Zone", Some(3), '_'));
        assert_eq!(split_name_suffix("Zone"), ("Zone", None, ' '));
        assert_eq!(split_name_suffix("Zone 1a"), ("Zone 1a", None, ' '));
        assert_eq!(default_base_name("OS:Curve:Linear"), "Curve Linear");
    }
}
