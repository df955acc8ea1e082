//! Extensible group views
//!
//! A group view addresses one slice of a record's field array by offset
//! within the group template. [`GroupRef`] borrows an [`IdfObject`] directly;
//! [`ExtensibleGroup`] is a live, copyable view that goes through the
//! [`Workspace`] on every call.

use crate::handle::Handle;
use crate::object::IdfObject;
use crate::workspace::Workspace;

/// Borrowed read-only view of one extensible group
#[derive(Debug, Clone, Copy)]
pub struct GroupRef<'a> {
    object: &'a IdfObject,
    group: usize,
}

impl<'a> GroupRef<'a> {
    pub(crate) fn new(object: &'a IdfObject, group: usize) -> Self {
        Self { object, group }
    }

    /// Position of this group among the record's groups
    pub fn group_index(&self) -> usize {
        self.group
    }

    /// Absolute field index of `offset`
    pub fn field_index(&self, offset: usize) -> Option<usize> {
        self.object.schema().extensible_index(self.group, offset)
    }

    /// Raw values of this group
    pub fn values(&self) -> &'a [String] {
        let size = self.object.schema().group_size();
        let start = self.object.schema().num_fields() + self.group * size;
        &self.object.fields()[start..start + size]
    }

    pub fn is_empty(&self, offset: usize) -> bool {
        self.field_index(offset)
            .map_or(true, |i| self.object.is_empty(i))
    }

    pub fn get_string(&self, offset: usize) -> Option<String> {
        self.field_index(offset)
            .and_then(|i| self.object.get_string(i))
    }

    pub fn get_double(&self, offset: usize) -> Option<f64> {
        self.field_index(offset)
            .and_then(|i| self.object.get_double(i))
    }

    pub fn get_int(&self, offset: usize) -> Option<i32> {
        self.field_index(offset)
            .and_then(|i| self.object.get_int(i))
    }
}

/// Live view of one extensible group of a workspace record
///
/// Like façades, group views never cache values. A view whose group has been
/// erased reads as empty and rejects writes.
#[derive(Clone, Copy)]
pub struct ExtensibleGroup<'w> {
    ws: &'w Workspace,
    handle: Handle,
    group: usize,
}

impl<'w> ExtensibleGroup<'w> {
    pub(crate) fn new(ws: &'w Workspace, handle: Handle, group: usize) -> Self {
        Self { ws, handle, group }
    }

    pub fn workspace(&self) -> &'w Workspace {
        self.ws
    }

    /// Handle of the record this group belongs to
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn group_index(&self) -> usize {
        self.group
    }

    /// Whether the group still exists
    pub fn is_valid(&self) -> bool {
        self.ws
            .with_object(self.handle, |o| self.group < o.num_extensible_groups())
            .unwrap_or(false)
    }

    /// Absolute field index of `offset`, if the group still exists
    pub fn field_index(&self, offset: usize) -> Option<usize> {
        self.ws
            .with_object(self.handle, |o| {
                (self.group < o.num_extensible_groups())
                    .then(|| o.schema().extensible_index(self.group, offset))
                    .flatten()
            })
            .flatten()
    }

    pub fn is_empty(&self, offset: usize) -> bool {
        self.field_index(offset)
            .map_or(true, |i| self.ws.is_empty(self.handle, i))
    }

    pub fn get_string(&self, offset: usize) -> Option<String> {
        self.field_index(offset)
            .and_then(|i| self.ws.get_string(self.handle, i))
    }

    pub fn get_double(&self, offset: usize) -> Option<f64> {
        self.field_index(offset)
            .and_then(|i| self.ws.get_double(self.handle, i))
    }

    pub fn get_int(&self, offset: usize) -> Option<i32> {
        self.field_index(offset)
            .and_then(|i| self.ws.get_int(self.handle, i))
    }

    pub fn get_bool(&self, offset: usize) -> Option<bool> {
        self.field_index(offset)
            .and_then(|i| self.ws.get_bool(self.handle, i))
    }

    /// Resolve a reference field of this group
    pub fn resolve_reference(&self, offset: usize) -> Option<Handle> {
        self.field_index(offset)
            .and_then(|i| self.ws.resolve_reference(self.handle, i))
    }

    pub fn set_string(&self, offset: usize, value: &str) -> bool {
        self.field_index(offset)
            .is_some_and(|i| self.ws.set_string(self.handle, i, value))
    }

    pub fn set_double(&self, offset: usize, value: f64) -> bool {
        self.field_index(offset)
            .is_some_and(|i| self.ws.set_double(self.handle, i, value))
    }

    pub fn set_int(&self, offset: usize, value: i32) -> bool {
        self.field_index(offset)
            .is_some_and(|i| self.ws.set_int(self.handle, i, value))
    }

    pub fn set_bool(&self, offset: usize, value: bool) -> bool {
        self.field_index(offset)
            .is_some_and(|i| self.ws.set_bool(self.handle, i, value))
    }

    pub fn set_reference(&self, offset: usize, target: Handle) -> bool {
        self.field_index(offset)
            .is_some_and(|i| self.ws.set_reference(self.handle, i, target))
    }

    /// Blank one field of this group
    pub fn reset(&self, offset: usize) {
        if let Some(i) = self.field_index(offset) {
            self.ws.reset_field(self.handle, i);
        }
    }
}

impl std::fmt::Debug for ExtensibleGroup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensibleGroup")
            .field("handle", &self.handle)
            .field("group", &self.group)
            .finish()
    }
}
