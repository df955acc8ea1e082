//! Façades over workspace records
//!
//! A façade is a `(&Workspace, Handle)` pair. It owns nothing: every read and
//! write goes through the workspace, so any number of façades may alias the
//! same record and always observe its current values. A façade whose record
//! was removed reads as empty and rejects writes.
//!
//! Typed façades are generated with `#[derive(IddObject)]`; [`WorkspaceObject`]
//! is the untyped one, addressing fields by index.

use tracing::warn;

use crate::group::ExtensibleGroup;
use crate::handle::Handle;
use crate::workspace::Workspace;

/// Identity and relationships shared by every façade
pub trait ModelObject<'w>: Copy {
    /// Wrap `handle` if it names a record this façade can represent
    fn from_handle(ws: &'w Workspace, handle: Handle) -> Option<Self>;

    fn workspace(&self) -> &'w Workspace;

    fn handle(&self) -> Handle;

    /// Type name of the wrapped record (empty once removed)
    fn object_type(&self) -> String {
        self.workspace()
            .object_type(self.handle())
            .unwrap_or_default()
    }

    /// Whether the wrapped record still exists
    fn is_valid(&self) -> bool {
        self.workspace().contains(self.handle())
    }

    fn name(&self) -> Option<String> {
        self.workspace().name(self.handle())
    }

    /// Rename, returning the name actually applied
    fn set_name(&self, name: &str) -> Option<String> {
        self.workspace().set_name(self.handle(), name)
    }

    /// Remove the wrapped record, detaching everything that referenced it
    fn remove(&self) -> bool {
        self.workspace().remove_object(self.handle())
    }

    /// Records with a reference field pointing here
    fn direct_sources(&self) -> Vec<WorkspaceObject<'w>> {
        let ws = self.workspace();
        ws.direct_sources(self.handle())
            .into_iter()
            .map(|h| WorkspaceObject::new(ws, h))
            .collect()
    }

    /// Records this one's reference fields point at
    fn targets(&self) -> Vec<WorkspaceObject<'w>> {
        let ws = self.workspace();
        ws.targets(self.handle())
            .into_iter()
            .map(|h| WorkspaceObject::new(ws, h))
            .collect()
    }

    fn as_object(&self) -> WorkspaceObject<'w> {
        WorkspaceObject::new(self.workspace(), self.handle())
    }
}

/// Records that own other records
pub trait ParentObject<'w>: ModelObject<'w> {
    fn children(&self) -> Vec<WorkspaceObject<'w>>;

    /// Remove every child, then this record
    ///
    /// Returns the handles removed, children first.
    fn remove_with_children(&self) -> Vec<Handle> {
        let mut removed: Vec<Handle> = self
            .children()
            .into_iter()
            .filter(|child| child.remove())
            .map(|child| child.handle())
            .collect();
        if self.remove() {
            removed.push(self.handle());
        }
        removed
    }
}

/// Value behind a generated getter that returns a plain value
///
/// A blank or unreadable field is logged and read as `T::default()`.
#[doc(hidden)]
pub fn required_value<T: Default>(value: Option<T>, handle: Handle, field: &str) -> T {
    value.unwrap_or_else(|| {
        warn!("{} has no usable value for {:?}, reading the default", handle, field);
        T::default()
    })
}

/// Untyped façade over any record
#[derive(Clone, Copy)]
pub struct WorkspaceObject<'w> {
    ws: &'w Workspace,
    handle: Handle,
}

impl<'w> WorkspaceObject<'w> {
    pub(crate) fn new(ws: &'w Workspace, handle: Handle) -> Self {
        Self { ws, handle }
    }

    /// View this record through a typed façade
    pub fn cast<T: ModelObject<'w>>(&self) -> Option<T> {
        T::from_handle(self.ws, self.handle)
    }

    pub fn num_fields(&self) -> usize {
        self.ws
            .with_object(self.handle, |o| o.num_fields())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: usize) -> bool {
        self.ws.is_empty(self.handle, index)
    }

    pub fn is_defaulted(&self, index: usize) -> bool {
        self.ws.is_defaulted(self.handle, index)
    }

    pub fn get_string(&self, index: usize) -> Option<String> {
        self.ws.get_string(self.handle, index)
    }

    pub fn get_double(&self, index: usize) -> Option<f64> {
        self.ws.get_double(self.handle, index)
    }

    pub fn get_int(&self, index: usize) -> Option<i32> {
        self.ws.get_int(self.handle, index)
    }

    pub fn get_bool(&self, index: usize) -> Option<bool> {
        self.ws.get_bool(self.handle, index)
    }

    pub fn set_string(&self, index: usize, value: &str) -> bool {
        self.ws.set_string(self.handle, index, value)
    }

    pub fn set_double(&self, index: usize, value: f64) -> bool {
        self.ws.set_double(self.handle, index, value)
    }

    pub fn set_int(&self, index: usize, value: i32) -> bool {
        self.ws.set_int(self.handle, index, value)
    }

    pub fn set_bool(&self, index: usize, value: bool) -> bool {
        self.ws.set_bool(self.handle, index, value)
    }

    pub fn reset(&self, index: usize) {
        self.ws.reset_field(self.handle, index)
    }

    /// The record a reference field points at
    pub fn get_target(&self, index: usize) -> Option<WorkspaceObject<'w>> {
        self.ws
            .resolve_reference(self.handle, index)
            .map(|h| WorkspaceObject::new(self.ws, h))
    }

    pub fn set_target<T: ModelObject<'w>>(&self, index: usize, target: &T) -> bool {
        self.ws.set_reference(self.handle, index, target.handle())
    }

    pub fn num_extensible_groups(&self) -> usize {
        self.ws.num_extensible_groups(self.handle)
    }

    pub fn extensible_groups(&self) -> Vec<ExtensibleGroup<'w>> {
        self.ws.extensible_groups(self.handle)
    }

    pub fn push_extensible_group<S: AsRef<str>>(&self, values: &[S]) -> Option<ExtensibleGroup<'w>> {
        self.ws.push_extensible_group(self.handle, values)
    }

    pub fn erase_extensible_group(&self, group: usize) -> bool {
        self.ws.erase_extensible_group(self.handle, group)
    }

    /// Copy the record, returning a façade over the copy
    pub fn clone_object(&self) -> Option<WorkspaceObject<'w>> {
        self.ws
            .clone_object(self.handle)
            .map(|h| WorkspaceObject::new(self.ws, h))
    }
}

impl<'w> ModelObject<'w> for WorkspaceObject<'w> {
    fn from_handle(ws: &'w Workspace, handle: Handle) -> Option<Self> {
        ws.contains(handle).then(|| Self::new(ws, handle))
    }

    fn workspace(&self) -> &'w Workspace {
        self.ws
    }

    fn handle(&self) -> Handle {
        self.handle
    }
}

impl PartialEq for WorkspaceObject<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ws, other.ws) && self.handle == other.handle
    }
}

impl Eq for WorkspaceObject<'_> {}

impl std::fmt::Debug for WorkspaceObject<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkspaceObject")
            .field("handle", &self.handle)
            .field("object_type", &self.object_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bemkit_idd::{FieldSchema, ObjectSchema, SchemaRegistry};
    use std::sync::Arc;

    fn workspace() -> Workspace {
        let registry = SchemaRegistry::builder("1.0.0")
            .object(
                ObjectSchema::builder("OS:ThermalZone")
                    .field(FieldSchema::name_field())
                    .field(FieldSchema::number("Ceiling Height").with_default("3"))
                    .build(),
            )
            .object(
                ObjectSchema::builder("OS:Space")
                    .field(FieldSchema::name_field())
                    .field(FieldSchema::reference("Thermal Zone Name", ["OS:ThermalZone"]))
                    .build(),
            )
            .build()
            .unwrap();
        Workspace::new(Arc::new(registry))
    }

    /// Minimal hand-written typed façade
    #[derive(Clone, Copy)]
    struct Zone<'w>(WorkspaceObject<'w>);

    impl<'w> ModelObject<'w> for Zone<'w> {
        fn from_handle(ws: &'w Workspace, handle: Handle) -> Option<Self> {
            let object_type = ws.object_type(handle)?;
            (object_type == "OS:ThermalZone").then(|| Zone(WorkspaceObject::new(ws, handle)))
        }

        fn workspace(&self) -> &'w Workspace {
            self.0.workspace()
        }

        fn handle(&self) -> Handle {
            self.0.handle()
        }
    }

    impl<'w> ParentObject<'w> for Zone<'w> {
        fn children(&self) -> Vec<WorkspaceObject<'w>> {
            self.direct_sources()
        }
    }

    #[test]
    fn test_aliases_see_the_same_record() {
        let ws = workspace();
        let zone = ws.get_object(ws.add_object("OS:ThermalZone").unwrap()).unwrap();
        let alias = zone;

        assert_eq!(alias.get_double(1), Some(3.0));
        assert!(zone.is_defaulted(1));
        assert!(zone.set_double(1, 2.5));
        assert_eq!(alias.get_double(1), Some(2.5));
        assert_eq!(zone, alias);
    }

    #[test]
    fn test_cast() {
        let ws = workspace();
        let zone = ws.get_object(ws.add_object("OS:ThermalZone").unwrap()).unwrap();
        let space = ws.get_object(ws.add_object("OS:Space").unwrap()).unwrap();

        assert!(zone.cast::<Zone>().is_some());
        assert!(space.cast::<Zone>().is_none());
        assert_eq!(zone.object_type(), "OS:ThermalZone");
    }

    #[test]
    fn test_targets_and_sources() {
        let ws = workspace();
        let zone = ws.get_object(ws.add_object("OS:ThermalZone").unwrap()).unwrap();
        let space = ws.get_object(ws.add_object("OS:Space").unwrap()).unwrap();

        assert!(space.set_target(1, &zone));
        assert_eq!(space.get_target(1), Some(zone));
        assert_eq!(zone.direct_sources(), vec![space]);
        assert_eq!(space.targets(), vec![zone]);
    }

    #[test]
    fn test_removed_record_reads_empty() {
        let ws = workspace();
        let zone = ws.get_object(ws.add_object("OS:ThermalZone").unwrap()).unwrap();
        assert!(zone.remove());
        assert!(!zone.is_valid());
        assert_eq!(zone.get_double(1), None);
        assert!(!zone.set_double(1, 1.0));
        assert_eq!(zone.object_type(), "");
        assert_eq!(zone.name(), None);
    }

    #[test]
    fn test_remove_with_children() {
        let ws = workspace();
        let zone: Zone = ws
            .get_object(ws.add_object("OS:ThermalZone").unwrap())
            .and_then(|o| o.cast())
            .unwrap();
        let a = ws.get_object(ws.add_object("OS:Space").unwrap()).unwrap();
        let b = ws.get_object(ws.add_object("OS:Space").unwrap()).unwrap();
        let other = ws.get_object(ws.add_object("OS:Space").unwrap()).unwrap();
        a.set_target(1, &zone);
        b.set_target(1, &zone);

        let removed = zone.remove_with_children();
        assert_eq!(removed, vec![a.handle(), b.handle(), zone.handle()]);
        assert!(other.is_valid());
        assert_eq!(ws.num_objects(), 1);
    }

    #[test]
    fn test_required_value_falls_back_to_default() {
        let handle = Handle::from_raw(3);
        assert_eq!(required_value(Some(2.5), handle, "Ceiling Height"), 2.5);
        assert_eq!(required_value::<f64>(None, handle, "Ceiling Height"), 0.0);
        assert_eq!(required_value::<String>(None, handle, "Name"), "");
    }

    #[test]
    fn test_clone_object() {
        let ws = workspace();
        let zone = ws.get_object(ws.add_object("OS:ThermalZone").unwrap()).unwrap();
        zone.set_double(1, 4.0);
        let copy = zone.clone_object().unwrap();
        assert_ne!(copy, zone);
        assert_eq!(copy.get_double(1), Some(4.0));
        assert_eq!(copy.name().as_deref(), Some("ThermalZone 2"));
    }
}
