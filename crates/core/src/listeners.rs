//! Change notifications
//!
//! Each workspace keeps its own listener registry. Callbacks are invoked
//! after the workspace has finished the mutation that caused the event, so
//! a callback may freely register or remove listeners.
//!
//! # Example
//!
//! ```ignore
//! let key = ws.on_change(|event| {
//!     tracing::info!("workspace changed: {:?}", event);
//! });
//!
//! // Later, unregister if needed
//! ws.remove_listener(key);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::handle::Handle;

new_key_type! {
    /// Key for registered listeners, used for removal
    pub struct ListenerKey;
}

/// A change to a workspace
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    ObjectAdded {
        handle: Handle,
        object_type: String,
    },
    ObjectRemoved {
        handle: Handle,
        object_type: String,
    },
    /// A stored field value changed (`old`/`new` are the stored strings)
    FieldChanged {
        handle: Handle,
        index: usize,
        old: String,
        new: String,
    },
    /// Extensible groups were added, removed or replaced
    GroupsChanged { handle: Handle, num_groups: usize },
}

impl WorkspaceEvent {
    pub fn handle(&self) -> Handle {
        match self {
            WorkspaceEvent::ObjectAdded { handle, .. }
            | WorkspaceEvent::ObjectRemoved { handle, .. }
            | WorkspaceEvent::FieldChanged { handle, .. }
            | WorkspaceEvent::GroupsChanged { handle, .. } => *handle,
        }
    }
}

/// Callback for workspace events
pub type ChangeCallback = Rc<dyn Fn(&WorkspaceEvent)>;

#[derive(Default)]
pub(crate) struct Listeners {
    callbacks: RefCell<SlotMap<ListenerKey, ChangeCallback>>,
}

impl Listeners {
    pub fn insert<F>(&self, callback: F) -> ListenerKey
    where
        F: Fn(&WorkspaceEvent) + 'static,
    {
        self.callbacks.borrow_mut().insert(Rc::new(callback))
    }

    pub fn remove(&self, key: ListenerKey) -> bool {
        self.callbacks.borrow_mut().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Fire all callbacks for each event, in order
    pub fn fire(&self, events: &[WorkspaceEvent]) {
        if events.is_empty() {
            return;
        }
        // Snapshot so callbacks can (un)register listeners
        let callbacks: Vec<ChangeCallback> = self.callbacks.borrow().values().cloned().collect();
        if callbacks.is_empty() {
            return;
        }
        for event in events {
            trace!("Firing {:?}", event);
            for callback in &callbacks {
                callback(event);
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.len()).finish()
    }
}
