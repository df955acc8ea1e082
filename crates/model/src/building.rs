//! Building

use std::marker::PhantomData;

use bemkit_core::{Handle, IddObject, Workspace, WorkspaceError};

/// The building a model describes; at most one per workspace
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:Building")]
pub struct Building<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "North Axis", default)]
    north_axis: PhantomData<f64>,

    #[idd(field = "Nominal Floor to Floor Height")]
    nominal_floor_to_floor_height: PhantomData<Option<f64>>,

    #[idd(field = "Standards Number of Stories")]
    standards_number_of_stories: PhantomData<Option<i32>>,

    #[idd(field = "Relocatable", default)]
    relocatable: PhantomData<bool>,
}

impl<'w> Building<'w> {
    /// The workspace's building, created on first use
    pub fn get(ws: &'w Workspace) -> Result<Self, WorkspaceError> {
        Self::insert(ws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bemkit_core::ModelObject;

    #[test]
    fn test_building_is_unique() {
        let ws = crate::new_workspace().unwrap();
        let (first, created) = Building::get_or_insert(&ws).unwrap();
        assert!(created);
        let (second, created) = Building::get_or_insert(&ws).unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(Building::get(&ws).unwrap(), first);
        assert_eq!(Building::all(&ws).len(), 1);
        assert!(first.as_object().clone_object().is_none());
    }

    #[test]
    fn test_building_defaults() {
        let ws = crate::new_workspace().unwrap();
        let building = Building::get(&ws).unwrap();
        assert_eq!(building.north_axis(), 0.0);
        assert!(building.is_north_axis_defaulted());
        assert!(!building.relocatable());
        assert_eq!(building.standards_number_of_stories(), None);

        assert!(building.set_north_axis(45.0));
        assert!(building.set_relocatable(true));
        assert!(!building.set_nominal_floor_to_floor_height(-1.0));
        assert!(building.set_standards_number_of_stories(3));

        assert_eq!(building.north_axis(), 45.0);
        assert!(building.relocatable());
        assert_eq!(building.standards_number_of_stories(), Some(3));

        building.reset_north_axis();
        assert!(building.is_north_axis_defaulted());
    }
}
