//! Energy management system objects

use std::marker::PhantomData;

use bemkit_core::{Handle, IddObject, ModelObject, Workspace, WorkspaceError, WorkspaceObject};

/// Overrides a control value of another object at run time
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:EnergyManagementSystem:Actuator")]
pub struct EnergyManagementSystemActuator<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Actuated Component Name")]
    actuated_component: PhantomData<WorkspaceObject<'w>>,

    #[idd(field = "Actuated Component Type")]
    actuated_component_type: PhantomData<String>,

    #[idd(field = "Actuated Component Control Type")]
    actuated_component_control_type: PhantomData<String>,
}

impl<'w> EnergyManagementSystemActuator<'w> {
    /// Add an actuator for `component`
    ///
    /// Fails with `InvalidReferenceType` if `component` cannot be actuated.
    pub fn new<T: ModelObject<'w>>(
        component: &T,
        component_type: &str,
        control_type: &str,
    ) -> Result<Self, WorkspaceError> {
        let ws = component.workspace();
        let actuator = Self::insert(ws)?;
        let index = ws.field_index(Self::IDD_OBJECT_TYPE, Self::ACTUATED_COMPONENT_FIELD)?;
        if let Err(e) = ws.try_set_reference(actuator.handle(), index, component.handle()) {
            actuator.remove();
            return Err(e);
        }
        actuator.set_actuated_component_type(component_type);
        actuator.set_actuated_component_control_type(control_type);
        Ok(actuator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Building, CurveDoubleExponentialDecay, ThermalZone};

    #[test]
    fn test_curve_is_referenced_by_actuator() {
        let ws = crate::new_workspace().unwrap();
        let curve = CurveDoubleExponentialDecay::new(&ws).unwrap();
        let actuator = EnergyManagementSystemActuator::new(&curve, "Curve", "Curve Result").unwrap();

        assert_eq!(actuator.actuated_component(), Some(curve.as_object()));
        assert_eq!(actuator.actuated_component_type(), "Curve");
        assert_eq!(actuator.actuated_component_control_type(), "Curve Result");
        assert_eq!(curve.direct_sources(), vec![actuator.as_object()]);

        let zone = ThermalZone::new(&ws).unwrap();
        assert!(actuator.set_actuated_component(&zone.as_object()));
        assert!(curve.direct_sources().is_empty());
    }

    #[test]
    fn test_rejects_unsupported_component() {
        let ws = crate::new_workspace().unwrap();
        let building = Building::get(&ws).unwrap();
        let result = EnergyManagementSystemActuator::new(&building, "Building", "North Axis");
        assert!(matches!(result, Err(WorkspaceError::InvalidReferenceType { .. })));
        assert!(EnergyManagementSystemActuator::all(&ws).is_empty());
    }
}
