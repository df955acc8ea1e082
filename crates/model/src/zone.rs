//! Thermal zones and their airflow-network counterparts

use std::marker::PhantomData;

use bemkit_core::{Handle, IddObject, ModelObject, ParentObject, Workspace, WorkspaceError, WorkspaceObject};
use tracing::debug;

/// A volume of air at a uniform temperature
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:ThermalZone")]
pub struct ThermalZone<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Multiplier", default)]
    multiplier: PhantomData<i32>,

    #[idd(field = "Ceiling Height", default, autocalculate)]
    ceiling_height: PhantomData<Option<f64>>,

    #[idd(field = "Volume", default, autocalculate)]
    volume: PhantomData<Option<f64>>,

    #[idd(field = "Use Ideal Air Loads", default)]
    use_ideal_air_loads: PhantomData<bool>,
}

impl<'w> ThermalZone<'w> {
    pub fn new(ws: &'w Workspace) -> Result<Self, WorkspaceError> {
        Self::insert(ws)
    }

    /// The airflow-network zone attached to this zone, if any
    pub fn airflow_network_zone(&self) -> Option<AirflowNetworkZone<'w>> {
        self.direct_sources()
            .into_iter()
            .find_map(|source| source.cast::<AirflowNetworkZone>())
    }

    /// The attached airflow-network zone, creating one if needed
    pub fn get_airflow_network_zone(&self) -> Result<AirflowNetworkZone<'w>, WorkspaceError> {
        match self.airflow_network_zone() {
            Some(afn) => Ok(afn),
            None => AirflowNetworkZone::new(self),
        }
    }
}

impl<'w> ParentObject<'w> for ThermalZone<'w> {
    fn children(&self) -> Vec<WorkspaceObject<'w>> {
        self.direct_sources()
            .into_iter()
            .filter(|source| source.cast::<AirflowNetworkZone>().is_some())
            .collect()
    }
}

/// Airflow-network settings for one thermal zone
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:AirflowNetworkZone")]
pub struct AirflowNetworkZone<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Thermal Zone Name")]
    thermal_zone: PhantomData<ThermalZone<'w>>,

    #[idd(field = "Ventilation Control Mode", default)]
    ventilation_control_mode: PhantomData<String>,

    #[idd(field = "Minimum Venting Open Factor", default)]
    minimum_venting_open_factor: PhantomData<f64>,

    #[idd(
        field = "Indoor and Outdoor Temperature Difference Lower Limit For Maximum Venting Open Factor",
        default
    )]
    indoor_and_outdoor_temperature_difference_lower_limit_for_maximum_venting_open_factor: PhantomData<f64>,

    #[idd(
        field = "Indoor and Outdoor Temperature Difference Upper Limit for Minimum Venting Open Factor",
        default
    )]
    indoor_and_outdoor_temperature_difference_upper_limit_for_minimum_venting_open_factor: PhantomData<f64>,

    #[idd(field = "Single Sided Wind Pressure Coefficient Algorithm", default)]
    single_sided_wind_pressure_coefficient_algorithm: PhantomData<String>,

    #[idd(field = "Facade Width", default)]
    facade_width: PhantomData<f64>,
}

impl<'w> AirflowNetworkZone<'w> {
    /// Attach a new airflow-network zone to `zone`
    pub fn new(zone: &ThermalZone<'w>) -> Result<Self, WorkspaceError> {
        let afn = Self::insert(zone.workspace())?;
        if !afn.set_thermal_zone(zone) {
            debug!("Could not attach {:?} to {:?}", afn, zone);
            afn.remove();
            return Err(WorkspaceError::UnknownHandle(zone.handle()));
        }
        Ok(afn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bemkit_core::{Strictness, UnitSystem, WorkspaceConfig};

    #[test]
    fn test_zone_defaults() {
        let ws = crate::new_workspace().unwrap();
        let zone = ThermalZone::new(&ws).unwrap();

        assert_eq!(zone.multiplier(), 1);
        assert!(zone.is_ceiling_height_autocalculated());
        assert_eq!(zone.ceiling_height(), None);
        assert!(!zone.use_ideal_air_loads());

        assert!(zone.set_ceiling_height(3.0));
        assert!(!zone.is_ceiling_height_autocalculated());
        assert_eq!(zone.ceiling_height(), Some(3.0));
        assert!(zone.autocalculate_ceiling_height());
        assert!(zone.is_ceiling_height_autocalculated());

        assert!(!zone.set_multiplier(0));
        assert!(zone.set_use_ideal_air_loads(true));
        assert!(zone.use_ideal_air_loads());
    }

    #[test]
    fn test_loaded_values_read_safely() {
        let ws = crate::new_workspace().unwrap();
        assert!(ws.load_idf("OS:ThermalZone, Z, abc;").is_err());
        assert!(ThermalZone::by_name(&ws, "Z").is_none());

        // An unchecked workspace keeps the bad text; the getter falls back
        let config = WorkspaceConfig {
            strictness: Strictness::None,
            ..WorkspaceConfig::default()
        };
        let lax = crate::new_workspace_with_config(config).unwrap();
        lax.load_idf("OS:ThermalZone, Z, abc;").unwrap();
        let zone = ThermalZone::by_name(&lax, "Z").unwrap();
        assert_eq!(zone.multiplier(), 0);
        assert!(zone.set_multiplier(2));
        assert_eq!(zone.multiplier(), 2);
    }

    #[test]
    fn test_zone_volume_in_ip_units() {
        let ws = crate::new_workspace().unwrap();
        let zone = ThermalZone::new(&ws).unwrap();
        let volume = ThermalZone::VOLUME_FIELD;
        let index = ws.field_index(ThermalZone::IDD_OBJECT_TYPE, volume).unwrap();

        assert!(zone.set_volume(100.0));
        let ip = ws.get_quantity(zone.handle(), index, UnitSystem::Ip).unwrap();
        assert_eq!(ip.units, "ft3");
        assert!((ip.value - 3531.4667).abs() < 1e-3);
    }

    #[test]
    fn test_airflow_network_zone_reference() {
        let ws = crate::new_workspace().unwrap();
        let zone = ThermalZone::new(&ws).unwrap();
        assert_eq!(zone.airflow_network_zone(), None);

        let afn = zone.get_airflow_network_zone().unwrap();
        assert_eq!(afn.thermal_zone(), Some(zone));
        assert_eq!(zone.get_airflow_network_zone().unwrap(), afn);
        assert_eq!(afn.ventilation_control_mode(), "NoVent");
        assert_eq!(afn.minimum_venting_open_factor(), 1.0);
        assert!(!afn.set_minimum_venting_open_factor(1.5));
        assert!(!afn.set_indoor_and_outdoor_temperature_difference_lower_limit_for_maximum_venting_open_factor(100.0));
        assert!(afn.set_ventilation_control_mode("constant"));
        assert_eq!(afn.ventilation_control_mode(), "Constant");
        assert!(ws.validity_report(Strictness::Final).is_valid());
    }

    #[test]
    fn test_remove_zone_detaches_airflow_network_zone() {
        let ws = crate::new_workspace().unwrap();
        let zone = ThermalZone::new(&ws).unwrap();
        let afn = AirflowNetworkZone::new(&zone).unwrap();

        assert!(zone.remove());
        assert!(afn.is_valid());
        assert_eq!(afn.thermal_zone(), None);

        // The dangling required reference now fails a final check
        let report = ws.validity_report(Strictness::Final);
        assert_eq!(report.errors_for(afn.handle()).count(), 1);
    }

    #[test]
    fn test_remove_zone_with_children() {
        let ws = crate::new_workspace().unwrap();
        let zone = ThermalZone::new(&ws).unwrap();
        let other = ThermalZone::new(&ws).unwrap();
        let afn = AirflowNetworkZone::new(&zone).unwrap();
        AirflowNetworkZone::new(&other).unwrap();

        assert_eq!(zone.children().len(), 1);
        let removed = zone.remove_with_children();
        assert_eq!(removed, vec![afn.handle(), zone.handle()]);
        assert!(!afn.is_valid());
        assert_eq!(AirflowNetworkZone::all(&ws).len(), 1);
    }
}
