//! bemkit - Model Objects
//!
//! The bundled object schema and a typed façade for each of its types:
//! - [`Building`] (unique per workspace)
//! - [`ThermalZone`], parent of its [`AirflowNetworkZone`]
//! - [`CurveDoubleExponentialDecay`]
//! - [`EnergyManagementSystemActuator`]
//! - [`UtilityBill`] with its [`BillingPeriod`]s
//! - [`GroundHeatExchangerVertical`] with its g-function pairs
//!
//! # Example
//!
//! ```ignore
//! let ws = bemkit_model::new_workspace()?;
//! let zone = ThermalZone::new(&ws)?;
//! let afn = AirflowNetworkZone::new(&zone)?;
//! assert_eq!(afn.thermal_zone(), Some(zone));
//! ```

use std::sync::Arc;

use bemkit_core::{IddError, SchemaRegistry, Workspace, WorkspaceConfig};
use tracing::debug;

pub mod building;
pub mod curves;
pub mod ems;
pub mod ground_heat_exchanger;
pub mod utility_bill;
pub mod zone;

pub use building::Building;
pub use curves::CurveDoubleExponentialDecay;
pub use ems::EnergyManagementSystemActuator;
pub use ground_heat_exchanger::GroundHeatExchangerVertical;
pub use utility_bill::{BillingPeriod, UtilityBill};
pub use zone::{AirflowNetworkZone, ThermalZone};

/// Schema source for every type in this crate
pub const MODEL_SCHEMA: &str = include_str!("../resources/model.toml");

/// Load the bundled schema
pub fn schema() -> Result<SchemaRegistry, IddError> {
    let registry = SchemaRegistry::from_toml_str(MODEL_SCHEMA)?;
    debug!(
        "Bundled schema {} defines {} object types",
        registry.version(),
        registry.len()
    );
    Ok(registry)
}

/// Create an empty workspace over the bundled schema
pub fn new_workspace() -> Result<Workspace, IddError> {
    Ok(Workspace::new(Arc::new(schema()?)))
}

/// Like [`new_workspace`], with explicit settings
pub fn new_workspace_with_config(config: WorkspaceConfig) -> Result<Workspace, IddError> {
    Ok(Workspace::with_config(Arc::new(schema()?), config))
}
