//! Vertical ground heat exchanger

use std::marker::PhantomData;

use bemkit_core::{Handle, IddObject, Workspace, WorkspaceError};

/// Borehole field with a g-function response table
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:GroundHeatExchanger:Vertical")]
pub struct GroundHeatExchangerVertical<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Design Flow Rate", autosize)]
    design_flow_rate: PhantomData<Option<f64>>,

    #[idd(field = "Number of Bore Holes", default)]
    number_of_bore_holes: PhantomData<i32>,

    #[idd(field = "Bore Hole Length", default)]
    bore_hole_length: PhantomData<f64>,

    #[idd(field = "Bore Hole Radius", default)]
    bore_hole_radius: PhantomData<f64>,

    #[idd(field = "Ground Thermal Conductivity", default)]
    ground_thermal_conductivity: PhantomData<f64>,

    #[idd(field = "Ground Thermal Heat Capacity", default)]
    ground_thermal_heat_capacity: PhantomData<f64>,

    #[idd(field = "Ground Temperature", default)]
    ground_temperature: PhantomData<f64>,

    #[idd(field = "Grout Thermal Conductivity", default)]
    grout_thermal_conductivity: PhantomData<f64>,

    #[idd(field = "Pipe Thermal Conductivity", default)]
    pipe_thermal_conductivity: PhantomData<f64>,

    #[idd(field = "Pipe Out Diameter", default)]
    pipe_out_diameter: PhantomData<f64>,

    #[idd(field = "U-Tube Distance", default)]
    u_tube_distance: PhantomData<f64>,

    #[idd(field = "Pipe Thickness", default)]
    pipe_thickness: PhantomData<f64>,

    #[idd(field = "Maximum Length of Simulation", default)]
    maximum_length_of_simulation: PhantomData<f64>,

    #[idd(field = "G-Function Reference Ratio", default)]
    g_function_reference_ratio: PhantomData<f64>,
}

impl<'w> GroundHeatExchangerVertical<'w> {
    /// Add a heat exchanger with an autosized design flow rate
    pub fn new(ws: &'w Workspace) -> Result<Self, WorkspaceError> {
        let ghx = Self::insert(ws)?;
        ghx.autosize_design_flow_rate();
        Ok(ghx)
    }

    /// `(ln(t/ts), g)` pairs in insertion order
    pub fn g_functions(&self) -> Vec<(f64, f64)> {
        self.ws
            .extensible_groups(self.handle)
            .iter()
            .filter_map(|g| Some((g.get_double(0)?, g.get_double(1)?)))
            .collect()
    }

    pub fn add_g_function(&self, ln_t_ts: f64, g: f64) -> bool {
        if !ln_t_ts.is_finite() || !g.is_finite() {
            return false;
        }
        let values = [ln_t_ts.to_string(), g.to_string()];
        self.ws.push_extensible_group(self.handle, &values).is_some()
    }

    pub fn remove_g_function(&self, index: usize) -> bool {
        self.ws.erase_extensible_group(self.handle, index)
    }

    pub fn remove_all_g_functions(&self) {
        self.ws.clear_extensible_groups(self.handle)
    }
}
