//! Performance curves
//!
//! Curves only carry their coefficients and limits here; evaluating them is
//! left to the simulation engine.

use std::marker::PhantomData;

use bemkit_core::{Handle, IddObject, Workspace, WorkspaceError};

/// `C1 + C2 * exp(C3 * x) + C4 * exp(C5 * x)`
#[derive(Clone, Copy, IddObject)]
#[idd(object = "OS:Curve:DoubleExponentialDecay")]
pub struct CurveDoubleExponentialDecay<'w> {
    ws: &'w Workspace,
    handle: Handle,

    #[idd(field = "Coefficient1 C1")]
    coefficient1_c1: PhantomData<f64>,

    #[idd(field = "Coefficient2 C2")]
    coefficient2_c2: PhantomData<f64>,

    #[idd(field = "Coefficient3 C3")]
    coefficient3_c3: PhantomData<f64>,

    #[idd(field = "Coefficient4 C4")]
    coefficient4_c4: PhantomData<f64>,

    #[idd(field = "Coefficient5 C5")]
    coefficient5_c5: PhantomData<f64>,

    #[idd(field = "Minimum Value of x")]
    minimum_value_of_x: PhantomData<f64>,

    #[idd(field = "Maximum Value of x")]
    maximum_value_of_x: PhantomData<f64>,

    #[idd(field = "Minimum Curve Output")]
    minimum_curve_output: PhantomData<Option<f64>>,

    #[idd(field = "Maximum Curve Output")]
    maximum_curve_output: PhantomData<Option<f64>>,

    #[idd(field = "Input Unit Type for x", default)]
    input_unit_type_for_x: PhantomData<String>,

    #[idd(field = "Output Unit Type", default)]
    output_unit_type: PhantomData<String>,
}

impl<'w> CurveDoubleExponentialDecay<'w> {
    /// Add a curve with all coefficients 0 over x in [0, 1]
    pub fn new(ws: &'w Workspace) -> Result<Self, WorkspaceError> {
        let curve = Self::insert(ws)?;
        curve.set_coefficient1_c1(0.0);
        curve.set_coefficient2_c2(0.0);
        curve.set_coefficient3_c3(0.0);
        curve.set_coefficient4_c4(0.0);
        curve.set_coefficient5_c5(0.0);
        curve.set_minimum_value_of_x(0.0);
        curve.set_maximum_value_of_x(1.0);
        Ok(curve)
    }

    /// Coefficients C1 through C5
    pub fn coefficients(&self) -> [f64; 5] {
        [
            self.coefficient1_c1(),
            self.coefficient2_c2(),
            self.coefficient3_c3(),
            self.coefficient4_c4(),
            self.coefficient5_c5(),
        ]
    }
}
