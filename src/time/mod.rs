//! Time integration of the incompressible Navier-Stokes equations.

mod bdf;
mod dual_splitting;

pub use bdf::{BdfCoefficients, ExtrapolationCoefficients, MAX_ORDER, order_at_step};
pub use dual_splitting::{StepReport, TimeIntDualSplitting};
