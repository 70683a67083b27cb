//! Incompressible Navier-Stokes discretization with the dual-splitting
//! projection scheme.

mod base;
pub mod curl;
mod dual_splitting;
pub mod parameters;

pub use base::NavierStokesCore;
pub use dual_splitting::DualSplittingOperator;
pub use parameters::{
    EquationType, FormulationConvectiveTerm, Parameters, PreconditionerPressurePoisson, PreconditionerViscous,
};
