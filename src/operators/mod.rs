//! Matrix-free DG operators on tensor-product quadrilaterals.
//!
//! Infrastructure:
//! - [`ShapeInfo`]: GLL nodes, 1D derivative matrix, face node tables
//! - [`MappingInfo`]: per-node geometry of the bilinear cell map
//! - [`MatrixFreeContext`]: face lists, lane batches and the cell/face loops
//! - [`CellIntegrator`], [`FaceIntegrator`]: evaluate/submit/integrate
//!
//! Operators of the incompressible Navier-Stokes equations:
//! - [`MassOperator`] (diagonal for GLL collocation)
//! - [`LaplaceOperator`] (scalar SIPG, pressure Poisson equation)
//! - [`DivergenceOperator`], [`GradientOperator`] (central fluxes)
//! - [`ViscousOperator`] (vector SIPG, variable viscosity)
//! - [`ConvectiveOperator`] (Lax-Friedrichs, optional ALE grid velocity)
//! - [`MomentumOperator`] (mass + viscous + linearized convective)

mod convective;
mod divergence;
mod gradient;
mod integrator;
mod laplace;
mod mapping;
mod mass;
mod matrix_free;
mod momentum;
mod shape_info;
mod viscous;

pub use convective::ConvectiveOperator;
pub use divergence::DivergenceOperator;
pub use gradient::GradientOperator;
pub use integrator::{CellIntegrator, FaceIntegrator};
pub use laplace::{LaplaceOperator, LaplaceOperatorData};
pub use mapping::{InverseJacobian, MappingInfo};
pub use mass::MassOperator;
pub use matrix_free::{
    Batch, BoundaryFace, InnerFace, LANES, LocalContributions, MatrixFreeContext,
};
pub use momentum::{MomentumOperator, MomentumOperatorData, OperatorState};
pub use shape_info::{FACE_NORMALS, ShapeInfo};
pub use viscous::{ViscosityModel, ViscousOperator, ViscousOperatorData};

#[inline]
pub(crate) fn dot2(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}
