//! # dg-ns
//!
//! Matrix-free discontinuous Galerkin discretization of the incompressible
//! Navier-Stokes equations with the dual-splitting projection scheme.
//!
//! Building blocks:
//! - Gauss-Lobatto-Legendre nodal bases on quadrilaterals
//! - Matrix-free mass, SIPG Laplace, divergence, gradient, viscous and
//!   convective operators
//! - Weak boundary conditions through mirror exterior states
//! - Pressure Poisson boundary terms of the dual-splitting scheme
//! - h-, p- and hp-multigrid preconditioners for the pressure Poisson and
//!   the viscous momentum problem
//! - Moving meshes (ALE) and BDF time integration

pub mod ale;
pub mod basis;
pub mod boundary;
pub mod error;
pub mod functions;
pub mod mesh;
pub mod multigrid;
pub mod navier_stokes;
pub mod operators;
pub mod polynomial;
pub mod solver;
pub mod time;
pub mod vector;

pub use ale::{AnalyticMeshMotion, MeshMotion};
pub use boundary::{
    BoundaryDescriptor, BoundaryDescriptorP, BoundaryDescriptorU, BoundaryTypeP, BoundaryTypeU, OperatorType,
};
pub use error::{NsError, Result};
pub use functions::{
    CachedBoundaryData, ConstantScalar, ConstantVector, FieldFunctions, ScalarFunction, SharedCachedData,
    VectorFunction, ZeroFunction,
};
pub use mesh::{BoundaryId, Mesh2D, MeshHierarchy};
pub use multigrid::{
    CoarseGridSolver, MultigridData, MultigridOperatorType, MultigridPreconditionerMomentum,
    MultigridPreconditionerPoisson, MultigridType, SmootherType,
};
pub use navier_stokes::{
    DualSplittingOperator, EquationType, FormulationConvectiveTerm, NavierStokesCore, Parameters,
    PreconditionerPressurePoisson, PreconditionerViscous,
};
pub use operators::{MatrixFreeContext, MomentumOperator, MomentumOperatorData, ViscosityModel};
pub use solver::{ConjugateGradient, Gmres, SolverData, SolverResult};
pub use time::{BdfCoefficients, ExtrapolationCoefficients, StepReport, TimeIntDualSplitting};
pub use vector::DofVector;
