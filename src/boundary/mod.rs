//! Boundary conditions of the incompressible flow problem.
//!
//! Each boundary id of the mesh is assigned exactly one kind per field:
//!
//! | Field    | Kinds |
//! |----------|-------|
//! | velocity | `Dirichlet`, `DirichletCached`, `Neumann`, `Symmetry` |
//! | pressure | `Dirichlet`, `Neumann` |
//!
//! Boundary conditions enter the DG operators weakly through an exterior
//! ("ghost") state built by the functions of [`weak_bc`].

mod descriptor;
pub mod weak_bc;

pub use descriptor::{
    BoundaryDescriptor, BoundaryDescriptorP, BoundaryDescriptorU, BoundaryTypeP, BoundaryTypeU,
    ResolvedBoundaryP, ResolvedBoundaryU,
};
pub use weak_bc::OperatorType;
