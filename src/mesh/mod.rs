//! Quadrilateral meshes and their refinement hierarchy.
//!
//! - [`Mesh2D`]: counter-clockwise quads with edge connectivity and boundary ids
//! - [`MeshHierarchy`]: coarse-to-fine sequence produced by uniform refinement,
//!   used by geometric multigrid and moved as a whole under ALE

mod hierarchy;
mod mesh2d;

pub use hierarchy::{CHILD_OFFSETS, MeshHierarchy};
pub use mesh2d::{BoundaryId, Edge, ElementFace, Mesh2D, bilinear_shape};
