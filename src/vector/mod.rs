//! Element-major nodal DG vectors and their BLAS-1 kernels.

mod dof_vector;
pub mod simd_kernels;

pub use dof_vector::DofVector;
