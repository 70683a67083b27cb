//! Nodal Lagrange bases on the reference interval.

mod lagrange;

pub use lagrange::{
    LagrangeBasis1D, barycentric_weights, differentiation_matrix, interpolation_matrix,
};
