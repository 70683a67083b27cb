//! One-dimensional orthogonal polynomials and the Gauss-Lobatto-Legendre rule.
//!
//! Every element in the crate uses tensor products of the 1D GLL nodes, so
//! only the 1D building blocks live here.

mod legendre;
mod nodes;

pub use legendre::{legendre, legendre_and_derivative};
pub use nodes::{gauss_lobatto_nodes, gauss_lobatto_weights};
