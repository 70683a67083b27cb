//! Krylov solvers on [`DofVector`](crate::vector::DofVector)s.
//!
//! - [`ConjugateGradient`]: preconditioned CG for symmetric operators, with
//!   an optional zero-mean projection for singular Poisson problems
//! - [`Gmres`]: restarted, right-preconditioned GMRES
//!
//! Operators implement [`LinearOperator`], preconditioners
//! [`Preconditioner`].

mod cg;
mod config;
mod gmres;
mod preconditioner;
mod traits;

pub use cg::ConjugateGradient;
pub use config::{SolverData, SolverResult, SolverStatus};
pub use gmres::Gmres;
pub use preconditioner::{IdentityPreconditioner, InverseMassPreconditioner, JacobiPreconditioner};
pub use traits::{LinearOperator, Preconditioner};
