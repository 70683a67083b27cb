//! Geometric h-, p- and hp-multigrid for DG operators.
//!
//! Levels run from the coarsest (index 0) to the operator being
//! preconditioned. Each step either refines the mesh once or raises the
//! polynomial degree, see [`build_levels`].

mod coarse;
mod data;
mod level_operator;
mod momentum;
mod poisson;
mod preconditioner;
mod smoother;
mod transfer;

pub use coarse::CoarseSolver;
pub use data::{
    CoarseGridSolver, MgLevelInfo, MultigridData, MultigridType, PSequence, SmootherData, SmootherType,
    build_levels, p_levels,
};
pub use level_operator::LevelOperator;
pub use momentum::{MultigridOperatorType, MultigridPreconditionerMomentum};
pub use poisson::MultigridPreconditionerPoisson;
pub use preconditioner::{DiscretizationLevel, MultigridPreconditioner};
pub use smoother::Smoother;
pub use transfer::LevelTransfer;
