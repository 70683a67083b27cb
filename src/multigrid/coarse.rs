//! Solvers for the coarsest multigrid level.

use faer::linalg::solvers::Solve;
use faer::{Mat, Side};
use tracing::{debug, warn};

use super::data::CoarseGridSolver;
use super::level_operator::LevelOperator;
use super::smoother::Smoother;
use crate::solver::{ConjugateGradient, Gmres, JacobiPreconditioner, SolverData, SolverResult};
use crate::vector::DofVector;

const GMRES_RESTART: usize = 30;

#[derive(Clone, Debug)]
enum CoarseKind {
    Cg {
        solver: ConjugateGradient,
        jacobi: JacobiPreconditioner,
    },
    Gmres {
        solver: Gmres,
        jacobi: JacobiPreconditioner,
    },
    /// Explicit inverse of the assembled matrix, column by column from a
    /// Cholesky factorization (symmetric levels) or a partial-pivot LU.
    Direct { inverse: Mat<f64> },
    Smoother,
}

#[derive(Clone, Debug)]
pub struct CoarseSolver {
    kind: CoarseKind,
    singular: bool,
}

impl CoarseSolver {
    pub fn build<Op: LevelOperator + ?Sized>(op: &Op, solver: CoarseGridSolver, data: &SolverData) -> Self {
        let singular = op.is_singular();
        let kind = match solver {
            CoarseGridSolver::CG => CoarseKind::Cg {
                solver: ConjugateGradient::new(*data).with_zero_mean(singular),
                jacobi: JacobiPreconditioner::from_diagonal(&op.compute_diagonal()),
            },
            CoarseGridSolver::GMRES => CoarseKind::Gmres {
                solver: Gmres::new(*data, GMRES_RESTART),
                jacobi: JacobiPreconditioner::from_diagonal(&op.compute_diagonal()),
            },
            CoarseGridSolver::DirectLU => CoarseKind::Direct {
                inverse: dense_inverse(op, singular),
            },
            CoarseGridSolver::Smoother => CoarseKind::Smoother,
        };
        Self { kind, singular }
    }

    /// `dst ≈ A⁻¹ src`. Iterative variants report their convergence.
    pub fn solve<Op: LevelOperator + ?Sized>(
        &self,
        op: &Op,
        smoother: &Smoother,
        dst: &mut DofVector,
        src: &DofVector,
    ) -> Option<SolverResult> {
        let mut rhs = src.clone();
        if self.singular {
            rhs.set_zero_mean_value();
        }
        dst.fill(0.0);
        match &self.kind {
            CoarseKind::Cg { solver, jacobi } => Some(solver.solve(op, &rhs, dst, jacobi)),
            CoarseKind::Gmres { solver, jacobi } => Some(solver.solve(op, &rhs, dst, jacobi)),
            CoarseKind::Direct { inverse } => {
                let x = rhs.as_slice();
                for (i, out) in dst.as_mut_slice().iter_mut().enumerate() {
                    *out = (0..x.len()).map(|j| inverse[(i, j)] * x[j]).sum();
                }
                None
            }
            CoarseKind::Smoother => {
                smoother.smooth(op, dst, &rhs);
                if self.singular {
                    dst.set_zero_mean_value();
                }
                None
            }
        }
    }
}

/// Inverse of the assembled operator. A singular matrix with constants in
/// its kernel is regularized as `A + c 11ᵀ`, which leaves the solution of
/// zero-mean right-hand sides unchanged and selects the zero-mean one.
fn dense_inverse<Op: LevelOperator + ?Sized>(op: &Op, singular: bool) -> Mat<f64> {
    let mut a = op.assemble_dense();
    let n = a.nrows();
    if singular && n > 0 {
        let c = (0..n).map(|i| a[(i, i)]).sum::<f64>() / (n * n) as f64;
        for i in 0..n {
            for j in 0..n {
                a[(i, j)] += c;
            }
        }
    }
    let inverse = if op.is_symmetric() {
        match a.as_ref().llt(Side::Lower) {
            Ok(llt) => invert_columns(&llt, n),
            Err(_) => {
                warn!(n, "coarse matrix not positive definite, falling back to LU");
                invert_columns(&a.as_ref().partial_piv_lu(), n)
            }
        }
    } else {
        invert_columns(&a.as_ref().partial_piv_lu(), n)
    };
    debug!(n, singular, "coarse matrix factorized");
    inverse
}

/// Solve `A X = I` column by column.
fn invert_columns<S: Solve<f64>>(factorization: &S, n: usize) -> Mat<f64> {
    let mut inverse = Mat::<f64>::zeros(n, n);
    let mut rhs = Mat::<f64>::zeros(n, 1);
    for j in 0..n {
        rhs[(j, 0)] = 1.0;
        let col = factorization.solve(&rhs);
        for i in 0..n {
            inverse[(i, j)] = col[(i, 0)];
        }
        rhs[(j, 0)] = 0.0;
    }
    inverse
}
