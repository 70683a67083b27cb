//! Preconditioned conjugate gradient method.

use tracing::{trace, warn};

use super::config::{SolverData, SolverResult, SolverStatus};
use super::traits::{LinearOperator, Preconditioner};
use crate::vector::DofVector;

#[derive(Debug, Clone, Copy)]
pub struct ConjugateGradient {
    config: SolverData,
    /// Project right-hand side and residuals onto zero-mean vectors; used
    /// for operators whose kernel is the constants.
    zero_mean: bool,
}

impl ConjugateGradient {
    pub fn new(config: SolverData) -> Self {
        Self {
            config,
            zero_mean: false,
        }
    }

    pub fn with_zero_mean(mut self, zero_mean: bool) -> Self {
        self.zero_mean = zero_mean;
        self
    }

    pub fn config(&self) -> &SolverData {
        &self.config
    }

    /// Solve `A x = b` starting from the initial guess in `x`.
    pub fn solve<A, P>(&self, op: &A, b: &DofVector, x: &mut DofVector, precond: &P) -> SolverResult
    where
        A: LinearOperator + ?Sized,
        P: Preconditioner + ?Sized,
    {
        let mut r = DofVector::zeros_like(b);
        op.vmult(&mut r, x);
        r.sadd(-1.0, 1.0, b);
        if self.zero_mean {
            r.set_zero_mean_value();
        }

        let initial = r.norm_l2();
        let mut result = SolverResult {
            status: SolverStatus::Converged,
            iterations: 0,
            residual_norm: initial,
            initial_residual_norm: initial,
        };
        if initial < self.config.atol {
            return result;
        }

        let mut z = DofVector::zeros_like(b);
        precond.vmult(&mut z, &r);
        if self.zero_mean {
            z.set_zero_mean_value();
        }
        let mut p = z.clone();
        let mut ap = DofVector::zeros_like(b);
        let mut rz = r.dot(&z);

        for iter in 0..self.config.max_iter {
            op.vmult(&mut ap, &p);
            let pap = p.dot(&ap);
            if pap.abs() < 1e-300 {
                result.status = SolverStatus::Breakdown;
                result.iterations = iter;
                warn!(iter, residual = result.residual_norm, "CG breakdown");
                return result;
            }
            let alpha = rz / pap;
            x.axpy(alpha, &p);
            r.axpy(-alpha, &ap);
            if self.zero_mean {
                r.set_zero_mean_value();
            }

            let res = r.norm_l2();
            result.residual_norm = res;
            result.iterations = iter + 1;
            if self.config.verbose {
                trace!(iter = iter + 1, residual = res, "CG");
            }
            if self.config.converged(res, initial) {
                return result;
            }

            precond.vmult(&mut z, &r);
            if self.zero_mean {
                z.set_zero_mean_value();
            }
            let rz_new = r.dot(&z);
            let beta = rz_new / rz;
            rz = rz_new;
            p.sadd(beta, 1.0, &z);
        }

        result.status = SolverStatus::MaxIterationsReached;
        warn!(
            iterations = result.iterations,
            residual = result.residual_norm,
            "CG reached the iteration limit"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::{IdentityPreconditioner, JacobiPreconditioner};

    /// Diagonal test operator on a single-element vector.
    struct Diagonal(Vec<f64>);

    impl LinearOperator for Diagonal {
        fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
            for (i, d) in self.0.iter().enumerate() {
                dst.as_mut_slice()[i] = d * src.as_slice()[i];
            }
        }

        fn create_vector(&self) -> DofVector {
            DofVector::new(1, 1, self.0.len())
        }
    }

    /// 1D Neumann Laplacian (singular, kernel = constants).
    struct NeumannChain(usize);

    impl LinearOperator for NeumannChain {
        fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
            let u = src.as_slice();
            let n = self.0;
            let out = dst.as_mut_slice();
            for i in 0..n {
                let left = if i > 0 { u[i] - u[i - 1] } else { 0.0 };
                let right = if i + 1 < n { u[i] - u[i + 1] } else { 0.0 };
                out[i] = left + right;
            }
        }

        fn create_vector(&self) -> DofVector {
            DofVector::new(1, 1, self.0)
        }
    }

    #[test]
    fn test_diagonal_system() {
        let op = Diagonal(vec![1.0, 2.0, 4.0, 8.0]);
        let mut b = op.create_vector();
        b.as_mut_slice().copy_from_slice(&[1.0, 1.0, 1.0, 1.0]);
        let mut x = op.create_vector();
        let cg = ConjugateGradient::new(SolverData::new(1e-12, 10));
        let result = cg.solve(&op, &b, &mut x, &IdentityPreconditioner);
        assert!(result.is_converged());
        assert!((x.as_slice()[3] - 0.125).abs() < 1e-12);

        // Jacobi is exact for a diagonal operator
        let mut diag = op.create_vector();
        diag.as_mut_slice().copy_from_slice(&op.0);
        let mut y = op.create_vector();
        let result = cg.solve(&op, &b, &mut y, &JacobiPreconditioner::from_diagonal(&diag));
        assert_eq!(result.iterations, 1);
    }

    #[test]
    fn test_singular_system_with_zero_mean() {
        let op = NeumannChain(16);
        let mut b = op.create_vector();
        for (i, v) in b.as_mut_slice().iter_mut().enumerate() {
            *v = (i as f64 - 7.5) * 0.1 + 0.3; // nonzero mean, projected away
        }
        let mut x = op.create_vector();
        let cg = ConjugateGradient::new(SolverData::new(1e-10, 200)).with_zero_mean(true);
        let result = cg.solve(&op, &b, &mut x, &IdentityPreconditioner);
        assert!(result.is_converged(), "{result:?}");
        let mut bp = b.clone();
        bp.set_zero_mean_value();
        let mut ax = op.create_vector();
        op.vmult(&mut ax, &x);
        ax.axpy(-1.0, &bp);
        assert!(ax.norm_l2() < 1e-8);
    }

    #[test]
    fn test_iteration_limit() {
        let op = NeumannChain(64);
        let mut b = op.create_vector();
        b.as_mut_slice()[0] = 1.0;
        b.as_mut_slice()[63] = -1.0;
        let mut x = op.create_vector();
        let cg = ConjugateGradient::new(SolverData::new(1e-14, 3));
        let result = cg.solve(&op, &b, &mut x, &IdentityPreconditioner);
        assert_eq!(result.status, SolverStatus::MaxIterationsReached);
        assert_eq!(result.iterations, 3);
    }
}
