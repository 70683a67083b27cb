//! Restarted GMRES with right preconditioning.
//!
//! The Arnoldi basis is orthogonalized with modified Gram-Schmidt and the
//! least-squares problem is updated with Givens rotations, so the residual
//! norm is known at every iteration without forming the solution.

use tracing::{trace, warn};

use super::config::{SolverData, SolverResult, SolverStatus};
use super::traits::{LinearOperator, Preconditioner};
use crate::vector::DofVector;

#[derive(Debug, Clone, Copy)]
pub struct Gmres {
    config: SolverData,
    restart: usize,
}

impl Gmres {
    pub fn new(config: SolverData, restart: usize) -> Self {
        Self {
            config,
            restart: restart.max(1),
        }
    }

    pub fn config(&self) -> &SolverData {
        &self.config
    }

    pub fn solve<A, P>(&self, op: &A, b: &DofVector, x: &mut DofVector, precond: &P) -> SolverResult
    where
        A: LinearOperator + ?Sized,
        P: Preconditioner + ?Sized,
    {
        let m = self.restart;
        let mut r = DofVector::zeros_like(b);
        op.vmult(&mut r, x);
        r.sadd(-1.0, 1.0, b);
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

        let mut w = DofVector::zeros_like(b);
        let mut z = DofVector::zeros_like(b);
        let mut iterations = 0;

        while iterations < self.config.max_iter {
            let beta = r.norm_l2();
            if self.config.converged(beta, initial) {
                result.residual_norm = beta;
                result.iterations = iterations;
                return result;
            }

            let mut basis: Vec<DofVector> = Vec::with_capacity(m + 1);
            let mut v0 = r.clone();
            v0.scale(1.0 / beta);
            basis.push(v0);

            // column-major Hessenberg, h[j] holds column j (length j + 2)
            let mut h: Vec<Vec<f64>> = Vec::with_capacity(m);
            let mut cs: Vec<f64> = Vec::with_capacity(m);
            let mut sn: Vec<f64> = Vec::with_capacity(m);
            let mut g = vec![0.0; m + 1];
            g[0] = beta;

            let mut k = 0;
            while k < m && iterations < self.config.max_iter {
                precond.vmult(&mut z, &basis[k]);
                op.vmult(&mut w, &z);

                let mut col = vec![0.0; k + 2];
                for (i, v) in basis.iter().enumerate() {
                    col[i] = w.dot(v);
                    w.axpy(-col[i], v);
                }
                col[k + 1] = w.norm_l2();

                for i in 0..k {
                    let t = cs[i] * col[i] + sn[i] * col[i + 1];
                    col[i + 1] = -sn[i] * col[i] + cs[i] * col[i + 1];
                    col[i] = t;
                }
                let denom = col[k].hypot(col[k + 1]);
                let (c, s) = if denom > 0.0 {
                    (col[k] / denom, col[k + 1] / denom)
                } else {
                    (1.0, 0.0)
                };
                let h_next = col[k + 1];
                col[k] = c * col[k] + s * col[k + 1];
                col[k + 1] = 0.0;
                g[k + 1] = -s * g[k];
                g[k] *= c;
                cs.push(c);
                sn.push(s);
                h.push(col);

                iterations += 1;
                k += 1;
                let res = g[k].abs();
                result.residual_norm = res;
                if self.config.verbose {
                    trace!(iter = iterations, residual = res, "GMRES");
                }
                if self.config.converged(res, initial) || h_next <= 1e-300 {
                    break;
                }
                let mut v = w.clone();
                v.scale(1.0 / h_next);
                basis.push(v);
            }

            // back substitution H y = g on the first k rows
            let mut y = vec![0.0; k];
            for i in (0..k).rev() {
                let mut sum = g[i];
                for (j, yj) in y.iter().enumerate().skip(i + 1) {
                    sum -= h[j][i] * yj;
                }
                if h[i][i].abs() < 1e-300 {
                    result.status = SolverStatus::Breakdown;
                    result.iterations = iterations;
                    warn!(iterations, "GMRES breakdown");
                    return result;
                }
                y[i] = sum / h[i][i];
            }
            let mut update = DofVector::zeros_like(b);
            for (v, yi) in basis.iter().zip(&y) {
                update.axpy(*yi, v);
            }
            precond.vmult(&mut z, &update);
            x.axpy(1.0, &z);

            op.vmult(&mut r, x);
            r.sadd(-1.0, 1.0, b);
            result.residual_norm = r.norm_l2();
            result.iterations = iterations;
            if self.config.converged(result.residual_norm, initial) {
                return result;
            }
        }

        result.status = SolverStatus::MaxIterationsReached;
        warn!(
            iterations = result.iterations,
            residual = result.residual_norm,
            "GMRES reached the iteration limit"
        );
        result
    }
}
