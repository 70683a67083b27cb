//! Level smoothers: Jacobi-preconditioned Chebyshev iteration and damped
//! point Jacobi.

use tracing::debug;

use super::data::{SmootherData, SmootherType};
use super::level_operator::LevelOperator;
use crate::solver::{JacobiPreconditioner, Preconditioner};
use crate::vector::DofVector;

/// Safety factor on the power-iteration estimate of `λmax(D⁻¹A)`.
const LAMBDA_MAX_FACTOR: f64 = 1.2;

#[derive(Clone, Debug)]
pub struct Smoother {
    kind: SmootherType,
    data: SmootherData,
    jacobi: JacobiPreconditioner,
    lambda_max: f64,
}

impl Smoother {
    /// Build from the current state of `op`: diagonal and, for Chebyshev,
    /// the eigenvalue estimate.
    pub fn build<Op: LevelOperator + ?Sized>(op: &Op, kind: SmootherType, data: SmootherData) -> Self {
        let jacobi = JacobiPreconditioner::from_diagonal(&op.compute_diagonal());
        let lambda_max = match kind {
            SmootherType::Chebyshev => {
                LAMBDA_MAX_FACTOR * estimate_lambda_max(op, &jacobi, data.eig_cg_n_iterations)
            }
            SmootherType::Jacobi => 0.0,
        };
        debug!(?kind, lambda_max, "smoother rebuilt");
        Self {
            kind,
            data,
            jacobi,
            lambda_max,
        }
    }

    pub fn lambda_max(&self) -> f64 {
        self.lambda_max
    }

    /// Improve `x` towards the solution of `A x = b`.
    pub fn smooth<Op: LevelOperator + ?Sized>(&self, op: &Op, x: &mut DofVector, b: &DofVector) {
        match self.kind {
            SmootherType::Chebyshev => self.chebyshev(op, x, b),
            SmootherType::Jacobi => self.jacobi_sweeps(op, x, b),
        }
    }

    fn residual<Op: LevelOperator + ?Sized>(op: &Op, x: &DofVector, b: &DofVector, r: &mut DofVector) {
        op.vmult(r, x);
        r.sadd(-1.0, 1.0, b);
    }

    fn jacobi_sweeps<Op: LevelOperator + ?Sized>(&self, op: &Op, x: &mut DofVector, b: &DofVector) {
        let mut r = DofVector::zeros_like(b);
        let mut z = DofVector::zeros_like(b);
        for _ in 0..self.data.iterations {
            Self::residual(op, x, b, &mut r);
            self.jacobi.vmult(&mut z, &r);
            x.axpy(self.data.relaxation_factor, &z);
        }
    }

    fn chebyshev<Op: LevelOperator + ?Sized>(&self, op: &Op, x: &mut DofVector, b: &DofVector) {
        if self.lambda_max <= 0.0 {
            return;
        }
        let lambda_min = self.lambda_max / self.data.smoothing_range;
        let theta = 0.5 * (self.lambda_max + lambda_min);
        let delta = 0.5 * (self.lambda_max - lambda_min);
        let sigma = theta / delta;
        let mut rho = 1.0 / sigma;

        let mut r = DofVector::zeros_like(b);
        let mut z = DofVector::zeros_like(b);
        Self::residual(op, x, b, &mut r);
        self.jacobi.vmult(&mut z, &r);
        let mut d = z.clone();
        d.scale(1.0 / theta);
        x.axpy(1.0, &d);

        for _ in 1..self.data.iterations {
            let rho_new = 1.0 / (2.0 * sigma - rho);
            Self::residual(op, x, b, &mut r);
            self.jacobi.vmult(&mut z, &r);
            d.sadd(rho_new * rho, 2.0 * rho_new / delta, &z);
            x.axpy(1.0, &d);
            rho = rho_new;
        }
    }
}

/// Power iteration on `D⁻¹A`.
fn estimate_lambda_max<Op: LevelOperator + ?Sized>(
    op: &Op,
    jacobi: &JacobiPreconditioner,
    iterations: usize,
) -> f64 {
    let mut v = op.create_vector();
    let n = v.len();
    for (i, x) in v.as_mut_slice().iter_mut().enumerate() {
        // deterministic start with components in every direction
        *x = 1.0 + ((i * 7919) % n.max(1)) as f64 / n.max(1) as f64;
    }
    if op.is_singular() {
        v.set_zero_mean_value();
    }
    let norm = v.norm_l2();
    if norm == 0.0 {
        return 0.0;
    }
    v.scale(1.0 / norm);

    let mut av = op.create_vector();
    let mut w = op.create_vector();
    let mut lambda = 0.0;
    for _ in 0..iterations.max(1) {
        op.vmult(&mut av, &v);
        jacobi.vmult(&mut w, &av);
        if op.is_singular() {
            w.set_zero_mean_value();
        }
        let norm = w.norm_l2();
        if norm == 0.0 {
            break;
        }
        lambda = norm;
        v.equ(&w);
        v.scale(1.0 / norm);
    }
    lambda
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::boundary::{BoundaryDescriptorP, BoundaryDescriptorU};
    use crate::functions::ZeroFunction;
    use crate::mesh::Mesh2D;
    use crate::operators::{
        LaplaceOperator, LaplaceOperatorData, MatrixFreeContext, MomentumOperator, MomentumOperatorData,
    };
    use crate::solver::LinearOperator;

    fn laplace() -> LaplaceOperator {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 4, 4, [1, 2, 3, 4]);
        let mf = Arc::new(MatrixFreeContext::new(&mesh, 2));
        let descriptor = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        LaplaceOperator::new(mf, &descriptor, LaplaceOperatorData::default()).unwrap()
    }

    fn oscillating(op: &impl LinearOperator) -> DofVector {
        let mut x = op.create_vector();
        for (i, v) in x.as_mut_slice().iter_mut().enumerate() {
            *v = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        x
    }

    #[test]
    fn test_chebyshev_damps_oscillatory_error() {
        let op = laplace();
        let smoother = Smoother::build(&op, SmootherType::Chebyshev, SmootherData::default());
        // zero right-hand side: x is the error itself
        let mut x = oscillating(&op);
        let b = LinearOperator::create_vector(&op);
        let before = x.norm_l2();
        smoother.smooth(&op, &mut x, &b);
        assert!(x.norm_l2() < before, "{} vs {before}", x.norm_l2());
    }

    #[test]
    fn test_jacobi_on_mass_dominated_operator() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 3, [1, 2, 3, 4]);
        let mf = Arc::new(MatrixFreeContext::new(&mesh, 2));
        let descriptor = (1..=4).fold(BoundaryDescriptorU::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        let mut op = MomentumOperator::new(mf, &descriptor, MomentumOperatorData::default()).unwrap();
        op.set_scaling_factor_mass_matrix(1.0e6);
        let smoother = Smoother::build(&op, SmootherType::Jacobi, SmootherData::default());
        let mut x = oscillating(&op);
        let b = LinearOperator::create_vector(&op);
        let before = x.norm_l2();
        smoother.smooth(&op, &mut x, &b);
        // each sweep removes roughly the relaxation factor of the error
        assert!(x.norm_l2() < 0.1 * before);
    }

    #[test]
    fn test_eigenvalue_estimate_positive() {
        let op = laplace();
        let smoother = Smoother::build(&op, SmootherType::Chebyshev, SmootherData::default());
        assert!(smoother.lambda_max() > 1.0);
    }
}
