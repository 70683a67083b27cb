use super::traits::Preconditioner;
use crate::operators::MassOperator;
use crate::vector::DofVector;

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        dst.equ(src);
    }

    fn name(&self) -> &'static str {
        "Identity"
    }
}

/// Point Jacobi: `z_i = r_i / A_ii`.
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inverse_diagonal: DofVector,
}

impl JacobiPreconditioner {
    /// Entries with `|A_ii| <= 1e-14` are left unscaled.
    pub fn from_diagonal(diagonal: &DofVector) -> Self {
        let mut inverse_diagonal = diagonal.clone();
        for d in inverse_diagonal.as_mut_slice() {
            *d = if d.abs() > 1e-14 { 1.0 / *d } else { 1.0 };
        }
        Self { inverse_diagonal }
    }

    pub fn inverse_diagonal(&self) -> &DofVector {
        &self.inverse_diagonal
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        dst.equ(src);
        dst.scale_by(&self.inverse_diagonal);
    }

    fn name(&self) -> &'static str {
        "Jacobi"
    }
}

/// Inverse mass matrix, a natural preconditioner of mass-dominated
/// momentum systems at small time steps.
#[derive(Debug, Clone)]
pub struct InverseMassPreconditioner {
    mass: MassOperator,
}

impl InverseMassPreconditioner {
    pub fn new(mass: MassOperator) -> Self {
        Self { mass }
    }
}

impl Preconditioner for InverseMassPreconditioner {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        self.mass.apply_inverse(dst, src);
    }

    fn name(&self) -> &'static str {
        "InverseMass"
    }
}
