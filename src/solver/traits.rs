use crate::operators::{LaplaceOperator, MomentumOperator};
use crate::vector::DofVector;

/// Matrix-free linear operator.
pub trait LinearOperator: Send + Sync {
    /// `dst = A src`
    fn vmult(&self, dst: &mut DofVector, src: &DofVector);

    /// Zero vector in the domain of the operator.
    fn create_vector(&self) -> DofVector;
}

/// Approximate inverse of an operator.
pub trait Preconditioner: Send + Sync {
    /// `dst = P⁻¹ src`
    fn vmult(&self, dst: &mut DofVector, src: &DofVector);

    fn name(&self) -> &'static str;
}

impl LinearOperator for LaplaceOperator {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        LaplaceOperator::vmult(self, dst, src);
    }

    fn create_vector(&self) -> DofVector {
        LaplaceOperator::create_vector(self)
    }
}

impl LinearOperator for MomentumOperator {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        MomentumOperator::vmult(self, dst, src);
    }

    fn create_vector(&self) -> DofVector {
        MomentumOperator::create_vector(self)
    }
}
