//! Multigrid preconditioner for the pressure Poisson equation.

use std::sync::Arc;

use parking_lot::RwLock;

use super::data::MultigridData;
use super::preconditioner::MultigridPreconditioner;
use crate::boundary::BoundaryDescriptorP;
use crate::error::Result;
use crate::mesh::MeshHierarchy;
use crate::operators::{LaplaceOperator, LaplaceOperatorData};
use crate::solver::Preconditioner;
use crate::vector::DofVector;

pub struct MultigridPreconditionerPoisson {
    hierarchy: Arc<RwLock<MeshHierarchy>>,
    mg: MultigridPreconditioner<LaplaceOperator>,
}

impl MultigridPreconditionerPoisson {
    pub fn initialize(
        hierarchy: Arc<RwLock<MeshHierarchy>>,
        degree: usize,
        descriptor: &BoundaryDescriptorP,
        operator_data: LaplaceOperatorData,
        data: MultigridData,
    ) -> Result<Self> {
        let mg = {
            let mesh_hierarchy = hierarchy.read();
            MultigridPreconditioner::new(&mesh_hierarchy, degree, data, |level| {
                LaplaceOperator::new(Arc::clone(&level.matrix_free), descriptor, operator_data)
            })?
        };
        Ok(Self { hierarchy, mg })
    }

    pub fn multigrid(&self) -> &MultigridPreconditioner<LaplaceOperator> {
        &self.mg
    }

    /// The Laplace operator only depends on geometry, so this is all an
    /// update after grid motion needs.
    pub fn update(&mut self) {
        {
            let hierarchy = self.hierarchy.read();
            self.mg.update_matrix_free(&hierarchy);
        }
        self.mg.update_smoothers();
        self.mg.update_coarse_solver();
    }
}

impl Preconditioner for MultigridPreconditionerPoisson {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        self.mg.vmult(dst, src);
    }

    fn name(&self) -> &'static str {
        "MultigridPoisson"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh2D;
    use crate::multigrid::data::MultigridType;
    use crate::solver::{ConjugateGradient, LinearOperator, SolverData};

    #[test]
    fn test_pure_neumann_solve_has_zero_mean() {
        let coarse = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        let hierarchy = Arc::new(RwLock::new(MeshHierarchy::new(coarse, 1)));
        let descriptor = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| d.with_neumann(id));
        let mg = MultigridPreconditionerPoisson::initialize(
            hierarchy,
            2,
            &descriptor,
            LaplaceOperatorData::default(),
            MultigridData::new(MultigridType::HMG),
        )
        .unwrap();

        let fine = mg.multigrid().get_operator(1).unwrap();
        assert!(fine.is_singular());
        let mut b = LinearOperator::create_vector(fine);
        for (i, v) in b.as_mut_slice().iter_mut().enumerate() {
            *v = (i as f64 * 0.37).sin();
        }
        b.set_zero_mean_value();
        let mut x = LinearOperator::create_vector(fine);
        let result = ConjugateGradient::new(SolverData::new(1e-8, 300))
            .with_zero_mean(true)
            .solve(fine, &b, &mut x, &mg);
        assert!(result.is_converged(), "{result:?}");
        assert!(x.mean_value().abs() < 1e-10);
    }
}
