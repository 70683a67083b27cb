//! Multigrid preconditioner for the momentum operator of the viscous step.
//!
//! Every call to [`MultigridPreconditionerMomentum::update`] follows the
//! same order:
//!
//! 1. moving mesh: rebuild the geometry of every level,
//! 2. unsteady problem: copy the evaluation state of the fine operator to
//!    all levels and check that none of them drifted,
//! 3. convection-diffusion levels: copy the linearization velocity and
//!    interpolate it level by level towards the coarse grid,
//! 4. rebuild smoothers and the coarse solver.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::data::MultigridData;
use super::preconditioner::MultigridPreconditioner;
use crate::boundary::BoundaryDescriptorU;
use crate::error::{NsError, Result};
use crate::mesh::MeshHierarchy;
use crate::operators::{MomentumOperator, MomentumOperatorData};
use crate::solver::Preconditioner;
use crate::vector::DofVector;

/// Which terms of the momentum operator the levels carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultigridOperatorType {
    Undefined,
    /// Mass and viscous terms only
    ReactionDiffusion,
    /// Mass, viscous and linearized convective terms
    ReactionConvectionDiffusion,
}

pub struct MultigridPreconditionerMomentum {
    hierarchy: Arc<RwLock<MeshHierarchy>>,
    mg: MultigridPreconditioner<MomentumOperator>,
    operator_type: MultigridOperatorType,
    mesh_is_moving: bool,
}

impl MultigridPreconditionerMomentum {
    pub fn initialize(
        hierarchy: Arc<RwLock<MeshHierarchy>>,
        degree: usize,
        descriptor: &BoundaryDescriptorU,
        operator_data: &MomentumOperatorData,
        data: MultigridData,
        operator_type: MultigridOperatorType,
        mesh_is_moving: bool,
    ) -> Result<Self> {
        let mut level_data = operator_data.clone();
        match operator_type {
            MultigridOperatorType::Undefined => return Err(NsError::UndefinedMultigridOperator),
            MultigridOperatorType::ReactionConvectionDiffusion if !operator_data.convective_problem => {
                return Err(NsError::ConvectiveTermMismatch);
            }
            MultigridOperatorType::ReactionDiffusion => level_data.convective_problem = false,
            MultigridOperatorType::ReactionConvectionDiffusion => {}
        }

        let mg = {
            let mesh_hierarchy = hierarchy.read();
            MultigridPreconditioner::new(&mesh_hierarchy, degree, data, |level| {
                MomentumOperator::new(Arc::clone(&level.matrix_free), descriptor, level_data.clone())
            })?
        };
        debug!(?operator_type, mesh_is_moving, "momentum multigrid initialized");
        Ok(Self {
            hierarchy,
            mg,
            operator_type,
            mesh_is_moving,
        })
    }

    pub fn operator_type(&self) -> MultigridOperatorType {
        self.operator_type
    }

    pub fn multigrid(&self) -> &MultigridPreconditioner<MomentumOperator> {
        &self.mg
    }

    pub fn get_operator(&self, level: usize) -> Result<&MomentumOperator> {
        self.mg.get_operator(level)
    }

    /// Recompute geometry on all levels from the current hierarchy.
    pub fn update_matrix_free(&mut self) {
        let hierarchy = self.hierarchy.read();
        self.mg.update_matrix_free(&hierarchy);
    }

    /// Bring all levels in line with the fine-level operator of the PDE.
    pub fn update(&mut self, pde_operator: &MomentumOperator) -> Result<()> {
        if self.mesh_is_moving {
            self.update_matrix_free();
        }

        let n_levels = self.mg.n_levels();
        if pde_operator.data().unsteady_problem {
            let state = pde_operator.state();
            for level in 0..n_levels {
                self.mg.get_operator_mut(level)?.set_state(state);
            }
            for level in 0..n_levels {
                if !self.mg.get_operator(level)?.state().same_parameters(&state) {
                    return Err(NsError::EvaluationStateDrift { level });
                }
            }
        }

        if self.operator_type == MultigridOperatorType::ReactionConvectionDiffusion {
            self.update_linearization(pde_operator.get_velocity())?;
        }

        self.mg.update_smoothers();
        self.mg.update_coarse_solver();
        Ok(())
    }

    fn update_linearization(&mut self, velocity: &DofVector) -> Result<()> {
        let fine = self.mg.n_levels() - 1;
        self.mg.get_operator_mut(fine)?.set_velocity_copy(velocity)?;
        for level in (0..fine).rev() {
            let mut coarse = self.mg.get_operator(level)?.create_vector();
            self.mg
                .transfer(level)?
                .interpolate(&mut coarse, self.mg.get_operator(level + 1)?.get_velocity());
            self.mg.get_operator_mut(level)?.set_velocity_copy(&coarse)?;
        }
        Ok(())
    }
}

impl Preconditioner for MultigridPreconditionerMomentum {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        self.mg.vmult(dst, src);
    }

    fn name(&self) -> &'static str {
        "MultigridMomentum"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::ZeroFunction;
    use crate::mesh::Mesh2D;
    use crate::multigrid::data::MultigridType;

    fn setup() -> (Arc<RwLock<MeshHierarchy>>, BoundaryDescriptorU) {
        let coarse = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        let hierarchy = Arc::new(RwLock::new(MeshHierarchy::new(coarse, 1)));
        let descriptor = (1..=4).fold(BoundaryDescriptorU::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        (hierarchy, descriptor)
    }

    #[test]
    fn test_undefined_operator_type_rejected() {
        let (hierarchy, descriptor) = setup();
        let result = MultigridPreconditionerMomentum::initialize(
            hierarchy,
            2,
            &descriptor,
            &MomentumOperatorData::default(),
            MultigridData::new(MultigridType::HMG),
            MultigridOperatorType::Undefined,
            false,
        );
        assert_eq!(result.err(), Some(NsError::UndefinedMultigridOperator));
    }

    #[test]
    fn test_convection_levels_need_convective_problem() {
        let (hierarchy, descriptor) = setup();
        let result = MultigridPreconditionerMomentum::initialize(
            hierarchy,
            2,
            &descriptor,
            &MomentumOperatorData::default(),
            MultigridData::new(MultigridType::HMG),
            MultigridOperatorType::ReactionConvectionDiffusion,
            false,
        );
        assert_eq!(result.err(), Some(NsError::ConvectiveTermMismatch));
    }

    #[test]
    fn test_update_propagates_state_to_all_levels() {
        let (hierarchy, descriptor) = setup();
        let data = MomentumOperatorData::default();
        let mut mg = MultigridPreconditionerMomentum::initialize(
            Arc::clone(&hierarchy),
            2,
            &descriptor,
            &data,
            MultigridData::new(MultigridType::HPMG),
            MultigridOperatorType::ReactionDiffusion,
            false,
        )
        .unwrap();

        let mf = Arc::new(crate::operators::MatrixFreeContext::new(hierarchy.read().finest(), 2));
        let mut pde = MomentumOperator::new(mf, &descriptor, data).unwrap();
        pde.set_time(0.75);
        pde.set_scaling_factor_mass_matrix(30.0);
        mg.update(&pde).unwrap();
        for level in 0..mg.multigrid().n_levels() {
            let state = mg.get_operator(level).unwrap().state();
            assert_eq!(state, pde.state());
        }
    }
}
