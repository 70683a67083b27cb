//! Generic V-cycle over a coarse-to-fine sequence of discretization levels.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::coarse::CoarseSolver;
use super::data::{MgLevelInfo, MultigridData, build_levels};
use super::level_operator::LevelOperator;
use super::smoother::Smoother;
use super::transfer::LevelTransfer;
use crate::error::{NsError, Result};
use crate::mesh::MeshHierarchy;
use crate::operators::MatrixFreeContext;
use crate::solver::{Preconditioner, SolverResult};
use crate::vector::DofVector;

/// Mesh level, degree and the matrix-free context built for them.
#[derive(Clone, Debug)]
pub struct DiscretizationLevel {
    pub info: MgLevelInfo,
    pub matrix_free: Arc<MatrixFreeContext>,
}

impl DiscretizationLevel {
    pub fn new(hierarchy: &MeshHierarchy, info: MgLevelInfo) -> Self {
        Self {
            info,
            matrix_free: Arc::new(MatrixFreeContext::new(hierarchy.mesh(info.h_level), info.degree)),
        }
    }
}

fn transfer_between(hierarchy: &MeshHierarchy, coarse: MgLevelInfo, fine: MgLevelInfo) -> LevelTransfer {
    if coarse.h_level == fine.h_level {
        LevelTransfer::p_transfer(coarse.degree, fine.degree)
    } else {
        LevelTransfer::h_transfer(fine.degree, hierarchy.children(coarse.h_level))
    }
}

/// Multigrid preconditioner for any [`LevelOperator`].
///
/// Level 0 is the coarsest. `transfers[l]` connects level `l` with `l + 1`.
pub struct MultigridPreconditioner<Op: LevelOperator> {
    data: MultigridData,
    levels: Vec<DiscretizationLevel>,
    operators: Vec<Op>,
    transfers: Vec<LevelTransfer>,
    smoothers: Vec<Smoother>,
    coarse: CoarseSolver,
    last_coarse_result: Mutex<Option<SolverResult>>,
}

impl<Op: LevelOperator> MultigridPreconditioner<Op> {
    /// Build levels and transfers, then one operator per level with
    /// `make_operator`. Smoothers and the coarse solver are set up from the
    /// operators as returned.
    pub fn new<F>(hierarchy: &MeshHierarchy, fine_degree: usize, data: MultigridData, mut make_operator: F) -> Result<Self>
    where
        F: FnMut(&DiscretizationLevel) -> Result<Op>,
    {
        data.validate()?;
        let infos = build_levels(hierarchy.n_levels(), fine_degree, &data)?;
        let levels: Vec<DiscretizationLevel> = infos
            .iter()
            .map(|&info| DiscretizationLevel::new(hierarchy, info))
            .collect();
        let transfers = infos
            .windows(2)
            .map(|pair| transfer_between(hierarchy, pair[0], pair[1]))
            .collect();
        let operators = levels.iter().map(&mut make_operator).collect::<Result<Vec<Op>>>()?;

        let smoothers = Self::build_smoothers(&operators, &data);
        let coarse = CoarseSolver::build(&operators[0], data.coarse_solver, &data.coarse_solver_data);
        debug!(
            n_levels = levels.len(),
            multigrid_type = ?data.multigrid_type,
            "multigrid hierarchy ready"
        );
        Ok(Self {
            data,
            levels,
            operators,
            transfers,
            smoothers,
            coarse,
            last_coarse_result: Mutex::new(None),
        })
    }

    fn build_smoothers(operators: &[Op], data: &MultigridData) -> Vec<Smoother> {
        operators
            .iter()
            .map(|op| Smoother::build(op, data.smoother, data.smoother_data))
            .collect()
    }

    pub fn data(&self) -> &MultigridData {
        &self.data
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[DiscretizationLevel] {
        &self.levels
    }

    pub fn get_operator(&self, level: usize) -> Result<&Op> {
        self.operators.get(level).ok_or(NsError::MissingLevelOperator(level))
    }

    pub fn get_operator_mut(&mut self, level: usize) -> Result<&mut Op> {
        self.operators.get_mut(level).ok_or(NsError::MissingLevelOperator(level))
    }

    /// Transfer between `level` and `level + 1`.
    pub fn transfer(&self, level: usize) -> Result<&LevelTransfer> {
        self.transfers.get(level).ok_or(NsError::IndexOutOfRange {
            index: level,
            len: self.transfers.len(),
        })
    }

    /// Rebuild every level's geometry from the (moved) meshes and hand it
    /// to the level operators.
    pub fn update_matrix_free(&mut self, hierarchy: &MeshHierarchy) {
        for (level, op) in self.levels.iter_mut().zip(self.operators.iter_mut()) {
            let mut context = (*level.matrix_free).clone();
            context.update_mapping(hierarchy.mesh(level.info.h_level));
            level.matrix_free = Arc::new(context);
            op.update_after_mesh_movement(Arc::clone(&level.matrix_free));
        }
    }

    pub fn update_smoothers(&mut self) {
        self.smoothers = Self::build_smoothers(&self.operators, &self.data);
    }

    pub fn update_coarse_solver(&mut self) {
        self.coarse = CoarseSolver::build(&self.operators[0], self.data.coarse_solver, &self.data.coarse_solver_data);
    }

    /// Convergence record of the most recent iterative coarse solve.
    pub fn last_coarse_result(&self) -> Option<SolverResult> {
        *self.last_coarse_result.lock()
    }

    fn coarse_solve(&self, dst: &mut DofVector, src: &DofVector) {
        let result = self.coarse.solve(&self.operators[0], &self.smoothers[0], dst, src);
        if let Some(result) = result {
            if !result.is_converged() {
                warn!(
                    iterations = result.iterations,
                    residual = result.residual_norm,
                    "multigrid coarse solver did not converge"
                );
            }
        }
        *self.last_coarse_result.lock() = result;
    }

    fn v_cycle(&self, level: usize, x: &mut DofVector, b: &DofVector) {
        if level == 0 {
            self.coarse_solve(x, b);
            return;
        }
        let op = &self.operators[level];
        let smoother = &self.smoothers[level];

        x.fill(0.0);
        smoother.smooth(op, x, b);

        let mut residual = op.create_vector();
        op.vmult(&mut residual, x);
        residual.sadd(-1.0, 1.0, b);

        let coarse_op = &self.operators[level - 1];
        let mut coarse_rhs = coarse_op.create_vector();
        self.transfers[level - 1].restrict_add(&mut coarse_rhs, &residual);
        let mut coarse_x = coarse_op.create_vector();
        self.v_cycle(level - 1, &mut coarse_x, &coarse_rhs);
        self.transfers[level - 1].prolongate_add(x, &coarse_x);

        smoother.smooth(op, x, b);
    }
}

impl<Op: LevelOperator> Preconditioner for MultigridPreconditioner<Op> {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        self.v_cycle(self.levels.len() - 1, dst, src);
        if self.operators[self.levels.len() - 1].is_singular() {
            dst.set_zero_mean_value();
        }
    }

    fn name(&self) -> &'static str {
        "Multigrid"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::boundary::BoundaryDescriptorP;
    use crate::functions::ZeroFunction;
    use crate::mesh::Mesh2D;
    use crate::multigrid::data::{CoarseGridSolver, MultigridType};
    use crate::operators::{LaplaceOperator, LaplaceOperatorData};
    use crate::solver::{ConjugateGradient, LinearOperator, SolverData};

    fn hierarchy() -> MeshHierarchy {
        MeshHierarchy::new(Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]), 2)
    }

    fn poisson_mg(kind: MultigridType, degree: usize) -> MultigridPreconditioner<LaplaceOperator> {
        let descriptor = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        let data = MultigridData::new(kind).with_coarse_solver(CoarseGridSolver::DirectLU, SolverData::default());
        MultigridPreconditioner::new(&hierarchy(), degree, data, |level| {
            LaplaceOperator::new(Arc::clone(&level.matrix_free), &descriptor, LaplaceOperatorData::default())
        })
        .unwrap()
    }

    fn cg_iterations(mg: &MultigridPreconditioner<LaplaceOperator>) -> usize {
        let fine = mg.get_operator(mg.n_levels() - 1).unwrap();
        let mut b = LinearOperator::create_vector(fine);
        b.fill(1.0);
        let mut x = LinearOperator::create_vector(fine);
        let result = ConjugateGradient::new(SolverData::new(1e-8, 200)).solve(fine, &b, &mut x, mg);
        assert!(result.is_converged());
        result.iterations
    }

    #[test]
    fn test_level_counts() {
        assert_eq!(poisson_mg(MultigridType::HMG, 2).n_levels(), 3);
        assert_eq!(poisson_mg(MultigridType::PMG, 4).n_levels(), 3);
        assert_eq!(poisson_mg(MultigridType::HPMG, 2).n_levels(), 4);
    }

    #[test]
    fn test_mg_preconditioned_cg_converges_quickly() {
        for kind in [MultigridType::HMG, MultigridType::PMG, MultigridType::HPMG] {
            let iterations = cg_iterations(&poisson_mg(kind, 2));
            assert!(iterations < 40, "{kind:?}: {iterations}");
        }
    }

    #[test]
    fn test_missing_level_is_an_error() {
        let mg = poisson_mg(MultigridType::HMG, 1);
        assert_eq!(mg.get_operator(7).err(), Some(NsError::MissingLevelOperator(7)));
    }

    #[test]
    fn test_coarse_result_recorded_for_iterative_solver() {
        let descriptor = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        let mg = MultigridPreconditioner::new(&hierarchy(), 1, MultigridData::new(MultigridType::HMG), |level| {
            LaplaceOperator::new(Arc::clone(&level.matrix_free), &descriptor, LaplaceOperatorData::default())
        })
        .unwrap();
        assert!(mg.last_coarse_result().is_none());
        let fine = mg.get_operator(2).unwrap();
        let mut b = LinearOperator::create_vector(fine);
        b.fill(1.0);
        let mut x = LinearOperator::create_vector(fine);
        mg.vmult(&mut x, &b);
        assert!(mg.last_coarse_result().is_some());
        assert!(x.norm_l2() > 0.0);
    }
}
