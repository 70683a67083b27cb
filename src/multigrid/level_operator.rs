use std::sync::Arc;

use faer::Mat;

use crate::operators::{LaplaceOperator, MatrixFreeContext, MomentumOperator};
use crate::solver::LinearOperator;
use crate::vector::DofVector;

/// Operator on one multigrid level.
pub trait LevelOperator: LinearOperator {
    fn matrix_free(&self) -> &MatrixFreeContext;

    fn n_components(&self) -> usize;

    /// Swap in the geometry of the moved mesh.
    fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>);

    /// Constants are in the kernel (pure Neumann Poisson problem).
    fn is_singular(&self) -> bool {
        false
    }

    fn is_symmetric(&self) -> bool {
        true
    }

    /// Diagonal by probing: DG operators only couple face neighbours, so
    /// one unit dof per cell of a colour class can be probed at once.
    fn compute_diagonal(&self) -> DofVector {
        let mf = self.matrix_free();
        let mut diagonal = self.create_vector();
        let mut probe = self.create_vector();
        let mut result = self.create_vector();
        for color in 0..mf.n_colors() {
            let cells: Vec<usize> = (0..mf.n_elements())
                .filter(|&k| mf.cell_color(k) == color)
                .collect();
            for c in 0..self.n_components() {
                for node in 0..mf.n_nodes() {
                    probe.fill(0.0);
                    for &k in &cells {
                        probe.set(k, c, node, 1.0);
                    }
                    self.vmult(&mut result, &probe);
                    for &k in &cells {
                        diagonal.set(k, c, node, result.get(k, c, node));
                    }
                }
            }
        }
        diagonal
    }

    /// Dense matrix, column by column. Only meant for coarse levels.
    fn assemble_dense(&self) -> Mat<f64> {
        let mut unit = self.create_vector();
        let mut column = self.create_vector();
        let n = unit.len();
        let mut matrix = Mat::<f64>::zeros(n, n);
        for j in 0..n {
            unit.as_mut_slice()[j] = 1.0;
            self.vmult(&mut column, &unit);
            unit.as_mut_slice()[j] = 0.0;
            for (i, v) in column.as_slice().iter().enumerate() {
                matrix[(i, j)] = *v;
            }
        }
        matrix
    }
}

impl LevelOperator for MomentumOperator {
    fn matrix_free(&self) -> &MatrixFreeContext {
        MomentumOperator::matrix_free(self)
    }

    fn n_components(&self) -> usize {
        2
    }

    fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        MomentumOperator::update_after_mesh_movement(self, matrix_free);
    }

    fn is_symmetric(&self) -> bool {
        !self.data().convective_problem
    }
}

impl LevelOperator for LaplaceOperator {
    fn matrix_free(&self) -> &MatrixFreeContext {
        LaplaceOperator::matrix_free(self)
    }

    fn n_components(&self) -> usize {
        1
    }

    fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        LaplaceOperator::update_after_mesh_movement(self, matrix_free);
    }

    fn is_singular(&self) -> bool {
        LaplaceOperator::is_singular(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundaryDescriptorU;
    use crate::functions::ZeroFunction;
    use crate::mesh::Mesh2D;
    use crate::operators::MomentumOperatorData;

    #[test]
    fn test_probed_diagonal_matches_dense_assembly() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 2, [1, 2, 3, 4]);
        let mf = Arc::new(MatrixFreeContext::new(&mesh, 1));
        let descriptor =
            (1..=4).fold(BoundaryDescriptorU::new(), |d, id| d.with_dirichlet(id, Arc::new(ZeroFunction)));
        let mut op = MomentumOperator::new(mf, &descriptor, MomentumOperatorData::default()).unwrap();
        op.set_scaling_factor_mass_matrix(10.0);
        let diagonal = op.compute_diagonal();
        let dense = op.assemble_dense();
        for (i, d) in diagonal.as_slice().iter().enumerate() {
            assert!((d - dense[(i, i)]).abs() < 1e-12, "dof {i}");
        }
    }
}
