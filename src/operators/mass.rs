//! Mass operator. With collocated GLL quadrature it is diagonal, its
//! entries being the JxW values of the nodes.

use std::sync::Arc;

use super::matrix_free::MatrixFreeContext;
use crate::vector::DofVector;

#[derive(Clone, Debug)]
pub struct MassOperator {
    matrix_free: Arc<MatrixFreeContext>,
}

impl MassOperator {
    pub fn new(matrix_free: Arc<MatrixFreeContext>) -> Self {
        Self { matrix_free }
    }

    pub fn reinit(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.matrix_free = matrix_free;
    }

    fn for_each_node(&self, dst: &mut DofVector, src: &DofVector, f: impl Fn(f64, f64) -> f64) {
        let mapping = self.matrix_free.mapping();
        let n = self.matrix_free.n_nodes();
        for k in 0..self.matrix_free.n_elements() {
            for c in 0..src.n_components() {
                for q in 0..n {
                    dst.set(k, c, q, f(src.get(k, c, q), mapping.jxw(k, q)));
                }
            }
        }
    }

    /// `dst = M src`
    pub fn apply(&self, dst: &mut DofVector, src: &DofVector) {
        self.for_each_node(dst, src, |u, w| u * w);
    }

    /// `dst += s * M src`
    pub fn apply_scale_add(&self, dst: &mut DofVector, s: f64, src: &DofVector) {
        let mapping = self.matrix_free.mapping();
        let n = self.matrix_free.n_nodes();
        for k in 0..self.matrix_free.n_elements() {
            for c in 0..src.n_components() {
                for q in 0..n {
                    let v = dst.get(k, c, q) + s * mapping.jxw(k, q) * src.get(k, c, q);
                    dst.set(k, c, q, v);
                }
            }
        }
    }

    /// `dst = M⁻¹ src`
    pub fn apply_inverse(&self, dst: &mut DofVector, src: &DofVector) {
        self.for_each_node(dst, src, |u, w| u / w);
    }

    /// Diagonal of `M` in the layout of `template`.
    pub fn diagonal(&self, template: &DofVector) -> DofVector {
        let mut ones = DofVector::zeros_like(template);
        ones.fill(1.0);
        let mut d = DofVector::zeros_like(template);
        self.apply(&mut d, &ones);
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh2D;

    #[test]
    fn test_mass_integrates_constants_and_inverts() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 3.0, 2, 3, [0; 4]);
        let mf = Arc::new(MatrixFreeContext::new(&mesh, 3));
        let mass = MassOperator::new(Arc::clone(&mf));

        let mut one = mf.create_vector(2);
        one.fill(1.0);
        let mut m_one = mf.create_vector(2);
        mass.apply(&mut m_one, &one);
        let area: f64 = m_one.as_slice().iter().sum::<f64>() / 2.0;
        assert!((area - 6.0).abs() < 1e-12);

        let mut back = mf.create_vector(2);
        mass.apply_inverse(&mut back, &m_one);
        assert!(back.as_slice().iter().all(|v| (v - 1.0).abs() < 1e-14));
    }
}
