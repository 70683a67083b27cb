//! Cell and face integrators: evaluate a field at quadrature points, collect
//! test-function contributions and integrate them back to element dofs.
//!
//! Quadrature points coincide with the GLL nodes. On a face, point `q`
//! follows the interior side's counter-clockwise order; the exterior side of
//! an inner face walks its own face nodes backwards so both sides see the
//! same physical point. Normal vectors always point from the interior side
//! to the exterior side, also when evaluated from the exterior cell.

use super::matrix_free::{InnerFace, LocalContributions, MatrixFreeContext};
use crate::vector::DofVector;

/// Evaluation of one field on one cell.
pub struct CellIntegrator<'a> {
    mf: &'a MatrixFreeContext,
    n_components: usize,
    cell: usize,
    values: Vec<f64>,
    gradients: Vec<[f64; 2]>,
    submitted_values: Vec<f64>,
    submitted_gradients: Vec<[f64; 2]>,
    has_values: bool,
    has_gradients: bool,
}

impl<'a> CellIntegrator<'a> {
    pub fn new(mf: &'a MatrixFreeContext, n_components: usize) -> Self {
        let n = mf.n_nodes() * n_components;
        Self {
            mf,
            n_components,
            cell: 0,
            values: vec![0.0; n],
            gradients: vec![[0.0; 2]; n],
            submitted_values: vec![0.0; n],
            submitted_gradients: vec![[0.0; 2]; n],
            has_values: false,
            has_gradients: false,
        }
    }

    pub fn reinit(&mut self, cell: usize) {
        self.cell = cell;
        self.submitted_values.fill(0.0);
        self.submitted_gradients.fill([0.0; 2]);
        self.has_values = false;
        self.has_gradients = false;
    }

    pub fn n_q_points(&self) -> usize {
        self.mf.n_nodes()
    }

    /// Read dof values of `src` and optionally compute physical gradients.
    pub fn gather_evaluate(&mut self, src: &DofVector, gradients: bool) {
        debug_assert_eq!(src.n_components(), self.n_components);
        self.values.copy_from_slice(src.element(self.cell));
        if gradients {
            let n = self.mf.n_nodes();
            compute_gradients(self.mf, self.cell, &self.values, &mut self.gradients, n);
        }
    }

    #[inline]
    pub fn quadrature_point(&self, q: usize) -> (f64, f64) {
        self.mf.mapping().point(self.cell, q)
    }

    #[inline]
    pub fn jxw(&self, q: usize) -> f64 {
        self.mf.mapping().jxw(self.cell, q)
    }

    #[inline]
    pub fn get_value(&self, q: usize, c: usize) -> f64 {
        self.values[c * self.mf.n_nodes() + q]
    }

    #[inline]
    pub fn get_vector_value(&self, q: usize) -> [f64; 2] {
        [self.get_value(q, 0), self.get_value(q, 1)]
    }

    #[inline]
    pub fn get_gradient(&self, q: usize, c: usize) -> [f64; 2] {
        self.gradients[c * self.mf.n_nodes() + q]
    }

    /// `grad[c][d] = ∂u_c/∂x_d`
    #[inline]
    pub fn get_vector_gradient(&self, q: usize) -> [[f64; 2]; 2] {
        [self.get_gradient(q, 0), self.get_gradient(q, 1)]
    }

    #[inline]
    pub fn get_divergence(&self, q: usize) -> f64 {
        self.get_gradient(q, 0)[0] + self.get_gradient(q, 1)[1]
    }

    #[inline]
    pub fn submit_value(&mut self, q: usize, c: usize, value: f64) {
        self.has_values = true;
        self.submitted_values[c * self.mf.n_nodes() + q] += value;
    }

    #[inline]
    pub fn submit_vector_value(&mut self, q: usize, value: [f64; 2]) {
        self.submit_value(q, 0, value[0]);
        self.submit_value(q, 1, value[1]);
    }

    /// Contribution tested against `∇v_c`.
    #[inline]
    pub fn submit_gradient(&mut self, q: usize, c: usize, value: [f64; 2]) {
        self.has_gradients = true;
        let g = &mut self.submitted_gradients[c * self.mf.n_nodes() + q];
        g[0] += value[0];
        g[1] += value[1];
    }

    /// Integrate the submitted quantities and queue them for `self.cell`.
    pub fn integrate_scatter(&self, out: &mut LocalContributions) {
        let n = self.mf.n_nodes();
        let mut local = vec![0.0; self.n_components * n];
        let mapping = self.mf.mapping();
        if self.has_values {
            for c in 0..self.n_components {
                for q in 0..n {
                    local[c * n + q] += self.submitted_values[c * n + q] * mapping.jxw(self.cell, q);
                }
            }
        }
        if self.has_gradients {
            let mut f_r = vec![0.0; n];
            let mut f_s = vec![0.0; n];
            for c in 0..self.n_components {
                for q in 0..n {
                    let [rx, ry, sx, sy] = mapping.inverse_jacobian(self.cell, q);
                    let [gx, gy] = self.submitted_gradients[c * n + q];
                    let w = mapping.jxw(self.cell, q);
                    f_r[q] = (rx * gx + ry * gy) * w;
                    f_s[q] = (sx * gx + sy * gy) * w;
                }
                self.mf
                    .shape()
                    .integrate_gradient_reference(&f_r, &f_s, &mut local[c * n..(c + 1) * n]);
            }
        }
        out.add(self.cell, local);
    }
}

/// Evaluation of one field on one side of a face.
pub struct FaceIntegrator<'a> {
    mf: &'a MatrixFreeContext,
    n_components: usize,
    element: usize,
    face: usize,
    reversed: bool,
    normal_sign: f64,
    values: Vec<f64>,
    gradients: Vec<[f64; 2]>,
    submitted_values: Vec<f64>,
    submitted_gradients: Vec<[f64; 2]>,
    has_values: bool,
    has_gradients: bool,
}

impl<'a> FaceIntegrator<'a> {
    pub fn new(mf: &'a MatrixFreeContext, n_components: usize) -> Self {
        let n = mf.n_nodes() * n_components;
        let nf = mf.shape().n_face_nodes * n_components;
        Self {
            mf,
            n_components,
            element: 0,
            face: 0,
            reversed: false,
            normal_sign: 1.0,
            values: vec![0.0; n],
            gradients: vec![[0.0; 2]; n],
            submitted_values: vec![0.0; nf],
            submitted_gradients: vec![[0.0; 2]; nf],
            has_values: false,
            has_gradients: false,
        }
    }

    fn reset(&mut self) {
        self.submitted_values.fill(0.0);
        self.submitted_gradients.fill([0.0; 2]);
        self.has_values = false;
        self.has_gradients = false;
    }

    /// Interior side of a face: the cell's own outward normal.
    pub fn reinit(&mut self, element: usize, face: usize) {
        self.element = element;
        self.face = face;
        self.reversed = false;
        self.normal_sign = 1.0;
        self.reset();
    }

    /// Exterior side of an inner face.
    pub fn reinit_exterior(&mut self, face: &InnerFace) {
        self.element = face.element_p;
        self.face = face.face_p;
        self.reversed = true;
        self.normal_sign = -1.0;
        self.reset();
    }

    pub fn element(&self) -> usize {
        self.element
    }

    pub fn n_q_points(&self) -> usize {
        self.mf.shape().n_face_nodes
    }

    #[inline]
    fn own_q(&self, q: usize) -> usize {
        if self.reversed {
            self.mf.shape().n_face_nodes - 1 - q
        } else {
            q
        }
    }

    /// Volume node of face point `q`.
    #[inline]
    pub fn cell_node(&self, q: usize) -> usize {
        self.mf.shape().face_to_cell_index_nodal[self.face][self.own_q(q)]
    }

    #[inline]
    pub fn get_normal_vector(&self, q: usize) -> [f64; 2] {
        let n = self.mf.mapping().face_normal(self.element, self.face, self.own_q(q));
        [self.normal_sign * n[0], self.normal_sign * n[1]]
    }

    #[inline]
    pub fn jxw(&self, q: usize) -> f64 {
        self.mf.mapping().face_jxw(self.element, self.face, self.own_q(q))
    }

    #[inline]
    pub fn quadrature_point(&self, q: usize) -> (f64, f64) {
        self.mf.mapping().point(self.element, self.cell_node(q))
    }

    pub fn gather_evaluate(&mut self, src: &DofVector, gradients: bool) {
        debug_assert_eq!(src.n_components(), self.n_components);
        self.values.copy_from_slice(src.element(self.element));
        if gradients {
            let n = self.mf.n_nodes();
            compute_gradients(self.mf, self.element, &self.values, &mut self.gradients, n);
        }
    }

    #[inline]
    pub fn get_value(&self, q: usize, c: usize) -> f64 {
        self.values[c * self.mf.n_nodes() + self.cell_node(q)]
    }

    #[inline]
    pub fn get_vector_value(&self, q: usize) -> [f64; 2] {
        [self.get_value(q, 0), self.get_value(q, 1)]
    }

    #[inline]
    pub fn get_gradient(&self, q: usize, c: usize) -> [f64; 2] {
        self.gradients[c * self.mf.n_nodes() + self.cell_node(q)]
    }

    #[inline]
    pub fn get_vector_gradient(&self, q: usize) -> [[f64; 2]; 2] {
        [self.get_gradient(q, 0), self.get_gradient(q, 1)]
    }

    #[inline]
    pub fn get_divergence(&self, q: usize) -> f64 {
        self.get_gradient(q, 0)[0] + self.get_gradient(q, 1)[1]
    }

    /// `∇u_c · n` with the face normal of [`get_normal_vector`](Self::get_normal_vector).
    #[inline]
    pub fn get_normal_derivative(&self, q: usize, c: usize) -> f64 {
        let g = self.get_gradient(q, c);
        let n = self.get_normal_vector(q);
        g[0] * n[0] + g[1] * n[1]
    }

    #[inline]
    pub fn submit_value(&mut self, q: usize, c: usize, value: f64) {
        self.has_values = true;
        let nf = self.mf.shape().n_face_nodes;
        self.submitted_values[c * nf + q] += value;
    }

    #[inline]
    pub fn submit_vector_value(&mut self, q: usize, value: [f64; 2]) {
        self.submit_value(q, 0, value[0]);
        self.submit_value(q, 1, value[1]);
    }

    #[inline]
    pub fn submit_gradient(&mut self, q: usize, c: usize, value: [f64; 2]) {
        self.has_gradients = true;
        let nf = self.mf.shape().n_face_nodes;
        let g = &mut self.submitted_gradients[c * nf + q];
        g[0] += value[0];
        g[1] += value[1];
    }

    /// Contribution tested against `∇v_c · n`.
    #[inline]
    pub fn submit_normal_derivative(&mut self, q: usize, c: usize, value: f64) {
        let n = self.get_normal_vector(q);
        self.submit_gradient(q, c, [value * n[0], value * n[1]]);
    }

    pub fn integrate_scatter(&self, out: &mut LocalContributions) {
        let n = self.mf.n_nodes();
        let nf = self.mf.shape().n_face_nodes;
        let mapping = self.mf.mapping();
        let mut local = vec![0.0; self.n_components * n];
        if self.has_values {
            for c in 0..self.n_components {
                for q in 0..nf {
                    local[c * n + self.cell_node(q)] += self.submitted_values[c * nf + q] * self.jxw(q);
                }
            }
        }
        if self.has_gradients {
            let mut f_r = vec![0.0; n];
            let mut f_s = vec![0.0; n];
            for c in 0..self.n_components {
                f_r.fill(0.0);
                f_s.fill(0.0);
                for q in 0..nf {
                    let node = self.cell_node(q);
                    let [rx, ry, sx, sy] = mapping.inverse_jacobian(self.element, node);
                    let [gx, gy] = self.submitted_gradients[c * nf + q];
                    let w = self.jxw(q);
                    f_r[node] += (rx * gx + ry * gy) * w;
                    f_s[node] += (sx * gx + sy * gy) * w;
                }
                self.mf
                    .shape()
                    .integrate_gradient_reference(&f_r, &f_s, &mut local[c * n..(c + 1) * n]);
            }
        }
        out.add(self.element, local);
    }
}

fn compute_gradients(
    mf: &MatrixFreeContext,
    element: usize,
    values: &[f64],
    gradients: &mut [[f64; 2]],
    n: usize,
) {
    let mut ur = vec![0.0; n];
    let mut us = vec![0.0; n];
    for (c, block) in values.chunks(n).enumerate() {
        mf.shape().gradient_reference(block, &mut ur, &mut us);
        for q in 0..n {
            gradients[c * n + q] = mf.mapping().transform_gradient(element, q, ur[q], us[q]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh2D;

    fn context() -> MatrixFreeContext {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [0; 4]);
        MatrixFreeContext::new(&mesh, 2)
    }

    fn interpolate(ctx: &MatrixFreeContext, f: impl Fn(f64, f64) -> f64) -> DofVector {
        let mut v = ctx.create_vector(1);
        for k in 0..ctx.n_elements() {
            for q in 0..ctx.n_nodes() {
                let (x, y) = ctx.mapping().point(k, q);
                v.set(k, 0, q, f(x, y));
            }
        }
        v
    }

    #[test]
    fn test_cell_gradient_physical() {
        let ctx = context();
        let u = interpolate(&ctx, |x, y| x * x + 3.0 * y);
        let mut phi = CellIntegrator::new(&ctx, 1);
        phi.reinit(3);
        phi.gather_evaluate(&u, true);
        for q in 0..phi.n_q_points() {
            let (x, _) = phi.quadrature_point(q);
            let g = phi.get_gradient(q, 0);
            assert!((g[0] - 2.0 * x).abs() < 1e-12);
            assert!((g[1] - 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_exterior_side_sees_same_points() {
        let ctx = context();
        let face = ctx.inner_faces()[0];
        let mut m = FaceIntegrator::new(&ctx, 1);
        let mut p = FaceIntegrator::new(&ctx, 1);
        m.reinit(face.element_m, face.face_m);
        p.reinit_exterior(&face);
        for q in 0..m.n_q_points() {
            let (xm, ym) = m.quadrature_point(q);
            let (xp, yp) = p.quadrature_point(q);
            assert!((xm - xp).abs() < 1e-14 && (ym - yp).abs() < 1e-14);
            assert_eq!(m.get_normal_vector(q), p.get_normal_vector(q));
        }
    }

    #[test]
    fn test_divergence_theorem() {
        // ∫ ∇·(x, y) v = 2 ∫ v, and the weak form -∫ (x,y)·∇v + ∮ (x,y)·n v
        // must agree for every test function of one cell.
        let ctx = context();
        let mut w = ctx.create_vector(2);
        for k in 0..ctx.n_elements() {
            for q in 0..ctx.n_nodes() {
                let (x, y) = ctx.mapping().point(k, q);
                w.set(k, 0, q, x);
                w.set(k, 1, q, y);
            }
        }
        let cell = 0;
        let mut weak = LocalContributions::new(ctx.n_nodes());
        let mut phi_w = CellIntegrator::new(&ctx, 2);
        phi_w.reinit(cell);
        phi_w.gather_evaluate(&w, false);
        let mut phi = CellIntegrator::new(&ctx, 1);
        phi.reinit(cell);
        for q in 0..phi.n_q_points() {
            let u = phi_w.get_vector_value(q);
            phi.submit_gradient(q, 0, [-u[0], -u[1]]);
        }
        phi.integrate_scatter(&mut weak);
        for face in 0..4 {
            let mut fw = FaceIntegrator::new(&ctx, 2);
            fw.reinit(cell, face);
            fw.gather_evaluate(&w, false);
            let mut f = FaceIntegrator::new(&ctx, 1);
            f.reinit(cell, face);
            for q in 0..f.n_q_points() {
                let u = fw.get_vector_value(q);
                let n = f.get_normal_vector(q);
                f.submit_value(q, 0, u[0] * n[0] + u[1] * n[1]);
            }
            f.integrate_scatter(&mut weak);
        }
        let mut total = ctx.create_vector(1);
        weak.distribute(&mut total);
        for q in 0..ctx.n_nodes() {
            let strong = 2.0 * ctx.mapping().jxw(cell, q);
            assert!((total.get(cell, 0, q) - strong).abs() < 1e-13);
        }
    }
}
