//! Pressure gradient tested with velocity functions, central flux:
//!
//! -(∇·v, p) + <[v]·n, {p}>

use std::sync::Arc;

use super::integrator::{CellIntegrator, FaceIntegrator};
use super::matrix_free::{BoundaryFace, InnerFace, LocalContributions, MatrixFreeContext};
use crate::boundary::weak_bc::exterior_pressure_value;
use crate::boundary::{BoundaryDescriptorP, OperatorType, ResolvedBoundaryP};
use crate::error::Result;
use crate::vector::DofVector;

#[derive(Clone)]
pub struct GradientOperator {
    matrix_free: Arc<MatrixFreeContext>,
    boundary: Vec<ResolvedBoundaryP>,
}

impl GradientOperator {
    pub fn new(matrix_free: Arc<MatrixFreeContext>, descriptor: &BoundaryDescriptorP) -> Result<Self> {
        let boundary = descriptor.resolve(matrix_free.boundary_faces())?;
        Ok(Self { matrix_free, boundary })
    }

    pub fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.matrix_free = matrix_free;
    }

    /// Homogeneous operator: velocity-space `dst` from pressure `src`.
    pub fn apply(&self, dst: &mut DofVector, src: &DofVector) {
        dst.fill(0.0);
        self.matrix_free.loop_cells_faces(
            dst,
            |cell, out| self.cell_kernel(cell, src, out),
            |face, out| self.inner_face_kernel(face, src, out),
            |face, out| self.boundary_face_kernel(face, src, out),
        );
    }

    /// Add `-<v·n, g_p>` over pressure Dirichlet boundaries at `time`.
    pub fn rhs_bc_add(&self, dst: &mut DofVector, time: f64) {
        let mf = self.matrix_free.as_ref();
        mf.boundary_face_loop(dst, |face, out| {
            let bc = &self.boundary[face.index];
            let mut phi = FaceIntegrator::new(mf, 2);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let g = bc.dirichlet_value(phi.quadrature_point(q), time);
                let p_p = exterior_pressure_value(0.0, bc.kind, g, OperatorType::Inhomogeneous);
                let flux = 0.5 * p_p;
                let n = phi.get_normal_vector(q);
                phi.submit_vector_value(q, [-flux * n[0], -flux * n[1]]);
            }
            phi.integrate_scatter(out);
        });
    }

    /// Full affine operator `G p` including the boundary data at `time`.
    pub fn evaluate(&self, dst: &mut DofVector, src: &DofVector, time: f64) {
        self.apply(dst, src);
        let mut rhs = DofVector::zeros_like(dst);
        self.rhs_bc_add(&mut rhs, time);
        dst.axpy(-1.0, &rhs);
    }

    fn cell_kernel(&self, cell: usize, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let mut phi_p = CellIntegrator::new(mf, 1);
        phi_p.reinit(cell);
        phi_p.gather_evaluate(src, false);
        let mut phi = CellIntegrator::new(mf, 2);
        phi.reinit(cell);
        for q in 0..phi.n_q_points() {
            let p = phi_p.get_value(q, 0);
            phi.submit_gradient(q, 0, [-p, 0.0]);
            phi.submit_gradient(q, 1, [0.0, -p]);
        }
        phi.integrate_scatter(out);
    }

    fn inner_face_kernel(&self, face: &InnerFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let mut p_m = FaceIntegrator::new(mf, 1);
        let mut p_p = FaceIntegrator::new(mf, 1);
        p_m.reinit(face.element_m, face.face_m);
        p_p.reinit_exterior(face);
        p_m.gather_evaluate(src, false);
        p_p.gather_evaluate(src, false);
        let mut phi_m = FaceIntegrator::new(mf, 2);
        let mut phi_p = FaceIntegrator::new(mf, 2);
        phi_m.reinit(face.element_m, face.face_m);
        phi_p.reinit_exterior(face);
        for q in 0..phi_m.n_q_points() {
            let n = phi_m.get_normal_vector(q);
            let flux = 0.5 * (p_m.get_value(q, 0) + p_p.get_value(q, 0));
            phi_m.submit_vector_value(q, [flux * n[0], flux * n[1]]);
            phi_p.submit_vector_value(q, [-flux * n[0], -flux * n[1]]);
        }
        phi_m.integrate_scatter(out);
        phi_p.integrate_scatter(out);
    }

    fn boundary_face_kernel(&self, face: &BoundaryFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let kind = self.boundary[face.index].kind;
        let mut phi_p = FaceIntegrator::new(mf, 1);
        phi_p.reinit(face.element, face.face);
        phi_p.gather_evaluate(src, false);
        let mut phi = FaceIntegrator::new(mf, 2);
        phi.reinit(face.element, face.face);
        for q in 0..phi.n_q_points() {
            let n = phi.get_normal_vector(q);
            let p_m = phi_p.get_value(q, 0);
            let p_ext = exterior_pressure_value(p_m, kind, 0.0, OperatorType::Homogeneous);
            let flux = 0.5 * (p_m + p_ext);
            phi.submit_vector_value(q, [flux * n[0], flux * n[1]]);
        }
        phi.integrate_scatter(out);
    }
}
