//! Velocity divergence tested with pressure functions, central flux:
//!
//! -(∇q, u) + <[q], {u}·n>

use std::sync::Arc;

use super::dot2;
use super::integrator::{CellIntegrator, FaceIntegrator};
use super::matrix_free::{BoundaryFace, InnerFace, LocalContributions, MatrixFreeContext};
use crate::boundary::weak_bc::exterior_velocity_value;
use crate::boundary::{BoundaryDescriptorU, OperatorType, ResolvedBoundaryU};
use crate::error::Result;
use crate::functions::SharedCachedData;
use crate::vector::DofVector;

#[derive(Clone)]
pub struct DivergenceOperator {
    matrix_free: Arc<MatrixFreeContext>,
    descriptor: BoundaryDescriptorU,
    boundary: Vec<ResolvedBoundaryU>,
    cached: SharedCachedData,
}

impl DivergenceOperator {
    pub fn new(matrix_free: Arc<MatrixFreeContext>, descriptor: &BoundaryDescriptorU) -> Result<Self> {
        let boundary = descriptor.resolve(matrix_free.boundary_faces())?;
        Ok(Self {
            matrix_free,
            descriptor: descriptor.clone(),
            boundary,
            cached: descriptor.get_dirichlet_cached_data(),
        })
    }

    pub fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.matrix_free = matrix_free;
    }

    /// Homogeneous operator: pressure-space `dst` from velocity `src`.
    pub fn apply(&self, dst: &mut DofVector, src: &DofVector) {
        dst.fill(0.0);
        self.apply_add(dst, src);
    }

    pub fn apply_add(&self, dst: &mut DofVector, src: &DofVector) {
        self.matrix_free.loop_cells_faces(
            dst,
            |cell, out| self.cell_kernel(cell, src, out),
            |face, out| self.inner_face_kernel(face, src, out),
            |face, out| self.boundary_face_kernel(face, src, out),
        );
    }

    /// Add `-<q, g·n>` over Dirichlet boundaries with the velocity data at
    /// `time`.
    pub fn rhs_bc_add(&self, dst: &mut DofVector, time: f64) -> Result<()> {
        let cached = self.cached.read();
        let mf = self.matrix_free.as_ref();
        self.descriptor.check_cached_coverage(
            mf.boundary_faces(),
            &self.boundary,
            mf.shape().n_face_nodes,
            &cached,
        )?;
        mf.boundary_face_loop(dst, |face, out| {
            let bc = &self.boundary[face.index];
            if !bc.is_dirichlet() {
                return;
            }
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let g = bc.dirichlet_value(face.index, q, phi.quadrature_point(q), time, &cached);
                self.submit_inhomogeneous(&mut phi, q, bc, g);
            }
            phi.integrate_scatter(out);
        });
        Ok(())
    }

    /// Same as [`rhs_bc_add`](Self::rhs_bc_add) with the Dirichlet data taken
    /// from the trace of the velocity field `velocity`.
    pub fn rhs_bc_from_dof_vector_add(&self, dst: &mut DofVector, velocity: &DofVector) {
        let mf = self.matrix_free.as_ref();
        mf.boundary_face_loop(dst, |face, out| {
            let bc = &self.boundary[face.index];
            if !bc.is_dirichlet() {
                return;
            }
            let mut phi_u = FaceIntegrator::new(mf, 2);
            phi_u.reinit(face.element, face.face);
            phi_u.gather_evaluate(velocity, false);
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let g = phi_u.get_vector_value(q);
                self.submit_inhomogeneous(&mut phi, q, bc, g);
            }
            phi.integrate_scatter(out);
        });
    }

    fn submit_inhomogeneous(&self, phi: &mut FaceIntegrator, q: usize, bc: &ResolvedBoundaryU, g: [f64; 2]) {
        let n = phi.get_normal_vector(q);
        let u_p = exterior_velocity_value([0.0; 2], bc.kind, g, n, OperatorType::Inhomogeneous);
        phi.submit_value(q, 0, -0.5 * dot2(u_p, n));
    }

    fn cell_kernel(&self, cell: usize, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let mut phi_u = CellIntegrator::new(mf, 2);
        phi_u.reinit(cell);
        phi_u.gather_evaluate(src, false);
        let mut phi = CellIntegrator::new(mf, 1);
        phi.reinit(cell);
        for q in 0..phi.n_q_points() {
            let u = phi_u.get_vector_value(q);
            phi.submit_gradient(q, 0, [-u[0], -u[1]]);
        }
        phi.integrate_scatter(out);
    }

    fn inner_face_kernel(&self, face: &InnerFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let mut u_m = FaceIntegrator::new(mf, 2);
        let mut u_p = FaceIntegrator::new(mf, 2);
        u_m.reinit(face.element_m, face.face_m);
        u_p.reinit_exterior(face);
        u_m.gather_evaluate(src, false);
        u_p.gather_evaluate(src, false);
        let mut phi_m = FaceIntegrator::new(mf, 1);
        let mut phi_p = FaceIntegrator::new(mf, 1);
        phi_m.reinit(face.element_m, face.face_m);
        phi_p.reinit_exterior(face);
        for q in 0..phi_m.n_q_points() {
            let n = phi_m.get_normal_vector(q);
            let a = u_m.get_vector_value(q);
            let b = u_p.get_vector_value(q);
            let flux = 0.5 * dot2([a[0] + b[0], a[1] + b[1]], n);
            phi_m.submit_value(q, 0, flux);
            phi_p.submit_value(q, 0, -flux);
        }
        phi_m.integrate_scatter(out);
        phi_p.integrate_scatter(out);
    }

    fn boundary_face_kernel(&self, face: &BoundaryFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let kind = self.boundary[face.index].kind;
        let mut phi_u = FaceIntegrator::new(mf, 2);
        phi_u.reinit(face.element, face.face);
        phi_u.gather_evaluate(src, false);
        let mut phi = FaceIntegrator::new(mf, 1);
        phi.reinit(face.element, face.face);
        for q in 0..phi.n_q_points() {
            let n = phi.get_normal_vector(q);
            let u_m = phi_u.get_vector_value(q);
            let u_p = exterior_velocity_value(u_m, kind, [0.0; 2], n, OperatorType::Homogeneous);
            phi.submit_value(q, 0, 0.5 * dot2([u_m[0] + u_p[0], u_m[1] + u_p[1]], n));
        }
        phi.integrate_scatter(out);
    }
}
