//! Scalar Laplace operator, symmetric interior penalty discretization.
//!
//! Bilinear form (`-Δp` in weak form):
//!
//! (∇v, ∇p) - <[v], {∇p}·n> - <{∇v}·n, [p]> + <τ [v], [p]>
//!
//! Boundary conditions use the mirror exterior states of
//! [`weak_bc`](crate::boundary::weak_bc); the data-dependent part is
//! returned by [`LaplaceOperator::rhs_add`].

use std::sync::Arc;

use super::integrator::{CellIntegrator, FaceIntegrator};
use super::matrix_free::{BoundaryFace, InnerFace, LocalContributions, MatrixFreeContext};
use crate::boundary::weak_bc::{exterior_pressure_normal_gradient, exterior_pressure_value};
use crate::boundary::{BoundaryDescriptorP, BoundaryTypeP, OperatorType, ResolvedBoundaryP};
use crate::error::{NsError, Result};
use crate::vector::DofVector;

#[derive(Clone, Copy, Debug)]
pub struct LaplaceOperatorData {
    /// Interior penalty factor
    pub ip_factor: f64,
}

impl Default for LaplaceOperatorData {
    fn default() -> Self {
        Self { ip_factor: 1.0 }
    }
}

#[derive(Clone)]
pub struct LaplaceOperator {
    matrix_free: Arc<MatrixFreeContext>,
    data: LaplaceOperatorData,
    boundary: Vec<ResolvedBoundaryP>,
    singular: bool,
}

impl LaplaceOperator {
    pub fn new(
        matrix_free: Arc<MatrixFreeContext>,
        descriptor: &BoundaryDescriptorP,
        data: LaplaceOperatorData,
    ) -> Result<Self> {
        if data.ip_factor <= 0.0 {
            return Err(NsError::invalid_parameter("interior penalty factor must be positive"));
        }
        let boundary = descriptor.resolve(matrix_free.boundary_faces())?;
        let singular = boundary.iter().all(|b| b.kind == BoundaryTypeP::Neumann);
        Ok(Self {
            matrix_free,
            data,
            boundary,
            singular,
        })
    }

    pub fn matrix_free(&self) -> &Arc<MatrixFreeContext> {
        &self.matrix_free
    }

    pub fn data(&self) -> &LaplaceOperatorData {
        &self.data
    }

    /// No Dirichlet boundary: constants are in the kernel.
    pub fn is_singular(&self) -> bool {
        self.singular
    }

    /// Topology is unchanged, only geometry is replaced.
    pub fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.matrix_free = matrix_free;
    }

    pub fn create_vector(&self) -> DofVector {
        self.matrix_free.create_vector(1)
    }

    /// `dst = A src` with homogeneous boundary data.
    pub fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        dst.fill(0.0);
        self.vmult_add(dst, src);
    }

    pub fn vmult_add(&self, dst: &mut DofVector, src: &DofVector) {
        let mf = self.matrix_free.as_ref();
        mf.loop_cells_faces(
            dst,
            |cell, out| self.cell_kernel(cell, src, out),
            |face, out| self.inner_face_kernel(face, src, out),
            |face, out| self.boundary_face_kernel(face, src, out),
        );
    }

    /// Add the boundary-data contribution at `time` to a right-hand side.
    pub fn rhs_add(&self, dst: &mut DofVector, time: f64) {
        let mf = self.matrix_free.as_ref();
        mf.boundary_face_loop(dst, |face, out| {
            let bc = &self.boundary[face.index];
            let tau = mf.penalty_parameter(face.element, self.data.ip_factor);
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let g = bc.dirichlet_value(phi.quadrature_point(q), time);
                let p_p = exterior_pressure_value(0.0, bc.kind, g, OperatorType::Inhomogeneous);
                let dp_p =
                    exterior_pressure_normal_gradient(0.0, bc.kind, 0.0, OperatorType::Inhomogeneous);
                let value_flux = -0.5 * p_p;
                let gradient_flux = 0.5 * dp_p + tau * p_p;
                phi.submit_normal_derivative(q, 0, value_flux);
                phi.submit_value(q, 0, gradient_flux);
            }
            phi.integrate_scatter(out);
        });
    }

    fn cell_kernel(&self, cell: usize, src: &DofVector, out: &mut LocalContributions) {
        let mut phi = CellIntegrator::new(&self.matrix_free, 1);
        phi.reinit(cell);
        phi.gather_evaluate(src, true);
        for q in 0..phi.n_q_points() {
            let g = phi.get_gradient(q, 0);
            phi.submit_gradient(q, 0, g);
        }
        phi.integrate_scatter(out);
    }

    fn inner_face_kernel(&self, face: &InnerFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let tau = mf
            .penalty_parameter(face.element_m, self.data.ip_factor)
            .max(mf.penalty_parameter(face.element_p, self.data.ip_factor));
        let mut phi_m = FaceIntegrator::new(mf, 1);
        let mut phi_p = FaceIntegrator::new(mf, 1);
        phi_m.reinit(face.element_m, face.face_m);
        phi_p.reinit_exterior(face);
        phi_m.gather_evaluate(src, true);
        phi_p.gather_evaluate(src, true);
        for q in 0..phi_m.n_q_points() {
            let jump = phi_m.get_value(q, 0) - phi_p.get_value(q, 0);
            let value_flux = 0.5 * jump;
            let gradient_flux = 0.5
                * (phi_m.get_normal_derivative(q, 0) + phi_p.get_normal_derivative(q, 0))
                - tau * jump;
            phi_m.submit_normal_derivative(q, 0, -value_flux);
            phi_m.submit_value(q, 0, -gradient_flux);
            phi_p.submit_normal_derivative(q, 0, -value_flux);
            phi_p.submit_value(q, 0, gradient_flux);
        }
        phi_m.integrate_scatter(out);
        phi_p.integrate_scatter(out);
    }

    fn boundary_face_kernel(&self, face: &BoundaryFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let kind = self.boundary[face.index].kind;
        let tau = mf.penalty_parameter(face.element, self.data.ip_factor);
        let mut phi = FaceIntegrator::new(mf, 1);
        phi.reinit(face.element, face.face);
        phi.gather_evaluate(src, true);
        for q in 0..phi.n_q_points() {
            let p_m = phi.get_value(q, 0);
            let dp_m = phi.get_normal_derivative(q, 0);
            let p_p = exterior_pressure_value(p_m, kind, 0.0, OperatorType::Homogeneous);
            let dp_p = exterior_pressure_normal_gradient(dp_m, kind, 0.0, OperatorType::Homogeneous);
            let value_flux = 0.5 * (p_m - p_p);
            let gradient_flux = 0.5 * (dp_m + dp_p) - tau * (p_m - p_p);
            phi.submit_normal_derivative(q, 0, -value_flux);
            phi.submit_value(q, 0, -gradient_flux);
        }
        phi.integrate_scatter(out);
    }
}
