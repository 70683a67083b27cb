//! Convective term `∇·(u ⊗ (u - w))` in divergence form, with `w` the grid
//! velocity of a moving mesh (zero otherwise).
//!
//! The nonlinear operator uses a local Lax-Friedrichs flux,
//!
//! F* = {F(u)}·n + λ/2 [u],  λ = 2 max(|(u⁻ - w)·n|, |(u⁺ - w)·n|)
//!
//! and is evaluated explicitly. The linearized (Oseen) operator about a
//! frozen transport velocity uses upwinding and enters the momentum
//! operator of a coupled solver.

use std::sync::Arc;

use super::dot2;
use super::integrator::{CellIntegrator, FaceIntegrator};
use super::matrix_free::{BoundaryFace, InnerFace, LocalContributions, MatrixFreeContext};
use crate::boundary::weak_bc::exterior_velocity_value;
use crate::boundary::{BoundaryDescriptorU, OperatorType, ResolvedBoundaryU};
use crate::error::{NsError, Result};
use crate::functions::{CachedBoundaryData, SharedCachedData};
use crate::vector::DofVector;

#[inline]
fn sub(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

/// Lax-Friedrichs flux of `u ⊗ (u - w)` through `n`.
#[inline]
fn lax_friedrichs(u_m: [f64; 2], u_p: [f64; 2], w: [f64; 2], n: [f64; 2]) -> [f64; 2] {
    let un_m = dot2(sub(u_m, w), n);
    let un_p = dot2(sub(u_p, w), n);
    let lambda = 2.0 * un_m.abs().max(un_p.abs());
    [
        0.5 * (u_m[0] * un_m + u_p[0] * un_p) + 0.5 * lambda * (u_m[0] - u_p[0]),
        0.5 * (u_m[1] * un_m + u_p[1] * un_p) + 0.5 * lambda * (u_m[1] - u_p[1]),
    ]
}

#[derive(Clone)]
pub struct ConvectiveOperator {
    matrix_free: Arc<MatrixFreeContext>,
    descriptor: BoundaryDescriptorU,
    boundary: Vec<ResolvedBoundaryU>,
    cached: SharedCachedData,
}

impl ConvectiveOperator {
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

    /// `dst = C(src)` including the boundary data at `time`. `grid_velocity`
    /// is the mesh velocity on a moving mesh.
    pub fn evaluate_nonlinear_operator(
        &self,
        dst: &mut DofVector,
        src: &DofVector,
        grid_velocity: Option<&DofVector>,
        time: f64,
    ) -> Result<()> {
        if let Some(w) = grid_velocity {
            if !w.same_layout(src) {
                return Err(NsError::dimension_mismatch(src.len(), w.len()));
            }
        }
        let cached = self.cached.read();
        let mf = self.matrix_free.as_ref();
        self.descriptor.check_cached_coverage(
            mf.boundary_faces(),
            &self.boundary,
            mf.shape().n_face_nodes,
            &cached,
        )?;
        dst.fill(0.0);
        mf.loop_cells_faces(
            dst,
            |cell, out| self.cell_kernel_nonlinear(cell, src, grid_velocity, out),
            |face, out| self.inner_face_kernel_nonlinear(face, src, grid_velocity, out),
            |face, out| {
                self.boundary_face_kernel_nonlinear(face, src, grid_velocity, time, &cached, out)
            },
        );
        Ok(())
    }

    /// `dst += C'(w) src`, the convective operator linearized about the
    /// transport velocity `linearization`, homogeneous boundary data.
    pub fn apply_linearized_add(&self, dst: &mut DofVector, src: &DofVector, linearization: &DofVector) {
        let mf = self.matrix_free.as_ref();
        mf.loop_cells_faces(
            dst,
            |cell, out| {
                let mut phi = CellIntegrator::new(mf, 2);
                let mut w = CellIntegrator::new(mf, 2);
                phi.reinit(cell);
                w.reinit(cell);
                phi.gather_evaluate(src, false);
                w.gather_evaluate(linearization, false);
                for q in 0..phi.n_q_points() {
                    let u = phi.get_vector_value(q);
                    let b = w.get_vector_value(q);
                    for c in 0..2 {
                        phi.submit_gradient(q, c, [-u[c] * b[0], -u[c] * b[1]]);
                    }
                }
                phi.integrate_scatter(out);
            },
            |face, out| {
                let mut phi_m = FaceIntegrator::new(mf, 2);
                let mut phi_p = FaceIntegrator::new(mf, 2);
                let mut w_m = FaceIntegrator::new(mf, 2);
                let mut w_p = FaceIntegrator::new(mf, 2);
                phi_m.reinit(face.element_m, face.face_m);
                phi_p.reinit_exterior(face);
                w_m.reinit(face.element_m, face.face_m);
                w_p.reinit_exterior(face);
                phi_m.gather_evaluate(src, false);
                phi_p.gather_evaluate(src, false);
                w_m.gather_evaluate(linearization, false);
                w_p.gather_evaluate(linearization, false);
                for q in 0..phi_m.n_q_points() {
                    let n = phi_m.get_normal_vector(q);
                    let a = w_m.get_vector_value(q);
                    let b = w_p.get_vector_value(q);
                    let wn = 0.5 * dot2([a[0] + b[0], a[1] + b[1]], n);
                    let flux = upwind(phi_m.get_vector_value(q), phi_p.get_vector_value(q), wn);
                    phi_m.submit_vector_value(q, flux);
                    phi_p.submit_vector_value(q, [-flux[0], -flux[1]]);
                }
                phi_m.integrate_scatter(out);
                phi_p.integrate_scatter(out);
            },
            |face, out| {
                let kind = self.boundary[face.index].kind;
                let mut phi = FaceIntegrator::new(mf, 2);
                let mut w = FaceIntegrator::new(mf, 2);
                phi.reinit(face.element, face.face);
                w.reinit(face.element, face.face);
                phi.gather_evaluate(src, false);
                w.gather_evaluate(linearization, false);
                for q in 0..phi.n_q_points() {
                    let n = phi.get_normal_vector(q);
                    let u_m = phi.get_vector_value(q);
                    let u_p = exterior_velocity_value(u_m, kind, [0.0; 2], n, OperatorType::Homogeneous);
                    let wn = dot2(w.get_vector_value(q), n);
                    phi.submit_vector_value(q, upwind(u_m, u_p, wn));
                }
                phi.integrate_scatter(out);
            },
        );
    }

    fn cell_kernel_nonlinear(
        &self,
        cell: usize,
        src: &DofVector,
        grid_velocity: Option<&DofVector>,
        out: &mut LocalContributions,
    ) {
        let mf = self.matrix_free.as_ref();
        let mut phi = CellIntegrator::new(mf, 2);
        phi.reinit(cell);
        phi.gather_evaluate(src, false);
        let phi_w = grid_velocity.map(|w| {
            let mut g = CellIntegrator::new(mf, 2);
            g.reinit(cell);
            g.gather_evaluate(w, false);
            g
        });
        for q in 0..phi.n_q_points() {
            let u = phi.get_vector_value(q);
            let w = phi_w.as_ref().map_or([0.0; 2], |g| g.get_vector_value(q));
            let transport = sub(u, w);
            for c in 0..2 {
                phi.submit_gradient(q, c, [-u[c] * transport[0], -u[c] * transport[1]]);
            }
        }
        phi.integrate_scatter(out);
    }

    fn inner_face_kernel_nonlinear(
        &self,
        face: &InnerFace,
        src: &DofVector,
        grid_velocity: Option<&DofVector>,
        out: &mut LocalContributions,
    ) {
        let mf = self.matrix_free.as_ref();
        let mut phi_m = FaceIntegrator::new(mf, 2);
        let mut phi_p = FaceIntegrator::new(mf, 2);
        phi_m.reinit(face.element_m, face.face_m);
        phi_p.reinit_exterior(face);
        phi_m.gather_evaluate(src, false);
        phi_p.gather_evaluate(src, false);
        // the grid velocity is continuous, its interior trace suffices
        let phi_w = grid_velocity.map(|w| {
            let mut g = FaceIntegrator::new(mf, 2);
            g.reinit(face.element_m, face.face_m);
            g.gather_evaluate(w, false);
            g
        });
        for q in 0..phi_m.n_q_points() {
            let n = phi_m.get_normal_vector(q);
            let w = phi_w.as_ref().map_or([0.0; 2], |g| g.get_vector_value(q));
            let flux = lax_friedrichs(phi_m.get_vector_value(q), phi_p.get_vector_value(q), w, n);
            phi_m.submit_vector_value(q, flux);
            phi_p.submit_vector_value(q, [-flux[0], -flux[1]]);
        }
        phi_m.integrate_scatter(out);
        phi_p.integrate_scatter(out);
    }

    fn boundary_face_kernel_nonlinear(
        &self,
        face: &BoundaryFace,
        src: &DofVector,
        grid_velocity: Option<&DofVector>,
        time: f64,
        cached: &CachedBoundaryData,
        out: &mut LocalContributions,
    ) {
        let mf = self.matrix_free.as_ref();
        let bc = &self.boundary[face.index];
        let mut phi = FaceIntegrator::new(mf, 2);
        phi.reinit(face.element, face.face);
        phi.gather_evaluate(src, false);
        let phi_w = grid_velocity.map(|w| {
            let mut g = FaceIntegrator::new(mf, 2);
            g.reinit(face.element, face.face);
            g.gather_evaluate(w, false);
            g
        });
        for q in 0..phi.n_q_points() {
            let n = phi.get_normal_vector(q);
            let u_m = phi.get_vector_value(q);
            let g = bc.dirichlet_value(face.index, q, phi.quadrature_point(q), time, cached);
            let u_p = exterior_velocity_value(u_m, bc.kind, g, n, OperatorType::Full);
            let w = phi_w.as_ref().map_or([0.0; 2], |gw| gw.get_vector_value(q));
            phi.submit_vector_value(q, lax_friedrichs(u_m, u_p, w, n));
        }
        phi.integrate_scatter(out);
    }
}

/// Upwind flux of a field `u` transported with normal velocity `wn`.
#[inline]
fn upwind(u_m: [f64; 2], u_p: [f64; 2], wn: f64) -> [f64; 2] {
    [
        0.5 * (u_m[0] + u_p[0]) * wn + 0.5 * wn.abs() * (u_m[0] - u_p[0]),
        0.5 * (u_m[1] + u_p[1]) * wn + 0.5 * wn.abs() * (u_m[1] - u_p[1]),
    ]
}
