//! Viscous term `-∇·(ν ∇u)` for each velocity component, symmetric interior
//! penalty discretization with (possibly) spatially variable viscosity.
//!
//! On faces the viscosity is the average of the two sides. Neumann data is
//! a traction `h = ν ∇u·n`.

use std::fmt;
use std::sync::Arc;

use super::integrator::{CellIntegrator, FaceIntegrator};
use super::matrix_free::{BoundaryFace, InnerFace, LocalContributions, MatrixFreeContext};
use crate::boundary::weak_bc::{exterior_velocity_normal_gradient, exterior_velocity_value};
use crate::boundary::{BoundaryDescriptorU, OperatorType, ResolvedBoundaryU};
use crate::error::{NsError, Result};
use crate::functions::{ScalarFunction, SharedCachedData};
use crate::vector::DofVector;

#[derive(Clone)]
pub enum ViscosityModel {
    Constant(f64),
    /// Viscosity as a function of position, sampled at the nodes.
    Variable(Arc<dyn ScalarFunction>),
}

impl fmt::Debug for ViscosityModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViscosityModel::Constant(nu) => write!(f, "Constant({nu})"),
            ViscosityModel::Variable(_) => write!(f, "Variable(..)"),
        }
    }
}

impl ViscosityModel {
    fn sample(&self, mf: &MatrixFreeContext) -> Vec<f64> {
        let n = mf.n_nodes();
        (0..mf.n_elements() * n)
            .map(|i| match self {
                ViscosityModel::Constant(nu) => *nu,
                ViscosityModel::Variable(f) => f.value(mf.mapping().point(i / n, i % n), 0.0),
            })
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct ViscousOperatorData {
    pub ip_factor: f64,
    pub viscosity: ViscosityModel,
}

impl Default for ViscousOperatorData {
    fn default() -> Self {
        Self {
            ip_factor: 1.0,
            viscosity: ViscosityModel::Constant(1.0),
        }
    }
}

#[derive(Clone)]
pub struct ViscousOperator {
    matrix_free: Arc<MatrixFreeContext>,
    data: ViscousOperatorData,
    descriptor: BoundaryDescriptorU,
    boundary: Vec<ResolvedBoundaryU>,
    cached: SharedCachedData,
    /// Nodal viscosity, cell-major
    viscosity: Vec<f64>,
}

impl ViscousOperator {
    pub fn new(
        matrix_free: Arc<MatrixFreeContext>,
        descriptor: &BoundaryDescriptorU,
        data: ViscousOperatorData,
    ) -> Result<Self> {
        if data.ip_factor <= 0.0 {
            return Err(NsError::invalid_parameter("interior penalty factor must be positive"));
        }
        let viscosity = data.viscosity.sample(&matrix_free);
        if viscosity.iter().any(|nu| nu.is_nan() || *nu < 0.0) {
            return Err(NsError::invalid_parameter("viscosity must be non-negative"));
        }
        let boundary = descriptor.resolve(matrix_free.boundary_faces())?;
        Ok(Self {
            matrix_free,
            data,
            descriptor: descriptor.clone(),
            boundary,
            cached: descriptor.get_dirichlet_cached_data(),
            viscosity,
        })
    }

    pub fn data(&self) -> &ViscousOperatorData {
        &self.data
    }

    pub fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.viscosity = self.data.viscosity.sample(&matrix_free);
        self.matrix_free = matrix_free;
    }

    #[inline]
    pub fn get_viscosity(&self, element: usize, node: usize) -> f64 {
        self.viscosity[element * self.matrix_free.n_nodes() + node]
    }

    /// `dst = V src`
    pub fn apply(&self, dst: &mut DofVector, src: &DofVector) {
        dst.fill(0.0);
        self.apply_add(dst, src);
    }

    /// `dst += V src`
    pub fn apply_add(&self, dst: &mut DofVector, src: &DofVector) {
        self.matrix_free.loop_cells_faces(
            dst,
            |cell, out| self.cell_kernel(cell, src, out),
            |face, out| self.inner_face_kernel(face, src, out),
            |face, out| self.boundary_face_kernel(face, src, out),
        );
    }

    /// Add the boundary-data contribution at `time`.
    pub fn rhs_add(&self, dst: &mut DofVector, time: f64) -> Result<()> {
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
            let tau = mf.penalty_parameter(face.element, self.data.ip_factor);
            let mut phi = FaceIntegrator::new(mf, 2);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let nu = self.get_viscosity(face.element, phi.cell_node(q));
                let n = phi.get_normal_vector(q);
                let point = phi.quadrature_point(q);
                let g = bc.dirichlet_value(face.index, q, point, time, &cached);
                let h = bc.neumann_value(point, time);
                // traction data h = ν ∂u/∂n
                let h_over_nu = if nu > 0.0 { [h[0] / nu, h[1] / nu] } else { [0.0; 2] };
                let u_p = exterior_velocity_value([0.0; 2], bc.kind, g, n, OperatorType::Inhomogeneous);
                let dn_p = exterior_velocity_normal_gradient(
                    [0.0; 2],
                    bc.kind,
                    h_over_nu,
                    n,
                    OperatorType::Inhomogeneous,
                );
                for c in 0..2 {
                    let value_flux = -0.5 * nu * u_p[c];
                    let gradient_flux = nu * (0.5 * dn_p[c] + tau * u_p[c]);
                    phi.submit_normal_derivative(q, c, value_flux);
                    phi.submit_value(q, c, gradient_flux);
                }
            }
            phi.integrate_scatter(out);
        });
        Ok(())
    }

    fn cell_kernel(&self, cell: usize, src: &DofVector, out: &mut LocalContributions) {
        let mut phi = CellIntegrator::new(&self.matrix_free, 2);
        phi.reinit(cell);
        phi.gather_evaluate(src, true);
        for q in 0..phi.n_q_points() {
            let nu = self.get_viscosity(cell, q);
            for c in 0..2 {
                let g = phi.get_gradient(q, c);
                phi.submit_gradient(q, c, [nu * g[0], nu * g[1]]);
            }
        }
        phi.integrate_scatter(out);
    }

    fn inner_face_kernel(&self, face: &InnerFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let tau = mf
            .penalty_parameter(face.element_m, self.data.ip_factor)
            .max(mf.penalty_parameter(face.element_p, self.data.ip_factor));
        let mut phi_m = FaceIntegrator::new(mf, 2);
        let mut phi_p = FaceIntegrator::new(mf, 2);
        phi_m.reinit(face.element_m, face.face_m);
        phi_p.reinit_exterior(face);
        phi_m.gather_evaluate(src, true);
        phi_p.gather_evaluate(src, true);
        for q in 0..phi_m.n_q_points() {
            let nu = 0.5
                * (self.get_viscosity(face.element_m, phi_m.cell_node(q))
                    + self.get_viscosity(face.element_p, phi_p.cell_node(q)));
            for c in 0..2 {
                let jump = phi_m.get_value(q, c) - phi_p.get_value(q, c);
                let value_flux = 0.5 * nu * jump;
                let gradient_flux = nu
                    * (0.5 * (phi_m.get_normal_derivative(q, c) + phi_p.get_normal_derivative(q, c))
                        - tau * jump);
                phi_m.submit_normal_derivative(q, c, -value_flux);
                phi_m.submit_value(q, c, -gradient_flux);
                phi_p.submit_normal_derivative(q, c, -value_flux);
                phi_p.submit_value(q, c, gradient_flux);
            }
        }
        phi_m.integrate_scatter(out);
        phi_p.integrate_scatter(out);
    }

    fn boundary_face_kernel(&self, face: &BoundaryFace, src: &DofVector, out: &mut LocalContributions) {
        let mf = self.matrix_free.as_ref();
        let kind = self.boundary[face.index].kind;
        let tau = mf.penalty_parameter(face.element, self.data.ip_factor);
        let mut phi = FaceIntegrator::new(mf, 2);
        phi.reinit(face.element, face.face);
        phi.gather_evaluate(src, true);
        for q in 0..phi.n_q_points() {
            let nu = self.get_viscosity(face.element, phi.cell_node(q));
            let n = phi.get_normal_vector(q);
            let u_m = phi.get_vector_value(q);
            let dn_m = [phi.get_normal_derivative(q, 0), phi.get_normal_derivative(q, 1)];
            let u_p = exterior_velocity_value(u_m, kind, [0.0; 2], n, OperatorType::Homogeneous);
            let dn_p = exterior_velocity_normal_gradient(dn_m, kind, [0.0; 2], n, OperatorType::Homogeneous);
            for c in 0..2 {
                let jump = u_m[c] - u_p[c];
                let value_flux = 0.5 * nu * jump;
                let gradient_flux = nu * (0.5 * (dn_m[c] + dn_p[c]) - tau * jump);
                phi.submit_normal_derivative(q, c, -value_flux);
                phi.submit_value(q, c, -gradient_flux);
            }
        }
        phi.integrate_scatter(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{ConstantVector, VectorFunction, ZeroFunction};
    use crate::mesh::Mesh2D;

    fn context() -> Arc<MatrixFreeContext> {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 2, [1, 2, 3, 4]);
        Arc::new(MatrixFreeContext::new(&mesh, 2))
    }

    fn field(mf: &MatrixFreeContext, f: impl Fn(f64, f64) -> [f64; 2]) -> DofVector {
        let mut v = mf.create_vector(2);
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                let (x, y) = mf.mapping().point(k, q);
                let u = f(x, y);
                v.set(k, 0, q, u[0]);
                v.set(k, 1, q, u[1]);
            }
        }
        v
    }

    fn walls() -> BoundaryDescriptorU {
        (1..=4).fold(BoundaryDescriptorU::new(), |d, id| d.with_dirichlet(id, Arc::new(ZeroFunction)))
    }

    #[test]
    fn test_symmetric_positive_definite() {
        let mf = context();
        let op = ViscousOperator::new(
            Arc::clone(&mf),
            &walls(),
            ViscousOperatorData {
                ip_factor: 1.0,
                viscosity: ViscosityModel::Variable(Arc::new(|p: (f64, f64), _t: f64| 1.0 + p.0)),
            },
        )
        .unwrap();
        let u = field(&mf, |x, y| [x * y, (2.0 * y).cos()]);
        let v = field(&mf, |x, y| [y - x * x, x]);
        let mut au = mf.create_vector(2);
        let mut av = mf.create_vector(2);
        op.apply(&mut au, &u);
        op.apply(&mut av, &v);
        assert!((au.dot(&v) - av.dot(&u)).abs() < 1e-10);
        assert!(au.dot(&u) > 0.0);
    }

    #[test]
    fn test_linear_field_with_matching_dirichlet_data() {
        let mf = context();
        let g: Arc<dyn VectorFunction> = Arc::new(|p: (f64, f64), _t: f64| [p.0 + 2.0 * p.1, -p.0]);
        let descriptor = (1..=4).fold(BoundaryDescriptorU::new(), |d, id| {
            d.with_dirichlet(id, Arc::clone(&g))
        });
        let op = ViscousOperator::new(
            Arc::clone(&mf),
            &descriptor,
            ViscousOperatorData {
                ip_factor: 2.0,
                viscosity: ViscosityModel::Constant(0.1),
            },
        )
        .unwrap();
        let u = field(&mf, |x, y| [x + 2.0 * y, -x]);
        let mut au = mf.create_vector(2);
        op.apply(&mut au, &u);
        let mut rhs = mf.create_vector(2);
        op.rhs_add(&mut rhs, 0.0).unwrap();
        au.axpy(-1.0, &rhs);
        assert!(au.norm_max() < 1e-11);
    }

    #[test]
    fn test_symmetry_boundary_homogeneous_part_vanishes_for_tangential_flow() {
        // u = (1, 0) on the unit square: tangential to the top and bottom
        // symmetry walls, constant so the volume terms vanish
        let mf = context();
        let descriptor = BoundaryDescriptorU::new()
            .with_symmetry(1)
            .with_symmetry(3)
            .with_neumann(2, Arc::new(ZeroFunction))
            .with_dirichlet(4, Arc::new(ConstantVector([1.0, 0.0])));
        let op = ViscousOperator::new(Arc::clone(&mf), &descriptor, ViscousOperatorData::default())
            .unwrap();
        let u = field(&mf, |_, _| [1.0, 0.0]);
        let mut au = mf.create_vector(2);
        op.apply(&mut au, &u);
        let mut rhs = mf.create_vector(2);
        op.rhs_add(&mut rhs, 0.0).unwrap();
        au.axpy(-1.0, &rhs);
        assert!(au.norm_max() < 1e-12);
    }
}
