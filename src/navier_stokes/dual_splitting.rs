//! Spatial operators of the dual-splitting scheme.
//!
//! Besides the elementary operators of [`NavierStokesCore`], the scheme
//! needs boundary integrals that carry the velocity-pressure coupling into
//! the pressure Poisson equation (PPE):
//!
//! - divergence terms on velocity Dirichlet boundaries, contributing to
//!   the weak divergence of the intermediate velocity,
//! - the consistent pressure Neumann condition
//!   `∂p/∂n = -n·(∂u/∂t + F(u) - f + ν curl ω)` on pressure Neumann
//!   boundaries.
//!
//! Each term is a face integral `<q, h>` with `h` chosen per boundary kind
//! by an exhaustive match.

use std::sync::Arc;

use parking_lot::RwLock;

use super::base::NavierStokesCore;
use super::curl::curl_at_face_point;
use super::parameters::{FormulationConvectiveTerm, Parameters};
use crate::boundary::{BoundaryDescriptor, BoundaryTypeP, BoundaryTypeU};
use crate::error::{NsError, Result};
use crate::functions::FieldFunctions;
use crate::mesh::MeshHierarchy;
use crate::operators::{FaceIntegrator, dot2};
use crate::solver::SolverResult;
use crate::vector::DofVector;

/// `∇u·u [+ (∇·u) u] [- ∇u·w]` at face point `q`.
fn convective_flux(
    formulation: FormulationConvectiveTerm,
    velocity: &FaceIntegrator,
    grid_velocity: Option<&FaceIntegrator>,
    q: usize,
) -> [f64; 2] {
    let u = velocity.get_vector_value(q);
    let grad = velocity.get_vector_gradient(q);
    let mut flux = [dot2(grad[0], u), dot2(grad[1], u)];
    if formulation == FormulationConvectiveTerm::DivergenceFormulation {
        let div = velocity.get_divergence(q);
        flux[0] += div * u[0];
        flux[1] += div * u[1];
    }
    if let Some(w) = grid_velocity {
        let w = w.get_vector_value(q);
        flux[0] -= dot2(grad[0], w);
        flux[1] -= dot2(grad[1], w);
    }
    flux
}

pub struct DualSplittingOperator {
    core: NavierStokesCore,
}

impl DualSplittingOperator {
    pub fn new(core: NavierStokesCore) -> Self {
        Self { core }
    }

    pub fn setup(
        hierarchy: Arc<RwLock<MeshHierarchy>>,
        boundary: BoundaryDescriptor,
        field_functions: FieldFunctions,
        param: Parameters,
    ) -> Result<Self> {
        Ok(Self::new(NavierStokesCore::new(hierarchy, boundary, field_functions, param)?))
    }

    pub fn core(&self) -> &NavierStokesCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut NavierStokesCore {
        &mut self.core
    }

    pub fn create_velocity_vector(&self) -> DofVector {
        self.core.create_velocity_vector()
    }

    pub fn create_pressure_vector(&self) -> DofVector {
        self.core.create_pressure_vector()
    }

    pub fn is_pressure_level_undefined(&self) -> bool {
        self.core.is_pressure_level_undefined()
    }

    // --- velocity divergence ------------------------------------------------

    /// Homogeneous weak divergence of `src`.
    pub fn apply_velocity_divergence_term(&self, dst: &mut DofVector, src: &DofVector) {
        self.core.divergence.apply(dst, src);
    }

    /// Add the velocity Dirichlet data of the divergence term at `time`.
    pub fn rhs_velocity_divergence_term_dirichlet_bc(&self, dst: &mut DofVector, time: f64) -> Result<()> {
        self.core.divergence.rhs_bc_add(dst, time)
    }

    /// Same with the Dirichlet data taken from a stored velocity field.
    pub fn rhs_velocity_divergence_term_dirichlet_bc_from_dof_vector(&self, dst: &mut DofVector, velocity: &DofVector) {
        self.core.divergence.rhs_bc_from_dof_vector_add(dst, velocity);
    }

    /// Add `-<q, f(t)·n>` on velocity Dirichlet boundaries.
    pub fn rhs_ppe_div_term_body_forces_add(&self, dst: &mut DofVector, time: f64) {
        let mf = self.core.matrix_free.as_ref();
        let f = &self.core.field_functions.right_hand_side;
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_u[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let value = match kind {
                    BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached => {
                        let rhs = f.value(phi.quadrature_point(q), time);
                        -dot2(rhs, phi.get_normal_vector(q))
                    }
                    // u·n = 0 on a symmetry boundary carries over to the
                    // intermediate velocity, so no data enters
                    BoundaryTypeU::Neumann | BoundaryTypeU::Symmetry => 0.0,
                };
                phi.submit_value(q, 0, value);
            }
            phi.integrate_scatter(out);
        });
    }

    /// Add `<q, F(u)·n>` on velocity Dirichlet boundaries, `u = src`.
    pub fn rhs_ppe_div_term_convective_term_add(&self, dst: &mut DofVector, src: &DofVector) -> Result<()> {
        let formulation = self.formulation()?;
        let mf = self.core.matrix_free.as_ref();
        let grid_velocity = self.core.param.ale_formulation.then_some(&self.core.grid_velocity);
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_u[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            match kind {
                BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached => {
                    let mut velocity = FaceIntegrator::new(mf, 2);
                    velocity.reinit(face.element, face.face);
                    velocity.gather_evaluate(src, true);
                    let w = grid_velocity.map(|w| {
                        let mut phi_w = FaceIntegrator::new(mf, 2);
                        phi_w.reinit(face.element, face.face);
                        phi_w.gather_evaluate(w, false);
                        phi_w
                    });
                    for q in 0..phi.n_q_points() {
                        let flux = convective_flux(formulation, &velocity, w.as_ref(), q);
                        phi.submit_value(q, 0, dot2(flux, phi.get_normal_vector(q)));
                    }
                }
                BoundaryTypeU::Neumann | BoundaryTypeU::Symmetry => {
                    for q in 0..phi.n_q_points() {
                        phi.submit_value(q, 0, 0.0);
                    }
                }
            }
            phi.integrate_scatter(out);
        });
        Ok(())
    }

    // --- pressure Neumann boundary condition ----------------------------------

    /// Add `-<q, n·∂u/∂t>` on pressure Neumann boundaries.
    pub fn rhs_ppe_nbc_numerical_time_derivative_add(&self, dst: &mut DofVector, acceleration: &DofVector) {
        let mf = self.core.matrix_free.as_ref();
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_p[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            let mut dudt = FaceIntegrator::new(mf, 2);
            dudt.reinit(face.element, face.face);
            dudt.gather_evaluate(acceleration, false);
            for q in 0..phi.n_q_points() {
                let h = match kind {
                    BoundaryTypeP::Neumann => -dot2(phi.get_normal_vector(q), dudt.get_vector_value(q)),
                    BoundaryTypeP::Dirichlet => 0.0,
                };
                phi.submit_value(q, 0, h);
            }
            phi.integrate_scatter(out);
        });
    }

    /// Add `<q, n·f(t)>` on pressure Neumann boundaries.
    pub fn rhs_ppe_nbc_body_force_term_add(&self, dst: &mut DofVector, time: f64) {
        let mf = self.core.matrix_free.as_ref();
        let f = &self.core.field_functions.right_hand_side;
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_p[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            for q in 0..phi.n_q_points() {
                let h = match kind {
                    BoundaryTypeP::Neumann => {
                        dot2(phi.get_normal_vector(q), f.value(phi.quadrature_point(q), time))
                    }
                    BoundaryTypeP::Dirichlet => 0.0,
                };
                phi.submit_value(q, 0, h);
            }
            phi.integrate_scatter(out);
        });
    }

    /// Add `-<q, n·F(u)>` on pressure Neumann boundaries, `u = src`.
    pub fn rhs_ppe_nbc_convective_add(&self, dst: &mut DofVector, src: &DofVector) -> Result<()> {
        let formulation = self.formulation()?;
        let mf = self.core.matrix_free.as_ref();
        let grid_velocity = self.core.param.ale_formulation.then_some(&self.core.grid_velocity);
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_p[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            match kind {
                BoundaryTypeP::Neumann => {
                    let mut velocity = FaceIntegrator::new(mf, 2);
                    velocity.reinit(face.element, face.face);
                    velocity.gather_evaluate(src, true);
                    let w = grid_velocity.map(|w| {
                        let mut phi_w = FaceIntegrator::new(mf, 2);
                        phi_w.reinit(face.element, face.face);
                        phi_w.gather_evaluate(w, false);
                        phi_w
                    });
                    for q in 0..phi.n_q_points() {
                        let flux = convective_flux(formulation, &velocity, w.as_ref(), q);
                        phi.submit_value(q, 0, -dot2(phi.get_normal_vector(q), flux));
                    }
                }
                BoundaryTypeP::Dirichlet => {
                    for q in 0..phi.n_q_points() {
                        phi.submit_value(q, 0, 0.0);
                    }
                }
            }
            phi.integrate_scatter(out);
        });
        Ok(())
    }

    /// Add `-<q, n·(ν curl ω)>` on pressure Neumann boundaries, with the
    /// vorticity `ω` stored in component 0 of `vorticity`.
    pub fn rhs_ppe_nbc_viscous_add(&self, dst: &mut DofVector, vorticity: &DofVector) {
        let mf = self.core.matrix_free.as_ref();
        mf.boundary_face_loop(dst, |face, out| {
            let kind = self.core.boundary_p[face.index].kind;
            let mut phi = FaceIntegrator::new(mf, 1);
            phi.reinit(face.element, face.face);
            let mut omega = FaceIntegrator::new(mf, 2);
            omega.reinit(face.element, face.face);
            omega.gather_evaluate(vorticity, true);
            for q in 0..phi.n_q_points() {
                let h = match kind {
                    BoundaryTypeP::Neumann => {
                        let nu = self.core.get_viscosity_boundary_face(face, q);
                        let curl = curl_at_face_point(&omega, q);
                        -nu * dot2(phi.get_normal_vector(q), curl)
                    }
                    BoundaryTypeP::Dirichlet => 0.0,
                };
                phi.submit_value(q, 0, h);
            }
            phi.integrate_scatter(out);
        });
    }

    /// Add the pressure Dirichlet data of the Laplace operator at `time`.
    pub fn rhs_ppe_laplace_add(&self, dst: &mut DofVector, time: f64) {
        self.core.rhs_ppe_laplace_add(dst, time);
    }

    pub fn solve_pressure(&mut self, dst: &mut DofVector, src: &DofVector, update_preconditioner: bool) -> SolverResult {
        self.core.solve_pressure(dst, src, update_preconditioner)
    }

    // --- velocity Dirichlet data and viscous step -----------------------------

    /// Zero `dst`, then write the velocity Dirichlet data at `time` into the
    /// nodes of Dirichlet faces. Other nodes stay zero.
    pub fn interpolate_velocity_dirichlet_bc(&self, dst: &mut DofVector, time: f64) -> Result<()> {
        let mf = self.core.matrix_free.as_ref();
        let cached = self.core.cached.read();
        self.core.boundary.velocity.check_cached_coverage(
            mf.boundary_faces(),
            &self.core.boundary_u,
            mf.shape().n_face_nodes,
            &cached,
        )?;
        dst.fill(0.0);
        for face in mf.boundary_faces() {
            let bc = &self.core.boundary_u[face.index];
            match bc.kind {
                BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached => {
                    for q in 0..mf.shape().n_face_nodes {
                        let node = mf.shape().face_to_cell_index_nodal[face.face][q];
                        let p = mf.mapping().point(face.element, node);
                        let g = bc.dirichlet_value(face.index, q, p, time, &cached);
                        dst.set(face.element, 0, node, g[0]);
                        dst.set(face.element, 1, node, g[1]);
                    }
                }
                BoundaryTypeU::Neumann | BoundaryTypeU::Symmetry => {}
            }
        }
        Ok(())
    }

    pub fn apply_helmholtz_operator(&self, dst: &mut DofVector, src: &DofVector) {
        self.core.apply_helmholtz_operator(dst, src);
    }

    pub fn solve_viscous(
        &mut self,
        dst: &mut DofVector,
        rhs: &DofVector,
        update_preconditioner: bool,
        scaling_factor: f64,
        time: f64,
    ) -> Result<SolverResult> {
        self.core.solve_viscous(dst, rhs, update_preconditioner, scaling_factor, time)
    }

    pub fn rhs_add_viscous_term(&self, dst: &mut DofVector, time: f64) -> Result<()> {
        self.core.rhs_add_viscous_term(dst, time)
    }

    // --- explicit terms -------------------------------------------------------

    pub fn evaluate_convective_term(&self, dst: &mut DofVector, src: &DofVector, time: f64) -> Result<()> {
        self.core.evaluate_convective_term(dst, src, time)
    }

    pub fn evaluate_add_body_force_term(&self, dst: &mut DofVector, time: f64) {
        self.core.evaluate_add_body_force_term(dst, time);
    }

    pub fn evaluate_pressure_gradient_term(&self, dst: &mut DofVector, src: &DofVector, time: f64) {
        self.core.evaluate_pressure_gradient_term(dst, src, time);
    }

    pub fn compute_vorticity(&self, dst: &mut DofVector, velocity: &DofVector) {
        self.core.compute_vorticity(dst, velocity);
    }

    pub fn apply_mass_operator(&self, dst: &mut DofVector, src: &DofVector) {
        self.core.apply_mass_operator(dst, src);
    }

    pub fn apply_mass_operator_add(&self, dst: &mut DofVector, src: &DofVector) {
        self.core.apply_mass_operator_add(dst, src);
    }

    pub fn apply_inverse_mass(&self, dst: &mut DofVector, src: &DofVector) {
        self.core.apply_inverse_mass(dst, src);
    }

    pub fn prescribe_initial_conditions(&self, velocity: &mut DofVector, pressure: &mut DofVector, time: f64) {
        self.core.prescribe_initial_conditions(velocity, pressure, time);
    }

    // --- moving mesh ----------------------------------------------------------

    pub fn set_grid_velocity(&mut self, velocity: &DofVector) -> Result<()> {
        self.core.set_grid_velocity(velocity)
    }

    pub fn update_after_grid_motion(&mut self) -> Result<()> {
        self.core.update_after_grid_motion()
    }

    fn formulation(&self) -> Result<FormulationConvectiveTerm> {
        match self.core.param.formulation_convective_term_bc {
            FormulationConvectiveTerm::Undefined => Err(NsError::UndefinedFormulation),
            f => Ok(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundaryDescriptorP, BoundaryDescriptorU};
    use crate::functions::{ConstantVector, VectorFunction, ZeroFunction};
    use crate::mesh::Mesh2D;
    use crate::navier_stokes::parameters::{EquationType, PreconditionerPressurePoisson, PreconditionerViscous};
    use crate::solver::SolverData;
    use crate::multigrid::MultigridData;

    /// Unit square, ids 1 bottom, 2 right, 3 top, 4 left.
    fn hierarchy() -> Arc<RwLock<MeshHierarchy>> {
        let coarse = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        Arc::new(RwLock::new(MeshHierarchy::new(coarse, 1)))
    }

    fn param() -> Parameters {
        Parameters::new(0.1, 2, 0.01)
            .with_right_hand_side(true)
            .with_pressure_solver(
                SolverData::new(1e-10, 500),
                PreconditionerPressurePoisson::PointJacobi,
                MultigridData::default(),
            )
            .with_viscous_solver(
                SolverData::new(1e-10, 500),
                PreconditionerViscous::InverseMassMatrix,
                MultigridData::default(),
            )
    }

    fn operator(velocity: BoundaryDescriptorU, pressure: BoundaryDescriptorP, param: Parameters) -> DualSplittingOperator {
        let f: Arc<dyn VectorFunction> = Arc::new(|p: (f64, f64), _t: f64| [1.0 + p.1, -2.0 + p.0]);
        let functions = FieldFunctions::new().with_right_hand_side(f);
        DualSplittingOperator::setup(hierarchy(), BoundaryDescriptor::new(velocity, pressure), functions, param)
            .unwrap()
    }

    fn channel() -> DualSplittingOperator {
        let velocity = BoundaryDescriptorU::new()
            .with_dirichlet(4, Arc::new(ConstantVector([1.0, 0.0])))
            .with_neumann(2, Arc::new(ZeroFunction))
            .with_symmetry(1)
            .with_symmetry(3);
        let pressure = BoundaryDescriptorP::new()
            .with_neumann(1)
            .with_neumann(3)
            .with_neumann(4)
            .with_dirichlet(2, Arc::new(ZeroFunction));
        operator(velocity, pressure, param())
    }

    fn shear_flow(op: &DualSplittingOperator) -> DofVector {
        let mf = op.core().matrix_free();
        let mut u = op.create_velocity_vector();
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                let (x, y) = mf.mapping().point(k, q);
                u.set(k, 0, q, 1.0 + y * y);
                u.set(k, 1, q, 0.5 * x);
            }
        }
        u
    }

    /// Sum of the entries of `v` on the nodes of faces with boundary id `id`.
    fn boundary_sum(op: &DualSplittingOperator, v: &DofVector, id: u32) -> f64 {
        let mf = op.core().matrix_free();
        let mut total = 0.0;
        for face in mf.boundary_faces().iter().filter(|f| f.boundary_id == id) {
            for q in 0..mf.shape().n_face_nodes {
                let node = mf.shape().face_to_cell_index_nodal[face.face][q];
                total += v.get(face.element, 0, node);
            }
        }
        total
    }

    #[test]
    fn test_body_force_div_term_only_on_dirichlet_faces() {
        let op = channel();
        let mut dst = op.create_pressure_vector();
        op.rhs_ppe_div_term_body_forces_add(&mut dst, 0.0);
        // left face: n = (-1, 0), f·n = -(1 + y), integrated: -(f·n) = 1.5
        assert!((dst.as_slice().iter().sum::<f64>() - 1.5).abs() < 1e-12);
        assert_eq!(boundary_sum(&op, &dst, 2), 0.0);
    }

    #[test]
    fn test_symmetry_faces_give_exact_zero() {
        let op = channel();
        let u = shear_flow(&op);
        let mut dst = op.create_pressure_vector();
        op.rhs_ppe_div_term_convective_term_add(&mut dst, &u).unwrap();
        op.rhs_ppe_div_term_body_forces_add(&mut dst, 0.3);
        let mf = op.core().matrix_free();
        // interior nodes of the bottom and top faces are not shared with the left face
        for face in mf.boundary_faces().iter().filter(|f| f.boundary_id == 1 || f.boundary_id == 3) {
            let touches_left = mf.mapping().point(face.element, 0).0 < 1e-12;
            if touches_left {
                continue;
            }
            for q in 0..mf.shape().n_face_nodes {
                let node = mf.shape().face_to_cell_index_nodal[face.face][q];
                assert_eq!(dst.get(face.element, 0, node), 0.0);
            }
        }
    }

    #[test]
    fn test_nbc_body_force_uses_pressure_neumann_faces() {
        let op = channel();
        let mut dst = op.create_pressure_vector();
        op.rhs_ppe_nbc_body_force_term_add(&mut dst, 0.0);
        // bottom n = (0,-1): 2 - x -> 1.5; top n = (0,1): x - 2 -> -1.5;
        // left n = (-1,0): -(1 + y) -> -1.5
        assert!((dst.as_slice().iter().sum::<f64>() + 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_nbc_time_derivative_and_viscous_terms() {
        let op = channel();
        let mut acceleration = op.create_velocity_vector();
        acceleration.fill(2.0);
        let mut dst = op.create_pressure_vector();
        op.rhs_ppe_nbc_numerical_time_derivative_add(&mut dst, &acceleration);
        // a = (2, 2): bottom -(-2) = 2, top -2, left -(-2) = 2
        assert!((dst.as_slice().iter().sum::<f64>() - 2.0).abs() < 1e-12);

        // vorticity of u = (1 + y², x/2) is 1/2 - 2y; curl ω = (-2, 0)
        let u = shear_flow(&op);
        let mut omega = op.create_velocity_vector();
        op.compute_vorticity(&mut omega, &u);
        let mut dst = op.create_pressure_vector();
        op.rhs_ppe_nbc_viscous_add(&mut dst, &omega);
        // only the left face sees a normal component: -ν n·curl = -0.1 * 2
        assert!((dst.as_slice().iter().sum::<f64>() + 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_undefined_formulation_is_reported() {
        let velocity = BoundaryDescriptorU::new()
            .with_dirichlet(1, Arc::new(ZeroFunction))
            .with_dirichlet(2, Arc::new(ZeroFunction))
            .with_dirichlet(3, Arc::new(ZeroFunction))
            .with_dirichlet(4, Arc::new(ZeroFunction));
        let pressure = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| d.with_neumann(id));
        let p = param()
            .with_equation_type(EquationType::Stokes)
            .with_formulation_convective_term_bc(FormulationConvectiveTerm::Undefined);
        let op = operator(velocity, pressure, p);
        let u = op.create_velocity_vector();
        let mut dst = op.create_pressure_vector();
        assert_eq!(
            op.rhs_ppe_div_term_convective_term_add(&mut dst, &u),
            Err(NsError::UndefinedFormulation)
        );
        assert_eq!(op.rhs_ppe_nbc_convective_add(&mut dst, &u), Err(NsError::UndefinedFormulation));
    }

    #[test]
    fn test_interpolate_dirichlet_bc_touches_only_dirichlet_nodes() {
        let op = channel();
        let mut dst = op.create_velocity_vector();
        dst.fill(7.0);
        op.interpolate_velocity_dirichlet_bc(&mut dst, 0.0).unwrap();
        let mf = op.core().matrix_free();
        let mut n_set = 0;
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                let (x, _) = mf.mapping().point(k, q);
                let expected = if x < 1e-12 { [1.0, 0.0] } else { [0.0, 0.0] };
                assert_eq!(dst.vector_value(k, q), expected);
                if x < 1e-12 {
                    n_set += 1;
                }
            }
        }
        assert!(n_set > 0);
    }

    #[test]
    fn test_divergence_form_adds_div_u_term() {
        let velocity = (1..=4).fold(BoundaryDescriptorU::new(), |d, id| {
            d.with_dirichlet(id, Arc::new(ZeroFunction))
        });
        let pressure = (1..=4).fold(BoundaryDescriptorP::new(), |d, id| d.with_neumann(id));
        let div_form = operator(velocity.clone(), pressure.clone(), param());
        let conv_form = operator(
            velocity,
            pressure,
            param().with_formulation_convective_term_bc(FormulationConvectiveTerm::ConvectiveFormulation),
        );
        // u = (x, 0): ∇u·u = (x, 0), (∇·u) u = (x, 0)
        let mf = div_form.core().matrix_free();
        let mut u = div_form.create_velocity_vector();
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                u.set(k, 0, q, mf.mapping().point(k, q).0);
            }
        }
        let mut a = div_form.create_pressure_vector();
        let mut b = conv_form.create_pressure_vector();
        div_form.rhs_ppe_div_term_convective_term_add(&mut a, &u).unwrap();
        conv_form.rhs_ppe_div_term_convective_term_add(&mut b, &u).unwrap();
        // only the right face x = 1 contributes: ∫ 2x dy = 2 and ∫ x dy = 1
        assert!((a.as_slice().iter().sum::<f64>() - 2.0).abs() < 1e-12);
        assert!((b.as_slice().iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }
}
