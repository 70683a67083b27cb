//! State and operators shared by projection-type splitting schemes.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::curl::vorticity_2d;
use super::parameters::{Parameters, PreconditionerPressurePoisson, PreconditionerViscous};
use crate::boundary::{BoundaryDescriptor, ResolvedBoundaryP, ResolvedBoundaryU};
use crate::error::{NsError, Result};
use crate::functions::{FieldFunctions, SharedCachedData};
use crate::mesh::MeshHierarchy;
use crate::multigrid::{LevelOperator, MultigridPreconditionerMomentum, MultigridPreconditionerPoisson};
use crate::operators::{
    BoundaryFace, CellIntegrator, ConvectiveOperator, DivergenceOperator, GradientOperator, LaplaceOperator,
    LaplaceOperatorData, MassOperator, MatrixFreeContext, MomentumOperator, MomentumOperatorData,
};
use crate::solver::{
    ConjugateGradient, IdentityPreconditioner, InverseMassPreconditioner, JacobiPreconditioner, Preconditioner,
    SolverResult,
};
use crate::vector::DofVector;

/// Preconditioner of the pressure Poisson equation.
enum PressurePreconditioner {
    Identity(IdentityPreconditioner),
    Jacobi(JacobiPreconditioner),
    Multigrid(Box<MultigridPreconditionerPoisson>),
}

impl PressurePreconditioner {
    fn update(&mut self, laplace: &LaplaceOperator) {
        match self {
            Self::Identity(_) => {}
            Self::Jacobi(jacobi) => *jacobi = JacobiPreconditioner::from_diagonal(&laplace.compute_diagonal()),
            Self::Multigrid(mg) => mg.update(),
        }
    }
}

impl Preconditioner for PressurePreconditioner {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        match self {
            Self::Identity(p) => p.vmult(dst, src),
            Self::Jacobi(p) => p.vmult(dst, src),
            Self::Multigrid(p) => p.vmult(dst, src),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Identity(p) => p.name(),
            Self::Jacobi(p) => p.name(),
            Self::Multigrid(p) => p.name(),
        }
    }
}

/// Preconditioner of the viscous (Helmholtz) step.
enum ViscousPreconditioner {
    Identity(IdentityPreconditioner),
    InverseMass(InverseMassPreconditioner),
    Jacobi(JacobiPreconditioner),
    Multigrid(Box<MultigridPreconditionerMomentum>),
}

impl ViscousPreconditioner {
    fn update(&mut self, momentum: &MomentumOperator) -> Result<()> {
        match self {
            Self::Identity(_) => {}
            Self::InverseMass(p) => {
                *p = InverseMassPreconditioner::new(MassOperator::new(Arc::clone(momentum.matrix_free())));
            }
            Self::Jacobi(p) => *p = JacobiPreconditioner::from_diagonal(&momentum.compute_diagonal()),
            Self::Multigrid(mg) => mg.update(momentum)?,
        }
        Ok(())
    }

    /// Rebuild on the geometry of a moved mesh, also for multigrid levels
    /// set up without a moving mesh.
    fn update_after_grid_motion(&mut self, momentum: &MomentumOperator) -> Result<()> {
        if let Self::Multigrid(mg) = self {
            mg.update_matrix_free();
        }
        self.update(momentum)
    }

    fn multigrid(&self) -> Option<&MultigridPreconditionerMomentum> {
        match self {
            Self::Multigrid(mg) => Some(&**mg),
            _ => None,
        }
    }
}

impl Preconditioner for ViscousPreconditioner {
    fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        match self {
            Self::Identity(p) => p.vmult(dst, src),
            Self::InverseMass(p) => p.vmult(dst, src),
            Self::Jacobi(p) => p.vmult(dst, src),
            Self::Multigrid(p) => p.vmult(dst, src),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Identity(p) => p.name(),
            Self::InverseMass(p) => p.name(),
            Self::Jacobi(p) => p.name(),
            Self::Multigrid(p) => p.name(),
        }
    }
}

/// Discretization of the incompressible Navier-Stokes equations on the
/// finest mesh of a hierarchy: elementary operators, boundary data, solvers
/// and the grid velocity of a moving mesh.
pub struct NavierStokesCore {
    pub(super) param: Parameters,
    pub(super) hierarchy: Arc<RwLock<MeshHierarchy>>,
    pub(super) matrix_free: Arc<MatrixFreeContext>,
    pub(super) boundary: BoundaryDescriptor,
    pub(super) boundary_u: Vec<ResolvedBoundaryU>,
    pub(super) boundary_p: Vec<ResolvedBoundaryP>,
    pub(super) cached: SharedCachedData,
    pub(super) field_functions: FieldFunctions,

    pub(super) mass: MassOperator,
    pub(super) laplace: LaplaceOperator,
    pub(super) divergence: DivergenceOperator,
    pub(super) gradient: GradientOperator,
    pub(super) convective: ConvectiveOperator,
    pub(super) momentum: MomentumOperator,

    preconditioner_pressure: PressurePreconditioner,
    preconditioner_viscous: ViscousPreconditioner,

    pub(super) grid_velocity: DofVector,
}

impl NavierStokesCore {
    pub fn new(
        hierarchy: Arc<RwLock<MeshHierarchy>>,
        boundary: BoundaryDescriptor,
        field_functions: FieldFunctions,
        param: Parameters,
    ) -> Result<Self> {
        param.validate()?;
        let degree = param.degree;
        let matrix_free = {
            let meshes = hierarchy.read();
            boundary.verify(meshes.finest())?;
            Arc::new(MatrixFreeContext::new(meshes.finest(), degree))
        };

        let boundary_u = boundary.velocity.resolve(matrix_free.boundary_faces())?;
        let boundary_p = boundary.pressure.resolve(matrix_free.boundary_faces())?;

        let laplace_data = LaplaceOperatorData {
            ip_factor: param.ip_factor_pressure,
        };
        let laplace = LaplaceOperator::new(Arc::clone(&matrix_free), &boundary.pressure, laplace_data)?;
        let divergence = DivergenceOperator::new(Arc::clone(&matrix_free), &boundary.velocity)?;
        let gradient = GradientOperator::new(Arc::clone(&matrix_free), &boundary.pressure)?;
        let convective = ConvectiveOperator::new(Arc::clone(&matrix_free), &boundary.velocity)?;
        // the convective term is explicit, the implicit step is a Helmholtz problem
        let momentum_data = MomentumOperatorData {
            unsteady_problem: true,
            viscous_problem: true,
            convective_problem: false,
            ip_factor_viscous: param.ip_factor_viscous,
            viscosity: param.viscosity.clone(),
        };
        let momentum = MomentumOperator::new(Arc::clone(&matrix_free), &boundary.velocity, momentum_data.clone())?;
        let mass = MassOperator::new(Arc::clone(&matrix_free));

        let preconditioner_pressure = match param.preconditioner_pressure_poisson {
            PreconditionerPressurePoisson::None => PressurePreconditioner::Identity(IdentityPreconditioner),
            PreconditionerPressurePoisson::PointJacobi => {
                PressurePreconditioner::Jacobi(JacobiPreconditioner::from_diagonal(&laplace.compute_diagonal()))
            }
            PreconditionerPressurePoisson::Multigrid => {
                PressurePreconditioner::Multigrid(Box::new(MultigridPreconditionerPoisson::initialize(
                    Arc::clone(&hierarchy),
                    degree,
                    &boundary.pressure,
                    laplace_data,
                    param.multigrid_data_pressure_poisson.clone(),
                )?))
            }
        };
        let preconditioner_viscous = match param.preconditioner_viscous {
            PreconditionerViscous::None => ViscousPreconditioner::Identity(IdentityPreconditioner),
            PreconditionerViscous::InverseMassMatrix => {
                ViscousPreconditioner::InverseMass(InverseMassPreconditioner::new(mass.clone()))
            }
            PreconditionerViscous::PointJacobi => {
                ViscousPreconditioner::Jacobi(JacobiPreconditioner::from_diagonal(&momentum.compute_diagonal()))
            }
            PreconditionerViscous::Multigrid => {
                ViscousPreconditioner::Multigrid(Box::new(MultigridPreconditionerMomentum::initialize(
                    Arc::clone(&hierarchy),
                    degree,
                    &boundary.velocity,
                    &momentum_data,
                    param.multigrid_data_viscous.clone(),
                    param.multigrid_operator_type_viscous,
                    param.ale_formulation,
                )?))
            }
        };

        let grid_velocity = matrix_free.create_vector(2);
        let cached = boundary.velocity.get_dirichlet_cached_data();
        info!(
            degree,
            cells = matrix_free.n_elements(),
            pressure_preconditioner = preconditioner_pressure.name(),
            viscous_preconditioner = preconditioner_viscous.name(),
            pure_neumann_pressure = laplace.is_singular(),
            "Navier-Stokes operators ready"
        );
        Ok(Self {
            param,
            hierarchy,
            matrix_free,
            boundary,
            boundary_u,
            boundary_p,
            cached,
            field_functions,
            mass,
            laplace,
            divergence,
            gradient,
            convective,
            momentum,
            preconditioner_pressure,
            preconditioner_viscous,
            grid_velocity,
        })
    }

    pub fn param(&self) -> &Parameters {
        &self.param
    }

    pub fn matrix_free(&self) -> &Arc<MatrixFreeContext> {
        &self.matrix_free
    }

    pub fn boundary_descriptor(&self) -> &BoundaryDescriptor {
        &self.boundary
    }

    pub fn field_functions(&self) -> &FieldFunctions {
        &self.field_functions
    }

    pub fn hierarchy(&self) -> &Arc<RwLock<MeshHierarchy>> {
        &self.hierarchy
    }

    pub fn momentum_operator(&self) -> &MomentumOperator {
        &self.momentum
    }

    pub fn create_velocity_vector(&self) -> DofVector {
        self.matrix_free.create_vector(2)
    }

    pub fn create_pressure_vector(&self) -> DofVector {
        self.matrix_free.create_vector(1)
    }

    /// Pure Neumann pressure problem: the pressure is fixed by a zero-mean
    /// condition.
    pub fn is_pressure_level_undefined(&self) -> bool {
        self.laplace.is_singular()
    }

    /// Viscosity at face point `q` of a boundary face, interior side.
    pub fn get_viscosity_boundary_face(&self, face: &BoundaryFace, q: usize) -> f64 {
        let node = self.matrix_free.shape().face_to_cell_index_nodal[face.face][q];
        self.momentum.viscous_operator().get_viscosity(face.element, node)
    }

    /// Nodal interpolation of the initial fields at `time`.
    pub fn prescribe_initial_conditions(&self, velocity: &mut DofVector, pressure: &mut DofVector, time: f64) {
        let mapping = self.matrix_free.mapping();
        for k in 0..self.matrix_free.n_elements() {
            for q in 0..self.matrix_free.n_nodes() {
                let p = mapping.point(k, q);
                let u = self.field_functions.initial_solution_velocity.value(p, time);
                velocity.set(k, 0, q, u[0]);
                velocity.set(k, 1, q, u[1]);
                pressure.set(k, 0, q, self.field_functions.initial_solution_pressure.value(p, time));
            }
        }
    }

    pub fn apply_mass_operator(&self, dst: &mut DofVector, src: &DofVector) {
        self.mass.apply(dst, src);
    }

    pub fn apply_mass_operator_add(&self, dst: &mut DofVector, src: &DofVector) {
        self.mass.apply_scale_add(dst, 1.0, src);
    }

    pub fn apply_inverse_mass(&self, dst: &mut DofVector, src: &DofVector) {
        self.mass.apply_inverse(dst, src);
    }

    /// `dst = C(src)` with boundary data at `time`; on a moving mesh the
    /// transport velocity is `u - w`.
    pub fn evaluate_convective_term(&self, dst: &mut DofVector, src: &DofVector, time: f64) -> Result<()> {
        let grid_velocity = self.param.ale_formulation.then_some(&self.grid_velocity);
        self.convective.evaluate_nonlinear_operator(dst, src, grid_velocity, time)
    }

    /// `dst += (v, f(t))`
    pub fn evaluate_add_body_force_term(&self, dst: &mut DofVector, time: f64) {
        let mf = self.matrix_free.as_ref();
        let f = &self.field_functions.right_hand_side;
        mf.cell_loop(dst, |cell, out| {
            let mut phi = CellIntegrator::new(mf, 2);
            phi.reinit(cell);
            for q in 0..phi.n_q_points() {
                phi.submit_vector_value(q, f.value(phi.quadrature_point(q), time));
            }
            phi.integrate_scatter(out);
        });
    }

    /// `dst = G p` including pressure Dirichlet data at `time`.
    pub fn evaluate_pressure_gradient_term(&self, dst: &mut DofVector, src: &DofVector, time: f64) {
        self.gradient.evaluate(dst, src, time);
    }

    /// Vorticity of `velocity` at the nodes, stored in component 0.
    pub fn compute_vorticity(&self, dst: &mut DofVector, velocity: &DofVector) {
        let mf = self.matrix_free.as_ref();
        let mut phi = CellIntegrator::new(mf, 2);
        for k in 0..mf.n_elements() {
            phi.reinit(k);
            phi.gather_evaluate(velocity, true);
            for q in 0..phi.n_q_points() {
                dst.set(k, 0, q, vorticity_2d(phi.get_vector_gradient(q)));
                dst.set(k, 1, q, 0.0);
            }
        }
    }

    /// Boundary-data part of the viscous term at `time`.
    pub fn rhs_add_viscous_term(&self, dst: &mut DofVector, time: f64) -> Result<()> {
        self.momentum.viscous_operator().rhs_add(dst, time)
    }

    pub fn rhs_ppe_laplace_add(&self, dst: &mut DofVector, time: f64) {
        self.laplace.rhs_add(dst, time);
    }

    /// Solve the pressure Poisson equation `L p = src`; the initial guess is
    /// taken from `dst`.
    pub fn solve_pressure(&mut self, dst: &mut DofVector, src: &DofVector, update_preconditioner: bool) -> SolverResult {
        if update_preconditioner {
            self.preconditioner_pressure.update(&self.laplace);
        }
        let singular = self.laplace.is_singular();
        let solver = ConjugateGradient::new(self.param.solver_data_pressure_poisson).with_zero_mean(singular);
        let result = solver.solve(&self.laplace, src, dst, &self.preconditioner_pressure);
        if singular {
            dst.set_zero_mean_value();
        }
        debug!(iterations = result.iterations, residual = result.residual_norm, "pressure Poisson solve");
        result
    }

    pub fn apply_helmholtz_operator(&self, dst: &mut DofVector, src: &DofVector) {
        self.momentum.vmult(dst, src);
    }

    /// Solve `(s M + V) u = rhs` at `time`; the initial guess is taken from
    /// `dst`.
    pub fn solve_viscous(
        &mut self,
        dst: &mut DofVector,
        rhs: &DofVector,
        update_preconditioner: bool,
        scaling_factor: f64,
        time: f64,
    ) -> Result<SolverResult> {
        self.momentum.set_scaling_factor_mass_matrix(scaling_factor);
        self.momentum.set_time(time);
        if update_preconditioner {
            self.preconditioner_viscous.update(&self.momentum)?;
        }
        let solver = ConjugateGradient::new(self.param.solver_data_viscous);
        let result = solver.solve(&self.momentum, rhs, dst, &self.preconditioner_viscous);
        debug!(iterations = result.iterations, residual = result.residual_norm, "viscous solve");
        Ok(result)
    }

    pub fn grid_velocity(&self) -> &DofVector {
        &self.grid_velocity
    }

    pub fn set_grid_velocity(&mut self, velocity: &DofVector) -> Result<()> {
        if !velocity.same_layout(&self.grid_velocity) {
            return Err(NsError::dimension_mismatch(self.grid_velocity.len(), velocity.len()));
        }
        self.grid_velocity.equ(velocity);
        Ok(())
    }

    /// Recompute the geometry of the finest mesh after the hierarchy moved
    /// and rebind every operator and preconditioner to it.
    pub fn update_after_grid_motion(&mut self) -> Result<()> {
        let mut context = (*self.matrix_free).clone();
        context.update_mapping(self.hierarchy.read().finest());
        let mf = Arc::new(context);
        self.mass.reinit(Arc::clone(&mf));
        self.laplace.update_after_mesh_movement(Arc::clone(&mf));
        self.divergence.update_after_mesh_movement(Arc::clone(&mf));
        self.gradient.update_after_mesh_movement(Arc::clone(&mf));
        self.convective.update_after_mesh_movement(Arc::clone(&mf));
        self.momentum.update_after_mesh_movement(Arc::clone(&mf));
        self.matrix_free = mf;
        self.preconditioner_pressure.update(&self.laplace);
        self.preconditioner_viscous.update_after_grid_motion(&self.momentum)
    }

    /// Multigrid preconditioner of the viscous step, if selected.
    pub fn viscous_multigrid(&self) -> Option<&MultigridPreconditionerMomentum> {
        self.preconditioner_viscous.multigrid()
    }
}
