//! Time integration of the dual-splitting scheme.
//!
//! Each step advances from `t_n` to `t_{n+1} = t_n + Δt` in four
//! substeps:
//!
//! 1. explicit convective step for the intermediate velocity `û`,
//! 2. pressure Poisson equation with the consistent Neumann condition,
//! 3. projection `û ← û - Δt/γ0 ∇p`,
//! 4. implicit viscous step `(γ0/Δt M + V) u_{n+1} = γ0/Δt M û`.
//!
//! History vectors are ordered most recent first.

use tracing::{debug, info, warn};

use crate::ale::{MeshMotion, compute_grid_velocity};
use crate::error::Result;
use crate::navier_stokes::{DualSplittingOperator, Parameters};
use crate::solver::SolverResult;
use crate::vector::DofVector;

use super::bdf::{BdfCoefficients, ExtrapolationCoefficients};

/// Outcome of one time step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepReport {
    pub step_number: usize,
    /// Time reached by the step
    pub time: f64,
    pub pressure: SolverResult,
    pub viscous: SolverResult,
}

impl StepReport {
    pub fn is_converged(&self) -> bool {
        self.pressure.is_converged() && self.viscous.is_converged()
    }
}

pub struct TimeIntDualSplitting {
    operator: DualSplittingOperator,
    param: Parameters,
    bdf: BdfCoefficients,
    extra: ExtrapolationCoefficients,

    time: f64,
    dt: f64,
    step_number: usize,

    velocity: Vec<DofVector>,
    pressure: DofVector,
    vorticity: Vec<DofVector>,
    /// Nodal velocity Dirichlet data at the history times
    velocity_dbc: Vec<DofVector>,

    mesh_motion: Option<Box<dyn MeshMotion>>,
    grid_coordinates: Vec<DofVector>,
}

impl TimeIntDualSplitting {
    /// Prescribe the initial fields at the start time. Without low-order
    /// start-up the history is filled from the initial fields at the
    /// previous times `t_0 - i Δt`.
    pub fn new(operator: DualSplittingOperator) -> Result<Self> {
        let param = operator.core().param().clone();
        let order = param.order_time_integrator;
        let bdf = BdfCoefficients::new(order, param.start_with_low_order)?;
        let extra = ExtrapolationCoefficients::new(order, param.start_with_low_order)?;
        let dt = param.time_step_size;
        let t0 = param.start_time;

        let mut velocity = Vec::with_capacity(order);
        let mut vorticity = Vec::with_capacity(order);
        let mut velocity_dbc = Vec::with_capacity(order);
        let mut pressure = operator.create_pressure_vector();
        for i in 0..order {
            let t_i = t0 - i as f64 * dt;
            let mut u = operator.create_velocity_vector();
            if i == 0 {
                operator.prescribe_initial_conditions(&mut u, &mut pressure, t_i);
            } else {
                let mut p = operator.create_pressure_vector();
                operator.prescribe_initial_conditions(&mut u, &mut p, t_i);
            }
            let mut omega = operator.create_velocity_vector();
            operator.compute_vorticity(&mut omega, &u);
            let mut dbc = operator.create_velocity_vector();
            operator.interpolate_velocity_dirichlet_bc(&mut dbc, t_i)?;
            velocity.push(u);
            vorticity.push(omega);
            velocity_dbc.push(dbc);
        }

        info!(
            order,
            dt,
            start_time = t0,
            end_time = param.end_time,
            "dual-splitting time integrator initialized"
        );
        Ok(Self {
            operator,
            param,
            bdf,
            extra,
            time: t0,
            dt,
            step_number: 1,
            velocity,
            pressure,
            vorticity,
            velocity_dbc,
            mesh_motion: None,
            grid_coordinates: Vec::new(),
        })
    }

    /// Attach a moving mesh. The motion is placed at the history times to
    /// record the coordinate history.
    pub fn with_mesh_motion(mut self, mut motion: Box<dyn MeshMotion>) -> Result<Self> {
        let order = self.bdf.order();
        self.grid_coordinates.clear();
        for i in 0..order {
            motion.move_grid(self.time - i as f64 * self.dt)?;
            motion.update_matrix_free_after_grid_motion()?;
            let mut x = self.operator.create_velocity_vector();
            motion.fill_grid_coordinates_vector(&mut x)?;
            self.grid_coordinates.push(x);
        }
        motion.move_grid(self.time)?;
        motion.update_matrix_free_after_grid_motion()?;
        self.operator.update_after_grid_motion()?;
        self.mesh_motion = Some(motion);
        Ok(self)
    }

    pub fn operator(&self) -> &DualSplittingOperator {
        &self.operator
    }

    pub fn operator_mut(&mut self) -> &mut DualSplittingOperator {
        &mut self.operator
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn time_step_size(&self) -> f64 {
        self.dt
    }

    /// Number of the next step, counted from 1.
    pub fn step_number(&self) -> usize {
        self.step_number
    }

    pub fn velocity(&self) -> &DofVector {
        &self.velocity[0]
    }

    pub fn pressure(&self) -> &DofVector {
        &self.pressure
    }

    pub fn vorticity(&self) -> &DofVector {
        &self.vorticity[0]
    }

    pub fn finished(&self) -> bool {
        self.time >= self.param.end_time - 1.0e-12 * self.dt
    }

    /// Advance until the end time; the callback sees every report.
    pub fn timeloop<C>(&mut self, mut callback: Option<C>) -> Result<(f64, usize)>
    where
        C: FnMut(&StepReport, &Self),
    {
        let mut n_steps = 0;
        while !self.finished() {
            let report = self.do_timestep()?;
            n_steps += 1;
            if let Some(ref mut cb) = callback {
                cb(&report, self);
            }
        }
        info!(time = self.time, n_steps, "time loop finished");
        Ok((self.time, n_steps))
    }

    pub fn do_timestep(&mut self) -> Result<StepReport> {
        self.bdf.update(self.step_number);
        self.extra.update(self.step_number);
        let t_np = self.time + self.dt;

        if self.mesh_motion.is_some() {
            self.move_mesh(t_np)?;
        }

        let mut velocity_np = self.convective_step(t_np)?;
        let pressure = self.pressure_step(&velocity_np, t_np)?;
        self.projection_step(&mut velocity_np, t_np);
        let viscous = self.viscous_step(&mut velocity_np, t_np)?;
        self.push_history(velocity_np, t_np)?;

        let report = StepReport {
            step_number: self.step_number,
            time: t_np,
            pressure,
            viscous,
        };
        if !report.is_converged() {
            warn!(
                step = report.step_number,
                pressure_iterations = pressure.iterations,
                viscous_iterations = viscous.iterations,
                "linear solver did not converge"
            );
        }
        debug!(
            step = report.step_number,
            time = t_np,
            pressure_iterations = pressure.iterations,
            viscous_iterations = viscous.iterations,
            "time step done"
        );
        self.time = t_np;
        self.step_number += 1;
        Ok(report)
    }

    fn move_mesh(&mut self, t_np: f64) -> Result<()> {
        let Some(motion) = self.mesh_motion.as_mut() else {
            return Ok(());
        };
        motion.move_grid(t_np)?;
        motion.update_matrix_free_after_grid_motion()?;
        let mut x_np = self.operator.create_velocity_vector();
        motion.fill_grid_coordinates_vector(&mut x_np)?;

        let mut w = self.operator.create_velocity_vector();
        compute_grid_velocity(
            &mut w,
            self.bdf.gamma0(),
            self.bdf.alphas(),
            self.dt,
            &x_np,
            &self.grid_coordinates,
        )?;
        self.operator.update_after_grid_motion()?;
        self.operator.set_grid_velocity(&w)?;

        self.grid_coordinates.rotate_right(1);
        self.grid_coordinates[0] = x_np;
        Ok(())
    }

    fn history_time(&self, i: usize) -> f64 {
        self.time - i as f64 * self.dt
    }

    /// `û = Δt/γ0 (Σ α_i/Δt u_i + M⁻¹(f(t_{n+1}) - Σ β_i C(u_i)))`
    fn convective_step(&self, t_np: f64) -> Result<DofVector> {
        let op = &self.operator;
        let mut rhs = op.create_velocity_vector();
        if self.param.convective_problem() {
            let mut convective = op.create_velocity_vector();
            for (i, u) in self.velocity.iter().enumerate() {
                let beta = self.extra.beta(i);
                if beta == 0.0 {
                    continue;
                }
                op.evaluate_convective_term(&mut convective, u, self.history_time(i))?;
                rhs.axpy(-beta, &convective);
            }
        }
        if self.param.right_hand_side {
            op.evaluate_add_body_force_term(&mut rhs, t_np);
        }

        let mut velocity_np = op.create_velocity_vector();
        op.apply_inverse_mass(&mut velocity_np, &rhs);
        for (i, u) in self.velocity.iter().enumerate() {
            velocity_np.axpy(self.bdf.alpha(i) / self.dt, u);
        }
        velocity_np.scale(self.dt / self.bdf.gamma0());
        Ok(velocity_np)
    }

    fn pressure_step(&mut self, velocity_np: &DofVector, t_np: f64) -> Result<SolverResult> {
        let rhs = self.pressure_rhs(velocity_np, t_np)?;
        let update = self.param.update_preconditioner_pressure_poisson;
        Ok(self.operator.solve_pressure(&mut self.pressure, &rhs, update))
    }

    /// Right-hand side of the pressure Poisson equation at `t_{n+1}`.
    pub fn pressure_rhs(&self, velocity_np: &DofVector, t_np: f64) -> Result<DofVector> {
        let op = &self.operator;
        let gamma0 = self.bdf.gamma0();
        let mut rhs = op.create_pressure_vector();
        op.apply_velocity_divergence_term(&mut rhs, velocity_np);
        rhs.scale(-gamma0 / self.dt);

        // velocity Dirichlet data of the divergence term at the history times;
        // on a moving mesh only the stored nodal data is consistent
        let mut temp = op.create_pressure_vector();
        for i in 0..self.velocity.len() {
            let alpha = self.bdf.alpha(i);
            if alpha == 0.0 {
                continue;
            }
            temp.fill(0.0);
            if self.param.ale_formulation {
                op.rhs_velocity_divergence_term_dirichlet_bc_from_dof_vector(&mut temp, &self.velocity_dbc[i]);
            } else {
                op.rhs_velocity_divergence_term_dirichlet_bc(&mut temp, self.history_time(i))?;
            }
            rhs.axpy(alpha / self.dt, &temp);
        }

        let convective = self.param.convective_problem();
        if convective {
            for (i, u) in self.velocity.iter().enumerate() {
                let beta = self.extra.beta(i);
                if beta == 0.0 {
                    continue;
                }
                temp.fill(0.0);
                op.rhs_ppe_div_term_convective_term_add(&mut temp, u)?;
                rhs.axpy(beta, &temp);
            }
        }
        if self.param.right_hand_side {
            op.rhs_ppe_div_term_body_forces_add(&mut rhs, t_np);
        }

        op.rhs_ppe_laplace_add(&mut rhs, t_np);

        if self.param.right_hand_side {
            op.rhs_ppe_nbc_body_force_term_add(&mut rhs, t_np);
        }

        let mut dbc_np = op.create_velocity_vector();
        op.interpolate_velocity_dirichlet_bc(&mut dbc_np, t_np)?;
        let mut acceleration = dbc_np;
        acceleration.scale(gamma0);
        for (i, dbc) in self.velocity_dbc.iter().enumerate() {
            acceleration.axpy(-self.bdf.alpha(i), dbc);
        }
        acceleration.scale(1.0 / self.dt);
        op.rhs_ppe_nbc_numerical_time_derivative_add(&mut rhs, &acceleration);

        let mut vorticity = op.create_velocity_vector();
        for (i, omega) in self.vorticity.iter().enumerate() {
            vorticity.axpy(self.extra.beta(i), omega);
        }
        op.rhs_ppe_nbc_viscous_add(&mut rhs, &vorticity);

        if convective {
            for (i, u) in self.velocity.iter().enumerate() {
                let beta = self.extra.beta(i);
                if beta == 0.0 {
                    continue;
                }
                temp.fill(0.0);
                op.rhs_ppe_nbc_convective_add(&mut temp, u)?;
                rhs.axpy(beta, &temp);
            }
        }

        if op.is_pressure_level_undefined() {
            rhs.set_zero_mean_value();
        }
        Ok(rhs)
    }

    /// `û ← M⁻¹(M û - Δt/γ0 G p)`
    fn projection_step(&self, velocity_np: &mut DofVector, t_np: f64) {
        let op = &self.operator;
        let mut rhs = op.create_velocity_vector();
        op.evaluate_pressure_gradient_term(&mut rhs, &self.pressure, t_np);
        rhs.scale(-self.dt / self.bdf.gamma0());
        op.apply_mass_operator_add(&mut rhs, velocity_np);
        op.apply_inverse_mass(velocity_np, &rhs);
    }

    fn viscous_step(&mut self, velocity_np: &mut DofVector, t_np: f64) -> Result<SolverResult> {
        let op = &self.operator;
        let scaling = self.bdf.gamma0() / self.dt;
        let mut rhs = op.create_velocity_vector();
        op.apply_mass_operator(&mut rhs, velocity_np);
        rhs.scale(scaling);
        op.rhs_add_viscous_term(&mut rhs, t_np)?;

        // extrapolated initial guess
        velocity_np.fill(0.0);
        for (i, u) in self.velocity.iter().enumerate() {
            velocity_np.axpy(self.extra.beta(i), u);
        }
        let update = self.param.update_preconditioner_viscous;
        self.operator.solve_viscous(velocity_np, &rhs, update, scaling, t_np)
    }

    fn push_history(&mut self, velocity_np: DofVector, t_np: f64) -> Result<()> {
        let mut omega = self.operator.create_velocity_vector();
        self.operator.compute_vorticity(&mut omega, &velocity_np);
        let mut dbc = self.operator.create_velocity_vector();
        self.operator.interpolate_velocity_dirichlet_bc(&mut dbc, t_np)?;

        self.velocity.rotate_right(1);
        self.velocity[0] = velocity_np;
        self.vorticity.rotate_right(1);
        self.vorticity[0] = omega;
        self.velocity_dbc.rotate_right(1);
        self.velocity_dbc[0] = dbc;
        Ok(())
    }
}
