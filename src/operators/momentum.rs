//! Momentum operator `s M + V [+ C'(w)]`: the operator of the implicit
//! viscous step and of the multigrid levels that precondition it.
//!
//! The evaluation state (time and mass-matrix scaling) is versioned so a
//! hierarchy of level operators can verify it stays in sync.

use std::sync::Arc;

use super::convective::ConvectiveOperator;
use super::mass::MassOperator;
use super::matrix_free::MatrixFreeContext;
use super::viscous::{ViscosityModel, ViscousOperator, ViscousOperatorData};
use crate::boundary::BoundaryDescriptorU;
use crate::error::{NsError, Result};
use crate::vector::DofVector;

#[derive(Clone, Debug)]
pub struct MomentumOperatorData {
    pub unsteady_problem: bool,
    pub viscous_problem: bool,
    pub convective_problem: bool,
    pub ip_factor_viscous: f64,
    pub viscosity: ViscosityModel,
}

impl Default for MomentumOperatorData {
    fn default() -> Self {
        Self {
            unsteady_problem: true,
            viscous_problem: true,
            convective_problem: false,
            ip_factor_viscous: 1.0,
            viscosity: ViscosityModel::Constant(1.0),
        }
    }
}

/// Parameters the operator is evaluated with. `version` increases with
/// every change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OperatorState {
    pub time: f64,
    pub scaling_factor_mass_matrix: f64,
    pub version: u64,
}

impl Default for OperatorState {
    fn default() -> Self {
        Self {
            time: 0.0,
            scaling_factor_mass_matrix: 1.0,
            version: 0,
        }
    }
}

impl OperatorState {
    /// Same time and scaling, regardless of version.
    pub fn same_parameters(&self, other: &OperatorState) -> bool {
        self.time == other.time && self.scaling_factor_mass_matrix == other.scaling_factor_mass_matrix
    }
}

#[derive(Clone)]
pub struct MomentumOperator {
    matrix_free: Arc<MatrixFreeContext>,
    data: MomentumOperatorData,
    mass: MassOperator,
    viscous: ViscousOperator,
    convective: Option<ConvectiveOperator>,
    state: OperatorState,
    velocity_linearization: DofVector,
}

impl MomentumOperator {
    pub fn new(
        matrix_free: Arc<MatrixFreeContext>,
        descriptor: &BoundaryDescriptorU,
        data: MomentumOperatorData,
    ) -> Result<Self> {
        if !(data.unsteady_problem || data.viscous_problem || data.convective_problem) {
            return Err(NsError::invalid_parameter("momentum operator has no terms"));
        }
        let viscous = ViscousOperator::new(
            Arc::clone(&matrix_free),
            descriptor,
            ViscousOperatorData {
                ip_factor: data.ip_factor_viscous,
                viscosity: data.viscosity.clone(),
            },
        )?;
        let convective = if data.convective_problem {
            Some(ConvectiveOperator::new(Arc::clone(&matrix_free), descriptor)?)
        } else {
            None
        };
        Ok(Self {
            mass: MassOperator::new(Arc::clone(&matrix_free)),
            velocity_linearization: matrix_free.create_vector(2),
            matrix_free,
            data,
            viscous,
            convective,
            state: OperatorState::default(),
        })
    }

    pub fn data(&self) -> &MomentumOperatorData {
        &self.data
    }

    pub fn matrix_free(&self) -> &Arc<MatrixFreeContext> {
        &self.matrix_free
    }

    pub fn viscous_operator(&self) -> &ViscousOperator {
        &self.viscous
    }

    pub fn state(&self) -> OperatorState {
        self.state
    }

    pub fn time(&self) -> f64 {
        self.state.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.state.time = time;
        self.state.version += 1;
    }

    pub fn get_scaling_factor_mass_matrix(&self) -> f64 {
        self.state.scaling_factor_mass_matrix
    }

    pub fn set_scaling_factor_mass_matrix(&mut self, factor: f64) {
        self.state.scaling_factor_mass_matrix = factor;
        self.state.version += 1;
    }

    /// Copy time and scaling from another operator; the version follows.
    pub fn set_state(&mut self, state: OperatorState) {
        self.state = state;
    }

    /// Store a copy of the linearization velocity of the convective term.
    pub fn set_velocity_copy(&mut self, velocity: &DofVector) -> Result<()> {
        if !velocity.same_layout(&self.velocity_linearization) {
            return Err(NsError::dimension_mismatch(
                self.velocity_linearization.len(),
                velocity.len(),
            ));
        }
        self.velocity_linearization.equ(velocity);
        Ok(())
    }

    pub fn get_velocity(&self) -> &DofVector {
        &self.velocity_linearization
    }

    /// Rebind to recomputed geometry. Boundary faces and their kinds are
    /// topological and kept.
    pub fn update_after_mesh_movement(&mut self, matrix_free: Arc<MatrixFreeContext>) {
        self.mass.reinit(Arc::clone(&matrix_free));
        self.viscous.update_after_mesh_movement(Arc::clone(&matrix_free));
        if let Some(c) = self.convective.as_mut() {
            c.update_after_mesh_movement(Arc::clone(&matrix_free));
        }
        self.matrix_free = matrix_free;
    }

    pub fn create_vector(&self) -> DofVector {
        self.matrix_free.create_vector(2)
    }

    /// `dst = (s M + V + C'(w)) src`, each term only if active.
    pub fn vmult(&self, dst: &mut DofVector, src: &DofVector) {
        dst.fill(0.0);
        if self.data.unsteady_problem {
            self.mass
                .apply_scale_add(dst, self.state.scaling_factor_mass_matrix, src);
        }
        if self.data.viscous_problem {
            self.viscous.apply_add(dst, src);
        }
        if let Some(c) = &self.convective {
            c.apply_linearized_add(dst, src, &self.velocity_linearization);
        }
    }

    /// Boundary-data contribution of the viscous term at the current time.
    pub fn rhs_add(&self, dst: &mut DofVector) -> Result<()> {
        if self.data.viscous_problem {
            self.viscous.rhs_add(dst, self.state.time)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::ZeroFunction;
    use crate::mesh::Mesh2D;

    fn walls() -> BoundaryDescriptorU {
        (1..=4).fold(BoundaryDescriptorU::new(), |d, id| d.with_dirichlet(id, Arc::new(ZeroFunction)))
    }

    fn context() -> Arc<MatrixFreeContext> {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        Arc::new(MatrixFreeContext::new(&mesh, 2))
    }

    #[test]
    fn test_state_versioning() {
        let mut op = MomentumOperator::new(context(), &walls(), MomentumOperatorData::default()).unwrap();
        let v0 = op.state().version;
        op.set_time(0.5);
        op.set_scaling_factor_mass_matrix(20.0);
        assert_eq!(op.state().version, v0 + 2);
        assert_eq!(op.time(), 0.5);
        assert_eq!(op.get_scaling_factor_mass_matrix(), 20.0);
    }

    #[test]
    fn test_mass_only_operator_is_scaled_mass() {
        let mf = context();
        let data = MomentumOperatorData {
            viscous_problem: false,
            ..Default::default()
        };
        let mut op = MomentumOperator::new(Arc::clone(&mf), &walls(), data).unwrap();
        op.set_scaling_factor_mass_matrix(3.0);
        let mut one = op.create_vector();
        one.fill(1.0);
        let mut dst = op.create_vector();
        op.vmult(&mut dst, &one);
        let total: f64 = dst.as_slice().iter().sum();
        assert!((total - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_copy_checks_layout() {
        let mf = context();
        let data = MomentumOperatorData {
            convective_problem: true,
            ..Default::default()
        };
        let mut op = MomentumOperator::new(Arc::clone(&mf), &walls(), data).unwrap();
        let wrong = mf.create_vector(1);
        assert!(matches!(
            op.set_velocity_copy(&wrong),
            Err(NsError::DimensionMismatch { .. })
        ));
        let mut w = mf.create_vector(2);
        w.fill(0.25);
        op.set_velocity_copy(&w).unwrap();
        assert_eq!(op.get_velocity().get(0, 1, 0), 0.25);
    }
}
