//! Physical, discretization and solver parameters of a flow problem.

use crate::error::{NsError, Result};
use crate::multigrid::{MultigridData, MultigridOperatorType};
use crate::operators::ViscosityModel;
use crate::solver::SolverData;

/// Which equations are solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EquationType {
    Stokes,
    #[default]
    NavierStokes,
}

/// Form of the convective flux `F(u)` used in the pressure boundary terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FormulationConvectiveTerm {
    #[default]
    Undefined,
    /// `∇u·u + (∇·u) u`
    DivergenceFormulation,
    /// `∇u·u`
    ConvectiveFormulation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PreconditionerPressurePoisson {
    None,
    PointJacobi,
    #[default]
    Multigrid,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PreconditionerViscous {
    None,
    InverseMassMatrix,
    PointJacobi,
    #[default]
    Multigrid,
}

/// Configuration of a dual-splitting run.
#[derive(Clone, Debug)]
pub struct Parameters {
    pub equation_type: EquationType,
    /// Form of the convective flux in the pressure boundary terms
    pub formulation_convective_term_bc: FormulationConvectiveTerm,
    /// Body force `f` is present
    pub right_hand_side: bool,
    /// Arbitrary Lagrangian-Eulerian formulation on a moving mesh
    pub ale_formulation: bool,
    pub viscosity: ViscosityModel,

    /// Polynomial degree of velocity and pressure
    pub degree: usize,
    pub ip_factor_pressure: f64,
    pub ip_factor_viscous: f64,

    pub start_time: f64,
    pub end_time: f64,
    pub time_step_size: f64,
    /// BDF order, 1 or 2
    pub order_time_integrator: usize,
    /// Take the first steps with lower order
    pub start_with_low_order: bool,

    pub solver_data_pressure_poisson: SolverData,
    pub preconditioner_pressure_poisson: PreconditionerPressurePoisson,
    pub multigrid_data_pressure_poisson: MultigridData,
    pub update_preconditioner_pressure_poisson: bool,

    pub solver_data_viscous: SolverData,
    pub preconditioner_viscous: PreconditionerViscous,
    pub multigrid_data_viscous: MultigridData,
    pub multigrid_operator_type_viscous: MultigridOperatorType,
    pub update_preconditioner_viscous: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            equation_type: EquationType::NavierStokes,
            formulation_convective_term_bc: FormulationConvectiveTerm::DivergenceFormulation,
            right_hand_side: false,
            ale_formulation: false,
            viscosity: ViscosityModel::Constant(1.0e-2),
            degree: 2,
            ip_factor_pressure: 1.0,
            ip_factor_viscous: 1.0,
            start_time: 0.0,
            end_time: 1.0,
            time_step_size: 1.0e-2,
            order_time_integrator: 2,
            start_with_low_order: true,
            solver_data_pressure_poisson: SolverData::new(1.0e-10, 1000).with_atol(1.0e-12),
            preconditioner_pressure_poisson: PreconditionerPressurePoisson::Multigrid,
            multigrid_data_pressure_poisson: MultigridData::default(),
            update_preconditioner_pressure_poisson: false,
            solver_data_viscous: SolverData::new(1.0e-10, 1000).with_atol(1.0e-12),
            preconditioner_viscous: PreconditionerViscous::InverseMassMatrix,
            multigrid_data_viscous: MultigridData::default(),
            multigrid_operator_type_viscous: MultigridOperatorType::ReactionDiffusion,
            update_preconditioner_viscous: true,
        }
    }
}

impl Parameters {
    pub fn new(viscosity: f64, degree: usize, time_step_size: f64) -> Self {
        Self {
            viscosity: ViscosityModel::Constant(viscosity),
            degree,
            time_step_size,
            ..Default::default()
        }
    }

    pub fn with_equation_type(mut self, equation_type: EquationType) -> Self {
        self.equation_type = equation_type;
        self
    }

    pub fn with_formulation_convective_term_bc(mut self, formulation: FormulationConvectiveTerm) -> Self {
        self.formulation_convective_term_bc = formulation;
        self
    }

    pub fn with_right_hand_side(mut self, enabled: bool) -> Self {
        self.right_hand_side = enabled;
        self
    }

    pub fn with_ale(mut self, enabled: bool) -> Self {
        self.ale_formulation = enabled;
        self
    }

    pub fn with_viscosity(mut self, viscosity: ViscosityModel) -> Self {
        self.viscosity = viscosity;
        self
    }

    pub fn with_time_interval(mut self, start_time: f64, end_time: f64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order_time_integrator = order;
        self
    }

    pub fn with_pressure_solver(
        mut self,
        solver: SolverData,
        preconditioner: PreconditionerPressurePoisson,
        multigrid: MultigridData,
    ) -> Self {
        self.solver_data_pressure_poisson = solver;
        self.preconditioner_pressure_poisson = preconditioner;
        self.multigrid_data_pressure_poisson = multigrid;
        self
    }

    pub fn with_viscous_solver(
        mut self,
        solver: SolverData,
        preconditioner: PreconditionerViscous,
        multigrid: MultigridData,
    ) -> Self {
        self.solver_data_viscous = solver;
        self.preconditioner_viscous = preconditioner;
        self.multigrid_data_viscous = multigrid;
        self
    }

    pub fn with_multigrid_operator_type_viscous(mut self, operator_type: MultigridOperatorType) -> Self {
        self.multigrid_operator_type_viscous = operator_type;
        self
    }

    pub fn convective_problem(&self) -> bool {
        self.equation_type == EquationType::NavierStokes
    }

    pub fn validate(&self) -> Result<()> {
        if self.degree == 0 {
            return Err(NsError::invalid_parameter("polynomial degree must be at least 1"));
        }
        if self.ip_factor_pressure <= 0.0 || self.ip_factor_viscous <= 0.0 {
            return Err(NsError::invalid_parameter("interior penalty factors must be positive"));
        }
        if self.time_step_size.is_nan() || self.time_step_size <= 0.0 {
            return Err(NsError::invalid_parameter("time step size must be positive"));
        }
        if self.end_time < self.start_time {
            return Err(NsError::invalid_parameter("end time precedes start time"));
        }
        if !(1..=2).contains(&self.order_time_integrator) {
            return Err(NsError::invalid_parameter("BDF order must be 1 or 2"));
        }
        if let ViscosityModel::Constant(nu) = self.viscosity {
            if nu.is_nan() || nu < 0.0 {
                return Err(NsError::invalid_parameter("viscosity must be non-negative"));
            }
        }
        if self.convective_problem() && self.formulation_convective_term_bc == FormulationConvectiveTerm::Undefined {
            return Err(NsError::UndefinedFormulation);
        }
        if self.preconditioner_viscous == PreconditionerViscous::Multigrid
            && self.multigrid_operator_type_viscous == MultigridOperatorType::Undefined
        {
            return Err(NsError::UndefinedMultigridOperator);
        }
        self.multigrid_data_pressure_poisson.validate()?;
        self.multigrid_data_viscous.validate()
    }
}
