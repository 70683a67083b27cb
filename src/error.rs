//! Crate-wide error type.
//!
//! Configuration errors and consistency violations abort the run; they are
//! returned to the driver as `Err`. Iterative solvers that hit their
//! iteration cap are not errors, they report through
//! [`SolverResult`](crate::solver::SolverResult).

use thiserror::Error;

use crate::mesh::BoundaryId;

/// Errors raised while setting up or evaluating the Navier-Stokes operators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NsError {
    /// A face carries a boundary id that was never registered for the field.
    #[error("boundary id {id} is not registered for the {field} field")]
    UnknownBoundaryId { field: &'static str, id: BoundaryId },

    /// A boundary id was registered with more than one kind for one field.
    #[error("boundary id {id} is registered more than once for the {field} field")]
    DuplicateBoundaryId { field: &'static str, id: BoundaryId },

    /// A registered boundary id has no data function attached.
    #[error("no boundary data attached to id {id} of the {field} field")]
    MissingBoundaryData { field: &'static str, id: BoundaryId },

    /// The cached Dirichlet snapshot does not cover a requested face point.
    #[error("cached Dirichlet data missing for boundary face {face}, point {q}")]
    MissingCachedData { face: usize, q: usize },

    /// Multigrid operator type was left undefined.
    #[error("multigrid operator type is undefined")]
    UndefinedMultigridOperator,

    /// A convection-diffusion multigrid was requested for a problem without convection.
    #[error(
        "ReactionConvectionDiffusion multigrid requires the convective term to be active in the fine operator"
    )]
    ConvectiveTermMismatch,

    /// The convective-term formulation was left undefined.
    #[error("formulation of the convective term is undefined")]
    UndefinedFormulation,

    /// A parameter is outside its admissible range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A multigrid level has no operator attached.
    #[error("no operator attached to multigrid level {0}")]
    MissingLevelOperator(usize),

    /// Index outside the valid range.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Multigrid levels disagree on evaluation time or mass scaling.
    #[error("multigrid level {level} evaluation state drifted from the fine level")]
    EvaluationStateDrift { level: usize },

    /// Vector layouts do not match.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An optional capability was invoked but is not provided.
    #[error("{0} is not implemented for this mesh-motion provider")]
    NotImplemented(&'static str),
}

impl NsError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_id() {
        let err = NsError::UnknownBoundaryId {
            field: "velocity",
            id: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains("velocity"));
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            NsError::dimension_mismatch(3, 4),
            NsError::DimensionMismatch {
                expected: 3,
                actual: 4
            }
        );
        assert!(matches!(
            NsError::invalid_parameter("dt"),
            NsError::InvalidParameter(_)
        ));
    }
}
