//! Multigrid configuration and the level sequence it implies.

use crate::error::{NsError, Result};
use crate::solver::SolverData;

/// Coarsening strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultigridType {
    /// Geometric coarsening at fixed degree
    HMG,
    /// Polynomial coarsening on the finest mesh
    PMG,
    /// Polynomial coarsening to degree 1, then geometric coarsening
    HPMG,
}

/// How the degree drops between p-levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PSequence {
    Bisect,
    DecreaseByOne,
    GoToOne,
}

impl PSequence {
    fn next_coarser(self, degree: usize) -> usize {
        match self {
            PSequence::Bisect => (degree / 2).max(1),
            PSequence::DecreaseByOne => degree - 1,
            PSequence::GoToOne => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SmootherType {
    Chebyshev,
    Jacobi,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmootherData {
    /// Chebyshev polynomial degree or number of Jacobi sweeps
    pub iterations: usize,
    /// Chebyshev: smooth `[λmax / smoothing_range, λmax]`
    pub smoothing_range: f64,
    /// Power iterations for the eigenvalue estimate
    pub eig_cg_n_iterations: usize,
    /// Jacobi relaxation factor
    pub relaxation_factor: f64,
}

impl Default for SmootherData {
    fn default() -> Self {
        Self {
            iterations: 5,
            smoothing_range: 20.0,
            eig_cg_n_iterations: 20,
            relaxation_factor: 0.7,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CoarseGridSolver {
    /// Jacobi-preconditioned conjugate gradients
    CG,
    GMRES,
    /// Dense LU of the assembled coarse matrix
    DirectLU,
    /// Apply the level smoother only
    Smoother,
}

#[derive(Clone, Debug)]
pub struct MultigridData {
    pub multigrid_type: MultigridType,
    pub p_sequence: PSequence,
    pub smoother: SmootherType,
    pub smoother_data: SmootherData,
    pub coarse_solver: CoarseGridSolver,
    pub coarse_solver_data: SolverData,
}

impl Default for MultigridData {
    fn default() -> Self {
        Self {
            multigrid_type: MultigridType::HMG,
            p_sequence: PSequence::Bisect,
            smoother: SmootherType::Chebyshev,
            smoother_data: SmootherData::default(),
            coarse_solver: CoarseGridSolver::CG,
            coarse_solver_data: SolverData::new(1e-3, 1000).with_atol(1e-14),
        }
    }
}

impl MultigridData {
    pub fn new(multigrid_type: MultigridType) -> Self {
        Self {
            multigrid_type,
            ..Default::default()
        }
    }

    pub fn with_p_sequence(mut self, p_sequence: PSequence) -> Self {
        self.p_sequence = p_sequence;
        self
    }

    pub fn with_smoother(mut self, smoother: SmootherType, data: SmootherData) -> Self {
        self.smoother = smoother;
        self.smoother_data = data;
        self
    }

    pub fn with_coarse_solver(mut self, solver: CoarseGridSolver, data: SolverData) -> Self {
        self.coarse_solver = solver;
        self.coarse_solver_data = data;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.smoother_data.iterations == 0 {
            return Err(NsError::invalid_parameter("smoother needs at least one iteration"));
        }
        if self.smoother_data.smoothing_range <= 1.0 {
            return Err(NsError::invalid_parameter("Chebyshev smoothing range must exceed 1"));
        }
        if !(self.smoother_data.relaxation_factor > 0.0 && self.smoother_data.relaxation_factor <= 1.0) {
            return Err(NsError::invalid_parameter("Jacobi relaxation factor must lie in (0, 1]"));
        }
        if self.coarse_solver_data.max_iter == 0 {
            return Err(NsError::invalid_parameter("coarse solver needs an iteration budget"));
        }
        Ok(())
    }
}

/// Mesh level and polynomial degree of one multigrid level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MgLevelInfo {
    pub h_level: usize,
    pub degree: usize,
}

impl MgLevelInfo {
    pub fn new(h_level: usize, degree: usize) -> Self {
        Self { h_level, degree }
    }
}

/// Degrees from 1 up to `fine_degree` following `sequence`.
pub fn p_levels(fine_degree: usize, sequence: PSequence) -> Vec<usize> {
    let mut degrees = vec![fine_degree];
    let mut p = fine_degree;
    while p > 1 {
        p = sequence.next_coarser(p);
        degrees.push(p);
    }
    degrees.reverse();
    degrees
}

/// Levels ordered coarse to fine. Adjacent levels differ by exactly one
/// refinement or one degree step.
pub fn build_levels(n_h_levels: usize, fine_degree: usize, data: &MultigridData) -> Result<Vec<MgLevelInfo>> {
    if n_h_levels == 0 {
        return Err(NsError::invalid_parameter("mesh hierarchy is empty"));
    }
    if fine_degree == 0 {
        return Err(NsError::invalid_parameter("polynomial degree must be at least 1"));
    }
    let finest_h = n_h_levels - 1;
    let levels = match data.multigrid_type {
        MultigridType::HMG => (0..n_h_levels).map(|h| MgLevelInfo::new(h, fine_degree)).collect(),
        MultigridType::PMG => p_levels(fine_degree, data.p_sequence)
            .into_iter()
            .map(|p| MgLevelInfo::new(finest_h, p))
            .collect(),
        MultigridType::HPMG => {
            let mut levels: Vec<MgLevelInfo> = (0..finest_h).map(|h| MgLevelInfo::new(h, 1)).collect();
            levels.extend(
                p_levels(fine_degree, data.p_sequence)
                    .into_iter()
                    .map(|p| MgLevelInfo::new(finest_h, p)),
            );
            levels
        }
    };
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_sequences() {
        assert_eq!(p_levels(5, PSequence::Bisect), vec![1, 2, 5]);
        assert_eq!(p_levels(3, PSequence::DecreaseByOne), vec![1, 2, 3]);
        assert_eq!(p_levels(4, PSequence::GoToOne), vec![1, 4]);
        assert_eq!(p_levels(1, PSequence::Bisect), vec![1]);
    }

    #[test]
    fn test_hp_levels_coarse_to_fine() {
        let data = MultigridData::new(MultigridType::HPMG).with_p_sequence(PSequence::Bisect);
        let levels = build_levels(3, 4, &data).unwrap();
        let expected = [(0, 1), (1, 1), (2, 1), (2, 2), (2, 4)];
        assert_eq!(levels.len(), expected.len());
        for (l, (h, p)) in levels.iter().zip(expected) {
            assert_eq!((l.h_level, l.degree), (h, p));
        }
        for pair in levels.windows(2) {
            let dh = pair[1].h_level - pair[0].h_level;
            let dp = pair[1].degree != pair[0].degree;
            assert!((dh == 1 && !dp) || (dh == 0 && dp));
        }
    }

    #[test]
    fn test_validate() {
        let mut data = MultigridData::default();
        assert!(data.validate().is_ok());
        data.smoother_data.iterations = 0;
        assert!(matches!(data.validate(), Err(NsError::InvalidParameter(_))));
    }
}
