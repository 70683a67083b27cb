/// Stopping criteria.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverData {
    /// Relative tolerance on the residual norm
    pub rtol: f64,
    /// Absolute tolerance on the residual norm
    pub atol: f64,
    pub max_iter: usize,
    /// Log every iteration at trace level
    pub verbose: bool,
}

impl Default for SolverData {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
            verbose: false,
        }
    }
}

impl SolverData {
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    #[inline]
    pub(crate) fn converged(&self, residual: f64, initial: f64) -> bool {
        residual < self.atol || residual < self.rtol * initial
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    MaxIterationsReached,
    /// Search direction with vanishing energy
    Breakdown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_norm: f64,
    pub initial_residual_norm: f64,
}

impl SolverResult {
    pub fn is_converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    pub fn relative_residual(&self) -> f64 {
        if self.initial_residual_norm > 0.0 {
            self.residual_norm / self.initial_residual_norm
        } else {
            0.0
        }
    }
}
