//! Space-time functions for boundary data, body forces and initial fields.
//!
//! Closures `Fn((f64, f64), f64) -> f64` and `Fn((f64, f64), f64) -> [f64; 2]`
//! implement [`ScalarFunction`] and [`VectorFunction`] directly.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{NsError, Result};

/// Physical point `(x, y)`.
pub type Point = (f64, f64);

pub trait ScalarFunction: Send + Sync {
    fn value(&self, p: Point, time: f64) -> f64;
}

pub trait VectorFunction: Send + Sync {
    fn value(&self, p: Point, time: f64) -> [f64; 2];
}

impl<F> ScalarFunction for F
where
    F: Fn(Point, f64) -> f64 + Send + Sync,
{
    fn value(&self, p: Point, time: f64) -> f64 {
        self(p, time)
    }
}

impl<F> VectorFunction for F
where
    F: Fn(Point, f64) -> [f64; 2] + Send + Sync,
{
    fn value(&self, p: Point, time: f64) -> [f64; 2] {
        self(p, time)
    }
}

/// Identically zero, usable as scalar or vector function.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZeroFunction;

impl ScalarFunction for ZeroFunction {
    fn value(&self, _p: Point, _time: f64) -> f64 {
        0.0
    }
}

impl VectorFunction for ZeroFunction {
    fn value(&self, _p: Point, _time: f64) -> [f64; 2] {
        [0.0, 0.0]
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConstantScalar(pub f64);

impl ScalarFunction for ConstantScalar {
    fn value(&self, _p: Point, _time: f64) -> f64 {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ConstantVector(pub [f64; 2]);

impl VectorFunction for ConstantVector {
    fn value(&self, _p: Point, _time: f64) -> [f64; 2] {
        self.0
    }
}

/// Dirichlet velocity values supplied point-wise by an external coupling,
/// keyed by (boundary-face index, face quadrature index).
#[derive(Clone, Debug, Default)]
pub struct CachedBoundaryData {
    values: HashMap<(usize, usize), [f64; 2]>,
}

impl CachedBoundaryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, face: usize, q: usize, value: [f64; 2]) {
        self.values.insert((face, q), value);
    }

    pub fn get(&self, face: usize, q: usize) -> Option<[f64; 2]> {
        self.values.get(&(face, q)).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Handle shared between the boundary descriptor and the coupling code.
pub type SharedCachedData = Arc<RwLock<CachedBoundaryData>>;

/// Uniform access to analytic and cached boundary data.
pub struct FunctionEvaluator;

impl FunctionEvaluator {
    #[inline]
    pub fn value(f: &dyn VectorFunction, p: Point, time: f64) -> [f64; 2] {
        f.value(p, time)
    }

    #[inline]
    pub fn scalar_value(f: &dyn ScalarFunction, p: Point, time: f64) -> f64 {
        f.value(p, time)
    }

    pub fn value_cached(data: &CachedBoundaryData, face: usize, q: usize) -> Result<[f64; 2]> {
        data.get(face, q)
            .ok_or(NsError::MissingCachedData { face, q })
    }
}

/// Analytic fields of a flow problem.
#[derive(Clone)]
pub struct FieldFunctions {
    pub initial_solution_velocity: Arc<dyn VectorFunction>,
    pub initial_solution_pressure: Arc<dyn ScalarFunction>,
    pub analytical_solution_pressure: Option<Arc<dyn ScalarFunction>>,
    /// Body force `f`
    pub right_hand_side: Arc<dyn VectorFunction>,
}

impl Default for FieldFunctions {
    fn default() -> Self {
        Self {
            initial_solution_velocity: Arc::new(ZeroFunction),
            initial_solution_pressure: Arc::new(ZeroFunction),
            analytical_solution_pressure: None,
            right_hand_side: Arc::new(ZeroFunction),
        }
    }
}

impl FieldFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_velocity(mut self, f: Arc<dyn VectorFunction>) -> Self {
        self.initial_solution_velocity = f;
        self
    }

    pub fn with_initial_pressure(mut self, f: Arc<dyn ScalarFunction>) -> Self {
        self.initial_solution_pressure = f;
        self
    }

    pub fn with_analytical_pressure(mut self, f: Arc<dyn ScalarFunction>) -> Self {
        self.analytical_solution_pressure = Some(f);
        self
    }

    pub fn with_right_hand_side(mut self, f: Arc<dyn VectorFunction>) -> Self {
        self.right_hand_side = f;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closures_are_functions() {
        let f: Arc<dyn VectorFunction> = Arc::new(|p: Point, t: f64| [p.0 + t, p.1]);
        assert_eq!(FunctionEvaluator::value(f.as_ref(), (1.0, 2.0), 0.5), [1.5, 2.0]);
        let g: Arc<dyn ScalarFunction> = Arc::new(|p: Point, _t: f64| p.0 * p.1);
        assert_eq!(g.value((2.0, 3.0), 0.0), 6.0);
    }

    #[test]
    fn test_cached_lookup() {
        let shared: SharedCachedData = Arc::new(RwLock::new(CachedBoundaryData::new()));
        shared.write().set(3, 1, [0.5, -0.5]);
        let snapshot = shared.read();
        assert_eq!(
            FunctionEvaluator::value_cached(&snapshot, 3, 1),
            Ok([0.5, -0.5])
        );
        assert_eq!(
            FunctionEvaluator::value_cached(&snapshot, 3, 2),
            Err(NsError::MissingCachedData { face: 3, q: 2 })
        );
    }
}
