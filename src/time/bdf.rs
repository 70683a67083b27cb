//! Backward differentiation and extrapolation coefficients.
//!
//! With a constant time step the BDF scheme of order `J` approximates
//!
//! ```text
//! ∂u/∂t (t_{n+1}) ≈ (γ0 u_{n+1} - Σ_{i<J} α_i u_{n-i}) / Δt
//! ```
//!
//! and explicit terms are extrapolated as `Σ_{i<J} β_i f(u_{n-i})`.
//! During start-up the first steps can run with lower order since the
//! history is not yet filled.

use crate::error::{NsError, Result};

/// Highest supported order.
pub const MAX_ORDER: usize = 2;

fn check_order(order: usize) -> Result<()> {
    if order == 0 || order > MAX_ORDER {
        return Err(NsError::invalid_parameter(format!(
            "time integrator order {order} not in 1..={MAX_ORDER}"
        )));
    }
    Ok(())
}

/// Order used at `step` (counted from 1).
pub fn order_at_step(order: usize, step: usize, start_with_low_order: bool) -> usize {
    if start_with_low_order { order.min(step.max(1)) } else { order }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BdfCoefficients {
    order: usize,
    start_with_low_order: bool,
    gamma0: f64,
    alpha: Vec<f64>,
}

impl BdfCoefficients {
    pub fn new(order: usize, start_with_low_order: bool) -> Result<Self> {
        check_order(order)?;
        let mut bdf = Self {
            order,
            start_with_low_order,
            gamma0: 0.0,
            alpha: vec![0.0; order],
        };
        bdf.update(1);
        Ok(bdf)
    }

    /// Select the coefficients for `step`. Slots beyond the current order
    /// are zero.
    pub fn update(&mut self, step: usize) {
        let current = order_at_step(self.order, step, self.start_with_low_order);
        self.alpha.fill(0.0);
        match current {
            1 => {
                self.gamma0 = 1.0;
                self.alpha[0] = 1.0;
            }
            _ => {
                self.gamma0 = 1.5;
                self.alpha[0] = 2.0;
                self.alpha[1] = -0.5;
            }
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn gamma0(&self) -> f64 {
        self.gamma0
    }

    pub fn alpha(&self, i: usize) -> f64 {
        self.alpha[i]
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alpha
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExtrapolationCoefficients {
    order: usize,
    start_with_low_order: bool,
    beta: Vec<f64>,
}

impl ExtrapolationCoefficients {
    pub fn new(order: usize, start_with_low_order: bool) -> Result<Self> {
        check_order(order)?;
        let mut extra = Self {
            order,
            start_with_low_order,
            beta: vec![0.0; order],
        };
        extra.update(1);
        Ok(extra)
    }

    pub fn update(&mut self, step: usize) {
        let current = order_at_step(self.order, step, self.start_with_low_order);
        self.beta.fill(0.0);
        match current {
            1 => self.beta[0] = 1.0,
            _ => {
                self.beta[0] = 2.0;
                self.beta[1] = -1.0;
            }
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn beta(&self, i: usize) -> f64 {
        self.beta[i]
    }

    pub fn betas(&self) -> &[f64] {
        &self.beta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistency() {
        // exact for constants: γ0 = Σ α_i, Σ β_i = 1
        for order in 1..=MAX_ORDER {
            let bdf = BdfCoefficients::new(order, false).unwrap();
            let sum: f64 = bdf.alphas().iter().sum();
            assert!((bdf.gamma0() - sum).abs() < 1e-15);
            let extra = ExtrapolationCoefficients::new(order, false).unwrap();
            assert!((extra.betas().iter().sum::<f64>() - 1.0).abs() < 1e-15);
        }
    }

    #[test]
    fn test_bdf2_differentiates_quadratics() {
        // u(t) = t², t_{n+1} = 2, dt = 1
        let bdf = BdfCoefficients::new(2, false).unwrap();
        let dudt = bdf.gamma0() * 4.0 - bdf.alpha(0) * 1.0 - bdf.alpha(1) * 0.0;
        assert!((dudt - 4.0).abs() < 1e-14);
        // linear extrapolation of u(t) = 3t + 1 from t = 1, 0 to t = 2
        let extra = ExtrapolationCoefficients::new(2, false).unwrap();
        assert!((extra.beta(0) * 4.0 + extra.beta(1) * 1.0 - 7.0).abs() < 1e-14);
    }

    #[test]
    fn test_start_up_with_low_order() {
        let mut bdf = BdfCoefficients::new(2, true).unwrap();
        assert_eq!(bdf.gamma0(), 1.0);
        assert_eq!(bdf.alphas(), &[1.0, 0.0]);
        bdf.update(2);
        assert_eq!(bdf.gamma0(), 1.5);

        let mut extra = ExtrapolationCoefficients::new(2, true).unwrap();
        assert_eq!(extra.betas(), &[1.0, 0.0]);
        extra.update(5);
        assert_eq!(extra.betas(), &[2.0, -1.0]);
    }

    #[test]
    fn test_unsupported_order() {
        assert!(BdfCoefficients::new(0, true).is_err());
        assert!(ExtrapolationCoefficients::new(3, true).is_err());
    }
}
