//! Gauss-Lobatto-Legendre nodes and weights.

use super::legendre::legendre_and_derivative;

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAX_ITER: usize = 100;

/// The `order + 1` GLL points on [-1, 1] in ascending order.
///
/// Interior points are the roots of P'_order, found by Newton iteration on
/// `(1 - x^2) P'_N(x)` started from the Chebyshev-Gauss-Lobatto points.
pub fn gauss_lobatto_nodes(order: usize) -> Vec<f64> {
    if order == 0 {
        return vec![0.0];
    }
    let n = order;
    let mut nodes = Vec::with_capacity(n + 1);
    for j in 0..=n {
        // descending Chebyshev guess, reversed at the end
        let mut x = (std::f64::consts::PI * j as f64 / n as f64).cos();
        if j != 0 && j != n {
            for _ in 0..NEWTON_MAX_ITER {
                let (p, dp) = legendre_and_derivative(n, x);
                // q = (1-x^2) P'_N, q' = -N(N+1) P_N
                let q = (1.0 - x * x) * dp;
                let dq = -((n * (n + 1)) as f64) * p;
                let step = q / dq;
                x -= step;
                if step.abs() < NEWTON_TOL {
                    break;
                }
            }
        }
        nodes.push(x);
    }
    nodes.reverse();
    nodes[0] = -1.0;
    nodes[n] = 1.0;
    nodes
}

/// GLL quadrature weights `w_j = 2 / (N (N+1) P_N(x_j)^2)`.
pub fn gauss_lobatto_weights(order: usize, nodes: &[f64]) -> Vec<f64> {
    if order == 0 {
        return vec![2.0];
    }
    let scale = 2.0 / (order * (order + 1)) as f64;
    nodes
        .iter()
        .map(|&x| {
            let (p, _) = legendre_and_derivative(order, x);
            scale / (p * p)
        })
        .collect()
}
