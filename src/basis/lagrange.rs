//! Barycentric Lagrange interpolation on arbitrary 1D node sets.
//!
//! The tensor-product elements only ever need 1D matrices: the derivative
//! matrix for sum factorization and interpolation matrices between node sets
//! of different degree or between a parent interval and its halves.

use faer::Mat;

/// Barycentric weights `λ_j = 1 / Π_{m≠j} (x_j - x_m)`.
pub fn barycentric_weights(nodes: &[f64]) -> Vec<f64> {
    (0..nodes.len())
        .map(|j| {
            let prod: f64 = nodes
                .iter()
                .enumerate()
                .filter(|&(m, _)| m != j)
                .map(|(_, &xm)| nodes[j] - xm)
                .product();
            1.0 / prod
        })
        .collect()
}

/// Lagrange basis attached to a fixed set of nodes.
#[derive(Clone, Debug)]
pub struct LagrangeBasis1D {
    pub nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl LagrangeBasis1D {
    pub fn new(nodes: &[f64]) -> Self {
        Self {
            nodes: nodes.to_vec(),
            weights: barycentric_weights(nodes),
        }
    }

    pub fn n_functions(&self) -> usize {
        self.nodes.len()
    }

    /// Values of all basis functions at `x`.
    pub fn values(&self, x: f64) -> Vec<f64> {
        let n = self.nodes.len();
        if let Some(hit) = self.nodes.iter().position(|&xj| (x - xj).abs() < 1e-14) {
            let mut out = vec![0.0; n];
            out[hit] = 1.0;
            return out;
        }
        let terms: Vec<f64> = self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(&xj, &wj)| wj / (x - xj))
            .collect();
        let denom: f64 = terms.iter().sum();
        terms.into_iter().map(|t| t / denom).collect()
    }
}

/// Derivative matrix `D[i][j] = ℓ_j'(x_i)`.
///
/// Diagonal entries use the negative row sum so that constants are
/// differentiated to exactly zero.
pub fn differentiation_matrix(nodes: &[f64]) -> Mat<f64> {
    let n = nodes.len();
    let w = barycentric_weights(nodes);
    let mut d = Mat::<f64>::zeros(n, n);
    for i in 0..n {
        let mut diag = 0.0;
        for j in 0..n {
            if i != j {
                let v = (w[j] / w[i]) / (nodes[i] - nodes[j]);
                d[(i, j)] = v;
                diag -= v;
            }
        }
        d[(i, i)] = diag;
    }
    d
}

/// Interpolation matrix `M[i][j] = ℓ_j(y_i)` from the basis on `from_nodes`
/// to the points `to_points`.
pub fn interpolation_matrix(from_nodes: &[f64], to_points: &[f64]) -> Mat<f64> {
    let basis = LagrangeBasis1D::new(from_nodes);
    let mut m = Mat::<f64>::zeros(to_points.len(), from_nodes.len());
    for (i, &y) in to_points.iter().enumerate() {
        for (j, v) in basis.values(y).into_iter().enumerate() {
            m[(i, j)] = v;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::gauss_lobatto_nodes;

    #[test]
    fn test_derivative_exact_for_polynomials() {
        let nodes = gauss_lobatto_nodes(4);
        let d = differentiation_matrix(&nodes);
        let u: Vec<f64> = nodes.iter().map(|&x| x.powi(4) - 2.0 * x).collect();
        for i in 0..nodes.len() {
            let du: f64 = (0..nodes.len()).map(|j| d[(i, j)] * u[j]).sum();
            let exact = 4.0 * nodes[i].powi(3) - 2.0;
            assert!((du - exact).abs() < 1e-12, "node {}: {} vs {}", i, du, exact);
        }
    }

    #[test]
    fn test_interpolation_reproduces_polynomials() {
        let coarse = gauss_lobatto_nodes(2);
        let points = [-0.9, -0.25, 0.1, 0.77];
        let m = interpolation_matrix(&coarse, &points);
        let u: Vec<f64> = coarse.iter().map(|&x| 3.0 * x * x - x + 0.5).collect();
        for (i, &y) in points.iter().enumerate() {
            let v: f64 = (0..3).map(|j| m[(i, j)] * u[j]).sum();
            assert!((v - (3.0 * y * y - y + 0.5)).abs() < 1e-13);
        }
    }

    #[test]
    fn test_values_at_nodes_are_cardinal() {
        let basis = LagrangeBasis1D::new(&gauss_lobatto_nodes(3));
        let v = basis.values(basis.nodes[2]);
        assert_eq!(v, vec![0.0, 0.0, 1.0, 0.0]);
    }
}
