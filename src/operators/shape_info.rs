//! Reference-element data for tensor-product quadrilaterals.
//!
//! Nodes are the tensor product of 1D GLL points, numbered `k = j * n_1d + i`
//! with `i` running along `r`. Quadrature is collocated with the nodes, so
//! the mass matrix is diagonal and values at quadrature points are the dof
//! values themselves.
//!
//! Face convention (counter-clockwise):
//! - Face 0 (bottom): s = -1, r from -1 to +1
//! - Face 1 (right):  r = +1, s from -1 to +1
//! - Face 2 (top):    s = +1, r from +1 to -1 (reversed)
//! - Face 3 (left):   r = -1, s from +1 to -1 (reversed)

use faer::Mat;

use crate::basis::differentiation_matrix;
use crate::polynomial::{gauss_lobatto_nodes, gauss_lobatto_weights};

/// Outward unit normal of each face of the reference square.
pub const FACE_NORMALS: [(f64, f64); 4] = [(0.0, -1.0), (1.0, 0.0), (0.0, 1.0), (-1.0, 0.0)];

/// Shape data of the degree-`k` nodal element.
#[derive(Clone, Debug)]
pub struct ShapeInfo {
    pub degree: usize,
    pub n_1d: usize,
    pub n_nodes: usize,
    pub n_face_nodes: usize,
    pub nodes_1d: Vec<f64>,
    pub weights_1d: Vec<f64>,
    /// Tensor-product weights, one per node
    pub weights: Vec<f64>,
    /// 1D derivative matrix `D[i][m] = ℓ_m'(ξ_i)`
    pub d_1d: Mat<f64>,
    /// Row-major copy of `d_1d` for the sum-factorization kernels
    d_row_major: Vec<f64>,
    /// Volume node index of every face node, counter-clockwise
    pub face_to_cell_index_nodal: [Vec<usize>; 4],
}

impl ShapeInfo {
    pub fn new(degree: usize) -> Self {
        let n_1d = degree + 1;
        let nodes_1d = gauss_lobatto_nodes(degree);
        let weights_1d = gauss_lobatto_weights(degree, &nodes_1d);
        let d_1d = differentiation_matrix(&nodes_1d);

        let mut d_row_major = vec![0.0; n_1d * n_1d];
        for i in 0..n_1d {
            for m in 0..n_1d {
                d_row_major[i * n_1d + m] = d_1d[(i, m)];
            }
        }

        let weights = (0..n_1d)
            .flat_map(|j| {
                let wj = weights_1d[j];
                weights_1d.iter().map(move |&wi| wi * wj)
            })
            .collect();

        let last = n_1d - 1;
        let face_to_cell_index_nodal = [
            (0..n_1d).collect(),
            (0..n_1d).map(|j| j * n_1d + last).collect(),
            (0..n_1d).map(|i| last * n_1d + (last - i)).collect(),
            (0..n_1d).map(|j| (last - j) * n_1d).collect(),
        ];

        Self {
            degree,
            n_1d,
            n_nodes: n_1d * n_1d,
            n_face_nodes: n_1d,
            nodes_1d,
            weights_1d,
            weights,
            d_1d,
            d_row_major,
            face_to_cell_index_nodal,
        }
    }

    #[inline]
    pub fn node_index(&self, i: usize, j: usize) -> usize {
        j * self.n_1d + i
    }

    /// Reference coordinates `(r, s)` of node `k`.
    #[inline]
    pub fn reference_node(&self, k: usize) -> (f64, f64) {
        (self.nodes_1d[k % self.n_1d], self.nodes_1d[k / self.n_1d])
    }

    /// 1D weight of face node `q`; GLL weights are symmetric so the face
    /// orientation does not matter.
    #[inline]
    pub fn face_weight(&self, q: usize) -> f64 {
        self.weights_1d[q]
    }

    /// Reference derivatives of a nodal field by sum factorization.
    pub fn gradient_reference(&self, u: &[f64], du_dr: &mut [f64], du_ds: &mut [f64]) {
        let n = self.n_1d;
        let d = &self.d_row_major;
        for j in 0..n {
            for i in 0..n {
                let mut sr = 0.0;
                let mut ss = 0.0;
                for m in 0..n {
                    sr += d[i * n + m] * u[j * n + m];
                    ss += d[j * n + m] * u[m * n + i];
                }
                du_dr[j * n + i] = sr;
                du_ds[j * n + i] = ss;
            }
        }
    }

    /// Transpose of [`gradient_reference`](Self::gradient_reference):
    /// `out += Drᵀ f_r + Dsᵀ f_s`.
    pub fn integrate_gradient_reference(&self, f_r: &[f64], f_s: &[f64], out: &mut [f64]) {
        let n = self.n_1d;
        let d = &self.d_row_major;
        for a in 0..n {
            for b in 0..n {
                let mut sum = 0.0;
                for c in 0..n {
                    sum += d[c * n + b] * f_r[a * n + c];
                    sum += d[c * n + a] * f_s[c * n + b];
                }
                out[a * n + b] += sum;
            }
        }
    }
}
