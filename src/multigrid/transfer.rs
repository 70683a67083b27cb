//! Transfer between adjacent multigrid levels.
//!
//! Prolongation is the exact embedding of the coarse polynomial space
//! into the fine one: tensor-product interpolation, either into the four
//! children of a cell (h) or onto the nodes of a higher degree (p).
//! Restriction is its transpose. [`LevelTransfer::interpolate`] is the
//! nodal fine→coarse interpolation used for fields such as the
//! linearization velocity, which must be sampled rather than integrated.

use faer::Mat;

use crate::basis::{LagrangeBasis1D, interpolation_matrix};
use crate::mesh::CHILD_OFFSETS;
use crate::polynomial::gauss_lobatto_nodes;
use crate::vector::DofVector;

/// 1D matrices stored row-major, `rows x cols`.
#[derive(Clone, Debug)]
struct Matrix1D {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl Matrix1D {
    fn from_mat(m: &Mat<f64>) -> Self {
        let (rows, cols) = (m.nrows(), m.ncols());
        let mut values = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                values.push(m[(i, j)]);
            }
        }
        Self { rows, cols, values }
    }

    #[inline]
    fn at(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.cols + j]
    }
}

/// `out[(j, i)] += Σ_ab ax[i][a] ay[j][b] u[(b, a)]`, node `(i, j)` at `j * n + i`.
fn tensor_apply_add(ax: &Matrix1D, ay: &Matrix1D, u: &[f64], out: &mut [f64]) {
    let (n_out, n_in) = (ax.rows, ax.cols);
    let mut tmp = vec![0.0; n_in * n_out];
    // contract x: tmp[(b, i)] = Σ_a ax[i][a] u[(b, a)]
    for b in 0..n_in {
        for i in 0..n_out {
            tmp[b * n_out + i] = (0..n_in).map(|a| ax.at(i, a) * u[b * n_in + a]).sum();
        }
    }
    for j in 0..n_out {
        for i in 0..n_out {
            out[j * n_out + i] += (0..n_in).map(|b| ay.at(j, b) * tmp[b * n_out + i]).sum::<f64>();
        }
    }
}

/// `out[(b, a)] += Σ_ij ax[i][a] ay[j][b] v[(j, i)]`, the transpose.
fn tensor_apply_transpose_add(ax: &Matrix1D, ay: &Matrix1D, v: &[f64], out: &mut [f64]) {
    let (n_fine, n_coarse) = (ax.rows, ax.cols);
    let mut tmp = vec![0.0; n_fine * n_coarse];
    for j in 0..n_fine {
        for a in 0..n_coarse {
            tmp[j * n_coarse + a] = (0..n_fine).map(|i| ax.at(i, a) * v[j * n_fine + i]).sum();
        }
    }
    for b in 0..n_coarse {
        for a in 0..n_coarse {
            out[b * n_coarse + a] += (0..n_fine).map(|j| ay.at(j, b) * tmp[j * n_coarse + a]).sum::<f64>();
        }
    }
}

/// Transfer between level `l` (coarse) and level `l + 1` (fine).
#[derive(Clone, Debug)]
pub struct LevelTransfer {
    kind: TransferKind,
}

#[derive(Clone, Debug)]
enum TransferKind {
    /// Same degree, one mesh refinement
    H {
        children: Vec<[usize; 4]>,
        /// Interpolation into the lower / upper half of the reference interval
        halves: [Matrix1D; 2],
        /// Fine→coarse sampling of each coarse node
        sampling: Vec<CoarseNodeSample>,
        n_1d: usize,
    },
    /// Same mesh, one degree step
    P {
        prolongation: Matrix1D,
        sampling: Matrix1D,
        n_1d_coarse: usize,
        n_1d_fine: usize,
    },
}

/// Child and in-child interpolation weights of a coarse node.
#[derive(Clone, Debug)]
struct CoarseNodeSample {
    child: usize,
    weights_x: Vec<f64>,
    weights_y: Vec<f64>,
}

impl LevelTransfer {
    /// h-transfer for degree `degree` with the parent→children map of the
    /// coarse level.
    pub fn h_transfer(degree: usize, children: &[[usize; 4]]) -> Self {
        let nodes = gauss_lobatto_nodes(degree);
        let n_1d = nodes.len();
        let half = |offset: f64| -> Vec<f64> { nodes.iter().map(|&r| 0.5 * (r - 1.0) + offset).collect() };
        let halves = [
            Matrix1D::from_mat(&interpolation_matrix(&nodes, &half(0.0))),
            Matrix1D::from_mat(&interpolation_matrix(&nodes, &half(1.0))),
        ];

        let basis = LagrangeBasis1D::new(&nodes);
        let mut sampling = Vec::with_capacity(n_1d * n_1d);
        for j in 0..n_1d {
            for i in 0..n_1d {
                let (r, s) = (nodes[i], nodes[j]);
                let ox = usize::from(r > 0.0);
                let oy = usize::from(s > 0.0);
                let child = CHILD_OFFSETS
                    .iter()
                    .position(|&o| o == (ox, oy))
                    .unwrap_or(0);
                sampling.push(CoarseNodeSample {
                    child,
                    weights_x: basis.values(2.0 * (r - ox as f64) + 1.0),
                    weights_y: basis.values(2.0 * (s - oy as f64) + 1.0),
                });
            }
        }
        Self {
            kind: TransferKind::H {
                children: children.to_vec(),
                halves,
                sampling,
                n_1d,
            },
        }
    }

    /// p-transfer between `coarse_degree` and `fine_degree` on one mesh.
    pub fn p_transfer(coarse_degree: usize, fine_degree: usize) -> Self {
        let coarse = gauss_lobatto_nodes(coarse_degree);
        let fine = gauss_lobatto_nodes(fine_degree);
        Self {
            kind: TransferKind::P {
                prolongation: Matrix1D::from_mat(&interpolation_matrix(&coarse, &fine)),
                sampling: Matrix1D::from_mat(&interpolation_matrix(&fine, &coarse)),
                n_1d_coarse: coarse.len(),
                n_1d_fine: fine.len(),
            },
        }
    }

    pub fn is_h_transfer(&self) -> bool {
        matches!(self.kind, TransferKind::H { .. })
    }

    /// `fine += P coarse`
    pub fn prolongate_add(&self, fine: &mut DofVector, coarse: &DofVector) {
        let n_comp = coarse.n_components();
        match &self.kind {
            TransferKind::H {
                children,
                halves,
                n_1d,
                ..
            } => {
                let n = n_1d * n_1d;
                for (parent, kids) in children.iter().enumerate() {
                    let src = coarse.element(parent);
                    for (slot, &child) in kids.iter().enumerate() {
                        let (ox, oy) = CHILD_OFFSETS[slot];
                        let dst = fine.element_mut(child);
                        for c in 0..n_comp {
                            tensor_apply_add(
                                &halves[ox],
                                &halves[oy],
                                &src[c * n..(c + 1) * n],
                                &mut dst[c * n..(c + 1) * n],
                            );
                        }
                    }
                }
            }
            TransferKind::P {
                prolongation,
                n_1d_coarse,
                n_1d_fine,
                ..
            } => {
                let (nc, nf) = (n_1d_coarse * n_1d_coarse, n_1d_fine * n_1d_fine);
                for k in 0..coarse.n_elements() {
                    let src = coarse.element(k);
                    let dst = fine.element_mut(k);
                    for c in 0..n_comp {
                        tensor_apply_add(
                            &prolongation,
                            &prolongation,
                            &src[c * nc..(c + 1) * nc],
                            &mut dst[c * nf..(c + 1) * nf],
                        );
                    }
                }
            }
        }
    }

    /// `coarse += Pᵀ fine`
    pub fn restrict_add(&self, coarse: &mut DofVector, fine: &DofVector) {
        let n_comp = fine.n_components();
        match &self.kind {
            TransferKind::H {
                children,
                halves,
                n_1d,
                ..
            } => {
                let n = n_1d * n_1d;
                for (parent, kids) in children.iter().enumerate() {
                    let dst = coarse.element_mut(parent);
                    for (slot, &child) in kids.iter().enumerate() {
                        let (ox, oy) = CHILD_OFFSETS[slot];
                        let src = fine.element(child);
                        for c in 0..n_comp {
                            tensor_apply_transpose_add(
                                &halves[ox],
                                &halves[oy],
                                &src[c * n..(c + 1) * n],
                                &mut dst[c * n..(c + 1) * n],
                            );
                        }
                    }
                }
            }
            TransferKind::P {
                prolongation,
                n_1d_coarse,
                n_1d_fine,
                ..
            } => {
                let (nc, nf) = (n_1d_coarse * n_1d_coarse, n_1d_fine * n_1d_fine);
                for k in 0..fine.n_elements() {
                    let src = fine.element(k);
                    let dst = coarse.element_mut(k);
                    for c in 0..n_comp {
                        tensor_apply_transpose_add(
                            &prolongation,
                            &prolongation,
                            &src[c * nf..(c + 1) * nf],
                            &mut dst[c * nc..(c + 1) * nc],
                        );
                    }
                }
            }
        }
    }

    /// `coarse = I fine`, nodal interpolation of the fine field.
    pub fn interpolate(&self, coarse: &mut DofVector, fine: &DofVector) {
        let n_comp = fine.n_components();
        coarse.fill(0.0);
        match &self.kind {
            TransferKind::H {
                children,
                sampling,
                n_1d,
                ..
            } => {
                let n = n_1d * n_1d;
                for (parent, kids) in children.iter().enumerate() {
                    for (node, sample) in sampling.iter().enumerate() {
                        let src = fine.element(kids[sample.child]);
                        for c in 0..n_comp {
                            let mut value = 0.0;
                            for (j, wy) in sample.weights_y.iter().enumerate() {
                                for (i, wx) in sample.weights_x.iter().enumerate() {
                                    value += wx * wy * src[c * n + j * n_1d + i];
                                }
                            }
                            coarse.set(parent, c, node, value);
                        }
                    }
                }
            }
            TransferKind::P {
                sampling,
                n_1d_coarse,
                n_1d_fine,
                ..
            } => {
                let (nc, nf) = (n_1d_coarse * n_1d_coarse, n_1d_fine * n_1d_fine);
                for k in 0..fine.n_elements() {
                    let src = fine.element(k);
                    let dst = coarse.element_mut(k);
                    for c in 0..n_comp {
                        tensor_apply_add(
                            &sampling,
                            &sampling,
                            &src[c * nf..(c + 1) * nf],
                            &mut dst[c * nc..(c + 1) * nc],
                        );
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{Mesh2D, MeshHierarchy};
    use crate::operators::MatrixFreeContext;

    fn sample(mf: &MatrixFreeContext, f: impl Fn(f64, f64) -> [f64; 2]) -> DofVector {
        let mut v = mf.create_vector(2);
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                let (x, y) = mf.mapping().point(k, q);
                let u = f(x, y);
                v.set(k, 0, q, u[0]);
                v.set(k, 1, q, u[1]);
            }
        }
        v
    }

    fn field(x: f64, y: f64) -> [f64; 2] {
        [x * x - y, x * y + 2.0 * y * y]
    }

    #[test]
    fn test_h_transfer_exact_for_coarse_polynomials() {
        let coarse_mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 2.0, 2, 2, [1, 2, 3, 4]);
        let hierarchy = MeshHierarchy::new(coarse_mesh, 1);
        let coarse = MatrixFreeContext::new(hierarchy.mesh(0), 2);
        let fine = MatrixFreeContext::new(hierarchy.mesh(1), 2);
        let transfer = LevelTransfer::h_transfer(2, hierarchy.children(0));

        let u_coarse = sample(&coarse, field);
        let u_fine = sample(&fine, field);

        let mut prolongated = fine.create_vector(2);
        transfer.prolongate_add(&mut prolongated, &u_coarse);
        prolongated.axpy(-1.0, &u_fine);
        assert!(prolongated.norm_max() < 1e-12);

        // interpolate then prolongate reproduces a coarse-resolvable field
        let mut back = coarse.create_vector(2);
        transfer.interpolate(&mut back, &u_fine);
        let mut again = fine.create_vector(2);
        transfer.prolongate_add(&mut again, &back);
        again.axpy(-1.0, &u_fine);
        assert!(again.norm_max() < 1e-12);
    }

    #[test]
    fn test_p_transfer_exact_and_restriction_is_transpose() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 1, [1, 2, 3, 4]);
        let coarse = MatrixFreeContext::new(&mesh, 2);
        let fine = MatrixFreeContext::new(&mesh, 4);
        let transfer = LevelTransfer::p_transfer(2, 4);

        let u_coarse = sample(&coarse, field);
        let mut u_fine = fine.create_vector(2);
        transfer.prolongate_add(&mut u_fine, &u_coarse);
        let mut back = coarse.create_vector(2);
        transfer.interpolate(&mut back, &u_fine);
        back.axpy(-1.0, &u_coarse);
        assert!(back.norm_max() < 1e-12);

        // <P c, f> = <c, Pᵀ f>
        let f = sample(&fine, |x, y| [(3.0 * x).sin(), y * y * y]);
        let mut rf = coarse.create_vector(2);
        transfer.restrict_add(&mut rf, &f);
        assert!((u_fine.dot(&f) - u_coarse.dot(&rf)).abs() < 1e-11);
    }

    #[test]
    fn test_h_restriction_is_transpose() {
        let hierarchy = MeshHierarchy::new(Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 1, 2, [1, 2, 3, 4]), 1);
        let coarse = MatrixFreeContext::new(hierarchy.mesh(0), 3);
        let fine = MatrixFreeContext::new(hierarchy.mesh(1), 3);
        let transfer = LevelTransfer::h_transfer(3, hierarchy.children(0));
        let c = sample(&coarse, |x, y| [x.exp(), y - x]);
        let f = sample(&fine, |x, y| [y.cos(), x * y]);
        let mut pc = fine.create_vector(2);
        transfer.prolongate_add(&mut pc, &c);
        let mut rf = coarse.create_vector(2);
        transfer.restrict_add(&mut rf, &f);
        assert!((pc.dot(&f) - c.dot(&rf)).abs() < 1e-11);
    }
}
