//! Geometry of the bilinear cell map evaluated at every node.
//!
//! Derivatives transform as
//!
//! ∂u/∂x = rx * ∂u/∂r + sx * ∂u/∂s
//! ∂u/∂y = ry * ∂u/∂r + sy * ∂u/∂s
//!
//! where (rx, ry, sx, sy) are the entries of the inverse Jacobian. Unlike an
//! affine map, a general quadrilateral has a Jacobian that varies inside the
//! cell, so everything is stored per node.

use super::shape_info::ShapeInfo;
use crate::mesh::Mesh2D;

/// Inverse Jacobian `[rx, ry, sx, sy]` at one node.
pub type InverseJacobian = [f64; 4];

/// Per-node geometric data of all cells of a mesh.
#[derive(Clone, Debug)]
pub struct MappingInfo {
    n_nodes: usize,
    n_face_nodes: usize,
    points: Vec<(f64, f64)>,
    inverse_jacobian: Vec<InverseJacobian>,
    jxw: Vec<f64>,
    face_normals: Vec<[f64; 2]>,
    face_jxw: Vec<f64>,
    cell_volume: Vec<f64>,
    face_area: Vec<[f64; 4]>,
}

impl MappingInfo {
    pub fn compute(mesh: &Mesh2D, shape: &ShapeInfo) -> Self {
        let n = shape.n_nodes;
        let nf = shape.n_face_nodes;
        let n_elements = mesh.n_elements;

        let mut info = Self {
            n_nodes: n,
            n_face_nodes: nf,
            points: Vec::with_capacity(n_elements * n),
            inverse_jacobian: Vec::with_capacity(n_elements * n),
            jxw: Vec::with_capacity(n_elements * n),
            face_normals: Vec::with_capacity(n_elements * 4 * nf),
            face_jxw: Vec::with_capacity(n_elements * 4 * nf),
            cell_volume: Vec::with_capacity(n_elements),
            face_area: Vec::with_capacity(n_elements),
        };

        for k in 0..n_elements {
            let verts = mesh.element_vertices(k);
            let mut volume = 0.0;
            for node in 0..n {
                let (r, s) = shape.reference_node(node);
                let [x_r, x_s, y_r, y_s] = bilinear_jacobian(&verts, r, s);
                let det = x_r * y_s - x_s * y_r;
                info.points.push(mesh.reference_to_physical(k, r, s));
                info.inverse_jacobian
                    .push([y_s / det, -x_s / det, -y_r / det, x_r / det]);
                let w = det * shape.weights[node];
                info.jxw.push(w);
                volume += w;
            }
            info.cell_volume.push(volume);

            let mut areas = [0.0; 4];
            for (face, area) in areas.iter_mut().enumerate() {
                for q in 0..nf {
                    let node = shape.face_to_cell_index_nodal[face][q];
                    let (r, s) = shape.reference_node(node);
                    let [x_r, x_s, y_r, y_s] = bilinear_jacobian(&verts, r, s);
                    // tangent along the counter-clockwise traversal
                    let (tx, ty) = match face {
                        0 => (x_r, y_r),
                        1 => (x_s, y_s),
                        2 => (-x_r, -y_r),
                        _ => (-x_s, -y_s),
                    };
                    let len = (tx * tx + ty * ty).sqrt();
                    info.face_normals.push([ty / len, -tx / len]);
                    let w = len * shape.face_weight(q);
                    info.face_jxw.push(w);
                    *area += w;
                }
            }
            info.face_area.push(areas);
        }
        info
    }

    #[inline]
    pub fn point(&self, element: usize, node: usize) -> (f64, f64) {
        self.points[element * self.n_nodes + node]
    }

    #[inline]
    pub fn inverse_jacobian(&self, element: usize, node: usize) -> InverseJacobian {
        self.inverse_jacobian[element * self.n_nodes + node]
    }

    #[inline]
    pub fn jxw(&self, element: usize, node: usize) -> f64 {
        self.jxw[element * self.n_nodes + node]
    }

    /// Outward unit normal of `element` at face point `q`.
    #[inline]
    pub fn face_normal(&self, element: usize, face: usize, q: usize) -> [f64; 2] {
        self.face_normals[(element * 4 + face) * self.n_face_nodes + q]
    }

    #[inline]
    pub fn face_jxw(&self, element: usize, face: usize, q: usize) -> f64 {
        self.face_jxw[(element * 4 + face) * self.n_face_nodes + q]
    }

    pub fn cell_volume(&self, element: usize) -> f64 {
        self.cell_volume[element]
    }

    pub fn face_area(&self, element: usize, face: usize) -> f64 {
        self.face_area[element][face]
    }

    /// Physical gradient from reference derivatives at a node.
    #[inline]
    pub fn transform_gradient(&self, element: usize, node: usize, du_dr: f64, du_ds: f64) -> [f64; 2] {
        let [rx, ry, sx, sy] = self.inverse_jacobian(element, node);
        [rx * du_dr + sx * du_ds, ry * du_dr + sy * du_ds]
    }
}

/// `[x_r, x_s, y_r, y_s]` of the bilinear map at `(r, s)`.
fn bilinear_jacobian(v: &[(f64, f64); 4], r: f64, s: f64) -> [f64; 4] {
    let dn_dr = [-(1.0 - s), 1.0 - s, 1.0 + s, -(1.0 + s)];
    let dn_ds = [-(1.0 - r), -(1.0 + r), 1.0 + r, 1.0 - r];
    let mut jac = [0.0; 4];
    for a in 0..4 {
        jac[0] += 0.25 * dn_dr[a] * v[a].0;
        jac[1] += 0.25 * dn_ds[a] * v[a].0;
        jac[2] += 0.25 * dn_dr[a] * v[a].1;
        jac[3] += 0.25 * dn_ds[a] * v[a].1;
    }
    jac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_geometry() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 2, 2, [0; 4]);
        let shape = ShapeInfo::new(2);
        let mapping = MappingInfo::compute(&mesh, &shape);

        let total: f64 = (0..4).map(|k| mapping.cell_volume(k)).sum();
        assert!((total - 2.0).abs() < 1e-13);

        // cell 0 is [0,1] x [0,0.5]
        let [rx, ry, sx, sy] = mapping.inverse_jacobian(0, 4);
        assert!((rx - 2.0).abs() < 1e-13 && (sy - 4.0).abs() < 1e-13);
        assert!(ry.abs() < 1e-14 && sx.abs() < 1e-14);

        let expected = [[0.0, -1.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]];
        for (face, n) in expected.iter().enumerate() {
            let got = mapping.face_normal(0, face, 1);
            assert!((got[0] - n[0]).abs() < 1e-14 && (got[1] - n[1]).abs() < 1e-14);
        }
        assert!((mapping.face_area(0, 0) - 1.0).abs() < 1e-13);
        assert!((mapping.face_area(0, 1) - 0.5).abs() < 1e-13);
    }

    #[test]
    fn test_distorted_cell_area() {
        let vertices = vec![(0.0, 0.0), (2.0, 0.0), (1.5, 1.0), (0.0, 1.0)];
        let mesh = Mesh2D::from_cells(vertices, vec![[0, 1, 2, 3]], |_, _| 0);
        let mapping = MappingInfo::compute(&mesh, &ShapeInfo::new(3));
        // trapezoid with parallel sides 2 and 1.5, height 1
        assert!((mapping.cell_volume(0) - 1.75).abs() < 1e-12);
        let slanted = (0.5_f64 * 0.5 + 1.0).sqrt();
        assert!((mapping.face_area(0, 1) - slanted).abs() < 1e-12);
    }
}
