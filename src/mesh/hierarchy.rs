//! Hierarchy of uniformly refined meshes.

use super::mesh2d::Mesh2D;

/// Position `(cx, cy)` of each child inside its parent, in halves of the
/// reference square. Matches the child order returned by [`Mesh2D::refine`].
pub const CHILD_OFFSETS: [(usize, usize); 4] = [(0, 0), (1, 0), (1, 1), (0, 1)];

/// Meshes ordered coarse (h-level 0) to fine, plus parent-to-child maps.
#[derive(Clone, Debug)]
pub struct MeshHierarchy {
    meshes: Vec<Mesh2D>,
    /// `children[h][k]`: children on level `h + 1` of element `k` on level `h`
    children: Vec<Vec<[usize; 4]>>,
    /// Undeformed vertex positions per level
    reference_vertices: Vec<Vec<(f64, f64)>>,
}

impl MeshHierarchy {
    /// Refine `coarse` `n_refinements` times.
    pub fn new(coarse: Mesh2D, n_refinements: usize) -> Self {
        let mut meshes = vec![coarse];
        let mut children = Vec::with_capacity(n_refinements);
        for _ in 0..n_refinements {
            let (fine, map) = meshes[meshes.len() - 1].refine();
            meshes.push(fine);
            children.push(map);
        }
        let reference_vertices = meshes.iter().map(|m| m.vertices.clone()).collect();
        tracing::debug!(
            n_levels = meshes.len(),
            fine_cells = meshes[meshes.len() - 1].n_elements,
            "built mesh hierarchy"
        );
        Self {
            meshes,
            children,
            reference_vertices,
        }
    }

    pub fn n_levels(&self) -> usize {
        self.meshes.len()
    }

    pub fn finest_level(&self) -> usize {
        self.meshes.len() - 1
    }

    pub fn mesh(&self, h_level: usize) -> &Mesh2D {
        &self.meshes[h_level]
    }

    pub fn finest(&self) -> &Mesh2D {
        &self.meshes[self.meshes.len() - 1]
    }

    /// Children on level `h_level + 1` of the elements on `h_level`.
    pub fn children(&self, h_level: usize) -> &[[usize; 4]] {
        &self.children[h_level]
    }

    /// Place every vertex of every level at `map(x0)`, where `x0` is the
    /// undeformed position. All levels see the same analytic deformation.
    pub fn move_vertices(&mut self, map: impl Fn((f64, f64)) -> (f64, f64)) {
        for (mesh, reference) in self.meshes.iter_mut().zip(&self.reference_vertices) {
            for (v, &x0) in mesh.vertices.iter_mut().zip(reference) {
                *v = map(x0);
            }
        }
    }
}
