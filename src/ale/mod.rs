//! Moving meshes for the arbitrary Lagrangian-Eulerian formulation.
//!
//! A [`MeshMotion`] deforms the mesh hierarchy in time and exposes the
//! nodal coordinates of the finest mesh. The grid velocity `w` entering the
//! convective transport velocity `u - w` is the BDF derivative of the
//! coordinate history, see [`compute_grid_velocity`].

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::error::{NsError, Result};
use crate::functions::VectorFunction;
use crate::mesh::MeshHierarchy;
use crate::operators::MatrixFreeContext;
use crate::vector::DofVector;

/// Capability of moving the computational grid.
///
/// Implementors override the operations they support; the rest report
/// [`NsError::NotImplemented`].
pub trait MeshMotion: Send + Sync {
    /// Deform every level of the hierarchy to its configuration at `time`.
    fn move_grid(&mut self, _time: f64) -> Result<()> {
        Err(NsError::NotImplemented("move_grid"))
    }

    /// Recompute the geometry held by the motion itself.
    fn update_matrix_free_after_grid_motion(&mut self) -> Result<()> {
        Err(NsError::NotImplemented("update_matrix_free_after_grid_motion"))
    }

    /// Write the current nodal coordinates into a velocity-layout vector.
    fn fill_grid_coordinates_vector(&self, _vector: &mut DofVector) -> Result<()> {
        Err(NsError::NotImplemented("fill_grid_coordinates_vector"))
    }
}

/// Mesh motion prescribed by a displacement field `d(x0, t)` of the
/// undeformed vertex positions `x0`.
pub struct AnalyticMeshMotion {
    hierarchy: Arc<RwLock<MeshHierarchy>>,
    matrix_free: MatrixFreeContext,
    displacement: Arc<dyn VectorFunction>,
    time: f64,
}

impl AnalyticMeshMotion {
    pub fn new(
        hierarchy: Arc<RwLock<MeshHierarchy>>,
        degree: usize,
        displacement: Arc<dyn VectorFunction>,
    ) -> Self {
        let matrix_free = MatrixFreeContext::new(hierarchy.read().finest(), degree);
        Self {
            hierarchy,
            matrix_free,
            displacement,
            time: 0.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn hierarchy(&self) -> &Arc<RwLock<MeshHierarchy>> {
        &self.hierarchy
    }
}

impl MeshMotion for AnalyticMeshMotion {
    fn move_grid(&mut self, time: f64) -> Result<()> {
        let d = &self.displacement;
        self.hierarchy.write().move_vertices(|x0| {
            let [dx, dy] = d.value(x0, time);
            (x0.0 + dx, x0.1 + dy)
        });
        self.time = time;
        trace!(time, "grid moved");
        Ok(())
    }

    fn update_matrix_free_after_grid_motion(&mut self) -> Result<()> {
        self.matrix_free.update_mapping(self.hierarchy.read().finest());
        Ok(())
    }

    fn fill_grid_coordinates_vector(&self, vector: &mut DofVector) -> Result<()> {
        let mf = &self.matrix_free;
        let expected = mf.n_elements() * 2 * mf.n_nodes();
        if vector.len() != expected {
            return Err(NsError::dimension_mismatch(expected, vector.len()));
        }
        for k in 0..mf.n_elements() {
            for q in 0..mf.n_nodes() {
                let (x, y) = mf.mapping().point(k, q);
                vector.set(k, 0, q, x);
                vector.set(k, 1, q, y);
            }
        }
        Ok(())
    }
}

/// `w = (γ0 x_{n+1} - Σ α_i x_{n-i}) / dt` from the coordinates at the new
/// time and the coordinate history, most recent first.
pub fn compute_grid_velocity(
    dst: &mut DofVector,
    gamma0: f64,
    alpha: &[f64],
    dt: f64,
    coordinates_np: &DofVector,
    history: &[DofVector],
) -> Result<()> {
    if alpha.len() > history.len() {
        return Err(NsError::dimension_mismatch(alpha.len(), history.len()));
    }
    dst.equ(coordinates_np);
    dst.scale(gamma0);
    for (a, x) in alpha.iter().zip(history) {
        dst.axpy(-a, x);
    }
    dst.scale(1.0 / dt);
    Ok(())
}
