//! Boundary descriptor: boundary id → boundary kind and data, per field.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{NsError, Result};
use crate::functions::{
    CachedBoundaryData, Point, ScalarFunction, SharedCachedData, VectorFunction,
};
use crate::mesh::{BoundaryId, Mesh2D};
use crate::operators::BoundaryFace;

/// Velocity boundary kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryTypeU {
    /// Prescribed velocity `g(x, t)`
    Dirichlet,
    /// Prescribed velocity read from externally refreshed point data
    DirichletCached,
    /// Prescribed traction
    Neumann,
    /// Zero normal velocity, zero tangential traction
    Symmetry,
}

/// Pressure boundary kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryTypeP {
    Dirichlet,
    Neumann,
}

/// Velocity kind of one boundary face, with its data function if any.
#[derive(Clone)]
pub struct ResolvedBoundaryU {
    pub kind: BoundaryTypeU,
    pub function: Option<Arc<dyn VectorFunction>>,
}

/// Pressure kind of one boundary face, with its Dirichlet function if any.
#[derive(Clone)]
pub struct ResolvedBoundaryP {
    pub kind: BoundaryTypeP,
    pub function: Option<Arc<dyn ScalarFunction>>,
}

impl ResolvedBoundaryU {
    /// Dirichlet velocity at face point `q`, zero on non-Dirichlet faces.
    /// Cached faces read `cached`, whose coverage has been checked with
    /// [`BoundaryDescriptorU::check_cached_coverage`].
    pub fn dirichlet_value(
        &self,
        face: usize,
        q: usize,
        p: Point,
        time: f64,
        cached: &CachedBoundaryData,
    ) -> [f64; 2] {
        match (self.kind, &self.function) {
            (BoundaryTypeU::Dirichlet, Some(g)) => g.value(p, time),
            (BoundaryTypeU::DirichletCached, _) => cached.get(face, q).unwrap_or([0.0; 2]),
            _ => [0.0; 2],
        }
    }

    /// Prescribed traction, zero on non-Neumann faces.
    pub fn neumann_value(&self, p: Point, time: f64) -> [f64; 2] {
        match (self.kind, &self.function) {
            (BoundaryTypeU::Neumann, Some(h)) => h.value(p, time),
            _ => [0.0; 2],
        }
    }

    pub fn is_dirichlet(&self) -> bool {
        matches!(self.kind, BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached)
    }
}

impl ResolvedBoundaryP {
    pub fn dirichlet_value(&self, p: Point, time: f64) -> f64 {
        match (self.kind, &self.function) {
            (BoundaryTypeP::Dirichlet, Some(g)) => g.value(p, time),
            _ => 0.0,
        }
    }
}

/// Velocity boundary conditions.
#[derive(Clone)]
pub struct BoundaryDescriptorU {
    pub dirichlet_bc: BTreeMap<BoundaryId, Arc<dyn VectorFunction>>,
    pub dirichlet_cached_bc: BTreeSet<BoundaryId>,
    pub neumann_bc: BTreeMap<BoundaryId, Arc<dyn VectorFunction>>,
    pub symmetry_bc: BTreeSet<BoundaryId>,
    cached_data: SharedCachedData,
}

impl Default for BoundaryDescriptorU {
    fn default() -> Self {
        Self {
            dirichlet_bc: BTreeMap::new(),
            dirichlet_cached_bc: BTreeSet::new(),
            neumann_bc: BTreeMap::new(),
            symmetry_bc: BTreeSet::new(),
            cached_data: Arc::new(RwLock::new(CachedBoundaryData::new())),
        }
    }
}

impl BoundaryDescriptorU {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dirichlet(mut self, id: BoundaryId, g: Arc<dyn VectorFunction>) -> Self {
        self.dirichlet_bc.insert(id, g);
        self
    }

    pub fn with_dirichlet_cached(mut self, id: BoundaryId) -> Self {
        self.dirichlet_cached_bc.insert(id);
        self
    }

    /// Neumann data is the traction `ν ∂u/∂n`.
    pub fn with_neumann(mut self, id: BoundaryId, h: Arc<dyn VectorFunction>) -> Self {
        self.neumann_bc.insert(id, h);
        self
    }

    pub fn with_symmetry(mut self, id: BoundaryId) -> Self {
        self.symmetry_bc.insert(id);
        self
    }

    /// Kind registered for `id`.
    pub fn get_boundary_type(&self, id: BoundaryId) -> Result<BoundaryTypeU> {
        if self.dirichlet_bc.contains_key(&id) {
            Ok(BoundaryTypeU::Dirichlet)
        } else if self.dirichlet_cached_bc.contains(&id) {
            Ok(BoundaryTypeU::DirichletCached)
        } else if self.neumann_bc.contains_key(&id) {
            Ok(BoundaryTypeU::Neumann)
        } else if self.symmetry_bc.contains(&id) {
            Ok(BoundaryTypeU::Symmetry)
        } else {
            Err(NsError::UnknownBoundaryId {
                field: "velocity",
                id,
            })
        }
    }

    pub fn dirichlet_bc_value(&self, id: BoundaryId) -> Result<&Arc<dyn VectorFunction>> {
        self.dirichlet_bc
            .get(&id)
            .ok_or(NsError::MissingBoundaryData {
                field: "velocity",
                id,
            })
    }

    pub fn neumann_bc_value(&self, id: BoundaryId) -> Result<&Arc<dyn VectorFunction>> {
        self.neumann_bc.get(&id).ok_or(NsError::MissingBoundaryData {
            field: "velocity",
            id,
        })
    }

    /// Handle to the externally refreshed Dirichlet data.
    pub fn get_dirichlet_cached_data(&self) -> SharedCachedData {
        Arc::clone(&self.cached_data)
    }

    fn kinds_of(&self, id: BoundaryId) -> usize {
        usize::from(self.dirichlet_bc.contains_key(&id))
            + usize::from(self.dirichlet_cached_bc.contains(&id))
            + usize::from(self.neumann_bc.contains_key(&id))
            + usize::from(self.symmetry_bc.contains(&id))
    }

    /// Every id resolves to exactly one kind.
    pub fn verify(&self, ids: impl IntoIterator<Item = BoundaryId>) -> Result<()> {
        for id in ids {
            match self.kinds_of(id) {
                0 => {
                    return Err(NsError::UnknownBoundaryId {
                        field: "velocity",
                        id,
                    });
                }
                1 => {}
                _ => {
                    return Err(NsError::DuplicateBoundaryId {
                        field: "velocity",
                        id,
                    });
                }
            }
        }
        Ok(())
    }

    /// Kind and data of every boundary face, in face order.
    pub fn resolve(&self, faces: &[BoundaryFace]) -> Result<Vec<ResolvedBoundaryU>> {
        faces
            .iter()
            .map(|f| {
                let kind = self.get_boundary_type(f.boundary_id)?;
                let function = match kind {
                    BoundaryTypeU::Dirichlet => Some(Arc::clone(self.dirichlet_bc_value(f.boundary_id)?)),
                    BoundaryTypeU::Neumann => Some(Arc::clone(self.neumann_bc_value(f.boundary_id)?)),
                    BoundaryTypeU::DirichletCached | BoundaryTypeU::Symmetry => None,
                };
                Ok(ResolvedBoundaryU { kind, function })
            })
            .collect()
    }

    /// Check that the cached snapshot covers every point of every
    /// `DirichletCached` face.
    pub fn check_cached_coverage(
        &self,
        faces: &[BoundaryFace],
        resolved: &[ResolvedBoundaryU],
        n_face_points: usize,
        data: &CachedBoundaryData,
    ) -> Result<()> {
        for (face, bc) in faces.iter().zip(resolved) {
            if bc.kind == BoundaryTypeU::DirichletCached {
                for q in 0..n_face_points {
                    if data.get(face.index, q).is_none() {
                        return Err(NsError::MissingCachedData { face: face.index, q });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Pressure boundary conditions.
#[derive(Clone, Default)]
pub struct BoundaryDescriptorP {
    pub dirichlet_bc: BTreeMap<BoundaryId, Arc<dyn ScalarFunction>>,
    pub neumann_bc: BTreeSet<BoundaryId>,
}

impl BoundaryDescriptorP {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dirichlet(mut self, id: BoundaryId, g: Arc<dyn ScalarFunction>) -> Self {
        self.dirichlet_bc.insert(id, g);
        self
    }

    pub fn with_neumann(mut self, id: BoundaryId) -> Self {
        self.neumann_bc.insert(id);
        self
    }

    pub fn get_boundary_type(&self, id: BoundaryId) -> Result<BoundaryTypeP> {
        if self.dirichlet_bc.contains_key(&id) {
            Ok(BoundaryTypeP::Dirichlet)
        } else if self.neumann_bc.contains(&id) {
            Ok(BoundaryTypeP::Neumann)
        } else {
            Err(NsError::UnknownBoundaryId {
                field: "pressure",
                id,
            })
        }
    }

    pub fn dirichlet_bc_value(&self, id: BoundaryId) -> Result<&Arc<dyn ScalarFunction>> {
        self.dirichlet_bc
            .get(&id)
            .ok_or(NsError::MissingBoundaryData {
                field: "pressure",
                id,
            })
    }

    pub fn verify(&self, ids: impl IntoIterator<Item = BoundaryId>) -> Result<()> {
        for id in ids {
            let count = usize::from(self.dirichlet_bc.contains_key(&id))
                + usize::from(self.neumann_bc.contains(&id));
            match count {
                0 => {
                    return Err(NsError::UnknownBoundaryId {
                        field: "pressure",
                        id,
                    });
                }
                1 => {}
                _ => {
                    return Err(NsError::DuplicateBoundaryId {
                        field: "pressure",
                        id,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn resolve(&self, faces: &[BoundaryFace]) -> Result<Vec<ResolvedBoundaryP>> {
        faces
            .iter()
            .map(|f| {
                let kind = self.get_boundary_type(f.boundary_id)?;
                let function = match kind {
                    BoundaryTypeP::Dirichlet => Some(Arc::clone(self.dirichlet_bc_value(f.boundary_id)?)),
                    BoundaryTypeP::Neumann => None,
                };
                Ok(ResolvedBoundaryP { kind, function })
            })
            .collect()
    }
}

/// Velocity and pressure boundary conditions of one problem.
#[derive(Clone, Default)]
pub struct BoundaryDescriptor {
    pub velocity: BoundaryDescriptorU,
    pub pressure: BoundaryDescriptorP,
}

impl BoundaryDescriptor {
    pub fn new(velocity: BoundaryDescriptorU, pressure: BoundaryDescriptorP) -> Self {
        Self { velocity, pressure }
    }

    /// Every boundary id of `mesh` has exactly one kind per field.
    pub fn verify(&self, mesh: &Mesh2D) -> Result<()> {
        let ids = mesh.boundary_ids();
        self.velocity.verify(ids.iter().copied())?;
        self.pressure.verify(ids.iter().copied())
    }

    /// The pressure Poisson problem is singular if no pressure Dirichlet
    /// boundary exists on the mesh.
    pub fn pure_neumann_pressure(&self, mesh: &Mesh2D) -> bool {
        !mesh
            .boundary_ids()
            .iter()
            .any(|id| self.pressure.dirichlet_bc.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{ConstantVector, ZeroFunction};

    fn inflow_descriptor() -> BoundaryDescriptor {
        let velocity = BoundaryDescriptorU::new()
            .with_dirichlet(4, Arc::new(ConstantVector([1.0, 0.0])))
            .with_neumann(2, Arc::new(ZeroFunction))
            .with_symmetry(1)
            .with_symmetry(3);
        let pressure = BoundaryDescriptorP::new()
            .with_neumann(1)
            .with_neumann(3)
            .with_neumann(4)
            .with_dirichlet(2, Arc::new(ZeroFunction));
        BoundaryDescriptor::new(velocity, pressure)
    }

    #[test]
    fn test_lookup() {
        let bd = inflow_descriptor();
        assert_eq!(bd.velocity.get_boundary_type(4), Ok(BoundaryTypeU::Dirichlet));
        assert_eq!(bd.velocity.get_boundary_type(1), Ok(BoundaryTypeU::Symmetry));
        assert_eq!(bd.pressure.get_boundary_type(2), Ok(BoundaryTypeP::Dirichlet));
        assert_eq!(
            bd.velocity.get_boundary_type(9),
            Err(NsError::UnknownBoundaryId {
                field: "velocity",
                id: 9
            })
        );
    }

    #[test]
    fn test_verify_against_mesh() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        let bd = inflow_descriptor();
        assert!(bd.verify(&mesh).is_ok());
        assert!(!bd.pure_neumann_pressure(&mesh));

        let mut dup = inflow_descriptor();
        dup.velocity = dup.velocity.with_dirichlet_cached(1);
        assert_eq!(
            dup.verify(&mesh),
            Err(NsError::DuplicateBoundaryId {
                field: "velocity",
                id: 1
            })
        );

        let other = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 5]);
        assert!(matches!(
            bd.verify(&other),
            Err(NsError::UnknownBoundaryId { id: 5, .. })
        ));
    }

    #[test]
    fn test_cached_handle_is_shared() {
        let bd = BoundaryDescriptorU::new().with_dirichlet_cached(7);
        let handle = bd.get_dirichlet_cached_data();
        handle.write().set(0, 0, [2.0, 0.0]);
        assert_eq!(bd.get_dirichlet_cached_data().read().get(0, 0), Some([2.0, 0.0]));
    }
}
