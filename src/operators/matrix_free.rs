//! Matrix-free evaluation context: geometry, face lists and batched loops.
//!
//! Cells and faces are grouped into batches of [`LANES`] entries. The last
//! batch of each kind is padded by repeating its final entry; padding lanes
//! are evaluated like any other lane but their contributions are dropped,
//! never written back. After a loop, the element-local contributions of all
//! batches are summed into the destination vector.

use std::collections::HashMap;

use super::mapping::MappingInfo;
use super::shape_info::ShapeInfo;
use crate::mesh::{BoundaryId, Mesh2D};
use crate::vector::DofVector;

/// Number of cells or faces processed together.
pub const LANES: usize = 4;

/// Face between two cells. Side `m` is the cell that first visited the edge.
#[derive(Clone, Copy, Debug)]
pub struct InnerFace {
    pub index: usize,
    pub element_m: usize,
    pub face_m: usize,
    pub element_p: usize,
    pub face_p: usize,
}

/// Face on the domain boundary.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryFace {
    /// Dense index among boundary faces, stable across mesh motion
    pub index: usize,
    pub element: usize,
    pub face: usize,
    pub boundary_id: BoundaryId,
}

/// Indices of up to `LANES` items; lanes `n_active..` repeat the last item.
#[derive(Clone, Copy, Debug)]
pub struct Batch {
    pub lanes: [usize; LANES],
    pub n_active: usize,
}

impl Batch {
    fn build(n_items: usize) -> Vec<Batch> {
        (0..n_items)
            .step_by(LANES)
            .map(|start| {
                let n_active = (n_items - start).min(LANES);
                let mut lanes = [start + n_active - 1; LANES];
                for (lane, slot) in lanes.iter_mut().enumerate().take(n_active) {
                    *slot = start + lane;
                }
                Batch { lanes, n_active }
            })
            .collect()
    }

    pub fn active(&self) -> &[usize] {
        &self.lanes[..self.n_active]
    }
}

/// Element-local results of one batch, waiting to be summed into a vector.
#[derive(Debug)]
pub struct LocalContributions {
    block_len: usize,
    blocks: Vec<(usize, Vec<f64>)>,
}

impl LocalContributions {
    pub fn new(block_len: usize) -> Self {
        Self {
            block_len,
            blocks: Vec::new(),
        }
    }

    /// Queue `values` (all components of one element) for `element`.
    pub fn add(&mut self, element: usize, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.block_len);
        self.blocks.push((element, values));
    }

    pub(crate) fn distribute(self, dst: &mut DofVector) {
        for (element, values) in self.blocks {
            dst.add_local(element, &values);
        }
    }
}

/// Everything needed to evaluate DG operators of one degree on one mesh.
#[derive(Clone, Debug)]
pub struct MatrixFreeContext {
    shape: ShapeInfo,
    mapping: MappingInfo,
    n_elements: usize,
    inner_faces: Vec<InnerFace>,
    boundary_faces: Vec<BoundaryFace>,
    boundary_face_lookup: HashMap<(usize, usize), usize>,
    cells: Vec<usize>,
    cell_batches: Vec<Batch>,
    inner_face_batches: Vec<Batch>,
    boundary_face_batches: Vec<Batch>,
    cell_colors: Vec<usize>,
    n_colors: usize,
    /// Surface-to-volume ratio per cell, interior faces weighted by 1/2
    penalty_inverse_length: Vec<f64>,
}

impl MatrixFreeContext {
    pub fn new(mesh: &Mesh2D, degree: usize) -> Self {
        let shape = ShapeInfo::new(degree);
        let mapping = MappingInfo::compute(mesh, &shape);
        let n_elements = mesh.n_elements;

        let mut inner_faces = Vec::new();
        let mut boundary_faces = Vec::new();
        for edge in &mesh.edges {
            match (edge.right, edge.boundary_id) {
                (Some(right), _) => inner_faces.push(InnerFace {
                    index: inner_faces.len(),
                    element_m: edge.left.element,
                    face_m: edge.left.face,
                    element_p: right.element,
                    face_p: right.face,
                }),
                (None, id) => boundary_faces.push(BoundaryFace {
                    index: boundary_faces.len(),
                    element: edge.left.element,
                    face: edge.left.face,
                    boundary_id: id.unwrap_or_default(),
                }),
            }
        }
        let boundary_face_lookup = boundary_faces
            .iter()
            .map(|f| ((f.element, f.face), f.index))
            .collect();

        let (cell_colors, n_colors) = color_cells(n_elements, &inner_faces);

        let mut ctx = Self {
            cell_batches: Batch::build(n_elements),
            inner_face_batches: Batch::build(inner_faces.len()),
            boundary_face_batches: Batch::build(boundary_faces.len()),
            shape,
            mapping,
            n_elements,
            inner_faces,
            boundary_faces,
            boundary_face_lookup,
            cells: (0..n_elements).collect(),
            cell_colors,
            n_colors,
            penalty_inverse_length: Vec::new(),
        };
        ctx.compute_penalty_lengths();
        tracing::debug!(
            degree,
            cells = n_elements,
            inner_faces = ctx.inner_faces.len(),
            boundary_faces = ctx.boundary_faces.len(),
            "matrix-free context ready"
        );
        ctx
    }

    /// Recompute all geometry after the vertices of `mesh` moved.
    /// Topology, batches and colouring are unchanged.
    pub fn update_mapping(&mut self, mesh: &Mesh2D) {
        self.mapping = MappingInfo::compute(mesh, &self.shape);
        self.compute_penalty_lengths();
    }

    fn compute_penalty_lengths(&mut self) {
        let mut surface = vec![0.0; self.n_elements];
        for f in &self.inner_faces {
            surface[f.element_m] += 0.5 * self.mapping.face_area(f.element_m, f.face_m);
            surface[f.element_p] += 0.5 * self.mapping.face_area(f.element_p, f.face_p);
        }
        for f in &self.boundary_faces {
            surface[f.element] += self.mapping.face_area(f.element, f.face);
        }
        self.penalty_inverse_length = surface
            .iter()
            .enumerate()
            .map(|(k, s)| s / self.mapping.cell_volume(k))
            .collect();
    }

    pub fn shape(&self) -> &ShapeInfo {
        &self.shape
    }

    pub fn mapping(&self) -> &MappingInfo {
        &self.mapping
    }

    pub fn degree(&self) -> usize {
        self.shape.degree
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn n_nodes(&self) -> usize {
        self.shape.n_nodes
    }

    pub fn inner_faces(&self) -> &[InnerFace] {
        &self.inner_faces
    }

    pub fn boundary_faces(&self) -> &[BoundaryFace] {
        &self.boundary_faces
    }

    pub fn boundary_face_batches(&self) -> &[Batch] {
        &self.boundary_face_batches
    }

    /// Dense boundary-face index of `(element, face)`.
    pub fn boundary_face_index(&self, element: usize, face: usize) -> Option<usize> {
        self.boundary_face_lookup.get(&(element, face)).copied()
    }

    pub fn n_colors(&self) -> usize {
        self.n_colors
    }

    pub fn cell_color(&self, element: usize) -> usize {
        self.cell_colors[element]
    }

    /// Interior-penalty factor `τ = ip (k+1)² · surface/volume` of a cell.
    pub fn penalty_parameter(&self, element: usize, ip_factor: f64) -> f64 {
        let k1 = (self.shape.degree + 1) as f64;
        ip_factor * k1 * k1 * self.penalty_inverse_length[element]
    }

    pub fn create_vector(&self, n_components: usize) -> DofVector {
        DofVector::new(self.n_elements, n_components, self.shape.n_nodes)
    }

    /// Run cell, inner-face and boundary-face kernels and add the results
    /// into `dst`.
    pub fn loop_cells_faces<C, I, B>(&self, dst: &mut DofVector, cell: C, inner: I, boundary: B)
    where
        C: Fn(usize, &mut LocalContributions) + Sync,
        I: Fn(&InnerFace, &mut LocalContributions) + Sync,
        B: Fn(&BoundaryFace, &mut LocalContributions) + Sync,
    {
        let block_len = dst.n_components() * dst.n_nodes();
        let cell_kernel = |c: &usize, out: &mut LocalContributions| cell(*c, out);
        let mut results = run_batches(&self.cell_batches, &self.cells, block_len, &cell_kernel);
        results.extend(run_batches(
            &self.inner_face_batches,
            &self.inner_faces,
            block_len,
            &inner,
        ));
        results.extend(run_batches(
            &self.boundary_face_batches,
            &self.boundary_faces,
            block_len,
            &boundary,
        ));
        for r in results {
            r.distribute(dst);
        }
    }

    /// Boundary-face-only loop.
    pub fn boundary_face_loop<B>(&self, dst: &mut DofVector, boundary: B)
    where
        B: Fn(&BoundaryFace, &mut LocalContributions) + Sync,
    {
        let block_len = dst.n_components() * dst.n_nodes();
        for r in run_batches(
            &self.boundary_face_batches,
            &self.boundary_faces,
            block_len,
            &boundary,
        ) {
            r.distribute(dst);
        }
    }

    /// Cell-only loop.
    pub fn cell_loop<C>(&self, dst: &mut DofVector, cell: C)
    where
        C: Fn(usize, &mut LocalContributions) + Sync,
    {
        let block_len = dst.n_components() * dst.n_nodes();
        let cell_kernel = |c: &usize, out: &mut LocalContributions| cell(*c, out);
        for r in run_batches(&self.cell_batches, &self.cells, block_len, &cell_kernel) {
            r.distribute(dst);
        }
    }
}

fn run_batches<T, F>(
    batches: &[Batch],
    items: &[T],
    block_len: usize,
    kernel: &F,
) -> Vec<LocalContributions>
where
    T: Sync,
    F: Fn(&T, &mut LocalContributions) + Sync,
{
    let process = |batch: &Batch| {
        let mut kept = LocalContributions::new(block_len);
        for (lane, &item) in batch.lanes.iter().enumerate() {
            if lane < batch.n_active {
                kernel(&items[item], &mut kept);
            } else {
                let mut padding = LocalContributions::new(block_len);
                kernel(&items[item], &mut padding);
            }
        }
        kept
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        batches.par_iter().map(process).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        batches.iter().map(process).collect()
    }
}

/// Greedy colouring such that no two face neighbours share a colour.
fn color_cells(n_elements: usize, inner_faces: &[InnerFace]) -> (Vec<usize>, usize) {
    let mut neighbors = vec![Vec::new(); n_elements];
    for f in inner_faces {
        neighbors[f.element_m].push(f.element_p);
        neighbors[f.element_p].push(f.element_m);
    }
    let mut colors = vec![usize::MAX; n_elements];
    let mut n_colors = 0;
    for k in 0..n_elements {
        let mut c = 0;
        while neighbors[k].iter().any(|&nb| colors[nb] == c) {
            c += 1;
        }
        colors[k] = c;
        n_colors = n_colors.max(c + 1);
    }
    (colors, n_colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(nx: usize, ny: usize, degree: usize) -> MatrixFreeContext {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, nx, ny, [1, 2, 3, 4]);
        MatrixFreeContext::new(&mesh, degree)
    }

    #[test]
    fn test_batches_pad_last_lane() {
        let batches = Batch::build(6);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].n_active, 2);
        assert_eq!(batches[1].lanes, [4, 5, 5, 5]);
        assert_eq!(batches[1].active(), &[4, 5]);
    }

    #[test]
    fn test_face_lists() {
        let ctx = context(3, 2, 1);
        assert_eq!(ctx.inner_faces().len(), 2 * 2 + 3);
        assert_eq!(ctx.boundary_faces().len(), 10);
        for (i, f) in ctx.boundary_faces().iter().enumerate() {
            assert_eq!(f.index, i);
            assert_eq!(ctx.boundary_face_index(f.element, f.face), Some(i));
        }
    }

    #[test]
    fn test_coloring_separates_neighbors() {
        let ctx = context(4, 3, 1);
        for f in ctx.inner_faces() {
            assert_ne!(ctx.cell_color(f.element_m), ctx.cell_color(f.element_p));
        }
        assert_eq!(ctx.n_colors(), 2);
    }

    #[test]
    fn test_padding_lanes_are_not_written() {
        // 5 cells -> second batch has 1 active lane and 3 padding lanes
        let ctx = context(5, 1, 1);
        let mut dst = ctx.create_vector(1);
        let n = ctx.n_nodes();
        ctx.cell_loop(&mut dst, |cell, out| out.add(cell, vec![1.0; n]));
        assert!(dst.as_slice().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_penalty_scales_with_inverse_h() {
        let coarse = context(2, 2, 2);
        let fine = context(4, 4, 2);
        let ratio = fine.penalty_parameter(5, 1.0) / coarse.penalty_parameter(0, 1.0);
        // interior cell of the fine mesh vs corner cell of the coarse mesh
        assert!(ratio > 1.0);
        // interior fine cell: surface 4 * 0.5 * h, volume h^2
        let h: f64 = 0.25;
        assert!((fine.penalty_parameter(5, 1.0) - 9.0 * 2.0 / h).abs() < 1e-10);
    }
}
