//! Unstructured quadrilateral mesh with face connectivity.
//!
//! Face convention (counter-clockwise around every element):
//! - Face 0 (bottom): from vertex 0 to vertex 1
//! - Face 1 (right):  from vertex 1 to vertex 2
//! - Face 2 (top):    from vertex 2 to vertex 3
//! - Face 3 (left):   from vertex 3 to vertex 0
//!
//! Because all elements are counter-clockwise, two elements sharing an edge
//! traverse it in opposite directions.

use std::collections::{BTreeSet, HashMap};

/// Boundary identifier attached to boundary faces.
pub type BoundaryId = u32;

/// Reference to an element and one of its faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementFace {
    pub element: usize,
    pub face: usize,
}

impl ElementFace {
    pub fn new(element: usize, face: usize) -> Self {
        Self { element, face }
    }
}

/// An edge of the mesh: one or two adjacent element faces.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Vertex pair, sorted
    pub vertices: (usize, usize),
    /// First element that visited the edge
    pub left: ElementFace,
    /// Neighbour across the edge, `None` on the boundary
    pub right: Option<ElementFace>,
    /// Boundary id for boundary edges
    pub boundary_id: Option<BoundaryId>,
}

impl Edge {
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }
}

/// 2D quadrilateral mesh.
#[derive(Clone, Debug)]
pub struct Mesh2D {
    pub vertices: Vec<(f64, f64)>,
    /// Counter-clockwise vertex indices per element
    pub elements: Vec<[usize; 4]>,
    pub edges: Vec<Edge>,
    /// Edge index of each element face
    pub element_edges: Vec<[usize; 4]>,
    pub n_elements: usize,
}

impl Mesh2D {
    /// Build connectivity from vertex/element lists.
    ///
    /// `boundary_id(a, b)` is called once per boundary edge with its two
    /// vertex indices.
    pub fn from_cells(
        vertices: Vec<(f64, f64)>,
        elements: Vec<[usize; 4]>,
        boundary_id: impl Fn(usize, usize) -> BoundaryId,
    ) -> Self {
        let n_elements = elements.len();
        let mut edges: Vec<Edge> = Vec::with_capacity(2 * n_elements + 2);
        let mut element_edges = vec![[0usize; 4]; n_elements];
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::with_capacity(2 * n_elements);

        for (k, cell) in elements.iter().enumerate() {
            for face in 0..4 {
                let a = cell[face];
                let b = cell[(face + 1) % 4];
                let key = (a.min(b), a.max(b));
                let here = ElementFace::new(k, face);
                match lookup.get(&key) {
                    Some(&e) => {
                        edges[e].right = Some(here);
                        element_edges[k][face] = e;
                    }
                    None => {
                        let e = edges.len();
                        edges.push(Edge {
                            vertices: key,
                            left: here,
                            right: None,
                            boundary_id: None,
                        });
                        lookup.insert(key, e);
                        element_edges[k][face] = e;
                    }
                }
            }
        }

        for edge in edges.iter_mut().filter(|e| e.right.is_none()) {
            edge.boundary_id = Some(boundary_id(edge.vertices.0, edge.vertices.1));
        }

        Self {
            vertices,
            elements,
            edges,
            element_edges,
            n_elements,
        }
    }

    /// Structured `nx × ny` mesh of `[x0, x1] × [y0, y1]`.
    ///
    /// `side_ids` are the boundary ids of the [south, east, north, west] sides.
    pub fn uniform_rectangle(
        x0: f64,
        x1: f64,
        y0: f64,
        y1: f64,
        nx: usize,
        ny: usize,
        side_ids: [BoundaryId; 4],
    ) -> Self {
        assert!(
            nx > 0 && ny > 0,
            "Need at least one element in each direction"
        );
        assert!(x1 > x0 && y1 > y0, "Invalid domain bounds");

        let dx = (x1 - x0) / nx as f64;
        let dy = (y1 - y0) / ny as f64;
        let stride = nx + 1;

        let vertices: Vec<(f64, f64)> = (0..=ny)
            .flat_map(|j| (0..=nx).map(move |i| (x0 + i as f64 * dx, y0 + j as f64 * dy)))
            .collect();

        let elements: Vec<[usize; 4]> = (0..ny)
            .flat_map(|j| {
                (0..nx).map(move |i| {
                    let v0 = j * stride + i;
                    [v0, v0 + 1, v0 + 1 + stride, v0 + stride]
                })
            })
            .collect();

        let side_of = move |a: usize, b: usize| -> BoundaryId {
            let (ia, ja) = (a % stride, a / stride);
            let (ib, jb) = (b % stride, b / stride);
            if ja == 0 && jb == 0 {
                side_ids[0]
            } else if ia == nx && ib == nx {
                side_ids[1]
            } else if ja == ny && jb == ny {
                side_ids[2]
            } else {
                side_ids[3]
            }
        };

        Self::from_cells(vertices, elements, side_of)
    }

    /// Split every element into four children.
    ///
    /// Returns the refined mesh and, for every element of `self`, the indices
    /// of its children ordered bottom-left, bottom-right, top-right, top-left
    /// in the parent's reference coordinates. Child boundary faces inherit the
    /// parent's boundary id.
    pub fn refine(&self) -> (Mesh2D, Vec<[usize; 4]>) {
        let n_v = self.vertices.len();
        let n_e = self.edges.len();

        let mut vertices = self.vertices.clone();
        vertices.reserve(n_e + self.n_elements);
        for edge in &self.edges {
            let (a, b) = (self.vertices[edge.vertices.0], self.vertices[edge.vertices.1]);
            vertices.push((0.5 * (a.0 + b.0), 0.5 * (a.1 + b.1)));
        }
        for k in 0..self.n_elements {
            vertices.push(self.reference_to_physical(k, 0.0, 0.0));
        }

        let mut inherited: HashMap<(usize, usize), BoundaryId> = HashMap::new();
        for (e, edge) in self.edges.iter().enumerate() {
            if let Some(id) = edge.boundary_id {
                let mid = n_v + e;
                let (a, b) = edge.vertices;
                inherited.insert((a.min(mid), a.max(mid)), id);
                inherited.insert((b.min(mid), b.max(mid)), id);
            }
        }

        let mut elements = Vec::with_capacity(4 * self.n_elements);
        let mut children = Vec::with_capacity(self.n_elements);
        for (k, cell) in self.elements.iter().enumerate() {
            let m = |face: usize| n_v + self.element_edges[k][face];
            let c = n_v + n_e + k;
            let base = elements.len();
            elements.push([cell[0], m(0), c, m(3)]);
            elements.push([m(0), cell[1], m(1), c]);
            elements.push([c, m(1), cell[2], m(2)]);
            elements.push([m(3), c, m(2), cell[3]]);
            children.push([base, base + 1, base + 2, base + 3]);
        }

        let fine = Self::from_cells(vertices, elements, |a, b| {
            inherited.get(&(a.min(b), a.max(b))).copied().unwrap_or_default()
        });
        (fine, children)
    }

    pub fn n_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn element_vertices(&self, k: usize) -> [(f64, f64); 4] {
        let v = &self.elements[k];
        [
            self.vertices[v[0]],
            self.vertices[v[1]],
            self.vertices[v[2]],
            self.vertices[v[3]],
        ]
    }

    /// Replace every vertex `x` by `f(x)`. Connectivity and boundary ids are
    /// untouched, so geometry caches built from this mesh must be recomputed.
    pub fn displace_vertices(&mut self, f: impl Fn((f64, f64)) -> (f64, f64)) {
        for v in &mut self.vertices {
            *v = f(*v);
        }
    }

    /// Bilinear map from reference `(r, s) ∈ [-1, 1]²` to physical space.
    pub fn reference_to_physical(&self, k: usize, r: f64, s: f64) -> (f64, f64) {
        let [v0, v1, v2, v3] = self.element_vertices(k);
        let n = bilinear_shape(r, s);
        (
            n[0] * v0.0 + n[1] * v1.0 + n[2] * v2.0 + n[3] * v3.0,
            n[0] * v0.1 + n[1] * v1.1 + n[2] * v2.1 + n[3] * v3.1,
        )
    }

    pub fn neighbor(&self, element: usize, face: usize) -> Option<ElementFace> {
        let edge = &self.edges[self.element_edges[element][face]];
        let here = ElementFace::new(element, face);
        match edge.right {
            Some(right) if edge.left == here => Some(right),
            Some(_) => Some(edge.left),
            None => None,
        }
    }

    pub fn boundary_id(&self, element: usize, face: usize) -> Option<BoundaryId> {
        self.edges[self.element_edges[element][face]].boundary_id
    }

    /// All boundary ids present on the mesh.
    pub fn boundary_ids(&self) -> BTreeSet<BoundaryId> {
        self.edges.iter().filter_map(|e| e.boundary_id).collect()
    }

    pub fn n_boundary_edges(&self) -> usize {
        self.edges.iter().filter(|e| e.is_boundary()).count()
    }

    /// Smallest edge length.
    pub fn h_min(&self) -> f64 {
        self.edges
            .iter()
            .map(|e| {
                let (a, b) = (self.vertices[e.vertices.0], self.vertices[e.vertices.1]);
                ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
            })
            .fold(f64::INFINITY, f64::min)
    }
}

/// Bilinear shape functions of the reference square, vertex order 0..4.
pub fn bilinear_shape(r: f64, s: f64) -> [f64; 4] {
    [
        0.25 * (1.0 - r) * (1.0 - s),
        0.25 * (1.0 + r) * (1.0 - s),
        0.25 * (1.0 + r) * (1.0 + s),
        0.25 * (1.0 - r) * (1.0 + s),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_rectangle_counts() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 2.0, 0.0, 1.0, 4, 2, [0, 1, 2, 3]);
        assert_eq!(mesh.n_elements, 8);
        assert_eq!(mesh.n_vertices(), 15);
        // 4*3 horizontal + 5*2 vertical
        assert_eq!(mesh.edges.len(), 22);
        assert_eq!(mesh.n_boundary_edges(), 12);
        assert_eq!(mesh.boundary_ids().len(), 4);
    }

    #[test]
    fn test_side_ids() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 3, [10, 11, 12, 13]);
        assert_eq!(mesh.boundary_id(0, 0), Some(10));
        assert_eq!(mesh.boundary_id(0, 3), Some(13));
        assert_eq!(mesh.boundary_id(2, 1), Some(11));
        assert_eq!(mesh.boundary_id(8, 2), Some(12));
        assert_eq!(mesh.boundary_id(4, 0), None);
    }

    #[test]
    fn test_neighbors_are_symmetric() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 3, 2, [0; 4]);
        for k in 0..mesh.n_elements {
            for f in 0..4 {
                if let Some(nb) = mesh.neighbor(k, f) {
                    let back = mesh.neighbor(nb.element, nb.face);
                    assert_eq!(back, Some(ElementFace::new(k, f)));
                }
            }
        }
        assert_eq!(mesh.neighbor(0, 1), Some(ElementFace::new(1, 3)));
        assert_eq!(mesh.neighbor(0, 2), Some(ElementFace::new(3, 0)));
    }

    #[test]
    fn test_displace_vertices_keeps_topology() {
        let mut mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 2, [1, 2, 3, 4]);
        mesh.displace_vertices(|(x, y)| (2.0 * x, y + 0.5));
        let (x, y) = mesh.reference_to_physical(3, 1.0, 1.0);
        assert!((x - 2.0).abs() < 1e-14 && (y - 1.5).abs() < 1e-14);
        assert_eq!(mesh.neighbor(0, 1), Some(ElementFace::new(1, 3)));
        assert_eq!(mesh.boundary_id(0, 0), Some(1));
    }

    #[test]
    fn test_refine_inherits_ids_and_geometry() {
        let mesh = Mesh2D::uniform_rectangle(0.0, 1.0, 0.0, 1.0, 2, 1, [1, 2, 3, 4]);
        let (fine, children) = mesh.refine();
        assert_eq!(fine.n_elements, 8);
        assert_eq!(fine.n_boundary_edges(), 2 * mesh.n_boundary_edges());
        assert_eq!(fine.boundary_ids(), mesh.boundary_ids());

        // child 0 of element 0 occupies [0, 0.25] x [0, 0.5]
        let c = children[0][0];
        let (x, y) = fine.reference_to_physical(c, 1.0, 1.0);
        assert!((x - 0.25).abs() < 1e-14 && (y - 0.5).abs() < 1e-14);
        assert_eq!(fine.boundary_id(c, 0), Some(1));
        assert_eq!(fine.boundary_id(c, 3), Some(4));

        // child 2 matches the parent map at its reference midpoint
        let c = children[1][2];
        let (x, y) = fine.reference_to_physical(c, 0.0, 0.0);
        let (xp, yp) = mesh.reference_to_physical(1, 0.5, 0.5);
        assert!((x - xp).abs() < 1e-14 && (y - yp).abs() < 1e-14);
    }
}
