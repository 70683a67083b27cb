//! Discontinuous nodal vector laid out `[element][component][node]`.

use super::simd_kernels;

/// Nodal DG field with `n_components` components per node.
///
/// Velocity fields use two components, pressure and other scalars one.
#[derive(Clone, Debug, PartialEq)]
pub struct DofVector {
    data: Vec<f64>,
    n_elements: usize,
    n_components: usize,
    n_nodes: usize,
}

impl DofVector {
    pub fn new(n_elements: usize, n_components: usize, n_nodes: usize) -> Self {
        Self {
            data: vec![0.0; n_elements * n_components * n_nodes],
            n_elements,
            n_components,
            n_nodes,
        }
    }

    /// Zero vector with the same layout.
    pub fn zeros_like(other: &DofVector) -> Self {
        Self::new(other.n_elements, other.n_components, other.n_nodes)
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_layout(&self, other: &DofVector) -> bool {
        self.n_elements == other.n_elements
            && self.n_components == other.n_components
            && self.n_nodes == other.n_nodes
    }

    #[inline]
    pub fn index(&self, element: usize, component: usize, node: usize) -> usize {
        (element * self.n_components + component) * self.n_nodes + node
    }

    #[inline]
    pub fn get(&self, element: usize, component: usize, node: usize) -> f64 {
        self.data[self.index(element, component, node)]
    }

    #[inline]
    pub fn set(&mut self, element: usize, component: usize, node: usize, value: f64) {
        let i = self.index(element, component, node);
        self.data[i] = value;
    }

    /// Two-component value at a node; the second entry is zero for scalars.
    #[inline]
    pub fn vector_value(&self, element: usize, node: usize) -> [f64; 2] {
        let u = self.get(element, 0, node);
        let v = if self.n_components > 1 {
            self.get(element, 1, node)
        } else {
            0.0
        };
        [u, v]
    }

    /// All components of one element, contiguous.
    pub fn element(&self, element: usize) -> &[f64] {
        let len = self.n_components * self.n_nodes;
        &self.data[element * len..(element + 1) * len]
    }

    pub fn element_mut(&mut self, element: usize) -> &mut [f64] {
        let len = self.n_components * self.n_nodes;
        &mut self.data[element * len..(element + 1) * len]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// `self = other`
    pub fn equ(&mut self, other: &DofVector) {
        debug_assert!(self.same_layout(other));
        self.data.copy_from_slice(&other.data);
    }

    pub fn dot(&self, other: &DofVector) -> f64 {
        simd_kernels::dot(&self.data, &other.data)
    }

    pub fn norm_l2(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Largest absolute entry; NaN if any entry is NaN.
    pub fn norm_max(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, v| {
            if m.is_nan() || v.is_nan() { f64::NAN } else { m.max(v.abs()) }
        })
    }

    /// `self += a * x`
    pub fn axpy(&mut self, a: f64, x: &DofVector) {
        simd_kernels::axpy(a, &x.data, &mut self.data);
    }

    /// `self = s * self + a * x`
    pub fn sadd(&mut self, s: f64, a: f64, x: &DofVector) {
        for (y, &xi) in self.data.iter_mut().zip(&x.data) {
            *y = s * *y + a * xi;
        }
    }

    pub fn scale(&mut self, s: f64) {
        self.data.iter_mut().for_each(|v| *v *= s);
    }

    /// Entry-wise product `self *= other`.
    pub fn scale_by(&mut self, other: &DofVector) {
        for (y, &x) in self.data.iter_mut().zip(&other.data) {
            *y *= x;
        }
    }

    /// Arithmetic mean of all entries.
    pub fn mean_value(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f64>() / self.data.len() as f64
    }

    /// Remove the mean, fixing the gauge of pure-Neumann pressure problems.
    pub fn set_zero_mean_value(&mut self) {
        let mean = self.mean_value();
        self.data.iter_mut().for_each(|v| *v -= mean);
    }

    /// Add element-local values into `element`'s block.
    pub fn add_local(&mut self, element: usize, local: &[f64]) {
        for (y, &x) in self.element_mut(element).iter_mut().zip(local) {
            *y += x;
        }
    }
}
