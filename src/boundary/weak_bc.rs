//! Exterior states for weakly imposed boundary conditions.
//!
//! Every operator splits into a homogeneous part (linear in the unknown,
//! boundary data zero) and an inhomogeneous part (unknown zero, boundary
//! data only). The latter is moved to the right-hand side.

use super::descriptor::{BoundaryTypeP, BoundaryTypeU};

/// Which part of an affine operator is evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorType {
    Full,
    Homogeneous,
    Inhomogeneous,
}

impl OperatorType {
    #[inline]
    fn interior_weight(self) -> f64 {
        match self {
            OperatorType::Inhomogeneous => 0.0,
            OperatorType::Full | OperatorType::Homogeneous => 1.0,
        }
    }

    #[inline]
    fn data_weight(self) -> f64 {
        match self {
            OperatorType::Homogeneous => 0.0,
            OperatorType::Full | OperatorType::Inhomogeneous => 1.0,
        }
    }
}

#[inline]
fn dot(a: [f64; 2], b: [f64; 2]) -> f64 {
    a[0] * b[0] + a[1] * b[1]
}

/// Exterior velocity `u⁺` given interior `u⁻`, Dirichlet data `g` and normal `n`.
#[inline]
pub fn exterior_velocity_value(
    u_m: [f64; 2],
    kind: BoundaryTypeU,
    g: [f64; 2],
    n: [f64; 2],
    op: OperatorType,
) -> [f64; 2] {
    let a = op.interior_weight();
    let b = op.data_weight();
    let u = [a * u_m[0], a * u_m[1]];
    match kind {
        BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached => {
            [-u[0] + 2.0 * b * g[0], -u[1] + 2.0 * b * g[1]]
        }
        BoundaryTypeU::Neumann => u,
        BoundaryTypeU::Symmetry => {
            let un = dot(u, n);
            [u[0] - 2.0 * un * n[0], u[1] - 2.0 * un * n[1]]
        }
    }
}

/// Exterior normal gradient `(∇u⁺)·n` given the interior one and the
/// Neumann data `h`.
#[inline]
pub fn exterior_velocity_normal_gradient(
    grad_n_m: [f64; 2],
    kind: BoundaryTypeU,
    h: [f64; 2],
    n: [f64; 2],
    op: OperatorType,
) -> [f64; 2] {
    let a = op.interior_weight();
    let b = op.data_weight();
    let d = [a * grad_n_m[0], a * grad_n_m[1]];
    match kind {
        BoundaryTypeU::Dirichlet | BoundaryTypeU::DirichletCached => d,
        BoundaryTypeU::Neumann => [-d[0] + 2.0 * b * h[0], -d[1] + 2.0 * b * h[1]],
        BoundaryTypeU::Symmetry => {
            let dn = dot(d, n);
            [-d[0] + 2.0 * dn * n[0], -d[1] + 2.0 * dn * n[1]]
        }
    }
}

/// Exterior pressure `p⁺`.
#[inline]
pub fn exterior_pressure_value(p_m: f64, kind: BoundaryTypeP, g: f64, op: OperatorType) -> f64 {
    let p = op.interior_weight() * p_m;
    match kind {
        BoundaryTypeP::Dirichlet => -p + 2.0 * op.data_weight() * g,
        BoundaryTypeP::Neumann => p,
    }
}

/// Exterior normal derivative `∂p⁺/∂n` with Neumann data `h`.
#[inline]
pub fn exterior_pressure_normal_gradient(
    dp_m: f64,
    kind: BoundaryTypeP,
    h: f64,
    op: OperatorType,
) -> f64 {
    let d = op.interior_weight() * dp_m;
    match kind {
        BoundaryTypeP::Dirichlet => d,
        BoundaryTypeP::Neumann => -d + 2.0 * op.data_weight() * h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirichlet_average_equals_data() {
        let u_m = [0.3, -1.2];
        let g = [1.0, 0.5];
        let u_p = exterior_velocity_value(u_m, BoundaryTypeU::Dirichlet, g, [1.0, 0.0], OperatorType::Full);
        assert!((0.5 * (u_m[0] + u_p[0]) - g[0]).abs() < 1e-15);
        assert!((0.5 * (u_m[1] + u_p[1]) - g[1]).abs() < 1e-15);
    }

    #[test]
    fn test_symmetry_mirrors_normal_component() {
        let n = [0.6, 0.8];
        let u_m = [1.0, 2.0];
        let u_p = exterior_velocity_value(u_m, BoundaryTypeU::Symmetry, [0.0; 2], n, OperatorType::Full);
        let avg = [0.5 * (u_m[0] + u_p[0]), 0.5 * (u_m[1] + u_p[1])];
        assert!(dot(avg, n).abs() < 1e-15);
        let t = [-n[1], n[0]];
        assert!((dot(u_p, t) - dot(u_m, t)).abs() < 1e-15);
    }

    #[test]
    fn test_split_sums_to_full() {
        let kinds = [
            BoundaryTypeU::Dirichlet,
            BoundaryTypeU::DirichletCached,
            BoundaryTypeU::Neumann,
            BoundaryTypeU::Symmetry,
        ];
        let n = [0.0, -1.0];
        for kind in kinds {
            let full = exterior_velocity_normal_gradient([0.4, 0.1], kind, [2.0, 3.0], n, OperatorType::Full);
            let hom = exterior_velocity_normal_gradient([0.4, 0.1], kind, [2.0, 3.0], n, OperatorType::Homogeneous);
            let inh = exterior_velocity_normal_gradient([0.4, 0.1], kind, [2.0, 3.0], n, OperatorType::Inhomogeneous);
            for d in 0..2 {
                assert!((full[d] - hom[d] - inh[d]).abs() < 1e-15, "{:?}", kind);
            }
        }
        let p = exterior_pressure_value(0.7, BoundaryTypeP::Dirichlet, 2.0, OperatorType::Inhomogeneous);
        assert_eq!(p, 4.0);
    }
}
