//! Curl of velocity and vorticity fields.
//!
//! In 2D the vorticity `ω = ∂u_y/∂x - ∂u_x/∂y` is a scalar and is stored in
//! component 0 of a velocity-layout vector; its curl is the vector
//! `(∂ω/∂y, -∂ω/∂x)`. The 3D variants act on full gradient tensors.

use crate::operators::FaceIntegrator;

/// Scalar vorticity from the velocity gradient `grad[c] = ∇u_c`.
#[inline]
pub fn vorticity_2d(grad: [[f64; 2]; 2]) -> f64 {
    grad[1][0] - grad[0][1]
}

/// Curl of the scalar field with gradient `grad_omega`.
#[inline]
pub fn curl_of_scalar_2d(grad_omega: [f64; 2]) -> [f64; 2] {
    [grad_omega[1], -grad_omega[0]]
}

/// Curl of a 3D vector field with gradient `grad[c] = ∇u_c`.
#[inline]
pub fn curl_3d(grad: [[f64; 3]; 3]) -> [f64; 3] {
    [
        grad[2][1] - grad[1][2],
        grad[0][2] - grad[2][0],
        grad[1][0] - grad[0][1],
    ]
}

/// `curl ω` at face point `q` of an integrator evaluated with gradients on
/// a vorticity vector.
#[inline]
pub fn curl_at_face_point(omega: &FaceIntegrator, q: usize) -> [f64; 2] {
    curl_of_scalar_2d(omega.get_gradient(q, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_body_rotation() {
        // u = (-y, x): ω = 2
        let grad = [[0.0, -1.0], [1.0, 0.0]];
        assert_eq!(vorticity_2d(grad), 2.0);
    }

    #[test]
    fn test_3d_reduces_to_2d() {
        let grad = [[0.3, -1.2, 0.0], [0.7, -0.3, 0.0], [0.0, 0.0, 0.0]];
        let curl = curl_3d(grad);
        assert_eq!(curl[0], 0.0);
        assert_eq!(curl[1], 0.0);
        assert_eq!(curl[2], vorticity_2d([[0.3, -1.2], [0.7, -0.3]]));
    }

    #[test]
    fn test_curl_of_scalar_is_divergence_free() {
        // ω = x² y: curl ω = (x², -2xy), divergence 2x - 2x = 0
        let (x, y) = (0.4, -1.3);
        let c = curl_of_scalar_2d([2.0 * x * y, x * x]);
        assert_eq!(c, [x * x, -2.0 * x * y]);
    }
}
