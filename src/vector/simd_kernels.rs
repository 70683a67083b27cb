//! BLAS-1 kernels used by the Krylov solvers and smoothers.
//!
//! Scalar versions are always compiled; with the `simd` feature the public
//! entry points dispatch through `pulp` to the widest instruction set the
//! host offers.

#[cfg(feature = "simd")]
use pulp::{Arch, Simd, WithSimd};

/// `y += a * x`
pub fn axpy_scalar(a: f64, x: &[f64], y: &mut [f64]) {
    debug_assert_eq!(x.len(), y.len());
    for (yi, &xi) in y.iter_mut().zip(x) {
        *yi += a * xi;
    }
}

/// `Σ x_i y_i`
pub fn dot_scalar(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

#[cfg(feature = "simd")]
mod simd_impl {
    use super::*;

    #[inline]
    pub fn axpy_inner<S: Simd>(simd: S, a: f64, x: &[f64], y: &mut [f64]) {
        let a_v = simd.f64s_splat(a);
        let (x_head, x_tail) = S::f64s_as_simd(x);
        let (y_head, y_tail) = S::f64s_as_mut_simd(y);
        for (yv, xv) in y_head.iter_mut().zip(x_head) {
            *yv = simd.f64s_mul_add(a_v, *xv, *yv);
        }
        axpy_scalar(a, x_tail, y_tail);
    }

    #[inline]
    pub fn dot_inner<S: Simd>(simd: S, x: &[f64], y: &[f64]) -> f64 {
        let (x_head, x_tail) = S::f64s_as_simd(x);
        let (y_head, y_tail) = S::f64s_as_simd(y);
        let mut acc = simd.f64s_splat(0.0);
        for (xv, yv) in x_head.iter().zip(y_head) {
            acc = simd.f64s_mul_add(*xv, *yv, acc);
        }
        simd.f64s_reduce_sum(acc) + dot_scalar(x_tail, y_tail)
    }
}

/// `y += a * x` with runtime SIMD dispatch.
#[cfg(feature = "simd")]
pub fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    struct Impl<'a> {
        a: f64,
        x: &'a [f64],
        y: &'a mut [f64],
    }

    impl WithSimd for Impl<'_> {
        type Output = ();

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            simd_impl::axpy_inner(simd, self.a, self.x, self.y);
        }
    }

    Arch::new().dispatch(Impl { a, x, y });
}

/// Dot product with runtime SIMD dispatch.
#[cfg(feature = "simd")]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    struct Impl<'a> {
        x: &'a [f64],
        y: &'a [f64],
    }

    impl WithSimd for Impl<'_> {
        type Output = f64;

        #[inline(always)]
        fn with_simd<S: Simd>(self, simd: S) -> Self::Output {
            simd_impl::dot_inner(simd, self.x, self.y)
        }
    }

    Arch::new().dispatch(Impl { x, y })
}

#[cfg(not(feature = "simd"))]
pub fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    axpy_scalar(a, x, y);
}

#[cfg(not(feature = "simd"))]
pub fn dot(x: &[f64], y: &[f64]) -> f64 {
    dot_scalar(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatched_kernels_match_scalar() {
        let x: Vec<f64> = (0..37).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut y: Vec<f64> = (0..37).map(|i| (i as f64 * 0.11).cos()).collect();
        let mut y_ref = y.clone();

        axpy(0.7, &x, &mut y);
        axpy_scalar(0.7, &x, &mut y_ref);
        for (a, b) in y.iter().zip(&y_ref) {
            assert!((a - b).abs() < 1e-14);
        }
        assert!((dot(&x, &y) - dot_scalar(&x, &y)).abs() < 1e-12);
    }
}
