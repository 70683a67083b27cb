//! Legendre polynomials on [-1, 1].

/// Evaluate P_n(x) with the three-term recurrence
/// `(k+1) P_{k+1} = (2k+1) x P_k - k P_{k-1}`.
pub fn legendre(n: usize, x: f64) -> f64 {
    legendre_and_derivative(n, x).0
}

/// Evaluate `(P_n(x), P_n'(x))` in a single sweep.
///
/// The derivative follows the recurrence `P'_{k+1} = P'_{k-1} + (2k+1) P_k`,
/// which stays well defined at the end points.
pub fn legendre_and_derivative(n: usize, x: f64) -> (f64, f64) {
    let (mut p_km1, mut p_k) = (1.0, x);
    let (mut dp_km1, mut dp_k) = (0.0, 1.0);
    if n == 0 {
        return (p_km1, dp_km1);
    }
    for k in 1..n {
        let kf = k as f64;
        let p_kp1 = ((2.0 * kf + 1.0) * x * p_k - kf * p_km1) / (kf + 1.0);
        let dp_kp1 = dp_km1 + (2.0 * kf + 1.0) * p_k;
        p_km1 = p_k;
        p_k = p_kp1;
        dp_km1 = dp_k;
        dp_k = dp_kp1;
    }
    (p_k, dp_k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_low_order_closed_forms() {
        for &x in &[-1.0, -0.3, 0.0, 0.45, 1.0] {
            let p2 = 0.5 * (3.0 * x * x - 1.0);
            let p3 = 0.5 * (5.0 * x * x * x - 3.0 * x);
            assert!((legendre(2, x) - p2).abs() < 1e-14);
            let (v, d) = legendre_and_derivative(3, x);
            assert!((v - p3).abs() < 1e-14);
            assert!((d - 0.5 * (15.0 * x * x - 3.0)).abs() < 1e-13);
        }
    }

    #[test]
    fn test_end_point_derivative() {
        for n in 1..8 {
            let (_, d) = legendre_and_derivative(n, 1.0);
            let expected = (n * (n + 1)) as f64 / 2.0;
            assert!((d - expected).abs() < 1e-12, "n = {}: {} vs {}", n, d, expected);
        }
    }
}
