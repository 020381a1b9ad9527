//! Special functions and the F-distribution tail used by nested-model tests.

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const BETA_CF_MAX_ITER: usize = 300;
const BETA_CF_EPS: f64 = 1e-15;
const BETA_CF_TINY: f64 = 1e-300;

/// Natural log of the gamma function for `x > 0` (Lanczos approximation).
///
/// # Examples
///
/// ```
/// # use powerrank_stats::distribution::ln_gamma;
/// // Γ(5) = 24
/// assert!((ln_gamma(5.0) - 24.0_f64.ln()).abs() < 1e-12);
/// // Γ(1/2) = √π
/// assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-12);
/// ```
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn ln_gamma(x: f64) -> f64 {
    if x <= 0.0 {
        return f64::INFINITY;
    }
    if x < 0.5 {
        // reflection: Γ(x) Γ(1 - x) = π / sin(πx)
        let pi = std::f64::consts::PI;
        return pi.ln() - (pi * x).sin().ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut sum = LANCZOS_COEFFICIENTS[0];
    for (i, &c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
        sum += c / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta function `I_x(a, b)`.
///
/// Evaluated with Lentz's continued fraction, using the symmetry
/// `I_x(a, b) = 1 - I_{1-x}(b, a)` where the fraction converges faster.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::distribution::regularized_incomplete_beta;
/// assert!((regularized_incomplete_beta(0.5, 3.0, 3.0) - 0.5).abs() < 1e-12);
/// // I_x(1, 1) = x
/// assert!((regularized_incomplete_beta(0.3, 1.0, 1.0) - 0.3).abs() < 1e-12);
/// ```
#[must_use]
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

#[expect(clippy::cast_precision_loss)]
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < BETA_CF_TINY {
        d = BETA_CF_TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=BETA_CF_MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < BETA_CF_TINY {
            d = BETA_CF_TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < BETA_CF_TINY {
            c = BETA_CF_TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < BETA_CF_TINY {
            d = BETA_CF_TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < BETA_CF_TINY {
            c = BETA_CF_TINY;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < BETA_CF_EPS {
            break;
        }
    }
    h
}

/// Survival function `P(F > f)` of the F-distribution with `(d1, d2)` degrees
/// of freedom.
///
/// Returns `None` for non-positive degrees of freedom or a non-finite
/// statistic. A non-positive statistic has survival probability 1.
///
/// # Examples
///
/// ```
/// # use powerrank_stats::distribution::f_survival;
/// // the median of F(d, d) is 1
/// assert!((f_survival(1.0, 4.0, 4.0).unwrap() - 0.5).abs() < 1e-12);
/// assert_eq!(f_survival(0.0, 2.0, 5.0), Some(1.0));
/// assert_eq!(f_survival(1.0, 0.0, 5.0), None);
/// ```
#[must_use]
pub fn f_survival(f: f64, d1: f64, d2: f64) -> Option<f64> {
    if !(d1 > 0.0 && d2 > 0.0) || !f.is_finite() {
        return None;
    }
    if f <= 0.0 {
        return Some(1.0);
    }
    let x = d2 / (d2 + d1 * f);
    Some(regularized_incomplete_beta(x, 0.5 * d2, 0.5 * d1).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ln_gamma_integers() {
        let mut factorial = 1.0_f64;
        for n in 1..15 {
            let x = f64::from(n);
            assert!((ln_gamma(x) - factorial.ln()).abs() < 1e-10, "n = {n}");
            factorial *= x;
        }
    }

    #[test]
    fn test_ln_gamma_small_argument() {
        // Γ(0.25) ≈ 3.625609908221908
        assert!((ln_gamma(0.25) - 3.625_609_908_221_908_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn test_f_survival_two_numerator_df_closed_form() {
        // for d1 = 2: P(F > f) = (1 + 2f / d2)^(-d2 / 2)
        let p = f_survival(3.0, 2.0, 4.0).unwrap();
        assert!((p - 0.16).abs() < 1e-12);
        let p = f_survival(0.7, 2.0, 9.0).unwrap();
        let expected = (1.0_f64 + 2.0 * 0.7 / 9.0).powf(-4.5);
        assert!((p - expected).abs() < 1e-12);
    }

    #[test]
    fn test_f_survival_monotone() {
        let mut prev = 1.0;
        for i in 1..50 {
            let f = f64::from(i) * 0.25;
            let p = f_survival(f, 3.0, 11.0).unwrap();
            assert!(p <= prev);
            prev = p;
        }
        assert!(prev < 0.01);
    }

    #[test]
    fn test_incomplete_beta_bounds() {
        assert_eq!(regularized_incomplete_beta(0.0, 2.0, 3.0), 0.0);
        assert_eq!(regularized_incomplete_beta(1.0, 2.0, 3.0), 1.0);
    }

    #[test]
    fn test_f_survival_rejects_non_finite() {
        assert_eq!(f_survival(f64::NAN, 1.0, 1.0), None);
        assert_eq!(f_survival(f64::INFINITY, 1.0, 1.0), None);
    }
}
