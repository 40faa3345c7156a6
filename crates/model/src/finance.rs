//! Discounting and internal rate of return

/// Lowest growth factor `1 + r` scanned for IRR roots; roots with
/// `r < -0.999` are not found
const IRR_SCAN_MIN: f64 = 1e-3;
/// Highest growth factor `1 + r` scanned for IRR roots
const IRR_SCAN_MAX: f64 = 1e3;
/// Geometric grid points between the scan bounds
const IRR_SCAN_POINTS: usize = 4000;
const IRR_TOLERANCE: f64 = 1e-10;
/// `|NPV|` relative to the summed absolute flows below which a local minimum
/// of `|NPV|` counts as a double root
const IRR_TANGENT_TOLERANCE: f64 = 1e-9;
const GOLDEN: f64 = 0.618_033_988_749_894_9;

/// Present value factor for year `t`
#[inline]
pub fn discount_factor(rate: f64, t: usize) -> f64 {
    1.0 / (1.0 + rate).powi(t as i32)
}

/// Net present value of yearly cash flows, the first one undiscounted
pub fn npv(rate: f64, cash_flows: &[f64]) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf * discount_factor(rate, t))
        .sum()
}

/// Internal rate of return
///
/// Among all rates `r > -1` that zero the NPV, returns the one closest to
/// zero. Roots where the NPV touches zero without changing sign are found
/// from local minima of `|NPV|` on the scan grid. `None` when there is no
/// real root in the scanned range.
pub fn irr(cash_flows: &[f64]) -> Option<f64> {
    if cash_flows.len() < 2 || cash_flows.iter().any(|cf| !cf.is_finite()) {
        return None;
    }

    let at = |growth: f64| npv(growth - 1.0, cash_flows);
    let ratio = (IRR_SCAN_MAX / IRR_SCAN_MIN).powf(1.0 / IRR_SCAN_POINTS as f64);

    let mut best: Option<f64> = None;
    let mut consider = |rate: f64| {
        if best.is_none_or(|b| rate.abs() < b.abs()) {
            best = Some(rate);
        }
    };

    let scale: f64 = cash_flows.iter().map(|cf| cf.abs()).sum();
    let mut previous: Option<(f64, f64)> = None;
    let mut lo = IRR_SCAN_MIN;
    let mut f_lo = at(lo);
    for _ in 0..IRR_SCAN_POINTS {
        let hi = lo * ratio;
        let f_hi = at(hi);

        if f_lo == 0.0 {
            consider(lo - 1.0);
        } else if f_lo.signum() != f_hi.signum() && f_hi != 0.0 {
            consider(bisect(&at, lo, hi, f_lo) - 1.0);
        } else if let Some((g_prev, f_prev)) = previous {
            let touches = f_prev.signum() == f_lo.signum()
                && f_lo.abs() <= f_prev.abs()
                && f_lo.abs() <= f_hi.abs();
            if touches {
                let growth = golden_min(&|g: f64| at(g).abs(), g_prev, hi);
                if at(growth).abs() <= IRR_TANGENT_TOLERANCE * scale {
                    consider(growth - 1.0);
                }
            }
        }

        previous = Some((lo, f_lo));
        lo = hi;
        f_lo = f_hi;
    }
    if f_lo == 0.0 {
        consider(lo - 1.0);
    }

    best
}

fn bisect(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64, mut f_lo: f64) -> f64 {
    while hi - lo > IRR_TOLERANCE * lo.max(1.0) {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Minimum of a unimodal function on `[lo, hi]` by golden-section search
fn golden_min(f: &impl Fn(f64) -> f64, mut lo: f64, mut hi: f64) -> f64 {
    let mut a = hi - GOLDEN * (hi - lo);
    let mut b = lo + GOLDEN * (hi - lo);
    let (mut f_a, mut f_b) = (f(a), f(b));
    while hi - lo > IRR_TOLERANCE * lo.max(1.0) {
        if f_a < f_b {
            hi = b;
            b = a;
            f_b = f_a;
            a = hi - GOLDEN * (hi - lo);
            f_a = f(a);
        } else {
            lo = a;
            a = b;
            f_a = f_b;
            b = lo + GOLDEN * (hi - lo);
            f_b = f(b);
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_npv_zero_rate_is_sum() {
        assert_relative_eq!(npv(0.0, &[-100.0, 50.0, 60.0]), 10.0);
    }

    #[test]
    fn test_npv_discounts_from_year_zero() {
        let value = npv(0.1, &[100.0, 110.0, 121.0]);
        assert_relative_eq!(value, 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_irr_single_period() {
        let rate = irr(&[-100.0, 110.0]).unwrap();
        assert_relative_eq!(rate, 0.10, epsilon = 1e-8);
    }

    #[test]
    fn test_irr_annuity() {
        // Known value: -1000 followed by five payments of 300
        let rate = irr(&[-1000.0, 300.0, 300.0, 300.0, 300.0, 300.0]).unwrap();
        assert_relative_eq!(rate, 0.152382, epsilon = 1e-5);
        assert_relative_eq!(npv(rate, &[-1000.0, 300.0, 300.0, 300.0, 300.0, 300.0]), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_irr_negative_rate() {
        let rate = irr(&[-100.0, 90.0]).unwrap();
        assert_relative_eq!(rate, -0.10, epsilon = 1e-8);
    }

    #[test]
    fn test_irr_undefined_without_sign_change() {
        assert_eq!(irr(&[100.0, 50.0, 20.0]), None);
        assert_eq!(irr(&[-100.0, -50.0]), None);
        assert_eq!(irr(&[-100.0]), None);
    }

    #[test]
    fn test_irr_double_root() {
        // (1 - 1.1 v)^2 with v = 1 / (1 + r): touches zero at r = 0.1
        let flows = [1.0, -2.2, 1.21];
        let rate = irr(&flows).unwrap();
        assert_relative_eq!(rate, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_irr_near_miss_is_not_a_root() {
        // Same parabola lifted clear of zero
        assert_eq!(irr(&[1.01, -2.2, 1.21]), None);
    }

    #[test]
    fn test_irr_prefers_root_closest_to_zero() {
        // (1+r-1.1)(1+r-1.3) expanded: roots at r=0.1 and r=0.3
        let flows = [-1.0, 2.4, -1.43];
        let rate = irr(&flows).unwrap();
        assert_relative_eq!(rate, 0.1, epsilon = 1e-7);
    }
}
