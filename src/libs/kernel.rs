//! Pairwise Gauss-integral kernel of two line segments.
//!
//! The value is the signed solid angle `Ω` under which one segment sees the
//! other, divided by `2π` (Klenin & Langowski, Biopolymers 54, 2000). Summed
//! over all non-adjacent segment pairs `i < j` of a closed poly-line this is
//! its writhe.

use nalgebra::Vector3;

/// Cross products shorter than this are treated as vanishing.
pub const DEGENERATE_EPS: f64 = 1e-12;

/// A directed line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
}

impl Segment {
    pub fn new(start: Vector3<f64>, end: Vector3<f64>) -> Self {
        Segment { start, end }
    }

    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

fn unit_normal(a: &Vector3<f64>, b: &Vector3<f64>) -> Option<Vector3<f64>> {
    let n = a.cross(b);
    let norm = n.norm();
    if norm < DEGENERATE_EPS || !norm.is_finite() {
        None
    } else {
        Some(n / norm)
    }
}

fn clamped_asin(x: f64) -> f64 {
    x.clamp(-1.0, 1.0).asin()
}

/// Gauss-integral contribution of the segment pair `(s1, s2)`.
///
/// Coplanar, collinear and touching configurations give exactly `0.0`.
///
/// ```
/// use gisa::libs::kernel::{gauss_kernel, Segment};
/// use nalgebra::Vector3;
///
/// let s1 = Segment::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
/// let s2 = Segment::new(Vector3::new(3.0, 0.0, 0.0), Vector3::new(4.0, 0.0, 0.0));
/// assert_eq!(gauss_kernel(&s1, &s2), 0.0);
/// ```
pub fn gauss_kernel(s1: &Segment, s2: &Segment) -> f64 {
    let r12 = s1.end - s1.start;
    let r13 = s2.start - s1.start;
    let r14 = s2.end - s1.start;
    let r23 = s2.start - s1.end;
    let r24 = s2.end - s1.end;
    let r34 = s2.end - s2.start;

    let sign = r34.cross(&r12).dot(&r13);
    if sign == 0.0 || !sign.is_finite() {
        return 0.0;
    }

    let normals = (
        unit_normal(&r13, &r14),
        unit_normal(&r14, &r24),
        unit_normal(&r24, &r23),
        unit_normal(&r23, &r13),
    );
    let (n1, n2, n3, n4) = match normals {
        (Some(n1), Some(n2), Some(n3), Some(n4)) => (n1, n2, n3, n4),
        _ => return 0.0,
    };

    let omega = clamped_asin(n1.dot(&n2))
        + clamped_asin(n2.dot(&n3))
        + clamped_asin(n3.dot(&n4))
        + clamped_asin(n4.dot(&n1));

    let value = omega.copysign(sign) / (2.0 * std::f64::consts::PI);
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seg(a: [f64; 3], b: [f64; 3]) -> Segment {
        Segment::new(Vector3::new(a[0], a[1], a[2]), Vector3::new(b[0], b[1], b[2]))
    }

    #[test]
    fn collinear_is_zero() {
        let s1 = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let s2 = seg([2.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        assert_eq!(gauss_kernel(&s1, &s2), 0.0);
        assert_eq!(gauss_kernel(&s2, &s1), 0.0);
    }

    #[test]
    fn coplanar_is_zero() {
        let s1 = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let s2 = seg([0.0, 2.0, 0.0], [1.0, 3.0, 0.0]);
        assert_eq!(gauss_kernel(&s1, &s2), 0.0);
    }

    #[test]
    fn touching_segments_are_zero() {
        // adjacent segments share a point
        let s1 = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let s2 = seg([1.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
        assert_eq!(gauss_kernel(&s1, &s2), 0.0);
    }

    #[test]
    fn tends_to_zero_towards_collinearity() {
        let s1 = seg([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        for k in 1..8 {
            let eps = 10f64.powi(-k);
            let s2 = seg([2.0, eps, 0.0], [3.0, 0.0, eps]);
            let w = gauss_kernel(&s1, &s2);
            assert!(w.is_finite());
            assert!(w.abs() < eps, "eps = {}, w = {}", eps, w);
        }
        let s2 = seg([2.0, 0.0, 0.0], [3.0, 0.0, 0.0]);
        assert_eq!(gauss_kernel(&s1, &s2), 0.0);
    }

    #[test]
    fn long_perpendicular_crossing_approaches_one() {
        let l = 1e4;
        let s1 = seg([-l, 0.0, 0.0], [l, 0.0, 0.0]);
        let s2 = seg([0.0, -l, 1.0], [0.0, l, 1.0]);
        let w = gauss_kernel(&s1, &s2);
        assert_relative_eq!(w.abs(), 1.0, epsilon = 1e-3);

        // mirror image flips the sign
        let s3 = seg([0.0, -l, -1.0], [0.0, l, -1.0]);
        assert_relative_eq!(gauss_kernel(&s1, &s3), -w, epsilon = 1e-9);
    }

    #[test]
    fn symmetric_in_its_arguments() {
        let s1 = seg([0.0, 0.0, 0.0], [1.0, 0.5, 0.2]);
        let s2 = seg([0.3, 1.0, 1.0], [1.5, -0.5, 0.7]);
        let w12 = gauss_kernel(&s1, &s2);
        let w21 = gauss_kernel(&s2, &s1);
        assert!(w12 != 0.0);
        assert_relative_eq!(w12, w21, epsilon = 1e-12);
        assert!(w12.abs() <= 1.0);
    }
}
