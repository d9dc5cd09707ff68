//! Order-1 and order-2 recursions.
//!
//! Order 1 is the classic inclusion-exclusion over the triangle. Order 2 fixes
//! the first index at `lo` and sums over its partner `p`, reading the other
//! pair from order-1 cells:
//!
//! * (1,2)(3,4): `A[lo,hi) = A[lo+1,hi) + Σ w(lo,p) F[p+1,hi)`
//! * (1,3)(2,4): `A[lo,hi) = A[lo+1,hi) + Σ w(lo,p) X(lo+1,p,hi)`
//! * (1,4)(2,3): `A[lo,hi) = A[lo+1,hi) + Σ w(lo,p) F[lo+1,p)`
//!
//! where `X` counts the pairs crossing `p`.

use super::table::PairTable;
use super::triangle::{Column, Triangle};
use crate::libs::invariant::Pairing2;

/// `F[lo,hi)` for every sub-chain.
pub fn order1_triangle(table: &PairTable) -> Triangle {
    let n = table.len();
    let mut tri = Triangle::new(n);
    for hi in 2..=n {
        for lo in (0..hi - 1).rev() {
            let value = tri.get(lo + 1, hi) + tri.get(lo, hi - 1) - tri.get(lo + 1, hi - 1)
                + table.get(lo, hi - 1);
            tri.set(lo, hi, value);
        }
    }
    tri
}

/// Contribution of the tuples whose first index is `lo`.
#[inline]
pub fn order2_step(
    pairing: Pairing2,
    outer: &PairTable,
    inner: &Triangle,
    lo: usize,
    hi: usize,
) -> f64 {
    let mut acc = 0.0;
    for p in (lo + 2)..hi {
        let w = outer.get(lo, p);
        if w == 0.0 {
            continue;
        }
        let rest = match pairing {
            Pairing2::Serial => inner.get(p + 1, hi),
            Pairing2::Crossing => inner.crossing(lo + 1, p, hi),
            Pairing2::Nested => inner.get(lo + 1, p),
        };
        acc += w * rest;
    }
    acc
}

/// Order-2 values for every sub-chain, O(n³).
pub fn order2_triangle(pairing: Pairing2, outer: &PairTable, inner: &Triangle) -> Triangle {
    let n = outer.len();
    let mut tri = Triangle::new(n);
    for hi in 1..=n {
        for lo in (0..hi).rev() {
            let value = tri.get(lo + 1, hi) + order2_step(pairing, outer, inner, lo, hi);
            tri.set(lo, hi, value);
        }
    }
    tri
}

/// Order-2 values of the suffixes `[lo, n)`, O(n²).
pub fn order2_column(pairing: Pairing2, outer: &PairTable, inner: &Triangle) -> Column {
    let n = outer.len();
    let mut col = Column::new(n);
    for lo in (0..n).rev() {
        let value = col.get(lo + 1) + order2_step(pairing, outer, inner, lo, n);
        col.set(lo, value);
    }
    col
}
