//! Order-3 recursion.
//!
//! With the first index fixed at `lo` and its partner at `p`, the remaining
//! four positions fall into `L = [lo+1, p)` and `R = [p+1, hi)`. The partner
//! position decides the split:
//!
//! * partner 2: all four in `R`, an order-2 cell `[p+1, hi)`
//! * partner 6: all four in `L`, an order-2 cell `[lo+1, p)`
//! * partner 3: one in `L`, three in `R`, column block sums against order-1 cells
//! * partner 5: three in `L`, one in `R`, row block sums against order-1 cells
//! * partner 4: two and two; either a product of order-1 cells or one of the
//!   crossing sums `S`/`T`, kept by a recursion over `lo`

use super::table::PairTable;
use super::triangle::{Column, Triangle};
use crate::libs::invariant::{Pairing2, Pairing3};

/// Lower-order inputs of one flavour (all signed or all absolute).
pub struct Order3Input<'a> {
    pub table: &'a PairTable,
    pub order1: &'a Triangle,
    /// Full order-2 triangles indexed like `Pairing2::ALL`.
    pub order2: [&'a Triangle; 3],
}

fn pairing_slot(p: Pairing2) -> usize {
    match p {
        Pairing2::Serial => 0,
        Pairing2::Crossing => 1,
        Pairing2::Nested => 2,
    }
}

/// Two-by-two crossing sums for a fixed `hi`, indexed `[lo * n + p]`.
///
/// `S`: pairs `(b,e)(c,f)` and `T`: pairs `(b,f)(c,e)`, with `b < c` in `L` and
/// `e < f` in `R`.
struct SplitSums {
    n: usize,
    s: Vec<f64>,
    t: Vec<f64>,
}

impl SplitSums {
    fn new(table: &PairTable, hi: usize) -> Self {
        let n = table.len();
        let mut s = vec![0.0; n * n];
        let mut t = vec![0.0; n * n];
        for p in 1..hi {
            let mut s_acc = 0.0;
            let mut t_acc = 0.0;
            // lo = p - 1 leaves L empty; walk lo downwards adding b = lo + 1
            for lo in (0..p.saturating_sub(1)).rev() {
                let b = lo + 1;
                for e in (p + 1)..hi {
                    let w = table.get(b, e);
                    if w == 0.0 {
                        continue;
                    }
                    s_acc += w * table.block(b + 1, p, e + 1, hi);
                    t_acc += w * table.block(b + 1, p, p + 1, e);
                }
                s[lo * n + p] = s_acc;
                t[lo * n + p] = t_acc;
            }
        }
        SplitSums { n, s, t }
    }

    #[inline]
    fn s(&self, lo: usize, p: usize) -> f64 {
        self.s[lo * self.n + p]
    }

    #[inline]
    fn t(&self, lo: usize, p: usize) -> f64 {
        self.t[lo * self.n + p]
    }
}

impl Order3Input<'_> {
    fn inner(&self, pairing: Pairing3, split: &SplitSums, lo: usize, p: usize, hi: usize) -> f64 {
        let f = self.order1;
        let table = self.table;
        match pairing.partner {
            2 => self.order2[pairing_slot(pairing.rest)].get(p + 1, hi),
            6 => self.order2[pairing_slot(pairing.rest)].get(lo + 1, p),
            3 => {
                let mut acc = 0.0;
                for d in (p + 1)..hi {
                    let col = table.block(lo + 1, p, d, d + 1);
                    if col == 0.0 {
                        continue;
                    }
                    let g = match pairing.rest {
                        Pairing2::Serial => f.get(d + 1, hi),
                        Pairing2::Crossing => f.crossing(p + 1, d, hi),
                        Pairing2::Nested => f.get(p + 1, d),
                    };
                    acc += col * g;
                }
                acc
            }
            5 => {
                let mut acc = 0.0;
                for b in (lo + 1)..p {
                    let row = table.block(b, b + 1, p + 1, hi);
                    if row == 0.0 {
                        continue;
                    }
                    let h = match pairing.rest {
                        Pairing2::Serial => f.get(lo + 1, b),
                        Pairing2::Crossing => f.crossing(lo + 1, b, p),
                        Pairing2::Nested => f.get(b + 1, p),
                    };
                    acc += row * h;
                }
                acc
            }
            4 => match pairing.rest {
                Pairing2::Serial => f.get(lo + 1, p) * f.get(p + 1, hi),
                Pairing2::Crossing => split.s(lo, p),
                Pairing2::Nested => split.t(lo, p),
            },
            _ => unreachable!("order-3 partner out of range: {}", pairing.partner),
        }
    }

    #[inline]
    fn step(&self, pairing: Pairing3, split: &SplitSums, lo: usize, hi: usize) -> f64 {
        let mut acc = 0.0;
        for p in (lo + 2)..hi {
            let w = self.table.get(lo, p);
            if w == 0.0 {
                continue;
            }
            acc += w * self.inner(pairing, split, lo, p, hi);
        }
        acc
    }

    /// All fifteen pairings for every sub-chain, O(n⁴).
    pub fn triangles(&self, pairings: &[Pairing3]) -> Vec<Triangle> {
        let n = self.table.len();
        let mut out: Vec<Triangle> = pairings.iter().map(|_| Triangle::new(n)).collect();
        for hi in 1..=n {
            let split = SplitSums::new(self.table, hi);
            for lo in (0..hi).rev() {
                for (tri, &pairing) in out.iter_mut().zip(pairings) {
                    let value = tri.get(lo + 1, hi) + self.step(pairing, &split, lo, hi);
                    tri.set(lo, hi, value);
                }
            }
        }
        out
    }

    /// All fifteen pairings for the suffixes `[lo, n)`, O(n³).
    pub fn columns(&self, pairings: &[Pairing3]) -> Vec<Column> {
        let n = self.table.len();
        let split = SplitSums::new(self.table, n);
        let mut out: Vec<Column> = pairings.iter().map(|_| Column::new(n)).collect();
        for lo in (0..n).rev() {
            for (col, &pairing) in out.iter_mut().zip(pairings) {
                let value = col.get(lo + 1) + self.step(pairing, &split, lo, n);
                col.set(lo, value);
            }
        }
        out
    }
}
