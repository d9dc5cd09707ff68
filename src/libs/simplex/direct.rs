//! Direct summation over index tuples.
//!
//! Exponential in the order; only meant for short chains, as the reference
//! the recursive engine is checked against.

use super::table::PairTable;
use crate::libs::invariant::InvariantKind;

/// Sum over all increasing tuples in `[lo, hi)` of the product of the
/// (possibly absolute) kernel values of `kind`'s pairs.
pub fn direct_value(table: &PairTable, kind: InvariantKind, lo: usize, hi: usize) -> f64 {
    let factors = kind.factors();
    let size = 2 * factors.len();
    let mut tuple = vec![0usize; size];
    let mut total = 0.0;
    visit(table, &factors, &mut tuple, 0, lo, hi, &mut total);
    total
}

fn visit(
    table: &PairTable,
    factors: &[((usize, usize), bool)],
    tuple: &mut [usize],
    depth: usize,
    from: usize,
    hi: usize,
    total: &mut f64,
) {
    if depth == tuple.len() {
        let mut product = 1.0;
        for &((a, b), abs) in factors {
            let w = table.get(tuple[a], tuple[b]);
            product *= if abs { w.abs() } else { w };
        }
        *total += product;
        return;
    }
    let remaining = tuple.len() - depth;
    if hi < from + remaining {
        return;
    }
    for x in from..=(hi - remaining) {
        tuple[depth] = x;
        visit(table, factors, tuple, depth + 1, x + 1, hi, total);
    }
}
