//! Aggregation of the segment kernel over the index simplex.
//!
//! Every sub-chain of `n` segments is addressed by inclusive segment bounds
//! `(i, j)`, `i <= j < n`; internally the recursions work on half-open
//! `[lo, hi)`. Order-1 values are always kept for every cell. Order-2 and
//! order-3 values are kept either for every cell (`full`) or only for the
//! suffixes ending at the full-chain corner.

#[cfg(test)]
mod direct;
pub mod order2;
pub mod order3;
pub mod table;
pub mod triangle;

use indexmap::IndexMap;

use crate::libs::error::{GisaError, Result};
use crate::libs::invariant::{AbsMask, InvariantKind, InvariantVector, Pairing2, Pairing3};
use crate::libs::kernel::Segment;
use table::PairTable;
use triangle::{Column, Triangle};

/// What to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Maximum order, 1..=3
    pub order: usize,
    pub include_abs: bool,
    /// Keep higher orders for every cell, not only at the corner
    pub full: bool,
}

impl AggregateOptions {
    pub fn new(order: usize, include_abs: bool, full: bool) -> Self {
        AggregateOptions {
            order,
            include_abs,
            full,
        }
    }

    /// Fewest segments an aggregation of this order accepts.
    pub fn min_segments(&self) -> usize {
        2 * self.order
    }

    pub fn kinds(&self) -> Vec<InvariantKind> {
        InvariantKind::for_order(self.order, self.include_abs)
    }
}

#[derive(Debug, Clone)]
enum Store {
    Triangle(Triangle),
    Column(Column),
}

impl Store {
    fn span(&self, lo: usize, hi: usize, n: usize) -> Option<f64> {
        if lo >= hi {
            return Some(0.0);
        }
        match self {
            Store::Triangle(t) => Some(t.get(lo, hi)),
            Store::Column(c) if hi == n => Some(c.get(lo)),
            Store::Column(_) => None,
        }
    }
}

/// Invariant values over the sub-chains of one chain.
#[derive(Debug, Clone)]
pub struct Simplex {
    n: usize,
    full: bool,
    stores: IndexMap<InvariantKind, Store>,
}

impl Simplex {
    /// Number of segments.
    pub fn segments(&self) -> usize {
        self.n
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn kinds(&self) -> impl Iterator<Item = InvariantKind> + '_ {
        self.stores.keys().copied()
    }

    /// Value of `kind` over the half-open segment range `[lo, hi)`.
    ///
    /// Empty ranges are `0.0`; `None` when the kind was not aggregated or the
    /// cell was not kept.
    pub fn span(&self, kind: InvariantKind, lo: usize, hi: usize) -> Option<f64> {
        if hi > self.n {
            return None;
        }
        self.stores.get(&kind)?.span(lo, hi, self.n)
    }

    /// Value of `kind` over segments `i..=j`.
    pub fn value(&self, kind: InvariantKind, i: usize, j: usize) -> Option<f64> {
        if i > j {
            return None;
        }
        self.span(kind, i, j + 1)
    }

    /// All kept kinds over segments `i..=j`; `None` if any of them is missing.
    pub fn cell(&self, i: usize, j: usize) -> Option<InvariantVector> {
        self.kinds()
            .map(|k| self.value(k, i, j).map(|v| (k, v)))
            .collect()
    }

    /// All kinds over the whole chain.
    pub fn corner(&self) -> InvariantVector {
        self.stores
            .iter()
            .map(|(k, s)| (*k, s.span(0, self.n, self.n).unwrap_or(0.0)))
            .collect()
    }
}

/// Aggregates the kernel over `segments`.
///
/// Fails with `ChainTooShort` (structure and chain left blank for the caller
/// to fill in) when there are fewer than `2 * order` segments.
pub fn aggregate(segments: &[Segment], opts: &AggregateOptions) -> Result<Simplex> {
    if !(1..=3).contains(&opts.order) {
        return Err(GisaError::config(format!(
            "order must be 1, 2 or 3, got {}",
            opts.order
        )));
    }
    let n = segments.len();
    if n < opts.min_segments() {
        return Err(GisaError::ChainTooShort {
            structure: String::new(),
            chain: String::new(),
            segments: n,
            required: opts.min_segments(),
        });
    }

    let signed = PairTable::from_segments(segments);
    let absolute = signed.absolute();
    aggregate_tables(&signed, &absolute, opts)
}

fn aggregate_tables(
    signed: &PairTable,
    absolute: &PairTable,
    opts: &AggregateOptions,
) -> Result<Simplex> {
    let n = signed.len();
    let f = order2::order1_triangle(signed);
    let fa = order2::order1_triangle(absolute);

    // order 3 reads whole order-2 triangles of its own flavour
    let mut order2_stores: IndexMap<(Pairing2, AbsMask), Store> = IndexMap::new();
    if opts.order >= 2 {
        for abs in AbsMask::ALL {
            if abs != AbsMask::None && !opts.include_abs {
                continue;
            }
            let outer = if abs.first() { absolute } else { signed };
            let inner = if abs.second() { &fa } else { &f };
            let feeds_order3 = opts.order >= 3 && matches!(abs, AbsMask::None | AbsMask::Both);
            for pairing in Pairing2::ALL {
                let store = if opts.full || feeds_order3 {
                    Store::Triangle(order2::order2_triangle(pairing, outer, inner))
                } else {
                    Store::Column(order2::order2_column(pairing, outer, inner))
                };
                order2_stores.insert((pairing, abs), store);
            }
        }
    }

    let mut order3_stores: IndexMap<(Pairing3, bool), Store> = IndexMap::new();
    if opts.order >= 3 {
        let pairings = Pairing3::all();
        let flavours: &[bool] = if opts.include_abs { &[false, true] } else { &[false] };
        for &abs in flavours {
            let mask = if abs { AbsMask::Both } else { AbsMask::None };
            let mut tri2 = Vec::with_capacity(3);
            for pairing in Pairing2::ALL {
                match order2_stores.get(&(pairing, mask)) {
                    Some(Store::Triangle(t)) => tri2.push(t),
                    _ => return Err(missing(InvariantKind::Order2 { pairing, abs: mask })),
                }
            }
            let input = order3::Order3Input {
                table: if abs { absolute } else { signed },
                order1: if abs { &fa } else { &f },
                order2: [tri2[0], tri2[1], tri2[2]],
            };
            let values: Vec<Store> = if opts.full {
                input.triangles(&pairings).into_iter().map(Store::Triangle).collect()
            } else {
                input.columns(&pairings).into_iter().map(Store::Column).collect()
            };
            for (&pairing, store) in pairings.iter().zip(values) {
                order3_stores.insert((pairing, abs), store);
            }
        }
    }

    // lay the stores out in the canonical kind order
    let mut f = Some(f);
    let mut fa = Some(fa);
    let mut stores = IndexMap::new();
    for kind in opts.kinds() {
        let store = match kind {
            InvariantKind::Order1 { abs: false } => f.take().map(Store::Triangle),
            InvariantKind::Order1 { abs: true } => fa.take().map(Store::Triangle),
            InvariantKind::Order2 { pairing, abs } => {
                match order2_stores.swap_remove(&(pairing, abs)) {
                    Some(Store::Triangle(tri)) if !opts.full => Some(Store::Column(column_of(&tri))),
                    other => other,
                }
            }
            InvariantKind::Order3 { pairing, abs } => order3_stores.swap_remove(&(pairing, abs)),
        };
        stores.insert(kind, store.ok_or_else(|| missing(kind))?);
    }

    Ok(Simplex {
        n,
        full: opts.full,
        stores,
    })
}

fn missing(kind: InvariantKind) -> GisaError {
    GisaError::config(format!("invariant {} was not aggregated", kind))
}

fn column_of(tri: &Triangle) -> Column {
    let n = tri.size();
    let mut col = Column::new(n);
    for lo in 0..n {
        col.set(lo, tri.get(lo, n));
    }
    col
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_walk(points: usize, seed: u64) -> Vec<Segment> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut p = Vector3::new(0.0, 0.0, 0.0);
        let mut out = Vec::new();
        for _ in 1..points {
            let step = Vector3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let q = p + step.normalize() * 3.8;
            out.push(Segment::new(p, q));
            p = q;
        }
        out
    }

    fn check_against_direct(segments: &[Segment], opts: &AggregateOptions) {
        let simplex = aggregate(segments, opts).unwrap();
        let signed = PairTable::from_segments(segments);
        let n = segments.len();
        for kind in opts.kinds() {
            for i in 0..n {
                for j in i..n {
                    let value = match simplex.value(kind, i, j) {
                        Some(v) => v,
                        None => {
                            assert!(!opts.full && kind.order() > 1 && j != n - 1);
                            continue;
                        }
                    };
                    let expected = direct::direct_value(&signed, kind, i, j + 1);
                    assert_relative_eq!(value, expected, epsilon = 1e-9, max_relative = 1e-9);
                }
            }
        }
    }

    #[test]
    fn order2_full_matches_direct_sums() {
        let segments = random_walk(13, 7);
        check_against_direct(&segments, &AggregateOptions::new(2, true, true));
    }

    #[test]
    fn order2_corner_matches_direct_sums() {
        let segments = random_walk(13, 11);
        check_against_direct(&segments, &AggregateOptions::new(2, true, false));
    }

    #[test]
    fn order3_full_matches_direct_sums() {
        let segments = random_walk(10, 3);
        check_against_direct(&segments, &AggregateOptions::new(3, true, true));
    }

    #[test]
    fn order3_corner_matches_direct_sums() {
        let segments = random_walk(11, 5);
        check_against_direct(&segments, &AggregateOptions::new(3, true, false));
    }

    #[test]
    fn corner_and_full_agree() {
        let segments = random_walk(20, 42);
        let full = aggregate(&segments, &AggregateOptions::new(2, true, true)).unwrap();
        let corner = aggregate(&segments, &AggregateOptions::new(2, true, false)).unwrap();
        for (kind, value) in full.corner().iter() {
            assert_relative_eq!(corner.corner().get(kind).unwrap(), value, epsilon = 1e-10);
        }
        assert!(corner.value(InvariantKind::I12, 2, 7).is_some());
        let kind = InvariantKind::Order2 {
            pairing: Pairing2::Serial,
            abs: AbsMask::None,
        };
        assert!(corner.value(kind, 2, 7).is_none());
        assert!(corner.value(kind, 2, 18).is_some());
    }

    #[test]
    fn absolute_values_dominate_signed_ones() {
        let segments = random_walk(25, 9);
        let s = aggregate(&segments, &AggregateOptions::new(1, true, true)).unwrap();
        let n = s.segments();
        for i in 0..n {
            for j in i..n {
                let signed = s.value(InvariantKind::I12, i, j).unwrap();
                let abs = s.value(InvariantKind::IA12, i, j).unwrap();
                assert!(abs + 1e-12 >= signed.abs());
            }
        }
    }

    #[test]
    fn collinear_chain_is_flat() {
        let segments: Vec<Segment> = (0..4)
            .map(|k| {
                Segment::new(
                    Vector3::new(k as f64, 0.0, 0.0),
                    Vector3::new(k as f64 + 1.0, 0.0, 0.0),
                )
            })
            .collect();
        let s = aggregate(&segments, &AggregateOptions::new(1, true, true)).unwrap();
        for i in 0..4 {
            for j in i..4 {
                assert_eq!(s.value(InvariantKind::I12, i, j), Some(0.0));
                assert_eq!(s.value(InvariantKind::IA12, i, j), Some(0.0));
            }
        }
        assert_eq!(s.corner().get(InvariantKind::I12), Some(0.0));
    }

    #[test]
    fn too_short_for_the_order() {
        let segments = random_walk(5, 1);
        assert!(aggregate(&segments, &AggregateOptions::new(2, false, false)).is_ok());
        match aggregate(&segments, &AggregateOptions::new(3, false, false)) {
            Err(GisaError::ChainTooShort {
                segments, required, ..
            }) => {
                assert_eq!(segments, 4);
                assert_eq!(required, 6);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
