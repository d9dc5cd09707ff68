//! Windows over a chain, window pairs, and their invariants.
//!
//! A window of length `L` covers `L` consecutive points, i.e. the `L - 1`
//! segments `start..=end`.

use std::str::FromStr;

use crate::libs::error::{GisaError, Result};
use crate::libs::invariant::{InvariantKind, InvariantVector};
use crate::libs::kernel::Segment;
use crate::libs::simplex::{self, AggregateOptions, Simplex};

/// How windows are laid over a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoveringPolicy {
    /// Fixed length, starts at multiples of the stride.
    Stride,
    /// Length stretched by less than one stride so the last window ends on the
    /// last point.
    Stretch,
    /// Fixed length, starts spread evenly so both chain ends are covered.
    Spread,
}

impl FromStr for CoveringPolicy {
    type Err = GisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stride" => Ok(CoveringPolicy::Stride),
            "stretch" => Ok(CoveringPolicy::Stretch),
            "spread" => Ok(CoveringPolicy::Spread),
            _ => Err(GisaError::config(format!("unknown covering policy: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Window {
    pub number: usize,
    /// First segment
    pub start: usize,
    /// Last segment, inclusive
    pub end: usize,
}

impl Window {
    pub fn segments(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Share at least one segment.
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

fn stride_windows(n_points: usize, length: usize, stride: usize) -> Vec<Window> {
    if length < 2 || stride == 0 || n_points < length {
        return vec![];
    }
    let count = (n_points - length) / stride + 1;
    (0..count)
        .map(|k| Window {
            number: k,
            start: k * stride,
            end: k * stride + length - 2,
        })
        .collect()
}

/// Windows of a chain with `n_points` points, numbered from 0.
///
/// ```
/// use gisa::libs::window::{cover, CoveringPolicy};
///
/// let windows = cover(40, 16, 2, CoveringPolicy::Stride);
/// assert_eq!(windows.len(), 13);
/// assert_eq!((windows[12].start, windows[12].end), (24, 38));
/// ```
pub fn cover(n_points: usize, length: usize, stride: usize, policy: CoveringPolicy) -> Vec<Window> {
    match policy {
        CoveringPolicy::Stride => stride_windows(n_points, length, stride),
        CoveringPolicy::Stretch => {
            if stride == 0 || n_points < length {
                return vec![];
            }
            let stretched = (length..length + stride)
                .find(|&l| l <= n_points && (n_points - l) % stride == 0)
                .unwrap_or(length);
            stride_windows(n_points, stretched, stride)
        }
        CoveringPolicy::Spread => {
            if length < 2 || stride == 0 || n_points < length {
                return vec![];
            }
            let slack = n_points - length;
            let count = slack.div_ceil(stride) + 1;
            (0..count)
                .map(|k| {
                    let start = if count == 1 {
                        0
                    } else {
                        ((k * slack) as f64 / (count - 1) as f64).round() as usize
                    };
                    Window {
                        number: k,
                        start,
                        end: start + length - 2,
                    }
                })
                .collect()
        }
    }
}

/// Ordered window pairs `(a, b)` with `a.number <= b.number`.
///
/// With `disjoint_only` a window is never paired with itself and the pair's
/// segment ranges never overlap.
pub fn pairs(windows: &[Window], disjoint_only: bool) -> Vec<(Window, Window)> {
    let mut out = vec![];
    for (k, a) in windows.iter().enumerate() {
        for b in &windows[k..] {
            if disjoint_only && (a.number == b.number || a.end >= b.start) {
                continue;
            }
            out.push((*a, *b));
        }
    }
    out
}

/// Where window invariants come from.
pub trait SubChainSource {
    /// Every aggregated kind over segments `i..=j`.
    fn sub_chain(&self, i: usize, j: usize) -> Result<InvariantVector>;

    /// Order-1 value over the half-open segment range `[lo, hi)`.
    fn order1(&self, lo: usize, hi: usize, abs: bool) -> Result<f64>;
}

/// Reads cells of a full-mode simplex.
pub struct SimplexSource<'a> {
    simplex: &'a Simplex,
}

impl<'a> SimplexSource<'a> {
    pub fn new(simplex: &'a Simplex) -> Result<Self> {
        if !simplex.is_full() && simplex.kinds().any(|k| k.order() > 1) {
            return Err(GisaError::config(
                "window extraction from a simplex needs full mode for orders above 1",
            ));
        }
        Ok(SimplexSource { simplex })
    }
}

impl SubChainSource for SimplexSource<'_> {
    fn sub_chain(&self, i: usize, j: usize) -> Result<InvariantVector> {
        self.simplex
            .cell(i, j)
            .ok_or_else(|| GisaError::config(format!("no simplex cell ({}, {})", i, j)))
    }

    fn order1(&self, lo: usize, hi: usize, abs: bool) -> Result<f64> {
        let kind = if abs { InvariantKind::IA12 } else { InvariantKind::I12 };
        self.simplex
            .span(kind, lo, hi)
            .ok_or_else(|| GisaError::config(format!("no simplex span [{}, {})", lo, hi)))
    }
}

/// Runs one corner aggregation per requested sub-chain.
pub struct SegmentSource<'a> {
    segments: &'a [Segment],
    opts: AggregateOptions,
    order1: Option<&'a Simplex>,
}

impl<'a> SegmentSource<'a> {
    pub fn new(segments: &'a [Segment], order: usize, include_abs: bool) -> Self {
        SegmentSource {
            segments,
            opts: AggregateOptions::new(order, include_abs, false),
            order1: None,
        }
    }

    /// Answers order-1 spans from the every-cell order-1 store of `simplex`,
    /// aggregated over the same segments.
    pub fn with_order1(mut self, simplex: &'a Simplex) -> Self {
        self.order1 = Some(simplex);
        self
    }
}

impl SubChainSource for SegmentSource<'_> {
    fn sub_chain(&self, i: usize, j: usize) -> Result<InvariantVector> {
        let simplex = simplex::aggregate(&self.segments[i..=j], &self.opts)?;
        Ok(simplex.corner())
    }

    fn order1(&self, lo: usize, hi: usize, abs: bool) -> Result<f64> {
        if hi < lo + 2 {
            return Ok(0.0);
        }
        let kind = if abs { InvariantKind::IA12 } else { InvariantKind::I12 };
        if let Some(v) = self.order1.and_then(|s| s.span(kind, lo, hi)) {
            return Ok(v);
        }
        let opts = AggregateOptions::new(1, abs, false);
        let simplex = simplex::aggregate(&self.segments[lo..hi], &opts)?;
        Ok(simplex.corner().get(kind).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowInvariants {
    pub window: Window,
    pub values: InvariantVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairInvariants {
    pub first: Window,
    pub second: Window,
    /// `I12` and, when requested, `Ia12` between the two windows
    pub mutual: InvariantVector,
}

/// Sum of the kernel over `a` in `first`, `b` in `second`, `a < b`.
///
/// Inclusion-exclusion on the cell spanning both windows; equals the window's
/// own value when the windows coincide.
pub fn mutual<S: SubChainSource + ?Sized>(
    source: &S,
    first: &Window,
    second: &Window,
    abs: bool,
) -> Result<f64> {
    let (s1, e1) = (first.start, first.end + 1);
    let (s2, e2) = (second.start, second.end + 1);
    Ok(source.order1(s1, e2, abs)? - source.order1(s1, s2, abs)? - source.order1(e1, e2, abs)?
        + source.order1(e1, s2, abs)?)
}

pub fn window_invariants<S: SubChainSource + ?Sized>(
    source: &S,
    windows: &[Window],
) -> Result<Vec<WindowInvariants>> {
    windows
        .iter()
        .map(|w| {
            Ok(WindowInvariants {
                window: *w,
                values: source.sub_chain(w.start, w.end)?,
            })
        })
        .collect()
}

pub fn pair_invariants<S: SubChainSource + ?Sized>(
    source: &S,
    pairs: &[(Window, Window)],
    include_abs: bool,
) -> Result<Vec<PairInvariants>> {
    pairs
        .iter()
        .map(|(a, b)| {
            let mut values = InvariantVector::new();
            values.insert(InvariantKind::I12, mutual(source, a, b, false)?);
            if include_abs {
                values.insert(InvariantKind::IA12, mutual(source, a, b, true)?);
            }
            Ok(PairInvariants {
                first: *a,
                second: *b,
                mutual: values,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::chain::tests::helix;
    use crate::libs::chain::{Chain, Point};
    use crate::libs::simplex::table::PairTable;
    use approx::assert_relative_eq;

    #[test]
    fn stride_cover_of_forty_points() {
        let windows = cover(40, 16, 2, CoveringPolicy::Stride);
        assert_eq!(windows.len(), (40 - 16) / 2 + 1);
        for (k, w) in windows.iter().enumerate() {
            assert_eq!(w.number, k);
            assert_eq!(w.segments(), 15);
            assert!(w.end < 39);
        }

        let disjoint = pairs(&windows, true);
        assert!(!disjoint.is_empty());
        for (a, b) in &disjoint {
            assert!(a.end < b.start);
            assert!(!a.overlaps(b));
        }
        // first and ninth window are the closest disjoint pair
        assert!(disjoint.contains(&(windows[0], windows[8])));
        assert!(!disjoint.contains(&(windows[0], windows[7])));
    }

    #[test]
    fn all_pairs_include_self_pairs() {
        let windows = cover(20, 8, 4, CoveringPolicy::Stride);
        assert_eq!(windows.len(), 4);
        let all = pairs(&windows, false);
        assert_eq!(all.len(), 4 * 5 / 2);
        assert!(all.contains(&(windows[2], windows[2])));
    }

    #[test]
    fn stretch_and_spread_reach_the_chain_end() {
        let stretched = cover(41, 16, 2, CoveringPolicy::Stretch);
        let last = stretched.last().unwrap();
        assert_eq!(last.end, 39);
        assert_eq!(stretched[0].segments(), 16);

        let spread = cover(41, 16, 2, CoveringPolicy::Spread);
        assert_eq!(spread[0].start, 0);
        assert_eq!(spread.last().unwrap().end, 39);
        assert!(spread.iter().all(|w| w.segments() == 15));
        assert!(spread.windows(2).all(|p| p[0].start < p[1].start));

        assert!(cover(10, 16, 2, CoveringPolicy::Spread).is_empty());
        assert_eq!(cover(16, 16, 2, CoveringPolicy::Spread).len(), 1);
    }

    #[test]
    fn mutual_is_the_cross_block_sum() {
        let chain = helix("h", 30);
        let segments = chain.segments();
        let simplex = simplex::aggregate(&segments, &AggregateOptions::new(1, true, true)).unwrap();
        let source = SimplexSource::new(&simplex).unwrap();
        let table = PairTable::from_segments(&segments);

        let windows = cover(30, 8, 3, CoveringPolicy::Stride);
        for (a, b) in pairs(&windows, false) {
            let mut expected = 0.0;
            for x in a.start..=a.end {
                for y in b.start..=b.end {
                    if x < y {
                        expected += table.get(x, y);
                    }
                }
            }
            let m = mutual(&source, &a, &b, false).unwrap();
            assert_relative_eq!(m, expected, epsilon = 1e-10);
            if a == b {
                let own = simplex.value(InvariantKind::I12, a.start, a.end).unwrap();
                assert_relative_eq!(m, own, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn segment_source_matches_simplex_source() {
        let chain = helix("h", 26);
        let segments = chain.segments();
        let simplex = simplex::aggregate(&segments, &AggregateOptions::new(2, true, true)).unwrap();
        let full = SimplexSource::new(&simplex).unwrap();
        let corner = SegmentSource::new(&segments, 2, true);

        let windows = cover(26, 10, 4, CoveringPolicy::Stride);
        let a = window_invariants(&full, &windows).unwrap();
        let b = window_invariants(&corner, &windows).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.window, y.window);
            for (kind, v) in x.values.iter() {
                assert_relative_eq!(y.values.get(kind).unwrap(), v, epsilon = 1e-10);
            }
        }

        let ps = pairs(&windows, false);
        let pa = pair_invariants(&full, &ps, true).unwrap();
        let pb = pair_invariants(&corner, &ps, true).unwrap();
        let reduced = simplex::aggregate(&segments, &AggregateOptions::new(2, true, false)).unwrap();
        let cached = SegmentSource::new(&segments, 2, true).with_order1(&reduced);
        let pc = pair_invariants(&cached, &ps, true).unwrap();
        for ((x, y), z) in pa.iter().zip(&pb).zip(&pc) {
            for (kind, v) in x.mutual.iter() {
                assert_relative_eq!(y.mutual.get(kind).unwrap(), v, epsilon = 1e-10);
                assert_relative_eq!(z.mutual.get(kind).unwrap(), v, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn corner_simplex_is_refused_for_higher_orders() {
        let chain = helix("h", 20);
        let simplex = chain.aggregate(&AggregateOptions::new(2, false, false)).unwrap();
        assert!(SimplexSource::new(&simplex).is_err());
    }

    #[test]
    fn collinear_windows_are_zero() {
        let points = (0..5).map(|k| Point::new(k, k as f64, 0.0, 0.0)).collect();
        let chain = Chain::new("line", "A", points).unwrap();
        let segments = chain.segments();
        let simplex = simplex::aggregate(&segments, &AggregateOptions::new(1, true, true)).unwrap();
        let source = SimplexSource::new(&simplex).unwrap();
        let windows = cover(5, 3, 1, CoveringPolicy::Stride);
        for w in window_invariants(&source, &windows).unwrap() {
            assert_eq!(w.values.get(InvariantKind::I12), Some(0.0));
        }
        for p in pair_invariants(&source, &pairs(&windows, false), true).unwrap() {
            assert_eq!(p.mutual.get(InvariantKind::I12), Some(0.0));
            assert_eq!(p.mutual.get(InvariantKind::IA12), Some(0.0));
        }
    }
}
