//! Heap sort and bisection over slices, parameterized by comparison closures.
//!
//! The bisection helpers take a probe `f(&element) -> Ordering` telling how an
//! element compares to the target, like `slice::binary_search_by`. The slice
//! must be sorted consistently with the probe.

use std::cmp::Ordering;
use std::ops::Range;

fn sift_down<T, F>(v: &mut [T], mut root: usize, end: usize, cmp: &mut F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    loop {
        let mut child = 2 * root + 1;
        if child >= end {
            break;
        }
        if child + 1 < end && cmp(&v[child], &v[child + 1]) == Ordering::Less {
            child += 1;
        }
        if cmp(&v[root], &v[child]) != Ordering::Less {
            break;
        }
        v.swap(root, child);
        root = child;
    }
}

/// In-place, unstable, O(n log n) worst case.
pub fn heap_sort_by<T, F>(v: &mut [T], mut cmp: F)
where
    F: FnMut(&T, &T) -> Ordering,
{
    let len = v.len();
    if len < 2 {
        return;
    }
    for root in (0..len / 2).rev() {
        sift_down(v, root, len, &mut cmp);
    }
    for end in (1..len).rev() {
        v.swap(0, end);
        sift_down(v, 0, end, &mut cmp);
    }
}

pub fn heap_sort_by_key<T, K, F>(v: &mut [T], mut key: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    heap_sort_by(v, |a, b| key(a).cmp(&key(b)));
}

/// Ascending by `f64::total_cmp`.
pub fn sort_floats(v: &mut [f64]) {
    heap_sort_by(v, |a, b| a.total_cmp(b));
}

/// First index whose element is not `Less` than the target.
pub fn lower_bound_by<T, F>(v: &[T], mut f: F) -> usize
where
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, v.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if f(&v[mid]) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// First index whose element is `Greater` than the target.
pub fn upper_bound_by<T, F>(v: &[T], mut f: F) -> usize
where
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, v.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if f(&v[mid]) == Ordering::Greater {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Some index whose element equals the target.
pub fn find_by<T, F>(v: &[T], mut f: F) -> Option<usize>
where
    F: FnMut(&T) -> Ordering,
{
    let (mut lo, mut hi) = (0, v.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match f(&v[mid]) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Some(mid),
        }
    }
    None
}

/// The run of elements equal to the target: bisect to one hit, then bisect
/// the left and right edges on either side of it.
pub fn equal_range_by<T, F>(v: &[T], mut f: F) -> Range<usize>
where
    F: FnMut(&T) -> Ordering,
{
    match find_by(v, &mut f) {
        None => {
            let at = lower_bound_by(v, &mut f);
            at..at
        }
        Some(hit) => {
            let left = lower_bound_by(&v[..hit], &mut f);
            let right = hit + 1 + upper_bound_by(&v[hit + 1..], &mut f);
            left..right
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn heap_sort_agrees_with_std() {
        let mut rng = StdRng::seed_from_u64(17);
        for len in [0, 1, 2, 3, 10, 257] {
            let mut v: Vec<u32> = (0..len).map(|_| rng.gen_range(0..50)).collect();
            let mut expected = v.clone();
            expected.sort();
            heap_sort_by(&mut v, |a, b| a.cmp(b));
            assert_eq!(v, expected);
        }

        let mut words = vec!["pear", "fig", "apple", "kiwi"];
        heap_sort_by_key(&mut words, |w| w.len());
        assert_eq!(words.iter().map(|w| w.len()).collect::<Vec<_>>(), vec![3, 4, 4, 5]);

        let mut floats = vec![0.5, -1.0, 3.25, 0.0];
        sort_floats(&mut floats);
        assert_eq!(floats, vec![-1.0, 0.0, 0.5, 3.25]);
    }

    #[test]
    fn bounds_and_ranges() {
        let v = [1, 2, 2, 2, 5, 7, 7, 9];
        assert_eq!(lower_bound_by(&v, |x| x.cmp(&2)), 1);
        assert_eq!(upper_bound_by(&v, |x| x.cmp(&2)), 4);
        assert_eq!(lower_bound_by(&v, |x| x.cmp(&6)), 5);
        assert_eq!(upper_bound_by(&v, |x| x.cmp(&10)), 8);
        assert_eq!(equal_range_by(&v, |x| x.cmp(&2)), 1..4);
        assert_eq!(equal_range_by(&v, |x| x.cmp(&7)), 5..7);
        assert_eq!(equal_range_by(&v, |x| x.cmp(&1)), 0..1);
        assert_eq!(equal_range_by(&v, |x| x.cmp(&6)), 5..5);
        assert!(find_by(&v, |x| x.cmp(&9)) == Some(7));
        assert!(find_by(&v, |x| x.cmp(&0)).is_none());

        let empty: [i32; 0] = [];
        assert_eq!(equal_range_by(&empty, |x| x.cmp(&1)), 0..0);
    }
}
