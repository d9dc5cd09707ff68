use crate::libs::kernel::{gauss_kernel, Segment};

/// Symmetric table of kernel values over segment pairs with 2-D prefix sums.
///
/// Pairs of identical or adjacent segments hold `0.0`.
#[derive(Debug, Clone)]
pub struct PairTable {
    n: usize,
    values: Vec<f64>,
    // (n+1) x (n+1), prefix[r * (n+1) + c] = sum of values[..r][..c]
    prefix: Vec<f64>,
}

impl PairTable {
    pub fn from_segments(segments: &[Segment]) -> Self {
        let n = segments.len();
        let mut values = vec![0.0; n * n];
        for a in 0..n {
            for b in (a + 2)..n {
                let w = gauss_kernel(&segments[a], &segments[b]);
                values[a * n + b] = w;
                values[b * n + a] = w;
            }
        }
        Self::with_values(n, values)
    }

    fn with_values(n: usize, values: Vec<f64>) -> Self {
        let stride = n + 1;
        let mut prefix = vec![0.0; stride * stride];
        for r in 0..n {
            let mut row = 0.0;
            for c in 0..n {
                row += values[r * n + c];
                prefix[(r + 1) * stride + c + 1] = prefix[r * stride + c + 1] + row;
            }
        }
        PairTable { n, values, prefix }
    }

    /// The same table with every entry replaced by its absolute value.
    pub fn absolute(&self) -> Self {
        Self::with_values(self.n, self.values.iter().map(|v| v.abs()).collect())
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[a * self.n + b]
    }

    /// Sum over rows `[r0, r1)` and columns `[c0, c1)`; empty ranges give 0.
    #[inline]
    pub fn block(&self, r0: usize, r1: usize, c0: usize, c1: usize) -> f64 {
        if r0 >= r1 || c0 >= c1 {
            return 0.0;
        }
        let s = self.n + 1;
        self.prefix[r1 * s + c1] - self.prefix[r0 * s + c1] - self.prefix[r1 * s + c0]
            + self.prefix[r0 * s + c0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn block_sums_match_loops() {
        let n = 5;
        let values: Vec<f64> = (0..n * n).map(|k| (k as f64 * 0.37).sin()).collect();
        let table = PairTable::with_values(n, values.clone());
        for r0 in 0..=n {
            for r1 in r0..=n {
                for c0 in 0..=n {
                    for c1 in c0..=n {
                        let mut expected = 0.0;
                        for r in r0..r1 {
                            for c in c0..c1 {
                                expected += values[r * n + c];
                            }
                        }
                        assert_relative_eq!(table.block(r0, r1, c0, c1), expected, epsilon = 1e-12);
                    }
                }
            }
        }
        assert_eq!(table.block(3, 2, 0, 5), 0.0);
    }
}
