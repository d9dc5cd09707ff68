/// Values attached to every half-open sub-chain `[lo, hi)` with
/// `0 <= lo <= hi <= n`.
///
/// Empty and single-segment sub-chains are stored too, so recursions can read
/// their neighbours without bounds checks; they hold `0.0` unless written.
#[derive(Debug, Clone)]
pub struct Triangle {
    n: usize,
    data: Vec<f64>,
}

impl Triangle {
    pub fn new(n: usize) -> Self {
        Triangle {
            n,
            data: vec![0.0; (n + 1) * (n + 2) / 2],
        }
    }

    /// Number of segments.
    pub fn size(&self) -> usize {
        self.n
    }

    #[inline]
    fn offset(hi: usize, lo: usize) -> usize {
        hi * (hi + 1) / 2 + lo
    }

    /// Value of `[lo, hi)`; `0.0` when `lo >= hi`.
    #[inline]
    pub fn get(&self, lo: usize, hi: usize) -> f64 {
        if lo >= hi {
            0.0
        } else {
            self.data[Self::offset(hi, lo)]
        }
    }

    #[inline]
    pub fn set(&mut self, lo: usize, hi: usize, value: f64) {
        debug_assert!(lo <= hi && hi <= self.n);
        self.data[Self::offset(hi, lo)] = value;
    }

    /// Crossing pairs around `c` inside `[s, e)`: left index in `[s, c)`,
    /// right index in `(c, e)`.
    #[inline]
    pub fn crossing(&self, s: usize, c: usize, e: usize) -> f64 {
        self.get(s, e) - self.get(s, c + 1) - self.get(c, e)
    }
}

/// Values of the sub-chains `[lo, n)` ending at the full-chain corner.
#[derive(Debug, Clone)]
pub struct Column {
    data: Vec<f64>,
}

impl Column {
    pub fn new(n: usize) -> Self {
        Column {
            data: vec![0.0; n + 1],
        }
    }

    #[inline]
    pub fn get(&self, lo: usize) -> f64 {
        self.data[lo]
    }

    #[inline]
    pub fn set(&mut self, lo: usize, value: f64) {
        self.data[lo] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_cell_is_addressable() {
        let n = 6;
        let mut t = Triangle::new(n);
        for hi in 0..=n {
            for lo in 0..=hi {
                t.set(lo, hi, (hi * 10 + lo) as f64);
            }
        }
        for hi in 1..=n {
            for lo in 0..hi {
                assert_eq!(t.get(lo, hi), (hi * 10 + lo) as f64);
            }
        }
        assert_eq!(t.get(4, 2), 0.0);
        assert_eq!(t.get(3, 3), 0.0);
    }
}
