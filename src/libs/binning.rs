//! Discretization of invariant values into bin indices ("letters").

use std::cmp::Ordering;
use std::str::FromStr;

use crate::libs::error::{GisaError, Result};
use crate::libs::ordering::{sort_floats, upper_bound_by};

/// Letters are bin indices.
pub type Letter = u8;

/// Downward nudge of equal-population boundaries, so a population value that
/// defines a boundary shares its bin with values just below it.
pub const BOUNDARY_EPSILON: f64 = 1e-6;

/// Most bins a dimension may have.
pub const MAX_BINS: usize = Letter::MAX as usize + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinScheme {
    /// Intervals of equal width over the observed range
    EqualWidth,
    /// Intervals holding equal shares of the population
    EqualPopulation,
}

impl FromStr for BinScheme {
    type Err = GisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "width" => Ok(BinScheme::EqualWidth),
            "population" | "pop" => Ok(BinScheme::EqualPopulation),
            _ => Err(GisaError::config(format!("unknown bin scheme: {}", s))),
        }
    }
}

/// Ascending inner boundaries of one dimension; `bins - 1` of them.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionBins {
    boundaries: Vec<f64>,
}

impl DimensionBins {
    pub fn from_boundaries(mut boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.len() + 1 > MAX_BINS {
            return Err(GisaError::config(format!(
                "at most {} bins per dimension",
                MAX_BINS
            )));
        }
        if boundaries.iter().any(|b| !b.is_finite()) {
            return Err(GisaError::config("bin boundaries must be finite"));
        }
        sort_floats(&mut boundaries);
        Ok(DimensionBins { boundaries })
    }

    pub fn fit(values: &[f64], bins: usize, scheme: BinScheme) -> Result<Self> {
        if bins == 0 || bins > MAX_BINS {
            return Err(GisaError::config(format!(
                "number of bins must be within 1..={}, got {}",
                MAX_BINS, bins
            )));
        }
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() || bins == 1 {
            return Ok(DimensionBins { boundaries: vec![] });
        }
        sort_floats(&mut sorted);

        let boundaries = match scheme {
            BinScheme::EqualWidth => {
                let min = sorted[0];
                let max = sorted[sorted.len() - 1];
                let width = (max - min) / bins as f64;
                (1..bins).map(|k| min + k as f64 * width).collect()
            }
            BinScheme::EqualPopulation => {
                let n = sorted.len();
                (1..bins)
                    .map(|k| sorted[(k * n / bins).min(n - 1)] - BOUNDARY_EPSILON)
                    .collect()
            }
        };
        Ok(DimensionBins { boundaries })
    }

    pub fn bins(&self) -> usize {
        self.boundaries.len() + 1
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of boundaries `<= v`. NaN lands in bin 0.
    pub fn bin(&self, v: f64) -> Letter {
        if v.is_nan() {
            return 0;
        }
        let k = upper_bound_by(&self.boundaries, |b| {
            b.partial_cmp(&v).unwrap_or(Ordering::Less)
        });
        k as Letter
    }
}

/// One `DimensionBins` per retained invariant dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Binner {
    dims: Vec<DimensionBins>,
}

impl Binner {
    pub fn new(dims: Vec<DimensionBins>) -> Self {
        Binner { dims }
    }

    /// Fits each dimension on the matching column of `rows`.
    pub fn fit(rows: &[Vec<f64>], bins: usize, scheme: BinScheme) -> Result<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(GisaError::config("rows of unequal width given to the binner"));
        }
        let dims = (0..width)
            .map(|d| {
                let column: Vec<f64> = rows.iter().map(|r| r[d]).collect();
                DimensionBins::fit(&column, bins, scheme)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Binner { dims })
    }

    pub fn dims(&self) -> &[DimensionBins] {
        &self.dims
    }

    pub fn width(&self) -> usize {
        self.dims.len()
    }

    pub fn letters(&self, values: &[f64]) -> Result<Vec<Letter>> {
        if values.len() != self.dims.len() {
            return Err(GisaError::config(format!(
                "binner has {} dimensions, vector has {}",
                self.dims.len(),
                values.len()
            )));
        }
        Ok(self
            .dims
            .iter()
            .zip(values)
            .map(|(d, v)| d.bin(*v))
            .collect())
    }
}
