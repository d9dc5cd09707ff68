//! One configuration value for every pipeline.

use std::str::FromStr;

use crate::libs::binning::{BinScheme, MAX_BINS};
use crate::libs::error::{GisaError, Result};
use crate::libs::rarity::ScorePolicy;
use crate::libs::window::CoveringPolicy;

/// Which query units are matched against the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchUnits {
    Windows,
    Pairs,
    Both,
}

impl MatchUnits {
    pub fn windows(&self) -> bool {
        matches!(self, MatchUnits::Windows | MatchUnits::Both)
    }

    pub fn pairs(&self) -> bool {
        matches!(self, MatchUnits::Pairs | MatchUnits::Both)
    }
}

impl FromStr for MatchUnits {
    type Err = GisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "windows" => Ok(MatchUnits::Windows),
            "pairs" => Ok(MatchUnits::Pairs),
            "both" => Ok(MatchUnits::Both),
            _ => Err(GisaError::config(format!("unknown match units: {}", s))),
        }
    }
}

/// Which invariants make up a query's letter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// `I12` only
    Mutual,
    /// `I12` and `Ia12`
    MutualAbs,
    /// Every stored window kind
    Full,
}

impl FromStr for QueryMode {
    type Err = GisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mutual" => Ok(QueryMode::Mutual),
            "mutual-abs" => Ok(QueryMode::MutualAbs),
            "full" => Ok(QueryMode::Full),
            _ => Err(GisaError::config(format!("unknown query mode: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Highest invariant order, 1 to 3
    pub order: usize,
    pub include_abs: bool,
    /// Keep every sub-chain cell instead of the corner only
    pub full_simplex: bool,
    /// Window length in points
    pub window_length: usize,
    pub stride: usize,
    pub covering: CoveringPolicy,
    pub disjoint_pairs_only: bool,
    /// One score per value
    pub allowed_mismatches: Vec<usize>,
    pub normalize: bool,
    pub nr_of_bins: usize,
    /// `|mutual|` threshold under `ScorePolicy::AboveThreshold`
    pub threshold: f64,
    /// Chains with fewer points are skipped
    pub min_chain_length: usize,
    pub bin_scheme: BinScheme,
    pub score_policy: ScorePolicy,
    pub match_units: MatchUnits,
    pub exclude_self: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            order: 2,
            include_abs: true,
            full_simplex: false,
            window_length: 16,
            stride: 2,
            covering: CoveringPolicy::Stride,
            disjoint_pairs_only: true,
            allowed_mismatches: vec![0],
            normalize: false,
            nr_of_bins: 8,
            threshold: 0.0,
            min_chain_length: 10,
            bin_scheme: BinScheme::EqualPopulation,
            score_policy: ScorePolicy::MaxMutual { signed: false },
            match_units: MatchUnits::Pairs,
            exclude_self: false,
        }
    }
}

impl Config {
    /// Segments a window holds.
    pub fn window_segments(&self) -> usize {
        self.window_length.saturating_sub(1)
    }

    /// Points a chain needs before it is processed.
    pub fn required_points(&self) -> usize {
        (2 * self.order + 1).max(self.min_chain_length)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.order) {
            return Err(GisaError::config(format!(
                "order must be 1, 2 or 3, got {}",
                self.order
            )));
        }
        if self.window_length < 2 {
            return Err(GisaError::config("window length must be at least 2 points"));
        }
        if self.window_segments() < 2 * self.order {
            return Err(GisaError::config(format!(
                "windows of {} points are too short for order {} ({} segments needed)",
                self.window_length,
                self.order,
                2 * self.order
            )));
        }
        if self.stride == 0 {
            return Err(GisaError::config("stride must be positive"));
        }
        if self.nr_of_bins == 0 || self.nr_of_bins > MAX_BINS {
            return Err(GisaError::config(format!(
                "number of bins must be within 1..={}",
                MAX_BINS
            )));
        }
        if self.allowed_mismatches.is_empty() {
            return Err(GisaError::config("no allowed mismatch count given"));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(GisaError::config("threshold must be a finite non-negative number"));
        }
        if let ScorePolicy::AboveThreshold { threshold, .. } = self.score_policy {
            if threshold != self.threshold {
                return Err(GisaError::config("score policy threshold disagrees with threshold"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_chain_length, 10);
        assert_eq!(config.required_points(), 10);
        let order3 = Config {
            order: 3,
            min_chain_length: 0,
            ..Default::default()
        };
        assert_eq!(order3.required_points(), 7);
    }

    #[test]
    fn window_must_fit_the_order() {
        let mut config = Config {
            order: 3,
            window_length: 6,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(GisaError::Config(_))));
        config.window_length = 7;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        for config in [
            Config { order: 4, ..Default::default() },
            Config { stride: 0, ..Default::default() },
            Config { nr_of_bins: 0, ..Default::default() },
            Config { nr_of_bins: 257, ..Default::default() },
            Config { allowed_mismatches: vec![], ..Default::default() },
            Config { threshold: -1.0, ..Default::default() },
        ] {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }

    #[test]
    fn parse_selectors() {
        assert_eq!("both".parse::<MatchUnits>().unwrap(), MatchUnits::Both);
        assert!(MatchUnits::Both.windows() && MatchUnits::Both.pairs());
        assert_eq!("mutual-abs".parse::<QueryMode>().unwrap(), QueryMode::MutualAbs);
        assert!("all".parse::<QueryMode>().is_err());
    }
}
