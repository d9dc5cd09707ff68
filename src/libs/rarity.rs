//! Rarity scores of query units and p-values against a background.

use std::io::BufRead;
use std::str::FromStr;

use crate::libs::error::{GisaError, Result};
use crate::libs::io::reader;
use crate::libs::ordering::{lower_bound_by, sort_floats};

/// How contributing units are combined under a threshold policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
}

impl FromStr for Aggregate {
    type Err = GisaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Aggregate::Sum),
            "mean" => Ok(Aggregate::Mean),
            _ => Err(GisaError::config(format!("unknown aggregate: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScorePolicy {
    /// The unit with the largest `|mutual|` decides. With `signed`, positive
    /// and negative units are scored as separate pools.
    MaxMutual { signed: bool },
    /// Every unit with `|mutual| > threshold` contributes.
    AboveThreshold { threshold: f64, aggregate: Aggregate },
}

/// One examined query unit: a window or a window pair.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    /// Position of the unit in the query's unit list
    pub unit: usize,
    pub mutual: f64,
    /// Database records matching the unit's letters
    pub hits: usize,
    /// Database records the unit was matched against
    pub total: usize,
}

impl MatchCandidate {
    pub fn rarity(&self) -> f64 {
        unit_rarity(self.total, self.hits)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchScore {
    pub score: f64,
    /// Pool scores in signed mode
    pub positive: Option<f64>,
    pub negative: Option<f64>,
    /// Unit deciding a max-mutual score
    pub best: Option<usize>,
    pub contributing: usize,
    pub examined: usize,
}

/// `ln((db_size + 1) / (hits + 1))`: zero when every record matches, large
/// when none does.
pub fn unit_rarity(db_size: usize, hits: usize) -> f64 {
    ((db_size as f64 + 1.0) / (hits as f64 + 1.0)).ln()
}

fn max_mutual<'a, I>(pool: I) -> Option<&'a MatchCandidate>
where
    I: Iterator<Item = &'a MatchCandidate>,
{
    pool.fold(None, |best: Option<&MatchCandidate>, c| match best {
        Some(b) if b.mutual.abs() >= c.mutual.abs() => Some(b),
        _ => Some(c),
    })
}

/// Scores one structure's examined units.
pub fn score(candidates: &[MatchCandidate], policy: &ScorePolicy, normalize: bool) -> MatchScore {
    let mut result = MatchScore {
        examined: candidates.len(),
        ..Default::default()
    };

    match *policy {
        ScorePolicy::MaxMutual { signed: false } => {
            if let Some(best) = max_mutual(candidates.iter()) {
                result.score = best.rarity();
                result.best = Some(best.unit);
                result.contributing = 1;
            }
        }
        ScorePolicy::MaxMutual { signed: true } => {
            let pos = max_mutual(candidates.iter().filter(|c| c.mutual >= 0.0));
            let neg = max_mutual(candidates.iter().filter(|c| c.mutual < 0.0));
            result.positive = pos.map(MatchCandidate::rarity);
            result.negative = neg.map(MatchCandidate::rarity);
            let picked = match (pos, neg) {
                (Some(p), Some(n)) if n.rarity() > p.rarity() => Some(n),
                (p, n) => p.or(n),
            };
            if let Some(best) = picked {
                result.score = best.rarity();
                result.best = Some(best.unit);
                result.contributing = pos.is_some() as usize + neg.is_some() as usize;
            }
        }
        ScorePolicy::AboveThreshold {
            threshold,
            aggregate,
        } => {
            let rarities: Vec<f64> = candidates
                .iter()
                .filter(|c| c.mutual.abs() > threshold)
                .map(MatchCandidate::rarity)
                .collect();
            result.contributing = rarities.len();
            let sum: f64 = rarities.iter().sum();
            result.score = match aggregate {
                Aggregate::Sum => sum,
                Aggregate::Mean if rarities.is_empty() => 0.0,
                Aggregate::Mean => sum / rarities.len() as f64,
            };
        }
    }

    if normalize && result.examined > 0 {
        let n = result.examined as f64;
        result.score /= n;
        result.positive = result.positive.map(|s| s / n);
        result.negative = result.negative.map(|s| s / n);
    }
    result
}

/// Sorted reference scores.
#[derive(Debug, Clone)]
pub struct Background {
    scores: Vec<f64>,
}

impl Background {
    pub fn from_scores(mut scores: Vec<f64>) -> Result<Self> {
        if scores.is_empty() {
            return Err(GisaError::config("background distribution is empty"));
        }
        if scores.iter().any(|s| s.is_nan()) {
            return Err(GisaError::config("background distribution contains NaN"));
        }
        sort_floats(&mut scores);
        Ok(Background { scores })
    }

    /// One score per line; blank and `#` lines are skipped.
    pub fn read(path: &str) -> Result<Self> {
        let mut scores = vec![];
        for (no, line) in reader(path)?.lines().enumerate() {
            let line = line.map_err(|e| GisaError::io(e, path))?;
            let field = line.trim();
            if field.is_empty() || field.starts_with('#') {
                continue;
            }
            let v: f64 = field
                .parse()
                .map_err(|_| GisaError::parse(path, no + 1, format!("not a score: {}", field)))?;
            scores.push(v);
        }
        Self::from_scores(scores)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Fraction of the background scoring at least `score`.
    pub fn p_value(&self, score: f64) -> f64 {
        let below = lower_bound_by(&self.scores, |b| b.total_cmp(&score));
        (self.scores.len() - below) as f64 / self.scores.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidate(unit: usize, mutual: f64, hits: usize) -> MatchCandidate {
        MatchCandidate {
            unit,
            mutual,
            hits,
            total: 99,
        }
    }

    #[test]
    fn rarity_of_hits() {
        assert_relative_eq!(unit_rarity(99, 99), 0.0);
        assert_relative_eq!(unit_rarity(99, 0), 100f64.ln());
        assert!(unit_rarity(99, 3) > unit_rarity(99, 30));
    }

    #[test]
    fn max_mutual_picks_the_largest_magnitude() {
        let units = vec![candidate(0, 0.2, 50), candidate(1, -0.9, 0), candidate(2, 0.5, 10)];
        let s = score(&units, &ScorePolicy::MaxMutual { signed: false }, false);
        assert_eq!(s.best, Some(1));
        assert_relative_eq!(s.score, 100f64.ln());
        assert_eq!(s.examined, 3);

        let s = score(&units, &ScorePolicy::MaxMutual { signed: true }, false);
        assert_relative_eq!(s.positive.unwrap(), unit_rarity(99, 10));
        assert_relative_eq!(s.negative.unwrap(), unit_rarity(99, 0));
        assert_eq!(s.best, Some(1));
        assert_eq!(s.contributing, 2);
    }

    #[test]
    fn signed_pools_take_the_rarer() {
        let units = vec![candidate(0, 0.8, 0), candidate(1, -0.9, 40)];
        let s = score(&units, &ScorePolicy::MaxMutual { signed: true }, false);
        assert_eq!(s.best, Some(0));
        assert_relative_eq!(s.score, unit_rarity(99, 0));
    }

    #[test]
    fn threshold_aggregates() {
        let units = vec![candidate(0, 0.2, 9), candidate(1, -0.6, 0), candidate(2, 0.7, 4)];
        let policy = |aggregate| ScorePolicy::AboveThreshold {
            threshold: 0.5,
            aggregate,
        };
        let expected = unit_rarity(99, 0) + unit_rarity(99, 4);
        let s = score(&units, &policy(Aggregate::Sum), false);
        assert_eq!(s.contributing, 2);
        assert_relative_eq!(s.score, expected);

        let s = score(&units, &policy(Aggregate::Mean), false);
        assert_relative_eq!(s.score, expected / 2.0);

        let s = score(&units, &policy(Aggregate::Sum), true);
        assert_relative_eq!(s.score, expected / 3.0);
    }

    #[test]
    fn nothing_examined() {
        let s = score(&[], &ScorePolicy::MaxMutual { signed: false }, true);
        assert_eq!(s, MatchScore::default());
    }

    #[test]
    fn p_value_of_uniform_background() {
        let scores: Vec<f64> = (0..1000).map(|i| i as f64 * 10.0 / 999.0).collect();
        let background = Background::from_scores(scores).unwrap();
        assert_relative_eq!(background.p_value(9.5), 0.05, epsilon = 1e-3);
        assert_relative_eq!(background.p_value(-1.0), 1.0);
        assert_relative_eq!(background.p_value(11.0), 0.0);
    }

    #[test]
    fn empty_background_is_rejected() {
        assert!(Background::from_scores(vec![]).is_err());
    }

    #[test]
    fn read_background() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bg.txt");
        std::fs::write(&path, "# scores\n3\n1\n\n2\n").unwrap();
        let bg = Background::read(path.to_str().unwrap()).unwrap();
        assert_eq!(bg.len(), 3);
        assert_relative_eq!(bg.p_value(2.0), 2.0 / 3.0);

        std::fs::write(&path, "1\nx\n").unwrap();
        assert!(matches!(
            Background::read(path.to_str().unwrap()),
            Err(GisaError::Parse { line: 2, .. })
        ));
    }
}
