//! Invariant kinds and the vectors keyed by them.

use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;

/// Pairings of the four positions of an order-2 invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pairing2 {
    /// (1,2)(3,4): two pairs one after the other
    Serial,
    /// (1,3)(2,4): crossing pairs
    Crossing,
    /// (1,4)(2,3): nested pairs
    Nested,
}

impl Pairing2 {
    pub const ALL: [Pairing2; 3] = [Pairing2::Serial, Pairing2::Crossing, Pairing2::Nested];

    /// Position pairs on `0..4`; the first pair holds position 0.
    pub fn pairs(&self) -> [(usize, usize); 2] {
        match self {
            Pairing2::Serial => [(0, 1), (2, 3)],
            Pairing2::Crossing => [(0, 2), (1, 3)],
            Pairing2::Nested => [(0, 3), (1, 2)],
        }
    }
}

/// Pairing of the six positions of an order-3 invariant: position 1 is
/// paired with `partner` (2..=6) and the remaining four sorted positions
/// follow `rest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pairing3 {
    pub partner: u8,
    pub rest: Pairing2,
}

impl Pairing3 {
    pub fn all() -> Vec<Pairing3> {
        let mut out = Vec::with_capacity(15);
        for partner in 2..=6 {
            for rest in Pairing2::ALL {
                out.push(Pairing3 { partner, rest });
            }
        }
        out
    }

    /// Position pairs on `0..6`; the first pair holds position 0.
    pub fn pairs(&self) -> [(usize, usize); 3] {
        let partner = self.partner as usize - 1;
        let remaining: Vec<usize> = (1..6).filter(|&p| p != partner).collect();
        let [r1, r2] = self.rest.pairs();
        [
            (0, partner),
            (remaining[r1.0], remaining[r1.1]),
            (remaining[r2.0], remaining[r2.1]),
        ]
    }
}

/// Which factors of an order-2 product are taken in absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AbsMask {
    None,
    First,
    Second,
    Both,
}

impl AbsMask {
    pub const ALL: [AbsMask; 4] = [AbsMask::None, AbsMask::First, AbsMask::Second, AbsMask::Both];

    pub fn first(&self) -> bool {
        matches!(self, AbsMask::First | AbsMask::Both)
    }

    pub fn second(&self) -> bool {
        matches!(self, AbsMask::Second | AbsMask::Both)
    }
}

/// One member of the writhe family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InvariantKind {
    Order1 { abs: bool },
    Order2 { pairing: Pairing2, abs: AbsMask },
    Order3 { pairing: Pairing3, abs: bool },
}

impl InvariantKind {
    pub const I12: InvariantKind = InvariantKind::Order1 { abs: false };
    pub const IA12: InvariantKind = InvariantKind::Order1 { abs: true };

    pub fn order(&self) -> usize {
        match self {
            InvariantKind::Order1 { .. } => 1,
            InvariantKind::Order2 { .. } => 2,
            InvariantKind::Order3 { .. } => 3,
        }
    }

    /// True when any factor uses `|w|`.
    pub fn is_abs(&self) -> bool {
        match self {
            InvariantKind::Order1 { abs } => *abs,
            InvariantKind::Order2 { abs, .. } => *abs != AbsMask::None,
            InvariantKind::Order3 { abs, .. } => *abs,
        }
    }

    /// Position pairs of the product and whether each factor is absolute.
    pub fn factors(&self) -> Vec<((usize, usize), bool)> {
        match self {
            InvariantKind::Order1 { abs } => vec![((0, 1), *abs)],
            InvariantKind::Order2 { pairing, abs } => {
                let [p1, p2] = pairing.pairs();
                vec![(p1, abs.first()), (p2, abs.second())]
            }
            InvariantKind::Order3 { pairing, abs } => {
                pairing.pairs().iter().map(|&p| (p, *abs)).collect()
            }
        }
    }

    /// Canonical kind list for a maximum order: signed kinds of each order
    /// first, then their absolute variants when requested.
    pub fn for_order(order: usize, include_abs: bool) -> Vec<InvariantKind> {
        let mut kinds = vec![InvariantKind::I12];
        if include_abs {
            kinds.push(InvariantKind::IA12);
        }
        if order >= 2 {
            for abs in AbsMask::ALL {
                if abs != AbsMask::None && !include_abs {
                    continue;
                }
                for pairing in Pairing2::ALL {
                    kinds.push(InvariantKind::Order2 { pairing, abs });
                }
            }
        }
        if order >= 3 {
            let flags: &[bool] = if include_abs { &[false, true] } else { &[false] };
            for &abs in flags {
                for pairing in Pairing3::all() {
                    kinds.push(InvariantKind::Order3 { pairing, abs });
                }
            }
        }
        kinds
    }
}

impl fmt::Display for InvariantKind {
    /// `I12`, `Ia12`, `I1324`, `Ia13a24`, `I142536`, `Ia142536`, ...
    ///
    /// Every factor marked absolute is prefixed by `a`; order-3 absolute kinds
    /// only carry the leading `a`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I")?;
        let factors = self.factors();
        let short_abs = matches!(self, InvariantKind::Order3 { .. });
        for (k, ((a, b), abs)) in factors.iter().enumerate() {
            if *abs && (!short_abs || k == 0) {
                write!(f, "a")?;
            }
            write!(f, "{}{}", a + 1, b + 1)?;
        }
        Ok(())
    }
}

impl FromStr for InvariantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvariantKind::for_order(3, true)
            .into_iter()
            .find(|k| k.to_string() == s)
            .ok_or_else(|| format!("unknown invariant kind: {}", s))
    }
}

/// Invariant values of one sub-chain, window or window pair, in a fixed
/// kind order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvariantVector {
    values: IndexMap<InvariantKind, f64>,
}

impl InvariantVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: InvariantKind, value: f64) {
        self.values.insert(kind, value);
    }

    pub fn get(&self, kind: InvariantKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    pub fn kinds(&self) -> impl Iterator<Item = InvariantKind> + '_ {
        self.values.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InvariantKind, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values for `kinds`, in that order; missing kinds are `None`.
    pub fn select(&self, kinds: &[InvariantKind]) -> Option<Vec<f64>> {
        kinds.iter().map(|k| self.get(*k)).collect()
    }
}

impl FromIterator<(InvariantKind, f64)> for InvariantVector {
    fn from_iter<I: IntoIterator<Item = (InvariantKind, f64)>>(iter: I) -> Self {
        InvariantVector {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn kind_counts() {
        assert_eq!(InvariantKind::for_order(1, false).len(), 1);
        assert_eq!(InvariantKind::for_order(1, true).len(), 2);
        assert_eq!(InvariantKind::for_order(2, false).len(), 4);
        assert_eq!(InvariantKind::for_order(2, true).len(), 14);
        assert_eq!(InvariantKind::for_order(3, false).len(), 19);
        assert_eq!(InvariantKind::for_order(3, true).len(), 44);
    }

    #[test]
    fn names_are_unique_and_parse_back() {
        let kinds = InvariantKind::for_order(3, true);
        let names: HashSet<String> = kinds.iter().map(|k| k.to_string()).collect();
        assert_eq!(names.len(), kinds.len());

        for kind in kinds {
            assert_eq!(kind.to_string().parse::<InvariantKind>().unwrap(), kind);
        }
    }

    #[test]
    fn familiar_names() {
        let names: Vec<String> = InvariantKind::for_order(2, true)
            .iter()
            .map(|k| k.to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "I12", "Ia12", "I1234", "I1324", "I1423", "Ia1234", "Ia1324", "Ia1423",
                "I12a34", "I13a24", "I14a23", "Ia12a34", "Ia13a24", "Ia14a23"
            ]
        );
    }

    #[test]
    fn order3_pairings_are_perfect_matchings() {
        let all = Pairing3::all();
        assert_eq!(all.len(), 15);
        let mut seen = HashSet::new();
        for p in all {
            let pairs = p.pairs();
            let mut used = [false; 6];
            for (a, b) in pairs {
                assert!(a < b);
                assert!(!used[a] && !used[b]);
                used[a] = true;
                used[b] = true;
            }
            assert!(seen.insert(pairs));
        }
        let p = Pairing3 {
            partner: 4,
            rest: Pairing2::Nested,
        };
        assert_eq!(p.pairs(), [(0, 3), (1, 5), (2, 4)]);
    }

    #[test]
    fn vector_keeps_insertion_order() {
        let mut v = InvariantVector::new();
        v.insert(InvariantKind::IA12, 2.0);
        v.insert(InvariantKind::I12, 1.0);
        assert_eq!(
            v.kinds().collect::<Vec<_>>(),
            vec![InvariantKind::IA12, InvariantKind::I12]
        );
        assert_eq!(v.select(&[InvariantKind::I12]), Some(vec![1.0]));
        let missing = InvariantKind::Order2 {
            pairing: Pairing2::Serial,
            abs: AbsMask::None,
        };
        assert_eq!(v.select(&[missing]), None);
    }
}
