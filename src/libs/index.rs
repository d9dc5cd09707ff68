//! Lexicographically sorted letter vectors with exact and bounded-mismatch
//! lookup.
//!
//! Mismatch search never sorts by a mismatch-tolerant comparator. It walks the
//! sorted order one dimension at a time: inside a run of records sharing the
//! query's prefix, the records holding each letter at the next position form
//! a contiguous sub-run found by bisection. The query's own letter keeps the
//! mismatch budget, every other letter spends one.

use std::cmp::Ordering;
use std::ops::Range;

use crate::libs::binning::Letter;
use crate::libs::error::{GisaError, Result};
use crate::libs::ordering::{equal_range_by, heap_sort_by, upper_bound_by};

/// Records are reserved in chunks of this many as they accumulate.
pub const GROWTH_CHUNK: usize = 4096;

/// A window (or window pair) of the database and its letters.
#[derive(Debug, Clone, PartialEq)]
pub struct DbRecord {
    pub structure: String,
    pub chain: String,
    pub chain_len: usize,
    pub window: usize,
    pub second_window: Option<usize>,
    /// Mutual `I12` of a pair, the window's own `I12` otherwise
    pub mutual: f64,
    pub letters: Vec<Letter>,
}

impl DbRecord {
    fn identity_cmp(&self, other: &DbRecord) -> Ordering {
        self.structure
            .cmp(&other.structure)
            .then_with(|| self.chain.cmp(&other.chain))
            .then_with(|| self.window.cmp(&other.window))
            .then_with(|| self.second_window.cmp(&other.second_window))
            .then_with(|| self.mutual.total_cmp(&other.mutual))
    }
}

#[derive(Debug, Default)]
pub struct LetterIndexBuilder {
    width: Option<usize>,
    records: Vec<DbRecord>,
}

impl LetterIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DbRecord) -> Result<()> {
        match self.width {
            None => self.width = Some(record.letters.len()),
            Some(w) if w != record.letters.len() => {
                return Err(GisaError::config(format!(
                    "letter vector of width {} added to an index of width {}",
                    record.letters.len(),
                    w
                )))
            }
            Some(_) => {}
        }
        if self.records.len() == self.records.capacity() {
            self.records.reserve_exact(GROWTH_CHUNK);
        }
        self.records.push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Freezes the records and sorts them by letters, then by identity, so
    /// the order does not depend on the order of insertion.
    pub fn build(self) -> LetterIndex {
        let records = self.records;
        let mut order: Vec<usize> = (0..records.len()).collect();
        heap_sort_by(&mut order, |&a, &b| {
            records[a]
                .letters
                .cmp(&records[b].letters)
                .then_with(|| records[a].identity_cmp(&records[b]))
        });
        LetterIndex {
            width: self.width.unwrap_or(0),
            records,
            order,
        }
    }
}

#[derive(Debug)]
pub struct LetterIndex {
    width: usize,
    records: Vec<DbRecord>,
    // record ids in lexicographic letter order
    order: Vec<usize>,
}

impl LetterIndex {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Record by id (insertion position).
    pub fn get(&self, id: usize) -> &DbRecord {
        &self.records[id]
    }

    pub fn records(&self) -> &[DbRecord] {
        &self.records
    }

    /// Records in sorted order.
    pub fn sorted(&self) -> impl Iterator<Item = &DbRecord> + '_ {
        self.order.iter().map(|&i| &self.records[i])
    }

    fn letter(&self, pos: usize, dim: usize) -> Letter {
        self.records[pos].letters[dim]
    }

    /// Sub-run of `range` (positions in the sorted order) holding `letter` at
    /// `dim`. All records in `range` must share the letters before `dim`.
    fn letter_range(&self, dim: usize, letter: Letter, range: Range<usize>) -> Range<usize> {
        let slice = &self.order[range.clone()];
        let found = equal_range_by(slice, |&id| self.letter(id, dim).cmp(&letter));
        (range.start + found.start)..(range.start + found.end)
    }

    fn check_width(&self, query: &[Letter]) -> Result<()> {
        if query.len() != self.width && !self.is_empty() {
            return Err(GisaError::config(format!(
                "query of width {} against an index of width {}",
                query.len(),
                self.width
            )));
        }
        Ok(())
    }

    /// Ids of the records whose letters equal `query`, ascending.
    pub fn exact(&self, query: &[Letter]) -> Result<Vec<usize>> {
        self.within(query, 0)
    }

    /// Ids of the records within Hamming distance `mismatches` of `query`,
    /// ascending.
    pub fn within(&self, query: &[Letter], mismatches: usize) -> Result<Vec<usize>> {
        self.check_width(query)?;
        let mut out = vec![];
        if !self.is_empty() {
            self.descend(query, 0, 0..self.order.len(), mismatches, &mut out);
        }
        out.sort_unstable();
        Ok(out)
    }

    fn descend(
        &self,
        query: &[Letter],
        dim: usize,
        range: Range<usize>,
        budget: usize,
        out: &mut Vec<usize>,
    ) {
        if range.is_empty() {
            return;
        }
        if dim == self.width {
            out.extend_from_slice(&self.order[range]);
            return;
        }

        let hit = self.letter_range(dim, query[dim], range.clone());
        self.descend(query, dim + 1, hit.clone(), budget, out);

        if budget == 0 {
            return;
        }
        // every other letter present on either side of the hit
        for side in [range.start..hit.start, hit.end..range.end] {
            let mut pos = side.start;
            while pos < side.end {
                let letter = self.letter(self.order[pos], dim);
                let run_end = pos
                    + upper_bound_by(&self.order[pos..side.end], |&id| {
                        self.letter(id, dim).cmp(&letter)
                    });
                self.descend(query, dim + 1, pos..run_end, budget - 1, out);
                pos = run_end;
            }
        }
    }
}
