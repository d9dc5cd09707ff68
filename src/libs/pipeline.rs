//! Batch entry points: invariants per chain, database building and the three
//! query modes.
//!
//! Chains are processed independently and in parallel on the current rayon
//! pool; results come back in input order. Errors that only concern one
//! structure are logged, the structure is skipped and counted.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::libs::binning::{Binner, Letter};
use crate::libs::chain::{expand_inputs, read_chains, Chain};
use crate::libs::config::{Config, MatchUnits, QueryMode};
use crate::libs::db::{Database, DbHeader, PairRow, WindowRow};
use crate::libs::error::{GisaError, Result};
use crate::libs::index::{DbRecord, LetterIndex, LetterIndexBuilder};
use crate::libs::invariant::{InvariantKind, InvariantVector};
use crate::libs::rarity::{self, Background, MatchCandidate, MatchScore};
use crate::libs::simplex::AggregateOptions;
use crate::libs::window::{
    cover, pair_invariants, pairs, window_invariants, PairInvariants, SegmentSource,
    SimplexSource, WindowInvariants,
};

/// Results of the chains that made it, and how many were skipped.
#[derive(Debug, Clone)]
pub struct Batch<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct ChainInvariants {
    pub structure: String,
    pub chain: String,
    pub points: usize,
    /// Whole-chain values
    pub corner: InvariantVector,
    pub windows: Vec<WindowInvariants>,
    pub pairs: Vec<PairInvariants>,
}

fn skip(err: GisaError, skipped: &mut usize) -> Result<()> {
    if err.is_per_structure() {
        log::warn!("Skipping: {}", err);
        *skipped += 1;
        Ok(())
    } else {
        Err(err)
    }
}

/// Reads every chain of `inputs` that is well formed and long enough.
pub fn load_chains(config: &Config, inputs: &[String]) -> Result<Batch<Chain>> {
    let files = expand_inputs(inputs)?;
    let required = config.required_points();
    let mut items = vec![];
    let mut skipped = 0;

    for file in &files {
        let raws = match read_chains(file) {
            Ok(raws) => raws,
            Err(e) => {
                skip(e, &mut skipped)?;
                continue;
            }
        };
        for raw in raws {
            let chain = raw.into_chain().and_then(|c| {
                c.check_length(required)?;
                Ok(c)
            });
            match chain {
                Ok(c) => items.push(c),
                Err(e) => skip(e, &mut skipped)?,
            }
        }
    }
    log::info!("Read {} chains from {} files", items.len(), files.len());

    Ok(Batch { items, skipped })
}

/// Runs `f` over `chains` in parallel, keeping input order.
fn process<T, F>(chains: &[Chain], mut skipped: usize, f: F) -> Result<Batch<T>>
where
    T: Send,
    F: Fn(&Chain) -> Result<T> + Sync,
{
    let results: Vec<Result<T>> = chains.par_iter().map(&f).collect();
    let mut items = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(item) => items.push(item),
            Err(e) => skip(e, &mut skipped)?,
        }
    }
    if skipped > 0 {
        log::info!("Skipped {} structures", skipped);
    }
    Ok(Batch { items, skipped })
}

/// How far below whole chains the invariants go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Chain,
    Windows,
    /// Windows and their pairs
    Pairs,
}

fn chain_invariants(config: &Config, chain: &Chain, depth: Depth) -> Result<ChainInvariants> {
    let opts = AggregateOptions::new(config.order, config.include_abs, config.full_simplex);
    let simplex = chain.aggregate(&opts)?;
    log::debug!("{}: aggregated {} segments", chain.name(), simplex.segments());

    let mut result = ChainInvariants {
        structure: chain.structure.clone(),
        chain: chain.chain_id.clone(),
        points: chain.len(),
        corner: simplex.corner(),
        windows: vec![],
        pairs: vec![],
    };
    if depth == Depth::Chain {
        return Ok(result);
    }

    // a chain without windows has nothing to match
    chain.check_length(config.window_length)?;
    let windows = cover(chain.len(), config.window_length, config.stride, config.covering);
    let window_pairs = match depth {
        Depth::Pairs => pairs(&windows, config.disjoint_pairs_only),
        _ => vec![],
    };
    if config.full_simplex {
        let source = SimplexSource::new(&simplex)?;
        result.windows = window_invariants(&source, &windows)?;
        result.pairs = pair_invariants(&source, &window_pairs, config.include_abs)?;
    } else {
        let segments = chain.segments();
        let source =
            SegmentSource::new(&segments, config.order, config.include_abs).with_order1(&simplex);
        result.windows = window_invariants(&source, &windows)?;
        result.pairs = pair_invariants(&source, &window_pairs, config.include_abs)?;
    }
    Ok(result)
}

/// Invariants of every chain in `inputs`, down to `depth`.
pub fn compute_invariants(
    config: &Config,
    inputs: &[String],
    depth: Depth,
) -> Result<Batch<ChainInvariants>> {
    config.validate()?;
    let chains = load_chains(config, inputs)?;
    process(&chains.items, chains.skipped, |c| {
        chain_invariants(config, c, depth)
    })
}

/// Window and pair rows of every chain in `inputs`.
pub fn build_database(config: &Config, inputs: &[String]) -> Result<Database> {
    let batch = compute_invariants(config, inputs, Depth::Pairs)?;
    let header = DbHeader::new(
        config.order,
        config.include_abs,
        config.window_length,
        config.stride,
    );
    let mut db = Database::new(header);

    for inv in batch.items {
        for w in &inv.windows {
            let values = w.values.select(&db.header.kinds).ok_or_else(|| {
                GisaError::config(format!("{}:{}: incomplete window values", inv.structure, inv.chain))
            })?;
            db.windows.push(WindowRow {
                structure: inv.structure.clone(),
                chain: inv.chain.clone(),
                chain_len: inv.points,
                window: w.window,
                values,
            });
        }
        for p in &inv.pairs {
            let values = p.mutual.select(&db.header.mutual).ok_or_else(|| {
                GisaError::config(format!("{}:{}: incomplete pair values", inv.structure, inv.chain))
            })?;
            db.pairs.push(PairRow {
                structure: inv.structure.clone(),
                chain: inv.chain.clone(),
                chain_len: inv.points,
                first: p.first.number,
                second: p.second.number,
                values,
            });
        }
    }
    log::info!(
        "Database of {} windows and {} pairs from {} chains",
        db.windows.len(),
        db.pairs.len(),
        db.chains()
    );

    Ok(db)
}

/// Optional inputs of a query.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Bins of window letters; fitted on the database when absent
    pub window_bins: Option<Binner>,
    pub pair_bins: Option<Binner>,
    pub background: Option<Background>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MismatchScore {
    pub mismatches: usize,
    pub score: MatchScore,
    /// Label of the unit deciding a max-mutual score
    pub best: Option<String>,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub structure: String,
    pub chain: String,
    pub points: usize,
    pub units: usize,
    /// One per allowed mismatch count
    pub scores: Vec<MismatchScore>,
}

/// Dimensions of window letters.
pub fn window_dims(mode: QueryMode, header: &DbHeader) -> Result<Vec<InvariantKind>> {
    let dims = match mode {
        QueryMode::Mutual => vec![InvariantKind::I12],
        QueryMode::MutualAbs => vec![InvariantKind::I12, InvariantKind::IA12],
        QueryMode::Full => header.kinds.clone(),
    };
    if dims.iter().any(|k| header.kind_column(*k).is_none()) {
        return Err(GisaError::config(
            "the database lacks absolute values; rebuild it with --abs",
        ));
    }
    Ok(dims)
}

/// Dimensions of the mutual part of pair letters.
pub fn mutual_dims(mode: QueryMode, header: &DbHeader) -> Result<Vec<InvariantKind>> {
    let dims = match mode {
        QueryMode::Mutual => vec![InvariantKind::I12],
        QueryMode::MutualAbs => vec![InvariantKind::I12, InvariantKind::IA12],
        QueryMode::Full => header.mutual.clone(),
    };
    if dims.iter().any(|k| header.mutual_column(*k).is_none()) {
        return Err(GisaError::config(
            "the database lacks absolute values; rebuild it with --abs",
        ));
    }
    Ok(dims)
}

fn pick(values: &[f64], columns: &[usize]) -> Vec<f64> {
    columns.iter().map(|&c| values[c]).collect()
}

/// One kind of query unit: its letter index, binner and dimensions.
struct UnitMatcher {
    index: LetterIndex,
    binner: Binner,
    /// Records per structure, for self exclusion
    per_structure: HashMap<String, usize>,
}

impl UnitMatcher {
    fn new(
        records: Vec<(DbRecord, Vec<f64>)>,
        binner: Option<Binner>,
        config: &Config,
    ) -> Result<Self> {
        let binner = match binner {
            Some(b) => b,
            None => {
                let rows: Vec<Vec<f64>> = records.iter().map(|(_, v)| v.clone()).collect();
                Binner::fit(&rows, config.nr_of_bins, config.bin_scheme)?
            }
        };
        let mut builder = LetterIndexBuilder::new();
        let mut per_structure: HashMap<String, usize> = HashMap::new();
        for (mut record, values) in records {
            record.letters = binner.letters(&values)?;
            *per_structure.entry(record.structure.clone()).or_default() += 1;
            builder.push(record)?;
        }
        Ok(UnitMatcher {
            index: builder.build(),
            binner,
            per_structure,
        })
    }

    fn candidate(
        &self,
        unit: usize,
        mutual: f64,
        letters: &[Letter],
        mismatches: usize,
        exclude: Option<&str>,
    ) -> Result<MatchCandidate> {
        let ids = self.index.within(letters, mismatches)?;
        let (hits, total) = match exclude {
            Some(structure) => (
                ids.iter()
                    .filter(|&&id| self.index.get(id).structure != structure)
                    .count(),
                self.index.len() - self.per_structure.get(structure).copied().unwrap_or(0),
            ),
            None => (ids.len(), self.index.len()),
        };
        Ok(MatchCandidate {
            unit,
            mutual,
            hits,
            total,
        })
    }
}

struct QueryUnit {
    label: String,
    mutual: f64,
    letters: Vec<Letter>,
    pair: bool,
}

struct QueryPlan {
    window_dims: Vec<InvariantKind>,
    mutual_dims: Vec<InvariantKind>,
    windows: Option<UnitMatcher>,
    pairs: Option<UnitMatcher>,
}

impl QueryPlan {
    fn new(config: &Config, db: &Database, mode: QueryMode, opts: &QueryOptions) -> Result<Self> {
        let header = &db.header;
        let window_dims = window_dims(mode, header)?;
        let mutual_dims = mutual_dims(mode, header)?;
        let window_cols: Vec<usize> = window_dims
            .iter()
            .filter_map(|k| header.kind_column(*k))
            .collect();
        let mutual_cols: Vec<usize> = mutual_dims
            .iter()
            .filter_map(|k| header.mutual_column(*k))
            .collect();
        let i12 = header
            .kind_column(InvariantKind::I12)
            .ok_or_else(|| GisaError::config("the database has no I12 column"))?;

        let windows = if config.match_units.windows() {
            if db.windows.is_empty() {
                return Err(GisaError::config("the database has no window rows"));
            }
            let records = db
                .windows
                .iter()
                .map(|w| {
                    let record = DbRecord {
                        structure: w.structure.clone(),
                        chain: w.chain.clone(),
                        chain_len: w.chain_len,
                        window: w.window.number,
                        second_window: None,
                        mutual: w.values[i12],
                        letters: vec![],
                    };
                    (record, pick(&w.values, &window_cols))
                })
                .collect();
            Some(UnitMatcher::new(records, opts.window_bins.clone(), config)?)
        } else {
            None
        };

        let pairs = if config.match_units.pairs() {
            if db.pairs.is_empty() {
                return Err(GisaError::config("the database has no pair rows"));
            }
            let mutual_i12 = header
                .mutual_column(InvariantKind::I12)
                .ok_or_else(|| GisaError::config("the database has no mutual I12 column"))?;
            let by_window = db.window_map();
            let mut records = Vec::with_capacity(db.pairs.len());
            for p in &db.pairs {
                let lookup = |number: usize| {
                    by_window
                        .get(&(p.structure.as_str(), p.chain.as_str(), number))
                        .ok_or_else(|| {
                            GisaError::config(format!(
                                "{}:{}: pair refers to missing window {}",
                                p.structure, p.chain, number
                            ))
                        })
                };
                let mut values = pick(&lookup(p.first)?.values, &window_cols);
                values.extend(pick(&lookup(p.second)?.values, &window_cols));
                values.extend(pick(&p.values, &mutual_cols));
                let record = DbRecord {
                    structure: p.structure.clone(),
                    chain: p.chain.clone(),
                    chain_len: p.chain_len,
                    window: p.first,
                    second_window: Some(p.second),
                    mutual: p.values[mutual_i12],
                    letters: vec![],
                };
                records.push((record, values));
            }
            Some(UnitMatcher::new(records, opts.pair_bins.clone(), config)?)
        } else {
            None
        };

        Ok(QueryPlan {
            window_dims,
            mutual_dims,
            windows,
            pairs,
        })
    }

    fn units(&self, inv: &ChainInvariants) -> Result<Vec<QueryUnit>> {
        let incomplete = || {
            GisaError::config(format!("{}:{}: incomplete query values", inv.structure, inv.chain))
        };
        let mut units = vec![];
        let mut by_number: HashMap<usize, Vec<f64>> = HashMap::new();
        for w in &inv.windows {
            by_number.insert(w.window.number, w.values.select(&self.window_dims).ok_or_else(incomplete)?);
        }

        let window_values = |number: usize| by_number.get(&number).ok_or_else(incomplete);

        if let Some(matcher) = &self.windows {
            for w in &inv.windows {
                units.push(QueryUnit {
                    label: format!("w{}", w.window.number),
                    mutual: w.values.get(InvariantKind::I12).unwrap_or(0.0),
                    letters: matcher.binner.letters(window_values(w.window.number)?)?,
                    pair: false,
                });
            }
        }
        if let Some(matcher) = &self.pairs {
            for p in &inv.pairs {
                let mut values = window_values(p.first.number)?.clone();
                values.extend_from_slice(window_values(p.second.number)?);
                values.extend(p.mutual.select(&self.mutual_dims).ok_or_else(incomplete)?);
                units.push(QueryUnit {
                    label: format!("w{}-w{}", p.first.number, p.second.number),
                    mutual: p.mutual.get(InvariantKind::I12).unwrap_or(0.0),
                    letters: matcher.binner.letters(&values)?,
                    pair: true,
                });
            }
        }
        Ok(units)
    }

    fn score(
        &self,
        config: &Config,
        inv: &ChainInvariants,
        background: Option<&Background>,
    ) -> Result<QueryReport> {
        let units = self.units(inv)?;
        let exclude = config.exclude_self.then_some(inv.structure.as_str());

        let mut scores = vec![];
        for &m in &config.allowed_mismatches {
            let mut candidates = Vec::with_capacity(units.len());
            for (k, unit) in units.iter().enumerate() {
                let matcher = if unit.pair { &self.pairs } else { &self.windows };
                if let Some(matcher) = matcher {
                    candidates.push(matcher.candidate(k, unit.mutual, &unit.letters, m, exclude)?);
                }
            }
            let score = rarity::score(&candidates, &config.score_policy, config.normalize);
            scores.push(MismatchScore {
                mismatches: m,
                best: score.best.map(|k| units[k].label.clone()),
                p_value: background.map(|b| b.p_value(score.score)),
                score,
            });
        }
        log::debug!("{}:{}: scored {} units", inv.structure, inv.chain, units.len());

        Ok(QueryReport {
            structure: inv.structure.clone(),
            chain: inv.chain.clone(),
            points: inv.points,
            units: units.len(),
            scores,
        })
    }
}

fn run_query(
    config: &Config,
    db: &Database,
    inputs: &[String],
    mode: QueryMode,
    opts: &QueryOptions,
) -> Result<Batch<QueryReport>> {
    config.validate()?;
    let h = &db.header;
    if config.order != h.order || config.include_abs != h.include_abs {
        return Err(GisaError::config(format!(
            "query order {} abs {} differs from the database's order {} abs {}",
            config.order, config.include_abs, h.order, h.include_abs
        )));
    }
    if config.window_length != h.window_length {
        return Err(GisaError::config(format!(
            "query windows of {} points against a database of {}-point windows",
            config.window_length, h.window_length
        )));
    }

    let plan = QueryPlan::new(config, db, mode, opts)?;
    let chains = load_chains(config, inputs)?;
    process(&chains.items, chains.skipped, |c| {
        let inv = chain_invariants(config, c, Depth::Pairs)?;
        plan.score(config, &inv, opts.background.as_ref())
    })
}

/// Matches on `I12` alone.
pub fn query_mutual(
    config: &Config,
    db: &Database,
    inputs: &[String],
    opts: &QueryOptions,
) -> Result<Batch<QueryReport>> {
    run_query(config, db, inputs, QueryMode::Mutual, opts)
}

/// Matches on `I12` and `Ia12`.
pub fn query_mutual_abs(
    config: &Config,
    db: &Database,
    inputs: &[String],
    opts: &QueryOptions,
) -> Result<Batch<QueryReport>> {
    run_query(config, db, inputs, QueryMode::MutualAbs, opts)
}

/// Matches on every stored kind.
pub fn query_full(
    config: &Config,
    db: &Database,
    inputs: &[String],
    opts: &QueryOptions,
) -> Result<Batch<QueryReport>> {
    run_query(config, db, inputs, QueryMode::Full, opts)
}

pub fn query(
    config: &Config,
    db: &Database,
    inputs: &[String],
    mode: QueryMode,
    opts: &QueryOptions,
) -> Result<Batch<QueryReport>> {
    match mode {
        QueryMode::Mutual => query_mutual(config, db, inputs, opts),
        QueryMode::MutualAbs => query_mutual_abs(config, db, inputs, opts),
        QueryMode::Full => query_full(config, db, inputs, opts),
    }
}

/// Bins fitted on the database for one unit kind, as a query would fit them.
pub fn fit_bins(config: &Config, db: &Database, mode: QueryMode, pair_units: bool) -> Result<Binner> {
    let single = Config {
        match_units: if pair_units {
            MatchUnits::Pairs
        } else {
            MatchUnits::Windows
        },
        ..config.clone()
    };
    let plan = QueryPlan::new(&single, db, mode, &QueryOptions::default())?;
    let matcher = if pair_units { plan.pairs } else { plan.windows };
    matcher
        .map(|m| m.binner)
        .ok_or_else(|| GisaError::config("no units to fit bins on"))
}
