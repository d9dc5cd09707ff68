//! The database file and the bins file.
//!
//! A database is tab-separated text: a `#gisa-db` parameter line, the window
//! kinds, the mutual kinds, then one `W` row per window and one `P` row per
//! window pair.
//!
//! A `W` row holds the window number and its segment bounds `start end`. A
//! `P` row names its two windows by number only; their bounds are those of
//! the `W` rows of the same chain, and a `P` row without them is rejected.
//!
//! ```text
//! #gisa-db	order=2	abs=1	window=16	stride=2
//! #kinds	I12	Ia12	I1234	...
//! #mutual	I12	Ia12
//! W	1abc	A	120	0	0	14	0.0312	...
//! P	1abc	A	120	0	8	-0.0041	0.0913
//! ```

use std::collections::HashMap;
use std::io::{BufRead, Write};

use itertools::Itertools;

use crate::libs::binning::{Binner, DimensionBins};
use crate::libs::error::{GisaError, Result};
use crate::libs::invariant::InvariantKind;
use crate::libs::io::{reader, writer};
use crate::libs::window::Window;

/// Parameters the database was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct DbHeader {
    pub order: usize,
    pub include_abs: bool,
    pub window_length: usize,
    pub stride: usize,
    /// Columns of window rows
    pub kinds: Vec<InvariantKind>,
    /// Columns of pair rows
    pub mutual: Vec<InvariantKind>,
}

impl DbHeader {
    pub fn new(order: usize, include_abs: bool, window_length: usize, stride: usize) -> Self {
        let mut mutual = vec![InvariantKind::I12];
        if include_abs {
            mutual.push(InvariantKind::IA12);
        }
        DbHeader {
            order,
            include_abs,
            window_length,
            stride,
            kinds: InvariantKind::for_order(order, include_abs),
            mutual,
        }
    }

    /// Column of `kind` in window rows.
    pub fn kind_column(&self, kind: InvariantKind) -> Option<usize> {
        self.kinds.iter().position(|k| *k == kind)
    }

    pub fn mutual_column(&self, kind: InvariantKind) -> Option<usize> {
        self.mutual.iter().position(|k| *k == kind)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowRow {
    pub structure: String,
    pub chain: String,
    /// Points in the chain
    pub chain_len: usize,
    pub window: Window,
    /// In `DbHeader::kinds` order
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub structure: String,
    pub chain: String,
    pub chain_len: usize,
    pub first: usize,
    pub second: usize,
    /// In `DbHeader::mutual` order
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub header: DbHeader,
    pub windows: Vec<WindowRow>,
    pub pairs: Vec<PairRow>,
}

fn field<'a>(fields: &[&'a str], k: usize, path: &str, line: usize) -> Result<&'a str> {
    fields
        .get(k)
        .copied()
        .ok_or_else(|| GisaError::parse(path, line, format!("missing field {}", k + 1)))
}

fn parse_num<T: std::str::FromStr>(s: &str, path: &str, line: usize) -> Result<T> {
    s.trim()
        .parse::<T>()
        .map_err(|_| GisaError::parse(path, line, format!("bad number: '{}'", s)))
}

fn parse_values(fields: &[&str], width: usize, path: &str, line: usize) -> Result<Vec<f64>> {
    if fields.len() != width {
        return Err(GisaError::parse(
            path,
            line,
            format!("expected {} values, found {}", width, fields.len()),
        ));
    }
    fields.iter().map(|f| parse_num(f, path, line)).collect()
}

fn parse_kinds(fields: &[&str], path: &str, line: usize) -> Result<Vec<InvariantKind>> {
    fields
        .iter()
        .map(|f| f.parse::<InvariantKind>().map_err(|e| GisaError::parse(path, line, e)))
        .collect()
}

impl Database {
    pub fn new(header: DbHeader) -> Self {
        Database {
            header,
            windows: vec![],
            pairs: vec![],
        }
    }

    /// Distinct structure-chain pairs.
    pub fn chains(&self) -> usize {
        self.windows
            .iter()
            .map(|w| (&w.structure, &w.chain))
            .chain(self.pairs.iter().map(|p| (&p.structure, &p.chain)))
            .unique()
            .count()
    }

    /// Window rows keyed by structure, chain and window number.
    pub fn window_map(&self) -> HashMap<(&str, &str, usize), &WindowRow> {
        self.windows
            .iter()
            .map(|w| ((w.structure.as_str(), w.chain.as_str(), w.window.number), w))
            .collect()
    }

    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let h = &self.header;
        writeln!(
            out,
            "#gisa-db\torder={}\tabs={}\twindow={}\tstride={}",
            h.order, h.include_abs as u8, h.window_length, h.stride
        )?;
        writeln!(out, "#kinds\t{}", h.kinds.iter().join("\t"))?;
        writeln!(out, "#mutual\t{}", h.mutual.iter().join("\t"))?;
        for w in &self.windows {
            writeln!(
                out,
                "W\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                w.structure,
                w.chain,
                w.chain_len,
                w.window.number,
                w.window.start,
                w.window.end,
                w.values.iter().join("\t")
            )?;
        }
        for p in &self.pairs {
            writeln!(
                out,
                "P\t{}\t{}\t{}\t{}\t{}\t{}",
                p.structure,
                p.chain,
                p.chain_len,
                p.first,
                p.second,
                p.values.iter().join("\t")
            )?;
        }
        Ok(())
    }

    pub fn write(&self, path: &str) -> Result<()> {
        let mut out = writer(path)?;
        self.write_to(&mut out).map_err(|e| match e {
            GisaError::Io { source, .. } => GisaError::io(source, path),
            other => other,
        })?;
        out.flush().map_err(|e| GisaError::io(e, path))
    }

    pub fn read(path: &str) -> Result<Self> {
        Self::read_from(reader(path)?, path)
    }

    pub fn read_from<R: BufRead>(input: R, path: &str) -> Result<Self> {
        let mut params: Option<(usize, bool, usize, usize)> = None;
        let mut kinds: Option<Vec<InvariantKind>> = None;
        let mut mutual: Option<Vec<InvariantKind>> = None;
        let mut db: Option<Database> = None;
        let mut pair_lines: Vec<usize> = vec![];

        for (k, line) in input.lines().enumerate() {
            let line = line.map_err(|e| GisaError::io(e, path))?;
            let no = k + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();

            match fields[0] {
                "#gisa-db" => {
                    let mut kv: HashMap<&str, &str> = HashMap::new();
                    for f in &fields[1..] {
                        let (key, value) = f.split_once('=').ok_or_else(|| {
                            GisaError::parse(path, no, format!("bad parameter: '{}'", f))
                        })?;
                        kv.insert(key, value);
                    }
                    let get = |key: &str| {
                        kv.get(key)
                            .copied()
                            .ok_or_else(|| GisaError::parse(path, no, format!("no {}", key)))
                    };
                    params = Some((
                        parse_num(get("order")?, path, no)?,
                        get("abs")? == "1",
                        parse_num(get("window")?, path, no)?,
                        parse_num(get("stride")?, path, no)?,
                    ));
                }
                "#kinds" => kinds = Some(parse_kinds(&fields[1..], path, no)?),
                "#mutual" => mutual = Some(parse_kinds(&fields[1..], path, no)?),
                s if s.starts_with('#') => {}
                "W" | "P" => {
                    if db.is_none() {
                        let (order, include_abs, window_length, stride) = params
                            .ok_or_else(|| GisaError::parse(path, no, "row before #gisa-db header"))?;
                        let header = DbHeader {
                            order,
                            include_abs,
                            window_length,
                            stride,
                            kinds: kinds.take().ok_or_else(|| {
                                GisaError::parse(path, no, "row before #kinds header")
                            })?,
                            mutual: mutual.take().ok_or_else(|| {
                                GisaError::parse(path, no, "row before #mutual header")
                            })?,
                        };
                        db = Some(Database::new(header));
                    }
                    let db = db
                        .as_mut()
                        .ok_or_else(|| GisaError::parse(path, no, "no database header"))?;

                    let structure = field(&fields, 1, path, no)?.to_string();
                    let chain = field(&fields, 2, path, no)?.to_string();
                    let chain_len = parse_num(field(&fields, 3, path, no)?, path, no)?;
                    if fields[0] == "W" {
                        let number = parse_num(field(&fields, 4, path, no)?, path, no)?;
                        let start = parse_num(field(&fields, 5, path, no)?, path, no)?;
                        let end = parse_num(field(&fields, 6, path, no)?, path, no)?;
                        let values = parse_values(
                            fields.get(7..).unwrap_or(&[]),
                            db.header.kinds.len(),
                            path,
                            no,
                        )?;
                        db.windows.push(WindowRow {
                            structure,
                            chain,
                            chain_len,
                            window: Window { number, start, end },
                            values,
                        });
                    } else {
                        let first = parse_num(field(&fields, 4, path, no)?, path, no)?;
                        let second = parse_num(field(&fields, 5, path, no)?, path, no)?;
                        let values = parse_values(
                            fields.get(6..).unwrap_or(&[]),
                            db.header.mutual.len(),
                            path,
                            no,
                        )?;
                        db.pairs.push(PairRow {
                            structure,
                            chain,
                            chain_len,
                            first,
                            second,
                            values,
                        });
                        pair_lines.push(no);
                    }
                }
                other => {
                    return Err(GisaError::parse(path, no, format!("unknown row type '{}'", other)))
                }
            }
        }

        match db {
            Some(db) => {
                check_pair_windows(&db, &pair_lines, path)?;
                Ok(db)
            }
            None => {
                let (order, include_abs, window_length, stride) =
                    params.ok_or_else(|| GisaError::parse(path, 0, "no #gisa-db header"))?;
                Ok(Database::new(DbHeader::new(order, include_abs, window_length, stride)))
            }
        }
    }
}

fn check_pair_windows(db: &Database, pair_lines: &[usize], path: &str) -> Result<()> {
    let by_window = db.window_map();
    for (p, &no) in db.pairs.iter().zip(pair_lines) {
        for number in [p.first, p.second] {
            let key = (p.structure.as_str(), p.chain.as_str(), number);
            if !by_window.contains_key(&key) {
                return Err(GisaError::parse(
                    path,
                    no,
                    format!("pair refers to missing window {}", number),
                ));
            }
        }
    }
    Ok(())
}

/// Bin boundaries, one line per dimension, separated by tabs. A line holding
/// only `-` stands for a single bin.
pub fn write_bins(binner: &Binner, path: &str) -> Result<()> {
    let mut out = writer(path)?;
    for dim in binner.dims() {
        let line = if dim.boundaries().is_empty() {
            "-".to_string()
        } else {
            dim.boundaries().iter().join("\t")
        };
        writeln!(out, "{}", line).map_err(|e| GisaError::io(e, path))?;
    }
    out.flush().map_err(|e| GisaError::io(e, path))
}

pub fn read_bins(path: &str) -> Result<Binner> {
    let mut dims = vec![];
    for (k, line) in reader(path)?.lines().enumerate() {
        let line = line.map_err(|e| GisaError::io(e, path))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let boundaries = if line == "-" {
            vec![]
        } else {
            line.split('\t')
                .map(|f| parse_num::<f64>(f, path, k + 1))
                .collect::<Result<Vec<_>>>()?
        };
        dims.push(DimensionBins::from_boundaries(boundaries)?);
    }
    if dims.is_empty() {
        return Err(GisaError::config(format!("no bins in {}", path)));
    }
    Ok(Binner::new(dims))
}
