//! Backbone chains and the readers that produce them.
//!
//! Two text inputs are understood, both optionally gzipped:
//!
//! * PDB (`.pdb`, `.ent`): the CA atoms of the first model, grouped by chain
//!   identifier. Alternate locations other than blank or `A` and residues with
//!   an insertion code are skipped.
//! * TSV (`.tsv`, `.txt`): `structure  chain  index  x  y  z` per line, `#`
//!   starts a comment.

use std::io::BufRead;
use std::path::Path;

use itertools::Itertools;
use nalgebra::Vector3;

use crate::libs::error::{GisaError, Result};
use crate::libs::kernel::Segment;
use crate::libs::simplex::{self, AggregateOptions, Simplex};

/// One backbone point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub index: i64,
    pub coord: Vector3<f64>,
}

impl Point {
    pub fn new(index: i64, x: f64, y: f64, z: f64) -> Self {
        Point {
            index,
            coord: Vector3::new(x, y, z),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub structure: String,
    pub chain_id: String,
    points: Vec<Point>,
}

impl Chain {
    /// Checks the point invariants: strictly increasing residue index, finite
    /// coordinates and no two consecutive points at the same place.
    pub fn new(structure: &str, chain_id: &str, points: Vec<Point>) -> Result<Self> {
        let malformed = |reason: String| GisaError::MalformedChain {
            structure: structure.to_string(),
            chain: chain_id.to_string(),
            reason,
        };

        for p in &points {
            if !(p.coord.x.is_finite() && p.coord.y.is_finite() && p.coord.z.is_finite()) {
                return Err(malformed(format!("non-finite coordinate at residue {}", p.index)));
            }
        }
        for (a, b) in points.iter().tuple_windows() {
            if b.index <= a.index {
                return Err(malformed(format!(
                    "residue index not increasing: {} after {}",
                    b.index, a.index
                )));
            }
            if (b.coord - a.coord).norm() == 0.0 {
                return Err(malformed(format!(
                    "residues {} and {} coincide",
                    a.index, b.index
                )));
            }
        }

        Ok(Chain {
            structure: structure.to_string(),
            chain_id: chain_id.to_string(),
            points,
        })
    }

    /// `structure:chain`
    pub fn name(&self) -> String {
        format!("{}:{}", self.structure, self.chain_id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Segment `i` runs from point `i` to point `i + 1`.
    pub fn segments(&self) -> Vec<Segment> {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| Segment::new(a.coord, b.coord))
            .collect()
    }

    pub fn check_length(&self, min_length: usize) -> Result<()> {
        if self.len() < min_length {
            return Err(GisaError::ChainTooShort {
                structure: self.structure.clone(),
                chain: self.chain_id.clone(),
                segments: self.len().saturating_sub(1),
                required: min_length.saturating_sub(1),
            });
        }
        Ok(())
    }

    /// Aggregates the kernel over this chain's segments.
    pub fn aggregate(&self, opts: &AggregateOptions) -> Result<Simplex> {
        simplex::aggregate(&self.segments(), opts).map_err(|e| match e {
            GisaError::ChainTooShort {
                segments, required, ..
            } => GisaError::ChainTooShort {
                structure: self.structure.clone(),
                chain: self.chain_id.clone(),
                segments,
                required,
            },
            other => other,
        })
    }
}

/// Input formats for chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainFormat {
    Pdb,
    Tsv,
}

impl ChainFormat {
    /// Guesses the format from the file name, looking through a `.gz` suffix.
    pub fn from_path(path: &str) -> Option<Self> {
        let name = path.strip_suffix(".gz").unwrap_or(path);
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdb" | "ent" => Some(ChainFormat::Pdb),
            "tsv" | "txt" => Some(ChainFormat::Tsv),
            _ => None,
        }
    }
}

/// The structure id used for a PDB file: its file name without extensions.
pub fn structure_id(path: &str) -> String {
    let file = Path::new(path)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(path);
    file.split('.').next().unwrap_or(file).to_string()
}

/// A chain as read, before the point invariants are checked.
#[derive(Debug, Clone)]
pub struct RawChain {
    pub structure: String,
    pub chain_id: String,
    pub points: Vec<Point>,
}

impl RawChain {
    pub fn into_chain(self) -> Result<Chain> {
        Chain::new(&self.structure, &self.chain_id, self.points)
    }
}

fn parse_f64(field: &str, path: &str, line_no: usize, what: &str) -> Result<f64> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|_| GisaError::parse(path, line_no, format!("bad {}: '{}'", what, field.trim())))
}

/// CA trace of every chain in the first model of a PDB file.
pub fn read_pdb<R: BufRead>(reader: R, structure: &str, path: &str) -> Result<Vec<RawChain>> {
    let mut chains: Vec<RawChain> = vec![];

    for (k, line) in reader.lines().enumerate() {
        let line_no = k + 1;
        let line = line
            .map_err(|e| GisaError::parse(path, line_no, format!("unreadable: {}", e)))?;
        if line.starts_with("ENDMDL") {
            break;
        }
        if !line.starts_with("ATOM") || line.len() < 54 {
            continue;
        }
        if line.get(12..16).map(str::trim) != Some("CA") {
            continue;
        }
        let alt_loc = line.chars().nth(16).unwrap_or(' ');
        if alt_loc != ' ' && alt_loc != 'A' {
            continue;
        }
        let icode = line.chars().nth(26).unwrap_or(' ');
        if icode != ' ' {
            log::debug!("{}: skipping residue with insertion code at line {}", path, line_no);
            continue;
        }

        let chain_id = line.get(21..22).unwrap_or(" ").trim().to_string();
        let index = line
            .get(22..26)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| GisaError::parse(path, line_no, "bad residue number"))?;
        let x = parse_f64(line.get(30..38).unwrap_or(""), path, line_no, "x")?;
        let y = parse_f64(line.get(38..46).unwrap_or(""), path, line_no, "y")?;
        let z = parse_f64(line.get(46..54).unwrap_or(""), path, line_no, "z")?;

        match chains.last_mut() {
            Some(c) if c.chain_id == chain_id => {
                // a second CA for the same residue (altloc 'A' after blank)
                if c.points.last().map(|p| p.index) == Some(index) {
                    continue;
                }
                c.points.push(Point::new(index, x, y, z));
            }
            _ => chains.push(RawChain {
                structure: structure.to_string(),
                chain_id,
                points: vec![Point::new(index, x, y, z)],
            }),
        }
    }

    Ok(chains)
}

/// Chains listed point by point in a tab-separated file.
pub fn read_tsv<R: BufRead>(reader: R, path: &str) -> Result<Vec<RawChain>> {
    let mut chains: Vec<RawChain> = vec![];

    for (k, line) in reader.lines().enumerate() {
        let line_no = k + 1;
        let line = line
            .map_err(|e| GisaError::parse(path, line_no, format!("unreadable: {}", e)))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 {
            return Err(GisaError::parse(
                path,
                line_no,
                format!("expected 6 fields, found {}", fields.len()),
            ));
        }
        let index = fields[2]
            .trim()
            .parse::<i64>()
            .map_err(|_| GisaError::parse(path, line_no, format!("bad index: '{}'", fields[2])))?;
        let x = parse_f64(fields[3], path, line_no, "x")?;
        let y = parse_f64(fields[4], path, line_no, "y")?;
        let z = parse_f64(fields[5], path, line_no, "z")?;

        match chains.last_mut() {
            Some(c) if c.structure == fields[0] && c.chain_id == fields[1] => {
                c.points.push(Point::new(index, x, y, z));
            }
            _ => chains.push(RawChain {
                structure: fields[0].to_string(),
                chain_id: fields[1].to_string(),
                points: vec![Point::new(index, x, y, z)],
            }),
        }
    }

    Ok(chains)
}

/// Reads every chain of one input file.
pub fn read_chains(path: &str) -> Result<Vec<RawChain>> {
    let format = ChainFormat::from_path(path)
        .ok_or_else(|| GisaError::parse(path, 0, "unknown chain file extension"))?;
    let reader = crate::reader(path)?;
    match format {
        ChainFormat::Pdb => read_pdb(reader, &structure_id(path), path),
        ChainFormat::Tsv => read_tsv(reader, path),
    }
}

/// Expands directories into their chain files, sorted by name.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let mut files = vec![];
    for input in inputs {
        let path = Path::new(input);
        if path.is_dir() {
            let mut entries = vec![];
            for entry in std::fs::read_dir(path).map_err(|e| GisaError::io(e, path))? {
                let entry = entry.map_err(|e| GisaError::io(e, path))?;
                let name = entry.path().to_string_lossy().to_string();
                if ChainFormat::from_path(&name).is_some() {
                    entries.push(name);
                }
            }
            entries.sort();
            files.extend(entries);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}
