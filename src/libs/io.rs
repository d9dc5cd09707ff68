use std::io::{BufRead, BufReader, BufWriter, Write};

use crate::libs::error::{GisaError, Result};

/// Opens `input` for buffered reading; `stdin` reads standard input and a
/// `.gz` extension is decompressed on the fly.
///
/// ```
/// use std::io::BufRead;
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("two.txt");
/// std::fs::write(&path, "a\nb\n").unwrap();
///
/// let reader = gisa::reader(path.to_str().unwrap()).unwrap();
/// assert_eq!(reader.lines().count(), 2);
/// ```
pub fn reader(input: &str) -> Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path).map_err(|e| GisaError::io(e, path))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn writer(output: &str) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output).map_err(|e| GisaError::io(e, output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}

/// Reads the non-empty, non-comment lines of a text file.
pub fn read_lines(input: &str) -> Result<Vec<String>> {
    let mut lines = vec![];
    for line in reader(input)?.lines() {
        let line = line.map_err(|e| GisaError::io(e, input))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        lines.push(trimmed.to_string());
    }
    Ok(lines)
}
