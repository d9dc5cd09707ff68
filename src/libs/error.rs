use std::path::PathBuf;

/// Errors raised by the invariant and search engines.
///
/// `ChainTooShort`, `MalformedChain` and `Parse` are per-structure: the
/// pipelines log them, skip the structure and keep going. Everything else
/// stops the run.
#[derive(Debug, thiserror::Error)]
pub enum GisaError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("chain {structure}:{chain} too short: {segments} segments, {required} required")]
    ChainTooShort {
        structure: String,
        chain: String,
        segments: usize,
        required: usize,
    },

    #[error("malformed chain {structure}:{chain}: {reason}")]
    MalformedChain {
        structure: String,
        chain: String,
        reason: String,
    },

    #[error("I/O error: {source} ({path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("parse error in {path} line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
}

impl GisaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    pub fn parse(path: &str, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_string(),
            line,
            message: message.into(),
        }
    }

    /// True when the error only disqualifies the structure it came from.
    pub fn is_per_structure(&self) -> bool {
        matches!(
            self,
            Self::ChainTooShort { .. } | Self::MalformedChain { .. } | Self::Parse { .. }
        )
    }
}

impl From<std::io::Error> for GisaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            source: err,
            path: PathBuf::from("<unknown>"),
        }
    }
}

pub type Result<T> = std::result::Result<T, GisaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_structure_classification() {
        let short = GisaError::ChainTooShort {
            structure: "1abc".to_string(),
            chain: "A".to_string(),
            segments: 2,
            required: 4,
        };
        assert!(short.is_per_structure());
        assert!(short.to_string().contains("1abc:A"));

        assert!(!GisaError::config("order must be 1, 2 or 3").is_per_structure());
        assert!(GisaError::parse("x.tsv", 3, "bad number").is_per_structure());
    }
}
