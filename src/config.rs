//! Run configuration for the aggregation and search front-ends.
//!
//! The binaries build these structures from command-line arguments; tests
//! and library callers construct them directly.

use std::path::PathBuf;
use std::str::FromStr;

use crate::constants::{DEFAULT_EDGE_BLOCK_SIZE, DEFAULT_PROGRESS_INTERVAL};
use crate::errors::{MetaError, MetaResult};

/// Report rendering.
///
/// Parsed from the `-f` option value: a leading `j`/`J` selects JSON, a
/// leading `c`/`C` selects CSV with the optional second character used as
/// the field separator.
///
/// ```rust
/// use mfsmeta::config::OutputFormat;
///
/// assert_eq!("j".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
/// assert_eq!(
///     "c;".parse::<OutputFormat>().unwrap(),
///     OutputFormat::Csv { separator: ';' }
/// );
/// assert!("x".parse::<OutputFormat>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
    Csv {
        separator: char,
    },
}

impl FromStr for OutputFormat {
    type Err = MetaError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut chars = value.chars();
        match chars.next() {
            Some('j') | Some('J') => Ok(OutputFormat::Json),
            Some('c') | Some('C') => Ok(OutputFormat::Csv {
                separator: chars.next().unwrap_or(','),
            }),
            _ => Err(MetaError::invalid_input(
                "unrecognized format - use 'j' for JSON and 'c' for CSV",
            )),
        }
    }
}

/// Tuning knobs shared by every pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanOptions {
    /// Byte budget of one block in the reverse edge scan
    ///
    /// **Default:** 1 000 000 bytes
    ///
    /// Bounds the memory held while replaying EDGE backwards; smaller blocks
    /// only cost extra seeks.
    pub edge_block_size: usize,

    /// Number of records between progress log lines
    ///
    /// **Default:** 100 000
    pub progress_interval: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            edge_block_size: DEFAULT_EDGE_BLOCK_SIZE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

/// Directory aggregation run.
#[derive(Clone, Debug, Default)]
pub struct DirInfoConfig {
    pub metadata: PathBuf,
    pub paths: Vec<String>,
    /// Name of the synthetic aggregate over every other query
    pub sum_name: Option<String>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub scan: ScanOptions,
}

impl DirInfoConfig {
    pub fn new(metadata: impl Into<PathBuf>, paths: Vec<String>) -> Self {
        Self {
            metadata: metadata.into(),
            paths,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MetaResult<()> {
        if self.paths.is_empty() {
            return Err(MetaError::invalid_input("at least one PATH is required"));
        }
        Ok(())
    }
}

/// What makes an inode interesting to the search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchCriterion {
    Expression(String),
    ChunkFile(PathBuf),
}

/// Inverse path search run.
#[derive(Clone, Debug)]
pub struct SearchConfig {
    pub metadata: PathBuf,
    pub criterion: SearchCriterion,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub scan: ScanOptions,
}

impl SearchConfig {
    pub fn new(metadata: impl Into<PathBuf>, criterion: SearchCriterion) -> Self {
        Self {
            metadata: metadata.into(),
            criterion,
            output: None,
            format: OutputFormat::default(),
            scan: ScanOptions::default(),
        }
    }

    pub fn validate(&self) -> MetaResult<()> {
        match &self.criterion {
            SearchCriterion::Expression(expr) if expr.trim().is_empty() => {
                Err(MetaError::invalid_input("empty search expression"))
            }
            SearchCriterion::ChunkFile(path) if path.as_os_str().is_empty() => {
                Err(MetaError::invalid_input("empty chunk id file name"))
            }
            _ => Ok(()),
        }
    }

    /// Combines the mutually exclusive `-e` / `-c` options.
    pub fn criterion_from_options(
        expression: Option<String>,
        chunk_file: Option<PathBuf>,
    ) -> MetaResult<SearchCriterion> {
        match (expression, chunk_file) {
            (Some(expr), None) => Ok(SearchCriterion::Expression(expr)),
            (None, Some(path)) => Ok(SearchCriterion::ChunkFile(path)),
            (Some(_), Some(_)) => Err(MetaError::invalid_input(
                "options '-e' and '-c' are mutually exclusive",
            )),
            (None, None) => Err(MetaError::invalid_input(
                "option '-e' or '-c' should be given",
            )),
        }
    }
}
