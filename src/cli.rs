//! Command-line surface of `mfsmetadirinfo` and `mfsmetasearch`.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Parser};
use env_logger::Env;

use crate::config::{DirInfoConfig, OutputFormat, ScanOptions, SearchConfig};
use crate::errors::MetaResult;

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse::<OutputFormat>().map_err(|err| err.to_string())
}

/// Reports inode, chunk and space usage below directories of a metadata
/// snapshot.
#[derive(Parser, Debug)]
#[command(name = "mfsmetadirinfo", author, version, about, long_about = None)]
pub struct DirInfoArgs {
    /// Output format: j - JSON, c[separator] - CSV (default ',')
    #[arg(short, value_name = "J|C[sep]", value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, value_name = "outputfile")]
    pub output: Option<PathBuf>,

    /// Add an aggregate of all paths reported first under this name
    #[arg(short = 'a', value_name = "sum_name")]
    pub sum_name: Option<String>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(value_name = "metadata.mfs")]
    pub metadata: PathBuf,

    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<String>,
}

impl DirInfoArgs {
    pub fn into_config(self) -> MetaResult<DirInfoConfig> {
        let config = DirInfoConfig {
            metadata: self.metadata,
            paths: self.paths,
            sum_name: self.sum_name,
            output: self.output,
            format: self.format.unwrap_or_default(),
            scan: ScanOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Finds inodes of a metadata snapshot matching an expression or owning
/// listed chunks, and prints their paths.
#[derive(Parser, Debug)]
#[command(name = "mfsmetasearch", author, version, about, long_about = None)]
#[command(group(ArgGroup::new("criterion").required(true).args(["expression", "chunk_file"])))]
pub struct SearchArgs {
    /// Output format: j - JSON, c[separator] - CSV (default ',')
    #[arg(short, value_name = "J|C[sep]", value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout
    #[arg(short, value_name = "outputfile")]
    pub output: Option<PathBuf>,

    /// Filter expression, e.g. "type==file && length>1000000"
    #[arg(short, value_name = "expr")]
    pub expression: Option<String>,

    /// File with hexadecimal chunk ids, one per line
    #[arg(short, value_name = "chunkid_file")]
    pub chunk_file: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(value_name = "metadata.mfs")]
    pub metadata: PathBuf,
}

impl SearchArgs {
    pub fn into_config(self) -> MetaResult<SearchConfig> {
        let criterion = SearchConfig::criterion_from_options(self.expression, self.chunk_file)?;
        let mut config = SearchConfig::new(self.metadata, criterion);
        config.output = self.output;
        config.format = self.format.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}

/// Default log filter for a `-v` count; `RUST_LOG` still wins.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

pub fn init_logging(verbose: u8) {
    env_logger::Builder::from_env(Env::default().default_filter_or(log_filter(verbose)))
        .format_timestamp(None)
        .init();
}
