//! Offline analysis of MooseFS metadata snapshots.
//!
//! Two queries run over a `metadata.mfs` dump without loading it into
//! memory: [`dirinfo`] aggregates inode, chunk and space usage below given
//! paths, and [`search`] finds inodes matching a filter expression or owning
//! listed chunks and reconstructs their paths. Both stream the snapshot
//! section by section through [`snapshot::SnapshotReader`] and keep their
//! membership sets in [`idset::SparseIdSet`]s owned by a [`context::RunContext`].
//!
//! ```rust
//! use mfsmeta::{RunContext, SnapshotBuilder, SnapshotReader, dirinfo};
//! use std::io::Cursor;
//!
//! let mut builder = SnapshotBuilder::new();
//! let docs = builder.directory(1, "docs");
//! builder.file(docs, "a.txt", 100, 2);
//!
//! let mut reader = SnapshotReader::from_reader(Cursor::new(builder.build())).unwrap();
//! let mut ctx = RunContext::default();
//! let report = dirinfo::dir_info(&mut ctx, &mut reader, &["/docs".to_string()], None).unwrap();
//! assert_eq!(report.entries[0].stats.files, 1);
//! ```
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod chunklist;
pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod dirinfo;
pub mod errors;
pub mod expr;
pub mod idset;
pub mod paths;
pub mod progress;
pub mod report;
pub mod search;
pub mod snapshot;
pub mod snapshot_builder;
pub mod types;

pub use crate::config::{DirInfoConfig, OutputFormat, ScanOptions, SearchConfig, SearchCriterion};
pub use crate::context::RunContext;
pub use crate::dirinfo::{DirInfoEntry, DirInfoReport, DirStats, QueryStatus};
pub use crate::errors::{MetaError, MetaResult};
pub use crate::expr::{Expr, ParseError};
pub use crate::idset::{IdSetRegistry, SetHandle, SparseIdSet};
pub use crate::search::{SearchHit, SearchReport, Selector};
pub use crate::snapshot::SnapshotReader;
pub use crate::snapshot_builder::SnapshotBuilder;
pub use crate::types::{
    ChunkId, ChunkRecord, EdgeRecord, InodeId, InodeType, NodeRecord, SectionKind, StorageClass,
};
