//! Inverse search: which inodes match, and where do they live.
//!
//! A forward NODE pass selects inodes by filter expression or chunk id
//! list, then the reverse EDGE replay from [`crate::paths`] reconstructs
//! their paths. Only selected inodes and their ancestors are ever held.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::chunklist::load_chunk_ids;
use crate::config::{SearchConfig, SearchCriterion};
use crate::context::RunContext;
use crate::errors::MetaResult;
use crate::expr::Expr;
use crate::idset::SetHandle;
use crate::paths::{ParentTable, for_each_edge_reverse, mark_edge_blocks};
use crate::progress::{ScanProgress, ScanStage};
use crate::snapshot::SnapshotReader;
use crate::types::{InodeId, InodeType, NodeRecord, SectionKind};

/// Sections an inverse search reads
pub const REQUIRED_SECTIONS: [SectionKind; 2] = [SectionKind::Edge, SectionKind::Node];

/// Inode selection rule.
#[derive(Debug)]
pub enum Selector<'a> {
    Expression(&'a Expr),
    /// Files owning any chunk in the referenced set
    Chunks(SetHandle),
}

impl Selector<'_> {
    fn selects(&self, ctx: &RunContext, node: &NodeRecord) -> MetaResult<bool> {
        match self {
            Selector::Expression(expr) => Ok(expr.matches(node)),
            Selector::Chunks(handle) => {
                if !node.kind.has_chunks() {
                    return Ok(false);
                }
                let set = ctx.sets.get(*handle)?;
                Ok(node
                    .chunks
                    .iter()
                    .any(|&chunk_id| chunk_id != 0 && set.check(chunk_id)))
            }
        }
    }
}

/// One displayed inode with all of its paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub inode: InodeId,
    #[serde(rename = "type", serialize_with = "serialize_kind")]
    pub kind: InodeType,
    pub paths: Vec<String>,
}

fn serialize_kind<S: serde::Serializer>(kind: &InodeType, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(kind.report_name())
}

/// Hits in ascending inode order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub hits: Vec<SearchHit>,
}

impl SearchReport {
    pub fn hit(&self, inode: InodeId) -> Option<&SearchHit> {
        self.hits.iter().find(|hit| hit.inode == inode)
    }
}

pub fn search<R: Read + Seek>(
    ctx: &mut RunContext,
    reader: &mut SnapshotReader<R>,
    selector: &Selector<'_>,
) -> MetaResult<SearchReport> {
    reader.require(&REQUIRED_SECTIONS)?;
    let mut table = ParentTable::new();

    let mut cursor = reader.nodes()?;
    let total = cursor.section().length;
    let mut progress = ScanProgress::new(ScanStage::Nodes, ctx.options.progress_interval);
    while let Some(node) = cursor.next_node()? {
        progress.tick(cursor.consumed(), total);
        if selector.selects(ctx, &node)? {
            table.show(node.inode, node.kind);
        }
    }
    progress.finish();
    log::info!("{} inodes selected", table.len());

    let blocks = mark_edge_blocks(reader, &ctx.options)?;
    for_each_edge_reverse(reader, &blocks, &ctx.options, |edge| {
        table.process_edge(edge);
        Ok(())
    })?;

    let mut hits = Vec::new();
    for inode in table.shown_inodes() {
        let paths = table.paths(inode);
        let Some(kind) = table.kind(inode) else {
            continue;
        };
        if paths.is_empty() {
            log::warn!("inode {inode}: no directory entry found - skipping");
            continue;
        }
        hits.push(SearchHit { inode, kind, paths });
    }
    Ok(SearchReport { hits })
}

/// Parses or loads the configured criterion, then searches the snapshot.
///
/// The criterion is checked before the snapshot is opened, so a bad
/// expression or chunk list fails without touching the metadata file.
pub fn run(config: &SearchConfig) -> MetaResult<SearchReport> {
    config.validate()?;
    let mut ctx = RunContext::new(config.scan.clone());
    match &config.criterion {
        SearchCriterion::Expression(source) => {
            let expr = Expr::parse(source)?;
            log::info!("parsed expr: {expr}");
            let mut reader = SnapshotReader::open(&config.metadata)?;
            search(&mut ctx, &mut reader, &Selector::Expression(&expr))
        }
        SearchCriterion::ChunkFile(path) => {
            let ids = load_chunk_ids(path)?;
            log::info!("{} chunk ids have been loaded", ids.cardinality());
            let handle = ctx.new_set();
            *ctx.sets.get_mut(handle)? = ids;
            let mut reader = SnapshotReader::open(&config.metadata)?;
            search(&mut ctx, &mut reader, &Selector::Chunks(handle))
        }
    }
}
