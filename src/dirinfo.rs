//! Directory usage aggregation over a snapshot.
//!
//! Three passes, all forward:
//!
//! 1. EDGE: every query walks its path one component at a time. Once the
//!    target inode is known, the rest of the pass closes over descendants
//!    by adding any child whose parent is already a member. This relies on
//!    a directory's own edge preceding the edges of everything below it,
//!    which is how the master writes EDGE; a dump ordered differently would
//!    undercount and is not detected.
//! 2. CHNK: chunk ids carrying the archive flag.
//! 3. NODE: counts and sizes for member inodes, every chunk credited at
//!    most once per query.

use std::io::{Read, Seek};

use serde::Serialize;

use crate::constants::geometry::{
    BLOCK_NEG_MASK, BLOCK_SIZE, CHUNK_HEADER_SIZE, CHUNK_MASK, CHUNK_SIZE,
};
use crate::config::DirInfoConfig;
use crate::constants::{NAME_MAX, ROOT_INODE};
use crate::context::RunContext;
use crate::errors::MetaResult;
use crate::idset::SetHandle;
use crate::progress::{ScanProgress, ScanStage};
use crate::snapshot::{SnapshotReader, StorageClassTable};
use crate::types::{EdgeRecord, InodeId, InodeType, NodeRecord, SectionKind};

/// Sections a directory usage run reads
pub const REQUIRED_SECTIONS: [SectionKind; 4] = [
    SectionKind::Edge,
    SectionKind::Node,
    SectionKind::StorageClass,
    SectionKind::Chunk,
];

/// On-disk size of the next chunk of a file with `remaining` bytes not yet
/// attributed to earlier chunks; consumes up to one chunk of `remaining`.
pub fn chunk_disk_size(remaining: &mut u64) -> u64 {
    if *remaining > CHUNK_SIZE {
        *remaining -= CHUNK_SIZE;
        CHUNK_SIZE + CHUNK_HEADER_SIZE
    } else if *remaining > 0 {
        let data = (((*remaining - 1) & CHUNK_MASK) + BLOCK_SIZE) & BLOCK_NEG_MASK;
        *remaining = 0;
        data + CHUNK_HEADER_SIZE
    } else {
        CHUNK_HEADER_SIZE
    }
}

/// Accumulated usage of one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirStats {
    pub files: u64,
    pub dirs: u64,
    pub keep_chunks: u64,
    pub arch_chunks: u64,
    pub length: u64,
    pub size: u64,
    pub keep_size: u64,
    pub arch_size: u64,
    pub real_size: u64,
}

impl DirStats {
    fn credit_chunk(&mut self, size: u64, keep: u64, arch: u64, archived: bool) {
        self.size += size;
        self.keep_size += size * keep;
        self.arch_size += size * arch;
        if archived {
            self.arch_chunks += 1;
            self.real_size += size * arch;
        } else {
            self.keep_chunks += 1;
            self.real_size += size * keep;
        }
    }
}

/// Outcome of path resolution for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Path components are still being matched against EDGE records
    Pending,
    Found,
    NotFound,
    /// Synthetic aggregate over every other query
    All,
}

/// One reported query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirInfoEntry {
    pub path: String,
    pub status: QueryStatus,
    pub inodes: u64,
    pub chunks: u64,
    pub stats: DirStats,
}

impl DirInfoEntry {
    pub fn is_found(&self) -> bool {
        matches!(self.status, QueryStatus::Found | QueryStatus::All)
    }
}

/// Result of a run, in query order ("all" first when requested).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirInfoReport {
    pub entries: Vec<DirInfoEntry>,
}

impl DirInfoReport {
    pub fn entry(&self, path: &str) -> Option<&DirInfoEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }
}

#[derive(Debug)]
struct Query {
    path: String,
    status: QueryStatus,
    /// Byte offset of the component being matched
    cursor: usize,
    component_len: usize,
    inode: InodeId,
    parent_found: bool,
    next_component: bool,
    inodes: SetHandle,
    chunks: SetHandle,
    stats: DirStats,
    wants_chunks: bool,
}

impl Query {
    fn new(ctx: &mut RunContext, path: String, status: QueryStatus) -> Self {
        Self {
            path,
            status,
            cursor: 0,
            component_len: 0,
            inode: ROOT_INODE,
            parent_found: false,
            next_component: true,
            inodes: ctx.new_set(),
            chunks: ctx.new_set(),
            stats: DirStats::default(),
            wants_chunks: false,
        }
    }

    fn resolving(&self) -> bool {
        self.status == QueryStatus::Pending
    }

    fn counts(&self) -> bool {
        matches!(self.status, QueryStatus::Found | QueryStatus::All)
    }

    fn component(&self) -> &[u8] {
        &self.path.as_bytes()[self.cursor..self.cursor + self.component_len]
    }

    /// Moves to the next path component; `true` once the path is exhausted.
    fn advance(&mut self) -> bool {
        let bytes = self.path.as_bytes();
        while self.cursor < bytes.len() && bytes[self.cursor] == b'/' {
            self.cursor += 1;
        }
        self.component_len = bytes[self.cursor..]
            .iter()
            .take_while(|&&b| b != b'/')
            .count();
        self.next_component = false;
        if self.component_len > usize::from(NAME_MAX) {
            self.status = QueryStatus::NotFound;
            return false;
        }
        self.component_len == 0
    }
}

/// Runs the aggregation for `paths`, optionally preceded by a synthetic
/// aggregate named `sum_name` covering all of them.
pub fn dir_info<R: Read + Seek>(
    ctx: &mut RunContext,
    reader: &mut SnapshotReader<R>,
    paths: &[String],
    sum_name: Option<&str>,
) -> MetaResult<DirInfoReport> {
    reader.require(&REQUIRED_SECTIONS)?;

    let mut queries = Vec::with_capacity(paths.len() + 1);
    if let Some(name) = sum_name {
        queries.push(Query::new(ctx, name.to_string(), QueryStatus::All));
    }
    for path in paths {
        queries.push(Query::new(ctx, path.clone(), QueryStatus::Pending));
    }
    let all = queries
        .first()
        .filter(|query| query.status == QueryStatus::All)
        .map(|query| query.inodes);

    let classes = reader.storage_classes()?;
    log::debug!("{} storage classes defined", classes.classes().len());
    scan_edges(ctx, reader, &mut queries, all)?;
    for query in queries.iter().filter(|q| q.status == QueryStatus::NotFound) {
        log::warn!("path '{}': no such file or directory", query.path);
    }
    let archived = ctx.new_set();
    scan_chunks(ctx, reader, archived)?;
    scan_nodes(ctx, reader, &mut queries, &classes, archived)?;
    ctx.sets.destroy(archived)?;

    let mut entries = Vec::with_capacity(queries.len());
    for query in queries {
        let found = query.counts();
        entries.push(DirInfoEntry {
            inodes: if found { ctx.sets.cardinality(query.inodes)? } else { 0 },
            chunks: if found { ctx.sets.cardinality(query.chunks)? } else { 0 },
            stats: if found { query.stats } else { DirStats::default() },
            path: query.path,
            status: query.status,
        });
        ctx.sets.destroy(query.inodes)?;
        ctx.sets.destroy(query.chunks)?;
    }
    Ok(DirInfoReport { entries })
}

/// Opens the configured snapshot and aggregates the configured paths.
pub fn run(config: &DirInfoConfig) -> MetaResult<DirInfoReport> {
    config.validate()?;
    let mut ctx = RunContext::new(config.scan.clone());
    let mut reader = SnapshotReader::open(&config.metadata)?;
    dir_info(&mut ctx, &mut reader, &config.paths, config.sum_name.as_deref())
}

fn scan_edges<R: Read + Seek>(
    ctx: &mut RunContext,
    reader: &mut SnapshotReader<R>,
    queries: &mut [Query],
    all: Option<SetHandle>,
) -> MetaResult<()> {
    let mut cursor = reader.edges()?;
    let total = cursor.section().length;
    let mut progress = ScanProgress::new(ScanStage::Edges, ctx.options.progress_interval);
    loop {
        for query in queries.iter_mut() {
            if query.resolving() && query.next_component && query.advance() {
                log::debug!("path '{}' resolved to inode {}", query.path, query.inode);
                ctx.sets.add(query.inodes, u64::from(query.inode))?;
                if let Some(all) = all {
                    ctx.sets.add(all, u64::from(query.inode))?;
                }
                query.status = QueryStatus::Found;
            }
        }
        let Some(edge) = cursor.next_edge()? else {
            break;
        };
        progress.tick(cursor.consumed(), total);
        if !edge.is_detached() {
            match_edge(ctx, queries, all, &edge)?;
        }
    }
    progress.finish();

    for query in queries.iter_mut() {
        if query.resolving() {
            query.status = QueryStatus::NotFound;
        }
    }
    Ok(())
}

fn match_edge(
    ctx: &mut RunContext,
    queries: &mut [Query],
    all: Option<SetHandle>,
    edge: &EdgeRecord,
) -> MetaResult<()> {
    for query in queries.iter_mut() {
        if query.resolving() {
            if edge.parent == query.inode {
                if edge.name == query.component() {
                    query.inode = edge.child;
                    query.next_component = true;
                    query.parent_found = false;
                    query.cursor += query.component_len;
                } else {
                    query.parent_found = true;
                }
            } else if query.parent_found {
                query.status = QueryStatus::NotFound;
            }
        } else if query.status == QueryStatus::Found
            && ctx.sets.check(query.inodes, u64::from(edge.parent))?
        {
            ctx.sets.add(query.inodes, u64::from(edge.child))?;
            if let Some(all) = all {
                ctx.sets.add(all, u64::from(edge.child))?;
            }
        }
    }
    Ok(())
}

fn scan_chunks<R: Read + Seek>(
    ctx: &mut RunContext,
    reader: &mut SnapshotReader<R>,
    archived: SetHandle,
) -> MetaResult<()> {
    let mut cursor = reader.chunks()?;
    let total = cursor.section().length;
    let mut progress = ScanProgress::new(ScanStage::Chunks, ctx.options.progress_interval);
    while let Some(chunk) = cursor.next_chunk()? {
        progress.tick(cursor.consumed(), total);
        if chunk.is_archived() {
            ctx.sets.add(archived, chunk.chunk_id)?;
        }
    }
    progress.finish();
    Ok(())
}

fn scan_nodes<R: Read + Seek>(
    ctx: &mut RunContext,
    reader: &mut SnapshotReader<R>,
    queries: &mut [Query],
    classes: &StorageClassTable,
    archived: SetHandle,
) -> MetaResult<()> {
    let mut cursor = reader.nodes()?;
    let total = cursor.section().length;
    let mut progress = ScanProgress::new(ScanStage::Nodes, ctx.options.progress_interval);
    while let Some(node) = cursor.next_node()? {
        progress.tick(cursor.consumed(), total);
        if node.kind.has_chunks() {
            account_file(ctx, queries, classes, archived, &node)?;
        } else if node.kind == InodeType::Directory {
            for query in queries.iter_mut().filter(|q| q.counts()) {
                if ctx.sets.check(query.inodes, u64::from(node.inode))? {
                    query.stats.dirs += 1;
                }
            }
        }
    }
    progress.finish();
    Ok(())
}

fn account_file(
    ctx: &mut RunContext,
    queries: &mut [Query],
    classes: &StorageClassTable,
    archived: SetHandle,
    node: &NodeRecord,
) -> MetaResult<()> {
    let mut wanted = false;
    for query in queries.iter_mut() {
        query.wants_chunks =
            query.counts() && ctx.sets.check(query.inodes, u64::from(node.inode))?;
        if query.wants_chunks {
            query.stats.length += node.length;
            query.stats.files += 1;
            wanted = true;
        }
    }
    if !wanted {
        return Ok(());
    }
    let keep = classes.keep_factor(node.sclass);
    let arch = classes.arch_factor(node.sclass);
    let mut remaining = node.length;
    for &chunk_id in node.chunks.iter().filter(|&&id| id != 0) {
        let size = chunk_disk_size(&mut remaining);
        let is_archived = ctx.sets.check(archived, chunk_id)?;
        for query in queries.iter_mut().filter(|q| q.wants_chunks) {
            if !ctx.sets.add(query.chunks, chunk_id)? {
                query.stats.credit_chunk(size, keep, arch, is_archived);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_disk_size_progression() {
        let mut remaining = 2 * CHUNK_SIZE + 1;
        assert_eq!(chunk_disk_size(&mut remaining), CHUNK_SIZE + CHUNK_HEADER_SIZE);
        assert_eq!(chunk_disk_size(&mut remaining), CHUNK_SIZE + CHUNK_HEADER_SIZE);
        assert_eq!(remaining, 1);
        assert_eq!(chunk_disk_size(&mut remaining), BLOCK_SIZE + CHUNK_HEADER_SIZE);
        assert_eq!(remaining, 0);
        assert_eq!(chunk_disk_size(&mut remaining), CHUNK_HEADER_SIZE);
    }

    #[test]
    fn test_chunk_disk_size_rounds_to_blocks() {
        let mut remaining = BLOCK_SIZE;
        assert_eq!(chunk_disk_size(&mut remaining), BLOCK_SIZE + CHUNK_HEADER_SIZE);
        let mut remaining = BLOCK_SIZE + 1;
        assert_eq!(chunk_disk_size(&mut remaining), 2 * BLOCK_SIZE + CHUNK_HEADER_SIZE);
        let mut remaining = CHUNK_SIZE;
        assert_eq!(chunk_disk_size(&mut remaining), CHUNK_SIZE + CHUNK_HEADER_SIZE);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_query_is_pending_until_resolved() {
        let mut ctx = RunContext::default();
        let mut query = Query::new(&mut ctx, "/a".to_string(), QueryStatus::Pending);
        assert!(query.resolving());
        assert!(!query.counts());
        assert!(!query.advance());
        assert_eq!(query.component(), b"a");
        assert_eq!(query.status, QueryStatus::Pending);

        let all = Query::new(&mut ctx, "total".to_string(), QueryStatus::All);
        assert!(!all.resolving());
        assert!(all.counts());

        let pending = DirInfoEntry {
            path: "/a".to_string(),
            status: QueryStatus::Pending,
            inodes: 0,
            chunks: 0,
            stats: DirStats::default(),
        };
        assert!(!pending.is_found());
    }

    #[test]
    fn test_archived_chunks_use_arch_factor() {
        let mut stats = DirStats::default();
        stats.credit_chunk(100, 2, 1, false);
        stats.credit_chunk(100, 2, 1, true);
        assert_eq!(stats.size, 200);
        assert_eq!(stats.keep_size, 400);
        assert_eq!(stats.arch_size, 200);
        assert_eq!(stats.real_size, 300);
        assert_eq!((stats.keep_chunks, stats.arch_chunks), (1, 1));
    }
}
