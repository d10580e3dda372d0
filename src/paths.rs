//! Path reconstruction for a bounded set of inodes.
//!
//! EDGE is replayed in exact reverse file order without holding the section
//! in memory: a first forward pass only records where each block of roughly
//! `edge_block_size` bytes starts and how many records it holds, then the
//! blocks are re-read last to first and each block's records are visited
//! back to front. Memory is one block plus one marker per block.
//!
//! Reverse order matters because the newest edge of a child wins: the first
//! edge seen for an inode fixes its parent and name, and an older edge for
//! the same inode is either another hard link (kept for displayed inodes)
//! or a stale duplicate (dropped with a warning).

use std::io::{Read, Seek};

use ahash::AHashMap;

use crate::config::ScanOptions;
use crate::constants::ROOT_INODE;
use crate::errors::MetaResult;
use crate::progress::{ScanProgress, ScanStage};
use crate::snapshot::{SnapshotReader, encoded_size};
use crate::types::{EdgeRecord, InodeId, InodeType};

/// Location of a run of consecutive edge records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeBlock {
    /// File offset of the first record
    pub offset: u64,
    pub count: u32,
}

/// Forward pass recording block boundaries. A block is closed as soon as
/// its records exceed `options.edge_block_size` bytes.
pub fn mark_edge_blocks<R: Read + Seek>(
    reader: &mut SnapshotReader<R>,
    options: &ScanOptions,
) -> MetaResult<Vec<EdgeBlock>> {
    let mut cursor = reader.edges()?;
    let total = cursor.section().length;
    let mut progress = ScanProgress::new(ScanStage::EdgeMarkers, options.progress_interval);
    let mut blocks = Vec::new();
    let mut current: Option<EdgeBlock> = None;
    let mut bytes = 0usize;
    loop {
        let offset = cursor.position();
        let Some(edge) = cursor.next_edge()? else {
            break;
        };
        progress.tick(cursor.consumed(), total);
        let block = current.get_or_insert(EdgeBlock { offset, count: 0 });
        block.count += 1;
        bytes += encoded_size(&edge);
        if bytes > options.edge_block_size {
            blocks.extend(current.take());
            bytes = 0;
        }
    }
    blocks.extend(current.take());
    progress.finish();
    log::debug!("edge section split into {} blocks", blocks.len());
    Ok(blocks)
}

/// Visits every edge of `blocks` in reverse file order.
pub fn for_each_edge_reverse<R, F>(
    reader: &mut SnapshotReader<R>,
    blocks: &[EdgeBlock],
    options: &ScanOptions,
    mut visit: F,
) -> MetaResult<()>
where
    R: Read + Seek,
    F: FnMut(EdgeRecord) -> MetaResult<()>,
{
    let total: u64 = blocks.iter().map(|block| u64::from(block.count)).sum();
    let mut done = 0u64;
    let mut progress = ScanProgress::new(ScanStage::EdgesReverse, options.progress_interval);
    for block in blocks.iter().rev() {
        let records = reader.read_edge_block(block.offset, block.count)?;
        done += u64::from(block.count);
        progress.tick(done, total);
        for edge in records.into_iter().rev() {
            visit(edge)?;
        }
    }
    progress.finish();
    Ok(())
}

/// One directory entry pointing at an inode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub parent: InodeId,
    pub name: Vec<u8>,
}

#[derive(Debug, Clone)]
struct PathNode {
    kind: InodeType,
    shown: bool,
    primary: Option<Link>,
    /// Further hard links in processing order
    extra: Vec<Link>,
}

impl PathNode {
    fn new(kind: InodeType) -> Self {
        Self {
            kind,
            shown: false,
            primary: None,
            extra: Vec::new(),
        }
    }
}

/// Parent pointers for displayed inodes and their ancestors.
#[derive(Debug, Default)]
pub struct ParentTable {
    nodes: AHashMap<InodeId, PathNode>,
    duplicates: u64,
}

impl ParentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `inode` for display.
    pub fn show(&mut self, inode: InodeId, kind: InodeType) {
        self.nodes
            .entry(inode)
            .or_insert_with(|| PathNode::new(kind))
            .shown = true;
    }

    pub fn contains(&self, inode: InodeId) -> bool {
        self.nodes.contains_key(&inode)
    }

    pub fn is_shown(&self, inode: InodeId) -> bool {
        self.nodes.get(&inode).is_some_and(|node| node.shown)
    }

    pub fn kind(&self, inode: InodeId) -> Option<InodeType> {
        self.nodes.get(&inode).map(|node| node.kind)
    }

    /// Number of tracked inodes, ancestors included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stale edges dropped so far
    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Applies one edge; must be fed in reverse file order.
    pub fn process_edge(&mut self, edge: EdgeRecord) {
        if !self.nodes.contains_key(&edge.child) {
            return;
        }
        if edge.parent != ROOT_INODE && edge.parent != 0 {
            self.nodes
                .entry(edge.parent)
                .or_insert_with(|| PathNode::new(InodeType::Directory));
        }
        let Some(node) = self.nodes.get_mut(&edge.child) else {
            return;
        };
        let link = Link {
            parent: edge.parent,
            name: edge.name,
        };
        if node.primary.is_none() {
            node.primary = Some(link);
        } else if node.shown {
            node.extra.push(link);
        } else {
            log::warn!(
                "duplicated edge detected ({}->{} ; name:{}) - ignoring",
                link.parent,
                edge.child,
                String::from_utf8_lossy(&link.name)
            );
            self.duplicates += 1;
        }
    }

    /// Displayed inodes in ascending order
    pub fn shown_inodes(&self) -> Vec<InodeId> {
        let mut inodes: Vec<InodeId> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.shown)
            .map(|(&inode, _)| inode)
            .collect();
        inodes.sort_unstable();
        inodes
    }

    /// Every path of `inode`: the primary link first, then further hard
    /// links, the one processed last coming first. Empty when the inode
    /// never got a link.
    pub fn paths(&self, inode: InodeId) -> Vec<String> {
        let Some(node) = self.nodes.get(&inode) else {
            return Vec::new();
        };
        if inode == ROOT_INODE {
            return vec!["/".to_string()];
        }
        node.primary
            .iter()
            .chain(node.extra.iter().rev())
            .map(|link| self.render(node.kind, link))
            .collect()
    }

    fn render(&self, kind: InodeType, link: &Link) -> String {
        match kind {
            InodeType::Trash => {
                return format!("[TRASH] {}", String::from_utf8_lossy(&link.name));
            }
            InodeType::Sustained => {
                return format!("[SUSTAINED] {}", String::from_utf8_lossy(&link.name));
            }
            _ => {}
        }
        let mut names: Vec<&[u8]> = vec![link.name.as_slice()];
        let mut parent = link.parent;
        let mut steps = 0usize;
        while parent != ROOT_INODE && parent != 0 {
            let Some(Link { parent: next, name }) =
                self.nodes.get(&parent).and_then(|node| node.primary.as_ref())
            else {
                break;
            };
            steps += 1;
            if steps > self.nodes.len() {
                log::warn!(
                    "parent chain of '{}' does not end at the root",
                    String::from_utf8_lossy(&link.name)
                );
                break;
            }
            names.push(name.as_slice());
            parent = *next;
        }
        let mut path = String::new();
        for name in names.iter().rev() {
            path.push('/');
            path.push_str(&String::from_utf8_lossy(name));
        }
        if kind == InodeType::Directory {
            path.push('/');
        }
        path
    }
}
