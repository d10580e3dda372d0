use std::collections::HashSet;
use std::io::Cursor;

use mfsmeta::constants::geometry::{BLOCK_SIZE, CHUNK_HEADER_SIZE, CHUNK_SIZE};
use mfsmeta::dirinfo::{self, chunk_disk_size};
use mfsmeta::{
    DirInfoConfig, DirInfoReport, DirStats, InodeType, MetaError, QueryStatus, RunContext,
    SnapshotBuilder, SnapshotReader, StorageClass,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn run(builder: &SnapshotBuilder, paths: &[&str], sum_name: Option<&str>) -> DirInfoReport {
    let mut reader = SnapshotReader::from_reader(Cursor::new(builder.build())).unwrap();
    let mut ctx = RunContext::default();
    let paths: Vec<String> = paths.iter().map(|path| path.to_string()).collect();
    let report = dirinfo::dir_info(&mut ctx, &mut reader, &paths, sum_name).unwrap();
    assert_eq!(ctx.sets.live(), 0, "every query set is released");
    report
}

fn class(id: u16, keep: u8, arch: u8) -> StorageClass {
    StorageClass {
        id,
        create_copies: keep,
        keep_copies: keep,
        arch_copies: arch,
        name: Some(format!("class{id}")),
    }
}

/// Factors as resolved for the classes used below.
fn factors(sclass: u8) -> (u64, u64) {
    match sclass {
        3 => (2, 1),
        other => (u64::from(other), u64::from(other)),
    }
}

#[test]
fn test_random_tree_root_totals_match_independent_sum() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut builder = SnapshotBuilder::new();
    builder.storage_class(class(3, 2, 1));
    builder.random_tree(&mut rng, 25, 300, 3 * CHUNK_SIZE);
    let archived: HashSet<u64> = (1..2_000).filter(|id| id % 5 == 0).collect();
    for &chunk_id in &archived {
        builder.archive(chunk_id);
    }

    let mut expected = DirStats::default();
    let mut chunk_count = 0u64;
    for node in builder.nodes() {
        match node.kind {
            InodeType::Directory => expected.dirs += 1,
            InodeType::File => {
                expected.files += 1;
                expected.length += node.length;
                let (keep, arch) = factors(node.sclass);
                let mut remaining = node.length;
                for chunk_id in &node.chunks {
                    let size = chunk_disk_size(&mut remaining);
                    chunk_count += 1;
                    expected.size += size;
                    expected.keep_size += size * keep;
                    expected.arch_size += size * arch;
                    if archived.contains(chunk_id) {
                        expected.arch_chunks += 1;
                        expected.real_size += size * arch;
                    } else {
                        expected.keep_chunks += 1;
                        expected.real_size += size * keep;
                    }
                }
            }
            _ => {}
        }
    }

    let report = run(&builder, &["/"], None);
    let root = report.entry("/").unwrap();
    assert_eq!(root.status, QueryStatus::Found);
    assert_eq!(root.inodes, builder.nodes().len() as u64);
    assert_eq!(root.chunks, chunk_count);
    assert_eq!(root.stats, expected);
    assert_eq!(expected.dirs, 26);
    assert_eq!(expected.files, 300);
}

#[test]
fn test_queries_aggregate_and_missing_paths() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.directory(1, "a");
    builder.file(a, "x", 100, 1);
    let b = builder.directory(a, "b");
    builder.file(b, "y", BLOCK_SIZE + 1, 2);
    let c = builder.directory(1, "c");
    builder.file(c, "z", 10, 1);

    let report = run(&builder, &["/a", "/nope", "/c/z", "/a/q"], Some("total"));
    let names: Vec<&str> = report.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(names, vec!["total", "/a", "/nope", "/c/z", "/a/q"]);

    let sub = report.entry("/a").unwrap();
    assert_eq!((sub.inodes, sub.stats.files, sub.stats.dirs), (4, 2, 2));
    assert_eq!(sub.chunks, 2);
    assert_eq!(sub.stats.length, 100 + BLOCK_SIZE + 1);
    let small = BLOCK_SIZE + CHUNK_HEADER_SIZE;
    let larger = 2 * BLOCK_SIZE + CHUNK_HEADER_SIZE;
    assert_eq!(sub.stats.size, small + larger);
    assert_eq!(sub.stats.keep_size, small + 2 * larger);

    let file = report.entry("/c/z").unwrap();
    assert_eq!((file.inodes, file.stats.files, file.stats.dirs), (1, 1, 0));

    for missing in ["/nope", "/a/q"] {
        let entry = report.entry(missing).unwrap();
        assert_eq!(entry.status, QueryStatus::NotFound);
        assert!(!entry.is_found());
        assert_eq!((entry.inodes, entry.chunks), (0, 0));
        assert_eq!(entry.stats, DirStats::default());
    }

    let total = report.entry("total").unwrap();
    assert_eq!(total.status, QueryStatus::All);
    assert_eq!(total.inodes, 5);
    assert_eq!(total.chunks, 3);
    assert_eq!(total.stats.files, 3);
}

#[test]
fn test_hard_link_counts_chunks_once_per_query() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.directory(1, "a");
    let c = builder.directory(1, "c");
    let shared = builder.file(a, "shared", 1000, 2);
    builder.link(c, shared, "again");
    builder.link(a, shared, "twice");

    let report = run(&builder, &["/a", "/c"], Some("all"));
    let one = BLOCK_SIZE + CHUNK_HEADER_SIZE;
    for path in ["/a", "/c", "all"] {
        let entry = report.entry(path).unwrap();
        assert_eq!(entry.chunks, 1, "{path}");
        assert_eq!(entry.stats.size, one, "{path}");
    }
    // the file record is visited once and counted once per query
    assert_eq!(report.entry("/a").unwrap().stats.files, 1);
    assert_eq!(report.entry("all").unwrap().inodes, 3);
}

#[test]
fn test_sparse_holes_and_archive_flags() {
    let mut builder = SnapshotBuilder::new();
    let d = builder.directory(1, "d");
    let f = builder.file(d, "holey", CHUNK_SIZE + 10, 1);
    let ids = builder.nodes().iter().find(|n| n.inode == f).unwrap().chunks.clone();
    builder.node_mut(f).unwrap().chunks = vec![0, ids[0], ids[1]];
    builder.archive(ids[1]);

    let report = run(&builder, &["/d"], None);
    let stats = report.entry("/d").unwrap().stats;
    assert_eq!(stats.size, CHUNK_SIZE + CHUNK_HEADER_SIZE + BLOCK_SIZE + CHUNK_HEADER_SIZE);
    assert_eq!((stats.keep_chunks, stats.arch_chunks), (1, 1));
    assert_eq!(report.entry("/d").unwrap().chunks, 2);
}

#[test]
fn test_chunk_section_version_0x10_is_rejected() {
    let mut builder = SnapshotBuilder::new().chunk_version(0x10);
    let d = builder.directory(1, "d");
    builder.file(d, "f", 10, 1);
    builder.archive(1);
    let mut reader = SnapshotReader::from_reader(Cursor::new(builder.build())).unwrap();
    let mut ctx = RunContext::default();
    let err = dirinfo::dir_info(&mut ctx, &mut reader, &["/d".to_string()], None).unwrap_err();
    assert!(matches!(
        err,
        MetaError::UnsupportedVersion { tag: "CHNK", version: 0x10 }
    ));
    assert_eq!(ctx.sets.live(), 0);
}

#[test]
fn test_path_spelling_and_limits() {
    let mut builder = SnapshotBuilder::new();
    let a = builder.directory(1, "a");
    builder.directory(a, "b");

    let long = format!("/a/{}", "x".repeat(256));
    let report = run(&builder, &["//a//b/", "/", &long], None);
    assert_eq!(report.entry("//a//b/").unwrap().inodes, 1);
    assert_eq!(report.entry("/").unwrap().stats.dirs, 3);
    assert_eq!(report.entry(&long).unwrap().status, QueryStatus::NotFound);
}

#[test]
fn test_trash_is_not_under_root() {
    let mut builder = SnapshotBuilder::new();
    builder.file(1, "live", 10, 1);
    builder.trash("old/deleted", 10);
    let report = run(&builder, &["/"], None);
    assert_eq!(report.entry("/").unwrap().stats.files, 1);
    assert_eq!(report.entry("/").unwrap().inodes, 2);
}

#[test]
fn test_run_reads_snapshot_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metadata.mfs");
    let mut builder = SnapshotBuilder::new();
    builder.file(1, "f", 1, 1);
    builder.write_to(&path).unwrap();

    let report = dirinfo::run(&DirInfoConfig::new(&path, vec!["/f".into()])).unwrap();
    assert!(report.entry("/f").unwrap().is_found());
    assert!(dirinfo::run(&DirInfoConfig::new(&path, Vec::new())).is_err());
}

#[test]
fn test_single_file_under_custom_class() {
    let mut builder = SnapshotBuilder::new();
    builder.storage_class(class(12, 2, 3));
    let d = builder.directory(1, "d");
    builder.file(d, "f", 3 * CHUNK_SIZE, 12);

    let report = run(&builder, &["/"], None);
    let stats = report.entry("/").unwrap().stats;
    let size = 3 * (CHUNK_SIZE + CHUNK_HEADER_SIZE);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.size, size);
    assert_eq!(stats.keep_size, size * 2);
    assert_eq!(stats.arch_size, size * 3);
    assert_eq!(stats.real_size, size * 2);
}
