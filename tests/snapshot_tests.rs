use std::io::Cursor;

use mfsmeta::snapshot::{decode_node, read_storage_classes};
use mfsmeta::snapshot_builder::{encode_node, encode_storage_classes};
use mfsmeta::{
    InodeType, MetaError, NodeRecord, RunContext, SectionKind, SnapshotBuilder, SnapshotReader,
    StorageClass, dirinfo, search,
};

fn open(builder: &SnapshotBuilder) -> Result<SnapshotReader<Cursor<Vec<u8>>>, MetaError> {
    SnapshotReader::from_reader(Cursor::new(builder.build()))
}

fn sample_tree() -> SnapshotBuilder {
    let mut builder = SnapshotBuilder::new();
    let home = builder.directory(1, "home");
    builder.file(home, "notes.txt", 5000, 2);
    builder.entry(home, "link", InodeType::Symlink);
    builder.entry(home, "tty", InodeType::CharDev);
    builder
}

#[test]
fn test_header_and_sections_are_indexed() {
    let reader = open(&sample_tree()).unwrap();
    assert_eq!(reader.header().file_version, 0x20);
    assert_eq!(reader.header().version, 1);
    reader
        .require(&[
            SectionKind::Node,
            SectionKind::Edge,
            SectionKind::Chunk,
            SectionKind::StorageClass,
        ])
        .unwrap();
}

#[test]
fn test_empty_and_old_files_are_rejected() {
    let mut bytes = b"MFSM NEW".to_vec();
    bytes.extend_from_slice(&[0u8; 16]);
    let err = SnapshotReader::from_reader(Cursor::new(bytes)).err().unwrap();
    assert!(matches!(err, MetaError::Format(ref msg) if msg == "empty file"));

    let err = open(&SnapshotBuilder::new().file_version(0x16)).err().unwrap();
    assert!(matches!(err, MetaError::Format(ref msg) if msg.contains("too old")));

    let err = SnapshotReader::from_reader(Cursor::new(b"NOTMFS\0\0".to_vec()))
        .err()
        .unwrap();
    assert!(matches!(err, MetaError::Format(_)));
}

#[test]
fn test_node_versions_decode_identically() {
    for version in [0x13, 0x14] {
        let mut builder = sample_tree().node_version(version);
        if let Some(record) = builder.node_mut(2) {
            record.tretention = 24;
            record.uid = 1000;
        }
        let expected = builder.nodes().to_vec();
        let mut reader = open(&builder).unwrap();
        let decoded: Vec<NodeRecord> = reader
            .nodes()
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(decoded, expected, "NODE 0x{version:02X}");
    }
}

#[test]
fn test_unsupported_node_version_fails_before_reading_bodies() {
    for version in [0x12, 0x15] {
        let builder = sample_tree().node_version(version);
        let mut reader = open(&builder).unwrap();
        let mut ctx = RunContext::default();
        let err = dirinfo::dir_info(&mut ctx, &mut reader, &["/".to_string()], None).unwrap_err();
        assert!(matches!(
            err,
            MetaError::UnsupportedVersion { tag: "NODE", version: v } if v == version
        ));
    }
}

#[test]
fn test_missing_section_only_matters_when_required() {
    let builder = sample_tree().without(SectionKind::Chunk);
    let mut reader = open(&builder).unwrap();
    let mut ctx = RunContext::default();
    let err = dirinfo::dir_info(&mut ctx, &mut reader, &["/".to_string()], None).unwrap_err();
    assert!(matches!(err, MetaError::MissingSection { tag: "CHNK" }));

    let expr = mfsmeta::Expr::parse("type==file").unwrap();
    let report = search::search(&mut ctx, &mut reader, &search::Selector::Expression(&expr)).unwrap();
    assert_eq!(report.hits.len(), 1);
    assert_eq!(report.hits[0].paths, vec!["/home/notes.txt"]);
}

#[test]
fn test_unknown_sections_are_skipped_and_duplicates_rejected() {
    let builder = sample_tree().raw_section(b"XATR", 0x10, vec![1, 2, 3]);
    let reader = open(&builder).unwrap();
    assert_eq!(reader.sections().skipped(), ["XATR".to_string()]);

    let builder = sample_tree().raw_section(b"EDGE", 0x11, vec![0u8; 8]);
    let err = open(&builder).err().unwrap();
    assert!(matches!(err, MetaError::MalformedSection { tag: "EDGE", .. }));
}

#[test]
fn test_labs_is_an_alias_for_storage_classes() {
    let classes = [StorageClass {
        id: 12,
        create_copies: 2,
        keep_copies: 3,
        arch_copies: 1,
        name: None,
    }];
    let builder = sample_tree()
        .without(SectionKind::StorageClass)
        .raw_section(b"LABS", 0x15, encode_storage_classes(&classes, 0x15));
    let mut reader = open(&builder).unwrap();
    let table = reader.storage_classes().unwrap();
    assert_eq!(table.keep_factor(12), 3);
    assert_eq!(table.arch_factor(12), 1);
    assert_eq!(table.keep_factor(4), 4);
    assert_eq!(table.keep_factor(10), 0);
}

#[test]
fn test_storage_class_version_above_range_is_rejected() {
    let builder = sample_tree().sclass_version(0x17);
    let mut reader = open(&builder).unwrap();
    assert!(matches!(
        reader.storage_classes(),
        Err(MetaError::UnsupportedVersion { tag: "SCLA", version: 0x17 })
    ));

    let section = *reader.sections().get(SectionKind::StorageClass).unwrap();
    let mut source = reader.into_inner();
    assert!(read_storage_classes(&mut source, &section).is_err());
}

#[test]
fn test_truncated_input_is_reported() {
    let bytes = sample_tree().build();
    let cut = bytes[..bytes.len() - 40].to_vec();
    let err = SnapshotReader::from_reader(Cursor::new(cut)).err().unwrap();
    assert!(matches!(err, MetaError::Truncated { .. }));

    let mut record = NodeRecord::new(9, InodeType::File);
    record.length = 10;
    record.chunks = vec![7];
    let encoded = encode_node(&record, 0x14);
    let mut short = &encoded[..encoded.len() - 3];
    let err = decode_node(&mut short, 0x14).unwrap_err();
    assert!(matches!(err, MetaError::Truncated { .. }));
}

#[test]
fn test_overlong_edge_name_is_fatal() {
    let mut builder = sample_tree();
    let long = "n".repeat(256);
    builder.link(1, 2, &long);
    let mut reader = open(&builder).unwrap();
    let mut cursor = reader.edges().unwrap();
    let err = loop {
        match cursor.next_edge() {
            Ok(Some(_)) => continue,
            Ok(None) => panic!("overlong name accepted"),
            Err(err) => break err,
        }
    };
    assert!(matches!(
        err,
        MetaError::NameTooLong { parent: 1, length: 256, limit: 255 }
    ));
}
