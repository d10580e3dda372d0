use mfsmeta::expr::{Expr, ParseErrorKind};
use mfsmeta::{InodeType, NodeRecord};

fn file(inode: u32, length: u64, chunks: &[u64]) -> NodeRecord {
    let mut record = NodeRecord::new(inode, InodeType::File);
    record.length = length;
    record.chunks = chunks.to_vec();
    record.mode = 0o644;
    record
}

#[test]
fn test_type_and_size_filter() {
    let expr = Expr::parse("type==file && length>=1000").unwrap();
    assert!(expr.matches(&file(3, 1000, &[1])));
    assert!(!expr.matches(&file(3, 999, &[1])));
    assert!(!expr.matches(&NodeRecord::new(2, InodeType::Directory)));
}

#[test]
fn test_trash_is_its_own_type() {
    let mut record = file(4, 10, &[1]);
    record.kind = InodeType::Trash;
    assert!(Expr::parse("type==trash").unwrap().matches(&record));
    assert!(!Expr::parse("type==file").unwrap().matches(&record));
}

#[test]
fn test_chunkid_is_tried_per_chunk() {
    let expr = Expr::parse("chunkid==0x20").unwrap();
    assert!(expr.uses_chunk_id());
    assert!(expr.matches(&file(5, 1, &[0x10, 0x20, 0x30])));
    assert!(!expr.matches(&file(5, 1, &[0x10])));
}

#[test]
fn test_zero_chunk_ids_are_never_tested() {
    let expr = Expr::parse("chunkid==0").unwrap();
    assert!(!expr.matches(&file(6, 1, &[0, 0])));
    assert!(!expr.matches(&file(6, 0, &[])));
    // records without chunks evaluate once with chunkid bound to 0
    assert!(expr.matches(&NodeRecord::new(2, InodeType::Directory)));
}

#[test]
fn test_mode_bits_and_abbreviations() {
    let mut record = file(7, 0, &[]);
    record.mode = 0o4750;
    record.eattr = 0x10;
    assert!(Expr::parse("mode&suid && umode==7").unwrap().matches(&record));
    assert!(Expr::parse("(mo&ur)!=0 && (mo&ox)==0").unwrap().matches(&record));
    assert!(Expr::parse("ea&snapshot").unwrap().matches(&record));
    assert!(!Expr::parse("ea&immutable").unwrap().matches(&record));
    assert!(Expr::parse("gmode==(read|execute)").unwrap().matches(&record));
}

#[test]
fn test_entry_cache_flag_has_no_name() {
    let mut record = file(7, 0, &[]);
    record.eattr = 0x06;
    assert!(Expr::parse("eattr&noacache").unwrap().matches(&record));
    assert!(Expr::parse("eattr&4").unwrap().matches(&record));
    for spelling in ["eattr&noecache", "eattr&noe"] {
        let err = Expr::parse(spelling).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnknownIdentifier);
    }
}

#[test]
fn test_canonical_rendering() {
    let expr: Expr = "inode>1&&ty==d".parse().unwrap();
    assert_eq!(expr.to_string(), "((inode>1)&&(type==directory))");
    assert_eq!(Expr::parse("0x10+010+0b11").unwrap().to_string(), "((16+8)+3)");
}

#[test]
fn test_parse_error_points_at_offending_byte() {
    let err = Expr::parse("length>10 &&").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::UnexpectedSymbol);
    assert_eq!(err.position(), 12);

    let err = Expr::parse("lenght>1").unwrap_err();
    assert_eq!(err.kind(), ParseErrorKind::UnknownIdentifier);
    let text = err.to_string();
    assert!(text.starts_with("parse error: unknown identifier\nlenght>1\n"));
    assert!(text.ends_with("\n^"));
}

#[test]
fn test_division_by_zero_does_not_abort() {
    let expr = Expr::parse("length/0==0").unwrap();
    assert!(expr.matches(&file(8, 100, &[1])));
}

#[test]
fn test_reference_properties() {
    let record = file(9, 0, &[]);
    assert_eq!(Expr::parse("1+2*3==7").unwrap().evaluate(&record, 0), 1);
    assert!(!Expr::parse("type==file && length>0").unwrap().matches(&record));
    assert!(
        Expr::parse("chunkid==0x1234")
            .unwrap()
            .matches(&file(9, 1, &[0x1000, 0x1234, 0x2000]))
    );
}
