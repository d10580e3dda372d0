//! Report rendering for both front-ends.
//!
//! Layouts follow the MooseFS command line tools so existing scripts that
//! parse their output keep working. JSON strings are escaped with
//! `serde_json`; the surrounding structure is written by hand to keep key
//! order and tab indentation stable and to allow repeated paths.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::config::OutputFormat;
use crate::dirinfo::{DirInfoEntry, DirInfoReport};
use crate::search::SearchReport;

const SEPARATOR_LINE: &str = "------------------------------";

/// Renders `number` with IEC suffixes and three significant digits, e.g.
/// `999`, `1.5Ki`, `10Ki`, `64Mi`.
pub fn humanize(number: u64) -> String {
    const DIVISOR: u64 = 1024;
    const SUFFIXES: [char; 6] = ['K', 'M', 'G', 'T', 'P', 'E'];
    let (mut scaled, mut scale) = if number > u64::MAX / 100 {
        (number / DIVISOR * 100, 1usize)
    } else {
        (number * 100, 0usize)
    };
    while scaled >= 99_950 {
        scaled /= DIVISOR;
        scale += 1;
    }
    let mut text = if scaled < 995 && scale > 0 {
        let tenths = (scaled + 5) / 10;
        format!("{}.{}", tenths / 10, tenths % 10)
    } else {
        ((scaled + 50) / 100).to_string()
    };
    if scale > 0 {
        text.push(SUFFIXES[scale - 1]);
        text.push('i');
    }
    text
}

fn quoted(text: &str) -> String {
    // serializing a str cannot fail
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// Writes a fully rendered report to `path`, or to stdout without one.
pub fn emit(path: Option<&Path>, rendered: &[u8]) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, rendered),
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(rendered)?;
            lock.flush()
        }
    }
}

pub fn write_dirinfo<W: Write>(
    out: &mut W,
    report: &DirInfoReport,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Plain => dirinfo_plain(out, report),
        OutputFormat::Json => dirinfo_json(out, report),
        OutputFormat::Csv { separator } => dirinfo_csv(out, report, separator),
    }
}

fn dirinfo_plain<W: Write>(out: &mut W, report: &DirInfoReport) -> io::Result<()> {
    writeln!(out, "{SEPARATOR_LINE}")?;
    for entry in &report.entries {
        writeln!(out, "path: {}", entry.path)?;
        if entry.is_found() {
            let stats = &entry.stats;
            writeln!(out, "inodes: {}", entry.inodes)?;
            writeln!(out, " files: {}", stats.files)?;
            writeln!(out, " dirs: {}", stats.dirs)?;
            writeln!(out, "chunks: {}", entry.chunks)?;
            writeln!(out, " keep chunks: {}", stats.keep_chunks)?;
            writeln!(out, " arch chunks: {}", stats.arch_chunks)?;
            for (label, value) in [
                ("length", stats.length),
                ("size", stats.size),
                ("keep size", stats.keep_size),
                ("arch size", stats.arch_size),
                ("real size", stats.real_size),
            ] {
                writeln!(out, "{label}: {value} = {:>5}B", humanize(value))?;
            }
        } else {
            writeln!(out, "path not found !!!")?;
        }
        writeln!(out, "{SEPARATOR_LINE}")?;
    }
    Ok(())
}

fn dirinfo_fields(entry: &DirInfoEntry) -> [(&'static str, u64); 11] {
    let stats = &entry.stats;
    [
        ("inodes", entry.inodes),
        ("files", stats.files),
        ("dirs", stats.dirs),
        ("chunks", entry.chunks),
        ("kchunks", stats.keep_chunks),
        ("achunks", stats.arch_chunks),
        ("length", stats.length),
        ("size", stats.size),
        ("rsize", stats.real_size),
        ("ksize", stats.keep_size),
        ("asize", stats.arch_size),
    ]
}

fn dirinfo_json<W: Write>(out: &mut W, report: &DirInfoReport) -> io::Result<()> {
    writeln!(out, "{{")?;
    for (index, entry) in report.entries.iter().enumerate() {
        writeln!(out, "\t{}: {{", quoted(&entry.path))?;
        for (key, value) in dirinfo_fields(entry) {
            writeln!(out, "\t\t\"{key}\": {value},")?;
        }
        writeln!(out, "\t\t\"error\": {}", u8::from(!entry.is_found()))?;
        let comma = if index + 1 < report.entries.len() { "," } else { "" };
        writeln!(out, "\t}}{comma}")?;
    }
    writeln!(out, "}}")
}

fn dirinfo_csv<W: Write>(out: &mut W, report: &DirInfoReport, separator: char) -> io::Result<()> {
    let header = [
        "path",
        "inodes",
        "files",
        "dirs",
        "chunks",
        "keep_chunks",
        "arch_chunks",
        "length",
        "size",
        "real_size",
        "keep_size",
        "arch_size",
    ];
    writeln!(out, "{}", header.join(&separator.to_string()))?;
    for entry in &report.entries {
        write!(out, "{}", quoted(&entry.path))?;
        for (_, value) in dirinfo_fields(entry) {
            if entry.is_found() {
                write!(out, "{separator}{value}")?;
            } else {
                write!(out, "{separator}error")?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_search<W: Write>(
    out: &mut W,
    report: &SearchReport,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Plain => {
            writeln!(out, "{SEPARATOR_LINE}")?;
            for hit in &report.hits {
                for path in &hit.paths {
                    writeln!(
                        out,
                        "inode: {} ; type: {} ; path: {}",
                        hit.inode,
                        hit.kind.report_name(),
                        path
                    )?;
                }
            }
            Ok(())
        }
        OutputFormat::Json => {
            write!(out, "[")?;
            for (index, hit) in report.hits.iter().enumerate() {
                if index > 0 {
                    write!(out, ",")?;
                }
                let paths: Vec<String> = hit.paths.iter().map(|path| quoted(path)).collect();
                write!(
                    out,
                    "\n\t{{\n\t\t\"inode\": {},\n\t\t\"type\": \"{}\",\n\t\t\"paths\": [{}]\n\t}}",
                    hit.inode,
                    hit.kind.report_name(),
                    paths.join(",")
                )?;
            }
            writeln!(out, "\n]")
        }
        OutputFormat::Csv { separator } => {
            writeln!(out, "inode{separator}type{separator}paths")?;
            for hit in &report.hits {
                for path in &hit.paths {
                    writeln!(
                        out,
                        "{}{separator}{}{separator}{}",
                        hit.inode,
                        hit.kind.report_name(),
                        path
                    )?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirinfo::{DirStats, QueryStatus};
    use crate::search::SearchHit;
    use crate::types::InodeType;

    #[test]
    fn test_humanize_thresholds() {
        assert_eq!(humanize(0), "0");
        assert_eq!(humanize(999), "999");
        assert_eq!(humanize(1000), "1.0Ki");
        assert_eq!(humanize(1024), "1.0Ki");
        assert_eq!(humanize(1536), "1.5Ki");
        assert_eq!(humanize(10 * 1024), "10Ki");
        assert_eq!(humanize(64 << 20), "64Mi");
        assert_eq!(humanize(u64::MAX), "16Ei");
    }

    fn sample_report() -> DirInfoReport {
        DirInfoReport {
            entries: vec![
                DirInfoEntry {
                    path: "/a\"b".into(),
                    status: QueryStatus::Found,
                    inodes: 2,
                    chunks: 1,
                    stats: DirStats {
                        files: 1,
                        dirs: 1,
                        keep_chunks: 1,
                        length: 10,
                        size: 73728,
                        keep_size: 147456,
                        arch_size: 73728,
                        real_size: 147456,
                        ..DirStats::default()
                    },
                },
                DirInfoEntry {
                    path: "/missing".into(),
                    status: QueryStatus::NotFound,
                    inodes: 0,
                    chunks: 0,
                    stats: DirStats::default(),
                },
            ],
        }
    }

    #[test]
    fn test_dirinfo_json_is_valid_and_ordered() {
        let mut out = Vec::new();
        write_dirinfo(&mut out, &sample_report(), OutputFormat::Json).unwrap();
        let text = String::from_utf8(out).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["/a\"b"]["size"], 73728);
        assert_eq!(value["/a\"b"]["error"], 0);
        assert_eq!(value["/missing"]["error"], 1);
        assert!(text.find("\"rsize\"").unwrap() < text.find("\"ksize\"").unwrap());
    }

    #[test]
    fn test_dirinfo_csv_marks_missing_paths() {
        let mut out = Vec::new();
        write_dirinfo(&mut out, &sample_report(), OutputFormat::Csv { separator: ';' }).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("path;inodes;files;"));
        assert_eq!(lines[1], "\"/a\\\"b\";2;1;1;1;1;0;10;73728;147456;147456;73728");
        assert_eq!(lines[2], format!("\"/missing\"{}", ";error".repeat(11)));
    }

    #[test]
    fn test_dirinfo_plain_layout() {
        let mut out = Vec::new();
        write_dirinfo(&mut out, &sample_report(), OutputFormat::Plain).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("size: 73728 =  72KiB\n"));
        assert!(text.contains("path: /missing\npath not found !!!\n"));
    }

    #[test]
    fn test_search_formats() {
        let report = SearchReport {
            hits: vec![SearchHit {
                inode: 5,
                kind: InodeType::Trash,
                paths: vec!["[TRASH] a".into(), "/b".into()],
            }],
        };
        let mut out = Vec::new();
        write_search(&mut out, &report, OutputFormat::Plain).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{SEPARATOR_LINE}\ninode: 5 ; type: file ; path: [TRASH] a\ninode: 5 ; type: file ; path: /b\n")
        );

        let mut out = Vec::new();
        write_search(&mut out, &report, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["paths"][1], "/b");
        assert_eq!(value[0]["type"], "file");

        let mut out = Vec::new();
        write_search(&mut out, &report, OutputFormat::Csv { separator: ',' }).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "inode,type,paths\n5,file,[TRASH] a\n5,file,/b\n"
        );
    }
}
