// Tests for reading archives from disk

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::io::Write;
use tempfile::TempDir;
use warcgraph_scanner::ScanError;
use warcgraph_scanner::warc::{find_warc_files, open, read_all};

fn record(uri: &str, block: &str) -> Vec<u8> {
    format!(
        "WARC/1.1\r\nWARC-Type: response\r\nWARC-Target-URI: {}\r\nContent-Length: {}\r\n\r\n{}\r\n\r\n",
        uri,
        block.len(),
        block
    )
    .into_bytes()
}

fn gzip_member(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn test_read_multi_member_gzip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("00.warc.gz");

    let mut data = gzip_member(&record("http://a.com/", "<a href=\"/x\">x</a>"));
    data.extend(gzip_member(&record("http://b.com/", "")));
    fs::write(&path, data).unwrap();

    let records = read_all(&path).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].target_uri.as_deref(), Some("http://a.com/"));
    assert_eq!(records[0].payload, b"<a href=\"/x\">x</a>");
    assert_eq!(records[1].target_uri.as_deref(), Some("http://b.com/"));
    assert_eq!(records[1].record_type(), Some("response"));
}

#[test]
fn test_read_plain_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("00.warc");
    fs::write(&path, record("http://a.com/", "hello")).unwrap();

    let mut reader = open(&path).unwrap();
    let first = reader.next().unwrap().unwrap();
    assert_eq!(first.payload, b"hello");
    assert!(reader.next().is_none());
}

#[test]
fn test_truncated_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("00.warc");
    let mut data = record("http://a.com/", "hello");
    data.truncate(data.len() - 8);
    fs::write(&path, data).unwrap();

    assert!(matches!(read_all(&path), Err(ScanError::Warc(_))));
}

#[test]
fn test_find_warc_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("b").join("c")).unwrap();
    fs::write(root.join("b").join("c").join("02.warc.gz"), "").unwrap();
    fs::write(root.join("01.warc"), "").unwrap();
    fs::write(root.join("b").join("index.cdx"), "").unwrap();
    let single = root.join("01.warc");

    let found = find_warc_files(&[root.to_path_buf(), single.clone()]).unwrap();
    assert_eq!(
        found,
        vec![single, root.join("b").join("c").join("02.warc.gz")]
    );
}

#[test]
fn test_find_warc_files_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let result = find_warc_files(&[temp_dir.path().join("nope")]);
    assert!(matches!(result, Err(ScanError::IoError(_))));
}
