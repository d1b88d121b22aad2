//! Reader for WARC 1.0/1.1 archives.
//!
//! Each record is a version line, `Name: value` header fields, a blank line,
//! then exactly `Content-Length` bytes of block followed by two CRLFs.
//! `.gz` files are read as multi-member gzip, one member per record being
//! the usual layout.

use crate::error::{Result, ScanError};
use crate::record::CaptureRecord;
use flate2::read::MultiGzDecoder;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

const VERSION_PREFIX: &str = "WARC/";
const CONTENT_LENGTH: &str = "Content-Length";

pub struct WarcReader<R> {
    reader: R,
    records_read: u64,
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            records_read: 0,
        }
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Reads the next record, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> Result<Option<CaptureRecord>> {
        let version = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
            }
        };

        if !version.starts_with(VERSION_PREFIX) {
            return Err(ScanError::Warc(format!(
                "record {}: expected version line, found '{}'",
                self.records_read + 1,
                truncate(&version)
            )));
        }

        let headers = self.read_headers()?;

        let length = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_LENGTH))
            .map(|(_, value)| value.as_str())
            .ok_or_else(|| ScanError::Warc("missing Content-Length".to_string()))?;
        let length: u64 = length
            .parse()
            .map_err(|_| ScanError::Warc(format!("bad Content-Length '{}'", length)))?;

        let mut payload = Vec::new();
        (&mut self.reader).take(length).read_to_end(&mut payload)?;
        if (payload.len() as u64) < length {
            return Err(ScanError::Warc(format!(
                "truncated block: expected {} bytes, got {}",
                length,
                payload.len()
            )));
        }

        self.records_read += 1;
        Ok(Some(CaptureRecord::from_headers(headers, payload)))
    }

    fn read_headers(&mut self) -> Result<BTreeMap<String, String>> {
        let mut headers = BTreeMap::new();
        let mut last: Option<String> = None;

        loop {
            let line = self
                .read_line()?
                .ok_or_else(|| ScanError::Warc("end of stream inside header block".to_string()))?;

            if line.is_empty() {
                return Ok(headers);
            }

            // Folded continuation of the previous field.
            if line.starts_with([' ', '\t']) {
                if let Some(name) = &last
                    && let Some(value) = headers.get_mut(name)
                {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ScanError::Warc(format!("bad header line '{}'", truncate(&line))))?;
            let name = name.trim().to_string();
            headers.insert(name.clone(), value.trim().to_string());
            last = Some(name);
        }
    }

    /// One line without its terminator, `None` at end of stream. Bytes that
    /// are not UTF-8 (raw Latin-1 target URIs, say) are replaced.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<CaptureRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

pub type FileReader = WarcReader<Box<dyn BufRead + Send>>;

/// Opens a `.warc` or `.warc.gz` file.
pub fn open(path: &Path) -> Result<FileReader> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = if is_gzip(path) {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(WarcReader::new(reader))
}

/// Reads every record of one archive file.
pub fn read_all(path: &Path) -> Result<Vec<CaptureRecord>> {
    let records = open(path)?.collect::<Result<Vec<_>>>()?;
    debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn is_warc_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(".warc") || name.ends_with(".warc.gz"))
        .unwrap_or(false)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Expands inputs into archive files: a file is taken as-is, a directory is
/// walked recursively for `*.warc` and `*.warc.gz`. Output is sorted.
pub fn find_warc_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        if input.is_dir() {
            walk(input, &mut found)?;
        } else if input.exists() {
            found.push(input.clone());
        } else {
            return Err(ScanError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input not found: {}", input.display()),
            )));
        }
    }
    found.sort();
    found.dedup();
    Ok(found)
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, found)?;
        } else if is_warc_file(&path) {
            found.push(path);
        }
    }
    Ok(())
}

fn truncate(line: &str) -> &str {
    match line.char_indices().nth(64) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
