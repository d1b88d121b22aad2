// Tab-separated part files, one per partition

use crate::edge::EdgeRecord;
use crate::error::{JobError, Result};
use crate::vertex::VertexRecord;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Marker written once every part file is complete.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// A two-column output row.
pub trait TableRow {
    fn key(&self) -> &str;
    fn value(&self) -> &str;
}

impl TableRow for VertexRecord {
    fn key(&self) -> &str {
        self.id.as_str()
    }

    fn value(&self) -> &str {
        &self.url
    }
}

impl TableRow for EdgeRecord {
    fn key(&self) -> &str {
        self.source.as_str()
    }

    fn value(&self) -> &str {
        self.dest.as_str()
    }
}

pub fn part_file_name(partition: usize) -> String {
    format!("part-r-{:05}", partition)
}

/// Writes one `part-r-NNNNN` file per partition into `dir` and returns the
/// number of rows written.
pub fn write_partitions<R: TableRow>(dir: &Path, partitions: &[Vec<R>]) -> Result<usize> {
    fs::create_dir_all(dir)?;

    let mut total = 0;
    for (idx, rows) in partitions.iter().enumerate() {
        let file = File::create(dir.join(part_file_name(idx)))?;
        let mut writer = BufWriter::new(file);
        for row in rows {
            writeln!(writer, "{}\t{}", row.key(), row.value())?;
        }
        writer.flush()?;
        total += rows.len();
    }

    File::create(dir.join(SUCCESS_MARKER))?;
    Ok(total)
}

/// Part files of a finished output directory, in partition order.
pub fn part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.join(SUCCESS_MARKER).exists() {
        return Err(JobError::Config(format!(
            "{} is not a completed output directory",
            dir.display()
        )));
    }

    let mut parts: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("part-r-"))
                .unwrap_or(false)
        })
        .collect();
    parts.sort();
    Ok(parts)
}

/// Reads every `(key, value)` row back from an output directory.
pub fn read_table(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut rows = Vec::new();
    for part in part_files(dir)? {
        let reader = BufReader::new(File::open(&part)?);
        for line in reader.lines() {
            let line = line?;
            let (key, value) = line.split_once('\t').ok_or_else(|| {
                JobError::Config(format!("malformed row in {}: '{}'", part.display(), line))
            })?;
            rows.push((key.to_string(), value.to_string()));
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use warcgraph_scanner::derive_id;

    #[test]
    fn test_write_and_read_partitions() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("edges");

        let a = derive_id("a.com/");
        let b = derive_id("b.com/");
        let partitions = vec![
            vec![
                EdgeRecord {
                    source: a.clone(),
                    dest: b.clone(),
                },
                EdgeRecord {
                    source: a.clone(),
                    dest: b.clone(),
                },
            ],
            vec![],
        ];

        let written = write_partitions(&out, &partitions).unwrap();
        assert_eq!(written, 2);
        assert!(out.join("part-r-00000").exists());
        assert!(out.join("part-r-00001").exists());
        assert!(out.join(SUCCESS_MARKER).exists());

        let rows = read_table(&out).unwrap();
        assert_eq!(
            rows,
            vec![
                (a.to_string(), b.to_string()),
                (a.to_string(), b.to_string())
            ]
        );
    }

    #[test]
    fn test_incomplete_directory_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        assert!(read_table(temp_dir.path()).is_err());
    }

    #[test]
    fn test_part_file_name() {
        assert_eq!(part_file_name(0), "part-r-00000");
        assert_eq!(part_file_name(15), "part-r-00015");
    }
}
