use crate::counters::{Counter, CounterSet};
use crate::engine::Job;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;
use warcgraph_scanner::{CaptureRecord, IdDeriver, LinkExtractor, NodeId, ResolvedUrl, canonicalize};

/// One row of the edge table. Duplicates are meaningful and kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub dest: NodeId,
}

/// Per-worker state for the edge map step.
pub struct EdgeWorker {
    ids: IdDeriver,
    links: LinkExtractor,
}

impl EdgeWorker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ids: IdDeriver::new()?,
            links: LinkExtractor::new()?,
        })
    }
}

/// Map step for a single capture: one edge per resolvable outbound link.
///
/// A bad target URI or an unparseable payload drops the whole record; a
/// bad link drops only that link.
pub fn map_edges(
    record: &CaptureRecord,
    worker: &mut EdgeWorker,
    counters: &mut CounterSet,
) -> Vec<EdgeRecord> {
    let Some(target) = record.target_uri.as_deref() else {
        return Vec::new();
    };

    let resolved = ResolvedUrl::parse(target).and_then(|base| {
        let canonical = base.canonical()?;
        Ok((base, canonical))
    });
    let (base, source_url) = match resolved {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!("Skipping record with bad target URI: {}", e);
            counters.increment(Counter::BadSourceUrl);
            return Vec::new();
        }
    };
    let source = worker.ids.derive(&source_url);
    counters.increment(Counter::Pages);

    let links = match worker.links.extract(&record.payload) {
        Ok(links) => links,
        Err(e) => {
            debug!("Skipping payload of {}: {}", source_url, e);
            counters.increment(Counter::PayloadParseError);
            return Vec::new();
        }
    };

    let mut edges = Vec::with_capacity(links.len());
    for link in &links {
        match canonicalize(link, Some(&base)) {
            Ok(dest_url) => {
                edges.push(EdgeRecord {
                    source: source.clone(),
                    dest: worker.ids.derive(&dest_url),
                });
                counters.increment(Counter::Links);
            }
            Err(e) => {
                debug!("Bad link on {}: {}", source_url, e);
                counters.increment(Counter::BadDestUrl);
            }
        }
    }

    edges
}

/// Builds the edge table. The reduce step only partitions by source id; it
/// neither deduplicates nor reorders a source's edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeJob;

impl Job for EdgeJob {
    type Input = CaptureRecord;
    type Key = NodeId;
    type Value = NodeId;
    type Output = EdgeRecord;
    type Worker = EdgeWorker;

    fn worker(&self) -> Result<EdgeWorker> {
        EdgeWorker::new()
    }

    fn map(
        &self,
        worker: &mut EdgeWorker,
        record: &CaptureRecord,
        counters: &mut CounterSet,
        emit: &mut dyn FnMut(NodeId, NodeId),
    ) {
        for edge in map_edges(record, worker, counters) {
            emit(edge.source, edge.dest);
        }
    }

    fn reduce(&self, source: &NodeId, dests: Vec<NodeId>, emit: &mut dyn FnMut(EdgeRecord)) {
        for dest in dests {
            emit(EdgeRecord {
                source: source.clone(),
                dest,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warcgraph_scanner::derive_id;

    fn page(uri: &str, html: &str) -> CaptureRecord {
        CaptureRecord::new(Some(uri.to_string()), html.as_bytes().to_vec())
    }

    #[test]
    fn test_links_resolved_against_source() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();

        let edges = map_edges(
            &page(
                "http://www.cs.washington.edu:8080/foo?bar#slouch",
                r#"<a href="index.html?blah#sam">x</a><a href="https://Foo.BAR.com/index.html?blah">y</a>"#,
            ),
            &mut worker,
            &mut counters,
        );

        let source = derive_id("www.cs.washington.edu:8080/foo?bar");
        assert_eq!(
            edges,
            vec![
                EdgeRecord {
                    source: source.clone(),
                    dest: derive_id("www.cs.washington.edu:8080/index.html?blah"),
                },
                EdgeRecord {
                    source,
                    dest: derive_id("foo.bar.com/index.html?blah"),
                },
            ]
        );
        assert_eq!(counters.get(Counter::Pages), 1);
        assert_eq!(counters.get(Counter::Links), 2);
    }

    #[test]
    fn test_bad_link_skips_only_that_link() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();

        let edges = map_edges(
            &page(
                "http://example.com/",
                r#"<a href="/a">a</a><a href="http://">bad</a><a href="/b">b</a>"#,
            ),
            &mut worker,
            &mut counters,
        );

        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].dest, derive_id("example.com/a"));
        assert_eq!(edges[1].dest, derive_id("example.com/b"));
        assert_eq!(counters.get(Counter::BadDestUrl), 1);
        assert_eq!(counters.get(Counter::Links), 2);
    }

    #[test]
    fn test_bad_source_skips_record() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();

        let edges = map_edges(
            &page("not a url at all", r#"<a href="http://example.com/">x</a>"#),
            &mut worker,
            &mut counters,
        );

        assert!(edges.is_empty());
        assert_eq!(counters.get(Counter::BadSourceUrl), 1);
        assert_eq!(counters.get(Counter::Pages), 0);
        assert_eq!(counters.get(Counter::BadDestUrl), 0);
    }

    #[test]
    fn test_relative_source_skips_record() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();

        let edges = map_edges(
            &page("index.html", r#"<a href="http://example.com/">x</a>"#),
            &mut worker,
            &mut counters,
        );

        assert!(edges.is_empty());
        assert_eq!(counters.get(Counter::BadSourceUrl), 1);
        assert_eq!(counters.get(Counter::Pages), 0);
        assert_eq!(counters.get(Counter::Links), 0);
    }

    #[test]
    fn test_links_keep_written_path() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();

        let edges = map_edges(
            &page(
                "http://a.com",
                r#"<a href="b c.html">b</a><a href="http://Bücher.de/café">c</a>"#,
            ),
            &mut worker,
            &mut counters,
        );

        assert_eq!(
            edges,
            vec![
                EdgeRecord {
                    source: derive_id("a.com"),
                    dest: derive_id("a.com/b c.html"),
                },
                EdgeRecord {
                    source: derive_id("a.com"),
                    dest: derive_id("bücher.de/café"),
                },
            ]
        );
    }

    #[test]
    fn test_unparseable_payload_skips_record() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();
        let record = CaptureRecord::new(
            Some("http://example.com/".to_string()),
            vec![b'<', b'a', 0xff, 0xfe],
        );

        assert!(map_edges(&record, &mut worker, &mut counters).is_empty());
        assert_eq!(counters.get(Counter::Pages), 1);
        assert_eq!(counters.get(Counter::PayloadParseError), 1);
        assert_eq!(counters.get(Counter::Links), 0);
    }

    #[test]
    fn test_missing_target_is_silent() {
        let mut worker = EdgeWorker::new().unwrap();
        let mut counters = CounterSet::new();
        let record = CaptureRecord::new(None, b"<a href=\"http://a.com/\">a</a>".to_vec());

        assert!(map_edges(&record, &mut worker, &mut counters).is_empty());
        assert_eq!(counters, CounterSet::new());
    }

    #[test]
    fn test_reduce_keeps_duplicates_in_order() {
        let source = derive_id("a.com/");
        let dests = vec![derive_id("b.com/"), derive_id("c.com/"), derive_id("b.com/")];
        let mut rows = Vec::new();
        EdgeJob.reduce(&source, dests.clone(), &mut |row: EdgeRecord| rows.push(row));

        let got: Vec<NodeId> = rows.into_iter().map(|row| row.dest).collect();
        assert_eq!(got, dests);
    }
}
