use crate::counters::{Counter, CounterSet};
use crate::engine::Job;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;
use warcgraph_scanner::{CaptureRecord, IdDeriver, NodeId, ResolvedUrl};

/// One row of the vertex table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexRecord {
    pub id: NodeId,
    pub url: String,
}

/// Map step for a single capture: its canonical URL keyed by node id.
///
/// Records without a target URI are skipped silently. A target that is not
/// an absolute URL with a host bumps `BAD_SOURCE_URL`.
pub fn map_vertex(
    record: &CaptureRecord,
    ids: &mut IdDeriver,
    counters: &mut CounterSet,
) -> Option<VertexRecord> {
    let target = record.target_uri.as_deref()?;

    let url = match ResolvedUrl::parse(target).and_then(|url| url.canonical()) {
        Ok(url) => url,
        Err(e) => {
            debug!("Skipping record with bad target URI: {}", e);
            counters.increment(Counter::BadSourceUrl);
            return None;
        }
    };

    Some(VertexRecord {
        id: ids.derive(&url),
        url,
    })
}

/// Builds the vertex table: one row per distinct node id.
///
/// When several canonical URLs collide on one id, the first value the
/// grouping stage delivers is kept. That choice is not stable across runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct VertexJob;

impl Job for VertexJob {
    type Input = CaptureRecord;
    type Key = NodeId;
    type Value = String;
    type Output = VertexRecord;
    type Worker = IdDeriver;

    fn worker(&self) -> Result<IdDeriver> {
        Ok(IdDeriver::new()?)
    }

    fn map(
        &self,
        ids: &mut IdDeriver,
        record: &CaptureRecord,
        counters: &mut CounterSet,
        emit: &mut dyn FnMut(NodeId, String),
    ) {
        if let Some(vertex) = map_vertex(record, ids, counters) {
            emit(vertex.id, vertex.url);
        }
    }

    fn reduce(&self, id: &NodeId, urls: Vec<String>, emit: &mut dyn FnMut(VertexRecord)) {
        if let Some(url) = urls.into_iter().next() {
            emit(VertexRecord {
                id: id.clone(),
                url,
            });
        }
    }
}
