//! Parallel map + group-by-key execution.
//!
//! A [`Job`] supplies the per-record map and the per-key reduce. An
//! [`Executor`] decides how shards are scheduled. Map output of a shard
//! attempt is buffered and only published, together with its counters,
//! once the whole shard has been mapped, so a retried shard never
//! contributes twice.

use crate::counters::{CounterSet, Counters};
use crate::error::{JobError, Result};
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

pub trait Job: Send + Sync + 'static {
    type Input: Send + 'static;
    type Key: Ord + Hash + Clone + Send + 'static;
    type Value: Send + 'static;
    type Output: Send + 'static;
    /// Scratch state owned by a single worker, never shared.
    type Worker;

    fn worker(&self) -> Result<Self::Worker>;

    fn map(
        &self,
        worker: &mut Self::Worker,
        input: &Self::Input,
        counters: &mut CounterSet,
        emit: &mut dyn FnMut(Self::Key, Self::Value),
    );

    fn reduce(
        &self,
        key: &Self::Key,
        values: Vec<Self::Value>,
        emit: &mut dyn FnMut(Self::Output),
    );
}

/// A unit of input handed to exactly one worker at a time.
pub trait Shard: Send + Sync + 'static {
    type Record;

    fn name(&self) -> String;

    fn records(&self) -> Result<Box<dyn Iterator<Item = Result<Self::Record>> + '_>>;
}

/// In-memory shard, mostly for tests and small inputs.
#[derive(Debug, Clone)]
pub struct MemoryShard<T> {
    name: String,
    records: Vec<T>,
}

impl<T> MemoryShard<T> {
    pub fn new(name: impl Into<String>, records: Vec<T>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Shard for MemoryShard<T> {
    type Record = T;

    fn name(&self) -> String {
        self.name.clone()
    }

    fn records(&self) -> Result<Box<dyn Iterator<Item = Result<T>> + '_>> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }
}

#[derive(Debug)]
pub struct JobOutput<O> {
    /// Reduced rows, one vector per partition, keys in ascending order.
    pub partitions: Vec<Vec<O>>,
    pub shards: usize,
    pub retries: usize,
}

impl<O> JobOutput<O> {
    pub fn row_count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn into_rows(self) -> Vec<O> {
        self.partitions.into_iter().flatten().collect()
    }
}

pub trait Executor {
    fn execute<J, S>(
        &self,
        job: Arc<J>,
        shards: Vec<S>,
        counters: Arc<Counters>,
    ) -> impl Future<Output = Result<JobOutput<J::Output>>> + Send
    where
        J: Job,
        S: Shard<Record = J::Input>;
}

/// Stable partition for a key.
pub fn partition_for<K: Hash>(key: &K, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % partitions.max(1) as u64) as usize
}

/// Maps every record of one shard with a fresh worker state.
fn map_shard<J, S>(job: &J, shard: &S) -> Result<(Vec<(J::Key, J::Value)>, CounterSet)>
where
    J: Job,
    S: Shard<Record = J::Input>,
{
    let mut worker = job.worker()?;
    let mut counters = CounterSet::new();
    let mut pairs = Vec::new();

    for record in shard.records()? {
        let record = record?;
        job.map(&mut worker, &record, &mut counters, &mut |key: J::Key, value: J::Value| {
            pairs.push((key, value))
        });
    }

    Ok((pairs, counters))
}

fn reduce_partition<J: Job>(job: &J, groups: BTreeMap<J::Key, Vec<J::Value>>) -> Vec<J::Output> {
    let mut rows = Vec::with_capacity(groups.len());
    for (key, values) in groups {
        job.reduce(&key, values, &mut |row: J::Output| rows.push(row));
    }
    rows
}

/// Key groups split into partitions.
struct Grouper<K, V> {
    partitions: Vec<StdMutex<BTreeMap<K, Vec<V>>>>,
}

impl<K: Ord + Hash, V> Grouper<K, V> {
    fn new(partitions: usize) -> Self {
        Self {
            partitions: (0..partitions.max(1))
                .map(|_| StdMutex::new(BTreeMap::new()))
                .collect(),
        }
    }

    fn insert_all(&self, pairs: Vec<(K, V)>) {
        let count = self.partitions.len();
        let mut routed: Vec<Vec<(K, V)>> = (0..count).map(|_| Vec::new()).collect();
        for (key, value) in pairs {
            let idx = partition_for(&key, count);
            routed[idx].push((key, value));
        }

        for (idx, pairs) in routed.into_iter().enumerate() {
            if pairs.is_empty() {
                continue;
            }
            let mut groups = self.partitions[idx]
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for (key, value) in pairs {
                groups.entry(key).or_default().push(value);
            }
        }
    }

    fn into_partitions(self) -> Vec<BTreeMap<K, Vec<V>>> {
        self.partitions
            .into_iter()
            .map(|p| p.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()))
            .collect()
    }
}

/// Runs the whole job on the calling thread, shard by shard.
#[derive(Debug, Clone)]
pub struct SequentialExecutor {
    partitions: usize,
}

impl SequentialExecutor {
    pub fn new(partitions: usize) -> Self {
        Self { partitions }
    }

    fn run<J, S>(&self, job: &J, shards: &[S], counters: &Counters) -> Result<JobOutput<J::Output>>
    where
        J: Job,
        S: Shard<Record = J::Input>,
    {
        let grouper = Grouper::new(self.partitions);
        for shard in shards {
            let (pairs, set) = map_shard(job, shard)?;
            counters.merge(&set);
            grouper.insert_all(pairs);
        }

        let partitions = grouper
            .into_partitions()
            .into_iter()
            .map(|groups| reduce_partition(job, groups))
            .collect();

        Ok(JobOutput {
            partitions,
            shards: shards.len(),
            retries: 0,
        })
    }
}

impl Default for SequentialExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Executor for SequentialExecutor {
    fn execute<J, S>(
        &self,
        job: Arc<J>,
        shards: Vec<S>,
        counters: Arc<Counters>,
    ) -> impl Future<Output = Result<JobOutput<J::Output>>> + Send
    where
        J: Job,
        S: Shard<Record = J::Input>,
    {
        let result = self.run(job.as_ref(), &shards, &counters);
        async move { result }
    }
}

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Tokio worker pool over shards.
///
/// Each worker pulls the next shard from a shared queue and maps it on a
/// blocking thread. A failed or panicking attempt is put back on the queue
/// until `max_attempts` is reached, after which the job fails. Once a
/// shutdown is signalled workers stop taking new shards but let the ones in
/// flight finish.
pub struct LocalExecutor {
    workers: usize,
    partitions: usize,
    max_attempts: usize,
    shutdown: Option<watch::Receiver<bool>>,
    progress_callback: Option<ProgressCallback>,
}

impl LocalExecutor {
    pub fn new(workers: usize, partitions: usize) -> Self {
        Self {
            workers: workers.max(1),
            partitions: partitions.max(1),
            max_attempts: 3,
            shutdown: None,
            progress_callback: None,
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

struct PendingShard<S> {
    shard: Arc<S>,
    attempts: usize,
}

impl Executor for LocalExecutor {
    fn execute<J, S>(
        &self,
        job: Arc<J>,
        shards: Vec<S>,
        counters: Arc<Counters>,
    ) -> impl Future<Output = Result<JobOutput<J::Output>>> + Send
    where
        J: Job,
        S: Shard<Record = J::Input>,
    {
        let workers = self.workers;
        let partitions = self.partitions;
        let max_attempts = self.max_attempts;
        let shutdown = self.shutdown.clone();
        let progress_cb = self.progress_callback.clone();

        async move {
            let total = shards.len();
            info!(
                "Mapping {} shards with {} workers into {} partitions",
                total, workers, partitions
            );

            let queue: Arc<Mutex<VecDeque<PendingShard<S>>>> = Arc::new(Mutex::new(
                shards
                    .into_iter()
                    .map(|shard| PendingShard {
                        shard: Arc::new(shard),
                        attempts: 0,
                    })
                    .collect(),
            ));
            let grouper = Arc::new(Grouper::<J::Key, J::Value>::new(partitions));
            let failure: Arc<StdMutex<Option<JobError>>> = Arc::new(StdMutex::new(None));
            let aborted = Arc::new(AtomicBool::new(false));
            let retries = Arc::new(std::sync::atomic::AtomicUsize::new(0));

            let mut handles = Vec::with_capacity(workers);
            for worker_id in 0..workers {
                let job = job.clone();
                let queue = queue.clone();
                let grouper = grouper.clone();
                let counters = counters.clone();
                let failure = failure.clone();
                let aborted = aborted.clone();
                let retries = retries.clone();
                let shutdown = shutdown.clone();
                let progress_cb = progress_cb.clone();

                handles.push(tokio::spawn(async move {
                    debug!("Worker {} started", worker_id);
                    loop {
                        if aborted.load(Ordering::Relaxed)
                            || shutdown.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
                        {
                            break;
                        }

                        let Some(mut pending) = queue.lock().await.pop_front() else {
                            break;
                        };

                        let name = pending.shard.name();
                        if let Some(ref callback) = progress_cb {
                            callback(worker_id, name.clone());
                        }

                        let attempt_job = job.clone();
                        let attempt_shard = pending.shard.clone();
                        let outcome = tokio::task::spawn_blocking(move || {
                            map_shard(attempt_job.as_ref(), attempt_shard.as_ref())
                        })
                        .await;

                        let reason = match outcome {
                            Ok(Ok((pairs, set))) => {
                                debug!(
                                    "[Worker {}] {} mapped to {} pairs",
                                    worker_id,
                                    name,
                                    pairs.len()
                                );
                                counters.merge(&set);
                                grouper.insert_all(pairs);
                                continue;
                            }
                            Ok(Err(e)) => e.to_string(),
                            Err(e) => e.to_string(),
                        };

                        pending.attempts += 1;
                        if pending.attempts < max_attempts {
                            warn!(
                                "[Worker {}] attempt {} of {} failed: {}; re-queueing",
                                worker_id, pending.attempts, name, reason
                            );
                            retries.fetch_add(1, Ordering::Relaxed);
                            queue.lock().await.push_back(pending);
                        } else {
                            warn!(
                                "[Worker {}] giving up on {} after {} attempts: {}",
                                worker_id, name, pending.attempts, reason
                            );
                            aborted.store(true, Ordering::Relaxed);
                            let mut slot = failure.lock().unwrap_or_else(|p| p.into_inner());
                            slot.get_or_insert(JobError::ShardFailed {
                                shard: name,
                                attempts: pending.attempts,
                                reason,
                            });
                            break;
                        }
                    }
                    debug!("Worker {} finished", worker_id);
                }));
            }

            for handle in handles {
                handle.await?;
            }

            let failed = failure.lock().unwrap_or_else(|p| p.into_inner()).take();
            if let Some(err) = failed {
                return Err(err);
            }

            let pending = queue.lock().await.len();
            if pending > 0 {
                info!("Shutdown requested; {} shards left unprocessed", pending);
                return Err(JobError::Interrupted { pending });
            }

            let grouper = Arc::try_unwrap(grouper).map_err(|_| {
                JobError::Config("partition buffer still shared after map phase".to_string())
            })?;

            let reducers = grouper.into_partitions().into_iter().map(|groups| {
                let job = job.clone();
                tokio::task::spawn_blocking(move || reduce_partition(job.as_ref(), groups))
            });

            let mut reduced = Vec::with_capacity(partitions);
            for result in futures::future::join_all(reducers).await {
                reduced.push(result?);
            }

            let retries = retries.load(Ordering::Relaxed);
            info!(
                "Job complete: {} shards, {} retries, {} rows",
                total,
                retries,
                reduced.iter().map(Vec::len).sum::<usize>()
            );

            Ok(JobOutput {
                partitions: reduced,
                shards: total,
                retries,
            })
        }
    }
}
