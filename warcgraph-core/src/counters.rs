use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Counter {
    Pages,
    Links,
    BadSourceUrl,
    BadDestUrl,
    PayloadParseError,
}

impl Counter {
    pub const ALL: [Counter; 5] = [
        Counter::Pages,
        Counter::Links,
        Counter::BadSourceUrl,
        Counter::BadDestUrl,
        Counter::PayloadParseError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Counter::Pages => "PAGES",
            Counter::Links => "LINKS",
            Counter::BadSourceUrl => "BAD_SOURCE_URL",
            Counter::BadDestUrl => "BAD_DEST_URL",
            Counter::PayloadParseError => "PAYLOAD_PARSE_ERROR",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters local to one shard attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSet {
    values: [u64; Counter::ALL.len()],
}

impl CounterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, counter: Counter) {
        self.add(counter, 1);
    }

    pub fn add(&mut self, counter: Counter, amount: u64) {
        self.values[counter.index()] += amount;
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.index()]
    }
}

/// Job-wide monotonic counters, shared between workers.
///
/// Workers only fold in the [`CounterSet`] of a shard attempt that
/// succeeded, so a retried shard is never counted twice.
#[derive(Debug, Default)]
pub struct Counters {
    values: [AtomicU64; Counter::ALL.len()],
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&self, set: &CounterSet) {
        for counter in Counter::ALL {
            let amount = set.get(counter);
            if amount > 0 {
                self.values[counter.index()].fetch_add(amount, Ordering::Relaxed);
            }
        }
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            pages: self.get(Counter::Pages),
            links: self.get(Counter::Links),
            bad_source_url: self.get(Counter::BadSourceUrl),
            bad_dest_url: self.get(Counter::BadDestUrl),
            payload_parse_error: self.get(Counter::PayloadParseError),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    #[serde(rename = "PAGES")]
    pub pages: u64,
    #[serde(rename = "LINKS")]
    pub links: u64,
    #[serde(rename = "BAD_SOURCE_URL")]
    pub bad_source_url: u64,
    #[serde(rename = "BAD_DEST_URL")]
    pub bad_dest_url: u64,
    #[serde(rename = "PAYLOAD_PARSE_ERROR")]
    pub payload_parse_error: u64,
}

impl CounterSnapshot {
    /// Name/value pairs in reporting order.
    pub fn entries(&self) -> [(&'static str, u64); 5] {
        [
            (Counter::Pages.as_str(), self.pages),
            (Counter::Links.as_str(), self.links),
            (Counter::BadSourceUrl.as_str(), self.bad_source_url),
            (Counter::BadDestUrl.as_str(), self.bad_dest_url),
            (Counter::PayloadParseError.as_str(), self.payload_parse_error),
        ]
    }
}
