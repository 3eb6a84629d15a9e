//! Per-message log sampling.
//!
//! Within each one-second tick, the first `initial` lines with a given level
//! and message are written, after which only every `thereafter`-th one is.
//! Messages are bucketed by an FNV-1a hash into a fixed table of counters per
//! level, so distinct messages may occasionally share a bucket. The counters
//! are plain atomics: no lock is taken on the logging path.

use crate::constants::defaults;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::Level;

const COUNTERS_PER_LEVEL: usize = 4096;
const LEVELS: usize = 5;

/// Sampling policy of a logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Every line that passes the level gate is written.
    Disabled,
    /// Write `initial` lines per tick, then one in every `thereafter`.
    /// A `thereafter` of zero drops everything past the initial burst.
    Enabled { initial: u64, thereafter: u64 },
}

impl Default for Sampling {
    fn default() -> Self {
        Sampling::Enabled {
            initial: defaults::SAMPLING_INITIAL,
            thereafter: defaults::SAMPLING_THEREAFTER,
        }
    }
}

#[derive(Default)]
struct Counter {
    reset_at: AtomicU64,
    count: AtomicU64,
}

impl Counter {
    fn inc_check_reset(&self, now: u64, tick: u64) -> u64 {
        let reset_at = self.reset_at.load(Ordering::Acquire);
        if reset_at > now {
            return self.count.fetch_add(1, Ordering::Relaxed) + 1;
        }

        self.count.store(1, Ordering::Relaxed);
        if self
            .reset_at
            .compare_exchange(reset_at, now + tick, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // Another thread reset the counter for this tick first.
            return self.count.fetch_add(1, Ordering::Relaxed) + 1;
        }
        1
    }
}

/// Counter table deciding which lines get written.
pub(crate) struct Sampler {
    counters: Box<[Counter]>,
    initial: u64,
    thereafter: u64,
    tick: u64,
    epoch: Instant,
}

impl Sampler {
    pub(crate) fn new(initial: u64, thereafter: u64) -> Self {
        Self {
            counters: (0..LEVELS * COUNTERS_PER_LEVEL)
                .map(|_| Counter::default())
                .collect(),
            initial,
            thereafter,
            tick: defaults::SAMPLING_TICK_NANOS,
            epoch: Instant::now(),
        }
    }

    pub(crate) fn from_policy(policy: Sampling) -> Option<Self> {
        match policy {
            Sampling::Disabled => None,
            Sampling::Enabled {
                initial,
                thereafter,
            } => Some(Self::new(initial, thereafter)),
        }
    }

    /// Whether a line with this level and message should be written now.
    pub(crate) fn sample(&self, level: Level, message: &str) -> bool {
        let now = u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.sample_at(level, message, now)
    }

    fn sample_at(&self, level: Level, message: &str, now: u64) -> bool {
        let bucket = fnv1a(message) as usize % COUNTERS_PER_LEVEL;
        let counter = &self.counters[level_index(level) * COUNTERS_PER_LEVEL + bucket];

        let n = counter.inc_check_reset(now, self.tick);
        if n <= self.initial {
            return true;
        }
        self.thereafter != 0 && (n - self.initial) % self.thereafter == 0
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("initial", &self.initial)
            .field("thereafter", &self.thereafter)
            .field("tick", &self.tick)
            .finish()
    }
}

fn level_index(level: Level) -> usize {
    if level == Level::ERROR {
        0
    } else if level == Level::WARN {
        1
    } else if level == Level::INFO {
        2
    } else if level == Level::DEBUG {
        3
    } else {
        4
    }
}

fn fnv1a(value: &str) -> u32 {
    const OFFSET: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    value
        .bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u32::from(byte)).wrapping_mul(PRIME))
}
