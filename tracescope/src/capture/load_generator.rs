//! Synthetic tracepoint streams
//!
//! Stands in for the kernel side when no capture service is attached: each
//! producer thread walks the configured thread groups round-robin and stamps
//! records from a clock shared by all producers, so timestamps are unique
//! but reach the buffer out of order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracescope_common::TracepointRecord;

use crate::domain::{CpuId, Pid, Tid, TracepointKind};

/// Threads of one process that emit tracepoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadGroup {
    pub pid: Pid,
    pub tids: Vec<Tid>,
}

#[derive(Debug, Clone)]
pub struct LoadGenerator {
    groups: Vec<ThreadGroup>,
    cpus: Vec<CpuId>,
    kinds: Vec<TracepointKind>,
    clock: Arc<AtomicU64>,
}

impl LoadGenerator {
    /// Groups without threads are ignored. An empty `cpus` list stamps CPU 0.
    #[must_use]
    pub fn new(groups: Vec<ThreadGroup>, cpus: Vec<CpuId>, kinds: Vec<TracepointKind>) -> Self {
        let groups = groups.into_iter().filter(|group| !group.tids.is_empty()).collect();
        let cpus = if cpus.is_empty() { vec![CpuId(0)] } else { cpus };
        Self { groups, cpus, kinds, clock: Arc::new(AtomicU64::new(1)) }
    }

    /// Up to `count` records for `producer`; none if there is nothing to emit
    pub fn stream(&self, producer: usize, count: usize) -> impl Iterator<Item = TracepointRecord> + '_ {
        let emits = !self.groups.is_empty() && !self.kinds.is_empty();
        (0..if emits { count } else { 0 }).map(move |i| {
            let group = &self.groups[(producer + i) % self.groups.len()];
            let tid = group.tids[(i / self.groups.len()) % group.tids.len()];
            let cpu = self.cpus[(producer + i) % self.cpus.len()];
            let kind = self.kinds[i % self.kinds.len()];
            let timestamp_ns = self.clock.fetch_add(1, Ordering::Relaxed);
            TracepointRecord::tracepoint(timestamp_ns, kind.0, group.pid.0, tid.0, cpu.0)
        })
    }
}
