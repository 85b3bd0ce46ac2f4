//! # Tracepoint Event Buffer
//!
//! Absorbs tracepoint events from any number of capture threads and serves
//! ordered per-thread tracks to the visualization thread.
//!
//! ## Buckets
//!
//! Every event is queryable under:
//!
//! - its own thread id (the canonical store, one `BTreeMap` per thread)
//! - [`Tid::TARGET_PROCESS`], if it belongs to the process under capture
//! - [`Tid::ALL_PROCESSES`], always
//! - its process id, through [`TracepointEventsGuard::events_of_process`]
//!
//! The aggregate buckets are secondary indices of `(timestamp, tid)` keys
//! into the canonical store, so payloads are stored once. Two events of
//! different threads sharing a timestamp both stay visible in the aggregate
//! tracks. Negative thread ids name the synthetic buckets, so events carrying
//! one are rejected with a warning and never stored.
//!
//! ## Ordering
//!
//! Within a thread, events are keyed by timestamp. Insertion order does not
//! matter for the final view, and a second event with the same timestamp on
//! the same thread replaces the first (last write wins). The replaced event is
//! removed from every secondary index before the new one is added.
//!
//! ## Locking
//!
//! One mutex guards the whole store. [`TracepointEventBuffer::lock`] hands out
//! the guard so a reader can look up a track and walk it without a producer
//! mutating it in between.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet, HashMap};
use std::ops::{Bound, Range};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{CpuId, Pid, Tid, Timestamp, TracepointKind};

/// A single tracepoint occurrence. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracepointEvent {
    pub timestamp: Timestamp,
    pub tracepoint_kind: TracepointKind,
    pub pid: Pid,
    pub tid: Tid,
    pub cpu: CpuId,
    pub is_same_pid_as_target: bool,
}

type IndexKey = (u64, Tid);
type ThreadTrack = BTreeMap<u64, TracepointEvent>;
type TimeRange = (Bound<u64>, Bound<u64>);

const WHOLE_TRACK: TimeRange = (Bound::Unbounded, Bound::Unbounded);

#[derive(Debug, Default)]
struct EventStore {
    by_thread: HashMap<Tid, ThreadTrack>,
    target_process: BTreeSet<IndexKey>,
    all_processes: BTreeSet<IndexKey>,
    by_process: HashMap<Pid, BTreeSet<IndexKey>>,
    num_events: usize,
}

impl EventStore {
    fn insert(&mut self, event: TracepointEvent) {
        let replaced =
            self.by_thread.entry(event.tid).or_default().insert(event.timestamp.0, event);

        match replaced {
            Some(old) => self.unindex(&old),
            None => self.num_events += 1,
        }
        self.index(&event);
    }

    fn index(&mut self, event: &TracepointEvent) {
        let key = (event.timestamp.0, event.tid);
        if event.is_same_pid_as_target {
            self.target_process.insert(key);
        }
        self.all_processes.insert(key);
        self.by_process.entry(event.pid).or_default().insert(key);
    }

    fn unindex(&mut self, event: &TracepointEvent) {
        let key = (event.timestamp.0, event.tid);
        self.target_process.remove(&key);
        self.all_processes.remove(&key);
        if let Some(keys) = self.by_process.get_mut(&event.pid) {
            keys.remove(&key);
            if keys.is_empty() {
                self.by_process.remove(&event.pid);
            }
        }
    }

    fn aggregate(&self, tid: Tid) -> Option<&BTreeSet<IndexKey>> {
        match tid {
            Tid::TARGET_PROCESS => Some(&self.target_process),
            Tid::ALL_PROCESSES => Some(&self.all_processes),
            _ => None,
        }
    }

    fn thread_range(&self, tid: Tid, range: TimeRange) -> EventsIter<'_> {
        if let Some(keys) = self.aggregate(tid) {
            return self.index_range(keys, range);
        }

        match self.by_thread.get(&tid) {
            Some(track) => EventsIter { inner: EventsIterInner::Thread(track.range(range)) },
            None => EventsIter::empty(),
        }
    }

    fn index_range<'a>(&'a self, keys: &'a BTreeSet<IndexKey>, range: TimeRange) -> EventsIter<'a> {
        // Widen timestamp bounds over every tid sharing the bounding timestamp
        let lower = match range.0 {
            Bound::Included(ts) => Bound::Included((ts, Tid(i32::MIN))),
            Bound::Excluded(ts) => Bound::Excluded((ts, Tid(i32::MAX))),
            Bound::Unbounded => Bound::Unbounded,
        };
        let upper = match range.1 {
            Bound::Included(ts) => Bound::Included((ts, Tid(i32::MAX))),
            Bound::Excluded(ts) => Bound::Excluded((ts, Tid(i32::MIN))),
            Bound::Unbounded => Bound::Unbounded,
        };
        EventsIter {
            inner: EventsIterInner::Index {
                keys: keys.range((lower, upper)),
                tracks: &self.by_thread,
            },
        }
    }
}

/// Ordered `(timestamp, event)` iterator over one track
pub struct EventsIter<'a> {
    inner: EventsIterInner<'a>,
}

enum EventsIterInner<'a> {
    Empty,
    Thread(btree_map::Range<'a, u64, TracepointEvent>),
    Index { keys: btree_set::Range<'a, IndexKey>, tracks: &'a HashMap<Tid, ThreadTrack> },
}

impl EventsIter<'_> {
    fn empty() -> Self {
        Self { inner: EventsIterInner::Empty }
    }
}

impl<'a> Iterator for EventsIter<'a> {
    type Item = (u64, &'a TracepointEvent);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EventsIterInner::Empty => None,
            EventsIterInner::Thread(range) => range.next().map(|(ts, event)| (*ts, event)),
            EventsIterInner::Index { keys, tracks } => {
                let tracks: &'a HashMap<Tid, ThreadTrack> = *tracks;
                keys.find_map(|(ts, tid)| {
                    tracks.get(tid).and_then(|track| track.get(ts)).map(|event| (*ts, event))
                })
            }
        }
    }
}

/// Scoped access to the buffer's contents
///
/// Holding the guard blocks every producer. Keep the critical section to a
/// lookup and one walk.
pub struct TracepointEventsGuard<'a> {
    store: MutexGuard<'a, EventStore>,
}

impl TracepointEventsGuard<'_> {
    /// All events of `tid`, ascending by timestamp. Accepts the synthetic
    /// aggregate ids. Unknown ids yield nothing.
    pub fn events_of_thread(&self, tid: Tid) -> EventsIter<'_> {
        self.store.thread_range(tid, WHOLE_TRACK)
    }

    /// Events of `tid` with `range.start <= timestamp < range.end`
    pub fn events_of_thread_in_range(&self, tid: Tid, range: Range<u64>) -> EventsIter<'_> {
        if range.start > range.end {
            return EventsIter::empty();
        }
        self.store.thread_range(tid, (Bound::Included(range.start), Bound::Excluded(range.end)))
    }

    /// All events of every thread of `pid`, ascending by timestamp
    pub fn events_of_process(&self, pid: Pid) -> EventsIter<'_> {
        match self.store.by_process.get(&pid) {
            Some(keys) => self.store.index_range(keys, WHOLE_TRACK),
            None => EventsIter::empty(),
        }
    }

    /// Thread ids that have at least one event, ascending. Never contains a
    /// reserved id.
    pub fn thread_ids(&self) -> Vec<Tid> {
        let mut tids: Vec<Tid> = self.store.by_thread.keys().copied().collect();
        tids.sort_unstable();
        tids
    }

    /// Number of distinct stored events
    pub fn num_events(&self) -> usize {
        self.store.num_events
    }

    pub fn is_empty(&self) -> bool {
        self.store.num_events == 0
    }
}

/// Thread-safe store of tracepoint events for one capture
///
/// Share it as `Arc<TracepointEventBuffer>` between capture threads and the
/// visualization thread.
#[derive(Debug, Default)]
pub struct TracepointEventBuffer {
    store: Mutex<EventStore>,
}

impl TracepointEventBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tracepoint firing and map it to its thread, process and
    /// aggregate tracks
    pub fn add_event(
        &self,
        timestamp: Timestamp,
        tracepoint_kind: TracepointKind,
        pid: Pid,
        tid: Tid,
        cpu: CpuId,
        is_same_pid_as_target: bool,
    ) {
        self.add(TracepointEvent { timestamp, tracepoint_kind, pid, tid, cpu, is_same_pid_as_target });
    }

    /// Events whose own thread id is reserved are dropped
    pub fn add(&self, event: TracepointEvent) {
        if event.tid.is_reserved() {
            warn!("Dropping tracepoint event at {} with reserved {}", event.timestamp, event.tid);
            return;
        }
        self.lock_store().insert(event);
    }

    /// Snapshot of the track of `tid`, ascending by timestamp
    ///
    /// Returns an empty vector for a thread that never had an event.
    pub fn get_events_for_thread(&self, tid: Tid) -> Vec<(u64, TracepointEvent)> {
        self.lock().events_of_thread(tid).map(|(ts, event)| (ts, *event)).collect()
    }

    /// Acquire the buffer lock for a lookup-then-iterate sequence
    pub fn lock(&self) -> TracepointEventsGuard<'_> {
        TracepointEventsGuard { store: self.lock_store() }
    }

    pub fn num_events(&self) -> usize {
        self.lock_store().num_events
    }

    pub fn thread_ids(&self) -> Vec<Tid> {
        self.lock().thread_ids()
    }

    /// Drop every event (start of a new capture)
    pub fn clear(&self) {
        let mut store = self.lock_store();
        debug!("Clearing tracepoint buffer ({} events)", store.num_events);
        *store = EventStore::default();
    }

    // Inserts cannot panic halfway through, so a poisoned store is still consistent.
    fn lock_store(&self) -> MutexGuard<'_, EventStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const TARGET: Pid = Pid(100);
    const OTHER: Pid = Pid(200);

    fn add(buffer: &TracepointEventBuffer, ts: u64, kind: u64, pid: Pid, tid: i32) {
        buffer.add_event(Timestamp(ts), TracepointKind(kind), pid, Tid(tid), CpuId(0), pid == TARGET);
    }

    fn timestamps(events: &[(u64, TracepointEvent)]) -> Vec<u64> {
        events.iter().map(|(ts, _)| *ts).collect()
    }

    #[test]
    fn test_events_sorted_by_timestamp() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 30, 1, TARGET, 5);
        add(&buffer, 10, 1, TARGET, 5);
        add(&buffer, 20, 1, TARGET, 5);

        let events = buffer.get_events_for_thread(Tid(5));
        assert_eq!(timestamps(&events), vec![10, 20, 30]);
    }

    #[test]
    fn test_colliding_timestamp_last_write_wins() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 10, 1, TARGET, 5);
        add(&buffer, 5, 1, TARGET, 5);
        add(&buffer, 10, 2, TARGET, 5);

        let events = buffer.get_events_for_thread(Tid(5));
        assert_eq!(timestamps(&events), vec![5, 10]);
        assert_eq!(events[1].1.tracepoint_kind, TracepointKind(2));
        assert_eq!(buffer.num_events(), 2);
    }

    #[test]
    fn test_unknown_thread_is_empty() {
        let buffer = TracepointEventBuffer::new();
        assert!(buffer.get_events_for_thread(Tid(42)).is_empty());

        add(&buffer, 1, 1, TARGET, 5);
        assert!(buffer.get_events_for_thread(Tid(42)).is_empty());
        assert!(buffer.get_events_for_thread(Tid::INVALID).is_empty());
    }

    #[test]
    fn test_target_process_bucket_only_holds_target_events() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 1, 1, TARGET, 5);
        add(&buffer, 2, 1, OTHER, 7);
        add(&buffer, 3, 1, TARGET, 6);

        let target = buffer.get_events_for_thread(Tid::TARGET_PROCESS);
        assert_eq!(timestamps(&target), vec![1, 3]);
        assert!(target.iter().all(|(_, e)| e.is_same_pid_as_target));

        let all = buffer.get_events_for_thread(Tid::ALL_PROCESSES);
        assert_eq!(timestamps(&all), vec![1, 2, 3]);
    }

    #[test]
    fn test_aggregate_keeps_same_timestamp_from_different_threads() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 10, 1, TARGET, 5);
        add(&buffer, 10, 2, TARGET, 6);

        let all = buffer.get_events_for_thread(Tid::ALL_PROCESSES);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.tid, Tid(5));
        assert_eq!(all[1].1.tid, Tid(6));
    }

    #[test]
    fn test_overwrite_moves_event_between_indices() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 10, 1, TARGET, 5);
        // Same thread and timestamp, now attributed to another process
        add(&buffer, 10, 2, OTHER, 5);

        let guard = buffer.lock();
        assert_eq!(guard.events_of_thread(Tid::TARGET_PROCESS).count(), 0);
        assert_eq!(guard.events_of_process(TARGET).count(), 0);
        assert_eq!(guard.events_of_process(OTHER).count(), 1);
        assert_eq!(guard.events_of_thread(Tid::ALL_PROCESSES).count(), 1);
        assert_eq!(guard.num_events(), 1);
    }

    #[test]
    fn test_range_query() {
        let buffer = TracepointEventBuffer::new();
        for ts in [5, 10, 15, 20, 25] {
            add(&buffer, ts, 1, TARGET, 5);
        }

        let guard = buffer.lock();
        let in_range: Vec<u64> =
            guard.events_of_thread_in_range(Tid(5), 10..20).map(|(ts, _)| ts).collect();
        assert_eq!(in_range, vec![10, 15]);

        let aggregate: Vec<u64> = guard
            .events_of_thread_in_range(Tid::TARGET_PROCESS, 15..26)
            .map(|(ts, _)| ts)
            .collect();
        assert_eq!(aggregate, vec![15, 20, 25]);

        #[allow(clippy::reversed_empty_ranges)]
        let inverted = guard.events_of_thread_in_range(Tid(5), 20..10).count();
        assert_eq!(inverted, 0);
    }

    #[test]
    fn test_events_of_process_spans_threads() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 3, 1, OTHER, 8);
        add(&buffer, 1, 1, OTHER, 7);
        add(&buffer, 2, 1, TARGET, 5);

        let guard = buffer.lock();
        let tids: Vec<Tid> = guard.events_of_process(OTHER).map(|(_, e)| e.tid).collect();
        assert_eq!(tids, vec![Tid(7), Tid(8)]);
        assert_eq!(guard.events_of_process(Pid(999)).count(), 0);
    }

    #[test]
    fn test_reserved_tid_is_rejected() {
        let buffer = TracepointEventBuffer::new();
        buffer.add_event(
            Timestamp(1),
            TracepointKind(1),
            OTHER,
            Tid::TARGET_PROCESS,
            CpuId(0),
            false,
        );
        add(&buffer, 2, 1, TARGET, Tid::ALL_PROCESSES.0);
        add(&buffer, 3, 1, TARGET, Tid::INVALID.0);

        assert_eq!(buffer.num_events(), 0);
        assert!(buffer.thread_ids().is_empty());
        assert!(buffer.get_events_for_thread(Tid::TARGET_PROCESS).is_empty());
        assert!(buffer.get_events_for_thread(Tid::ALL_PROCESSES).is_empty());
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let buffer = Arc::new(TracepointEventBuffer::new());
        add(&buffer, 1, 1, TARGET, 5);

        let holder = Arc::clone(&buffer);
        let crashed = thread::spawn(move || {
            let _guard = holder.lock();
            panic!("capture thread died holding the buffer");
        })
        .join();
        assert!(crashed.is_err());

        add(&buffer, 2, 1, TARGET, 5);
        assert_eq!(timestamps(&buffer.get_events_for_thread(Tid(5))), vec![1, 2]);
        assert_eq!(buffer.num_events(), 2);
    }

    #[test]
    fn test_thread_ids_and_clear() {
        let buffer = TracepointEventBuffer::new();
        add(&buffer, 1, 1, TARGET, 9);
        add(&buffer, 1, 1, TARGET, 3);
        assert_eq!(buffer.thread_ids(), vec![Tid(3), Tid(9)]);

        buffer.clear();
        assert_eq!(buffer.num_events(), 0);
        assert!(buffer.lock().is_empty());
        assert!(buffer.get_events_for_thread(Tid::ALL_PROCESSES).is_empty());
    }

    #[test]
    fn test_concurrent_producers_lose_nothing() {
        const PRODUCERS: u64 = 8;
        const EVENTS_PER_PRODUCER: u64 = 500;

        let buffer = Arc::new(TracepointEventBuffer::new());
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    // Producers interleave timestamps on two shared threads
                    for i in (0..EVENTS_PER_PRODUCER).rev() {
                        let ts = i * PRODUCERS + producer;
                        let tid = i32::try_from(ts % 2).unwrap();
                        add(&buffer, ts, producer, TARGET, tid);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let total = usize::try_from(PRODUCERS * EVENTS_PER_PRODUCER).unwrap();
        assert_eq!(buffer.num_events(), total);

        let mut seen = 0;
        for tid in [Tid(0), Tid(1)] {
            let events = buffer.get_events_for_thread(tid);
            assert!(events.windows(2).all(|w| w[0].0 < w[1].0));
            assert!(events.iter().all(|(ts, e)| e.tid == tid && e.timestamp.0 == *ts));
            seen += events.len();
        }
        assert_eq!(seen, total);
        assert_eq!(buffer.get_events_for_thread(Tid::TARGET_PROCESS).len(), total);
    }

    #[test]
    fn test_reader_holds_lock_while_producers_run() {
        let buffer = Arc::new(TracepointEventBuffer::new());
        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for ts in 0..2_000 {
                    add(&buffer, ts, 1, TARGET, 5);
                }
            })
        };

        for _ in 0..50 {
            let guard = buffer.lock();
            let walked = guard.events_of_thread(Tid(5)).count();
            assert_eq!(walked, guard.num_events());
        }
        writer.join().unwrap();
        assert_eq!(buffer.get_events_for_thread(Tid(5)).len(), 2_000);
    }
}
