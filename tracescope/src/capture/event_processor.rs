//! # Event Processing
//!
//! Consumes raw records from a capture thread and routes them into the shared
//! [`TracepointEventBuffer`].
//!
//! ## Record Routing
//!
//! - `RECORD_TRACEPOINT` → `TracepointEventBuffer::add_event`, flagged with
//!   whether the record's process is the capture target
//! - anything else → counted and dropped with a warning
//!
//! Records whose thread id is reserved (negative) are dropped: those ids name
//! the synthetic aggregate tracks, not kernel threads.
//!
//! Each capture thread owns its own processor; the buffer is the only shared
//! state.

use log::warn;
use std::sync::Arc;
use tracescope_common::{TracepointRecord, RECORD_TRACEPOINT};

use super::event_display::{display_tracepoint_event, CaptureStats};
use crate::domain::{CpuId, Pid, Tid, Timestamp, TracepointKind};
use crate::event_buffer::{TracepointEvent, TracepointEventBuffer};

/// Encapsulates record processing logic and per-producer counters
pub struct EventProcessor {
    // Configuration
    headless: bool,
    target_pid: Pid,

    // Mutable state
    pub stats: CaptureStats,

    // Shared output
    buffer: Arc<TracepointEventBuffer>,
}

impl EventProcessor {
    #[must_use]
    pub fn new(target_pid: Pid, buffer: Arc<TracepointEventBuffer>, headless: bool) -> Self {
        Self { headless, target_pid, stats: CaptureStats::default(), buffer }
    }

    pub fn target_pid(&self) -> Pid {
        self.target_pid
    }

    /// Process a single record
    pub fn process_record(&mut self, record: &TracepointRecord) {
        self.stats.records += 1;

        match record.record_type {
            RECORD_TRACEPOINT => self.handle_tracepoint(record),
            other => {
                self.stats.unknown_record_type += 1;
                warn!("Unknown record type: {other}");
            }
        }
    }

    pub fn process_records<'r>(&mut self, records: impl IntoIterator<Item = &'r TracepointRecord>) {
        for record in records {
            self.process_record(record);
        }
    }

    fn handle_tracepoint(&mut self, record: &TracepointRecord) {
        let tid = Tid(record.tid);
        if tid.is_reserved() {
            self.stats.reserved_tid_dropped += 1;
            warn!("Dropping tracepoint record with reserved {tid}");
            return;
        }

        let pid = Pid(record.pid);
        let is_same_pid_as_target = pid == self.target_pid;
        if is_same_pid_as_target {
            self.stats.target_process_events += 1;
        } else {
            self.stats.other_process_events += 1;
        }

        let event = TracepointEvent {
            timestamp: Timestamp(record.timestamp_ns),
            tracepoint_kind: TracepointKind(record.tracepoint_hash),
            pid,
            tid,
            cpu: CpuId(record.cpu),
            is_same_pid_as_target,
        };

        if self.headless {
            display_tracepoint_event(&event);
        }

        self.buffer.add(event);
    }
}
