// Time conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use std::ops::AddAssign;

use crate::domain::Tid;
use crate::event_buffer::TracepointEvent;

/// Per-producer capture counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub records: u64,
    pub target_process_events: u64,
    pub other_process_events: u64,
    pub reserved_tid_dropped: u64,
    pub unknown_record_type: u64,
}

impl CaptureStats {
    /// Records that made it into the buffer
    pub fn stored(&self) -> u64 {
        self.target_process_events + self.other_process_events
    }
}

impl AddAssign for CaptureStats {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.target_process_events += other.target_process_events;
        self.other_process_events += other.other_process_events;
        self.reserved_tid_dropped += other.reserved_tid_dropped;
        self.unknown_record_type += other.unknown_record_type;
    }
}

/// Display a single tracepoint event in headless mode
pub fn display_tracepoint_event(event: &TracepointEvent) {
    let marker = if event.is_same_pid_as_target { "*" } else { " " };
    println!(
        "[TRACEPOINT]{marker} {} pid={} tid={} cpu={} {}",
        event.timestamp, event.pid.0, event.tid.0, event.cpu.0, event.tracepoint_kind
    );
}

/// Display one ordered track
pub fn display_track(tid: Tid, events: &[(u64, TracepointEvent)]) {
    println!("{tid}: {} events", events.len());
    for (_, event) in events {
        display_tracepoint_event(event);
    }
}

/// Display capture statistics
pub fn display_statistics(stats: &CaptureStats) {
    let target_share = if stats.stored() > 0 {
        stats.target_process_events as f64 / stats.stored() as f64 * 100.0
    } else {
        0.0
    };
    eprintln!(
        "stats: records={} stored={} target={} ({target_share:.1}%) other={} dropped_reserved_tid={} unknown_type={}",
        stats.records,
        stats.stored(),
        stats.target_process_events,
        stats.other_process_events,
        stats.reserved_tid_dropped,
        stats.unknown_record_type,
    );
}
