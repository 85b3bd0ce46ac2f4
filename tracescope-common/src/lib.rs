//! # Shared Data Structures (capture threads ↔ client core)
//!
//! Defines the raw record layout written by capture threads and the reserved
//! identifier values understood by every layer of the client. All record types
//! use `#[repr(C)]` so producers that fill them from foreign memory (perf
//! ring buffers, shared pages) agree on the layout.
//!
//! ## Key Types
//!
//! - [`TracepointRecord`] - One tracepoint firing as delivered by a capture thread
//!
//! ## Reserved Identifiers
//!
//! Thread ids below zero never name a kernel thread. They are used for the
//! "none" sentinel and for the synthetic aggregate buckets of the event
//! buffer:
//!
//! | Value | Meaning                                         |
//! |-------|-------------------------------------------------|
//! | `-1`  | [`INVALID_THREAD_ID`], no thread selected        |
//! | `-2`  | [`TARGET_PROCESS_THREADS_TID`], target process   |
//! | `-3`  | [`ALL_THREADS_OF_ALL_PROCESSES_TID`], everything |

#![no_std]

// ============================================================================
// Record Kind Constants
// ============================================================================

/// **Tracepoint**: a kernel tracepoint fired on some thread
///
/// Emitted by: capture threads, one record per firing
pub const RECORD_TRACEPOINT: u32 = 1;

// ============================================================================
// Reserved Identifiers
// ============================================================================

/// Sentinel thread id meaning "no thread"
pub const INVALID_THREAD_ID: i32 = -1;

/// Synthetic thread id under which every event of the target process is
/// also queryable
pub const TARGET_PROCESS_THREADS_TID: i32 = -2;

/// Synthetic thread id under which every event, of any process, is also
/// queryable
pub const ALL_THREADS_OF_ALL_PROCESSES_TID: i32 = -3;

/// Sentinel function id meaning "no function". Never a real function address.
pub const INVALID_FUNCTION_ID: u64 = 0;

/// Returns true if `tid` is one of the reserved, non-kernel thread ids.
#[must_use]
pub const fn is_reserved_tid(tid: i32) -> bool {
    tid < 0
}

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Tracepoint firing as written by a capture thread
///
/// **Memory Layout**: `#[repr(C)]`, 40 bytes, no implicit padding
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "user", derive(serde::Serialize, serde::Deserialize))]
pub struct TracepointRecord {
    /// Timestamp in nanoseconds (monotonic clock, relative to boot)
    ///
    /// Used only as an ordering key by the client.
    pub timestamp_ns: u64,

    /// Hash of the tracepoint's `category:name`, an opaque handle
    pub tracepoint_hash: u64,

    /// Record kind (see `RECORD_*` constants)
    pub record_type: u32,

    /// Process ID (TGID in Linux terms)
    pub pid: i32,

    /// Thread ID (PID in Linux terms, TID in userspace)
    pub tid: i32,

    /// CPU core the tracepoint fired on (0-based)
    pub cpu: i32,

    /// Padding for 8-byte alignment
    #[allow(clippy::pub_underscore_fields)]
    #[cfg_attr(feature = "user", serde(skip))]
    pub _padding: [u8; 8],
}

impl TracepointRecord {
    /// Build a tracepoint record with zeroed padding
    #[must_use]
    pub const fn tracepoint(
        timestamp_ns: u64,
        tracepoint_hash: u64,
        pid: i32,
        tid: i32,
        cpu: i32,
    ) -> Self {
        Self {
            timestamp_ns,
            tracepoint_hash,
            record_type: RECORD_TRACEPOINT,
            pid,
            tid,
            cpu,
            _padding: [0; 8],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout_size() {
        assert_eq!(core::mem::size_of::<TracepointRecord>(), 40);
        assert_eq!(core::mem::align_of::<TracepointRecord>(), 8);
    }

    #[test]
    fn test_reserved_ids_are_distinct() {
        assert_ne!(INVALID_THREAD_ID, TARGET_PROCESS_THREADS_TID);
        assert_ne!(TARGET_PROCESS_THREADS_TID, ALL_THREADS_OF_ALL_PROCESSES_TID);
        assert!(is_reserved_tid(INVALID_THREAD_ID));
        assert!(is_reserved_tid(ALL_THREADS_OF_ALL_PROCESSES_TID));
        assert!(!is_reserved_tid(0));
    }

    #[test]
    fn test_tracepoint_constructor_sets_kind() {
        let record = TracepointRecord::tracepoint(10, 0xabc, 100, 101, 2);
        assert_eq!(record.record_type, RECORD_TRACEPOINT);
        assert_eq!(record.tid, 101);
        assert_eq!(record._padding, [0; 8]);
    }
}
