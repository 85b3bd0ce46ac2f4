//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a TID where a
//! PID is expected, and make function signatures more expressive.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracescope_common::{
    is_reserved_tid, ALL_THREADS_OF_ALL_PROCESSES_TID, INVALID_THREAD_ID,
    TARGET_PROCESS_THREADS_TID,
};

/// Process ID
///
/// Represents a process ID in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<i32> for Pid {
    fn from(pid: i32) -> Self {
        Pid(pid)
    }
}

impl From<Pid> for i32 {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}

/// Thread ID
///
/// Represents a thread ID in the system. Negative values are reserved:
/// `-1` means "no thread" and the others name synthetic aggregate tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tid(pub i32);

impl Tid {
    /// No thread selected
    pub const INVALID: Tid = Tid(INVALID_THREAD_ID);
    /// Every thread of the process under capture
    pub const TARGET_PROCESS: Tid = Tid(TARGET_PROCESS_THREADS_TID);
    /// Every thread of every process
    pub const ALL_PROCESSES: Tid = Tid(ALL_THREADS_OF_ALL_PROCESSES_TID);

    /// Returns true if this id does not name a kernel thread
    #[must_use]
    pub fn is_reserved(self) -> bool {
        is_reserved_tid(self.0)
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Tid::INVALID => write!(f, "TID:none"),
            Tid::TARGET_PROCESS => write!(f, "TID:target-process"),
            Tid::ALL_PROCESSES => write!(f, "TID:all"),
            Tid(tid) => write!(f, "TID:{tid}"),
        }
    }
}

impl From<i32> for Tid {
    fn from(tid: i32) -> Self {
        Tid(tid)
    }
}

/// CPU ID
///
/// Represents a CPU core ID (0, 1, 2, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuId(pub i32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU:{}", self.0)
    }
}

/// Tracepoint kind
///
/// Opaque handle (the hash of `category:name`) identifying which tracepoint
/// fired. Only ever compared for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TracepointKind(pub u64);

impl fmt::Display for TracepointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracepoint#{:016x}", self.0)
    }
}

/// Timestamp in nanoseconds
///
/// Represents an absolute point in time as nanoseconds since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Convert to seconds (f64)
    #[allow(clippy::cast_precision_loss)]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }

    /// Convert to microseconds (u64)
    pub fn as_micros(self) -> u64 {
        self.0 / 1_000
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_seconds())
    }
}
