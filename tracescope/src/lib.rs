//! # tracescope - Client-Side Capture Core
//!
//! tracescope holds the state a profiler client keeps while a capture runs:
//! a thread-safe buffer of kernel tracepoint events, written by many producer
//! threads, and the UI-owned session state (process table, selections,
//! focused thread, user-defined capture options).
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │           Producers (capture service / load generator)       │
//! └──────────────────────┬───────────────────────────────────────┘
//!                        │ TracepointRecord
//!                        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  EventProcessor (one per producer thread)                    │
//! │  • flags events of the target process                        │
//! │  • drops records with reserved thread ids                    │
//! └──────────────────────┬───────────────────────────────────────┘
//!                        │ add_event
//!                        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  TracepointEventBuffer (Mutex)                               │
//! │  per-thread tracks ordered by timestamp                      │
//! │  + target-process and all-process aggregates                 │
//! └──────────────────────┬───────────────────────────────────────┘
//!                        │ lock() / get_events_for_thread
//!                        ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Session thread                                              │
//! │  DataManager ◀── ProcessRefresher (crossbeam snapshots)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`event_buffer`]: the shared tracepoint event store
//! - [`session`]: `DataManager` and its building blocks
//!   - `process_store`: generation-checked process table
//!   - `selection`: function and tracepoint identities
//!   - `thread_affinity`: owner-thread checks
//! - [`capture`]: record routing, statistics, and the synthetic producer
//! - [`process_lookup`]: `/proc` enumeration
//! - [`process_refresh`]: background process snapshots
//! - [`cli`]: command-line arguments
//! - [`domain`]: core types (Pid, Tid, `CpuId`, `TracepointKind`) and errors
//!
//! ## Reserved Thread Ids
//!
//! Negative thread ids never name kernel threads:
//!
//! - `-1`: no thread
//! - `-2`: every thread of the target process
//! - `-3`: every thread of every process

pub mod capture;
pub mod cli;
pub mod domain;
pub mod event_buffer;
pub mod process_lookup;
pub mod process_refresh;
pub mod session;
