//! Producer side of the capture pipeline
//!
//! - `cpu_utils`: online CPU discovery
//! - `event_processor`: route raw records from capture threads into the buffer
//! - `event_display`: headless printing of events, tracks and statistics
//! - `load_generator`: synthetic tracepoint streams for demos and tests

pub mod cpu_utils;
pub mod event_display;
pub mod event_processor;
pub mod load_generator;

pub use cpu_utils::online_cpus;
pub use event_display::{display_statistics, display_track, display_tracepoint_event, CaptureStats};
pub use event_processor::EventProcessor;
pub use load_generator::{LoadGenerator, ThreadGroup};
