//! Session state owned by the visualization thread
//!
//! - `data_manager`: selections, focus, process table, persisted annotations
//! - `thread_affinity`: the single-owner-thread token the manager checks
//! - `process_store`: reference-stable process table
//! - `selection`: function/tracepoint descriptors and identity-keyed sets
//! - `user_data`: annotations that survive across captures
//! - `text_box`: non-owning references into the visualization layer

pub mod data_manager;
pub mod process_store;
pub mod selection;
pub mod text_box;
pub mod thread_affinity;
pub mod user_data;

pub use data_manager::{DataManager, INVALID_FUNCTION_ID};
pub use process_store::{ProcessData, ProcessHandle, ProcessInfo, ProcessStore, ProcessTableUpdate};
pub use selection::{FunctionInfo, FunctionInfoSet, TracepointInfo, TracepointInfoSet};
pub use text_box::{TextBoxId, TextBoxRegistry};
pub use thread_affinity::ThreadAffinity;
pub use user_data::UserDefinedCaptureData;
