//! # Session Data Manager
//!
//! Client-side source of truth for what is selected, visible, highlighted or
//! annotated in a capture session, and for the list of known processes.
//!
//! Every method must be called on the thread the manager was created for
//! (see [`ThreadAffinity`]). Nothing here locks.
//!
//! ## Capture Boundaries
//!
//! [`DataManager::reset_capture_state`] starts a fresh capture: selections,
//! the visibility filter and all focus state are cleared. The process table,
//! the `collect_thread_states` option and [`UserDefinedCaptureData`] survive;
//! the latter is only reset by [`DataManager::clear_user_defined_capture_data`].

use log::debug;
use std::collections::HashSet;

use super::process_store::{ProcessData, ProcessHandle, ProcessInfo, ProcessStore};
use super::selection::{FunctionInfo, FunctionInfoSet, TracepointInfo, TracepointInfoSet};
use super::text_box::{TextBoxId, TextBoxRegistry};
use super::thread_affinity::ThreadAffinity;
use super::user_data::UserDefinedCaptureData;
use crate::domain::{Pid, Tid};

pub use tracescope_common::INVALID_FUNCTION_ID;

#[derive(Debug)]
pub struct DataManager {
    affinity: ThreadAffinity,
    process_map: ProcessStore,
    selected_functions: FunctionInfoSet,
    visible_function_ids: HashSet<u64>,
    highlighted_function_id: u64,
    selected_tracepoints: TracepointInfoSet,
    selected_thread_id: i32,
    selected_text_box: Option<TextBoxId>,
    user_defined_capture_data: UserDefinedCaptureData,
    collect_thread_states: bool,
}

impl DataManager {
    /// Create a manager owned by the calling thread
    #[must_use]
    pub fn new() -> Self {
        Self::with_owner_thread(ThreadAffinity::current())
    }

    #[must_use]
    pub fn with_owner_thread(affinity: ThreadAffinity) -> Self {
        Self {
            affinity,
            process_map: ProcessStore::new(),
            selected_functions: FunctionInfoSet::new(),
            visible_function_ids: HashSet::new(),
            highlighted_function_id: INVALID_FUNCTION_ID,
            selected_tracepoints: TracepointInfoSet::new(),
            selected_thread_id: Tid::INVALID.0,
            selected_text_box: None,
            user_defined_capture_data: UserDefinedCaptureData::new(),
            collect_thread_states: false,
        }
    }

    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    // =========================================================================
    // Processes
    // =========================================================================

    /// Replace the process table with a fresh snapshot
    ///
    /// Handles of processes that are not in `process_infos` go stale.
    pub fn update_process_infos(&mut self, process_infos: &[ProcessInfo]) {
        self.affinity.check();
        let update = self.process_map.replace_all(process_infos);
        debug!(
            "Process table: {} added, {} updated, {} removed ({} total)",
            update.added,
            update.updated,
            update.removed,
            self.process_map.len()
        );
    }

    pub fn get_mutable_process_by_pid(&mut self, pid: Pid) -> Option<&mut ProcessData> {
        self.affinity.check();
        self.process_map.get_by_pid_mut(pid)
    }

    pub fn get_process_by_pid(&self, pid: Pid) -> Option<&ProcessData> {
        self.affinity.check();
        self.process_map.get_by_pid(pid)
    }

    /// Handle that can be kept across table updates
    pub fn process_handle(&self, pid: Pid) -> Option<ProcessHandle> {
        self.affinity.check();
        self.process_map.handle(pid)
    }

    pub fn process(&self, handle: ProcessHandle) -> Option<&ProcessData> {
        self.affinity.check();
        self.process_map.get(handle)
    }

    pub fn process_mut(&mut self, handle: ProcessHandle) -> Option<&mut ProcessData> {
        self.affinity.check();
        self.process_map.get_mut(handle)
    }

    pub fn processes(&self) -> impl Iterator<Item = &ProcessData> {
        self.affinity.check();
        self.process_map.iter()
    }

    pub fn num_processes(&self) -> usize {
        self.affinity.check();
        self.process_map.len()
    }

    // =========================================================================
    // Functions
    // =========================================================================

    pub fn select_function(&mut self, function: &FunctionInfo) {
        self.affinity.check();
        self.selected_functions.insert(function);
    }

    pub fn deselect_function(&mut self, function: &FunctionInfo) {
        self.affinity.check();
        self.selected_functions.remove(function);
    }

    pub fn clear_selected_functions(&mut self) {
        self.affinity.check();
        self.selected_functions.clear();
    }

    pub fn is_function_selected(&self, function: &FunctionInfo) -> bool {
        self.affinity.check();
        self.selected_functions.contains(function)
    }

    pub fn get_selected_functions(&self) -> Vec<FunctionInfo> {
        self.affinity.check();
        self.selected_functions.to_sorted_vec()
    }

    pub fn set_visible_function_ids(&mut self, visible_function_ids: HashSet<u64>) {
        self.affinity.check();
        self.visible_function_ids = visible_function_ids;
    }

    pub fn is_function_visible(&self, function_address: u64) -> bool {
        self.affinity.check();
        self.visible_function_ids.contains(&function_address)
    }

    /// `INVALID_FUNCTION_ID` clears the highlight
    pub fn set_highlighted_function_id(&mut self, highlighted_function_id: u64) {
        self.affinity.check();
        self.highlighted_function_id = highlighted_function_id;
    }

    pub fn highlighted_function_id(&self) -> u64 {
        self.affinity.check();
        self.highlighted_function_id
    }

    /// The highlighted function id, `None` for the sentinel
    pub fn highlighted_function(&self) -> Option<u64> {
        Some(self.highlighted_function_id()).filter(|&id| id != INVALID_FUNCTION_ID)
    }

    // =========================================================================
    // Threads and focus
    // =========================================================================

    /// `-1` clears the selection
    pub fn set_selected_thread_id(&mut self, thread_id: i32) {
        self.affinity.check();
        self.selected_thread_id = thread_id;
    }

    pub fn selected_thread_id(&self) -> i32 {
        self.affinity.check();
        self.selected_thread_id
    }

    pub fn set_selected_text_box(&mut self, text_box: Option<TextBoxId>) {
        self.affinity.check();
        self.selected_text_box = text_box;
    }

    /// The remembered text box, without checking it still exists
    pub fn selected_text_box(&self) -> Option<TextBoxId> {
        self.affinity.check();
        self.selected_text_box
    }

    /// The remembered text box if `registry` still knows it
    pub fn selected_live_text_box(&self, registry: &impl TextBoxRegistry) -> Option<TextBoxId> {
        self.selected_text_box().filter(|&id| registry.contains_text_box(id))
    }

    /// Forget `text_box` if it is the selected one. The visualization layer
    /// calls this before destroying a text box.
    pub fn on_text_box_destroyed(&mut self, text_box: TextBoxId) {
        self.affinity.check();
        if self.selected_text_box == Some(text_box) {
            self.selected_text_box = None;
        }
    }

    // =========================================================================
    // Tracepoints
    // =========================================================================

    pub fn select_tracepoint(&mut self, info: &TracepointInfo) {
        self.affinity.check();
        if !self.selected_tracepoints.contains(info) {
            self.selected_tracepoints.insert(info.clone());
        }
    }

    pub fn deselect_tracepoint(&mut self, info: &TracepointInfo) {
        self.affinity.check();
        self.selected_tracepoints.remove(info);
    }

    pub fn is_tracepoint_selected(&self, info: &TracepointInfo) -> bool {
        self.affinity.check();
        self.selected_tracepoints.contains(info)
    }

    pub fn selected_tracepoints(&self) -> &TracepointInfoSet {
        self.affinity.check();
        &self.selected_tracepoints
    }

    // =========================================================================
    // User-defined capture data
    // =========================================================================

    pub fn enable_frame_track(&mut self, function: &FunctionInfo) {
        self.affinity.check();
        self.user_defined_capture_data.insert_frame_track(function);
    }

    pub fn disable_frame_track(&mut self, function: &FunctionInfo) {
        self.affinity.check();
        self.user_defined_capture_data.erase_frame_track(function);
    }

    pub fn is_frame_track_enabled(&self, function: &FunctionInfo) -> bool {
        self.affinity.check();
        self.user_defined_capture_data.contains_frame_track(function)
    }

    pub fn clear_user_defined_capture_data(&mut self) {
        self.affinity.check();
        self.user_defined_capture_data.clear();
    }

    pub fn set_user_defined_capture_data(&mut self, data: UserDefinedCaptureData) {
        self.affinity.check();
        self.user_defined_capture_data = data;
    }

    pub fn user_defined_capture_data(&self) -> &UserDefinedCaptureData {
        self.affinity.check();
        &self.user_defined_capture_data
    }

    pub fn mutable_user_defined_capture_data(&mut self) -> &mut UserDefinedCaptureData {
        self.affinity.check();
        &mut self.user_defined_capture_data
    }

    // =========================================================================
    // Capture options and lifecycle
    // =========================================================================

    pub fn set_collect_thread_states(&mut self, collect_thread_states: bool) {
        self.affinity.check();
        self.collect_thread_states = collect_thread_states;
    }

    pub fn collect_thread_states(&self) -> bool {
        self.affinity.check();
        self.collect_thread_states
    }

    /// Clear capture-scoped state for a new capture
    pub fn reset_capture_state(&mut self) {
        self.affinity.check();
        debug!(
            "Resetting capture state ({} functions, {} tracepoints selected)",
            self.selected_functions.len(),
            self.selected_tracepoints.len()
        );
        self.selected_functions.clear();
        self.selected_tracepoints.clear();
        self.visible_function_ids.clear();
        self.highlighted_function_id = INVALID_FUNCTION_ID;
        self.selected_thread_id = Tid::INVALID.0;
        self.selected_text_box = None;
    }
}

impl Default for DataManager {
    fn default() -> Self {
        Self::new()
    }
}
