//! User annotations that outlive a single capture

use super::selection::{FunctionInfo, FunctionInfoSet};

/// Choices the user made about how captures are presented
///
/// Starting a new capture does not touch this; only an explicit clear does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDefinedCaptureData {
    frame_track_functions: FunctionInfoSet,
}

impl UserDefinedCaptureData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_frame_track(&mut self, function: &FunctionInfo) {
        self.frame_track_functions.insert(function);
    }

    pub fn erase_frame_track(&mut self, function: &FunctionInfo) {
        self.frame_track_functions.remove(function);
    }

    pub fn contains_frame_track(&self, function: &FunctionInfo) -> bool {
        self.frame_track_functions.contains(function)
    }

    pub fn frame_track_functions(&self) -> &FunctionInfoSet {
        &self.frame_track_functions
    }

    pub fn clear(&mut self) {
        self.frame_track_functions.clear();
    }
}
