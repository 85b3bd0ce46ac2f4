//! Structured error types for tracescope
//!
//! The capture core itself has no error path: absence is a value and wrong-thread
//! access is a programming error. These errors belong to the outer surfaces
//! (process enumeration, CLI target resolution).

use super::types::Pid;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("No process matching '{0}' found")]
    NoMatchingProcess(String),

    #[error("Multiple processes match '{pattern}': {candidates}")]
    AmbiguousProcessName { pattern: String, candidates: String },

    #[error("Failed to parse {path}: {reason}")]
    ProcParseFailed { path: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    ProcReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_not_found_display() {
        let err = CaptureError::ProcessNotFound(Pid(1234));
        assert_eq!(err.to_string(), "Process PID:1234 not found");
    }

    #[test]
    fn test_ambiguous_process_display() {
        let err = CaptureError::AmbiguousProcessName {
            pattern: "server".to_string(),
            candidates: "12 (server-a), 13 (server-b)".to_string(),
        };
        assert!(err.to_string().contains("server"));
        assert!(err.to_string().contains("13 (server-b)"));
    }

    #[test]
    fn test_proc_parse_display() {
        let err = CaptureError::ProcParseFailed {
            path: "/proc/1/stat".to_string(),
            reason: "missing ')'".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to parse /proc/1/stat: missing ')'");
    }
}
