//! CLI argument definitions

use clap::Parser;

use crate::session::TracepointInfo;

#[derive(Parser)]
#[command(
    name = "tracescope",
    about = "Ingest tracepoint events from concurrent producers and inspect per-thread tracks",
    after_help = "\
EXAMPLES:
    tracescope                               Capture synthetic events for this process
    tracescope my-app                        Target a process by name
    tracescope --pid 1234 --thread 1240      Show one thread's track
    tracescope --tracepoint sched:sched_wakeup --json"
)]
pub struct Args {
    /// Process name to target (defaults to tracescope itself)
    #[arg(value_name = "PROCESS")]
    pub process: Option<String>,

    /// Process ID to target
    #[arg(short, long, conflicts_with = "process")]
    pub pid: Option<i32>,

    /// Number of concurrent producer threads
    #[arg(long, default_value = "4")]
    pub producers: usize,

    /// Events emitted by each producer
    #[arg(long, default_value = "10000")]
    pub events: usize,

    /// Tracepoint to capture, as CATEGORY:NAME (repeatable)
    #[arg(long = "tracepoint", value_name = "CATEGORY:NAME", value_parser = parse_tracepoint)]
    pub tracepoints: Vec<TracepointInfo>,

    /// Thread track to display (defaults to all threads of the target process)
    #[arg(short, long)]
    pub thread: Option<i32>,

    /// Maximum number of events to display
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// Record thread states alongside tracepoints
    #[arg(long)]
    pub collect_thread_states: bool,

    /// Process table refresh interval in milliseconds
    #[arg(long, default_value = "250")]
    pub refresh_ms: u64,

    /// Print every event as it is ingested
    #[arg(long)]
    pub headless: bool,

    /// Print the displayed track as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Parse `category:name`
///
/// # Errors
/// Returns a message if either part is missing.
pub fn parse_tracepoint(value: &str) -> Result<TracepointInfo, String> {
    match value.split_once(':') {
        Some((category, name)) if !category.is_empty() && !name.is_empty() => {
            Ok(TracepointInfo::new(category, name))
        }
        _ => Err(format!("expected CATEGORY:NAME, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tracepoint() {
        let info = parse_tracepoint("sched:sched_switch").unwrap();
        assert_eq!(info, TracepointInfo::new("sched", "sched_switch"));
        assert!(parse_tracepoint("sched").is_err());
        assert!(parse_tracepoint(":sched_switch").is_err());
        assert!(parse_tracepoint("sched:").is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["tracescope"]);
        assert_eq!(args.producers, 4);
        assert_eq!(args.events, 10_000);
        assert!(args.tracepoints.is_empty());
        assert!(args.thread.is_none());
    }

    #[test]
    fn test_repeated_tracepoints_and_conflict() {
        let args = Args::parse_from([
            "tracescope",
            "--tracepoint",
            "sched:sched_switch",
            "--tracepoint",
            "irq:irq_handler_entry",
        ]);
        assert_eq!(args.tracepoints.len(), 2);

        assert!(Args::try_parse_from(["tracescope", "app", "--pid", "1"]).is_err());
    }
}
