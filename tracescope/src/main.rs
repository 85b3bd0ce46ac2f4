//! # tracescope - Main Entry Point
//!
//! Drives one capture end to end:
//! - resolves the target process (`tracescope <PROCESS>`, `--pid`, or itself)
//! - keeps the process table fresh from a background refresher
//! - runs `--producers` capture threads that feed the shared event buffer
//! - prints the selected thread's track and capture statistics

// Main function is intentionally long for clarity
#![allow(clippy::too_many_lines)]

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracescope::capture::{
    display_statistics, display_track, online_cpus, CaptureStats, EventProcessor, LoadGenerator,
    ThreadGroup,
};
use tracescope::cli::Args;
use tracescope::domain::{CaptureError, CpuId, Pid, Tid, TracepointKind};
use tracescope::event_buffer::{TracepointEvent, TracepointEventBuffer};
use tracescope::process_lookup::{find_process_by_name, list_processes, list_threads, process_by_pid};
use tracescope::process_refresh::ProcessRefresher;
use tracescope::session::{DataManager, TracepointInfo};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

/// Processes besides the target that also emit events
const OTHER_PROCESSES: usize = 3;
const FIRST_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CaptureError>() {
        Some(
            CaptureError::ProcessNotFound(_)
            | CaptureError::NoMatchingProcess(_)
            | CaptureError::AmbiguousProcessName { .. },
        ) => EXIT_USAGE,
        _ if err.to_string().to_lowercase().contains("permission denied") => EXIT_NOPERM,
        _ => EXIT_ERROR,
    }
}

/// Resolve the capture target from CLI arguments.
///
/// - `tracescope my-app` - find process by name
/// - `tracescope --pid 1234` - explicit PID
/// - `tracescope` - capture against tracescope itself
fn resolve_target(args: &Args) -> Result<(Pid, String)> {
    if let Some(ref name) = args.process {
        let info = find_process_by_name(name)?;
        return Ok((info.pid, info.name));
    }

    if let Some(pid) = args.pid {
        let info = process_by_pid(Pid(pid))?;
        return Ok((info.pid, info.name));
    }

    let pid = i32::try_from(std::process::id()).context("Own pid does not fit a pid_t")?;
    Ok((Pid(pid), env!("CARGO_PKG_NAME").to_string()))
}

fn default_tracepoints() -> Vec<TracepointInfo> {
    vec![
        TracepointInfo::new("sched", "sched_switch"),
        TracepointInfo::new("sched", "sched_wakeup"),
    ]
}

/// Machine-readable form of the displayed track
#[derive(Serialize)]
struct TrackSummary<'a> {
    target_pid: Pid,
    target_name: &'a str,
    thread: Tid,
    total_events: usize,
    stats: StatsSummary,
    events: Vec<TracepointEvent>,
}

#[derive(Serialize)]
struct StatsSummary {
    records: u64,
    stored: u64,
    target_process_events: u64,
    other_process_events: u64,
    reserved_tid_dropped: u64,
}

impl From<&CaptureStats> for StatsSummary {
    fn from(stats: &CaptureStats) -> Self {
        Self {
            records: stats.records,
            stored: stats.stored(),
            target_process_events: stats.target_process_events,
            other_process_events: stats.other_process_events,
            reserved_tid_dropped: stats.reserved_tid_dropped,
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    let (target_pid, target_name) = resolve_target(&args)?;

    if !quiet {
        println!("tracescope v{}", env!("CARGO_PKG_VERSION"));
        println!("target: {target_name}");
        println!("pid: {target_pid}");
    }

    // ── Session state, owned by this thread ─────────────────────────────
    let mut data_manager = DataManager::new();
    data_manager.set_collect_thread_states(args.collect_thread_states);

    let tracepoints =
        if args.tracepoints.is_empty() { default_tracepoints() } else { args.tracepoints.clone() };
    for tracepoint in &tracepoints {
        data_manager.select_tracepoint(tracepoint);
    }
    let kinds: Vec<TracepointKind> =
        data_manager.selected_tracepoints().iter().map(TracepointInfo::kind).collect();

    // ── Process table ───────────────────────────────────────────────────
    let refresher =
        ProcessRefresher::spawn(Duration::from_millis(args.refresh_ms), list_processes);
    match refresher.snapshots().recv_timeout(FIRST_SNAPSHOT_TIMEOUT) {
        Ok(snapshot) => data_manager.update_process_infos(&snapshot),
        Err(e) => warn!("No process snapshot yet: {e}"),
    }

    if !quiet {
        println!("processes: {}", data_manager.num_processes());
        if let Some(process) = data_manager.get_process_by_pid(target_pid) {
            let bitness = if process.is_64_bit() { "64-bit" } else { "32-bit" };
            println!("command: {} ({bitness})", process.command_line());
        }
        println!("thread states: {}", data_manager.collect_thread_states());
    }

    // ── Producers ───────────────────────────────────────────────────────
    let target_tids = list_threads(target_pid).unwrap_or_else(|e| {
        warn!("Failed to list threads of {target_pid}: {e}");
        vec![Tid(target_pid.0)]
    });
    let mut groups = vec![ThreadGroup { pid: target_pid, tids: target_tids }];
    groups.extend(
        data_manager
            .processes()
            .filter(|process| process.pid() != target_pid)
            .take(OTHER_PROCESSES)
            .map(|process| ThreadGroup { pid: process.pid(), tids: vec![Tid(process.pid().0)] }),
    );

    let cpus = online_cpus().unwrap_or_else(|e| {
        warn!("Failed to read online CPUs: {e}. Stamping CPU 0.");
        vec![CpuId(0)]
    });

    let generator = LoadGenerator::new(groups, cpus, kinds);
    let buffer = Arc::new(TracepointEventBuffer::new());

    info!("Starting {} producers with {} events each", args.producers, args.events);
    let capture_start = Instant::now();

    let handles = (0..args.producers)
        .map(|producer| {
            let generator = generator.clone();
            let buffer = Arc::clone(&buffer);
            let (headless, events) = (args.headless, args.events);
            thread::Builder::new().name(format!("producer-{producer}")).spawn(move || {
                let mut processor = EventProcessor::new(target_pid, buffer, headless);
                for record in generator.stream(producer, events) {
                    processor.process_record(&record);
                }
                processor.stats
            })
        })
        .collect::<std::io::Result<Vec<_>>>()
        .context("Failed to spawn producer thread")?;

    // Keep the process table current while producers run
    while !handles.iter().all(thread::JoinHandle::is_finished) {
        if refresher.apply_latest(&mut data_manager) {
            debug!("Process table now has {} entries", data_manager.num_processes());
        }
        thread::sleep(POLL_INTERVAL);
    }

    let mut stats = CaptureStats::default();
    for handle in handles {
        stats += handle.join().map_err(|_| anyhow::anyhow!("Producer thread panicked"))?;
    }
    let elapsed = capture_start.elapsed();

    // ── Display ─────────────────────────────────────────────────────────
    data_manager.set_selected_thread_id(args.thread.unwrap_or(Tid::TARGET_PROCESS.0));
    let selected_tid = Tid(data_manager.selected_thread_id());

    let selected_kinds: HashSet<TracepointKind> =
        data_manager.selected_tracepoints().iter().map(TracepointInfo::kind).collect();

    let (events, total_events) = {
        let guard = buffer.lock();
        let events: Vec<(u64, TracepointEvent)> = guard
            .events_of_thread(selected_tid)
            .filter(|(_, event)| selected_kinds.contains(&event.tracepoint_kind))
            .take(args.limit)
            .map(|(ts, event)| (ts, *event))
            .collect();
        (events, guard.num_events())
    };

    if args.json {
        let summary = TrackSummary {
            target_pid,
            target_name: &target_name,
            thread: selected_tid,
            total_events,
            stats: StatsSummary::from(&stats),
            events: events.iter().map(|(_, event)| *event).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        display_track(selected_tid, &events);
    }

    if !quiet {
        eprintln!(
            "\ncapture done: {:.3}s, {} events in buffer across {} tracks",
            elapsed.as_secs_f64(),
            total_events,
            buffer.thread_ids().len(),
        );
        display_statistics(&stats);
    }

    refresher.stop();

    Ok(())
}
