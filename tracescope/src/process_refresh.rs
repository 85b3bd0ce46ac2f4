//! Periodic process snapshots delivered to the session thread
//!
//! Enumerating `/proc` is too slow for the UI thread, and the data manager
//! may only be touched from its owner. A background thread takes snapshots
//! and sends them over a channel; the owner drains it between frames and
//! applies the newest one.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, warn};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::CaptureError;
use crate::session::{DataManager, ProcessInfo};

pub struct ProcessRefresher {
    snapshots: Receiver<Vec<ProcessInfo>>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ProcessRefresher {
    /// Start taking a snapshot from `source` every `interval`
    ///
    /// The first snapshot is taken immediately. Failed snapshots are logged
    /// and skipped.
    pub fn spawn<F>(interval: Duration, source: F) -> Self
    where
        F: Fn() -> Result<Vec<ProcessInfo>, CaptureError> + Send + 'static,
    {
        // One slot: an unapplied snapshot is replaced by the newer one
        let (snapshot_tx, snapshots) = bounded(1);
        let stale_rx = snapshots.clone();
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let handle = thread::spawn(move || loop {
            match source() {
                Ok(mut snapshot) => loop {
                    match snapshot_tx.try_send(snapshot) {
                        Ok(()) => break,
                        Err(TrySendError::Full(pending)) => {
                            stale_rx.try_recv().ok();
                            snapshot = pending;
                        }
                        Err(TrySendError::Disconnected(_)) => return,
                    }
                },
                Err(e) => warn!("Process snapshot failed: {e}"),
            }

            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self { snapshots, stop_tx: Some(stop_tx), handle: Some(handle) }
    }

    /// Channel end for callers that want to block on the next snapshot
    pub fn snapshots(&self) -> &Receiver<Vec<ProcessInfo>> {
        &self.snapshots
    }

    /// Apply the newest pending snapshot, if any. Returns whether the table
    /// was updated. Never blocks.
    pub fn apply_latest(&self, data_manager: &mut DataManager) -> bool {
        let Some(latest) = self.snapshots.try_iter().last() else {
            return false;
        };
        data_manager.update_process_infos(&latest);
        true
    }

    /// Stop the background thread and wait for it
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting wakes the thread out of its wait
        self.stop_tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Process refresher thread panicked");
            } else {
                debug!("Process refresher stopped");
            }
        }
    }
}

impl Drop for ProcessRefresher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Pid;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn snapshot_of(pids: &[i32]) -> Vec<ProcessInfo> {
        pids.iter()
            .map(|&pid| ProcessInfo {
                pid: Pid(pid),
                name: format!("proc-{pid}"),
                full_path: String::new(),
                command_line: String::new(),
                cpu_usage: 0.0,
                is_64_bit: true,
            })
            .collect()
    }

    #[test]
    fn test_first_snapshot_is_immediate() {
        let refresher =
            ProcessRefresher::spawn(Duration::from_secs(60), || Ok(snapshot_of(&[1, 2])));
        let snapshot = refresher.snapshots().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(snapshot.len(), 2);
        refresher.stop();
    }

    #[test]
    fn test_apply_latest_updates_table() {
        let counter = Arc::new(AtomicI32::new(1));
        let source_counter = Arc::clone(&counter);
        let refresher = ProcessRefresher::spawn(Duration::from_millis(5), move || {
            Ok(snapshot_of(&[source_counter.fetch_add(1, Ordering::SeqCst)]))
        });

        let mut manager = DataManager::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !refresher.apply_latest(&mut manager) {
            assert!(std::time::Instant::now() < deadline, "no snapshot arrived");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(manager.num_processes(), 1);
        refresher.stop();
    }

    #[test]
    fn test_unapplied_snapshot_is_replaced_by_newer() {
        const LAST_PID: i32 = 20;

        let counter = Arc::new(AtomicI32::new(1));
        let source_counter = Arc::clone(&counter);
        let refresher = ProcessRefresher::spawn(Duration::from_millis(1), move || {
            let pid = source_counter.fetch_add(1, Ordering::SeqCst);
            if pid > LAST_PID {
                return Err(CaptureError::ProcessNotFound(Pid(pid)));
            }
            Ok(snapshot_of(&[pid]))
        });

        // The source ran again after sending the last snapshot
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while counter.load(Ordering::SeqCst) < LAST_PID + 2 {
            assert!(std::time::Instant::now() < deadline, "source stalled");
            thread::sleep(Duration::from_millis(1));
        }

        let mut manager = DataManager::new();
        assert!(refresher.apply_latest(&mut manager));
        assert_eq!(manager.num_processes(), 1);
        assert!(manager.get_process_by_pid(Pid(LAST_PID)).is_some());
        assert!(!refresher.apply_latest(&mut manager));
        refresher.stop();
    }

    #[test]
    fn test_failed_snapshots_are_skipped() {
        let refresher = ProcessRefresher::spawn(Duration::from_millis(1), || {
            Err(CaptureError::ProcessNotFound(Pid(1)))
        });
        thread::sleep(Duration::from_millis(20));
        let mut manager = DataManager::new();
        assert!(!refresher.apply_latest(&mut manager));
        drop(refresher);
    }
}
