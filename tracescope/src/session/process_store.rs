//! Process table with stable, generation-checked handles
//!
//! The visualization layer keeps references to processes across frames while
//! the process table is refreshed underneath it. Entries live in slots that
//! never move; a [`ProcessHandle`] remembers the slot and the slot's
//! generation. Removing a process bumps the generation, so a stale handle
//! resolves to `None` instead of to whatever process reuses the slot.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::Pid;

/// One process as reported by the process-enumeration collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub name: String,
    pub full_path: String,
    pub command_line: String,
    pub cpu_usage: f64,
    pub is_64_bit: bool,
}

/// Client-side state of a known process
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessData {
    info: ProcessInfo,
}

impl ProcessData {
    #[must_use]
    pub fn new(info: ProcessInfo) -> Self {
        Self { info }
    }

    /// Refresh from a newer snapshot of the same process
    pub fn set_process_info(&mut self, info: ProcessInfo) {
        self.info = info;
    }

    pub fn process_info(&self) -> &ProcessInfo {
        &self.info
    }

    pub fn pid(&self) -> Pid {
        self.info.pid
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn full_path(&self) -> &str {
        &self.info.full_path
    }

    pub fn command_line(&self) -> &str {
        &self.info.command_line
    }

    pub fn cpu_usage(&self) -> f64 {
        self.info.cpu_usage
    }

    pub fn is_64_bit(&self) -> bool {
        self.info.is_64_bit
    }
}

/// Stable reference to an entry of a [`ProcessStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    index: usize,
    generation: u32,
    pid: Pid,
}

impl ProcessHandle {
    pub fn pid(&self) -> Pid {
        self.pid
    }
}

/// What a snapshot replacement changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessTableUpdate {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<ProcessData>,
}

#[derive(Debug, Default)]
pub struct ProcessStore {
    slots: Vec<Slot>,
    free: Vec<usize>,
    by_pid: HashMap<Pid, usize>,
}

impl ProcessStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the table match `snapshot`
    ///
    /// Processes present before and after are refreshed in place and keep
    /// their handles. Processes missing from `snapshot` are removed and their
    /// handles go stale. If a pid appears twice the later entry wins.
    pub fn replace_all(&mut self, snapshot: &[ProcessInfo]) -> ProcessTableUpdate {
        let mut update = ProcessTableUpdate::default();

        let incoming: HashSet<Pid> = snapshot.iter().map(|info| info.pid).collect();
        let gone: Vec<Pid> =
            self.by_pid.keys().filter(|pid| !incoming.contains(pid)).copied().collect();
        for pid in gone {
            self.remove(pid);
            update.removed += 1;
        }

        for info in snapshot {
            if let Some(process) = self.get_by_pid_mut(info.pid) {
                process.set_process_info(info.clone());
                update.updated += 1;
            } else {
                self.insert(ProcessData::new(info.clone()));
                update.added += 1;
            }
        }

        update
    }

    fn insert(&mut self, process: ProcessData) {
        let pid = process.pid();
        let index = if let Some(index) = self.free.pop() {
            self.slots[index].entry = Some(process);
            index
        } else {
            self.slots.push(Slot { generation: 0, entry: Some(process) });
            self.slots.len() - 1
        };
        self.by_pid.insert(pid, index);
    }

    fn remove(&mut self, pid: Pid) {
        if let Some(index) = self.by_pid.remove(&pid) {
            let slot = &mut self.slots[index];
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
    }

    pub fn handle(&self, pid: Pid) -> Option<ProcessHandle> {
        let index = *self.by_pid.get(&pid)?;
        Some(ProcessHandle { index, generation: self.slots[index].generation, pid })
    }

    /// Resolve a handle; `None` once its process has been removed
    pub fn get(&self, handle: ProcessHandle) -> Option<&ProcessData> {
        self.slots
            .get(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub fn get_mut(&mut self, handle: ProcessHandle) -> Option<&mut ProcessData> {
        self.slots
            .get_mut(handle.index)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn get_by_pid(&self, pid: Pid) -> Option<&ProcessData> {
        let index = *self.by_pid.get(&pid)?;
        self.slots[index].entry.as_ref()
    }

    pub fn get_by_pid_mut(&mut self, pid: Pid) -> Option<&mut ProcessData> {
        let index = *self.by_pid.get(&pid)?;
        self.slots[index].entry.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessData> {
        self.slots.iter().filter_map(|slot| slot.entry.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_pid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pid.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn process_info(pid: i32, name: &str) -> ProcessInfo {
    ProcessInfo {
        pid: Pid(pid),
        name: name.to_string(),
        full_path: format!("/usr/bin/{name}"),
        command_line: name.to_string(),
        cpu_usage: 0.0,
        is_64_bit: true,
    }
}
