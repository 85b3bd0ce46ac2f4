//! CPU utility functions
//!
//! Utilities for querying CPU information from /sys filesystem.

use anyhow::{Context, Result};
use std::fs;

use crate::domain::CpuId;

/// Get list of online CPU IDs from /sys/devices/system/cpu/online
///
/// Returns a vector of CPU IDs (e.g., [0, 1, 2, 3] for a 4-core system).
///
/// # Errors
/// Returns an error if the file is unreadable or malformed.
pub fn online_cpus() -> Result<Vec<CpuId>> {
    let content = fs::read_to_string("/sys/devices/system/cpu/online")
        .context("Failed to read /sys/devices/system/cpu/online")?;
    parse_cpu_list(&content)
}

/// Parse the kernel's CPU list format, like "0-3" or "0-3,8-11" for NUMA systems.
///
/// # Errors
/// Returns an error on a non-numeric entry or a descending range.
pub fn parse_cpu_list(list: &str) -> Result<Vec<CpuId>> {
    let mut cpus = Vec::new();

    for range in list.trim().split(',').filter(|r| !r.is_empty()) {
        if let Some((start, end)) = range.split_once('-') {
            // Range like "0-3"
            let start: i32 = start.parse().with_context(|| format!("Bad CPU range '{range}'"))?;
            let end: i32 = end.parse().with_context(|| format!("Bad CPU range '{range}'"))?;
            anyhow::ensure!(start <= end, "Descending CPU range '{range}'");
            cpus.extend((start..=end).map(CpuId));
        } else {
            // Single CPU like "5"
            let cpu: i32 = range.parse().with_context(|| format!("Bad CPU id '{range}'"))?;
            cpus.push(CpuId(cpu));
        }
    }

    Ok(cpus)
}
