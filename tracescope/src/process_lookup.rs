//! Process enumeration from a procfs-style directory.
//!
//! Produces the [`ProcessInfo`] snapshots the data manager's process table is
//! rebuilt from, and resolves CLI target names to a pid.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::domain::{CaptureError, Pid, Tid};
use crate::session::ProcessInfo;

const PROC_ROOT: &str = "/proc";

/// ELF identification: magic, then class (1 = 32-bit, 2 = 64-bit)
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELF_CLASS_64: u8 = 2;

/// Snapshot of every readable process under `/proc`.
///
/// # Errors
/// Returns an error if `/proc` itself cannot be read. Processes that vanish or
/// deny access while being read are skipped.
pub fn list_processes() -> Result<Vec<ProcessInfo>, CaptureError> {
    list_processes_in(Path::new(PROC_ROOT))
}

/// Snapshot of every readable process under `root`, ordered by pid.
///
/// # Errors
/// Returns an error if `root` cannot be read.
pub fn list_processes_in(root: &Path) -> Result<Vec<ProcessInfo>, CaptureError> {
    let entries = fs::read_dir(root).map_err(|source| CaptureError::ProcReadFailed {
        path: root.display().to_string(),
        source,
    })?;

    let mut processes: Vec<ProcessInfo> = entries
        .flatten()
        .filter_map(|entry| {
            let pid = entry.file_name().to_string_lossy().parse::<i32>().ok()?;
            read_process(root, pid)
        })
        .collect();
    processes.sort_by_key(|process| process.pid);

    Ok(processes)
}

/// Read one process; `None` if it is gone or its `stat` is unreadable.
fn read_process(root: &Path, pid: i32) -> Option<ProcessInfo> {
    let dir = root.join(pid.to_string());

    let stat_content = fs::read_to_string(dir.join("stat")).ok()?;
    let name = extract_comm(&stat_content).ok()?;

    // Kernel threads and foreign processes have no readable exe link
    let exe_path = fs::read_link(dir.join("exe")).ok();
    let full_path = exe_path.as_ref().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();

    let command_line = fs::read(dir.join("cmdline"))
        .map(|raw| parse_cmdline(&raw))
        .unwrap_or_default();

    let is_64_bit = elf_is_64_bit(&dir.join("exe")).unwrap_or(cfg!(target_pointer_width = "64"));

    Some(ProcessInfo { pid: Pid(pid), name, full_path, command_line, cpu_usage: 0.0, is_64_bit })
}

/// Find a process by name.
///
/// Searches `/proc` for processes matching the given name.
/// Matches against the command name from `/proc/<pid>/stat` and
/// the executable basename from `/proc/<pid>/exe`.
///
/// # Errors
/// - No processes found
/// - Multiple processes found (ambiguous)
pub fn find_process_by_name(name: &str) -> Result<ProcessInfo, CaptureError> {
    find_process_by_name_in(Path::new(PROC_ROOT), name)
}

/// Find a process by name under `root`.
///
/// # Errors
/// See [`find_process_by_name`].
pub fn find_process_by_name_in(root: &Path, name: &str) -> Result<ProcessInfo, CaptureError> {
    let mut matches: Vec<ProcessInfo> = list_processes_in(root)?
        .into_iter()
        .filter(|process| !process.full_path.is_empty())
        .filter(|process| is_match(&process.name, Path::new(&process.full_path), name))
        .collect();

    match matches.len() {
        0 => Err(CaptureError::NoMatchingProcess(name.to_string())),
        1 => Ok(matches.remove(0)),
        _ => {
            let list: Vec<String> =
                matches.iter().map(|m| format!("{} ({})", m.pid.0, m.name)).collect();
            Err(CaptureError::AmbiguousProcessName {
                pattern: name.to_string(),
                candidates: list.join(", "),
            })
        }
    }
}

/// Look up one process under `/proc` by pid.
///
/// # Errors
/// Returns `ProcessNotFound` if the pid has no readable entry.
pub fn process_by_pid(pid: Pid) -> Result<ProcessInfo, CaptureError> {
    read_process(Path::new(PROC_ROOT), pid.0).ok_or(CaptureError::ProcessNotFound(pid))
}

/// Thread ids of `pid`, ascending.
///
/// # Errors
/// Returns `ProcessNotFound` if `/proc/<pid>/task` cannot be read.
pub fn list_threads(pid: Pid) -> Result<Vec<Tid>, CaptureError> {
    list_threads_in(Path::new(PROC_ROOT), pid)
}

/// Thread ids of `pid` under `root`, ascending.
///
/// # Errors
/// Returns `ProcessNotFound` if `<root>/<pid>/task` cannot be read.
pub fn list_threads_in(root: &Path, pid: Pid) -> Result<Vec<Tid>, CaptureError> {
    let task_dir = root.join(pid.0.to_string()).join("task");
    let entries = fs::read_dir(&task_dir).map_err(|_| CaptureError::ProcessNotFound(pid))?;

    let mut tids: Vec<Tid> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_string_lossy().parse::<i32>().ok())
        .map(Tid)
        .collect();
    tids.sort_unstable();

    Ok(tids)
}

/// Extract command name from `/proc/<pid>/stat`.
/// Format: "pid (comm) state ..."
fn extract_comm(stat_line: &str) -> Result<String, CaptureError> {
    let invalid = |reason: &str| CaptureError::ProcParseFailed {
        path: "stat".to_string(),
        reason: reason.to_string(),
    };
    let open = stat_line.find('(').ok_or_else(|| invalid("missing '('"))?;
    let close = stat_line.rfind(')').ok_or_else(|| invalid("missing ')'"))?;
    if open >= close {
        return Err(invalid("')' before '('"));
    }
    Ok(stat_line[open + 1..close].to_string())
}

/// `cmdline` is NUL-separated with a trailing NUL
fn parse_cmdline(raw: &[u8]) -> String {
    raw.split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `None` if the file is unreadable or not an ELF image
fn elf_is_64_bit(path: &Path) -> Option<bool> {
    let mut ident = [0u8; 5];
    fs::File::open(path).ok()?.read_exact(&mut ident).ok()?;
    (ident[..4] == ELF_MAGIC).then_some(ident[4] == ELF_CLASS_64)
}

/// Check if process matches the search pattern.
fn is_match(command: &str, exe_path: &Path, pattern: &str) -> bool {
    let exe_basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    let pattern_basename =
        Path::new(pattern).file_name().and_then(|n| n.to_str()).unwrap_or(pattern);

    // Exact match on command or exe basename
    command == pattern_basename
        || exe_basename == pattern_basename
        // Substring match for flexibility
        || command.contains(pattern)
        || exe_basename.contains(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_comm() {
        let stat = "1234 (my-app) S 1 1234 1234 0 -1 4194304";
        assert_eq!(extract_comm(stat).unwrap(), "my-app");
    }

    #[test]
    fn test_extract_comm_with_parens() {
        // Command names can contain parentheses
        let stat = "1234 (app (v2)) S 1 1234";
        assert_eq!(extract_comm(stat).unwrap(), "app (v2)");
    }

    #[test]
    fn test_extract_comm_malformed() {
        assert!(extract_comm("1234 my-app S").is_err());
        assert!(extract_comm("1234 )x( S").is_err());
    }

    #[test]
    fn test_parse_cmdline() {
        assert_eq!(parse_cmdline(b"/usr/bin/app\0--port\08080\0"), "/usr/bin/app --port 8080");
        assert_eq!(parse_cmdline(b""), "");
    }

    #[test]
    fn test_is_match() {
        let exe = Path::new("/usr/bin/my-server");
        assert!(is_match("my-server", exe, "my-server"));
        assert!(is_match("my-server", exe, "server"));
        assert!(!is_match("my-server", exe, "other"));
    }

    #[test]
    fn test_list_own_process() {
        #[allow(clippy::cast_possible_wrap)]
        let pid = Pid(std::process::id() as i32);

        #[cfg(target_os = "linux")]
        {
            let processes = list_processes().unwrap();
            assert!(processes.iter().any(|p| p.pid == pid));
            assert!(list_threads(pid).unwrap().contains(&Tid(pid.0)));
            assert_eq!(process_by_pid(pid).unwrap().pid, pid);
        }
    }

    #[test]
    fn test_unknown_pid() {
        assert!(matches!(
            list_threads(Pid(9_999_999)),
            Err(CaptureError::ProcessNotFound(Pid(9_999_999)))
        ));
        assert!(process_by_pid(Pid(9_999_999)).is_err());
    }
}
