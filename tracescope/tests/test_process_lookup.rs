#![cfg(unix)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::Path;
use tempfile::TempDir;

use tracescope::domain::{CaptureError, Pid, Tid};
use tracescope::process_lookup::{find_process_by_name_in, list_processes_in, list_threads_in};

const ELF_64: &[u8] = &[0x7f, b'E', b'L', b'F', 2, 1, 1, 0];
const ELF_32: &[u8] = &[0x7f, b'E', b'L', b'F', 1, 1, 1, 0];

fn add_process(root: &Path, pid: i32, comm: &str, exe: Option<&[u8]>, cmdline: &[u8], tids: &[i32]) {
    let dir = root.join(pid.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("stat"), format!("{pid} ({comm}) S 1 {pid} {pid} 0 -1 4194304")).unwrap();
    fs::write(dir.join("cmdline"), cmdline).unwrap();

    if let Some(image) = exe {
        let bin = root.join("bin");
        fs::create_dir_all(&bin).unwrap();
        let path = bin.join(comm);
        fs::write(&path, image).unwrap();
        symlink(&path, dir.join("exe")).unwrap();
    }

    for tid in tids {
        fs::create_dir_all(dir.join("task").join(tid.to_string())).unwrap();
    }
}

fn fake_proc() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    add_process(root.path(), 200, "worker", Some(ELF_32), b"worker\0--jobs\04\0", &[200]);
    add_process(
        root.path(),
        100,
        "my-server",
        Some(ELF_64),
        b"/usr/bin/my-server\0--port\08080\0",
        &[102, 100, 101],
    );
    add_process(root.path(), 300, "kworker/0:1", None, b"", &[]);

    // Entries that are not processes
    fs::create_dir_all(root.path().join("sys")).unwrap();
    fs::create_dir_all(root.path().join("400")).unwrap();
    root
}

#[test]
fn test_list_processes_reads_each_entry() {
    let root = fake_proc();
    let processes = list_processes_in(root.path()).unwrap();

    let pids: Vec<Pid> = processes.iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![Pid(100), Pid(200), Pid(300)]);

    let server = &processes[0];
    assert_eq!(server.name, "my-server");
    assert_eq!(server.command_line, "/usr/bin/my-server --port 8080");
    assert!(server.full_path.ends_with("bin/my-server"));
    assert!(server.is_64_bit);

    assert!(!processes[1].is_64_bit);
    assert!(processes[2].full_path.is_empty());
}

#[test]
fn test_find_process_by_name() {
    let root = fake_proc();

    assert_eq!(find_process_by_name_in(root.path(), "my-server").unwrap().pid, Pid(100));
    assert_eq!(find_process_by_name_in(root.path(), "worker").unwrap().pid, Pid(200));

    // Processes without an executable are never targets
    assert!(matches!(
        find_process_by_name_in(root.path(), "kworker"),
        Err(CaptureError::NoMatchingProcess(_))
    ));

    match find_process_by_name_in(root.path(), "er") {
        Err(CaptureError::AmbiguousProcessName { pattern, candidates }) => {
            assert_eq!(pattern, "er");
            assert!(candidates.contains("100 (my-server)"));
            assert!(candidates.contains("200 (worker)"));
        }
        other => panic!("expected ambiguity, got {other:?}"),
    }
}

#[test]
fn test_list_threads() {
    let root = fake_proc();
    assert_eq!(list_threads_in(root.path(), Pid(100)).unwrap(), vec![Tid(100), Tid(101), Tid(102)]);
    assert!(matches!(
        list_threads_in(root.path(), Pid(300)),
        Err(CaptureError::ProcessNotFound(Pid(300)))
    ));
}

#[test]
fn test_missing_root() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("proc");
    assert!(matches!(list_processes_in(&missing), Err(CaptureError::ProcReadFailed { .. })));
}
