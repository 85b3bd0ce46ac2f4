use std::process::Command;

#[test]
fn test_json_track_of_own_process() {
    let output = Command::new(env!("CARGO_BIN_EXE_tracescope"))
        .args(["--producers", "2", "--events", "200", "--limit", "5", "--json", "--quiet"])
        .output()
        .expect("Failed to run tracescope");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Invalid JSON");
    assert_eq!(parsed["thread"], -2);
    assert!(parsed["events"].as_array().unwrap().len() <= 5);
    assert_eq!(parsed["stats"]["records"], 400);
    assert!(parsed["events"]
        .as_array()
        .unwrap()
        .iter()
        .all(|event| event["is_same_pid_as_target"] == true));
}

#[test]
fn test_bad_tracepoint_is_usage_error() {
    let output = Command::new(env!("CARGO_BIN_EXE_tracescope"))
        .args(["--tracepoint", "sched_switch"])
        .output()
        .expect("Failed to run tracescope");
    assert_eq!(output.status.code(), Some(2));
}
