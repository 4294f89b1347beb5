use std::fs;
use std::process::Command;

fn chainrun() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_chainrun"));
    // keep the user's own config out of the picture
    command.env_remove("CHAINRUN_CONFIG");
    command.env("XDG_CONFIG_HOME", std::env::temp_dir().join("chainrun-no-config"));
    command
}

#[test]
fn test_chain_command() {
    let output = chainrun()
        .args(["chain", "--hops", "3", "--value", "5"])
        .output()
        .expect("Failed to spawn chainrun");

    assert!(output.status.success(), "chain failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("paused on first task: 1"), "{}", stdout);
    assert!(stdout.contains("result: 7"), "{}", stdout);
}

#[test]
fn test_chain_rejects_zero_hops() {
    let output = chainrun()
        .args(["chain", "--hops", "0"])
        .output()
        .expect("Failed to spawn chainrun");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--hops"));
}

#[test]
fn test_fanout_command() {
    let output = chainrun()
        .args(["fanout", "--tasks", "2", "--depth", "3"])
        .output()
        .expect("Failed to spawn chainrun");

    assert!(output.status.success(), "fanout failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("queued before drain: 2"), "{}", stdout);
    assert!(stdout.contains("bodies run: 8"), "{}", stdout);
    assert!(stdout.contains("drains=1"), "{}", stdout);
}

#[test]
fn test_config_command_reads_env_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chainrun.toml");
    fs::write(&path, "[runner]\nname = \"edge\"\n\n[sync]\npoll_interval_ms = 4\n").unwrap();

    let output = chainrun()
        .env("CHAINRUN_CONFIG", &path)
        .arg("config")
        .output()
        .expect("Failed to spawn chainrun");

    assert!(output.status.success(), "config failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("name = \"edge\""), "{}", stdout);
    assert!(stdout.contains("poll_interval_ms = 4"), "{}", stdout);
}

#[test]
fn test_named_runners_from_config_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chainrun.toml");
    fs::write(&path, "[runner]\nname = \"hop\"\n").unwrap();

    let output = chainrun()
        .arg("--config")
        .arg(&path)
        .args(["chain", "--hops", "2"])
        .output()
        .expect("Failed to spawn chainrun");

    assert!(output.status.success(), "chain failed: {:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("after draining hop-1:"), "{}", stdout);
}
