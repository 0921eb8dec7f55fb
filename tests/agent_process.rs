use std::{
    fs,
    io::Write,
    path::Path,
    process::{Command, Output, Stdio},
};

use serde_json::{Value, json};
use tempdir::TempDir;

fn agent(dir: &Path, args: &[&str], input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_lfs_agent"))
        .args(args)
        .current_dir(dir)
        .env_remove("LFS_AGENT_URL")
        .env_remove("LFS_AGENT_PROJECT")
        .env_remove("LFS_AGENT_LOG")
        .env("GIT_CONFIG_GLOBAL", "/dev/null")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn events(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn download_scenario() {
    let temp = TempDir::new("agent_process").unwrap();
    let store = temp.path().join("store");
    fs::create_dir_all(&store).unwrap();
    fs::write(store.join("abc"), b"xyz").unwrap();

    let url = format!("file://{}", store.display());
    let output = agent(
        temp.path(),
        &["--url", &url],
        "{\"event\":\"init\",\"operation\":\"download\"}\n\
         {\"event\":\"download\",\"oid\":\"abc\",\"size\":3}\n\
         {\"event\":\"terminate\"}\n",
    );

    assert!(output.status.success(), "{output:?}");
    let events = events(&output);
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], json!({}));
    assert_eq!(
        events[1],
        json!({"event": "progress", "oid": "abc", "bytesSoFar": 3, "bytesSinceLast": 3})
    );
    assert_eq!(events[2]["event"], "complete");
    assert_eq!(events[2]["oid"], "abc");

    let path = Path::new(events[2]["path"].as_str().unwrap());
    assert!(path.is_absolute());
    assert!(path.ends_with("lfs-download-abc.tmp"));
    assert_eq!(fs::read(path).unwrap(), b"xyz");
}

#[test]
fn download_dir_option() {
    let temp = TempDir::new("agent_process").unwrap();
    let store = temp.path().join("store");
    let downloads = temp.path().join("downloads");
    fs::create_dir_all(&store).unwrap();
    fs::create_dir_all(&downloads).unwrap();
    fs::write(store.join("abc"), b"xyz").unwrap();

    let output = agent(
        temp.path(),
        &[
            "--url",
            store.to_str().unwrap(),
            "--download-dir",
            "downloads",
        ],
        "{\"event\":\"init\"}\n{\"event\":\"download\",\"oid\":\"abc\",\"size\":3}\n",
    );

    assert!(output.status.success(), "{output:?}");
    assert_eq!(fs::read(downloads.join("lfs-download-abc.tmp")).unwrap(), b"xyz");
}

#[test]
fn bad_handshake_exits_non_zero() {
    let temp = TempDir::new("agent_process").unwrap();
    let output = agent(
        temp.path(),
        &["--url", temp.path().to_str().unwrap()],
        "{\"event\":\"download\",\"oid\":\"abc\",\"size\":3}\n",
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn missing_url_exits_non_zero() {
    let temp = TempDir::new("agent_process").unwrap();
    let output = agent(temp.path(), &[], "{\"event\":\"init\"}\n");

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn unsupported_url_exits_non_zero() {
    let temp = TempDir::new("agent_process").unwrap();
    let output = agent(
        temp.path(),
        &["--url", "gs://bucket/prefix"],
        "{\"event\":\"init\"}\n",
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("gs://bucket/prefix"));
}

#[test]
fn log_file_receives_transfer_failures() {
    let temp = TempDir::new("agent_process").unwrap();
    let log = temp.path().join("agent.log");

    let output = agent(
        temp.path(),
        &[
            "--url",
            temp.path().to_str().unwrap(),
            "--log-file",
            log.to_str().unwrap(),
        ],
        "{\"event\":\"init\"}\n{\"event\":\"download\",\"oid\":\"ghost\",\"size\":3}\n",
    );

    assert!(output.status.success(), "{output:?}");
    let events = events(&output);
    assert_eq!(events[1]["error"]["code"], 2);
    assert!(fs::read_to_string(log).unwrap().contains("transfer of ghost failed"));
}
