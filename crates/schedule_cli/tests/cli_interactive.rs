use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sales-schedule-{nanos}-{file_name}"))
}

fn run_interactive(input: &str, config: Option<serde_json::Value>) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_schedule_cli");
    let store_path = temp_path("cli-interactive.json");
    let config_path = temp_path("cli-interactive-config.json");
    if let Some(config) = config {
        std::fs::write(&config_path, config.to_string()).unwrap();
    }

    let mut child = Command::new(exe)
        .env("SALES_SCHEDULE_STORE_PATH", &store_path)
        .env("SALES_SCHEDULE_CONFIG_PATH", &config_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn interactive session");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        stdin
            .write_all(input.as_bytes())
            .expect("failed to write to stdin");
    }

    let output = child
        .wait_with_output()
        .expect("failed to read interactive output");

    std::fs::remove_file(&store_path).ok();
    std::fs::remove_file(&config_path).ok();
    output
}

#[test]
fn interactive_help_shows_usage() {
    let output = run_interactive("help\nexit\n", None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage"));
}

#[test]
fn interactive_invalid_command_prints_error_and_continues() {
    let output = run_interactive("nope\nparse 14点培训\nquit\n", None);
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("ERROR: invalid_input"));
    assert!(stdout.contains("14:00"));
}

#[test]
fn interactive_add_then_stats() {
    let output = run_interactive("add \"后天 上午10点 演示\"\nstats\nexit\n", None);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Added schedule: 产品演示"));
    assert!(stdout.contains("Pending:   1"));
}

#[test]
fn interactive_expands_configured_aliases() {
    let config = serde_json::json!({ "aliases": { "p": "parse" } });
    let output = run_interactive("p 1月15日开会\nexit\n", Some(config));
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Title:    会议"));
}

#[test]
fn interactive_survives_invalid_config() {
    let output = run_interactive("parse 开会\nexit\n", Some(serde_json::json!("oops")));
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("using default configuration"));
    assert!(stdout.contains("Title:    会议"));
}
