use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("sales-schedule-{nanos}-{file_name}"))
}

fn run(store_path: &PathBuf, args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_schedule_cli");
    Command::new(exe)
        .args(args)
        .env("SALES_SCHEDULE_STORE_PATH", store_path)
        .env("SALES_SCHEDULE_CONFIG_PATH", temp_path("no-config.json"))
        .output()
        .expect("failed to run schedule_cli")
}

fn seed(store_path: &PathBuf) {
    let content = serde_json::json!({
        "schema_version": 2,
        "schedules": [
            {
                "id": "schedule-3",
                "title": "培训",
                "date": "2025-03-12",
                "status": "pending"
            },
            {
                "id": "schedule-2",
                "customer_id": "manual-1",
                "title": "拜访 - 张总",
                "date": "2025-03-11",
                "time": "14:00",
                "status": "pending"
            },
            {
                "id": "schedule-1",
                "title": "会议",
                "date": "2025-03-11",
                "time": "09:00",
                "status": "completed"
            }
        ],
        "customers": [
            {
                "id": "manual-1",
                "name": "张总",
                "company": "星河科技",
                "created_at": "2025-03-01T00:00:00Z"
            }
        ]
    });
    std::fs::write(store_path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

#[test]
fn list_json_is_sorted_by_date_and_time() {
    let store_path = temp_path("cli-list.json");
    seed(&store_path);

    let output = run(&store_path, &["--json", "list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let listed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    let ids: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["schedule-1", "schedule-2", "schedule-3"]);
}

#[test]
fn list_plain_shows_customer_names() {
    let store_path = temp_path("cli-list-plain.json");
    seed(&store_path);

    let output = run(&store_path, &["list", "--pending"]);
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("schedule-2"));
    assert!(stdout.contains("张总"));
    assert!(!stdout.contains("schedule-1"));
}

#[test]
fn toggle_then_stats_reflects_change() {
    let store_path = temp_path("cli-toggle.json");
    seed(&store_path);

    let toggled = run(&store_path, &["--json", "toggle", "schedule-3"]);
    let stats = run(&store_path, &["--json", "stats"]);
    let missing = run(&store_path, &["toggle", "schedule-404"]);
    std::fs::remove_file(&store_path).ok();

    assert!(toggled.status.success());
    let toggled: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&toggled.stdout)).expect("json output");
    assert_eq!(toggled["status"], "completed");

    let stats: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&stats.stdout)).expect("json output");
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["completed"], 2);

    assert!(!missing.status.success());
    assert!(String::from_utf8_lossy(&missing.stderr).contains("ERROR: not_found"));
}

#[test]
fn delete_removes_from_store() {
    let store_path = temp_path("cli-delete.json");
    seed(&store_path);

    let output = run(&store_path, &["delete", "schedule-1"]);
    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store_path).unwrap()).expect("stored json");
    std::fs::remove_file(&store_path).ok();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Deleted schedule: 会议"));
    assert_eq!(stored["schedules"].as_array().unwrap().len(), 2);
}

#[test]
fn corrupt_store_is_reported() {
    let store_path = temp_path("cli-corrupt.json");
    std::fs::write(&store_path, "{ not json").unwrap();

    let output = run(&store_path, &["list"]);
    std::fs::remove_file(&store_path).ok();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: invalid_data"));
}
