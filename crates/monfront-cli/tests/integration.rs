#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn monfront(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("monfront").unwrap();
    cmd.current_dir(dir.path())
        .env("MONFRONT_CONFIG", dir.path().join("monfront.yaml"));
    cmd
}

const SEEDED: &str = r#"
sessions:
  - token: root-token
    userid: 1
    username: Admin
    user_type: super_admin
  - token: guest-token
    userid: 3
    username: guest
    user_type: user
actions:
  disabled: [host.delete]
seed:
  drules:
    - { druleid: "5", name: "Local network", iprange: "192.168.0.1-254", status: "0" }
    - { druleid: "7", name: "DMZ", iprange: "10.0.0.1-254", status: "0" }
"#;

fn write_config(dir: &TempDir, yaml: &str) {
    std::fs::write(dir.path().join("monfront.yaml"), yaml).unwrap();
}

// ---------------------------------------------------------------------------
// monfront init
// ---------------------------------------------------------------------------

#[test]
fn init_writes_config_with_session() {
    let dir = TempDir::new().unwrap();
    monfront(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("zbx_session="));

    let content = std::fs::read_to_string(dir.path().join("monfront.yaml")).unwrap();
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
    assert_eq!(yaml["sessions"][0]["user_type"], "super_admin");
    assert_eq!(yaml["sessions"][0]["token"].as_str().unwrap().len(), 32);
}

#[test]
fn init_keeps_existing_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    monfront(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists"));
    let content = std::fs::read_to_string(dir.path().join("monfront.yaml")).unwrap();
    assert!(content.contains("root-token"));
}

// ---------------------------------------------------------------------------
// monfront config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_accepts_good_config() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    monfront(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_fails_on_errors() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "sessions:\n  - { token: same, userid: 1, username: a, user_type: admin }\n  - { token: same, userid: 2, username: b, user_type: admin }\n",
    );
    monfront(&dir)
        .args(["config", "validate", "--json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("reuses another session's token"));
}

#[test]
fn missing_config_is_reported() {
    let dir = TempDir::new().unwrap();
    monfront(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config not found"));
}

// ---------------------------------------------------------------------------
// monfront actions
// ---------------------------------------------------------------------------

#[test]
fn actions_list_shows_disabled_state() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    let output = monfront(&dir)
        .args(["actions", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let list: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let host_delete = list
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["name"] == "host.delete")
        .unwrap();
    assert_eq!(host_delete["enabled"], false);
}

#[test]
fn actions_rules_describes_bulk_ids() {
    let dir = TempDir::new().unwrap();
    monfront(&dir)
        .args(["actions", "rules", "discovery.disable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("druleids"));
}

// ---------------------------------------------------------------------------
// monfront check
// ---------------------------------------------------------------------------

#[test]
fn check_runs_redirect_action() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    monfront(&dir)
        .args([
            "check",
            "discovery.disable",
            "-p",
            "druleids[]=5",
            "-p",
            "druleids[]=7",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("redirect: zabbix.php?action=discovery.list"))
        .stdout(predicate::str::contains("[success] Discovery rules disabled"));
}

#[test]
fn check_denied_session_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    monfront(&dir)
        .args([
            "check",
            "discovery.delete",
            "-p",
            "druleids[]=5",
            "--session",
            "guest-token",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No permissions"));
}

#[test]
fn check_json_outcome() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    let output = monfront(&dir)
        .args(["check", "discovery.enable", "-p", "druleids[]=5", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let outcome: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(outcome["type"], "redirect");
    assert_eq!(outcome["flash"]["title"], "Discovery rule enabled");
}

#[test]
fn check_disabled_action_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SEEDED);
    monfront(&dir)
        .args(["check", "host.delete", "-p", "hostids[]=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("action is disabled"));
}
