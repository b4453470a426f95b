// Integration tests for CLI commands
// These run the built binary against temporary config and script files.

use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn daobase() -> Command {
    Command::new(env!("CARGO_BIN_EXE_daobase"))
}

fn init_config(dir: &TempDir) -> String {
    let config_path = dir.path().join("config.toml");
    let output = daobase()
        .args(["init", "--config"])
        .arg(&config_path)
        .args(["--name", "Integration DAO"])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    config_path.display().to_string()
}

const SCRIPT: &str = r#"
[[steps]]
kind = "request"
caller = "employee1"
via = "aac"
action = { kind = "issue_tokens", token = "STDT", recipient = "employee1", amount = 1000 }

[[steps]]
kind = "vote"
proposal = 0
voter = "employee2"
choice = "yes"

[[steps]]
kind = "vote"
proposal = 0
voter = "employee1"
choice = "yes"

[[steps]]
kind = "request"
caller = "outsider"
action = { kind = "add_group_member", group = "Employees", member = "outsider" }
"#;

#[test]
fn test_cli_help() {
    let output = daobase()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("check"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("version"));
}

#[test]
fn test_cli_version() {
    let output = daobase()
        .arg("version")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("daobase"));
}

#[test]
fn test_cli_check_default_config() {
    let dir = TempDir::new().unwrap();
    let config = init_config(&dir);

    let output = daobase()
        .args(["check", "--config", &config])
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Integration DAO"));
    assert!(stdout.contains("Employees"));
    assert!(stdout.contains("issueTokens"));
    assert!(stdout.contains("STDT (supply 1000)"));
}

#[test]
fn test_cli_check_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let output = daobase()
        .args(["check", "--config"])
        .arg(&missing)
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_cli_run_json_report() {
    let dir = TempDir::new().unwrap();
    let config = init_config(&dir);
    let script_path = dir.path().join("script.toml");
    fs::write(&script_path, SCRIPT).unwrap();

    // The default config doesn't know the auto caller; grant it.
    let mut contents = fs::read_to_string(&config).unwrap();
    contents.push_str(
        r#"
[[permissions]]
action = "addNewProposal"
rule = { by = "address", address = "aac" }
"#,
    );
    fs::write(&config, contents).unwrap();

    let snapshot = dir.path().join("state.cbor");
    let output = daobase()
        .args(["run", "--config", &config, "--json", "--script"])
        .arg(&script_path)
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();

    let steps = report["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 4);
    assert_eq!(steps[0]["outcome"]["outcome"], "proposal_created");
    assert_eq!(steps[1]["outcome"], "passed");
    assert!(steps[2]["error"].as_str().unwrap().contains("finished"));
    assert!(steps[3]["error"].as_str().unwrap().contains("no permission"));

    let balances = report["balances"].as_array().unwrap();
    let employee1 = balances
        .iter()
        .find(|line| line["holder"] == "employee1")
        .unwrap();
    assert_eq!(employee1["amount"], 1000);

    assert_eq!(report["audit_verified"], true);
    assert!(snapshot.exists());
}
