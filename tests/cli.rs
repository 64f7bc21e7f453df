use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("modechat").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: modechat <COMMAND>"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("--version"));
}

#[test]
fn test_cli_start_help() {
    let mut cmd = Command::cargo_bin("modechat").unwrap();
    cmd.arg("start")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: modechat start"))
        .stdout(predicate::str::contains("--port <PORT>"))
        .stdout(predicate::str::contains("--backend <BACKEND>"))
        .stdout(predicate::str::contains("simulated"))
        .stdout(predicate::str::contains("--request-timeout"))
        // The token is read from the environment only.
        .stdout(predicate::str::contains("api-key").not());
}

#[test]
fn test_cli_chat_help() {
    let mut cmd = Command::cargo_bin("modechat").unwrap();
    cmd.arg("chat")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: modechat chat"))
        .stdout(predicate::str::contains("--mode <MODE>"))
        .stdout(predicate::str::contains("retrieval"));
}

#[test]
fn test_cli_rejects_unknown_mode() {
    let mut cmd = Command::cargo_bin("modechat").unwrap();
    cmd.args(["chat", "--mode", "summarize"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'summarize'"));
}

#[test]
fn test_cli_no_command() {
    let mut cmd = Command::cargo_bin("modechat").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage: modechat <COMMAND>"));
}
