//! Integration tests for the dredge binary.
//!
//! These tests drive the compiled binary with assert_cmd against real
//! repositories created via tempfile.

use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Create a git repository with an initial commit on `main`.
fn init_repo() -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    run_git(dir.path(), &["init"]);
    run_git(dir.path(), &["config", "user.email", "test@example.com"]);
    run_git(dir.path(), &["config", "user.name", "Test User"]);
    std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
    run_git(dir.path(), &["add", "README.md"]);
    run_git(dir.path(), &["commit", "-m", "Initial commit"]);
    run_git(dir.path(), &["branch", "-M", "main"]);
    dir
}

/// Leave a dangling commit behind: commit on a branch, delete the branch,
/// expire every reflog.
fn erase_branch(dir: &Path, path: &str, content: &str, message: &str) {
    run_git(dir, &["checkout", "-b", "doomed"]);
    std::fs::write(dir.join(path), content).unwrap();
    run_git(dir, &["add", path]);
    run_git(dir, &["commit", "-m", message]);
    run_git(dir, &["checkout", "main"]);
    run_git(dir, &["branch", "-D", "doomed"]);
    run_git(
        dir,
        &["reflog", "expire", "--expire=now", "--expire-unreachable=now", "--all"],
    );
    run_git(
        dir,
        &["reflog", "expire", "--expire=now", "--expire-unreachable=now", "HEAD"],
    );
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");
    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

fn dredge() -> Command {
    Command::cargo_bin("dredge").expect("binary should build")
}

#[test]
fn clean_repo_exits_zero() {
    let repo = init_repo();
    dredge()
        .arg(repo.path())
        .arg("--no-remote")
        .assert()
        .success()
        .stdout(predicate::str::contains("no dangling objects found"));
}

#[test]
fn non_repository_path_fails() {
    let dir = TempDir::new().unwrap();
    dredge()
        .arg(dir.path())
        .arg("--no-remote")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a git repository"));
}

#[test]
fn erased_branch_content_is_printed() {
    let repo = init_repo();
    erase_branch(repo.path(), "config", "SECRET=xyz\n", "oops");

    dredge()
        .arg(repo.path())
        .arg("--no-remote")
        .assert()
        .success()
        .stdout(predicate::str::contains("dangling commit"))
        .stdout(predicate::str::contains("oops"))
        .stdout(predicate::str::contains("SECRET=xyz"));
}

#[test]
fn json_output_is_parseable() {
    let repo = init_repo();
    erase_branch(repo.path(), "config", "SECRET=xyz\n", "oops");

    let output = dredge()
        .arg(repo.path())
        .arg("--no-remote")
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let reports: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["summary"], "oops");
    assert!(reports[0]["head"].as_str().unwrap().len() >= 40);
}

#[test]
fn reports_can_be_written_to_a_file() {
    let repo = init_repo();
    erase_branch(repo.path(), "config", "SECRET=xyz\n", "oops");
    let out_path = repo.path().join("findings.json");

    dredge()
        .arg(repo.path())
        .arg("--no-remote")
        .arg("--json")
        .arg("--output")
        .arg(&out_path)
        .assert()
        .success();

    let raw = std::fs::read(&out_path).unwrap();
    let reports: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(reports.as_array().unwrap().len(), 1);
}

#[test]
fn quiet_mode_still_prints_reports() {
    let repo = init_repo();
    erase_branch(repo.path(), "config", "SECRET=xyz\n", "oops");

    dredge()
        .arg(repo.path())
        .arg("--no-remote")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("SECRET=xyz"))
        .stdout(predicate::str::contains("no dangling").not());
}

#[test]
fn help_documents_the_flags() {
    dredge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-remote"))
        .stdout(predicate::str::contains("--retention-days"))
        .stdout(predicate::str::contains("OWNER/REPO"));
}

#[test]
fn server_flag_selects_the_forge() {
    // A clean store never reaches the network, so the flag can be
    // exercised end to end without a live GitLab instance.
    let repo = init_repo();
    dredge()
        .arg(repo.path())
        .arg("--server")
        .arg("gitlab")
        .arg("--remote")
        .arg("group/sub/project")
        .assert()
        .success()
        .stdout(predicate::str::contains("no dangling objects found"));

    dredge()
        .arg(repo.path())
        .arg("--server")
        .arg("sourcehut")
        .assert()
        .failure();
}

#[test]
fn malformed_remote_spec_is_rejected() {
    let repo = init_repo();
    dredge()
        .arg(repo.path())
        .arg("--remote")
        .arg("not-a-spec")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OWNER/REPO"));
}
