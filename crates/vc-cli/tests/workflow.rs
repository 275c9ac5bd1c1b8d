use std::fs;

mod common;

use common::{commit_ids, parse_json, registry_dir, vc};

#[test]
fn repo_create_records_initial_commit() {
    let temp = registry_dir("vc-create");
    let root = temp.path();

    let created = parse_json(&vc(root).args(["repo", "create", "demo"]).assert().success());
    assert_eq!(created["status"], "ok");
    assert_eq!(created["details"]["commit"]["message"], "Initial commit");
    assert_eq!(created["details"]["commit"]["author"], "System");
    assert!(root.join("demo").join(".vc").join("HEAD").is_file());

    let listed = parse_json(&vc(root).args(["repo", "list"]).assert().success());
    let repos = listed["details"]["repositories"].as_array().expect("repos");
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["name"], "demo");
    assert_eq!(repos[0]["totalCommits"], 1);
}

#[test]
fn duplicate_repo_is_a_user_error() {
    let temp = registry_dir("vc-dup");
    let root = temp.path();
    vc(root).args(["repo", "create", "demo"]).assert().success();

    let dup = parse_json(&vc(root).args(["repo", "create", "demo"]).assert().code(1));
    assert_eq!(dup["status"], "user-error");
    assert_eq!(dup["details"]["code"], "VC409");
    assert_eq!(dup["details"]["reason"], "repository_exists");
}

#[test]
fn commit_log_branch_and_revert() {
    let temp = registry_dir("vc-flow");
    let root = temp.path();
    let created = parse_json(&vc(root).args(["repo", "create", "demo"]).assert().success());
    let initial = created["details"]["commit"]["id"]
        .as_str()
        .expect("initial id")
        .to_string();

    let upload = temp.path().join("readme-upload.md");
    fs::write(&upload, "hello world!").expect("write upload");
    let staged = parse_json(
        &vc(root)
            .args(["stage", "demo"])
            .arg(&upload)
            .args(["--path", "README.md"])
            .assert()
            .success(),
    );
    assert_eq!(staged["details"]["size"], 12);
    assert_eq!(staged["details"]["type"], "text/markdown");

    let committed = parse_json(
        &vc(root)
            .args(["commit", "demo", "-m", "add readme", "README.md"])
            .assert()
            .success(),
    );
    let second = committed["details"]["commit"]["id"]
        .as_str()
        .expect("commit id")
        .to_string();
    assert_eq!(committed["details"]["commit"]["author"], "tester");
    assert_eq!(committed["details"]["commit"]["parent"], initial.as_str());

    let log = parse_json(&vc(root).args(["log", "demo"]).assert().success());
    assert_eq!(commit_ids(&log), vec![second.clone(), initial.clone()]);

    vc(root)
        .args(["branch", "create", "demo", "feature", "--from", &initial])
        .assert()
        .success();
    let feature = parse_json(
        &vc(root)
            .args(["log", "demo", "--branch", "feature"])
            .assert()
            .success(),
    );
    assert_eq!(commit_ids(&feature), vec![initial.clone()]);

    vc(root).args(["checkout", "demo", "feature"]).assert().success();
    let branches = parse_json(&vc(root).args(["branch", "list", "demo"]).assert().success());
    assert_eq!(branches["details"]["current"], "feature");

    let readme = root.join("demo").join("README.md");
    fs::write(&readme, "scribbled").expect("overwrite readme");
    let reverted = parse_json(&vc(root).args(["revert", "demo", &second]).assert().success());
    assert_eq!(reverted["message"], format!("Reverted to commit {second}"));
    assert_eq!(fs::read_to_string(&readme).expect("read readme"), "hello world!");

    // Revert leaves history alone.
    let feature = parse_json(&vc(root).args(["log", "demo"]).assert().success());
    assert_eq!(commit_ids(&feature), vec![initial]);
}

#[test]
fn missing_entities_exit_with_one() {
    let temp = registry_dir("vc-missing");
    let root = temp.path();
    vc(root).args(["repo", "create", "demo"]).assert().success();

    let show = parse_json(
        &vc(root)
            .args(["show", "demo", "0123456789abcdef"])
            .assert()
            .code(1),
    );
    assert_eq!(show["details"]["reason"], "commit_not_found");

    let checkout = parse_json(&vc(root).args(["checkout", "demo", "nope"]).assert().code(1));
    assert_eq!(checkout["details"]["code"], "VC404");

    let stats = parse_json(&vc(root).args(["stats", "ghost"]).assert().code(1));
    assert_eq!(stats["details"]["reason"], "repository_not_found");
}

#[test]
fn log_limit_and_human_output() {
    let temp = registry_dir("vc-human");
    let root = temp.path();
    vc(root).args(["repo", "create", "demo"]).assert().success();
    vc(root)
        .args(["commit", "demo", "-m", "second"])
        .assert()
        .success();

    let limited = parse_json(&vc(root).args(["log", "demo", "-n", "1"]).assert().success());
    assert_eq!(limited["details"]["commits"].as_array().map(Vec::len), Some(1));
    assert_eq!(limited["details"]["commits"][0]["message"], "second");

    let output = assert_cmd::cargo::cargo_bin_cmd!("vc")
        .env_remove("VC_REPOS_DIR")
        .args(["--no-color", "--repos-dir"])
        .arg(root)
        .args(["log", "demo"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("2 commits on main"));
    assert!(text.contains("Initial commit"));
}
