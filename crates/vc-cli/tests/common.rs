#![allow(dead_code)]

use std::path::Path;

use assert_cmd::{assert::Assert, Command};
use serde_json::Value;
use tempfile::TempDir;

pub fn registry_dir(prefix: &str) -> TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("tempdir")
}

/// `vc --json --repos-dir <root>` with the author pinned.
pub fn vc(root: &Path) -> Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("vc");
    cmd.env_remove("VC_REPOS_DIR")
        .env_remove("VC_HISTORY_LIMIT")
        .env("VC_DEFAULT_AUTHOR", "tester")
        .arg("--json")
        .arg("--repos-dir")
        .arg(root);
    cmd
}

pub fn parse_json(assert: &Assert) -> Value {
    serde_json::from_slice(&assert.get_output().stdout).expect("valid json")
}

pub fn commit_ids(payload: &Value) -> Vec<String> {
    payload["details"]["commits"]
        .as_array()
        .expect("commits array")
        .iter()
        .map(|c| c["id"].as_str().expect("commit id").to_string())
        .collect()
}
