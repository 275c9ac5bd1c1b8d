use color_eyre::Result;
use serde_json::{json, Value};
use vc_core::ExecutionOutcome;

use crate::cli::{BranchCommand, CommandGroupCli, RepoCommand, VcCli};
use crate::style::Style;

/// Print the outcome and return the process exit code.
pub fn emit_output(cli: &VcCli, style: &Style, outcome: &ExecutionOutcome) -> Result<i32> {
    let code = outcome.exit_code();
    if cli.json {
        let payload = json!({
            "status": outcome.status.as_str(),
            "message": outcome.message,
            "details": outcome.details,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    if code != 0 {
        eprintln!("{}", style.status(outcome.status, &outcome.message));
        return Ok(code);
    }
    if cli.quiet {
        return Ok(code);
    }
    println!("{}", style.status(outcome.status, &outcome.message));
    for line in detail_lines(style, &cli.command, &outcome.details) {
        println!("{line}");
    }
    Ok(code)
}

fn detail_lines(style: &Style, command: &CommandGroupCli, details: &Value) -> Vec<String> {
    match command {
        CommandGroupCli::Log(_) => list(details, "commits")
            .iter()
            .map(|commit| commit_line(style, commit))
            .collect(),
        CommandGroupCli::Show(_) | CommandGroupCli::Revert(_) => details
            .get("commit")
            .map(|commit| file_lines(style, commit))
            .unwrap_or_default(),
        CommandGroupCli::Branch(BranchCommand::List(_)) => list(details, "branches")
            .iter()
            .map(|branch| branch_line(style, branch))
            .collect(),
        CommandGroupCli::Repo(RepoCommand::List) => list(details, "repositories")
            .iter()
            .map(|repo| {
                format!(
                    "  {}  {} commits on {}",
                    text(repo, "name"),
                    repo.get("totalCommits").and_then(Value::as_u64).unwrap_or(0),
                    text(repo, "currentBranch"),
                )
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn commit_line(style: &Style, commit: &Value) -> String {
    format!(
        "  {}  {}  {}  {}",
        style.commit_id(text(commit, "id")),
        style.dim(text(commit, "timestamp")),
        text(commit, "author"),
        text(commit, "message"),
    )
}

fn file_lines(style: &Style, commit: &Value) -> Vec<String> {
    list(commit, "files")
        .iter()
        .map(|file| {
            let hash = file.get("hash").and_then(Value::as_str).unwrap_or("-");
            format!(
                "  {}  {}  {} bytes",
                style.dim(hash),
                text(file, "path"),
                file.get("size").and_then(Value::as_u64).unwrap_or(0),
            )
        })
        .collect()
}

fn branch_line(style: &Style, branch: &Value) -> String {
    let name = text(branch, "name");
    let current = branch
        .get("isCurrent")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let count = branch
        .get("commitCount")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    if current {
        format!("* {}  ({count} commits)", style.current(name))
    } else {
        format!("  {name}  ({count} commits)")
    }
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}
