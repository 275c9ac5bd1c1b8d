// Collaborator-facing operations.
//
// Each function takes a `CommandContext` and a request, and returns an
// `ExecutionOutcome` envelope. Any transport (the `vc` CLI today) renders the
// envelope; none of them reach into the stores directly.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::config::Config;
use crate::core::errors::VcError;
use crate::core::repo::{Registry, Repository};
use crate::core::tooling::diagnostics;
use crate::core::tooling::outcome::ExecutionOutcome;

/// Configuration plus the registry it points at.
#[derive(Debug, Clone)]
pub struct CommandContext {
    config: Config,
    registry: Registry,
}

impl CommandContext {
    /// Creates the registry root if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the registry directory cannot be created.
    pub fn new(config: Config) -> Result<Self> {
        let registry = Registry::new(config.registry().root.clone())?;
        Ok(Self { config, registry })
    }

    /// # Errors
    /// Returns an error if the registry directory cannot be created.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn open(&self, repo: &str) -> Result<Repository> {
        self.registry.open(repo)
    }
}

#[derive(Debug, Clone)]
pub struct StageRequest {
    pub repo: String,
    pub path: String,
    pub source: PathBuf,
    pub media_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub repo: String,
    pub message: String,
    pub author: Option<String>,
    /// Working-tree paths to include; they must exist.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub repo: String,
    pub branch: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct BranchCreateRequest {
    pub repo: String,
    pub name: String,
    pub from: Option<String>,
}

/// # Errors
/// Returns an error if the repository cannot be created.
pub fn repo_create(ctx: &CommandContext, name: &str) -> Result<ExecutionOutcome> {
    let (repo, initial) = ctx.registry().create(name)?;
    Ok(ExecutionOutcome::success(
        format!("Created repository {name}"),
        json!({
            "repo": name,
            "path": repo.root().display().to_string(),
            "commit": initial,
        }),
    ))
}

/// # Errors
/// Returns an error if any repository cannot be read.
pub fn repo_list(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let repos = ctx.registry().list()?;
    let message = match repos.len() {
        0 => "No repositories".to_string(),
        1 => "1 repository".to_string(),
        n => format!("{n} repositories"),
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({ "repositories": repos }),
    ))
}

/// # Errors
/// Returns an error if the repository is missing or its metadata is corrupt.
pub fn repo_stats(ctx: &CommandContext, repo: &str) -> Result<ExecutionOutcome> {
    let stats = ctx.open(repo)?.stats()?;
    Ok(ExecutionOutcome::success(
        format!(
            "{repo}: {} commits on {}, {} branches",
            stats.total_commits, stats.current_branch, stats.total_branches
        ),
        json!({ "repo": repo, "stats": stats }),
    ))
}

/// # Errors
/// Returns an error if the path is invalid or the source cannot be copied.
pub fn stage(ctx: &CommandContext, request: &StageRequest) -> Result<ExecutionOutcome> {
    let repo = ctx.open(&request.repo)?;
    let media_type = request
        .media_type
        .clone()
        .or_else(|| guess_media_type(&request.path));
    let tracked = repo.stage(&request.path, &request.source, media_type)?;
    Ok(ExecutionOutcome::success(
        format!("Staged {} ({} bytes)", tracked.path, tracked.size),
        json!({
            "repo": request.repo,
            "path": tracked.path,
            "size": tracked.size,
            "type": tracked.media_type,
        }),
    ))
}

/// # Errors
/// Returns an error if a path is invalid or missing, or the commit cannot be
/// written.
pub fn commit(ctx: &CommandContext, request: &CommitRequest) -> Result<ExecutionOutcome> {
    let repo = ctx.open(&request.repo)?;
    let files = request
        .paths
        .iter()
        .map(|path| repo.track(path, guess_media_type(path)))
        .collect::<Result<Vec<_>>>()?;
    let author = request
        .author
        .as_deref()
        .unwrap_or(&ctx.config().commit().default_author);
    let commit = repo.commit(&request.message, author, &files)?;
    let branch = repo.current_branch()?;
    Ok(ExecutionOutcome::success(
        format!("[{branch} {}] {}", commit.id, commit.message),
        json!({ "repo": request.repo, "branch": branch, "commit": commit }),
    ))
}

/// # Errors
/// Returns an error if the repository or branch is missing, or history
/// references a missing commit.
pub fn history(ctx: &CommandContext, request: &HistoryRequest) -> Result<ExecutionOutcome> {
    let repo = ctx.open(&request.repo)?;
    let limit = request
        .limit
        .unwrap_or(ctx.config().history().default_limit);
    let (branch, commits) = match request.branch.as_deref() {
        Some(branch) => (branch.to_string(), repo.branch_history(branch, limit)?),
        None => (repo.current_branch()?, repo.history(limit)?),
    };
    debug!(repo = %request.repo, %branch, limit, returned = commits.len(), "history listed");
    Ok(ExecutionOutcome::success(
        format!("{} commits on {branch}", commits.len()),
        json!({ "repo": request.repo, "branch": branch, "commits": commits }),
    ))
}

/// # Errors
/// Returns an error if the commit does not exist.
pub fn show(ctx: &CommandContext, repo: &str, commit_id: &str) -> Result<ExecutionOutcome> {
    let commit = ctx.open(repo)?.get_commit(commit_id)?;
    Ok(ExecutionOutcome::success(
        format!("commit {} by {}: {}", commit.id, commit.author, commit.message),
        json!({ "repo": repo, "commit": commit }),
    ))
}

/// # Errors
/// Returns an error if branch metadata cannot be read.
pub fn branch_list(ctx: &CommandContext, repo: &str) -> Result<ExecutionOutcome> {
    let repo_handle = ctx.open(repo)?;
    let branches = repo_handle.list_branches()?;
    let current = repo_handle.current_branch()?;
    Ok(ExecutionOutcome::success(
        format!("{} branches, on {current}", branches.len()),
        json!({ "repo": repo, "current": current, "branches": branches }),
    ))
}

/// # Errors
/// Returns an error if the name is invalid or taken, or the fork point is not
/// on the current branch.
pub fn branch_create(ctx: &CommandContext, request: &BranchCreateRequest) -> Result<ExecutionOutcome> {
    let repo = ctx.open(&request.repo)?;
    let name = repo.create_branch(&request.name, request.from.as_deref())?;
    let record = repo.branch_history(&name, usize::MAX)?;
    let message = match request.from.as_deref() {
        Some(from) => format!("Created branch {name} at {from}"),
        None => format!("Created branch {name}"),
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "repo": request.repo,
            "branch": name,
            "from": request.from,
            "commitCount": record.len(),
            "head": record.first().map(|c| c.id.clone()),
        }),
    ))
}

/// # Errors
/// Returns an error if the branch does not exist.
pub fn checkout(ctx: &CommandContext, repo: &str, branch: &str) -> Result<ExecutionOutcome> {
    let current = ctx.open(repo)?.switch_branch(branch)?;
    Ok(ExecutionOutcome::success(
        format!("Switched to branch {current}"),
        json!({ "repo": repo, "branch": current }),
    ))
}

/// # Errors
/// Returns an error if the commit or its snapshot is missing.
pub fn revert(ctx: &CommandContext, repo: &str, commit_id: &str) -> Result<ExecutionOutcome> {
    let commit = ctx.open(repo)?.revert_to(commit_id)?;
    Ok(ExecutionOutcome::success(
        format!("Reverted to commit {}", commit.id),
        json!({ "repo": repo, "commit": commit }),
    ))
}

/// Map an operation error to an envelope. Engine errors are the caller's
/// problem; anything else is an internal failure.
#[must_use]
pub fn error_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    if let Some(vc) = err.downcast_ref::<VcError>() {
        return ExecutionOutcome::user_error(
            vc.to_string(),
            json!({ "code": vc.code(), "reason": vc.reason() }),
        );
    }
    let issues: Vec<String> = err.chain().map(std::string::ToString::to_string).collect();
    ExecutionOutcome::failure(
        err.to_string(),
        json!({
            "code": diagnostics::INTERNAL,
            "reason": "internal_error",
            "error": err.to_string(),
            "issues": issues,
        }),
    )
}

/// Best-effort media type from a file extension.
#[must_use]
pub fn guess_media_type(path: &str) -> Option<String> {
    let ext = Path::new(path).extension()?.to_str()?.to_ascii_lowercase();
    let media = match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "toml" => "application/toml",
        "yaml" | "yml" => "application/yaml",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(media.to_string())
}

/// Extract the envelope's `details.code`, if any.
#[must_use]
pub fn detail_code(outcome: &ExecutionOutcome) -> Option<&str> {
    outcome.details.get("code").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use anyhow::anyhow;
    use tempfile::tempdir;

    use super::*;
    use crate::core::config::EnvSnapshot;
    use crate::core::tooling::outcome::CommandStatus;

    fn context(root: &Path) -> Result<CommandContext> {
        let env = EnvSnapshot::testing(&[("VC_DEFAULT_AUTHOR", "tester")]);
        CommandContext::new(Config::from_snapshot(&env).with_repos_dir(root.join("repos")))
    }

    fn run(result: Result<ExecutionOutcome>) -> ExecutionOutcome {
        result.unwrap_or_else(|err| error_outcome(&err))
    }

    #[test]
    fn create_commit_and_list_history() -> Result<()> {
        let temp = tempdir()?;
        let ctx = context(temp.path())?;
        let created = repo_create(&ctx, "demo")?;
        assert_eq!(created.status, CommandStatus::Ok);

        let upload = temp.path().join("upload");
        fs::write(&upload, b"hello world!")?;
        let staged = stage(
            &ctx,
            &StageRequest {
                repo: "demo".into(),
                path: "README.md".into(),
                source: upload,
                media_type: None,
            },
        )?;
        assert_eq!(staged.details["type"], "text/markdown");

        let committed = commit(
            &ctx,
            &CommitRequest {
                repo: "demo".into(),
                message: "add readme".into(),
                author: None,
                paths: vec!["README.md".into()],
            },
        )?;
        assert_eq!(committed.details["commit"]["author"], "tester");
        assert_eq!(committed.details["commit"]["files"][0]["size"], 12);

        let log = history(
            &ctx,
            &HistoryRequest {
                repo: "demo".into(),
                branch: None,
                limit: None,
            },
        )?;
        let commits = log.details["commits"].as_array().cloned().unwrap_or_default();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0]["message"], "add readme");
        assert_eq!(commits[1]["message"], "Initial commit");
        Ok(())
    }

    #[test]
    fn engine_errors_become_user_errors() -> Result<()> {
        let temp = tempdir()?;
        let ctx = context(temp.path())?;
        repo_create(&ctx, "demo")?;

        let missing = run(show(&ctx, "demo", "0123456789abcdef"));
        assert_eq!(missing.status, CommandStatus::UserError);
        assert_eq!(detail_code(&missing), Some(diagnostics::NOT_FOUND));
        assert_eq!(missing.details["reason"], "commit_not_found");

        let dup = run(repo_create(&ctx, "demo"));
        assert_eq!(detail_code(&dup), Some(diagnostics::CONFLICT));
        assert_eq!(dup.exit_code(), 1);

        let bad = run(checkout(&ctx, "demo", "../main"));
        assert_eq!(detail_code(&bad), Some(diagnostics::INVALID_NAME));

        let none = run(repo_stats(&ctx, "nope"));
        assert_eq!(detail_code(&none), Some(diagnostics::NOT_FOUND));
        Ok(())
    }

    #[test]
    fn other_errors_are_failures() {
        let err = anyhow!("disk on fire").context("failed to write record");
        let outcome = error_outcome(&err);
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert_eq!(outcome.exit_code(), 2);
        assert_eq!(outcome.details["reason"], "internal_error");
        assert_eq!(outcome.details["issues"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn branch_checkout_and_revert() -> Result<()> {
        let temp = tempdir()?;
        let ctx = context(temp.path())?;
        let created = repo_create(&ctx, "demo")?;
        let initial = created.details["commit"]["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow!("missing commit id"))?;

        let branch = branch_create(
            &ctx,
            &BranchCreateRequest {
                repo: "demo".into(),
                name: "feature".into(),
                from: Some(initial.clone()),
            },
        )?;
        assert_eq!(branch.details["commitCount"], 1);
        assert_eq!(branch.details["head"], initial.as_str());

        checkout(&ctx, "demo", "feature")?;
        let listed = branch_list(&ctx, "demo")?;
        assert_eq!(listed.details["current"], "feature");

        let reverted = revert(&ctx, "demo", &initial)?;
        assert_eq!(reverted.message, format!("Reverted to commit {initial}"));
        Ok(())
    }

    #[test]
    fn history_limit_falls_back_to_config() -> Result<()> {
        let temp = tempdir()?;
        let env = EnvSnapshot::testing(&[("VC_HISTORY_LIMIT", "1")]);
        let ctx =
            CommandContext::new(Config::from_snapshot(&env).with_repos_dir(temp.path().join("r")))?;
        repo_create(&ctx, "demo")?;
        commit(
            &ctx,
            &CommitRequest {
                repo: "demo".into(),
                message: "second".into(),
                author: Some("alice".into()),
                paths: Vec::new(),
            },
        )?;
        let log = history(
            &ctx,
            &HistoryRequest {
                repo: "demo".into(),
                branch: Some("main".into()),
                limit: None,
            },
        )?;
        assert_eq!(log.details["commits"].as_array().map(Vec::len), Some(1));
        assert_eq!(log.details["commits"][0]["author"], "alice");
        Ok(())
    }

    #[test]
    fn media_types_follow_extensions() {
        assert_eq!(guess_media_type("a/b.PNG").as_deref(), Some("image/png"));
        assert_eq!(guess_media_type("notes.txt").as_deref(), Some("text/plain"));
        assert_eq!(guess_media_type("Makefile"), None);
        assert_eq!(guess_media_type("data.unknown"), None);
    }
}
