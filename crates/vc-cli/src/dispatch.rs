use std::path::Path;

use anyhow::{anyhow, Result};
use tracing::debug;
use vc_core::api::{
    self, BranchCreateRequest, CommandContext, CommitRequest, HistoryRequest, StageRequest,
};
use vc_core::{Config, ExecutionOutcome};

use crate::cli::{BranchCommand, CommandGroupCli, RepoCommand, VcCli};

/// Run the parsed command. Every error, setup included, comes back as an
/// envelope so the caller only has to render it.
pub fn dispatch(cli: &VcCli) -> ExecutionOutcome {
    core_call(command_name(&cli.command), || {
        let mut config = Config::from_env();
        if let Some(dir) = &cli.repos_dir {
            config = config.with_repos_dir(dir);
        }
        let ctx = CommandContext::new(config)?;
        run(&ctx, &cli.command)
    })
}

fn run(ctx: &CommandContext, command: &CommandGroupCli) -> Result<ExecutionOutcome> {
    match command {
        CommandGroupCli::Repo(RepoCommand::Create(args)) => api::repo_create(ctx, &args.repo),
        CommandGroupCli::Repo(RepoCommand::List) => api::repo_list(ctx),
        CommandGroupCli::Stats(args) => api::repo_stats(ctx, &args.repo),
        CommandGroupCli::Stage(args) => {
            let path = match &args.path {
                Some(path) => path.clone(),
                None => file_name(&args.source)?,
            };
            api::stage(
                ctx,
                &StageRequest {
                    repo: args.repo.clone(),
                    path,
                    source: args.source.clone(),
                    media_type: args.media_type.clone(),
                },
            )
        }
        CommandGroupCli::Commit(args) => api::commit(
            ctx,
            &CommitRequest {
                repo: args.repo.clone(),
                message: args.message.clone(),
                author: args.author.clone(),
                paths: args.paths.clone(),
            },
        ),
        CommandGroupCli::Log(args) => api::history(
            ctx,
            &HistoryRequest {
                repo: args.repo.clone(),
                branch: args.branch.clone(),
                limit: args.limit,
            },
        ),
        CommandGroupCli::Show(args) => api::show(ctx, &args.repo, &args.commit),
        CommandGroupCli::Branch(BranchCommand::List(args)) => api::branch_list(ctx, &args.repo),
        CommandGroupCli::Branch(BranchCommand::Create(args)) => api::branch_create(
            ctx,
            &BranchCreateRequest {
                repo: args.repo.clone(),
                name: args.name.clone(),
                from: args.from.clone(),
            },
        ),
        CommandGroupCli::Checkout(args) => api::checkout(ctx, &args.repo, &args.branch),
        CommandGroupCli::Revert(args) => api::revert(ctx, &args.repo, &args.commit),
    }
}

fn file_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("cannot derive a path from {}; pass --path", source.display()))
}

fn command_name(command: &CommandGroupCli) -> &'static str {
    match command {
        CommandGroupCli::Repo(RepoCommand::Create(_)) => "repo create",
        CommandGroupCli::Repo(RepoCommand::List) => "repo list",
        CommandGroupCli::Stats(_) => "stats",
        CommandGroupCli::Stage(_) => "stage",
        CommandGroupCli::Commit(_) => "commit",
        CommandGroupCli::Log(_) => "log",
        CommandGroupCli::Show(_) => "show",
        CommandGroupCli::Branch(BranchCommand::List(_)) => "branch list",
        CommandGroupCli::Branch(BranchCommand::Create(_)) => "branch create",
        CommandGroupCli::Checkout(_) => "checkout",
        CommandGroupCli::Revert(_) => "revert",
    }
}

fn core_call<F>(name: &'static str, action: F) -> ExecutionOutcome
where
    F: FnOnce() -> Result<ExecutionOutcome>,
{
    debug!(command = name, "running");
    match action() {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!(command = name, error = %err, "command failed");
            api::error_outcome(&err)
        }
    }
}
