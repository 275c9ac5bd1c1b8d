use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "vc",
    author,
    version,
    about = "Snapshot-based version control",
    disable_help_subcommand = true
)]
#[allow(clippy::struct_excessive_bools)]
pub struct VcCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(long, help = "Emit {status,message,details} JSON envelopes", global = true)]
    pub json: bool,
    #[arg(long, help = "Disable colored output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        env = "VC_REPOS_DIR",
        value_name = "DIR",
        help = "Directory holding the repositories",
        global = true
    )]
    pub repos_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(subcommand, about = "Create or list repositories")]
    Repo(RepoCommand),
    #[command(about = "Show repository statistics")]
    Stats(RepoArg),
    #[command(about = "Copy a file into a repository's working tree")]
    Stage(StageArgs),
    #[command(about = "Record working-tree files as a new commit")]
    Commit(CommitArgs),
    #[command(about = "List commits, newest first")]
    Log(LogArgs),
    #[command(about = "Show one commit")]
    Show(ShowArgs),
    #[command(subcommand, about = "List or create branches")]
    Branch(BranchCommand),
    #[command(about = "Switch the current branch (the working tree is left alone)")]
    Checkout(CheckoutArgs),
    #[command(about = "Restore a commit's files onto the working tree")]
    Revert(ShowArgs),
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    #[command(about = "Create a repository with an initial commit")]
    Create(RepoArg),
    #[command(about = "List repositories with their stats")]
    List,
}

#[derive(Subcommand, Debug)]
pub enum BranchCommand {
    #[command(about = "List branches of a repository")]
    List(RepoArg),
    #[command(about = "Create a branch from the current one")]
    Create(BranchCreateArgs),
}

#[derive(Args, Debug)]
pub struct RepoArg {
    #[arg(value_name = "REPO")]
    pub repo: String,
}

#[derive(Args, Debug)]
pub struct StageArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(value_name = "SOURCE", help = "File to copy in")]
    pub source: PathBuf,
    #[arg(long, value_name = "PATH", help = "Destination path inside the repository")]
    pub path: Option<String>,
    #[arg(long = "type", value_name = "MEDIA_TYPE")]
    pub media_type: Option<String>,
}

#[derive(Args, Debug)]
pub struct CommitArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(short, long)]
    pub message: String,
    #[arg(long, help = "Defaults to VC_DEFAULT_AUTHOR or Anonymous")]
    pub author: Option<String>,
    #[arg(value_name = "PATH", help = "Working-tree paths to include")]
    pub paths: Vec<String>,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(long, help = "Branch to list instead of the current one")]
    pub branch: Option<String>,
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(value_name = "COMMIT")]
    pub commit: String,
}

#[derive(Args, Debug)]
pub struct BranchCreateArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(value_name = "NAME")]
    pub name: String,
    #[arg(long, value_name = "COMMIT", help = "Fork point on the current branch")]
    pub from: Option<String>,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[arg(value_name = "REPO")]
    pub repo: String,
    #[arg(value_name = "BRANCH")]
    pub branch: String,
}
