use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "grovr")]
#[command(about = "grovr - Manage git worktrees across projects from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the UI and apply a grovr:// deep link once projects are loaded
    Open {
        /// Deep link, e.g. grovr://create-worktree?project=api&issue=PROJ-12
        uri: String,
    },

    /// Print a deep link
    Link {
        /// Route: create-worktree or settings
        #[arg(default_value = "create-worktree")]
        route: String,
        /// Project name hint
        #[arg(long)]
        project: Option<String>,
        /// Issue key
        #[arg(long)]
        issue: Option<String>,
        /// Worktree description
        #[arg(long)]
        description: Option<String>,
        /// Branch name
        #[arg(long)]
        branch: Option<String>,
    },

    /// Write the default config file to ~/.grovr
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Configure the code-hosting integration
    Github {
        #[command(subcommand)]
        action: GithubAction,
    },

    /// Configure the issue-tracker integration
    Jira {
        #[command(subcommand)]
        action: JiraAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum GithubAction {
    /// Validate a token and store it
    Set {
        /// Access token
        token: String,
        /// Display name for this configuration
        #[arg(long, default_value = "GitHub")]
        name: String,
        /// Enterprise host, e.g. github.example.com
        #[arg(long)]
        enterprise_host: Option<String>,
    },
    /// Remove the stored configuration
    Remove,
}

#[derive(Debug, Subcommand)]
pub enum JiraAction {
    /// Validate credentials and store them
    Set {
        /// Site host, e.g. acme.atlassian.net
        host: String,
        /// Account email
        email: String,
        /// API token
        token: String,
    },
    /// Remove the stored configuration
    Remove,
}
