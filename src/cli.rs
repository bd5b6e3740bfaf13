use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cloudup")]
#[command(version)]
#[command(about = "Reconcile IAM role policies against AWS or Terraform", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: cloudup.toml in the config directory)
    #[arg(short, long, global = true, env = "CLOUDUP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Make AWS match the config
    Apply(ApplyArgs),

    /// Write the config as a Terraform JSON module
    Render(RenderArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan a kind or a single resource (e.g. role_policy.nodes)
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply a kind or a single resource (e.g. role_policy.nodes)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Dry run - show what would be done
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Output directory for main.tf.json and its data files
    #[arg(short, long)]
    pub out: PathBuf,

    /// Only render a kind or a single resource (e.g. role_policy.nodes)
    #[arg(short, long)]
    pub target: Option<String>,
}
