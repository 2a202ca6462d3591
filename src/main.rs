//! repolens CLI entry point.

use clap::Parser;
use repolens::config::Config;
use repolens::pipeline::{self, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "repolens",
    version,
    about = "Analyze a repository with an LLM and file the findings as issues"
)]
struct Args {
    /// Repository to analyze
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Model identifier to use for this run
    #[arg(long)]
    model: Option<String>,

    /// Files per batch during multi-file analysis
    #[arg(long)]
    batch_size: Option<usize>,

    /// Analyze at most this many files
    #[arg(long)]
    max_files: Option<usize>,

    /// Skip per-file analysis; run only the repository-level pass
    #[arg(long)]
    repo_only: bool,

    /// Open a GitHub issue for each finding (requires GITHUB_TOKEN)
    #[arg(long)]
    create_issues: bool,

    /// Print the config file location and exit
    #[arg(long)]
    config_path: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.config_path {
        println!("{}", Config::config_location());
        return ExitCode::SUCCESS;
    }

    let mut config = Config::load();
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    let options = RunOptions {
        repo_path: args.path,
        max_files: args.max_files,
        repo_only: args.repo_only,
        create_issues: args.create_issues,
    };

    match pipeline::run(config, &options).await {
        Ok(report) => {
            print!("{}", report.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
