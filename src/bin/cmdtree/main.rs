mod check;
mod overview;
mod resolve;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cmdtree::load_manifest;

#[derive(Parser, Debug)]
#[command(name = "cmdtree", about = "Inspect command trees declared in a manifest")]
struct Cli {
    /// Path to manifest file (auto-detected if not specified)
    #[arg(short, long)]
    manifest: Option<String>,

    /// Log file path (logs are also written to stderr)
    #[arg(long)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every subcommand with its aliases and help
    Tree,
    /// Resolve a command line against the tree and print what a handler would receive
    Resolve(resolve::ResolveArgs),
    /// Validate the manifest and build the full clap command
    Check,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .as_ref()
        .map(std::fs::File::create)
        .transpose()?;
    cmdtree::logger::init(log_file)?;

    let (tree, manifest_path) = load_manifest(cli.manifest.as_deref())?;

    match cli.command {
        Commands::Tree => Ok(overview::run(tree)),
        Commands::Resolve(ref args) => resolve::run(args, tree),
        Commands::Check => Ok(check::run(tree, &manifest_path)),
    }
}
