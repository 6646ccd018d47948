use std::process::ExitCode;

use clap::Args;
use log::debug;
use serde_json::json;

use cmdtree::commands::{HandlerResult, exit_code};
use cmdtree::{CmdTree, Handler, ParsedArgs, TreeError};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Command line to resolve, without the program name
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

fn report(args: &ParsedArgs) -> HandlerResult {
    let report = json!({
        "path": args.path(),
        "values": args.raw_values(),
        "extras": args.extras(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(None)
}

/// Install a reporting handler on every leaf and run the tree on the given command line.
///
/// # Errors
///
/// Returns an error if a handler fails or printing help fails.
pub fn run(args: &ResolveArgs, mut tree: CmdTree) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let leaves: Vec<_> = tree
        .subtree(None)
        .into_iter()
        .filter(|&id| tree.node(id).is_some_and(|node| node.children().is_empty()))
        .collect();
    debug!("Installing report handler on {} leaves", leaves.len());
    for id in leaves {
        if let Some(mut subcmd) = tree.subcmd(id) {
            subcmd.set_handler(Handler::new(report));
        }
    }

    let argv = std::iter::once(tree.root_name().to_string()).chain(args.argv.iter().cloned());
    match tree.run_from(argv.collect::<Vec<_>>()) {
        Ok(code) => Ok(exit_code(code)),
        Err(TreeError::Parse(e)) => {
            e.print()?;
            Ok(exit_code(e.exit_code()))
        }
        Err(e) => Err(e.into()),
    }
}
