use std::process::ExitCode;

use cmdtree::CmdTree;

/// Print the usage line and subcommand listing
pub fn run(mut tree: CmdTree) -> ExitCode {
    tree.apply_common_args();
    tree.print_overview();
    ExitCode::SUCCESS
}
