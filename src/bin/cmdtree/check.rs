use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;

use anstyle::Reset;

use cmdtree::CmdTree;
use cmdtree::theme::SUCCESS;

/// Apply common arguments, build the complete clap command and report the result
pub fn run(mut tree: CmdTree, manifest_path: &Path) -> ExitCode {
    tree.apply_common_args();
    let mut command = tree.build_command();
    command.build();

    let summary = format!(
        "{}: {} subcommands under `{}`",
        manifest_path.display(),
        tree.node_count() - 1,
        tree.root_name()
    );
    if std::io::stdout().is_terminal() {
        println!("{SUCCESS}ok{Reset} {summary}");
    } else {
        println!("ok {summary}");
    }
    ExitCode::SUCCESS
}
