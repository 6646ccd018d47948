use std::fmt::Write as _;
use std::io::IsTerminal;

use anstyle::Reset;
use clap::Command;

use crate::commands::node::NodeId;
use crate::commands::tree::{CmdTree, TreeError};
use crate::theme;

const SUBCOMMANDS_HEADING: &str = "Subcommands:";

impl CmdTree {
    /// Run `func` on the built clap command for `id`, with bin names filled in
    fn with_command<R>(
        &self,
        id: NodeId,
        func: impl FnOnce(&mut Command) -> R,
    ) -> Result<R, TreeError> {
        self.node(id).ok_or(TreeError::UnknownNode)?;
        let mut root = self.build_command();
        root.build();
        let mut command = &mut root;
        for name in self.path_of(id).iter().skip(1) {
            command = command
                .find_subcommand_mut(name)
                .ok_or(TreeError::UnknownNode)?;
        }
        Ok(func(command))
    }

    /// Help text of `id` as clap formats it, without styling.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::UnknownNode` if `id` is not part of this tree.
    pub fn render_help(&self, id: NodeId) -> Result<String, TreeError> {
        self.with_command(id, |command| command.render_help().to_string())
    }

    /// Print the help of `id` to stdout.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::UnknownNode` for a foreign `id` and `TreeError::Help`
    /// if writing fails.
    pub fn print_help(&self, id: NodeId) -> Result<(), TreeError> {
        self.with_command(id, Command::print_help)?
            .map_err(TreeError::Help)
    }

    /// Every subcommand below the root, one per line, indented by depth
    #[must_use]
    pub fn subcommand_listing(&self) -> String {
        let mut lines = Vec::new();
        self.collect_listing(self.root(), 0, false, &mut lines);
        lines.join("\n")
    }

    fn collect_listing(&self, id: NodeId, level: usize, styled: bool, lines: &mut Vec<String>) {
        let indent = "  ".repeat(level);
        for &child in self.at(id).children() {
            let node = self.at(child);
            let mut line = if styled {
                format!("{indent}  {}{}{Reset}", theme::COMMAND, node.name())
            } else {
                format!("{indent}  {}", node.name())
            };
            if !node.aliases().is_empty() {
                let aliases = node.aliases().join(", ");
                if styled {
                    let _ = write!(line, " {}({aliases}){Reset}", theme::ALIAS);
                } else {
                    let _ = write!(line, " ({aliases})");
                }
            }
            if let Some(help) = node.help() {
                let _ = write!(line, ": {help}");
            }
            lines.push(line);
            self.collect_listing(child, level + 1, styled, lines);
        }
    }

    fn format_overview(&self, styled: bool) -> String {
        let usage = self.build_command().render_usage().to_string();
        let mut lines = Vec::new();
        self.collect_listing(self.root(), 0, styled, &mut lines);
        let heading = if styled {
            format!("{}{SUBCOMMANDS_HEADING}{Reset}", theme::HEADING)
        } else {
            SUBCOMMANDS_HEADING.to_string()
        };
        format!("{usage}\n\n{heading}\n{}", lines.join("\n"))
    }

    /// Usage line of the root followed by the whole subcommand listing
    #[must_use]
    pub fn overview(&self) -> String {
        self.format_overview(false)
    }

    /// Print [`overview`](Self::overview), styled when stdout is a terminal
    pub fn print_overview(&self) {
        println!("{}", self.format_overview(std::io::stdout().is_terminal()));
    }
}
