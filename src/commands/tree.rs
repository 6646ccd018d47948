use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::process::ExitCode;

use clap::{ArgMatches, Command};
use log::{debug, error, warn};
use thiserror::Error;

use crate::commands::chain::{Handler, HandlerResult};
use crate::commands::inherit::CommonArgs;
use crate::commands::node::{Node, NodeId};
use crate::commands::parsed::ParsedArgs;
use crate::commands::subcmd::SubCmd;

const ROOT: NodeId = NodeId(0);

/// Errors raised while building or running a command tree
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("cannot register an empty subcommand path")]
    EmptyPath,
    #[error("subcommand `{}` already registered", .0.join(" "))]
    DuplicateRegistration(Vec<String>),
    #[error("bad subcommand chain: `{parent}` -> `{child}`")]
    BrokenChain { parent: String, child: String },
    #[error("`{parent}` already has a subcommand or alias named `{name}`")]
    DuplicateName { parent: String, name: String },
    #[error("node does not belong to this command tree")]
    UnknownNode,
    #[error(transparent)]
    Parse(#[from] clap::Error),
    #[error("unable to print help: {0}")]
    Help(#[source] std::io::Error),
    #[error("{0}")]
    Handler(Box<dyn std::error::Error>),
}

/// Convert a handler's exit code into a process exit code
#[must_use]
pub fn exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

/// Tree of subcommands layered over a root `clap::Command`
#[derive(Debug)]
pub struct CmdTree {
    nodes: Vec<Node>,
    pub(crate) common: Vec<CommonArgs>,
}

impl CmdTree {
    /// Create a tree whose root command is called `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_command(Command::new(name.into()))
    }

    /// Create a tree around an existing root command (about, version, global args, ...)
    #[must_use]
    pub fn from_command(command: Command) -> Self {
        if command.has_subcommands() {
            warn!(
                "Root command `{}` already has subcommands; they are not managed by the tree",
                command.get_name()
            );
        }
        let name = command.get_name().to_string();
        Self {
            nodes: vec![Node::new(name, command, None, Handler::Help)],
            common: Vec::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        ROOT
    }

    #[must_use]
    pub fn root_name(&self) -> &str {
        &self.at(ROOT).name
    }

    /// Number of nodes, the root included
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn at(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn at_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Handle for attaching argument groups and handlers to `id`
    pub fn subcmd(&mut self, id: NodeId) -> Option<SubCmd<'_>> {
        self.node(id)?;
        Some(SubCmd::new(self, id))
    }

    /// Handle for the node `path` resolves to
    pub fn subcmd_at<S: AsRef<str>>(&mut self, path: &[S]) -> Option<SubCmd<'_>> {
        let id = self.find_chain(path).last().copied().flatten()?;
        Some(SubCmd::new(self, id))
    }

    /// Names from the root down to `id`
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            path.push(node.name.clone());
            current = node.parent.and_then(|parent| self.node(parent));
        }
        path.reverse();
        path
    }

    /// Direct child of `parent` called `name` (or aliased as `name`)
    #[must_use]
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent)?.lookup.get(name).copied()
    }

    /// Breadth-first search for a node named `name`.
    ///
    /// The root matches its own name first; otherwise the shallowest node whose
    /// name or alias matches wins. Different branches may reuse a name, in which
    /// case the deeper nodes are shadowed here and only reachable by path.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        if self.at(ROOT).name == name {
            return Some(ROOT);
        }
        let mut queue: VecDeque<NodeId> = self.at(ROOT).children.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let node = self.at(id);
            if node.answers_to(name) {
                return Some(id);
            }
            queue.extend(node.children.iter().copied());
        }
        None
    }

    /// Resolve every segment of `path`.
    ///
    /// The first segment is looked up with [`find`](Self::find), each later one as
    /// a child of the previous. After the first miss every entry is `None`.
    #[must_use]
    pub fn find_chain<S: AsRef<str>>(&self, path: &[S]) -> Vec<Option<NodeId>> {
        let mut chain = Vec::with_capacity(path.len());
        let Some((first, rest)) = path.split_first() else {
            return chain;
        };
        let mut current = self.find(first.as_ref());
        chain.push(current);
        for name in rest {
            current = current.and_then(|id| self.child(id, name.as_ref()));
            chain.push(current);
        }
        chain
    }

    /// Breadth-first listing of the subtree under `root` (the whole tree for `None`), root first.
    ///
    /// An unknown root yields an empty list.
    #[must_use]
    pub fn subtree(&self, root: Option<&str>) -> Vec<NodeId> {
        match root {
            None => self.subtree_of(ROOT),
            Some(name) => self
                .find(name)
                .map(|id| self.subtree_of(id))
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn subtree_of(&self, root: NodeId) -> Vec<NodeId> {
        if self.node(root).is_none() {
            return Vec::new();
        }
        let mut found = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            found.push(id);
            queue.extend(self.at(id).children.iter().copied());
        }
        found
    }

    /// Start a registration for `path`; finish it with [`Registration::handler`]
    pub fn command<I, S>(&mut self, path: I) -> Registration<'_>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Registration {
            tree: self,
            path: path.into_iter().map(Into::into).collect(),
            aliases: Vec::new(),
            help: None,
        }
    }

    /// Register `path` with `handler`, creating missing intermediate subcommands.
    ///
    /// # Errors
    ///
    /// See [`register_cmd`](Self::register_cmd).
    pub fn register<S: AsRef<str>>(
        &mut self,
        path: &[S],
        handler: Handler,
    ) -> Result<SubCmd<'_>, TreeError> {
        let id = self.register_cmd(path, handler, &[], None)?;
        Ok(SubCmd::new(self, id))
    }

    /// Register `path` with `handler`, creating missing intermediate subcommands.
    ///
    /// A path whose first segment is not found is taken relative to the root.
    /// Intermediate subcommands print their help until registered themselves.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::EmptyPath` for an empty path,
    /// `TreeError::DuplicateRegistration` if the whole path already exists,
    /// `TreeError::DuplicateName` if the leaf name or an alias is taken by a sibling,
    /// or `TreeError::BrokenChain` if a parent could not be resolved. The tree is
    /// left unchanged on error.
    pub fn register_cmd<S: AsRef<str>>(
        &mut self,
        path: &[S],
        handler: Handler,
        aliases: &[String],
        help: Option<&str>,
    ) -> Result<NodeId, TreeError> {
        if path.is_empty() {
            return Err(TreeError::EmptyPath);
        }
        let mut names: Vec<String> = path.iter().map(|s| s.as_ref().to_string()).collect();
        let mut chain = self.find_chain(&names);
        if chain.iter().all(Option::is_some) {
            return Err(TreeError::DuplicateRegistration(names));
        }
        if chain[0].is_none() {
            chain.insert(0, Some(ROOT));
            names.insert(0, self.root_name().to_string());
        }
        let leaf = names.len() - 1;
        self.check_names(chain[leaf - 1], &names[leaf - 1], &names[leaf], aliases)?;

        for j in 1..leaf {
            if chain[j].is_none() {
                let parent = chain[j - 1].ok_or_else(|| broken_chain(&names, j))?;
                chain[j] = Some(self.add_child(parent, &names[j], Handler::Help, &[], None));
            }
        }
        let parent = chain[leaf - 1].ok_or_else(|| broken_chain(&names, leaf))?;
        let id = self.add_child(parent, &names[leaf], handler, aliases, help);
        debug!("Registered subcommand `{}`", names.join(" "));
        Ok(id)
    }

    fn check_names(
        &self,
        parent: Option<NodeId>,
        parent_name: &str,
        name: &str,
        aliases: &[String],
    ) -> Result<(), TreeError> {
        let mut seen = HashSet::new();
        for candidate in std::iter::once(name).chain(aliases.iter().map(String::as_str)) {
            let taken = parent.is_some_and(|p| self.at(p).lookup.contains_key(candidate));
            if taken || !seen.insert(candidate) {
                return Err(TreeError::DuplicateName {
                    parent: parent_name.to_string(),
                    name: candidate.to_string(),
                });
            }
        }
        Ok(())
    }

    fn add_child(
        &mut self,
        parent: NodeId,
        name: &str,
        handler: Handler,
        aliases: &[String],
        help: Option<&str>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut command = Command::new(name.to_string());
        if let Some(help) = help {
            command = command.about(help.to_string());
        }
        let mut node = Node::new(name.to_string(), command, Some(parent), handler);
        node.aliases = aliases.to_vec();
        node.help = help.map(str::to_string);
        self.nodes.push(node);

        let parent = self.at_mut(parent);
        parent.children.push(id);
        parent.lookup.insert(name.to_string(), id);
        for alias in aliases {
            parent.lookup.insert(alias.clone(), id);
        }
        id
    }

    /// Assemble the full `clap::Command` hierarchy
    #[must_use]
    pub fn build_command(&self) -> Command {
        self.build_node(ROOT)
    }

    fn build_node(&self, id: NodeId) -> Command {
        let node = self.at(id);
        let mut command = node.command.clone();
        if !node.aliases.is_empty() {
            command = command.visible_aliases(node.aliases.iter().cloned());
        }
        for &child in &node.children {
            command = command.subcommand(self.build_node(child));
        }
        command
    }

    /// Parse the process arguments.
    ///
    /// # Errors
    ///
    /// See [`parse_from`](Self::parse_from).
    pub fn parse(&mut self) -> Result<ParsedArgs, TreeError> {
        self.parse_from(std::env::args_os())
    }

    /// Apply pending common arguments, then parse `argv` (binary name first).
    ///
    /// # Errors
    ///
    /// Returns `TreeError::Parse` with clap's error for invalid input, `--help` and `--version`.
    pub fn parse_from<I, T>(&mut self, argv: I) -> Result<ParsedArgs, TreeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.apply_common_args();
        let matches = self.build_command().try_get_matches_from(argv)?;
        Ok(self.resolve(matches))
    }

    /// Walk the matched subcommands down to the deepest node the tree knows
    fn resolve(&self, matches: ArgMatches) -> ParsedArgs {
        let mut id = ROOT;
        let mut path = vec![self.root_name().to_string()];
        let mut ancestors = Vec::new();
        let mut current = matches;
        while let Some((name, sub)) = current.subcommand() {
            let Some(child) = self.child(id, name) else {
                warn!("Subcommand `{name}` is not managed by the command tree");
                break;
            };
            path.push(name.to_string());
            let sub = sub.clone();
            id = child;
            ancestors.push(std::mem::replace(&mut current, sub));
        }
        debug!("Resolved command line to `{}`", path.join(" "));
        ParsedArgs::new(id, path, ancestors, current)
    }

    /// Dispatch `args`, parsing the process arguments when none are given.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::Parse` if parsing fails and `TreeError::Handler` if the
    /// handler fails.
    pub fn run(&mut self, args: Option<ParsedArgs>) -> Result<i32, TreeError> {
        let args = match args {
            Some(args) => args,
            None => self.parse()?,
        };
        self.dispatch(args)
    }

    /// Parse `argv` and dispatch the result.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_from<I, T>(&mut self, argv: I) -> Result<i32, TreeError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = self.parse_from(argv)?;
        self.dispatch(args)
    }

    /// Run the resolved node's post-processors and handler.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::UnknownNode` if `args` came from another tree and
    /// `TreeError::Handler` if the handler fails.
    pub fn dispatch(&self, mut args: ParsedArgs) -> Result<i32, TreeError> {
        let id = args.node();
        let node = self.node(id).ok_or(TreeError::UnknownNode)?;
        let result: HandlerResult = node
            .chain
            .invoke(&mut args, || self.print_help(id).map_err(Into::into));
        let code = result.map_err(TreeError::Handler)?;
        Ok(code.unwrap_or(0))
    }

    /// Entry point for binaries: parse the process arguments, dispatch and map the result.
    ///
    /// Parse errors exit through clap, which prints usage and picks the exit code.
    pub fn main(&mut self) -> ExitCode {
        match self.run(None) {
            Ok(code) => exit_code(code),
            Err(TreeError::Parse(e)) => e.exit(),
            Err(e) => {
                error!("{e}");
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        }
    }
}

fn broken_chain(names: &[String], child: usize) -> TreeError {
    TreeError::BrokenChain {
        parent: names[child - 1].clone(),
        child: names[child].clone(),
    }
}

/// Pending registration built by [`CmdTree::command`]
#[must_use]
pub struct Registration<'t> {
    tree: &'t mut CmdTree,
    path: Vec<String>,
    aliases: Vec<String>,
    help: Option<String>,
}

impl<'t> Registration<'t> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    /// One-line description shown in the parent's subcommand list
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Register the path with `func` as its handler.
    ///
    /// # Errors
    ///
    /// See [`CmdTree::register_cmd`].
    pub fn handler<F>(self, func: F) -> Result<SubCmd<'t>, TreeError>
    where
        F: Fn(&ParsedArgs) -> HandlerResult + 'static,
    {
        self.finish(Handler::new(func))
    }

    /// Register the path with a handler that prints its help.
    ///
    /// # Errors
    ///
    /// See [`CmdTree::register_cmd`].
    pub fn help_only(self) -> Result<SubCmd<'t>, TreeError> {
        self.finish(Handler::Help)
    }

    fn finish(self, handler: Handler) -> Result<SubCmd<'t>, TreeError> {
        let Registration {
            tree,
            path,
            aliases,
            help,
        } = self;
        let id = tree.register_cmd(&path, handler, &aliases, help.as_deref())?;
        Ok(SubCmd::new(tree, id))
    }
}
