use std::collections::HashMap;

use crate::commands::chain::{Handler, HandlerChain};

/// Index of a node inside the [`CmdTree`](crate::commands::tree::CmdTree) that created it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Display metadata of a named argument group applied to a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub description: Option<String>,
}

/// One subcommand level of the tree, the root included
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) help: Option<String>,
    /// Arguments declared on this level only; subcommands are attached when the tree is built
    pub(crate) command: clap::Command,
    pub(crate) chain: HandlerChain,
    pub(crate) groups: Vec<GroupInfo>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Child names and aliases
    pub(crate) lookup: HashMap<String, NodeId>,
}

impl Node {
    pub(crate) fn new(
        name: String,
        command: clap::Command,
        parent: Option<NodeId>,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            help: None,
            command,
            chain: HandlerChain::new(handler),
            groups: Vec::new(),
            parent,
            children: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    #[must_use]
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    #[must_use]
    pub fn command(&self) -> &clap::Command {
        &self.command
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        self.chain.handler()
    }

    #[must_use]
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    #[must_use]
    pub fn groups(&self) -> &[GroupInfo] {
        &self.groups
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// True if `name` is this node's name or one of its aliases
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }

    /// True if an argument with `id` is declared on this level
    #[must_use]
    pub fn has_arg(&self, id: &str) -> bool {
        self.command
            .get_arguments()
            .any(|arg| arg.get_id().as_str() == id)
    }
}
