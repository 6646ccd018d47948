use crate::commands::chain::Handler;
use crate::commands::group::ArgGroup;
use crate::commands::inherit::CommonTarget;
use crate::commands::node::NodeId;
use crate::commands::tree::CmdTree;

/// Mutable handle onto one subcommand of a [`CmdTree`]
#[derive(Debug)]
pub struct SubCmd<'t> {
    tree: &'t mut CmdTree,
    id: NodeId,
}

impl<'t> SubCmd<'t> {
    pub(crate) fn new(tree: &'t mut CmdTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.tree.at(self.id).name()
    }

    #[must_use]
    pub fn path(&self) -> Vec<String> {
        self.tree.path_of(self.id)
    }

    /// Declare `group` on this subcommand now
    pub fn args(&mut self, group: ArgGroup) -> &mut Self {
        group.apply(self.tree.at_mut(self.id));
        self
    }

    /// Declare `group` on this subcommand and every descendant when the tree is first parsed
    pub fn common_args(&mut self, group: ArgGroup) -> &mut Self {
        self.tree.push_common(CommonTarget::Node(self.id), group);
        self
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        self.tree.at(self.id).handler()
    }

    /// Replace the handler; post-processors from applied groups stay in place
    pub fn set_handler(&mut self, handler: Handler) -> &mut Self {
        self.tree.at_mut(self.id).chain.set_handler(handler);
        self
    }
}
