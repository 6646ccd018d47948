//! Argument groups that flow down from a subcommand to all of its descendants.
//!
//! Registrations are only recorded until the tree is first parsed, so a group
//! registered early still reaches subcommands that are registered after it.

use log::{debug, warn};

use crate::commands::group::ArgGroup;
use crate::commands::node::NodeId;
use crate::commands::tree::CmdTree;

/// Where a common argument group is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonTarget {
    /// Every node, the root included
    Tree,
    /// The subtree under the node [`CmdTree::find`] returns for this name
    Named(String),
    /// The subtree under a specific node
    Node(NodeId),
}

#[derive(Debug, Clone)]
pub(crate) struct CommonArgs {
    pub target: CommonTarget,
    pub group: ArgGroup,
}

impl CmdTree {
    /// Defer `group` to every node under `root` (the whole tree for `None`).
    ///
    /// Nothing is declared until [`apply_common_args`](Self::apply_common_args) runs,
    /// which parsing does on its own.
    pub fn register_common_args(&mut self, root: Option<&str>, group: ArgGroup) {
        let target = root.map_or(CommonTarget::Tree, |name| {
            CommonTarget::Named(name.to_string())
        });
        self.push_common(target, group);
    }

    pub(crate) fn push_common(&mut self, target: CommonTarget, group: ArgGroup) {
        debug!("Deferred common arguments for {target:?}");
        self.common.push(CommonArgs { target, group });
    }

    /// Number of common registrations not yet applied
    #[must_use]
    pub fn pending_common_args(&self) -> usize {
        self.common.len()
    }

    /// Apply pending common groups in registration order, each to its subtree in breadth-first order.
    ///
    /// Applied registrations are consumed, so calling this again only applies
    /// groups registered since.
    pub fn apply_common_args(&mut self) {
        for entry in std::mem::take(&mut self.common) {
            let targets = match &entry.target {
                CommonTarget::Tree => self.subtree(None),
                CommonTarget::Named(name) => self.subtree(Some(name)),
                CommonTarget::Node(id) => self.subtree_of(*id),
            };
            if targets.is_empty() {
                warn!(
                    "Common arguments for {:?} matched no subcommands",
                    entry.target
                );
                continue;
            }
            debug!(
                "Applying common arguments for {:?} to {} subcommands",
                entry.target,
                targets.len()
            );
            for id in targets {
                entry.group.apply(self.at_mut(id));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::chain::{Handler, HandlerResult};
    use crate::commands::group::ArgGroup;
    use crate::commands::parsed::ParsedArgs;
    use crate::commands::tree::CmdTree;
    use clap::{Arg, ArgAction, Command};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn ok(_: &ParsedArgs) -> HandlerResult {
        Ok(None)
    }

    fn verbose(command: Command) -> Command {
        command.arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
    }

    fn tree() -> CmdTree {
        let mut tree = CmdTree::new("tool");
        tree.register(&["tool", "build"], Handler::new(ok)).unwrap();
        tree.register(&["tool", "remote", "add"], Handler::new(ok)).unwrap();
        tree.register(&["tool", "remote", "remove"], Handler::new(ok)).unwrap();
        tree
    }

    #[test]
    fn test_common_args_reach_exactly_the_subtree() {
        let mut tree = tree();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        tree.register_common_args(
            Some("remote"),
            ArgGroup::new(move |command| {
                counter.set(counter.get() + 1);
                verbose(command)
            }),
        );
        assert_eq!(tree.pending_common_args(), 1);
        assert_eq!(calls.get(), 0);

        tree.apply_common_args();
        let subtree = tree.subtree(Some("remote"));
        assert_eq!(calls.get(), subtree.len());
        for id in tree.subtree(None) {
            let node = tree.node(id).unwrap();
            assert_eq!(node.has_arg("verbose"), subtree.contains(&id), "{}", node.name());
        }
    }

    #[test]
    fn test_apply_consumes_registrations() {
        let mut tree = tree();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        tree.register_common_args(
            None,
            ArgGroup::new(move |command| {
                counter.set(counter.get() + 1);
                command
            }),
        );
        tree.apply_common_args();
        tree.apply_common_args();
        assert_eq!(calls.get(), tree.node_count());
        assert_eq!(tree.pending_common_args(), 0);
    }

    #[test]
    fn test_common_args_reach_nodes_registered_later() {
        let mut tree = CmdTree::new("tool");
        tree.register_common_args(None, ArgGroup::new(verbose));
        tree.register(&["tool", "late"], Handler::new(ok)).unwrap();
        let parsed = tree.parse_from(["tool", "late", "--verbose"]).unwrap();
        assert!(parsed.get_flag("verbose"));
    }

    #[test]
    fn test_unknown_root_is_skipped() {
        let mut tree = tree();
        tree.register_common_args(Some("missing"), ArgGroup::new(verbose));
        tree.apply_common_args();
        assert!(tree.subtree(None).iter().all(|id| !tree.node(*id).unwrap().has_arg("verbose")));
    }

    #[test]
    fn test_handle_common_args_target_the_node_not_the_name() {
        let mut tree = CmdTree::new("tool");
        tree.register(&["tool", "status"], Handler::new(ok)).unwrap();
        let mut deep = tree
            .register(&["tool", "remote", "status"], Handler::new(ok))
            .unwrap();
        let deep_id = deep.id();
        deep.common_args(ArgGroup::new(verbose));
        tree.apply_common_args();

        let shallow_id = tree.find("status").unwrap();
        assert_ne!(shallow_id, deep_id);
        assert!(tree.node(deep_id).unwrap().has_arg("verbose"));
        assert!(!tree.node(shallow_id).unwrap().has_arg("verbose"));
    }

    #[test]
    fn test_verbose_postprocessor_sets_level_for_handler() {
        let seen = Rc::new(RefCell::new(None));
        let mut tree = CmdTree::new("tool");
        let handler_seen = Rc::clone(&seen);
        tree.command(["tool", "build"])
            .handler(move |args| {
                *handler_seen.borrow_mut() = args.get_str("level").map(str::to_string);
                Ok(None)
            })
            .unwrap();
        tree.register_common_args(
            Some("tool"),
            ArgGroup::new(verbose).with_postprocessor(|args| {
                if args.get_flag("verbose") {
                    args.set("level", "debug");
                }
            }),
        );

        assert_eq!(tree.run_from(["tool", "build", "--verbose"]).unwrap(), 0);
        assert_eq!(seen.borrow().as_deref(), Some("debug"));
    }

    #[test]
    fn test_local_postprocessors_run_before_common_ones() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut tree = CmdTree::new("tool");
        let local = Rc::clone(&log);
        let common = Rc::clone(&log);
        tree.command(["tool", "build"])
            .handler(ok)
            .unwrap()
            .args(ArgGroup::new(|c| c).with_postprocessor(move |_| local.borrow_mut().push("local")));
        tree.register_common_args(
            None,
            ArgGroup::new(|c| c).with_postprocessor(move |_| common.borrow_mut().push("common")),
        );
        tree.run_from(["tool", "build"]).unwrap();
        assert_eq!(*log.borrow(), vec!["local", "common"]);
    }
}
