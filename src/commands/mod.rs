//! Subcommand tree with hierarchical organization
//!
//! This module implements a tree of subcommands layered over clap. Paths of subcommands are
//! registered with a handler, intermediate levels are created on demand, and argument groups
//! are attached either to one subcommand or to a whole subtree.
//!
//! Every argument group may carry post-processors. They are collected per subcommand in the
//! order the groups were applied and run against the parsed arguments before the handler.

pub mod chain;
pub mod group;
pub mod help;
pub mod inherit;
pub mod node;
pub mod parsed;
pub mod subcmd;
pub mod tree;

pub use chain::{Handler, HandlerChain, HandlerResult, Postprocessor};
pub use group::{ArgAdder, ArgGroup};
pub use inherit::CommonTarget;
pub use node::{GroupInfo, Node, NodeId};
pub use parsed::ParsedArgs;
pub use subcmd::SubCmd;
pub use tree::{CmdTree, Registration, TreeError, exit_code};
