use std::fmt;
use std::rc::Rc;

use clap::Command;
use log::trace;

use crate::commands::chain::Postprocessor;
use crate::commands::node::{GroupInfo, Node};
use crate::commands::parsed::ParsedArgs;

/// Function declaring a cluster of arguments on a `clap::Command`
pub type ArgAdder = Rc<dyn Fn(Command) -> Command>;

/// A cluster of argument declarations plus the post-processors that run after parsing
#[derive(Clone)]
pub struct ArgGroup {
    name: Option<String>,
    description: Option<String>,
    adder: ArgAdder,
    postprocessors: Vec<Postprocessor>,
}

impl ArgGroup {
    /// Anonymous group: arguments are declared straight onto the subcommand
    pub fn new<F>(adder: F) -> Self
    where
        F: Fn(Command) -> Command + 'static,
    {
        Self {
            name: None,
            description: None,
            adder: Rc::new(adder),
            postprocessors: Vec::new(),
        }
    }

    /// Group whose arguments are listed under their own help heading
    pub fn named<F>(name: impl Into<String>, adder: F) -> Self
    where
        F: Fn(Command) -> Command + 'static,
    {
        Self {
            name: Some(name.into()),
            ..Self::new(adder)
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_postprocessor<F>(mut self, func: F) -> Self
    where
        F: Fn(&mut ParsedArgs) + 'static,
    {
        self.postprocessor(func);
        self
    }

    /// Append a post-processor, returning the stored function so it can be reused elsewhere
    pub fn postprocessor<F>(&mut self, func: F) -> Postprocessor
    where
        F: Fn(&mut ParsedArgs) + 'static,
    {
        let func: Postprocessor = Rc::new(func);
        self.postprocessors.push(Rc::clone(&func));
        func
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn postprocessors(&self) -> &[Postprocessor] {
        &self.postprocessors
    }

    /// Declare the group's arguments on `node` and append its post-processors to the node's chain
    pub(crate) fn apply(&self, node: &mut Node) {
        let command = std::mem::replace(&mut node.command, Command::new(node.name.clone()));
        node.command = match &self.name {
            Some(name) => (self.adder)(command.next_help_heading(name.clone()))
                .next_help_heading(None::<&'static str>),
            None => (self.adder)(command),
        };
        if let Some(name) = &self.name {
            node.groups.push(GroupInfo {
                name: name.clone(),
                description: self.description.clone(),
            });
        }
        for postprocessor in &self.postprocessors {
            node.chain.push(Rc::clone(postprocessor));
        }
        trace!(
            "Applied argument group {} to `{}` ({} post-processors)",
            self.name.as_deref().unwrap_or("<anonymous>"),
            node.name,
            self.postprocessors.len()
        );
    }
}

impl fmt::Debug for ArgGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgGroup")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("postprocessors", &self.postprocessors.len())
            .finish_non_exhaustive()
    }
}
