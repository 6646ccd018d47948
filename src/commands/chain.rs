use std::fmt;
use std::rc::Rc;

use crate::commands::parsed::ParsedArgs;

/// Value returned by a subcommand handler. `Ok(None)` counts as exit code 0.
pub type HandlerResult = Result<Option<i32>, Box<dyn std::error::Error>>;

/// Function invoked when its subcommand is selected
pub type HandlerFn = Rc<dyn Fn(&ParsedArgs) -> HandlerResult>;

/// Step run against the parsed arguments before the handler
pub type Postprocessor = Rc<dyn Fn(&mut ParsedArgs)>;

/// What runs when a subcommand is the deepest one on the command line
#[derive(Clone, Default)]
pub enum Handler {
    /// Print the subcommand's help and exit successfully
    #[default]
    Help,
    Func(HandlerFn),
}

impl Handler {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&ParsedArgs) -> HandlerResult + 'static,
    {
        Handler::Func(Rc::new(func))
    }

    #[must_use]
    pub fn is_help(&self) -> bool {
        matches!(self, Handler::Help)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Help => f.write_str("Handler::Help"),
            Handler::Func(_) => f.write_str("Handler::Func(..)"),
        }
    }
}

/// A handler together with the post-processors every applied argument group contributed.
///
/// Post-processors run in the order they were pushed, so the group applied first
/// sees the arguments first. Replacing the handler keeps the post-processors.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handler: Handler,
    postprocessors: Vec<Postprocessor>,
}

impl HandlerChain {
    #[must_use]
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            postprocessors: Vec::new(),
        }
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn set_handler(&mut self, handler: Handler) {
        self.handler = handler;
    }

    pub fn push(&mut self, postprocessor: Postprocessor) {
        self.postprocessors.push(postprocessor);
    }

    #[must_use]
    pub fn postprocessor_count(&self) -> usize {
        self.postprocessors.len()
    }

    /// Run every post-processor against `args`, then the handler.
    ///
    /// `print_help` is called in place of the handler for [`Handler::Help`].
    ///
    /// # Errors
    ///
    /// Returns whatever error the handler or `print_help` produced.
    pub fn invoke<H>(&self, args: &mut ParsedArgs, print_help: H) -> HandlerResult
    where
        H: FnOnce() -> Result<(), Box<dyn std::error::Error>>,
    {
        for postprocessor in &self.postprocessors {
            postprocessor(args);
        }
        match &self.handler {
            Handler::Help => {
                print_help()?;
                Ok(None)
            }
            Handler::Func(func) => func(args),
        }
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("handler", &self.handler)
            .field("postprocessors", &self.postprocessors.len())
            .finish()
    }
}
