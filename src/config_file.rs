//! Manifest file handling for cmdtree

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use clap::{Arg, ArgAction};
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

use crate::commands::group::ArgGroup;
use crate::commands::node::NodeId;
use crate::commands::tree::{CmdTree, TreeError};

/// Errors that can occur while loading a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("No manifest found in current directory or its parents: {0}")]
    NotFound(PathBuf),
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML manifest {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON manifest {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("Invalid manifest: {0}")]
    Validation(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// How an argument consumes the command line
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    #[default]
    Flag,
    Count,
    Value,
    Many,
}

impl ArgKind {
    /// Whether the argument takes values from the command line
    #[must_use]
    pub fn takes_value(self) -> bool {
        matches!(self, ArgKind::Value | ArgKind::Many)
    }
}

impl From<ArgKind> for ArgAction {
    fn from(kind: ArgKind) -> Self {
        match kind {
            ArgKind::Flag => ArgAction::SetTrue,
            ArgKind::Count => ArgAction::Count,
            ArgKind::Value => ArgAction::Set,
            ArgKind::Many => ArgAction::Append,
        }
    }
}

/// Declaration of a single argument
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ManifestArg {
    pub id: String,
    pub long: Option<String>,
    pub short: Option<char>,
    pub help: Option<String>,
    #[serde(default)]
    pub kind: ArgKind,
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub value_name: Option<String>,
}

impl ManifestArg {
    /// Build the clap argument. Value kinds without `long` or `short` are positional.
    #[must_use]
    pub fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.id.clone()).action(ArgAction::from(self.kind));
        if let Some(ref long) = self.long {
            arg = arg.long(long.clone());
        }
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(ref help) = self.help {
            arg = arg.help(help.clone());
        }
        if self.kind.takes_value() {
            if let Some(ref default) = self.default {
                arg = arg.default_value(default.clone());
            }
            if let Some(ref value_name) = self.value_name {
                arg = arg.value_name(value_name.clone());
            }
            arg = arg.required(self.required);
        }
        arg
    }
}

/// Turn manifest arguments into a group, listed under `heading` when one is given
#[must_use]
pub fn arg_group(heading: Option<&str>, description: Option<&str>, args: &[ManifestArg]) -> ArgGroup {
    let args: Vec<Arg> = args.iter().map(ManifestArg::to_arg).collect();
    let adder = move |command: clap::Command| command.args(args.clone());
    let group = match heading {
        Some(heading) => ArgGroup::named(heading, adder),
        None => ArgGroup::new(adder),
    };
    match description {
        Some(description) => group.description(description),
        None => group,
    }
}

/// A subcommand and the subcommands nested under it
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ManifestCommand {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub help: Option<String>,
    pub heading: Option<String>,
    #[serde(default)]
    pub args: Vec<ManifestArg>,
    #[serde(default)]
    pub children: Vec<ManifestCommand>,
}

/// Arguments shared by every subcommand under `root` (the whole tree when absent)
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ManifestCommon {
    pub root: Option<String>,
    pub heading: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub args: Vec<ManifestArg>,
}

/// Root manifest structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Manifest {
    pub name: String,
    pub about: Option<String>,
    pub version: Option<String>,
    pub heading: Option<String>,
    #[serde(default)]
    pub args: Vec<ManifestArg>,
    #[serde(default)]
    pub commands: Vec<ManifestCommand>,
    #[serde(default)]
    pub common: Vec<ManifestCommon>,
}

/// List of supported manifest file names
const FILENAMES: [&str; 3] = [".cmdtree.yaml", ".cmdtree.yml", ".cmdtree.json"];

impl Manifest {
    /// Loads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::NotFound` if the file cannot be read, or
    /// `ManifestError::Yaml`/`ManifestError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<Manifest, ManifestError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ManifestError::NotFound(file.to_path_buf()))?;
        let manifest: Manifest = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ManifestError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ManifestError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(manifest)
    }

    /// Searches for a manifest in the current directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::UnknownWorkingDirectory` if the cwd cannot be determined,
    /// or `ManifestError::NotFound` if no manifest is found.
    pub fn find_manifest() -> Result<PathBuf, ManifestError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ManifestError::UnknownWorkingDirectory(e.to_string()))?;
        Self::find_manifest_from(&cwd)
    }

    /// Searches `start` and its parents for a manifest.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError::NotFound` if no manifest is found.
    pub fn find_manifest_from(start: &Path) -> Result<PathBuf, ManifestError> {
        let mut path = start.to_path_buf();
        debug!("Searching for manifest in {}", start.display());
        loop {
            for file in &FILENAMES {
                let candidate = path.join(file);
                if candidate.exists() {
                    info!("Found manifest: {}", candidate.display());
                    return Ok(candidate);
                }
            }
            if !path.pop() {
                return Err(ManifestError::NotFound(start.to_path_buf()));
            }
        }
    }
}

impl TryFrom<Manifest> for CmdTree {
    type Error = ManifestError;

    fn try_from(manifest: Manifest) -> Result<Self, Self::Error> {
        let mut root = clap::Command::new(manifest.name.clone());
        if let Some(about) = manifest.about {
            root = root.about(about);
        }
        if let Some(version) = manifest.version {
            root = root.version(version);
        }
        let mut tree = CmdTree::from_command(root);
        if !manifest.args.is_empty() {
            let root_id = tree.root();
            if let Some(mut subcmd) = tree.subcmd(root_id) {
                subcmd.args(arg_group(manifest.heading.as_deref(), None, &manifest.args));
            }
        }

        let mut path = vec![manifest.name];
        for command in &manifest.commands {
            register_command(&mut tree, &mut path, command)?;
        }

        let mut placed = HashMap::new();
        for common in &manifest.common {
            check_common_conflicts(&tree, common, &mut placed)?;
            tree.register_common_args(
                common.root.as_deref(),
                arg_group(
                    common.heading.as_deref(),
                    common.description.as_deref(),
                    &common.args,
                ),
            );
        }
        for id in tree.subtree(None) {
            check_positionals(&tree, id, placed.get(&id).map_or(&[][..], Vec::as_slice))?;
        }
        Ok(tree)
    }
}

fn register_command(
    tree: &mut CmdTree,
    path: &mut Vec<String>,
    command: &ManifestCommand,
) -> Result<(), ManifestError> {
    path.push(command.name.clone());
    let mut registration = tree
        .command(path.iter().cloned())
        .aliases(command.aliases.iter().cloned());
    if let Some(ref help) = command.help {
        registration = registration.help(help.clone());
    }
    let mut subcmd = registration.help_only()?;
    if !command.args.is_empty() {
        subcmd.args(arg_group(command.heading.as_deref(), None, &command.args));
    }
    for child in &command.children {
        register_command(tree, path, child)?;
    }
    path.pop();
    Ok(())
}

fn clashes(existing: &Arg, arg: &ManifestArg) -> bool {
    existing.get_id().as_str() == arg.id
        || (arg.long.is_some() && existing.get_long() == arg.long.as_deref())
        || (arg.short.is_some() && existing.get_short() == arg.short)
}

/// Reject common arguments whose id, long or short is already taken on a subcommand they reach.
///
/// `placed` holds the common arguments accepted so far, per subcommand.
fn check_common_conflicts(
    tree: &CmdTree,
    common: &ManifestCommon,
    placed: &mut HashMap<NodeId, Vec<Arg>>,
) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for arg in &common.args {
        if !seen.insert(arg.id.as_str()) {
            return Err(ManifestError::Validation(format!(
                "Duplicate common argument id '{}'",
                arg.id
            )));
        }
    }
    for id in tree.subtree(common.root.as_deref()) {
        let Some(node) = tree.node(id) else {
            continue;
        };
        let earlier = placed.entry(id).or_default();
        for arg in &common.args {
            let clash = node
                .command()
                .get_arguments()
                .chain(earlier.iter())
                .find(|existing| clashes(existing, arg));
            if let Some(existing) = clash {
                return Err(ManifestError::Validation(format!(
                    "Common argument '{}' conflicts with argument '{}' of '{}'",
                    arg.id,
                    existing.get_id(),
                    tree.path_of(id).join(" ")
                )));
            }
        }
        earlier.extend(common.args.iter().map(ManifestArg::to_arg));
    }
    Ok(())
}

/// Reject positional orders clap cannot parse.
///
/// Common positionals in `extra` come after the node's own, in the order they will be applied.
fn check_positionals(tree: &CmdTree, id: NodeId, extra: &[Arg]) -> Result<(), ManifestError> {
    let Some(node) = tree.node(id) else {
        return Ok(());
    };
    let invalid = |arg: &Arg, reason: &str| {
        ManifestError::Validation(format!(
            "Positional argument '{}' of '{}' {reason}",
            arg.get_id(),
            tree.path_of(id).join(" ")
        ))
    };
    let mut optional: Option<&Arg> = None;
    let mut many: Option<&Arg> = None;
    let positionals = node
        .command()
        .get_positionals()
        .chain(extra.iter().filter(|arg| arg.is_positional()));
    for arg in positionals {
        if let Some(prior) = many {
            return Err(invalid(
                arg,
                &format!("follows '{}', which takes many values", prior.get_id()),
            ));
        }
        if arg.is_required_set() {
            if let Some(prior) = optional {
                return Err(invalid(
                    arg,
                    &format!("is required but follows optional '{}'", prior.get_id()),
                ));
            }
        } else if optional.is_none() {
            optional = Some(arg);
        }
        if matches!(arg.get_action(), ArgAction::Append) {
            many = Some(arg);
        }
    }
    Ok(())
}
