use std::any::Any;
use std::collections::{BTreeMap, HashSet};

use clap::ArgMatches;
use clap::parser::{ValueSource, ValuesRef};
use serde_json::Value;

use crate::commands::node::NodeId;

/// Result of parsing a command line against a [`CmdTree`](crate::commands::tree::CmdTree).
///
/// Holds the matches of every level from the root down to the resolved subcommand.
/// Lookups search from the deepest level upwards, so an argument shared by a whole
/// subtree is found wherever on the command line it was given.
#[derive(Debug, Clone)]
pub struct ParsedArgs {
    node: NodeId,
    path: Vec<String>,
    ancestors: Vec<ArgMatches>,
    leaf: ArgMatches,
    extras: BTreeMap<String, Value>,
}

fn has_id(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.try_contains_id(id), Ok(true))
}

fn is_explicit(matches: &ArgMatches, id: &str) -> bool {
    has_id(matches, id)
        && matches!(
            matches.value_source(id),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        )
}

impl ParsedArgs {
    pub(crate) fn new(
        node: NodeId,
        path: Vec<String>,
        ancestors: Vec<ArgMatches>,
        leaf: ArgMatches,
    ) -> Self {
        Self {
            node,
            path,
            ancestors,
            leaf,
            extras: BTreeMap::new(),
        }
    }

    /// The subcommand this command line resolved to
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Names from the root down to the resolved subcommand, aliases replaced by canonical names
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Matches of the resolved subcommand only
    #[must_use]
    pub fn matches(&self) -> &ArgMatches {
        &self.leaf
    }

    /// Matches of every level, deepest first
    pub fn levels(&self) -> impl Iterator<Item = &ArgMatches> {
        std::iter::once(&self.leaf).chain(self.ancestors.iter().rev())
    }

    fn level_for(&self, id: &str) -> Option<&ArgMatches> {
        self.levels()
            .find(|m| is_explicit(m, id))
            .or_else(|| self.levels().find(|m| has_id(m, id)))
    }

    /// True if the flag was set on any level
    #[must_use]
    pub fn get_flag(&self, id: &str) -> bool {
        self.levels()
            .any(|m| matches!(m.try_get_one::<bool>(id), Ok(Some(true))))
    }

    /// Value of `id`, preferring the deepest level it was given on.
    ///
    /// Falls back to the deepest level holding a default. Unknown ids and type
    /// mismatches yield `None`.
    #[must_use]
    pub fn get_one<T>(&self, id: &str) -> Option<&T>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        self.level_for(id)
            .and_then(|m| m.try_get_one::<T>(id).ok().flatten())
    }

    #[must_use]
    pub fn get_many<T>(&self, id: &str) -> Option<ValuesRef<'_, T>>
    where
        T: Any + Clone + Send + Sync + 'static,
    {
        self.level_for(id)
            .and_then(|m| m.try_get_many::<T>(id).ok().flatten())
    }

    /// Every argument holding a value, as strings.
    ///
    /// Picks the same level as [`get_one`](Self::get_one): the deepest explicit value,
    /// else the deepest default.
    #[must_use]
    pub fn raw_values(&self) -> BTreeMap<String, Vec<String>> {
        let mut values = BTreeMap::new();
        let mut explicit = HashSet::new();
        for matches in self.ancestors.iter().chain(std::iter::once(&self.leaf)) {
            for id in matches.ids() {
                let id = id.as_str();
                let Some(raw) = matches.try_get_raw(id).ok().flatten() else {
                    continue;
                };
                if is_explicit(matches, id) {
                    explicit.insert(id.to_string());
                } else if explicit.contains(id) {
                    continue;
                }
                let raw = raw.map(|v| v.to_string_lossy().into_owned()).collect();
                values.insert(id.to_string(), raw);
            }
        }
        values
    }

    /// Store an extra value, typically from a post-processor
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extras.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    #[must_use]
    pub fn extras(&self) -> &BTreeMap<String, Value> {
        &self.extras
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{Arg, ArgAction, Command};

    fn shared_args(command: Command) -> Command {
        command
            .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
            .arg(Arg::new("target").long("target").default_value("native"))
    }

    fn parse(argv: &[&str]) -> ParsedArgs {
        let command = shared_args(Command::new("tool")).subcommand(shared_args(Command::new("build")));
        let root = command.get_matches_from(argv);
        let (_, leaf) = root.subcommand().unwrap();
        let leaf = leaf.clone();
        ParsedArgs::new(
            NodeId(1),
            vec!["tool".to_string(), "build".to_string()],
            vec![root],
            leaf,
        )
    }

    #[test]
    fn test_flag_found_on_any_level() {
        assert!(parse(&["tool", "--verbose", "build"]).get_flag("verbose"));
        assert!(parse(&["tool", "build", "--verbose"]).get_flag("verbose"));
        assert!(!parse(&["tool", "build"]).get_flag("verbose"));
    }

    #[test]
    fn test_explicit_value_beats_deeper_default() {
        let args = parse(&["tool", "--target", "arm", "build"]);
        assert_eq!(args.get_one::<String>("target").map(String::as_str), Some("arm"));

        let args = parse(&["tool", "--target", "arm", "build", "--target", "riscv"]);
        assert_eq!(args.get_one::<String>("target").map(String::as_str), Some("riscv"));
    }

    #[test]
    fn test_default_used_when_not_given() {
        let args = parse(&["tool", "build"]);
        assert_eq!(args.get_one::<String>("target").map(String::as_str), Some("native"));
    }

    #[test]
    fn test_unknown_id_is_none() {
        let args = parse(&["tool", "build"]);
        assert_eq!(args.get_one::<String>("missing"), None);
        assert!(!args.get_flag("missing"));
    }

    #[test]
    fn test_raw_values_prefer_explicit() {
        let args = parse(&["tool", "--target", "arm", "build"]);
        let values = args.raw_values();
        assert_eq!(values.get("target"), Some(&vec!["arm".to_string()]));
    }

    #[test]
    fn test_raw_values_agree_with_get_one_on_defaults() {
        let command = Command::new("tool")
            .arg(Arg::new("target").long("target").default_value("native"))
            .subcommand(
                Command::new("build").arg(Arg::new("target").long("target").default_value("host")),
            );
        let root = command.get_matches_from(["tool", "build"]);
        let leaf = root.subcommand().unwrap().1.clone();
        let args = ParsedArgs::new(
            NodeId(1),
            vec!["tool".to_string(), "build".to_string()],
            vec![root],
            leaf,
        );
        assert_eq!(args.get_one::<String>("target").map(String::as_str), Some("host"));
        assert_eq!(args.raw_values().get("target"), Some(&vec!["host".to_string()]));
    }

    #[test]
    fn test_extras() {
        let mut args = parse(&["tool", "build"]);
        assert_eq!(args.get_str("level"), None);
        args.set("level", "debug");
        assert_eq!(args.get_str("level"), Some("debug"));
        assert_eq!(args.extras().len(), 1);
    }
}
