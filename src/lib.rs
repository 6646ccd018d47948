//! Core implementation of cmdtree
//!
//! cmdtree builds hierarchical command line interfaces on top of clap. Subcommands are
//! registered by path, argument groups can be shared across whole subtrees, and each group
//! may post-process the parsed arguments before the subcommand's handler runs. A tree can
//! be assembled in code or declared in a YAML or JSON manifest.

use std::collections::HashSet;
use std::path::PathBuf;

use log::{debug, warn};

use crate::config_file::{Manifest, ManifestArg, ManifestCommand, ManifestError};

pub mod commands;
pub mod config_file;
pub mod logger;
pub mod theme;

pub use commands::{ArgGroup, CmdTree, Handler, ParsedArgs, SubCmd, TreeError};

/// Load a manifest from a file (or auto-detect), returning the built `CmdTree` and the manifest path.
///
/// Common arguments are registered but not yet applied, so more subcommands can still be added.
///
/// # Errors
///
/// Returns `ManifestError` if the manifest is not found, cannot be parsed,
/// declares invalid arguments, or reuses a subcommand name.
pub fn load_manifest(manifest_file: Option<&str>) -> Result<(CmdTree, PathBuf), ManifestError> {
    let manifest_path = match manifest_file {
        Some(file) => {
            let manifest_path = PathBuf::from(file);
            if !manifest_path.exists() {
                return Err(ManifestError::NotFound(manifest_path));
            }
            manifest_path
        }
        None => Manifest::find_manifest()?,
    };
    debug!("Building command tree from {}", manifest_path.display());
    let manifest = Manifest::from_file(&manifest_path)?;
    validate_manifest(&manifest)?;
    let tree = CmdTree::try_from(manifest)?;
    Ok((tree, manifest_path))
}

/// Validate names and argument declarations before any clap command is built
fn validate_manifest(manifest: &Manifest) -> Result<(), ManifestError> {
    if manifest.name.trim().is_empty() {
        return Err(ManifestError::Validation(
            "Manifest has an empty name".to_string(),
        ));
    }
    let reserved = Reserved::new(manifest.version.is_some());
    check_args(&manifest.name, &manifest.args, reserved)?;
    for command in &manifest.commands {
        check_command(command, reserved)?;
    }
    for common in &manifest.common {
        let owner = common.root.as_deref().unwrap_or(&manifest.name);
        check_args(owner, &common.args, reserved)?;
        if common.args.is_empty() {
            warn!("Common arguments for '{owner}' declare no arguments");
        }
    }
    Ok(())
}

fn check_command(command: &ManifestCommand, reserved: Reserved) -> Result<(), ManifestError> {
    if command.name.trim().is_empty() {
        return Err(ManifestError::Validation(
            "Subcommand with an empty name".to_string(),
        ));
    }
    if command.aliases.iter().any(|alias| alias.trim().is_empty()) {
        return Err(ManifestError::Validation(format!(
            "Subcommand '{}' has an empty alias",
            command.name
        )));
    }
    check_args(&command.name, &command.args, reserved)?;
    for child in &command.children {
        check_command(child, reserved)?;
    }
    Ok(())
}

/// Flags clap generates on its own
#[derive(Debug, Clone, Copy)]
struct Reserved {
    version: bool,
}

impl Reserved {
    fn new(version: bool) -> Self {
        Self { version }
    }

    fn id(self, id: &str) -> bool {
        id == "help" || (self.version && id == "version")
    }

    fn long(self, long: &str) -> bool {
        long == "help" || (self.version && long == "version")
    }

    fn short(self, short: char) -> bool {
        short == 'h' || (self.version && short == 'V')
    }
}

fn check_args(owner: &str, args: &[ManifestArg], reserved: Reserved) -> Result<(), ManifestError> {
    let mut ids = HashSet::new();
    let mut longs = HashSet::new();
    let mut shorts = HashSet::new();
    for arg in args {
        let invalid = |reason: &str| {
            ManifestError::Validation(format!("Argument '{}' of '{owner}' {reason}", arg.id))
        };
        if arg.id.trim().is_empty() {
            return Err(ManifestError::Validation(format!(
                "Argument of '{owner}' has an empty id"
            )));
        }
        if reserved.id(&arg.id) {
            return Err(invalid("uses a reserved id"));
        }
        if !ids.insert(arg.id.as_str()) {
            return Err(invalid("is declared twice"));
        }
        if !arg.kind.takes_value() && arg.long.is_none() && arg.short.is_none() {
            return Err(invalid("needs a long or short name"));
        }
        if !arg.kind.takes_value() && (arg.default.is_some() || arg.required) {
            return Err(invalid("takes no value, so it cannot have a default or be required"));
        }
        if arg.required && arg.default.is_some() {
            return Err(invalid("is required, so it cannot have a default"));
        }
        if let Some(ref long) = arg.long {
            if long.trim().is_empty() || long.starts_with('-') {
                return Err(invalid("has an invalid long name"));
            }
            if reserved.long(long) {
                return Err(invalid(&format!("uses reserved long name '--{long}'")));
            }
            if !longs.insert(long.as_str()) {
                return Err(invalid(&format!("reuses long name '--{long}'")));
            }
        }
        if let Some(short) = arg.short {
            if short == '-' || short.is_whitespace() {
                return Err(invalid("has an invalid short name"));
            }
            if reserved.short(short) {
                return Err(invalid(&format!("uses reserved short name '-{short}'")));
            }
            if !shorts.insert(short) {
                return Err(invalid(&format!("reuses short name '-{short}'")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::{ArgKind, ManifestCommon};

    fn flag(id: &str) -> ManifestArg {
        ManifestArg {
            id: id.to_string(),
            long: Some(id.to_string()),
            ..Default::default()
        }
    }

    fn command(name: &str, args: Vec<ManifestArg>) -> ManifestCommand {
        ManifestCommand {
            name: name.to_string(),
            args,
            ..Default::default()
        }
    }

    fn manifest(commands: Vec<ManifestCommand>) -> Manifest {
        Manifest {
            name: "tool".to_string(),
            commands,
            ..Default::default()
        }
    }

    fn expect_validation(manifest: &Manifest, needle: &str) {
        match validate_manifest(manifest) {
            Err(ManifestError::Validation(msg)) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("Expected ManifestError::Validation, got: {other:?}"),
        }
    }

    #[test]
    fn test_valid_manifest_passes() {
        let config = manifest(vec![command("build", vec![flag("release")])]);
        assert!(validate_manifest(&config).is_ok());
    }

    #[test]
    fn test_empty_names_rejected() {
        expect_validation(&manifest(vec![command(" ", vec![])]), "empty name");
        let mut config = manifest(vec![]);
        config.name = String::new();
        expect_validation(&config, "empty name");
    }

    #[test]
    fn test_duplicate_arg_id_detection() {
        let config = manifest(vec![command("build", vec![flag("dup"), flag("dup")])]);
        expect_validation(&config, "declared twice");
    }

    #[test]
    fn test_nested_commands_are_checked() {
        let mut parent = command("remote", vec![]);
        parent.children.push(command("add", vec![flag("url"), flag("url")]));
        expect_validation(&manifest(vec![parent]), "'add'");
    }

    #[test]
    fn test_flag_without_name_rejected() {
        let arg = ManifestArg {
            id: "quiet".to_string(),
            ..Default::default()
        };
        expect_validation(&manifest(vec![command("build", vec![arg])]), "long or short");
    }

    #[test]
    fn test_positional_value_allowed() {
        let arg = ManifestArg {
            id: "url".to_string(),
            kind: ArgKind::Value,
            required: true,
            ..Default::default()
        };
        assert!(validate_manifest(&manifest(vec![command("add", vec![arg])])).is_ok());
    }

    #[test]
    fn test_reserved_names_rejected() {
        let mut help = flag("assist");
        help.long = Some("help".to_string());
        expect_validation(&manifest(vec![command("build", vec![help])]), "--help");

        let mut short = flag("human");
        short.short = Some('h');
        expect_validation(&manifest(vec![command("build", vec![short])]), "-h");
    }

    #[test]
    fn test_version_reserved_only_with_version() {
        let mut arg = flag("show-version");
        arg.short = Some('V');
        let mut config = manifest(vec![command("build", vec![arg])]);
        assert!(validate_manifest(&config).is_ok());
        config.version = Some("1.0".to_string());
        expect_validation(&config, "-V");
    }

    #[test]
    fn test_reserved_ids_rejected() {
        let mut help = flag("help");
        help.long = Some("assist".to_string());
        let mut config = manifest(vec![command("build", vec![help])]);
        expect_validation(&config, "reserved id");

        let mut version = flag("version");
        version.long = Some("show-version".to_string());
        config = manifest(vec![command("build", vec![version])]);
        assert!(validate_manifest(&config).is_ok());
        config.version = Some("1.0".to_string());
        expect_validation(&config, "reserved id");
    }

    #[test]
    fn test_required_value_with_default_rejected() {
        let arg = ManifestArg {
            id: "target".to_string(),
            long: Some("target".to_string()),
            kind: ArgKind::Value,
            required: true,
            default: Some("native".to_string()),
            ..Default::default()
        };
        expect_validation(&manifest(vec![command("build", vec![arg])]), "cannot have a default");
    }

    #[test]
    fn test_reused_short_rejected() {
        let mut a = flag("all");
        a.short = Some('a');
        let mut b = flag("append");
        b.short = Some('a');
        expect_validation(&manifest(vec![command("build", vec![a, b])]), "-a");
    }

    #[test]
    fn test_flag_default_rejected() {
        let mut arg = flag("release");
        arg.default = Some("true".to_string());
        expect_validation(&manifest(vec![command("build", vec![arg])]), "takes no value");
    }

    #[test]
    fn test_common_args_checked() {
        let mut config = manifest(vec![command("build", vec![])]);
        config.common.push(ManifestCommon {
            args: vec![flag("verbose"), flag("verbose")],
            ..Default::default()
        });
        expect_validation(&config, "'tool'");
    }
}
