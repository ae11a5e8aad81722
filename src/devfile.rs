//! Component and command descriptions supplied by the devfile layer.
//!
//! Parsing devfiles is someone else's job; this module holds the parsed
//! shapes the reconciler and pipeline consume, plus the selection rules
//! that reduce a devfile's command list to at most one command per group.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// =============================================================================
// Component Description
// =============================================================================

/// An environment variable declared on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A port the component's container listens on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Logical endpoint name.
    pub name: String,
    /// Container port.
    pub target_port: u16,
}

/// A devfile volume mounted into a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Devfile volume name (not the runtime name).
    pub name: String,
    /// Mount path inside the container.
    pub container_path: String,
}

/// One container declared by the devfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Container alias, unique within the component.
    pub alias: String,
    /// Image reference.
    pub image: String,
    /// Entrypoint override.
    #[serde(default)]
    pub command: Vec<String>,
    /// Entrypoint arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment, in declaration order.
    #[serde(default)]
    pub env: Vec<EnvVar>,
    /// Declared endpoints.
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
    /// Declared volume mounts.
    #[serde(default)]
    pub volume_mounts: Vec<VolumeMount>,
    /// Whether the project source volume is mounted.
    #[serde(default)]
    pub mount_sources: bool,
}

impl ComponentSpec {
    /// Creates a component with only an alias and image set.
    pub fn new(alias: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            env: Vec::new(),
            endpoints: Vec::new(),
            volume_mounts: Vec::new(),
            mount_sources: false,
        }
    }

    /// Returns true if `name` is declared in the component's env.
    pub fn has_env(&self, name: &str) -> bool {
        self.env.iter().any(|e| e.name == name)
    }

    /// Returns true if a declared endpoint targets `port`.
    pub fn has_endpoint(&self, port: u16) -> bool {
        self.endpoints.iter().any(|e| e.target_port == port)
    }

    /// Checks alias, image and env name uniqueness.
    pub fn validate(&self) -> Result<()> {
        if self.alias.is_empty() {
            return Err(Error::InvalidInput("component alias cannot be empty".to_string()));
        }
        if self.image.is_empty() {
            return Err(Error::InvalidInput(format!(
                "component '{}' has no image",
                self.alias
            )));
        }

        let mut seen = HashSet::new();
        for env in &self.env {
            if env.name.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "component '{}' declares an env var with an empty name",
                    self.alias
                )));
            }
            if !seen.insert(env.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "component '{}' declares env var '{}' more than once",
                    self.alias, env.name
                )));
            }
        }

        Ok(())
    }
}

/// Validates a full component list: non-empty, valid entries, unique aliases.
pub fn validate_components(components: &[ComponentSpec]) -> Result<()> {
    if components.is_empty() {
        return Err(Error::Configuration(
            "no valid components found in the devfile".to_string(),
        ));
    }

    let mut aliases = HashSet::new();
    for comp in components {
        comp.validate()?;
        if !aliases.insert(comp.alias.as_str()) {
            return Err(Error::InvalidInput(format!(
                "container alias '{}' is declared more than once",
                comp.alias
            )));
        }
    }

    Ok(())
}

// =============================================================================
// Commands
// =============================================================================

/// Role a devfile command plays in a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandGroup {
    /// Runs once, when the component's containers are first created.
    Init,
    /// Runs on every push.
    Build,
    /// Launches (or relaunches) the application under the supervisor.
    Run,
}

impl CommandGroup {
    /// Groups in execution order.
    pub const ORDER: [CommandGroup; 3] = [Self::Init, Self::Build, Self::Run];
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Build => write!(f, "build"),
            Self::Run => write!(f, "run"),
        }
    }
}

/// A devfile exec command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// Command identifier.
    pub id: String,
    /// Alias of the container it runs in.
    pub component: String,
    /// Shell action.
    pub command_line: String,
    /// Working directory for the action.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Group the command belongs to.
    pub group: CommandGroup,
    /// Whether this is the group's default command.
    #[serde(default)]
    pub is_default: bool,
    /// Restart behaviour for run commands; absent means restart.
    #[serde(default)]
    pub restart: Option<bool>,
}

impl Command {
    /// Returns whether the run action must be fully restarted on re-push.
    pub fn restart_required(&self) -> bool {
        self.restart.unwrap_or(true)
    }
}

/// Commands explicitly chosen by the user, by ID.
#[derive(Debug, Clone, Default)]
pub struct CommandOverrides {
    pub init: Option<String>,
    pub build: Option<String>,
    pub run: Option<String>,
}

impl CommandOverrides {
    fn get(&self, group: CommandGroup) -> Option<&str> {
        match group {
            CommandGroup::Init => self.init.as_deref(),
            CommandGroup::Build => self.build.as_deref(),
            CommandGroup::Run => self.run.as_deref(),
        }
    }
}

/// At most one command per group, as consumed by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet {
    pub init: Option<Command>,
    pub build: Option<Command>,
    pub run: Option<Command>,
}

impl CommandSet {
    /// Selects one command per group from a devfile's command list.
    ///
    /// For each group: an override ID wins (and must exist in that group);
    /// otherwise the group's default command; otherwise its only command.
    /// Several candidates with no default is an error.
    pub fn select(commands: &[Command], overrides: &CommandOverrides) -> Result<Self> {
        let mut set = Self::default();

        for group in CommandGroup::ORDER {
            let candidates: Vec<&Command> = commands.iter().filter(|c| c.group == group).collect();

            let chosen = if let Some(id) = overrides.get(group) {
                let found = candidates.iter().find(|c| c.id == id).ok_or_else(|| {
                    Error::Configuration(format!(
                        "the command \"{id}\" is not found in the devfile or is not a {group} command"
                    ))
                })?;
                Some(*found)
            } else {
                match candidates.as_slice() {
                    [] => None,
                    [only] => Some(*only),
                    many => {
                        let defaults: Vec<&&Command> =
                            many.iter().filter(|c| c.is_default).collect();
                        match defaults.as_slice() {
                            [one] => Some(**one),
                            [] => {
                                return Err(Error::Configuration(format!(
                                    "there should be exactly one default {group} command, found none"
                                )))
                            }
                            _ => {
                                return Err(Error::Configuration(format!(
                                    "there should be exactly one default {group} command, found {}",
                                    defaults.len()
                                )))
                            }
                        }
                    }
                }
            };

            *set.slot_mut(group) = chosen.cloned();
        }

        Ok(set)
    }

    /// Returns the command for `group`, if declared.
    pub fn get(&self, group: CommandGroup) -> Option<&Command> {
        match group {
            CommandGroup::Init => self.init.as_ref(),
            CommandGroup::Build => self.build.as_ref(),
            CommandGroup::Run => self.run.as_ref(),
        }
    }

    fn slot_mut(&mut self, group: CommandGroup) -> &mut Option<Command> {
        match group {
            CommandGroup::Init => &mut self.init,
            CommandGroup::Build => &mut self.build,
            CommandGroup::Run => &mut self.run,
        }
    }

    /// Number of declared commands.
    pub fn len(&self) -> usize {
        CommandGroup::ORDER
            .iter()
            .filter(|g| self.get(**g).is_some())
            .count()
    }

    /// Returns true if no command is declared.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that every command targets a declared container alias.
    pub fn validate_targets(&self, components: &[ComponentSpec]) -> Result<()> {
        for group in CommandGroup::ORDER {
            let Some(command) = self.get(group) else {
                continue;
            };
            if !components.iter().any(|c| c.alias == command.component) {
                return Err(Error::Configuration(format!(
                    "{group} command '{}' targets container '{}' which is not declared in the devfile",
                    command.id, command.component
                )));
            }
        }
        Ok(())
    }
}

/// Source of a devfile's commands, grouped for a push.
pub trait CommandProvider: Send + Sync {
    /// Returns at most one command per group.
    fn commands_by_group(&self) -> Result<CommandSet>;
}

impl CommandProvider for CommandSet {
    fn commands_by_group(&self) -> Result<CommandSet> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(id: &str, group: CommandGroup, is_default: bool) -> Command {
        Command {
            id: id.to_string(),
            component: "runtime".to_string(),
            command_line: format!("echo {id}"),
            working_dir: None,
            group,
            is_default,
            restart: None,
        }
    }

    #[test]
    fn test_validate_rejects_duplicate_env() {
        let mut comp = ComponentSpec::new("runtime", "node:18");
        comp.env.push(EnvVar::new("A", "1"));
        comp.env.push(EnvVar::new("A", "2"));
        assert!(comp.validate().is_err());
    }

    #[test]
    fn test_validate_components_rejects_empty_list() {
        let err = validate_components(&[]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_validate_components_rejects_duplicate_alias() {
        let comps = vec![
            ComponentSpec::new("runtime", "node:18"),
            ComponentSpec::new("runtime", "redis:7"),
        ];
        assert!(validate_components(&comps).is_err());
    }

    #[test]
    fn test_restart_defaults_to_true() {
        let mut run = cmd("run", CommandGroup::Run, true);
        assert!(run.restart_required());
        run.restart = Some(false);
        assert!(!run.restart_required());
    }

    #[test]
    fn test_select_single_and_default() {
        let commands = vec![
            cmd("install", CommandGroup::Build, false),
            cmd("run-a", CommandGroup::Run, false),
            cmd("run-b", CommandGroup::Run, true),
        ];
        let set = CommandSet::select(&commands, &CommandOverrides::default()).unwrap();
        assert!(set.init.is_none());
        assert_eq!(set.build.as_ref().unwrap().id, "install");
        assert_eq!(set.run.as_ref().unwrap().id, "run-b");
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_select_ambiguous_without_default() {
        let commands = vec![
            cmd("run-a", CommandGroup::Run, false),
            cmd("run-b", CommandGroup::Run, false),
        ];
        let err = CommandSet::select(&commands, &CommandOverrides::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_select_override_must_match_group() {
        let commands = vec![
            cmd("install", CommandGroup::Build, true),
            cmd("run", CommandGroup::Run, true),
        ];
        let overrides = CommandOverrides {
            run: Some("install".to_string()),
            ..Default::default()
        };
        assert!(CommandSet::select(&commands, &overrides).is_err());

        let overrides = CommandOverrides {
            run: Some("run".to_string()),
            ..Default::default()
        };
        let set = CommandSet::select(&commands, &overrides).unwrap();
        assert_eq!(set.run.unwrap().id, "run");
    }

    #[test]
    fn test_component_from_json() {
        let json = r#"{
            "alias": "runtime",
            "image": "node:18",
            "mountSources": true,
            "endpoints": [{"name": "http", "targetPort": 8080}],
            "volumeMounts": [{"name": "cache", "containerPath": "/cache"}]
        }"#;
        let comp: ComponentSpec = serde_json::from_str(json).unwrap();

        assert!(comp.mount_sources);
        assert!(comp.has_endpoint(8080));
        assert!(comp.command.is_empty() && comp.env.is_empty());
        assert_eq!(comp.volume_mounts[0].container_path, "/cache");
    }

    #[test]
    fn test_command_from_json() {
        let json = r#"{"id": "devrun", "component": "runtime", "commandLine": "npm start",
                       "group": "run", "restart": false}"#;
        let command: Command = serde_json::from_str(json).unwrap();

        assert_eq!(command.group, CommandGroup::Run);
        assert!(!command.is_default);
        assert!(!command.restart_required());
    }

    #[test]
    fn test_validate_targets() {
        let set = CommandSet {
            build: Some(cmd("install", CommandGroup::Build, true)),
            ..Default::default()
        };
        assert!(set.validate_targets(&[ComponentSpec::new("runtime", "node:18")]).is_ok());

        let err = set
            .validate_targets(&[ComponentSpec::new("tools", "busybox")])
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("runtime")));
    }
}
