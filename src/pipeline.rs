//! # Command Pipeline
//!
//! Runs the devfile's init, build and run commands inside the reconciled
//! containers.
//!
//! ## Plan
//!
//! Each group maps to a fixed list of actions depending on whether the
//! component already existed before this push:
//!
//! | Group | New component | Existing component |
//! |-------|---------------|--------------------|
//! | Init  | shell | *(skipped)* |
//! | Build | shell | shell |
//! | Run   | init supervisor, restart | restart, or start only when `restart: false` |
//!
//! Groups run in the order Init → Build → Run and the first failure stops
//! the pipeline; later groups are never attempted.

use crate::config::SupervisorConfig;
use crate::constants::SHELL_PATH;
use crate::context::PushContext;
use crate::devfile::{Command, CommandGroup, CommandSet};
use crate::error::{Error, Result};
use crate::runtime::{ExecClient, LiveContainer};
use std::fmt;
use tracing::{debug, info};

// =============================================================================
// Actions
// =============================================================================

/// A single in-container step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the command's action through the shell.
    Shell,
    /// Start the supervisor daemon if the container's entrypoint is not it.
    InitSupervisor,
    /// Stop every supervised program, then start the run program.
    RestartRun,
    /// Start the run program without stopping it first.
    StartRun,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell => write!(f, "shell"),
            Self::InitSupervisor => write!(f, "init-supervisor"),
            Self::RestartRun => write!(f, "restart-run"),
            Self::StartRun => write!(f, "start-run"),
        }
    }
}

/// Actions to perform for `command` in `group`.
pub fn plan(group: CommandGroup, command: &Command, component_exists: bool) -> Vec<Action> {
    match group {
        CommandGroup::Init if component_exists => Vec::new(),
        CommandGroup::Init | CommandGroup::Build => vec![Action::Shell],
        CommandGroup::Run => {
            if !component_exists {
                vec![Action::InitSupervisor, Action::RestartRun]
            } else if command.restart_required() {
                vec![Action::RestartRun]
            } else {
                vec![Action::StartRun]
            }
        }
    }
}

// =============================================================================
// Argv Construction
// =============================================================================

/// `/bin/sh -c "[cd <dir> && ]<action>"`.
pub fn shell_argv(command: &Command) -> Vec<String> {
    let line = match command.working_dir.as_deref().filter(|d| !d.is_empty()) {
        Some(dir) => format!("cd {dir} && {}", command.command_line),
        None => command.command_line.clone(),
    };
    vec![SHELL_PATH.to_string(), "-c".to_string(), line]
}

/// Starts the supervisor as a daemon.
pub fn supervisor_init_argv(supervisor: &SupervisorConfig) -> Vec<String> {
    vec![
        supervisor.binary_path.clone(),
        "-c".to_string(),
        supervisor.conf_file.clone(),
        "-d".to_string(),
    ]
}

/// Stops every supervised program.
pub fn supervisor_stop_all_argv(supervisor: &SupervisorConfig) -> Vec<String> {
    vec![
        supervisor.binary_path.clone(),
        "ctl".to_string(),
        "stop".to_string(),
        "all".to_string(),
    ]
}

/// Starts the run program (no-op if already running).
pub fn supervisor_start_argv(supervisor: &SupervisorConfig) -> Vec<String> {
    vec![
        supervisor.binary_path.clone(),
        "ctl".to_string(),
        "start".to_string(),
        supervisor.program.clone(),
    ]
}

// =============================================================================
// Execution
// =============================================================================

/// One step that ran successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStep {
    pub group: CommandGroup,
    pub command_id: String,
    pub action: Action,
    /// False when the step was a no-op (supervisor already the entrypoint).
    pub issued: bool,
}

/// Steps executed by a successful pipeline run, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub steps: Vec<ExecutedStep>,
}

impl PipelineReport {
    /// Actions that actually issued an exec, in order.
    pub fn issued(&self) -> Vec<(CommandGroup, Action)> {
        self.steps
            .iter()
            .filter(|s| s.issued)
            .map(|s| (s.group, s.action))
            .collect()
    }
}

/// Executes the pipeline for one push.
///
/// `containers` are the component's live containers after reconciliation;
/// every command's target alias must be among them.
///
/// # Errors
///
/// - [`Error::Configuration`] with no commands, or a command targeting an
///   alias with no container
/// - [`Error::CommandExec`] / [`Error::CommandFailed`] / [`Error::Timeout`]
///   from the first failing step
pub async fn execute(
    ctx: &PushContext,
    exec: &dyn ExecClient,
    commands: &CommandSet,
    component_exists: bool,
    containers: &[LiveContainer],
) -> Result<PipelineReport> {
    if commands.is_empty() {
        return Err(Error::Configuration(
            "error executing devfile commands - there should be at least 1 command".to_string(),
        ));
    }

    let runner = Runner {
        ctx,
        exec,
        containers,
    };
    let mut report = PipelineReport::default();

    for group in CommandGroup::ORDER {
        let Some(command) = commands.get(group) else {
            continue;
        };

        let actions = plan(group, command, component_exists);
        if actions.is_empty() {
            debug!(
                component = %ctx.component_name(),
                command = %command.id,
                "Component exists, skipping {} command",
                group
            );
            continue;
        }

        let container = runner.container_for(command)?;
        info!(
            component = %ctx.component_name(),
            alias = %command.component,
            command = %command.id,
            "Executing {} command",
            group
        );

        for action in actions {
            let issued = runner.perform(action, command, container).await?;
            report.steps.push(ExecutedStep {
                group,
                command_id: command.id.clone(),
                action,
                issued,
            });
        }
    }

    Ok(report)
}

struct Runner<'a> {
    ctx: &'a PushContext,
    exec: &'a dyn ExecClient,
    containers: &'a [LiveContainer],
}

impl<'a> Runner<'a> {
    fn container_for(&self, command: &Command) -> Result<&'a LiveContainer> {
        self.containers
            .iter()
            .find(|c| c.alias() == Some(command.component.as_str()))
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "command '{}' targets container '{}' which does not exist in component '{}'",
                    command.id,
                    command.component,
                    self.ctx.component_name()
                ))
            })
    }

    /// Performs one action; returns whether an exec was issued.
    async fn perform(&self, action: Action, command: &Command, container: &LiveContainer) -> Result<bool> {
        let supervisor = &self.ctx.config().supervisor;
        match action {
            Action::Shell => {
                self.run(command, container, shell_argv(command)).await?;
            }
            Action::InitSupervisor => {
                if container.command.contains(&supervisor.binary_path) {
                    debug!(
                        component = %self.ctx.component_name(),
                        alias = %command.component,
                        "Supervisor is already the entrypoint"
                    );
                    return Ok(false);
                }
                self.run(command, container, supervisor_init_argv(supervisor))
                    .await?;
            }
            Action::RestartRun => {
                self.run(command, container, supervisor_stop_all_argv(supervisor))
                    .await?;
                self.run(command, container, supervisor_start_argv(supervisor))
                    .await?;
            }
            Action::StartRun => {
                debug!(command = %command.id, "restart: false, not restarting run command");
                self.run(command, container, supervisor_start_argv(supervisor))
                    .await?;
            }
        }
        Ok(true)
    }

    async fn run(&self, command: &Command, container: &LiveContainer, argv: Vec<String>) -> Result<()> {
        let deadline = self.ctx.config().exec_timeout();
        let attach = self.ctx.config().show_output;

        debug!(container = %container.id, argv = ?argv, "exec");
        let result = match tokio::time::timeout(deadline, self.exec.exec(&container.id, &argv, attach)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                return Err(Error::CommandExec {
                    command_id: command.id.clone(),
                    alias: command.component.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(Error::Timeout {
                    operation: format!("command '{}' in '{}'", command.id, command.component),
                    duration: deadline,
                })
            }
        };

        if !result.is_success() {
            return Err(Error::CommandFailed {
                command_id: command.id.clone(),
                alias: command.component.clone(),
                exit_code: result.exit_code,
            });
        }
        Ok(())
    }
}
