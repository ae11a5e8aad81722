//! Shared test helpers: an in-memory runtime that records every call.

#![allow(dead_code)]

use async_trait::async_trait;
use devsync::{
    ClientResult, Command, CommandGroup, ComponentSpec, ContainerDefinition, ExecClient,
    ExecResult, Labels, LiveContainer, PushConfig, PushContext, RuntimeClient, VolumeRecord,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// A recorded runtime or exec call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListVolumes(Labels),
    CreateVolume(String),
    PullImage(String),
    CreateContainer(String),
    RemoveContainer(String),
    ListContainers(Labels),
    Inspect(String),
    Exec { container: String, argv: Vec<String> },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreateVolume(_) | Call::CreateContainer(_) | Call::RemoveContainer(_)
        )
    }
}

#[derive(Default)]
struct State {
    volumes: Vec<VolumeRecord>,
    containers: Vec<(LiveContainer, ContainerDefinition)>,
    calls: Vec<Call>,
    next_id: u32,
    failing: Vec<&'static str>,
    exec_failures: Vec<(String, i32)>,
}

/// In-memory container engine.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

fn selects(labels: &Labels, selector: &Labels) -> bool {
    selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}

fn entrypoint(def: &ContainerDefinition) -> String {
    let mut parts = def.config.command.clone();
    parts.extend(def.config.args.iter().cloned());
    if parts.is_empty() {
        "/docker-entrypoint.sh".to_string()
    } else {
        parts.join(" ")
    }
}

impl FakeRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Adds a volume as if created out of band.
    pub fn seed_volume(&self, name: &str, labels: Labels) {
        let mut state = self.state.lock().unwrap();
        state.volumes.push(VolumeRecord {
            name: name.to_string(),
            labels,
        });
    }

    /// Adds a running container as if created out of band; returns its ID.
    pub fn seed_container(&self, definition: ContainerDefinition) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("seeded-{}", state.next_id);
        let live = LiveContainer {
            id: id.clone(),
            command: entrypoint(&definition),
            labels: definition.config.labels.clone(),
        };
        state.containers.push((live, definition));
        id
    }

    /// Makes every call of `operation` fail.
    pub fn fail_on(&self, operation: &'static str) {
        self.state.lock().unwrap().failing.push(operation);
    }

    /// Makes execs whose joined argv contains `needle` exit with `code`.
    pub fn fail_exec_containing(&self, needle: &str, code: i32) {
        self.state
            .lock()
            .unwrap()
            .exec_failures
            .push((needle.to_string(), code));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Exec argv lists, in order.
    pub fn execs(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Exec { argv, .. } => Some(argv),
                _ => None,
            })
            .collect()
    }

    pub fn volumes(&self) -> Vec<VolumeRecord> {
        self.state.lock().unwrap().volumes.clone()
    }

    pub fn containers(&self) -> Vec<(LiveContainer, ContainerDefinition)> {
        self.state.lock().unwrap().containers.clone()
    }

    fn record(&self, call: Call, operation: &str) -> ClientResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.iter().any(|op| *op == operation) {
            return Err(format!("injected {operation} failure").into());
        }
        Ok(())
    }
}

#[async_trait]
impl RuntimeClient for FakeRuntime {
    async fn list_volumes_by_label(&self, labels: &Labels) -> ClientResult<Vec<VolumeRecord>> {
        self.record(Call::ListVolumes(labels.clone()), "list_volumes_by_label")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .volumes
            .iter()
            .filter(|v| selects(&v.labels, labels))
            .cloned()
            .collect())
    }

    async fn create_volume(&self, name: &str, labels: &Labels) -> ClientResult<VolumeRecord> {
        self.record(Call::CreateVolume(name.to_string()), "create_volume")?;
        let record = VolumeRecord {
            name: name.to_string(),
            labels: labels.clone(),
        };
        self.state.lock().unwrap().volumes.push(record.clone());
        Ok(record)
    }

    async fn pull_image(&self, image: &str) -> ClientResult<()> {
        self.record(Call::PullImage(image.to_string()), "pull_image")
    }

    async fn create_and_start_container(
        &self,
        definition: &ContainerDefinition,
    ) -> ClientResult<String> {
        let alias = definition
            .config
            .labels
            .get("alias")
            .cloned()
            .unwrap_or_default();
        self.record(Call::CreateContainer(alias), "create_and_start_container")?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("container-{}", state.next_id);
        let live = LiveContainer {
            id: id.clone(),
            command: entrypoint(definition),
            labels: definition.config.labels.clone(),
        };
        state.containers.push((live, definition.clone()));
        Ok(id)
    }

    async fn remove_container(&self, id: &str) -> ClientResult<()> {
        self.record(Call::RemoveContainer(id.to_string()), "remove_container")?;
        self.state
            .lock()
            .unwrap()
            .containers
            .retain(|(c, _)| c.id != id);
        Ok(())
    }

    async fn list_containers_by_label(&self, labels: &Labels) -> ClientResult<Vec<LiveContainer>> {
        self.record(Call::ListContainers(labels.clone()), "list_containers_by_label")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .iter()
            .filter(|(c, _)| selects(&c.labels, labels))
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> ClientResult<ContainerDefinition> {
        self.record(Call::Inspect(id.to_string()), "inspect_container")?;
        let state = self.state.lock().unwrap();
        state
            .containers
            .iter()
            .find(|(c, _)| c.id == id)
            .map(|(_, d)| d.clone())
            .ok_or_else(|| format!("no such container: {id}").into())
    }
}

#[async_trait]
impl ExecClient for FakeRuntime {
    async fn exec(
        &self,
        id: &str,
        argv: &[String],
        _attach_output: bool,
    ) -> ClientResult<ExecResult> {
        self.record(
            Call::Exec {
                container: id.to_string(),
                argv: argv.to_vec(),
            },
            "exec",
        )?;
        let joined = argv.join(" ");
        let state = self.state.lock().unwrap();
        let code = state
            .exec_failures
            .iter()
            .find(|(needle, _)| joined.contains(needle.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(ExecResult {
            exit_code: code,
            ..Default::default()
        })
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub const COMPONENT: &str = "frontend";

pub fn context(runtime: &Arc<FakeRuntime>) -> PushContext {
    PushContext::new(
        COMPONENT,
        PathBuf::from("/work/frontend"),
        Arc::new(PushConfig::default()),
        runtime.clone(),
    )
}

pub fn labels(pairs: &[(&str, &str)]) -> Labels {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A node container mounting sources.
pub fn runtime_component() -> ComponentSpec {
    let mut comp = ComponentSpec::new("runtime", "node:18");
    comp.mount_sources = true;
    comp
}

pub fn command(id: &str, group: CommandGroup, line: &str) -> Command {
    Command {
        id: id.to_string(),
        component: "runtime".to_string(),
        command_line: line.to_string(),
        working_dir: Some("/projects".to_string()),
        group,
        is_default: true,
        restart: None,
    }
}
