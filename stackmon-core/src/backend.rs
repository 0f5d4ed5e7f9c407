//! External process seam: the compose, inspection, and log CLIs.
//!
//! Everything here is treated as a text or JSON producer. A non-zero
//! exit or malformed output means "no data", never an error the
//! refresh has to handle; the one exception is compose detection at
//! startup, which is fatal for the process.

use std::collections::BTreeMap;
use std::fmt;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::model::PortBinding;

/// Scope arguments shared by every compose invocation: file, project,
/// and the active profiles.
#[derive(Clone, Debug, Default)]
pub struct ComposeScope {
    pub file: String,
    pub project: String,
    pub profiles: Vec<String>,
}

impl ComposeScope {
    fn args(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.file.clone()];
        if !self.project.is_empty() {
            args.push("-p".into());
            args.push(self.project.clone());
        }
        for p in &self.profiles {
            args.push("--profile".into());
            args.push(p.clone());
        }
        args
    }
}

/// Live container state from inspection. Defaults are the degraded
/// labels used when inspection fails.
#[derive(Clone, Debug)]
pub struct ContainerInfo {
    pub state: String,
    pub health: String,
}

impl Default for ContainerInfo {
    fn default() -> Self {
        Self {
            state: "unknown".into(),
            health: "n/a".into(),
        }
    }
}

/// Every external call the engine makes, as one trait so tests can
/// substitute an in-memory stack.
#[async_trait]
pub trait StackBackend: Send + Sync {
    /// `config --profiles`; failure yields an empty list.
    async fn list_profiles(&self, scope: &ComposeScope) -> Vec<String>;

    /// `config --services`; failure yields an empty list.
    async fn list_services(&self, scope: &ComposeScope) -> Vec<String>;

    /// `config --format json`; failure yields `None`.
    async fn config_json(&self, scope: &ComposeScope) -> Option<Value>;

    /// First running container id for a service, if any. Absence is
    /// not an error; it means the service is down.
    async fn container_id(&self, scope: &ComposeScope, service: &str) -> Option<String>;

    /// State and health labels for a container. Never fails; an
    /// unresolvable inspection degrades to `unknown`/`n/a`.
    async fn inspect(&self, container_id: &str) -> ContainerInfo;

    /// Recent log text, stdout and stderr merged. `None` when the
    /// container is gone or the log CLI fails.
    async fn logs_tail(&self, container_id: &str, tail: u32, since: &str) -> Option<String>;
}

/// The one fatal startup error: no usable compose CLI on this host.
#[derive(Clone, Copy, Debug)]
pub struct ComposeNotFound;

impl fmt::Display for ComposeNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "neither 'docker compose' nor 'docker-compose' found")
    }
}

impl std::error::Error for ComposeNotFound {}

/// Production backend: shells out to the detected compose command for
/// discovery and scoping, and to the `docker` CLI for inspection and
/// logs.
#[derive(Clone, Debug)]
pub struct ComposeCli {
    /// Detected command prefix, e.g. `["docker", "compose"]`.
    compose: Vec<String>,
}

impl ComposeCli {
    pub fn new(compose: Vec<String>) -> Self {
        Self { compose }
    }

    pub fn command_prefix(&self) -> &[String] {
        &self.compose
    }

    /// Probe for a working compose CLI: the `docker compose` plugin
    /// first, then the standalone `docker-compose` binary.
    pub async fn detect() -> Result<Self, ComposeNotFound> {
        for candidate in [&["docker", "compose"][..], &["docker-compose"][..]] {
            let prefix: Vec<String> = candidate.iter().map(|s| s.to_string()).collect();
            if version_check(&prefix).await {
                return Ok(Self::new(prefix));
            }
        }
        Err(ComposeNotFound)
    }

    async fn compose_capture(&self, scope: &ComposeScope, tail_args: &[&str]) -> Option<String> {
        let mut cmd = Command::new(&self.compose[0]);
        cmd.args(&self.compose[1..]);
        cmd.args(scope.args());
        cmd.args(tail_args);
        capture(cmd).await
    }
}

async fn version_check(prefix: &[String]) -> bool {
    let mut cmd = Command::new(&prefix[0]);
    cmd.args(&prefix[1..])
        .arg("version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    matches!(cmd.status().await, Ok(status) if status.success())
}

/// Run a command, returning stdout only on a zero exit.
async fn capture(mut cmd: Command) -> Option<String> {
    cmd.stdin(Stdio::null()).stderr(Stdio::null());
    let out = cmd.output().await.ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok()
}

fn trimmed_lines(out: String) -> Vec<String> {
    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl StackBackend for ComposeCli {
    async fn list_profiles(&self, scope: &ComposeScope) -> Vec<String> {
        self.compose_capture(scope, &["config", "--profiles"])
            .await
            .map(trimmed_lines)
            .unwrap_or_default()
    }

    async fn list_services(&self, scope: &ComposeScope) -> Vec<String> {
        self.compose_capture(scope, &["config", "--services"])
            .await
            .map(trimmed_lines)
            .unwrap_or_default()
    }

    async fn config_json(&self, scope: &ComposeScope) -> Option<Value> {
        let out = self
            .compose_capture(scope, &["config", "--format", "json"])
            .await?;
        serde_json::from_str(&out).ok()
    }

    async fn container_id(&self, scope: &ComposeScope, service: &str) -> Option<String> {
        let out = self.compose_capture(scope, &["ps", "-q", service]).await?;
        trimmed_lines(out).into_iter().next()
    }

    async fn inspect(&self, container_id: &str) -> ContainerInfo {
        let mut cmd = Command::new("docker");
        cmd.args(["inspect", container_id]);
        match capture(cmd).await {
            Some(out) => parse_inspect(&out).unwrap_or_default(),
            None => ContainerInfo::default(),
        }
    }

    async fn logs_tail(&self, container_id: &str, tail: u32, since: &str) -> Option<String> {
        // docker writes container output on both streams; merge them.
        let mut cmd = Command::new("docker");
        cmd.args([
            "logs",
            "--tail",
            &tail.to_string(),
            "--since",
            since,
            container_id,
        ]);
        cmd.stdin(Stdio::null());
        let out = cmd.output().await.ok()?;
        if !out.status.success() {
            return None;
        }
        let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&out.stderr));
        Some(text)
    }
}

/// Pull `State.Status` / `State.Health.Status` out of a
/// `docker inspect` document.
fn parse_inspect(out: &str) -> Option<ContainerInfo> {
    let doc: Value = serde_json::from_str(out).ok()?;
    let state = doc.get(0)?.get("State")?;
    let status = state
        .get("Status")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let health = state
        .get("Health")
        .and_then(|h| h.get("Status"))
        .and_then(Value::as_str)
        .unwrap_or("n/a");
    Some(ContainerInfo {
        state: status.into(),
        health: health.into(),
    })
}

/// Published-port map from the compose config dump. Accepts both the
/// long form (`{host_ip, published}`) and the short string form
/// (`[host:]published:target[/proto]`); `published` may arrive as a
/// number or a string. Entries with no published port are skipped.
pub fn ports_from_config(cfg: &Value) -> BTreeMap<String, Vec<PortBinding>> {
    let mut map = BTreeMap::new();
    let Some(services) = cfg.get("services").and_then(Value::as_object) else {
        return map;
    };
    for (name, data) in services {
        let mut bindings = Vec::new();
        if let Some(ports) = data.get("ports").and_then(Value::as_array) {
            for entry in ports {
                if let Some(binding) = parse_port_entry(entry) {
                    bindings.push(binding);
                }
            }
        }
        map.insert(name.clone(), bindings);
    }
    map
}

fn parse_port_entry(entry: &Value) -> Option<PortBinding> {
    if let Some(obj) = entry.as_object() {
        let host = obj
            .get("host_ip")
            .and_then(Value::as_str)
            .filter(|h| !h.is_empty())
            .unwrap_or("localhost");
        let port = match obj.get("published")? {
            Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        return Some(PortBinding::new(host, port));
    }

    let text = match entry {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let without_proto = text.split('/').next().unwrap_or("");
    let bits: Vec<&str> = without_proto.split(':').collect();
    let (host, published) = match bits.as_slice() {
        [host, published, _target] => (*host, *published),
        [published, _target] => ("localhost", *published),
        _ => return None,
    };
    let port: u16 = published.parse().ok()?;
    let host = if host.is_empty() { "localhost" } else { host };
    Some(PortBinding::new(host, port))
}

/// Declared profiles per service from the compose config dump.
pub fn profiles_from_config(cfg: &Value) -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    let Some(services) = cfg.get("services").and_then(Value::as_object) else {
        return map;
    };
    for (name, data) in services {
        let profiles = data
            .get("profiles")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        map.insert(name.clone(), profiles);
    }
    map
}
