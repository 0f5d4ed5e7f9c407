//! Effective monitoring configuration: environment overrides, the
//! metadata document, and live compose discovery merged once at
//! startup. The result is immutable for the process lifetime;
//! re-resolution requires a restart.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::{ComposeScope, StackBackend, ports_from_config, profiles_from_config};
use crate::model::{PortBinding, StackIdentity};

pub const DEFAULT_REFRESH_SECS: f64 = 1.0;
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";
pub const DEFAULT_METADATA_FILE: &str = "metadata.json";

/// Port-probing switch. `Auto` enables probing iff any selected
/// service declares a published port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeMode {
    On,
    Off,
    #[default]
    Auto,
}

impl ProbeMode {
    pub fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "off" | "false" | "0" | "no" => Self::Off,
            "on" | "true" | "1" | "yes" => Self::On,
            _ => Self::Auto,
        }
    }
}

fn flag_enabled(raw: &str) -> bool {
    !matches!(raw.to_lowercase().as_str(), "off" | "false" | "0" | "no")
}

/// Split a comma-separated list, trimming entries and dropping
/// empties.
pub fn csv_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Raw environment overrides, captured once at startup.
#[derive(Clone, Debug, Default)]
pub struct EnvOverrides {
    pub metadata_file: Option<String>,
    pub refresh: Option<String>,
    pub profiles: Vec<String>,
    pub services: Vec<String>,
    pub compose_file: Option<String>,
    pub project: Option<String>,
    pub probe_ports: Option<String>,
    pub log_errors: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            metadata_file: env_opt("STACKMON_METADATA_FILE"),
            refresh: env_opt("STACKMON_REFRESH"),
            profiles: env_csv("STACKMON_PROFILES"),
            services: env_csv("STACKMON_SERVICES"),
            compose_file: env_opt("STACKMON_COMPOSE_FILE"),
            project: env_opt("STACKMON_PROJECT"),
            probe_ports: env_opt("STACKMON_PROBE_PORTS"),
            log_errors: env_opt("STACKMON_LOG_ERRORS"),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_csv(name: &str) -> Vec<String> {
    env_opt(name).map(|v| csv_list(&v)).unwrap_or_default()
}

/// Optional stack metadata document (JSON). Every section and field
/// may be absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub stack: StackSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub compose: ComposeSection,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct StackSection {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub version: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MonitorSection {
    pub refresh_seconds: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ComposeSection {
    pub file: Option<String>,
    pub project_name_default: Option<String>,
}

impl Metadata {
    /// Read the metadata document. A missing file is simply empty
    /// metadata; an unreadable or malformed one degrades the same way
    /// but is worth a warning.
    pub fn load(path: &Path) -> Self {
        if !path.is_file() {
            return Self::default();
        }
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read metadata");
                return Self::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to parse metadata");
                Self::default()
            }
        }
    }

    pub fn identity(&self) -> StackIdentity {
        let defaults = StackIdentity::default();
        StackIdentity {
            name: self.stack.name.clone().unwrap_or(defaults.name),
            slug: self.stack.slug.clone().unwrap_or(defaults.slug),
            version: self.stack.version.clone().unwrap_or(defaults.version),
        }
    }
}

/// Parse the refresh interval. An explicit override wins even when
/// unparsable (it falls to the default, not to metadata); anything
/// non-positive or non-finite falls to the default too.
pub fn parse_refresh(raw: Option<&str>, metadata: Option<f64>) -> f64 {
    let candidate = match raw {
        Some(v) => v.parse::<f64>().unwrap_or(DEFAULT_REFRESH_SECS),
        None => metadata.unwrap_or(DEFAULT_REFRESH_SECS),
    };
    if candidate.is_finite() && candidate > 0.0 {
        candidate
    } else {
        DEFAULT_REFRESH_SECS
    }
}

/// Immutable monitoring configuration. Everything a refresh needs.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    pub stack: StackIdentity,
    pub compose_file: String,
    pub project: String,
    /// Active profiles, in display order.
    pub profiles: Vec<String>,
    /// Services to display, in display order.
    pub services: Vec<String>,
    pub port_map: BTreeMap<String, Vec<PortBinding>>,
    pub service_profiles: BTreeMap<String, Vec<String>>,
    pub refresh_secs: f64,
    pub probe_ports: bool,
    pub log_errors: bool,
    pub metadata_path: PathBuf,
}

impl MonitorConfig {
    pub fn scope(&self) -> ComposeScope {
        ComposeScope {
            file: self.compose_file.clone(),
            project: self.project.clone(),
            profiles: self.profiles.clone(),
        }
    }

    pub fn bindings(&self, service: &str) -> &[PortBinding] {
        self.port_map
            .get(service)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Merge overrides, metadata, and live discovery into one
/// configuration. Every discovery failure degrades to empty defaults;
/// nothing here is fatal (compose detection already happened).
pub async fn resolve(env: &EnvOverrides, backend: &dyn StackBackend) -> MonitorConfig {
    let metadata_path = PathBuf::from(
        env.metadata_file
            .clone()
            .unwrap_or_else(|| DEFAULT_METADATA_FILE.into()),
    );
    let meta = Metadata::load(&metadata_path);

    let refresh_secs = parse_refresh(env.refresh.as_deref(), meta.monitor.refresh_seconds);
    let compose_file = env
        .compose_file
        .clone()
        .or_else(|| meta.compose.file.clone())
        .unwrap_or_else(|| DEFAULT_COMPOSE_FILE.into());
    let project = env
        .project
        .clone()
        .or_else(|| meta.compose.project_name_default.clone())
        .unwrap_or_default();

    let mut profiles = env.profiles.clone();
    let mut services = env.services.clone();

    // Profiles are only auto-discovered when neither list was pinned.
    if profiles.is_empty() && services.is_empty() {
        let scope = ComposeScope {
            file: compose_file.clone(),
            project: project.clone(),
            profiles: Vec::new(),
        };
        profiles = backend.list_profiles(&scope).await;
    }

    let scope = ComposeScope {
        file: compose_file.clone(),
        project: project.clone(),
        profiles: profiles.clone(),
    };
    if services.is_empty() {
        services = backend.list_services(&scope).await;
    }

    let (port_map, service_profiles) = match backend.config_json(&scope).await {
        Some(cfg) => (ports_from_config(&cfg), profiles_from_config(&cfg)),
        None => (BTreeMap::new(), BTreeMap::new()),
    };

    let probe_mode = env
        .probe_ports
        .as_deref()
        .map(ProbeMode::parse)
        .unwrap_or_default();
    let probe_ports = match probe_mode {
        ProbeMode::On => true,
        ProbeMode::Off => false,
        ProbeMode::Auto => services
            .iter()
            .any(|s| port_map.get(s).is_some_and(|b| !b.is_empty())),
    };

    let log_errors = env.log_errors.as_deref().map(flag_enabled).unwrap_or(true);

    MonitorConfig {
        stack: meta.identity(),
        compose_file,
        project,
        profiles,
        services,
        port_map,
        service_profiles,
        refresh_secs,
        probe_ports,
        log_errors,
        metadata_path,
    }
}
