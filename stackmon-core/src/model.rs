use std::fmt;

/// One published port for a service, taken from the compose
/// configuration. `host` is where the probe connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortBinding {
    pub host: String,
    pub port: u16,
}

impl PortBinding {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Recent-log error volume for one container.
///
/// A scan can be switched off entirely, or can fail when the container
/// disappears mid-refresh; the three cases render differently and must
/// never be confused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCount {
    /// Log scanning is disabled; nothing was scanned or cached.
    Disabled,
    /// A scan was attempted and failed.
    Failed,
    /// Error lines counted by the last scan.
    Count(u64),
}

impl fmt::Display for ErrorCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "-"),
            Self::Failed => write!(f, "n/a"),
            Self::Count(n) => write!(f, "{}", n),
        }
    }
}

/// Aggregate TCP reachability over a service's published ports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortsLabel {
    /// Probing disabled or no bindings declared.
    NotProbed,
    /// Every binding accepted a connection.
    Ok { ok: usize, total: usize },
    /// No binding accepted a connection.
    Fail,
    /// Some bindings accepted, some did not.
    Part { ok: usize, total: usize },
}

impl fmt::Display for PortsLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotProbed => write!(f, "-"),
            Self::Ok { ok, total } => write!(f, "OK({}/{})", ok, total),
            Self::Fail => write!(f, "FAIL"),
            Self::Part { ok, total } => write!(f, "PART({}/{})", ok, total),
        }
    }
}

/// One service line in the table. Rebuilt from scratch every refresh;
/// carries no identity beyond its position in the sequence.
#[derive(Clone, Debug)]
pub struct ServiceRow {
    pub service: String,
    /// Full container id; empty when no container is running.
    pub container_id: String,
    pub state: String,
    pub health: String,
    pub errors: ErrorCount,
    pub ports: PortsLabel,
}

impl ServiceRow {
    /// Row for a service with no running container. Every derived
    /// field shows the not-applicable sentinel regardless of cache or
    /// probe settings.
    pub fn down(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            container_id: String::new(),
            state: "down".into(),
            health: "-".into(),
            errors: ErrorCount::Disabled,
            ports: PortsLabel::NotProbed,
        }
    }

    pub fn is_down(&self) -> bool {
        self.container_id.is_empty()
    }

    /// Short container id for display, `-` when down.
    pub fn short_id(&self) -> &str {
        if self.container_id.is_empty() {
            "-"
        } else {
            let end = self.container_id.len().min(12);
            &self.container_id[..end]
        }
    }
}

/// A row in the grouped table: a profile header or a service line.
#[derive(Clone, Debug)]
pub enum GroupedRow {
    Header { profile: String },
    Service(ServiceRow),
}

/// Stack identity shown in the header, from the metadata document.
#[derive(Clone, Debug)]
pub struct StackIdentity {
    pub name: String,
    pub slug: String,
    pub version: String,
}

impl Default for StackIdentity {
    fn default() -> Self {
        Self {
            name: "Stack".into(),
            slug: "stack".into(),
            version: "dev".into(),
        }
    }
}

/// Summary block rendered above the table.
#[derive(Clone, Debug)]
pub struct HeaderSummary {
    pub stack: StackIdentity,
    pub project: String,
    pub compose_file: String,
    pub profiles: Vec<String>,
    pub services: Vec<String>,
    pub refresh_secs: f64,
    pub probe_ports: bool,
    pub log_errors: bool,
    pub metadata_path: String,
}

impl HeaderSummary {
    /// Title line, e.g. `demo (demo) v1.0`.
    pub fn title(&self) -> String {
        format!(
            "{} ({}) v{}",
            self.stack.name, self.stack.slug, self.stack.version
        )
    }

    /// The full header as display lines, shared by every renderer.
    pub fn lines(&self) -> Vec<String> {
        let join = |items: &[String]| {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(",")
            }
        };
        let project = if self.project.is_empty() {
            "-"
        } else {
            &self.project
        };
        vec![
            self.title(),
            format!("project: {} | compose: {}", project, self.compose_file),
            format!(
                "profiles: {} | services: {}",
                join(&self.profiles),
                join(&self.services)
            ),
            format!(
                "refresh: {}s | metadata: {} | port probing: {}",
                self.refresh_secs,
                self.metadata_path,
                if self.probe_ports { "on" } else { "off" }
            ),
        ]
    }
}

/// The published table model: everything a renderer needs for one
/// frame. Never mutated after publication.
#[derive(Clone, Debug)]
pub struct TableModel {
    pub header: HeaderSummary,
    pub rows: Vec<GroupedRow>,
}
