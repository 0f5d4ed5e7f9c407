//! Snapshot assembly: one complete table model per refresh cycle.
//!
//! Each cycle rebuilds every row from live queries. The builder owns
//! the error-count cache so scan results survive across cycles while
//! everything else is recomputed.

use crate::backend::StackBackend;
use crate::cache::{ErrorCountCache, SCAN_LOOKBACK, SCAN_TAIL_LINES, ScanOutcome, count_error_lines};
use crate::context::MonitorConfig;
use crate::group::group_rows;
use crate::model::{ErrorCount, HeaderSummary, PortsLabel, ServiceRow, TableModel};
use crate::probe::{PROBE_TIMEOUT, probe_ports};

/// Builds table models from live container state. Holds the scan
/// cache; one builder per refresh loop.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    cache: ErrorCountCache,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            cache: ErrorCountCache::new(),
        }
    }

    pub fn with_cache(cache: ErrorCountCache) -> Self {
        Self { cache }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &ErrorCountCache {
        &self.cache
    }

    /// Build one snapshot. `now` is monotonic seconds, used only for
    /// cache freshness. Services are visited in display order; every
    /// per-service failure degrades that service's cells, never the
    /// snapshot.
    pub async fn build(
        &mut self,
        config: &MonitorConfig,
        backend: &dyn StackBackend,
        now: f64,
    ) -> TableModel {
        let scope = config.scope();
        let mut rows = Vec::with_capacity(config.services.len());
        for service in &config.services {
            let row = match backend.container_id(&scope, service).await {
                Some(cid) => self.build_row(config, backend, service, cid, now).await,
                None => ServiceRow::down(service.clone()),
            };
            rows.push(row);
        }
        TableModel {
            header: header_summary(config),
            rows: group_rows(rows, &config.service_profiles, &config.profiles),
        }
    }

    async fn build_row(
        &mut self,
        config: &MonitorConfig,
        backend: &dyn StackBackend,
        service: &str,
        container_id: String,
        now: f64,
    ) -> ServiceRow {
        let info = backend.inspect(&container_id).await;

        let errors = if config.log_errors {
            let outcome = self
                .cache
                .get_or_refresh(&container_id, now, || async {
                    match backend
                        .logs_tail(&container_id, SCAN_TAIL_LINES, SCAN_LOOKBACK)
                        .await
                    {
                        Some(text) => ScanOutcome::Count(count_error_lines(&text)),
                        None => ScanOutcome::Failed,
                    }
                })
                .await;
            match outcome {
                ScanOutcome::Count(n) => ErrorCount::Count(n),
                ScanOutcome::Failed => ErrorCount::Failed,
            }
        } else {
            ErrorCount::Disabled
        };

        let bindings = config.bindings(service);
        let ports = if config.probe_ports && !bindings.is_empty() {
            probe_ports(bindings, PROBE_TIMEOUT).await
        } else {
            PortsLabel::NotProbed
        };

        ServiceRow {
            service: service.to_string(),
            container_id,
            state: info.state,
            health: info.health,
            errors,
            ports,
        }
    }
}

fn header_summary(config: &MonitorConfig) -> HeaderSummary {
    HeaderSummary {
        stack: config.stack.clone(),
        project: config.project.clone(),
        compose_file: config.compose_file.clone(),
        profiles: config.profiles.clone(),
        services: config.services.clone(),
        refresh_secs: config.refresh_secs,
        probe_ports: config.probe_ports,
        log_errors: config.log_errors,
        metadata_path: config.metadata_path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::net::TcpListener;

    use crate::backend::{ComposeScope, ContainerInfo};
    use crate::model::{GroupedRow, PortBinding, StackIdentity};

    /// In-memory stack: fixed containers, states, and log text.
    #[derive(Default)]
    struct FakeStack {
        containers: BTreeMap<String, String>,
        info: BTreeMap<String, ContainerInfo>,
        logs: BTreeMap<String, String>,
        scans: AtomicU64,
    }

    #[async_trait]
    impl StackBackend for FakeStack {
        async fn list_profiles(&self, _scope: &ComposeScope) -> Vec<String> {
            Vec::new()
        }

        async fn list_services(&self, _scope: &ComposeScope) -> Vec<String> {
            Vec::new()
        }

        async fn config_json(&self, _scope: &ComposeScope) -> Option<Value> {
            None
        }

        async fn container_id(&self, _scope: &ComposeScope, service: &str) -> Option<String> {
            self.containers.get(service).cloned()
        }

        async fn inspect(&self, container_id: &str) -> ContainerInfo {
            self.info.get(container_id).cloned().unwrap_or_default()
        }

        async fn logs_tail(&self, container_id: &str, _tail: u32, _since: &str) -> Option<String> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            self.logs.get(container_id).cloned()
        }
    }

    fn config(services: &[&str]) -> MonitorConfig {
        MonitorConfig {
            stack: StackIdentity {
                name: "demo".into(),
                slug: "demo".into(),
                version: "1.0".into(),
            },
            compose_file: "docker-compose.yml".into(),
            project: String::new(),
            profiles: Vec::new(),
            services: services.iter().map(|s| s.to_string()).collect(),
            port_map: BTreeMap::new(),
            service_profiles: BTreeMap::new(),
            refresh_secs: 1.0,
            probe_ports: false,
            log_errors: true,
            metadata_path: "metadata.json".into(),
        }
    }

    fn service_rows(model: &TableModel) -> Vec<&ServiceRow> {
        model
            .rows
            .iter()
            .filter_map(|r| match r {
                GroupedRow::Service(row) => Some(row),
                GroupedRow::Header { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_snapshot_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut backend = FakeStack::default();
        backend.containers.insert("web".into(), "aaaa1111".into());
        backend.info.insert(
            "aaaa1111".into(),
            ContainerInfo {
                state: "running".into(),
                health: "healthy".into(),
            },
        );
        backend
            .logs
            .insert("aaaa1111".into(), "INFO ok\nERROR boom\n".into());

        let mut config = config(&["web", "db"]);
        config.probe_ports = true;
        config
            .port_map
            .insert("web".into(), vec![PortBinding::new("127.0.0.1", port)]);

        let mut builder = SnapshotBuilder::new();
        let model = builder.build(&config, &backend, 0.0).await;

        assert_eq!(model.header.title(), "demo (demo) v1.0");
        let rows = service_rows(&model);
        assert_eq!(rows.len(), 2);

        let web = rows[0];
        assert_eq!(web.service, "web");
        assert_eq!(web.state, "running");
        assert_eq!(web.health, "healthy");
        assert_eq!(web.errors, ErrorCount::Count(1));
        assert_eq!(web.ports, PortsLabel::Ok { ok: 1, total: 1 });

        // db has no container: fully sentinel row.
        let db = rows[1];
        assert!(db.is_down());
        assert_eq!(db.ports, PortsLabel::NotProbed);
    }

    #[tokio::test]
    async fn test_log_scanning_disabled() {
        let mut backend = FakeStack::default();
        backend.containers.insert("web".into(), "aaaa1111".into());

        let mut config = config(&["web"]);
        config.log_errors = false;

        let mut builder = SnapshotBuilder::new();
        let model = builder.build(&config, &backend, 0.0).await;

        let rows = service_rows(&model);
        assert_eq!(rows[0].errors, ErrorCount::Disabled);
        // Nothing scanned, nothing cached.
        assert_eq!(backend.scans.load(Ordering::SeqCst), 0);
        assert!(builder.cache().is_empty());
    }

    #[tokio::test]
    async fn test_inspect_failure_degrades() {
        let mut backend = FakeStack::default();
        // Container exists but has no inspect data and no logs.
        backend.containers.insert("web".into(), "gone".into());

        let mut builder = SnapshotBuilder::new();
        let model = builder.build(&config(&["web"]), &backend, 0.0).await;

        let rows = service_rows(&model);
        assert_eq!(rows[0].state, "unknown");
        assert_eq!(rows[0].health, "n/a");
        assert_eq!(rows[0].errors, ErrorCount::Failed);
    }

    #[tokio::test]
    async fn test_scan_results_are_cached_across_builds() {
        let mut backend = FakeStack::default();
        backend.containers.insert("web".into(), "aaaa1111".into());
        backend.logs.insert("aaaa1111".into(), "ERROR x\n".into());

        let config = config(&["web"]);
        let mut builder = SnapshotBuilder::new();

        builder.build(&config, &backend, 0.0).await;
        builder.build(&config, &backend, 5.0).await;
        // Two builds inside the window: one scan.
        assert_eq!(backend.scans.load(Ordering::SeqCst), 1);

        builder.build(&config, &backend, 20.0).await;
        assert_eq!(backend.scans.load(Ordering::SeqCst), 2);
    }
}
