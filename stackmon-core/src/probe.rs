//! TCP reachability probes for published ports.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::model::{PortBinding, PortsLabel};

/// Default per-port connect timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Probe every binding independently and aggregate. A failed connect
/// counts as unreachable for this refresh cycle; there are no retries,
/// and a timeout is not distinguished from a refusal.
pub async fn probe_ports(bindings: &[PortBinding], timeout: Duration) -> PortsLabel {
    if bindings.is_empty() {
        return PortsLabel::NotProbed;
    }
    let mut ok = 0usize;
    for binding in bindings {
        if probe_one(binding, timeout).await {
            ok += 1;
        }
    }
    aggregate(ok, bindings.len())
}

async fn probe_one(binding: &PortBinding, timeout: Duration) -> bool {
    let addr = format!("{}:{}", binding.host, binding.port);
    matches!(
        tokio::time::timeout(timeout, TcpStream::connect(&addr)).await,
        Ok(Ok(_))
    )
}

/// Pure aggregation over (reachable, total).
pub fn aggregate(ok: usize, total: usize) -> PortsLabel {
    if total == 0 {
        PortsLabel::NotProbed
    } else if ok == total {
        PortsLabel::Ok { ok, total }
    } else if ok == 0 {
        PortsLabel::Fail
    } else {
        PortsLabel::Part { ok, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_aggregate() {
        assert_eq!(aggregate(0, 0), PortsLabel::NotProbed);
        assert_eq!(aggregate(3, 3), PortsLabel::Ok { ok: 3, total: 3 });
        assert_eq!(aggregate(0, 2), PortsLabel::Fail);
        assert_eq!(aggregate(1, 3), PortsLabel::Part { ok: 1, total: 3 });
        assert_eq!(aggregate(1, 1).to_string(), "OK(1/1)");
        assert_eq!(aggregate(2, 5).to_string(), "PART(2/5)");
    }

    #[tokio::test]
    async fn test_probe_reachable_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let bindings = vec![PortBinding::new("127.0.0.1", port)];
        let label = probe_ports(&bindings, PROBE_TIMEOUT).await;
        assert_eq!(label, PortsLabel::Ok { ok: 1, total: 1 });
    }

    #[tokio::test]
    async fn test_probe_unreachable_port() {
        // Bind then drop to get a port that refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let bindings = vec![PortBinding::new("127.0.0.1", port)];
        let label = probe_ports(&bindings, PROBE_TIMEOUT).await;
        assert_eq!(label, PortsLabel::Fail);
    }

    #[tokio::test]
    async fn test_probe_partial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let p = l.local_addr().unwrap().port();
            drop(l);
            p
        };

        let bindings = vec![
            PortBinding::new("127.0.0.1", open),
            PortBinding::new("127.0.0.1", closed),
        ];
        let label = probe_ports(&bindings, PROBE_TIMEOUT).await;
        assert_eq!(label, PortsLabel::Part { ok: 1, total: 2 });
    }

    #[tokio::test]
    async fn test_probe_empty_set() {
        assert_eq!(probe_ports(&[], PROBE_TIMEOUT).await, PortsLabel::NotProbed);
    }
}
