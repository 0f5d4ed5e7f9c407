//! Severity classification for table cells.
//!
//! Pure string-to-severity mappings, used only for presentation.
//! Classifiers are total: every input maps to a severity or to `None`,
//! which renderers treat as "no styling".

/// Display severity for one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warn,
    Critical,
}

/// Container state label. Docker state strings are open-ended, so
/// anything that is not running or transitioning reads as critical.
pub fn state_severity(state: &str) -> Option<Severity> {
    match state {
        "running" => Some(Severity::Normal),
        "restarting" | "starting" => Some(Severity::Warn),
        _ => Some(Severity::Critical),
    }
}

/// Health label. `n/a` (no health check declared) is normal.
pub fn health_severity(health: &str) -> Option<Severity> {
    match health {
        "healthy" | "n/a" => Some(Severity::Normal),
        "starting" => Some(Severity::Warn),
        _ => Some(Severity::Critical),
    }
}

/// Error-count display value: `-` when scanning is off, `n/a` for a
/// failed scan, or a literal count.
pub fn errors_severity(errors: &str) -> Option<Severity> {
    match errors {
        "-" => Some(Severity::Normal),
        "n/a" => Some(Severity::Warn),
        other => match other.parse::<u64>() {
            Ok(0) => Some(Severity::Normal),
            Ok(1..=2) => Some(Severity::Warn),
            Ok(_) => Some(Severity::Critical),
            Err(_) => None,
        },
    }
}

/// Port-probe aggregate label.
pub fn ports_severity(ports: &str) -> Option<Severity> {
    if ports.starts_with("OK") {
        Some(Severity::Normal)
    } else if ports.starts_with("PART") {
        Some(Severity::Warn)
    } else if ports.starts_with("FAIL") {
        Some(Severity::Critical)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_severity() {
        assert_eq!(state_severity("running"), Some(Severity::Normal));
        assert_eq!(state_severity("restarting"), Some(Severity::Warn));
        assert_eq!(state_severity("starting"), Some(Severity::Warn));
        assert_eq!(state_severity("exited"), Some(Severity::Critical));
        assert_eq!(state_severity("down"), Some(Severity::Critical));
        assert_eq!(state_severity("unknown"), Some(Severity::Critical));
        assert_eq!(state_severity(""), Some(Severity::Critical));
    }

    #[test]
    fn test_health_severity() {
        assert_eq!(health_severity("healthy"), Some(Severity::Normal));
        assert_eq!(health_severity("n/a"), Some(Severity::Normal));
        assert_eq!(health_severity("starting"), Some(Severity::Warn));
        assert_eq!(health_severity("unhealthy"), Some(Severity::Critical));
        assert_eq!(health_severity("-"), Some(Severity::Critical));
    }

    #[test]
    fn test_errors_severity() {
        assert_eq!(errors_severity("-"), Some(Severity::Normal));
        assert_eq!(errors_severity("n/a"), Some(Severity::Warn));
        assert_eq!(errors_severity("0"), Some(Severity::Normal));
        assert_eq!(errors_severity("1"), Some(Severity::Warn));
        assert_eq!(errors_severity("2"), Some(Severity::Warn));
        assert_eq!(errors_severity("3"), Some(Severity::Critical));
        assert_eq!(errors_severity("250"), Some(Severity::Critical));
        // Unparsable values land in the neutral bucket, never an error.
        assert_eq!(errors_severity("lots"), None);
        assert_eq!(errors_severity("-4"), None);
    }

    #[test]
    fn test_ports_severity() {
        assert_eq!(ports_severity("OK(2/2)"), Some(Severity::Normal));
        assert_eq!(ports_severity("PART(1/2)"), Some(Severity::Warn));
        assert_eq!(ports_severity("FAIL"), Some(Severity::Critical));
        assert_eq!(ports_severity("-"), None);
        assert_eq!(ports_severity("anything"), None);
    }
}
