//! tracing-subscriber setup

use tracing_subscriber::EnvFilter;

/// Filter directive derived from `TF_LOG`, then `RUST_LOG`, then `info`
pub fn filter_directive(tf_log: Option<&str>, rust_log: Option<&str>) -> String {
    match tf_log.map(|level| level.trim().to_ascii_lowercase()) {
        Some(level) if level == "json" => "trace".to_string(),
        Some(level) if ["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) => {
            level
        }
        _ => rust_log
            .filter(|directive| !directive.trim().is_empty())
            .unwrap_or("info")
            .to_string(),
    }
}

/// Installs the global subscriber; later calls are no-ops
pub fn init() {
    let tf_log = std::env::var("TF_LOG").ok();
    let rust_log = std::env::var("RUST_LOG").ok();
    let directive = filter_directive(tf_log.as_deref(), rust_log.as_deref());

    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tf_log_levels_map_directly() {
        assert_eq!(filter_directive(Some("DEBUG"), None), "debug");
        assert_eq!(filter_directive(Some("json"), None), "trace");
    }

    #[test]
    fn falls_back_to_rust_log_then_info() {
        assert_eq!(
            filter_directive(Some("bogus"), Some("agentcore=debug")),
            "agentcore=debug"
        );
        assert_eq!(filter_directive(None, None), "info");
        assert_eq!(filter_directive(None, Some(" ")), "info");
    }

    #[test]
    fn init_twice_is_harmless() {
        init();
        init();
    }
}
