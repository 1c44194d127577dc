use clap::ValueEnum;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Filter directives in `tracing` syntax; when set, replaces `--log-level`.
pub const LOG_ENV: &str = "CAMLINK_LOG";

/// Crates whose events `--log-level` controls. Everything else stays at warn.
const CAMLINK_TARGETS: [&str; 5] = [
    "camlink",
    "camlink_session",
    "camlink_frame",
    "camlink_transport",
    "camlink_decode",
];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    // Other crates log at warn, or error when camlink does.
    fn for_dependencies(self) -> LogLevel {
        match self {
            LogLevel::Error => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

/// Directives for `level` scoped to the camlink crates.
pub fn default_directives(level: LogLevel) -> String {
    let mut directives = vec![level.for_dependencies().as_str().to_string()];
    directives.extend(
        CAMLINK_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.as_str())),
    );
    directives.join(",")
}

/// Pick the filter: `overrides` (from [`LOG_ENV`]) when it parses, else the
/// camlink defaults. The flag is true when overrides were given but rejected.
fn build_filter(level: LogLevel, overrides: Option<&str>) -> (EnvFilter, bool) {
    match overrides.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => match EnvFilter::try_new(directives) {
            Ok(filter) => (filter, false),
            Err(_) => (EnvFilter::new(default_directives(level)), true),
        },
        None => (EnvFilter::new(default_directives(level)), false),
    }
}

/// Install the stderr subscriber. Worker threads log under their session
/// name, so thread names are included.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let overrides = std::env::var(LOG_ENV).ok();
    let (filter, rejected) = build_filter(level, overrides.as_deref());

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .with_thread_names(true);

    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if rejected {
        warn!(var = LOG_ENV, "invalid filter directives; using --log-level");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_scope_level_to_camlink_crates() {
        let directives = default_directives(LogLevel::Debug);
        assert!(directives.starts_with("warn,"));
        for target in CAMLINK_TARGETS {
            assert!(
                directives.contains(&format!("{target}=debug")),
                "{target} should follow --log-level"
            );
        }
    }

    #[test]
    fn error_level_quiets_dependencies_too() {
        assert!(default_directives(LogLevel::Error).starts_with("error,"));
    }

    #[test]
    fn env_directives_replace_defaults() {
        let (filter, rejected) = build_filter(LogLevel::Info, Some("camlink_frame=trace"));
        assert!(!rejected);
        let rendered = filter.to_string();
        assert!(rendered.contains("camlink_frame=trace"));
        assert!(!rendered.contains("camlink_session"));
    }

    #[test]
    fn invalid_env_directives_fall_back() {
        let (filter, rejected) = build_filter(LogLevel::Info, Some("camlink=loud"));
        assert!(rejected);
        assert!(filter.to_string().contains("camlink_session=info"));
    }

    #[test]
    fn blank_env_uses_defaults() {
        let (filter, rejected) = build_filter(LogLevel::Warn, Some("  "));
        assert!(!rejected);
        assert!(filter.to_string().contains("camlink=warn"));
    }
}
