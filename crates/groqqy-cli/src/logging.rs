use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Consulted before `RUST_LOG` when no level is passed on the command line
pub const LOG_ENV: &str = "GROQQY_LOG";

/// `--log-level` first, then `GROQQY_LOG`, then `RUST_LOG`, else `warn`
pub fn resolve_filter(level: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = level {
        return EnvFilter::try_new(level).with_context(|| format!("Invalid log level '{}'", level));
    }
    Ok(EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn")))
}

/// Install the global subscriber. Output goes to stderr so that it never
/// interleaves with rendered responses.
pub fn init(level: Option<&str>, json: bool) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(resolve_filter(level)?)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_level_wins() {
        let filter = resolve_filter(Some("groqqy=debug")).unwrap();
        assert_eq!(filter.to_string(), "groqqy=debug");
    }
}
